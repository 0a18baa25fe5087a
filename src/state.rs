use crate::config::Config;
use crate::engine::Ledger;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub config: Config,
}

impl FromRef<AppState> for Ledger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
