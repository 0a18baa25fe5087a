// src/config.rs

use std::env;
use dotenvy::dotenv;

use crate::engine::ranking::XpPolicy;

/// Number of times `record_attempt` re-runs the gate after losing a slot race.
pub const RECORD_ATTEMPT_MAX_RETRIES: usize = 3;

/// Settings the engine itself reads.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Attempt cap for mock exams that do not set one.
    pub default_allowed_attempts: u32,
    /// How XP is combined when ranking across a learner's classrooms.
    pub xp_policy: XpPolicy,
    pub max_page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_allowed_attempts: 1,
            xp_policy: XpPolicy::Sum,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let defaults = EngineConfig::default();
        let engine = EngineConfig {
            default_allowed_attempts: env::var("DEFAULT_ALLOWED_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(defaults.default_allowed_attempts),
            xp_policy: env::var("RANKING_XP_POLICY")
                .map(|v| v.parse().expect("RANKING_XP_POLICY must be 'sum' or 'max'"))
                .unwrap_or(defaults.xp_policy),
            max_page_size: env::var("RANKING_MAX_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(defaults.max_page_size),
        };

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            engine,
        }
    }
}
