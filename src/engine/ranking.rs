// src/engine/ranking.rs

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::models::ranking::{RankingEntry, RankingPage, XpRow};

/// How XP from several classrooms is combined for one learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XpPolicy {
    #[default]
    Sum,
    Max,
}

impl FromStr for XpPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(XpPolicy::Sum),
            "max" => Ok(XpPolicy::Max),
            other => Err(format!("unknown XP policy '{}'", other)),
        }
    }
}

/// Which learners a leaderboard covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingScope {
    Classroom(i64),
    /// Every classroom the learner belongs to, XP combined per [`XpPolicy`].
    LearnerClassrooms(i64),
}

/// Orders learners by XP, descending.
///
/// Ties go to the earliest first XP event (learners without one come last),
/// then to the lower learner id, so positions are always distinct.
pub fn rank(rows: Vec<XpRow>, policy: XpPolicy) -> Vec<RankingEntry> {
    let mut combined: HashMap<i64, (i64, Option<DateTime<Utc>>)> = HashMap::new();
    for row in rows {
        combined
            .entry(row.learner_id)
            .and_modify(|(xp, first)| {
                *xp = match policy {
                    XpPolicy::Sum => xp.saturating_add(row.xp),
                    XpPolicy::Max => (*xp).max(row.xp),
                };
                *first = earliest(*first, row.first_event_at);
            })
            .or_insert((row.xp, row.first_event_at));
    }

    let mut learners: Vec<(i64, i64, Option<DateTime<Utc>>)> = combined
        .into_iter()
        .map(|(learner_id, (xp, first))| (learner_id, xp, first))
        .collect();

    learners.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| cmp_first_event(a.2, b.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    learners
        .into_iter()
        .enumerate()
        .map(|(idx, (learner_id, xp, first_event_at))| RankingEntry {
            position: idx as u64 + 1,
            learner_id,
            xp,
            first_event_at,
        })
        .collect()
}

/// Cuts one 1-based page out of a ranked list and looks up the requester's position.
pub fn paginate(
    ranked: Vec<RankingEntry>,
    page: u32,
    page_size: u32,
    requesting_learner: i64,
) -> RankingPage {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total_learners = ranked.len() as u64;
    let own_position = ranked
        .iter()
        .find(|e| e.learner_id == requesting_learner)
        .map(|e| e.position);

    let skip = (page as usize - 1).saturating_mul(page_size as usize);
    let entries = ranked
        .into_iter()
        .skip(skip)
        .take(page_size as usize)
        .collect();

    RankingPage {
        page,
        page_size,
        total_learners,
        entries,
        own_position,
    }
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn cmp_first_event(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
