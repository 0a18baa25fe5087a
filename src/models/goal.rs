// src/models/goal.rs

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::temporal::{TemporalState, Window};
use crate::models::assessment::AssessmentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Question,
    Essay,
}

impl GoalType {
    /// Assessment kind whose attempts count toward a goal of this type.
    pub fn counts(&self, kind: AssessmentKind) -> bool {
        matches!(
            (self, kind),
            (GoalType::Question, AssessmentKind::MockExam) | (GoalType::Essay, AssessmentKind::Essay)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Question => "question",
            GoalType::Essay => "essay",
        }
    }
}

impl FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "question" => Ok(GoalType::Question),
            "essay" => Ok(GoalType::Essay),
            other => Err(format!("unknown goal type '{}'", other)),
        }
    }
}

/// A challenge assigned by a mentor: `target` attempts of `goal_type` inside the window.
#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    pub id: i64,
    pub target: i32,
    pub goal_type: GoalType,
    pub classroom_ids: BTreeSet<i64>,
    pub opening_date: DateTime<Utc>,
    pub final_date: DateTime<Utc>,
}

impl Goal {
    pub fn window(&self) -> Window {
        Window::new(self.opening_date, self.final_date)
    }
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub target: i32,
    pub goal_type: GoalType,
    pub classroom_ids: Vec<i64>,
    pub opening_date: DateTime<Utc>,
    pub final_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalProgress {
    pub goal_id: i64,
    /// Raw count; may exceed `target`.
    pub progress: i64,
    pub target: i32,
    pub complete: bool,
    pub state: TemporalState,
}
