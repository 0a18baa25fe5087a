// src/models/mod.rs

pub mod assessment;
pub mod attempt;
pub mod correction;
pub mod goal;
pub mod ranking;
pub mod stats;
