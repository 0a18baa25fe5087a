// src/handlers/mod.rs

pub mod admin;
pub mod assessment;
pub mod correction;
pub mod me;
pub mod ranking;
