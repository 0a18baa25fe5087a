// src/engine/mod.rs

//! Assessment lifecycle and scoring rules.
//!
//! The pure parts (`temporal`, `gate`, `scorer`, `aggregate`, `ranking`,
//! `goals`) take their inputs explicitly, including `now`. [`Ledger`] wires
//! them to a [`crate::store::Store`].

pub mod aggregate;
pub mod gate;
pub mod goals;
pub mod ledger;
pub mod ranking;
pub mod scorer;
pub mod temporal;

pub use ledger::Ledger;
