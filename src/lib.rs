//! Core library for the minter-keeper project.
//!
//! Periodic readers fill an explicit [`state::AppState`]; the mint and
//! buy-and-burn orchestrators read it and drive the external quote, signing
//! and transaction calls. The binary (`main.rs`) wires them to a small CLI.

pub mod api;
pub mod burn;
pub mod chain;
pub mod config;
pub mod errors;
pub mod mint;
pub mod models;
pub mod panel;
pub mod poller;
pub mod readers;
pub mod state;
pub mod utils;
pub mod wallet;
