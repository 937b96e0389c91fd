//! The `abr` command-line surface.
//!
//! Wires configuration, logging, and the process bridge around
//! [`abr_core::Router`], and exposes the NDJSON serve loop plus the one-shot
//! `exec`, `validate`, and `actions` commands.

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
