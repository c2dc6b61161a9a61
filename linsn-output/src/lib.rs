//! # linsn-output
//!
//! Linsn RV9 playback daemon.
//!
//! Standalone driver for one Linsn output: loads a TOML config,
//! initialises the output over a raw Ethernet socket (or an in-memory
//! recorder with `--dry-run`) and streams a test pattern at a fixed
//! tick rate until interrupted.

pub mod config;
pub mod pattern;
pub mod service;
