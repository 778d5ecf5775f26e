//! Tether Bridge library target.
//!
//! The binary entry point is in `main.rs`; the modules live here so
//! `tests/*.rs` can reach them.

pub mod app;
pub mod config;
pub mod keyboard;
pub mod surface;
pub mod util;
