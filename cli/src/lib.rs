//! harbor-cli library: exposes the command definitions and flows for tests.

pub mod app;
pub mod commands;
