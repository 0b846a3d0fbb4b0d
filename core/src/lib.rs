//! Core of the Harbor task runner: package configuration, the task graph and
//! its execution, the replay cache, and process spawning.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod package;
pub mod runner;

pub use context::{AppContext, DispatcherFactory, RunFlags};
