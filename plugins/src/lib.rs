//! Builtin execution elements for the Harbor task runner and the factory that
//! registers them.

pub mod builtins;
pub mod factory;

pub use factory::{build_registry, BuiltinFactory};
