#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use harbor_core::error::ExecutorError;
use harbor_core::executor::{Dispatcher, TaskContext};

pub const PACKAGE: &str = include_str!("../fixtures/harbor_package.json");

/// Records the id of every dispatched task; ids listed in `failing` fail.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub calls: Mutex<Vec<String>>,
    pub failing: Vec<String>,
}

impl RecordingDispatcher {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Position of every recorded id, for partial-order assertions.
    pub fn positions(&self) -> HashMap<String, usize> {
        self.calls()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, ctx: &TaskContext, _options: &Value) -> Result<(), ExecutorError> {
        self.calls.lock().unwrap().push(ctx.task.id.clone());
        if self.failing.contains(&ctx.task.id) {
            return Err(ExecutorError::Unsupported(format!("{} fails", ctx.task.id)));
        }
        Ok(())
    }
}

pub fn recorder() -> Arc<RecordingDispatcher> {
    Arc::new(RecordingDispatcher::default())
}
