//! Scripted `CompletionModel` for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{CallOptions, CompletionModel, LlmError};

pub enum Script {
    Reply(String),
    /// Service-side failure (503).
    Fail,
    /// Never answers; the caller's timeout has to fire.
    Hang,
    /// Waits for the notify, then fails.
    Gate(Arc<Notify>),
}

/// Pops one scripted step per call. An exhausted script behaves like an outage.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Script>>,
    calls: AtomicUsize,
    seen_options: Mutex<Vec<CallOptions>>,
}

impl ScriptedModel {
    pub fn new(steps: impl IntoIterator<Item = Script>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([Script::Reply(text.into())])
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_options(&self) -> Vec<CallOptions> {
        self.seen_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(
        &self,
        _prompt: &str,
        _system: &str,
        options: CallOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_options.lock().unwrap().push(options);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Script::Reply(text)) => Ok(text),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Gate(notify)) => {
                notify.notified().await;
                Err(outage())
            }
            Some(Script::Fail) | None => Err(outage()),
        }
    }
}

fn outage() -> LlmError {
    LlmError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}
