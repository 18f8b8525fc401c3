//! Scripted text provider for tests.

use super::{ProviderError, TextProvider};
use crate::models::HistoryEntry;
use async_trait::async_trait;
use std::sync::Mutex;

/// Text provider that answers every call with the same canned content and
/// remembers the history it was given.
pub struct MockTextProvider {
    reply: String,
    calls: Mutex<Vec<Vec<HistoryEntry>>>,
}

impl MockTextProvider {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Histories received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<HistoryEntry>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn complete_json(
        &self,
        _system_prompt: &str,
        history: &[HistoryEntry],
    ) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(history.to_vec());
        }
        Ok(self.reply.clone())
    }
}
