//! Scripted completion provider for relay tests.

use std::sync::Mutex;

use protocol::{ChatDelta, ChatMessage};
use tokio::sync::mpsc;

use super::types::{CompletionError, Completions};

/// One scripted call outcome.
pub enum ScriptedOutcome {
    /// Stream these deltas, then complete successfully.
    Deltas(Vec<ChatDelta>),
    /// Fail before streaming anything.
    Fail(CompletionError),
}

/// Completion provider that replays a fixed script, recording every
/// transcript it was asked to complete.
pub struct ScriptedCompletions {
    outcomes: Mutex<Vec<ScriptedOutcome>>,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCompletions {
    #[must_use]
    pub fn new(outcomes: Vec<ScriptedOutcome>) -> Self {
        Self { outcomes: Mutex::new(outcomes), calls: Mutex::new(Vec::new()) }
    }

    /// Convenience: one successful call streaming plain text fragments.
    #[must_use]
    pub fn with_text(fragments: &[&str]) -> Self {
        let deltas = fragments
            .iter()
            .map(|text| ChatDelta { content: Some((*text).to_owned()), tool_calls: None })
            .collect();
        Self::new(vec![ScriptedOutcome::Deltas(deltas)])
    }
}

#[async_trait::async_trait]
impl Completions for ScriptedCompletions {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        deltas: mpsc::Sender<ChatDelta>,
    ) -> Result<(), CompletionError> {
        self.calls.lock().unwrap().push(messages);

        let outcome = {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                ScriptedOutcome::Deltas(vec![ChatDelta { content: Some("done".into()), tool_calls: None }])
            } else {
                outcomes.remove(0)
            }
        };

        match outcome {
            ScriptedOutcome::Deltas(script) => {
                for delta in script {
                    if deltas.send(delta).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(())
            }
            ScriptedOutcome::Fail(err) => Err(err),
        }
    }
}
