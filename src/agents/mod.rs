pub mod cook;
pub mod dispatcher;
pub mod finder;
pub mod suggestion;

pub use dispatcher::AgentDispatcher;
pub use suggestion::SuggestionGenerator;

use crate::api::{ChatApi, ChatOptions, ChatOutcome, StreamEvent};
use crate::error::Result;
use crate::models::{Message, ToolCall};
use crate::ui::ChatUi;
use async_trait::async_trait;
use std::sync::Arc;

pub const MAX_SCORE: u8 = 100;

/// A bounded-context message handler: scores incoming messages, owns its
/// own conversation history, and runs a full turn against the model.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Bind the model client and reset history to its initial state.
    /// Safe to call more than once.
    fn init(&mut self, client: Arc<dyn ChatApi>);

    /// Confidence score in 0..=100 for handling this message. Pure and
    /// synchronous: keyword and pattern matching only.
    fn can_handle(&self, message: &str) -> u8;

    /// Run one turn. All effects go through the UI and this agent's own
    /// history; failures are rendered as chat messages, never raised.
    async fn handle_message(&mut self, message: &str, ui: &dyn ChatUi);

    fn reset_conversation(&mut self);

    fn history(&self) -> &[Message];
}

/// Per-agent conversation history, seeded with an optional system
/// prompt that survives resets.
pub struct Conversation {
    system_prompt: Option<String>,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: Option<&str>) -> Self {
        let mut conversation = Conversation {
            system_prompt: system_prompt.map(|s| s.to_string()),
            messages: Vec::new(),
        };
        conversation.reset();
        conversation
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        if let Some(prompt) = &self.system_prompt {
            self.messages.push(Message::system(prompt.clone()));
        }
    }

    pub fn push_user(&mut self, content: &str) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(Message::assistant(content));
    }

    pub fn push_assistant_tool_calls(&mut self, content: Option<String>, calls: Vec<ToolCall>) {
        self.messages
            .push(Message::assistant_with_tool_calls(content, calls));
    }

    pub fn push_tool(&mut self, call_id: &str, name: &str, content: String) {
        self.messages.push(Message::tool(call_id, name, content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_assistant_content(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "assistant")
            .map(|m| m.content.clone().unwrap_or_default())
    }
}

/// Keyword-table scoring shared by the concrete agents: a fixed weight
/// per matched keyword, clamped to the score ceiling by the caller.
pub(crate) fn keyword_score(message_lower: &str, keywords: &[&str], weight: u32) -> u32 {
    keywords
        .iter()
        .filter(|keyword| message_lower.contains(&keyword.to_lowercase()))
        .count() as u32
        * weight
}

/// Drive one model call, mirroring stream text into the UI message until
/// tool calls are announced; from then on streamed text is superseded
/// and the in-progress message is blanked.
pub(crate) async fn stream_to_ui(
    client: &dyn ChatApi,
    messages: &[Message],
    options: ChatOptions,
    ui: &dyn ChatUi,
    message_id: &str,
) -> Result<ChatOutcome> {
    let mut tool_calls_pending = false;
    client
        .send(messages, options, &mut |event| match event {
            StreamEvent::Content(text) => {
                if !tool_calls_pending {
                    ui.update_message(message_id, text, None);
                }
            }
            StreamEvent::ToolCallsReady => {
                tool_calls_pending = true;
                ui.update_message(message_id, "", None);
            }
        })
        .await
}
