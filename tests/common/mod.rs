#![allow(dead_code)]

use async_trait::async_trait;
use chefchat::api::{ChatApi, ChatOptions, ChatOutcome, StreamEvent};
use chefchat::error::{ChefChatError, Result};
use chefchat::models::{FunctionCall, Message, Poi, SearchResult, ToolCall};
use chefchat::tools::{PoiSearch, SearchNearbyArgs, SearchReply};
use chefchat::ui::{ChatUi, MessageId, RichContent, Role};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One scripted model response for a `MockChat`.
pub enum Reply {
    Content(String),
    ToolCalls(Vec<ToolCall>),
    Fail(String),
}

pub struct RecordedCall {
    pub message_count: usize,
    pub has_tools: bool,
    pub web_search: bool,
    pub temperature: Option<f32>,
    pub last_user: Option<String>,
}

/// Scripted stand-in for the model endpoint: replies are consumed in
/// order, every request is recorded, and running out of script is an
/// error so tests catch unexpected extra round-trips.
pub struct MockChat {
    script: Mutex<VecDeque<Reply>>,
    pub calls: Mutex<Vec<RecordedCall>>,
}

impl MockChat {
    pub fn new(replies: Vec<Reply>) -> Self {
        MockChat {
            script: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatApi for MockChat {
    async fn send(
        &self,
        messages: &[Message],
        options: ChatOptions,
        on_event: &mut (dyn FnMut(StreamEvent<'_>) + Send),
    ) -> Result<ChatOutcome> {
        self.calls.lock().unwrap().push(RecordedCall {
            message_count: messages.len(),
            has_tools: options.tools.is_some(),
            web_search: options.web_search,
            temperature: options.temperature,
            last_user: messages
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .and_then(|m| m.content.clone()),
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Reply::Content(text)) => {
                on_event(StreamEvent::Content(&text));
                Ok(ChatOutcome {
                    content: text,
                    tool_calls: None,
                })
            }
            Some(Reply::ToolCalls(calls)) => {
                on_event(StreamEvent::ToolCallsReady);
                Ok(ChatOutcome {
                    content: String::new(),
                    tool_calls: Some(calls),
                })
            }
            Some(Reply::Fail(message)) => Err(ChefChatError::Other(message)),
            None => Err(ChefChatError::Other("no scripted reply left".to_string())),
        }
    }
}

pub fn tool_call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// Scripted nearby-search collaborator.
pub enum SearchScript {
    Results(Vec<Poi>),
    Empty,
    Fail(String),
}

pub struct MockSearch {
    script: Mutex<VecDeque<SearchScript>>,
    pub calls: Mutex<Vec<SearchNearbyArgs>>,
}

impl MockSearch {
    pub fn new(replies: Vec<SearchScript>) -> Self {
        MockSearch {
            script: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PoiSearch for MockSearch {
    async fn search_nearby(&self, args: SearchNearbyArgs) -> SearchReply {
        self.calls.lock().unwrap().push(args);
        match self.script.lock().unwrap().pop_front() {
            Some(SearchScript::Results(pois)) => SearchReply::Results(SearchResult {
                count: pois.len() as u32,
                message: format!("找到 {} 个附近的地点", pois.len()),
                location: "116.40,39.90".to_string(),
                pois,
            }),
            Some(SearchScript::Empty) => SearchReply::Results(SearchResult {
                count: 0,
                pois: Vec::new(),
                location: "116.40,39.90".to_string(),
                message: "找到 0 个附近的地点".to_string(),
            }),
            Some(SearchScript::Fail(error)) => SearchReply::Failure(error),
            None => SearchReply::Failure("no scripted search reply".to_string()),
        }
    }
}

pub fn poi(name: &str) -> Poi {
    Poi {
        name: name.to_string(),
        address: "某条街 1 号".to_string(),
        distance: "300".to_string(),
        ..Default::default()
    }
}

/// Records every UI interaction for later assertions.
pub enum UiEvent {
    Add {
        id: String,
        role: Role,
        text: String,
        rich: Option<RichContent>,
    },
    Update {
        id: String,
        text: String,
        rich: Option<RichContent>,
    },
    Suggestions(Vec<String>),
}

pub struct RecordingUi {
    pub events: Mutex<Vec<UiEvent>>,
    next_id: AtomicUsize,
}

impl RecordingUi {
    pub fn new() -> Self {
        RecordingUi {
            events: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// The last text set for a message id, through add or update.
    pub fn last_text_for(&self, message_id: &str) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|event| match event {
                UiEvent::Add { id, text, .. } | UiEvent::Update { id, text, .. }
                    if id == message_id =>
                {
                    Some(text.clone())
                }
                _ => None,
            })
    }

    pub fn texts(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                UiEvent::Add { text, .. } | UiEvent::Update { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn rich_payloads(&self) -> Vec<RichContent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                UiEvent::Add { rich, .. } | UiEvent::Update { rich, .. } => rich.clone(),
                _ => None,
            })
            .collect()
    }

    pub fn suggestion_batches(&self) -> Vec<Vec<String>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                UiEvent::Suggestions(questions) => Some(questions.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ChatUi for RecordingUi {
    fn add_message(
        &self,
        role: Role,
        text: &str,
        message_id: Option<&str>,
        rich: Option<&RichContent>,
    ) -> MessageId {
        let id = message_id
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("m{}", self.next_id.fetch_add(1, Ordering::Relaxed)));
        self.events.lock().unwrap().push(UiEvent::Add {
            id: id.clone(),
            role,
            text: text.to_string(),
            rich: rich.cloned(),
        });
        id
    }

    fn update_message(&self, message_id: &str, text: &str, rich: Option<&RichContent>) {
        self.events.lock().unwrap().push(UiEvent::Update {
            id: message_id.to_string(),
            text: text.to_string(),
            rich: rich.cloned(),
        });
    }

    fn show_suggestions(&self, questions: &[String]) {
        self.events
            .lock()
            .unwrap()
            .push(UiEvent::Suggestions(questions.to_vec()));
    }
}
