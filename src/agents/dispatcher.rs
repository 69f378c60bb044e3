use crate::agents::{cook, finder, Agent, SuggestionGenerator};
use crate::api::response::extract_json_payload;
use crate::api::{ChatApi, ChatOptions};
use crate::error::{ChefChatError, Result};
use crate::models::Message;
use crate::ui::{ChatUi, Role};
use colored::*;
use serde::Deserialize;
use std::sync::Arc;

/// A scored agent must beat this to be selected over the default.
pub const SELECTION_THRESHOLD: u8 = 30;

pub const CLARIFY_PROMPT: &str = "你是想自己在家做饭，还是想出去吃？";
pub const CLARIFY_OPTION_COOK: &str = "我想自己做饭";
pub const CLARIFY_OPTION_DINE_OUT: &str = "我想出去吃";

/// Intent-disambiguation context kept by the dispatcher; bounded so the
/// classification call stays lightweight.
const DISPATCHER_LOG_LIMIT: usize = 12;

const INTENT_SYSTEM_PROMPT: &str = "你是一个意图识别助手。判断用户消息属于哪类需求：\
cook（自己做饭：查菜谱、推荐菜单、保存菜品等）还是 restaurant（外出就餐：找餐厅、附近美食等）。\
只输出 JSON，格式为 {\"intent\": \"cook\" 或 \"restaurant\" 或 \"unclear\", \"confidence\": 0到1的数字}。\
无法判断时 intent 用 unclear。";

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Cook,
    Restaurant,
    Unclear,
}

#[derive(Deserialize, Debug)]
pub struct IntentVerdict {
    pub intent: Intent,
    #[serde(default)]
    pub confidence: f32,
}

impl IntentVerdict {
    /// Safe default when the classifier cannot be trusted: route to the
    /// cooking domain with zero confidence so scoring takes over.
    fn fallback() -> Self {
        IntentVerdict {
            intent: Intent::Cook,
            confidence: 0.0,
        }
    }
}

pub struct AgentDispatcher {
    agents: Vec<Box<dyn Agent>>,
    suggestions: SuggestionGenerator,
    client: Arc<dyn ChatApi>,
    ui: Arc<dyn ChatUi>,
    current_agent: Option<String>,
    dispatcher_log: Vec<Message>,
    pending_clarification: Option<String>,
    last_user_message: String,
    last_assistant_message: String,
    suggestions_enabled: bool,
    verbose: bool,
}

impl AgentDispatcher {
    /// Binds the client into every registered agent and the suggestion
    /// generator. Registration order matters: it is the tie-break order
    /// for scoring, and the first agent named `CookAgent` (or simply the
    /// first agent) is the default fallback.
    pub fn new(
        mut agents: Vec<Box<dyn Agent>>,
        client: Arc<dyn ChatApi>,
        ui: Arc<dyn ChatUi>,
        suggestions_enabled: bool,
        verbose: bool,
    ) -> Self {
        for agent in agents.iter_mut() {
            agent.init(client.clone());
        }
        let mut suggestions = SuggestionGenerator::new();
        suggestions.init(client.clone());

        AgentDispatcher {
            agents,
            suggestions,
            client,
            ui,
            current_agent: None,
            dispatcher_log: Vec::new(),
            pending_clarification: None,
            last_user_message: String::new(),
            last_assistant_message: String::new(),
            suggestions_enabled,
            verbose,
        }
    }

    /// Top-level entry point for one user turn. Never panics the caller:
    /// any uncaught failure becomes a single error chat message.
    pub async fn dispatch(&mut self, message: &str) {
        if let Err(e) = self.dispatch_inner(message).await {
            eprintln!("{}", format!("[dispatcher] {}", e).dimmed());
            self.ui
                .add_message(Role::Bot, &format!("❌ 系统错误: {}", e), None, None);
        }
    }

    async fn dispatch_inner(&mut self, message: &str) -> Result<()> {
        self.last_user_message = message.to_string();

        // A pending clarification is resolved by the very next turn when
        // it picks one of the offered options; anything else cancels it.
        if let Some(original) = self.pending_clarification.take() {
            if let Some((agent_name, choice)) = clarification_choice(message) {
                self.log_push(Message::user(original.clone()));
                self.log_push(Message::assistant(CLARIFY_PROMPT));
                self.log_push(Message::user(message));
                let canonical = format!("{}（{}）", original, choice);
                self.run_agent(agent_name, &canonical).await?;
                return self.finish_turn().await;
            }
        }

        let verdict = self.classify_intent(message).await;
        if self.verbose {
            eprintln!(
                "{}",
                format!(
                    "[dispatcher] Intent: {:?} ({:.2})",
                    verdict.intent, verdict.confidence
                )
                .dimmed()
            );
        }

        let agent_name = match verdict.intent {
            Intent::Unclear => {
                self.ui.add_message(Role::Bot, CLARIFY_PROMPT, None, None);
                self.ui.show_suggestions(&[
                    CLARIFY_OPTION_COOK.to_string(),
                    CLARIFY_OPTION_DINE_OUT.to_string(),
                ]);
                self.pending_clarification = Some(message.to_string());
                return Ok(());
            }
            Intent::Cook if verdict.confidence > 0.0 => cook::AGENT_NAME.to_string(),
            Intent::Restaurant if verdict.confidence > 0.0 => finder::AGENT_NAME.to_string(),
            // No usable hint: fall back to keyword scoring.
            _ => self.select_agent(message).to_string(),
        };

        self.log_push(Message::user(message));
        self.run_agent(&agent_name, message).await?;
        self.finish_turn().await
    }

    /// Bypass selection and route directly to a named agent. Used for
    /// clarification follow-through and manual routing.
    pub async fn dispatch_to_agent(&mut self, name: &str, message: &str) -> Result<()> {
        self.run_agent(name, message).await
    }

    async fn run_agent(&mut self, name: &str, message: &str) -> Result<()> {
        let ui = self.ui.clone();
        let agent = self
            .agents
            .iter_mut()
            .find(|agent| agent.name() == name)
            .ok_or_else(|| ChefChatError::UnknownAgent(name.to_string()))?;

        self.current_agent = Some(name.to_string());
        agent.handle_message(message, ui.as_ref()).await;
        Ok(())
    }

    /// Post-turn tail: record the agent's reply in the dispatcher log
    /// and surface follow-up suggestions.
    async fn finish_turn(&mut self) -> Result<()> {
        if let Some(name) = self.current_agent.clone() {
            if let Some(agent) = self.agents.iter().find(|agent| agent.name() == name) {
                if let Some(content) = agent
                    .history()
                    .iter()
                    .rev()
                    .find(|m| m.role == "assistant")
                    .map(|m| m.content.clone().unwrap_or_default())
                {
                    self.last_assistant_message = content.clone();
                    self.log_push(Message::assistant(content));
                }
            }
        }

        if self.suggestions_enabled {
            let suggestions = self
                .suggestions
                .generate(&self.last_user_message, &self.last_assistant_message)
                .await;
            self.ui.show_suggestions(&suggestions);
        }

        Ok(())
    }

    /// Keyword-score every agent and take the strict maximum above the
    /// threshold; registration order breaks ties. Below the threshold
    /// the cooking agent is the default.
    pub fn select_agent(&self, message: &str) -> &str {
        let mut scores: Vec<(usize, u8)> = self
            .agents
            .iter()
            .enumerate()
            .map(|(index, agent)| (index, agent.can_handle(message)))
            .collect();
        // Stable sort keeps earlier registration first among equals.
        scores.sort_by(|a, b| b.1.cmp(&a.1));

        if let Some(&(index, score)) = scores.first() {
            if score > SELECTION_THRESHOLD {
                return self.agents[index].name();
            }
        }

        self.agents
            .iter()
            .find(|agent| agent.name() == cook::AGENT_NAME)
            .or_else(|| self.agents.first())
            .map(|agent| agent.name())
            .unwrap_or("")
    }

    /// Lightweight intent classification over the dispatcher log plus
    /// the new message. Any failure collapses to the safe default; the
    /// turn never blocks on the classifier.
    async fn classify_intent(&self, message: &str) -> IntentVerdict {
        let mut messages = vec![Message::system(INTENT_SYSTEM_PROMPT)];
        messages.extend(self.dispatcher_log.iter().cloned());
        messages.push(Message::user(message));

        let result = self
            .client
            .send(
                &messages,
                ChatOptions {
                    temperature: Some(0.1),
                    ..Default::default()
                },
                &mut |_| {},
            )
            .await;

        match result {
            Ok(outcome) => {
                let payload = extract_json_payload(&outcome.content);
                match serde_json::from_str::<IntentVerdict>(payload) {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        if self.verbose {
                            eprintln!(
                                "{}",
                                format!("[dispatcher] Unparseable intent verdict: {}", e).dimmed()
                            );
                        }
                        IntentVerdict::fallback()
                    }
                }
            }
            Err(e) => {
                if self.verbose {
                    eprintln!("{}", format!("[dispatcher] Intent call failed: {}", e).dimmed());
                }
                IntentVerdict::fallback()
            }
        }
    }

    pub fn reset_all_agents(&mut self) {
        for agent in self.agents.iter_mut() {
            agent.reset_conversation();
        }
        self.current_agent = None;
        self.pending_clarification = None;
        self.dispatcher_log.clear();
        self.last_user_message.clear();
        self.last_assistant_message.clear();
    }

    pub fn current_agent(&self) -> Option<&str> {
        self.current_agent.as_deref()
    }

    pub fn agent(&self, name: &str) -> Option<&dyn Agent> {
        self.agents
            .iter()
            .find(|agent| agent.name() == name)
            .map(|agent| agent.as_ref())
    }

    pub fn dispatcher_log(&self) -> &[Message] {
        &self.dispatcher_log
    }

    pub fn has_pending_clarification(&self) -> bool {
        self.pending_clarification.is_some()
    }

    fn log_push(&mut self, message: Message) {
        self.dispatcher_log.push(message);
        if self.dispatcher_log.len() > DISPATCHER_LOG_LIMIT {
            let excess = self.dispatcher_log.len() - DISPATCHER_LOG_LIMIT;
            self.dispatcher_log.drain(..excess);
        }
    }
}

fn clarification_choice(message: &str) -> Option<(&'static str, &'static str)> {
    match message.trim() {
        CLARIFY_OPTION_COOK => Some((cook::AGENT_NAME, CLARIFY_OPTION_COOK)),
        CLARIFY_OPTION_DINE_OUT => Some((finder::AGENT_NAME, CLARIFY_OPTION_DINE_OUT)),
        _ => None,
    }
}
