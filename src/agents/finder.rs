use crate::agents::{keyword_score, stream_to_ui, Agent, Conversation, MAX_SCORE};
use crate::api::{ChatApi, ChatOptions};
use crate::error::Result;
use crate::models::Message;
use crate::tools::amap::{self, PoiSearch, SearchReply};
use crate::ui::{ChatUi, RichContent, Role};
use async_trait::async_trait;
use colored::*;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;

pub const AGENT_NAME: &str = "FoodFinderAgent";

/// Upper bound on model round-trips within one turn. Hitting it ends
/// the turn with a timeout message, not an error.
pub const MAX_TOOL_ROUNDS: usize = 5;

pub const TIMEOUT_MESSAGE: &str = "⏳ 这次查询花的时间太长了，请换个说法再试一次。";

const SYSTEM_PROMPT: &str = "你是一个专业的美食向导，擅长推荐餐厅和美食探店。你的职责包括：
1. 根据用户需求推荐合适的餐厅
2. 提供附近美食、餐馆的信息
3. 介绍特色菜品和餐厅特点
4. 帮助用户做出就餐选择

你会使用附近搜索工具来获取真实的餐厅信息，工具会自动识别用户位置。
请保持友好、热情的语气，并提供实用的就餐建议。";

const KEYWORDS: &[&str] = &[
    "餐厅", "饭店", "馆子", "探店", "附近", "周边",
    "外出吃", "去哪吃", "吃饭的地方", "美食", "小吃",
    "推荐店", "哪里有", "好吃的店", "餐馆",
];

const KEYWORD_WEIGHT: u32 = 25;
const NEARBY_PATTERN_BONUS: u32 = 30;
const DINE_OUT_PATTERN_BONUS: u32 = 25;

pub struct FoodFinderAgent {
    client: Option<Arc<dyn ChatApi>>,
    conversation: Conversation,
    search: Arc<dyn PoiSearch>,
    verbose: bool,
}

impl FoodFinderAgent {
    pub fn new(search: Arc<dyn PoiSearch>, verbose: bool) -> Self {
        FoodFinderAgent {
            client: None,
            conversation: Conversation::new(Some(SYSTEM_PROMPT)),
            search,
            verbose,
        }
    }

    async fn run_turn(&mut self, message: &str, ui: &dyn ChatUi, message_id: &str) -> Result<()> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| crate::error::ChefChatError::Other("Agent not initialized".into()))?;

        self.conversation.push_user(message);

        for round in 0..MAX_TOOL_ROUNDS {
            if self.verbose && round > 0 {
                eprintln!(
                    "{}",
                    format!("[{}] Tool round {}", AGENT_NAME, round + 1).dimmed()
                );
            }

            // Tool-calling is strictly preferred; live web search only
            // steps in when no tool schema is offered at all.
            let tools = Some(amap::tools_definition());
            let options = ChatOptions {
                web_search: tools.is_none(),
                tools,
                temperature: None,
            };

            let outcome = stream_to_ui(
                client.as_ref(),
                self.conversation.messages(),
                options,
                ui,
                message_id,
            )
            .await?;

            let Some(calls) = outcome.tool_calls.filter(|calls| !calls.is_empty()) else {
                // Plain reply: the model is done.
                self.conversation.push_assistant(&outcome.content);
                return Ok(());
            };

            let streamed_content = if outcome.content.is_empty() {
                None
            } else {
                Some(outcome.content)
            };
            self.conversation
                .push_assistant_tool_calls(streamed_content, calls.clone());

            let mut turn_summary: Option<String> = None;

            for call in &calls {
                let name = call.function.name.as_str();
                let result = if name == amap::SEARCH_NEARBY {
                    match amap::parse_search_args(&call.function.arguments) {
                        Ok(args) => {
                            let reply = self.search.search_nearby(args).await;
                            match &reply {
                                SearchReply::Results(result) if !result.pois.is_empty() => {
                                    ui.update_message(
                                        message_id,
                                        "",
                                        Some(&RichContent::Restaurants(result.clone())),
                                    );
                                    turn_summary = Some(format!(
                                        "已为用户展示了附近的 {} 家餐厅。",
                                        result.pois.len()
                                    ));
                                }
                                SearchReply::Results(_) => {
                                    let text =
                                        "附近没有找到合适的地点，可以换个关键词或扩大范围再试试。";
                                    ui.update_message(message_id, text, None);
                                    turn_summary = Some(text.to_string());
                                }
                                SearchReply::Failure(error) => {
                                    let text = format!("❌ 搜索失败：{}", error);
                                    ui.update_message(message_id, &text, None);
                                    turn_summary = Some(text);
                                }
                            }
                            reply.to_tool_value()
                        }
                        // Bad arguments are reported back to the model,
                        // which may retry on the next round.
                        Err(error) => json!({ "error": error }),
                    }
                } else {
                    json!({ "error": format!("未知的工具函数: {}", name) })
                };

                self.conversation.push_tool(&call.id, name, result.to_string());
            }

            if let Some(summary) = turn_summary {
                self.conversation.push_assistant(&summary);
                return Ok(());
            }
        }

        ui.update_message(message_id, TIMEOUT_MESSAGE, None);
        self.conversation.push_assistant(TIMEOUT_MESSAGE);
        Ok(())
    }
}

#[async_trait]
impl Agent for FoodFinderAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "负责处理找美食的任务，包括餐厅推荐、美食探店、附近美食等"
    }

    fn init(&mut self, client: Arc<dyn ChatApi>) {
        self.client = Some(client);
        self.conversation.reset();
    }

    fn can_handle(&self, message: &str) -> u8 {
        let message_lower = message.to_lowercase();
        let mut score = keyword_score(&message_lower, KEYWORDS, KEYWORD_WEIGHT);

        if Regex::new("附近.*(餐厅|好吃)|哪里.*好吃|推荐.*店|去哪.*吃")
            .unwrap()
            .is_match(&message_lower)
        {
            score += NEARBY_PATTERN_BONUS;
        }
        if Regex::new("外出|出去吃|外面吃|下馆子")
            .unwrap()
            .is_match(&message_lower)
        {
            score += DINE_OUT_PATTERN_BONUS;
        }

        score.min(MAX_SCORE as u32) as u8
    }

    async fn handle_message(&mut self, message: &str, ui: &dyn ChatUi) {
        let message_id = ui.add_message(Role::Bot, "", None, None);
        if let Err(e) = self.run_turn(message, ui, &message_id).await {
            eprintln!("{}", format!("[{}] {}", AGENT_NAME, e).dimmed());
            ui.update_message(&message_id, &format!("❌ 发生错误: {}", e), None);
        }
    }

    fn reset_conversation(&mut self) {
        self.conversation.reset();
    }

    fn history(&self) -> &[Message] {
        self.conversation.messages()
    }
}
