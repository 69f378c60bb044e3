use crate::api::{ChatApi, ChatOptions};
use crate::models::Message;
use colored::*;
use rand::Rng;
use regex::Regex;
use std::sync::Arc;

const SUGGESTION_TEMPERATURE: f32 = 0.8;
const MAX_SUGGESTIONS: usize = 4;

const SYSTEM_PROMPT: &str =
    "你是一个智能问题推荐助手。根据用户的最后一个问题和助手的回答，预测用户接下来最有可能的问题或者回答。";

const REQUEST_PROMPT: &str = "基于上面的对话，生成3-4个我接下来最可能输入的下一句话。要求：
1. 每个问题独立一行
2. 不要编号
3. 问题要简短（10字以内）
4. 问题要与刚才的对话紧密相关
5. 只输出问题，不要其他内容";

const FALLBACK_GROUPS: [[&str; 4]; 3] = [
    ["今天吃什么？", "推荐一份4人的菜单", "麻婆豆腐怎么做？", "有什么快手菜？"],
    ["推荐家常菜", "宫保鸡丁的做法", "有什么凉菜？", "推荐2人菜单"],
    ["今天吃什么？", "有什么汤可以做？", "西红柿炒鸡蛋怎么做？", "推荐素菜"],
];

/// Produces follow-up question chips from only the latest exchange.
/// Deliberately stateless between calls: suggestions stay scoped to the
/// immediate question/answer pair, never the full history.
pub struct SuggestionGenerator {
    client: Option<Arc<dyn ChatApi>>,
}

impl SuggestionGenerator {
    pub fn new() -> Self {
        SuggestionGenerator { client: None }
    }

    pub fn init(&mut self, client: Arc<dyn ChatApi>) {
        self.client = Some(client);
    }

    /// Never fails: any error or empty parse falls back to a canned
    /// suggestion group.
    pub async fn generate(&self, user_message: &str, assistant_message: &str) -> Vec<String> {
        let Some(client) = &self.client else {
            return fallback_suggestions();
        };

        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(user_message),
            Message::assistant(assistant_message),
            Message::user(REQUEST_PROMPT),
        ];

        let result = client
            .send(
                &messages,
                ChatOptions {
                    temperature: Some(SUGGESTION_TEMPERATURE),
                    ..Default::default()
                },
                &mut |_| {},
            )
            .await;

        match result {
            Ok(outcome) => {
                let questions = parse_suggestion_lines(&outcome.content);
                if questions.is_empty() {
                    fallback_suggestions()
                } else {
                    questions
                }
            }
            Err(e) => {
                eprintln!("{}", format!("[suggestions] {}", e).dimmed());
                fallback_suggestions()
            }
        }
    }
}

impl Default for SuggestionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// One candidate per line; numbered or bulleted lines and lines outside
/// the 3..=29 character band are dropped; at most four survive.
pub fn parse_suggestion_lines(content: &str) -> Vec<String> {
    let bullet = Regex::new(r"^[\d\.\-\*]+").unwrap();
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            if line.is_empty() || bullet.is_match(line) {
                return false;
            }
            let length = line.chars().count();
            length > 2 && length < 30
        })
        .map(str::to_string)
        .take(MAX_SUGGESTIONS)
        .collect()
}

pub fn fallback_suggestions() -> Vec<String> {
    let group = FALLBACK_GROUPS[rand::thread_rng().gen_range(0..FALLBACK_GROUPS.len())];
    group.iter().map(|s| s.to_string()).collect()
}
