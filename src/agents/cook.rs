use crate::agents::{keyword_score, stream_to_ui, Agent, Conversation, MAX_SCORE};
use crate::api::response::extract_json_payload;
use crate::api::{ChatApi, ChatOptions};
use crate::error::Result;
use crate::models::{Message, Recipe, ToolCall};
use crate::tools::recipes::{
    self, AddRecipeArgs, GetMenuArgs, GetRecipeArgs, RecipeLookup,
};
use crate::tools::{parameters_schema, validate_args, RecipeStore};
use crate::ui::{ChatUi, RichContent, Role};
use async_trait::async_trait;
use colored::*;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const AGENT_NAME: &str = "CookAgent";

const SYSTEM_PROMPT: &str = "你是一个专业的烹饪助手，精通各种菜谱和做饭技巧。你的职责包括：
1. 回答关于菜谱、烹饪方法的问题
2. 根据人数和需求推荐菜单
3. 提供详细的烹饪步骤和技巧
4. 帮助用户管理和查询菜品

你可以使用工具来查询菜谱数据库、生成菜单推荐。如果数据库中没有用户需要的菜谱，可以联网搜索。
请保持友好、专业的语气，并尽可能提供详细和实用的建议。";

const KEYWORDS: &[&str] = &[
    "做", "煮", "炒", "蒸", "煎", "炸", "烤", "炖", "煲",
    "菜谱", "菜单", "推荐", "食材", "步骤", "做法", "怎么做",
    "今天吃什么", "吃什么", "菜品", "料理", "烹饪",
];

const KEYWORD_WEIGHT: u32 = 20;
const PATTERN_BONUS: u32 = 30;

/// What the executed tool calls of one turn amounted to, in the fixed
/// priority order the turn handler inspects them.
#[derive(Default)]
struct ToolTurnOutcome {
    menu: Option<crate::models::MenuData>,
    recipe: Option<Recipe>,
    recipe_not_found: Option<String>,
}

pub struct CookAgent {
    client: Option<Arc<dyn ChatApi>>,
    conversation: Conversation,
    store: Arc<Mutex<RecipeStore>>,
    verbose: bool,
}

impl CookAgent {
    pub fn new(store: Arc<Mutex<RecipeStore>>, verbose: bool) -> Self {
        CookAgent {
            client: None,
            conversation: Conversation::new(Some(SYSTEM_PROMPT)),
            store,
            verbose,
        }
    }

    async fn run_turn(&mut self, message: &str, ui: &dyn ChatUi, message_id: &str) -> Result<()> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| crate::error::ChefChatError::Other("Agent not initialized".into()))?;

        self.conversation.push_user(message);

        let outcome = stream_to_ui(
            client.as_ref(),
            self.conversation.messages(),
            ChatOptions {
                tools: Some(recipes::tools_definition()),
                ..Default::default()
            },
            ui,
            message_id,
        )
        .await?;

        let Some(calls) = outcome.tool_calls.filter(|calls| !calls.is_empty()) else {
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

        let results = self.execute_tool_calls(&calls).await;

        if let Some(recipe) = results.recipe {
            ui.update_message(message_id, "", Some(&RichContent::Recipe(recipe.clone())));
            self.conversation
                .push_assistant(&format!("已为用户显示了《{}》的详细做法。", recipe.name));
        } else if let Some(dish_name) = results.recipe_not_found {
            match self
                .search_recipe_online(client.as_ref(), &dish_name, ui, message_id)
                .await
            {
                Some(recipe) => {
                    self.conversation.push_assistant(&format!(
                        "已通过联网搜索找到《{}》的做法并展示给用户。",
                        recipe.name
                    ));
                }
                None => {
                    let final_outcome = stream_to_ui(
                        client.as_ref(),
                        self.conversation.messages(),
                        ChatOptions::default(),
                        ui,
                        message_id,
                    )
                    .await?;
                    self.conversation.push_assistant(&final_outcome.content);
                }
            }
        } else if let Some(menu) = results.menu {
            let summary = format!(
                "已为用户推荐了{}人份的菜单，包含{}道菜。",
                menu.people_count,
                menu.dishes.len()
            );
            ui.update_message(message_id, "", Some(&RichContent::Menu(menu)));
            self.conversation.push_assistant(&summary);
        } else {
            let final_outcome = stream_to_ui(
                client.as_ref(),
                self.conversation.messages(),
                ChatOptions::default(),
                ui,
                message_id,
            )
            .await?;
            self.conversation.push_assistant(&final_outcome.content);
        }

        Ok(())
    }

    /// Execute every pending call in order, pushing one tool-role result
    /// message per call id. Unparsable arguments become an error result,
    /// never a crash.
    async fn execute_tool_calls(&mut self, calls: &[ToolCall]) -> ToolTurnOutcome {
        let mut outcome = ToolTurnOutcome::default();
        let tools = recipes::tools_definition();

        for call in calls {
            let name = call.function.name.as_str();
            if self.verbose {
                eprintln!(
                    "{}",
                    format!("[tools] Executing '{}' ({})", name, call.id).dimmed()
                );
            }

            let result = match parse_arguments(&tools, name, &call.function.arguments) {
                Err(error) => json!({ "error": error }),
                Ok(arguments) => match name {
                    recipes::GET_MENU => {
                        match serde_json::from_value::<GetMenuArgs>(arguments) {
                            Ok(args) => {
                                let menu = self.store.lock().await.get_menu(
                                    args.people_count.unwrap_or(4),
                                    args.context.as_deref().unwrap_or(""),
                                );
                                let value = serde_json::to_value(&menu)
                                    .unwrap_or_else(|_| json!({ "error": "序列化菜单失败" }));
                                outcome.menu = Some(menu);
                                value
                            }
                            Err(e) => json!({ "error": format!("参数解析失败: {}", e) }),
                        }
                    }
                    recipes::GET_RECIPE => {
                        match serde_json::from_value::<GetRecipeArgs>(arguments) {
                            Ok(args) => {
                                let lookup = self.store.lock().await.get_recipe(&args.dish_name);
                                if let RecipeLookup::Found(recipe) = &lookup {
                                    outcome.recipe = Some(recipe.clone());
                                } else if let RecipeLookup::NotFound { .. } = &lookup {
                                    outcome.recipe_not_found = Some(args.dish_name.clone());
                                }
                                lookup.to_tool_value()
                            }
                            Err(e) => json!({ "error": format!("参数解析失败: {}", e) }),
                        }
                    }
                    recipes::ADD_RECIPE => {
                        match serde_json::from_value::<AddRecipeArgs>(arguments) {
                            Ok(args) => self
                                .store
                                .lock()
                                .await
                                .add_recipe(args.recipe_data)
                                .to_tool_value(),
                            Err(e) => json!({ "error": format!("参数解析失败: {}", e) }),
                        }
                    }
                    _ => json!({ "error": format!("未知的工具函数: {}", name) }),
                },
            };

            self.conversation.push_tool(&call.id, name, result.to_string());
        }

        outcome
    }

    /// One-shot live search for a dish the library does not know: ask
    /// for a strict JSON recipe, validate it, render it, and offer to
    /// add it to the library. Failure falls back to the caller.
    async fn search_recipe_online(
        &mut self,
        client: &dyn ChatApi,
        dish_name: &str,
        ui: &dyn ChatUi,
        message_id: &str,
    ) -> Option<Recipe> {
        ui.update_message(message_id, "🔍 正在联网搜索并整理菜品做法...", None);

        let search_messages = vec![
            Message::system("你是一个专业的菜谱助手。请联网搜索用户指定的菜品做法，并严格按照JSON格式返回。"),
            Message::user(format!(
                "请联网搜索\"{}\"的详细做法，并按照以下JSON格式返回（只返回JSON，不要其他内容）：\n\n{}",
                dish_name, RECIPE_JSON_TEMPLATE
            )),
        ];

        let result = client
            .send(
                &search_messages,
                ChatOptions {
                    temperature: Some(0.3),
                    web_search: true,
                    tools: None,
                },
                &mut |_| {},
            )
            .await;

        let content = match result {
            Ok(outcome) => outcome.content,
            Err(e) => {
                eprintln!("{}", format!("[{}] 联网搜索失败: {}", AGENT_NAME, e).dimmed());
                ui.update_message(message_id, &format!("❌ 联网搜索失败：{}", e), None);
                return None;
            }
        };

        match parse_online_recipe(&content, dish_name) {
            Ok(recipe) => {
                ui.update_message(message_id, "", Some(&RichContent::Recipe(recipe.clone())));
                ui.add_message(
                    Role::Bot,
                    &format!(
                        "💡 这是通过联网搜索整理的菜谱，对我说\"把{}加入菜谱库\"就可以保存它。",
                        recipe.name
                    ),
                    None,
                    None,
                );
                Some(recipe)
            }
            Err(e) => {
                eprintln!("{}", format!("[{}] 联网搜索失败: {}", AGENT_NAME, e).dimmed());
                ui.update_message(message_id, &format!("❌ 联网搜索失败：{}", e), None);
                None
            }
        }
    }
}

const RECIPE_JSON_TEMPLATE: &str = r#"{
  "name": "菜品名称",
  "description": "菜品简介（50字左右）",
  "category": "菜品分类（荤菜/素菜/汤羹/主食/小吃/饮品等）",
  "difficulty": 3,
  "servings": 2,
  "ingredients": [{"name": "食材名", "text_quantity": "用量"}],
  "steps": [{"step": 1, "description": "步骤描述"}],
  "prep_time_minutes": 10,
  "cook_time_minutes": 20,
  "additional_notes": ["小贴士1", "小贴士2"]
}"#;

/// Parse the strict-JSON recipe payload an online search produced,
/// tolerating a fenced code block around it.
fn parse_online_recipe(content: &str, dish_name: &str) -> Result<Recipe> {
    let payload = extract_json_payload(content);
    let mut recipe: Recipe = serde_json::from_str(payload)?;

    if recipe.name.trim().is_empty() || recipe.category.trim().is_empty() {
        return Err(crate::error::ChefChatError::ToolError(format!(
            "搜索\"{}\"返回的菜品数据格式不完整",
            dish_name
        )));
    }

    recipe.id = format!("searched-{}", chrono::Local::now().timestamp_millis());
    recipe.source_path = Some("online".to_string());
    if recipe.tags.is_empty() {
        recipe.tags = vec![recipe.category.clone()];
    }
    let total = recipe.prep_time_minutes.unwrap_or(0) + recipe.cook_time_minutes.unwrap_or(0);
    if total > 0 {
        recipe.total_time_minutes = Some(total);
    }

    Ok(recipe)
}

fn parse_arguments(tools: &[Value], name: &str, arguments: &str) -> std::result::Result<Value, String> {
    let value: Value =
        serde_json::from_str(arguments).map_err(|e| format!("参数不是有效的 JSON: {}", e))?;
    if let Some(schema) = parameters_schema(tools, name) {
        validate_args(schema, &value)?;
    }
    Ok(value)
}

#[async_trait]
impl Agent for CookAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "负责处理做饭相关的任务，包括菜谱查询、菜单推荐、菜品管理等"
    }

    fn init(&mut self, client: Arc<dyn ChatApi>) {
        self.client = Some(client);
        self.conversation.reset();
    }

    fn can_handle(&self, message: &str) -> u8 {
        let message_lower = message.to_lowercase();
        let mut score = keyword_score(&message_lower, KEYWORDS, KEYWORD_WEIGHT);

        if Regex::new("怎么做|的做法|食谱|菜谱")
            .unwrap()
            .is_match(&message_lower)
        {
            score += PATTERN_BONUS;
        }
        if Regex::new("推荐.*菜|人.*菜单|今天吃什么")
            .unwrap()
            .is_match(&message_lower)
        {
            score += PATTERN_BONUS;
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
