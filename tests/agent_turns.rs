mod common;

use chefchat::agents::cook::CookAgent;
use chefchat::agents::finder::{FoodFinderAgent, MAX_TOOL_ROUNDS, TIMEOUT_MESSAGE};
use chefchat::agents::Agent;
use chefchat::models::Recipe;
use chefchat::tools::RecipeStore;
use chefchat::ui::RichContent;
use common::{poi, tool_call, MockChat, MockSearch, RecordingUi, Reply, SearchScript};
use std::sync::Arc;
use tokio::sync::Mutex;

fn sample_recipe(name: &str, category: &str) -> Recipe {
    Recipe {
        id: format!("dish-{}", name),
        name: name.to_string(),
        category: category.to_string(),
        description: format!("{}的家常做法", name),
        ..Default::default()
    }
}

fn cook_with(
    replies: Vec<Reply>,
    dataset: Vec<Recipe>,
) -> (CookAgent, Arc<MockChat>, Arc<Mutex<RecipeStore>>) {
    let chat = Arc::new(MockChat::new(replies));
    let store = Arc::new(Mutex::new(RecipeStore::new(dataset, None, false)));
    let mut agent = CookAgent::new(store.clone(), false);
    agent.init(chat.clone());
    (agent, chat, store)
}

fn finder_with(
    replies: Vec<Reply>,
    searches: Vec<SearchScript>,
) -> (FoodFinderAgent, Arc<MockChat>, Arc<MockSearch>) {
    let chat = Arc::new(MockChat::new(replies));
    let search = Arc::new(MockSearch::new(searches));
    let mut agent = FoodFinderAgent::new(search.clone(), false);
    agent.init(chat.clone());
    (agent, chat, search)
}

fn assistant_messages(agent: &dyn Agent) -> Vec<&chefchat::models::Message> {
    agent
        .history()
        .iter()
        .filter(|m| m.role == "assistant")
        .collect()
}

#[tokio::test]
async fn plain_reply_turn_ends_with_one_assistant_entry() {
    let (mut agent, chat, _) = cook_with(
        vec![Reply::Content("先把豆腐切块焯水。".to_string())],
        Vec::new(),
    );
    let ui = RecordingUi::new();

    agent.handle_message("豆腐要先焯水吗？", &ui).await;

    assert_eq!(chat.call_count(), 1);
    let assistants = assistant_messages(&agent);
    assert_eq!(assistants.len(), 1);
    assert_eq!(
        assistants[0].content.as_deref(),
        Some("先把豆腐切块焯水。")
    );
    // History is system, user, assistant.
    assert_eq!(agent.history().len(), 3);
}

#[tokio::test]
async fn recipe_hit_renders_detail_and_skips_the_synthesis_call() {
    let (mut agent, chat, _) = cook_with(
        vec![Reply::ToolCalls(vec![tool_call(
            "call_1",
            "getRecipe",
            r#"{"dishName": "麻婆豆腐"}"#,
        )])],
        vec![sample_recipe("麻婆豆腐", "荤菜")],
    );
    let ui = RecordingUi::new();

    agent.handle_message("麻婆豆腐怎么做？", &ui).await;

    // One model call only: the rendered card ends the turn.
    assert_eq!(chat.call_count(), 1);
    assert!(ui
        .rich_payloads()
        .iter()
        .any(|rich| matches!(rich, RichContent::Recipe(r) if r.name == "麻婆豆腐")));

    let history = agent.history();
    let last = history.last().unwrap();
    assert_eq!(last.role, "assistant");
    assert!(last.content.as_deref().unwrap().contains("《麻婆豆腐》"));

    // The tool call got exactly one tool-role answer with a matching id.
    let tool_messages: Vec<_> = history.iter().filter(|m| m.role == "tool").collect();
    assert_eq!(tool_messages.len(), 1);
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("call_1"));
}

#[tokio::test]
async fn menu_result_renders_card() {
    let dataset = vec![
        sample_recipe("红烧肉", "荤菜"),
        sample_recipe("清蒸鱼", "水产"),
        sample_recipe("宫保鸡丁", "荤菜"),
        sample_recipe("拍黄瓜", "素菜"),
        sample_recipe("蒜蓉菠菜", "素菜"),
    ];
    let (mut agent, chat, _) = cook_with(
        vec![Reply::ToolCalls(vec![tool_call(
            "call_1",
            "getMenu",
            r#"{"peopleCount": 4}"#,
        )])],
        dataset,
    );
    let ui = RecordingUi::new();

    agent.handle_message("推荐一份4人的菜单", &ui).await;

    assert_eq!(chat.call_count(), 1);
    assert!(ui
        .rich_payloads()
        .iter()
        .any(|rich| matches!(rich, RichContent::Menu(menu) if menu.people_count == 4)));

    let last = agent.history().last().unwrap();
    assert!(last.content.as_deref().unwrap().contains("4人份的菜单"));
}

#[tokio::test]
async fn unknown_recipe_triggers_online_search_and_renders_the_result() {
    let online_payload = r#"这是搜索结果：
```json
{
  "name": "云南小锅米线",
  "description": "酸辣开胃的米线",
  "category": "主食",
  "difficulty": 2,
  "servings": 1,
  "ingredients": [{"name": "米线", "text_quantity": "200克"}],
  "steps": [{"step": 1, "description": "汤底煮开下米线"}],
  "prep_time_minutes": 10,
  "cook_time_minutes": 15
}
```"#;
    let (mut agent, chat, _) = cook_with(
        vec![
            Reply::ToolCalls(vec![tool_call(
                "call_1",
                "getRecipe",
                r#"{"dishName": "云南小锅米线"}"#,
            )]),
            Reply::Content(online_payload.to_string()),
        ],
        Vec::new(),
    );
    let ui = RecordingUi::new();

    agent.handle_message("云南小锅米线怎么做？", &ui).await;

    assert_eq!(chat.call_count(), 2);
    {
        let calls = chat.calls.lock().unwrap();
        // The search sub-call runs with live web search and no tools.
        assert!(calls[1].web_search);
        assert!(!calls[1].has_tools);
        assert_eq!(calls[1].temperature, Some(0.3));
    }

    let rendered = ui.rich_payloads();
    assert!(rendered
        .iter()
        .any(|rich| matches!(rich, RichContent::Recipe(r) if r.name == "云南小锅米线"
            && r.id.starts_with("searched-")
            && r.source_path.as_deref() == Some("online"))));

    let last = agent.history().last().unwrap();
    assert!(last.content.as_deref().unwrap().contains("联网搜索"));
}

#[tokio::test]
async fn failed_online_search_falls_back_to_a_synthesis_call() {
    let (mut agent, chat, _) = cook_with(
        vec![
            Reply::ToolCalls(vec![tool_call(
                "call_1",
                "getRecipe",
                r#"{"dishName": "不存在的菜"}"#,
            )]),
            // The "strict JSON" reply is not valid JSON.
            Reply::Content("抱歉，我找不到这道菜。".to_string()),
            Reply::Content("数据库里没有这道菜，要不要试试别的？".to_string()),
        ],
        Vec::new(),
    );
    let ui = RecordingUi::new();

    agent.handle_message("不存在的菜怎么做？", &ui).await;

    assert_eq!(chat.call_count(), 3);
    let last = agent.history().last().unwrap();
    assert_eq!(last.role, "assistant");
    assert_eq!(
        last.content.as_deref(),
        Some("数据库里没有这道菜，要不要试试别的？")
    );
}

#[tokio::test]
async fn unparsable_tool_arguments_become_an_error_result_not_a_crash() {
    let (mut agent, chat, _) = cook_with(
        vec![
            Reply::ToolCalls(vec![tool_call("call_1", "getRecipe", "{not json")]),
            Reply::Content("我没看懂要查哪道菜。".to_string()),
        ],
        Vec::new(),
    );
    let ui = RecordingUi::new();

    agent.handle_message("随便查一个", &ui).await;

    let history = agent.history();
    let tool_message = history.iter().find(|m| m.role == "tool").unwrap();
    assert!(tool_message.content.as_deref().unwrap().contains("JSON"));

    // Synthesis call still produced the turn's final assistant entry.
    assert_eq!(chat.call_count(), 2);
    assert_eq!(
        history.last().unwrap().content.as_deref(),
        Some("我没看懂要查哪道菜。")
    );
}

#[tokio::test]
async fn nonempty_search_results_render_and_end_the_turn() {
    let (mut agent, chat, search) = finder_with(
        vec![Reply::ToolCalls(vec![tool_call(
            "call_1",
            "searchNearby",
            r#"{"keywords": "火锅"}"#,
        )])],
        vec![SearchScript::Results(vec![poi("老张火锅"), poi("蜀味轩")])],
    );
    let ui = RecordingUi::new();

    agent.handle_message("附近有什么好吃的火锅？", &ui).await;

    assert_eq!(chat.call_count(), 1);
    assert_eq!(search.calls.lock().unwrap().len(), 1);
    assert!(ui
        .rich_payloads()
        .iter()
        .any(|rich| matches!(rich, RichContent::Restaurants(result) if result.pois.len() == 2)));

    let last = agent.history().last().unwrap();
    assert_eq!(last.role, "assistant");
    assert!(last.content.as_deref().unwrap().contains("2"));
}

#[tokio::test]
async fn empty_search_result_reports_and_ends_the_turn() {
    let (mut agent, chat, _) = finder_with(
        vec![Reply::ToolCalls(vec![tool_call(
            "call_1",
            "searchNearby",
            r#"{"keywords": "米其林"}"#,
        )])],
        vec![SearchScript::Empty],
    );
    let ui = RecordingUi::new();

    agent.handle_message("附近有米其林餐厅吗？", &ui).await;

    assert_eq!(chat.call_count(), 1);
    let last = agent.history().last().unwrap();
    assert!(last.content.as_deref().unwrap().contains("没有找到"));
}

#[tokio::test]
async fn search_failure_reports_and_ends_the_turn() {
    let (mut agent, chat, _) = finder_with(
        vec![Reply::ToolCalls(vec![tool_call(
            "call_1",
            "searchNearby",
            "{}",
        )])],
        vec![SearchScript::Fail("无法获取位置信息".to_string())],
    );
    let ui = RecordingUi::new();

    agent.handle_message("附近有什么吃的？", &ui).await;

    assert_eq!(chat.call_count(), 1);
    let last = agent.history().last().unwrap();
    assert!(last.content.as_deref().unwrap().contains("搜索失败"));
}

#[tokio::test]
async fn finder_loop_is_bounded_at_five_rounds() {
    // Every round the model asks for a tool call whose arguments never
    // parse, which is the non-terminal outcome that feeds the loop.
    let replies: Vec<Reply> = (0..10)
        .map(|i| {
            Reply::ToolCalls(vec![tool_call(
                &format!("call_{}", i),
                "searchNearby",
                "{broken",
            )])
        })
        .collect();
    let (mut agent, chat, search) = finder_with(replies, Vec::new());
    let ui = RecordingUi::new();

    agent.handle_message("附近有什么好吃的？", &ui).await;

    // Exactly five model round-trips, then the timeout message.
    assert_eq!(chat.call_count(), MAX_TOOL_ROUNDS);
    assert!(search.calls.lock().unwrap().is_empty());

    let last = agent.history().last().unwrap();
    assert_eq!(last.content.as_deref(), Some(TIMEOUT_MESSAGE));
    assert!(ui.texts().iter().any(|text| text == TIMEOUT_MESSAGE));
}

#[tokio::test]
async fn web_search_stays_off_while_tools_are_offered() {
    let (mut agent, chat, _) = finder_with(
        vec![Reply::Content("想吃点什么口味的？".to_string())],
        Vec::new(),
    );
    let ui = RecordingUi::new();

    agent.handle_message("帮我找个吃饭的地方", &ui).await;

    let calls = chat.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    // Tool-calling is strictly preferred over ad hoc web search.
    assert!(calls[0].has_tools);
    assert!(!calls[0].web_search);
}

#[tokio::test]
async fn model_error_is_reported_through_the_ui_not_thrown() {
    let (mut agent, _, _) = cook_with(vec![Reply::Fail("连接被拒绝".to_string())], Vec::new());
    let ui = RecordingUi::new();

    agent.handle_message("今天吃什么？", &ui).await;

    assert!(ui
        .texts()
        .iter()
        .any(|text| text.starts_with("❌") && text.contains("连接被拒绝")));
}

#[tokio::test]
async fn reset_conversation_returns_to_the_system_prompt_only() {
    let (mut agent, _, _) = cook_with(
        vec![Reply::Content("好的。".to_string())],
        Vec::new(),
    );
    let ui = RecordingUi::new();

    agent.handle_message("你好", &ui).await;
    assert!(agent.history().len() > 1);

    agent.reset_conversation();
    assert_eq!(agent.history().len(), 1);
    assert_eq!(agent.history()[0].role, "system");
}
