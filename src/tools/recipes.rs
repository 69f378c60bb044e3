use crate::models::{MenuData, MenuDish, Recipe, RecipeSummary};
use colored::*;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const GET_MENU: &str = "getMenu";
pub const GET_RECIPE: &str = "getRecipe";
pub const ADD_RECIPE: &str = "addRecipe";

const DEFAULT_PEOPLE_COUNT: u32 = 4;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetMenuArgs {
    #[serde(default)]
    pub people_count: Option<u32>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetRecipeArgs {
    pub dish_name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddRecipeArgs {
    pub recipe_data: Recipe,
}

/// Outcome of a `getRecipe` lookup.
pub enum RecipeLookup {
    Found(Recipe),
    Suggestions {
        query: String,
        matches: Vec<RecipeSummary>,
    },
    NotFound {
        query: String,
        error: String,
        suggestion: String,
    },
}

impl RecipeLookup {
    /// JSON payload fed back to the model as the tool result.
    pub fn to_tool_value(&self) -> Value {
        match self {
            RecipeLookup::Found(recipe) => json!({
                "success": true,
                "recipe": recipe,
            }),
            RecipeLookup::Suggestions { query, matches } => json!({
                "message": "未找到精确匹配，以下是可能的匹配项：",
                "query": query,
                "possibleMatches": matches,
            }),
            RecipeLookup::NotFound {
                query,
                error,
                suggestion,
            } => json!({
                "error": error,
                "query": query,
                "suggestion": suggestion,
            }),
        }
    }
}

/// Outcome of an `addRecipe` call.
pub enum AddOutcome {
    Added { message: String, recipe: Recipe },
    Rejected { error: String },
}

impl AddOutcome {
    pub fn to_tool_value(&self) -> Value {
        match self {
            AddOutcome::Added { message, recipe } => json!({
                "success": true,
                "message": message,
                "recipe": recipe,
            }),
            AddOutcome::Rejected { error } => json!({
                "success": false,
                "error": error,
            }),
        }
    }
}

/// Recipe library: the bundled dataset merged with user-added recipes.
/// Custom recipes sit in front so they shadow same-name dataset entries,
/// and persist to a JSON file across runs.
pub struct RecipeStore {
    recipes: Vec<Recipe>,
    custom_path: Option<PathBuf>,
    verbose: bool,
}

impl RecipeStore {
    pub fn new(dataset: Vec<Recipe>, custom_path: Option<PathBuf>, verbose: bool) -> Self {
        let custom = custom_path
            .as_deref()
            .map(load_custom_recipes)
            .unwrap_or_default();

        if verbose {
            eprintln!(
                "{}",
                format!(
                    "[tools] Recipe store: {} custom + {} bundled",
                    custom.len(),
                    dataset.len()
                )
                .dimmed()
            );
        }

        let mut recipes = custom;
        recipes.extend(dataset);

        RecipeStore {
            recipes,
            custom_path,
            verbose,
        }
    }

    /// Load the dataset file (JSON array of recipes). A missing or broken
    /// dataset degrades to an empty library with a warning; the chat can
    /// still run, recipe tools just report not-loaded.
    pub fn load(dataset_path: Option<&Path>, custom_path: Option<PathBuf>, verbose: bool) -> Self {
        let dataset = match dataset_path {
            Some(path) => match fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<Vec<Recipe>>(&contents) {
                    Ok(recipes) => recipes,
                    Err(e) => {
                        eprintln!(
                            "{}",
                            format!("Warning: Failed to parse recipe dataset {}: {}", path.display(), e)
                                .yellow()
                        );
                        Vec::new()
                    }
                },
                Err(e) => {
                    eprintln!(
                        "{}",
                        format!("Warning: Failed to read recipe dataset {}: {}", path.display(), e)
                            .yellow()
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Self::new(dataset, custom_path, verbose)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn get_menu(&self, people_count: u32, context: &str) -> MenuData {
        let people_count = if (1..=20).contains(&people_count) {
            people_count
        } else {
            if self.verbose {
                eprintln!(
                    "{}",
                    format!(
                        "[tools] getMenu: people count {} out of range, using {}",
                        people_count, DEFAULT_PEOPLE_COUNT
                    )
                    .dimmed()
                );
            }
            DEFAULT_PEOPLE_COUNT
        };

        if self.recipes.is_empty() {
            return MenuData {
                people_count,
                dishes: Vec::new(),
                message: "⚠️ 菜谱数据未加载，无法推荐菜单".to_string(),
            };
        }

        let preferences = parse_user_preferences(context);
        let vegetable_count = ((people_count + 1) / 2) as usize;
        let meat_count = ((people_count + 2) / 2) as usize;

        let mut meat_dishes: Vec<&Recipe> = self
            .recipes
            .iter()
            .filter(|r| r.category == "荤菜" || r.category == "水产")
            .collect();
        let mut vegetable_dishes: Vec<&Recipe> = self
            .recipes
            .iter()
            .filter(|r| {
                r.category != "荤菜"
                    && r.category != "水产"
                    && r.category != "早餐"
                    && r.category != "主食"
            })
            .collect();

        if !preferences.keywords.is_empty() {
            meat_dishes = filter_dishes_by_preferences(meat_dishes, &preferences);
            vegetable_dishes = filter_dishes_by_preferences(vegetable_dishes, &preferences);
        }

        let mut rng = rand::thread_rng();
        let mut recommended: Vec<&Recipe> = Vec::new();

        // Larger parties get a dedicated fish dish on top of the meat quota.
        let mut fish_dish: Option<&Recipe> = None;
        if people_count > 8 {
            let fish_dishes: Vec<&Recipe> = self
                .recipes
                .iter()
                .filter(|r| r.category == "水产")
                .collect();
            if let Some(&dish) = fish_dishes.choose(&mut rng) {
                fish_dish = Some(dish);
                recommended.push(dish);
            }
        }

        let mut meat_types = ["猪肉", "鸡肉", "牛肉", "羊肉", "鸭肉", "鱼肉"];
        meat_types.shuffle(&mut rng);

        let remaining_meat_count = if fish_dish.is_some() {
            meat_count.saturating_sub(1)
        } else {
            meat_count
        };

        let mut selected_meat: Vec<&Recipe> = Vec::new();
        for meat_type in meat_types {
            if selected_meat.len() >= remaining_meat_count {
                break;
            }
            let candidates: Vec<&Recipe> = meat_dishes
                .iter()
                .copied()
                .filter(|dish| {
                    dish.ingredients
                        .iter()
                        .any(|ingredient| ingredient.name.contains(meat_type))
                })
                .collect();
            if let Some(&dish) = candidates.choose(&mut rng) {
                selected_meat.push(dish);
                meat_dishes.retain(|d| d.id != dish.id || d.name != dish.name);
            }
        }

        while selected_meat.len() < remaining_meat_count && !meat_dishes.is_empty() {
            let index = rng.gen_range(0..meat_dishes.len());
            selected_meat.push(meat_dishes.remove(index));
        }

        let mut selected_vegetables: Vec<&Recipe> = Vec::new();
        while selected_vegetables.len() < vegetable_count && !vegetable_dishes.is_empty() {
            let index = rng.gen_range(0..vegetable_dishes.len());
            selected_vegetables.push(vegetable_dishes.remove(index));
        }

        recommended.extend(selected_meat);
        recommended.extend(selected_vegetables);

        let mut category_counts: Vec<(String, usize)> = Vec::new();
        for dish in &recommended {
            match category_counts.iter_mut().find(|(c, _)| *c == dish.category) {
                Some((_, count)) => *count += 1,
                None => category_counts.push((dish.category.clone(), 1)),
            }
        }
        let category_text = category_counts
            .iter()
            .map(|(category, count)| format!("{}道{}", count, category))
            .collect::<Vec<_>>()
            .join("、");

        MenuData {
            people_count,
            message: format!(
                "为{}人推荐的菜单，包含{}，共{}道菜。",
                people_count,
                category_text,
                recommended.len()
            ),
            dishes: recommended
                .iter()
                .map(|dish| MenuDish {
                    name: dish.name.clone(),
                    category: dish.category.clone(),
                    difficulty: dish.difficulty,
                    description: clean_description(&dish.description),
                    image: dish.image().map(|s| s.to_string()),
                })
                .collect(),
        }
    }

    pub fn get_recipe(&self, dish_name: &str) -> RecipeLookup {
        let dish_name = dish_name.trim();
        if dish_name.is_empty() {
            return RecipeLookup::NotFound {
                query: String::new(),
                error: "菜品名称不能为空".to_string(),
                suggestion: "请提供有效的菜品名称".to_string(),
            };
        }

        if self.recipes.is_empty() {
            return RecipeLookup::NotFound {
                query: dish_name.to_string(),
                error: "菜谱数据未加载".to_string(),
                suggestion: "请稍后重试".to_string(),
            };
        }

        // Exact id, then exact name.
        let mut found = self
            .recipes
            .iter()
            .find(|r| r.id == dish_name)
            .or_else(|| self.recipes.iter().find(|r| r.name == dish_name));

        // Exact match after stripping a "的做法" suffix from both sides.
        let clean_query = dish_name.trim_end_matches("的做法").trim();
        if found.is_none() {
            found = self
                .recipes
                .iter()
                .find(|r| r.name.trim_end_matches("的做法").trim() == clean_query);
        }

        // Fuzzy containment in either direction.
        if found.is_none() {
            let query_lower = dish_name.to_lowercase();
            let clean_lower = clean_query.to_lowercase();
            found = self.recipes.iter().find(|r| {
                let name_lower = r.name.to_lowercase();
                let clean_name = r.name.trim_end_matches("的做法").trim().to_lowercase();
                name_lower.contains(&query_lower)
                    || clean_name.contains(&clean_lower)
                    || clean_lower.contains(&clean_name)
            });
        }

        if let Some(recipe) = found {
            return RecipeLookup::Found(recipe.clone());
        }

        let query_lower = dish_name.to_lowercase();
        let matches: Vec<RecipeSummary> = self
            .recipes
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&query_lower)
                    || r.description.to_lowercase().contains(&query_lower)
            })
            .take(5)
            .map(|r| RecipeSummary {
                id: r.id.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
                category: r.category.clone(),
            })
            .collect();

        if matches.is_empty() {
            RecipeLookup::NotFound {
                query: dish_name.to_string(),
                error: "未找到匹配的菜谱".to_string(),
                suggestion: "请检查菜谱名称是否正确，或尝试使用关键词搜索".to_string(),
            }
        } else {
            RecipeLookup::Suggestions {
                query: dish_name.to_string(),
                matches,
            }
        }
    }

    pub fn add_recipe(&mut self, mut recipe: Recipe) -> AddOutcome {
        if recipe.name.trim().is_empty() {
            return AddOutcome::Rejected {
                error: "菜品名称不能为空".to_string(),
            };
        }
        if recipe.category.trim().is_empty() {
            return AddOutcome::Rejected {
                error: "菜品分类不能为空".to_string(),
            };
        }

        let id = format!(
            "custom-{}-{}",
            chrono::Local::now().timestamp_millis(),
            recipe.name.split_whitespace().collect::<Vec<_>>().join("-")
        );
        recipe.id = id.clone();
        recipe.source_path = Some(format!("custom/{}.md", id));
        if recipe.tags.is_empty() {
            recipe.tags = vec![recipe.category.clone()];
        }
        if recipe.total_time_minutes.is_none() {
            let total =
                recipe.prep_time_minutes.unwrap_or(0) + recipe.cook_time_minutes.unwrap_or(0);
            if total > 0 {
                recipe.total_time_minutes = Some(total);
            }
        }
        recipe.custom = true;
        recipe.created_at = Some(chrono::Local::now().to_rfc3339());

        let updated = match self
            .recipes
            .iter_mut()
            .find(|r| r.custom && r.name == recipe.name)
        {
            Some(existing) => {
                *existing = recipe.clone();
                true
            }
            None => {
                self.recipes.insert(0, recipe.clone());
                false
            }
        };

        if !self.save_custom_recipes() {
            return AddOutcome::Rejected {
                error: "保存菜品失败，请检查存储路径".to_string(),
            };
        }

        AddOutcome::Added {
            message: if updated {
                format!("菜品\"{}\"已更新", recipe.name)
            } else {
                format!("菜品\"{}\"添加成功", recipe.name)
            },
            recipe,
        }
    }

    fn save_custom_recipes(&self) -> bool {
        let Some(path) = &self.custom_path else {
            return true;
        };

        let custom: Vec<&Recipe> = self.recipes.iter().filter(|r| r.custom).collect();
        let payload = match serde_json::to_string_pretty(&custom) {
            Ok(payload) => payload,
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("Warning: Failed to serialize custom recipes: {}", e).yellow()
                );
                return false;
            }
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!(
                    "{}",
                    format!("Warning: Failed to create {}: {}", parent.display(), e).yellow()
                );
                return false;
            }
        }

        match fs::write(path, payload) {
            Ok(()) => {
                if self.verbose {
                    eprintln!(
                        "{}",
                        format!("[tools] Saved {} custom recipes", custom.len()).dimmed()
                    );
                }
                true
            }
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("Warning: Failed to write {}: {}", path.display(), e).yellow()
                );
                false
            }
        }
    }
}

fn load_custom_recipes(path: &Path) -> Vec<Recipe> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<Vec<Recipe>>(&contents) {
            Ok(recipes) => recipes,
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("Warning: Failed to parse custom recipes {}: {}", path.display(), e)
                        .yellow()
                );
                Vec::new()
            }
        },
        // First run: no custom recipe file yet.
        Err(_) => Vec::new(),
    }
}

struct Preferences {
    keywords: Vec<String>,
    categories: Vec<String>,
}

const INGREDIENT_GROUPS: &[(&str, &[&str])] = &[
    ("海鲜", &["虾", "蟹", "鱼", "贝", "蛤", "鲍鱼", "扇贝", "海参", "鱿鱼", "章鱼"]),
    ("水产", &["虾", "蟹", "鱼", "贝", "蛤", "鲍鱼", "扇贝", "海参", "鱿鱼", "章鱼"]),
    ("猪肉", &["猪肉", "五花肉", "里脊", "排骨", "猪蹄", "猪肝"]),
    ("牛肉", &["牛肉", "牛排", "牛腩", "牛柳"]),
    ("鸡肉", &["鸡", "鸡翅", "鸡腿", "鸡胸"]),
    ("羊肉", &["羊肉", "羊排", "羊腿"]),
    ("豆腐", &["豆腐", "豆干", "豆皮"]),
    ("蔬菜", &["青菜", "白菜", "菠菜", "生菜", "芹菜", "西兰花", "菜花"]),
    ("菌菇", &["香菇", "蘑菇", "金针菇", "木耳", "银耳", "平菇"]),
    ("素菜", &["青菜", "白菜", "菠菜", "茄子", "豆腐", "土豆", "萝卜"]),
];

const TASTE_GROUPS: &[(&str, &[&str])] = &[
    ("辣", &["辣", "麻辣", "香辣", "川菜", "湘菜"]),
    ("清淡", &["清淡", "少油", "少盐", "健康"]),
    ("咸", &["咸", "重口"]),
    ("甜", &["甜", "糖醋"]),
    ("酸", &["酸", "醋"]),
    ("鲜", &["鲜", "清鲜"]),
];

const COOKING_METHOD_GROUPS: &[(&str, &[&str])] = &[
    ("炒", &["炒", "快手"]),
    ("蒸", &["蒸", "清蒸"]),
    ("煮", &["煮", "炖", "汤"]),
    ("炸", &["炸", "煎"]),
    ("烤", &["烤", "烧烤"]),
    ("凉拌", &["凉拌", "凉菜"]),
];

/// Extract ingredient/taste/cooking-method hints from a free-form
/// preference description such as "想吃海鲜，清淡一些".
fn parse_user_preferences(context: &str) -> Preferences {
    let mut preferences = Preferences {
        keywords: Vec::new(),
        categories: Vec::new(),
    };
    if context.trim().is_empty() {
        return preferences;
    }
    let context_lower = context.to_lowercase();

    let push_unique = |list: &mut Vec<String>, value: &str| {
        if !list.iter().any(|k| k == value) {
            list.push(value.to_string());
        }
    };

    for (group, items) in INGREDIENT_GROUPS {
        if context_lower.contains(&group.to_lowercase()) {
            for item in *items {
                push_unique(&mut preferences.keywords, item);
            }
            if *group == "海鲜" || *group == "水产" {
                push_unique(&mut preferences.categories, "水产");
            }
        }
    }

    for (group, items) in TASTE_GROUPS {
        if items.iter().any(|taste| context_lower.contains(taste)) {
            push_unique(&mut preferences.keywords, group);
        }
    }

    for (group, items) in COOKING_METHOD_GROUPS {
        if items.iter().any(|method| context_lower.contains(method)) {
            push_unique(&mut preferences.keywords, group);
        }
    }

    preferences
}

/// Score dishes against the parsed preferences and keep the matches,
/// best first. No match at all falls back to the original pool.
fn filter_dishes_by_preferences<'a>(
    dishes: Vec<&'a Recipe>,
    preferences: &Preferences,
) -> Vec<&'a Recipe> {
    if preferences.keywords.is_empty() {
        return dishes;
    }

    let mut scored: Vec<(&Recipe, u32)> = dishes
        .iter()
        .map(|dish| {
            let mut score = 0;
            let dish_text = format!(
                "{} {} {} {}",
                dish.name,
                dish.description,
                dish.category,
                dish.tags.join(" ")
            )
            .to_lowercase();
            let ingredients_text = dish
                .ingredients
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();

            if preferences.categories.iter().any(|c| *c == dish.category) {
                score += 10;
            }

            for keyword in &preferences.keywords {
                let keyword_lower = keyword.to_lowercase();
                if dish_text.contains(&keyword_lower) {
                    score += 5;
                }
                if ingredients_text.contains(&keyword_lower) {
                    score += 8;
                }
                if dish.name.to_lowercase().contains(&keyword_lower) {
                    score += 15;
                }
            }

            (*dish, score)
        })
        .collect();

    let matched: Vec<(&Recipe, u32)> = scored.drain(..).filter(|(_, score)| *score > 0).collect();
    if matched.is_empty() {
        return dishes;
    }

    let mut matched = matched;
    matched.sort_by(|a, b| b.1.cmp(&a.1));
    matched.into_iter().map(|(dish, _)| dish).collect()
}

/// Strip markdown headers, difficulty lines and image links from a
/// dataset description, leaving plain prose for the menu card.
fn clean_description(description: &str) -> String {
    if description.is_empty() {
        return "美味佳肴".to_string();
    }

    let headers = Regex::new(r"(?m)^#+\s+.+$").unwrap();
    let difficulty = Regex::new(r"预估烹饪难度[：:].*").unwrap();
    let stars = Regex::new(r"(?m)^.*[★☆]{2,}.*$").unwrap();
    let images = Regex::new(r"!\[.*?\]\(.*?\)").unwrap();
    let blank_runs = Regex::new(r"\n{3,}").unwrap();

    let cleaned = headers.replace_all(description, "");
    let cleaned = difficulty.replace_all(&cleaned, "");
    let cleaned = stars.replace_all(&cleaned, "");
    let cleaned = images.replace_all(&cleaned, "");
    let cleaned = blank_runs.replace_all(&cleaned, "\n\n");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        "美味佳肴".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Tool schemas advertised to the model alongside the cooking prompt.
pub fn tools_definition() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "function": {
                "name": GET_MENU,
                "description": "根据用餐人数和用户偏好智能推荐荤素搭配的菜品组合，解决用户\"今天吃什么\"的难题。支持根据上下文识别用户的口味偏好（如海鲜、辣、清淡等）进行个性化推荐。",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "peopleCount": {
                            "type": "number",
                            "description": "用餐人数（1-10人），会根据人数推荐合适数量和搭配的菜品"
                        },
                        "context": {
                            "type": "string",
                            "description": "用户的口味偏好或需求描述，例如：\"想吃海鲜\"、\"要辣的菜\"、\"清淡一些\"。应从对话历史中提取用户表达的偏好，没有明确偏好则留空。"
                        }
                    }
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": GET_RECIPE,
                "description": "根据用户提供的菜品或饮品名称，查询并返回详细的制作方法，包括所需食材和步骤。",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "dishName": {
                            "type": "string",
                            "description": "用户想要查询做法的菜品或饮品名称，例如 '麻婆豆腐'、'西红柿炒鸡蛋'。"
                        }
                    },
                    "required": ["dishName"]
                }
            }
        }),
        json!({
            "type": "function",
            "function": {
                "name": ADD_RECIPE,
                "description": "立即添加用户自定义的菜品或饮品配方到菜谱库中并持久保存。当用户说\"添加\"、\"保存\"、\"记录\"等词时，必须调用此工具执行实际操作，而不是只回复确认信息。",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "recipeData": {
                            "type": "object",
                            "description": "菜品数据对象",
                            "properties": {
                                "name": { "type": "string", "description": "菜品名称（必填）" },
                                "category": { "type": "string", "description": "菜品分类（必填），如\"荤菜\"、\"素菜\"、\"汤羹\"、\"主食\"、\"小吃\"、\"饮品\"" },
                                "description": { "type": "string", "description": "菜品描述" },
                                "difficulty": { "type": "number", "description": "难度等级，1-5的整数，默认为3" },
                                "servings": { "type": "number", "description": "份数，默认为1" },
                                "ingredients": {
                                    "type": "array",
                                    "description": "食材列表",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "name": { "type": "string", "description": "食材名称" },
                                            "text_quantity": { "type": "string", "description": "用量描述，如\"100克\"、\"适量\"" }
                                        }
                                    }
                                },
                                "steps": {
                                    "type": "array",
                                    "description": "制作步骤列表",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "step": { "type": "number", "description": "步骤序号" },
                                            "description": { "type": "string", "description": "步骤描述" }
                                        }
                                    }
                                },
                                "prep_time_minutes": { "type": "number", "description": "准备时间（分钟）" },
                                "cook_time_minutes": { "type": "number", "description": "烹饪时间（分钟）" },
                                "additional_notes": {
                                    "type": "array",
                                    "description": "小贴士或注意事项",
                                    "items": { "type": "string" }
                                },
                                "tags": {
                                    "type": "array",
                                    "description": "标签列表，如[\"快手菜\", \"下饭菜\"]",
                                    "items": { "type": "string" }
                                }
                            },
                            "required": ["name", "category"]
                        }
                    },
                    "required": ["recipeData"]
                }
            }
        }),
    ]
}
