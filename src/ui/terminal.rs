use crate::models::{MenuData, Recipe, SearchResult};
use crate::ui::{ChatUi, MessageId, RichContent, Role};
use colored::*;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Terminal renderer. Streamed updates are cumulative, so each update
/// prints only the suffix that extends the previously shown text; a
/// non-extending update starts a fresh line instead.
pub struct TerminalUi {
    state: Mutex<TerminalState>,
    next_id: AtomicU64,
}

struct TerminalState {
    messages: HashMap<String, String>,
    /// Message currently being streamed onto the open output line.
    open_message: Option<String>,
}

impl TerminalUi {
    pub fn new() -> Self {
        TerminalUi {
            state: Mutex::new(TerminalState {
                messages: HashMap::new(),
                open_message: None,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    fn generate_id(&self) -> String {
        format!(
            "bot-msg-{}-{}",
            chrono::Local::now().timestamp_millis(),
            self.next_id.fetch_add(1, Ordering::Relaxed)
        )
    }

    fn close_open_line(state: &mut TerminalState) {
        if state.open_message.take().is_some() {
            println!();
        }
    }

    fn render_rich(rich: &RichContent) {
        match rich {
            RichContent::Menu(menu) => render_menu(menu),
            RichContent::Recipe(recipe) => render_recipe(recipe),
            RichContent::Restaurants(result) => render_restaurants(result),
        }
    }
}

impl Default for TerminalUi {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatUi for TerminalUi {
    fn add_message(
        &self,
        role: Role,
        text: &str,
        message_id: Option<&str>,
        rich: Option<&RichContent>,
    ) -> MessageId {
        let id = message_id
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.generate_id());

        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Self::close_open_line(&mut state);
        state.messages.insert(id.clone(), text.to_string());

        match role {
            // The user already sees their own input line; just record it.
            Role::User => {}
            Role::Bot => {
                if let Some(rich) = rich {
                    Self::render_rich(rich);
                } else if !text.is_empty() {
                    println!("{} {}", "AI:".cyan().bold(), text);
                }
            }
        }

        id
    }

    fn update_message(&self, message_id: &str, text: &str, rich: Option<&RichContent>) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(rich) = rich {
            Self::close_open_line(&mut state);
            state.messages.insert(message_id.to_string(), String::new());
            Self::render_rich(rich);
            return;
        }

        let previous = state.messages.get(message_id).cloned().unwrap_or_default();
        let streaming_here = state.open_message.as_deref() == Some(message_id);

        if text.is_empty() {
            // Blanked message (e.g. streamed text superseded by tool calls).
            Self::close_open_line(&mut state);
            state.messages.insert(message_id.to_string(), String::new());
            return;
        }

        if streaming_here && text.starts_with(&previous) {
            print!("{}", &text[previous.len()..]);
        } else {
            Self::close_open_line(&mut state);
            print!("{} {}", "AI:".cyan().bold(), text);
        }
        let _ = io::stdout().flush();

        state.open_message = Some(message_id.to_string());
        state.messages.insert(message_id.to_string(), text.to_string());
    }

    fn show_suggestions(&self, questions: &[String]) {
        if questions.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        Self::close_open_line(&mut state);
        println!(
            "{} {}",
            "你可以接着问:".dimmed(),
            questions.join(" · ").dimmed()
        );
    }
}

fn difficulty_stars(difficulty: u8) -> String {
    let level = difficulty.min(5) as usize;
    format!("{}{}", "★".repeat(level), "☆".repeat(5 - level))
}

fn render_menu(menu: &MenuData) {
    println!("{}", menu.message.cyan());
    for (index, dish) in menu.dishes.iter().enumerate() {
        println!(
            "  {}. {} {} {}",
            index + 1,
            dish.name.bold(),
            format!("[{}]", dish.category).dimmed(),
            difficulty_stars(dish.difficulty).yellow()
        );
        if let Some(line) = dish.description.lines().find(|l| !l.trim().is_empty()) {
            println!("     {}", line.trim().dimmed());
        }
    }
}

fn render_recipe(recipe: &Recipe) {
    println!(
        "{} {} {}",
        recipe.name.bold().cyan(),
        format!("[{}]", recipe.category).dimmed(),
        difficulty_stars(recipe.difficulty).yellow()
    );
    if !recipe.description.is_empty() {
        println!("{}", recipe.description.dimmed());
    }

    let mut meta = vec![format!("{}人份", recipe.servings)];
    if let Some(prep) = recipe.prep_time_minutes {
        meta.push(format!("准备 {} 分钟", prep));
    }
    if let Some(cook) = recipe.cook_time_minutes {
        meta.push(format!("烹饪 {} 分钟", cook));
    }
    println!("{}", meta.join(" · ").dimmed());

    if !recipe.ingredients.is_empty() {
        println!("{}", "食材:".bold());
        for ingredient in &recipe.ingredients {
            if ingredient.text_quantity.is_empty() {
                println!("  - {}", ingredient.name);
            } else {
                println!("  - {} {}", ingredient.name, ingredient.text_quantity.dimmed());
            }
        }
    }

    if !recipe.steps.is_empty() {
        println!("{}", "步骤:".bold());
        for (index, step) in recipe.steps.iter().enumerate() {
            let number = if step.step > 0 {
                step.step as usize
            } else {
                index + 1
            };
            println!("  {}. {}", number, step.description);
        }
    }

    if !recipe.additional_notes.is_empty() {
        println!("{}", "小贴士:".bold());
        for note in &recipe.additional_notes {
            println!("  - {}", note.dimmed());
        }
    }
}

fn render_restaurants(result: &SearchResult) {
    println!("{}", result.message.cyan());
    for (index, poi) in result.pois.iter().enumerate() {
        let mut headline = format!("  {}. {}", index + 1, poi.name.bold());
        if !poi.distance.is_empty() {
            headline.push_str(&format!(" {}", format!("({}米)", poi.distance).dimmed()));
        }
        println!("{}", headline);
        if !poi.address.is_empty() {
            println!("     {}", poi.address.dimmed());
        }
        if let Some(business) = &poi.business {
            let mut details = Vec::new();
            if let Some(rating) = business.rating.as_deref().filter(|s| !s.is_empty()) {
                details.push(format!("评分 {}", rating));
            }
            if let Some(cost) = business.cost.as_deref().filter(|s| !s.is_empty()) {
                details.push(format!("人均 ¥{}", cost));
            }
            if let Some(tel) = business.tel.as_deref().filter(|s| !s.is_empty()) {
                details.push(tel.to_string());
            }
            if !details.is_empty() {
                println!("     {}", details.join(" · ").dimmed());
            }
        }
    }
}
