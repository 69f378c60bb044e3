mod terminal;

pub use terminal::TerminalUi;

use crate::models::{MenuData, Recipe, SearchResult};

pub type MessageId = String;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    User,
    Bot,
}

/// Structured payloads that get a dedicated view instead of plain text.
#[derive(Clone, Debug)]
pub enum RichContent {
    Menu(MenuData),
    Recipe(Recipe),
    Restaurants(SearchResult),
}

/// The rendering surface as the core sees it. Within one turn, text
/// updates for a message are cumulative: each call replaces the whole
/// text shown so far.
pub trait ChatUi: Send + Sync {
    fn add_message(
        &self,
        role: Role,
        text: &str,
        message_id: Option<&str>,
        rich: Option<&RichContent>,
    ) -> MessageId;

    fn update_message(&self, message_id: &str, text: &str, rich: Option<&RichContent>);

    fn show_suggestions(&self, questions: &[String]);
}
