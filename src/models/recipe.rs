use serde::{Deserialize, Serialize};

/// A recipe as stored in the dataset and exchanged with the model.
///
/// Most fields are optional in the source data, so everything beyond
/// `name` and `category` carries a serde default.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Recipe {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Recipe {
    /// Best display image: explicit image path first, then the gallery.
    pub fn image(&self) -> Option<&str> {
        self.image_path
            .as_deref()
            .or_else(|| self.images.first().map(|s| s.as_str()))
    }
}

fn default_difficulty() -> u8 {
    3
}

fn default_servings() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub text_quantity: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RecipeStep {
    #[serde(default)]
    pub step: u32,
    pub description: String,
}

/// Abbreviated recipe entry returned for fuzzy lookup suggestions.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
}

/// Menu recommendation produced by the `getMenu` tool.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MenuData {
    pub people_count: u32,
    pub dishes: Vec<MenuDish>,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MenuDish {
    pub name: String,
    pub category: String,
    pub difficulty: u8,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
