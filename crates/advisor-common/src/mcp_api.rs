use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RecommendRecipesParams {
    /// Kind of meal: Breakfast, Lunch, Dinner, Dessert, Snack or Drinks. Omit for no preference.
    pub meal: Option<String>,
    /// Maximum preparation time you are willing to spend, as "H:MM" (default "0:00").
    pub max_preparation_time: Option<String>,
    /// Comma-separated ingredients the recipe must include.
    pub included_ingredients: Option<String>,
    /// Comma-separated ingredients the recipe must not contain.
    pub excluded_ingredients: Option<String>,
    /// Free-text description of the kind of food you are into.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Matches,
    NoMatches,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecipeCard {
    /// 1-based position in the ranked results.
    pub option: usize,
    pub name: String,
    /// Total time, "H:M" for clock values, otherwise the stored value unchanged.
    pub time: serde_json::Value,
    pub carbohydrates_percent: f64,
    pub protein_percent: i64,
    pub fat_percent: i64,
    pub sugar_percent: i64,
    /// Ingredient name to quantity, in stored order.
    pub ingredients: serde_json::Map<String, serde_json::Value>,
    pub instructions: Vec<String>,
    pub category: Option<String>,
    pub calories: Option<f64>,
    pub yields: Option<String>,
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkippedRecipe {
    /// 1-based position of the record that failed to normalize.
    pub option: usize,
    pub name: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendRecipesResponse {
    /// The similarity-search query synthesized from the preferences.
    pub query: String,
    pub outcome: RecommendationOutcome,
    pub recipes: Vec<RecipeCard>,
    pub skipped: Vec<SkippedRecipe>,
    /// Markdown rendering of the recommendations.
    pub markdown: String,
}
