use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::normalizer::NormalizationError;

/// Field names of the metadata stored alongside each recipe vector.
///
/// Written by the ingestion job and read back by the normalizer.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const TIME: &str = "time";
    pub const CATEGORY: &str = "category";
    pub const KEYWORDS: &str = "keywords";
    pub const INGREDIENTS: &str = "ingredients";
    pub const CALORIES: &str = "calories";
    pub const CARBOHYDRATES: &str = "carbohydrates percentage";
    pub const PROTEINS: &str = "proteins percentage";
    pub const FAT: &str = "fat percentage";
    pub const SUGAR: &str = "sugar percentage";
    pub const INSTRUCTIONS: &str = "instructions";
    pub const YIELDS: &str = "yields";
    /// The recipe description; this is the text that gets embedded.
    pub const TEXT: &str = "text";
    pub const EMBEDDING: &str = "embedding";
    /// Added by LanceDB to search results.
    pub const DISTANCE: &str = "_distance";
}

/// Kind of meal the user is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Dessert,
    Snack,
    Drinks,
}

/// Label used when no meal category was chosen.
pub const UNSELECTED_MEAL: &str = "Select an option";

impl MealCategory {
    pub const ALL: [MealCategory; 6] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
        MealCategory::Dessert,
        MealCategory::Snack,
        MealCategory::Drinks,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MealCategory::Breakfast => "Breakfast",
            MealCategory::Lunch => "Lunch",
            MealCategory::Dinner => "Dinner",
            MealCategory::Dessert => "Dessert",
            MealCategory::Snack => "Snack",
            MealCategory::Drinks => "Drinks",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

/// What the user asked for. Built fresh for each request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceInput {
    /// `None` means the user left the selector on "Select an option".
    pub meal: Option<MealCategory>,
    pub max_preparation_time: NaiveTime,
    /// Comma-separated, possibly empty.
    pub included_ingredients: String,
    /// Comma-separated, possibly empty.
    pub excluded_ingredients: String,
    pub description: String,
}

impl PreferenceInput {
    pub fn meal_label(&self) -> &'static str {
        self.meal.map(MealCategory::label).unwrap_or(UNSELECTED_MEAL)
    }
}

impl Default for PreferenceInput {
    fn default() -> Self {
        Self {
            meal: None,
            max_preparation_time: NaiveTime::MIN,
            included_ingredients: String::new(),
            excluded_ingredients: String::new(),
            description: String::new(),
        }
    }
}

/// Preferences plus the output-format instructions the model must follow.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub preferences: PreferenceInput,
    pub format_instructions: String,
}

/// Stored metadata for one search hit, exactly as the index returned it.
pub type RawRecipeRecord = Map<String, Value>;

/// Display-ready recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecipe {
    /// 0-based position in the search results.
    pub position: usize,
    pub name: String,
    /// "H:M" string for clock values, otherwise the stored value unchanged.
    pub time: Value,
    /// Percentage rounded to two decimals.
    pub carbohydrates: f64,
    pub protein: i64,
    pub fat: i64,
    pub sugar: i64,
    pub instructions: Vec<String>,
    /// Ingredient name to quantity text, in stored order.
    pub ingredients: Map<String, Value>,
    pub category: Option<String>,
    pub calories: Option<f64>,
    pub yields: Option<String>,
    pub distance: Option<f64>,
}

/// A search hit that could not be normalized.
#[derive(Debug)]
pub struct SkippedRecord {
    pub position: usize,
    pub name: Option<String>,
    pub error: NormalizationError,
}

/// Result of one recommendation request.
#[derive(Debug)]
pub struct Recommendation {
    /// The similarity-search query the model produced.
    pub query: String,
    pub recipes: Vec<NormalizedRecipe>,
    pub skipped: Vec<SkippedRecord>,
}

impl Recommendation {
    pub fn has_matches(&self) -> bool {
        !self.recipes.is_empty()
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
