//! Markdown rendering of recommendations.
//!
//! One "Option N" section per normalized recipe, however many there are. N is the
//! recipe's 1-based position in the search results, so it matches the structured response.

use std::fmt::Write;

use serde_json::Value;

use crate::model::{NormalizedRecipe, Recommendation};

pub const NO_MATCHES_MESSAGE: &str =
    "No matching recipes were found. Try relaxing the ingredients or the description.";

pub fn render_recommendation(recommendation: &Recommendation) -> String {
    let mut out = String::from("### 🥘 **Recommended Recipes**\n\n");

    if !recommendation.has_matches() {
        out.push_str(NO_MATCHES_MESSAGE);
        out.push('\n');
    }

    for recipe in &recommendation.recipes {
        out.push_str(&render_recipe(recipe.position + 1, recipe));
    }

    if !recommendation.skipped.is_empty() {
        let _ = writeln!(
            out,
            "_{} result(s) could not be displayed._",
            recommendation.skipped.len()
        );
    }
    out
}

pub fn render_recipe(option: usize, recipe: &NormalizedRecipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#### Option {option}\n");
    let _ = writeln!(out, "**{}**\n", recipe.name);
    let _ = writeln!(out, "{}\n", value_text(&recipe.time));
    let _ = writeln!(
        out,
        "| Carbohydrates | Protein | Fat | Sugar |\n|---|---|---|---|\n| {:?}% | {}% | {}% | {}% |\n",
        recipe.carbohydrates, recipe.protein, recipe.fat, recipe.sugar
    );

    out.push_str("**Ingredients**\n\n");
    for (name, quantity) in &recipe.ingredients {
        let _ = writeln!(out, "* {name}: {}", value_text(quantity));
    }

    out.push_str("\n**Instructions**\n\n");
    for step in &recipe.instructions {
        let _ = writeln!(out, "1. {step}.");
    }
    out.push('\n');
    out
}

/// Strings without their JSON quotes, everything else as JSON text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SkippedRecord;
    use crate::normalizer::NormalizationError;
    use serde_json::{json, Map};

    fn recipe_at(position: usize, name: &str) -> NormalizedRecipe {
        NormalizedRecipe {
            position,
            ..recipe(name)
        }
    }

    fn recipe(name: &str) -> NormalizedRecipe {
        let mut ingredients = Map::new();
        ingredients.insert("salt".to_string(), json!("1 tsp"));
        ingredients.insert("egg".to_string(), json!("2"));
        NormalizedRecipe {
            position: 0,
            name: name.to_string(),
            time: json!("0:5"),
            carbohydrates: 12.35,
            protein: 20,
            fat: 7,
            sugar: 1,
            instructions: vec!["Boil water".to_string(), "Add eggs".to_string()],
            ingredients,
            category: None,
            calories: None,
            yields: None,
            distance: None,
        }
    }

    #[test]
    fn renders_one_section_per_recipe() {
        let rec = Recommendation {
            query: "eggs".to_string(),
            recipes: vec![
                recipe_at(0, "Boiled Eggs"),
                recipe_at(1, "Poached Eggs"),
                recipe_at(2, "Deviled Eggs"),
            ],
            skipped: Vec::new(),
        };
        let text = render_recommendation(&rec);
        assert_eq!(text.matches("#### Option").count(), 3);
        assert!(text.contains("#### Option 3\n\n**Deviled Eggs**"));
        assert!(!text.contains("Option 4"));
        assert!(!text.contains(NO_MATCHES_MESSAGE));
    }

    #[test]
    fn renders_metrics_ingredients_and_steps() {
        let text = render_recipe(1, &recipe("Boiled Eggs"));
        assert!(text.contains("0:5\n"));
        assert!(text.contains("| 12.35% | 20% | 7% | 1% |"));
        assert!(text.contains("* salt: 1 tsp\n* egg: 2\n"));
        assert!(text.contains("1. Boil water.\n1. Add eggs.\n"));
    }

    #[test]
    fn options_keep_search_positions_around_skipped_records() {
        let rec = Recommendation {
            query: "eggs".to_string(),
            recipes: vec![recipe_at(1, "Poached Eggs"), recipe_at(2, "Deviled Eggs")],
            skipped: vec![SkippedRecord {
                position: 0,
                name: None,
                error: NormalizationError::MissingField("time"),
            }],
        };
        let text = render_recommendation(&rec);
        assert!(!text.contains("#### Option 1\n"));
        assert!(text.contains("#### Option 2\n\n**Poached Eggs**"));
        assert!(text.contains("#### Option 3\n\n**Deviled Eggs**"));
        assert!(text.contains("_1 result(s) could not be displayed._"));
    }

    #[test]
    fn whole_carbohydrate_percent_keeps_its_decimal() {
        let mut r = recipe("Rice");
        r.carbohydrates = 50.0;
        assert!(render_recipe(1, &r).contains("| 50.0% | 20% | 7% | 1% |"));
    }

    #[test]
    fn numeric_time_is_shown_as_is() {
        let mut r = recipe("Stew");
        r.time = json!(20);
        assert!(render_recipe(1, &r).contains("\n20\n"));
    }

    #[test]
    fn empty_result_says_so() {
        let rec = Recommendation {
            query: "unicorn steak".to_string(),
            recipes: Vec::new(),
            skipped: Vec::new(),
        };
        let text = render_recommendation(&rec);
        assert!(text.contains(NO_MATCHES_MESSAGE));
        assert!(!text.contains("Option"));
    }
}
