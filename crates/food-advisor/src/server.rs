/// MCP server for the food advisor.
///
/// Exposes one tool:
/// - `recommend_recipes`: turn meal preferences into ranked recipe recommendations
use std::sync::Arc;

use chrono::NaiveTime;
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::{info, warn};

use crate::model::{MealCategory, NormalizedRecipe, PreferenceInput, Recommendation, UNSELECTED_MEAL};
use crate::pipeline::Recommender;
use crate::render;
use advisor_common::mcp_api::{
    RecipeCard, RecommendRecipesParams, RecommendRecipesResponse, RecommendationOutcome,
    SkippedRecipe,
};

#[derive(Clone)]
pub struct FoodAdvisorServer {
    recommender: Arc<Recommender>,
    tool_router: ToolRouter<FoodAdvisorServer>,
}

impl FoodAdvisorServer {
    pub fn new(recommender: Arc<Recommender>) -> Self {
        Self {
            recommender,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl FoodAdvisorServer {
    #[tool(description = "Recommend recipes for a meal. Give any of: meal (Breakfast, Lunch, Dinner, Dessert, Snack, Drinks), max_preparation_time (H:MM), included_ingredients, excluded_ingredients (comma-separated) and a free-text description. Returns the configured number of ranked recipes with nutrition, ingredients and instructions.")]
    async fn recommend_recipes(
        &self,
        Parameters(params): Parameters<RecommendRecipesParams>,
    ) -> Result<Json<RecommendRecipesResponse>, String> {
        let preferences = preferences_from_params(params)?;
        info!(
            meal = preferences.meal_label(),
            max_time = %preferences.max_preparation_time,
            "recommend_recipes tool invoked"
        );

        let recommendation = self
            .recommender
            .recommend(preferences)
            .await
            .inspect_err(|e| warn!(error = %e, "recommendation failed"))
            .map_err(|e| e.to_string())?;

        Ok(Json(to_response(&recommendation)))
    }
}

/// Validate tool parameters into a `PreferenceInput`. Missing fields take the form defaults.
pub fn preferences_from_params(params: RecommendRecipesParams) -> Result<PreferenceInput, String> {
    let meal = match params.meal.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(label) if label.eq_ignore_ascii_case(UNSELECTED_MEAL) => None,
        Some(label) => Some(MealCategory::from_label(label).ok_or_else(|| {
            let available: Vec<&str> = MealCategory::ALL.iter().map(|c| c.label()).collect();
            format!(
                "unknown meal: '{label}'. Available meals: {}",
                available.join(", ")
            )
        })?),
    };

    let max_preparation_time = match params.max_preparation_time.as_deref().map(str::trim) {
        None | Some("") => NaiveTime::MIN,
        Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| format!("max_preparation_time must look like H:MM, got '{raw}'"))?,
    };

    Ok(PreferenceInput {
        meal,
        max_preparation_time,
        included_ingredients: params.included_ingredients.unwrap_or_default(),
        excluded_ingredients: params.excluded_ingredients.unwrap_or_default(),
        description: params.description.unwrap_or_default(),
    })
}

fn to_response(recommendation: &Recommendation) -> RecommendRecipesResponse {
    RecommendRecipesResponse {
        query: recommendation.query.clone(),
        outcome: if recommendation.has_matches() {
            RecommendationOutcome::Matches
        } else {
            RecommendationOutcome::NoMatches
        },
        recipes: recommendation.recipes.iter().map(to_card).collect(),
        skipped: recommendation
            .skipped
            .iter()
            .map(|s| SkippedRecipe {
                option: s.position + 1,
                name: s.name.clone(),
                reason: s.error.to_string(),
            })
            .collect(),
        markdown: render::render_recommendation(recommendation),
    }
}

fn to_card(recipe: &NormalizedRecipe) -> RecipeCard {
    RecipeCard {
        option: recipe.position + 1,
        name: recipe.name.clone(),
        time: recipe.time.clone(),
        carbohydrates_percent: recipe.carbohydrates,
        protein_percent: recipe.protein,
        fat_percent: recipe.fat,
        sugar_percent: recipe.sugar,
        ingredients: recipe.ingredients.clone(),
        instructions: recipe.instructions.clone(),
        category: recipe.category.clone(),
        calories: recipe.calories,
        yields: recipe.yields.clone(),
        distance: recipe.distance,
    }
}

#[tool_handler]
impl ServerHandler for FoodAdvisorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "food-advisor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Food advisor MCP server. Call recommend_recipes with meal preferences to get up \
                 to {} recipe recommendations from the recipe index. Results come back both as \
                 structured recipes and as ready-to-show markdown; an outcome of no_matches means \
                 the search succeeded but nothing fit.",
                self.recommender.result_count()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SkippedRecord;
    use crate::normalizer::NormalizationError;
    use serde_json::json;

    #[test]
    fn tools_publish_output_schemas() {
        let tools = FoodAdvisorServer::tool_router().list_all();
        let tool = tools
            .iter()
            .find(|t| t.name == "recommend_recipes")
            .unwrap_or_else(|| panic!("missing tool: recommend_recipes"));
        assert!(
            tool.output_schema.is_some(),
            "tool recommend_recipes should publish output_schema"
        );
        let description = tool.description.as_deref().unwrap_or_default();
        assert!(description.contains("configured number of ranked recipes"));
    }

    #[test]
    fn params_default_like_the_form() {
        let prefs = preferences_from_params(RecommendRecipesParams::default()).unwrap();
        assert_eq!(prefs, PreferenceInput::default());
    }

    #[test]
    fn params_are_validated() {
        let prefs = preferences_from_params(RecommendRecipesParams {
            meal: Some("dinner".to_string()),
            max_preparation_time: Some("1:30".to_string()),
            included_ingredients: Some("rice, beans".to_string()),
            excluded_ingredients: None,
            description: Some("comfort food".to_string()),
        })
        .unwrap();
        assert_eq!(prefs.meal, Some(MealCategory::Dinner));
        assert_eq!(prefs.max_preparation_time, NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        assert_eq!(prefs.included_ingredients, "rice, beans");
        assert_eq!(prefs.excluded_ingredients, "");

        let placeholder = preferences_from_params(RecommendRecipesParams {
            meal: Some("Select an option".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(placeholder.meal, None);

        let err = preferences_from_params(RecommendRecipesParams {
            meal: Some("Brunch".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.starts_with("unknown meal: 'Brunch'"));

        let err = preferences_from_params(RecommendRecipesParams {
            max_preparation_time: Some("soon".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.contains("H:MM"));
    }

    #[test]
    fn response_reports_outcome_and_skips() {
        let rec = Recommendation {
            query: "tofu".to_string(),
            recipes: Vec::new(),
            skipped: vec![SkippedRecord {
                position: 2,
                name: Some("Mystery".to_string()),
                error: NormalizationError::MissingField("time"),
            }],
        };
        let response = to_response(&rec);
        assert_eq!(response.outcome, RecommendationOutcome::NoMatches);
        assert!(response.recipes.is_empty());
        assert_eq!(response.skipped[0].option, 3);
        assert_eq!(response.skipped[0].reason, "missing field 'time'");
        assert!(response.markdown.contains(render::NO_MATCHES_MESSAGE));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], json!("no_matches"));
    }
}
