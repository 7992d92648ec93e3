/// Recommendation pipeline: synthesize → parse → search → normalize.
///
/// Collaborators are injected as trait objects and built once at startup. Each call runs
/// the whole chain to completion; nothing is carried over between requests.
use std::sync::Arc;

use tracing::info;

use crate::error::RecommendError;
use crate::llm::LanguageModel;
use crate::model::{PreferenceInput, Recommendation};
use crate::normalizer;
use crate::parser;
use crate::search::RecipeIndex;
use crate::synthesizer::QuerySynthesizer;

pub struct Recommender {
    synthesizer: QuerySynthesizer,
    index: Arc<dyn RecipeIndex>,
    result_count: usize,
}

impl Recommender {
    pub fn new(llm: Arc<dyn LanguageModel>, index: Arc<dyn RecipeIndex>, result_count: usize) -> Self {
        Self {
            synthesizer: QuerySynthesizer::new(llm),
            index,
            result_count,
        }
    }

    pub fn result_count(&self) -> usize {
        self.result_count
    }

    /// Produce up to `result_count` recipes for the given preferences.
    ///
    /// An empty result is a successful outcome; records that fail normalization are
    /// reported in `Recommendation::skipped`.
    pub async fn recommend(&self, preferences: PreferenceInput) -> Result<Recommendation, RecommendError> {
        let request = self.synthesizer.request(preferences);
        let response = self.synthesizer.synthesize(&request).await?;
        let query = parser::parse_query(self.synthesizer.schema(), &response)?;
        info!(query = %query, "search query parsed");

        let mut records = self.index.similarity_search(&query, self.result_count).await?;
        records.truncate(self.result_count);

        let (recipes, skipped) = normalizer::normalize_all(records);
        info!(
            recipes = recipes.len(),
            skipped = skipped.len(),
            "recommendation ready"
        );

        Ok(Recommendation {
            query,
            recipes,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveTime;
    use serde_json::{json, Value};

    use super::*;
    use crate::llm::LlmError;
    use crate::model::{MealCategory, RawRecipeRecord};
    use crate::normalizer::NormalizationError;
    use crate::parser::ParseError;
    use crate::search::SearchError;
    use crate::synthesizer::SynthesisError;

    struct StubModel(Result<&'static str, &'static str>);

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String, LlmError> {
            self.0
                .map(str::to_string)
                .map_err(|e| LlmError::RequestFailed(e.to_string()))
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubIndex {
        records: Result<Vec<RawRecipeRecord>, &'static str>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl StubIndex {
        fn returning(records: Vec<RawRecipeRecord>) -> Arc<Self> {
            Arc::new(Self {
                records: Ok(records),
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RecipeIndex for StubIndex {
        async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<RawRecipeRecord>, SearchError> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            self.records
                .clone()
                .map_err(|e| SearchError::Index(e.to_string()))
        }
    }

    const WELL_FORMED: &str =
        "```json\n{\n\t\"query_string\": \"quick light egg breakfast under 15 minutes\"\n}\n```";

    fn recipe(name: &str) -> RawRecipeRecord {
        let Value::Object(map) = json!({
            "name": name,
            "time": "0:10",
            "carbohydrates percentage": 0.1,
            "proteins percentage": 0.3,
            "fat percentage": 0.2,
            "sugar percentage": 0.05,
            "instructions": "Crack eggs.Whisk.Cook.",
            "ingredients": "{'egg': '2'}"
        }) else {
            unreachable!()
        };
        map
    }

    fn breakfast() -> PreferenceInput {
        PreferenceInput {
            meal: Some(MealCategory::Breakfast),
            max_preparation_time: NaiveTime::from_hms_opt(0, 15, 0).unwrap(),
            included_ingredients: "egg".to_string(),
            excluded_ingredients: String::new(),
            description: "quick and light".to_string(),
        }
    }

    #[tokio::test]
    async fn three_hits_give_three_recipes_in_order() {
        let index = StubIndex::returning(vec![recipe("Scramble"), recipe("Frittata"), recipe("Shakshuka")]);
        let recommender = Recommender::new(Arc::new(StubModel(Ok(WELL_FORMED))), index.clone(), 5);

        let rec = recommender.recommend(breakfast()).await.unwrap();

        assert_eq!(rec.query, "quick light egg breakfast under 15 minutes");
        let names: Vec<&str> = rec.recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Scramble", "Frittata", "Shakshuka"]);
        assert!(rec.skipped.is_empty());
        assert!(rec.has_matches());

        let queries = index.queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            [("quick light egg breakfast under 15 minutes".to_string(), 5)]
        );
    }

    #[tokio::test]
    async fn zero_hits_is_an_explicit_no_match() {
        let recommender = Recommender::new(
            Arc::new(StubModel(Ok(WELL_FORMED))),
            StubIndex::returning(Vec::new()),
            5,
        );
        let rec = recommender.recommend(breakfast()).await.unwrap();
        assert!(!rec.has_matches());
        assert!(rec.recipes.is_empty());
    }

    #[tokio::test]
    async fn extra_hits_are_capped_at_result_count() {
        let records = (0..4).map(|i| recipe(&format!("Recipe {i}"))).collect();
        let recommender = Recommender::new(
            Arc::new(StubModel(Ok(WELL_FORMED))),
            StubIndex::returning(records),
            2,
        );
        let rec = recommender.recommend(breakfast()).await.unwrap();
        assert_eq!(rec.recipes.len(), 2);
    }

    #[tokio::test]
    async fn broken_record_is_skipped_not_fatal() {
        let mut broken = recipe("Broken");
        broken.remove("ingredients");
        let recommender = Recommender::new(
            Arc::new(StubModel(Ok(WELL_FORMED))),
            StubIndex::returning(vec![recipe("Good"), broken]),
            5,
        );
        let rec = recommender.recommend(breakfast()).await.unwrap();
        assert_eq!(rec.recipes.len(), 1);
        assert_eq!(rec.skipped.len(), 1);
        assert_eq!(rec.skipped[0].position, 1);
        assert!(matches!(
            rec.skipped[0].error,
            NormalizationError::MissingField("ingredients")
        ));
    }

    #[tokio::test]
    async fn failures_are_distinguished_by_stage() {
        let synthesis = Recommender::new(
            Arc::new(StubModel(Err("timeout"))),
            StubIndex::returning(Vec::new()),
            5,
        )
        .recommend(breakfast())
        .await
        .unwrap_err();
        assert!(matches!(synthesis, RecommendError::Synthesis(SynthesisError::Model(_))));

        let parse = Recommender::new(
            Arc::new(StubModel(Ok("Try a nice omelette!"))),
            StubIndex::returning(Vec::new()),
            5,
        )
        .recommend(breakfast())
        .await
        .unwrap_err();
        assert!(matches!(parse, RecommendError::Parse(ParseError::MissingField { .. })));

        let failing_index = Arc::new(StubIndex {
            records: Err("table not found"),
            queries: Mutex::new(Vec::new()),
        });
        let search = Recommender::new(Arc::new(StubModel(Ok(WELL_FORMED))), failing_index, 5)
            .recommend(breakfast())
            .await
            .unwrap_err();
        assert!(matches!(search, RecommendError::Search(_)));
        assert_eq!(search.to_string(), "recipe search failed: table not found");
    }
}
