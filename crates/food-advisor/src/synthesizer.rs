/// Query synthesizer: turns user preferences into a similarity-search query request
/// for the language model.
///
/// The prompt interpolates every preference verbatim into a labelled slot and ends with
/// the schema's format instructions. Generation runs at temperature 0.0 so identical
/// preferences produce the same query as far as the provider allows.
use std::sync::Arc;

use tracing::{debug, info};

use crate::llm::{LanguageModel, LlmError};
use crate::model::{PreferenceInput, QueryRequest};
use crate::schema::ResponseSchema;

pub const QUERY_TEMPERATURE: f32 = 0.0;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("language model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("language model returned an empty response")]
    EmptyResponse,
}

/// Render the synthesis prompt for a request.
pub fn render_prompt(request: &QueryRequest) -> String {
    let prefs = &request.preferences;
    format!(
        "You are a food advisor. Your task is to pick from a recipes database the recipe that \
better fits the user preference.

Take your time to understand the following user preferences:
'food category':{food_category}
'maximum preparation time':{preparation_time}
'necessary ingredients':{included_ingredients}
'excluded ingredients':{excluded_ingredients}
'description':{description}

Now take your time to gather those preferences and create a string to perform a similarity \
search on a vector database containing food recipes.
The query must be clear and specific, utilizing relevant features.

{response_format}
",
        food_category = prefs.meal_label(),
        preparation_time = prefs.max_preparation_time,
        included_ingredients = prefs.included_ingredients,
        excluded_ingredients = prefs.excluded_ingredients,
        description = prefs.description,
        response_format = request.format_instructions,
    )
}

pub struct QuerySynthesizer {
    llm: Arc<dyn LanguageModel>,
    schema: ResponseSchema,
}

impl QuerySynthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            schema: ResponseSchema::search_query(),
        }
    }

    /// The schema the model is asked to follow; the parser must use the same one.
    pub fn schema(&self) -> &ResponseSchema {
        &self.schema
    }

    pub fn request(&self, preferences: PreferenceInput) -> QueryRequest {
        QueryRequest {
            preferences,
            format_instructions: self.schema.format_instructions(),
        }
    }

    /// Ask the model for a search query. Returns the raw, unparsed response text.
    pub async fn synthesize(&self, request: &QueryRequest) -> Result<String, SynthesisError> {
        let prompt = render_prompt(request);
        debug!(prompt_len = prompt.len(), "rendered synthesis prompt");

        let response = self.llm.complete(&prompt, QUERY_TEMPERATURE).await?;
        if response.trim().is_empty() {
            return Err(SynthesisError::EmptyResponse);
        }

        info!(
            model = self.llm.model_name(),
            response_len = response.len(),
            "query synthesized"
        );
        Ok(response)
    }
}
