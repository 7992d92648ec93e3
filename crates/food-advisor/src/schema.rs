//! Declared output schema for language-model responses.
//!
//! The same `ResponseSchema` value renders the format instructions appended to the
//! prompt and drives field extraction in [`crate::parser`].

/// Field carrying the similarity-search query.
pub const QUERY_STRING_FIELD: &str = "query_string";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseField {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSchema {
    fields: Vec<ResponseField>,
}

impl ResponseSchema {
    pub fn new(fields: Vec<ResponseField>) -> Self {
        Self { fields }
    }

    /// Schema for the query synthesizer: a single `query_string` field.
    pub fn search_query() -> Self {
        Self::new(vec![ResponseField {
            name: QUERY_STRING_FIELD,
            description: "The string used to query the vector database in order to find the most suitable recipes",
        }])
    }

    pub fn fields(&self) -> &[ResponseField] {
        &self.fields
    }

    /// Instructions telling the model to answer with a fenced JSON object holding every field.
    pub fn format_instructions(&self) -> String {
        let body: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("\t\"{}\": string  // {}", f.name, f.description))
            .collect();
        format!(
            "The output should be a markdown code snippet formatted in the following schema, \
             including the leading and trailing \"```json\" and \"```\":\n\n\
             ```json\n{{\n{}\n}}\n```",
            body.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_instructions_list_every_field() {
        let schema = ResponseSchema::search_query();
        let text = schema.format_instructions();
        assert!(text.starts_with("The output should be a markdown code snippet"));
        assert!(text.contains(
            "\"query_string\": string  // The string used to query the vector database"
        ));
        assert!(text.ends_with("}\n```"));
    }

    #[test]
    fn multiple_fields_get_one_line_each() {
        let schema = ResponseSchema::new(vec![
            ResponseField {
                name: "a",
                description: "first",
            },
            ResponseField {
                name: "b",
                description: "second",
            },
        ]);
        assert!(schema
            .format_instructions()
            .contains("\t\"a\": string  // first\n\t\"b\": string  // second\n}"));
    }
}
