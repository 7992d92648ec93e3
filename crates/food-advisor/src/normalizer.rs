/// Recipe normalizer: maps raw index metadata into [`NormalizedRecipe`].
///
/// Stored records are not uniformly typed (the ingestion source is a loosely cleaned CSV),
/// so each field is coerced with a small tolerance and anything beyond it fails that one
/// record. Failures never abort the rest of the batch.
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde_json::{Map, Value};
use tracing::warn;

use crate::literal::{self, LiteralError};
use crate::model::{fields, NormalizedRecipe, RawRecipeRecord, SkippedRecord};

const CLOCK_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has unexpected type {found}")]
    WrongType { field: &'static str, found: &'static str },

    #[error("field '{field}' is not a number: {value:?}")]
    NotNumeric { field: &'static str, value: String },

    #[error("field '{field}' could not be decoded: {source}")]
    Literal {
        field: &'static str,
        #[source]
        source: LiteralError,
    },

    #[error("field '{0}' is not a mapping")]
    NotMapping(&'static str),
}

/// Normalize every record independently. Failed records are logged and reported, not fatal.
pub fn normalize_all(records: Vec<RawRecipeRecord>) -> (Vec<NormalizedRecipe>, Vec<SkippedRecord>) {
    let mut recipes = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for (position, record) in records.into_iter().enumerate() {
        match normalize_record(position, &record) {
            Ok(recipe) => recipes.push(recipe),
            Err(error) => {
                let name = optional_text(&record, fields::NAME);
                warn!(
                    index = position,
                    name = name.as_deref().unwrap_or("<unnamed>"),
                    error = %error,
                    "skipping recipe that failed to normalize"
                );
                skipped.push(SkippedRecord {
                    position,
                    name,
                    error,
                });
            }
        }
    }

    (recipes, skipped)
}

pub fn normalize_record(
    position: usize,
    record: &RawRecipeRecord,
) -> Result<NormalizedRecipe, NormalizationError> {
    let name = required_text(record, fields::NAME)?.to_string();
    let time = normalize_time(required(record, fields::TIME)?);

    let carbohydrates = carbohydrate_percent(fraction(record, fields::CARBOHYDRATES)?);
    let protein = whole_percent(fraction(record, fields::PROTEINS)?);
    let fat = whole_percent(fraction(record, fields::FAT)?);
    let sugar = whole_percent(fraction(record, fields::SUGAR)?);

    let instructions = split_instructions(required_text(record, fields::INSTRUCTIONS)?);
    let ingredients = decode_ingredients(required(record, fields::INGREDIENTS)?)?;

    Ok(NormalizedRecipe {
        position,
        name,
        time,
        carbohydrates,
        protein,
        fat,
        sugar,
        instructions,
        ingredients,
        category: optional_text(record, fields::CATEGORY),
        calories: record.get(fields::CALORIES).and_then(as_number),
        yields: optional_text(record, fields::YIELDS),
        distance: record.get(fields::DISTANCE).and_then(Value::as_f64),
    })
}

/// Format clock and timestamp values as `H:M`; pass anything else through unchanged.
///
/// Neither part is zero-padded: `0:05` becomes `0:5`, `12:30` stays `12:30`.
pub fn normalize_time(value: &Value) -> Value {
    match value {
        Value::String(s) => match parse_clock(s.trim()) {
            Some(t) => Value::String(format!("{}:{}", t.hour(), t.minute())),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    CLOCK_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(text, f).ok())
        .or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .map(|dt| dt.time())
        })
}

/// Carbohydrate share as a percentage rounded to two decimals, ties to even.
///
/// Ties are judged on the exact value of the percentage, not on its product with 100:
/// `12.345000000000001` rounds up to `12.35`, an exact `0.125` rounds down to `0.12`.
pub fn carbohydrate_percent(fraction: f64) -> f64 {
    let percent = fraction * 100.0;
    let scaled = percent * 100.0;
    // Exact error of the multiplication above.
    let residual = percent.mul_add(100.0, -scaled);
    let floor = scaled.floor();
    let rounded = if scaled - floor == 0.5 && residual != 0.0 {
        if residual > 0.0 { floor + 1.0 } else { floor }
    } else {
        scaled.round_ties_even()
    };
    rounded / 100.0
}

/// Protein, fat and sugar shares as whole percentages, ties to even.
pub fn whole_percent(fraction: f64) -> i64 {
    (fraction * 100.0).round_ties_even() as i64
}

/// Split period-separated instructions into ordered steps.
///
/// Line breaks are removed before splitting and the final split element is dropped: it is
/// the empty remainder after a trailing period, or an unterminated fragment.
pub fn split_instructions(text: &str) -> Vec<String> {
    let joined: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let mut parts: Vec<&str> = joined.split('.').collect();
    parts.pop();
    parts
        .into_iter()
        .map(str::trim)
        .filter(|step| !step.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode the stored ingredient literal into name → quantity text.
pub fn decode_ingredients(value: &Value) -> Result<Map<String, Value>, NormalizationError> {
    let decoded = match value {
        Value::String(s) => literal::decode(s).map_err(|source| NormalizationError::Literal {
            field: fields::INGREDIENTS,
            source,
        })?,
        Value::Object(_) => value.clone(),
        other => {
            return Err(NormalizationError::WrongType {
                field: fields::INGREDIENTS,
                found: type_name(other),
            })
        }
    };

    let Value::Object(map) = decoded else {
        return Err(NormalizationError::NotMapping(fields::INGREDIENTS));
    };
    Ok(map
        .into_iter()
        .map(|(name, quantity)| (name, Value::String(quantity_text(&quantity))))
        .collect())
}

fn quantity_text(quantity: &Value) -> String {
    match quantity {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(quantity_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn required<'a>(record: &'a RawRecipeRecord, field: &'static str) -> Result<&'a Value, NormalizationError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(NormalizationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn required_text<'a>(record: &'a RawRecipeRecord, field: &'static str) -> Result<&'a str, NormalizationError> {
    match required(record, field)? {
        Value::String(s) => Ok(s),
        other => Err(NormalizationError::WrongType {
            field,
            found: type_name(other),
        }),
    }
}

fn optional_text(record: &RawRecipeRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn fraction(record: &RawRecipeRecord, field: &'static str) -> Result<f64, NormalizationError> {
    let value = required(record, field)?;
    as_number(value).ok_or_else(|| NormalizationError::NotNumeric {
        field,
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}

/// Numbers, or strings holding a number.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecipeRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn omelette() -> RawRecipeRecord {
        record(json!({
            "name": "Spinach Omelette",
            "time": "0:15",
            "category": "Breakfast",
            "calories": 220.5,
            "carbohydrates percentage": 0.12345,
            "proteins percentage": 0.2,
            "fat percentage": 0.456,
            "sugar percentage": "0.04",
            "instructions": "Beat the eggs.\nWilt the spinach.\nCook until set.",
            "ingredients": "{'egg': '2', 'spinach': '1 cup', 'salt': None}",
            "yields": "1 omelette",
            "_distance": 0.25
        }))
    }

    #[test]
    fn test_clock_values_drop_leading_zeros() {
        assert_eq!(normalize_time(&json!("0:05")), json!("0:5"));
        assert_eq!(normalize_time(&json!("12:30")), json!("12:30"));
        assert_eq!(normalize_time(&json!("01:45:00")), json!("1:45"));
        assert_eq!(normalize_time(&json!("1900-01-01 00:20:00")), json!("0:20"));
        assert_eq!(normalize_time(&json!("2023-05-01T02:05:00")), json!("2:5"));
    }

    #[test]
    fn test_scalar_times_pass_through() {
        assert_eq!(normalize_time(&json!(20)), json!(20));
        assert_eq!(normalize_time(&json!("PT45M")), json!("PT45M"));
        assert_eq!(normalize_time(&json!("25 minutes")), json!("25 minutes"));
    }

    #[test]
    fn test_percentage_rounding_is_asymmetric() {
        assert_eq!(carbohydrate_percent(0.12345), 12.35);
        assert_eq!(carbohydrate_percent(0.5), 50.0);
        assert_eq!(whole_percent(0.2), 20);
        assert_eq!(whole_percent(0.456), 46);
        assert_eq!(whole_percent(0.0), 0);
    }

    #[test]
    fn test_percentage_ties_round_to_even() {
        assert_eq!(whole_percent(0.125), 12);
        assert_eq!(whole_percent(0.375), 38);
        assert_eq!(whole_percent(0.005), 0);
        assert_eq!(carbohydrate_percent(0.00125), 0.12);
        // Just above or below a tie once scaled, so not a tie at all.
        assert_eq!(carbohydrate_percent(0.12345), 12.35);
        assert_eq!(carbohydrate_percent(0.0012345), 0.12);
    }

    #[test]
    fn test_instructions_drop_final_split_element() {
        assert_eq!(
            split_instructions("Boil water.\nAdd pasta.\nDrain."),
            vec!["Boil water", "Add pasta", "Drain"]
        );
        // Without a trailing period the last step is the dropped fragment.
        assert_eq!(split_instructions("Boil water. Drain"), vec!["Boil water"]);
        assert!(split_instructions("").is_empty());
        assert_eq!(
            split_instructions("Mix..  Bake.\r\n"),
            vec!["Mix", "Bake"]
        );
    }

    #[test]
    fn test_ingredient_literal_decodes_to_mapping() {
        let map = decode_ingredients(&json!("{'salt': '1 tsp', 'egg': '2'}")).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["salt"], json!("1 tsp"));
        assert_eq!(map["egg"], json!("2"));
    }

    #[test]
    fn test_ingredient_quantities_become_text() {
        let map = decode_ingredients(&json!("{'eggs': 2, 'pepper': None, 'herbs': ['basil', 'thyme']}"))
            .unwrap();
        assert_eq!(map["eggs"], json!("2"));
        assert_eq!(map["pepper"], json!(""));
        assert_eq!(map["herbs"], json!("basil, thyme"));
    }

    #[test]
    fn test_ingredient_errors() {
        let err = decode_ingredients(&json!("os.system('ls')")).unwrap_err();
        assert!(matches!(err, NormalizationError::Literal { .. }));

        let err = decode_ingredients(&json!("['salt', 'egg']")).unwrap_err();
        assert!(matches!(err, NormalizationError::NotMapping(_)));

        let err = decode_ingredients(&json!(3)).unwrap_err();
        assert!(matches!(err, NormalizationError::WrongType { found: "number", .. }));
    }

    #[test]
    fn test_normalize_full_record() {
        let recipe = normalize_record(3, &omelette()).unwrap();
        assert_eq!(recipe.position, 3);
        assert_eq!(recipe.name, "Spinach Omelette");
        assert_eq!(recipe.time, json!("0:15"));
        assert_eq!(recipe.carbohydrates, 12.35);
        assert_eq!(recipe.protein, 20);
        assert_eq!(recipe.fat, 46);
        assert_eq!(recipe.sugar, 4);
        assert_eq!(
            recipe.instructions,
            vec!["Beat the eggs", "Wilt the spinach", "Cook until set"]
        );
        let names: Vec<&String> = recipe.ingredients.keys().collect();
        assert_eq!(names, ["egg", "spinach", "salt"]);
        assert_eq!(recipe.category.as_deref(), Some("Breakfast"));
        assert_eq!(recipe.calories, Some(220.5));
        assert_eq!(recipe.yields.as_deref(), Some("1 omelette"));
        assert_eq!(recipe.distance, Some(0.25));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let mut r = omelette();
        r.remove("name");
        assert!(matches!(
            normalize_record(0, &r),
            Err(NormalizationError::MissingField("name"))
        ));

        let mut r = omelette();
        r.insert("fat percentage".to_string(), json!(""));
        assert!(matches!(
            normalize_record(0, &r),
            Err(NormalizationError::NotNumeric { field: "fat percentage", .. })
        ));

        let mut r = omelette();
        r.insert("instructions".to_string(), json!(["a", "b"]));
        assert!(matches!(
            normalize_record(0, &r),
            Err(NormalizationError::WrongType { field: "instructions", found: "array" })
        ));

        let mut r = omelette();
        r.insert("time".to_string(), Value::Null);
        assert!(matches!(
            normalize_record(0, &r),
            Err(NormalizationError::MissingField("time"))
        ));
    }

    #[test]
    fn test_bad_record_does_not_abort_the_rest() {
        let mut broken = omelette();
        broken.insert("name".to_string(), json!("Broken Pie"));
        broken.insert("ingredients".to_string(), json!("{'flour': "));

        let mut second = omelette();
        second.insert("name".to_string(), json!("Second Omelette"));

        let (recipes, skipped) = normalize_all(vec![omelette(), broken, second]);
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].position, 0);
        assert_eq!(recipes[1].position, 2);
        assert_eq!(recipes[1].name, "Second Omelette");

        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].position, 1);
        assert_eq!(skipped[0].name.as_deref(), Some("Broken Pie"));
        assert!(skipped[0].error.to_string().contains("ingredients"));
    }
}
