//! Result normalizer
//!
//! Coerces the loosely-typed JSON a language model returns into the fixed
//! [`ProcessResult`] shape. Missing keys get defaults, scalar list entries are
//! turned into text, and `key_terms` entries are matched against the shapes
//! models actually emit.

use crate::domain::models::{KeyTerm, ProcessResult, DEFAULT_DISCLAIMER};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How unrecognized `key_terms` entries are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Drop them and report the count
    #[default]
    Lenient,
    /// Reject the whole reply
    Strict,
}

impl std::str::FromStr for NormalizeMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(NormalizeMode::Lenient),
            "strict" => Ok(NormalizeMode::Strict),
            other => Err(AppError::Config(format!(
                "Unknown normalize mode: {} (expected lenient or strict)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for NormalizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeMode::Lenient => write!(f, "lenient"),
            NormalizeMode::Strict => write!(f, "strict"),
        }
    }
}

/// A normalized result plus what had to be thrown away to get it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub result: ProcessResult,
    pub dropped_key_terms: usize,
}

/// Recognized shapes of a single `key_terms` entry
#[derive(Debug, PartialEq)]
enum KeyTermShape<'a> {
    /// `{"term": .., "definition": ..}`
    Pair { term: &'a Value, definition: &'a Value },
    /// `["term", "definition", ...]`
    Sequence { term: &'a Value, definition: &'a Value },
    /// `"term"`
    Text(&'a str),
    Unrecognized,
}

impl<'a> KeyTermShape<'a> {
    fn classify(entry: &'a Value) -> Self {
        match entry {
            Value::Object(map) => match (map.get("term"), map.get("definition")) {
                (Some(term), Some(definition)) => KeyTermShape::Pair { term, definition },
                _ => KeyTermShape::Unrecognized,
            },
            Value::Array(items) if items.len() >= 2 => KeyTermShape::Sequence {
                term: &items[0],
                definition: &items[1],
            },
            Value::String(text) => KeyTermShape::Text(text),
            _ => KeyTermShape::Unrecognized,
        }
    }

    fn into_key_term(self) -> Option<KeyTerm> {
        match self {
            KeyTermShape::Pair { term, definition }
            | KeyTermShape::Sequence { term, definition } => {
                Some(KeyTerm::new(coerce_text(term), coerce_text(definition)))
            }
            KeyTermShape::Text(text) => Some(KeyTerm::new(text, "")),
            KeyTermShape::Unrecognized => None,
        }
    }
}

/// Text form of a JSON scalar; containers become compact JSON
pub fn coerce_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Normalizes in lenient mode
pub fn normalize(raw: &Value) -> Result<Normalized> {
    normalize_with_mode(raw, NormalizeMode::Lenient)
}

/// Normalizes a raw model reply into a [`ProcessResult`]
///
/// Non-object input is treated as an empty object. Fails only with
/// [`AppError::SchemaViolation`]: when a field has a type no coercion can fix,
/// or in strict mode when a `key_terms` entry had to be dropped.
pub fn normalize_with_mode(raw: &Value, mode: NormalizeMode) -> Result<Normalized> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let plain_summary = summary_field(fields.get("plain_summary"))?;

    let mut dropped_key_terms = 0;
    let key_terms = sequence_field(fields.get("key_terms"), "key_terms")?
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let term = KeyTermShape::classify(entry).into_key_term();
                    if term.is_none() {
                        dropped_key_terms += 1;
                    }
                    term
                })
                .collect()
        })
        .unwrap_or_default();

    if dropped_key_terms > 0 {
        match mode {
            NormalizeMode::Strict => {
                return Err(AppError::schema_violation(
                    "key_terms",
                    format!("{} entries have an unrecognized shape", dropped_key_terms),
                ));
            }
            NormalizeMode::Lenient => {
                log::warn!(
                    "Dropped {} key_terms entries with an unrecognized shape",
                    dropped_key_terms
                );
            }
        }
    }

    let action_items = text_list(fields.get("action_items"), "action_items")?.unwrap_or_default();
    let red_flags = text_list(fields.get("red_flags"), "red_flags")?.unwrap_or_default();
    // Only a missing key is seeded; an explicit null reads as an empty list
    let disclaimers = match fields.get("disclaimers") {
        None => vec![DEFAULT_DISCLAIMER.to_string()],
        present => text_list(present, "disclaimers")?.unwrap_or_default(),
    };

    Ok(Normalized {
        result: ProcessResult {
            plain_summary,
            key_terms,
            action_items,
            red_flags,
            disclaimers,
        },
        dropped_key_terms,
    })
}

fn summary_field(value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => Ok(coerce_text(v)),
        Some(Value::Array(_)) => Err(AppError::schema_violation(
            "plain_summary",
            "expected text, found an array",
        )),
        Some(Value::Object(_)) => Err(AppError::schema_violation(
            "plain_summary",
            "expected text, found an object",
        )),
    }
}

/// `None` when the key is absent or null
fn sequence_field<'a>(value: Option<&'a Value>, field: &str) -> Result<Option<&'a Vec<Value>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(AppError::schema_violation(
            field,
            format!("expected a list, found {}", type_name(other)),
        )),
    }
}

fn text_list(value: Option<&Value>, field: &str) -> Result<Option<Vec<String>>> {
    Ok(sequence_field(value, field)?.map(|items| items.iter().map(coerce_text).collect()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn result_of(raw: Value) -> ProcessResult {
        normalize(&raw).unwrap().result
    }

    #[test]
    fn test_key_term_mapping_form() {
        let result = result_of(json!({
            "key_terms": [{"term": "BP", "definition": "Blood pressure"}]
        }));
        assert_eq!(result.key_terms, vec![KeyTerm::new("BP", "Blood pressure")]);
    }

    #[test]
    fn test_key_term_list_pair_form() {
        let result = result_of(json!({ "key_terms": [["BP", "Blood pressure", "extra"]] }));
        assert_eq!(result.key_terms, vec![KeyTerm::new("BP", "Blood pressure")]);
    }

    #[test]
    fn test_key_term_bare_string() {
        let result = result_of(json!({ "key_terms": ["BP"] }));
        assert_eq!(result.key_terms, vec![KeyTerm::new("BP", "")]);
    }

    #[test]
    fn test_key_term_unrecognized_is_dropped() {
        let normalized = normalize(&json!({
            "key_terms": [42, ["lonely"], {"term": "no definition"}, null, true]
        }))
        .unwrap();
        assert!(normalized.result.key_terms.is_empty());
        assert_eq!(normalized.dropped_key_terms, 5);
    }

    #[test]
    fn test_key_term_values_are_coerced() {
        let result = result_of(json!({
            "key_terms": [{"term": 7, "definition": null}, [true, 1.5]]
        }));
        assert_eq!(
            result.key_terms,
            vec![KeyTerm::new("7", ""), KeyTerm::new("true", "1.5")]
        );
    }

    #[test]
    fn test_missing_disclaimers_get_default() {
        let result = result_of(json!({ "plain_summary": "ok" }));
        assert_eq!(result.disclaimers, vec![DEFAULT_DISCLAIMER.to_string()]);
    }

    #[test]
    fn test_null_disclaimers_are_empty() {
        let result = result_of(json!({ "disclaimers": null, "action_items": null }));
        assert!(result.disclaimers.is_empty());
        assert!(result.action_items.is_empty());
    }

    #[test]
    fn test_empty_disclaimers_are_kept() {
        let result = result_of(json!({ "disclaimers": [] }));
        assert!(result.disclaimers.is_empty());
    }

    #[test]
    fn test_scalar_list_items_keep_order() {
        let result = result_of(json!({ "action_items": [1, 2.5, true] }));
        assert_eq!(result.action_items, vec!["1", "2.5", "true"]);
    }

    #[test]
    fn test_nested_list_items_become_json_text() {
        let result = result_of(json!({ "red_flags": [{"sign": "fever"}, null] }));
        assert_eq!(result.red_flags, vec![r#"{"sign":"fever"}"#, ""]);
    }

    #[test]
    fn test_non_mapping_input_yields_defaults() {
        for raw in [json!(null), json!("just text"), json!([1, 2]), json!(3)] {
            assert_eq!(result_of(raw), ProcessResult::default());
        }
    }

    #[test]
    fn test_missing_keys_are_filled() {
        let value = serde_json::to_value(result_of(json!({ "red_flags": ["chest pain"] }))).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 5);
        assert!(object["plain_summary"].is_string());
        assert!(object["key_terms"].is_array());
        assert!(object["action_items"].is_array());
        assert_eq!(object["red_flags"], json!(["chest pain"]));
        assert!(object["disclaimers"].is_array());
    }

    #[test]
    fn test_scalar_summary_is_coerced() {
        assert_eq!(result_of(json!({ "plain_summary": 12 })).plain_summary, "12");
        assert_eq!(result_of(json!({ "plain_summary": null })).plain_summary, "");
    }

    #[test]
    fn test_structured_summary_is_a_schema_violation() {
        let err = normalize(&json!({ "plain_summary": {"text": "hi"} })).unwrap_err();
        match err {
            AppError::SchemaViolation { field, .. } => assert_eq!(field, "plain_summary"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_list_sequence_is_a_schema_violation() {
        let err = normalize(&json!({ "action_items": "call your doctor" })).unwrap_err();
        assert!(matches!(err, AppError::SchemaViolation { ref field, .. } if field == "action_items"));
    }

    #[test]
    fn test_strict_mode_rejects_drops() {
        let raw = json!({ "key_terms": ["BP", 42] });
        let err = normalize_with_mode(&raw, NormalizeMode::Strict).unwrap_err();
        assert!(err.to_string().contains("1 entries"));

        let clean = json!({ "key_terms": ["BP"] });
        assert!(normalize_with_mode(&clean, NormalizeMode::Strict).is_ok());
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let result = result_of(json!({ "plain_summary": "s", "confidence": 0.9 }));
        assert_eq!(result.plain_summary, "s");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("STRICT".parse::<NormalizeMode>().unwrap(), NormalizeMode::Strict);
        assert_eq!(" lenient ".parse::<NormalizeMode>().unwrap(), NormalizeMode::Lenient);
        assert!("loose".parse::<NormalizeMode>().is_err());
    }

    fn arb_result() -> impl Strategy<Value = ProcessResult> {
        let text = ".{0,12}";
        (
            text,
            prop::collection::vec((text, text), 0..4),
            prop::collection::vec(text, 0..4),
            prop::collection::vec(text, 0..4),
            prop::collection::vec(text, 0..4),
        )
            .prop_map(|(summary, terms, actions, flags, disclaimers)| ProcessResult {
                plain_summary: summary,
                key_terms: terms.into_iter().map(|(t, d)| KeyTerm::new(t, d)).collect(),
                action_items: actions,
                red_flags: flags,
                disclaimers,
            })
    }

    proptest! {
        #[test]
        fn prop_normalization_is_idempotent(result in arb_result()) {
            let raw = serde_json::to_value(&result).unwrap();
            let once = normalize(&raw).unwrap();
            prop_assert_eq!(&once.result, &result);
            prop_assert_eq!(once.dropped_key_terms, 0);

            let again = normalize(&serde_json::to_value(&once.result).unwrap()).unwrap();
            prop_assert_eq!(again.result, once.result);
        }

        #[test]
        fn prop_any_object_yields_complete_shape(
            summary in prop::option::of(".{0,8}"),
            items in prop::option::of(prop::collection::vec(any::<i64>(), 0..5)),
        ) {
            let mut raw = Map::new();
            if let Some(s) = summary {
                raw.insert("plain_summary".into(), Value::String(s));
            }
            if let Some(items) = &items {
                raw.insert("action_items".into(), json!(items));
            }
            let result = normalize(&Value::Object(raw)).unwrap().result;
            prop_assert_eq!(result.action_items.len(), items.map(|v| v.len()).unwrap_or(0));
            prop_assert_eq!(result.disclaimers, vec![DEFAULT_DISCLAIMER.to_string()]);
        }
    }
}
