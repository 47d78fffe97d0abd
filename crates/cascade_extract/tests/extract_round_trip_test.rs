//! Extraction of serialized values embedded in typical model output.

use cascade_extract::{extract, extract_as};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Tagging {
    title: String,
    tags: Vec<String>,
    confidence: f64,
}

fn sample() -> Tagging {
    Tagging {
        title: "Braces {like} these and \"quotes\"".to_string(),
        tags: vec!["rust".to_string(), "[async]".to_string()],
        confidence: 0.75,
    }
}

#[test]
fn value_survives_prose_wrapping() {
    let value = serde_json::to_value(sample()).unwrap();
    let text = format!(
        "Here is the tagging you asked for: {} Let me know if you need more.",
        serde_json::to_string(&value).unwrap()
    );
    assert_eq!(extract(&text), Some(value));
}

#[test]
fn value_survives_markdown_fences() {
    let value = json!([{"id": 1}, {"id": 2, "nested": {"deep": [1, [2, 3]]}}]);
    let text = format!(
        "```json\n{}\n```",
        serde_json::to_string_pretty(&value).unwrap()
    );
    assert_eq!(extract(&text), Some(value));
}

#[test]
fn typed_extraction_from_fenced_response() {
    let text = format!(
        "Sure.\n\n```json\n{}\n```\n",
        serde_json::to_string_pretty(&sample()).unwrap()
    );
    let tagging: Tagging = extract_as(&text).unwrap();
    assert_eq!(tagging, sample());
}

#[test]
fn typed_extraction_rejects_wrong_shape() {
    assert!(extract_as::<Tagging>("{\"title\": 3}").is_none());
}
