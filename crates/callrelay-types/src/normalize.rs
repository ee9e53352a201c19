//! Field and response normalization.
//!
//! Each canonical field is filled from an ordered list of candidate keys; the
//! first key holding a non-null value wins. Whole upstream payloads are
//! reduced to a list of raw records by a fixed fallback chain before each
//! record goes through [`normalize_item`].

use serde_json::{Map, Value};

use crate::time::resolve_time;
use crate::{CanonicalCallRecord, PLACEHOLDER};

/// Candidate keys for the record identifier.
pub const ID_KEYS: &[&str] = &["id", "conversation_id", "conversationId", "conversation", "_id"];

/// Candidate keys for the call start time.
pub const TIME_KEYS: &[&str] = &[
    "started_at",
    "created_at",
    "timestamp",
    "call_start_unix",
    "call_start",
    "start_time",
    "time",
];

/// Candidate keys for the caller.
pub const FROM_KEYS: &[&str] = &[
    "from",
    "caller",
    "caller_number",
    "source",
    "from_number",
    "from_name",
];

/// Candidate keys for the callee or agent.
pub const TO_KEYS: &[&str] = &["to", "agent", "callee_number", "destination", "to_name"];

/// Candidate keys for the call length.
pub const DURATION_KEYS: &[&str] = &[
    "duration",
    "length_seconds",
    "call_duration",
    "duration_seconds",
    "length",
];

/// Conventional wrapper keys checked, in order, before any other array field.
pub const LIST_KEYS: &[&str] = &["items", "results", "conversations"];

/// Returns the first candidate value that is present and not `null`.
fn first_present<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| raw.get(*key).filter(|value| !value.is_null()))
}

fn text_or_placeholder(raw: &Map<String, Value>, keys: &[&str]) -> Value {
    first_present(raw, keys)
        .cloned()
        .unwrap_or_else(|| Value::from(PLACEHOLDER))
}

/// Maps one raw upstream record into a [`CanonicalCallRecord`].
///
/// Total over all JSON values: anything that is not an object is treated as
/// an empty record and yields the all-placeholder shape.
pub fn normalize_item(raw: &Value) -> CanonicalCallRecord {
    let empty = Map::new();
    let raw = raw.as_object().unwrap_or(&empty);

    CanonicalCallRecord {
        id: first_present(raw, ID_KEYS).cloned().unwrap_or(Value::Null),
        time: resolve_time(first_present(raw, TIME_KEYS)),
        from: text_or_placeholder(raw, FROM_KEYS),
        to: text_or_placeholder(raw, TO_KEYS),
        duration: text_or_placeholder(raw, DURATION_KEYS),
    }
}

/// Maps an arbitrary upstream payload into an ordered list of records.
///
/// First match wins:
/// 1. falsy payload (`null`, `false`, `0`, `""`): empty list
/// 2. array: every element
/// 3. object with an array under `items`, `results` or `conversations`
/// 4. object with any array-valued field, in document order
/// 5. otherwise the payload itself as a single record
pub fn normalize_response(payload: &Value) -> Vec<CanonicalCallRecord> {
    if is_falsy(payload) {
        return Vec::new();
    }

    match payload {
        Value::Array(items) => normalize_all(items),
        Value::Object(map) => match find_record_list(map) {
            Some(items) => normalize_all(items),
            None => vec![normalize_item(payload)],
        },
        other => vec![normalize_item(other)],
    }
}

fn find_record_list(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    LIST_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array))
        .or_else(|| map.values().find_map(Value::as_array))
}

fn normalize_all(items: &[Value]) -> Vec<CanonicalCallRecord> {
    items.iter().map(normalize_item).collect()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::format_local;
    use chrono::DateTime;
    use serde_json::json;

    #[test]
    fn empty_record_yields_placeholders() {
        let record = normalize_item(&json!({}));
        assert_eq!(record, CanonicalCallRecord::default());
    }

    #[test]
    fn non_object_record_yields_placeholders() {
        assert_eq!(normalize_item(&json!(7)), CanonicalCallRecord::default());
        assert_eq!(normalize_item(&json!("x")), CanonicalCallRecord::default());
        assert_eq!(normalize_item(&Value::Null), CanonicalCallRecord::default());
    }

    #[test]
    fn maps_alternate_field_names() {
        let record = normalize_item(&json!({
            "conversation_id": "abc123",
            "call_start_unix": 1_700_000_000,
            "from_number": "+1555",
            "duration_seconds": 42
        }));

        let expected_time = format_local(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        assert_eq!(
            record,
            CanonicalCallRecord {
                id: json!("abc123"),
                time: expected_time,
                from: json!("+1555"),
                to: json!("-"),
                duration: json!(42),
            }
        );
    }

    #[test]
    fn candidate_priority_is_respected() {
        let record = normalize_item(&json!({
            "_id": "low",
            "id": "high",
            "from_name": "Alice",
            "caller": "+1000",
            "to_name": "Bob",
            "agent": "support-bot",
            "length": 9,
            "duration": "1:30"
        }));

        assert_eq!(record.id, json!("high"));
        assert_eq!(record.from, json!("+1000"));
        assert_eq!(record.to, json!("support-bot"));
        assert_eq!(record.duration, json!("1:30"));
    }

    #[test]
    fn null_values_fall_through_to_next_candidate() {
        let record = normalize_item(&json!({
            "id": null,
            "conversationId": "conv-9",
            "from": null,
            "source": "web",
            "started_at": null,
            "time": "not a date"
        }));

        assert_eq!(record.id, json!("conv-9"));
        assert_eq!(record.from, json!("web"));
        assert_eq!(record.time, "not a date");
    }

    #[test]
    fn numeric_ids_pass_through() {
        let record = normalize_item(&json!({ "id": 17 }));
        assert_eq!(record.id, json!(17));
    }

    #[test]
    fn falsy_payloads_are_empty() {
        assert!(normalize_response(&Value::Null).is_empty());
        assert!(normalize_response(&json!(false)).is_empty());
        assert!(normalize_response(&json!(0)).is_empty());
        assert!(normalize_response(&json!("")).is_empty());
    }

    #[test]
    fn top_level_array_is_mapped() {
        let records = normalize_response(&json!([{ "id": "a" }, { "id": "b" }, {}]));
        let ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b"), Value::Null]);
    }

    #[test]
    fn results_wrapper_is_unwrapped() {
        let records = normalize_response(&json!({ "results": [{ "id": "x" }] }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, json!("x"));
    }

    #[test]
    fn items_wins_over_results() {
        let records = normalize_response(&json!({
            "results": [{ "id": "from-results" }],
            "items": [{ "id": "from-items" }]
        }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, json!("from-items"));
    }

    #[test]
    fn conventional_key_wins_over_earlier_array() {
        let records = normalize_response(&json!({
            "tags": [{ "id": "tag" }],
            "conversations": [{ "id": "c1" }, { "id": "c2" }]
        }));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, json!("c1"));
    }

    #[test]
    fn non_array_conventional_key_is_skipped() {
        let records = normalize_response(&json!({
            "items": "none",
            "data": [{ "id": "d" }]
        }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, json!("d"));
    }

    #[test]
    fn first_array_field_in_document_order_wins() {
        let payload: Value =
            serde_json::from_str(r#"{"meta": {"page": 1}, "zeta": [{"id": "z"}], "alpha": [{"id": "a"}]}"#)
                .unwrap();
        let records = normalize_response(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, json!("z"));
    }

    #[test]
    fn empty_object_is_single_placeholder_record() {
        let records = normalize_response(&json!({}));
        assert_eq!(records, vec![CanonicalCallRecord::default()]);
    }

    #[test]
    fn single_object_is_wrapped() {
        let records = normalize_response(&json!({ "id": "solo", "caller": "+44" }));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, json!("solo"));
        assert_eq!(records[0].from, json!("+44"));
    }

    #[test]
    fn empty_array_wrapper_yields_empty_list() {
        assert!(normalize_response(&json!({ "items": [] })).is_empty());
    }
}
