use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values at or above this are treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Look up a dotted path (`"usage.prompt_tokens"`) inside a JSON object tree.
pub fn pluck<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub fn pluck_str(value: &Value, path: &str) -> Option<String> {
    pluck(value, path).and_then(coerce_str)
}

pub fn pluck_i64(value: &Value, path: &str) -> Option<i64> {
    pluck(value, path).and_then(coerce_i64)
}

/// Coerce a string or number into a trimmed, non-empty string.
pub fn coerce_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Normalize an upstream timestamp field: RFC 3339 strings, or integer
/// epoch values (milliseconds when large enough, seconds otherwise).
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(_) => {
            let raw = coerce_i64(value)?;
            let millis = if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
                raw
            } else {
                raw.checked_mul(1000)?
            };
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

pub fn pluck_timestamp(value: &Value, path: &str) -> Option<DateTime<Utc>> {
    pluck(value, path).and_then(|v| coerce_timestamp(v))
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pluck_walks_nested_objects_and_misses_safely() {
        let doc = json!({"usage": {"prompt_tokens": 120}, "model": "m1"});
        assert_eq!(pluck_i64(&doc, "usage.prompt_tokens"), Some(120));
        assert_eq!(pluck_str(&doc, "model").as_deref(), Some("m1"));
        assert!(pluck(&doc, "usage.completion_tokens").is_none());
        assert!(pluck(&doc, "model.deep").is_none());
        assert!(pluck(&json!(null), "anything").is_none());
    }

    #[test]
    fn coercions_accept_both_strings_and_numbers() {
        assert_eq!(coerce_str(&json!(42)).as_deref(), Some("42"));
        assert_eq!(coerce_str(&json!("  x  ")).as_deref(), Some("x"));
        assert!(coerce_str(&json!("   ")).is_none());
        assert!(coerce_str(&json!([1])).is_none());
        assert_eq!(coerce_i64(&json!("17")), Some(17));
        assert_eq!(coerce_i64(&json!(17.9)), Some(17));
        assert_eq!(coerce_f64(&json!("1.5")), Some(1.5));
    }

    #[test]
    fn timestamps_normalize_rfc3339_and_epoch_variants() {
        let iso = coerce_timestamp(&json!("2026-02-23T12:00:00Z")).expect("iso");
        assert_eq!(iso.timestamp(), 1771848000);

        let seconds = coerce_timestamp(&json!(1771848000_i64)).expect("seconds");
        assert_eq!(seconds, iso);

        let millis = coerce_timestamp(&json!(1771848000123_i64)).expect("millis");
        assert_eq!(millis.timestamp_millis(), 1771848000123);

        assert!(coerce_timestamp(&json!("not a date")).is_none());
        assert!(coerce_timestamp(&json!(true)).is_none());
    }

    #[test]
    fn truncation_is_char_boundary_safe() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("héllo wörld", 4), "héll...");
    }
}
