//! Tolerant column resolution.
//!
//! Tables in this database have been written under several naming
//! conventions over their lifetime (camelCase, snake_case, all-lowercase)
//! and some columns exist only in older rows. List reads therefore select
//! `to_jsonb(row)` and resolve each logical field here through a fixed
//! alias priority list: canonical name first, then each historical alias,
//! first usable value wins. All alias knowledge lives in this layer and
//! in the repo modules that call it - never in handlers.

use serde_json::Value;

pub struct RawRow {
    obj: serde_json::Map<String, Value>,
}

impl RawRow {
    pub fn new(value: Value) -> Self {
        let obj = match value {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self { obj }
    }

    /// First non-null value under any of the aliases, in priority order.
    pub fn value(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|k| self.obj.get(*k))
            .find(|v| !v.is_null())
    }

    /// First non-empty textual value. Numbers and booleans are rendered as
    /// text, matching what `->>'col'` would have produced in SQL.
    pub fn text(&self, aliases: &[&str]) -> String {
        for key in aliases {
            match self.obj.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Number(n)) => return n.to_string(),
                Some(Value::Bool(b)) => return b.to_string(),
                _ => continue,
            }
        }
        String::new()
    }

    /// First parseable integer, either a JSON number or a numeric string.
    /// Missing, null and blank values resolve to 0.
    pub fn int(&self, aliases: &[&str]) -> i64 {
        for key in aliases {
            match self.obj.get(*key) {
                Some(Value::Number(n)) => {
                    if let Some(i) = n.as_i64() {
                        return i;
                    }
                }
                Some(Value::String(s)) => {
                    if let Ok(i) = s.trim().parse::<i64>() {
                        return i;
                    }
                }
                _ => continue,
            }
        }
        0
    }

    pub fn boolean(&self, aliases: &[&str], default: bool) -> bool {
        for key in aliases {
            match self.obj.get(*key) {
                Some(Value::Bool(b)) => return *b,
                Some(Value::String(s)) => {
                    if let Ok(b) = s.trim().parse::<bool>() {
                        return b;
                    }
                }
                _ => continue,
            }
        }
        default
    }

    /// First array value; anything else resolves to an empty array.
    pub fn array(&self, aliases: &[&str]) -> Value {
        match self.value(aliases) {
            Some(v @ Value::Array(_)) => v.clone(),
            _ => Value::Array(vec![]),
        }
    }

    /// First array of strings; non-string elements are dropped.
    pub fn string_array(&self, aliases: &[&str]) -> Vec<String> {
        match self.value(aliases) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// First object value; anything else resolves to `{}`.
    pub fn object(&self, aliases: &[&str]) -> Value {
        match self.value(aliases) {
            Some(v @ Value::Object(_)) => v.clone(),
            _ => Value::Object(serde_json::Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_prefers_canonical_alias() {
        let row = RawRow::new(json!({
            "github_url": "https://old",
            "githubUrl": "https://new",
        }));
        assert_eq!(
            row.text(&["githubUrl", "github_url", "githuburl"]),
            "https://new"
        );
    }

    #[test]
    fn test_text_falls_through_null_and_empty() {
        let row = RawRow::new(json!({
            "githubUrl": null,
            "github_url": "",
            "githuburl": "https://legacy",
        }));
        assert_eq!(
            row.text(&["githubUrl", "github_url", "githuburl"]),
            "https://legacy"
        );
    }

    #[test]
    fn test_text_missing_resolves_to_empty() {
        let row = RawRow::new(json!({}));
        assert_eq!(row.text(&["title"]), "");
    }

    #[test]
    fn test_int_from_number_and_string() {
        let row = RawRow::new(json!({"createdYear": 2024}));
        assert_eq!(row.int(&["createdYear", "created_year"]), 2024);

        let row = RawRow::new(json!({"created_year": " 2021 "}));
        assert_eq!(row.int(&["createdYear", "created_year"]), 2021);

        let row = RawRow::new(json!({"created_year": "not-a-year"}));
        assert_eq!(row.int(&["createdYear", "created_year"]), 0);
    }

    #[test]
    fn test_boolean_default() {
        let row = RawRow::new(json!({}));
        assert!(row.boolean(&["editable"], true));
        let row = RawRow::new(json!({"editable": false}));
        assert!(!row.boolean(&["editable"], true));
    }

    #[test]
    fn test_string_array_drops_non_strings() {
        let row = RawRow::new(json!({"technologies": ["Rust", 1, null, "Axum"]}));
        assert_eq!(row.string_array(&["technologies"]), vec!["Rust", "Axum"]);
    }

    #[test]
    fn test_object_fallback_is_empty_object() {
        let row = RawRow::new(json!({"data": [1, 2]}));
        assert_eq!(row.object(&["data"]), json!({}));
    }

    #[test]
    fn test_non_object_row_is_empty() {
        let row = RawRow::new(json!(null));
        assert_eq!(row.text(&["id"]), "");
    }
}
