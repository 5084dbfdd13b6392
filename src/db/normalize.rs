//! Pure normalization of loosely-typed row data into canonical domain
//! values: status vocabularies, section-type vocabulary, and the
//! polymorphic section payload. No I/O.

use serde_json::{json, Map, Value};

pub const PUBLISHED: &str = "PUBLISHED";
pub const UNPUBLISHED: &str = "UNPUBLISHED";
pub const DEPLOYED: &str = "DEPLOYED";
pub const UNDEPLOYED: &str = "UNDEPLOYED";

pub const SECTION_SINGLE: &str = "single";
pub const SECTION_CATEGORIZED: &str = "categorized";
pub const SECTION_LIST: &str = "list";
pub const SECTION_HISTORY: &str = "history";

/// Canonical visibility status. Known aliases collapse case-insensitively;
/// an unknown-but-explicit value is preserved verbatim (trimmed), never
/// coerced. Empty input defaults to published.
pub fn visibility_status(raw: &str) -> String {
    let s = raw.trim();
    match s.to_lowercase().as_str() {
        "" | "public" | "published" | "open" | "active" | "visible" | "公開" => {
            PUBLISHED.to_string()
        }
        "private" | "draft" | "hidden" | "inactive" | "非公開" => UNPUBLISHED.to_string(),
        _ => s.to_string(),
    }
}

/// Canonical deployment status. Same shape as `visibility_status`;
/// empty input defaults to deployed.
pub fn deploy_status(raw: &str) -> String {
    let s = raw.trim();
    match s.to_lowercase().as_str() {
        "" | "deployed" | "live" | "production" | "公開中" => DEPLOYED.to_string(),
        "undeployed" | "not_deployed" | "draft" | "staging" | "未公開" => {
            UNDEPLOYED.to_string()
        }
        _ => s.to_string(),
    }
}

/// Canonical section type. Empty input defaults to `list`; unrecognized
/// non-empty values pass through verbatim.
pub fn section_type(raw: &str) -> String {
    let s = raw.trim();
    match s.to_lowercase().as_str() {
        "single" | "profile" => SECTION_SINGLE.to_string(),
        "categorized" | "category" => SECTION_CATEGORIZED.to_string(),
        "list" => SECTION_LIST.to_string(),
        "history" | "timeline" => SECTION_HISTORY.to_string(),
        "" => SECTION_LIST.to_string(),
        _ => s.to_string(),
    }
}

/// Profile columns carried by legacy single-type section rows.
#[derive(Debug, Default, Clone)]
pub struct ProfileFields {
    pub name: String,
    pub hometown: String,
    pub hobbies: String,
    pub profile_image: String,
    pub university: String,
}

impl ProfileFields {
    fn any_set(&self) -> bool {
        !self.name.trim().is_empty()
            || !self.hometown.trim().is_empty()
            || !self.hobbies.trim().is_empty()
            || !self.profile_image.trim().is_empty()
            || !self.university.trim().is_empty()
    }

    fn to_json(&self) -> Value {
        json!({
            "name": self.name.trim(),
            "hometown": self.hometown.trim(),
            "hobbies": self.hobbies.trim(),
            "profileImage": self.profile_image.trim(),
            "university": self.university.trim(),
        })
    }
}

fn as_object(v: &Value) -> Option<&Map<String, Value>> {
    v.as_object().filter(|m| !m.is_empty())
}

fn has_key(v: &Value, key: &str) -> bool {
    v.as_object()
        .and_then(|m| m.get(key))
        .map(|v| !v.is_null())
        .unwrap_or(false)
}

fn non_empty_array(v: &Value) -> bool {
    v.as_array().map(|a| !a.is_empty()).unwrap_or(false)
}

/// Reconcile a section's payload from whatever combination of old-shape
/// and new-shape fields the row carries.
///
/// The same section may have been populated under an old schema (loose
/// `items`/`histories`/profile columns) and a new one (a single `data`
/// object). Already-canonical data always wins: if `data` carries the
/// type's signature key it is returned untouched. Legacy fields are
/// fallback only, and nothing is fabricated - when no source field has
/// content the result is `{}`, never null.
pub fn reconcile_section_data(
    section_type: &str,
    data: &Value,
    items: &Value,
    histories: &Value,
    profile: &ProfileFields,
) -> Value {
    let ty = section_type.trim().to_lowercase();

    match ty.as_str() {
        "single" | "profile" => {
            if as_object(data).is_some() {
                return data.clone();
            }
            if profile.any_set() {
                return json!({ "data": profile.to_json() });
            }
        }
        "history" | "timeline" => {
            if has_key(data, "histories") || has_key(data, "items") {
                return data.clone();
            }
            if non_empty_array(histories) {
                return json!({ "histories": histories });
            }
            if non_empty_array(items) {
                return json!({ "histories": items });
            }
            if as_object(data).is_some() {
                return data.clone();
            }
        }
        "list" => {
            if has_key(data, "lists") || has_key(data, "items") {
                return data.clone();
            }
            if non_empty_array(items) {
                return json!({ "lists": items });
            }
            if as_object(data).is_some() {
                return data.clone();
            }
        }
        _ => {
            // Unrecognized type: preserve canonical data if present,
            // otherwise best-effort merge of whatever legacy fields exist.
            if as_object(data).is_some() {
                return data.clone();
            }
            let mut merged = Map::new();
            if non_empty_array(histories) {
                merged.insert("histories".to_string(), histories.clone());
            }
            if non_empty_array(items) {
                merged.insert("items".to_string(), items.clone());
            }
            if !merged.is_empty() {
                return Value::Object(merged);
            }
        }
    }

    json!({})
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_visibility_aliases_collapse() {
        for alias in ["", "public", "Published", "OPEN", "active", "visible", "公開"] {
            assert_eq!(visibility_status(alias), PUBLISHED, "alias {:?}", alias);
        }
        for alias in ["private", "Draft", "hidden", "INACTIVE", "非公開"] {
            assert_eq!(visibility_status(alias), UNPUBLISHED, "alias {:?}", alias);
        }
    }

    #[test]
    fn test_visibility_unknown_passes_through() {
        assert_eq!(visibility_status(" archived "), "archived");
    }

    #[test]
    fn test_visibility_is_idempotent() {
        for input in ["public", "private", "archived", "", "公開"] {
            let once = visibility_status(input);
            assert_eq!(visibility_status(&once), once);
        }
    }

    #[test]
    fn test_deploy_aliases_and_default() {
        for alias in ["", "deployed", "Live", "PRODUCTION", "公開中"] {
            assert_eq!(deploy_status(alias), DEPLOYED, "alias {:?}", alias);
        }
        for alias in ["undeployed", "not_deployed", "draft", "Staging", "未公開"] {
            assert_eq!(deploy_status(alias), UNDEPLOYED, "alias {:?}", alias);
        }
        assert_eq!(deploy_status(DEPLOYED), "DEPLOYED");
        assert_eq!(deploy_status(UNDEPLOYED), "UNDEPLOYED");
    }

    #[test]
    fn test_section_type_aliases() {
        assert_eq!(section_type("profile"), "single");
        assert_eq!(section_type("Timeline"), "history");
        assert_eq!(section_type("category"), "categorized");
        assert_eq!(section_type(""), "list");
        assert_eq!(section_type("gallery"), "gallery");
    }

    #[test]
    fn test_reconcile_canonical_data_wins() {
        let data = json!({"histories": [{"year": 2020}]});
        let legacy = json!([{"year": 1999}]);
        let out = reconcile_section_data(
            "history",
            &data,
            &json!([]),
            &legacy,
            &ProfileFields::default(),
        );
        assert_eq!(out, data);
    }

    #[test]
    fn test_reconcile_history_wraps_legacy_arrays() {
        let histories = json!([{"year": 2020, "event": "graduated"}]);
        let out = reconcile_section_data(
            "history",
            &json!({}),
            &json!([]),
            &histories,
            &ProfileFields::default(),
        );
        assert_eq!(out, json!({"histories": histories}));

        // Legacy items array is the second-choice fallback.
        let items = json!([{"year": 2018}]);
        let out = reconcile_section_data(
            "history",
            &Value::Null,
            &items,
            &json!([]),
            &ProfileFields::default(),
        );
        assert_eq!(out, json!({"histories": items}));
    }

    #[test]
    fn test_reconcile_list_wraps_items() {
        let items = json!(["a", "b"]);
        let out = reconcile_section_data(
            "list",
            &json!({}),
            &items,
            &json!([]),
            &ProfileFields::default(),
        );
        assert_eq!(out, json!({"lists": items}));
    }

    #[test]
    fn test_reconcile_single_synthesizes_profile() {
        let profile = ProfileFields {
            name: "Taro".to_string(),
            ..Default::default()
        };
        let out =
            reconcile_section_data("single", &json!({}), &json!([]), &json!([]), &profile);
        assert_eq!(
            out,
            json!({"data": {
                "name": "Taro",
                "hometown": "",
                "hobbies": "",
                "profileImage": "",
                "university": "",
            }})
        );
    }

    #[test]
    fn test_reconcile_preserves_unknown_shapes() {
        let data = json!({"custom": true});
        let out = reconcile_section_data(
            "list",
            &data,
            &json!([]),
            &json!([]),
            &ProfileFields::default(),
        );
        assert_eq!(out, data);
    }

    #[test]
    fn test_reconcile_unknown_type_merges_legacy() {
        let out = reconcile_section_data(
            "gallery",
            &json!({}),
            &json!([1]),
            &json!([2]),
            &ProfileFields::default(),
        );
        assert_eq!(out, json!({"histories": [2], "items": [1]}));
    }

    #[test]
    fn test_reconcile_never_null_and_empty_when_no_data() {
        for ty in ["single", "history", "list", "categorized", "whatever"] {
            let out = reconcile_section_data(
                ty,
                &Value::Null,
                &json!([]),
                &json!([]),
                &ProfileFields::default(),
            );
            assert_eq!(out, json!({}), "type {:?}", ty);
        }
    }
}
