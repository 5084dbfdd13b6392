//! In-memory query processing over normalized collections.
//!
//! Processing order is fixed: filter, then sort, then paginate. The input
//! collection is never mutated; the output is a windowed copy plus
//! pagination metadata.

use serde::{Deserialize, Serialize};

use crate::db::models::Product;
use crate::db::normalize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 100;

/// Query parameters accepted by the products list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductListQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub deploy_status: Option<String>,
    pub created_year: Option<i64>,
    pub created_month: Option<i64>,
    /// Comma-separated list; matches products carrying any of the names.
    pub technologies: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

/// Filter, sort and paginate a normalized product collection.
pub fn process_products(
    products: &[Product],
    query: &ProductListQuery,
) -> (Vec<Product>, Pagination) {
    let mut filtered = filter_products(products, query);

    let sort_by = query
        .sort_by
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("createdYear-asc");
    sort_products(&mut filtered, sort_by);

    let page = query.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    paginate(filtered, page, limit)
}

/// Conjunctive exact-match filtering; an omitted parameter is no
/// constraint. `technologies` is a membership test: the product matches
/// when it carries any of the requested names.
fn filter_products(products: &[Product], query: &ProductListQuery) -> Vec<Product> {
    let category = trimmed(&query.category);
    // Filter values go through the same vocabulary normalization as the
    // stored collection, so legacy aliases keep matching.
    let status = normalized_filter(&query.status, normalize::visibility_status);
    let deploy_status = normalized_filter(&query.deploy_status, normalize::deploy_status);
    let created_year = query.created_year.unwrap_or(0);
    let created_month = query.created_month.unwrap_or(0);
    let techs: Vec<String> = query
        .technologies
        .as_deref()
        .map(crate::config::split_csv)
        .unwrap_or_default();

    products
        .iter()
        .filter(|p| category.is_empty() || p.category == category)
        .filter(|p| status.is_empty() || p.status == status)
        .filter(|p| deploy_status.is_empty() || p.deploy_status == deploy_status)
        .filter(|p| created_year == 0 || p.created_year == created_year)
        .filter(|p| created_month == 0 || p.created_month == created_month)
        .filter(|p| techs.is_empty() || has_any(&p.technologies, &techs))
        .cloned()
        .collect()
}

/// Named comparators only; an unrecognized sort key leaves the order as
/// given. Year sorts tie-break on month.
fn sort_products(products: &mut [Product], sort_by: &str) {
    match sort_by {
        "createdYear-asc" => products.sort_by(|a, b| {
            (a.created_year, a.created_month).cmp(&(b.created_year, b.created_month))
        }),
        "createdYear-desc" => products.sort_by(|a, b| {
            (b.created_year, b.created_month).cmp(&(a.created_year, a.created_month))
        }),
        "title-asc" => products.sort_by(|a, b| a.title.cmp(&b.title)),
        "title-desc" => products.sort_by(|a, b| b.title.cmp(&a.title)),
        // ISO-8601 timestamps sort correctly as strings.
        "createdAt-asc" => products.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        "createdAt-desc" => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        _ => {}
    }
}

/// Window `[start, end)` with both bounds clamped to the collection.
/// `page` and `limit` come straight from the query string; the offset
/// arithmetic saturates so absurd values yield an empty window instead
/// of overflowing.
pub fn paginate<T>(items: Vec<T>, page: i64, limit: i64) -> (Vec<T>, Pagination) {
    let total = items.len() as i64;
    let start = page.saturating_sub(1).saturating_mul(limit).clamp(0, total);
    let end = start.saturating_add(limit).min(total);

    let total_pages = if total == 0 {
        0
    } else {
        total.saturating_add(limit).saturating_sub(1) / limit
    };

    let window = items
        .into_iter()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect();

    (
        window,
        Pagination {
            page,
            limit,
            total,
            total_pages,
            has_more: end < total,
        },
    )
}

fn trimmed(v: &Option<String>) -> String {
    v.as_deref().unwrap_or("").trim().to_string()
}

/// Empty stays empty (no constraint); anything else is normalized.
fn normalized_filter(v: &Option<String>, normalize: fn(&str) -> String) -> String {
    let raw = trimmed(v);
    if raw.is_empty() {
        raw
    } else {
        normalize(&raw)
    }
}

fn has_any(have: &[String], wanted: &[String]) -> bool {
    if have.is_empty() || wanted.is_empty() {
        return false;
    }
    wanted.iter().any(|w| have.iter().any(|h| h == w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, year: i64, month: i64, title: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            image: String::new(),
            link: String::new(),
            github_url: String::new(),
            category: "web".to_string(),
            technologies: vec!["Rust".to_string()],
            status: "PUBLISHED".to_string(),
            deploy_status: "DEPLOYED".to_string(),
            created_year: year,
            created_month: month,
            created_at: format!("{:04}-{:02}-01T00:00:00Z", year, month),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let mut p1 = product("p1", 2023, 1, "One");
        p1.category = "tool".to_string();
        let p2 = product("p2", 2023, 1, "Two");

        let query = ProductListQuery {
            category: Some("web".to_string()),
            created_year: Some(2023),
            ..Default::default()
        };
        let (window, meta) = process_products(&[p1, p2], &query);
        assert_eq!(meta.total, 1);
        assert_eq!(window[0].id, "p2");
    }

    #[test]
    fn test_technologies_filter_matches_any() {
        let mut p1 = product("p1", 2023, 1, "One");
        p1.technologies = vec!["Go".to_string()];
        let p2 = product("p2", 2023, 1, "Two");

        let query = ProductListQuery {
            technologies: Some("Rust, Elm".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&[p1, p2], &query);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, "p2");
    }

    #[test]
    fn test_year_sort_tie_breaks_on_month() {
        let items = vec![
            product("a", 2023, 6, "A"),
            product("b", 2022, 12, "B"),
            product("c", 2023, 2, "C"),
        ];
        let query = ProductListQuery {
            sort_by: Some("createdYear-asc".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&items, &query);
        let ids: Vec<&str> = window.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let query = ProductListQuery {
            sort_by: Some("createdYear-desc".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&items, &query);
        let ids: Vec<&str> = window.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_unknown_sort_key_preserves_order() {
        let items = vec![product("z", 2024, 1, "Z"), product("a", 2020, 1, "A")];
        let query = ProductListQuery {
            sort_by: Some("popularity-desc".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&items, &query);
        assert_eq!(window[0].id, "z");
        assert_eq!(window[1].id, "a");
    }

    #[test]
    fn test_pages_concatenate_to_full_collection() {
        let items: Vec<Product> = (0..23)
            .map(|i| product(&format!("p{:02}", i), 2000 + i, 1, "T"))
            .collect();
        let limit = 5;

        let mut seen = Vec::new();
        let mut page = 1;
        loop {
            let query = ProductListQuery {
                sort_by: Some("createdYear-asc".to_string()),
                page: Some(page),
                limit: Some(limit),
                ..Default::default()
            };
            let (window, meta) = process_products(&items, &query);
            assert_eq!(meta.total, 23);
            assert_eq!(meta.total_pages, 5);
            seen.extend(window.into_iter().map(|p| p.id));
            if !meta.has_more {
                break;
            }
            page += 1;
        }

        let expected: Vec<String> = (0..23).map(|i| format!("p{:02}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_has_more_iff_page_times_limit_below_total() {
        let items: Vec<Product> = (0..10)
            .map(|i| product(&format!("p{}", i), 2020, 1, "T"))
            .collect();
        for page in 1..=4 {
            let query = ProductListQuery {
                page: Some(page),
                limit: Some(3),
                ..Default::default()
            };
            let (_, meta) = process_products(&items, &query);
            assert_eq!(meta.has_more, page * 3 < 10, "page {}", page);
        }
    }

    #[test]
    fn test_empty_collection_metadata() {
        let (window, meta) = paginate(Vec::<Product>::new(), 1, 10);
        assert!(window.is_empty());
        assert_eq!(meta.total, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_page_past_end_is_empty_window() {
        let items = vec![product("a", 2020, 1, "A")];
        let (window, meta) = paginate(items, 9, 10);
        assert!(window.is_empty());
        assert_eq!(meta.total, 1);
        assert!(!meta.has_more);
    }

    #[test]
    fn test_extreme_page_and_limit_params_saturate() {
        let items = vec![product("a", 2020, 1, "A")];
        let query = ProductListQuery {
            page: Some(i64::MAX),
            limit: Some(1000),
            ..Default::default()
        };
        let (window, meta) = process_products(&items, &query);
        assert!(window.is_empty());
        assert_eq!(meta.total, 1);
        assert!(!meta.has_more);

        let (window, meta) = paginate(vec![product("b", 2021, 1, "B")], i64::MAX, i64::MAX);
        assert!(window.is_empty());
        assert_eq!(meta.total, 1);
    }

    #[test]
    fn test_status_filters_accept_legacy_vocabulary() {
        let mut p1 = product("p1", 2023, 1, "One");
        p1.status = "UNPUBLISHED".to_string();
        p1.deploy_status = "UNDEPLOYED".to_string();
        let p2 = product("p2", 2023, 1, "Two");
        let items = vec![p1, p2];

        let query = ProductListQuery {
            status: Some("公開".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&items, &query);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, "p2");

        let query = ProductListQuery {
            status: Some("private".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&items, &query);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, "p1");

        let query = ProductListQuery {
            deploy_status: Some("live".to_string()),
            ..Default::default()
        };
        let (window, _) = process_products(&items, &query);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, "p2");
    }

    #[test]
    fn test_source_collection_not_mutated() {
        let items = vec![product("z", 2024, 1, "Z"), product("a", 2020, 1, "A")];
        let query = ProductListQuery {
            sort_by: Some("createdYear-asc".to_string()),
            ..Default::default()
        };
        let _ = process_products(&items, &query);
        assert_eq!(items[0].id, "z");
    }
}
