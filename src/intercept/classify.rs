//! URL allow-list and category mapping
//!
//! The only "protocol" this subsystem defines: a fixed set of path
//! regexes classifying the storefront traffic the host page already
//! issues. Anything that matches nothing is never tracked.

use crate::models::RequestCategory;
use once_cell::sync::Lazy;
use regex::Regex;

static RULES: Lazy<Vec<(RequestCategory, Regex)>> = Lazy::new(|| {
    let rule = |category, pattern: &str| {
        (
            category,
            Regex::new(pattern).expect("classification pattern compiles"),
        )
    };
    vec![
        rule(
            RequestCategory::CartMutation,
            r"/cart/(add|update|change|clear)(\.js)?$",
        ),
        rule(RequestCategory::CartRead, r"/cart\.js$"),
        rule(RequestCategory::Product, r"/products/[^/]+\.js(on)?$"),
        rule(
            RequestCategory::Collection,
            r"/collections/[^/]+(/products)?\.json$",
        ),
        rule(RequestCategory::Search, r"/search(/suggest)?\.json$"),
        rule(
            RequestCategory::Recommendations,
            r"/recommendations/products(\.json)?$",
        ),
        rule(
            RequestCategory::Graphql,
            r"/api/(\d{4}-\d{2}|unstable)/graphql(\.json)?$",
        ),
        rule(RequestCategory::Variant, r"/variants/\d+(\.js(on)?)?$"),
        rule(RequestCategory::Localization, r"/localization$"),
    ]
});

/// Extract the path portion of an absolute or relative URL.
pub fn path_of(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        return parsed.path().to_string();
    }
    // Relative URL: strip query and fragment by hand.
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

/// Path + query for the record's `url` field.
pub fn path_and_query(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        return match parsed.query() {
            Some(q) => format!("{}?{}", parsed.path(), q),
            None => parsed.path().to_string(),
        };
    }
    let end = url.find('#').unwrap_or(url.len());
    url[..end].to_string()
}

/// Classify a URL against the allow-list. `None` means untracked.
pub fn classify(url: &str) -> Option<RequestCategory> {
    let path = path_of(url);
    RULES
        .iter()
        .find(|(_, pattern)| pattern.is_match(&path))
        .map(|(category, _)| *category)
}

/// Short label for list views: the last two path segments.
pub fn display_name(url: &str) -> String {
    let path = path_of(url);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => path,
        [single] => (*single).to_string(),
        [.., a, b] => format!("{}/{}", a, b),
    }
}
