//! Askama filters used by the page templates.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::Datelike;

/// Fingerprint of `static/css/main.css`, empty when the build could not stamp it.
const CSS_HASH: &str = env!("CSS_HASH");

/// Link target of the shop stylesheet.
///
/// Usage in templates: `{{ ""|stylesheet }}`
#[askama::filter_fn]
pub fn stylesheet(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(stylesheet_path(CSS_HASH))
}

fn stylesheet_path(hash: &str) -> String {
    if hash.is_empty() {
        "/static/css/main.css".to_string()
    } else {
        format!("/static/css/derived/main.{hash}.css")
    }
}

/// Year printed in the page footer.
///
/// Usage in templates: `{{ ""|footer_year }}`
#[askama::filter_fn]
pub fn footer_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(chrono::Utc::now().year())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_path() {
        assert_eq!(stylesheet_path("1a2b3c4d"), "/static/css/derived/main.1a2b3c4d.css");
        assert_eq!(stylesheet_path(""), "/static/css/main.css");
    }
}
