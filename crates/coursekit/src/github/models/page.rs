use crate::github::Result;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use reqwest::header::HeaderMap;
use url::Url;

// -------------------------------------------------------------------------------------------------
// Page
// -------------------------------------------------------------------------------------------------
/// One page of a paginated listing, plus the link to the page after it.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<Url>,
}

impl<T: serde::de::DeserializeOwned> Page<T> {
    pub async fn from_response(response: reqwest::Response) -> Result<Self> {
        let next = next_link(response.headers());
        let items = response.json().await?;
        Ok(Page { items, next })
    }
}

lazy_static! {
    static ref NEXT_LINK_PATTERN: Regex =
        RegexBuilder::new(r#"<([^>]+)>; \s* rel \s* = \s* "next""#)
            .ignore_whitespace(true)
            .build()
            .expect("header links regex should compile");
}

/// Find the `rel="next"` URL among the `Link` headers, if any.
fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(reqwest::header::LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| NEXT_LINK_PATTERN.captures(value))
        .filter_map(|captures| captures.get(1))
        .find_map(|m| Url::parse(m.as_str()).ok())
}
