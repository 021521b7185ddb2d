// Listing envelopes: the paged `{kind, data: {after, children}}` shape every
// reddit collection endpoint returns.
//
// Children are held as raw JSON and decoded one at a time, so a single
// deleted or half-indexed post only costs that post, not the page.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Largest page reddit serves for any listing.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    /// Fullname to pass as `after` for the next page; `None` on the last page.
    pub after: Option<String>,
    #[serde(default)]
    pub children: Vec<Thing>,
}

/// One child of a listing, e.g. `{"kind": "t3", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: serde_json::Value,
}

impl Listing {
    /// Decode every child into `T`, dropping the ones that don't fit.
    pub fn decode<T: DeserializeOwned>(self) -> Vec<T> {
        self.data
            .children
            .into_iter()
            .filter_map(|thing| match serde_json::from_value::<T>(thing.data) {
                Ok(item) => Some(item),
                Err(e) => {
                    debug!(kind = thing.kind, error = %e, "Skipping undecodable listing child");
                    None
                }
            })
            .collect()
    }
}

/// Live state of a submission as returned by `/api/info`.
#[derive(Debug, Deserialize)]
pub struct SubmissionState {
    pub name: String,
    pub removed_by_category: Option<String>,
}

/// Token endpoint response. Reddit reports bad credentials as a 200 with an
/// `error` field, so every field is optional.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<String>,
}

fn submission_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^https?://(?:[\w-]+\.)?(?:reddit\.com/(?:r/[^/]+/)?(?:comments|gallery)/|redd\.it/)([a-z0-9]+)",
        )
        .expect("submission url pattern is valid")
    })
}

/// Extract the base-36 submission id from a reddit post URL.
///
/// Handles `/comments/<id>/`, `/gallery/<id>` and `redd.it/<id>` forms.
/// Anything else (external links, image hosts) yields `None`.
pub fn submission_id_from_url(url: &str) -> Option<String> {
    submission_url_pattern()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
