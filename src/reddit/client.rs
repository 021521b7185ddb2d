// Reddit OAuth client: script-app authentication, listings, moderation calls.
//
// A thin reqwest wrapper in the same shape as the other HTTP clients: one
// generic GET helper that every endpoint goes through, plus a form POST for
// moderation actions. All calls share one rate limiter and retry on 429.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::listing::{self, Listing, SubmissionState, TokenResponse, MAX_PAGE_SIZE};
use super::rate_limit::{with_retry, RateLimiter, REQUESTS_PER_WINDOW, WINDOW_SECS};
use crate::config::Config;
use crate::feed::{FeedSource, ModAction, QueueItem, ACTION_REMOVE_LINK};
use crate::post::{RawSubmission, RemovalHandle};

/// OAuth API endpoint for authenticated calls.
pub const DEFAULT_API_URL: &str = "https://oauth.reddit.com";

/// Host serving the token endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com";

/// Refresh the bearer token this long before reddit says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Authenticated client for one subreddit's moderation endpoints.
pub struct RedditClient {
    client: reqwest::Client,
    api_url: String,
    auth_url: String,
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
    subreddit: String,
    token: Mutex<Option<AccessToken>>,
    limiter: RateLimiter,
}

impl RedditClient {
    /// Build a client from configuration. No request is made until the
    /// first call; the token is fetched lazily.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            subreddit: config.subreddit.clone(),
            token: Mutex::new(None),
            limiter: RateLimiter::new(REQUESTS_PER_WINDOW, WINDOW_SECS),
        })
    }

    /// Return a valid bearer token, logging in again if the cached one is
    /// missing or about to expire.
    async fn bearer(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(ref current) = *token {
            if current.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(current.value.clone());
            }
        }

        let url = format!("{}/api/v1/access_token", self.auth_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .context("Token request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Token endpoint returned {status}; check REDDIT_CLIENT_ID/SECRET");
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let Some(value) = body.access_token else {
            anyhow::bail!(
                "Reddit rejected the login: {}",
                body.error.as_deref().unwrap_or("no access token returned")
            );
        };

        let expires_in = Duration::from_secs(body.expires_in.unwrap_or(3600));
        info!(user = self.username, "Authenticated with reddit");
        *token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + expires_in,
        });
        Ok(value)
    }

    fn record_quota(&self, headers: &reqwest::header::HeaderMap) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        self.limiter
            .observe_headers(header("x-ratelimit-remaining"), header("x-ratelimit-reset"));
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        let token = self.bearer().await?;

        debug!(path = path, "Reddit GET request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .query(params)
            .send()
            .await
            .with_context(|| format!("Reddit request failed: {path}"))?;

        self.record_quota(response.headers());

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit {path} returned {status}: {body}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize {path} response"))
    }

    /// GET an endpoint and deserialize the response, retrying on 429.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        with_retry(&self.limiter, || self.get_once(path, params)).await
    }

    async fn post_form_once(&self, path: &str, form: &[(&str, String)]) -> Result<()> {
        let url = format!("{}{}", self.api_url, path);
        let token = self.bearer().await?;

        debug!(path = path, "Reddit POST request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .form(form)
            .send()
            .await
            .with_context(|| format!("Reddit request failed: {path}"))?;

        self.record_quota(response.headers());

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Reddit {path} returned {status}: {body}");
        }
        Ok(())
    }

    /// POST a form to an endpoint, retrying on 429.
    pub async fn post_form(&self, path: &str, form: &[(&str, String)]) -> Result<()> {
        with_retry(&self.limiter, || self.post_form_once(path, form)).await
    }

    /// Fetch up to `limit` children of a listing, following `after` cursors.
    pub async fn fetch_listing<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
        limit: usize,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        while items.len() < limit {
            let page_size = (limit - items.len()).min(MAX_PAGE_SIZE);
            let mut params: Vec<(&str, String)> = extra.to_vec();
            params.push(("limit", page_size.to_string()));
            if let Some(ref cursor) = after {
                params.push(("after", cursor.clone()));
            }

            let page: Listing = self.get(path, &params).await?;
            let page_len = page.data.children.len();
            after = page.data.after.clone();
            items.extend(page.decode::<T>());

            debug!(
                path = path,
                page_len = page_len,
                total_collected = items.len(),
                "Fetched listing page"
            );

            if after.is_none() || page_len == 0 {
                break;
            }
        }

        items.truncate(limit);
        Ok(items)
    }

    fn subreddit_path(&self, suffix: &str) -> String {
        format!("/r/{}/{}", self.subreddit, suffix)
    }
}

#[async_trait]
impl FeedSource for RedditClient {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<RawSubmission>> {
        let path = self.subreddit_path("new");
        self.fetch_listing(&path, &[], limit)
            .await
            .with_context(|| format!("Failed to fetch new posts from r/{}", self.subreddit))
    }

    async fn fetch_mod_log(&self, limit: usize) -> Result<Vec<ModAction>> {
        let path = self.subreddit_path("about/log");
        self.fetch_listing(&path, &[("type", ACTION_REMOVE_LINK.to_string())], limit)
            .await
            .with_context(|| format!("Failed to fetch mod log of r/{}", self.subreddit))
    }

    async fn fetch_mod_queue(&self, limit: usize) -> Result<Vec<QueueItem>> {
        let path = self.subreddit_path("about/modqueue");
        self.fetch_listing(&path, &[], limit)
            .await
            .with_context(|| format!("Failed to fetch modqueue of r/{}", self.subreddit))
    }

    async fn removed_by_category(&self, url: &str) -> Result<Option<String>> {
        let id = listing::submission_id_from_url(url)
            .ok_or_else(|| anyhow::anyhow!("Not a reddit submission URL: {url}"))?;
        let fullname = format!("t3_{id}");

        let info: Listing = self.get("/api/info", &[("id", fullname.clone())]).await?;
        let state = info
            .decode::<SubmissionState>()
            .into_iter()
            .find(|s| s.name == fullname)
            .ok_or_else(|| anyhow::anyhow!("Submission {fullname} not found"))?;

        Ok(state.removed_by_category)
    }

    async fn remove(&self, handle: &RemovalHandle, note: Option<&str>) -> Result<()> {
        let fullname = handle.fullname().to_string();
        self.post_form(
            "/api/remove",
            &[("id", fullname.clone()), ("spam", "false".to_string())],
        )
        .await
        .with_context(|| format!("Failed to remove {fullname}"))?;

        if let Some(note) = note {
            let payload = serde_json::json!({
                "item_ids": [fullname],
                "mod_note": note,
                "reason_id": null,
            });
            // The post is already gone; a missing note doesn't undo that.
            if let Err(e) = self
                .post_form(
                    "/api/v1/modactions/removal_reasons",
                    &[("json", payload.to_string())],
                )
                .await
            {
                warn!(item = fullname, error = %e, "Removed, but failed to attach removal note");
            }
        }

        Ok(())
    }
}
