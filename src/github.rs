use anyhow::{Context, Result};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue, USER_AGENT,
};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = "alexbot-health-check";

/// Entry of an organization repository listing
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// Thin client for the source-control REST API.
///
/// Calls hand back the raw response so callers decide how to treat
/// non-success statuses.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `GET /user`
    pub async fn current_user(&self, token: &str) -> Result<reqwest::Response> {
        self.get("/user", token).await
    }

    /// `GET /orgs/{org}/repos`
    pub async fn org_repos(&self, org: &str, token: &str) -> Result<reqwest::Response> {
        self.get(&format!("/orgs/{}/repos", org), token).await
    }

    async fn get(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        let headers = headers(token).context("Token is not a valid Authorization header")?;
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        Ok(self.http.get(url).headers(headers).send().await?)
    }
}

/// `Bearer` credential for `token`; fails on control characters such as a
/// trailing newline.
pub fn authorization(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

fn headers(token: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization(token)?);
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    Ok(headers)
}
