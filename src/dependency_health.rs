use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::github::{self, GitHubClient, Repository};

pub const MISSING_TOKEN_ERROR: &str = "GITHUB_TOKEN environment variable not set";
pub const INVALID_TOKEN_ERROR: &str = "GITHUB_TOKEN is not a valid Authorization header value";
pub const MISSING_CONFIG_ERROR: &str = "mcp-config.json file not found or not accessible";

/// Reachability of the source-control API as seen by the last check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamStatus {
    Unknown,
    Connected,
    AuthenticationFailed,
    ConnectionError,
    Unavailable,
}

/// Findings of a single dependency health run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyHealthReport {
    pub timestamp: String,
    pub token_present: bool,
    pub upstream_api_status: UpstreamStatus,
    pub config_present: bool,
    pub discovered_repos: Vec<String>,
    pub errors: Vec<String>,
}

impl DependencyHealthReport {
    fn new() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            token_present: false,
            upstream_api_status: UpstreamStatus::Unknown,
            config_present: false,
            discovered_repos: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Report as sent to clients, with the derived overall status in front
#[derive(Debug, Serialize)]
pub struct DependencyHealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: DependencyHealthReport,
}

impl From<DependencyHealthReport> for DependencyHealthResponse {
    fn from(report: DependencyHealthReport) -> Self {
        Self {
            status: if report.is_ok() { "ok" } else { "error" },
            report,
        }
    }
}

/// Runs token, upstream API and config file checks in order.
/// Every failure is recorded in the report; nothing is raised.
pub async fn check_dependencies(config: &Config, github: &GitHubClient) -> DependencyHealthReport {
    let mut report = DependencyHealthReport::new();

    let Some(token) = config.github_token() else {
        warn!("Dependency check: {}", MISSING_TOKEN_ERROR);
        report.upstream_api_status = UpstreamStatus::Unavailable;
        report.errors.push(MISSING_TOKEN_ERROR.to_string());
        return report;
    };
    report.token_present = true;

    match github::authorization(token) {
        Ok(_) => check_upstream(&mut report, github, &config.github_org, token).await,
        Err(e) => {
            warn!("Dependency check: {}: {}", INVALID_TOKEN_ERROR, e);
            report.upstream_api_status = UpstreamStatus::Unavailable;
            report.errors.push(INVALID_TOKEN_ERROR.to_string());
        }
    }
    check_config_file(&mut report, &config.mcp_config_path).await;

    info!(
        "Dependency check finished with {} error(s)",
        report.errors.len()
    );
    report
}

// A failed identity check skips the repository listing even though both use
// the same token.
async fn check_upstream(
    report: &mut DependencyHealthReport,
    github: &GitHubClient,
    org: &str,
    token: &str,
) {
    let outcome = async {
        let user = github.current_user(token).await?;
        let status = user.status();
        if !status.is_success() {
            report.upstream_api_status = UpstreamStatus::AuthenticationFailed;
            report.errors.push(format!(
                "GitHub API authentication failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            ));
            return Ok(());
        }
        report.upstream_api_status = UpstreamStatus::Connected;

        let repos = github.org_repos(org, token).await?;
        if !repos.status().is_success() {
            warn!("Repository listing for {} returned {}", org, repos.status());
            report
                .errors
                .push(format!("Cannot access {} organization repositories", org));
            return Ok(());
        }
        let repos: Vec<Repository> = repos.json().await?;
        report.discovered_repos = repos.into_iter().map(|r| r.full_name).collect();
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if let Err(e) = outcome {
        warn!("Source-control API unreachable: {}", e);
        report.upstream_api_status = UpstreamStatus::ConnectionError;
        report.errors.push(e.to_string());
    }
}

async fn check_config_file(report: &mut DependencyHealthReport, path: &Path) {
    match tokio::fs::File::open(path).await {
        Ok(_) => report.config_present = true,
        Err(e) => {
            warn!("Config file {} not accessible: {}", path.display(), e);
            report.errors.push(MISSING_CONFIG_ERROR.to_string());
        }
    }
}
