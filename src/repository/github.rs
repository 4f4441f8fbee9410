//! GitHub repository directory
//!
//! Looks up repositories through the GitHub REST API with:
//! - Configurable timeout and User-Agent
//! - Optional token authentication from `GITHUB_TOKEN`
//! - Exponential backoff retry logic (max 3 retries)
//! - Paginated organisation listing with a fallback to user repositories

use super::{RemoteRepository, RepositoryDirectory};
use crate::error::DirectoryError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Default GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variable holding an optional access token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const SERVICE: &str = "GitHub";

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("depush/", env!("CARGO_PKG_VERSION"));

/// Maximum number of retry attempts
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BASE_DELAY_MS: u64 = 100;

/// Repositories requested per listing page (GitHub maximum)
const PAGE_SIZE: usize = 100;

/// GitHub-backed repository directory
#[derive(Clone)]
pub struct GitHubDirectory {
    client: Client,
    api_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl GitHubDirectory {
    /// Create a directory for the public GitHub API, authenticating with
    /// `GITHUB_TOKEN` when it is set
    pub fn new() -> Result<Self, DirectoryError> {
        let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
        Self::with_config(DEFAULT_API_URL, token, DEFAULT_TIMEOUT)
    }

    /// Create a directory for a custom API endpoint
    pub fn with_config(
        api_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| {
                DirectoryError::network_error(
                    api_url,
                    SERVICE,
                    format!("failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn repository_url(&self, owner: &str, name: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, owner, name)
    }

    fn listing_url(&self, owner_path: &str, owner: &str, page: u32) -> String {
        format!(
            "{}/{}/{}/repos?per_page={}&page={}",
            self.api_url, owner_path, owner, PAGE_SIZE, page
        )
    }

    /// GET with retries; `Ok(None)` means 404
    async fn get(&self, url: &str, target: &str) -> Result<Option<reqwest::Response>, DirectoryError> {
        let mut last_error = None;
        let mut delay = BASE_DELAY_MS;

        for attempt in 0..=self.max_retries {
            let mut request = self
                .client
                .get(url)
                .header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if is_rate_limited(&response) {
                        last_error = Some(DirectoryError::RateLimitExceeded {
                            service: SERVICE.to_string(),
                        });
                    } else if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    } else if !status.is_success() {
                        return Err(DirectoryError::network_error(
                            target,
                            SERVICE,
                            format!("HTTP {}", status),
                        ));
                    } else {
                        return Ok(Some(response));
                    }
                }
                Err(e) => {
                    last_error = Some(DirectoryError::network_error(target, SERVICE, e.to_string()));
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2;
            }
        }

        Err(last_error
            .unwrap_or_else(|| DirectoryError::network_error(target, SERVICE, "unknown error")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        target: &str,
    ) -> Result<Option<T>, DirectoryError> {
        let Some(response) = self.get(url, target).await? else {
            return Ok(None);
        };
        response.json::<T>().await.map(Some).map_err(|e| {
            DirectoryError::invalid_response(target, SERVICE, format!("failed to parse JSON: {}", e))
        })
    }

    /// Page through `/{owner_path}/{owner}/repos`; `Ok(None)` if the owner is unknown
    async fn list_pages(
        &self,
        owner_path: &str,
        owner: &str,
    ) -> Result<Option<Vec<RemoteRepository>>, DirectoryError> {
        let mut repositories = Vec::new();
        let mut page = 1;
        loop {
            let url = self.listing_url(owner_path, owner, page);
            let Some(batch) = self.get_json::<Vec<RemoteRepository>>(&url, owner).await? else {
                return Ok(if page == 1 { None } else { Some(repositories) });
            };
            let last_page = batch.len() < PAGE_SIZE;
            repositories.extend(batch);
            if last_page {
                return Ok(Some(repositories));
            }
            page += 1;
        }
    }
}

fn is_rate_limited(response: &reqwest::Response) -> bool {
    match response.status() {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0"),
        _ => false,
    }
}

#[async_trait]
impl RepositoryDirectory for GitHubDirectory {
    fn service_name(&self) -> &'static str {
        SERVICE
    }

    async fn find_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RemoteRepository>, DirectoryError> {
        let target = format!("{}/{}", owner, name);
        self.get_json(&self.repository_url(owner, name), &target).await
    }

    async fn list_repositories(&self, owner: &str) -> Result<Vec<RemoteRepository>, DirectoryError> {
        let mut repositories = match self.list_pages("orgs", owner).await? {
            Some(repositories) => repositories,
            None => {
                debug!("{} is not an organisation, listing user repositories", owner);
                self.list_pages("users", owner)
                    .await?
                    .ok_or_else(|| DirectoryError::OwnerNotFound {
                        owner: owner.to_string(),
                        service: SERVICE.to_string(),
                    })?
            }
        };
        repositories.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Found {} repositories for {}", repositories.len(), owner);
        Ok(repositories)
    }
}
