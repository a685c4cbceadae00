use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client};
use serde::Deserialize;
use shared::domain::{Avatar, OriginType};
use tracing::debug;
use url::Url;

use super::{AvatarProvider, OriginSupport};
use crate::service::HistoryService;

const CLIENT_USER_AGENT: &str = concat!("history-bridge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Contributor {
    login: String,
    avatar_url: String,
    #[serde(default)]
    html_url: Option<String>,
}

/// Contributor avatars from the GitHub REST API.
pub struct GithubProvider {
    http: Client,
    api_url: String,
}

impl GithubProvider {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AvatarProvider for GithubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn support(&self) -> OriginSupport {
        OriginSupport::Only(OriginType::Github)
    }

    async fn avatars(&self, service: &dyn HistoryService) -> Result<Vec<Avatar>> {
        let origin = service
            .origin_url()
            .await?
            .ok_or_else(|| anyhow!("repository has no origin url"))?;
        let (owner, repo) = repository_slug(&origin)
            .ok_or_else(|| anyhow!("cannot derive owner/repo from origin '{origin}'"))?;

        debug!(%owner, %repo, "fetching github contributors");
        let contributors: Vec<Contributor> = self
            .http
            .get(format!("{}/repos/{owner}/{repo}/contributors", self.api_url))
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .context("github contributors request failed")?
            .error_for_status()?
            .json()
            .await
            .context("github contributors response was not understood")?;

        Ok(contributors
            .into_iter()
            .map(|contributor| Avatar {
                login: Some(contributor.login),
                name: None,
                email: None,
                url: contributor.html_url,
                avatar_url: contributor.avatar_url,
            })
            .collect())
    }
}

/// Extracts `(owner, repo)` from https, `ssh://` and scp-style remotes.
fn repository_slug(origin: &str) -> Option<(String, String)> {
    let origin = origin.trim();
    let path = match Url::parse(origin) {
        Ok(url) => url.path().to_string(),
        Err(_) => origin.split_once(':')?.1.to_string(),
    };

    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
