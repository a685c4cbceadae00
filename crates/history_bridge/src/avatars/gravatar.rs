use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shared::domain::Avatar;

use super::{AvatarProvider, OriginSupport};
use crate::service::HistoryService;

/// Builds avatar URLs from author emails; needs no network access.
pub struct GravatarProvider {
    base_url: String,
}

impl GravatarProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn avatar_url(&self, email: &str) -> String {
        let digest = Sha256::digest(email.trim().to_ascii_lowercase().as_bytes());
        format!("{}/{digest:x}?d=identicon", self.base_url)
    }
}

#[async_trait]
impl AvatarProvider for GravatarProvider {
    fn name(&self) -> &'static str {
        "gravatar"
    }

    fn support(&self) -> OriginSupport {
        OriginSupport::Any
    }

    async fn avatars(&self, service: &dyn HistoryService) -> Result<Vec<Avatar>> {
        let authors = service.get_authors().await?;
        let mut seen = HashSet::new();
        Ok(authors
            .into_iter()
            .filter(|author| !author.email.trim().is_empty())
            .filter(|author| seen.insert(author.email.trim().to_ascii_lowercase()))
            .map(|author| Avatar {
                login: None,
                avatar_url: self.avatar_url(&author.email),
                name: Some(author.name),
                email: Some(author.email),
                url: None,
            })
            .collect())
    }
}
