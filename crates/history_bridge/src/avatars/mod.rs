//! Avatar providers and the registry that picks one per origin type.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::domain::{Avatar, OriginType};

use crate::{config::Settings, error::BridgeError, service::HistoryService};

mod github;
mod gravatar;

pub use github::GithubProvider;
pub use gravatar::GravatarProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginSupport {
    /// Works for every repository; used when nothing more specific matches.
    Any,
    Only(OriginType),
}

#[async_trait]
pub trait AvatarProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn support(&self) -> OriginSupport;
    async fn avatars(&self, service: &dyn HistoryService) -> Result<Vec<Avatar>>;
}

/// Provider set with a guaranteed fallback.
pub struct AvatarProviders {
    dedicated: Vec<Arc<dyn AvatarProvider>>,
    fallback: Arc<dyn AvatarProvider>,
}

impl AvatarProviders {
    /// Fails unless exactly one provider advertises [`OriginSupport::Any`].
    pub fn new(
        providers: impl IntoIterator<Item = Arc<dyn AvatarProvider>>,
    ) -> Result<Self, BridgeError> {
        let mut dedicated = Vec::new();
        let mut fallback = None;
        for provider in providers {
            match provider.support() {
                OriginSupport::Any if fallback.is_some() => {
                    return Err(BridgeError::DuplicateFallbackProvider)
                }
                OriginSupport::Any => fallback = Some(provider),
                OriginSupport::Only(_) => dedicated.push(provider),
            }
        }

        let fallback = fallback.ok_or(BridgeError::MissingFallbackProvider)?;
        Ok(Self {
            dedicated,
            fallback,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, BridgeError> {
        Self::new([
            Arc::new(GithubProvider::new(&settings.github_api_url)) as Arc<dyn AvatarProvider>,
            Arc::new(GravatarProvider::new(&settings.gravatar_url)),
        ])
    }

    /// First provider dedicated to `origin`, else the fallback.
    pub fn select(&self, origin: OriginType) -> &Arc<dyn AvatarProvider> {
        self.dedicated
            .iter()
            .find(|provider| provider.support() == OriginSupport::Only(origin))
            .unwrap_or(&self.fallback)
    }
}
