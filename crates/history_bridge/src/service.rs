//! Collaborators the bridge calls into. None of them are implemented here.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{
        ActionedUser, Branch, LogEntries, LogEntriesQuery, LogEntry, OriginType, StateChange,
    },
    error::ApiError,
    protocol::{InboundEnvelope, UiMessage},
};
use tokio::sync::{broadcast, mpsc};

/// Repository history backend.
#[async_trait]
pub trait HistoryService: Send + Sync {
    async fn get_log_entries(&self, query: &LogEntriesQuery) -> Result<LogEntries>;
    async fn get_branches(&self) -> Result<Vec<Branch>>;
    async fn get_authors(&self) -> Result<Vec<ActionedUser>>;
    async fn get_commit(&self, hash: &str, refresh: bool) -> Result<Option<LogEntry>>;
    async fn create_tag(&self, tag_name: &str, hash: &str) -> Result<()>;
    async fn create_branch(&self, branch_name: &str, hash: &str) -> Result<()>;
    async fn remove_tag(&self, tag_name: &str) -> Result<()>;
    async fn remove_branch(&self, branch_name: &str) -> Result<()>;
    async fn remove_remote_branch(&self, remote_branch: &str) -> Result<()>;
    async fn reset_soft(&self, hash: &str) -> Result<()>;
    async fn reset_hard(&self, hash: &str) -> Result<()>;
    async fn origin_type(&self) -> Result<Option<OriginType>>;
    async fn origin_url(&self) -> Result<Option<String>>;
    async fn current_branch(&self) -> Result<String>;
    fn repository_root(&self) -> PathBuf;
    fn subscribe_state_changes(&self) -> broadcast::Receiver<StateChange>;
}

/// Message channel to the embedded UI surface.
///
/// Inbound commands must arrive without loss: each one is owed a response.
pub trait UiChannel: Send + Sync {
    fn subscribe_messages(&self) -> mpsc::Receiver<InboundEnvelope>;
    fn post_message(&self, message: UiMessage) -> Result<()>;
}

/// Editor chrome around the UI surface. Calls must not block.
pub trait UiChrome: Send + Sync {
    fn show_error(&self, error: &ApiError);
    fn view_commit_tree(&self, repository_root: PathBuf, branch: String, commit: &LogEntry);
}

/// Runs host commands outside the bridge. Calls must not block.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &str, detail: Value);
}
