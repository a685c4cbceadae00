//! Command bodies. Each one validates its own payload and delegates to a
//! collaborator.

use std::{path::PathBuf, sync::Arc};

use anyhow::anyhow;
use serde::Serialize;
use serde_json::{json, Value};
use shared::{
    domain::{CommitDetails, CommittedFileDetails, LogEntriesPage, LogEntriesQuery, LogEntry, Ref},
    protocol::UiNotice,
};
use tracing::{debug, info, warn};

use crate::{
    avatars::AvatarProviders,
    config::{MissingOriginPolicy, Settings},
    error::{BridgeError, NO_ORIGIN_TYPE_MESSAGE},
    notifier::SubscriberSlot,
    payload::{optional_index, optional_string, optional_value, required, required_string},
    service::{CommandExecutor, HistoryService, UiChannel, UiChrome},
};

pub type HandlerResult = Result<Option<Value>, BridgeError>;

pub const COMMIT_ACTION_COMMAND: &str = "git.commit.doSomething";
pub const SELECT_FILE_COMMAND: &str = "git.commit.file.select";

#[derive(Clone)]
pub struct Collaborators {
    pub service: Arc<dyn HistoryService>,
    pub ui: Arc<dyn UiChannel>,
    pub chrome: Arc<dyn UiChrome>,
    pub executor: Arc<dyn CommandExecutor>,
}

pub struct Handlers {
    service: Arc<dyn HistoryService>,
    ui: Arc<dyn UiChannel>,
    chrome: Arc<dyn UiChrome>,
    executor: Arc<dyn CommandExecutor>,
    avatars: AvatarProviders,
    subscriber: SubscriberSlot,
    default_page_size: u64,
    missing_origin_policy: MissingOriginPolicy,
}

fn to_payload<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|err| BridgeError::Handler(anyhow!("failed to encode result: {err}")))
}

/// `ref` may arrive as a bare name or as a `{type, name}` descriptor.
fn ref_name(payload: &Value) -> Result<String, BridgeError> {
    match payload.get("ref") {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        Some(descriptor @ Value::Object(_)) => required_string(descriptor, "name")
            .map_err(|_| BridgeError::validation("ref", "ref descriptor has no name")),
        _ => Err(BridgeError::validation("ref", "missing ref name")),
    }
}

impl Handlers {
    pub fn new(collaborators: Collaborators, avatars: AvatarProviders, settings: &Settings) -> Self {
        let Collaborators {
            service,
            ui,
            chrome,
            executor,
        } = collaborators;
        Self {
            service,
            ui,
            chrome,
            executor,
            avatars,
            subscriber: SubscriberSlot::default(),
            default_page_size: settings.default_page_size,
            missing_origin_policy: settings.missing_origin_policy,
        }
    }

    pub fn subscriber(&self) -> &SubscriberSlot {
        &self.subscriber
    }

    pub(crate) fn chrome(&self) -> &Arc<dyn UiChrome> {
        &self.chrome
    }

    pub async fn get_log_entries(&self, payload: Value) -> HandlerResult {
        let start_index = optional_index(&payload, "startIndex")?.unwrap_or(0);
        let stop_index = optional_index(&payload, "stopIndex")?
            .unwrap_or_else(|| start_index.saturating_add(self.default_page_size));
        if stop_index < start_index {
            return Err(BridgeError::validation(
                "stopIndex",
                format!("stopIndex {stop_index} is before startIndex {start_index}"),
            ));
        }

        let query = LogEntriesQuery {
            start_index,
            stop_index,
            branch: optional_string(&payload, "branch")?,
            search_text: optional_string(&payload, "searchText")?,
            file_path: optional_string(&payload, "file")?.map(PathBuf::from),
            line_number: optional_index(&payload, "lineNumber")?,
            author: optional_string(&payload, "author")?,
        };

        let entries = self.service.get_log_entries(&query).await?;
        to_payload(&LogEntriesPage::new(entries, &query))
    }

    pub async fn get_branches(&self, _payload: Value) -> HandlerResult {
        to_payload(&self.service.get_branches().await?)
    }

    pub async fn get_authors(&self, _payload: Value) -> HandlerResult {
        to_payload(&self.service.get_authors().await?)
    }

    pub async fn get_commit(&self, payload: Value) -> HandlerResult {
        let hash = required_string(&payload, "hash")?;
        let commit = self
            .service
            .get_commit(&hash, false)
            .await?
            .ok_or_else(|| anyhow!("commit '{hash}' not found"))?;
        let branch = self.service.current_branch().await?;

        self.chrome
            .view_commit_tree(self.service.repository_root(), branch, &commit);
        to_payload(&commit)
    }

    pub async fn get_avatars(&self, _payload: Value) -> HandlerResult {
        let Some(origin) = self.service.origin_type().await? else {
            return self.missing_origin();
        };

        let provider = self.avatars.select(origin);
        debug!(provider = provider.name(), ?origin, "fetching avatars");
        let avatars = provider.avatars(self.service.as_ref()).await?;
        to_payload(&avatars)
    }

    fn missing_origin(&self) -> HandlerResult {
        match self.missing_origin_policy {
            MissingOriginPolicy::Normalize => Err(BridgeError::MissingOriginType),
            MissingOriginPolicy::DirectPush => {
                if let Err(err) = self
                    .ui
                    .post_message(UiNotice::error(NO_ORIGIN_TYPE_MESSAGE).into())
                {
                    warn!("failed to push missing origin notice: {err:#}");
                }
                Ok(None)
            }
        }
    }

    /// Ref removals always answer with a freshly fetched commit.
    pub async fn do_action_ref(&self, payload: Value) -> HandlerResult {
        let hash = required_string(&payload, "hash")?;
        let action = optional_string(&payload, "name")?;

        match action.as_deref() {
            Some("removeTag") => self.service.remove_tag(&ref_name(&payload)?).await?,
            Some("removeBranch") => self.service.remove_branch(&ref_name(&payload)?).await?,
            Some("removeRemote") => {
                self.service
                    .remove_remote_branch(&ref_name(&payload)?)
                    .await?
            }
            other => debug!(action = ?other, "ignoring unknown ref action"),
        }

        to_payload(&self.service.get_commit(&hash, true).await?)
    }

    /// Tag and branch creation update the entry's refs locally instead of
    /// re-fetching it.
    pub async fn do_action(&self, payload: Value) -> HandlerResult {
        let action = required_string(&payload, "name")?;
        let mut log_entry: LogEntry = required(&payload, "logEntry")?;
        let hash = log_entry.hash.full.clone();

        match action.as_str() {
            "newtag" => {
                let tag = required_string(&payload, "value")?;
                self.service.create_tag(&tag, &hash).await?;
                log_entry.refs.push(Ref::tag(tag));
            }
            "newbranch" => {
                let branch = required_string(&payload, "value")?;
                self.service.create_branch(&branch, &hash).await?;
                log_entry.refs.push(Ref::head(branch));
            }
            "reset_hard" => {
                info!(%hash, "hard reset requested");
                self.service.reset_hard(&hash).await?;
            }
            "reset_soft" => {
                info!(%hash, "soft reset requested");
                self.service.reset_soft(&hash).await?;
            }
            other => {
                let detail = json!({
                    "name": other,
                    "logEntry": &log_entry,
                    "value": optional_value(&payload, "value"),
                });
                self.executor.execute(other, detail);
            }
        }

        to_payload(&log_entry)
    }

    pub async fn do_something_with_commit(&self, payload: Value) -> HandlerResult {
        let details = CommitDetails {
            repository_root: self.service.repository_root(),
            branch: self.service.current_branch().await?,
            log_entry: required(&payload, "logEntry")?,
        };
        self.execute(COMMIT_ACTION_COMMAND, &details)
    }

    pub async fn select_committed_file(&self, payload: Value) -> HandlerResult {
        let details = CommittedFileDetails {
            repository_root: self.service.repository_root(),
            branch: self.service.current_branch().await?,
            log_entry: required(&payload, "logEntry")?,
            committed_file: required(&payload, "committedFile")?,
        };
        self.execute(SELECT_FILE_COMMAND, &details)
    }

    fn execute<T: Serialize>(&self, command: &str, detail: &T) -> HandlerResult {
        let detail = serde_json::to_value(detail)
            .map_err(|err| BridgeError::Handler(anyhow!("failed to encode detail: {err}")))?;
        self.executor.execute(command, detail);
        Ok(None)
    }

    /// Stores the id verbatim; unlike other string fields, `""` is a valid id.
    pub async fn register_state(&self, payload: Value) -> HandlerResult {
        let request_id = match payload.get("requestId") {
            Some(Value::String(request_id)) => request_id.clone(),
            _ => return Err(BridgeError::validation("requestId", "missing required string")),
        };
        self.subscriber.register(request_id).await;
        Ok(None)
    }

    pub async fn send_state(&self, payload: Value) -> HandlerResult {
        Ok(Some(payload))
    }
}
