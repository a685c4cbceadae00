use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{
        ActionedUser, Avatar, Branch, CommitHash, LogEntries, LogEntriesQuery, LogEntry,
        OriginType, StateChange,
    },
    error::ApiError,
    protocol::{InboundEnvelope, UiMessage},
};
use tokio::sync::{broadcast, mpsc};

use crate::{
    avatars::{AvatarProvider, AvatarProviders, OriginSupport},
    config::Settings,
    dispatcher::Dispatcher,
    handlers::{Collaborators, Handlers},
    service::{CommandExecutor, HistoryService, UiChannel, UiChrome},
};

pub const REPO_ROOT: &str = "/work/history";
pub const INBOUND_CAPACITY: usize = 64;
pub const STATE_CAPACITY: usize = 16;
const WAIT_LIMIT: Duration = Duration::from_secs(2);

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn log_entry(hash: &str) -> LogEntry {
    LogEntry {
        hash: CommitHash::new(hash),
        subject: format!("commit {hash}"),
        ..LogEntry::default()
    }
}

pub struct FakeHistoryService {
    entries: LogEntries,
    branches: Vec<Branch>,
    authors: Vec<ActionedUser>,
    commits: HashMap<String, LogEntry>,
    origin_type: Option<OriginType>,
    origin_url: Option<String>,
    fail_with: Option<String>,
    log_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    queries: Mutex<Vec<LogEntriesQuery>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl Default for FakeHistoryService {
    fn default() -> Self {
        let (state_tx, _) = broadcast::channel(STATE_CAPACITY);
        Self {
            entries: LogEntries::default(),
            branches: vec![Branch {
                name: "main".to_string(),
                current: true,
                remote: None,
            }],
            authors: Vec::new(),
            commits: HashMap::new(),
            origin_type: None,
            origin_url: None,
            fail_with: None,
            log_delay: None,
            calls: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            state_tx,
        }
    }
}

impl FakeHistoryService {
    pub fn with_authors(mut self, authors: Vec<ActionedUser>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_origin(mut self, origin_type: OriginType, origin_url: &str) -> Self {
        self.origin_type = Some(origin_type);
        self.origin_url = Some(origin_url.to_string());
        self
    }

    pub fn with_commit(mut self, entry: LogEntry) -> Self {
        self.commits.insert(entry.hash.full.clone(), entry);
        self
    }

    pub fn with_entries(mut self, items: Vec<LogEntry>) -> Self {
        self.entries = LogEntries {
            count: items.len() as u64,
            items,
        };
        self
    }

    pub fn with_log_delay(mut self, delay: Duration) -> Self {
        self.log_delay = Some(delay);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn queries(&self) -> Vec<LogEntriesQuery> {
        lock(&self.queries).clone()
    }

    pub fn emit_state_change(&self) {
        let _ = self.state_tx.send(StateChange {
            reason: Some("test".to_string()),
        });
    }

    pub fn state_subscribers(&self) -> usize {
        self.state_tx.receiver_count()
    }

    fn record(&self, call: String) -> Result<()> {
        lock(&self.calls).push(call);
        match &self.fail_with {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HistoryService for FakeHistoryService {
    async fn get_log_entries(&self, query: &LogEntriesQuery) -> Result<LogEntries> {
        lock(&self.queries).push(query.clone());
        if let Some(delay) = self.log_delay {
            tokio::time::sleep(delay).await;
        }
        self.record("get_log_entries".to_string())?;
        Ok(self.entries.clone())
    }

    async fn get_branches(&self) -> Result<Vec<Branch>> {
        self.record("get_branches".to_string())?;
        Ok(self.branches.clone())
    }

    async fn get_authors(&self) -> Result<Vec<ActionedUser>> {
        self.record("get_authors".to_string())?;
        Ok(self.authors.clone())
    }

    async fn get_commit(&self, hash: &str, refresh: bool) -> Result<Option<LogEntry>> {
        self.record(format!("get_commit {hash} refresh={refresh}"))?;
        Ok(self.commits.get(hash).cloned())
    }

    async fn create_tag(&self, tag_name: &str, hash: &str) -> Result<()> {
        self.record(format!("create_tag {tag_name} {hash}"))
    }

    async fn create_branch(&self, branch_name: &str, hash: &str) -> Result<()> {
        self.record(format!("create_branch {branch_name} {hash}"))
    }

    async fn remove_tag(&self, tag_name: &str) -> Result<()> {
        self.record(format!("remove_tag {tag_name}"))
    }

    async fn remove_branch(&self, branch_name: &str) -> Result<()> {
        self.record(format!("remove_branch {branch_name}"))
    }

    async fn remove_remote_branch(&self, remote_branch: &str) -> Result<()> {
        self.record(format!("remove_remote_branch {remote_branch}"))
    }

    async fn reset_soft(&self, hash: &str) -> Result<()> {
        self.record(format!("reset_soft {hash}"))
    }

    async fn reset_hard(&self, hash: &str) -> Result<()> {
        self.record(format!("reset_hard {hash}"))
    }

    async fn origin_type(&self) -> Result<Option<OriginType>> {
        Ok(self.origin_type)
    }

    async fn origin_url(&self) -> Result<Option<String>> {
        Ok(self.origin_url.clone())
    }

    async fn current_branch(&self) -> Result<String> {
        Ok("main".to_string())
    }

    fn repository_root(&self) -> PathBuf {
        PathBuf::from(REPO_ROOT)
    }

    fn subscribe_state_changes(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }
}

pub struct FakeUiChannel {
    inbound: Mutex<Vec<mpsc::Sender<InboundEnvelope>>>,
    posted_tx: mpsc::UnboundedSender<UiMessage>,
    posted_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<UiMessage>>,
}

impl Default for FakeUiChannel {
    fn default() -> Self {
        let (posted_tx, posted_rx) = mpsc::unbounded_channel();
        Self {
            inbound: Mutex::new(Vec::new()),
            posted_tx,
            posted_rx: tokio::sync::Mutex::new(posted_rx),
        }
    }
}

impl FakeUiChannel {
    /// Delivers to every open subscriber, waiting for room when one is full.
    pub async fn send(&self, envelope: InboundEnvelope) {
        let senders: Vec<_> = lock(&self.inbound)
            .iter()
            .filter(|sender| !sender.is_closed())
            .cloned()
            .collect();
        for sender in senders {
            let _ = sender.send(envelope.clone()).await;
        }
    }

    pub fn subscribers(&self) -> usize {
        lock(&self.inbound)
            .iter()
            .filter(|sender| !sender.is_closed())
            .count()
    }

    pub async fn next_posted(&self) -> UiMessage {
        let mut rx = self.posted_rx.lock().await;
        tokio::time::timeout(WAIT_LIMIT, rx.recv())
            .await
            .expect("timed out waiting for a posted message")
            .expect("posted channel closed")
    }

    pub async fn assert_nothing_posted(&self, within: Duration) {
        let mut rx = self.posted_rx.lock().await;
        let result = tokio::time::timeout(within, rx.recv()).await;
        assert!(result.is_err(), "unexpected message posted: {result:?}");
    }

    pub fn try_posted(&self) -> Vec<UiMessage> {
        let mut messages = Vec::new();
        if let Ok(mut rx) = self.posted_rx.try_lock() {
            while let Ok(message) = rx.try_recv() {
                messages.push(message);
            }
        }
        messages
    }
}

impl UiChannel for FakeUiChannel {
    fn subscribe_messages(&self) -> mpsc::Receiver<InboundEnvelope> {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        lock(&self.inbound).push(tx);
        rx
    }

    fn post_message(&self, message: UiMessage) -> Result<()> {
        self.posted_tx
            .send(message)
            .map_err(|_| anyhow!("ui channel closed"))
    }
}

#[derive(Default)]
pub struct RecordingChrome {
    errors: Mutex<Vec<ApiError>>,
    viewed: Mutex<Vec<(PathBuf, String, String)>>,
}

impl RecordingChrome {
    pub fn errors(&self) -> Vec<ApiError> {
        lock(&self.errors).clone()
    }

    pub fn viewed(&self) -> Vec<(PathBuf, String, String)> {
        lock(&self.viewed).clone()
    }
}

impl UiChrome for RecordingChrome {
    fn show_error(&self, error: &ApiError) {
        lock(&self.errors).push(error.clone());
    }

    fn view_commit_tree(&self, repository_root: PathBuf, branch: String, commit: &LogEntry) {
        lock(&self.viewed).push((repository_root, branch, commit.hash.full.clone()));
    }
}

#[derive(Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<(String, Value)>>,
}

impl RecordingExecutor {
    pub fn executed(&self) -> Vec<(String, Value)> {
        lock(&self.executed).clone()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &str, detail: Value) {
        lock(&self.executed).push((command.to_string(), detail));
    }
}

pub struct StaticAvatarProvider {
    name: &'static str,
    support: OriginSupport,
}

impl StaticAvatarProvider {
    pub fn new(name: &'static str, support: OriginSupport) -> Self {
        Self { name, support }
    }
}

#[async_trait]
impl AvatarProvider for StaticAvatarProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn support(&self) -> OriginSupport {
        self.support
    }

    async fn avatars(&self, _service: &dyn HistoryService) -> Result<Vec<Avatar>> {
        Ok(vec![Avatar {
            login: Some(self.name.to_string()),
            name: None,
            email: None,
            url: None,
            avatar_url: format!("https://avatars.test/{}", self.name),
        }])
    }
}

pub fn static_providers() -> AvatarProviders {
    AvatarProviders::new([
        Arc::new(StaticAvatarProvider::new(
            "github",
            OriginSupport::Only(OriginType::Github),
        )) as Arc<dyn AvatarProvider>,
        Arc::new(StaticAvatarProvider::new("generic", OriginSupport::Any)),
    ])
    .expect("providers")
}

/// All fakes wired together, kept around so tests can inspect them.
pub struct Harness {
    pub service: Arc<FakeHistoryService>,
    pub ui: Arc<FakeUiChannel>,
    pub chrome: Arc<RecordingChrome>,
    pub executor: Arc<RecordingExecutor>,
}

impl Harness {
    pub fn new(service: FakeHistoryService) -> Self {
        Self {
            service: Arc::new(service),
            ui: Arc::new(FakeUiChannel::default()),
            chrome: Arc::new(RecordingChrome::default()),
            executor: Arc::new(RecordingExecutor::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            service: self.service.clone(),
            ui: self.ui.clone(),
            chrome: self.chrome.clone(),
            executor: self.executor.clone(),
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher_with(&Settings::default())
    }

    pub fn dispatcher_with(&self, settings: &Settings) -> Dispatcher {
        Dispatcher::new(Handlers::new(
            self.collaborators(),
            static_providers(),
            settings,
        ))
    }
}
