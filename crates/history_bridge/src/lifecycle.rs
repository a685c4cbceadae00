use std::sync::{Arc, Mutex};

use futures::StreamExt;
use shared::protocol::InboundEnvelope;
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, warn};

use crate::{
    avatars::AvatarProviders,
    config::Settings,
    dispatcher::Dispatcher,
    handlers::{Collaborators, Handlers},
    notifier::StateNotifier,
    service::{HistoryService, UiChannel},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("bridge session is already active")]
    AlreadyActive,
    #[error("bridge session has been disposed")]
    Disposed,
}

enum SessionState {
    Constructed,
    Active {
        inbound: JoinHandle<()>,
        state_changes: JoinHandle<()>,
    },
    Disposed,
}

/// Owns the UI message subscription and the state-change subscription.
///
/// `start` binds both, `dispose` releases both exactly once. Dropping an
/// active session disposes it.
pub struct BridgeSession {
    dispatcher: Arc<Dispatcher>,
    notifier: Arc<StateNotifier>,
    service: Arc<dyn HistoryService>,
    ui: Arc<dyn UiChannel>,
    state: Mutex<SessionState>,
}

impl BridgeSession {
    pub fn new(collaborators: Collaborators, avatars: AvatarProviders, settings: &Settings) -> Self {
        let service = Arc::clone(&collaborators.service);
        let ui = Arc::clone(&collaborators.ui);
        let dispatcher = Arc::new(Dispatcher::new(Handlers::new(
            collaborators,
            avatars,
            settings,
        )));
        let notifier = Arc::new(StateNotifier::new(Arc::clone(&dispatcher), Arc::clone(&ui)));

        Self {
            dispatcher,
            notifier,
            service,
            ui,
            state: Mutex::new(SessionState::Constructed),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.lock_state(), SessionState::Active { .. })
    }

    /// Subscribes to both sources and spawns their pumps on the current tokio
    /// runtime.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut state = self.lock_state();
        match *state {
            SessionState::Active { .. } => return Err(SessionError::AlreadyActive),
            SessionState::Disposed => return Err(SessionError::Disposed),
            SessionState::Constructed => {}
        }

        let inbound = tokio::spawn(pump_inbound(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.ui),
            self.ui.subscribe_messages(),
        ));
        let state_changes = tokio::spawn(pump_state_changes(
            Arc::clone(&self.notifier),
            self.service.subscribe_state_changes(),
        ));

        *state = SessionState::Active {
            inbound,
            state_changes,
        };
        info!("history bridge session started");
        Ok(())
    }

    /// Releases both subscriptions. Returns `false` when there was nothing left
    /// to release. Commands already dispatched still run to completion.
    pub fn dispose(&self) -> bool {
        let previous = std::mem::replace(&mut *self.lock_state(), SessionState::Disposed);
        match previous {
            SessionState::Active {
                inbound,
                state_changes,
            } => {
                inbound.abort();
                state_changes.abort();
                info!("history bridge session disposed");
                true
            }
            SessionState::Constructed => true,
            SessionState::Disposed => false,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for BridgeSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn pump_inbound(
    dispatcher: Arc<Dispatcher>,
    ui: Arc<dyn UiChannel>,
    mut receiver: mpsc::Receiver<InboundEnvelope>,
) {
    while let Some(envelope) = receiver.recv().await {
        // one task per command so a slow handler never holds up the rest
        let dispatcher = Arc::clone(&dispatcher);
        let ui = Arc::clone(&ui);
        tokio::spawn(async move {
            let response = dispatcher.dispatch(envelope).await;
            let request_id = response.request_id().to_string();
            if let Err(err) = ui.post_message(response.into()) {
                warn!(%request_id, "failed to post response: {err:#}");
            }
        });
    }
    debug!("ui message stream closed");
}

async fn pump_state_changes(
    notifier: Arc<StateNotifier>,
    receiver: broadcast::Receiver<shared::domain::StateChange>,
) {
    let mut changes = BroadcastStream::new(receiver);
    while let Some(change) = changes.next().await {
        match change {
            Ok(change) => {
                debug!(reason = ?change.reason, "repository state changed");
                notifier.notify().await;
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                // one push covers any number of missed changes
                warn!(skipped, "state changes coalesced");
                notifier.notify().await;
            }
        }
    }
    debug!("state change stream closed");
}

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod tests;
