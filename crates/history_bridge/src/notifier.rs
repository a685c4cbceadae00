use std::sync::Arc;

use serde_json::json;
use shared::protocol::{InboundEnvelope, OutboundEnvelope};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    dispatcher::{commands, Dispatcher},
    service::UiChannel,
};

/// Request id that state pushes are answered to. Holds one subscriber; a new
/// registration replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct SubscriberSlot(Arc<RwLock<Option<String>>>);

impl SubscriberSlot {
    pub async fn register(&self, request_id: String) {
        let previous = self.0.write().await.replace(request_id);
        if let Some(previous) = previous {
            debug!(%previous, "replacing state subscriber");
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.0.read().await.clone()
    }
}

/// Feeds backing-service state changes through the regular dispatch path.
pub struct StateNotifier {
    dispatcher: Arc<Dispatcher>,
    ui: Arc<dyn UiChannel>,
}

impl StateNotifier {
    pub fn new(dispatcher: Arc<Dispatcher>, ui: Arc<dyn UiChannel>) -> Self {
        Self { dispatcher, ui }
    }

    /// Envelope answered to the current subscriber, or to an empty request id
    /// when nobody has registered yet.
    pub async fn state_envelope(&self) -> InboundEnvelope {
        let request_id = self.dispatcher.subscriber().current().await.unwrap_or_default();
        InboundEnvelope::new(commands::SEND_STATE, request_id, json!({}))
    }

    pub async fn notify(&self) -> OutboundEnvelope {
        let envelope = self.state_envelope().await;
        let response = self.dispatcher.dispatch(envelope).await;
        if let Err(err) = self.ui.post_message(response.clone().into()) {
            warn!(request_id = response.request_id(), "failed to post state update: {err:#}");
        }
        response
    }
}

#[cfg(test)]
#[path = "tests/notifier_tests.rs"]
mod tests;
