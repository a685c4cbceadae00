use std::collections::HashMap;

use futures::future::BoxFuture;
use serde_json::Value;
use shared::protocol::{InboundEnvelope, OutboundEnvelope};
use tracing::{debug, warn};

use crate::{
    error::BridgeError,
    handlers::{HandlerResult, Handlers},
    notifier::SubscriberSlot,
};

pub mod commands {
    pub const GET_LOG_ENTRIES: &str = "getLogEntries";
    pub const GET_BRANCHES: &str = "getBranches";
    pub const GET_AUTHORS: &str = "getAuthors";
    pub const GET_COMMIT: &str = "getCommit";
    pub const GET_AVATARS: &str = "getAvatars";
    pub const DO_ACTION_REF: &str = "doActionRef";
    pub const DO_ACTION: &str = "doAction";
    pub const DO_SOMETHING_WITH_COMMIT: &str = "doSomethingWithCommit";
    pub const SELECT_COMMITTED_FILE: &str = "selectCommittedFile";
    pub const REGISTER_STATE: &str = "registerState";
    pub const SEND_STATE: &str = "sendState";
}

type HandlerFn = for<'a> fn(&'a Handlers, Value) -> BoxFuture<'a, HandlerResult>;

macro_rules! route {
    ($routes:ident, $command:expr, $method:ident) => {{
        fn call(handlers: &Handlers, payload: Value) -> BoxFuture<'_, HandlerResult> {
            Box::pin(handlers.$method(payload))
        }
        $routes.insert($command, call as HandlerFn);
    }};
}

/// Fixed mapping from command name to handler.
pub struct CommandTable {
    routes: HashMap<&'static str, HandlerFn>,
}

impl CommandTable {
    fn standard() -> Self {
        let mut routes = HashMap::new();
        route!(routes, commands::GET_LOG_ENTRIES, get_log_entries);
        route!(routes, commands::GET_BRANCHES, get_branches);
        route!(routes, commands::GET_AUTHORS, get_authors);
        route!(routes, commands::GET_COMMIT, get_commit);
        route!(routes, commands::GET_AVATARS, get_avatars);
        route!(routes, commands::DO_ACTION_REF, do_action_ref);
        route!(routes, commands::DO_ACTION, do_action);
        route!(routes, commands::DO_SOMETHING_WITH_COMMIT, do_something_with_commit);
        route!(routes, commands::SELECT_COMMITTED_FILE, select_committed_file);
        route!(routes, commands::REGISTER_STATE, register_state);
        route!(routes, commands::SEND_STATE, send_state);
        Self { routes }
    }

    fn get(&self, command: &str) -> Option<HandlerFn> {
        self.routes.get(command).copied()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.routes.contains_key(command)
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.routes.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Turns inbound envelopes into outbound ones. Never fails: every error ends
/// up as an error envelope and an error toast.
pub struct Dispatcher {
    table: CommandTable,
    handlers: Handlers,
}

impl Dispatcher {
    pub fn new(handlers: Handlers) -> Self {
        Self {
            table: CommandTable::standard(),
            handlers,
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn subscriber(&self) -> &SubscriberSlot {
        self.handlers.subscriber()
    }

    pub async fn dispatch(&self, envelope: InboundEnvelope) -> OutboundEnvelope {
        let InboundEnvelope {
            command,
            request_id,
            payload,
        } = envelope;

        let outcome = match self.table.get(&command) {
            Some(handler) => handler(&self.handlers, payload).await,
            None => Err(BridgeError::unknown_command(&command)),
        };

        match outcome {
            Ok(result) => {
                debug!(%command, %request_id, "command completed");
                OutboundEnvelope::success(request_id, result)
            }
            Err(err) => {
                warn!(%command, %request_id, "command failed: {err:#}");
                let api_error = err.to_api_error();
                self.handlers.chrome().show_error(&api_error);
                let error = serde_json::to_value(&api_error)
                    .unwrap_or_else(|_| Value::String(api_error.message.clone()));
                OutboundEnvelope::failure(request_id, error)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
