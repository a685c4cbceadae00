//! Request/response bridge between the commit-history webview and the
//! repository history service.
//!
//! The webview sends `{cmd, requestId, payload}` envelopes. The [`Dispatcher`]
//! looks the command up in a fixed [`CommandTable`], runs the handler and
//! answers with `{requestId, payload}` or `{requestId, error}`. Repository
//! state changes are pushed back through the same path as a synthetic
//! `sendState` command addressed to the request id registered with
//! `registerState`. [`BridgeSession`] owns both subscriptions.

pub mod avatars;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
mod lifecycle;
pub mod notifier;
mod payload;
pub mod service;
pub mod telemetry;

pub use avatars::{AvatarProvider, AvatarProviders, GithubProvider, GravatarProvider, OriginSupport};
pub use config::{load_settings, MissingOriginPolicy, Settings};
pub use dispatcher::{commands, CommandTable, Dispatcher};
pub use error::BridgeError;
pub use handlers::{Collaborators, Handlers};
pub use lifecycle::{BridgeSession, SessionError};
pub use notifier::{StateNotifier, SubscriberSlot};
pub use service::{CommandExecutor, HistoryService, UiChannel, UiChrome};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
