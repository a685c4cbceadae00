//! Wire protocol and history domain values exchanged between the history
//! webview and the bridge.

pub mod domain;
pub mod error;
pub mod protocol;
