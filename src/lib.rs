//! Hot-reload coordination for JSON-driven UI manifests.
//!
//! The server side watches a base project plus externally-mounted
//! ensemble projects, rewrites changed physical paths into the logical
//! addressing scheme, and broadcasts `json-reload` notifications over
//! WebSocket. The client side gates pending reloads behind the manifest
//! rebuild sentinel, then fetches the fresh manifest and splices each
//! changed fragment.

pub mod alias;
pub mod channel;
pub mod client;
pub mod config;
pub mod logging;
pub mod server;
pub mod watcher;

pub use alias::{AliasTable, EnsembleOverride};
pub use channel::{JSON_RELOAD_EVENT, ReloadChannel, ReloadEvent};
pub use config::Settings;
pub use watcher::{WatchError, WatchOrchestrator};
