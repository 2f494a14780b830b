//! Boundary types for the shared-texture transport.
//!
//! A producer process registers a GPU texture in its context and announces a
//! named server; consumers bind to that server by name, poll for new frames and
//! fetch a context-local handle to the current texture. This crate only models
//! that boundary:
//!
//! ```text
//!   producer ──publish()──▶ Transport ◀──connect()/has_new_frame()/fetch_texture()── consumer
//! ```
//!
//! [`Transport`] is the trait consumers talk to. [`LoopbackTransport`] is an
//! in-process implementation where producer and consumer share one GPU
//! context; it backs the tests and the demo binary.

mod loopback;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use serde::{Deserialize, Serialize};

pub use loopback::{LoopbackServer, LoopbackTransport};

/// Description key holding the server's unique identifier.
pub const KEY_UUID: &str = "uuid";
/// Description key holding the name of the publishing application.
pub const KEY_APP_NAME: &str = "app_name";
/// Description key holding the server name chosen by the publisher.
pub const KEY_SERVER_NAME: &str = "server_name";

static INIT: Once = Once::new();
static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Performs the process-wide transport setup exactly once.
///
/// Returns `true` for the call that actually ran the initialization and
/// `false` for every later call.
pub fn initialize_once() -> bool {
    let mut ran = false;
    INIT.call_once(|| {
        ran = true;
        tracing::debug!("shared texture transport initialised");
    });
    ran
}

/// Whether [`initialize_once`] has completed in this process.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

/// Opaque identifier of a consumer's binding to one server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Identifies a GPU context. Texture handles are only meaningful inside the
/// context they were created in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Hands out a context id that is unique within this process.
    pub fn allocate() -> Self {
        ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Context-scoped name of a GPU texture. The transport owns the texture; a
/// holder of this value owns nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeTexture(pub u64);

impl fmt::Display for NativeTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Texture published by a server, as seen from a consumer at fetch time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedTexture {
    pub texture: NativeTexture,
    pub width: u32,
    pub height: u32,
    /// Publish sequence number of the server, starting at 1.
    pub generation: u64,
    pub context: ContextId,
}

/// Snapshot of the metadata a server advertises.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerDescription {
    entries: BTreeMap<String, String>,
}

impl ServerDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn app_name(&self) -> Option<&str> {
        self.get(KEY_APP_NAME)
    }

    pub fn server_name(&self) -> Option<&str> {
        self.get(KEY_SERVER_NAME)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.get(KEY_UUID)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ServerDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let app = self.app_name().unwrap_or("?");
        let server = self.server_name().unwrap_or("");
        if server.is_empty() {
            f.write_str(app)
        } else {
            write!(f, "{app} / {server}")
        }
    }
}

/// Consumer-facing side of a shared-texture transport.
///
/// Every call is non-blocking. Implementations report failure with `None`
/// or an empty description rather than errors; interpreting those states is
/// left to the caller.
pub trait Transport: Send + Sync {
    /// Enumerates the servers currently announced.
    fn list_servers(&self) -> Vec<ServerDescription>;

    /// Binds to the server matching `name`, by server name first and
    /// application name second.
    fn connect(&self, name: &str) -> Option<ConnectionId>;

    /// Metadata of the connected server; empty when the connection is gone.
    fn describe(&self, connection: ConnectionId) -> ServerDescription;

    /// True when the server published a frame newer than the last one this
    /// connection fetched. Never changes transport state.
    fn has_new_frame(&self, connection: ConnectionId) -> bool;

    /// Current texture of the server, resolved for `context`.
    fn fetch_texture(&self, connection: ConnectionId, context: ContextId)
        -> Option<SharedTexture>;

    /// Releases the binding. Unknown connections are ignored.
    fn disconnect(&self, connection: ConnectionId);
}
