use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use transport::{ConnectionId, ContextId, ServerDescription, Transport};

use crate::error::FrameError;
use crate::frame::{SourceId, TextureFrame};

static NEXT_SOURCE: AtomicU64 = AtomicU64::new(1);

/// A consumer's binding to one named server.
///
/// Construction never fails: when no server of that name exists yet the
/// source stays unconnected and [`try_connect`](Self::try_connect) can be
/// called again on a later tick. All methods must be called from the thread
/// that owns the active GPU context.
pub struct FrameSource {
    id: SourceId,
    name: String,
    transport: Arc<dyn Transport>,
    connection: Option<ConnectionId>,
    current_generation: Option<u64>,
    pub(crate) scratch: Vec<u32>,
    closed: bool,
}

impl FrameSource {
    /// Binds to the server called `name`, matched by server name or
    /// application name.
    pub fn connect(transport: Arc<dyn Transport>, name: impl Into<String>) -> Self {
        transport::initialize_once();
        let mut source = Self {
            id: SourceId(NEXT_SOURCE.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            transport,
            connection: None,
            current_generation: None,
            scratch: Vec::new(),
            closed: false,
        };
        if !source.try_connect() {
            tracing::debug!(name = %source.name, "no server yet; frame source left unconnected");
        }
        source
    }

    /// Descriptions of every server currently announced on `transport`.
    pub fn list_servers(transport: &dyn Transport) -> Vec<ServerDescription> {
        transport::initialize_once();
        transport.list_servers()
    }

    /// Attempts to bind if not yet connected. Returns whether the source is
    /// connected afterwards. A closed source stays closed.
    pub fn try_connect(&mut self) -> bool {
        if self.closed {
            return false;
        }
        if self.connection.is_none() {
            self.connection = self.transport.connect(&self.name);
            if let Some(connection) = self.connection {
                tracing::debug!(
                    name = %self.name,
                    connection = connection.0,
                    "frame source connected"
                );
            }
        }
        self.connection.is_some()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Metadata of the bound server; empty while unconnected.
    pub fn describe(&self) -> ServerDescription {
        match self.connection {
            Some(connection) => self.transport.describe(connection),
            None => ServerDescription::default(),
        }
    }

    /// Whether a frame newer than the last fetched one is waiting.
    pub fn has_new_frame(&self) -> bool {
        let available = self
            .connection
            .is_some_and(|connection| self.transport.has_new_frame(connection));
        tracing::trace!(name = %self.name, available, "polled for new frame");
        available
    }

    /// Fetches the server's current texture for the GPU context `context`.
    ///
    /// `context` must be the context current on the calling thread; the
    /// returned frame is only valid inside it and only until the next fetch.
    /// Safe to call without a prior [`has_new_frame`](Self::has_new_frame):
    /// it then returns the latest frame again or fails immediately.
    pub fn fetch_current_frame(&mut self, context: ContextId) -> Result<TextureFrame, FrameError> {
        let connection = self.connection.ok_or_else(|| FrameError::NotConnected {
            name: self.name.clone(),
        })?;
        let shared = self
            .transport
            .fetch_texture(connection, context)
            .ok_or_else(|| FrameError::NoFrameAvailable {
                name: self.name.clone(),
            })?;
        self.current_generation = Some(shared.generation);
        Ok(TextureFrame::from_shared(self.id, shared))
    }

    /// Checks that `frame` came from this source's latest fetch and that
    /// `context` is the one it was fetched for.
    pub(crate) fn validate(
        &self,
        frame: &TextureFrame,
        context: ContextId,
    ) -> Result<(), FrameError> {
        let current = if self.closed {
            None
        } else {
            self.current_generation
        };
        let fresh = frame.source == self.id && current == Some(frame.generation);
        debug_assert!(
            fresh,
            "texture frame used after its fetch cycle ended (generation {})",
            frame.generation
        );
        if !fresh {
            return Err(FrameError::StaleFrame {
                frame: frame.generation,
                current,
            });
        }
        debug_assert_eq!(
            frame.context, context,
            "texture frame used outside the GPU context it was fetched for"
        );
        if frame.context != context {
            return Err(FrameError::ContextMismatch {
                expected: frame.context,
                actual: context,
            });
        }
        Ok(())
    }

    /// Releases the transport binding and the readback buffer. Safe to call
    /// any number of times.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.transport.disconnect(connection);
            tracing::debug!(name = %self.name, "frame source closed");
        }
        self.closed = true;
        self.current_generation = None;
        self.scratch = Vec::new();
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSource")
            .field("name", &self.name)
            .field("connection", &self.connection)
            .field("current_generation", &self.current_generation)
            .field("closed", &self.closed)
            .finish()
    }
}
