use transport::{ContextId, NativeTexture};

/// Failures reported by a host rendering context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("texture {0} is not known to this context")]
    UnknownTexture(NativeTexture),
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} elements, {expected} required")]
    BufferSize { expected: usize, actual: usize },
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by [`FrameSource`](crate::FrameSource) operations.
///
/// `NotConnected` and `NoFrameAvailable` are ordinary states a host checks
/// each tick. `ContextMismatch` and `StaleFrame` flag misuse of a frame token
/// and are asserted on in debug builds. `SizeMismatchInternal` indicates a
/// broken buffer lifecycle and should never be observed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame source '{name}' is not connected to a server")]
    NotConnected { name: String },
    #[error("server '{name}' has not published a frame")]
    NoFrameAvailable { name: String },
    #[error("frame belongs to GPU context {expected:?} but context {actual:?} is active")]
    ContextMismatch {
        expected: ContextId,
        actual: ContextId,
    },
    #[error("frame generation {frame} is stale (current generation {current:?})")]
    StaleFrame { frame: u64, current: Option<u64> },
    #[error("internal buffer size mismatch: expected {expected}, found {actual}")]
    SizeMismatchInternal { expected: usize, actual: usize },
    #[error(transparent)]
    Host(#[from] HostError),
}

impl FrameError {
    /// True for the states a host is expected to retry on its next tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FrameError::NotConnected { .. } | FrameError::NoFrameAvailable { .. }
        )
    }
}
