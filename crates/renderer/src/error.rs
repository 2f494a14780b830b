use framesource::HostError;
use thiserror::Error;

/// Failures inside the wgpu host. They reach the copy paths as
/// [`HostError::Backend`].
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("texture size {width}x{height} exceeds adapter limit {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
    #[error("GPU readback failed: {0}")]
    Readback(String),
}

impl From<RendererError> for HostError {
    fn from(err: RendererError) -> Self {
        HostError::Backend(err.to_string())
    }
}
