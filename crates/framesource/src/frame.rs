use transport::{ContextId, NativeTexture, SharedTexture};

/// Identifies the [`FrameSource`](crate::FrameSource) a frame was fetched by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(pub(crate) u64);

/// Non-owning token for the texture a server published.
///
/// The transport owns the GPU resource and may recycle it once the server
/// publishes again, so a frame is only valid until the next fetch on the same
/// source or until that source is closed. The handle is also scoped to the GPU
/// context it was fetched for; copying it on a thread or context other than
/// the one that was current at fetch time is undefined behaviour on real
/// transports. The copy paths check `source`, `generation` and `context` and
/// refuse frames that fail them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureFrame {
    pub(crate) source: SourceId,
    pub(crate) generation: u64,
    pub(crate) context: ContextId,
    pub(crate) texture: NativeTexture,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl TextureFrame {
    pub(crate) fn from_shared(source: SourceId, shared: SharedTexture) -> Self {
        Self {
            source,
            generation: shared.generation,
            context: shared.context,
            texture: shared.texture,
            width: shared.width,
            height: shared.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Publish sequence number of the frame on its server.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn texture(&self) -> NativeTexture {
        self.texture
    }

    /// Number of texels, i.e. the element count of a readback buffer.
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
