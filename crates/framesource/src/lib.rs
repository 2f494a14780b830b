//! Frame acquisition for shared-texture consumers.
//!
//! A host render loop drives a [`FrameSource`] once per tick:
//!
//! ```text
//!   has_new_frame() ──no──▶ (next tick)
//!        │ yes
//!        ▼
//!   fetch_current_frame(ctx) ──▶ TextureFrame ──┬─▶ copy_to_surface(host, frame, dest)  GPU blit
//!                                               └─▶ copy_to_image(host, frame, dest)    CPU readback
//! ```
//!
//! - `source` binds to a named server on a [`transport::Transport`] and owns
//!   the connection.
//! - `frame` holds the non-owning [`TextureFrame`] token and its validity
//!   rules.
//! - `copy` implements the GPU blit and CPU readback paths.
//! - `lifecycle` is the exact-size reuse-or-allocate policy both paths share.
//! - `pixels` converts GPU-native texels into host ARGB.
//! - `host` declares what the host rendering context must provide;
//!   `software` is a CPU implementation of it.
//!
//! Everything here is single-threaded and non-blocking. A host that wants
//! retries simply calls again on its next tick.

mod copy;
mod error;
mod frame;
pub mod host;
pub mod lifecycle;
pub mod pixels;
mod software;
mod source;

pub use error::{FrameError, HostError};
pub use frame::{SourceId, TextureFrame};
pub use host::{
    Quad, QuadVertex, RenderHost, SurfaceReadback, TextureOrigin, TextureStore, TEXTURE_ORIGIN,
};
pub use lifecycle::{Allocation, Dimensions};
pub use pixels::PixelImage;
pub use software::{SoftwareHost, SoftwareSurface};
pub use source::FrameSource;
