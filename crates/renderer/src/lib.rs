//! wgpu implementation of the framesource host traits.
//!
//! ```text
//!   WgpuHost ──▶ GpuContext (headless device + queue)
//!      │
//!      ├─ draw_textured_quad ─▶ BlitPipeline ─▶ offscreen WgpuSurface
//!      └─ read_texture / read_surface ─▶ padded copy ─▶ map_async ─▶ u32 rows
//! ```
//!
//! The host keeps its own texture registry, which is what the in-process
//! producer in `framelink` publishes from. Sampling uses integer texel
//! coordinates so the pipeline needs neither a sampler nor normalised
//! texture coordinates.

mod compile;
mod error;
mod gpu;
mod host;
mod types;

pub use error::RendererError;
pub use host::{WgpuHost, WgpuSurface};
pub use types::{AdapterProfile, GpuMemoryMode, GpuOptions, GpuPowerPreference};
