mod context;
mod pipeline;
mod readback;

pub(crate) use context::GpuContext;
pub(crate) use pipeline::{BlitPipeline, TEXTURE_FORMAT};
pub(crate) use readback::read_rows;
