//! Receive loop, server listing and PNG export.
//!
//! Each tick the built-in pattern server publishes a frame, the frame source
//! polls for it and copies it through the configured path. The producer and
//! receiver share one render host, which is how a real host application
//! shares its GPU context with the transport.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Local;
use framesource::{
    Dimensions, FrameSource, PixelImage, RenderHost, SoftwareHost, SurfaceReadback, TextureStore,
};
use renderer::{GpuOptions, WgpuHost};
use tracing_subscriber::EnvFilter;
use transport::{ContextId, LoopbackTransport, Transport};

use crate::cli::RunArgs;
use crate::config::{Backend, CopyPath, FramelinkConfig};
use crate::paths::locate_config;
use crate::pattern::PatternServer;

/// Ticks to wait for the named server before giving up.
const CONNECT_ATTEMPTS: u32 = 20;

pub fn initialise_tracing() {
    let default_filter = "warn,framelink=info,framesource=info,renderer=info,transport=warn,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn load_config(explicit: Option<&Path>) -> Result<FramelinkConfig> {
    match locate_config(explicit)? {
        Some(path) => {
            let config = FramelinkConfig::load(&path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(FramelinkConfig::default()),
    }
}

pub fn run(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    config.validate().context("invalid options")?;

    let summary = match config.receiver.backend {
        Backend::Wgpu => match WgpuHost::new(GpuOptions::default()) {
            Ok(mut host) => {
                tracing::info!(adapter = %host.adapter_profile().name, "using wgpu host");
                receive(&mut host, &config)?
            }
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "wgpu unavailable; using software host"
                );
                receive(&mut SoftwareHost::new(), &config)?
            }
        },
        Backend::Software => receive(&mut SoftwareHost::new(), &config)?,
    };

    tracing::info!(
        frames = summary.frames,
        elapsed = ?summary.elapsed,
        "receive finished"
    );
    if let Some(path) = summary.exported {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn list(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let transport = LoopbackTransport::new();
    let _producer = PatternServer::announce(&transport, &config.producer, ContextId::allocate());

    let servers = FrameSource::list_servers(&transport);
    if servers.is_empty() {
        println!("No servers announced.");
    }
    for description in servers {
        println!("{}\t{}", description.uuid().unwrap_or("-"), description);
    }
    Ok(())
}

pub fn describe(name: &str, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let transport = LoopbackTransport::new();
    let _producer = PatternServer::announce(&transport, &config.producer, ContextId::allocate());

    let shared: Arc<dyn Transport> = Arc::new(transport);
    let source = FrameSource::connect(shared, name);
    if !source.is_connected() {
        bail!("no server named '{name}'");
    }
    let description = source.describe();
    if json {
        println!("{}", serde_json::to_string_pretty(&description)?);
    } else {
        for (key, value) in description.iter() {
            println!("{key}: {value}");
        }
    }
    Ok(())
}

#[derive(Debug)]
struct Summary {
    frames: u64,
    elapsed: Duration,
    exported: Option<PathBuf>,
}

fn receive<H>(host: &mut H, config: &FramelinkConfig) -> Result<Summary>
where
    H: RenderHost + SurfaceReadback + TextureStore,
{
    let transport = LoopbackTransport::new();
    let mut producer = PatternServer::announce(&transport, &config.producer, host.context_id());
    let shared: Arc<dyn Transport> = Arc::new(transport);
    let mut source = FrameSource::connect(shared, config.target_server());

    let started = Instant::now();
    let mut stats = FrameStats::new(started);
    let mut surface: Option<H::Surface> = None;
    let mut image: Option<PixelImage> = None;
    let mut idle_ticks = 0;

    while stats.total() < config.receiver.frames {
        producer.tick(host)?;

        if !source.try_connect() {
            idle_ticks += 1;
            if idle_ticks >= CONNECT_ATTEMPTS {
                bail!("no server named '{}' appeared", config.target_server());
            }
            thread::sleep(config.receiver.poll_interval);
            continue;
        }

        if source.has_new_frame() {
            let received = match config.receiver.path {
                CopyPath::Gpu => source.next_surface(host, &mut surface).map(|_| ()),
                CopyPath::Cpu => source.next_image(host, &mut image).map(|_| ()),
            };
            match received {
                Ok(()) => {
                    if let Some(fps) = stats.record(Instant::now()) {
                        tracing::info!(
                            fps = %format!("{fps:.1}"),
                            total = stats.total(),
                            "receiving"
                        );
                    }
                }
                Err(err) if err.is_recoverable() => {
                    tracing::debug!(error = %err, "frame skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        thread::sleep(config.receiver.poll_interval);
    }

    let exported = match &config.export.path {
        Some(target) => {
            let last = match (surface.as_ref(), image) {
                (Some(surface), _) => Some(host.read_surface(surface)?),
                (None, image) => image,
            };
            match last {
                Some(last) => Some(export_png(&last, target)?),
                None => None,
            }
        }
        None => None,
    };

    source.close();
    producer.shutdown(host);
    Ok(Summary {
        frames: stats.total(),
        elapsed: started.elapsed(),
        exported,
    })
}

/// Resolves `target` to a file name, using a timestamped name when it is a
/// directory.
pub fn export_file_name(target: &Path) -> PathBuf {
    if target.is_dir() {
        let stamp = Local::now().format("framelink-%Y%m%d-%H%M%S%.3f.png");
        target.join(stamp.to_string())
    } else {
        target.to_path_buf()
    }
}

pub fn export_png(frame: &PixelImage, target: &Path) -> Result<PathBuf> {
    let path = export_file_name(target);
    let (width, height) = frame.dimensions();
    let buffer = image::RgbaImage::from_raw(width, height, frame.to_rgba_bytes())
        .context("image buffer does not match its dimensions")?;
    buffer
        .save_with_format(&path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "frame exported");
    Ok(path)
}

/// Frames received in total and per one-second window.
#[derive(Debug)]
struct FrameStats {
    window_start: Instant,
    window_frames: u64,
    total: u64,
}

impl FrameStats {
    const WINDOW: Duration = Duration::from_secs(1);

    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            window_frames: 0,
            total: 0,
        }
    }

    fn total(&self) -> u64 {
        self.total
    }

    /// Counts one frame and returns the rate once a window has elapsed.
    fn record(&mut self, now: Instant) -> Option<f64> {
        self.total += 1;
        self.window_frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Self::WINDOW {
            return None;
        }
        let fps = self.window_frames as f64 / elapsed.as_secs_f64();
        self.window_start = now;
        self.window_frames = 0;
        Some(fps)
    }
}
