//! In-process test-pattern server.
//!
//! The pattern has a white band across the top of the picture, a horizontal
//! red ramp, a vertical green ramp and a blue bar that moves one step per
//! frame. Rows are stored bottom-up like every transport texture, so the
//! white band sits in the last stored rows.

use framesource::{HostError, TextureStore};
use transport::{ContextId, LoopbackServer, LoopbackTransport, NativeTexture};

use crate::config::ProducerConfig;

pub const MARKER: [u8; 4] = [255, 255, 255, 255];
pub const BAR: [u8; 4] = [0, 0, 255, 255];

#[derive(Debug, Clone, Copy)]
pub struct TestPattern {
    width: u32,
    height: u32,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rows covered by the marker band, counted from the top of the picture.
    pub fn marker_rows(&self) -> u32 {
        (self.height / 8).max(1)
    }

    fn bar_span(&self, frame: u64) -> (u32, u32) {
        let bar_width = (self.width / 16).max(1);
        let start = (frame * u64::from(bar_width) % u64::from(self.width)) as u32;
        (start, start + bar_width)
    }

    /// RGBA of picture pixel `(x, y)`, `y` counted from the top.
    pub fn pixel(&self, x: u32, y: u32, frame: u64) -> [u8; 4] {
        if y < self.marker_rows() {
            return MARKER;
        }
        let (bar_start, bar_end) = self.bar_span(frame);
        if (bar_start..bar_end).contains(&x) {
            return BAR;
        }
        let ramp = |value: u32, extent: u32| (value * 255 / extent.saturating_sub(1).max(1)) as u8;
        [ramp(x, self.width), ramp(y, self.height), 64, 255]
    }

    /// Texture contents for `frame`, bottom row first.
    pub fn render(&self, frame: u64) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for stored_row in 0..self.height {
            let y = self.height - 1 - stored_row;
            for x in 0..self.width {
                rgba.extend_from_slice(&self.pixel(x, y, frame));
            }
        }
        rgba
    }
}

/// Announced server that republishes the pattern each tick.
pub struct PatternServer {
    server: LoopbackServer,
    pattern: TestPattern,
    texture: Option<NativeTexture>,
    frame: u64,
}

impl PatternServer {
    pub fn announce(
        transport: &LoopbackTransport,
        config: &ProducerConfig,
        context: ContextId,
    ) -> Self {
        let server =
            LoopbackServer::announce(transport, &config.app_name, &config.server_name, context);
        tracing::info!(
            app_name = %config.app_name,
            server_name = %config.server_name,
            width = config.width,
            height = config.height,
            "test pattern server announced"
        );
        Self {
            server,
            pattern: TestPattern::new(config.width, config.height),
            texture: None,
            frame: 0,
        }
    }

    /// Draws the next frame into the shared texture and publishes it.
    pub fn tick(&mut self, host: &mut impl TextureStore) -> Result<u64, HostError> {
        let texture = match self.texture {
            Some(texture) => texture,
            None => {
                let texture = host.create_texture(self.pattern.width, self.pattern.height)?;
                self.texture = Some(texture);
                texture
            }
        };
        host.write_texture(texture, &self.pattern.render(self.frame))?;
        self.frame += 1;
        Ok(self
            .server
            .publish(texture, self.pattern.width, self.pattern.height))
    }

    /// Retires the server and frees its texture.
    pub fn shutdown(mut self, host: &mut impl TextureStore) {
        self.server.retire();
        if let Some(texture) = self.texture.take() {
            host.release_texture(texture);
        }
    }
}
