use std::sync::Arc;

use framesource::pixels::argb;
use framesource::{
    Dimensions, FrameError, FrameSource, PixelImage, RenderHost, SoftwareHost, SurfaceReadback,
    TextureStore,
};
use transport::{LoopbackServer, LoopbackTransport, NativeTexture, Transport};

const RED: [u8; 4] = [200, 10, 20, 255];
const GREEN: [u8; 4] = [5, 180, 40, 128];
const GREY: [u8; 4] = [90, 90, 90, 255];

struct Rig {
    host: SoftwareHost,
    loopback: LoopbackTransport,
    server: LoopbackServer,
    source: FrameSource,
}

impl Rig {
    fn new() -> Self {
        let host = SoftwareHost::new();
        let loopback = LoopbackTransport::new();
        let server = LoopbackServer::announce(&loopback, "Tests", "Pattern", host.context_id());
        let transport: Arc<dyn Transport> = Arc::new(loopback.clone());
        let source = FrameSource::connect(transport, "Pattern");
        Self {
            host,
            loopback,
            server,
            source,
        }
    }

    /// Publishes a frame whose first stored row is `first`, last stored row is
    /// `last` and everything in between is grey.
    fn publish(&mut self, width: u32, height: u32, first: [u8; 4], last: [u8; 4]) -> NativeTexture {
        let texture = self.host.create_texture(width, height).unwrap();
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for row in 0..height {
            let color = if row == 0 {
                first
            } else if row == height - 1 {
                last
            } else {
                GREY
            };
            for _ in 0..width {
                rgba.extend_from_slice(&color);
            }
        }
        self.host.write_texture(texture, &rgba).unwrap();
        self.server.publish(texture, width, height);
        texture
    }
}

fn to_argb([r, g, b, a]: [u8; 4]) -> u32 {
    argb(a, r, g, b)
}

#[test]
fn surface_path_allocates_exact_size() {
    let mut rig = Rig::new();
    rig.publish(16, 9, RED, GREEN);

    let frame = rig.source.fetch_current_frame(rig.host.context_id()).unwrap();
    let mut dest = None;
    let surface = rig
        .source
        .copy_to_surface(&mut rig.host, &frame, &mut dest)
        .unwrap();
    assert_eq!(surface.dimensions(), (16, 9));
    assert_eq!(rig.host.surfaces_created(), 1);
}

#[test]
fn surface_path_reuses_matching_destination() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(8, 8, RED, GREEN);
    let first_id = rig.source.next_surface(&mut rig.host, &mut dest).unwrap().id();

    rig.publish(8, 8, GREEN, RED);
    assert!(rig.source.has_new_frame());
    let second = rig.source.next_surface(&mut rig.host, &mut dest).unwrap();
    assert_eq!(second.id(), first_id);
    assert_eq!(rig.host.surfaces_created(), 1);
}

#[test]
fn surface_survives_a_missed_fetch() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(4, 4, RED, GREEN);
    let first_id = rig.source.next_surface(&mut rig.host, &mut dest).unwrap().id();

    rig.server.retire();
    let err = rig.source.next_surface(&mut rig.host, &mut dest).unwrap_err();
    assert!(matches!(err, FrameError::NoFrameAvailable { .. }));
    assert_eq!(dest.as_ref().map(|surface| surface.id()), Some(first_id));

    let context = rig.host.context_id();
    rig.server = LoopbackServer::announce(&rig.loopback, "Tests", "Pattern", context);
    rig.source = FrameSource::connect(Arc::new(rig.loopback.clone()), "Pattern");
    rig.publish(4, 4, GREEN, RED);
    let second = rig.source.next_surface(&mut rig.host, &mut dest).unwrap();
    assert_eq!(second.id(), first_id);
    assert_eq!(second.pixel(0, 0), Some(RED));
    assert_eq!(rig.host.surfaces_created(), 1);
}

#[test]
fn surface_path_reallocates_on_dimension_change() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(8, 8, RED, GREEN);
    rig.source.next_surface(&mut rig.host, &mut dest).unwrap();

    rig.publish(12, 4, RED, GREEN);
    let second = rig.source.next_surface(&mut rig.host, &mut dest).unwrap();
    assert_eq!(second.dimensions(), (12, 4));
    assert_eq!(rig.host.surfaces_created(), 2);
}

#[test]
fn surface_path_flips_vertically() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(5, 4, RED, GREEN);
    let surface = rig.source.next_surface(&mut rig.host, &mut dest).unwrap();

    for x in 0..5 {
        assert_eq!(surface.pixel(x, 0), Some(GREEN));
        assert_eq!(surface.pixel(x, 1), Some(GREY));
        assert_eq!(surface.pixel(x, 3), Some(RED));
    }

    let image = rig.host.read_surface(surface).unwrap();
    assert_eq!(image.pixel(0, 0), Some(to_argb(GREEN)));
    assert_eq!(image.pixel(4, 3), Some(to_argb(RED)));
}

#[test]
fn image_path_has_one_element_per_texel() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(7, 3, RED, GREEN);
    let image = rig.source.next_image(&mut rig.host, &mut dest).unwrap();
    assert_eq!(image.pixels().len(), 21);
    assert_eq!(image.dimensions(), (7, 3));
    assert!(!image.is_dirty());
    assert_eq!(image.revision(), 1);
}

#[test]
fn image_path_flips_and_converts() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(3, 3, RED, GREEN);
    let image = rig.source.next_image(&mut rig.host, &mut dest).unwrap();

    assert_eq!(image.row(0).unwrap(), &[to_argb(GREEN); 3]);
    assert_eq!(image.row(1).unwrap(), &[to_argb(GREY); 3]);
    assert_eq!(image.row(2).unwrap(), &[to_argb(RED); 3]);
}

#[test]
fn image_path_converts_known_texel() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(1, 1, [10, 20, 30, 255], [10, 20, 30, 255]);
    let image = rig.source.next_image(&mut rig.host, &mut dest).unwrap();
    assert_eq!(image.pixel(0, 0), Some(0xFF0A141E));
}

#[test]
fn image_path_reuses_destination_and_readback_buffer() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(6, 2, RED, GREEN);
    let first_ptr = rig
        .source
        .next_image(&mut rig.host, &mut dest)
        .unwrap()
        .pixels()
        .as_ptr();
    assert_eq!(rig.source.readback_capacity(), 12);

    rig.publish(6, 2, GREEN, RED);
    let second = rig.source.next_image(&mut rig.host, &mut dest).unwrap();
    assert_eq!(second.pixels().as_ptr(), first_ptr);
    assert_eq!(second.revision(), 2);
    assert_eq!(second.row(0).unwrap(), &[to_argb(RED); 6]);
    assert_eq!(rig.source.readback_capacity(), 12);
}

#[test]
fn image_survives_a_refused_frame() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(3, 2, RED, GREEN);
    let first_ptr = rig
        .source
        .next_image(&mut rig.host, &mut dest)
        .unwrap()
        .pixels()
        .as_ptr();

    rig.source.close();
    let err = rig.source.next_image(&mut rig.host, &mut dest).unwrap_err();
    assert!(matches!(err, FrameError::NotConnected { .. }));
    let kept = dest.as_ref().unwrap();
    assert_eq!(kept.pixels().as_ptr(), first_ptr);
    assert_eq!(kept.row(0).unwrap(), &[to_argb(GREEN); 3]);
}

#[test]
fn image_path_reallocates_on_dimension_change() {
    let mut rig = Rig::new();
    let mut dest = None;
    rig.publish(6, 2, RED, GREEN);
    rig.source.next_image(&mut rig.host, &mut dest).unwrap();

    rig.publish(3, 5, RED, GREEN);
    let second = rig.source.next_image(&mut rig.host, &mut dest).unwrap();
    assert_eq!(second.dimensions(), (3, 5));
    assert_eq!(second.revision(), 1);
    assert_eq!(rig.source.readback_capacity(), 15);
}

#[test]
fn readback_buffer_survives_destination_swaps() {
    let mut rig = Rig::new();
    rig.publish(4, 4, RED, GREEN);
    rig.source.next_image(&mut rig.host, &mut None).unwrap();

    // A differently sized caller-provided image is replaced, but the readback
    // buffer already matches and is kept.
    rig.publish(4, 4, RED, GREEN);
    let mut dest = Some(PixelImage::new(2, 2));
    let image = rig.source.next_image(&mut rig.host, &mut dest).unwrap();
    assert_eq!(image.dimensions(), (4, 4));
    assert_eq!(rig.source.readback_capacity(), 16);
    assert_eq!(rig.host.readbacks(), 2);
}

#[test]
fn fetch_errors_are_recoverable() {
    let host = SoftwareHost::new();
    let loopback = LoopbackTransport::new();
    let transport: Arc<dyn Transport> = Arc::new(loopback.clone());

    let mut missing = FrameSource::connect(transport.clone(), "Pattern");
    let err = missing.fetch_current_frame(host.context_id()).unwrap_err();
    assert!(matches!(err, FrameError::NotConnected { .. }));
    assert!(err.is_recoverable());

    let _server = LoopbackServer::announce(&loopback, "Tests", "Pattern", host.context_id());
    assert!(missing.try_connect());
    let err = missing.fetch_current_frame(host.context_id()).unwrap_err();
    assert!(matches!(err, FrameError::NoFrameAvailable { .. }));
    assert!(err.is_recoverable());
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "after its fetch cycle ended"))]
fn stale_frames_are_refused() {
    let mut rig = Rig::new();
    rig.publish(2, 2, RED, GREEN);
    let old = rig.source.fetch_current_frame(rig.host.context_id()).unwrap();
    rig.publish(2, 2, GREEN, RED);
    let _new = rig.source.fetch_current_frame(rig.host.context_id()).unwrap();

    let err = rig
        .source
        .copy_to_image(&mut rig.host, &old, &mut None)
        .unwrap_err();
    assert_eq!(
        err,
        FrameError::StaleFrame {
            frame: 1,
            current: Some(2)
        }
    );
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "outside the GPU context"))]
fn foreign_context_is_refused() {
    let mut rig = Rig::new();
    rig.publish(2, 2, RED, GREEN);
    let frame = rig.source.fetch_current_frame(rig.host.context_id()).unwrap();

    let mut other = SoftwareHost::new();
    let err = rig
        .source
        .copy_to_surface(&mut other, &frame, &mut None)
        .unwrap_err();
    assert!(matches!(err, FrameError::ContextMismatch { .. }));
}

#[test]
#[cfg_attr(debug_assertions, should_panic(expected = "after its fetch cycle ended"))]
fn frames_die_with_their_source() {
    let mut rig = Rig::new();
    rig.publish(2, 2, RED, GREEN);
    let frame = rig.source.fetch_current_frame(rig.host.context_id()).unwrap();
    rig.source.close();

    let err = rig
        .source
        .copy_to_image(&mut rig.host, &frame, &mut None)
        .unwrap_err();
    assert!(matches!(err, FrameError::StaleFrame { current: None, .. }));
}
