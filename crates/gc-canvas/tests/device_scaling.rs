//! Integration tests: pixel-ratio resolution and backing-store sizing
//! (gc-canvas).

use gc_canvas::{Canvas, FrameQueue};
use gc_core::kurbo::Affine;
use gc_core::{CanvasConfig, Renderer};
use gc_render::recording::{DrawCall, RecordingContext, RecordingSurface};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn make_canvas(config: CanvasConfig, host_ratio: f64) -> (Canvas, RecordingContext) {
    init_logging();
    let mut surface = RecordingSurface::new(host_ratio);
    let canvas = Canvas::new(config, &mut surface, Box::new(FrameQueue::new())).unwrap();
    (canvas, surface.context.clone())
}

#[test]
fn ratio_two_doubles_the_backing_store() {
    let mut config = CanvasConfig::new(100.0, 100.0);
    config.pixel_ratio = Some(2.0);
    let (canvas, ctx) = make_canvas(config, 1.0);

    assert_eq!(canvas.pixel_ratio(), 2);
    assert_eq!(ctx.with(|r| r.device_size()), (200, 200));
    assert_eq!(ctx.with(|r| r.current_transform()), Affine::scale(2.0));
    assert_eq!(canvas.device_surface().device_size(), (200, 200));
}

#[test]
fn host_ratio_is_used_when_unconfigured() {
    let (canvas, ctx) = make_canvas(CanvasConfig::new(100.0, 50.0), 1.5);
    assert_eq!(canvas.pixel_ratio(), 2);
    assert_eq!(ctx.with(|r| r.device_size()), (200, 100));

    let (canvas, ctx) = make_canvas(CanvasConfig::new(100.0, 50.0), 0.5);
    assert_eq!(canvas.pixel_ratio(), 1);
    assert_eq!(ctx.with(|r| r.device_size()), (100, 50));
    assert_eq!(ctx.with(|r| r.current_transform()), Affine::IDENTITY);
}

#[test]
fn configured_ratio_below_one_is_coerced() {
    let mut config = CanvasConfig::new(100.0, 100.0);
    config.pixel_ratio = Some(0.25);
    let (canvas, _) = make_canvas(config, 3.0);
    assert_eq!(canvas.pixel_ratio(), 1);
}

#[test]
fn resize_is_idempotent_and_never_compounds_the_scale() {
    let mut config = CanvasConfig::new(100.0, 100.0);
    config.pixel_ratio = Some(2.0);
    let (mut canvas, ctx) = make_canvas(config, 1.0);

    canvas.change_size(150.0, 80.0).unwrap();
    let once = ctx.with(|r| (r.device_size(), r.current_transform()));
    canvas.change_size(150.0, 80.0).unwrap();
    let twice = ctx.with(|r| (r.device_size(), r.current_transform()));

    assert_eq!(once, ((300, 160), Affine::scale(2.0)));
    assert_eq!(once, twice);
    assert_eq!(canvas.viewport().width, 150.0);
    assert_eq!(ctx.with(|r| r.count(|c| matches!(c, DrawCall::Resize { .. }))), 3);
}

#[test]
fn shrinking_and_restoring_matches_a_fresh_canvas() {
    let mut config = CanvasConfig::new(100.0, 100.0);
    config.pixel_ratio = Some(2.0);
    let (fresh, fresh_ctx) = make_canvas(config.clone(), 1.0);
    let (mut resized, resized_ctx) = make_canvas(config, 1.0);

    resized.change_size(50.0, 50.0).unwrap();
    assert_eq!(resized_ctx.with(|r| r.device_size()), (100, 100));
    resized.change_size(100.0, 100.0).unwrap();

    let state = |ctx: &RecordingContext| ctx.with(|r| (r.device_size(), r.current_transform()));
    assert_eq!(state(&resized_ctx), state(&fresh_ctx));
    assert_eq!(state(&resized_ctx), ((200, 200), Affine::scale(2.0)));
    assert_eq!(
        resized.device_surface().device_size(),
        fresh.device_surface().device_size()
    );
    assert_eq!(resized.viewport(), fresh.viewport());
}

#[test]
fn constrained_resize_resets_instead_of_reallocating() {
    let mut config = CanvasConfig::new(100.0, 100.0);
    config.pixel_ratio = Some(2.0);
    config.renderer = Renderer::ConstrainedPlatform;
    let (mut canvas, ctx) = make_canvas(config, 1.0);

    canvas.change_size(120.0, 120.0).unwrap();
    canvas.change_size(120.0, 120.0).unwrap();

    assert_eq!(ctx.with(|r| r.current_transform()), Affine::scale(2.0));
    assert_eq!(ctx.with(|r| r.count(|c| matches!(c, DrawCall::Resize { .. }))), 0);
    assert_eq!(canvas.device_surface().device_size(), (240, 240));
}

#[test]
fn invalid_resize_is_rejected_and_leaves_the_canvas_alone() {
    let (mut canvas, ctx) = make_canvas(CanvasConfig::new(100.0, 100.0), 1.0);
    ctx.take_calls();
    assert!(canvas.change_size(f64::INFINITY, 10.0).is_err());
    assert_eq!(canvas.viewport().width, 100.0);
    assert!(ctx.calls().is_empty());
}
