//! Integration tests for EffectHost
//!
//! These tests drive a host against the headless backend:
//! - Mount/unmount handle accounting
//! - Capability gating on narrow and mobile viewports
//! - Debounced resize regeneration
//! - Tier changes while mounted

use std::rc::Rc;

use glam::Vec2;
use lumenrain_core::{EffectHost, EffectsConfig};
use lumenrain_platform::headless::{
    HeadlessScheduler, HeadlessViewport, MemoryContainer, RecordingSurface,
};
use lumenrain_platform::{ColumnContainer, ViewportSize};

const DESKTOP_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36";
const IPHONE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

struct Fixture {
    scheduler: Rc<HeadlessScheduler>,
    viewport: HeadlessViewport,
    container: MemoryContainer,
    falling: RecordingSurface,
    orbit: RecordingSurface,
    host: EffectHost,
}

fn fixture(width: f32, user_agent: &str) -> Fixture {
    let scheduler = Rc::new(HeadlessScheduler::new());
    let viewport = HeadlessViewport::new(ViewportSize::new(width, 900.0), Some(user_agent));
    let container = MemoryContainer::new(width);
    let falling = RecordingSurface::new(Vec2::new(240.0, 240.0));
    let orbit = RecordingSurface::new(Vec2::new(320.0, 320.0));
    let mut host = EffectHost::new(
        EffectsConfig::default(),
        scheduler.clone(),
        Rc::new(viewport.clone()),
    )
    .with_seed(42);
    host.add_rain(Box::new(container.clone()));
    host.add_falling_logo(Some(Box::new(falling.clone())));
    host.add_orbit_logo(Some(Box::new(orbit.clone())));
    Fixture {
        scheduler,
        viewport,
        container,
        falling,
        orbit,
        host,
    }
}

/// Resizes the viewport `events` times, 5 ms apart, then waits out the
/// debounce window.
fn resize_burst(f: &Fixture, width: f32, events: usize) {
    f.container.set_width(width);
    for _ in 0..events {
        f.viewport.resize(ViewportSize::new(width, 900.0));
        f.scheduler.advance(5.0);
    }
    f.scheduler.advance(300.0);
}

// =============================================================================
// Mount / Unmount
// =============================================================================

#[test]
fn desktop_mount_starts_rain_and_both_glows() {
    let mut f = fixture(1536.0, DESKTOP_UA);
    f.host.mount().unwrap();

    assert!(!f.host.capability().is_constrained_device);
    assert_eq!(f.container.child_count(), 76);
    assert_eq!(f.container.opacity(), f.host.config().rain.opacity);
    assert_eq!(f.host.lifecycle().live_handles(), 2);
    assert_eq!(f.scheduler.pending_frames(), 2);
    assert_eq!(f.viewport.listener_count(), 1);
    assert_eq!(
        f.host.active_effects(),
        vec!["rain", "falling-logo", "orbit-logo"]
    );
}

#[test]
fn frames_render_every_glow_once_per_frame() {
    let mut f = fixture(1280.0, DESKTOP_UA);
    f.host.mount().unwrap();
    assert_eq!(f.scheduler.run_frames(30), 60);
    assert_eq!(f.falling.frames_drawn(), 30);
    assert_eq!(f.orbit.frames_drawn(), 30);
    assert_eq!(f.falling.circle_count(), 60);
    assert_eq!(f.orbit.circle_count(), 5);
    assert_eq!(f.host.lifecycle().live_handles(), 2);
}

#[test]
fn unmount_releases_the_single_particle_loop() {
    let scheduler = Rc::new(HeadlessScheduler::new());
    let viewport = HeadlessViewport::new(ViewportSize::new(1440.0, 900.0), Some(DESKTOP_UA));
    let surface = RecordingSurface::new(Vec2::new(200.0, 200.0));
    let mut host = EffectHost::new(
        EffectsConfig::default(),
        scheduler.clone(),
        Rc::new(viewport.clone()),
    );
    host.add_orbit_logo(Some(Box::new(surface.clone())));
    host.mount().unwrap();
    scheduler.run_frames(3);

    host.unmount();
    assert_eq!(scheduler.cancel_count(), 1);
    assert_eq!(scheduler.live_handles(), 0);
    assert_eq!(host.lifecycle().live_handles(), 0);
    assert_eq!(viewport.listener_count(), 0);

    host.unmount();
    assert_eq!(scheduler.cancel_count(), 1);
    assert_eq!(scheduler.run_frames(5), 0);
    assert_eq!(surface.frames_drawn(), 3);
}

#[test]
fn dropping_a_mounted_host_releases_everything() {
    let f = fixture(1536.0, DESKTOP_UA);
    let Fixture {
        scheduler,
        viewport,
        container,
        mut host,
        ..
    } = f;
    host.mount().unwrap();
    drop(host);
    assert_eq!(scheduler.live_handles(), 0);
    assert_eq!(viewport.listener_count(), 0);
    assert_eq!(container.child_count(), 0);
}

#[test]
fn remount_does_not_accumulate_columns_or_loops() {
    let mut f = fixture(1000.0, DESKTOP_UA);
    for _ in 0..3 {
        f.host.mount().unwrap();
        f.scheduler.run_frames(2);
        f.host.unmount();
    }
    f.host.mount().unwrap();
    assert_eq!(f.container.child_count(), 50);
    assert_eq!(f.scheduler.live_handles(), 2);
    assert_eq!(f.viewport.listener_count(), 1);
}

// =============================================================================
// Capability Gating
// =============================================================================

#[test]
fn narrow_mobile_viewport_skips_canvas_work() {
    let mut f = fixture(767.0, IPHONE_UA);
    f.host.mount().unwrap();

    assert!(f.host.capability().is_constrained_device);
    assert_eq!(f.scheduler.request_count(), 0);
    assert_eq!(f.scheduler.pending_frames(), 0);
    assert_eq!(f.container.child_count(), 38);
    assert_eq!(f.container.opacity(), f.host.config().rain.reduced_opacity);
    assert_eq!(f.host.active_effects(), vec!["rain"]);
}

#[test]
fn unlaid_out_container_yields_no_columns_until_resize() {
    let mut f = fixture(1536.0, DESKTOP_UA);
    f.container.set_width(0.0);
    f.host.mount().unwrap();
    assert_eq!(f.container.child_count(), 0);

    resize_burst(&f, 1536.0, 1);
    assert_eq!(f.container.child_count(), 76);
}

// =============================================================================
// Resize Handling
// =============================================================================

#[test]
fn resize_burst_regenerates_once() {
    let mut f = fixture(1536.0, DESKTOP_UA);
    f.host.mount().unwrap();
    assert_eq!(f.container.appended_total(), 76);

    resize_burst(&f, 1000.0, 10);
    assert_eq!(f.container.child_count(), 50);
    assert_eq!(f.container.appended_total(), 76 + 50);
    assert_eq!(f.host.lifecycle().live_handles(), 2);
}

#[test]
fn shrinking_below_the_threshold_stops_glows_and_growing_restarts_them() {
    let mut f = fixture(1280.0, DESKTOP_UA);
    f.host.mount().unwrap();
    assert_eq!(f.scheduler.pending_frames(), 2);

    resize_burst(&f, 600.0, 3);
    assert!(f.host.capability().is_constrained_device);
    assert_eq!(f.scheduler.pending_frames(), 0);
    assert_eq!(f.container.child_count(), 30);
    assert_eq!(f.container.opacity(), f.host.config().rain.reduced_opacity);

    resize_burst(&f, 1280.0, 3);
    assert!(!f.host.capability().is_constrained_device);
    assert_eq!(f.scheduler.pending_frames(), 2);
    assert_eq!(f.host.lifecycle().live_handles(), 2);
    assert_eq!(f.container.opacity(), f.host.config().rain.opacity);
}

#[test]
fn pending_resize_is_cancelled_by_unmount() {
    let mut f = fixture(1536.0, DESKTOP_UA);
    f.host.mount().unwrap();
    f.container.set_width(800.0);
    f.viewport.resize(ViewportSize::new(800.0, 900.0));
    assert_eq!(f.scheduler.pending_timers(), 1);

    f.host.unmount();
    assert_eq!(f.scheduler.live_handles(), 0);
    f.scheduler.advance(1000.0);
    assert_eq!(f.container.appended_total(), 76);
}

#[test]
fn capability_updates_immediately_while_regeneration_waits() {
    let mut f = fixture(1280.0, DESKTOP_UA);
    f.host.mount().unwrap();
    f.viewport.resize(ViewportSize::new(500.0, 900.0));
    assert!(f.host.capability().is_constrained_device);
    assert_eq!(f.scheduler.pending_frames(), 2);

    f.scheduler.advance(300.0);
    assert_eq!(f.scheduler.pending_frames(), 0);
}
