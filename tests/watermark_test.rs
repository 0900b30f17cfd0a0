// End-to-end watermark lifecycle tests
//
// Drives the controller through the in-memory host: mounting, sizing,
// tiling modes, reload/remove, and the resize/tamper reactions.

use watermark_wasm::controller::{ControllerState, MutationRecord, Reaction, Signal, Watermark};
use watermark_wasm::headless::HeadlessHost;
use watermark_wasm::host::Host;
use watermark_wasm::models::{WatermarkConfig, WatermarkOptions};
use watermark_wasm::overlay::Overlay;

/// Build a config from a JSON options object, the way JavaScript passes it
fn config(json: &str) -> WatermarkConfig<usize> {
    let options: WatermarkOptions = serde_json::from_str(json).expect("valid options json");
    WatermarkConfig::from_options(options)
}

fn mounted(watermark: &Watermark<HeadlessHost>) -> Overlay {
    let id = watermark.id().expect("initialized");
    watermark
        .host()
        .overlay(id)
        .cloned()
        .expect("overlay should be mounted")
}

#[test]
fn test_confidential_normal_mode() {
    let wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("CONFIDENTIAL"),
        config(r#"{"angle": 0, "fontsize": 20, "mode": "normal"}"#),
    );
    assert_eq!(wm.state(), ControllerState::Active);
    assert_eq!(wm.host().overlay_count(), 1);

    let tile = wm.tile().expect("tile rendered");
    // headless measurer: 12 chars * 20px
    assert_eq!(tile.width, 240.0);
    assert_eq!(tile.height, 30.0);

    let overlay = mounted(&wm);
    let expected_size = format!("{}px {}px", tile.width + 50.0, tile.height + 50.0);
    assert_eq!(overlay.content.style_value("background-size"), Some(expected_size.as_str()));
    assert_eq!(overlay.content.style_value("background-repeat"), Some("repeat"));
    assert_eq!(overlay.container.style_value("position"), Some("fixed"));
    assert!(!wm.base64().is_empty());
    assert_eq!(wm.base64(), tile.image);
}

#[test]
fn test_fixed_size_scaled_by_ratio() {
    let mut host = HeadlessHost::new();
    host.set_device_pixel_ratio(2.0);
    let wm = Watermark::with_text(
        host,
        Some("X"),
        config(r#"{"width": 100, "height": 50, "ratio": 2}"#),
    );

    let tile = wm.tile().expect("tile rendered");
    assert_eq!(tile.canvas.tile_width, (100.0 + 50.0) * 2.0);
    assert_eq!(tile.canvas.tile_height, (50.0 + 50.0) * 2.0);
    assert_eq!((tile.canvas.pixel_width, tile.canvas.pixel_height), (600, 400));
}

#[test]
fn test_numeric_string_sizes() {
    let wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("X"),
        config(r#"{"width": "120", "height": "40"}"#),
    );
    let tile = wm.tile().expect("tile rendered");
    assert_eq!((tile.width, tile.height), (120.0, 40.0));
}

#[test]
fn test_repeated_renders_do_not_compound_ratio() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("secret"),
        config(r#"{"ratio": 3, "width": 10, "height": 10}"#),
    );
    let first = wm.tile().cloned().expect("tile rendered");

    wm.handle(Signal::Resize, 1_000.0);
    wm.handle(Signal::Resize, 2_000.0);
    let third = wm.tile().cloned().expect("tile rendered");

    assert_eq!(wm.host().renderers_created(), 3);
    assert_eq!(first, third);
    assert_eq!(third.width, 30.0);
}

#[test]
fn test_stagger_layers_two_offset_copies() {
    let wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("draft"),
        config(r#"{"mode": "s", "width": 100, "height": 40, "xSpace": 30, "ySpace": 20}"#),
    );
    let overlay = mounted(&wm);

    // spacing doubled: (100 + 60) / 2, (40 + 40) / 2
    assert_eq!(
        overlay.content.style_value("background-position"),
        Some("0 0, 80px 40px")
    );
    assert_eq!(overlay.content.style_value("background-repeat"), Some("repeat, repeat"));
    assert_eq!(overlay.content.style_value("background-size"), Some("160px 80px"));

    let image = overlay.content.style_value("background-image").unwrap_or_default();
    assert_eq!(image.matches("url(").count(), 2);
}

#[test]
fn test_single_axis_modes() {
    let horizontal = Watermark::with_text(HeadlessHost::new(), Some("a"), config(r#"{"mode": "x"}"#));
    let vertical = Watermark::with_text(HeadlessHost::new(), Some("a"), config(r#"{"mode": "vertical"}"#));
    let unknown = Watermark::with_text(HeadlessHost::new(), Some("a"), config(r#"{"mode": "zigzag"}"#));

    assert_eq!(mounted(&horizontal).content.style_value("background-repeat"), Some("repeat-x"));
    assert_eq!(mounted(&vertical).content.style_value("background-repeat"), Some("repeat-y"));
    assert_eq!(mounted(&unknown).content.style_value("background-repeat"), Some("repeat"));
}

#[test]
fn test_tiny_alpha_is_kept_verbatim() {
    let wm = Watermark::with_text(HeadlessHost::new(), Some("faint"), config(r#"{"alpha": 0.001}"#));
    assert_eq!(mounted(&wm).container.style_value("opacity"), Some("0.001"));
}

#[test]
fn test_offsets_shrink_container() {
    let mut host = HeadlessHost::new();
    let region = host.add_region("#doc", (500.0, 400.0));
    let wm = Watermark::with_text(
        host,
        Some("mark"),
        config(r##"{"targetSelector": "#doc", "top": 20, "left": 30, "zIndex": 5}"##),
    );

    assert_eq!(wm.host().overlays_in(region).len(), 1);
    assert_eq!(wm.host().position_style(&region), "relative");

    let container = mounted(&wm).container;
    assert_eq!(container.style_value("position"), Some("absolute"));
    assert_eq!(container.style_value("width"), Some("470px"));
    assert_eq!(container.style_value("height"), Some("380px"));
    assert_eq!(container.style_value("padding-top"), Some("20px"));
    assert_eq!(container.style_value("z-index"), Some("5"));
}

#[test]
fn test_unresolved_target_does_not_mount() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("mark"),
        config(r##"{"targetSelector": "#nowhere"}"##),
    );
    assert_eq!(wm.state(), ControllerState::Uninitialized);
    assert_eq!(wm.host().overlay_count(), 0);
    assert_eq!(wm.host().subscription_count(), 0);
    assert!(wm.remove());
}

#[test]
fn test_remove_without_overlay_is_idempotent() {
    let mut wm = Watermark::new(HeadlessHost::new());
    assert!(wm.remove());
    assert!(wm.remove());

    let mut mounted_wm = Watermark::with_text(HeadlessHost::new(), Some("x"), config("{}"));
    assert!(mounted_wm.remove());
    assert_eq!(mounted_wm.host().overlay_count(), 0);
    assert_eq!(mounted_wm.state(), ControllerState::Disposed);
    assert!(mounted_wm.remove());
}

#[test]
fn test_remove_reports_detach_failure() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("x"), config("{}"));
    wm.host_mut().set_detach_fails(true);
    assert!(!wm.remove());
    assert_eq!(wm.host().subscription_count(), 0);
}

#[test]
fn test_reload_with_new_config_changes_id() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("first"), config("{}"));
    let old_id = wm.id().map(str::to_string).expect("id");

    wm.reload(None, Some(config(r#"{"alpha": 0.3}"#)));
    let new_id = wm.id().map(str::to_string).expect("id");

    assert_ne!(old_id, new_id);
    assert!(!wm.host().element_exists(&old_id));
    assert!(wm.host().element_exists(&new_id));
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.content(), "first");
    assert_eq!(mounted(&wm).container.style_value("opacity"), Some("0.3"));
}

#[test]
fn test_reload_without_config_keeps_id_and_swaps_text() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("first"), config(r#"{"id": "wm"}"#));
    wm.reload(Some("second"), None);

    assert_eq!(wm.id(), Some("wm"));
    assert_eq!(wm.content(), "second");
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.state(), ControllerState::Active);
    // one resize subscription, not an accumulating pile
    assert_eq!(wm.host().subscription_count(), 1);
}

#[test]
fn test_invalid_size_renders_nothing() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("ok"), config(r#"{"id": "wm"}"#));
    assert_eq!(wm.host().overlay_count(), 1);

    wm.reload(None, Some(config(r#"{"id": "wm", "width": "huge"}"#)));
    assert!(wm.base64().is_empty());
    assert!(wm.tile().is_none());
    // the previous overlay is gone before the render gave up
    assert_eq!(wm.host().overlay_count(), 0);
}

#[test]
fn test_missing_canvas_renders_nothing() {
    let mut host = HeadlessHost::new();
    host.set_canvas_available(false);
    let wm = Watermark::with_text(host, Some("x"), config("{}"));

    assert_eq!(wm.state(), ControllerState::Active);
    assert!(wm.base64().is_empty());
    assert_eq!(wm.host().overlay_count(), 0);
}

#[test]
fn test_render_waits_for_ready_surface() {
    let mut host = HeadlessHost::new();
    host.set_ready(false);
    let mut wm = Watermark::with_text(host, Some("later"), config("{}"));

    assert_eq!(wm.state(), ControllerState::AwaitingReady);
    assert_eq!(wm.host().overlay_count(), 0);
    assert!(wm.host().active_reactions().contains(&Reaction::Ready));

    // resize before ready is ignored
    wm.handle(Signal::Resize, 0.0);
    assert_eq!(wm.host().renderers_created(), 0);

    wm.handle(Signal::Ready, 5.0);
    assert_eq!(wm.state(), ControllerState::Active);
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.host().active_reactions(), vec![Reaction::Resize]);
}

#[test]
fn test_resize_refits_overlay() {
    let mut host = HeadlessHost::new();
    let region = host.add_region("#pane", (300.0, 200.0));
    let mut wm = Watermark::with_text(host, Some("x"), config(r##"{"targetSelector": "#pane"}"##));
    assert_eq!(mounted(&wm).container.style_value("width"), Some("300px"));

    wm.host_mut().set_client_size(region, (640.0, 480.0));
    wm.handle(Signal::Resize, 0.0);
    assert_eq!(mounted(&wm).container.style_value("width"), Some("640px"));
    assert_eq!(wm.host().overlay_count(), 1);
}

#[test]
fn test_tamper_guard_restores_removed_overlay() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("protected"),
        config(r#"{"id": "wm", "prevent": true}"#),
    );
    let original = mounted(&wm);
    assert!(wm.host().active_reactions().contains(&Reaction::TamperGuard(0)));

    let record = wm.host_mut().tamper_remove("wm").expect("overlay existed");
    assert_eq!(wm.host().overlay_count(), 0);

    wm.handle(Signal::Tampered(vec![record]), 0.0);
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(mounted(&wm), original);
    // still guarded after the restore, with exactly one guard
    let guards = wm
        .host()
        .active_reactions()
        .into_iter()
        .filter(|r| matches!(r, Reaction::TamperGuard(_)))
        .count();
    assert_eq!(guards, 1);
}

#[test]
fn test_tamper_guard_restores_restyled_overlay() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("protected"),
        config(r#"{"id": "wm", "prevent": true}"#),
    );
    let record = wm
        .host_mut()
        .tamper_style("wm", "display", "none")
        .expect("overlay existed");
    assert_eq!(mounted(&wm).container.style_value("display"), Some("none"));

    wm.handle(Signal::Tampered(vec![record]), 0.0);
    assert_eq!(mounted(&wm).container.style_value("display"), None);
}

#[test]
fn test_unrelated_mutations_are_ignored() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("protected"),
        config(r#"{"prevent": true}"#),
    );
    let unrelated = MutationRecord::ChildList {
        removed_classes: vec!["toast".to_string()],
    };
    wm.handle(Signal::Tampered(vec![unrelated]), 0.0);
    assert_eq!(wm.host().renderers_created(), 1);
}

#[test]
fn test_tamper_without_guard_is_ignored() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("open"), config(r#"{"id": "wm"}"#));
    assert_eq!(wm.host().active_reactions(), vec![Reaction::Resize]);
    // a guard-less controller never subscribed, so nothing would deliver this,
    // but a stray signal must not resurrect anything either
    let record = wm.host_mut().tamper_remove("wm").expect("overlay existed");
    wm.handle(Signal::RegionChanged(vec![record]), 0.0);
    assert_eq!(wm.host().overlay_count(), 0);
}

#[test]
fn test_reactions_are_throttled() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("busy"),
        config(r#"{"id": "wm", "prevent": true}"#),
    );
    let style_change = || MutationRecord::Attributes {
        name: "style".to_string(),
        target_class: "watermark-content".to_string(),
        old_value: None,
    };

    wm.handle(Signal::Tampered(vec![style_change()]), 0.0);
    assert_eq!(wm.host().renderers_created(), 2);

    // inside the window: one trailing run is armed, the rest dropped
    wm.handle(Signal::Tampered(vec![style_change()]), 10.0);
    wm.handle(Signal::Resize, 20.0);
    wm.handle(Signal::Tampered(vec![style_change()]), 30.0);
    assert_eq!(wm.host().renderers_created(), 2);
    assert_eq!(wm.host().scheduled_polls(), &[90.0]);

    wm.handle(Signal::Poll, 60.0);
    assert_eq!(wm.host().renderers_created(), 2);
    assert_eq!(wm.host().scheduled_polls(), &[90.0, 40.0]);
    wm.handle(Signal::Poll, 100.0);
    assert_eq!(wm.host().renderers_created(), 3);
    wm.handle(Signal::Poll, 150.0);
    assert_eq!(wm.host().renderers_created(), 3);
}

#[test]
fn test_early_timer_is_rescheduled() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("early"),
        config(r#"{"id": "wm", "prevent": true}"#),
    );
    let record = wm.host_mut().tamper_remove("wm").expect("overlay existed");
    wm.handle(Signal::Tampered(vec![record]), 0.0);
    assert_eq!(wm.host().renderers_created(), 2);

    let record = wm.host_mut().tamper_remove("wm").expect("overlay restored");
    wm.handle(Signal::Tampered(vec![record]), 10.0);
    assert_eq!(wm.host().overlay_count(), 0);

    // the timer fires a millisecond before the window closes
    wm.handle(Signal::Poll, 99.0);
    assert_eq!(wm.host().overlay_count(), 0);
    assert_eq!(wm.host().scheduled_polls(), &[90.0, 1.0]);

    wm.handle(Signal::Poll, 100.0);
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.host().renderers_created(), 3);
}

#[test]
fn test_missed_trailing_run_does_not_stall_reactions() {
    let mut wm = Watermark::with_text(
        HeadlessHost::new(),
        Some("stuck"),
        config(r#"{"id": "wm", "prevent": true}"#),
    );
    let style_change = || MutationRecord::Attributes {
        name: "style".to_string(),
        target_class: "watermark-content".to_string(),
        old_value: None,
    };
    wm.handle(Signal::Tampered(vec![style_change()]), 0.0);
    wm.handle(Signal::Tampered(vec![style_change()]), 10.0);
    // early wake-up whose follow-up never arrives
    wm.handle(Signal::Poll, 99.0);
    assert_eq!(wm.host().renderers_created(), 2);

    let record = wm.host_mut().tamper_remove("wm").expect("overlay existed");
    wm.handle(Signal::Tampered(vec![record]), 60_000.0);
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.host().renderers_created(), 3);

    wm.host_mut().tamper_remove("wm").expect("overlay restored");
    wm.handle(Signal::Resize, 120_000.0);
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.host().renderers_created(), 4);
}

#[test]
fn test_pending_render_dropped_after_remove() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("x"), config("{}"));
    wm.handle(Signal::Resize, 0.0);
    wm.handle(Signal::Resize, 10.0);
    assert_eq!(wm.host().scheduled_polls().len(), 1);

    assert!(wm.remove());
    wm.handle(Signal::Poll, 200.0);
    wm.handle(Signal::Resize, 300.0);
    assert_eq!(wm.host().overlay_count(), 0);
    assert_eq!(wm.host().renderers_created(), 2);
}

#[test]
fn test_region_observer_reacts_to_style_changes() {
    let mut host = HeadlessHost::new();
    let region = host.add_region("#card", (320.0, 240.0));
    let mut wm = Watermark::with_text(
        host,
        Some("x"),
        config(r##"{"targetSelector": "#card", "observer": true}"##),
    );
    assert!(wm.host().active_reactions().contains(&Reaction::RegionChange(region)));

    let title_change = MutationRecord::Attributes {
        name: "title".to_string(),
        target_class: String::new(),
        old_value: None,
    };
    wm.handle(Signal::RegionChanged(vec![title_change]), 0.0);
    assert_eq!(wm.host().renderers_created(), 1);

    wm.host_mut().set_client_size(region, (720.0, 240.0));
    let style_change = MutationRecord::Attributes {
        name: "style".to_string(),
        target_class: String::new(),
        old_value: None,
    };
    wm.handle(Signal::RegionChanged(vec![style_change]), 500.0);
    assert_eq!(wm.host().renderers_created(), 2);
    assert_eq!(mounted(&wm).container.style_value("width"), Some("720px"));
}

#[test]
fn test_observe_selector_targets_another_region() {
    let mut host = HeadlessHost::new();
    let _target = host.add_region("#card", (320.0, 240.0));
    let watched = host.add_region("#layout", (1000.0, 800.0));
    let wm = Watermark::with_text(
        host,
        Some("x"),
        config(r##"{"targetSelector": "#card", "observeSelector": "#layout", "observer": true}"##),
    );
    assert!(wm.host().active_reactions().contains(&Reaction::RegionChange(watched)));
}

#[test]
fn test_missing_observer_capability_still_renders() {
    let mut host = HeadlessHost::new();
    host.set_observers_available(false);
    let wm = Watermark::with_text(
        host,
        Some("x"),
        config(r#"{"observer": true, "prevent": true}"#),
    );
    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.host().active_reactions(), vec![Reaction::Resize]);
}

#[test]
fn test_remove_tears_down_all_subscriptions() {
    let host = HeadlessHost::new();
    let log = host.subscription_log();
    let mut wm = Watermark::with_text(
        host,
        Some("x"),
        config(r#"{"observer": true, "prevent": true}"#),
    );
    assert_eq!(log.borrow().active(), 3);

    assert!(wm.remove());
    assert_eq!(log.borrow().active(), 0);
}

#[test]
fn test_second_init_keeps_single_overlay() {
    let mut wm = Watermark::with_text(HeadlessHost::new(), Some("one"), config(r#"{"id": "wm"}"#));
    wm.init("two", config(r#"{"id": "wm"}"#));

    assert_eq!(wm.host().overlay_count(), 1);
    assert_eq!(wm.content(), "two");
    // init does not tear down earlier subscriptions
    assert_eq!(wm.host().subscription_count(), 2);
}
