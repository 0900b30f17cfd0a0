//! Watermark controller
//!
//! Owns the configuration and the observation subscriptions, renders the
//! overlay, and re-renders it whenever the host reports a resize or a
//! structural change. All work happens inside `init`, `reload`, `remove` and
//! `handle`; nothing here blocks or spawns.
//!
//! ```text
//! Uninitialized --init--> AwaitingReady --Ready--> Active --remove--> Disposed
//!                 \________________________________/  ^ |
//!                                                     |_| resize / mutation
//! ```

pub mod reactions;
pub mod throttle;

pub use reactions::{affects_region_geometry, touches_overlay, MutationRecord, Reaction, Signal};
pub use throttle::{Decision, PollOutcome, Throttle, THROTTLE_WINDOW_MS};

use crate::host::Host;
use crate::models::{RenderParams, Result, WatermarkConfig, WatermarkError};
use crate::overlay::{mount_overlay, remove_overlay, Overlay};
use crate::renderers::{compose, render_tile, ResolvedTile};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// Constructed without text, or the target region did not resolve
    Uninitialized,
    /// Initialized, waiting for the surface to become ready
    AwaitingReady,
    Active,
    Disposed,
}

/// Subscriptions owned by one controller
struct Observation<S> {
    ready: Option<S>,
    resize: Vec<S>,
    region: Option<S>,
    tamper: Option<S>,
}

impl<S> Default for Observation<S> {
    fn default() -> Self {
        Self {
            ready: None,
            resize: Vec::new(),
            region: None,
            tamper: None,
        }
    }
}

fn warn(err: &WatermarkError) {
    log::warn!("[Watermark] {}", err);
}

pub struct Watermark<H: Host> {
    host: H,
    content: String,
    config: Option<WatermarkConfig<H::Region>>,
    region: Option<H::Region>,
    state: ControllerState,
    observation: Observation<H::Subscription>,
    throttle: Throttle,
    base64: String,
    tile: Option<ResolvedTile>,
    overlay: Option<Overlay>,
}

impl<H: Host> Watermark<H> {
    /// An inert controller; call `init` to show something
    pub fn new(host: H) -> Self {
        Self {
            host,
            content: String::new(),
            config: None,
            region: None,
            state: ControllerState::Uninitialized,
            observation: Observation::default(),
            throttle: Throttle::default(),
            base64: String::new(),
            tile: None,
            overlay: None,
        }
    }

    /// Construct and, when `text` is non-empty, initialize in one go
    pub fn with_text(host: H, text: Option<&str>, config: WatermarkConfig<H::Region>) -> Self {
        let mut watermark = Self::new(host);
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            watermark.init(text, config);
        }
        watermark
    }

    /// Initialize and render (now, or once the surface is ready).
    ///
    /// An unresolvable target region leaves the controller inert with a
    /// warning. Calling this again re-initializes without tearing down
    /// earlier subscriptions; use `reload` for a clean cycle.
    pub fn init(&mut self, text: &str, config: WatermarkConfig<H::Region>) -> &mut Self {
        self.content = text.to_string();
        let target = config.target.clone();
        self.config = Some(config);

        let Some(region) = self.host.resolve(&target) else {
            warn(&WatermarkError::TargetUnresolved(target.describe()));
            self.region = None;
            self.state = ControllerState::Uninitialized;
            return self;
        };
        self.region = Some(region);

        if self.host.is_ready() {
            self.state = ControllerState::Active;
            self.refresh();
        } else if let Some(subscription) = self.host.subscribe(Reaction::Ready) {
            if let Some(previous) = self.observation.ready.replace(subscription) {
                self.host.unsubscribe(previous);
            }
            self.state = ControllerState::AwaitingReady;
            log::debug!("[Watermark] surface still loading, render deferred");
        } else {
            self.state = ControllerState::Active;
            self.refresh();
        }

        match self.host.subscribe(Reaction::Resize) {
            Some(subscription) => self.observation.resize.push(subscription),
            None => warn(&WatermarkError::CapabilityUnavailable("resize notification")),
        }

        self
    }

    /// Tear everything down and initialize again.
    ///
    /// Without `text` the previous text is reused; without `config` the
    /// previous configuration (and overlay id) is reused.
    pub fn reload(&mut self, text: Option<&str>, config: Option<WatermarkConfig<H::Region>>) -> &mut Self {
        let text = text
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.content.clone());
        let config = config
            .or_else(|| self.config.clone())
            .unwrap_or_default();

        self.remove();
        self.init(&text, config)
    }

    /// Unsubscribe everything and delete the overlay.
    ///
    /// Returns true when no overlay is left afterwards, including when none
    /// was ever mounted.
    pub fn remove(&mut self) -> bool {
        self.dispose();
        self.state = ControllerState::Disposed;
        self.tile = None;
        self.overlay = None;

        let Some(id) = self.config.as_ref().map(|c| c.id.clone()) else {
            return true;
        };
        match remove_overlay(&mut self.host, &id) {
            Ok(()) => true,
            Err(err) => {
                warn(&err);
                false
            }
        }
    }

    /// React to a host signal received at `now_ms`
    pub fn handle(&mut self, signal: Signal, now_ms: f64) {
        match signal {
            Signal::Ready => {
                if self.state != ControllerState::AwaitingReady {
                    return;
                }
                if let Some(subscription) = self.observation.ready.take() {
                    self.host.unsubscribe(subscription);
                }
                self.state = ControllerState::Active;
                self.refresh();
            }
            Signal::Resize => {
                if self.state == ControllerState::Active {
                    self.request_refresh(now_ms);
                }
            }
            Signal::RegionChanged(records) => {
                if self.state == ControllerState::Active
                    && records.iter().any(affects_region_geometry)
                {
                    self.request_refresh(now_ms);
                }
            }
            Signal::Tampered(records) => {
                if self.state == ControllerState::Active && records.iter().any(touches_overlay) {
                    log::debug!("[Watermark] overlay was tampered with, restoring");
                    self.request_refresh(now_ms);
                }
            }
            Signal::Poll => {
                if self.state != ControllerState::Active {
                    return;
                }
                match self.throttle.poll(now_ms) {
                    PollOutcome::Due => self.refresh(),
                    // timers may fire a little early; wait out the rest of the window
                    PollOutcome::Early { due_at } => self.host.schedule_poll(due_at - now_ms),
                    PollOutcome::Idle => {}
                }
            }
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Data URI of the most recent tile, empty when the last render failed
    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn config(&self) -> Option<&WatermarkConfig<H::Region>> {
        self.config.as_ref()
    }

    /// Id of the overlay this controller manages
    pub fn id(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.id.as_str())
    }

    pub fn tile(&self) -> Option<&ResolvedTile> {
        self.tile.as_ref()
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn request_refresh(&mut self, now_ms: f64) {
        match self.throttle.request(now_ms) {
            Decision::Run => self.refresh(),
            Decision::Deferred { due_at } => self.host.schedule_poll((due_at - now_ms).max(0.0)),
            Decision::Dropped => {}
        }
    }

    /// One render cycle. Mutation watchers are paused around the re-mount so
    /// the overlay's own replacement is not reported as tampering.
    fn refresh(&mut self) {
        self.unobserve_mutations();
        self.render();
        self.observe_mutations();
    }

    fn render(&mut self) {
        let (Some(config), Some(region)) = (self.config.as_ref(), self.region.clone()) else {
            return;
        };
        let id = config.id.clone();
        let params = config.render_params();

        match render_into(&mut self.host, &self.content, &id, &params, &region) {
            Ok((tile, overlay)) => {
                self.base64 = tile.image.clone();
                self.tile = Some(tile);
                self.overlay = Some(overlay);
            }
            Err(err) => {
                warn(&err);
                self.base64 = String::new();
                self.tile = None;
                self.overlay = None;
            }
        }
    }

    fn observe_mutations(&mut self) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        let observe_region = config.observe_region;
        let tamper_guard = config.tamper_guard;
        let observe_target = config
            .observe_target
            .clone()
            .unwrap_or_else(|| config.target.clone());

        if observe_region {
            match self.host.resolve(&observe_target) {
                Some(target) => match self.host.subscribe(Reaction::RegionChange(target)) {
                    Some(subscription) => self.observation.region = Some(subscription),
                    None => {
                        warn(&WatermarkError::CapabilityUnavailable("MutationObserver"));
                        log::warn!("[Watermark] region changes will not refresh the watermark; reload it manually");
                    }
                },
                None => warn(&WatermarkError::TargetUnresolved(observe_target.describe())),
            }
        }

        if tamper_guard {
            let Some(region) = self.region.clone() else {
                return;
            };
            match self.host.subscribe(Reaction::TamperGuard(region)) {
                Some(subscription) => self.observation.tamper = Some(subscription),
                None => {
                    warn(&WatermarkError::CapabilityUnavailable("MutationObserver"));
                    log::warn!("[Watermark] tamper guard is off; the overlay will not be restored");
                }
            }
        }
    }

    fn unobserve_mutations(&mut self) {
        if let Some(subscription) = self.observation.region.take() {
            self.host.unsubscribe(subscription);
        }
        if let Some(subscription) = self.observation.tamper.take() {
            self.host.unsubscribe(subscription);
        }
    }

    /// Drop every subscription and any armed trailing render
    fn dispose(&mut self) {
        self.unobserve_mutations();
        if let Some(subscription) = self.observation.ready.take() {
            self.host.unsubscribe(subscription);
        }
        for subscription in std::mem::take(&mut self.observation.resize) {
            self.host.unsubscribe(subscription);
        }
        self.throttle.cancel();
    }
}

impl<H: Host> Drop for Watermark<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Delete the old overlay, render the tile, composite it and mount it
fn render_into<H: Host>(
    host: &mut H,
    text: &str,
    id: &str,
    params: &RenderParams,
    region: &H::Region,
) -> Result<(ResolvedTile, Overlay)> {
    remove_overlay(host, id)?;

    let mut renderer = host
        .create_renderer()
        .ok_or(WatermarkError::CapabilityUnavailable("canvas 2d context"))?;
    let tile = render_tile(&mut renderer, text, params, host.device_pixel_ratio())?;
    let background = compose(&tile, params.mode);
    let overlay = mount_overlay(host, region, id, params, &background)?;

    Ok((tile, overlay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;

    #[test]
    fn test_inert_without_text() {
        let watermark = Watermark::with_text(HeadlessHost::new(), None, WatermarkConfig::default());
        assert_eq!(watermark.state(), ControllerState::Uninitialized);
        assert!(watermark.base64().is_empty());
        assert!(watermark.host().subscription_count() == 0);
    }

    #[test]
    fn test_unresolved_target_stays_inert() {
        let config = WatermarkConfig::default()
            .with_target(crate::models::RegionRef::Selector("#missing".into()));
        let watermark = Watermark::with_text(HeadlessHost::new(), Some("secret"), config);
        assert_eq!(watermark.state(), ControllerState::Uninitialized);
        assert!(watermark.overlay().is_none());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let host = HeadlessHost::new();
        let log = host.subscription_log();
        {
            let _watermark = Watermark::with_text(host, Some("secret"), WatermarkConfig::default());
            assert_eq!(log.borrow().active(), 1);
        }
        assert_eq!(log.borrow().active(), 0);
    }
}
