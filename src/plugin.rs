//! Lifecycle of the non-linear ad on one player
//!
//! Drives:
//! - the single ad request issued when the plugin starts
//! - creative selection and session binding
//! - overlay rendering and visibility
//! - lifecycle events for the host

use crate::{
    config::PluginOptions,
    error::{AdFailure, Result, VastError},
    models::AdResponse,
    overlay::OverlayController,
    player::{Player, PlayerEvent},
    resolver::AdResolver,
    selector::{self, Selection, SelectedCreative},
    session::AdSession,
    tracking::{Beacon, ErrorReporter, HttpBeacon, PixelErrorReporter},
};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// CSS class added to the host player
pub const PLAYER_CLASS: &str = "vjs-nonlin-vast";

/// Where the ad lifecycle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdState {
    Idle,
    Requesting,
    Ready,
    Cancelled,
    Closed,
}

impl AdState {
    pub fn can_transition_to(&self, next: AdState) -> bool {
        use AdState::*;
        matches!(
            (*self, next),
            (Idle, Requesting) | (Requesting, Ready) | (Requesting, Cancelled) | (Ready, Closed)
        )
    }

    /// Whether an ad was bound, closed or not
    pub fn has_session(&self) -> bool {
        matches!(self, AdState::Ready | AdState::Closed)
    }
}

impl fmt::Display for AdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdState::Idle => "idle",
            AdState::Requesting => "requesting",
            AdState::Ready => "ready",
            AdState::Cancelled => "cancelled",
            AdState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events emitted to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdEvent {
    /// An ad was selected and bound to a tracker
    VastReady,
    /// No ad will be shown for this session
    AdsCanceled { reason: AdFailure },
    /// The viewer dismissed the overlay
    AdClosed,
    /// The viewer clicked the creative; the host opens `url`
    ClickThrough { url: String },
}

impl AdEvent {
    /// The event name a video.js-style host would trigger
    pub fn name(&self) -> &'static str {
        match self {
            AdEvent::VastReady => "vast-ready",
            AdEvent::AdsCanceled { .. } => "adscanceled",
            AdEvent::AdClosed => "adclosed",
            AdEvent::ClickThrough { .. } => "clickthrough",
        }
    }
}

/// The non-linear VAST plugin instance for one player
pub struct NonlinVast {
    player: Arc<dyn Player>,
    options: PluginOptions,
    reporter: Arc<dyn ErrorReporter>,
    beacon: Arc<dyn Beacon>,
    state: AdState,
    state_tx: watch::Sender<AdState>,
    session: Option<AdSession>,
    overlay: OverlayController,
    events: mpsc::UnboundedSender<AdEvent>,
    disposed: bool,
}

impl NonlinVast {
    /// Create the plugin and the receiver for its events
    pub fn new(
        player: Arc<dyn Player>,
        options: PluginOptions,
        reporter: Arc<dyn ErrorReporter>,
        beacon: Arc<dyn Beacon>,
    ) -> (Self, mpsc::UnboundedReceiver<AdEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(AdState::Idle);

        player.add_class(PLAYER_CLASS);

        let plugin = Self {
            player,
            options,
            reporter,
            beacon,
            state: AdState::Idle,
            state_tx,
            session: None,
            overlay: OverlayController::new(),
            events,
            disposed: false,
        };
        (plugin, events_rx)
    }

    /// Create the plugin with HTTP tracking pixels for errors, impressions and clicks.
    ///
    /// The caller keeps the beacon to flush pending pixels before shutting down.
    pub fn with_http_tracking(
        player: Arc<dyn Player>,
        options: PluginOptions,
        beacon: Arc<HttpBeacon>,
    ) -> (Self, mpsc::UnboundedReceiver<AdEvent>) {
        let reporter = Arc::new(PixelErrorReporter::new(beacon.clone()));
        Self::new(player, options, reporter, beacon)
    }

    pub fn state(&self) -> AdState {
        self.state
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AdState> {
        self.state_tx.subscribe()
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn session(&self) -> Option<&AdSession> {
        self.session.as_ref()
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn set_state(&mut self, next: AdState) -> Result<()> {
        let current = self.state;
        if !current.can_transition_to(next) {
            return Err(VastError::InvalidStateTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        self.state = next;
        self.state_tx.send_replace(next);
        info!("Ad state {} -> {}", current, next);
        Ok(())
    }

    fn emit(&self, event: AdEvent) {
        debug!("Emitting {}", event.name());
        if self.events.send(event).is_err() {
            debug!("No listener for ad events");
        }
    }

    /// Start the ad request, returning the URL to resolve
    pub fn request(&mut self) -> Result<String> {
        self.set_state(AdState::Requesting)?;
        info!("Requesting ad from {}", self.options.url);
        Ok(self.options.url.clone())
    }

    /// Consume the result of the ad request
    pub fn on_resolved(&mut self, response: Option<AdResponse>) {
        if self.disposed {
            debug!("Player disposed, dropping ad response");
            return;
        }
        if self.state != AdState::Requesting {
            debug!("Ignoring ad response in state {}", self.state);
            return;
        }

        let Some(response) = response else {
            self.cancel(AdFailure::NoAdResponse);
            return;
        };

        match selector::select(&response, self.reporter.as_ref()) {
            Selection::Selected(selected) => self.bind(selected),
            Selection::NoneFound => self.cancel(AdFailure::NoEligibleCreative),
        }
    }

    fn bind(&mut self, selected: SelectedCreative) {
        let mut session = AdSession::new(selected, self.beacon.clone());
        if let Err(e) = self.set_state(AdState::Ready) {
            warn!("Cannot bind ad: {}", e);
            return;
        }
        info!(
            "Bound ad {:?}, creative {:?}",
            session.ad().id,
            session.creative().id
        );

        self.emit(AdEvent::VastReady);

        let events = self.events.clone();
        session.tracker_mut().on_clickthrough(move |url| {
            let _ = events.send(AdEvent::ClickThrough { url: url.to_string() });
        });

        self.session = Some(session);
        self.set_ad();
    }

    fn cancel(&mut self, reason: AdFailure) {
        if let Err(e) = self.set_state(AdState::Cancelled) {
            warn!("Cannot cancel ad: {}", e);
            return;
        }
        info!("Ad canceled: {}", reason);
        self.emit(AdEvent::AdsCanceled { reason });
    }

    fn set_ad(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match self.overlay.render(session.variation(), self.player.as_ref()) {
            Ok(true) => session.tracker_mut().track_impression(),
            Ok(false) => info!("{}, no overlay shown", AdFailure::UnsupportedVariationType),
            Err(e) => warn!("Failed to render overlay: {}", e),
        }
    }

    /// Reveal the overlay; a pause always brings it back, even after a close
    pub fn show_ad(&mut self) {
        if !self.state.has_session() {
            debug!("No ad to show in state {}", self.state);
            return;
        }
        self.overlay.show(self.player.as_ref());
    }

    /// Hide the overlay and resume playback
    pub fn hide_ad(&mut self) {
        self.overlay.hide(self.player.as_ref());
    }

    /// The viewer activated the close button
    pub fn close(&mut self) {
        match self.state {
            AdState::Ready => {
                if let Err(e) = self.set_state(AdState::Closed) {
                    warn!("Cannot close ad: {}", e);
                    return;
                }
            }
            AdState::Closed => {}
            other => {
                debug!("Ignoring close in state {}", other);
                return;
            }
        }

        self.emit(AdEvent::AdClosed);
        self.on_ad_closed();
    }

    fn on_ad_closed(&mut self) {
        self.hide_ad();
    }

    /// The viewer activated the creative
    pub fn click_through(&self) -> Option<String> {
        match &self.session {
            Some(session) => session.tracker().click(),
            None => {
                debug!("Click without an ad session");
                None
            }
        }
    }

    /// Tear down the overlay; later responses and events are ignored
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.overlay.teardown(self.player.as_ref());
        info!("Plugin disposed in state {}", self.state);
    }

    pub fn handle_player_event(&mut self, event: PlayerEvent) {
        if self.disposed {
            debug!("Player disposed, ignoring {:?}", event);
            return;
        }

        match event {
            PlayerEvent::Pause => self.show_ad(),
            PlayerEvent::Play => debug!("Playback resumed"),
            PlayerEvent::CloseClicked => self.close(),
            PlayerEvent::OverlayClicked => {
                self.click_through();
            }
            PlayerEvent::Dispose => self.dispose(),
        }
    }

    /// Issue the ad request and run the plugin on the current tokio runtime.
    ///
    /// The resolution is awaited once, alongside player events; whichever
    /// comes first is handled first. Dropping the returned handle disposes
    /// the plugin.
    pub fn spawn(mut self, resolver: Arc<dyn AdResolver>) -> Result<PluginHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| VastError::Other(format!("No async runtime: {}", e)))?;

        let url = self.request()?;
        let state = self.subscribe_state();
        let (events, mut events_rx) = mpsc::unbounded_channel();

        let task = runtime.spawn(async move {
            let resolution = async move { resolver.resolve(&url).await };
            tokio::pin!(resolution);
            let mut pending = true;

            loop {
                tokio::select! {
                    response = &mut resolution, if pending => {
                        pending = false;
                        self.on_resolved(response);
                    }
                    event = events_rx.recv() => {
                        self.handle_player_event(event.unwrap_or(PlayerEvent::Dispose));
                        if self.disposed {
                            break;
                        }
                    }
                }
            }
        });

        Ok(PluginHandle { events, state, task })
    }
}

/// Host-side handle on a running plugin
pub struct PluginHandle {
    events: mpsc::UnboundedSender<PlayerEvent>,
    state: watch::Receiver<AdState>,
    task: JoinHandle<()>,
}

impl PluginHandle {
    /// Forward a player event; false once the plugin has stopped
    pub fn send(&self, event: PlayerEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn state(&self) -> AdState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AdState> {
        self.state.clone()
    }

    /// Dispose the plugin after every event sent so far has been handled
    pub async fn shutdown(self) {
        let _ = self.events.send(PlayerEvent::Dispose);
        if let Err(e) = self.task.await {
            warn!("Plugin task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ad, Creative, CreativeType, Variation};
    use crate::overlay::{OverlayNode, OverlayState};
    use crate::tracking::ErrorCode;
    use std::sync::Mutex;
    use url::Url;

    #[derive(Default)]
    struct FakePlayer {
        calls: Mutex<Vec<String>>,
    }

    impl FakePlayer {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Player for FakePlayer {
        fn play(&self) {
            self.calls.lock().unwrap().push("play".to_string());
        }
        fn add_class(&self, class: &str) {
            self.calls.lock().unwrap().push(format!("class {}", class));
        }
        fn append_overlay(&self, overlay: &OverlayNode) {
            self.calls.lock().unwrap().push(format!("append {}", overlay.width));
        }
        fn set_overlay_state(&self, state: OverlayState) {
            self.calls.lock().unwrap().push(format!("{:?}", state));
        }
        fn remove_overlay(&self) {
            self.calls.lock().unwrap().push("remove".to_string());
        }
    }

    #[derive(Default)]
    struct Quiet {
        reports: Mutex<Vec<ErrorCode>>,
        fired: Mutex<Vec<Url>>,
    }

    impl ErrorReporter for Quiet {
        fn report(&self, _templates: &[String], code: ErrorCode) {
            self.reports.lock().unwrap().push(code);
        }
    }

    impl Beacon for Quiet {
        fn fire(&self, url: Url) {
            self.fired.lock().unwrap().push(url);
        }
    }

    fn response(kind: &str) -> AdResponse {
        let variation = Variation {
            id: None,
            r#type: Some(kind.to_string()),
            width: 300,
            height: 250,
            static_resource: Some("http://x/img.png".to_string()),
            nonlinear_click_through_url_template: Some("http://x/click".to_string()),
            nonlinear_click_tracking_url_templates: Vec::new(),
        };
        AdResponse {
            ads: vec![Ad {
                id: Some("overlay-ad".to_string()),
                creatives: vec![Creative {
                    id: Some("overlay-creative".to_string()),
                    r#type: CreativeType::Nonlinear,
                    variations: vec![variation],
                }],
                impression_url_templates: vec!["http://x/imp".to_string()],
                ..Ad::default()
            }],
        }
    }

    fn plugin() -> (NonlinVast, mpsc::UnboundedReceiver<AdEvent>, Arc<FakePlayer>, Arc<Quiet>) {
        let player = Arc::new(FakePlayer::default());
        let quiet = Arc::new(Quiet::default());
        let (plugin, events) = NonlinVast::new(
            player.clone(),
            PluginOptions::new("http://ads.example/vast"),
            quiet.clone(),
            quiet.clone(),
        );
        (plugin, events, player, quiet)
    }

    #[test]
    fn test_state_transitions() {
        assert!(AdState::Idle.can_transition_to(AdState::Requesting));
        assert!(AdState::Requesting.can_transition_to(AdState::Ready));
        assert!(AdState::Requesting.can_transition_to(AdState::Cancelled));
        assert!(AdState::Ready.can_transition_to(AdState::Closed));

        assert!(!AdState::Idle.can_transition_to(AdState::Ready));
        assert!(!AdState::Cancelled.can_transition_to(AdState::Requesting));
        assert!(!AdState::Closed.can_transition_to(AdState::Requesting));
        assert!(!AdState::Closed.can_transition_to(AdState::Ready));
    }

    #[test]
    fn test_construction_tags_player() {
        let (plugin, _events, player, _) = plugin();
        assert_eq!(plugin.state(), AdState::Idle);
        assert_eq!(player.calls(), vec!["class vjs-nonlin-vast"]);
    }

    #[test]
    fn test_request_only_once() {
        let (mut plugin, _events, _, _) = plugin();
        assert_eq!(plugin.request().unwrap(), "http://ads.example/vast");
        assert!(matches!(
            plugin.request(),
            Err(VastError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_no_response_cancels() {
        let (mut plugin, mut events, _, _) = plugin();
        plugin.request().unwrap();
        plugin.on_resolved(None);

        assert_eq!(plugin.state(), AdState::Cancelled);
        assert_eq!(
            events.try_recv().unwrap(),
            AdEvent::AdsCanceled { reason: AdFailure::NoAdResponse }
        );
        assert!(plugin.session().is_none());
    }

    #[test]
    fn test_response_before_request_is_ignored() {
        let (mut plugin, mut events, _, _) = plugin();
        plugin.on_resolved(Some(response("image/png")));

        assert_eq!(plugin.state(), AdState::Idle);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_ready_renders_and_tracks_impression() {
        let (mut plugin, mut events, player, quiet) = plugin();
        plugin.request().unwrap();
        plugin.on_resolved(Some(response("image/png")));

        assert_eq!(plugin.state(), AdState::Ready);
        assert_eq!(events.try_recv().unwrap(), AdEvent::VastReady);
        assert_eq!(plugin.overlay().state(), OverlayState::Visible);
        assert_eq!(player.calls(), vec!["class vjs-nonlin-vast", "append 300"]);
        assert_eq!(quiet.fired.lock().unwrap()[0].as_str(), "http://x/imp");
    }

    #[test]
    fn test_session_keeps_selected_ad_and_creative() {
        let (mut plugin, _events, _, _) = plugin();
        plugin.request().unwrap();
        plugin.on_resolved(Some(response("image/png")));

        let session = plugin.session().unwrap();
        assert_eq!(session.ad().id.as_deref(), Some("overlay-ad"));
        assert_eq!(session.creative().id.as_deref(), Some("overlay-creative"));
        assert_eq!(session.variation().width, 300);
    }

    #[test]
    fn test_close_then_pause_reveals_again() {
        let (mut plugin, mut events, player, _) = plugin();
        plugin.request().unwrap();
        plugin.on_resolved(Some(response("image/png")));
        let _ = events.try_recv();

        plugin.handle_player_event(PlayerEvent::CloseClicked);
        assert_eq!(plugin.state(), AdState::Closed);
        assert_eq!(events.try_recv().unwrap(), AdEvent::AdClosed);
        assert_eq!(plugin.overlay().state(), OverlayState::Hidden);

        plugin.handle_player_event(PlayerEvent::Play);
        plugin.handle_player_event(PlayerEvent::Pause);
        assert_eq!(plugin.state(), AdState::Closed);
        assert_eq!(plugin.overlay().state(), OverlayState::Visible);

        plugin.handle_player_event(PlayerEvent::CloseClicked);
        assert_eq!(events.try_recv().unwrap(), AdEvent::AdClosed);

        assert_eq!(
            player.calls(),
            vec![
                "class vjs-nonlin-vast",
                "append 300",
                "Hidden",
                "play",
                "Visible",
                "Hidden",
                "play",
            ]
        );
    }

    #[test]
    fn test_close_and_pause_ignored_while_requesting() {
        let (mut plugin, mut events, player, _) = plugin();
        plugin.request().unwrap();

        plugin.handle_player_event(PlayerEvent::CloseClicked);
        plugin.handle_player_event(PlayerEvent::Pause);

        assert_eq!(plugin.state(), AdState::Requesting);
        assert!(events.try_recv().is_err());
        assert_eq!(player.calls(), vec!["class vjs-nonlin-vast"]);
    }

    #[test]
    fn test_click_through_emits_event() {
        let (mut plugin, mut events, _, _) = plugin();
        plugin.request().unwrap();
        plugin.on_resolved(Some(response("image/png")));
        let _ = events.try_recv();

        plugin.handle_player_event(PlayerEvent::OverlayClicked);
        assert_eq!(
            events.try_recv().unwrap(),
            AdEvent::ClickThrough { url: "http://x/click".to_string() }
        );
    }

    #[test]
    fn test_dispose_drops_late_response() {
        let (mut plugin, mut events, player, _) = plugin();
        plugin.request().unwrap();
        plugin.handle_player_event(PlayerEvent::Dispose);
        plugin.on_resolved(Some(response("image/png")));

        assert!(plugin.is_disposed());
        assert_eq!(plugin.state(), AdState::Requesting);
        assert!(events.try_recv().is_err());
        assert_eq!(player.calls(), vec!["class vjs-nonlin-vast"]);
    }

    #[test]
    fn test_dispose_removes_overlay() {
        let (mut plugin, _events, player, _) = plugin();
        plugin.request().unwrap();
        plugin.on_resolved(Some(response("image/png")));
        plugin.dispose();
        plugin.dispose();

        assert_eq!(player.calls().iter().filter(|c| *c == "remove").count(), 1);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(AdEvent::VastReady.name(), "vast-ready");
        assert_eq!(
            AdEvent::AdsCanceled { reason: AdFailure::NoEligibleCreative }.name(),
            "adscanceled"
        );
        assert_eq!(AdEvent::AdClosed.name(), "adclosed");
    }
}
