//! One open map.
//!
//! [`MapSession`] owns everything a map screen needs: the viewport, the tile
//! cache, the frame renderer, the overlay sources and the layer toggles. The
//! application shell feeds it touch events and asks it for frames. Things
//! the shell must react to (finished measurements, note requests) arrive on
//! a channel of [`SessionEvent`]s.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheError, TileCache};
use crate::config::{ConfigError, ConfigFile};
use crate::coord::GeoPoint;
use crate::provider::{Provider, ProviderError, ReqwestClient, TileUrlTemplate, UrlTemplateProvider};
use crate::render::{
    Canvas, FrameRenderer, FrameReport, LayerVisibility, OverlayKind, OverlaySource, RenderError,
};
use crate::signal::RepaintSignal;
use crate::viewport::{
    GestureAction, GestureTracker, MeasurementResult, StateError, TouchEvent, Viewport,
    ViewportState,
};

/// Name of the network tile source built from the configured template.
pub const TILE_PROVIDER_NAME: &str = "tiles";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Something the application shell has to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A measuring drag ended.
    Measurement(MeasurementResult),
    /// The user double-tapped to take a note at this location.
    NoteRequested(GeoPoint),
}

/// A map screen and its state.
pub struct MapSession {
    viewport: Viewport,
    cache: TileCache,
    renderer: FrameRenderer,
    sources: Vec<Arc<dyn OverlaySource>>,
    visibility: LayerVisibility,
    gestures: GestureTracker,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    state_path: Option<PathBuf>,
}

impl MapSession {
    /// Opens a session with the configured network tile source.
    ///
    /// The last viewport is restored from [`ViewportState::default_path`].
    pub fn open(config: &ConfigFile, width: u32, height: u32) -> Result<Self, SessionError> {
        Self::open_with(
            config,
            network_provider(config)?,
            width,
            height,
            ViewportState::default_path(),
        )
    }

    /// Opens a session with an explicit tile source and state file.
    ///
    /// # Arguments
    ///
    /// * `config` - Settings
    /// * `provider` - Network tile source
    /// * `width` - Screen width in pixels
    /// * `height` - Screen height in pixels
    /// * `state_path` - Where the viewport is restored from and saved to
    pub fn open_with(
        config: &ConfigFile,
        provider: Arc<dyn Provider>,
        width: u32,
        height: u32,
        state_path: Option<PathBuf>,
    ) -> Result<Self, SessionError> {
        let signal = RepaintSignal::new();
        let cache = TileCache::builder(config.tile_cache_config(), provider)
            .repaint_signal(signal.clone())
            .build()?;

        let viewport = match restore_state(state_path.as_deref()) {
            Some(state) => Viewport::from_state(&state, width, height, signal),
            None => {
                let (center, zoom) = config.initial_view();
                Viewport::new(center, zoom as i32, width, height, signal)
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        info!(
            lat = viewport.center().lat,
            lon = viewport.center().lon,
            zoom = viewport.zoom(),
            provider = cache.provider_name(),
            "Map session opened"
        );

        Ok(Self {
            viewport,
            cache,
            renderer: FrameRenderer::new(config.render_options()),
            sources: Vec::new(),
            visibility: config.layers,
            gestures: GestureTracker::new(),
            events_tx,
            events_rx: Some(events_rx),
            state_path,
        })
    }

    /// Hands out the event receiver. Only the first call gets it.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events_rx.take()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn renderer_mut(&mut self) -> &mut FrameRenderer {
        &mut self.renderer
    }

    pub fn repaint_signal(&self) -> &RepaintSignal {
        self.viewport.repaint_signal()
    }

    pub fn visibility(&self) -> LayerVisibility {
        self.visibility
    }

    /// Shows or hides an overlay category.
    pub fn set_layer_visible(&mut self, kind: OverlayKind, visible: bool) {
        if self.visibility.is_visible(kind) == visible {
            return;
        }
        self.visibility.set(kind, visible);
        self.repaint_signal().invalidate();
    }

    /// Adds an overlay source, drawn above the ones added before.
    pub fn add_source(&mut self, source: Arc<dyn OverlaySource>) {
        debug!(source = source.id(), "Overlay source added");
        self.sources.push(source);
        self.renderer.invalidate_overlays();
        self.repaint_signal().invalidate();
    }

    /// Drops an overlay source by id. Returns whether it was present.
    pub fn remove_source(&mut self, id: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| s.id() != id);
        let removed = self.sources.len() != before;
        if removed {
            self.renderer.invalidate_overlays();
            self.repaint_signal().invalidate();
        }
        removed
    }

    /// Applies one touch event to the map.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> GestureAction {
        let action = self
            .gestures
            .handle(event, self.viewport.is_measuring());

        match action {
            GestureAction::Ignored | GestureAction::Started => {}
            GestureAction::Pan { dx, dy } => {
                self.viewport.set_gesture_active(true);
                self.viewport.pan(dx, dy);
            }
            GestureAction::MeasureTo { x, y } => {
                self.viewport.measure_drag_to(x, y);
            }
            GestureAction::NoteRequested { x, y } => {
                let location = self.viewport.screen_to_world(x, y);
                self.emit(SessionEvent::NoteRequested(location));
            }
            GestureAction::Released => {
                self.viewport.set_gesture_active(false);
                if let Some(result) = self.viewport.measure_release() {
                    self.emit(SessionEvent::Measurement(result));
                }
            }
        }
        action
    }

    fn emit(&self, event: SessionEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("Session event dropped, receiver closed");
        }
    }

    /// Draws a frame unconditionally and clears the pending repaint.
    pub fn render_frame(&mut self, canvas: &mut dyn Canvas) -> FrameReport {
        self.repaint_signal().take();
        self.renderer.render(
            canvas,
            &self.viewport,
            &self.cache,
            &self.sources,
            &self.visibility,
        )
    }

    /// Draws a frame only if something asked for a repaint.
    pub fn render_if_needed(&mut self, canvas: &mut dyn Canvas) -> Option<FrameReport> {
        if !self.repaint_signal().is_pending() {
            return None;
        }
        Some(self.render_frame(canvas))
    }

    /// Turns network fetching on or off and repaints.
    pub fn set_network_enabled(&self, enabled: bool) {
        self.cache.set_network_enabled(enabled);
        self.repaint_signal().invalidate();
    }

    /// Persists the viewport. Called when the map goes to the background.
    pub fn suspend(&self) -> Result<(), SessionError> {
        let stats = self.cache.stats();
        info!(
            hit_rate = stats.hit_rate(),
            in_flight = stats.in_flight,
            "Map session suspended"
        );
        if let Some(path) = &self.state_path {
            self.viewport.state().save(path)?;
        }
        Ok(())
    }
}

/// Builds the HTTP tile source described by the `[network]` settings.
pub fn network_provider(config: &ConfigFile) -> Result<Arc<dyn Provider>, SessionError> {
    let client =
        ReqwestClient::with_timeout(&config.network.user_agent, config.network.timeout_secs)?;
    let template = TileUrlTemplate::parse(&config.network.tile_url)?;
    Ok(Arc::new(UrlTemplateProvider::new(
        client,
        template,
        TILE_PROVIDER_NAME,
    )))
}

fn restore_state(path: Option<&std::path::Path>) -> Option<ViewportState> {
    let path = path?;
    match ViewportState::load(path) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable viewport state");
            None
        }
    }
}
