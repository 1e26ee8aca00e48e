#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative fog layer state.
//!
//! A [`Layer`] owns a source visibility buffer, the upscale buffer derived
//! from it, and the registry of tracked agents. Drivers create a layer with
//! [`Layer::create`], mutate its registry through [`apply`], advance it once
//! per simulation step with [`step`], and end its lifetime with [`destroy`].

mod agents;
mod directory;
mod settings;

use std::{sync::Arc, time::Duration};

use fog_core::{
    AllocationError, Command, DebugSphere, Event, GridBuffer, LayerId, LayerObserver,
    PositionResolver, PresentationSink, WorldToGrid, UPSCALE_FACTOR,
};
use fog_system_upload::{SnapshotUploader, UploadTarget};
use fog_system_visibility::{upscale_nearest, VisibilityWriter};

pub use agents::{AgentRegistry, NotFoundWarning};
pub use directory::LayerDirectory;
pub use settings::{FogSettings, LayerConfig, RetentionPolicy, SettingsError};

/// Collaborators injected into a layer when it is created.
pub struct LayerHooks {
    /// Coordinator notified when the layer is created and torn down.
    pub observer: Arc<dyn LayerObserver + Send + Sync>,
    /// Presentation backend receiving buffer copies. Only consulted when the
    /// configuration enables presentation.
    pub sink: Option<Box<dyn PresentationSink>>,
}

impl LayerHooks {
    /// Hooks that notify `observer` and never present buffers.
    #[must_use]
    pub fn new(observer: Arc<dyn LayerObserver + Send + Sync>) -> Self {
        Self {
            observer,
            sink: None,
        }
    }

    /// Attaches a presentation sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn PresentationSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

/// Host queries consulted while stamping agents.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    /// Resolves agent positions in world space.
    pub positions: &'a dyn PositionResolver,
    /// Projects world positions onto the layer grid.
    pub transform: &'a dyn WorldToGrid,
}

struct Presentation {
    uploader: SnapshotUploader,
    source: UploadTarget,
    upscale: UploadTarget,
}

/// Fog layer with its buffers and tracked agents.
pub struct Layer {
    id: LayerId,
    config: LayerConfig,
    source: GridBuffer,
    upscale: GridBuffer,
    agents: AgentRegistry,
    writer: VisibilityWriter,
    presentation: Option<Presentation>,
    observer: Arc<dyn LayerObserver + Send + Sync>,
    debug_spheres: Vec<DebugSphere>,
    steps_completed: u64,
}

impl Layer {
    /// Allocates both buffers, announces the layer to its observer, and
    /// prepares presentation targets when enabled.
    ///
    /// # Panics
    ///
    /// Panics when the sizes break the power-of-two or upscale contract, or
    /// when the observer rejects the announcement. A rejected layer is never
    /// torn down, so the observer hears nothing further about it.
    pub fn create(
        id: LayerId,
        config: LayerConfig,
        hooks: LayerHooks,
    ) -> Result<Self, AllocationError> {
        let source_size = config.source_size();
        let upscale_size = config.upscale_size();
        assert!(
            source_size.is_power_of_two(),
            "fog layer source grid must be a power of two"
        );
        assert_eq!(
            source_size.scaled(UPSCALE_FACTOR),
            Some(upscale_size),
            "upscale grid must be {UPSCALE_FACTOR}x the source grid"
        );

        let source = GridBuffer::new(source_size)?;
        let upscale = GridBuffer::new(upscale_size)?;

        // Announce before `Self` exists so a rejected id never reaches `Drop`.
        hooks.observer.on_layer_added(id);

        let presentation = match (config.presentation(), hooks.sink) {
            (true, Some(sink)) => {
                let uploader = SnapshotUploader::new(sink);
                let source = uploader.create_target(source_size);
                let upscale = uploader.create_target(upscale_size);
                Some(Presentation {
                    uploader,
                    source,
                    upscale,
                })
            }
            (true, None) => {
                log::warn!("fog layer {id:?} enables presentation without a sink; uploads disabled");
                None
            }
            (false, _) => None,
        };

        let writer = match config.debug_agents() {
            Some(color) => VisibilityWriter::with_debug_agents(color),
            None => VisibilityWriter::new(),
        };

        let layer = Self {
            id,
            config,
            source,
            upscale,
            agents: AgentRegistry::new(),
            writer,
            presentation,
            observer: hooks.observer,
            debug_spheres: Vec::new(),
            steps_completed: 0,
        };

        log::info!(
            "created fog layer {id:?}: {}x{} source, {}x{} upscale",
            source_size.width(),
            source_size.height(),
            upscale_size.width(),
            upscale_size.height(),
        );
        Ok(layer)
    }
}

impl Drop for Layer {
    fn drop(&mut self) {
        if let Some(presentation) = self.presentation.take() {
            presentation.uploader.release_target(presentation.source);
            presentation.uploader.release_target(presentation.upscale);
        }
        self.observer.on_layer_removed(self.id);
        log::info!(
            "destroyed fog layer {:?} after {} steps",
            self.id,
            self.steps_completed
        );
    }
}

/// Tears down a layer, releasing its presentation targets and notifying its observer.
///
/// Taking the layer by value guarantees no further upload can be submitted.
/// Copies already handed to the sink stay valid because they never borrow the
/// layer's buffers.
pub fn destroy(layer: Layer) {
    drop(layer);
}

/// Applies a registry command to the layer.
pub fn apply(layer: &mut Layer, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::RegisterAgent { agent } => {
            if layer.agents.add(agent) {
                out_events.push(Event::AgentRegistered { agent: agent.id() });
            }
        }
        Command::UnregisterAgent { agent } => match layer.agents.remove(agent) {
            Ok(_) => out_events.push(Event::AgentUnregistered { agent }),
            Err(warning) => {
                log::warn!("fog layer {:?}: {warning}", layer.id);
                out_events.push(Event::AgentNotFound { agent });
            }
        },
    }
}

/// Advances the layer by one simulation step.
///
/// Under [`RetentionPolicy::Pulse`] the source buffer is cleared first. Every
/// tracked agent is then stamped, the upscale buffer is regenerated from the
/// source, and both buffers are uploaded when presentation is enabled.
///
/// # Panics
///
/// Panics when the transform projects an agent outside the source grid.
pub fn step(layer: &mut Layer, dt: Duration, scene: Scene<'_>, out_events: &mut Vec<Event>) {
    layer.debug_spheres.clear();

    if layer.config.retention() == RetentionPolicy::Pulse {
        layer.source.clear_all();
    }

    layer.writer.handle(
        layer.agents.iter(),
        scene.positions,
        scene.transform,
        &mut layer.source,
        out_events,
        &mut layer.debug_spheres,
    );

    upscale_nearest(&layer.source, &mut layer.upscale);

    if let Some(presentation) = &layer.presentation {
        presentation
            .uploader
            .upload(&layer.source, &presentation.source, out_events);
        presentation
            .uploader
            .upload(&layer.upscale, &presentation.upscale, out_events);
    }

    out_events.push(Event::StepCompleted {
        step: layer.steps_completed,
        dt,
    });
    layer.steps_completed += 1;
}

/// Read-only queries over a layer.
pub mod query {
    use fog_core::{DebugSphere, GridBuffer, ImageHandle, LayerId, TrackedAgent};

    use super::{Layer, LayerConfig};

    /// Identifier of the layer.
    #[must_use]
    pub fn id(layer: &Layer) -> LayerId {
        layer.id
    }

    /// Configuration the layer was created with.
    #[must_use]
    pub fn config(layer: &Layer) -> &LayerConfig {
        &layer.config
    }

    /// Source visibility buffer.
    #[must_use]
    pub fn source_buffer(layer: &Layer) -> &GridBuffer {
        &layer.source
    }

    /// Upscale buffer derived from the source buffer.
    #[must_use]
    pub fn upscale_buffer(layer: &Layer) -> &GridBuffer {
        &layer.upscale
    }

    /// Tracked agents in registration order.
    pub fn agents(layer: &Layer) -> impl Iterator<Item = &TrackedAgent> {
        layer.agents.iter()
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn agent_count(layer: &Layer) -> usize {
        layer.agents.len()
    }

    /// Reports whether buffers are uploaded every step.
    #[must_use]
    pub fn presentation_enabled(layer: &Layer) -> bool {
        layer.presentation.is_some()
    }

    /// Presentation images for the source and upscale buffers, when enabled.
    #[must_use]
    pub fn presentation_targets(layer: &Layer) -> Option<(ImageHandle, ImageHandle)> {
        layer
            .presentation
            .as_ref()
            .map(|presentation| (presentation.source.handle(), presentation.upscale.handle()))
    }

    /// Debug spheres produced by the most recent step.
    #[must_use]
    pub fn debug_spheres(layer: &Layer) -> &[DebugSphere] {
        &layer.debug_spheres
    }

    /// Number of steps the layer has completed.
    #[must_use]
    pub fn steps_completed(layer: &Layer) -> u64 {
        layer.steps_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fog_core::{GridSize, HIDDEN};

    fn hooks() -> (LayerHooks, Arc<LayerDirectory>) {
        let directory = Arc::new(LayerDirectory::new());
        (LayerHooks::new(directory.clone()), directory)
    }

    #[test]
    fn create_allocates_zeroed_buffers() {
        let (hooks, _directory) = hooks();
        let config = LayerConfig::square(8).expect("valid");

        let layer = Layer::create(LayerId::new(1), config, hooks).expect("allocate");

        assert_eq!(query::source_buffer(&layer).size(), GridSize::square(8));
        assert_eq!(query::upscale_buffer(&layer).size(), GridSize::square(32));
        assert!(query::source_buffer(&layer)
            .as_bytes()
            .iter()
            .all(|cell| *cell == HIDDEN));
        assert!(query::upscale_buffer(&layer)
            .as_bytes()
            .iter()
            .all(|cell| *cell == HIDDEN));
        assert_eq!(query::agent_count(&layer), 0);
        assert!(!query::presentation_enabled(&layer));
    }

    #[test]
    fn lifecycle_notifies_observer_once_each_way() {
        let (hooks, directory) = hooks();
        let config = LayerConfig::square(4).expect("valid");

        let layer = Layer::create(LayerId::new(3), config, hooks).expect("allocate");
        assert_eq!(directory.layers(), vec![LayerId::new(3)]);

        destroy(layer);
        assert!(directory.layers().is_empty());
    }

    #[test]
    fn presentation_without_sink_is_disabled() {
        let (hooks, _directory) = hooks();
        let config = LayerConfig::square(4)
            .expect("valid")
            .with_presentation(true);

        let layer = Layer::create(LayerId::new(1), config, hooks).expect("allocate");

        assert!(!query::presentation_enabled(&layer));
        assert_eq!(query::presentation_targets(&layer), None);
    }
}
