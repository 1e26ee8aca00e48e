#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that stamps tracked agents into the source visibility buffer.

use fog_core::{
    DebugSphere, Event, GridBuffer, PositionResolver, Rgba, TrackedAgent, WorldToGrid,
    DEBUG_SPHERE_SEGMENTS, VISIBLE,
};

/// Writes one visibility mark per tracked agent each step.
///
/// The mapping from world space to the grid belongs to the injected
/// [`WorldToGrid`] collaborator; the writer only validates the result and
/// stamps the cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct VisibilityWriter {
    debug_color: Option<Rgba>,
}

impl VisibilityWriter {
    /// Creates a writer that produces no debug output.
    #[must_use]
    pub const fn new() -> Self {
        Self { debug_color: None }
    }

    /// Creates a writer that also emits a [`DebugSphere`] per resolved agent.
    #[must_use]
    pub const fn with_debug_agents(color: Rgba) -> Self {
        Self {
            debug_color: Some(color),
        }
    }

    /// Color used for debug spheres, when enabled.
    #[must_use]
    pub const fn debug_agents(&self) -> Option<Rgba> {
        self.debug_color
    }

    /// Stamps every agent yielded by `agents` into `buffer`.
    ///
    /// Agents whose position can no longer be resolved are skipped for this
    /// step and reported through [`Event::AgentSkipped`].
    ///
    /// # Panics
    ///
    /// Panics when the transform projects an agent outside the buffer. The
    /// transform guarantees in-bounds results for agents inside the layer
    /// volume, so an escape means the host placed or configured something
    /// incorrectly.
    pub fn handle<'a, I>(
        &self,
        agents: I,
        resolver: &dyn PositionResolver,
        transform: &dyn WorldToGrid,
        buffer: &mut GridBuffer,
        out_events: &mut Vec<Event>,
        out_debug: &mut Vec<DebugSphere>,
    ) where
        I: IntoIterator<Item = &'a TrackedAgent>,
    {
        let size = buffer.size();

        for agent in agents {
            let position = match resolver.world_position(agent.id()) {
                Ok(position) => position,
                Err(reason) => {
                    log::debug!("skipping agent {:?} this step: {reason}", agent.id());
                    out_events.push(Event::AgentSkipped {
                        agent: agent.id(),
                        reason,
                    });
                    continue;
                }
            };

            let projected = transform.world_to_grid(position, size);

            if let Some(color) = self.debug_color {
                out_debug.push(DebugSphere {
                    agent: agent.id(),
                    center: position,
                    radius: agent.vision_radius(),
                    color,
                    segments: DEBUG_SPHERE_SEGMENTS,
                });
            }

            let Some(cell) = size.checked_coord(projected) else {
                panic!(
                    "agent {:?} at {position} projected to ({}, {}) outside the {}x{} layer",
                    agent.id(),
                    projected.x,
                    projected.y,
                    size.width(),
                    size.height(),
                );
            };

            buffer.write(cell, VISIBLE);
            out_events.push(Event::CellStamped {
                agent: agent.id(),
                cell,
            });
        }
    }
}

/// Regenerates `target` from `source` by nearest-neighbour replication.
///
/// Every source cell fills a block of `target / source` cells on each axis.
///
/// # Panics
///
/// Panics when the target dimensions are not whole multiples of the source.
pub fn upscale_nearest(source: &GridBuffer, target: &mut GridBuffer) {
    let from = source.size();
    let to = target.size();
    assert!(
        from.width() > 0
            && from.height() > 0
            && to.width() % from.width() == 0
            && to.height() % from.height() == 0,
        "cannot upscale a {}x{} grid into {}x{}",
        from.width(),
        from.height(),
        to.width(),
        to.height(),
    );

    let factor_x = (to.width() / from.width()) as usize;
    let factor_y = to.height() / from.height();

    for row in 0..to.height() {
        let source_row = source.row(row / factor_y);
        for (column, cell) in target.row_mut(row).iter_mut().enumerate() {
            *cell = source_row[column / factor_x];
        }
    }
}
