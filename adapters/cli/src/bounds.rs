//! Axis-aligned world volume projected onto the fog grid.

use fog_core::{GridSize, WorldToGrid};
use glam::{IVec2, Vec2, Vec3};

/// Rectangle in the world X/Y plane covered by the fog layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BoundsVolume {
    min: Vec2,
    max: Vec2,
}

impl BoundsVolume {
    /// Creates a volume spanning `min` to `max`.
    ///
    /// # Panics
    ///
    /// Panics when the volume has no extent along either axis.
    #[must_use]
    pub(crate) fn new(min: Vec2, max: Vec2) -> Self {
        assert!(
            max.x > min.x && max.y > min.y,
            "bounds volume {min}..{max} has no extent"
        );
        Self { min, max }
    }

    /// Lower corner of the volume.
    #[must_use]
    pub(crate) const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper corner of the volume.
    #[must_use]
    pub(crate) const fn max(&self) -> Vec2 {
        self.max
    }

    /// Reports whether the position lies inside the volume, edges included.
    #[must_use]
    pub(crate) fn contains(&self, position: Vec3) -> bool {
        let point = position.truncate();
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

impl WorldToGrid for BoundsVolume {
    fn world_to_grid(&self, position: Vec3, grid: GridSize) -> IVec2 {
        let cells = Vec2::new(grid.width() as f32, grid.height() as f32);
        let normalized = (position.truncate() - self.min) / (self.max - self.min);
        let cell = (normalized * cells).floor().as_ivec2();
        if self.contains(position) {
            // The upper edge belongs to the last column and row.
            cell.min(cells.as_ivec2() - IVec2::ONE)
        } else {
            cell
        }
    }
}
