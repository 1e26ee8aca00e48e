#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the fog layer workspace.
//!
//! This crate defines the vocabulary that connects the authoritative layer
//! state, the pure systems that stamp and upload it, and the adapters that
//! host it. Drivers submit [`Command`] values describing agent registration
//! changes, the layer executes them and broadcasts [`Event`] values. Host
//! collaborators (position lookups, the world-to-grid transform, the
//! presentation backend, and the layer coordinator) are expressed as traits so
//! they can be injected at construction time.

use std::time::Duration;

use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod grid;

pub use grid::{AllocationError, GridBuffer, Snapshot};

/// Byte stamped into a cell occupied by an agent during the current step.
pub const VISIBLE: u8 = 0xFF;

/// Byte stored in cells that are not marked visible.
pub const HIDDEN: u8 = 0x00;

/// Ratio between the upscale and source grid side lengths.
pub const UPSCALE_FACTOR: u32 = 4;

/// Number of segments hosts should use when tessellating debug spheres.
pub const DEBUG_SPHERE_SEGMENTS: u32 = 32;

/// Commands that express all permissible registry mutations on a layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Starts tracking an agent. Registering an already tracked agent is a no-op.
    RegisterAgent {
        /// Agent that should contribute to the visibility buffer.
        agent: TrackedAgent,
    },
    /// Stops tracking an agent.
    UnregisterAgent {
        /// Identifier of the agent to remove.
        agent: AgentId,
    },
}

/// Events broadcast by a layer after processing commands or running a step.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that an agent joined the registry.
    AgentRegistered {
        /// Identifier of the newly tracked agent.
        agent: AgentId,
    },
    /// Confirms that an agent left the registry.
    AgentUnregistered {
        /// Identifier of the removed agent.
        agent: AgentId,
    },
    /// Reports an attempt to remove an agent that was never registered.
    AgentNotFound {
        /// Identifier supplied in the removal request.
        agent: AgentId,
    },
    /// Reports that an agent could not contribute to the current step.
    AgentSkipped {
        /// Identifier of the skipped agent.
        agent: AgentId,
        /// Reason reported by the position resolver.
        reason: ResolveError,
    },
    /// Confirms that an agent marked a source cell as visible.
    CellStamped {
        /// Identifier of the agent that produced the mark.
        agent: AgentId,
        /// Source grid cell that received the mark.
        cell: GridCoord,
    },
    /// Confirms that a buffer copy was handed to the presentation sink.
    SnapshotSubmitted {
        /// Image the copy targets.
        target: ImageHandle,
        /// Number of bytes transferred with the copy.
        bytes: usize,
    },
    /// Indicates that a simulation step finished.
    StepCompleted {
        /// Zero-based index of the step that completed.
        step: u64,
        /// Simulated time covered by the step.
        dt: Duration,
    },
}

/// Unique identifier assigned to a tracked agent by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a fog layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(u32);

impl LayerId {
    /// Creates a new layer identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle naming a presentation image owned by the rendering backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(u32);

impl ImageHandle {
    /// Creates a new image handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Agent tracked by a layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedAgent {
    id: AgentId,
    vision_radius: f32,
}

impl TrackedAgent {
    /// Creates a tracked agent descriptor.
    ///
    /// The vision radius only sizes debug spheres; it never affects sampling.
    #[must_use]
    pub const fn new(id: AgentId, vision_radius: f32) -> Self {
        Self { id, vision_radius }
    }

    /// Identity of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Radius of the agent's vision in world units.
    #[must_use]
    pub const fn vision_radius(&self) -> f32 {
        self.vision_radius
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    column: u32,
    row: u32,
}

impl GridCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index (x) of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index (y) of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

/// Dimensions of a grid measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    width: u32,
    height: u32,
}

impl GridSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Creates a square size descriptor.
    #[must_use]
    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells, or `None` when the product overflows `usize`.
    #[must_use]
    pub fn cell_count(&self) -> Option<usize> {
        let width = usize::try_from(self.width).ok()?;
        let height = usize::try_from(self.height).ok()?;
        width.checked_mul(height)
    }

    /// Reports whether both dimensions are powers of two.
    #[must_use]
    pub const fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Multiplies both dimensions by `factor`, returning `None` on overflow.
    #[must_use]
    pub const fn scaled(&self, factor: u32) -> Option<Self> {
        match (
            self.width.checked_mul(factor),
            self.height.checked_mul(factor),
        ) {
            (Some(width), Some(height)) => Some(Self::new(width, height)),
            _ => None,
        }
    }

    /// Converts a signed grid position into a coordinate when it lies inside the grid.
    #[must_use]
    pub fn checked_coord(&self, position: IVec2) -> Option<GridCoord> {
        let column = u32::try_from(position.x).ok()?;
        let row = u32::try_from(position.y).ok()?;
        (column < self.width && row < self.height).then_some(GridCoord::new(column, row))
    }
}

/// Rectangle of texels updated by a single upload.
///
/// Destination and source offsets are tracked separately so a partial copy can
/// be placed anywhere in the target image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UpdateRegion {
    dest_x: u32,
    dest_y: u32,
    src_x: u32,
    src_y: u32,
    width: u32,
    height: u32,
}

impl UpdateRegion {
    /// Creates a region from explicit offsets and extent.
    #[must_use]
    pub const fn new(
        dest_x: u32,
        dest_y: u32,
        src_x: u32,
        src_y: u32,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            dest_x,
            dest_y,
            src_x,
            src_y,
            width,
            height,
        }
    }

    /// Region covering an entire surface of the provided size.
    #[must_use]
    pub const fn full(size: GridSize) -> Self {
        Self::new(0, 0, 0, 0, size.width(), size.height())
    }

    /// Column of the first destination texel.
    #[must_use]
    pub const fn dest_x(&self) -> u32 {
        self.dest_x
    }

    /// Row of the first destination texel.
    #[must_use]
    pub const fn dest_y(&self) -> u32 {
        self.dest_y
    }

    /// Column of the first source byte.
    #[must_use]
    pub const fn src_x(&self) -> u32 {
        self.src_x
    }

    /// Row of the first source byte.
    #[must_use]
    pub const fn src_y(&self) -> u32 {
        self.src_y
    }

    /// Width of the copied rectangle.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the copied rectangle.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// RGBA color expressed in byte channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Rgba {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel.
    pub alpha: u8,
}

impl Rgba {
    /// Opaque red, the default debug color for agents.
    pub const RED: Self = Self::new(0xFF, 0x00, 0x00, 0xFF);

    /// Creates a color from byte channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::RED
    }
}

impl From<[u8; 4]> for Rgba {
    fn from([red, green, blue, alpha]: [u8; 4]) -> Self {
        Self::new(red, green, blue, alpha)
    }
}

impl From<Rgba> for [u8; 4] {
    fn from(color: Rgba) -> Self {
        [color.red, color.green, color.blue, color.alpha]
    }
}

/// Debug sphere describing an agent's vision for hosts that draw overlays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugSphere {
    /// Agent the sphere belongs to.
    pub agent: AgentId,
    /// World-space center of the sphere.
    pub center: Vec3,
    /// Radius of the sphere in world units.
    pub radius: f32,
    /// Color the sphere should be drawn with.
    pub color: Rgba,
    /// Tessellation hint for the host renderer.
    pub segments: u32,
}

/// Texel layouts supported by presentation images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit grayscale channel.
    Gray8,
}

impl PixelFormat {
    /// Number of bytes occupied by one texel.
    #[must_use]
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            Self::Gray8 => 1,
        }
    }
}

/// Sampling filters applied to presentation images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    /// Nearest-texel sampling, keeping cell edges crisp.
    Nearest,
    /// Bilinear sampling.
    Linear,
}

/// Addressing applied when sampling outside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Samples outside the image repeat the border texel.
    Clamp,
    /// Samples outside the image wrap around.
    Wrap,
}

/// Describes a presentation image to be created by the rendering backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Dimensions of the image in texels.
    pub size: GridSize,
    /// Texel layout.
    pub format: PixelFormat,
    /// Sampling filter.
    pub filter: TextureFilter,
    /// Horizontal and vertical addressing mode.
    pub address: AddressMode,
    /// Whether texel values are stored in sRGB space.
    pub srgb: bool,
}

impl TextureDescriptor {
    /// Linear single-channel image with nearest filtering and clamped addressing.
    #[must_use]
    pub const fn grayscale(size: GridSize) -> Self {
        Self {
            size,
            format: PixelFormat::Gray8,
            filter: TextureFilter::Nearest,
            address: AddressMode::Clamp,
            srgb: false,
        }
    }
}

/// Message transferring one buffer copy to the presentation backend.
///
/// The request owns its snapshot; whoever consumes the request releases it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    /// Image receiving the bytes.
    pub target: ImageHandle,
    /// Rectangle of the image being replaced.
    pub region: UpdateRegion,
    /// Number of bytes between the starts of consecutive source rows.
    pub pitch: u32,
    /// Copy of the buffer contents taken at submission time.
    pub snapshot: Snapshot,
}

/// Reasons a position lookup can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum ResolveError {
    /// The agent no longer exists in the host world.
    #[error("agent {0:?} no longer exists")]
    AgentDestroyed(AgentId),
}

/// Resolves the current world-space position of tracked agents.
pub trait PositionResolver {
    /// Returns the agent's position, or an error when the agent is gone.
    fn world_position(&self, agent: AgentId) -> Result<Vec3, ResolveError>;
}

/// Maps world-space positions onto layer grid coordinates.
///
/// Implementations must return in-bounds coordinates for every position that
/// lies inside their configured bounds volume.
pub trait WorldToGrid {
    /// Projects `position` onto a grid of the provided size.
    fn world_to_grid(&self, position: Vec3, grid: GridSize) -> IVec2;
}

/// Asynchronous presentation backend that receives buffer copies.
///
/// Every method returns immediately. The sink takes ownership of submitted
/// requests and may silently drop an update when its target is not ready.
pub trait PresentationSink {
    /// Allocates a presentation image and returns the handle naming it.
    fn create_target(&self, descriptor: TextureDescriptor) -> ImageHandle;

    /// Hands a buffer copy to the backend.
    fn submit(&self, request: UploadRequest);

    /// Releases a presentation image once no further uploads will target it.
    fn release_target(&self, target: ImageHandle);
}

/// Coordinator notified when layers are created and torn down.
pub trait LayerObserver {
    /// Called once after a layer finished initializing.
    fn on_layer_added(&self, layer: LayerId);

    /// Called once while a layer is being torn down.
    fn on_layer_removed(&self, layer: LayerId);
}
