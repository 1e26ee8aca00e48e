//! Fog layer settings and their validated form.

use fog_core::{GridSize, Rgba, UPSCALE_FACTOR};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_FOG_LAYER_RESOLUTION: u32 = 128;

/// Decides what happens to source marks between steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// The source buffer is cleared before each step, so it only holds the
    /// cells marked during the latest step.
    #[default]
    Pulse,
    /// Marks accumulate forever, producing an "ever seen" map.
    Sticky,
}

/// Errors raised while loading or validating fog settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The configured resolution is not a power of two.
    #[error("fog layer resolution {resolution} is not a power of two")]
    NotPowerOfTwo {
        /// Rejected resolution.
        resolution: u32,
    },
    /// The upscale grid derived from the resolution would not fit in a `u32`.
    #[error("fog layer resolution {resolution} is too large to upscale")]
    ResolutionTooLarge {
        /// Rejected resolution.
        resolution: u32,
    },
    /// The settings document could not be parsed.
    #[error("failed to parse fog settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Raw fog settings as read from a TOML document.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FogSettings {
    /// Side length of the square source grid. Must be a power of two.
    pub fog_layer_resolution: u32,
    /// Emits a debug sphere for every stamped agent.
    pub debug_agents_enabled: bool,
    /// Color of the debug spheres.
    pub debug_agents_color: Rgba,
    /// Uploads both buffers to presentation images every step.
    pub debug_buffers_enabled: bool,
    /// Clearing policy applied to the source buffer.
    pub retention: RetentionPolicy,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            fog_layer_resolution: DEFAULT_FOG_LAYER_RESOLUTION,
            debug_agents_enabled: false,
            debug_agents_color: Rgba::RED,
            debug_buffers_enabled: false,
            retention: RetentionPolicy::Pulse,
        }
    }
}

impl FogSettings {
    /// Parses settings from TOML. Missing keys fall back to their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the settings, producing the configuration consumed by a layer.
    pub fn validate(&self) -> Result<LayerConfig, SettingsError> {
        let mut config = LayerConfig::square(self.fog_layer_resolution)?
            .with_retention(self.retention)
            .with_presentation(self.debug_buffers_enabled);
        if self.debug_agents_enabled {
            config = config.with_debug_agents(self.debug_agents_color);
        }
        Ok(config)
    }
}

/// Validated configuration for a single layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerConfig {
    source: GridSize,
    upscale: GridSize,
    retention: RetentionPolicy,
    debug_agents: Option<Rgba>,
    presentation: bool,
}

impl LayerConfig {
    /// Creates a configuration for a square source grid of the given side length.
    pub fn square(resolution: u32) -> Result<Self, SettingsError> {
        if !resolution.is_power_of_two() {
            return Err(SettingsError::NotPowerOfTwo { resolution });
        }

        let source = GridSize::square(resolution);
        let upscale = source
            .scaled(UPSCALE_FACTOR)
            .ok_or(SettingsError::ResolutionTooLarge { resolution })?;

        Ok(Self {
            source,
            upscale,
            retention: RetentionPolicy::default(),
            debug_agents: None,
            presentation: false,
        })
    }

    /// Overrides the retention policy.
    #[must_use]
    pub const fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Enables debug spheres drawn in the provided color.
    #[must_use]
    pub const fn with_debug_agents(mut self, color: Rgba) -> Self {
        self.debug_agents = Some(color);
        self
    }

    /// Enables or disables presentation uploads.
    #[must_use]
    pub const fn with_presentation(mut self, enabled: bool) -> Self {
        self.presentation = enabled;
        self
    }

    /// Dimensions of the source grid.
    #[must_use]
    pub const fn source_size(&self) -> GridSize {
        self.source
    }

    /// Dimensions of the upscale grid.
    #[must_use]
    pub const fn upscale_size(&self) -> GridSize {
        self.upscale
    }

    /// Clearing policy applied to the source buffer.
    #[must_use]
    pub const fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Debug sphere color, when debug agents are enabled.
    #[must_use]
    pub const fn debug_agents(&self) -> Option<Rgba> {
        self.debug_agents
    }

    /// Whether buffers are uploaded to presentation images every step.
    #[must_use]
    pub const fn presentation(&self) -> bool {
        self.presentation
    }
}
