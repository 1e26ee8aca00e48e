//! Seeded crowd of wandering agents that the CLI tracks with a fog layer.

use std::collections::BTreeMap;

use fog_core::{AgentId, PositionResolver, ResolveError, TrackedAgent};
use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::bounds::BoundsVolume;

const MIN_SPEED: f32 = 0.5;
const MAX_SPEED: f32 = 4.0;
const MIN_VISION_RADIUS: f32 = 1.0;
const MAX_VISION_RADIUS: f32 = 6.0;

#[derive(Clone, Copy, Debug)]
struct Walker {
    position: Vec2,
    velocity: Vec2,
}

/// Agents wandering inside a bounds volume, bouncing off its walls.
#[derive(Debug)]
pub(crate) struct Crowd {
    bounds: BoundsVolume,
    rng: ChaCha8Rng,
    roster: Vec<TrackedAgent>,
    walkers: BTreeMap<AgentId, Walker>,
}

impl Crowd {
    /// Spawns `count` agents at random positions inside `bounds`.
    #[must_use]
    pub(crate) fn spawn(bounds: BoundsVolume, count: u32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut roster = Vec::with_capacity(count as usize);
        let mut walkers = BTreeMap::new();

        for index in 0..count {
            let id = AgentId::new(index);
            let position = Vec2::new(
                rng.gen_range(bounds.min().x..bounds.max().x),
                rng.gen_range(bounds.min().y..bounds.max().y),
            );
            let heading = rng.gen_range(0.0..std::f32::consts::TAU);
            let speed = rng.gen_range(MIN_SPEED..MAX_SPEED);
            let vision_radius = rng.gen_range(MIN_VISION_RADIUS..MAX_VISION_RADIUS);

            roster.push(TrackedAgent::new(id, vision_radius));
            let _ = walkers.insert(
                id,
                Walker {
                    position,
                    velocity: Vec2::from_angle(heading) * speed,
                },
            );
        }

        Self {
            bounds,
            rng,
            roster,
            walkers,
        }
    }

    /// Every agent spawned by the crowd, including the ones that have left.
    #[must_use]
    pub(crate) fn roster(&self) -> &[TrackedAgent] {
        &self.roster
    }

    /// Number of agents still present in the world.
    #[must_use]
    pub(crate) fn present(&self) -> usize {
        self.walkers.len()
    }

    /// Moves every agent by `dt` seconds, reflecting it off the volume walls.
    pub(crate) fn advance(&mut self, dt: f32) {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        for walker in self.walkers.values_mut() {
            let mut next = walker.position + walker.velocity * dt;
            for axis in 0..2 {
                if next[axis] < min[axis] {
                    next[axis] = min[axis] + (min[axis] - next[axis]);
                    walker.velocity[axis] = -walker.velocity[axis];
                } else if next[axis] > max[axis] {
                    next[axis] = max[axis] - (next[axis] - max[axis]);
                    walker.velocity[axis] = -walker.velocity[axis];
                }
            }
            walker.position = next.clamp(min, max);
        }
    }

    /// Removes a random agent from the world while it stays registered with
    /// the layer. Returns the agent that left, if any remained.
    pub(crate) fn retire_one(&mut self) -> Option<AgentId> {
        if self.walkers.is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..self.walkers.len());
        let agent = *self.walkers.keys().nth(pick)?;
        let _ = self.walkers.remove(&agent);
        Some(agent)
    }
}

impl PositionResolver for Crowd {
    fn world_position(&self, agent: AgentId) -> Result<Vec3, ResolveError> {
        self.walkers
            .get(&agent)
            .map(|walker| walker.position.extend(0.0))
            .ok_or(ResolveError::AgentDestroyed(agent))
    }
}
