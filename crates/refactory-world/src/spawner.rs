//! Periodic resource spawning.
//!
//! Each resource kind has its own cadence: on every tick that is a multiple
//! of the kind's interval, one pile appears at a uniformly random point
//! inside the spawn bounds. A one-off burst near the first robot seeds the
//! floor at session start.
//!
//! All randomness, identifiers included, comes from a [`StdRng`] derived
//! from the configured seed and the tick number. The spawner keeps no
//! generator state between ticks, so a fixed seed replays the same floor,
//! including after a session is restored from a snapshot.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use refactory_types::{Position, ResourceKind, SpawnedResource, SpawnedResourceId, WorldState};

use crate::error::WorldError;

/// Axis-aligned rectangle, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Largest x.
    pub max_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest y.
    pub max_y: f64,
}

impl Bounds {
    fn validate(&self) -> Result<(), WorldError> {
        let finite = [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(WorldError::InvalidBounds("bounds must be finite"));
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(WorldError::InvalidBounds("min must not exceed max"));
        }
        Ok(())
    }
}

/// Cadence for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRule {
    /// Which kind spawns.
    pub kind: ResourceKind,
    /// Ticks between spawns. Zero disables the rule.
    pub every_ticks: u64,
    /// Units per pile.
    pub amount: u32,
}

/// Spawner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Seed for positions and identifiers.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Where periodic piles may appear.
    #[serde(default = "default_bounds")]
    pub bounds: Bounds,
    /// Per-kind cadence.
    #[serde(default = "default_rules")]
    pub rules: Vec<SpawnRule>,
    /// Piles placed once at session start, per kind.
    #[serde(default = "default_initial_burst")]
    pub initial_burst: Vec<(ResourceKind, u32)>,
    /// Burst area, as offsets from the first robot's position.
    #[serde(default = "default_burst_offset_min")]
    pub burst_offset_min: f64,
    /// Upper burst offset.
    #[serde(default = "default_burst_offset_max")]
    pub burst_offset_max: f64,
}

const fn default_seed() -> u64 {
    42
}

const fn default_bounds() -> Bounds {
    Bounds {
        min_x: 100.0,
        max_x: 1300.0,
        min_y: 100.0,
        max_y: 1000.0,
    }
}

fn default_rules() -> Vec<SpawnRule> {
    vec![
        SpawnRule {
            kind: ResourceKind::Iron,
            every_ticks: 60,
            amount: 1,
        },
        SpawnRule {
            kind: ResourceKind::Copper,
            every_ticks: 90,
            amount: 1,
        },
    ]
}

fn default_initial_burst() -> Vec<(ResourceKind, u32)> {
    vec![(ResourceKind::Iron, 3), (ResourceKind::Copper, 2)]
}

const fn default_burst_offset_min() -> f64 {
    50.0
}

const fn default_burst_offset_max() -> f64 {
    250.0
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            bounds: default_bounds(),
            rules: default_rules(),
            initial_burst: default_initial_burst(),
            burst_offset_min: default_burst_offset_min(),
            burst_offset_max: default_burst_offset_max(),
        }
    }
}

/// Odd 64-bit constant spreading consecutive ticks across seed space.
const TICK_STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Tick whose stream places the session-start burst.
const BURST_STREAM_TICK: u64 = 0;

/// Seeded resource spawner.
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
}

impl Spawner {
    /// Build a spawner, validating its bounds.
    pub fn new(config: SpawnerConfig) -> Result<Self, WorldError> {
        config.bounds.validate()?;
        if !(config.burst_offset_min.is_finite() && config.burst_offset_max.is_finite()) {
            return Err(WorldError::InvalidBounds("burst offsets must be finite"));
        }
        if config.burst_offset_min > config.burst_offset_max {
            return Err(WorldError::InvalidBounds("burst offset min exceeds max"));
        }
        Ok(Self { config })
    }

    /// The active configuration.
    pub const fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Generator for every draw made on `tick`.
    fn stream(&self, tick: u64) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ tick.wrapping_mul(TICK_STREAM_MIX))
    }

    /// Place the session-start burst around `anchor`.
    ///
    /// Returns how many piles were placed.
    /// An anchor that leaves the burst area non-finite places nothing.
    pub fn seed_initial(&self, world: &mut WorldState, anchor: Position) -> usize {
        let area = Bounds {
            min_x: anchor.x + self.config.burst_offset_min,
            max_x: anchor.x + self.config.burst_offset_max,
            min_y: anchor.y + self.config.burst_offset_min,
            max_y: anchor.y + self.config.burst_offset_max,
        };
        if let Err(e) = area.validate() {
            warn!(x = anchor.x, y = anchor.y, error = %e, "initial burst skipped");
            return 0;
        }
        let mut rng = self.stream(BURST_STREAM_TICK);
        let mut placed: usize = 0;
        for &(kind, count) in &self.config.initial_burst {
            for _ in 0..count {
                let position = random_point(&mut rng, area);
                let pile = pile(&mut rng, kind, 1, position);
                world.spawned_resources.push(pile);
                placed = placed.saturating_add(1);
            }
        }
        debug!(placed, "initial resources seeded");
        placed
    }

    /// Spawn every pile due on `tick`. Returns the new piles' identifiers.
    pub fn spawn_due(&self, world: &mut WorldState, tick: u64) -> Vec<SpawnedResourceId> {
        let mut spawned = Vec::new();
        let mut rng: Option<StdRng> = None;
        let bounds = self.config.bounds;
        for rule in &self.config.rules {
            if rule.every_ticks == 0 || rule.amount == 0 {
                continue;
            }
            if tick.checked_rem(rule.every_ticks) != Some(0) {
                continue;
            }
            let rng = rng.get_or_insert_with(|| self.stream(tick));
            let position = random_point(rng, bounds);
            let pile = pile(rng, rule.kind, rule.amount, position);
            debug!(
                tick,
                kind = %rule.kind,
                x = position.x,
                y = position.y,
                "resource spawned"
            );
            spawned.push(pile.id);
            world.spawned_resources.push(pile);
        }
        spawned
    }
}

fn random_point(rng: &mut StdRng, bounds: Bounds) -> Position {
    Position::new(
        rng.random_range(bounds.min_x..=bounds.max_x),
        rng.random_range(bounds.min_y..=bounds.max_y),
    )
}

fn pile(rng: &mut StdRng, kind: ResourceKind, amount: u32, position: Position) -> SpawnedResource {
    SpawnedResource {
        id: SpawnedResourceId::from_random_bytes(rng.random()),
        position,
        kind,
        amount,
    }
}
