use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ConfigPatch, SimulationConfig};
use crate::error::{FlockError, FlockResult};
use crate::math;
use crate::neighbor_grid::NeighborGrid;
use crate::state::BoidState;

/// A flock of boids plus everything needed to advance it.
///
/// The flock owns its arrays and grid outright; nothing is shared with the
/// caller except read-only slices.
pub struct Flock {
    pub(crate) config: SimulationConfig,
    pub(crate) state: BoidState,
    pub(crate) grid: NeighborGrid,
    /// Next-tick velocities, written by the steering pass.
    pub(crate) scratch: Vec<Vec3>,
    pub(crate) tick_count: u64,
    rng: StdRng,
}

impl Flock {
    /// Validates `config` and scatters `config.count` boids using `seed`.
    pub fn new(config: SimulationConfig, seed: u64) -> FlockResult<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let state = BoidState::random(
            &mut rng,
            config.count as usize,
            config.bounds,
            config.dimensionality,
        );
        let grid = NeighborGrid::for_config(&config);

        log::debug!(
            "created flock of {} boids (seed {seed}, grid {})",
            config.count,
            grid.dims()
        );

        Ok(Self {
            scratch: vec![Vec3::ZERO; state.len()],
            config,
            state,
            grid,
            tick_count: 0,
            rng,
        })
    }

    /// Builds a flock around an existing state, e.g. a hand-placed scenario.
    /// `config.count` is overwritten with the state's length.
    pub fn from_state(mut config: SimulationConfig, state: BoidState, seed: u64) -> FlockResult<Self> {
        if state.positions.len() != state.velocities.len() {
            return Err(FlockError::config(format!(
                "{} positions but {} velocities",
                state.positions.len(),
                state.velocities.len()
            )));
        }
        config.count = u32::try_from(state.len())
            .map_err(|_| FlockError::config(format!("{} boids is too many", state.len())))?;
        config.validate()?;

        Ok(Self {
            scratch: vec![Vec3::ZERO; state.len()],
            grid: NeighborGrid::for_config(&config),
            config,
            state,
            tick_count: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &BoidState {
        &self.state
    }

    pub fn grid(&self) -> &NeighborGrid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.state.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.state.velocities
    }

    /// Heading rotation of every boid, see [`math::heading_rotation`].
    pub fn orientations(&self) -> Vec<Quat> {
        self.state
            .velocities
            .iter()
            .map(|&velocity| math::heading_rotation(velocity))
            .collect()
    }

    /// Throws the current boids away and scatters `count` fresh ones inside
    /// the configured bounds.
    pub fn resize(&mut self, count: u32) -> FlockResult<()> {
        let mut next = self.config.clone();
        next.count = count;
        next.validate()?;

        self.state = BoidState::random(
            &mut self.rng,
            count as usize,
            next.bounds,
            next.dimensionality,
        );
        self.scratch.clear();
        self.scratch.resize(self.state.len(), Vec3::ZERO);
        self.config = next;

        log::debug!("resized flock to {count} boids");
        Ok(())
    }

    /// Applies new tunables. Positions and velocities are left alone; the
    /// change shows up on the next tick.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> FlockResult<()> {
        let next = self.config.merged(patch);
        next.validate()?;

        if self.config.grid_layout_differs(&next) {
            self.grid = NeighborGrid::for_config(&next);
        }
        if next.use_grid != self.config.use_grid {
            log::debug!("grid acceleration {}", if next.use_grid { "on" } else { "off" });
        }
        self.config = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bounds, Dimensionality};

    #[test]
    fn new_flock_matches_config() {
        let flock = Flock::new(SimulationConfig::for_count(100, Dimensionality::ThreeD), 1).unwrap();
        assert_eq!(flock.len(), 100);
        assert_eq!(flock.positions().len(), 100);
        assert_eq!(flock.velocities().len(), 100);
        assert_eq!(flock.orientations().len(), 100);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.max_speed = -1.0;
        assert!(matches!(Flock::new(config, 1), Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn resize_reseeds_state() {
        let mut flock = Flock::new(SimulationConfig::default(), 9).unwrap();
        let before = flock.state().clone();
        flock.resize(64).unwrap();

        assert_eq!(flock.len(), 64);
        assert_eq!(flock.config().count, 64);
        assert_ne!(&before.positions[..], &flock.positions()[..32]);
    }

    #[test]
    fn failed_update_leaves_everything_alone() {
        let mut flock = Flock::new(SimulationConfig::default(), 9).unwrap();
        let config = flock.config().clone();
        let state = flock.state().clone();

        let result = flock.update_config(&ConfigPatch {
            cohesion_factor: Some(2.0),
            min_distance: Some(10.0),
            ..Default::default()
        });

        assert!(result.is_err());
        assert_eq!(flock.config(), &config);
        assert_eq!(flock.state(), &state);
    }

    #[test]
    fn geometry_change_relays_grid() {
        let mut flock = Flock::new(SimulationConfig::default(), 9).unwrap();
        let dims = flock.grid().dims();
        flock
            .update_config(&ConfigPatch {
                bounds: Some(Bounds::new(5.0, 5.0, 5.0)),
                ..Default::default()
            })
            .unwrap();
        assert_ne!(flock.grid().dims(), dims);
    }

    #[test]
    fn from_state_rejects_mismatched_arrays() {
        let state = BoidState {
            positions: vec![Vec3::ZERO; 3],
            velocities: vec![Vec3::X; 2],
        };
        let result = Flock::from_state(SimulationConfig::default(), state, 0);
        assert!(matches!(result, Err(FlockError::InvalidConfig(_))));
    }

    #[test]
    fn from_state_takes_count_from_state() {
        let state = BoidState::from_parts(vec![Vec3::ZERO; 3], vec![Vec3::X; 3]);
        let flock = Flock::from_state(SimulationConfig::default(), state, 0).unwrap();
        assert_eq!(flock.config().count, 3);
    }
}
