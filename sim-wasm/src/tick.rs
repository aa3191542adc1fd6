//! The per-tick flocking update.

use glam::{BVec3, Vec3};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::error::{FlockError, FlockResult};
use crate::math;
use crate::neighbor_grid::NeighborGrid;
use crate::Flock;

impl Flock {
    /// Advances every boid by `dt` seconds.
    ///
    /// The grid is rebuilt first, then every boid's next velocity is computed
    /// from the same snapshot, and only then are velocities committed and
    /// positions integrated. A rejected `dt` leaves the flock untouched.
    pub fn step(&mut self, dt: f32) -> FlockResult<()> {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("rejected timestep {dt}");
            return Err(FlockError::InvalidTimestep(dt));
        }
        if self.state.is_empty() {
            return Ok(());
        }

        if self.config.use_grid {
            self.grid.rebuild(&self.state.positions);
        }

        let input = SteeringInput {
            config: &self.config,
            positions: &self.state.positions,
            velocities: &self.state.velocities,
            grid: self.config.use_grid.then_some(&self.grid),
            dt,
        };

        #[cfg(feature = "parallel")]
        self.scratch
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, next)| *next = input.next_velocity(i));

        #[cfg(not(feature = "parallel"))]
        for (i, next) in self.scratch.iter_mut().enumerate() {
            *next = input.next_velocity(i);
        }

        let flat = !self.config.dimensionality.is_3d();
        for ((position, velocity), &next) in self
            .state
            .positions
            .iter_mut()
            .zip(self.state.velocities.iter_mut())
            .zip(&self.scratch)
        {
            *velocity = next;
            *position += next * dt;
            if flat {
                position.z = 0.0;
            }
        }

        self.tick_count += 1;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NeighborSums {
    pub center: Vec3,
    pub velocity: Vec3,
    pub close: Vec3,
    pub count: u32,
}

/// Everything one boid's steering reads during a tick. Shared immutably by
/// all boids, so the steering pass can run on any number of threads.
pub(crate) struct SteeringInput<'a> {
    pub config: &'a SimulationConfig,
    pub positions: &'a [Vec3],
    pub velocities: &'a [Vec3],
    /// `None` scans the whole flock.
    pub grid: Option<&'a NeighborGrid>,
    pub dt: f32,
}

impl SteeringInput<'_> {
    pub fn gather(&self, i: usize) -> NeighborSums {
        let position = self.positions[i];
        let visual_range = self.config.visual_range;
        let min_distance = self.config.min_distance;
        let mut sums = NeighborSums::default();

        let visit = |j: usize| {
            let other = self.positions[j];
            let distance = position.distance(other);
            if distance <= 0.0 || distance >= visual_range {
                return;
            }

            sums.center += other;
            sums.velocity += self.velocities[j];
            sums.count += 1;
            if distance < min_distance {
                sums.close += position - other;
            }
        };

        match self.grid {
            Some(grid) => grid.for_each_candidate(grid.cell_of(position), visit),
            None => (0..self.positions.len()).for_each(visit),
        }

        sums
    }

    /// Velocity after cohesion, alignment and separation only.
    pub fn steer(&self, i: usize) -> Vec3 {
        let sums = self.gather(i);
        let position = self.positions[i];
        let dt = self.dt;
        let mut velocity = self.velocities[i];

        if sums.count > 0 {
            let n = sums.count as f32;
            let center = sums.center / n;
            let average_velocity = sums.velocity / n;

            velocity += (center - position) * self.config.cohesion_factor * dt;
            velocity += (average_velocity - velocity) * self.config.alignment_factor * dt;
        }
        velocity += sums.close * self.config.separation_factor * dt;

        velocity
    }

    /// Axes on which `position` lies outside the box. Depth never counts in 2D.
    pub fn outside(&self, position: Vec3) -> BVec3 {
        let bounds = self.config.bounds;
        BVec3::new(
            position.x.abs() > bounds.x,
            position.y.abs() > bounds.y,
            self.config.dimensionality.is_3d() && position.z.abs() > bounds.z,
        )
    }

    /// Pushes `velocity` back toward the box on every axis the boid has
    /// overshot. Boids are allowed outside; they just get turned around.
    pub fn contain(&self, position: Vec3, mut velocity: Vec3) -> Vec3 {
        let turn = self.config.turn_speed() * self.dt;
        let outside = self.outside(position);

        for (axis, overshot) in [outside.x, outside.y, outside.z].into_iter().enumerate() {
            if overshot {
                velocity[axis] -= turn * position[axis].signum();
            }
        }
        velocity
    }

    /// Steering, then the speed clamp, then containment.
    ///
    /// The clamp holds every overshot axis so raising a slow boid back to
    /// `min_speed` never undoes a turn; the final cap at `max_speed` scales
    /// proportionally and cannot undo one either.
    pub fn next_velocity(&self, i: usize) -> Vec3 {
        let position = self.positions[i];
        let flat = !self.config.dimensionality.is_3d();
        let min_speed = self.config.min_speed();
        let max_speed = self.config.max_speed;

        let mut velocity = self.steer(i);
        if flat {
            velocity.z = 0.0;
        }
        if velocity.length_squared() <= math::EPSILON {
            let home = if flat { position.truncate().extend(0.0) } else { position };
            velocity = math::homeward_heading(home) * min_speed;
        }

        let velocity = math::clamp_speed(velocity, self.outside(position), min_speed, max_speed);
        self.contain(position, velocity).clamp_length_max(max_speed)
    }
}
