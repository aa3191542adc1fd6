use glam::Vec3;
use rand::Rng;

use crate::config::{Bounds, Dimensionality};

const INITIAL_VELOCITY_SPREAD: f32 = 0.5;

/// Positions and velocities of every boid, stored as two parallel arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoidState {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl BoidState {
    pub fn from_parts(positions: Vec<Vec3>, velocities: Vec<Vec3>) -> Self {
        assert_eq!(positions.len(), velocities.len());
        Self {
            positions,
            velocities,
        }
    }

    /// Scatters `count` boids uniformly inside `bounds` with small random
    /// velocities. In 2D the depth components stay zero.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        count: usize,
        bounds: Bounds,
        dimensionality: Dimensionality,
    ) -> Self {
        let mut positions = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);

        for _ in 0..count {
            let mut position = Vec3::new(
                symmetric(rng, bounds.x),
                symmetric(rng, bounds.y),
                symmetric(rng, bounds.z),
            );
            let mut velocity = Vec3::new(
                symmetric(rng, INITIAL_VELOCITY_SPREAD),
                symmetric(rng, INITIAL_VELOCITY_SPREAD),
                symmetric(rng, INITIAL_VELOCITY_SPREAD),
            );
            if !dimensionality.is_3d() {
                position.z = 0.0;
                velocity.z = 0.0;
            }
            positions.push(position);
            velocities.push(velocity);
        }

        Self {
            positions,
            velocities,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// gen_range panics on an empty range, and a flat axis has half extent 0.
fn symmetric<R: Rng + ?Sized>(rng: &mut R, half_extent: f32) -> f32 {
    if half_extent <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-half_extent..half_extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_state_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = Bounds::new(2.0, 1.0, 0.5);
        let state = BoidState::random(&mut rng, 500, bounds, Dimensionality::ThreeD);

        assert_eq!(state.len(), 500);
        for (p, v) in state.positions.iter().zip(&state.velocities) {
            assert!(p.x.abs() <= 2.0 && p.y.abs() <= 1.0 && p.z.abs() <= 0.5);
            assert!(v.x.abs() <= 0.5 && v.y.abs() <= 0.5 && v.z.abs() <= 0.5);
        }
    }

    #[test]
    fn flat_state_has_no_depth() {
        let mut rng = StdRng::seed_from_u64(7);
        let bounds = Bounds::for_flock(64, Dimensionality::TwoD);
        let state = BoidState::random(&mut rng, 64, bounds, Dimensionality::TwoD);

        assert!(state.positions.iter().all(|p| p.z == 0.0));
        assert!(state.velocities.iter().all(|v| v.z == 0.0));
    }

    #[test]
    fn same_seed_same_state() {
        let bounds = Bounds::new(1.0, 1.0, 1.0);
        let a = BoidState::random(&mut StdRng::seed_from_u64(42), 32, bounds, Dimensionality::ThreeD);
        let b = BoidState::random(&mut StdRng::seed_from_u64(42), 32, bounds, Dimensionality::ThreeD);
        assert_eq!(a, b);
    }
}
