//! Read-only queries for debugging and visualising the flock.
//!
//! Nothing here mutates the flock or depends on when the grid was last
//! rebuilt; every answer is computed from the current positions.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{FlockError, FlockResult};
use crate::tick::SteeringInput;
use crate::Flock;

/// How a boid relates to the boid named by `SimulationConfig::debug_tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BoidTag {
    /// The tagged boid itself.
    Focus = 0,
    /// Within visual range of the tagged boid.
    Neighbor = 1,
    /// Examined the tagged boid as a candidate this tick but found it out
    /// of range.
    Scanned = 2,
    /// Never looked at the tagged boid, or no boid is tagged.
    Unrelated = 3,
}

impl BoidTag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Flock {
    fn check_index(&self, index: usize) -> FlockResult<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(FlockError::IndexOutOfRange {
                index,
                count: self.len(),
            })
        }
    }

    fn in_visual_range(&self, a: Vec3, b: Vec3) -> bool {
        let distance = a.distance(b);
        distance > 0.0 && distance < self.config.visual_range
    }

    /// Relation of boid `index` to the tagged boid.
    pub fn classify(&self, index: usize) -> FlockResult<BoidTag> {
        self.check_index(index)?;

        let focus = match self.config.debug_tag {
            Some(tag) if (tag as usize) < self.len() => tag as usize,
            _ => return Ok(BoidTag::Unrelated),
        };
        if index == focus {
            return Ok(BoidTag::Focus);
        }

        let position = self.state.positions[index];
        let focus_position = self.state.positions[focus];
        if self.in_visual_range(position, focus_position) {
            return Ok(BoidTag::Neighbor);
        }

        let scanned = if self.config.use_grid {
            let here = self.grid.cell_coords(position);
            let there = self.grid.cell_coords(focus_position);
            let reach = (there - here).abs();
            reach.x <= 1 && reach.y <= 1 && reach.z <= 1
        } else {
            true
        };

        Ok(if scanned {
            BoidTag::Scanned
        } else {
            BoidTag::Unrelated
        })
    }

    /// [`classify`](Self::classify) for every boid, in index order.
    pub fn debug_tags(&self) -> Vec<BoidTag> {
        (0..self.len())
            .map(|i| self.classify(i).unwrap_or(BoidTag::Unrelated))
            .collect()
    }

    /// Indices of every boid within visual range of boid `index`, ascending.
    pub fn neighbors_of(&self, index: usize) -> FlockResult<Vec<usize>> {
        self.check_index(index)?;

        let position = self.state.positions[index];
        Ok(self
            .state
            .positions
            .iter()
            .enumerate()
            .filter(|&(_, &other)| self.in_visual_range(position, other))
            .map(|(j, _)| j)
            .collect())
    }

    /// Velocity the three flocking rules alone would give boid `index` over
    /// `dt`, before containment and the speed clamp.
    pub fn steering_of(&self, index: usize, dt: f32) -> FlockResult<Vec3> {
        self.check_index(index)?;

        let input = SteeringInput {
            config: &self.config,
            positions: &self.state.positions,
            velocities: &self.state.velocities,
            grid: None,
            dt,
        };
        Ok(input.steer(index))
    }
}
