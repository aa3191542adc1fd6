use serde::{Deserialize, Serialize};

use crate::error::{FlockError, FlockResult};
use crate::neighbor_grid::GRID_MARGIN_CELLS;

pub const MAX_BOIDS: u32 = 1 << 20;
pub const MAX_GRID_CELLS: u64 = 1 << 26;
pub const DEFAULT_COUNT: u32 = 32;
pub const DEFAULT_MAX_SPEED: f32 = 1.5;
pub const DEFAULT_VISUAL_RANGE: f32 = 0.5;
pub const DEFAULT_MIN_DISTANCE: f32 = 0.15;
pub const DEFAULT_COHESION_FACTOR: f32 = 1.0;
pub const DEFAULT_SEPARATION_FACTOR: f32 = 30.0;
pub const DEFAULT_ALIGNMENT_FACTOR: f32 = 5.0;

pub const MIN_SPEED_RATIO: f32 = 0.75;
pub const TURN_SPEED_RATIO: f32 = 3.0;

const MIN_WORLD_SIZE: f32 = 1.5;
const EDGE_MARGIN: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimensionality {
    /// Depth axis is pinned to zero.
    TwoD,
    #[default]
    ThreeD,
}

impl TryFrom<u32> for Dimensionality {
    type Error = FlockError;

    fn try_from(value: u32) -> FlockResult<Self> {
        match value {
            2 => Ok(Self::TwoD),
            3 => Ok(Self::ThreeD),
            other => Err(FlockError::config(format!(
                "dimensions must be 2 or 3, got {other}"
            ))),
        }
    }
}

impl Dimensionality {
    pub fn is_3d(self) -> bool {
        self == Self::ThreeD
    }
}

/// Per-axis half extents of the region boids are steered to stay inside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Scene extents scaled to the flock size: a wide box in 3D, a flat
    /// 2:1 panel in 2D.
    pub fn for_flock(count: u32, dimensionality: Dimensionality) -> Self {
        let size = MIN_WORLD_SIZE.max((count as f32).cbrt() / 4.0);
        match dimensionality {
            Dimensionality::ThreeD => Self {
                x: size - EDGE_MARGIN,
                y: size / 2.0 - EDGE_MARGIN,
                z: size - EDGE_MARGIN,
            },
            Dimensionality::TwoD => Self {
                x: size * 3.0,
                y: size * 1.5,
                z: 0.0,
            },
        }
    }

    pub fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    pub count: u32,
    pub bounds: Bounds,
    pub max_speed: f32,
    /// Neighbour radius.
    pub visual_range: f32,
    /// Separation kicks in below this distance.
    pub min_distance: f32,
    /// Grid cell edge. Must be at least `visual_range` so a 3x3x3 block
    /// covers the whole neighbourhood.
    pub cell_size: f32,
    pub cohesion_factor: f32,
    pub separation_factor: f32,
    pub alignment_factor: f32,
    pub use_grid: bool,
    pub dimensionality: Dimensionality,
    /// Boid tracked by the inspection queries.
    pub debug_tag: Option<u32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::for_count(DEFAULT_COUNT, Dimensionality::ThreeD)
    }
}

impl SimulationConfig {
    pub fn for_count(count: u32, dimensionality: Dimensionality) -> Self {
        Self {
            count,
            bounds: Bounds::for_flock(count, dimensionality),
            max_speed: DEFAULT_MAX_SPEED,
            visual_range: DEFAULT_VISUAL_RANGE,
            min_distance: DEFAULT_MIN_DISTANCE,
            cell_size: DEFAULT_VISUAL_RANGE,
            cohesion_factor: DEFAULT_COHESION_FACTOR,
            separation_factor: DEFAULT_SEPARATION_FACTOR,
            alignment_factor: DEFAULT_ALIGNMENT_FACTOR,
            use_grid: true,
            dimensionality,
            debug_tag: None,
        }
    }

    pub fn min_speed(&self) -> f32 {
        self.max_speed * MIN_SPEED_RATIO
    }

    pub fn turn_speed(&self) -> f32 {
        self.max_speed * TURN_SPEED_RATIO
    }

    pub fn validate(&self) -> FlockResult<()> {
        if self.count > MAX_BOIDS {
            return Err(FlockError::config(format!(
                "count {} exceeds the maximum of {MAX_BOIDS}",
                self.count
            )));
        }
        positive("max_speed", self.max_speed)?;
        positive("visual_range", self.visual_range)?;
        positive("cell_size", self.cell_size)?;
        if self.cell_size < self.visual_range {
            return Err(FlockError::config(format!(
                "cell_size {} is smaller than visual_range {}",
                self.cell_size, self.visual_range
            )));
        }
        if !(self.min_distance > 0.0 && self.min_distance < self.visual_range) {
            return Err(FlockError::config(format!(
                "min_distance {} must lie in (0, {})",
                self.min_distance, self.visual_range
            )));
        }
        non_negative("cohesion_factor", self.cohesion_factor)?;
        non_negative("separation_factor", self.separation_factor)?;
        non_negative("alignment_factor", self.alignment_factor)?;
        non_negative("bounds.x", self.bounds.x)?;
        non_negative("bounds.y", self.bounds.y)?;
        non_negative("bounds.z", self.bounds.z)?;

        let cells = self.grid_cell_estimate();
        if cells > MAX_GRID_CELLS as f64 {
            return Err(FlockError::config(format!(
                "bounds {:?} at cell size {} need {cells} grid cells (max {MAX_GRID_CELLS})",
                self.bounds, self.cell_size
            )));
        }
        Ok(())
    }

    /// Returns a copy with `patch` applied. The receiver is left untouched so
    /// callers can validate before committing.
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        if let Some(value) = patch.cohesion_factor {
            next.cohesion_factor = value;
        }
        if let Some(value) = patch.separation_factor {
            next.separation_factor = value;
        }
        if let Some(value) = patch.alignment_factor {
            next.alignment_factor = value;
        }
        if let Some(value) = patch.use_grid {
            next.use_grid = value;
        }
        if let Some(value) = patch.debug_tag {
            next.debug_tag = value;
        }
        if let Some(value) = patch.dimensionality {
            next.dimensionality = value;
        }
        if let Some(value) = patch.bounds {
            next.bounds = value;
        }
        if let Some(value) = patch.max_speed {
            next.max_speed = value;
        }
        if let Some(value) = patch.visual_range {
            next.visual_range = value;
        }
        if let Some(value) = patch.min_distance {
            next.min_distance = value;
        }
        if let Some(value) = patch.cell_size {
            next.cell_size = value;
        }
        next
    }

    fn grid_cell_estimate(&self) -> f64 {
        let axis = |half_extent: f32| {
            (f64::from(half_extent) * 2.0 / f64::from(self.cell_size)).floor()
                + f64::from(2 * GRID_MARGIN_CELLS)
        };
        let depth = if self.dimensionality.is_3d() {
            axis(self.bounds.z)
        } else {
            1.0
        };
        axis(self.bounds.x) * axis(self.bounds.y) * depth
    }

    /// True when `other` needs a different grid layout.
    pub(crate) fn grid_layout_differs(&self, other: &Self) -> bool {
        self.bounds != other.bounds
            || self.cell_size != other.cell_size
            || self.dimensionality != other.dimensionality
    }
}

/// Tunables that can change between ticks without reseeding the flock.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub cohesion_factor: Option<f32>,
    pub separation_factor: Option<f32>,
    pub alignment_factor: Option<f32>,
    pub use_grid: Option<bool>,
    /// `Some(None)` clears the tag.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub debug_tag: Option<Option<u32>>,
    pub dimensionality: Option<Dimensionality>,
    pub bounds: Option<Bounds>,
    pub max_speed: Option<f32>,
    pub visual_range: Option<f32>,
    pub min_distance: Option<f32>,
    pub cell_size: Option<f32>,
}

// A present-but-null field must clear the tag, while an absent field leaves
// it alone.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<u32>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<u32>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<u32>::deserialize(deserializer).map(Some)
    }
}

fn positive(name: &str, value: f32) -> FlockResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FlockError::config(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f32) -> FlockResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FlockError::config(format!(
            "{name} must be non-negative, got {value}"
        )))
    }
}
