//! Boids flocking core.
//!
//! [`Flock`] owns the boid arrays and the [`NeighborGrid`] and advances them
//! one tick at a time. [`Sim`] wraps it for JS: a renderer calls `step(dt)`
//! once per frame and reads back flat position, velocity and orientation
//! buffers.

pub mod config;
pub mod error;
pub mod flock;
pub mod inspect;
pub mod math;
pub mod neighbor_grid;
pub mod state;
pub mod tick;

pub use config::{Bounds, ConfigPatch, Dimensionality, SimulationConfig};
pub use error::{FlockError, FlockResult};
pub use flock::Flock;
pub use inspect::BoidTag;
pub use neighbor_grid::NeighborGrid;
pub use state::BoidState;

use wasm_bindgen::prelude::*;

const FALLBACK_SEED: u64 = 0x5eed_b01d;

#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub struct Sim {
    flock: Flock,
    render_positions: Vec<f32>,
    render_velocities: Vec<f32>,
}

#[wasm_bindgen]
impl Sim {
    /// A 3D flock of `count` boids in a box sized for that count. Without a
    /// seed the initial scatter is drawn from OS entropy.
    #[wasm_bindgen(constructor)]
    pub fn new(count: u32, seed: Option<u32>) -> Result<Sim, JsValue> {
        let config = SimulationConfig::for_count(count, Dimensionality::ThreeD);
        Self::build(config, seed.map(u64::from)).map_err(to_js)
    }

    /// Builds from a camelCase config object; missing fields take defaults.
    pub fn from_config(config: JsValue, seed: Option<u32>) -> Result<Sim, JsValue> {
        let config: SimulationConfig = from_js(config)?;
        Self::build(config, seed.map(u64::from)).map_err(to_js)
    }

    pub fn step(&mut self, dt: f32) -> Result<(), JsValue> {
        self.flock.step(dt).map_err(to_js)?;
        self.sync_render_buffers();
        Ok(())
    }

    /// Reseeds the flock with `count` boids and resizes the box to match.
    pub fn resize(&mut self, count: u32) -> Result<(), JsValue> {
        let config = self.flock.config();
        let bounds = Bounds::for_flock(count, config.dimensionality);
        let mut next = config.clone();
        next.count = count;
        next.bounds = bounds;
        next.validate().map_err(to_js)?;

        self.flock
            .update_config(&ConfigPatch {
                bounds: Some(bounds),
                ..Default::default()
            })
            .map_err(to_js)?;
        self.flock.resize(count).map_err(to_js)?;
        self.sync_render_buffers();
        Ok(())
    }

    /// Applies a camelCase patch object, e.g. `{ useGrid: false }`.
    pub fn update_config(&mut self, patch: JsValue) -> Result<(), JsValue> {
        let patch: ConfigPatch = from_js(patch)?;
        self.flock.update_config(&patch).map_err(to_js)
    }

    pub fn set_factors(
        &mut self,
        cohesion: f32,
        separation: f32,
        alignment: f32,
    ) -> Result<(), JsValue> {
        self.patch(ConfigPatch {
            cohesion_factor: Some(cohesion),
            separation_factor: Some(separation),
            alignment_factor: Some(alignment),
            ..Default::default()
        })
    }

    pub fn set_use_grid(&mut self, use_grid: bool) -> Result<(), JsValue> {
        self.patch(ConfigPatch {
            use_grid: Some(use_grid),
            ..Default::default()
        })
    }

    pub fn set_debug_tag(&mut self, tag: Option<u32>) -> Result<(), JsValue> {
        self.patch(ConfigPatch {
            debug_tag: Some(tag),
            ..Default::default()
        })
    }

    /// Switches between 2 and 3 dimensions and refits the box. Boids keep
    /// their state; a flattened flock drops onto the plane on the next tick.
    /// Any other value is rejected.
    pub fn set_dimensions(&mut self, dimensions: u32) -> Result<(), JsValue> {
        let dimensionality = Dimensionality::try_from(dimensions).map_err(to_js)?;
        let bounds = Bounds::for_flock(self.flock.config().count, dimensionality);
        self.patch(ConfigPatch {
            dimensionality: Some(dimensionality),
            bounds: Some(bounds),
            ..Default::default()
        })
    }

    pub fn count(&self) -> usize {
        self.flock.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.flock.tick_count()
    }

    /// Copy of the config as a camelCase object.
    pub fn config(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.flock.config())
            .map_err(|e| to_js(FlockError::Js(e.to_string())))
    }

    /// `[x0, y0, z0, x1, ...]`
    pub fn positions(&self) -> Vec<f32> {
        self.render_positions.clone()
    }

    pub fn velocities(&self) -> Vec<f32> {
        self.render_velocities.clone()
    }

    /// Zero-copy view for `new Float32Array(memory.buffer, ptr, 3 * count)`.
    /// Invalidated by `resize`.
    pub fn positions_ptr(&self) -> *const f32 {
        self.render_positions.as_ptr()
    }

    pub fn velocities_ptr(&self) -> *const f32 {
        self.render_velocities.as_ptr()
    }

    /// Heading quaternions `[x, y, z, w]` rotating +Y onto each velocity.
    pub fn orientations(&self) -> Vec<f32> {
        self.flock
            .orientations()
            .iter()
            .flat_map(|q| q.to_array())
            .collect()
    }

    pub fn classify(&self, index: usize) -> Result<u8, JsValue> {
        self.flock
            .classify(index)
            .map(BoidTag::as_u8)
            .map_err(to_js)
    }

    pub fn debug_tags(&self) -> Vec<u8> {
        self.flock
            .debug_tags()
            .into_iter()
            .map(BoidTag::as_u8)
            .collect()
    }

    pub fn neighbors_of(&self, index: usize) -> Result<Vec<u32>, JsValue> {
        self.flock
            .neighbors_of(index)
            .map(|neighbors| neighbors.into_iter().map(|j| j as u32).collect())
            .map_err(to_js)
    }
}

impl Sim {
    pub fn flock(&self) -> &Flock {
        &self.flock
    }

    fn build(config: SimulationConfig, seed: Option<u64>) -> FlockResult<Sim> {
        let flock = Flock::new(config, seed.unwrap_or_else(entropy_seed))?;
        let mut sim = Sim {
            flock,
            render_positions: Vec::new(),
            render_velocities: Vec::new(),
        };
        sim.sync_render_buffers();
        Ok(sim)
    }

    fn patch(&mut self, patch: ConfigPatch) -> Result<(), JsValue> {
        self.flock.update_config(&patch).map_err(to_js)
    }

    fn sync_render_buffers(&mut self) {
        flatten_into(&mut self.render_positions, self.flock.positions());
        flatten_into(&mut self.render_velocities, self.flock.velocities());
    }
}

fn flatten_into(buffer: &mut Vec<f32>, vectors: &[glam::Vec3]) {
    buffer.clear();
    buffer.reserve(vectors.len() * 3);
    for vector in vectors {
        buffer.extend_from_slice(&vector.to_array());
    }
}

fn entropy_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(error) => {
            log::warn!("no entropy source ({error}); using fixed seed");
            FALLBACK_SEED
        }
    }
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| to_js(FlockError::Js(e.to_string())))
}

fn to_js(error: FlockError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_buffers_track_the_flock() {
        let mut sim = Sim::new(50, Some(3)).unwrap();
        assert_eq!(sim.positions().len(), 150);
        assert_eq!(sim.velocities().len(), 150);

        sim.step(0.016).unwrap();
        let first = sim.flock().positions()[0];
        assert_eq!(&sim.positions()[..3], &first.to_array());
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn resize_refits_bounds() {
        let mut sim = Sim::new(32, Some(3)).unwrap();
        sim.resize(4096).unwrap();

        assert_eq!(sim.count(), 4096);
        assert_eq!(sim.positions().len(), 4096 * 3);
        assert_eq!(
            sim.flock().config().bounds,
            Bounds::for_flock(4096, Dimensionality::ThreeD)
        );
    }

    #[test]
    fn switching_to_2d_flattens_on_next_tick() {
        let mut sim = Sim::new(64, Some(8)).unwrap();
        sim.set_dimensions(2).unwrap();
        sim.step(0.016).unwrap();

        assert!(sim.positions().chunks(3).all(|p| p[2] == 0.0));
        assert_eq!(sim.flock().config().dimensionality, Dimensionality::TwoD);
    }

    #[test]
    fn setters_leave_boids_in_place() {
        let mut sim = Sim::new(40, Some(1)).unwrap();
        let before = sim.positions();

        sim.set_use_grid(false).unwrap();
        sim.set_factors(0.5, 10.0, 2.0).unwrap();
        sim.set_debug_tag(Some(0)).unwrap();

        assert_eq!(sim.positions(), before);
        assert_eq!(sim.classify(0).unwrap(), BoidTag::Focus.as_u8());
        assert_eq!(sim.debug_tags().len(), 40);
        assert_eq!(sim.orientations().len(), 160);
    }
}
