use glam::{IVec3, UVec3, Vec3};

use crate::config::{Bounds, Dimensionality, SimulationConfig};

/// Spare cells on each side of the bounded region. Boids overshoot the bounds
/// for a few ticks before containment turns them around.
pub const GRID_MARGIN_CELLS: u32 = 10;

#[derive(Clone, Copy, Debug, Default)]
struct CellSlot {
    cell: u32,
    rank: u32,
}

/// Uniform grid bucketing boids by cell with a counting sort.
///
/// After [`rebuild`](Self::rebuild), the boids of cell `c` occupy the
/// contiguous range `[offsets[c] - counts[c], offsets[c])` of `sorted`.
#[derive(Clone, Debug)]
pub struct NeighborGrid {
    cell_size: f32,
    dims: UVec3,
    half_dims: Vec3,
    flat: bool,
    counts: Vec<u32>,
    offsets: Vec<u32>,
    sorted: Vec<u32>,
    slots: Vec<CellSlot>,
}

impl NeighborGrid {
    pub fn new(bounds: Bounds, cell_size: f32, dimensionality: Dimensionality) -> Self {
        let flat = !dimensionality.is_3d();
        let axis_cells = |half_extent: f32| {
            ((half_extent * 2.0) / cell_size).floor() as u32 + 2 * GRID_MARGIN_CELLS
        };
        let dims = UVec3::new(
            axis_cells(bounds.x),
            axis_cells(bounds.y),
            if flat { 1 } else { axis_cells(bounds.z) },
        );
        let total = (dims.x * dims.y * dims.z) as usize;

        log::debug!("neighbor grid laid out as {dims} ({total} cells of {cell_size})");

        Self {
            cell_size,
            dims,
            half_dims: dims.as_vec3() / 2.0,
            flat,
            counts: vec![0; total],
            offsets: vec![0; total],
            sorted: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn for_config(config: &SimulationConfig) -> Self {
        Self::new(config.bounds, config.cell_size, config.dimensionality)
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn total_cells(&self) -> usize {
        self.counts.len()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of boids bucketed by the last rebuild.
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Unclamped cell coordinates of `position`. A flat grid has a single
    /// depth layer, so depth is ignored there.
    pub fn cell_coords(&self, position: Vec3) -> IVec3 {
        let mut cell = (position / self.cell_size + self.half_dims)
            .floor()
            .as_ivec3();
        if self.flat {
            cell.z = 0;
        }
        cell
    }

    pub fn contains_cell(&self, cell: IVec3) -> bool {
        cell.cmpge(IVec3::ZERO).all() && cell.cmplt(self.dims.as_ivec3()).all()
    }

    pub fn cell_id(&self, cell: IVec3) -> usize {
        let cell = cell.as_uvec3();
        (self.dims.y * self.dims.x * cell.z + self.dims.x * cell.y + cell.x) as usize
    }

    /// Cell of `position`, clamped into the grid.
    ///
    /// Landing outside the grid means the margin is too small for the current
    /// speed and bounds. Debug builds treat that as a bug; release builds
    /// clamp so the boid still lands in a real cell.
    pub fn cell_of(&self, position: Vec3) -> IVec3 {
        let cell = self.cell_coords(position);
        debug_assert!(
            self.contains_cell(cell),
            "position {position} maps to cell {cell} outside grid {}",
            self.dims
        );
        if self.contains_cell(cell) {
            return cell;
        }

        log::warn!(
            "position {position} left the grid margin; clamping cell {cell} into {}",
            self.dims
        );
        cell.clamp(IVec3::ZERO, self.dims.as_ivec3() - IVec3::ONE)
    }

    /// Buckets every position from scratch. Nothing survives from the
    /// previous rebuild except allocations.
    pub fn rebuild(&mut self, positions: &[Vec3]) {
        self.counts.fill(0);
        self.slots.clear();
        self.slots.reserve(positions.len());

        for &position in positions {
            let cell = self.cell_id(self.cell_of(position));
            let rank = self.counts[cell];
            self.slots.push(CellSlot {
                cell: cell as u32,
                rank,
            });
            self.counts[cell] += 1;
        }

        let mut running = 0;
        for (offset, &count) in self.offsets.iter_mut().zip(&self.counts) {
            running += count;
            *offset = running;
        }

        self.sorted.clear();
        self.sorted.resize(positions.len(), 0);
        for (boid, slot) in self.slots.iter().enumerate() {
            let index = self.offsets[slot.cell as usize] - 1 - slot.rank;
            self.sorted[index as usize] = boid as u32;
        }
    }

    /// Boids in the cell with flattened id `cell_id`.
    pub fn cell_members(&self, cell_id: usize) -> &[u32] {
        let end = self.offsets[cell_id] as usize;
        let start = end - self.counts[cell_id] as usize;
        &self.sorted[start..end]
    }

    /// Calls `callback` with every boid in the 3x3x3 block around `cell`
    /// (3x3x1 on a flat grid). Cells past the grid edge are skipped.
    ///
    /// The caller still has to filter by distance.
    pub fn for_each_candidate<F>(&self, cell: IVec3, mut callback: F)
    where
        F: FnMut(usize),
    {
        let depth = if self.flat { 0..=0 } else { -1..=1 };
        for dz in depth {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let neighbor = cell + IVec3::new(dx, dy, dz);
                    if !self.contains_cell(neighbor) {
                        continue;
                    }
                    for &boid in self.cell_members(self.cell_id(neighbor)) {
                        callback(boid as usize);
                    }
                }
            }
        }
    }
}
