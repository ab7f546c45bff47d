//! The dense three-dimensional [`Field`] and its geometric envelope.

use crate::error::FieldError;

/// A single cell's quantity, in application-defined units (e.g. centigrams,
/// microkelvin). Zero means absence; the full range is live, no sentinels.
pub type Cell = u32;

/// The geometric envelope of a [`Field`]: signed 16-bit extents and the
/// row-major index arithmetic shared by every crate that walks the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    /// Size along X, in `[1, 32767]`.
    pub width: i16,
    /// Size along Y, in `[1, 32767]`.
    pub height: i16,
    /// Size along Z, in `[1, 32767]`.
    pub depth: i16,
}

impl Extent {
    /// Total number of cells, as an unsigned 64-bit quantity so that
    /// `width * height * depth` cannot overflow even at the maximum
    /// extents permitted by [`Field::create`].
    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    /// Whether `(x, y, z)` lies within `[0, width) x [0, height) x [0, depth)`.
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && x < self.width as i32
            && y < self.height as i32
            && z < self.depth as i32
    }

    /// Row-major linear index `(z * height + y) * width + x`, or `None` if
    /// the coordinate is out of bounds.
    pub fn linear_index(&self, x: i32, y: i32, z: i32) -> Option<u64> {
        if !self.contains(x, y, z) {
            return None;
        }
        let (x, y, z) = (x as u64, y as u64, z as u64);
        Some((z * self.height as u64 + y) * self.width as u64 + x)
    }
}

/// A dense three-dimensional array of cells with a diffusion-rate shift and
/// a monotone generation counter.
///
/// The cell array has length `extent.cell_count()` and is laid out
/// row-major: `index = (z * height + y) * width + x`.
#[derive(Clone, Debug)]
pub struct Field {
    extent: Extent,
    diffusion_rate: u8,
    generation: u64,
    cells: Vec<Cell>,
}

impl Field {
    /// Allocate a field of the given extents, zeroed, with generation 0.
    ///
    /// Fails with [`FieldError::InvalidExtents`] if any extent is `<= 0`,
    /// or [`FieldError::InvalidRate`] if `diffusion_rate > 31`.
    pub fn create(
        width: i16,
        height: i16,
        depth: i16,
        diffusion_rate: u8,
    ) -> Result<Self, FieldError> {
        if width <= 0 || height <= 0 || depth <= 0 {
            return Err(FieldError::InvalidExtents);
        }
        if diffusion_rate > 31 {
            return Err(FieldError::InvalidRate);
        }
        let extent = Extent {
            width,
            height,
            depth,
        };
        Ok(Self {
            extent,
            diffusion_rate,
            generation: 0,
            cells: vec![0; extent.cell_count() as usize],
        })
    }

    /// The field's geometric envelope.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// The diffusion-rate shift (divisor is `1 << diffusion_rate`).
    pub fn diffusion_rate(&self) -> u8 {
        self.diffusion_rate
    }

    /// The current generation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read-only view of the backing cell array, in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Write one cell. Silently ignores out-of-bounds coordinates — this is
    /// deliberately permissive for host scripting; callers requiring strict
    /// bounds checking wrap this externally.
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: Cell) {
        if let Some(idx) = self.extent.linear_index(x, y, z) {
            self.cells[idx as usize] = value;
        }
    }

    /// Read one cell. Returns 0 for out-of-bounds coordinates.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Cell {
        self.extent
            .linear_index(x, y, z)
            .map(|idx| self.cells[idx as usize])
            .unwrap_or(0)
    }

    /// Bulk-set a half-open rectangular region `[min, max)` from `in_buf`,
    /// which must be laid out row-major over the region's own shape.
    ///
    /// Returns the number of cells written, or 0 if the region is out of
    /// bounds, inverted, or `in_buf` is shorter than the region's volume.
    pub fn import_region(
        &mut self,
        in_buf: &[Cell],
        min: (i16, i16, i16),
        max: (i16, i16, i16),
    ) -> usize {
        let Some(region) = RegionWalk::new(self.extent, min, max) else {
            return 0;
        };
        if in_buf.len() < region.volume() {
            return 0;
        }
        for (src_idx, (x, y, z)) in region.iter().enumerate() {
            let dst_idx = self.extent.linear_index(x, y, z).expect("in region bounds");
            self.cells[dst_idx as usize] = in_buf[src_idx];
        }
        region.volume()
    }

    /// Bulk-read a half-open rectangular region `[min, max)` into `out_buf`,
    /// laid out row-major over the region's own shape.
    ///
    /// Returns the number of cells written, or 0 if the region is out of
    /// bounds, inverted, or `out_buf` is shorter than the region's volume.
    pub fn extract_region(
        &self,
        out_buf: &mut [Cell],
        min: (i16, i16, i16),
        max: (i16, i16, i16),
    ) -> usize {
        let Some(region) = RegionWalk::new(self.extent, min, max) else {
            return 0;
        };
        if out_buf.len() < region.volume() {
            return 0;
        }
        for (dst_idx, (x, y, z)) in region.iter().enumerate() {
            let src_idx = self.extent.linear_index(x, y, z).expect("in region bounds");
            out_buf[dst_idx] = self.cells[src_idx as usize];
        }
        region.volume()
    }

    /// Sum of all cells as a 64-bit quantity. Used for conservation checks
    /// and as a diagnostic checksum.
    pub fn total_mass(&self) -> u64 {
        self.cells.iter().map(|&c| c as u64).sum()
    }

    /// Replace the cell array and advance the generation counter by one.
    ///
    /// Used by the step controller to commit a completed generation; `cells`
    /// must have the same length as `self.cells()`.
    pub fn commit(&mut self, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.cells.len());
        self.cells = cells;
        self.generation += 1;
    }
}

/// A validated, iterable half-open rectangular region `[min, max)`.
struct RegionWalk {
    min: (i16, i16, i16),
    max: (i16, i16, i16),
}

impl RegionWalk {
    fn new(extent: Extent, min: (i16, i16, i16), max: (i16, i16, i16)) -> Option<Self> {
        if min.0 >= max.0 || min.1 >= max.1 || min.2 >= max.2 {
            return None;
        }
        if min.0 < 0 || min.1 < 0 || min.2 < 0 {
            return None;
        }
        if max.0 as i32 > extent.width as i32
            || max.1 as i32 > extent.height as i32
            || max.2 as i32 > extent.depth as i32
        {
            return None;
        }
        Some(Self { min, max })
    }

    fn volume(&self) -> usize {
        (self.max.0 - self.min.0) as usize
            * (self.max.1 - self.min.1) as usize
            * (self.max.2 - self.min.2) as usize
    }

    fn iter(&self) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
        let (x0, y0, z0) = (self.min.0 as i32, self.min.1 as i32, self.min.2 as i32);
        let (x1, y1, z1) = (self.max.0 as i32, self.max.1 as i32, self.max.2 as i32);
        (z0..z1).flat_map(move |z| (y0..y1).flat_map(move |y| (x0..x1).map(move |x| (x, y, z))))
    }
}
