//! Uniform grid over atom coordinates for fixed-radius neighbor queries.
//!
//! Atoms are binned into cubic cells with intrusive linked lists (`head`/`next`), so
//! construction is linear and a query only visits the cells overlapping its search sphere.

use itertools::iproduct;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const SENTINEL: u32 = u32::MAX;
const MIN_CELL_SIZE: f64 = 0.5;
const MAX_CELLS: usize = 1 << 22;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    origin: Point3<f64>,
    dims: [usize; 3],
    head: Vec<u32>,
    next: Vec<u32>,
    positions: Vec<Point3<f64>>,
}

impl SpatialIndex {
    /// Builds the grid over `positions`; atom `i` of every query result refers to
    /// `positions[i]`. Cell sizes below half an Angstrom are raised to that floor.
    pub fn build(positions: &[Point3<f64>], cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            MIN_CELL_SIZE
        };
        if positions.is_empty() {
            return Self {
                cell_size,
                origin: Point3::origin(),
                dims: [0; 3],
                head: Vec::new(),
                next: Vec::new(),
                positions: Vec::new(),
            };
        }

        let mut min = positions[0];
        let mut max = positions[0];
        for p in positions {
            min = min.inf(p);
            max = max.sup(p);
        }
        let extent = max - min;
        let mut cell_size = cell_size;
        let mut dims = Self::dims_for(&extent, cell_size);
        while dims.iter().fold(1usize, |total, &d| total.saturating_mul(d)) > MAX_CELLS {
            cell_size *= 2.0;
            dims = Self::dims_for(&extent, cell_size);
        }

        let mut index = Self {
            cell_size,
            origin: min,
            dims,
            head: vec![SENTINEL; dims[0] * dims[1] * dims[2]],
            next: vec![SENTINEL; positions.len()],
            positions: positions.to_vec(),
        };
        for (i, p) in positions.iter().enumerate() {
            let (x, y, z) = index.grid_coords(p);
            let cell = index.cell_index(x, y, z);
            index.next[i] = index.head[cell];
            index.head[cell] = i as u32;
        }
        index
    }

    /// Cells per axis, capped at `MAX_CELLS + 1` so far-flung coordinates cannot overflow.
    fn dims_for(extent: &Vector3<f64>, cell_size: f64) -> [usize; 3] {
        let cells = |span: f64| {
            let count = (span / cell_size).floor();
            if count.is_finite() && count > 0.0 {
                count.min(MAX_CELLS as f64) as usize + 1
            } else {
                1
            }
        };
        [cells(extent.x), cells(extent.y), cells(extent.z)]
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, atom: usize) -> &Point3<f64> {
        &self.positions[atom]
    }

    #[inline]
    fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.dims[0] + z * self.dims[0] * self.dims[1]
    }

    fn grid_coords(&self, pos: &Point3<f64>) -> (usize, usize, usize) {
        let offset = pos - self.origin;
        let clamp = |v: f64, dim: usize| -> usize {
            let cell = (v / self.cell_size).floor();
            if cell.is_nan() || cell < 0.0 {
                0
            } else {
                (cell as usize).min(dim - 1)
            }
        };
        (
            clamp(offset.x, self.dims[0]),
            clamp(offset.y, self.dims[1]),
            clamp(offset.z, self.dims[2]),
        )
    }

    fn cell_atoms(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let mut current = self.head[cell];
        std::iter::from_fn(move || {
            if current == SENTINEL {
                return None;
            }
            let atom = current as usize;
            current = self.next[atom];
            Some(atom)
        })
    }

    /// Lazily yields `(atom, distance)` for every atom within `radius` of `point`.
    pub fn query_within(
        &self,
        point: &Point3<f64>,
        radius: f64,
    ) -> impl Iterator<Item = (usize, f64)> + '_ {
        let radius = radius.max(0.0);
        let point = *point;
        let cells: Box<dyn Iterator<Item = usize> + '_> = if self.is_empty() {
            Box::new(std::iter::empty())
        } else {
            let r = Vector3::repeat(radius);
            let (x0, y0, z0) = self.grid_coords(&(point - r));
            let (x1, y1, z1) = self.grid_coords(&(point + r));
            Box::new(iproduct!(z0..=z1, y0..=y1, x0..=x1).map(move |(z, y, x)| self.cell_index(x, y, z)))
        };
        let radius_sq = radius * radius;
        cells
            .flat_map(move |cell| self.cell_atoms(cell))
            .filter_map(move |atom| {
                let d_sq = (self.positions[atom] - point).norm_squared();
                (d_sq <= radius_sq).then(|| (atom, d_sq.sqrt()))
            })
    }

    /// Atoms within `radius` of atom `atom`, excluding itself.
    pub fn neighbors_of(&self, atom: usize, radius: f64) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.query_within(&self.positions[atom], radius)
            .filter(move |&(other, _)| other != atom)
    }

    /// Every unordered pair `(i, j, distance)` with `i < j` and distance within `radius`,
    /// sorted by `(i, j)`.
    pub fn pairs_within(&self, radius: f64) -> Vec<(usize, usize, f64)> {
        let pairs_from = |i: usize| -> Vec<(usize, usize, f64)> {
            self.neighbors_of(i, radius)
                .filter(|&(j, _)| j > i)
                .map(|(j, d)| (i, j, d))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let atoms = 0..self.len();

        #[cfg(feature = "parallel")]
        let atoms = (0..self.len()).into_par_iter();

        let mut pairs: Vec<(usize, usize, f64)> = atoms.map(pairs_from).flatten().collect();
        pairs.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        pairs
    }
}
