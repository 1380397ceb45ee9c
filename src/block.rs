//! Node-coordinate grid block, the raw geometry a [`ProcBlock`](crate::ProcBlock)
//! is built from.

use crate::error::SolverError;
use crate::vector3d::Vector3d;

/// Structured block of grid nodes. A block with `imax x jmax x kmax` nodes
/// holds `(imax-1) x (jmax-1) x (kmax-1)` cells.
#[derive(Clone, Debug)]
pub struct Block {
    pub imax: usize,
    pub jmax: usize,
    pub kmax: usize,
    nodes: Vec<Vector3d>, // i fastest, then j, then k
}

impl Block {
    pub fn new(imax: usize, jmax: usize, kmax: usize, nodes: Vec<Vector3d>) -> Result<Self, SolverError> {
        if imax < 2 || jmax < 2 || kmax < 2 {
            return Err(SolverError::InvalidGrid(format!(
                "{imax} x {jmax} x {kmax} nodes leaves a direction without cells"
            )));
        }
        if nodes.len() != imax * jmax * kmax {
            return Err(SolverError::InvalidGrid(format!(
                "{} nodes given for a {imax} x {jmax} x {kmax} block",
                nodes.len()
            )));
        }
        Ok(Self {
            imax,
            jmax,
            kmax,
            nodes,
        })
    }

    /// Build a block by evaluating `f(i, j, k)` at every node.
    pub fn from_fn<F>(imax: usize, jmax: usize, kmax: usize, f: F) -> Result<Self, SolverError>
    where
        F: Fn(usize, usize, usize) -> Vector3d,
    {
        let mut nodes = Vec::with_capacity(imax * jmax * kmax);
        for k in 0..kmax {
            for j in 0..jmax {
                for i in 0..imax {
                    nodes.push(f(i, j, k));
                }
            }
        }
        Self::new(imax, jmax, kmax, nodes)
    }

    /// Uniform Cartesian block of `ni x nj x nk` cells starting at `origin`.
    pub fn cartesian(
        ni: usize,
        nj: usize,
        nk: usize,
        origin: [f64; 3],
        spacing: [f64; 3],
    ) -> Result<Self, SolverError> {
        Self::from_fn(ni + 1, nj + 1, nk + 1, |i, j, k| {
            Vector3d::new(
                origin[0] + i as f64 * spacing[0],
                origin[1] + j as f64 * spacing[1],
                origin[2] + k as f64 * spacing[2],
            )
        })
    }

    /// Cell counts `(ni, nj, nk)`.
    #[inline]
    pub fn num_cells(&self) -> (usize, usize, usize) {
        (self.imax - 1, self.jmax - 1, self.kmax - 1)
    }

    #[inline]
    fn idx(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.imax && j < self.jmax && k < self.kmax);
        (k * self.jmax + j) * self.imax + i
    }

    #[inline]
    pub fn node(&self, i: usize, j: usize, k: usize) -> Vector3d {
        self.nodes[self.idx(i, j, k)]
    }
}
