//! Boundary slices: the sub-blocks cut out next to an interblock window,
//! shipped to the partner block and written into its ghost halo.

use std::ops::Range;

use tracing::debug;

use crate::axis::{Direction, Ijk};
use crate::error::SolverError;
use crate::interblock::{CellMap, Interblock};
use crate::multi_array::MultiArray3d;
use crate::primvars::{PrimVars, VarArray};
use crate::proc_block::ProcBlock;
use crate::vector3d::{UnitVecMag, Vector3d};

fn range_len(ranges: &[Range<i32>; 3]) -> usize {
    ranges.iter().map(|r| r.len()).product()
}

fn face_ranges(ranges: &[Range<i32>; 3], dir: Direction) -> [Range<i32>; 3] {
    let mut out = ranges.clone();
    out[dir.index()].end += 1;
    out
}

fn check_len(maps: &[CellMap], len: usize, dims: Ijk) -> Result<(), SolverError> {
    let found = (dims.0 * dims.1 * dims.2) as usize;
    if maps.iter().any(|m| m.src.0 >= dims.0 || m.src.1 >= dims.1 || m.src.2 >= dims.2) || found != len {
        return Err(SolverError::SliceMismatch {
            expected: len,
            found,
        });
    }
    Ok(())
}

/// Geometry of the cells next to a window.
#[derive(Clone, Debug, PartialEq)]
pub struct GeomSlice {
    /// Physical cell counts of the block the slice was cut from.
    pub block_dims: Ijk,
    pub center: MultiArray3d<Vector3d>,
    pub vol: MultiArray3d<f64>,
    pub f_area: [MultiArray3d<UnitVecMag>; 3],
    pub f_center: [MultiArray3d<Vector3d>; 3],
    pub populated: MultiArray3d<bool>,
}

impl GeomSlice {
    pub fn dims(&self) -> Ijk {
        (self.vol.num_i(), self.vol.num_j(), self.vol.num_k())
    }
}

/// Cell-centered field next to a window, with the geometry flags telling
/// which of its cells hold meaningful values.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSlice<T> {
    pub block_dims: Ijk,
    pub values: MultiArray3d<T>,
    pub populated: MultiArray3d<bool>,
}

impl<T: Clone> StateSlice<T> {
    pub fn dims(&self) -> Ijk {
        (self.values.num_i(), self.values.num_j(), self.values.num_k())
    }

    /// Cut `ranges` out of `field` and the matching geometry flags.
    pub fn extract(
        field: &MultiArray3d<T>,
        populated: &MultiArray3d<bool>,
        block_dims: Ijk,
        ranges: &[Range<i32>; 3],
    ) -> Self {
        let [ri, rj, rk] = ranges.clone();
        Self {
            block_dims,
            values: field.slice(ri.clone(), rj.clone(), rk.clone()),
            populated: populated.slice(ri, rj, rk),
        }
    }

    /// Write the populated slice cells into `field` at the mapped locations.
    /// Returns the window edges left incomplete by unpopulated cells.
    pub fn insert_into(
        &self,
        field: &mut MultiArray3d<T>,
        maps: &[CellMap],
        expected: usize,
    ) -> Result<[bool; 4], SolverError> {
        check_len(maps, expected, self.dims())?;
        let mut dirty = [false; 4];
        for m in maps {
            if !self.populated[m.src] {
                if let Some(edge) = m.border {
                    dirty[edge] = true;
                }
                continue;
            }
            field[m.dest] = self.values[m.src].clone();
        }
        Ok(dirty)
    }
}

impl ProcBlock {
    /// Geometry of the cells in `ranges`, which may reach into the halo.
    pub fn geom_slice(&self, ranges: &[Range<i32>; 3]) -> GeomSlice {
        let [ri, rj, rk] = ranges.clone();
        let faces = |dir: Direction| face_ranges(ranges, dir);
        let f_area = Direction::all().map(|d| {
            let [fi, fj, fk] = faces(d);
            self.f_area[d.index()].slice(fi, fj, fk)
        });
        let f_center = Direction::all().map(|d| {
            let [fi, fj, fk] = faces(d);
            self.f_center[d.index()].slice(fi, fj, fk)
        });
        GeomSlice {
            block_dims: self.dims(),
            center: self.center.slice(ri.clone(), rj.clone(), rk.clone()),
            vol: self.vol.slice(ri.clone(), rj.clone(), rk.clone()),
            f_area,
            f_center,
            populated: self.populated.slice(ri, rj, rk),
        }
    }

    pub fn state_slice(&self, ranges: &[Range<i32>; 3]) -> StateSlice<PrimVars> {
        StateSlice::extract(&self.state, &self.populated, self.dims(), ranges)
    }

    /// Write a geometry slice cut from the partner of side `to` into this
    /// block's halo.
    ///
    /// Face data follows the direction map of the connection: a source
    /// direction whose destination runs backwards trades its lower and upper
    /// faces and flips their areas. Faces on this block's window plane are
    /// left alone. Returns the window edges that received unpopulated cells.
    pub fn put_geom_slice(
        &mut self,
        slice: &GeomSlice,
        conn: &Interblock,
        to: usize,
    ) -> Result<[bool; 4], SolverError> {
        let from = 1 - to;
        let expected = range_len(&conn.slice_ranges(from, slice.block_dims, self.num_ghosts));
        let maps = conn.cell_maps(to, slice.block_dims, self.dims(), self.num_ghosts);
        check_len(&maps, expected, slice.dims())?;

        let dir_map = conn.direction_map(to);
        let window = conn.sides[to].face;
        let window_dir = window.direction();
        let window_plane = window.face_index(self.num(window_dir));

        let mut dirty = [false; 4];
        for m in &maps {
            if !slice.populated[m.src] {
                if let Some(edge) = m.border {
                    dirty[edge] = true;
                }
                continue;
            }
            self.center[m.dest] = slice.center[m.src];
            self.vol[m.dest] = slice.vol[m.src];
            self.populated[m.dest] = true;
            self.edge_fallback[m.dest] = false;

            for src_dir in Direction::all() {
                let (dest_dir, reversed) = dir_map[src_dir.index()];
                let s = src_dir.index();
                let src_lo = m.src;
                let src_hi = src_dir.shift(m.src, 1);
                let (lo_area, hi_area, lo_center, hi_center) = if reversed {
                    (
                        -slice.f_area[s][src_hi],
                        -slice.f_area[s][src_lo],
                        slice.f_center[s][src_hi],
                        slice.f_center[s][src_lo],
                    )
                } else {
                    (
                        slice.f_area[s][src_lo],
                        slice.f_area[s][src_hi],
                        slice.f_center[s][src_lo],
                        slice.f_center[s][src_hi],
                    )
                };
                let d = dest_dir.index();
                let dest_lo = m.dest;
                let dest_hi = dest_dir.shift(m.dest, 1);
                for (face, area, center) in [(dest_lo, lo_area, lo_center), (dest_hi, hi_area, hi_center)] {
                    if dest_dir == window_dir && window_dir.component(face) == window_plane {
                        continue;
                    }
                    self.f_area[d][face] = area;
                    self.f_center[d][face] = center;
                }
            }
        }
        Ok(dirty)
    }

    /// Write a state slice cut from the partner of side `to` into this
    /// block's halo.
    pub fn put_state_slice(
        &mut self,
        slice: &StateSlice<PrimVars>,
        conn: &Interblock,
        to: usize,
    ) -> Result<[bool; 4], SolverError> {
        let from = 1 - to;
        let expected = range_len(&conn.slice_ranges(from, slice.block_dims, self.num_ghosts));
        let maps = conn.cell_maps(to, slice.block_dims, self.dims(), self.num_ghosts);
        slice.insert_into(&mut self.state, &maps, expected)
    }

    pub fn eddy_visc_slice(&self, ranges: &[Range<i32>; 3]) -> StateSlice<f64> {
        StateSlice::extract(&self.eddy_visc, &self.populated, self.dims(), ranges)
    }

    /// Write an eddy viscosity slice from the partner of side `to` into this
    /// block's halo.
    pub fn put_eddy_visc_slice(&mut self, slice: &StateSlice<f64>, conn: &Interblock, to: usize) -> Result<(), SolverError> {
        let from = 1 - to;
        let expected = range_len(&conn.slice_ranges(from, slice.block_dims, self.num_ghosts));
        let maps = conn.cell_maps(to, slice.block_dims, self.dims(), self.num_ghosts);
        slice.insert_into(&mut self.eddy_visc, &maps, expected).map(|_| ())
    }

    /// Cut the implicit correction next to side `side` of `conn`.
    pub fn update_slice(&self, du: &MultiArray3d<VarArray>, conn: &Interblock, side: usize) -> StateSlice<VarArray> {
        let ranges = conn.slice_ranges(side, self.dims(), self.num_ghosts);
        StateSlice::extract(du, &self.populated, self.dims(), &ranges)
    }

    /// Write a correction slice from the partner of side `to` into `du`.
    pub fn put_update_slice(
        &self,
        du: &mut MultiArray3d<VarArray>,
        slice: &StateSlice<VarArray>,
        conn: &Interblock,
        to: usize,
    ) -> Result<(), SolverError> {
        let from = 1 - to;
        let expected = range_len(&conn.slice_ranges(from, slice.block_dims, self.num_ghosts));
        let maps = conn.cell_maps(to, slice.block_dims, self.dims(), self.num_ghosts);
        slice.insert_into(du, &maps, expected).map(|_| ())
    }
}

pub(crate) fn merge_dirty(border: &mut [bool; 4], dirty: [bool; 4]) {
    for (b, d) in border.iter_mut().zip(dirty) {
        *b |= d;
    }
}

/// Exchange geometry across a connection whose sides both live in `blocks`
/// (indexed by local position). Edges that received unpopulated cells are
/// added to the connection's border flags.
pub fn swap_geom_slice(conn: &mut Interblock, blocks: &mut [ProcBlock]) -> Result<(), SolverError> {
    let (a, b) = (conn.sides[0].local, conn.sides[1].local);
    let g = blocks[a].num_ghosts();
    let slice_a = blocks[a].geom_slice(&conn.slice_ranges(0, blocks[a].dims(), g));
    let slice_b = blocks[b].geom_slice(&conn.slice_ranges(1, blocks[b].dims(), g));

    let dirty_b = blocks[b].put_geom_slice(&slice_a, conn, 1)?;
    let dirty_a = blocks[a].put_geom_slice(&slice_b, conn, 0)?;
    merge_dirty(&mut conn.sides[0].border, dirty_a);
    merge_dirty(&mut conn.sides[1].border, dirty_b);
    debug!(
        first = conn.sides[0].block,
        second = conn.sides[1].block,
        second_pass = conn.needs_second_pass(),
        "geometry swap"
    );
    Ok(())
}

/// Exchange states across a connection whose sides both live in `blocks`.
pub fn swap_state_slice(conn: &Interblock, blocks: &mut [ProcBlock]) -> Result<(), SolverError> {
    let (a, b) = (conn.sides[0].local, conn.sides[1].local);
    let g = blocks[a].num_ghosts();
    let slice_a = blocks[a].state_slice(&conn.slice_ranges(0, blocks[a].dims(), g));
    let slice_b = blocks[b].state_slice(&conn.slice_ranges(1, blocks[b].dims(), g));
    blocks[b].put_state_slice(&slice_a, conn, 1)?;
    blocks[a].put_state_slice(&slice_b, conn, 0)?;
    Ok(())
}

/// Exchange eddy viscosity across a connection whose sides both live in
/// `blocks`.
pub fn swap_eddy_visc_slice(conn: &Interblock, blocks: &mut [ProcBlock]) -> Result<(), SolverError> {
    let (a, b) = (conn.sides[0].local, conn.sides[1].local);
    let g = blocks[a].num_ghosts();
    let slice_a = blocks[a].eddy_visc_slice(&conn.slice_ranges(0, blocks[a].dims(), g));
    let slice_b = blocks[b].eddy_visc_slice(&conn.slice_ranges(1, blocks[b].dims(), g));
    blocks[b].put_eddy_visc_slice(&slice_a, conn, 1)?;
    blocks[a].put_eddy_visc_slice(&slice_b, conn, 0)?;
    Ok(())
}

/// Exchange implicit corrections across a connection whose sides both live
/// on this process. `du` is indexed like `blocks`.
pub fn swap_implicit_update(
    conn: &Interblock,
    blocks: &[ProcBlock],
    du: &mut [MultiArray3d<VarArray>],
) -> Result<(), SolverError> {
    let (a, b) = (conn.sides[0].local, conn.sides[1].local);
    let slice_a = blocks[a].update_slice(&du[a], conn, 0);
    let slice_b = blocks[b].update_slice(&du[b], conn, 1);
    blocks[b].put_update_slice(&mut du[b], &slice_a, conn, 1)?;
    blocks[a].put_update_slice(&mut du[a], &slice_b, conn, 0)?;
    Ok(())
}
