//! Interblock connections: which two boundary windows touch, how their
//! tangential axes are oriented against each other, and how a cell of one
//! side's slice lands in the other side's ghost halo.
//!
//! Orientation codes follow `(swap, reverse first, reverse second)` applied
//! to the first side's window coordinates to reach the second side's:
//!
//! | code | swap | rev 1 | rev 2 |
//! |------|------|-------|-------|
//! | 1    |      |       |       |
//! | 2    | x    |       |       |
//! | 3    |      | x     |       |
//! | 4    | x    | x     |       |
//! | 5    | x    |       | x     |
//! | 6    |      |       | x     |
//! | 7    | x    | x     | x     |
//! | 8    |      | x     | x     |

use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::axis::{BoundaryFace, Direction, Ijk};
use crate::boundary_conditions::BoundarySurface;
use crate::error::SolverError;
use crate::proc_block::ProcBlock;
use crate::vector3d::Vector3d;

const MATCH_TOL: f64 = 1.0e-6;

/// Relative orientation of two connected windows.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Orientation {
    code: i32,
}

const PARTS: [(bool, bool, bool); 8] = [
    (false, false, false),
    (true, false, false),
    (false, true, false),
    (true, true, false),
    (true, false, true),
    (false, false, true),
    (true, true, true),
    (false, true, true),
];

impl Orientation {
    pub fn new(code: i32) -> Result<Self, SolverError> {
        if (1..=8).contains(&code) {
            Ok(Self { code })
        } else {
            Err(SolverError::UnknownOption {
                option: "orientation",
                value: code.to_string(),
            })
        }
    }

    pub fn identity() -> Self {
        Self { code: 1 }
    }

    pub fn all() -> [Self; 8] {
        let mut out = [Self::identity(); 8];
        for (n, o) in out.iter_mut().enumerate() {
            o.code = n as i32 + 1;
        }
        out
    }

    pub fn from_parts(swap: bool, reverse1: bool, reverse2: bool) -> Self {
        let pos = PARTS
            .iter()
            .position(|p| *p == (swap, reverse1, reverse2))
            .unwrap_or(0);
        Self {
            code: pos as i32 + 1,
        }
    }

    pub fn code(self) -> i32 {
        self.code
    }

    /// `(swap, reverse first, reverse second)`.
    pub fn parts(self) -> (bool, bool, bool) {
        PARTS[(self.code - 1) as usize]
    }

    pub fn is_swapped(self) -> bool {
        self.parts().0
    }

    /// Orientation taking the second side back to the first.
    pub fn inverse(self) -> Self {
        let (swap, r1, r2) = self.parts();
        if swap {
            Self::from_parts(swap, r2, r1)
        } else {
            self
        }
    }

    /// Map window coordinates `(l1, l2)` to the other side, whose window is
    /// `len1 x len2` cells. Coordinates outside the window map linearly.
    pub fn map(self, l1: i32, l2: i32, len1: i32, len2: i32) -> (i32, i32) {
        let (swap, r1, r2) = self.parts();
        let (a, b) = if swap { (l2, l1) } else { (l1, l2) };
        let m1 = if r1 { len1 - 1 - a } else { a };
        let m2 = if r2 { len2 - 1 - b } else { b };
        (m1, m2)
    }
}

/// One side of a connection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectionSide {
    /// Global position of the block.
    pub block: usize,
    pub rank: usize,
    /// Position of the block in its rank's local list.
    pub local: usize,
    pub face: BoundaryFace,
    /// Cell range along the face's first tangential direction.
    pub range1: (i32, i32),
    /// Cell range along the face's second tangential direction.
    pub range2: (i32, i32),
    pub tag: i32,
    /// Window edges (lower 1, upper 1, lower 2, upper 2) whose halo cells
    /// depend on another exchange and need a second pass.
    pub border: [bool; 4],
}

impl ConnectionSide {
    pub fn from_surface(block: &ProcBlock, surf: &BoundarySurface) -> Self {
        let (t1, t2) = surf.face.direction().tangents();
        Self {
            block: block.global_pos(),
            rank: block.rank(),
            local: block.local_pos(),
            face: surf.face,
            range1: surf.range(t1),
            range2: surf.range(t2),
            tag: surf.tag,
            border: [false; 4],
        }
    }

    pub fn len1(&self) -> i32 {
        self.range1.1 - self.range1.0
    }

    pub fn len2(&self) -> i32 {
        self.range2.1 - self.range2.0
    }
}

/// Where one slice cell goes in the destination block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellMap {
    /// Index inside the slice.
    pub src: Ijk,
    /// Index in the destination block.
    pub dest: Ijk,
    /// Destination window edge the cell lies beyond, if any.
    pub border: Option<usize>,
}

/// Pair of matching interblock windows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Interblock {
    pub sides: [ConnectionSide; 2],
    pub orientation: Orientation,
}

impl Interblock {
    pub fn new(first: ConnectionSide, second: ConnectionSide, orientation: Orientation) -> Self {
        Self {
            sides: [first, second],
            orientation,
        }
    }

    pub fn first(&self) -> &ConnectionSide {
        &self.sides[0]
    }

    pub fn second(&self) -> &ConnectionSide {
        &self.sides[1]
    }

    /// Both sides live on `rank`.
    pub fn is_local_to(&self, rank: usize) -> bool {
        self.sides[0].rank == rank && self.sides[1].rank == rank
    }

    /// Side living on `rank` when only one of them does.
    pub fn side_on(&self, rank: usize) -> Result<usize, SolverError> {
        if self.sides[0].rank == rank {
            Ok(0)
        } else if self.sides[1].rank == rank {
            Ok(1)
        } else {
            Err(SolverError::RankMismatch {
                rank,
                first: self.sides[0].rank,
                second: self.sides[1].rank,
            })
        }
    }

    /// Any window edge requires a second exchange pass.
    pub fn needs_second_pass(&self) -> bool {
        self.sides.iter().any(|s| s.border.iter().any(|b| *b))
    }

    /// Orientation from side `from` to the other side.
    fn orientation_from(&self, from: usize) -> Orientation {
        if from == 0 {
            self.orientation
        } else {
            self.orientation.inverse()
        }
    }

    /// Map window coordinates of side `from` to the other side's window.
    pub fn swap_loc(&self, from: usize, l1: i32, l2: i32) -> (i32, i32) {
        let to = &self.sides[1 - from];
        self.orientation_from(from).map(l1, l2, to.len1(), to.len2())
    }

    /// Block-index ranges of the slice extracted on side `side`: `num_ghosts`
    /// physical layers next to the face, widened by `num_ghosts` along both
    /// tangents.
    pub fn slice_ranges(&self, side: usize, dims: Ijk, num_ghosts: i32) -> [Range<i32>; 3] {
        let s = &self.sides[side];
        let normal = s.face.direction();
        let (t1, t2) = normal.tangents();
        let n = normal.component(dims);
        let layers = num_ghosts.min(n);
        let normal_range = if s.face.is_upper() {
            n - layers..n
        } else {
            0..layers
        };
        let mut ranges = [0..0, 0..0, 0..0];
        ranges[normal.index()] = normal_range;
        ranges[t1.index()] = s.range1.0 - num_ghosts..s.range1.1 + num_ghosts;
        ranges[t2.index()] = s.range2.0 - num_ghosts..s.range2.1 + num_ghosts;
        ranges
    }

    /// Destination direction and reversal of each source direction when a
    /// slice of the other side is inserted into side `to`, indexed by the
    /// source direction.
    pub fn direction_map(&self, to: usize) -> [(Direction, bool); 3] {
        let from = 1 - to;
        let src = &self.sides[from];
        let dest = &self.sides[to];
        let (s_n, (s1, s2)) = (src.face.direction(), src.face.direction().tangents());
        let (d_n, (d1, d2)) = (dest.face.direction(), dest.face.direction().tangents());
        let (swap, r1, r2) = self.orientation_from(from).parts();

        let mut map = [(Direction::I, false); 3];
        map[s_n.index()] = (d_n, src.face.is_upper() == dest.face.is_upper());
        if swap {
            map[s1.index()] = (d2, r2);
            map[s2.index()] = (d1, r1);
        } else {
            map[s1.index()] = (d1, r1);
            map[s2.index()] = (d2, r2);
        }
        map
    }

    /// Placement of every cell of a slice taken on the other side into the
    /// ghost halo of side `to`.
    ///
    /// Cells beyond the window along both tangents are never sent. Cells
    /// beyond it along one tangent are only placed when the destination
    /// window edge lies on the destination block boundary, where they become
    /// edge ghosts.
    pub fn cell_maps(&self, to: usize, src_dims: Ijk, dest_dims: Ijk, num_ghosts: i32) -> Vec<CellMap> {
        let from = 1 - to;
        let src = &self.sides[from];
        let dest = &self.sides[to];
        let s_n = src.face.direction();
        let (s1, s2) = s_n.tangents();
        let d_n = dest.face.direction();
        let (d1, d2) = d_n.tangents();
        let n_src = s_n.component(src_dims);
        let n_dest = d_n.component(dest_dims);
        let orientation = self.orientation_from(from);

        let ranges = self.slice_ranges(from, src_dims, num_ghosts);
        let origin = (ranges[0].start, ranges[1].start, ranges[2].start);
        let mut maps = Vec::with_capacity(ranges.iter().map(|r| r.len()).product());
        for k in ranges[2].clone() {
            for j in ranges[1].clone() {
                for i in ranges[0].clone() {
                    let cell = (i, j, k);
                    let l1 = s1.component(cell) - src.range1.0;
                    let l2 = s2.component(cell) - src.range2.0;
                    let out1 = l1 < 0 || l1 >= src.len1();
                    let out2 = l2 < 0 || l2 >= src.len2();
                    if out1 && out2 {
                        continue;
                    }
                    let (m1, m2) = orientation.map(l1, l2, dest.len1(), dest.len2());
                    let border = if m1 < 0 {
                        Some(0)
                    } else if m1 >= dest.len1() {
                        Some(1)
                    } else if m2 < 0 {
                        Some(2)
                    } else if m2 >= dest.len2() {
                        Some(3)
                    } else {
                        None
                    };
                    let on_boundary = match border {
                        Some(0) => dest.range1.0 == 0,
                        Some(1) => dest.range1.1 == d1.component(dest_dims),
                        Some(2) => dest.range2.0 == 0,
                        Some(3) => dest.range2.1 == d2.component(dest_dims),
                        _ => true,
                    };
                    if !on_boundary {
                        continue;
                    }

                    let normal = s_n.component(cell);
                    let layer = if src.face.is_upper() {
                        n_src - 1 - normal
                    } else {
                        normal
                    };
                    let dest_normal = if dest.face.is_upper() {
                        n_dest + layer
                    } else {
                        -1 - layer
                    };
                    maps.push(CellMap {
                        src: (i - origin.0, j - origin.1, k - origin.2),
                        dest: d_n.to_ijk(dest_normal, dest.range1.0 + m1, dest.range2.0 + m2),
                        border,
                    });
                }
            }
        }
        maps
    }
}

/// Face centers of the four corner faces of a side's window.
fn window_corners(block: &ProcBlock, side: &ConnectionSide) -> [(i32, i32, Vector3d); 4] {
    let dir = side.face.direction();
    let idx = side.face.face_index(block.num(dir));
    let (a0, a1) = (side.range1.0, side.range1.1 - 1);
    let (b0, b1) = (side.range2.0, side.range2.1 - 1);
    let at = |a: i32, b: i32| (a - side.range1.0, b - side.range2.0, block.f_center(dir, dir.to_ijk(idx, a, b)));
    [at(a0, b0), at(a1, b0), at(a0, b1), at(a1, b1)]
}

/// Orientation under which the window corners of `first` coincide with
/// those of `second`.
fn match_orientation(
    first_block: &ProcBlock,
    first: &ConnectionSide,
    second_block: &ProcBlock,
    second: &ConnectionSide,
) -> Option<Orientation> {
    let corners1 = window_corners(first_block, first);
    let dir2 = second.face.direction();
    let idx2 = second.face.face_index(second_block.num(dir2));
    let tol = MATCH_TOL * corners1[0].2.distance(&corners1[3].2).max(1.0);

    let mut best: Option<(f64, Orientation)> = None;
    for orientation in Orientation::all() {
        let (len1, len2) = if orientation.is_swapped() {
            (first.len2(), first.len1())
        } else {
            (first.len1(), first.len2())
        };
        if len1 != second.len1() || len2 != second.len2() {
            continue;
        }
        let mut worst = 0.0_f64;
        for (l1, l2, pos) in corners1.iter() {
            let (m1, m2) = orientation.map(*l1, *l2, second.len1(), second.len2());
            let other = second_block.f_center(
                dir2,
                dir2.to_ijk(idx2, second.range1.0 + m1, second.range2.0 + m2),
            );
            worst = worst.max(pos.distance(&other));
        }
        if worst <= tol && best.map_or(true, |(d, _)| worst < d) {
            best = Some((worst, orientation));
        }
    }
    best.map(|(_, o)| o)
}

/// Flag window edges of `side` whose neighboring halo cells come from
/// another interblock surface of the same block.
fn mark_borders(block: &ProcBlock, side: &mut ConnectionSide) {
    let normal = side.face.direction();
    let (t1, t2) = normal.tangents();
    let interior = side.face.interior_index(0, block.num(normal));
    let dims = block.dims();
    let checks = [
        (t1, side.range1.0, false, t2, side.range2),
        (t1, side.range1.1, true, t2, side.range2),
        (t2, side.range2.0, false, t1, side.range1),
        (t2, side.range2.1, true, t1, side.range1),
    ];
    for (edge, (dir, node, upper, along, range)) in checks.into_iter().enumerate() {
        let on_boundary = if upper {
            node == dir.component(dims)
        } else {
            node == 0
        };
        let borders = (range.0..range.1).any(|t| {
            let cell = along.with(normal.with((0, 0, 0), interior), t);
            if on_boundary {
                let face = BoundaryFace::new(dir, upper);
                let cell = dir.with(cell, face.interior_index(0, dir.component(dims)));
                block
                    .bc()
                    .surface_at_cell(face, cell)
                    .is_some_and(|s| s.kind.is_interblock())
            } else {
                let beyond = if upper { node } else { node - 1 };
                let cell = dir.with(cell, beyond);
                block
                    .bc()
                    .surface_at_cell(side.face, cell)
                    .is_some_and(|s| s.kind.is_interblock())
            }
        });
        side.border[edge] = borders;
    }
}

/// Pair every interblock surface of `blocks` with the surface carrying the
/// same tag and work out their orientation from the window corners. Sides
/// refer to blocks by their position in `blocks`.
pub fn find_connections(blocks: &[ProcBlock]) -> Result<Vec<Interblock>, SolverError> {
    let mut surfaces = Vec::new();
    for (b, block) in blocks.iter().enumerate() {
        for surf in block.bc().interblocks() {
            surfaces.push((b, surf.clone()));
        }
    }

    let mut used = vec![false; surfaces.len()];
    let mut connections = Vec::new();
    for n in 0..surfaces.len() {
        if used[n] {
            continue;
        }
        let (b1, ref s1) = surfaces[n];
        let partner = (n + 1..surfaces.len())
            .find(|&m| !used[m] && surfaces[m].1.tag == s1.tag)
            .ok_or(SolverError::UnmatchedInterblock(s1.tag))?;
        let (b2, ref s2) = surfaces[partner];
        used[n] = true;
        used[partner] = true;

        let mut first = ConnectionSide::from_surface(&blocks[b1], s1);
        let mut second = ConnectionSide::from_surface(&blocks[b2], s2);
        first.block = b1;
        second.block = b2;
        let orientation = match_orientation(&blocks[b1], &first, &blocks[b2], &second)
            .ok_or(SolverError::UnmatchedInterblock(s1.tag))?;
        mark_borders(&blocks[b1], &mut first);
        mark_borders(&blocks[b2], &mut second);
        debug!(
            tag = s1.tag,
            first = first.block,
            second = second.block,
            orientation = orientation.code(),
            "interblock connection"
        );
        connections.push(Interblock::new(first, second, orientation));
    }
    Ok(connections)
}
