//! Owned three-dimensional array padded with a uniform ghost halo.
//!
//! Physical cells are addressed with indices `0..num` in each direction and
//! ghost cells with `-ghosts..0` and `num..num + ghosts`. Storage is i-fastest,
//! the same ordering plot3d node arrays use.

use std::ops::{Index, IndexMut, Range};

use crate::axis::{Direction, Ijk};

#[derive(Clone, Debug, PartialEq)]
pub struct MultiArray3d<T> {
    data: Vec<T>,
    num_i: i32,
    num_j: i32,
    num_k: i32,
    ghosts: i32,
}

impl<T: Clone> MultiArray3d<T> {
    /// Create an array of `ni x nj x nk` physical entries padded by `ghosts` layers.
    pub fn new(ni: i32, nj: i32, nk: i32, ghosts: i32, init: T) -> Self {
        assert!(
            ni >= 0 && nj >= 0 && nk >= 0 && ghosts >= 0,
            "negative array extent ({ni}, {nj}, {nk}) with {ghosts} ghosts"
        );
        let len = ((ni + 2 * ghosts) * (nj + 2 * ghosts) * (nk + 2 * ghosts)) as usize;
        Self {
            data: vec![init; len],
            num_i: ni,
            num_j: nj,
            num_k: nk,
            ghosts,
        }
    }

    /// Wrap an existing storage vector (i-fastest, including ghosts).
    pub fn from_vec(ni: i32, nj: i32, nk: i32, ghosts: i32, data: Vec<T>) -> Self {
        let len = ((ni + 2 * ghosts) * (nj + 2 * ghosts) * (nk + 2 * ghosts)) as usize;
        assert_eq!(
            data.len(),
            len,
            "storage of {} entries does not fit a ({ni}, {nj}, {nk}) array with {ghosts} ghosts",
            data.len()
        );
        Self {
            data,
            num_i: ni,
            num_j: nj,
            num_k: nk,
            ghosts,
        }
    }

    /// Fill every entry (ghosts included) with `value`.
    pub fn fill(&mut self, value: T) {
        for v in self.data.iter_mut() {
            *v = value.clone();
        }
    }

    /// Copy the sub-range `ri x rj x rk` into a new array without ghosts.
    /// Ranges are half-open and may reach into the ghost halo.
    pub fn slice(&self, ri: Range<i32>, rj: Range<i32>, rk: Range<i32>) -> Self {
        self.assert_range(&ri, &rj, &rk);
        let (ni, nj, nk) = (ri.end - ri.start, rj.end - rj.start, rk.end - rk.start);
        let mut data = Vec::with_capacity((ni * nj * nk).max(0) as usize);
        for k in rk.clone() {
            for j in rj.clone() {
                for i in ri.clone() {
                    data.push(self[(i, j, k)].clone());
                }
            }
        }
        Self::from_vec(ni, nj, nk, 0, data)
    }

    /// Overwrite the sub-range `ri x rj x rk` with the physical entries of `src`.
    ///
    /// Panics when the range shape differs from the physical shape of `src`.
    pub fn insert(&mut self, ri: Range<i32>, rj: Range<i32>, rk: Range<i32>, src: &Self) {
        self.assert_range(&ri, &rj, &rk);
        assert!(
            ri.end - ri.start == src.num_i
                && rj.end - rj.start == src.num_j
                && rk.end - rk.start == src.num_k,
            "cannot insert a ({}, {}, {}) array into a ({}, {}, {}) range",
            src.num_i,
            src.num_j,
            src.num_k,
            ri.end - ri.start,
            rj.end - rj.start,
            rk.end - rk.start
        );
        for (kk, k) in rk.enumerate() {
            for (jj, j) in rj.clone().enumerate() {
                for (ii, i) in ri.clone().enumerate() {
                    self[(i, j, k)] = src[(ii as i32, jj as i32, kk as i32)].clone();
                }
            }
        }
    }

    /// Split along `dir` at physical index `ind`. Both halves keep the full
    /// ghost halo, so the ghosts at the cut hold the other half's cells.
    ///
    /// `face_dir` marks arrays that are one longer than the cell count along
    /// `dir` (face arrays); the face at the cut is shared by both halves.
    pub fn split_along(&self, dir: Direction, ind: i32, face_dir: bool) -> (Self, Self) {
        let extra = i32::from(face_dir);
        let total = self.num(dir);
        assert!(
            ind > 0 && ind < total - extra,
            "split index {ind} outside array extent {total} along {}",
            dir.name()
        );
        let lower_ext = ind + extra;
        let upper_ext = total - ind;
        let g = self.ghosts;
        let lower = self.window(dir, -g, lower_ext + g, lower_ext);
        let upper = self.window(dir, ind - g, total + g, upper_ext);
        (lower, upper)
    }

    /// Inverse of [`split_along`](Self::split_along): concatenate `upper`
    /// after `self` along `dir`.
    pub fn join_along(&self, upper: &Self, dir: Direction, face_dir: bool) -> Self {
        let (t1, t2) = dir.tangents();
        assert!(
            self.num(t1) == upper.num(t1) && self.num(t2) == upper.num(t2),
            "cannot join arrays with different extents normal to {}",
            dir.name()
        );
        assert_eq!(self.ghosts, upper.ghosts, "ghost layers differ");
        let extra = i32::from(face_dir);
        let lower_ext = self.num(dir);
        let shift = lower_ext - extra;
        let total = lower_ext + upper.num(dir) - extra;
        let g = self.ghosts;
        let (ni, nj, nk) = dir_extents(dir, total, self.num(t1), self.num(t2));
        let mut data = Vec::with_capacity(((ni + 2 * g) * (nj + 2 * g) * (nk + 2 * g)) as usize);
        for k in -g..nk + g {
            for j in -g..nj + g {
                for i in -g..ni + g {
                    let idx = (i, j, k);
                    let n = dir.component(idx);
                    data.push(if n < lower_ext {
                        self[idx].clone()
                    } else {
                        upper[dir.with(idx, n - shift)].clone()
                    });
                }
            }
        }
        Self::from_vec(ni, nj, nk, g, data)
    }

    fn window(&self, dir: Direction, start: i32, end: i32, extent: i32) -> Self {
        let (t1, t2) = dir.tangents();
        let g = self.ghosts;
        let (ni, nj, nk) = dir_extents(dir, extent, self.num(t1), self.num(t2));
        let mut data = Vec::with_capacity(((ni + 2 * g) * (nj + 2 * g) * (nk + 2 * g)) as usize);
        for k in -g..nk + g {
            for j in -g..nj + g {
                for i in -g..ni + g {
                    let n = dir.component((i, j, k));
                    let src = dir.with((i, j, k), n - (-g) + start);
                    debug_assert!(dir.component(src) < end);
                    data.push(self[src].clone());
                }
            }
        }
        Self::from_vec(ni, nj, nk, g, data)
    }

    fn assert_range(&self, ri: &Range<i32>, rj: &Range<i32>, rk: &Range<i32>) {
        let g = self.ghosts;
        assert!(
            ri.start >= -g
                && rj.start >= -g
                && rk.start >= -g
                && ri.end <= self.num_i + g
                && rj.end <= self.num_j + g
                && rk.end <= self.num_k + g
                && ri.start <= ri.end
                && rj.start <= rj.end
                && rk.start <= rk.end,
            "range ({ri:?}, {rj:?}, {rk:?}) outside array bounds"
        );
    }
}

impl<T> MultiArray3d<T> {
    #[inline]
    pub fn num_i(&self) -> i32 {
        self.num_i
    }

    #[inline]
    pub fn num_j(&self) -> i32 {
        self.num_j
    }

    #[inline]
    pub fn num_k(&self) -> i32 {
        self.num_k
    }

    /// Physical extent along `dir`.
    #[inline]
    pub fn num(&self, dir: Direction) -> i32 {
        match dir {
            Direction::I => self.num_i,
            Direction::J => self.num_j,
            Direction::K => self.num_k,
        }
    }

    #[inline]
    pub fn ghost_layers(&self) -> i32 {
        self.ghosts
    }

    /// Number of physical entries.
    pub fn num_physical(&self) -> usize {
        (self.num_i * self.num_j * self.num_k) as usize
    }

    /// Number of stored entries, ghosts included.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// True when `(i, j, k)` is inside the stored (padded) range.
    #[inline]
    pub fn in_bounds(&self, i: i32, j: i32, k: i32) -> bool {
        let g = self.ghosts;
        i >= -g && j >= -g && k >= -g && i < self.num_i + g && j < self.num_j + g && k < self.num_k + g
    }

    #[inline]
    pub fn is_physical(&self, i: i32, j: i32, k: i32) -> bool {
        i >= 0 && j >= 0 && k >= 0 && i < self.num_i && j < self.num_j && k < self.num_k
    }

    /// Ghost cell in two or more directions at once.
    pub fn is_edge_or_corner(&self, i: i32, j: i32, k: i32) -> bool {
        let outside = |v: i32, n: i32| i32::from(v < 0 || v >= n);
        outside(i, self.num_i) + outside(j, self.num_j) + outside(k, self.num_k) >= 2
    }

    /// Ghost cell in all three directions; never read by any stencil.
    pub fn is_corner(&self, i: i32, j: i32, k: i32) -> bool {
        let outside = |v: i32, n: i32| v < 0 || v >= n;
        outside(i, self.num_i) && outside(j, self.num_j) && outside(k, self.num_k)
    }

    /// All physical indices in storage order.
    pub fn physical_indices(&self) -> impl Iterator<Item = Ijk> {
        let (ni, nj, nk) = (self.num_i, self.num_j, self.num_k);
        (0..nk).flat_map(move |k| (0..nj).flat_map(move |j| (0..ni).map(move |i| (i, j, k))))
    }

    /// All stored indices, ghosts included, in storage order.
    pub fn indices(&self) -> impl Iterator<Item = Ijk> {
        let g = self.ghosts;
        let (ni, nj, nk) = (self.num_i, self.num_j, self.num_k);
        (-g..nk + g).flat_map(move |k| {
            (-g..nj + g).flat_map(move |j| (-g..ni + g).map(move |i| (i, j, k)))
        })
    }

    #[inline]
    fn offset(&self, i: i32, j: i32, k: i32) -> usize {
        assert!(
            self.in_bounds(i, j, k),
            "index ({i}, {j}, {k}) outside array ({}, {}, {}) with {} ghosts",
            self.num_i,
            self.num_j,
            self.num_k,
            self.ghosts
        );
        let g = self.ghosts;
        let si = (self.num_i + 2 * g) as usize;
        let sj = (self.num_j + 2 * g) as usize;
        ((k + g) as usize * sj + (j + g) as usize) * si + (i + g) as usize
    }
}

impl<T> Index<Ijk> for MultiArray3d<T> {
    type Output = T;
    #[inline]
    fn index(&self, (i, j, k): Ijk) -> &T {
        &self.data[self.offset(i, j, k)]
    }
}

impl<T> IndexMut<Ijk> for MultiArray3d<T> {
    #[inline]
    fn index_mut(&mut self, (i, j, k): Ijk) -> &mut T {
        let idx = self.offset(i, j, k);
        &mut self.data[idx]
    }
}

fn dir_extents(dir: Direction, n: i32, t1: i32, t2: i32) -> (i32, i32, i32) {
    dir.to_ijk(n, t1, t2)
}
