//! The per-block container of the finite-volume engine.
//!
//! A [`ProcBlock`] owns every array of one structured block: geometry and
//! state padded with the ghost halo, per-cell accumulators for the physical
//! cells only, the boundary surfaces, and the bookkeeping that ties it to a
//! parent grid block and a process.

use crate::axis::{Direction, Ijk};
use crate::block::Block;
use crate::boundary_conditions::{BoundaryConditions, SplitRecord};
use crate::eos::IdealGas;
use crate::error::SolverError;
use crate::multi_array::MultiArray3d;
use crate::primvars::{PrimVars, VarArray};
use crate::vector3d::{Tensor, UnitVecMag, Vector3d};

#[derive(Clone, Debug)]
pub struct ProcBlock {
    pub(crate) num_i: i32,
    pub(crate) num_j: i32,
    pub(crate) num_k: i32,
    pub(crate) num_ghosts: i32,
    pub(crate) parent_block: usize,
    pub(crate) parent_start: Ijk,
    pub(crate) rank: usize,
    pub(crate) global_pos: usize,
    pub(crate) local_pos: usize,
    pub(crate) bc: BoundaryConditions,

    pub(crate) state: MultiArray3d<PrimVars>,
    pub(crate) cons_vars_n: MultiArray3d<VarArray>,
    pub(crate) cons_vars_nm1: MultiArray3d<VarArray>,

    pub(crate) center: MultiArray3d<Vector3d>,
    pub(crate) vol: MultiArray3d<f64>,
    pub(crate) f_area: [MultiArray3d<UnitVecMag>; 3],
    pub(crate) f_center: [MultiArray3d<Vector3d>; 3],
    /// Cells whose geometry has been assigned (physical cells, and ghosts
    /// once a boundary policy or an exchange has filled them).
    pub(crate) populated: MultiArray3d<bool>,
    /// Edge ghosts whose geometry was mirrored locally because no exchange
    /// delivered them.
    pub(crate) edge_fallback: MultiArray3d<bool>,

    pub(crate) residual: MultiArray3d<VarArray>,
    pub(crate) avg_wave_speed: MultiArray3d<f64>,
    pub(crate) dt: MultiArray3d<f64>,
    pub(crate) wall_dist: MultiArray3d<f64>,

    pub(crate) vel_grad: MultiArray3d<Tensor>,
    pub(crate) temp_grad: MultiArray3d<Vector3d>,
    pub(crate) tke_grad: MultiArray3d<Vector3d>,
    pub(crate) omega_grad: MultiArray3d<Vector3d>,
    pub(crate) eddy_visc: MultiArray3d<f64>,
}

fn node(grid: &Block, ijk: Ijk) -> Vector3d {
    grid.node(ijk.0 as usize, ijk.1 as usize, ijk.2 as usize)
}

impl ProcBlock {
    /// Build the block geometry from grid nodes and fill the physical cells
    /// with `initial`. Ghost geometry stays unpopulated until
    /// [`assign_ghost_cells_geom`](Self::assign_ghost_cells_geom) and the
    /// interblock exchanges run.
    pub fn new(
        grid: &Block,
        bc: BoundaryConditions,
        num_ghosts: i32,
        parent_block: usize,
        initial: PrimVars,
    ) -> Self {
        let (ni, nj, nk) = grid.num_cells();
        let (ni, nj, nk) = (ni as i32, nj as i32, nk as i32);
        let g = num_ghosts;

        let mut center = MultiArray3d::new(ni, nj, nk, g, Vector3d::zero());
        for (i, j, k) in center.physical_indices().collect::<Vec<_>>() {
            let mut sum = Vector3d::zero();
            for dk in 0..2 {
                for dj in 0..2 {
                    for di in 0..2 {
                        sum += node(grid, (i + di, j + dj, k + dk));
                    }
                }
            }
            center[(i, j, k)] = sum / 8.0;
        }

        let mut f_area = Vec::with_capacity(3);
        let mut f_center = Vec::with_capacity(3);
        for dir in Direction::all() {
            let (t1, t2) = dir.tangents();
            let dims = (ni, nj, nk);
            let n_faces = dir.component(dims) + 1;
            let (fi, fj, fk) = dir.to_ijk(n_faces, t1.component(dims), t2.component(dims));
            let mut area = MultiArray3d::new(fi, fj, fk, g, UnitVecMag::default());
            let mut fc = MultiArray3d::new(fi, fj, fk, g, Vector3d::zero());
            for f in 0..n_faces {
                for b in 0..t2.component(dims) {
                    for a in 0..t1.component(dims) {
                        let p = |da: i32, db: i32| node(grid, dir.to_ijk(f, a + da, b + db));
                        let diag1 = p(1, 1) - p(0, 0);
                        let diag2 = p(0, 1) - p(1, 0);
                        let idx = dir.to_ijk(f, a, b);
                        area[idx] = UnitVecMag::new(diag1.cross(&diag2) * 0.5);
                        fc[idx] = (p(0, 0) + p(1, 0) + p(0, 1) + p(1, 1)) * 0.25;
                    }
                }
            }
            f_area.push(area);
            f_center.push(fc);
        }
        let f_area: [MultiArray3d<UnitVecMag>; 3] = [f_area.remove(0), f_area.remove(0), f_area.remove(0)];
        let f_center: [MultiArray3d<Vector3d>; 3] =
            [f_center.remove(0), f_center.remove(0), f_center.remove(0)];

        let mut vol = MultiArray3d::new(ni, nj, nk, g, 0.0);
        let mut populated = MultiArray3d::new(ni, nj, nk, g, false);
        for ijk in vol.physical_indices().collect::<Vec<_>>() {
            let c = center[ijk];
            let mut v = 0.0;
            for dir in Direction::all() {
                let lo = ijk;
                let hi = dir.shift(ijk, 1);
                let d = dir.index();
                v += (f_center[d][hi] - c).dot(&f_area[d][hi].vector());
                v -= (f_center[d][lo] - c).dot(&f_area[d][lo].vector());
            }
            vol[ijk] = v / 3.0;
            populated[ijk] = true;
        }

        Self {
            num_i: ni,
            num_j: nj,
            num_k: nk,
            num_ghosts: g,
            parent_block,
            parent_start: (0, 0, 0),
            rank: 0,
            global_pos: parent_block,
            local_pos: 0,
            bc,
            state: MultiArray3d::new(ni, nj, nk, g, initial),
            cons_vars_n: MultiArray3d::new(ni, nj, nk, 0, VarArray::zero()),
            cons_vars_nm1: MultiArray3d::new(ni, nj, nk, 0, VarArray::zero()),
            center,
            vol,
            f_area,
            f_center,
            populated,
            edge_fallback: MultiArray3d::new(ni, nj, nk, g, false),
            residual: MultiArray3d::new(ni, nj, nk, 0, VarArray::zero()),
            avg_wave_speed: MultiArray3d::new(ni, nj, nk, 0, 0.0),
            dt: MultiArray3d::new(ni, nj, nk, 0, 0.0),
            wall_dist: MultiArray3d::new(ni, nj, nk, 0, f64::MAX),
            vel_grad: MultiArray3d::new(ni, nj, nk, 0, Tensor::zero()),
            temp_grad: MultiArray3d::new(ni, nj, nk, 0, Vector3d::zero()),
            tke_grad: MultiArray3d::new(ni, nj, nk, 0, Vector3d::zero()),
            omega_grad: MultiArray3d::new(ni, nj, nk, 0, Vector3d::zero()),
            eddy_visc: MultiArray3d::new(ni, nj, nk, g, 0.0),
        }
    }

    pub fn num_i(&self) -> i32 {
        self.num_i
    }

    pub fn num_j(&self) -> i32 {
        self.num_j
    }

    pub fn num_k(&self) -> i32 {
        self.num_k
    }

    /// Physical cell count along `dir`.
    pub fn num(&self, dir: Direction) -> i32 {
        dir.component(self.dims())
    }

    pub fn dims(&self) -> Ijk {
        (self.num_i, self.num_j, self.num_k)
    }

    pub fn num_cells(&self) -> usize {
        (self.num_i * self.num_j * self.num_k) as usize
    }

    pub fn num_ghosts(&self) -> i32 {
        self.num_ghosts
    }

    pub fn parent_block(&self) -> usize {
        self.parent_block
    }

    /// Index of this block's first cell inside its parent block.
    pub fn parent_start(&self) -> Ijk {
        self.parent_start
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    pub fn global_pos(&self) -> usize {
        self.global_pos
    }

    pub fn set_global_pos(&mut self, pos: usize) {
        self.global_pos = pos;
    }

    pub fn local_pos(&self) -> usize {
        self.local_pos
    }

    pub fn set_local_pos(&mut self, pos: usize) {
        self.local_pos = pos;
    }

    pub fn bc(&self) -> &BoundaryConditions {
        &self.bc
    }

    pub fn bc_mut(&mut self) -> &mut BoundaryConditions {
        &mut self.bc
    }

    pub fn state(&self, ijk: Ijk) -> &PrimVars {
        &self.state[ijk]
    }

    pub fn set_state(&mut self, ijk: Ijk, state: PrimVars) {
        self.state[ijk] = state;
    }

    pub fn states(&self) -> &MultiArray3d<PrimVars> {
        &self.state
    }

    pub fn vol(&self, ijk: Ijk) -> f64 {
        self.vol[ijk]
    }

    pub fn center(&self, ijk: Ijk) -> Vector3d {
        self.center[ijk]
    }

    pub fn f_area(&self, dir: Direction, ijk: Ijk) -> UnitVecMag {
        self.f_area[dir.index()][ijk]
    }

    pub fn f_center(&self, dir: Direction, ijk: Ijk) -> Vector3d {
        self.f_center[dir.index()][ijk]
    }

    /// Lower face of cell `ijk` along `dir`.
    pub fn f_area_lower(&self, dir: Direction, ijk: Ijk) -> UnitVecMag {
        self.f_area(dir, ijk)
    }

    /// Upper face of cell `ijk` along `dir`.
    pub fn f_area_upper(&self, dir: Direction, ijk: Ijk) -> UnitVecMag {
        self.f_area(dir, dir.shift(ijk, 1))
    }

    pub fn is_populated(&self, ijk: Ijk) -> bool {
        self.populated[ijk]
    }

    pub fn is_physical(&self, ijk: Ijk) -> bool {
        self.state.is_physical(ijk.0, ijk.1, ijk.2)
    }

    pub fn residual(&self, ijk: Ijk) -> VarArray {
        self.residual[ijk]
    }

    pub fn avg_wave_speed(&self, ijk: Ijk) -> f64 {
        self.avg_wave_speed[ijk]
    }

    pub fn dt(&self, ijk: Ijk) -> f64 {
        self.dt[ijk]
    }

    pub fn wall_dist(&self, ijk: Ijk) -> f64 {
        self.wall_dist[ijk]
    }

    pub fn vel_grad(&self, ijk: Ijk) -> Tensor {
        self.vel_grad[ijk]
    }

    pub fn temp_grad(&self, ijk: Ijk) -> Vector3d {
        self.temp_grad[ijk]
    }

    pub fn eddy_visc(&self, ijk: Ijk) -> f64 {
        self.eddy_visc[ijk]
    }

    pub fn physical_cells(&self) -> impl Iterator<Item = Ijk> {
        self.residual.physical_indices()
    }

    /// Set every cell, ghosts included, to `state`.
    pub fn initialize_states(&mut self, state: PrimVars) {
        self.state.fill(state);
    }

    /// Zero the residual and wave-speed accumulators before a (sub)step.
    pub fn reset_residual_wave_speed(&mut self) {
        self.residual.fill(VarArray::zero());
        self.avg_wave_speed.fill(0.0);
    }

    /// Zero the cell-centered gradients accumulated by the viscous flux.
    pub fn reset_gradients(&mut self) {
        self.vel_grad.fill(Tensor::zero());
        self.temp_grad.fill(Vector3d::zero());
        self.tke_grad.fill(Vector3d::zero());
        self.omega_grad.fill(Vector3d::zero());
    }

    /// Store the conservative solution at time level n (and shift n to n-1).
    pub fn assign_solution_to_time_n(&mut self, eos: &IdealGas) {
        self.cons_vars_nm1 = self.cons_vars_n.clone();
        for ijk in self.cons_vars_n.physical_indices().collect::<Vec<_>>() {
            self.cons_vars_n[ijk] = self.state[ijk].to_conserved(eos);
        }
    }

    /// Split along `dir` before cell `ind`. `self` becomes the lower part and
    /// the upper part is returned, together with the divided interblock
    /// surfaces whose partners need [`BoundaryConditions::dependent_split`].
    pub fn split(
        &mut self,
        dir: Direction,
        ind: i32,
        new_global_pos: usize,
        next_tag: &mut i32,
    ) -> Result<(ProcBlock, Vec<SplitRecord>), SolverError> {
        let extent = self.num(dir);
        if ind <= 0 || ind >= extent {
            return Err(SolverError::SplitOutOfRange { index: ind, extent });
        }
        let (upper_bc, records) = self.bc.split(dir, ind, self.dims(), next_tag);

        macro_rules! split_field {
            ($field:expr, $face:expr) => {{
                let (lo, hi) = $field.split_along(dir, ind, $face);
                $field = lo;
                hi
            }};
        }

        let state = split_field!(self.state, false);
        let cons_vars_n = split_field!(self.cons_vars_n, false);
        let cons_vars_nm1 = split_field!(self.cons_vars_nm1, false);
        let center = split_field!(self.center, false);
        let vol = split_field!(self.vol, false);
        let populated = split_field!(self.populated, false);
        let edge_fallback = split_field!(self.edge_fallback, false);
        let residual = split_field!(self.residual, false);
        let avg_wave_speed = split_field!(self.avg_wave_speed, false);
        let dt = split_field!(self.dt, false);
        let wall_dist = split_field!(self.wall_dist, false);
        let vel_grad = split_field!(self.vel_grad, false);
        let temp_grad = split_field!(self.temp_grad, false);
        let tke_grad = split_field!(self.tke_grad, false);
        let omega_grad = split_field!(self.omega_grad, false);
        let eddy_visc = split_field!(self.eddy_visc, false);
        let f_area = [
            split_field!(self.f_area[0], dir == Direction::I),
            split_field!(self.f_area[1], dir == Direction::J),
            split_field!(self.f_area[2], dir == Direction::K),
        ];
        let f_center = [
            split_field!(self.f_center[0], dir == Direction::I),
            split_field!(self.f_center[1], dir == Direction::J),
            split_field!(self.f_center[2], dir == Direction::K),
        ];

        let upper_dims = dir.with(self.dims(), extent - ind);
        let lower_dims = dir.with(self.dims(), ind);
        self.num_i = lower_dims.0;
        self.num_j = lower_dims.1;
        self.num_k = lower_dims.2;

        let upper = ProcBlock {
            num_i: upper_dims.0,
            num_j: upper_dims.1,
            num_k: upper_dims.2,
            num_ghosts: self.num_ghosts,
            parent_block: self.parent_block,
            parent_start: dir.shift(self.parent_start, ind),
            rank: self.rank,
            global_pos: new_global_pos,
            local_pos: self.local_pos,
            bc: upper_bc,
            state,
            cons_vars_n,
            cons_vars_nm1,
            center,
            vol,
            f_area,
            f_center,
            populated,
            edge_fallback,
            residual,
            avg_wave_speed,
            dt,
            wall_dist,
            vel_grad,
            temp_grad,
            tke_grad,
            omega_grad,
            eddy_visc,
        };
        Ok((upper, records))
    }

    /// Append `upper` after `self` along `dir`.
    pub fn join(&mut self, upper: &ProcBlock, dir: Direction) -> Result<(), SolverError> {
        let (t1, t2) = dir.tangents();
        if self.num(t1) != upper.num(t1) || self.num(t2) != upper.num(t2) {
            return Err(SolverError::JoinMismatch(format!(
                "faces normal to {} differ: {:?} vs {:?}",
                dir.name(),
                self.dims(),
                upper.dims()
            )));
        }
        if self.num_ghosts != upper.num_ghosts {
            return Err(SolverError::JoinMismatch("ghost layers differ".into()));
        }
        let lower_extent = self.num(dir);

        self.state = self.state.join_along(&upper.state, dir, false);
        self.cons_vars_n = self.cons_vars_n.join_along(&upper.cons_vars_n, dir, false);
        self.cons_vars_nm1 = self.cons_vars_nm1.join_along(&upper.cons_vars_nm1, dir, false);
        self.center = self.center.join_along(&upper.center, dir, false);
        self.vol = self.vol.join_along(&upper.vol, dir, false);
        self.populated = self.populated.join_along(&upper.populated, dir, false);
        self.edge_fallback = self.edge_fallback.join_along(&upper.edge_fallback, dir, false);
        self.residual = self.residual.join_along(&upper.residual, dir, false);
        self.avg_wave_speed = self.avg_wave_speed.join_along(&upper.avg_wave_speed, dir, false);
        self.dt = self.dt.join_along(&upper.dt, dir, false);
        self.wall_dist = self.wall_dist.join_along(&upper.wall_dist, dir, false);
        self.vel_grad = self.vel_grad.join_along(&upper.vel_grad, dir, false);
        self.temp_grad = self.temp_grad.join_along(&upper.temp_grad, dir, false);
        self.tke_grad = self.tke_grad.join_along(&upper.tke_grad, dir, false);
        self.omega_grad = self.omega_grad.join_along(&upper.omega_grad, dir, false);
        self.eddy_visc = self.eddy_visc.join_along(&upper.eddy_visc, dir, false);
        for d in Direction::all() {
            let face = d == dir;
            self.f_area[d.index()] =
                self.f_area[d.index()].join_along(&upper.f_area[d.index()], dir, face);
            self.f_center[d.index()] =
                self.f_center[d.index()].join_along(&upper.f_center[d.index()], dir, face);
        }

        self.bc.join(&upper.bc, dir, lower_extent);
        let dims = dir.with(self.dims(), lower_extent + upper.num(dir));
        self.num_i = dims.0;
        self.num_j = dims.1;
        self.num_k = dims.2;
        Ok(())
    }
}
