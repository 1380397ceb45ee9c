//! Matrix-free implicit operator: LU-SGS sweeps in hyperplane order and
//! DPLUR Jacobi sweeps.
//!
//! The off-diagonal blocks are never formed. A neighbor's contribution is
//! the change of its convective flux under its current correction plus a
//! spectral-radius scaled copy of that correction:
//!
//! * lower neighbor: `L = 0.5 * (dF(n) |A| + w r dU)`
//! * upper neighbor: `U = 0.5 * (dF(n) |A| - w r dU)`
//!
//! where `n` is the face normal (pointing toward increasing index), `w` the
//! matrix relaxation and `r` the neighbor's spectral radius on the face.
//! Each cell then solves `D dU = rhs + L - U`.

use crate::axis::{Direction, Ijk};
use crate::input::Settings;
use crate::inviscid_flux::convective_flux_change;
use crate::multi_array::MultiArray3d;
use crate::primvars::VarArray;
use crate::proc_block::ProcBlock;
use crate::viscous_flux::viscous_spectral_radius;

/// Cells of an `imax x jmax x kmax` block ordered by hyperplane
/// `i + j + k = const`, lowest plane first.
pub fn hyperplane_reorder(imax: i32, jmax: i32, kmax: i32) -> Vec<Ijk> {
    let num_planes = imax + jmax + kmax - 2;
    let mut reorder = Vec::with_capacity((imax * jmax * kmax).max(0) as usize);
    for plane in 0..num_planes {
        for k in 0..kmax.min(plane + 1) {
            for j in 0..jmax.min(plane - k + 1) {
                let i = plane - j - k;
                if i < imax {
                    reorder.push((i, j, k));
                }
            }
        }
    }
    reorder
}

impl ProcBlock {
    /// Main diagonal of the implicit operator for every physical cell.
    pub fn diagonal(&self, settings: &Settings) -> MultiArray3d<f64> {
        let mut diag = MultiArray3d::new(self.num_i, self.num_j, self.num_k, 0, 0.0);
        for ijk in diag.physical_indices().collect::<Vec<_>>() {
            let time = self.vol[ijk] * (1.0 + settings.zeta) / (self.dt[ijk] * settings.theta);
            let mut d = time + settings.matrix_relaxation * self.avg_wave_speed[ijk];
            if settings.is_dual_time() {
                d += self.avg_wave_speed[ijk] / settings.dual_time_cfl;
            }
            diag[ijk] = d;
        }
        diag
    }

    /// Right-hand side of the linear system: `-R / theta` plus the
    /// multi-level time terms when a fixed physical step is used.
    pub fn implicit_rhs(&self, settings: &Settings) -> MultiArray3d<VarArray> {
        let eos = &settings.eos;
        let mut rhs = MultiArray3d::new(self.num_i, self.num_j, self.num_k, 0, VarArray::zero());
        for ijk in rhs.physical_indices().collect::<Vec<_>>() {
            let mut value = -self.residual[ijk] / settings.theta;
            if settings.is_multilevel_time() {
                let coeff = self.vol[ijk] / (self.dt[ijk] * settings.theta);
                let current = self.state[ijk].to_conserved(eos);
                value += (self.cons_vars_n[ijk] - self.cons_vars_nm1[ijk]) * (settings.zeta * coeff);
                value -= (current - self.cons_vars_n[ijk]) * ((1.0 + settings.zeta) * coeff);
            }
            rhs[ijk] = value;
        }
        rhs
    }

    /// Zero correction padded with the ghost halo so interblock exchanges can
    /// fill it.
    pub fn initialize_matrix_update(&self) -> MultiArray3d<VarArray> {
        MultiArray3d::new(
            self.num_i,
            self.num_j,
            self.num_k,
            self.num_ghosts,
            VarArray::zero(),
        )
    }

    /// Spectral radius of cell `nb` on the face `face` along `dir`.
    fn face_spectral_radius(&self, nb: Ijk, dir: Direction, face: Ijk, settings: &Settings) -> f64 {
        let area = self.f_area[dir.index()][face];
        let state = &self.state[nb];
        let mut r = (state.velocity().dot(&area.unit()).abs() + state.sos(&settings.eos)) * area.mag();
        if settings.is_viscous() {
            r += viscous_spectral_radius(
                state,
                &area,
                &area,
                self.vol[nb],
                settings,
                self.cell_eddy_visc(nb, settings),
            );
        }
        r
    }

    /// `L - U` for cell `ijk` using the neighbor corrections in `du`.
    fn off_diagonal_sum(&self, ijk: Ijk, du: &MultiArray3d<VarArray>, settings: &Settings) -> VarArray {
        let eos = &settings.eos;
        let relax = settings.matrix_relaxation;
        let mut sum = VarArray::zero();
        for dir in Direction::all() {
            let d = dir.index();
            for (is_lower, nb, face) in [
                (true, dir.shift(ijk, -1), ijk),
                (false, dir.shift(ijk, 1), dir.shift(ijk, 1)),
            ] {
                // ghost corrections are zero except across interblocks
                let du_nb = du[nb];
                if du_nb == VarArray::zero() {
                    continue;
                }
                let area = self.f_area[d][face];
                let flux_change =
                    convective_flux_change(&self.state[nb], eos, &area.unit(), &du_nb) * area.mag();
                let r = self.face_spectral_radius(nb, dir, face, settings);
                if is_lower {
                    sum += (flux_change + du_nb * (relax * r)) * 0.5;
                } else {
                    sum -= (flux_change - du_nb * (relax * r)) * 0.5;
                }
            }
        }
        sum
    }

    /// Forward LU-SGS sweep: lower neighbors use the corrections of this
    /// sweep, upper neighbors those of the previous one.
    pub fn lusgs_forward(
        &self,
        reorder: &[Ijk],
        du: &mut MultiArray3d<VarArray>,
        diag: &MultiArray3d<f64>,
        rhs: &MultiArray3d<VarArray>,
        settings: &Settings,
    ) {
        for &ijk in reorder {
            let off = self.off_diagonal_sum(ijk, du, settings);
            du[ijk] = (rhs[ijk] + off) / diag[ijk];
        }
    }

    /// Backward LU-SGS sweep in reverse hyperplane order. Returns the squared
    /// linear residual of the system before the sweep's corrections.
    pub fn lusgs_backward(
        &self,
        reorder: &[Ijk],
        du: &mut MultiArray3d<VarArray>,
        diag: &MultiArray3d<f64>,
        rhs: &MultiArray3d<VarArray>,
        settings: &Settings,
    ) -> f64 {
        let neq = settings.num_equations();
        let mut error = 0.0;
        for &ijk in reorder.iter().rev() {
            let off = self.off_diagonal_sum(ijk, du, settings);
            let updated = (rhs[ijk] + off) / diag[ijk];
            error += ((updated - du[ijk]) * diag[ijk]).sum_sq(neq);
            du[ijk] = updated;
        }
        error
    }

    /// One DPLUR sweep: every cell uses only the corrections of the previous
    /// sweep. Returns the squared linear residual before the sweep.
    pub fn dplur(
        &self,
        du: &mut MultiArray3d<VarArray>,
        diag: &MultiArray3d<f64>,
        rhs: &MultiArray3d<VarArray>,
        settings: &Settings,
    ) -> f64 {
        let neq = settings.num_equations();
        let previous = du.clone();
        let mut error = 0.0;
        for ijk in diag.physical_indices() {
            let off = self.off_diagonal_sum(ijk, &previous, settings);
            let updated = (rhs[ijk] + off) / diag[ijk];
            error += ((updated - previous[ijk]) * diag[ijk]).sum_sq(neq);
            du[ijk] = updated;
        }
        error
    }
}
