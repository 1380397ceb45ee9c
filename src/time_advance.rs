//! Time-step sizing, solution updates and residual norms.

use crate::axis::Ijk;
use crate::error::SolverError;
use crate::input::{Settings, TimeIntegration};
use crate::multi_array::MultiArray3d;
use crate::primvars::{PrimVars, VarArray};
use crate::proc_block::ProcBlock;
use crate::turbulence::TurbulenceModel;

/// Stage coefficients of the low-storage four-stage Runge-Kutta scheme.
pub const RK4_COEFFS: [f64; 4] = [0.25, 1.0 / 3.0, 0.5, 1.0];

const TKE_FLOOR: f64 = 1.0e-20;
const OMEGA_FLOOR: f64 = 1.0e-20;

/// Largest residual component and where it occurred.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ResidLinf {
    pub value: f64,
    pub block: usize,
    pub cell: Ijk,
    pub eq: usize,
}

impl ResidLinf {
    /// Keep whichever of `self` and `other` is larger.
    pub fn merge(&mut self, other: &ResidLinf) {
        if other.value > self.value {
            *self = *other;
        }
    }
}

/// Residual norms of one (sub)step: squared L2 sums per equation and the
/// L-infinity location.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Residual {
    pub l2: VarArray,
    pub linf: ResidLinf,
}

impl Residual {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, block: usize, cell: Ijk, resid: &VarArray, neq: usize) {
        for eq in 0..neq {
            self.l2[eq] += resid[eq] * resid[eq];
        }
        let (value, eq) = resid.max_abs(neq);
        if value > self.linf.value {
            self.linf = ResidLinf {
                value,
                block,
                cell,
                eq,
            };
        }
    }

    /// Combine the norms of another set of blocks.
    pub fn merge(&mut self, other: &Residual) {
        self.l2 += other.l2;
        self.linf.merge(&other.linf);
    }

    /// Square-rooted L2 norm of each equation.
    pub fn l2_norm(&self, neq: usize) -> VarArray {
        let mut out = VarArray::zero();
        for eq in 0..neq {
            out[eq] = self.l2[eq].sqrt();
        }
        out
    }

    /// Square-rooted L2 norm over all equations.
    pub fn total_l2(&self, neq: usize) -> f64 {
        self.l2.data[..neq].iter().sum::<f64>().sqrt()
    }
}

impl ProcBlock {
    /// Local time step of every physical cell, either the configured fixed
    /// step or `cfl * volume / spectral radius`.
    pub fn calc_block_time_step(&mut self, settings: &Settings) -> Result<(), SolverError> {
        if settings.dt > 0.0 {
            self.dt.fill(settings.dt);
            return Ok(());
        }
        if settings.cfl <= 0.0 {
            return Err(SolverError::MissingTimeStep);
        }
        for ijk in self.dt.physical_indices().collect::<Vec<_>>() {
            self.dt[ijk] = settings.cfl * self.vol[ijk] / self.avg_wave_speed[ijk];
        }
        Ok(())
    }

    /// Turbulence source terms and eddy viscosity from the cell gradients
    /// accumulated by the viscous flux pass.
    pub fn calc_src_terms(&mut self, settings: &Settings) {
        if !settings.is_turbulent() {
            return;
        }
        let turb = &settings.turbulence;
        for ijk in self.residual.physical_indices().collect::<Vec<_>>() {
            let state = self.state[ijk];
            let vel_grad = self.vel_grad[ijk];
            self.eddy_visc[ijk] = turb.eddy_visc(&state, &vel_grad);
            let src = turb.src_terms(&state, &vel_grad, &self.tke_grad[ijk], &self.omega_grad[ijk]);
            self.residual[ijk] -= src * self.vol[ijk];
            self.avg_wave_speed[ijk] += turb.src_spectral_radius(&state) * self.vol[ijk];
        }
        for ijk in self.eddy_visc.indices().collect::<Vec<_>>() {
            if !self.is_physical(ijk) {
                self.eddy_visc[ijk] = turb.eddy_visc_no_lim(&self.state[ijk]);
            }
        }
    }

    /// Advance the physical cells and accumulate the residual norms.
    ///
    /// Explicit schemes use the stored residual and time step; RK4 restarts
    /// every stage from the solution at time n. Implicit schemes apply the
    /// correction `du` from the linear solver.
    pub fn update_block(
        &mut self,
        settings: &Settings,
        du: Option<&MultiArray3d<VarArray>>,
        stage: usize,
        resid: &mut Residual,
    ) -> Result<(), SolverError> {
        let eos = &settings.eos;
        let neq = settings.num_equations();
        for ijk in self.residual.physical_indices().collect::<Vec<_>>() {
            let mut updated = match settings.time_integration {
                TimeIntegration::ExplicitEuler => {
                    let cons = self.state[ijk].to_conserved(eos)
                        - self.residual[ijk] * (self.dt[ijk] / self.vol[ijk]);
                    PrimVars::from_conserved(&cons, eos)
                }
                TimeIntegration::Rk4 => {
                    let coeff = RK4_COEFFS[stage.min(RK4_COEFFS.len() - 1)];
                    let cons = self.cons_vars_n[ijk]
                        - self.residual[ijk] * (coeff * self.dt[ijk] / self.vol[ijk]);
                    PrimVars::from_conserved(&cons, eos)
                }
                _ => {
                    let correction = du.map(|d| d[ijk]).unwrap_or_default();
                    self.state[ijk].update_with_cons_vars(eos, &correction)
                }
            };
            if settings.is_turbulent() {
                updated.limit_turbulence(TKE_FLOOR, OMEGA_FLOOR);
            }
            if !updated.is_physical() {
                return Err(SolverError::NonPhysical {
                    block: self.global_pos,
                    i: ijk.0,
                    j: ijk.1,
                    k: ijk.2,
                });
            }
            self.state[ijk] = updated;

            if stage == 0 {
                resid.accumulate(self.global_pos, ijk, &self.residual[ijk], neq);
            }
        }
        Ok(())
    }
}
