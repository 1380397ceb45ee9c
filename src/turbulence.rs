//! Turbulence closures consumed by the engine through [`TurbulenceModel`].
//!
//! Eddy viscosities are in the same effective (Reynolds-scaled) units as
//! [`Sutherland::effective_viscosity`](crate::viscosity::Sutherland::effective_viscosity),
//! which for the freestream-referenced nondimensionalization reduces to
//! `rho * k / omega`.

use crate::error::SolverError;
use crate::primvars::{PrimVars, VarArray};
use crate::vector3d::{Tensor, Vector3d};

/// Capabilities the flux, source and ghost-cell routines need from a closure.
pub trait TurbulenceModel {
    /// True when the closure carries transport equations.
    fn is_rans(&self) -> bool;

    /// Limited eddy viscosity.
    fn eddy_visc(&self, state: &PrimVars, vel_grad: &Tensor) -> f64;

    /// Eddy viscosity without the stress limiter, used for diffusion coefficients.
    fn eddy_visc_no_lim(&self, state: &PrimVars) -> f64;

    /// Diffusion multipliers of the eddy viscosity for the (k, omega) equations.
    fn diffusion_coefficients(&self) -> (f64, f64);

    /// Volumetric source terms of the turbulence equations.
    fn src_terms(
        &self,
        state: &PrimVars,
        vel_grad: &Tensor,
        tke_grad: &Vector3d,
        omega_grad: &Vector3d,
    ) -> VarArray;

    /// Specific dissipation imposed at a no-slip wall for a first cell at `wall_dist`.
    fn wall_omega(&self, mu: f64, rho: f64, wall_dist: f64) -> f64;

    /// Spectral radius of the source Jacobian, added to the implicit diagonal.
    fn src_spectral_radius(&self, state: &PrimVars) -> f64;
}

/// Wilcox (2006) k-omega coefficients.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Wilcox2006 {
    beta_star: f64,
    beta0: f64,
    alpha: f64,
    sigma_k: f64,
    sigma_w: f64,
    sigma_d0: f64,
    c_lim: f64,
    beta1_wall: f64,
}

impl Default for Wilcox2006 {
    fn default() -> Self {
        Self {
            beta_star: 0.09,
            beta0: 0.0708,
            alpha: 13.0 / 25.0,
            sigma_k: 0.6,
            sigma_w: 0.5,
            sigma_d0: 0.125,
            c_lim: 7.0 / 8.0,
            beta1_wall: 0.075,
        }
    }
}

/// `d(u_i)/d(x_j)` laid out with rows `i`.
fn velocity_jacobian(vel_grad: &Tensor) -> Tensor {
    vel_grad.transpose()
}

fn strain_rate(vel_grad: &Tensor) -> Tensor {
    let d = velocity_jacobian(vel_grad);
    (d + d.transpose()) * 0.5
}

fn deviatoric(t: &Tensor) -> Tensor {
    *t - Tensor::identity() * (t.trace() / 3.0)
}

impl Wilcox2006 {
    fn omega_tilde(&self, state: &PrimVars, vel_grad: &Tensor) -> f64 {
        let s_bar = deviatoric(&strain_rate(vel_grad));
        let lim = self.c_lim * (2.0 * s_bar.double_dot(&s_bar) / self.beta_star).sqrt();
        state.omega().max(lim)
    }

    fn f_beta(&self, state: &PrimVars, vel_grad: &Tensor) -> f64 {
        let d = velocity_jacobian(vel_grad);
        let rot = (d - d.transpose()) * 0.5;
        let s_hat = strain_rate(vel_grad) - Tensor::identity() * (0.5 * d.trace());
        let mut triple = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    triple += rot.data[i][j] * rot.data[j][k] * s_hat.data[k][i];
                }
            }
        }
        let chi = (triple / (self.beta_star * state.omega()).powi(3)).abs();
        (1.0 + 85.0 * chi) / (1.0 + 100.0 * chi)
    }
}

impl TurbulenceModel for Wilcox2006 {
    fn is_rans(&self) -> bool {
        true
    }

    fn eddy_visc(&self, state: &PrimVars, vel_grad: &Tensor) -> f64 {
        state.rho() * state.tke().max(0.0) / self.omega_tilde(state, vel_grad)
    }

    fn eddy_visc_no_lim(&self, state: &PrimVars) -> f64 {
        state.rho() * state.tke().max(0.0) / state.omega()
    }

    fn diffusion_coefficients(&self) -> (f64, f64) {
        (self.sigma_k, self.sigma_w)
    }

    fn src_terms(
        &self,
        state: &PrimVars,
        vel_grad: &Tensor,
        tke_grad: &Vector3d,
        omega_grad: &Vector3d,
    ) -> VarArray {
        let rho = state.rho();
        let tke = state.tke().max(0.0);
        let omega = state.omega();
        let eddy = self.eddy_visc(state, vel_grad);

        let d = velocity_jacobian(vel_grad);
        let s_bar = deviatoric(&strain_rate(vel_grad));
        let production = 2.0 * eddy * s_bar.double_dot(&d) - 2.0 / 3.0 * rho * tke * d.trace();
        let dissipation_k = self.beta_star * rho * tke * omega;

        let beta = self.beta0 * self.f_beta(state, vel_grad);
        let cross = tke_grad.dot(omega_grad);
        let sigma_d = if cross > 0.0 { self.sigma_d0 } else { 0.0 };
        let src_omega = self.alpha * omega / tke.max(f64::MIN_POSITIVE) * production
            - beta * rho * omega * omega
            + sigma_d * rho / omega * cross;

        let mut src = VarArray::zero();
        src[5] = production - dissipation_k;
        src[6] = src_omega;
        src
    }

    fn wall_omega(&self, mu: f64, rho: f64, wall_dist: f64) -> f64 {
        60.0 * mu / (rho * self.beta1_wall * wall_dist * wall_dist)
    }

    fn src_spectral_radius(&self, state: &PrimVars) -> f64 {
        2.0 * self.beta0 * state.omega().max(0.0)
    }
}

/// Closure selected at configuration time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TurbModel {
    None,
    KOmegaWilcox2006(Wilcox2006),
}

impl TurbModel {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "none" => Ok(Self::None),
            "kOmegaWilcox2006" | "kOmega" => Ok(Self::KOmegaWilcox2006(Wilcox2006::default())),
            other => Err(SolverError::UnknownOption {
                option: "turbulence model",
                value: other.to_string(),
            }),
        }
    }
}

impl TurbulenceModel for TurbModel {
    fn is_rans(&self) -> bool {
        match self {
            Self::None => false,
            Self::KOmegaWilcox2006(m) => m.is_rans(),
        }
    }

    fn eddy_visc(&self, state: &PrimVars, vel_grad: &Tensor) -> f64 {
        match self {
            Self::None => 0.0,
            Self::KOmegaWilcox2006(m) => m.eddy_visc(state, vel_grad),
        }
    }

    fn eddy_visc_no_lim(&self, state: &PrimVars) -> f64 {
        match self {
            Self::None => 0.0,
            Self::KOmegaWilcox2006(m) => m.eddy_visc_no_lim(state),
        }
    }

    fn diffusion_coefficients(&self) -> (f64, f64) {
        match self {
            Self::None => (0.0, 0.0),
            Self::KOmegaWilcox2006(m) => m.diffusion_coefficients(),
        }
    }

    fn src_terms(
        &self,
        state: &PrimVars,
        vel_grad: &Tensor,
        tke_grad: &Vector3d,
        omega_grad: &Vector3d,
    ) -> VarArray {
        match self {
            Self::None => VarArray::zero(),
            Self::KOmegaWilcox2006(m) => m.src_terms(state, vel_grad, tke_grad, omega_grad),
        }
    }

    fn wall_omega(&self, mu: f64, rho: f64, wall_dist: f64) -> f64 {
        match self {
            Self::None => 0.0,
            Self::KOmegaWilcox2006(m) => m.wall_omega(mu, rho, wall_dist),
        }
    }

    fn src_spectral_radius(&self, state: &PrimVars) -> f64 {
        match self {
            Self::None => 0.0,
            Self::KOmegaWilcox2006(m) => m.src_spectral_radius(state),
        }
    }
}
