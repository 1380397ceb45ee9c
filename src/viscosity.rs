//! Sutherland viscosity law with reference scaling.

const SUTHERLAND_C1: f64 = 1.458e-6;
const SUTHERLAND_S: f64 = 110.4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sutherland {
    s_nondim: f64,
    mu_ref: f64,
    scaling: f64,
    bulk: f64,
}

impl Sutherland {
    /// Reference temperature [K], density [kg/m^3], sound speed [m/s] and length [m].
    pub fn new(t_ref: f64, rho_ref: f64, a_ref: f64, l_ref: f64) -> Self {
        let mu_ref = SUTHERLAND_C1 * t_ref.powf(1.5) / (t_ref + SUTHERLAND_S);
        Self {
            s_nondim: SUTHERLAND_S / t_ref,
            mu_ref,
            scaling: mu_ref / (rho_ref * a_ref * l_ref),
            bulk: -2.0 / 3.0,
        }
    }

    /// Nondimensional molecular viscosity at nondimensional temperature `t`.
    pub fn viscosity(&self, t: f64) -> f64 {
        t.powf(1.5) * (1.0 + self.s_nondim) / (t + self.s_nondim)
    }

    /// Viscosity including the Reynolds-number scaling of the viscous terms.
    pub fn effective_viscosity(&self, t: f64) -> f64 {
        self.viscosity(t) * self.scaling
    }

    /// `mu_ref / (rho_ref * a_ref * l_ref)`, the inverse acoustic Reynolds number.
    pub fn nondim_scaling(&self) -> f64 {
        self.scaling
    }

    /// Second viscosity coefficient (Stokes hypothesis).
    pub fn lambda(&self, mu: f64) -> f64 {
        self.bulk * mu
    }

    /// Dimensional reference viscosity [Pa s].
    pub fn mu_ref(&self) -> f64 {
        self.mu_ref
    }
}
