//! Calorically perfect gas in nondimensional form.
//!
//! With the freestream as reference, `T = gamma * p / rho` and the reference
//! sound speed is one.

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IdealGas {
    gamma: f64,
    prandtl: f64,
    turb_prandtl: f64,
}

impl IdealGas {
    pub fn new(gamma: f64, prandtl: f64, turb_prandtl: f64) -> Self {
        Self {
            gamma,
            prandtl,
            turb_prandtl,
        }
    }

    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    #[inline]
    pub fn prandtl(&self) -> f64 {
        self.prandtl
    }

    #[inline]
    pub fn turb_prandtl(&self) -> f64 {
        self.turb_prandtl
    }

    #[inline]
    pub fn internal_energy(&self, p: f64, rho: f64) -> f64 {
        p / ((self.gamma - 1.0) * rho)
    }

    #[inline]
    pub fn pressure_from_internal_energy(&self, rho: f64, e: f64) -> f64 {
        (self.gamma - 1.0) * rho * e
    }

    #[inline]
    pub fn sound_speed(&self, p: f64, rho: f64) -> f64 {
        (self.gamma * p / rho).sqrt()
    }

    #[inline]
    pub fn temperature(&self, p: f64, rho: f64) -> f64 {
        self.gamma * p / rho
    }

    #[inline]
    pub fn density(&self, p: f64, t: f64) -> f64 {
        self.gamma * p / t
    }

    /// Pressure from density and temperature.
    #[inline]
    pub fn pressure(&self, rho: f64, t: f64) -> f64 {
        rho * t / self.gamma
    }

    /// Heat conduction coefficient for the nondimensional temperature.
    pub fn conductivity(&self, mu: f64, eddy_visc: f64) -> f64 {
        (mu / self.prandtl + eddy_visc / self.turb_prandtl) / (self.gamma - 1.0)
    }
}

impl Default for IdealGas {
    fn default() -> Self {
        Self::new(1.4, 0.72, 0.9)
    }
}
