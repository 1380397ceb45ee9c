//! Flow state in primitive form and the generic conservative-variable array.

use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

use crate::eos::IdealGas;
use crate::vector3d::Vector3d;

/// Five flow equations plus two turbulence transport equations.
pub const NUM_VARS: usize = 7;
/// Number of mean-flow equations.
pub const NUM_FLOW: usize = 5;

/// Conservative variables, residuals and corrections:
/// `[rho, rho*u, rho*v, rho*w, rho*E, rho*k, rho*omega]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VarArray {
    pub data: [f64; NUM_VARS],
}

/// Primitive variables `[rho, u, v, w, p, k, omega]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PrimVars {
    pub data: [f64; NUM_VARS],
}

macro_rules! elementwise_ops {
    ($t:ty) => {
        impl Add for $t {
            type Output = Self;
            fn add(mut self, o: Self) -> Self {
                for (a, b) in self.data.iter_mut().zip(o.data.iter()) {
                    *a += b;
                }
                self
            }
        }

        impl Sub for $t {
            type Output = Self;
            fn sub(mut self, o: Self) -> Self {
                for (a, b) in self.data.iter_mut().zip(o.data.iter()) {
                    *a -= b;
                }
                self
            }
        }

        impl Mul<f64> for $t {
            type Output = Self;
            fn mul(mut self, s: f64) -> Self {
                for a in self.data.iter_mut() {
                    *a *= s;
                }
                self
            }
        }

        impl Div<f64> for $t {
            type Output = Self;
            fn div(mut self, s: f64) -> Self {
                for a in self.data.iter_mut() {
                    *a /= s;
                }
                self
            }
        }

        impl Neg for $t {
            type Output = Self;
            fn neg(self) -> Self {
                self * -1.0
            }
        }

        impl AddAssign for $t {
            fn add_assign(&mut self, o: Self) {
                for (a, b) in self.data.iter_mut().zip(o.data.iter()) {
                    *a += b;
                }
            }
        }

        impl SubAssign for $t {
            fn sub_assign(&mut self, o: Self) {
                for (a, b) in self.data.iter_mut().zip(o.data.iter()) {
                    *a -= b;
                }
            }
        }

        impl Index<usize> for $t {
            type Output = f64;
            fn index(&self, idx: usize) -> &f64 {
                &self.data[idx]
            }
        }

        impl IndexMut<usize> for $t {
            fn index_mut(&mut self, idx: usize) -> &mut f64 {
                &mut self.data[idx]
            }
        }
    };
}

elementwise_ops!(VarArray);
elementwise_ops!(PrimVars);

impl VarArray {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(data: [f64; NUM_VARS]) -> Self {
        Self { data }
    }

    pub fn mass(&self) -> f64 {
        self.data[0]
    }

    pub fn momentum(&self) -> Vector3d {
        Vector3d::new(self.data[1], self.data[2], self.data[3])
    }

    pub fn energy(&self) -> f64 {
        self.data[4]
    }

    /// Sum of squared components over the first `neq` equations.
    pub fn sum_sq(&self, neq: usize) -> f64 {
        self.data[..neq].iter().map(|v| v * v).sum()
    }

    /// Component-wise product.
    pub fn product(&self, other: &Self) -> Self {
        let mut out = *self;
        for (a, b) in out.data.iter_mut().zip(other.data.iter()) {
            *a *= b;
        }
        out
    }

    /// Largest absolute component over the first `neq` equations and its index.
    pub fn max_abs(&self, neq: usize) -> (f64, usize) {
        let mut best = (0.0, 0);
        for (idx, v) in self.data[..neq].iter().enumerate() {
            if v.abs() > best.0 {
                best = (v.abs(), idx);
            }
        }
        best
    }
}

impl PrimVars {
    /// Laminar state.
    pub fn new(rho: f64, velocity: Vector3d, p: f64) -> Self {
        Self {
            data: [rho, velocity.x, velocity.y, velocity.z, p, 0.0, 0.0],
        }
    }

    pub fn with_turbulence(mut self, tke: f64, omega: f64) -> Self {
        self.data[5] = tke;
        self.data[6] = omega;
        self
    }

    #[inline]
    pub fn rho(&self) -> f64 {
        self.data[0]
    }

    #[inline]
    pub fn u(&self) -> f64 {
        self.data[1]
    }

    #[inline]
    pub fn v(&self) -> f64 {
        self.data[2]
    }

    #[inline]
    pub fn w(&self) -> f64 {
        self.data[3]
    }

    #[inline]
    pub fn p(&self) -> f64 {
        self.data[4]
    }

    #[inline]
    pub fn tke(&self) -> f64 {
        self.data[5]
    }

    #[inline]
    pub fn omega(&self) -> f64 {
        self.data[6]
    }

    #[inline]
    pub fn velocity(&self) -> Vector3d {
        Vector3d::new(self.data[1], self.data[2], self.data[3])
    }

    pub fn set_velocity(&mut self, v: Vector3d) {
        self.data[1] = v.x;
        self.data[2] = v.y;
        self.data[3] = v.z;
    }

    pub fn set_rho(&mut self, rho: f64) {
        self.data[0] = rho;
    }

    pub fn set_p(&mut self, p: f64) {
        self.data[4] = p;
    }

    pub fn set_turbulence(&mut self, tke: f64, omega: f64) {
        self.data[5] = tke;
        self.data[6] = omega;
    }

    /// Specific total energy, turbulent kinetic energy included.
    pub fn energy(&self, eos: &IdealGas) -> f64 {
        eos.internal_energy(self.p(), self.rho()) + 0.5 * self.velocity().mag_sq() + self.tke()
    }

    /// Specific total enthalpy.
    pub fn enthalpy(&self, eos: &IdealGas) -> f64 {
        self.energy(eos) + self.p() / self.rho()
    }

    pub fn sos(&self, eos: &IdealGas) -> f64 {
        eos.sound_speed(self.p(), self.rho())
    }

    pub fn temperature(&self, eos: &IdealGas) -> f64 {
        eos.temperature(self.p(), self.rho())
    }

    pub fn is_physical(&self) -> bool {
        self.rho() > 0.0 && self.p() > 0.0 && self.rho().is_finite() && self.p().is_finite()
    }

    pub fn to_conserved(&self, eos: &IdealGas) -> VarArray {
        let rho = self.rho();
        VarArray::new([
            rho,
            rho * self.u(),
            rho * self.v(),
            rho * self.w(),
            rho * self.energy(eos),
            rho * self.tke(),
            rho * self.omega(),
        ])
    }

    pub fn from_conserved(cons: &VarArray, eos: &IdealGas) -> Self {
        let rho = cons.mass();
        let vel = cons.momentum() / rho;
        let tke = cons[5] / rho;
        let omega = cons[6] / rho;
        let e_internal = cons.energy() / rho - 0.5 * vel.mag_sq() - tke;
        let p = eos.pressure_from_internal_energy(rho, e_internal);
        Self::new(rho, vel, p).with_turbulence(tke, omega)
    }

    /// Apply a conservative-variable correction and return the new primitive state.
    pub fn update_with_cons_vars(&self, eos: &IdealGas, du: &VarArray) -> Self {
        Self::from_conserved(&(self.to_conserved(eos) + *du), eos)
    }

    /// Mirror the velocity about a plane with unit normal `normal`.
    pub fn reflect_velocity(&self, normal: &Vector3d) -> Self {
        let v = self.velocity();
        let mut out = *self;
        out.set_velocity(v - *normal * (2.0 * v.dot(normal)));
        out
    }

    /// Clamp turbulence variables to be non-negative.
    pub fn limit_turbulence(&mut self, tke_min: f64, omega_min: f64) {
        self.data[5] = self.data[5].max(tke_min);
        self.data[6] = self.data[6].max(omega_min);
    }
}
