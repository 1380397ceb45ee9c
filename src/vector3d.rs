//! Small fixed-size linear algebra used throughout the engine.

use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub, SubAssign};

/// Cartesian vector or point.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3d {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn mag_sq(&self) -> f64 {
        self.dot(self)
    }

    #[inline]
    pub fn mag(&self) -> f64 {
        self.mag_sq().sqrt()
    }

    /// Unit vector in the same direction; the zero vector maps to itself.
    pub fn normalize(&self) -> Self {
        let m = self.mag();
        if m > 0.0 {
            *self / m
        } else {
            *self
        }
    }

    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).mag()
    }

    pub fn sum(&self) -> f64 {
        self.x + self.y + self.z
    }
}

impl Add for Vector3d {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vector3d {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f64> for Vector3d {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mul<Vector3d> for f64 {
    type Output = Vector3d;
    fn mul(self, v: Vector3d) -> Vector3d {
        v * self
    }
}

impl Div<f64> for Vector3d {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        Self::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vector3d {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vector3d {
    fn add_assign(&mut self, o: Self) {
        self.x += o.x;
        self.y += o.y;
        self.z += o.z;
    }
}

impl SubAssign for Vector3d {
    fn sub_assign(&mut self, o: Self) {
        self.x -= o.x;
        self.y -= o.y;
        self.z -= o.z;
    }
}

impl MulAssign<f64> for Vector3d {
    fn mul_assign(&mut self, s: f64) {
        self.x *= s;
        self.y *= s;
        self.z *= s;
    }
}

impl Index<usize> for Vector3d {
    type Output = f64;
    fn index(&self, idx: usize) -> &f64 {
        match idx {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3d index {idx} out of range"),
        }
    }
}

/// Face area stored as a unit normal and its magnitude.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UnitVecMag {
    unit: Vector3d,
    mag: f64,
}

impl UnitVecMag {
    pub fn new(v: Vector3d) -> Self {
        Self {
            unit: v.normalize(),
            mag: v.mag(),
        }
    }

    pub fn from_parts(unit: Vector3d, mag: f64) -> Self {
        Self { unit, mag }
    }

    #[inline]
    pub fn unit(&self) -> Vector3d {
        self.unit
    }

    #[inline]
    pub fn mag(&self) -> f64 {
        self.mag
    }

    /// Full area vector (unit normal scaled by magnitude).
    #[inline]
    pub fn vector(&self) -> Vector3d {
        self.unit * self.mag
    }
}

impl Neg for UnitVecMag {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            unit: -self.unit,
            mag: self.mag,
        }
    }
}

/// Dense 3x3 tensor. Row `r` holds the derivatives along axis `r`, so a
/// velocity gradient has `data[r][c] = d(v_c)/d(x_r)`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Tensor {
    pub data: [[f64; 3]; 3],
}

impl Tensor {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn identity() -> Self {
        let mut t = Self::zero();
        for r in 0..3 {
            t.data[r][r] = 1.0;
        }
        t
    }

    /// Outer product `a ⊗ b` (rows follow `a`).
    pub fn outer(a: &Vector3d, b: &Vector3d) -> Self {
        let mut t = Self::zero();
        for r in 0..3 {
            for c in 0..3 {
                t.data[r][c] = a[r] * b[c];
            }
        }
        t
    }

    pub fn trace(&self) -> f64 {
        self.data[0][0] + self.data[1][1] + self.data[2][2]
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zero();
        for r in 0..3 {
            for c in 0..3 {
                t.data[r][c] = self.data[c][r];
            }
        }
        t
    }

    /// Tensor-vector product, each row dotted with `v`.
    pub fn mat_mult(&self, v: &Vector3d) -> Vector3d {
        let row = |r: usize| self.data[r][0] * v.x + self.data[r][1] * v.y + self.data[r][2] * v.z;
        Vector3d::new(row(0), row(1), row(2))
    }

    /// Full contraction `A : B`.
    pub fn double_dot(&self, other: &Self) -> f64 {
        let mut sum = 0.0;
        for r in 0..3 {
            for c in 0..3 {
                sum += self.data[r][c] * other.data[r][c];
            }
        }
        sum
    }
}

impl Add for Tensor {
    type Output = Self;
    fn add(mut self, o: Self) -> Self {
        for r in 0..3 {
            for c in 0..3 {
                self.data[r][c] += o.data[r][c];
            }
        }
        self
    }
}

impl Sub for Tensor {
    type Output = Self;
    fn sub(mut self, o: Self) -> Self {
        for r in 0..3 {
            for c in 0..3 {
                self.data[r][c] -= o.data[r][c];
            }
        }
        self
    }
}

impl Mul<f64> for Tensor {
    type Output = Self;
    fn mul(mut self, s: f64) -> Self {
        for row in self.data.iter_mut() {
            for v in row.iter_mut() {
                *v *= s;
            }
        }
        self
    }
}

impl Div<f64> for Tensor {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        self * (1.0 / s)
    }
}

impl AddAssign for Tensor {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}
