//! Face reconstruction: limited MUSCL extrapolation for the inviscid flux and
//! distance-weighted interpolation for the viscous flux.

use std::ops::{Add, Mul};

use crate::error::SolverError;
use crate::primvars::{PrimVars, NUM_VARS};

const TINY: f64 = 1.0e-30;

/// Slope limiter applied to MUSCL reconstruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Limiter {
    None,
    VanAlbada,
    Minmod,
}

impl Limiter {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "none" => Ok(Self::None),
            "vanAlbada" => Ok(Self::VanAlbada),
            "minmod" => Ok(Self::Minmod),
            other => Err(SolverError::UnknownOption {
                option: "limiter",
                value: other.to_string(),
            }),
        }
    }

    /// Limiter value for the ratio `r` of consecutive solution jumps.
    pub fn limit(self, r: f64) -> f64 {
        match self {
            Self::None => 1.0,
            Self::VanAlbada => {
                if r > 0.0 {
                    (r * r + r) / (1.0 + r * r)
                } else {
                    0.0
                }
            }
            Self::Minmod => r.min(1.0).max(0.0),
        }
    }
}

fn guard(v: f64) -> f64 {
    if v.abs() < TINY {
        TINY.copysign(if v == 0.0 { 1.0 } else { v })
    } else {
        v
    }
}

/// MUSCL-kappa face state extrapolated from `upwind1` toward the face.
///
/// * `uw` - distance from the `upwind1` center to the face center.
/// * `uw2` - distance between the `upwind2` and `upwind1` centers.
/// * `dw` - distance from the face center to the `downwind1` center.
#[allow(clippy::too_many_arguments)]
pub fn face_recon_muscl(
    upwind2: &PrimVars,
    upwind1: &PrimVars,
    downwind1: &PrimVars,
    kappa: f64,
    limiter: Limiter,
    uw: f64,
    uw2: f64,
    dw: f64,
) -> PrimVars {
    let scale_minus = 2.0 * uw / uw2.max(TINY);
    let scale_plus = 2.0 * uw / (uw + dw).max(TINY);
    let mut face = *upwind1;
    for n in 0..NUM_VARS {
        let d_minus = (upwind1[n] - upwind2[n]) * scale_minus;
        let d_plus = (downwind1[n] - upwind1[n]) * scale_plus;
        let r = d_plus / guard(d_minus);
        let r_inv = d_minus / guard(d_plus);
        face[n] += 0.25
            * ((1.0 - kappa) * limiter.limit(r) * d_minus
                + (1.0 + kappa) * limiter.limit(r_inv) * d_plus);
    }
    face
}

/// First-order face state: the adjacent cell's value.
pub fn face_recon_constant(upwind1: &PrimVars) -> PrimVars {
    *upwind1
}

/// Interpolate to a face from the cells on either side, weighting each cell
/// by the distance of the other one so the nearer cell dominates.
pub fn face_recon_central<T>(lower: T, upper: T, dist_lower: f64, dist_upper: f64) -> T
where
    T: Copy + Add<Output = T> + Mul<f64, Output = T>,
{
    let total = dist_lower + dist_upper;
    lower * (dist_upper / total) + upper * (dist_lower / total)
}

/// Signed length between cell interfaces `start` and `end` of a stencil
/// whose cells have widths `widths` (interface `p` is the lower edge of
/// cell `p`).
fn stencil_width(widths: &[f64], start: i32, end: i32) -> f64 {
    let span = |lo: i32, hi: i32| widths[lo as usize..hi as usize].iter().sum::<f64>();
    match start.cmp(&end) {
        std::cmp::Ordering::Less => span(start, end),
        std::cmp::Ordering::Greater => -span(end, start),
        std::cmp::Ordering::Equal => 0.0,
    }
}

/// Weights of the polynomial of degree `degree` reconstructed at the upper
/// interface of cell `up1` from the cell averages starting `shift` cells
/// below it, on cells of arbitrary width.
pub fn lagrange_coeff(widths: &[f64], degree: usize, shift: i32, up1: i32) -> Vec<f64> {
    let order = degree as i32 + 1;
    let first = up1 - shift;
    (0..order)
        .map(|j| {
            let mut coeff = 0.0;
            for m in j + 1..=order {
                let mut numer = 0.0;
                let mut denom = 1.0;
                for l in (0..=order).filter(|&l| l != m) {
                    numer += (0..=order)
                        .filter(|&q| q != m && q != l)
                        .map(|q| stencil_width(widths, first + q, up1 + 1))
                        .product::<f64>();
                    denom *= stencil_width(widths, first + l, first + m);
                }
                coeff += numer / denom;
            }
            coeff * widths[(first + j) as usize]
        })
        .collect()
}

/// Second derivative through three neighboring cell averages.
fn derivative_2nd(x: [f64; 3], y: [f64; 3]) -> f64 {
    let h_lower = 0.5 * (x[0] + x[1]);
    let h_upper = 0.5 * (x[1] + x[2]);
    2.0 * ((y[2] - y[1]) / h_upper - (y[1] - y[0]) / h_lower) / (h_lower + h_upper)
}

fn beta_integral(d1: f64, d2: f64, dx: f64, x: f64) -> f64 {
    (d1 * d1 * x + d1 * d2 * x * x + d2 * d2 * x.powi(3) / 3.0) * dx + d2 * d2 * x * dx.powi(3)
}

/// Smoothness indicator of a three-cell stencil, integrated over the cell
/// at position `at` (0..3) within it.
fn smoothness(x: [f64; 3], y: [f64; 3], at: usize) -> f64 {
    let d2 = derivative_2nd(x, y);
    let d1 = match at {
        0 => (y[1] - y[0]) / (0.5 * (x[1] + x[0])) - 0.5 * x[0] * d2,
        1 => (y[2] - y[1]) / (0.5 * (x[2] + x[1])) - 0.5 * x[1] * d2,
        _ => (y[2] - y[1]) / (0.5 * (x[2] + x[1])) + 0.5 * x[2] * d2,
    };
    let dx = x[at];
    beta_integral(d1, d2, dx, 0.5 * dx) - beta_integral(d1, d2, dx, -0.5 * dx)
}

/// Fifth-order WENO face state on a stencil of possibly nonuniform cells.
///
/// `states` and `widths` run from the third upwind cell to the second
/// downwind cell; the face is the upper interface of `states[2]`. With
/// `z_weights` the nonlinear weights follow the WENO-Z form.
pub fn face_recon_weno(states: [&PrimVars; 5], widths: [f64; 5], z_weights: bool) -> PrimVars {
    const EPS: f64 = 1.0e-6;
    let small: [Vec<f64>; 3] = [
        lagrange_coeff(&widths, 2, 2, 2),
        lagrange_coeff(&widths, 2, 1, 2),
        lagrange_coeff(&widths, 2, 0, 2),
    ];
    let full = lagrange_coeff(&widths, 4, 2, 2);
    let lw0 = full[0] / small[0][0];
    let lw2 = full[4] / small[2][2];
    let linear = [lw0, 1.0 - lw0 - lw2, lw2];

    let mut face = *states[2];
    for n in 0..NUM_VARS {
        let y: [f64; 5] = std::array::from_fn(|c| states[c][n]);
        let candidate: [f64; 3] = std::array::from_fn(|r| {
            (0..3).map(|c| small[r][c] * y[r + c]).sum::<f64>()
        });
        let beta: [f64; 3] = std::array::from_fn(|r| {
            let x = [widths[r], widths[r + 1], widths[r + 2]];
            smoothness(x, [y[r], y[r + 1], y[r + 2]], 2 - r)
        });
        let tau = (beta[0] - beta[2]).abs();
        let raw: [f64; 3] = std::array::from_fn(|r| {
            if z_weights {
                linear[r] * (1.0 + tau / (EPS + beta[r]))
            } else {
                linear[r] / (EPS + beta[r]).powi(2)
            }
        });
        let total: f64 = raw.iter().sum();
        face[n] = (0..3).map(|r| raw[r] / total * candidate[r]).sum();
    }
    face
}
