//! Roe approximate Riemann flux and the per-direction inviscid residual pass.

use crate::axis::{Direction, Ijk};
use crate::eos::IdealGas;
use crate::input::{Reconstruction, Settings};
use crate::primvars::{PrimVars, VarArray};
use crate::proc_block::ProcBlock;
use crate::reconstruction::{face_recon_constant, face_recon_muscl, face_recon_weno};
use crate::vector3d::{UnitVecMag, Vector3d};

/// Convective flux per unit area through a face with unit normal `normal`.
pub fn convective_flux(state: &PrimVars, eos: &IdealGas, normal: &Vector3d) -> VarArray {
    let rho = state.rho();
    let vel = state.velocity();
    let vn = vel.dot(normal);
    let mass = rho * vn;
    VarArray::new([
        mass,
        mass * vel.x + state.p() * normal.x,
        mass * vel.y + state.p() * normal.y,
        mass * vel.z + state.p() * normal.z,
        mass * state.enthalpy(eos),
        mass * state.tke(),
        mass * state.omega(),
    ])
}

/// Change of the convective flux when `state` is perturbed by the
/// conservative correction `du`.
pub fn convective_flux_change(
    state: &PrimVars,
    eos: &IdealGas,
    normal: &Vector3d,
    du: &VarArray,
) -> VarArray {
    let updated = state.update_with_cons_vars(eos, du);
    convective_flux(&updated, eos, normal) - convective_flux(state, eos, normal)
}

/// Roe flux per unit area between `left` and `right` for a face whose unit
/// normal points from left to right.
pub fn roe_flux(left: &PrimVars, right: &PrimVars, eos: &IdealGas, normal: &Vector3d) -> VarArray {
    // Roe averages
    let r = (right.rho() / left.rho()).sqrt();
    let w = 1.0 / (1.0 + r);
    let rho = left.rho() * r;
    let vel = (left.velocity() + right.velocity() * r) * w;
    let h = (left.enthalpy(eos) + right.enthalpy(eos) * r) * w;
    let tke = (left.tke() + right.tke() * r) * w;
    let omega = (left.omega() + right.omega() * r) * w;
    let a = ((eos.gamma() - 1.0) * (h - 0.5 * vel.mag_sq() - tke)).sqrt();
    let vn = vel.dot(normal);

    // jumps
    let dp = right.p() - left.p();
    let drho = right.rho() - left.rho();
    let dvel = right.velocity() - left.velocity();
    let dvn = dvel.dot(normal);
    let dtke = right.tke() - left.tke();
    let domega = right.omega() - left.omega();

    let lam1 = (vn - a).abs();
    let lam2 = vn.abs();
    let lam5 = (vn + a).abs();

    let alpha1 = (dp - rho * a * dvn) / (2.0 * a * a);
    let alpha2 = drho - dp / (a * a);
    let alpha5 = (dp + rho * a * dvn) / (2.0 * a * a);

    let mut diss = VarArray::zero();
    for (strength, sign) in [(lam1 * alpha1, -1.0), (lam5 * alpha5, 1.0)] {
        let v = vel + *normal * (sign * a);
        diss += VarArray::new([
            strength,
            strength * v.x,
            strength * v.y,
            strength * v.z,
            strength * (h + sign * a * vn),
            strength * tke,
            strength * omega,
        ]);
    }

    let entropy = lam2 * alpha2;
    diss += VarArray::new([
        entropy,
        entropy * vel.x,
        entropy * vel.y,
        entropy * vel.z,
        entropy * (0.5 * vel.mag_sq() + tke),
        entropy * tke,
        entropy * omega,
    ]);

    let shear = lam2 * rho;
    let dvt = dvel - *normal * dvn;
    diss += VarArray::new([
        0.0,
        shear * dvt.x,
        shear * dvt.y,
        shear * dvt.z,
        shear * (vel.dot(&dvel) - vn * dvn + dtke),
        shear * dtke,
        shear * domega,
    ]);

    (convective_flux(left, eos, normal) + convective_flux(right, eos, normal) - diss) * 0.5
}

/// Inviscid spectral radius of a cell along one direction, using the
/// average of its lower and upper faces.
pub fn inviscid_spectral_radius(
    state: &PrimVars,
    lower: &UnitVecMag,
    upper: &UnitVecMag,
    eos: &IdealGas,
) -> f64 {
    let normal = (lower.unit() + upper.unit()).normalize();
    let area = 0.5 * (lower.mag() + upper.mag());
    (state.velocity().dot(&normal).abs() + state.sos(eos)) * area
}

impl ProcBlock {
    /// Width of cell `ijk` along `dir`, measured between its face centers.
    pub(crate) fn cell_width(&self, dir: Direction, ijk: Ijk) -> f64 {
        let d = dir.index();
        self.f_center[d][dir.shift(ijk, 1)].distance(&self.f_center[d][ijk])
    }

    /// Reconstruct the state at the face of cell `upwind1` that lies
    /// `toward` (+1 or -1) along `dir`.
    fn face_state(&self, dir: Direction, upwind1: Ijk, toward: i32, settings: &Settings) -> PrimVars {
        let cell = |offset: i32| dir.shift(upwind1, offset * toward);
        match settings.reconstruction {
            Reconstruction::FirstOrder => face_recon_constant(&self.state[upwind1]),
            _ if self.num_ghosts < 2 => face_recon_constant(&self.state[upwind1]),
            Reconstruction::Weno | Reconstruction::WenoZ if self.num_ghosts >= 3 => {
                let stencil: [Ijk; 5] = std::array::from_fn(|c| cell(c as i32 - 2));
                face_recon_weno(
                    stencil.map(|c| &self.state[c]),
                    stencil.map(|c| self.cell_width(dir, c)),
                    settings.reconstruction == Reconstruction::WenoZ,
                )
            }
            _ => {
                let w_up2 = self.cell_width(dir, cell(-1));
                let w_up1 = self.cell_width(dir, upwind1);
                let w_down = self.cell_width(dir, cell(1));
                face_recon_muscl(
                    &self.state[cell(-1)],
                    &self.state[upwind1],
                    &self.state[cell(1)],
                    settings.kappa,
                    settings.limiter,
                    0.5 * w_up1,
                    0.5 * (w_up2 + w_up1),
                    0.5 * w_down,
                )
            }
        }
    }

    /// Inviscid flux through every face normal to `dir`, including the
    /// boundary faces. The flux is added to the residual of the physical
    /// cell below each face and subtracted from the physical cell above it,
    /// and each physical cell gets its spectral radius along `dir`.
    pub fn calc_inviscid_flux(&mut self, dir: Direction, settings: &Settings) {
        let eos = &settings.eos;
        let n = self.num(dir);
        let (t1, t2) = dir.tangents();
        let d = dir.index();
        for b in 0..self.num(t2) {
            for a in 0..self.num(t1) {
                for f in 0..=n {
                    let cell = |c: i32| dir.to_ijk(c, a, b);
                    let face = cell(f);
                    let area = self.f_area[d][face];

                    let left = self.face_state(dir, cell(f - 1), 1, settings);
                    let right = self.face_state(dir, cell(f), -1, settings);
                    let flux = roe_flux(&left, &right, eos, &area.unit()) * area.mag();

                    if f > 0 {
                        self.residual[cell(f - 1)] += flux;
                        let lower = self.f_area[d][cell(f - 1)];
                        self.avg_wave_speed[cell(f - 1)] +=
                            inviscid_spectral_radius(&self.state[cell(f - 1)], &lower, &area, eos);
                    }
                    if f < n {
                        self.residual[cell(f)] -= flux;
                    }
                }
            }
        }
    }
}
