//! Viscous fluxes with Green-Gauss face gradients on dual control volumes.
//!
//! The dual volume of a face straddles it from the center of the cell
//! below to the center of the cell above. Its faces along the flux
//! direction sit at the two cell centers; its tangential faces are the
//! averages of the tangential faces of both cells, carrying the average of
//! the four cells around them. Ten cells take part in each face gradient.

use crate::axis::{Direction, Ijk};
use crate::input::Settings;
use crate::primvars::{PrimVars, VarArray};
use crate::proc_block::ProcBlock;
use crate::reconstruction::face_recon_central;
use crate::turbulence::TurbulenceModel;
use crate::vector3d::{Tensor, UnitVecMag, Vector3d};

/// Gradients of the quantities the viscous flux and turbulence sources need.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FaceGradients {
    pub velocity: Tensor,
    pub temperature: Vector3d,
    pub tke: Vector3d,
    pub omega: Vector3d,
}

impl FaceGradients {
    fn accumulate(&mut self, state: &PrimVars, temperature: f64, area: &Vector3d) {
        self.velocity += Tensor::outer(area, &state.velocity());
        self.temperature += *area * temperature;
        self.tke += *area * state.tke();
        self.omega += *area * state.omega();
    }

    fn scaled(self, factor: f64) -> Self {
        Self {
            velocity: self.velocity * factor,
            temperature: self.temperature * factor,
            tke: self.tke * factor,
            omega: self.omega * factor,
        }
    }
}

/// Shear stress acting on a surface with (unit or area) normal `area`.
pub fn tau_normal(vel_grad: &Tensor, area: &Vector3d, mu: f64, eddy: f64, lambda: f64) -> Vector3d {
    *area * (lambda * vel_grad.trace())
        + (vel_grad.mat_mult(area) + vel_grad.transpose().mat_mult(area)) * (mu + eddy)
}

/// Viscous flux per unit area through a face with unit normal `normal`.
pub fn viscous_flux(
    state: &PrimVars,
    grads: &FaceGradients,
    normal: &Vector3d,
    settings: &Settings,
    eddy: f64,
    eddy_no_lim: f64,
) -> VarArray {
    let eos = &settings.eos;
    let mu = settings.suth.effective_viscosity(state.temperature(eos));
    let lambda = settings.suth.lambda(mu + eddy);
    let tau = tau_normal(&grads.velocity, normal, mu, eddy, lambda);
    let heat = eos.conductivity(mu, eddy) * grads.temperature.dot(normal);

    let mut flux = VarArray::new([
        0.0,
        tau.x,
        tau.y,
        tau.z,
        tau.dot(&state.velocity()) + heat,
        0.0,
        0.0,
    ]);
    if settings.is_turbulent() {
        let (sigma_k, sigma_w) = settings.turbulence.diffusion_coefficients();
        flux[5] = (mu + sigma_k * eddy_no_lim) * grads.tke.dot(normal);
        flux[6] = (mu + sigma_w * eddy_no_lim) * grads.omega.dot(normal);
    }
    flux
}

/// Viscous spectral radius of a cell along one direction.
pub fn viscous_spectral_radius(
    state: &PrimVars,
    lower: &UnitVecMag,
    upper: &UnitVecMag,
    vol: f64,
    settings: &Settings,
    eddy: f64,
) -> f64 {
    let eos = &settings.eos;
    let mu = settings.suth.effective_viscosity(state.temperature(eos));
    let area = 0.5 * (lower.mag() + upper.mag());
    let coeff = (4.0 / (3.0 * state.rho())).max(eos.gamma() / state.rho());
    coeff * (mu / eos.prandtl() + eddy / eos.turb_prandtl()) * area * area / vol
}

impl ProcBlock {
    fn temperature(&self, ijk: Ijk, settings: &Settings) -> f64 {
        self.state[ijk].temperature(&settings.eos)
    }

    /// Green-Gauss gradients on the dual volume of the face between `lower`
    /// and `upper`, which are neighbors along `dir`.
    pub fn face_gradients(
        &self,
        dir: Direction,
        lower: Ijk,
        upper: Ijk,
        settings: &Settings,
    ) -> FaceGradients {
        let d = dir.index();
        let mut grads = FaceGradients::default();

        let area_lower = (self.f_area[d][lower].vector() + self.f_area[d][upper].vector()) * 0.5;
        let area_upper =
            (self.f_area[d][upper].vector() + self.f_area[d][dir.shift(upper, 1)].vector()) * 0.5;
        grads.accumulate(&self.state[lower], self.temperature(lower, settings), &-area_lower);
        grads.accumulate(&self.state[upper], self.temperature(upper, settings), &area_upper);

        let (t1, t2) = dir.tangents();
        for tan in [t1, t2] {
            let td = tan.index();
            for (offset, face_shift, sign) in [(-1, 0, -1.0), (1, 1, 1.0)] {
                let area = (self.f_area[td][tan.shift(lower, face_shift)].vector()
                    + self.f_area[td][tan.shift(upper, face_shift)].vector())
                    * (0.5 * sign);
                let cells = [lower, upper, tan.shift(lower, offset), tan.shift(upper, offset)];
                let state = cells
                    .iter()
                    .fold(PrimVars::default(), |acc, c| acc + self.state[*c])
                    * 0.25;
                let temperature =
                    cells.iter().map(|c| self.temperature(*c, settings)).sum::<f64>() * 0.25;
                grads.accumulate(&state, temperature, &area);
            }
        }

        let vol = 0.5 * (self.vol[lower] + self.vol[upper]);
        grads.scaled(1.0 / vol)
    }

    /// Eddy viscosity of any cell. Interblock ghosts carry the partner's
    /// limited value, other ghosts the unlimited closure of their state.
    pub(crate) fn cell_eddy_visc(&self, ijk: Ijk, settings: &Settings) -> f64 {
        if settings.is_turbulent() {
            self.eddy_visc[ijk]
        } else {
            0.0
        }
    }

    /// Viscous flux through every face normal to `dir`. The flux is
    /// subtracted from the physical cell below each face and added to the
    /// physical cell above; one sixth of each face gradient goes to the
    /// cell-centered gradients of both neighbors.
    pub fn calc_viscous_flux(&mut self, dir: Direction, settings: &Settings) {
        let n = self.num(dir);
        let (t1, t2) = dir.tangents();
        let d = dir.index();
        let turbulent = settings.is_turbulent();
        for b in 0..self.num(t2) {
            for a in 0..self.num(t1) {
                for f in 0..=n {
                    let lower = dir.to_ijk(f - 1, a, b);
                    let upper = dir.to_ijk(f, a, b);
                    let area = self.f_area[d][upper];
                    let fc = self.f_center[d][upper];

                    let dist_lower = fc.distance(&self.center[lower]);
                    let dist_upper = fc.distance(&self.center[upper]);
                    let state = face_recon_central(
                        self.state[lower],
                        self.state[upper],
                        dist_lower,
                        dist_upper,
                    );
                    let grads = self.face_gradients(dir, lower, upper, settings);
                    let (eddy, eddy_no_lim) = if turbulent {
                        (
                            settings.turbulence.eddy_visc(&state, &grads.velocity),
                            settings.turbulence.eddy_visc_no_lim(&state),
                        )
                    } else {
                        (0.0, 0.0)
                    };
                    let flux = viscous_flux(&state, &grads, &area.unit(), settings, eddy, eddy_no_lim)
                        * area.mag();

                    let sixth = grads.scaled(1.0 / 6.0);
                    if f > 0 {
                        self.residual[lower] -= flux;
                        self.add_cell_gradients(lower, &sixth);
                        let lower_area = self.f_area[d][lower];
                        let eddy_cell = self.cell_eddy_visc(lower, settings);
                        self.avg_wave_speed[lower] += viscous_spectral_radius(
                            &self.state[lower],
                            &lower_area,
                            &area,
                            self.vol[lower],
                            settings,
                            eddy_cell,
                        );
                    }
                    if f < n {
                        self.residual[upper] += flux;
                        self.add_cell_gradients(upper, &sixth);
                    }
                }
            }
        }
    }

    fn add_cell_gradients(&mut self, ijk: Ijk, grads: &FaceGradients) {
        self.vel_grad[ijk] += grads.velocity;
        self.temp_grad[ijk] += grads.temperature;
        self.tke_grad[ijk] += grads.tke;
        self.omega_grad[ijk] += grads.omega;
    }
}
