//! Solver configuration.
//!
//! [`Input`] mirrors the options of an input file verbatim (string-keyed
//! schemes, dimensional freestream). [`Input::validate`] turns it into the
//! nondimensional, enum-typed [`Settings`] the engine consumes.

use serde::{Deserialize, Serialize};

use crate::eos::IdealGas;
use crate::error::SolverError;
use crate::primvars::PrimVars;
use crate::reconstruction::Limiter;
use crate::turbulence::{TurbModel, TurbulenceModel};
use crate::vector3d::Vector3d;
use crate::viscosity::Sutherland;

fn default_equation_set() -> String {
    "navierStokes".into()
}
fn default_time_integration() -> String {
    "implicitEuler".into()
}
fn default_matrix_solver() -> String {
    "lusgs".into()
}
fn default_reconstruction() -> String {
    "constant".into()
}
fn default_limiter() -> String {
    "none".into()
}
fn default_turbulence() -> String {
    "none".into()
}

/// Dimensional flow condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowCondition {
    /// [Pa]
    pub pressure: f64,
    /// [kg/m^3]
    pub density: f64,
    /// [m/s]
    pub velocity: [f64; 3],
    pub turbulence_intensity: f64,
    pub eddy_viscosity_ratio: f64,
}

impl Default for FlowCondition {
    fn default() -> Self {
        Self {
            pressure: 101_300.0,
            density: 1.2256,
            velocity: [68.0, 0.0, 0.0],
            turbulence_intensity: 0.01,
            eddy_viscosity_ratio: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Input {
    #[serde(default = "default_equation_set")]
    pub equation_set: String,
    #[serde(default = "default_time_integration")]
    pub time_integration: String,
    #[serde(default = "default_matrix_solver")]
    pub matrix_solver: String,
    #[serde(default = "default_reconstruction")]
    pub face_reconstruction: String,
    #[serde(default = "default_limiter")]
    pub limiter: String,
    #[serde(default = "default_turbulence")]
    pub turbulence_model: String,
    pub kappa: f64,
    pub cfl: f64,
    /// Fixed dimensional time step [s]; zero selects local time stepping.
    pub dt: f64,
    pub iterations: usize,
    pub nonlinear_iterations: usize,
    pub theta: Option<f64>,
    pub zeta: Option<f64>,
    pub matrix_relaxation: f64,
    /// Pseudo-time CFL of dual time stepping; zero disables the term.
    pub dual_time_cfl: f64,
    pub num_ghosts: i32,
    pub matrix_sweeps: usize,
    pub output_frequency: usize,
    pub gamma: f64,
    /// [J/(kg K)]
    pub gas_constant: f64,
    pub prandtl: f64,
    pub turbulent_prandtl: f64,
    /// Grid length unit [m].
    pub l_ref: f64,
    pub freestream: FlowCondition,
    /// Inflow condition of subsonic inlets; defaults to the freestream.
    pub inlet: Option<FlowCondition>,
    /// Back pressure of subsonic outlets [Pa]; defaults to freestream pressure.
    pub outlet_pressure: Option<f64>,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            equation_set: default_equation_set(),
            time_integration: default_time_integration(),
            matrix_solver: default_matrix_solver(),
            face_reconstruction: default_reconstruction(),
            limiter: default_limiter(),
            turbulence_model: default_turbulence(),
            kappa: -1.0,
            cfl: 1.0,
            dt: 0.0,
            iterations: 1,
            nonlinear_iterations: 1,
            theta: None,
            zeta: None,
            matrix_relaxation: 1.0,
            dual_time_cfl: 0.0,
            num_ghosts: 2,
            matrix_sweeps: 1,
            output_frequency: 100,
            gamma: 1.4,
            gas_constant: 287.058,
            prandtl: 0.72,
            turbulent_prandtl: 0.9,
            l_ref: 1.0,
            freestream: FlowCondition::default(),
            inlet: None,
            outlet_pressure: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EquationSet {
    Euler,
    NavierStokes,
    Rans,
}

impl EquationSet {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "euler" => Ok(Self::Euler),
            "navierStokes" => Ok(Self::NavierStokes),
            "rans" => Ok(Self::Rans),
            other => Err(SolverError::UnknownOption {
                option: "equation set",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_viscous(self) -> bool {
        !matches!(self, Self::Euler)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeIntegration {
    ExplicitEuler,
    Rk4,
    ImplicitEuler,
    CrankNicholson,
    Bdf2,
}

impl TimeIntegration {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "explicitEuler" => Ok(Self::ExplicitEuler),
            "rk4" => Ok(Self::Rk4),
            "implicitEuler" => Ok(Self::ImplicitEuler),
            "crankNicholson" => Ok(Self::CrankNicholson),
            "bdf2" => Ok(Self::Bdf2),
            other => Err(SolverError::UnknownOption {
                option: "time integration",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_implicit(self) -> bool {
        !matches!(self, Self::ExplicitEuler | Self::Rk4)
    }

    /// Beam-Warming theta.
    pub fn theta(self) -> f64 {
        match self {
            Self::CrankNicholson => 0.5,
            _ => 1.0,
        }
    }

    /// Beam-Warming zeta.
    pub fn zeta(self) -> f64 {
        match self {
            Self::Bdf2 => 0.5,
            _ => 0.0,
        }
    }

    /// Number of Runge-Kutta stages.
    pub fn stages(self) -> usize {
        match self {
            Self::Rk4 => 4,
            _ => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatrixSolver {
    Lusgs,
    Dplur,
}

impl MatrixSolver {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "lusgs" | "blusgs" => Ok(Self::Lusgs),
            "dplur" | "bdplur" => Ok(Self::Dplur),
            other => Err(SolverError::UnknownOption {
                option: "matrix solver",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reconstruction {
    FirstOrder,
    Muscl,
    Weno,
    WenoZ,
}

impl Reconstruction {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "constant" | "first" => Ok(Self::FirstOrder),
            "thirdOrder" | "second" | "muscl" => Ok(Self::Muscl),
            "weno" => Ok(Self::Weno),
            "wenoZ" => Ok(Self::WenoZ),
            other => Err(SolverError::UnknownOption {
                option: "face reconstruction",
                value: other.to_string(),
            }),
        }
    }

    /// Ghost layers the reconstruction stencil reaches into.
    pub fn ghosts_needed(self) -> i32 {
        match self {
            Self::FirstOrder => 1,
            Self::Muscl => 2,
            Self::Weno | Self::WenoZ => 3,
        }
    }
}

/// Validated, nondimensional configuration.
#[derive(Clone, Debug)]
pub struct Settings {
    pub equation_set: EquationSet,
    pub time_integration: TimeIntegration,
    pub matrix_solver: MatrixSolver,
    pub reconstruction: Reconstruction,
    pub limiter: Limiter,
    pub turbulence: TurbModel,
    pub kappa: f64,
    pub cfl: f64,
    /// Nondimensional fixed time step, zero for local time stepping.
    pub dt: f64,
    pub iterations: usize,
    pub nonlinear_iterations: usize,
    pub theta: f64,
    pub zeta: f64,
    pub matrix_relaxation: f64,
    pub dual_time_cfl: f64,
    pub num_ghosts: i32,
    pub matrix_sweeps: usize,
    pub output_frequency: usize,
    pub eos: IdealGas,
    pub suth: Sutherland,
    pub freestream: PrimVars,
    pub inlet: PrimVars,
    pub outlet_pressure: f64,
    pub t_ref: f64,
    pub a_ref: f64,
    pub rho_ref: f64,
}

impl Input {
    /// Resolve every string-keyed option and nondimensionalize the flow
    /// conditions against the freestream.
    pub fn validate(&self) -> Result<Settings, SolverError> {
        let equation_set = EquationSet::from_name(&self.equation_set)?;
        let time_integration = TimeIntegration::from_name(&self.time_integration)?;
        let matrix_solver = MatrixSolver::from_name(&self.matrix_solver)?;
        let reconstruction = Reconstruction::from_name(&self.face_reconstruction)?;
        let limiter = Limiter::from_name(&self.limiter)?;
        let turbulence = TurbModel::from_name(&self.turbulence_model)?;
        if self.dt <= 0.0 && self.cfl <= 0.0 {
            return Err(SolverError::MissingTimeStep);
        }
        if self.num_ghosts < reconstruction.ghosts_needed() {
            return Err(SolverError::UnknownOption {
                option: "number of ghost layers",
                value: self.num_ghosts.to_string(),
            });
        }

        let fs = &self.freestream;
        let t_ref = fs.pressure / (fs.density * self.gas_constant);
        let a_ref = (self.gamma * self.gas_constant * t_ref).sqrt();
        let rho_ref = fs.density;
        let eos = IdealGas::new(self.gamma, self.prandtl, self.turbulent_prandtl);
        let suth = Sutherland::new(t_ref, rho_ref, a_ref, self.l_ref);

        let nondim = |cond: &FlowCondition| -> PrimVars {
            let vel = Vector3d::from_array(cond.velocity) / a_ref;
            let rho = cond.density / rho_ref;
            let p = cond.pressure / (rho_ref * a_ref * a_ref);
            let mut state = PrimVars::new(rho, vel, p);
            if turbulence.is_rans() {
                let t = eos.temperature(p, rho);
                let mu = suth.effective_viscosity(t);
                let tke = 1.5 * (cond.turbulence_intensity * vel.mag()).powi(2);
                let omega = rho * tke / (cond.eddy_viscosity_ratio * mu);
                state.set_turbulence(tke, omega);
            }
            state
        };
        let freestream = nondim(fs);
        let inlet = self.inlet.as_ref().map(nondim).unwrap_or(freestream);
        let outlet_pressure =
            self.outlet_pressure.unwrap_or(fs.pressure) / (rho_ref * a_ref * a_ref);

        Ok(Settings {
            equation_set,
            time_integration,
            matrix_solver,
            reconstruction,
            limiter,
            turbulence,
            kappa: self.kappa,
            cfl: self.cfl,
            dt: self.dt * a_ref / self.l_ref,
            iterations: self.iterations,
            nonlinear_iterations: self.nonlinear_iterations.max(1),
            theta: self.theta.unwrap_or_else(|| time_integration.theta()),
            zeta: self.zeta.unwrap_or_else(|| time_integration.zeta()),
            matrix_relaxation: self.matrix_relaxation,
            dual_time_cfl: self.dual_time_cfl,
            num_ghosts: self.num_ghosts,
            matrix_sweeps: self.matrix_sweeps.max(1),
            output_frequency: self.output_frequency.max(1),
            eos,
            suth,
            freestream,
            inlet,
            outlet_pressure,
            t_ref,
            a_ref,
            rho_ref,
        })
    }
}

impl Settings {
    pub fn is_viscous(&self) -> bool {
        self.equation_set.is_viscous()
    }

    pub fn is_turbulent(&self) -> bool {
        self.equation_set == EquationSet::Rans && self.turbulence.is_rans()
    }

    /// Number of equations carried in residual norms and updates.
    pub fn num_equations(&self) -> usize {
        if self.is_turbulent() {
            crate::primvars::NUM_VARS
        } else {
            crate::primvars::NUM_FLOW
        }
    }

    pub fn is_multilevel_time(&self) -> bool {
        self.time_integration.is_implicit() && self.dt > 0.0
    }

    pub fn is_dual_time(&self) -> bool {
        self.dual_time_cfl > 0.0
    }
}
