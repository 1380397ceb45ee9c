use approx::assert_relative_eq;
use blockflow::input::{EquationSet, MatrixSolver, Reconstruction, TimeIntegration};
use blockflow::reconstruction::Limiter;
use blockflow::{Input, SolverError};

fn parse(json: serde_json::Value) -> Input {
    serde_json::from_value(json).unwrap()
}

#[test]
fn defaults_fill_missing_keys() {
    let input = parse(serde_json::json!({}));
    assert_eq!(input, Input::default());
    let s = input.validate().unwrap();
    assert_eq!(s.equation_set, EquationSet::NavierStokes);
    assert_eq!(s.time_integration, TimeIntegration::ImplicitEuler);
    assert_eq!(s.matrix_solver, MatrixSolver::Lusgs);
    assert_eq!(s.reconstruction, Reconstruction::FirstOrder);
    assert_eq!(s.limiter, Limiter::None);
    assert_eq!(s.num_ghosts, 2);
    assert_eq!(s.num_equations(), 5);
    assert!(s.is_viscous());
    assert!(!s.is_multilevel_time());
}

#[test]
fn freestream_is_nondimensional() {
    let s = parse(serde_json::json!({
        "freestream": { "pressure": 80000.0, "density": 1.0, "velocity": [100.0, 20.0, 0.0] }
    }))
    .validate()
    .unwrap();
    assert_relative_eq!(s.freestream.rho(), 1.0, epsilon = 1e-14);
    assert_relative_eq!(s.freestream.sos(&s.eos), 1.0, epsilon = 1e-12);
    assert_relative_eq!(s.freestream.temperature(&s.eos), 1.0, epsilon = 1e-12);
    assert_relative_eq!(s.a_ref, (1.4_f64 * 80000.0).sqrt(), epsilon = 1e-9);
    assert_relative_eq!(s.freestream.u() * s.a_ref, 100.0, epsilon = 1e-9);
    assert_relative_eq!(s.freestream.v() / s.freestream.u(), 0.2, epsilon = 1e-12);
    assert_eq!(s.inlet, s.freestream);
    assert_relative_eq!(s.outlet_pressure, s.freestream.p(), epsilon = 1e-14);
}

#[test]
fn scheme_aliases_and_time_levels() {
    let s = parse(serde_json::json!({
        "equationSet": "euler",
        "timeIntegration": "bdf2",
        "matrixSolver": "bdplur",
        "faceReconstruction": "muscl",
        "limiter": "minmod",
        "dt": 1.0e-4,
    }))
    .validate()
    .unwrap();
    assert_eq!(s.matrix_solver, MatrixSolver::Dplur);
    assert_eq!(s.reconstruction, Reconstruction::Muscl);
    assert_relative_eq!(s.zeta, 0.5);
    assert_relative_eq!(s.theta, 1.0);
    assert!(s.is_multilevel_time());
    assert!(s.dt > 0.0);

    let weno = parse(serde_json::json!({ "faceReconstruction": "wenoZ", "numGhosts": 3 }))
        .validate()
        .unwrap();
    assert_eq!(weno.reconstruction, Reconstruction::WenoZ);
    assert_eq!(weno.reconstruction.ghosts_needed(), 3);

    let cn = parse(serde_json::json!({ "timeIntegration": "crankNicholson", "theta": 0.6 }))
        .validate()
        .unwrap();
    assert_relative_eq!(cn.theta, 0.6);
    assert_eq!(TimeIntegration::Rk4.stages(), 4);
}

#[test]
fn rans_freestream_carries_turbulence() {
    let s = parse(serde_json::json!({ "equationSet": "rans", "turbulenceModel": "kOmega" }))
        .validate()
        .unwrap();
    assert!(s.is_turbulent());
    assert_eq!(s.num_equations(), 7);
    assert!(s.freestream.tke() > 0.0);
    assert!(s.freestream.omega() > 0.0);
}

#[test]
fn bad_options_are_rejected() {
    let err = parse(serde_json::json!({ "limiter": "superbee" })).validate().unwrap_err();
    assert!(matches!(err, SolverError::UnknownOption { option: "limiter", .. }));
    assert!(err.to_string().contains("superbee"));

    for json in [
        serde_json::json!({ "equationSet": "stokes" }),
        serde_json::json!({ "timeIntegration": "rk3" }),
        serde_json::json!({ "matrixSolver": "gmres" }),
        serde_json::json!({ "faceReconstruction": "eno" }),
        serde_json::json!({ "faceReconstruction": "weno" }),
        serde_json::json!({ "faceReconstruction": "thirdOrder", "numGhosts": 1 }),
        serde_json::json!({ "turbulenceModel": "sa" }),
        serde_json::json!({ "numGhosts": 0 }),
    ] {
        assert!(parse(json).validate().is_err());
    }

    let err = parse(serde_json::json!({ "cfl": 0.0, "dt": 0.0 })).validate().unwrap_err();
    assert!(matches!(err, SolverError::MissingTimeStep));
}
