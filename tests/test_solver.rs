use approx::assert_relative_eq;
use blockflow::boundary_conditions::BoundarySurface;
use blockflow::{
    BcKind, Block, BoundaryConditions, BoundaryFace, Input, ProcBlock, Settings, Solver, ThreadComm,
    Vector3d,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn settings(json: serde_json::Value) -> Settings {
    serde_json::from_value::<Input>(json).unwrap().validate().unwrap()
}

fn serial(settings: &Settings, grid: Vec<ProcBlock>) -> Solver<ThreadComm> {
    let comm = ThreadComm::world(1).pop().unwrap();
    Solver::setup(comm, settings.clone(), grid).unwrap()
}

/// Channel along x: farfield ends, slip walls elsewhere.
fn channel(s: &Settings) -> Vec<ProcBlock> {
    let grid = Block::cartesian(6, 3, 2, [0.0; 3], [0.5, 0.5, 0.5]).unwrap();
    let mut kinds = [BcKind::SlipWall; 6];
    kinds[0] = BcKind::Characteristic;
    kinds[1] = BcKind::Characteristic;
    let bc = BoundaryConditions::from_faces((6, 3, 2), kinds, [0; 6]);
    vec![ProcBlock::new(&grid, bc, s.num_ghosts, 0, s.freestream)]
}

/// Flat plate starting a third of the way along a thin block, with a slip
/// wall ahead of the leading edge.
fn flat_plate(s: &Settings, ni: usize, nj: usize) -> Vec<ProcBlock> {
    let grid = Block::from_fn(ni + 1, nj + 1, 2, |i, j, k| {
        let y = 0.05 * ((1.15_f64).powi(j as i32) - 1.0) / 0.15;
        Vector3d::new(i as f64 * 0.1, y, k as f64 * 0.1)
    })
    .unwrap();
    let dims = (ni as i32, nj as i32, 1);
    let lead = ni as i32 / 3;
    let mut bc = BoundaryConditions::default();
    bc.push(BoundarySurface::whole_face(BcKind::Characteristic, BoundaryFace::IMin, dims, 0));
    bc.push(BoundarySurface::whole_face(BcKind::Characteristic, BoundaryFace::IMax, dims, 0));
    bc.push(BoundarySurface::patch(BcKind::SlipWall, BoundaryFace::JMin, dims, 0..1, 0..lead, 0));
    bc.push(BoundarySurface::patch(BcKind::ViscousWall, BoundaryFace::JMin, dims, 0..1, lead..ni as i32, 0));
    bc.push(BoundarySurface::whole_face(BcKind::Characteristic, BoundaryFace::JMax, dims, 0));
    bc.push(BoundarySurface::whole_face(BcKind::SlipWall, BoundaryFace::KMin, dims, 0));
    bc.push(BoundarySurface::whole_face(BcKind::SlipWall, BoundaryFace::KMax, dims, 0));
    vec![ProcBlock::new(&grid, bc, s.num_ghosts, 0, s.freestream)]
}

#[test]
fn freestream_is_preserved_by_every_scheme() {
    init_logging();
    let schemes = [
        serde_json::json!({ "timeIntegration": "explicitEuler", "cfl": 0.5 }),
        serde_json::json!({ "timeIntegration": "rk4", "cfl": 1.0, "faceReconstruction": "thirdOrder" }),
        serde_json::json!({ "timeIntegration": "implicitEuler", "matrixSolver": "lusgs", "cfl": 10.0 }),
        serde_json::json!({ "timeIntegration": "implicitEuler", "faceReconstruction": "weno", "numGhosts": 3, "cfl": 10.0 }),
        serde_json::json!({ "timeIntegration": "implicitEuler", "matrixSolver": "dplur", "matrixSweeps": 3, "cfl": 10.0 }),
        serde_json::json!({ "timeIntegration": "bdf2", "dt": 1.0e-5, "nonlinearIterations": 2 }),
        serde_json::json!({ "timeIntegration": "crankNicholson", "dt": 1.0e-5 }),
    ];
    for mut json in schemes {
        json["iterations"] = 4.into();
        json["equationSet"] = "navierStokes".into();
        let s = settings(json.clone());
        let mut solver = serial(&s, channel(&s));
        let reports = solver.run().unwrap();
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[3].iteration, 3);
        assert!(reports.iter().all(|r| r.l2 < 1e-10), "{json}: {:?}", reports);

        let blocks = solver.finish().unwrap().unwrap();
        for ijk in blocks[0].physical_cells().collect::<Vec<_>>() {
            let state = blocks[0].state(ijk);
            for n in 0..5 {
                assert_relative_eq!(state.data[n], s.freestream.data[n], epsilon = 1e-10);
            }
        }
    }
}

#[test]
fn phases_can_be_driven_one_at_a_time() {
    let s = settings(serde_json::json!({ "timeIntegration": "implicitEuler", "cfl": 2.0 }));
    let mut solver = serial(&s, channel(&s));
    assert_eq!(solver.iteration(), 0);
    assert!(solver.connections().is_empty());
    solver.get_boundary_conditions().unwrap();
    solver.calc_residual();
    solver.calc_time_step().unwrap();
    for ijk in solver.blocks()[0].physical_cells().collect::<Vec<_>>() {
        let dt = solver.blocks()[0].dt(ijk);
        assert!(dt > 0.0 && dt.is_finite());
        assert!(solver.blocks()[0].avg_wave_speed(ijk) > 0.0);
    }
    let (du, error) = solver.implicit_update().unwrap();
    assert_eq!(du.len(), 1);
    assert!(error < 1e-12);
    for ijk in solver.blocks()[0].physical_cells().collect::<Vec<_>>() {
        assert!(du[0][ijk].sum_sq(5) < 1e-24);
    }
}

#[test]
fn flat_plate_develops_a_boundary_layer() {
    init_logging();
    let s = settings(serde_json::json!({
        "equationSet": "navierStokes",
        "timeIntegration": "implicitEuler",
        "matrixSolver": "lusgs",
        "faceReconstruction": "thirdOrder",
        "limiter": "vanAlbada",
        "cfl": 5.0,
        "iterations": 25,
        "outputFrequency": 5,
        "lRef": 1.0e-4,
    }));
    let (ni, nj) = (15, 8);
    let mut solver = serial(&s, flat_plate(&s, ni, nj));

    let block = &solver.blocks()[0];
    assert_relative_eq!(block.wall_dist((10, 0, 0)), block.center((10, 0, 0)).y, epsilon = 1e-12);
    assert!(block.wall_dist((0, 0, 0)) > block.center((0, 0, 0)).y);

    let reports = solver.run().unwrap();
    assert!(reports.iter().all(|r| r.l2.is_finite()));
    assert!(reports.last().unwrap().l2 > 0.0);

    let blocks = solver.finish().unwrap().unwrap();
    let b = &blocks[0];
    for ijk in b.physical_cells().collect::<Vec<_>>() {
        assert!(b.state(ijk).is_physical(), "non-physical state at {ijk:?}");
    }
    // the wall slows the flow next to it, the slip section does not
    let u_inf = s.freestream.u();
    assert!(b.state((12, 0, 0)).u() < u_inf);
    assert!(b.state((12, 0, 0)).u() < b.state((12, nj as i32 - 1, 0)).u());
    assert!(b.state((12, 0, 0)).u() < b.state((1, 0, 0)).u());
}

/// 65x2x2-cell plate: characteristic i and j-max faces, no-slip j-min,
/// slip k faces. Lengths in meters.
fn thin_plate(s: &Settings) -> Vec<ProcBlock> {
    let grid = Block::cartesian(65, 2, 2, [0.0; 3], [0.01, 0.001, 0.01]).unwrap();
    let kinds = [
        BcKind::Characteristic,
        BcKind::Characteristic,
        BcKind::ViscousWall,
        BcKind::Characteristic,
        BcKind::SlipWall,
        BcKind::SlipWall,
    ];
    let bc = BoundaryConditions::from_faces((65, 2, 2), kinds, [0; 6]);
    vec![ProcBlock::new(&grid, bc, s.num_ghosts, 0, s.freestream)]
}

#[test]
fn flat_plate_converges_to_a_boundary_layer() {
    init_logging();
    let s = settings(serde_json::json!({
        "equationSet": "navierStokes",
        "timeIntegration": "implicitEuler",
        "matrixSolver": "lusgs",
        "cfl": 10000.0,
        "iterations": 10000,
        "outputFrequency": 1000,
        "freestream": { "pressure": 101300.0, "density": 1.2256, "velocity": [68.0, 0.0, 0.0] },
    }));
    let mut solver = serial(&s, thin_plate(&s));
    let reports = solver.run().unwrap();
    assert!(reports.iter().all(|r| r.l2.is_finite()));

    let peak = reports.iter().map(|r| r.l2).fold(0.0, f64::max);
    let half = reports[reports.len() / 2].l2;
    let last = reports.last().unwrap().l2;
    assert!(peak > 0.0);
    assert!(last < 1e-2 * peak, "residual went from {peak} to {last}");
    assert!(last < half, "residual stalled: {half} at midpoint, {last} at the end");

    let blocks = solver.finish().unwrap().unwrap();
    let b = &blocks[0];
    let u_inf = s.freestream.u();
    for i in [32, 48, 64] {
        let wall = b.state((i, 0, 0));
        let top = b.state((i, 1, 0));
        assert!(wall.is_physical() && top.is_physical());
        assert!(wall.u() > 0.0 && wall.u() < top.u(), "cell {i}: {} / {}", wall.u(), top.u());
        assert!(top.u() > 0.9 * u_inf && top.u() < 1.05 * u_inf);
        assert!(wall.v().abs() < 0.1 * u_inf);
        assert_relative_eq!(wall.w(), 0.0, epsilon = 1e-10);
    }
}
