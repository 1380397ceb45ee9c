use approx::assert_relative_eq;
use blockflow::{
    calc_wall_distance, BcKind, Block, BoundaryConditions, Direction, Input, PrimVars, ProcBlock,
    Settings, Vector3d,
};

fn settings(json: serde_json::Value) -> Settings {
    serde_json::from_value::<Input>(json).unwrap().validate().unwrap()
}

fn block(ni: usize, nj: usize, nk: usize, spacing: [f64; 3], kinds: [BcKind; 6], settings: &Settings) -> ProcBlock {
    let grid = Block::cartesian(ni, nj, nk, [0.0; 3], spacing).unwrap();
    let dims = (ni as i32, nj as i32, nk as i32);
    let bc = BoundaryConditions::from_faces(dims, kinds, [0; 6]);
    ProcBlock::new(&grid, bc, settings.num_ghosts, 0, settings.freestream)
}

#[test]
fn cartesian_geometry() {
    let s = settings(serde_json::json!({}));
    let b = block(4, 3, 2, [0.5, 1.0, 2.0], [BcKind::SlipWall; 6], &s);
    assert_eq!(b.dims(), (4, 3, 2));
    assert_eq!(b.num_cells(), 24);
    for ijk in b.physical_cells().collect::<Vec<_>>() {
        assert_relative_eq!(b.vol(ijk), 1.0, epsilon = 1e-12);
        assert!(b.is_populated(ijk));
    }
    let c = b.center((1, 2, 1));
    assert_relative_eq!(c.x, 0.75);
    assert_relative_eq!(c.y, 2.5);
    assert_relative_eq!(c.z, 3.0);

    let ai = b.f_area(Direction::I, (4, 0, 0));
    assert_relative_eq!(ai.mag(), 2.0, epsilon = 1e-12);
    assert_relative_eq!(ai.unit().x, 1.0, epsilon = 1e-12);
    let ak = b.f_area_upper(Direction::K, (0, 0, 0));
    assert_relative_eq!(ak.mag(), 0.5, epsilon = 1e-12);
    assert_relative_eq!(ak.unit().z, 1.0, epsilon = 1e-12);
    assert!(!b.is_populated((-1, 0, 0)));
}

#[test]
fn ghost_geometry_mirrors_across_boundary() {
    let s = settings(serde_json::json!({}));
    let mut b = block(4, 3, 2, [0.5, 1.0, 2.0], [BcKind::SlipWall; 6], &s);
    b.assign_ghost_cells_geom();

    let c1 = b.center((-1, 0, 0));
    let c2 = b.center((-2, 0, 0));
    assert_relative_eq!(c1.x, -0.25, epsilon = 1e-12);
    assert_relative_eq!(c2.x, -0.75, epsilon = 1e-12);
    assert_relative_eq!(c1.y, 0.5, epsilon = 1e-12);
    assert_relative_eq!(b.vol((-2, 0, 0)), 1.0, epsilon = 1e-12);

    let upper = b.center((1, 3, 1));
    assert_relative_eq!(upper.y, 3.5, epsilon = 1e-12);

    // face areas keep pointing toward increasing index
    let area = b.f_area(Direction::I, (-1, 1, 1));
    assert_relative_eq!(area.unit().x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(area.mag(), 2.0, epsilon = 1e-12);
    assert_relative_eq!(b.f_center(Direction::I, (-1, 1, 1)).x, -0.5, epsilon = 1e-12);
    assert_relative_eq!(b.f_center(Direction::I, (-2, 1, 1)).x, -1.0, epsilon = 1e-12);

    // edges are untouched until the edge pass
    assert!(!b.is_populated((-1, -1, 0)));
    b.assign_ghost_cells_geom_edge();
    let edge = b.center((-1, -1, 0));
    assert_relative_eq!(edge.x, -0.25, epsilon = 1e-12);
    assert_relative_eq!(edge.y, -0.5, epsilon = 1e-12);
    assert_relative_eq!(edge.z, 1.0, epsilon = 1e-12);
    let edge = b.center((5, 1, -2));
    assert_relative_eq!(edge.x, 2.75, epsilon = 1e-12);
    assert_relative_eq!(edge.z, -3.0, epsilon = 1e-12);
}

#[test]
fn thin_block_extrapolates_ghost_spacing() {
    let s = settings(serde_json::json!({}));
    let mut b = block(2, 2, 1, [1.0; 3], [BcKind::SlipWall; 6], &s);
    b.assign_ghost_cells_geom();
    assert_relative_eq!(b.center((0, 0, -1)).z, -0.5, epsilon = 1e-12);
    assert_relative_eq!(b.center((0, 0, -2)).z, -1.5, epsilon = 1e-12);
    assert_relative_eq!(b.center((0, 0, 2)).z, 2.5, epsilon = 1e-12);
}

#[test]
fn slip_wall_reflects_normal_velocity() {
    let s = settings(serde_json::json!({}));
    let mut b = block(3, 3, 3, [1.0; 3], [BcKind::SlipWall; 6], &s);
    b.assign_ghost_cells_geom();
    let interior = PrimVars::new(1.0, Vector3d::new(0.2, 0.1, -0.05), 1.0 / 1.4);
    let second = PrimVars::new(1.1, Vector3d::new(0.3, 0.1, 0.0), 0.8);
    b.set_state((0, 1, 1), interior);
    b.set_state((1, 1, 1), second);
    b.assign_inviscid_ghost_cells(&s);

    let g1 = b.state((-1, 1, 1));
    assert_relative_eq!(g1.u(), -0.2, epsilon = 1e-12);
    assert_relative_eq!(g1.v(), 0.1, epsilon = 1e-12);
    assert_relative_eq!(g1.w(), -0.05, epsilon = 1e-12);
    assert_relative_eq!(g1.rho(), 1.0);
    assert_relative_eq!(g1.p(), interior.p());

    // walls mirror the second interior layer into the second ghost layer
    let g2 = b.state((-2, 1, 1));
    assert_relative_eq!(g2.u(), -0.3, epsilon = 1e-12);
    assert_relative_eq!(g2.rho(), 1.1);
}

#[test]
fn viscous_wall_is_slip_until_viscous_pass() {
    let s = settings(serde_json::json!({ "equationSet": "navierStokes" }));
    let mut kinds = [BcKind::SlipWall; 6];
    kinds[2] = BcKind::ViscousWall;
    let mut b = block(3, 3, 3, [1.0; 3], kinds, &s);
    b.assign_ghost_cells_geom();
    let interior = PrimVars::new(1.0, Vector3d::new(0.2, 0.1, 0.0), 1.0 / 1.4);
    b.set_state((1, 0, 1), interior);

    b.assign_inviscid_ghost_cells(&s);
    let slip = *b.state((1, -1, 1));
    assert_relative_eq!(slip.u(), 0.2, epsilon = 1e-12);
    assert_relative_eq!(slip.v(), -0.1, epsilon = 1e-12);

    b.assign_viscous_ghost_cells(&s);
    let no_slip = *b.state((1, -1, 1));
    assert_relative_eq!(no_slip.u(), -0.2, epsilon = 1e-12);
    assert_relative_eq!(no_slip.v(), -0.1, epsilon = 1e-12);
    assert_relative_eq!(no_slip.p(), interior.p());
}

#[test]
fn outflow_and_inflow_ghosts() {
    let s = settings(serde_json::json!({ "outletPressure": 90000.0 }));
    let mut kinds = [BcKind::SlipWall; 6];
    kinds[0] = BcKind::SupersonicInflow;
    kinds[1] = BcKind::SupersonicOutflow;
    kinds[2] = BcKind::SubsonicOutflow;
    kinds[3] = BcKind::SubsonicInflow;
    let mut b = block(3, 3, 3, [1.0; 3], kinds, &s);
    b.assign_ghost_cells_geom();
    let interior = PrimVars::new(0.9, Vector3d::new(0.3, 0.0, 0.0), 0.7);
    for ijk in b.physical_cells().collect::<Vec<_>>() {
        b.set_state(ijk, interior);
    }
    b.assign_inviscid_ghost_cells(&s);

    assert_eq!(*b.state((-1, 1, 1)), s.inlet);
    assert_eq!(*b.state((-2, 1, 1)), s.inlet);
    assert_eq!(*b.state((3, 1, 1)), interior);
    assert_eq!(*b.state((4, 1, 1)), interior);

    let out = b.state((1, -1, 1));
    assert_relative_eq!(out.p(), s.outlet_pressure, epsilon = 1e-12);
    assert_relative_eq!(out.rho(), 0.9);
    let inflow = b.state((1, 3, 1));
    assert_relative_eq!(inflow.p(), 0.7);
    assert_relative_eq!(inflow.rho(), s.inlet.rho());
}

#[test]
fn characteristic_ghost_of_freestream_is_freestream() {
    let s = settings(serde_json::json!({}));
    let mut b = block(3, 3, 3, [1.0; 3], [BcKind::Characteristic; 6], &s);
    b.assign_ghost_cells_geom();
    b.assign_inviscid_ghost_cells(&s);
    b.assign_inviscid_ghost_cells_edge(&s);
    for face_cell in [(-1, 1, 1), (3, 1, 1), (1, -2, 1), (1, 1, 4), (-1, -1, 1)] {
        let ghost = b.state(face_cell);
        for n in 0..5 {
            assert_relative_eq!(ghost.data[n], s.freestream.data[n], epsilon = 1e-12);
        }
    }
}

#[test]
fn wall_distance_to_flat_wall() {
    let s = settings(serde_json::json!({}));
    let mut kinds = [BcKind::SlipWall; 6];
    kinds[2] = BcKind::ViscousWall;
    let mut blocks = vec![block(4, 5, 2, [1.0, 0.25, 1.0], kinds, &s)];
    calc_wall_distance(&mut blocks);
    for (i, j, k) in blocks[0].physical_cells().collect::<Vec<_>>() {
        let expected = 0.25 * (j as f64 + 0.5);
        assert_relative_eq!(blocks[0].wall_dist((i, j, k)), expected, epsilon = 1e-12);
    }

    let mut no_wall = vec![block(2, 2, 2, [1.0; 3], [BcKind::SlipWall; 6], &s)];
    calc_wall_distance(&mut no_wall);
    assert_eq!(no_wall[0].wall_dist((0, 0, 0)), f64::MAX);
}

/// 3x3x1 block: characteristic i-min and j-max, viscous wall j-min, slip
/// walls elsewhere, with a nonuniform interior.
fn edge_block(s: &Settings) -> ProcBlock {
    let mut kinds = [BcKind::SlipWall; 6];
    kinds[0] = BcKind::Characteristic;
    kinds[2] = BcKind::ViscousWall;
    kinds[3] = BcKind::Characteristic;
    let mut b = block(3, 3, 1, [1.0; 3], kinds, s);
    b.assign_ghost_cells_geom();
    b.assign_ghost_cells_geom_edge();
    for (i, j, k) in b.physical_cells().collect::<Vec<_>>() {
        let (x, y) = (i as f64, j as f64);
        let state = PrimVars::new(
            1.0 + 0.1 * x + 0.05 * y,
            Vector3d::new(0.2 + 0.01 * x, 0.03 * (y + 1.0), 0.0),
            1.0 / 1.4 + 0.01 * y,
        );
        b.set_state((i, j, k), state);
    }
    b
}

fn assert_state_eq(a: &PrimVars, b: &PrimVars) {
    for n in 0..5 {
        assert_relative_eq!(a.data[n], b.data[n], epsilon = 1e-12);
    }
}

#[test]
fn viscous_wall_edge_extends_the_other_ghost_column() {
    let s = settings(serde_json::json!({ "equationSet": "navierStokes" }));
    let mut b = edge_block(&s);
    b.assign_inviscid_ghost_cells(&s);
    b.assign_inviscid_ghost_cells_edge(&s);

    // inviscid pass: the viscous wall reflects like a slip wall
    for la in 1..=2 {
        for lb in 1..=2 {
            let edge = *b.state((-la, -lb, 0));
            let src = *b.state((-la, lb - 1, 0));
            assert_relative_eq!(edge.rho(), src.rho(), epsilon = 1e-12);
            assert_relative_eq!(edge.p(), src.p(), epsilon = 1e-12);
            assert_relative_eq!(edge.u(), src.u(), epsilon = 1e-12);
            assert_relative_eq!(edge.v(), -src.v(), epsilon = 1e-12);
        }
    }

    b.assign_viscous_ghost_cells(&s);
    b.assign_viscous_ghost_cells_edge(&s);
    for la in 1..=2 {
        for lb in 1..=2 {
            let edge = *b.state((-la, -lb, 0));
            let src = *b.state((-la, lb - 1, 0));
            assert_relative_eq!(edge.rho(), src.rho(), epsilon = 1e-12);
            assert_relative_eq!(edge.p(), src.p(), epsilon = 1e-12);
            assert_relative_eq!(edge.u(), -src.u(), epsilon = 1e-12);
            assert_relative_eq!(edge.v(), -src.v(), epsilon = 1e-12);
        }
    }
}

#[test]
fn non_wall_and_wall_pairs_average_their_columns() {
    let s = settings(serde_json::json!({ "equationSet": "navierStokes" }));
    let mut b = edge_block(&s);
    b.assign_inviscid_ghost_cells(&s);
    b.assign_inviscid_ghost_cells_edge(&s);
    b.assign_viscous_ghost_cells(&s);
    b.assign_viscous_ghost_cells_edge(&s);

    for la in 1..=2 {
        for lb in 1..=2 {
            // characteristic i-min meets characteristic j-max
            let from_i = *b.state((-la, 3 - lb, 0));
            let from_j = *b.state((la - 1, 2 + lb, 0));
            assert_state_eq(b.state((-la, 2 + lb, 0)), &((from_i + from_j) * 0.5));

            // slip i-max meets the viscous j-min wall
            let from_i = *b.state((2 + la, lb - 1, 0));
            let from_j = *b.state((3 - la, -lb, 0));
            assert_state_eq(b.state((2 + la, -lb, 0)), &((from_i + from_j) * 0.5));
        }
    }
}
