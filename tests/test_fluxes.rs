use approx::assert_relative_eq;
use blockflow::implicit::hyperplane_reorder;
use blockflow::inviscid_flux::{convective_flux, roe_flux};
use blockflow::reconstruction::{face_recon_central, face_recon_muscl, face_recon_weno, lagrange_coeff, Limiter};
use blockflow::{
    BcKind, Block, BoundaryConditions, Direction, IdealGas, Input, PrimVars, ProcBlock, Settings,
    VarArray, Vector3d,
};

fn settings(json: serde_json::Value) -> Settings {
    serde_json::from_value::<Input>(json).unwrap().validate().unwrap()
}

fn closed_block(settings: &Settings, kinds: [BcKind; 6]) -> ProcBlock {
    let grid = Block::cartesian(4, 3, 3, [0.0; 3], [0.5, 1.0, 0.75]).unwrap();
    let bc = BoundaryConditions::from_faces((4, 3, 3), kinds, [0; 6]);
    let mut b = ProcBlock::new(&grid, bc, settings.num_ghosts, 0, settings.freestream);
    b.assign_ghost_cells_geom();
    b.assign_ghost_cells_geom_edge();
    b
}

fn assert_var_eq(a: &VarArray, b: &VarArray, eps: f64) {
    for n in 0..5 {
        assert_relative_eq!(a[n], b[n], epsilon = eps, max_relative = eps);
    }
}

#[test]
fn roe_flux_of_equal_states_is_convective_flux() {
    let eos = IdealGas::new(1.4, 0.72, 0.9);
    let state = PrimVars::new(1.2, Vector3d::new(0.3, -0.1, 0.2), 0.9);
    let normal = Vector3d::new(1.0, 2.0, -0.5).normalize();
    let roe = roe_flux(&state, &state, &eos, &normal);
    let exact = convective_flux(&state, &eos, &normal);
    assert_var_eq(&roe, &exact, 1e-12);
    assert_relative_eq!(exact.mass(), 1.2 * state.velocity().dot(&normal), epsilon = 1e-14);
}

#[test]
fn roe_flux_upwinds_supersonic_flow() {
    let eos = IdealGas::new(1.4, 0.72, 0.9);
    let normal = Vector3d::new(1.0, 0.0, 0.0);
    let left = PrimVars::new(1.0, Vector3d::new(2.5, 0.1, 0.0), 1.0 / 1.4);
    let right = PrimVars::new(0.8, Vector3d::new(2.2, 0.0, 0.0), 0.6);
    let roe = roe_flux(&left, &right, &eos, &normal);
    assert_var_eq(&roe, &convective_flux(&left, &eos, &normal), 1e-10);

    let flipped = roe_flux(&right, &left, &eos, &(-normal));
    assert_var_eq(&flipped, &convective_flux(&left, &eos, &(-normal)), 1e-10);
}

#[test]
fn roe_flux_is_antisymmetric_in_normal() {
    let eos = IdealGas::new(1.4, 0.72, 0.9);
    let normal = Vector3d::new(0.3, 0.4, 0.5).normalize();
    let left = PrimVars::new(1.0, Vector3d::new(0.2, 0.1, 0.0), 0.7);
    let right = PrimVars::new(0.9, Vector3d::new(0.1, 0.2, -0.1), 0.65);
    let forward = roe_flux(&left, &right, &eos, &normal);
    let backward = roe_flux(&right, &left, &eos, &(-normal));
    assert_var_eq(&forward, &(-backward), 1e-12);
}

#[test]
fn muscl_keeps_uniform_and_linear_data() {
    let a = PrimVars::new(1.0, Vector3d::new(0.1, 0.0, 0.0), 0.7);
    let face = face_recon_muscl(&a, &a, &a, 1.0 / 3.0, Limiter::VanAlbada, 0.5, 1.0, 0.5);
    assert_eq!(face, a);

    let b = PrimVars::new(2.0, Vector3d::new(0.2, 0.0, 0.0), 1.4);
    let c = PrimVars::new(3.0, Vector3d::new(0.3, 0.0, 0.0), 2.1);
    let face = face_recon_muscl(&a, &b, &c, 1.0 / 3.0, Limiter::None, 0.5, 1.0, 0.5);
    assert_relative_eq!(face.rho(), 2.5, epsilon = 1e-12);
    assert_relative_eq!(face.p(), 1.75, epsilon = 1e-12);

    assert_relative_eq!(face_recon_central(1.0, 3.0, 1.0, 3.0), 1.5);
    assert_eq!(Limiter::Minmod.limit(-1.0), 0.0);
    assert_eq!(Limiter::VanAlbada.limit(1.0), 1.0);
}

#[test]
fn weno_stencil_weights() {
    let uniform = [1.0; 5];
    let expected = [[1.0 / 3.0, -7.0 / 6.0, 11.0 / 6.0], [-1.0 / 6.0, 5.0 / 6.0, 1.0 / 3.0], [1.0 / 3.0, 5.0 / 6.0, -1.0 / 6.0]];
    for (shift, want) in [2, 1, 0].into_iter().zip(expected) {
        let coeffs = lagrange_coeff(&uniform, 2, shift, 2);
        for (c, w) in coeffs.iter().zip(want) {
            assert_relative_eq!(*c, w, epsilon = 1e-12);
        }
    }
    let full = lagrange_coeff(&uniform, 4, 2, 2);
    assert_relative_eq!(full.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert_relative_eq!(full[0], 1.0 / 30.0, epsilon = 1e-12);

    // uneven cells still sum to one
    let coeffs = lagrange_coeff(&[1.0, 1.3, 1.7, 2.0, 2.6], 2, 1, 2);
    assert_relative_eq!(coeffs.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
}

#[test]
fn weno_is_exact_for_linear_data_and_holds_a_step() {
    let widths = [1.0, 1.3, 1.7, 2.0, 2.6];
    let mut edges = [0.0; 6];
    for n in 0..5 {
        edges[n + 1] = edges[n] + widths[n];
    }
    let states: Vec<PrimVars> = (0..5)
        .map(|n| {
            let x = 0.5 * (edges[n] + edges[n + 1]);
            PrimVars::new(1.0 + 0.1 * x, Vector3d::new(0.2, 0.01 * x, 0.0), 0.7 - 0.02 * x)
        })
        .collect();
    let stencil = [&states[0], &states[1], &states[2], &states[3], &states[4]];
    for z in [false, true] {
        let face = face_recon_weno(stencil, widths, z);
        let x = edges[3];
        assert_relative_eq!(face.rho(), 1.0 + 0.1 * x, epsilon = 1e-10);
        assert_relative_eq!(face.v(), 0.01 * x, epsilon = 1e-10);
        assert_relative_eq!(face.p(), 0.7 - 0.02 * x, epsilon = 1e-10);
    }

    let high = PrimVars::new(1.0, Vector3d::new(0.2, 0.0, 0.0), 1.0);
    let low = PrimVars::new(0.125, Vector3d::new(0.2, 0.0, 0.0), 0.1);
    for z in [false, true] {
        let face = face_recon_weno([&high, &high, &high, &low, &low], [1.0; 5], z);
        assert!(face.rho() <= 1.0 + 1e-12 && face.rho() > 0.99, "rho {}", face.rho());
        assert!(face.p() <= 1.0 + 1e-12 && face.p() > 0.99, "p {}", face.p());
    }
}

#[test]
fn uniform_flow_has_no_residual() {
    for (scheme, ghosts) in [("constant", 2), ("thirdOrder", 2), ("weno", 3), ("wenoZ", 3)] {
        let s = settings(serde_json::json!({
            "equationSet": "euler",
            "faceReconstruction": scheme,
            "limiter": "vanAlbada",
            "numGhosts": ghosts,
        }));
        let mut b = closed_block(&s, [BcKind::Characteristic; 6]);
        b.assign_inviscid_ghost_cells(&s);
        b.assign_inviscid_ghost_cells_edge(&s);
        b.reset_residual_wave_speed();
        for dir in Direction::all() {
            b.calc_inviscid_flux(dir, &s);
        }
        for ijk in b.physical_cells().collect::<Vec<_>>() {
            let r = b.residual(ijk);
            for n in 0..5 {
                assert!(r[n].abs() < 1e-12, "{scheme}: residual {n} at {ijk:?} is {}", r[n]);
            }
            assert!(b.avg_wave_speed(ijk) > 0.0);
        }
    }
}

#[test]
fn uniform_flow_has_no_viscous_residual() {
    let s = settings(serde_json::json!({ "equationSet": "navierStokes" }));
    let mut b = closed_block(&s, [BcKind::Characteristic; 6]);
    b.assign_inviscid_ghost_cells(&s);
    b.assign_inviscid_ghost_cells_edge(&s);
    b.reset_residual_wave_speed();
    b.reset_gradients();
    for dir in Direction::all() {
        b.calc_viscous_flux(dir, &s);
    }
    for ijk in b.physical_cells().collect::<Vec<_>>() {
        let r = b.residual(ijk);
        for n in 0..5 {
            assert!(r[n].abs() < 1e-10, "viscous residual {n} at {ijk:?} is {}", r[n]);
        }
        assert!(b.vel_grad(ijk).double_dot(&b.vel_grad(ijk)) < 1e-20);
    }
}

#[test]
fn interior_fluxes_cancel() {
    let s = settings(serde_json::json!({ "equationSet": "euler", "faceReconstruction": "constant" }));
    let mut b = closed_block(&s, [BcKind::SupersonicOutflow; 6]);
    for (n, ijk) in b.physical_cells().collect::<Vec<_>>().into_iter().enumerate() {
        let bump = 1.0 + 0.01 * n as f64;
        let state = PrimVars::new(bump, Vector3d::new(0.2 * bump, 0.05, -0.02 * bump), 0.7 * bump);
        b.set_state(ijk, state);
    }
    b.assign_inviscid_ghost_cells(&s);
    b.reset_residual_wave_speed();
    b.calc_inviscid_flux(Direction::I, &s);

    let mut total = VarArray::zero();
    for ijk in b.physical_cells().collect::<Vec<_>>() {
        total += b.residual(ijk);
    }
    let mut boundary = VarArray::zero();
    for k in 0..3 {
        for j in 0..3 {
            let lo = b.f_area(Direction::I, (0, j, k));
            boundary -= roe_flux(b.state((-1, j, k)), b.state((0, j, k)), &s.eos, &lo.unit()) * lo.mag();
            let hi = b.f_area(Direction::I, (4, j, k));
            boundary += roe_flux(b.state((3, j, k)), b.state((4, j, k)), &s.eos, &hi.unit()) * hi.mag();
        }
    }
    assert_var_eq(&total, &boundary, 1e-12);
}

#[test]
fn hyperplane_order_covers_every_cell_once() {
    let (ni, nj, nk) = (5, 3, 4);
    let order = hyperplane_reorder(ni, nj, nk);
    assert_eq!(order.len(), (ni * nj * nk) as usize);
    let mut seen = std::collections::HashSet::new();
    let mut last_plane = 0;
    for &(i, j, k) in &order {
        assert!(i >= 0 && i < ni && j >= 0 && j < nj && k >= 0 && k < nk);
        assert!(seen.insert((i, j, k)));
        assert!(i + j + k >= last_plane);
        last_plane = i + j + k;
    }
    assert_eq!(order[0], (0, 0, 0));
    assert_eq!(*order.last().unwrap(), (ni - 1, nj - 1, nk - 1));
}
