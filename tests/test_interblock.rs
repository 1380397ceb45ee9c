use approx::assert_relative_eq;
use blockflow::boundary_conditions::BoundarySurface;
use blockflow::parallel::{serial_decomposition, swap_geometry, swap_states};
use blockflow::slices::{swap_geom_slice, swap_state_slice};
use blockflow::{
    find_connections, BcKind, Block, BoundaryConditions, BoundaryFace, Direction, Input, Interblock,
    Orientation, PrimVars, ProcBlock, Settings, ThreadComm, Vector3d,
};

fn settings() -> Settings {
    serde_json::from_value::<Input>(serde_json::json!({ "equationSet": "euler" }))
        .unwrap()
        .validate()
        .unwrap()
}

fn faces(dims: (i32, i32, i32), interblocks: &[(BoundaryFace, i32)]) -> BoundaryConditions {
    let mut kinds = [BcKind::SlipWall; 6];
    let mut tags = [0; 6];
    for (face, tag) in interblocks {
        let n = (face.code() - 1) as usize;
        kinds[n] = BcKind::Interblock;
        tags[n] = *tag;
    }
    BoundaryConditions::from_faces(dims, kinds, tags)
}

fn assert_close(a: Vector3d, b: Vector3d) {
    assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
    assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
    assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
}

/// Mark every physical cell with a state unique to its block and position.
fn label_states(blocks: &mut [ProcBlock]) {
    for (n, block) in blocks.iter_mut().enumerate() {
        for (i, j, k) in block.physical_cells().collect::<Vec<_>>() {
            let rho = 1.0 + n as f64 + 0.1 * i as f64 + 0.01 * j as f64 + 0.001 * k as f64;
            block.set_state((i, j, k), PrimVars::new(rho, Vector3d::new(0.1, 0.0, 0.0), 0.7));
        }
    }
}

/// Run the geometry setup the way the driver does on one process.
fn setup_geometry(blocks: &mut [ProcBlock]) -> Vec<Interblock> {
    let mut connections = find_connections(blocks).unwrap();
    serial_decomposition(blocks, &mut connections);
    let comm = ThreadComm::world(1).pop().unwrap();
    for b in blocks.iter_mut() {
        b.assign_ghost_cells_geom();
    }
    swap_geometry(&comm, &mut connections, blocks).unwrap();
    for b in blocks.iter_mut() {
        b.assign_ghost_cells_geom_edge();
    }
    connections
}

#[test]
fn orientation_codes_round_trip() {
    for o in Orientation::all() {
        let inv = o.inverse();
        assert_eq!(inv.inverse(), o);
        let (swap, _, _) = o.parts();
        let (len1, len2) = (3, 5);
        // lengths of the other window
        let (olen1, olen2) = if swap { (len2, len1) } else { (len1, len2) };
        for l1 in 0..len1 {
            for l2 in 0..len2 {
                let (m1, m2) = o.map(l1, l2, olen1, olen2);
                assert!(m1 >= 0 && m1 < olen1 && m2 >= 0 && m2 < olen2);
                assert_eq!(inv.map(m1, m2, len1, len2), (l1, l2), "code {}", o.code());
            }
        }
    }
    assert_eq!(Orientation::new(5).unwrap().inverse().code(), 4);
    assert_eq!(Orientation::new(7).unwrap().inverse().code(), 7);
    assert_eq!(Orientation::from_parts(false, true, true).code(), 8);
    assert!(Orientation::new(9).is_err());
}

#[test]
fn aligned_neighbors_exchange_geometry_and_state() {
    let s = settings();
    let a_grid = Block::cartesian(3, 2, 2, [0.0; 3], [0.5; 3]).unwrap();
    let b_grid = Block::cartesian(3, 2, 2, [1.5, 0.0, 0.0], [0.5; 3]).unwrap();
    let mut blocks = vec![
        ProcBlock::new(&a_grid, faces((3, 2, 2), &[(BoundaryFace::IMax, 1)]), 2, 0, s.freestream),
        ProcBlock::new(&b_grid, faces((3, 2, 2), &[(BoundaryFace::IMin, 1)]), 2, 1, s.freestream),
    ];
    let connections = setup_geometry(&mut blocks);
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].orientation, Orientation::identity());
    assert!(!connections[0].needs_second_pass());

    for (j, k) in [(0, 0), (1, 1), (0, 1)] {
        assert_close(blocks[0].center((3, j, k)), blocks[1].center((0, j, k)));
        assert_close(blocks[0].center((4, j, k)), blocks[1].center((1, j, k)));
        assert_close(blocks[1].center((-1, j, k)), blocks[0].center((2, j, k)));
        assert_relative_eq!(blocks[0].vol((3, j, k)), 0.125, epsilon = 1e-12);
    }
    // edge ghosts come from the neighbor's own boundary ghosts
    assert_close(blocks[0].center((3, -1, 0)), Vector3d::new(1.75, -0.25, 0.25));
    let area = blocks[0].f_area(Direction::I, (4, 1, 1));
    assert_relative_eq!(area.unit().x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(area.mag(), 0.25, epsilon = 1e-12);

    label_states(&mut blocks);
    swap_state_slice(&connections[0], &mut blocks).unwrap();
    assert_eq!(blocks[0].state((3, 1, 0)), blocks[1].state((0, 1, 0)));
    assert_eq!(blocks[0].state((4, 0, 1)), blocks[1].state((1, 0, 1)));
    assert_eq!(blocks[1].state((-2, 1, 1)), blocks[0].state((1, 1, 1)));

    let before = blocks[0].states().clone();
    swap_state_slice(&connections[0], &mut blocks).unwrap();
    assert_eq!(blocks[0].states(), &before);
}

#[test]
fn connection_records_export_as_json() {
    let s = settings();
    let a_grid = Block::cartesian(3, 2, 2, [0.0; 3], [0.5; 3]).unwrap();
    let b_grid = Block::cartesian(3, 2, 2, [1.5, 0.0, 0.0], [0.5; 3]).unwrap();
    let blocks = vec![
        ProcBlock::new(&a_grid, faces((3, 2, 2), &[(BoundaryFace::IMax, 7)]), 2, 0, s.freestream),
        ProcBlock::new(&b_grid, faces((3, 2, 2), &[(BoundaryFace::IMin, 7)]), 2, 1, s.freestream),
    ];
    let connections = find_connections(&blocks).unwrap();
    let json = serde_json::to_value(&connections).unwrap();
    assert_eq!(json[0]["orientation"]["code"], 1);
    assert_eq!(json[0]["sides"][0]["face"], "imax");
    assert_eq!(json[0]["sides"][1]["face"], "imin");
    assert_eq!(json[0]["sides"][1]["block"], 1);
    assert_eq!(json[0]["sides"][0]["tag"], 7);
    assert_eq!(json[0]["sides"][0]["range1"], serde_json::json!([0, 2]));

    let bc = serde_json::to_value(blocks[0].bc()).unwrap();
    let surfaces = bc["surfaces"].as_array().unwrap();
    assert_eq!(surfaces.len(), 6);
    assert!(surfaces
        .iter()
        .any(|s| s["kind"] == "interblock" && s["face"] == "imax" && s["imin"] == 3 && s["tag"] == 7));
    assert!(surfaces.iter().any(|s| s["kind"] == "slipWall" && s["face"] == "jmin"));
}

#[test]
fn rotated_neighbor_is_matched_and_remapped() {
    let s = settings();
    // first block: 3 x 2 x 4 cells with j along y and k along z
    let a_grid = Block::cartesian(3, 2, 4, [0.0; 3], [0.5, 0.5, 0.25]).unwrap();
    // second block: i along x, j along z, k along -y
    let b_grid = Block::from_fn(4, 5, 3, |i, j, k| {
        Vector3d::new(1.5 + 0.5 * i as f64, 1.0 - 0.5 * k as f64, 0.25 * j as f64)
    })
    .unwrap();
    let mut blocks = vec![
        ProcBlock::new(&a_grid, faces((3, 2, 4), &[(BoundaryFace::IMax, 7)]), 2, 0, s.freestream),
        ProcBlock::new(&b_grid, faces((3, 4, 2), &[(BoundaryFace::IMin, 7)]), 2, 1, s.freestream),
    ];
    for ijk in blocks[1].physical_cells().collect::<Vec<_>>() {
        assert!(blocks[1].vol(ijk) > 0.0);
    }

    let connections = setup_geometry(&mut blocks);
    assert_eq!(connections[0].orientation.code(), 5);
    assert_eq!(connections[0].swap_loc(0, 1, 3), (3, 0));
    assert_eq!(connections[0].swap_loc(1, 3, 0), (1, 3));

    for ja in 0..2 {
        for ka in 0..4 {
            let (jb, kb) = (ka, 1 - ja);
            assert_close(blocks[0].center((3, ja, ka)), blocks[1].center((0, jb, kb)));
            assert_close(blocks[1].center((-1, jb, kb)), blocks[0].center((2, ja, ka)));
            assert_close(blocks[1].center((-2, jb, kb)), blocks[0].center((1, ja, ka)));

            // tangential face areas keep pointing along increasing index
            let area_j = blocks[0].f_area(Direction::J, (3, ja, ka));
            assert_relative_eq!(area_j.unit().y, 1.0, epsilon = 1e-12);
            assert_relative_eq!(area_j.mag(), 0.125, epsilon = 1e-12);
            let area_i = blocks[0].f_area(Direction::I, (4, ja, ka));
            assert_relative_eq!(area_i.unit().x, 1.0, epsilon = 1e-12);
        }
    }

    label_states(&mut blocks);
    swap_state_slice(&connections[0], &mut blocks).unwrap();
    assert_eq!(blocks[0].state((4, 1, 2)), blocks[1].state((1, 2, 0)));
    assert_eq!(blocks[1].state((-1, 3, 1)), blocks[0].state((2, 0, 3)));
}

/// Block A below blocks B and C, which meet over the middle of A's j-max
/// face: tags 1 (A-B), 2 (A-C) and 3 (B-C).
fn t_blocks(s: &Settings) -> Vec<ProcBlock> {
    let a_grid = Block::cartesian(4, 2, 1, [0.0; 3], [0.5; 3]).unwrap();
    let b_grid = Block::cartesian(2, 2, 1, [0.0, 1.0, 0.0], [0.5; 3]).unwrap();
    let c_grid = Block::cartesian(2, 2, 1, [1.0, 1.0, 0.0], [0.5; 3]).unwrap();

    let a_dims = (4, 2, 1);
    let mut a_bc = BoundaryConditions::default();
    for face in [BoundaryFace::IMin, BoundaryFace::IMax, BoundaryFace::JMin] {
        a_bc.push(BoundarySurface::whole_face(BcKind::SlipWall, face, a_dims, 0));
    }
    a_bc.push(BoundarySurface::patch(BcKind::Interblock, BoundaryFace::JMax, a_dims, 0..1, 0..2, 1));
    a_bc.push(BoundarySurface::patch(BcKind::Interblock, BoundaryFace::JMax, a_dims, 0..1, 2..4, 2));
    for face in [BoundaryFace::KMin, BoundaryFace::KMax] {
        a_bc.push(BoundarySurface::whole_face(BcKind::SlipWall, face, a_dims, 0));
    }

    vec![
        ProcBlock::new(&a_grid, a_bc, 2, 0, s.freestream),
        ProcBlock::new(
            &b_grid,
            faces((2, 2, 1), &[(BoundaryFace::JMin, 1), (BoundaryFace::IMax, 3)]),
            2,
            1,
            s.freestream,
        ),
        ProcBlock::new(
            &c_grid,
            faces((2, 2, 1), &[(BoundaryFace::JMin, 2), (BoundaryFace::IMin, 3)]),
            2,
            2,
            s.freestream,
        ),
    ]
}

#[test]
fn t_intersection_fills_corner_ghosts_on_second_pass() {
    let s = settings();
    let mut blocks = t_blocks(&s);
    let connections = setup_geometry(&mut blocks);
    assert_eq!(connections.len(), 3);
    let tags: Vec<i32> = connections.iter().map(|c| c.first().tag).collect();
    assert_eq!(tags, vec![1, 2, 3]);
    assert!(connections[0].needs_second_pass());
    assert!(connections[1].needs_second_pass());
    assert!(connections[0].first().border[3]);

    // ghosts of the upper blocks below their shared edge are cells of the lower block
    assert_close(blocks[1].center((2, -1, 0)), blocks[0].center((2, 1, 0)));
    assert_close(blocks[1].center((3, -2, 0)), blocks[0].center((3, 0, 0)));
    assert_close(blocks[2].center((-1, -1, 0)), blocks[0].center((1, 1, 0)));
    assert_close(blocks[1].center((-1, -1, 0)), Vector3d::new(-0.25, 0.75, 0.25));
    assert!(blocks[1].is_populated((2, -1, 0)));

    label_states(&mut blocks);
    let comm = ThreadComm::world(1).pop().unwrap();
    swap_states(&comm, &connections, &mut blocks).unwrap();
    assert_eq!(blocks[1].state((2, -1, 0)), blocks[0].state((2, 1, 0)));
    assert_eq!(blocks[2].state((-2, -1, 0)), blocks[0].state((0, 1, 0)));
    assert_eq!(blocks[0].state((3, 2, 0)), blocks[2].state((1, 0, 0)));
    assert_eq!(blocks[1].state((2, 1, 0)), blocks[2].state((0, 1, 0)));
}

#[test]
fn t_intersection_resolves_in_any_exchange_order() {
    let s = settings();
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    // (block, ghost cell, block, physical cell) pairs around the shared edge
    let shared = [
        (1, (2, -1, 0), 0, (2, 1, 0)),
        (1, (3, -1, 0), 0, (3, 1, 0)),
        (1, (2, -2, 0), 0, (2, 0, 0)),
        (1, (3, -2, 0), 0, (3, 0, 0)),
        (2, (-1, -1, 0), 0, (1, 1, 0)),
        (2, (-2, -1, 0), 0, (0, 1, 0)),
        (2, (-1, -2, 0), 0, (1, 0, 0)),
        (2, (-2, -2, 0), 0, (0, 0, 0)),
        (0, (2, 2, 0), 2, (0, 0, 0)),
        (0, (1, 2, 0), 1, (1, 0, 0)),
        (0, (1, 3, 0), 1, (1, 1, 0)),
        (1, (2, 0, 0), 2, (0, 0, 0)),
        (2, (-1, 1, 0), 1, (1, 1, 0)),
    ];
    for order in orders {
        let mut blocks = t_blocks(&s);
        let found = find_connections(&blocks).unwrap();
        let mut connections: Vec<Interblock> = order.iter().map(|&n| found[n].clone()).collect();
        serial_decomposition(&mut blocks, &mut connections);
        let comm = ThreadComm::world(1).pop().unwrap();
        for b in blocks.iter_mut() {
            b.assign_ghost_cells_geom();
        }
        swap_geometry(&comm, &mut connections, &mut blocks).unwrap();

        label_states(&mut blocks);
        swap_states(&comm, &connections, &mut blocks).unwrap();
        for (nb, ghost, np, cell) in shared {
            assert!(blocks[nb].is_populated(ghost), "{order:?}: block {nb} cell {ghost:?}");
            assert_close(blocks[nb].center(ghost), blocks[np].center(cell));
            assert_eq!(blocks[nb].state(ghost), blocks[np].state(cell), "{order:?}: block {nb} cell {ghost:?}");
        }
    }
}

#[test]
fn unmatched_tag_is_an_error() {
    let s = settings();
    let grid = Block::cartesian(2, 2, 2, [0.0; 3], [1.0; 3]).unwrap();
    let blocks = vec![ProcBlock::new(&grid, faces((2, 2, 2), &[(BoundaryFace::IMax, 4)]), 2, 0, s.freestream)];
    assert!(find_connections(&blocks).is_err());
}

#[test]
fn geometry_swap_between_local_blocks_is_repeatable() {
    let s = settings();
    let a_grid = Block::cartesian(2, 2, 2, [0.0; 3], [1.0; 3]).unwrap();
    let b_grid = Block::cartesian(2, 2, 2, [0.0, 2.0, 0.0], [1.0; 3]).unwrap();
    let mut blocks = vec![
        ProcBlock::new(&a_grid, faces((2, 2, 2), &[(BoundaryFace::JMax, 1)]), 2, 0, s.freestream),
        ProcBlock::new(&b_grid, faces((2, 2, 2), &[(BoundaryFace::JMin, 1)]), 2, 1, s.freestream),
    ];
    let mut connections = setup_geometry(&mut blocks);
    let center = blocks[0].center((1, 2, 0));
    swap_geom_slice(&mut connections[0], &mut blocks).unwrap();
    assert_close(blocks[0].center((1, 2, 0)), center);
    assert_close(center, Vector3d::new(1.5, 2.5, 0.5));
}
