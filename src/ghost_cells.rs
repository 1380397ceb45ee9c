//! Ghost-cell assignment for the boundary policies of a [`ProcBlock`].
//!
//! Geometry ghosts are mirror images of the interior across the boundary
//! face plane. State ghosts come from [`ghost_state`]. Interblock surfaces
//! are skipped here; the exchanges in [`crate::interblock`] fill them.
//!
//! Edge cells (ghost along two directions at once) are handled after the
//! exchanges, so that cells already delivered by a neighbor block are left
//! untouched.

use tracing::warn;

use crate::axis::{BoundaryFace, Direction, Ijk};
use crate::boundary_conditions::{ghost_state, outward_normal, BcKind};
use crate::input::Settings;
use crate::primvars::PrimVars;
use crate::proc_block::ProcBlock;
use crate::vector3d::{UnitVecMag, Vector3d};

/// Mirror plane through `point` with unit normal `normal`.
#[derive(Copy, Clone, Debug)]
struct Plane {
    point: Vector3d,
    normal: Vector3d,
}

impl Plane {
    fn reflect_point(&self, p: Vector3d) -> Vector3d {
        p - self.normal * (2.0 * (p - self.point).dot(&self.normal))
    }

    fn reflect_vector(&self, v: Vector3d) -> Vector3d {
        v - self.normal * (2.0 * v.dot(&self.normal))
    }
}

/// The twelve block edges as pairs of faces with distinct directions.
pub(crate) fn block_edges() -> Vec<(BoundaryFace, BoundaryFace)> {
    let mut edges = Vec::with_capacity(12);
    for (a, b) in [
        (Direction::I, Direction::J),
        (Direction::J, Direction::K),
        (Direction::I, Direction::K),
    ] {
        for upper_a in [false, true] {
            for upper_b in [false, true] {
                edges.push((BoundaryFace::new(a, upper_a), BoundaryFace::new(b, upper_b)));
            }
        }
    }
    edges
}

/// Cell index from components along three distinct directions.
fn compose(a: Direction, ai: i32, b: Direction, bi: i32, t: Direction, ti: i32) -> Ijk {
    t.with(b.with(a.with((0, 0, 0), ai), bi), ti)
}

impl ProcBlock {
    /// Cell `layer` cells outward from the boundary face: `0` is the first
    /// interior cell, `1..=num_ghosts` are the ghost layers.
    fn outward_cell(&self, face: BoundaryFace, layer: i32, a: i32, b: i32) -> Ijk {
        let dir = face.direction();
        dir.to_ijk(face.ghost_index(layer, self.num(dir)), a, b)
    }

    /// Overwrite the geometry of `target` with the mirror image of `src`.
    ///
    /// Along `normal_dir` the mirror swaps the lower and upper faces; the face
    /// of `target` that coincides with the face of `src` is left alone.
    fn reflect_cell_geom(&mut self, target: Ijk, src: Ijk, normal_dir: Direction, plane: &Plane) {
        self.vol[target] = self.vol[src];
        self.center[target] = plane.reflect_point(self.center[src]);
        for dir in Direction::all() {
            let d = dir.index();
            let pairs = if dir == normal_dir {
                [(target, dir.shift(src, 1)), (dir.shift(target, 1), src)]
            } else {
                [(target, src), (dir.shift(target, 1), dir.shift(src, 1))]
            };
            for (to, from) in pairs {
                if to == from {
                    continue;
                }
                let area = self.f_area[d][from].vector();
                let area = if dir == normal_dir {
                    -plane.reflect_vector(area)
                } else {
                    plane.reflect_vector(area)
                };
                self.f_area[d][to] = UnitVecMag::new(area);
                self.f_center[d][to] = plane.reflect_point(self.f_center[d][from]);
            }
        }
        self.populated[target] = true;
    }

    /// Overwrite the geometry of `target` with `src` translated by `delta`.
    fn translate_cell_geom(&mut self, target: Ijk, src: Ijk, delta: Vector3d) {
        self.vol[target] = self.vol[src];
        self.center[target] = self.center[src] + delta;
        for dir in Direction::all() {
            let d = dir.index();
            for (to, from) in [(target, src), (dir.shift(target, 1), dir.shift(src, 1))] {
                self.f_area[d][to] = self.f_area[d][from];
                self.f_center[d][to] = self.f_center[d][from] + delta;
            }
        }
        self.populated[target] = true;
    }

    /// Mirror plane of the boundary face of `face` at tangential position
    /// `(a, b)`, which may lie in the ghost halo of the tangential directions.
    fn boundary_plane(&self, face: BoundaryFace, a: i32, b: i32) -> Plane {
        let dir = face.direction();
        let idx = dir.to_ijk(face.face_index(self.num(dir)), a, b);
        Plane {
            point: self.f_center[dir.index()][idx],
            normal: self.f_area[dir.index()][idx].unit(),
        }
    }

    /// Fill the column of ghost layers behind boundary face `face` at
    /// tangential position `(a, b)` with mirrored geometry. Layers deeper
    /// than the block is thick repeat the spacing of the previous layer.
    fn mirror_column_geom(&mut self, face: BoundaryFace, a: i32, b: i32) {
        let n = self.num(face.direction());
        let plane = self.boundary_plane(face, a, b);
        for layer in 1..=self.num_ghosts {
            let target = self.outward_cell(face, layer, a, b);
            if layer <= n {
                let src = self.outward_cell(face, 1 - layer, a, b);
                self.reflect_cell_geom(target, src, face.direction(), &plane);
            } else {
                let prev = self.outward_cell(face, layer - 1, a, b);
                let prev2 = self.outward_cell(face, layer - 2, a, b);
                let delta = self.center[prev] - self.center[prev2];
                self.translate_cell_geom(target, prev, delta);
            }
        }
    }

    /// Assign geometry to the ghost cells behind every non-interblock surface.
    pub fn assign_ghost_cells_geom(&mut self) {
        let surfaces: Vec<_> = self
            .bc
            .surfaces()
            .iter()
            .filter(|s| !s.kind.is_interblock())
            .cloned()
            .collect();
        for surf in surfaces {
            let (t1, t2) = surf.face.direction().tangents();
            for b in surf.cell_range(t2) {
                for a in surf.cell_range(t1) {
                    self.mirror_column_geom(surf.face, a, b);
                }
            }
        }
    }

    /// Assign geometry to the edge ghost cells that no exchange has
    /// populated.
    ///
    /// The edge cell is mirrored across face `b` from the ghost column of
    /// face `a`, or the other way round when only the latter column exists.
    pub fn assign_ghost_cells_geom_edge(&mut self) {
        let g = self.num_ghosts;
        for (fa, fb) in block_edges() {
            let (da, db) = (fa.direction(), fb.direction());
            let dt = Direction::third(da, db);
            let (na, nb) = (self.num(da), self.num(db));
            for t in 0..self.num(dt) {
                for la in 1..=g {
                    for lb in 1..=g {
                        let target = compose(
                            da,
                            fa.ghost_index(la, na),
                            db,
                            fb.ghost_index(lb, nb),
                            dt,
                            t,
                        );
                        if self.populated[target] {
                            continue;
                        }
                        let via_b =
                            compose(da, fa.ghost_index(la, na), db, fb.ghost_index(1 - lb, nb), dt, t);
                        let via_a =
                            compose(da, fa.ghost_index(1 - la, na), db, fb.ghost_index(lb, nb), dt, t);
                        self.edge_fallback[target] = true;
                        if lb <= nb && self.populated[via_b] {
                            let plane = self.edge_plane(fb, target);
                            self.reflect_cell_geom(target, via_b, db, &plane);
                        } else if la <= na && self.populated[via_a] {
                            let plane = self.edge_plane(fa, target);
                            self.reflect_cell_geom(target, via_a, da, &plane);
                        } else if let Some((prev, prev2)) =
                            self.edge_extrapolation(fa, fb, target, la, lb)
                        {
                            let delta = self.center[prev] - self.center[prev2];
                            self.translate_cell_geom(target, prev, delta);
                        } else {
                            warn!(
                                block = self.global_pos,
                                cell = ?target,
                                "edge ghost geometry has no populated neighbor"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Plane of the face `face` in the row of the edge cell `target`.
    fn edge_plane(&self, face: BoundaryFace, target: Ijk) -> Plane {
        let dir = face.direction();
        let (t1, t2) = dir.tangents();
        self.boundary_plane(face, t1.component(target), t2.component(target))
    }

    /// Two populated cells inward of `target` along a thin edge direction,
    /// used to extrapolate the spacing when mirroring is not possible.
    fn edge_extrapolation(
        &self,
        fa: BoundaryFace,
        fb: BoundaryFace,
        target: Ijk,
        la: i32,
        lb: i32,
    ) -> Option<(Ijk, Ijk)> {
        for (face, layer) in [(fb, lb), (fa, la)] {
            let dir = face.direction();
            let n = self.num(dir);
            let prev = dir.with(target, face.ghost_index(layer - 1, n));
            let prev2 = dir.with(target, face.ghost_index(layer - 2, n));
            if self.populated.in_bounds(prev2.0, prev2.1, prev2.2)
                && self.populated[prev]
                && self.populated[prev2]
            {
                return Some((prev, prev2));
            }
        }
        None
    }

    /// Outward unit normal of `face` in the row of cell `ijk`.
    fn outward_unit(&self, face: BoundaryFace, ijk: Ijk) -> Vector3d {
        outward_normal(face, &self.edge_plane(face, ijk).normal)
    }

    /// Wall distance of the physical cell nearest to `ijk`.
    fn nearest_wall_dist(&self, ijk: Ijk) -> f64 {
        let clamp = |v: i32, n: i32| v.clamp(0, n - 1);
        self.wall_dist[(
            clamp(ijk.0, self.num_i),
            clamp(ijk.1, self.num_j),
            clamp(ijk.2, self.num_k),
        )]
    }

    /// Apply `kind` to the ghost column behind `face` at `(a, b)`.
    fn assign_column_state(
        &mut self,
        kind: BcKind,
        face: BoundaryFace,
        a: i32,
        b: i32,
        settings: &Settings,
        inviscid_only: bool,
    ) {
        let n = self.num(face.direction());
        let first = self.outward_cell(face, 0, a, b);
        let normal = self.outward_unit(face, first);
        let wall_dist = self.wall_dist[first];
        for layer in 1..=self.num_ghosts {
            let target = self.outward_cell(face, layer, a, b);
            let ghost = if layer == 1 || !kind.duplicates_second_layer() {
                let interior = self.outward_cell(face, 1 - layer.min(n), a, b);
                ghost_state(
                    kind,
                    &self.state[interior],
                    &normal,
                    wall_dist,
                    settings,
                    inviscid_only,
                )
            } else {
                self.state[self.outward_cell(face, layer - 1, a, b)]
            };
            self.state[target] = ghost;
        }
    }

    fn assign_surface_states(&mut self, settings: &Settings, viscous_pass: bool) {
        let surfaces: Vec<_> = self
            .bc
            .surfaces()
            .iter()
            .filter(|s| !s.kind.is_interblock())
            .filter(|s| !viscous_pass || s.kind == BcKind::ViscousWall)
            .cloned()
            .collect();
        for surf in surfaces {
            let (t1, t2) = surf.face.direction().tangents();
            for b in surf.cell_range(t2) {
                for a in surf.cell_range(t1) {
                    self.assign_column_state(surf.kind, surf.face, a, b, settings, !viscous_pass);
                }
            }
        }
    }

    /// Ghost states of every non-interblock surface, with `viscousWall`
    /// acting as `slipWall`.
    pub fn assign_inviscid_ghost_cells(&mut self, settings: &Settings) {
        self.assign_surface_states(settings, false);
    }

    /// Recompute the ghost states of `viscousWall` surfaces with the no-slip
    /// transform.
    pub fn assign_viscous_ghost_cells(&mut self, settings: &Settings) {
        self.assign_surface_states(settings, true);
    }

    /// Edge ghost states. Edges with an interblock face only touch the cells
    /// that no exchange delivered.
    pub fn assign_inviscid_ghost_cells_edge(&mut self, settings: &Settings) {
        self.assign_ghost_cells_edge(settings, false);
    }

    /// Edge ghost states for edges touching a `viscousWall`.
    pub fn assign_viscous_ghost_cells_edge(&mut self, settings: &Settings) {
        self.assign_ghost_cells_edge(settings, true);
    }

    fn assign_ghost_cells_edge(&mut self, settings: &Settings, viscous_pass: bool) {
        let g = self.num_ghosts;
        for (fa, fb) in block_edges() {
            let (da, db) = (fa.direction(), fb.direction());
            let dt = Direction::third(da, db);
            let (na, nb) = (self.num(da), self.num(db));
            for t in 0..self.num(dt) {
                let corner = compose(
                    da,
                    fa.interior_index(0, na),
                    db,
                    fb.interior_index(0, nb),
                    dt,
                    t,
                );
                let (Some(kind_a), Some(kind_b)) = (
                    self.bc.surface_at_cell(fa, corner).map(|s| s.kind),
                    self.bc.surface_at_cell(fb, corner).map(|s| s.kind),
                ) else {
                    continue;
                };
                let exchanged = kind_a.is_interblock() || kind_b.is_interblock();
                if viscous_pass && kind_a != BcKind::ViscousWall && kind_b != BcKind::ViscousWall {
                    continue;
                }

                let cell = |la: i32, lb: i32| {
                    compose(da, fa.ghost_index(la, na), db, fb.ghost_index(lb, nb), dt, t)
                };
                for la in 1..=g {
                    for lb in 1..=g {
                        let target = cell(la, lb);
                        if exchanged && !self.edge_fallback[target] {
                            continue;
                        }
                        let value = match (kind_a.is_wall(), kind_b.is_wall()) {
                            (true, false) => {
                                let src = cell(1 - la.min(na), lb);
                                self.edge_wall_state(kind_a, fa, src, corner, settings, viscous_pass)
                            }
                            (false, true) => {
                                let src = cell(la, 1 - lb.min(nb));
                                self.edge_wall_state(kind_b, fb, src, corner, settings, viscous_pass)
                            }
                            _ => {
                                let from_a = self.state[cell(la, 1 - lb.min(nb))];
                                let from_b = self.state[cell(1 - la.min(na), lb)];
                                (from_a + from_b) * 0.5
                            }
                        };
                        self.state[target] = value;
                    }
                }
            }
        }
    }

    /// Wall policy of `wall` applied to the state at `src`, which sits in the
    /// ghost column of the other face.
    fn edge_wall_state(
        &self,
        kind: BcKind,
        wall: BoundaryFace,
        src: Ijk,
        corner: Ijk,
        settings: &Settings,
        viscous_pass: bool,
    ) -> PrimVars {
        let normal = self.outward_unit(wall, src);
        ghost_state(
            kind,
            &self.state[src],
            &normal,
            self.nearest_wall_dist(corner),
            settings,
            !viscous_pass,
        )
    }
}
