//! Boundary surfaces of a block and the ghost-state policies behind them.

use std::ops::Range;

use serde::Serialize;

use crate::axis::{BoundaryFace, Direction};
use crate::error::SolverError;
use crate::input::Settings;
use crate::primvars::PrimVars;
use crate::turbulence::TurbulenceModel;
use crate::vector3d::Vector3d;

/// Closed set of boundary policies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BcKind {
    SlipWall,
    ViscousWall,
    Characteristic,
    SupersonicInflow,
    SupersonicOutflow,
    SubsonicInflow,
    SubsonicOutflow,
    Interblock,
}

impl BcKind {
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "slipWall" => Ok(Self::SlipWall),
            "viscousWall" => Ok(Self::ViscousWall),
            "characteristic" => Ok(Self::Characteristic),
            "supersonicInflow" => Ok(Self::SupersonicInflow),
            "supersonicOutflow" => Ok(Self::SupersonicOutflow),
            "subsonicInflow" => Ok(Self::SubsonicInflow),
            "subsonicOutflow" => Ok(Self::SubsonicOutflow),
            "interblock" => Ok(Self::Interblock),
            other => Err(SolverError::UnknownOption {
                option: "boundary condition",
                value: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SlipWall => "slipWall",
            Self::ViscousWall => "viscousWall",
            Self::Characteristic => "characteristic",
            Self::SupersonicInflow => "supersonicInflow",
            Self::SupersonicOutflow => "supersonicOutflow",
            Self::SubsonicInflow => "subsonicInflow",
            Self::SubsonicOutflow => "subsonicOutflow",
            Self::Interblock => "interblock",
        }
    }

    pub fn is_wall(self) -> bool {
        matches!(self, Self::SlipWall | Self::ViscousWall)
    }

    pub fn is_interblock(self) -> bool {
        self == Self::Interblock
    }

    /// Policies whose second ghost layer copies the first instead of
    /// re-applying the transform to the second interior layer.
    pub fn duplicates_second_layer(self) -> bool {
        !self.is_wall()
    }

    pub fn code(self) -> i32 {
        match self {
            Self::SlipWall => 0,
            Self::ViscousWall => 1,
            Self::Characteristic => 2,
            Self::SupersonicInflow => 3,
            Self::SupersonicOutflow => 4,
            Self::SubsonicInflow => 5,
            Self::SubsonicOutflow => 6,
            Self::Interblock => 7,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, SolverError> {
        match code {
            0 => Ok(Self::SlipWall),
            1 => Ok(Self::ViscousWall),
            2 => Ok(Self::Characteristic),
            3 => Ok(Self::SupersonicInflow),
            4 => Ok(Self::SupersonicOutflow),
            5 => Ok(Self::SubsonicInflow),
            6 => Ok(Self::SubsonicOutflow),
            7 => Ok(Self::Interblock),
            other => Err(SolverError::UnknownOption {
                option: "boundary condition code",
                value: other.to_string(),
            }),
        }
    }
}

/// Patch of a block face carrying one policy.
///
/// Extents are node indices, so a surface on `imin` of a block with `nj`
/// cells in j spans `jmin = 0 ..= jmax = nj` and covers cells `jmin..jmax`.
/// Interblock surfaces on two blocks are partners when their tags match.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundarySurface {
    pub kind: BcKind,
    pub face: BoundaryFace,
    pub imin: i32,
    pub imax: i32,
    pub jmin: i32,
    pub jmax: i32,
    pub kmin: i32,
    pub kmax: i32,
    pub tag: i32,
}

impl BoundarySurface {
    /// Surface covering all of `face` on a block with `(ni, nj, nk)` cells.
    pub fn whole_face(kind: BcKind, face: BoundaryFace, dims: (i32, i32, i32), tag: i32) -> Self {
        let (ni, nj, nk) = dims;
        let mut surf = Self {
            kind,
            face,
            imin: 0,
            imax: ni,
            jmin: 0,
            jmax: nj,
            kmin: 0,
            kmax: nk,
            tag,
        };
        let n = face.face_index(face.direction().component(dims));
        surf.set_range(face.direction(), n, n);
        surf
    }

    /// Surface on `face` covering the cell ranges `r1 x r2` along the face's
    /// tangential directions.
    pub fn patch(
        kind: BcKind,
        face: BoundaryFace,
        dims: (i32, i32, i32),
        r1: Range<i32>,
        r2: Range<i32>,
        tag: i32,
    ) -> Self {
        let mut surf = Self::whole_face(kind, face, dims, tag);
        let (t1, t2) = face.direction().tangents();
        surf.set_range(t1, r1.start, r1.end);
        surf.set_range(t2, r2.start, r2.end);
        surf
    }

    /// Node extent `(min, max)` along `dir`.
    pub fn range(&self, dir: Direction) -> (i32, i32) {
        match dir {
            Direction::I => (self.imin, self.imax),
            Direction::J => (self.jmin, self.jmax),
            Direction::K => (self.kmin, self.kmax),
        }
    }

    pub fn set_range(&mut self, dir: Direction, min: i32, max: i32) {
        match dir {
            Direction::I => {
                self.imin = min;
                self.imax = max;
            }
            Direction::J => {
                self.jmin = min;
                self.jmax = max;
            }
            Direction::K => {
                self.kmin = min;
                self.kmax = max;
            }
        }
    }

    /// Cells covered along a tangential direction.
    pub fn cell_range(&self, dir: Direction) -> Range<i32> {
        let (min, max) = self.range(dir);
        min..max
    }

    /// Constant node index of the surface plane.
    pub fn const_index(&self) -> i32 {
        self.range(self.face.direction()).0
    }

    /// True when the surface covers the cell at tangential position `(t1, t2)`.
    pub fn contains(&self, t1: i32, t2: i32) -> bool {
        let (d1, d2) = self.face.direction().tangents();
        self.cell_range(d1).contains(&t1) && self.cell_range(d2).contains(&t2)
    }

    pub fn num_faces(&self) -> i32 {
        let (d1, d2) = self.face.direction().tangents();
        let (a1, b1) = self.range(d1);
        let (a2, b2) = self.range(d2);
        (b1 - a1) * (b2 - a2)
    }

    fn shifted(&self, dir: Direction, by: i32) -> Self {
        let mut out = self.clone();
        let (min, max) = self.range(dir);
        out.set_range(dir, min + by, max + by);
        out
    }
}

/// A surface that was divided when its block was split. The partner of
/// `old_tag` must split its own surface the same way and hand the part
/// facing the new block `new_tag`.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitRecord {
    pub old_tag: i32,
    pub new_tag: i32,
    pub surface: BoundarySurface,
}

/// Ordered list of the boundary surfaces of one block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoundaryConditions {
    surfaces: Vec<BoundarySurface>,
}

impl BoundaryConditions {
    pub fn new(surfaces: Vec<BoundarySurface>) -> Self {
        Self { surfaces }
    }

    /// Every face of the block covered by one policy each, in face order
    /// imin, imax, jmin, jmax, kmin, kmax.
    pub fn from_faces(dims: (i32, i32, i32), kinds: [BcKind; 6], tags: [i32; 6]) -> Self {
        let surfaces = BoundaryFace::all()
            .iter()
            .enumerate()
            .map(|(n, face)| BoundarySurface::whole_face(kinds[n], *face, dims, tags[n]))
            .collect();
        Self { surfaces }
    }

    pub fn surfaces(&self) -> &[BoundarySurface] {
        &self.surfaces
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn push(&mut self, surface: BoundarySurface) {
        self.surfaces.push(surface);
    }

    pub fn on_face(&self, face: BoundaryFace) -> impl Iterator<Item = &BoundarySurface> {
        self.surfaces.iter().filter(move |s| s.face == face)
    }

    /// Surface of `face` covering tangential cell `(t1, t2)`.
    pub fn surface_at(&self, face: BoundaryFace, t1: i32, t2: i32) -> Option<&BoundarySurface> {
        self.on_face(face).find(|s| s.contains(t1, t2))
    }

    /// Surface of `face` covering the boundary-adjacent cell `ijk`.
    pub fn surface_at_cell(&self, face: BoundaryFace, ijk: (i32, i32, i32)) -> Option<&BoundarySurface> {
        let (d1, d2) = face.direction().tangents();
        self.surface_at(face, d1.component(ijk), d2.component(ijk))
    }

    /// Policy of the face containing boundary cell `(t1, t2)`.
    pub fn kind_at(&self, face: BoundaryFace, t1: i32, t2: i32) -> Option<BcKind> {
        self.surface_at(face, t1, t2).map(|s| s.kind)
    }

    pub fn interblocks(&self) -> impl Iterator<Item = &BoundarySurface> {
        self.surfaces.iter().filter(|s| s.kind.is_interblock())
    }

    pub fn has_kind(&self, kind: BcKind) -> bool {
        self.surfaces.iter().any(|s| s.kind == kind)
    }

    pub fn max_tag(&self) -> i32 {
        self.surfaces.iter().map(|s| s.tag).max().unwrap_or(0)
    }

    /// Split the list for a block cut along `dir` before cell `ind`.
    ///
    /// Returns the upper block's surfaces and the divided interblock
    /// surfaces whose partners need a matching split. `self` keeps the
    /// lower block's surfaces. New tags are drawn from `next_tag`.
    pub fn split(
        &mut self,
        dir: Direction,
        ind: i32,
        dims: (i32, i32, i32),
        next_tag: &mut i32,
    ) -> (BoundaryConditions, Vec<SplitRecord>) {
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        let mut records = Vec::new();
        for surf in self.surfaces.drain(..) {
            if surf.face.direction() == dir {
                if surf.face.is_upper() {
                    upper.push(surf.shifted(dir, -ind));
                } else {
                    lower.push(surf);
                }
                continue;
            }
            let (min, max) = surf.range(dir);
            if max <= ind {
                lower.push(surf);
            } else if min >= ind {
                upper.push(surf.shifted(dir, -ind));
            } else {
                let mut low = surf.clone();
                low.set_range(dir, min, ind);
                let mut high = surf.clone();
                high.set_range(dir, 0, max - ind);
                if surf.kind.is_interblock() {
                    let new_tag = *next_tag;
                    *next_tag += 1;
                    high.tag = new_tag;
                    records.push(SplitRecord {
                        old_tag: surf.tag,
                        new_tag,
                        surface: surf.clone(),
                    });
                }
                lower.push(low);
                upper.push(high);
            }
        }

        let cut_tag = *next_tag;
        *next_tag += 1;
        let mut lower_dims = dims;
        let mut upper_dims = dims;
        match dir {
            Direction::I => {
                lower_dims.0 = ind;
                upper_dims.0 = dims.0 - ind;
            }
            Direction::J => {
                lower_dims.1 = ind;
                upper_dims.1 = dims.1 - ind;
            }
            Direction::K => {
                lower_dims.2 = ind;
                upper_dims.2 = dims.2 - ind;
            }
        }
        lower.push(BoundarySurface::whole_face(
            BcKind::Interblock,
            BoundaryFace::new(dir, true),
            lower_dims,
            cut_tag,
        ));
        upper.push(BoundarySurface::whole_face(
            BcKind::Interblock,
            BoundaryFace::new(dir, false),
            upper_dims,
            cut_tag,
        ));
        self.surfaces = lower;
        (BoundaryConditions::new(upper), records)
    }

    /// Split the surface tagged `tag` at node `node` along `axis`, giving the
    /// part above the node (`high_is_new`) or below it the tag `new_tag`.
    pub fn dependent_split(
        &mut self,
        tag: i32,
        axis: Direction,
        node: i32,
        new_tag: i32,
        high_is_new: bool,
    ) -> Result<(), SolverError> {
        let pos = self
            .surfaces
            .iter()
            .position(|s| s.kind.is_interblock() && s.tag == tag)
            .ok_or(SolverError::UnmatchedInterblock(tag))?;
        let surf = self.surfaces[pos].clone();
        let (min, max) = surf.range(axis);
        if node <= min || node >= max {
            let whole_is_high = node <= min;
            if whole_is_high == high_is_new {
                self.surfaces[pos].tag = new_tag;
            }
            return Ok(());
        }
        let mut low = surf.clone();
        low.set_range(axis, min, node);
        let mut high = surf;
        high.set_range(axis, node, max);
        if high_is_new {
            high.tag = new_tag;
        } else {
            low.tag = new_tag;
        }
        self.surfaces[pos] = low;
        self.surfaces.insert(pos + 1, high);
        Ok(())
    }

    /// Merge the surfaces of `upper` into `self` for blocks joined along
    /// `dir`, where the lower block has `lower_extent` cells along `dir`.
    pub fn join(&mut self, upper: &BoundaryConditions, dir: Direction, lower_extent: i32) {
        let cut_tags: Vec<i32> = upper
            .on_face(BoundaryFace::new(dir, false))
            .filter(|s| s.kind.is_interblock())
            .map(|s| s.tag)
            .collect();
        self.surfaces.retain(|s| {
            !(s.face == BoundaryFace::new(dir, true)
                && s.kind.is_interblock()
                && cut_tags.contains(&s.tag))
        });

        for surf in upper.surfaces() {
            if surf.face == BoundaryFace::new(dir, false)
                && surf.kind.is_interblock()
                && cut_tags.contains(&surf.tag)
            {
                continue;
            }
            let moved = surf.shifted(dir, lower_extent);
            if surf.face.direction() != dir {
                let mergeable = self.surfaces.iter_mut().find(|s| {
                    s.face == moved.face
                        && s.kind == moved.kind
                        && s.tag == moved.tag
                        && s.range(dir).1 == moved.range(dir).0
                        && Direction::all()
                            .iter()
                            .filter(|d| **d != dir)
                            .all(|d| s.range(*d) == moved.range(*d))
                });
                if let Some(existing) = mergeable {
                    let min = existing.range(dir).0;
                    existing.set_range(dir, min, moved.range(dir).1);
                    continue;
                }
            }
            self.surfaces.push(moved);
        }
    }
}

/// Outward unit normal of a boundary face given the stored face area unit
/// vector (which points toward increasing index).
pub fn outward_normal(face: BoundaryFace, area_unit: &Vector3d) -> Vector3d {
    *area_unit * face.outward_sign()
}

/// Ghost state produced by policy `kind` from the interior state of the
/// matching interior layer.
///
/// * `normal` - outward unit normal of the boundary face.
/// * `wall_dist` - wall distance of the first interior cell.
/// * `inviscid_only` - degrade `viscousWall` to `slipWall`.
pub fn ghost_state(
    kind: BcKind,
    interior: &PrimVars,
    normal: &Vector3d,
    wall_dist: f64,
    settings: &Settings,
    inviscid_only: bool,
) -> PrimVars {
    let eos = &settings.eos;
    match kind {
        BcKind::SlipWall => interior.reflect_velocity(normal),
        BcKind::ViscousWall if inviscid_only => interior.reflect_velocity(normal),
        BcKind::ViscousWall => {
            let mut ghost = *interior;
            ghost.set_velocity(-interior.velocity());
            if settings.is_turbulent() {
                let t = interior.temperature(eos);
                let mu = settings.suth.effective_viscosity(t);
                let omega_wall = settings
                    .turbulence
                    .wall_omega(mu, interior.rho(), wall_dist.max(f64::MIN_POSITIVE));
                ghost.set_turbulence(-interior.tke(), 2.0 * omega_wall - interior.omega());
            }
            ghost
        }
        BcKind::Characteristic => characteristic_state(interior, normal, settings),
        BcKind::SupersonicInflow => settings.inlet,
        BcKind::SupersonicOutflow | BcKind::Interblock => *interior,
        BcKind::SubsonicInflow => {
            let mut ghost = settings.inlet;
            ghost.set_p(interior.p());
            ghost
        }
        BcKind::SubsonicOutflow => {
            let mut ghost = *interior;
            ghost.set_p(settings.outlet_pressure);
            ghost
        }
    }
}

/// Far-field state from Riemann invariants against the freestream.
fn characteristic_state(interior: &PrimVars, normal: &Vector3d, settings: &Settings) -> PrimVars {
    let eos = &settings.eos;
    let fs = &settings.freestream;
    let rho0 = interior.rho();
    let a0 = interior.sos(eos);
    let vn_int = interior.velocity().dot(normal);
    let mach_n = vn_int / a0;

    if mach_n <= -1.0 {
        return *fs;
    }
    if mach_n >= 1.0 {
        return *interior;
    }
    let ra = rho0 * a0;
    if vn_int < 0.0 {
        // subsonic inflow
        let pb = 0.5
            * (fs.p() + interior.p() - ra * normal.dot(&(fs.velocity() - interior.velocity())));
        let rhob = fs.rho() + (pb - fs.p()) / (a0 * a0);
        let velb = fs.velocity() - *normal * ((fs.p() - pb) / ra);
        PrimVars::new(rhob, velb, pb).with_turbulence(fs.tke(), fs.omega())
    } else {
        // subsonic outflow
        let pb = fs.p();
        let rhob = interior.rho() + (pb - interior.p()) / (a0 * a0);
        let velb = interior.velocity() + *normal * ((interior.p() - pb) / ra);
        PrimVars::new(rhob, velb, pb).with_turbulence(interior.tke(), interior.omega())
    }
}
