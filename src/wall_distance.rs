//! Distance from every physical cell to the nearest viscous wall.

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use crate::boundary_conditions::BcKind;
use crate::proc_block::ProcBlock;
use crate::vector3d::Vector3d;

/// Face center of a viscous-wall face.
#[derive(Clone, Debug, PartialEq)]
struct WallFace {
    center: [f64; 3],
}

impl RTreeObject for WallFace {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.center)
    }
}

impl PointDistance for WallFace {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.center[0] - point[0];
        let dy = self.center[1] - point[1];
        let dz = self.center[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// R-tree over the face centers of all viscous-wall faces.
pub struct WallTree {
    tree: RTree<WallFace>,
}

impl WallTree {
    /// Collect the viscous-wall faces of `blocks`.
    pub fn new(blocks: &[ProcBlock]) -> Self {
        let mut faces = Vec::new();
        for block in blocks {
            faces.extend(viscous_face_centers(block).into_iter().map(|c| WallFace {
                center: c.to_array(),
            }));
        }
        debug!(faces = faces.len(), "viscous wall faces");
        Self {
            tree: RTree::bulk_load(faces),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Distance from `point` to the closest wall face center, `None` without
    /// any wall.
    pub fn nearest_distance(&self, point: &Vector3d) -> Option<f64> {
        let p = point.to_array();
        self.tree
            .nearest_neighbor(&p)
            .map(|face| face.distance_2(&p).sqrt())
    }
}

/// Face centers of the viscous-wall surfaces of one block.
pub fn viscous_face_centers(block: &ProcBlock) -> Vec<Vector3d> {
    let mut centers = Vec::new();
    for surf in block.bc().surfaces().iter().filter(|s| s.kind == BcKind::ViscousWall) {
        let dir = surf.face.direction();
        let (t1, t2) = dir.tangents();
        let n = surf.const_index();
        for b in surf.cell_range(t2) {
            for a in surf.cell_range(t1) {
                centers.push(block.f_center(dir, dir.to_ijk(n, a, b)));
            }
        }
    }
    centers
}

impl ProcBlock {
    /// Set the wall distance of every physical cell from `tree`. Blocks in a
    /// domain without viscous walls keep the maximum distance.
    pub fn calc_wall_distance(&mut self, tree: &WallTree) {
        for ijk in self.wall_dist.physical_indices().collect::<Vec<_>>() {
            if let Some(d) = tree.nearest_distance(&self.center[ijk]) {
                self.wall_dist[ijk] = d;
            }
        }
    }
}

/// Wall distance for every cell of `blocks` against all of their viscous walls.
pub fn calc_wall_distance(blocks: &mut [ProcBlock]) {
    let tree = WallTree::new(blocks);
    if tree.is_empty() {
        return;
    }
    for block in blocks.iter_mut() {
        block.calc_wall_distance(&tree);
    }
}
