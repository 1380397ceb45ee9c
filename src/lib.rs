pub mod axis;
pub mod block;
pub mod boundary_conditions;
pub mod codec;
pub mod eos;
pub mod error;
pub mod ghost_cells;
pub mod implicit;
pub mod input;
pub mod interblock;
pub mod inviscid_flux;
pub mod multi_array;
pub mod parallel;
pub mod primvars;
pub mod proc_block;
pub mod reconstruction;
pub mod slices;
pub mod solver;
pub mod time_advance;
pub mod turbulence;
pub mod vector3d;
pub mod viscosity;
pub mod viscous_flux;
pub mod wall_distance;

pub use axis::{BoundaryFace, Direction, Ijk};
pub use block::Block;
pub use boundary_conditions::{BcKind, BoundaryConditions, BoundarySurface};
pub use codec::{from_bytes, to_bytes, BlockSolution, Decode, Encode};
pub use eos::IdealGas;
pub use error::SolverError;
pub use input::{Input, Settings};
pub use interblock::{find_connections, Interblock, Orientation};
pub use multi_array::MultiArray3d;
pub use parallel::{Communicator, ThreadComm, ROOT};
pub use primvars::{PrimVars, VarArray};
pub use proc_block::ProcBlock;
pub use solver::{Solver, StepReport};
pub use time_advance::Residual;
pub use vector3d::{Tensor, UnitVecMag, Vector3d};
pub use wall_distance::calc_wall_distance;
