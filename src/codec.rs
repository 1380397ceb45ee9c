//! Little-endian binary packing of everything that crosses a process
//! boundary: blocks, slices, connections and solution fields.
//!
//! Every message is a flat byte buffer. Arrays carry their extents and
//! ghost depth ahead of the data so the receiver can rebuild them without
//! knowing the sender's block.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::axis::BoundaryFace;
use crate::boundary_conditions::{BcKind, BoundaryConditions, BoundarySurface};
use crate::error::SolverError;
use crate::interblock::{ConnectionSide, Interblock, Orientation};
use crate::multi_array::MultiArray3d;
use crate::primvars::{PrimVars, VarArray, NUM_VARS};
use crate::proc_block::ProcBlock;
use crate::slices::{GeomSlice, StateSlice};
use crate::time_advance::{ResidLinf, Residual};
use crate::vector3d::{Tensor, UnitVecMag, Vector3d};

/// Append `self` to a message buffer.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);
}

/// Rebuild a value from the front of a message, advancing the reader.
pub trait Decode: Sized {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError>;
}

/// Encode a value into a fresh buffer.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

/// Decode a complete message; trailing bytes are an error.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, SolverError> {
    let mut rdr = bytes;
    let value = T::decode(&mut rdr)?;
    if !rdr.is_empty() {
        return Err(SolverError::Decode(format!(
            "{} trailing bytes after message",
            rdr.len()
        )));
    }
    Ok(value)
}

fn put_f64(buf: &mut Vec<u8>, v: f64) {
    let mut b = [0u8; 8];
    LittleEndian::write_f64(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_i32(buf: &mut Vec<u8>, v: i32) {
    let mut b = [0u8; 4];
    LittleEndian::write_i32(&mut b, v);
    buf.extend_from_slice(&b);
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    let mut b = [0u8; 8];
    LittleEndian::write_u64(&mut b, v);
    buf.extend_from_slice(&b);
}

impl Encode for f64 {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_f64(buf, *self);
    }
}

impl Decode for f64 {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(rdr.read_f64::<LittleEndian>()?)
    }
}

impl Encode for i32 {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, *self);
    }
}

impl Decode for i32 {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(rdr.read_i32::<LittleEndian>()?)
    }
}

impl Encode for usize {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_u64(buf, *self as u64);
    }
}

impl Decode for usize {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let v = rdr.read_u64::<LittleEndian>()?;
        usize::try_from(v).map_err(|e| SolverError::Decode(e.to_string()))
    }
}

impl Encode for bool {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(u8::from(*self));
    }
}

impl Decode for bool {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        match rdr.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SolverError::Decode(format!("invalid bool byte {other}"))),
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.len().encode(buf);
        for v in self {
            v.encode(buf);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_slice().encode(buf);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let len = usize::decode(rdr)?;
        // each element takes at least one byte
        if len > rdr.len() {
            return Err(SolverError::Decode(format!(
                "sequence of {len} elements in {} remaining bytes",
                rdr.len()
            )));
        }
        (0..len).map(|_| T::decode(rdr)).collect()
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, buf: &mut Vec<u8>) {
        for v in self {
            v.encode(buf);
        }
    }
}

fn decode_array<T: Decode, const N: usize>(rdr: &mut &[u8]) -> Result<[T; N], SolverError> {
    let items = (0..N).map(|_| T::decode(rdr)).collect::<Result<Vec<_>, _>>()?;
    items
        .try_into()
        .map_err(|_| SolverError::Decode("array length mismatch".into()))
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        decode_array(rdr)
    }
}

impl Encode for (i32, i32, i32) {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, self.0);
        put_i32(buf, self.1);
        put_i32(buf, self.2);
    }
}

impl Decode for (i32, i32, i32) {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok((i32::decode(rdr)?, i32::decode(rdr)?, i32::decode(rdr)?))
    }
}

impl Encode for (i32, i32) {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, self.0);
        put_i32(buf, self.1);
    }
}

impl Decode for (i32, i32) {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok((i32::decode(rdr)?, i32::decode(rdr)?))
    }
}

impl Encode for Vector3d {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_f64(buf, self.x);
        put_f64(buf, self.y);
        put_f64(buf, self.z);
    }
}

impl Decode for Vector3d {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(Vector3d::new(f64::decode(rdr)?, f64::decode(rdr)?, f64::decode(rdr)?))
    }
}

impl Encode for UnitVecMag {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.unit().encode(buf);
        put_f64(buf, self.mag());
    }
}

impl Decode for UnitVecMag {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let unit = Vector3d::decode(rdr)?;
        let mag = f64::decode(rdr)?;
        Ok(UnitVecMag::from_parts(unit, mag))
    }
}

impl Encode for Tensor {
    fn encode(&self, buf: &mut Vec<u8>) {
        for row in &self.data {
            row.encode(buf);
        }
    }
}

impl Decode for Tensor {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(Tensor {
            data: decode_array(rdr)?,
        })
    }
}

impl Encode for PrimVars {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.data.encode(buf);
    }
}

impl Decode for PrimVars {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(PrimVars {
            data: decode_array::<f64, NUM_VARS>(rdr)?,
        })
    }
}

impl Encode for VarArray {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.data.encode(buf);
    }
}

impl Decode for VarArray {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(VarArray {
            data: decode_array::<f64, NUM_VARS>(rdr)?,
        })
    }
}

impl<T: Encode> Encode for MultiArray3d<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, self.num_i());
        put_i32(buf, self.num_j());
        put_i32(buf, self.num_k());
        put_i32(buf, self.ghost_layers());
        self.as_slice().encode(buf);
    }
}

impl<T: Decode + Clone> Decode for MultiArray3d<T> {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let (ni, nj, nk) = <(i32, i32, i32)>::decode(rdr)?;
        let g = i32::decode(rdr)?;
        if ni < 0 || nj < 0 || nk < 0 || g < 0 {
            return Err(SolverError::Decode(format!(
                "negative array extent ({ni}, {nj}, {nk}) with {g} ghosts"
            )));
        }
        let data = Vec::<T>::decode(rdr)?;
        let expected = ((ni + 2 * g) * (nj + 2 * g) * (nk + 2 * g)) as usize;
        if data.len() != expected {
            return Err(SolverError::SliceMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(MultiArray3d::from_vec(ni, nj, nk, g, data))
    }
}

impl Encode for BoundaryFace {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, self.code());
    }
}

impl Decode for BoundaryFace {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        BoundaryFace::from_code(i32::decode(rdr)?)
    }
}

impl Encode for BcKind {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, self.code());
    }
}

impl Decode for BcKind {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        BcKind::from_code(i32::decode(rdr)?)
    }
}

impl Encode for BoundarySurface {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.kind.encode(buf);
        self.face.encode(buf);
        for v in [self.imin, self.imax, self.jmin, self.jmax, self.kmin, self.kmax, self.tag] {
            put_i32(buf, v);
        }
    }
}

impl Decode for BoundarySurface {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let kind = BcKind::decode(rdr)?;
        let face = BoundaryFace::decode(rdr)?;
        let [imin, imax, jmin, jmax, kmin, kmax, tag] = decode_array::<i32, 7>(rdr)?;
        Ok(BoundarySurface {
            kind,
            face,
            imin,
            imax,
            jmin,
            jmax,
            kmin,
            kmax,
            tag,
        })
    }
}

impl Encode for BoundaryConditions {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.surfaces().encode(buf);
    }
}

impl Decode for BoundaryConditions {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(BoundaryConditions::new(Vec::decode(rdr)?))
    }
}

impl Encode for Orientation {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_i32(buf, self.code());
    }
}

impl Decode for Orientation {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Orientation::new(i32::decode(rdr)?)
    }
}

impl Encode for ConnectionSide {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.block.encode(buf);
        self.rank.encode(buf);
        self.local.encode(buf);
        self.face.encode(buf);
        self.range1.encode(buf);
        self.range2.encode(buf);
        put_i32(buf, self.tag);
        self.border.encode(buf);
    }
}

impl Decode for ConnectionSide {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(ConnectionSide {
            block: usize::decode(rdr)?,
            rank: usize::decode(rdr)?,
            local: usize::decode(rdr)?,
            face: BoundaryFace::decode(rdr)?,
            range1: <(i32, i32)>::decode(rdr)?,
            range2: <(i32, i32)>::decode(rdr)?,
            tag: i32::decode(rdr)?,
            border: decode_array(rdr)?,
        })
    }
}

impl Encode for Interblock {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.sides.encode(buf);
        self.orientation.encode(buf);
    }
}

impl Decode for Interblock {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let [first, second] = decode_array::<ConnectionSide, 2>(rdr)?;
        let orientation = Orientation::decode(rdr)?;
        Ok(Interblock::new(first, second, orientation))
    }
}

impl Encode for GeomSlice {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.block_dims.encode(buf);
        self.center.encode(buf);
        self.vol.encode(buf);
        self.f_area.encode(buf);
        self.f_center.encode(buf);
        self.populated.encode(buf);
    }
}

impl Decode for GeomSlice {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(GeomSlice {
            block_dims: <(i32, i32, i32)>::decode(rdr)?,
            center: MultiArray3d::decode(rdr)?,
            vol: MultiArray3d::decode(rdr)?,
            f_area: decode_array(rdr)?,
            f_center: decode_array(rdr)?,
            populated: MultiArray3d::decode(rdr)?,
        })
    }
}

impl<T: Encode> Encode for StateSlice<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.block_dims.encode(buf);
        self.values.encode(buf);
        self.populated.encode(buf);
    }
}

impl<T: Decode + Clone> Decode for StateSlice<T> {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(StateSlice {
            block_dims: <(i32, i32, i32)>::decode(rdr)?,
            values: MultiArray3d::decode(rdr)?,
            populated: MultiArray3d::decode(rdr)?,
        })
    }
}

impl Encode for ResidLinf {
    fn encode(&self, buf: &mut Vec<u8>) {
        put_f64(buf, self.value);
        self.block.encode(buf);
        self.cell.encode(buf);
        self.eq.encode(buf);
    }
}

impl Decode for ResidLinf {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(ResidLinf {
            value: f64::decode(rdr)?,
            block: usize::decode(rdr)?,
            cell: <(i32, i32, i32)>::decode(rdr)?,
            eq: usize::decode(rdr)?,
        })
    }
}

impl Encode for Residual {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.l2.encode(buf);
        self.linf.encode(buf);
    }
}

impl Decode for Residual {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(Residual {
            l2: VarArray::decode(rdr)?,
            linf: ResidLinf::decode(rdr)?,
        })
    }
}

impl Encode for ProcBlock {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.dims().encode(buf);
        put_i32(buf, self.num_ghosts);
        self.parent_block.encode(buf);
        self.parent_start.encode(buf);
        self.rank.encode(buf);
        self.global_pos.encode(buf);
        self.local_pos.encode(buf);
        self.bc.encode(buf);
        self.state.encode(buf);
        self.cons_vars_n.encode(buf);
        self.cons_vars_nm1.encode(buf);
        self.center.encode(buf);
        self.vol.encode(buf);
        self.f_area.encode(buf);
        self.f_center.encode(buf);
        self.populated.encode(buf);
        self.edge_fallback.encode(buf);
        self.residual.encode(buf);
        self.avg_wave_speed.encode(buf);
        self.dt.encode(buf);
        self.wall_dist.encode(buf);
        self.vel_grad.encode(buf);
        self.temp_grad.encode(buf);
        self.tke_grad.encode(buf);
        self.omega_grad.encode(buf);
        self.eddy_visc.encode(buf);
    }
}

impl Decode for ProcBlock {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        let (num_i, num_j, num_k) = <(i32, i32, i32)>::decode(rdr)?;
        let block = ProcBlock {
            num_i,
            num_j,
            num_k,
            num_ghosts: i32::decode(rdr)?,
            parent_block: usize::decode(rdr)?,
            parent_start: <(i32, i32, i32)>::decode(rdr)?,
            rank: usize::decode(rdr)?,
            global_pos: usize::decode(rdr)?,
            local_pos: usize::decode(rdr)?,
            bc: BoundaryConditions::decode(rdr)?,
            state: MultiArray3d::decode(rdr)?,
            cons_vars_n: MultiArray3d::decode(rdr)?,
            cons_vars_nm1: MultiArray3d::decode(rdr)?,
            center: MultiArray3d::decode(rdr)?,
            vol: MultiArray3d::decode(rdr)?,
            f_area: decode_array(rdr)?,
            f_center: decode_array(rdr)?,
            populated: MultiArray3d::decode(rdr)?,
            edge_fallback: MultiArray3d::decode(rdr)?,
            residual: MultiArray3d::decode(rdr)?,
            avg_wave_speed: MultiArray3d::decode(rdr)?,
            dt: MultiArray3d::decode(rdr)?,
            wall_dist: MultiArray3d::decode(rdr)?,
            vel_grad: MultiArray3d::decode(rdr)?,
            temp_grad: MultiArray3d::decode(rdr)?,
            tke_grad: MultiArray3d::decode(rdr)?,
            omega_grad: MultiArray3d::decode(rdr)?,
            eddy_visc: MultiArray3d::decode(rdr)?,
        };
        if block.state.num_i() != num_i || block.state.num_j() != num_j || block.state.num_k() != num_k {
            return Err(SolverError::SliceMismatch {
                expected: block.num_cells(),
                found: block.state.num_physical(),
            });
        }
        Ok(block)
    }
}

/// Fields a process returns to the root after a run.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockSolution {
    pub global_pos: usize,
    pub state: MultiArray3d<PrimVars>,
    pub residual: MultiArray3d<VarArray>,
    pub dt: MultiArray3d<f64>,
    pub avg_wave_speed: MultiArray3d<f64>,
}

impl BlockSolution {
    pub fn from_block(block: &ProcBlock) -> Self {
        Self {
            global_pos: block.global_pos,
            state: block.state.clone(),
            residual: block.residual.clone(),
            dt: block.dt.clone(),
            avg_wave_speed: block.avg_wave_speed.clone(),
        }
    }

    /// Overwrite the solution fields of `block` with these.
    pub fn apply_to(self, block: &mut ProcBlock) -> Result<(), SolverError> {
        if self.state.num_physical() != block.num_cells() {
            return Err(SolverError::SliceMismatch {
                expected: block.num_cells(),
                found: self.state.num_physical(),
            });
        }
        block.state = self.state;
        block.residual = self.residual;
        block.dt = self.dt;
        block.avg_wave_speed = self.avg_wave_speed;
        Ok(())
    }
}

impl Encode for BlockSolution {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.global_pos.encode(buf);
        self.state.encode(buf);
        self.residual.encode(buf);
        self.dt.encode(buf);
        self.avg_wave_speed.encode(buf);
    }
}

impl Decode for BlockSolution {
    fn decode(rdr: &mut &[u8]) -> Result<Self, SolverError> {
        Ok(BlockSolution {
            global_pos: usize::decode(rdr)?,
            state: MultiArray3d::decode(rdr)?,
            residual: MultiArray3d::decode(rdr)?,
            dt: MultiArray3d::decode(rdr)?,
            avg_wave_speed: MultiArray3d::decode(rdr)?,
        })
    }
}
