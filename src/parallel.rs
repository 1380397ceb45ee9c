//! Distributed runtime: the communicator abstraction, an in-process
//! implementation on channels, and the collective operations of a run
//! (decomposition, block scatter and gather, residual reductions and the
//! interblock exchanges that cross process boundaries).
//!
//! Messages are matched on `(source, tag)` and delivered in send order for
//! any given pair, so two exchanges between the same processes never mix
//! up as long as they use different tags.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use tracing::{debug, info};

use crate::codec::{from_bytes, to_bytes, BlockSolution, Decode, Encode};
use crate::error::SolverError;
use crate::interblock::Interblock;
use crate::multi_array::MultiArray3d;
use crate::primvars::VarArray;
use crate::proc_block::ProcBlock;
use crate::slices::{merge_dirty, swap_eddy_visc_slice, swap_geom_slice, swap_implicit_update, swap_state_slice};
use crate::time_advance::Residual;

/// Rank that owns the full grid before decomposition and after gather.
pub const ROOT: usize = 0;

/// Message tags. Exchange tags are offset by the connection index.
pub mod tag {
    pub const BLOCK_COUNT: u32 = 1;
    pub const BLOCK: u32 = 2;
    pub const BROADCAST: u32 = 3;
    pub const SOLUTION: u32 = 4;
    pub const REDUCE: u32 = 5;
    pub const GEOM_SWAP: u32 = 1 << 16;
    pub const STATE_SWAP: u32 = 2 << 16;
    pub const UPDATE_SWAP: u32 = 3 << 16;
    pub const EDDY_SWAP: u32 = 4 << 16;
}

/// Point-to-point messaging between the processes of a run.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Queue `payload` for `dest`. Never blocks.
    fn send(&self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), SolverError>;

    /// Block until a message with `tag` from `source` arrives.
    fn recv(&self, source: usize, tag: u32) -> Result<Vec<u8>, SolverError>;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }
}

struct Envelope {
    tag: u32,
    payload: Vec<u8>,
}

/// Communicator for ranks running as threads of one process, with one
/// channel per ordered pair of ranks.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    senders: Vec<Sender<Envelope>>,
    receivers: Vec<Receiver<Envelope>>,
    pending: RefCell<Vec<VecDeque<Envelope>>>,
    timeout: Duration,
}

impl ThreadComm {
    /// One communicator per rank of a world of `size` ranks. Move each into
    /// its own thread.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        let mut senders: Vec<Vec<Option<Sender<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for src in 0..size {
            for dest in 0..size {
                let (tx, rx) = mpsc::channel();
                senders[src][dest] = Some(tx);
                receivers[dest][src] = Some(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (txs, rxs))| ThreadComm {
                rank,
                size,
                senders: txs.into_iter().flatten().collect(),
                receivers: rxs.into_iter().flatten().collect(),
                pending: RefCell::new((0..size).map(|_| VecDeque::new()).collect()),
                timeout: Duration::from_secs(120),
            })
            .collect()
    }

    /// Give up on a receive after `timeout` instead of the default two minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn check_rank(&self, other: usize) -> Result<(), SolverError> {
        if other >= self.size {
            return Err(SolverError::Communication(format!(
                "rank {other} outside world of {}",
                self.size
            )));
        }
        Ok(())
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: u32, payload: Vec<u8>) -> Result<(), SolverError> {
        self.check_rank(dest)?;
        self.senders[dest]
            .send(Envelope { tag, payload })
            .map_err(|_| SolverError::Communication(format!("rank {dest} hung up")))
    }

    fn recv(&self, source: usize, tag: u32) -> Result<Vec<u8>, SolverError> {
        self.check_rank(source)?;
        let mut pending = self.pending.borrow_mut();
        if let Some(pos) = pending[source].iter().position(|e| e.tag == tag) {
            if let Some(env) = pending[source].remove(pos) {
                return Ok(env.payload);
            }
        }
        loop {
            match self.receivers[source].recv_timeout(self.timeout) {
                Ok(env) if env.tag == tag => return Ok(env.payload),
                Ok(env) => pending[source].push_back(env),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(SolverError::Communication(format!(
                        "rank {} timed out waiting for tag {tag} from rank {source}",
                        self.rank
                    )))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SolverError::Communication(format!("rank {source} hung up")))
                }
            }
        }
    }
}

/// Send `value` from the root to every rank. Non-root ranks pass `None`.
pub fn broadcast<C, T>(comm: &C, value: Option<&T>) -> Result<T, SolverError>
where
    C: Communicator + ?Sized,
    T: Encode + Decode,
{
    if comm.is_root() {
        let value = value.ok_or_else(|| SolverError::Communication("root has nothing to broadcast".into()))?;
        let bytes = to_bytes(value);
        for dest in (0..comm.size()).filter(|r| *r != ROOT) {
            comm.send(dest, tag::BROADCAST, bytes.clone())?;
        }
        from_bytes(&bytes)
    } else {
        from_bytes(&comm.recv(ROOT, tag::BROADCAST)?)
    }
}

/// Gather one value per rank on the root (in rank order), combine them with
/// `reduce` and hand the result to every rank.
fn all_reduce<C, T, F>(comm: &C, local: &T, reduce: F) -> Result<T, SolverError>
where
    C: Communicator + ?Sized,
    T: Encode + Decode + Clone,
    F: Fn(&mut T, T),
{
    if comm.is_root() {
        let mut acc = local.clone();
        for src in (0..comm.size()).filter(|r| *r != ROOT) {
            reduce(&mut acc, from_bytes(&comm.recv(src, tag::REDUCE)?)?);
        }
        broadcast(comm, Some(&acc))
    } else {
        comm.send(ROOT, tag::REDUCE, to_bytes(local))?;
        broadcast::<C, T>(comm, None)
    }
}

/// Global residual norms: L2 sums add up, L-infinity keeps the largest.
pub fn all_reduce_residual<C>(comm: &C, local: &Residual) -> Result<Residual, SolverError>
where
    C: Communicator + ?Sized,
{
    all_reduce(comm, local, |acc, other| acc.merge(&other))
}

pub fn all_reduce_sum<C>(comm: &C, local: f64) -> Result<f64, SolverError>
where
    C: Communicator + ?Sized,
{
    all_reduce(comm, &local, |acc, other| *acc += other)
}

/// OR the border flags of every connection over all ranks, so both ranks of
/// a connection agree on whether it needs a second exchange.
pub fn all_reduce_borders<C>(comm: &C, connections: &mut [Interblock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    let local: Vec<[bool; 4]> = connections
        .iter()
        .flat_map(|c| [c.sides[0].border, c.sides[1].border])
        .collect();
    let merged = all_reduce(comm, &local, |acc, other| {
        for (a, o) in acc.iter_mut().zip(other) {
            merge_dirty(a, o);
        }
    })?;
    if merged.len() != 2 * connections.len() {
        return Err(SolverError::SliceMismatch {
            expected: 2 * connections.len(),
            found: merged.len(),
        });
    }
    for (conn, pair) in connections.iter_mut().zip(merged.chunks(2)) {
        conn.sides[0].border = pair[0];
        conn.sides[1].border = pair[1];
    }
    Ok(())
}

/// Assign block `n` to rank `n` and update the connections to match.
/// Returns the number of blocks of every rank.
pub fn manual_decomposition(
    blocks: &mut [ProcBlock],
    num_procs: usize,
    connections: &mut [Interblock],
) -> Result<Vec<usize>, SolverError> {
    if blocks.len() != num_procs {
        return Err(SolverError::Decomposition {
            blocks: blocks.len(),
            procs: num_procs,
        });
    }
    let total: usize = blocks.iter().map(|b| b.num_cells()).sum();
    let ideal = total as f64 / num_procs as f64;
    let mut max_load = 0;
    for (n, block) in blocks.iter_mut().enumerate() {
        block.set_rank(n);
        block.set_global_pos(n);
        block.set_local_pos(0);
        max_load = max_load.max(block.num_cells());
    }
    for conn in connections.iter_mut() {
        for side in conn.sides.iter_mut() {
            side.rank = blocks[side.block].rank();
            side.local = blocks[side.block].local_pos();
        }
    }
    info!(
        procs = num_procs,
        load_ratio = max_load as f64 / ideal,
        "manual decomposition: ratio of most loaded process to average"
    );
    Ok(vec![1; num_procs])
}

/// Keep every block on the root, for runs on a single process.
pub fn serial_decomposition(blocks: &mut [ProcBlock], connections: &mut [Interblock]) -> Vec<usize> {
    for (n, block) in blocks.iter_mut().enumerate() {
        block.set_rank(ROOT);
        block.set_global_pos(n);
        block.set_local_pos(n);
    }
    for conn in connections.iter_mut() {
        for side in conn.sides.iter_mut() {
            side.rank = ROOT;
            side.local = side.block;
        }
    }
    info!(blocks = blocks.len(), "all blocks on one process");
    vec![blocks.len()]
}

/// Hand every rank its blocks. The root passes the whole decomposed grid,
/// the other ranks an empty list; each rank gets back its own blocks in
/// global order.
pub fn send_proc_blocks<C>(comm: &C, blocks: Vec<ProcBlock>) -> Result<Vec<ProcBlock>, SolverError>
where
    C: Communicator + ?Sized,
{
    if comm.is_root() {
        let mut counts = vec![0usize; comm.size()];
        for block in &blocks {
            let owner = block.rank();
            if owner >= comm.size() {
                return Err(SolverError::Communication(format!(
                    "block {} assigned to rank {owner} in a world of {}",
                    block.global_pos(),
                    comm.size()
                )));
            }
            counts[owner] += 1;
        }
        for dest in (0..comm.size()).filter(|r| *r != ROOT) {
            comm.send(dest, tag::BLOCK_COUNT, to_bytes(&counts[dest]))?;
        }
        let mut local = Vec::with_capacity(counts[ROOT]);
        for block in blocks {
            if block.rank() == ROOT {
                local.push(block);
            } else {
                comm.send(block.rank(), tag::BLOCK, to_bytes(&block))?;
            }
        }
        Ok(local)
    } else {
        let count: usize = from_bytes(&comm.recv(ROOT, tag::BLOCK_COUNT)?)?;
        let local = (0..count)
            .map(|_| from_bytes::<ProcBlock>(&comm.recv(ROOT, tag::BLOCK)?))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(rank = comm.rank(), blocks = local.len(), "received blocks");
        Ok(local)
    }
}

/// Collect the solution of every rank's blocks into the root's global list.
/// Non-root ranks pass an empty `global`.
pub fn get_proc_blocks<C>(comm: &C, global: &mut [ProcBlock], local: &[ProcBlock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    if !comm.is_root() {
        for block in local {
            comm.send(ROOT, tag::SOLUTION, to_bytes(&BlockSolution::from_block(block)))?;
        }
        return Ok(());
    }

    for block in local {
        let pos = block.global_pos();
        let target = global
            .get_mut(pos)
            .ok_or_else(|| SolverError::Communication(format!("no global block {pos}")))?;
        BlockSolution::from_block(block).apply_to(target)?;
    }
    let owners: Vec<usize> = global.iter().map(|b| b.rank()).collect();
    for owner in owners.into_iter().filter(|r| *r != ROOT) {
        let solution: BlockSolution = from_bytes(&comm.recv(owner, tag::SOLUTION)?)?;
        let pos = solution.global_pos;
        let target = global
            .get_mut(pos)
            .ok_or_else(|| SolverError::Communication(format!("no global block {pos}")))?;
        solution.apply_to(target)?;
    }
    Ok(())
}

/// Send this rank's slice to the partner rank and receive theirs.
fn trade<C, S>(comm: &C, conn: &Interblock, mine: usize, tag: u32, slice: &S) -> Result<S, SolverError>
where
    C: Communicator + ?Sized,
    S: Encode + Decode,
{
    let other = conn.sides[1 - mine].rank;
    comm.send(other, tag, to_bytes(slice))?;
    from_bytes(&comm.recv(other, tag)?)
}

fn swap_geometry_once<C>(
    comm: &C,
    index: usize,
    conn: &mut Interblock,
    blocks: &mut [ProcBlock],
) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    let rank = comm.rank();
    if conn.is_local_to(rank) {
        return swap_geom_slice(conn, blocks);
    }
    if conn.sides.iter().all(|s| s.rank != rank) {
        return Ok(());
    }
    let mine = conn.side_on(rank)?;
    let block = &mut blocks[conn.sides[mine].local];
    let ranges = conn.slice_ranges(mine, block.dims(), block.num_ghosts());
    let theirs = trade(comm, conn, mine, tag::GEOM_SWAP + index as u32, &block.geom_slice(&ranges))?;
    let dirty = block.put_geom_slice(&theirs, conn, mine)?;
    merge_dirty(&mut conn.sides[mine].border, dirty);
    Ok(())
}

/// Exchange ghost geometry over every connection, then repeat the exchange
/// for connections whose window edges depend on another connection.
pub fn swap_geometry<C>(comm: &C, connections: &mut [Interblock], blocks: &mut [ProcBlock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    for (n, conn) in connections.iter_mut().enumerate() {
        swap_geometry_once(comm, n, conn, blocks)?;
    }
    all_reduce_borders(comm, connections)?;
    for (n, conn) in connections.iter_mut().enumerate() {
        if conn.needs_second_pass() {
            debug!(first = conn.sides[0].block, second = conn.sides[1].block, "geometry re-swap");
            swap_geometry_once(comm, n, conn, blocks)?;
        }
    }
    all_reduce_borders(comm, connections)
}

fn swap_states_once<C>(comm: &C, index: usize, conn: &Interblock, blocks: &mut [ProcBlock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    let rank = comm.rank();
    if conn.is_local_to(rank) {
        return swap_state_slice(conn, blocks);
    }
    if conn.sides.iter().all(|s| s.rank != rank) {
        return Ok(());
    }
    let mine = conn.side_on(rank)?;
    let block = &mut blocks[conn.sides[mine].local];
    let ranges = conn.slice_ranges(mine, block.dims(), block.num_ghosts());
    let theirs = trade(comm, conn, mine, tag::STATE_SWAP + index as u32, &block.state_slice(&ranges))?;
    block.put_state_slice(&theirs, conn, mine)?;
    Ok(())
}

/// Exchange ghost states over every connection, with a second pass for
/// connections flagged during the geometry exchange.
pub fn swap_states<C>(comm: &C, connections: &[Interblock], blocks: &mut [ProcBlock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    for (n, conn) in connections.iter().enumerate() {
        swap_states_once(comm, n, conn, blocks)?;
    }
    for (n, conn) in connections.iter().enumerate().filter(|(_, c)| c.needs_second_pass()) {
        swap_states_once(comm, n, conn, blocks)?;
    }
    Ok(())
}

fn swap_eddy_visc_once<C>(comm: &C, index: usize, conn: &Interblock, blocks: &mut [ProcBlock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    let rank = comm.rank();
    if conn.is_local_to(rank) {
        return swap_eddy_visc_slice(conn, blocks);
    }
    if conn.sides.iter().all(|s| s.rank != rank) {
        return Ok(());
    }
    let mine = conn.side_on(rank)?;
    let block = &mut blocks[conn.sides[mine].local];
    let ranges = conn.slice_ranges(mine, block.dims(), block.num_ghosts());
    let theirs = trade(comm, conn, mine, tag::EDDY_SWAP + index as u32, &block.eddy_visc_slice(&ranges))?;
    block.put_eddy_visc_slice(&theirs, conn, mine)
}

/// Exchange the limited eddy viscosity over every connection so implicit
/// sweeps see the partner's value in interblock ghosts.
pub fn swap_eddy_viscosity<C>(comm: &C, connections: &[Interblock], blocks: &mut [ProcBlock]) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    for (n, conn) in connections.iter().enumerate() {
        swap_eddy_visc_once(comm, n, conn, blocks)?;
    }
    for (n, conn) in connections.iter().enumerate().filter(|(_, c)| c.needs_second_pass()) {
        swap_eddy_visc_once(comm, n, conn, blocks)?;
    }
    Ok(())
}

fn swap_updates_once<C>(
    comm: &C,
    index: usize,
    conn: &Interblock,
    blocks: &[ProcBlock],
    du: &mut [MultiArray3d<VarArray>],
) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    let rank = comm.rank();
    if conn.is_local_to(rank) {
        return swap_implicit_update(conn, blocks, du);
    }
    if conn.sides.iter().all(|s| s.rank != rank) {
        return Ok(());
    }
    let mine = conn.side_on(rank)?;
    let local = conn.sides[mine].local;
    let block = &blocks[local];
    let slice = block.update_slice(&du[local], conn, mine);
    let theirs = trade(comm, conn, mine, tag::UPDATE_SWAP + index as u32, &slice)?;
    block.put_update_slice(&mut du[local], &theirs, conn, mine)
}

/// Exchange implicit corrections over every connection.
pub fn swap_updates<C>(
    comm: &C,
    connections: &[Interblock],
    blocks: &[ProcBlock],
    du: &mut [MultiArray3d<VarArray>],
) -> Result<(), SolverError>
where
    C: Communicator + ?Sized,
{
    for (n, conn) in connections.iter().enumerate() {
        swap_updates_once(comm, n, conn, blocks, du)?;
    }
    for (n, conn) in connections.iter().enumerate().filter(|(_, c)| c.needs_second_pass()) {
        swap_updates_once(comm, n, conn, blocks, du)?;
    }
    Ok(())
}
