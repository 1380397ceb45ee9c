//! Per-process driver: sets up the decomposed grid once, then runs the
//! boundary-condition, residual and update phases of every step over the
//! local blocks.

use tracing::{debug, info};

use crate::axis::{Direction, Ijk};
use crate::error::SolverError;
use crate::implicit::hyperplane_reorder;
use crate::input::{MatrixSolver, Settings, TimeIntegration};
use crate::interblock::{find_connections, Interblock};
use crate::multi_array::MultiArray3d;
use crate::parallel::{
    all_reduce_residual, all_reduce_sum, broadcast, get_proc_blocks, manual_decomposition,
    send_proc_blocks, serial_decomposition, swap_eddy_viscosity, swap_geometry, swap_states, swap_updates,
    Communicator,
};
use crate::primvars::VarArray;
use crate::proc_block::ProcBlock;
use crate::time_advance::Residual;
use crate::wall_distance::calc_wall_distance;

/// Global outcome of one step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepReport {
    pub iteration: usize,
    pub residual: Residual,
    /// Square-rooted L2 norm over all equations.
    pub l2: f64,
    /// L2 norm of the linear-system residual, zero for explicit schemes.
    pub matrix_error: f64,
}

pub struct Solver<C: Communicator> {
    comm: C,
    settings: Settings,
    blocks: Vec<ProcBlock>,
    connections: Vec<Interblock>,
    reorder: Vec<Vec<Ijk>>,
    /// Full grid kept on the root to gather the solution into.
    global: Vec<ProcBlock>,
    iteration: usize,
}

impl<C: Communicator> Solver<C> {
    /// Decompose and distribute the grid, then build the ghost geometry.
    ///
    /// The root passes every block of the grid; the other ranks pass an
    /// empty list. With a single process all blocks stay local, otherwise
    /// block `n` goes to rank `n`.
    pub fn setup(comm: C, settings: Settings, grid: Vec<ProcBlock>) -> Result<Self, SolverError> {
        let (connections, grid, global) = if comm.is_root() {
            let mut grid = grid;
            let mut connections = find_connections(&grid)?;
            if comm.size() == 1 {
                serial_decomposition(&mut grid, &mut connections);
            } else {
                manual_decomposition(&mut grid, comm.size(), &mut connections)?;
            }
            calc_wall_distance(&mut grid);
            let connections = broadcast(&comm, Some(&connections))?;
            let global = grid.clone();
            (connections, grid, global)
        } else {
            (broadcast::<C, Vec<Interblock>>(&comm, None)?, Vec::new(), Vec::new())
        };

        let blocks = send_proc_blocks(&comm, grid)?;
        let reorder = blocks
            .iter()
            .map(|b| hyperplane_reorder(b.num_i(), b.num_j(), b.num_k()))
            .collect();
        let mut solver = Self {
            comm,
            settings,
            blocks,
            connections,
            reorder,
            global,
            iteration: 0,
        };
        solver.setup_geometry()?;
        let eos = solver.settings.eos;
        for block in solver.blocks.iter_mut() {
            block.assign_solution_to_time_n(&eos);
        }
        Ok(solver)
    }

    fn setup_geometry(&mut self) -> Result<(), SolverError> {
        for block in self.blocks.iter_mut() {
            block.assign_ghost_cells_geom();
        }
        swap_geometry(&self.comm, &mut self.connections, &mut self.blocks)?;
        for block in self.blocks.iter_mut() {
            block.assign_ghost_cells_geom_edge();
        }
        let second_pass = self.connections.iter().filter(|c| c.needs_second_pass()).count();
        debug!(
            rank = self.comm.rank(),
            connections = self.connections.len(),
            second_pass,
            "ghost geometry ready"
        );
        Ok(())
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn blocks(&self) -> &[ProcBlock] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [ProcBlock] {
        &mut self.blocks
    }

    pub fn connections(&self) -> &[Interblock] {
        &self.connections
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Fill every ghost state: boundary policies, interblock exchange, edge
    /// lines, then the viscous-wall pass with its own exchange.
    pub fn get_boundary_conditions(&mut self) -> Result<(), SolverError> {
        let settings = &self.settings;
        for block in self.blocks.iter_mut() {
            block.assign_inviscid_ghost_cells(settings);
        }
        swap_states(&self.comm, &self.connections, &mut self.blocks)?;
        for block in self.blocks.iter_mut() {
            block.assign_inviscid_ghost_cells_edge(settings);
        }

        if settings.is_viscous() {
            for block in self.blocks.iter_mut() {
                block.assign_viscous_ghost_cells(settings);
            }
            swap_states(&self.comm, &self.connections, &mut self.blocks)?;
            for block in self.blocks.iter_mut() {
                block.assign_viscous_ghost_cells_edge(settings);
            }
        }
        Ok(())
    }

    /// Residual and wave speed of every local block.
    pub fn calc_residual(&mut self) {
        let settings = &self.settings;
        for block in self.blocks.iter_mut() {
            block.reset_residual_wave_speed();
            block.reset_gradients();
            for dir in Direction::all() {
                block.calc_inviscid_flux(dir, settings);
            }
            if settings.is_viscous() {
                for dir in Direction::all() {
                    block.calc_viscous_flux(dir, settings);
                }
            }
            block.calc_src_terms(settings);
        }
    }

    /// Share the eddy viscosity of the last residual pass across interblocks.
    pub fn swap_turbulence(&mut self) -> Result<(), SolverError> {
        if self.settings.is_turbulent() {
            swap_eddy_viscosity(&self.comm, &self.connections, &mut self.blocks)?;
        }
        Ok(())
    }

    pub fn calc_time_step(&mut self) -> Result<(), SolverError> {
        for block in self.blocks.iter_mut() {
            block.calc_block_time_step(&self.settings)?;
        }
        Ok(())
    }

    /// Solve for the implicit corrections of every local block, exchanging
    /// them across interblocks after every sweep. Returns the corrections
    /// and the global linear residual of the last sweep.
    pub fn implicit_update(&self) -> Result<(Vec<MultiArray3d<VarArray>>, f64), SolverError> {
        let settings = &self.settings;
        let diag: Vec<_> = self.blocks.iter().map(|b| b.diagonal(settings)).collect();
        let rhs: Vec<_> = self.blocks.iter().map(|b| b.implicit_rhs(settings)).collect();
        let mut du: Vec<_> = self.blocks.iter().map(|b| b.initialize_matrix_update()).collect();

        let mut error = 0.0;
        for _ in 0..settings.matrix_sweeps {
            error = 0.0;
            match settings.matrix_solver {
                MatrixSolver::Lusgs => {
                    for (n, block) in self.blocks.iter().enumerate() {
                        block.lusgs_forward(&self.reorder[n], &mut du[n], &diag[n], &rhs[n], settings);
                    }
                    swap_updates(&self.comm, &self.connections, &self.blocks, &mut du)?;
                    for (n, block) in self.blocks.iter().enumerate() {
                        error += block.lusgs_backward(&self.reorder[n], &mut du[n], &diag[n], &rhs[n], settings);
                    }
                }
                MatrixSolver::Dplur => {
                    for (n, block) in self.blocks.iter().enumerate() {
                        error += block.dplur(&mut du[n], &diag[n], &rhs[n], settings);
                    }
                }
            }
            swap_updates(&self.comm, &self.connections, &self.blocks, &mut du)?;
        }
        let error = all_reduce_sum(&self.comm, error)?.sqrt();
        Ok((du, error))
    }

    fn explicit_step(&mut self) -> Result<Residual, SolverError> {
        let mut resid = Residual::new();
        for stage in 0..self.settings.time_integration.stages() {
            self.get_boundary_conditions()?;
            self.calc_residual();
            if stage == 0 {
                self.calc_time_step()?;
            }
            for block in self.blocks.iter_mut() {
                block.update_block(&self.settings, None, stage, &mut resid)?;
            }
        }
        Ok(resid)
    }

    fn implicit_step(&mut self) -> Result<(Residual, f64), SolverError> {
        let mut resid = Residual::new();
        let mut matrix_error = 0.0;
        for _ in 0..self.settings.nonlinear_iterations {
            resid = Residual::new();
            self.get_boundary_conditions()?;
            self.calc_residual();
            self.swap_turbulence()?;
            self.calc_time_step()?;
            let (du, error) = self.implicit_update()?;
            matrix_error = error;
            for (n, block) in self.blocks.iter_mut().enumerate() {
                block.update_block(&self.settings, Some(&du[n]), 0, &mut resid)?;
            }
        }
        Ok((resid, matrix_error))
    }

    /// Advance one time step (or pseudo-time iteration) and return the
    /// global residual norms.
    pub fn step(&mut self) -> Result<StepReport, SolverError> {
        let eos = self.settings.eos;
        for block in self.blocks.iter_mut() {
            block.assign_solution_to_time_n(&eos);
        }
        let (local, matrix_error) = match self.settings.time_integration {
            TimeIntegration::ExplicitEuler | TimeIntegration::Rk4 => (self.explicit_step()?, 0.0),
            _ => self.implicit_step()?,
        };
        let residual = all_reduce_residual(&self.comm, &local)?;
        let neq = self.settings.num_equations();
        let report = StepReport {
            iteration: self.iteration,
            residual,
            l2: residual.total_l2(neq),
            matrix_error,
        };
        if self.comm.is_root() && self.iteration % self.settings.output_frequency == 0 {
            info!(
                iteration = report.iteration,
                l2 = report.l2,
                linf = residual.linf.value,
                linf_block = residual.linf.block,
                linf_cell = ?residual.linf.cell,
                linf_eq = residual.linf.eq,
                matrix_error,
                "residual"
            );
        }
        self.iteration += 1;
        Ok(report)
    }

    /// Run the configured number of iterations.
    pub fn run(&mut self) -> Result<Vec<StepReport>, SolverError> {
        (0..self.settings.iterations).map(|_| self.step()).collect()
    }

    /// Collect the solution on the root. Returns the full grid on the root
    /// and `None` elsewhere.
    pub fn finish(mut self) -> Result<Option<Vec<ProcBlock>>, SolverError> {
        get_proc_blocks(&self.comm, &mut self.global, &self.blocks)?;
        if self.comm.is_root() {
            Ok(Some(self.global))
        } else {
            Ok(None)
        }
    }
}
