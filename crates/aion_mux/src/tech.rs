//! One netlist handler per multiplexer technology.

use crate::branch::{pass_gate_branch, rram_branch, std_cell_branch, BranchCatalog, BranchInfo, BranchKey};
use crate::error::MuxError;
use crate::graph::MuxGraph;
use crate::ids::{CircuitModelId, ModuleId};
use crate::library::{CircuitLibrary, MuxTechnology};
use crate::netlist::{cmos_top, rram_top};
use crate::registry::ModuleRegistry;

/// State shared by the generators of one pass.
pub struct GenContext<'a> {
    /// Where generated modules go.
    pub registry: &'a mut ModuleRegistry,
    /// Circuit models.
    pub circuits: &'a CircuitLibrary,
    pub(crate) branches: BranchCatalog,
    pub(crate) mux_modules: usize,
}

impl<'a> GenContext<'a> {
    /// Starts a pass with no branches registered.
    pub fn new(registry: &'a mut ModuleRegistry, circuits: &'a CircuitLibrary) -> Self {
        Self {
            registry,
            circuits,
            branches: BranchCatalog::default(),
            mux_modules: 0,
        }
    }

    /// The branch registered under a key.
    pub fn branch(&self, key: BranchKey) -> Option<&BranchInfo> {
        self.branches.get(key)
    }

    /// Number of branches registered in this pass.
    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    /// Number of multiplexer modules created in this pass.
    pub fn num_mux_modules(&self) -> usize {
        self.mux_modules
    }
}

/// Netlist generation for one technology.
pub trait MuxTechHandler {
    /// Registers the branch realizing every node of `branch`'s fan-in.
    fn generate_branch(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        branch: &MuxGraph,
    ) -> Result<ModuleId, MuxError>;

    /// Builds the multiplexer module of `size` datapath inputs from its
    /// graph. Every branch the graph needs must already be registered.
    fn generate_top(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        size: usize,
        graph: &MuxGraph,
    ) -> Result<ModuleId, MuxError>;
}

/// Transmission-gate multiplexers.
pub struct PassGateHandler;

/// Standard-cell multiplexers.
pub struct StdCellHandler;

/// Resistive-memory multiplexers.
pub struct RramHandler;

impl MuxTechHandler for PassGateHandler {
    fn generate_branch(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        branch: &MuxGraph,
    ) -> Result<ModuleId, MuxError> {
        pass_gate_branch(ctx, model, branch)
    }

    fn generate_top(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        size: usize,
        graph: &MuxGraph,
    ) -> Result<ModuleId, MuxError> {
        cmos_top(ctx, MuxTechnology::CmosPassGate, model, size, graph)
    }
}

impl MuxTechHandler for StdCellHandler {
    fn generate_branch(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        branch: &MuxGraph,
    ) -> Result<ModuleId, MuxError> {
        std_cell_branch(ctx, model, branch)
    }

    fn generate_top(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        size: usize,
        graph: &MuxGraph,
    ) -> Result<ModuleId, MuxError> {
        cmos_top(ctx, MuxTechnology::CmosStdCell, model, size, graph)
    }
}

impl MuxTechHandler for RramHandler {
    fn generate_branch(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        branch: &MuxGraph,
    ) -> Result<ModuleId, MuxError> {
        rram_branch(ctx, model, branch)
    }

    fn generate_top(
        &self,
        ctx: &mut GenContext<'_>,
        model: CircuitModelId,
        size: usize,
        graph: &MuxGraph,
    ) -> Result<ModuleId, MuxError> {
        rram_top(ctx, model, size, graph)
    }
}

impl MuxTechnology {
    /// The handler generating this technology's modules.
    pub fn handler(self) -> &'static dyn MuxTechHandler {
        match self {
            MuxTechnology::CmosPassGate => &PassGateHandler,
            MuxTechnology::CmosStdCell => &StdCellHandler,
            MuxTechnology::Rram => &RramHandler,
        }
    }
}
