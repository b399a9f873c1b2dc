//! Routing multiplexer and LUT netlists.
//!
//! A [`MuxLibrary`] lists the distinct `(model, size)` multiplexers a fabric
//! needs, each decomposed into a level-structured [`MuxGraph`]. Generation
//! turns them into modules of a [`ModuleRegistry`] in two steps: first one
//! branch module per distinct `(technology, fan-in)`, then one module per
//! multiplexer that instantiates a branch for each of its nodes. The three
//! technologies (transmission gates, standard cells, resistive memory) each
//! have a [`MuxTechHandler`].

#![warn(missing_docs)]

pub mod branch;
pub mod decoder;
pub mod error;
pub mod graph;
pub mod ids;
pub mod library;
pub mod mux_library;
pub mod netlist;
pub mod primitive;
pub mod registry;
pub mod tech;

pub use branch::{BranchInfo, BranchKey, BranchPorts};
pub use error::MuxError;
pub use graph::{MemEncoding, MuxEdge, MuxGraph, MuxNode, MuxNodeKind};
pub use ids::{CircuitModelId, ModuleId, MuxEdgeId, MuxId, MuxMemId, MuxNodeId};
pub use library::{CircuitLibrary, CircuitModel, MuxTechnology};
pub use mux_library::{MuxEntry, MuxLibrary};
pub use registry::{
    Assign, Instance, Module, ModuleBody, ModulePort, ModulePortKind, ModuleRegistry, PortBinding,
    RegistryMark, SelectCase, Signal, Wire,
};
pub use tech::{GenContext, MuxTechHandler};

use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Summary of a generation pass.
pub const MUX_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Info, 201);
/// A generation pass was aborted.
pub const MUX_GENERATION_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 202);

/// What a generation pass produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Distinct branches used.
    pub branch_modules: usize,
    /// Multiplexer modules created.
    pub mux_modules: usize,
}

/// Generates every branch, then every multiplexer of the library.
///
/// The first error aborts the pass; it is reported to `sink` as well as
/// returned, and every module the pass created is removed again, so a
/// later pass never mistakes a half-wired module for a finished one.
pub fn generate_mux_modules(
    registry: &mut ModuleRegistry,
    circuits: &CircuitLibrary,
    muxes: &MuxLibrary,
    sink: &DiagnosticSink,
) -> Result<GenerationSummary, MuxError> {
    let mark = registry.mark();
    let result = {
        let mut ctx = GenContext::new(registry, circuits);
        generate_all(&mut ctx, muxes).map(|()| GenerationSummary {
            branch_modules: ctx.num_branches(),
            mux_modules: ctx.num_mux_modules(),
        })
    };
    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            registry.rollback(mark);
            sink.emit(
                Diagnostic::error(MUX_GENERATION_FAILED, err.to_string())
                    .with_help("fix the circuit model in fabric.toml"),
            );
            return Err(err);
        }
    };
    sink.emit(Diagnostic::note(
        MUX_SUMMARY,
        format!(
            "generated {} branch modules and {} multiplexer modules",
            summary.branch_modules, summary.mux_modules
        ),
    ));
    Ok(summary)
}

fn generate_all(ctx: &mut GenContext<'_>, muxes: &MuxLibrary) -> Result<(), MuxError> {
    for (_, mux) in muxes.iter() {
        let technology = ctx.circuits.mux_technology(mux.model)?;
        let handler = technology.handler();
        for branch in mux.graph.branch_graphs(technology.mem_encoding()) {
            handler.generate_branch(ctx, mux.model, &branch)?;
        }
    }
    for (_, mux) in muxes.iter() {
        let technology = ctx.circuits.mux_technology(mux.model)?;
        technology
            .handler()
            .generate_top(ctx, mux.model, mux.size, &mux.graph)?;
    }
    Ok(())
}
