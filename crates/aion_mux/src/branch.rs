//! Branch modules: the single-level circuits every multiplexer node is
//! built from.
//!
//! A branch is registered under its [`BranchKey`]. Nodes of equal fan-in and
//! technology share one branch module, whichever multiplexer they belong to.

use crate::error::MuxError;
use crate::graph::{MuxEdge, MuxGraph, MuxNodeKind};
use crate::ids::{CircuitModelId, ModuleId};
use crate::library::{CircuitModel, MuxTechnology};
use crate::primitive::{ensure_cell, ensure_prog_cells};
use crate::registry::{ModuleBody, ModulePortKind, ModuleRegistry, SelectCase};
use crate::tech::GenContext;
use aion_config::{CircuitKind, PortDef};
use std::collections::HashMap;

/// Data inputs of a branch.
pub const BRANCH_IN: &str = "in";
/// Output of a branch.
pub const BRANCH_OUT: &str = "out";
/// Memory bits of a CMOS branch.
pub const BRANCH_MEM: &str = "mem";
/// Complemented memory bits of a CMOS branch.
pub const BRANCH_MEM_INV: &str = "mem_inv";
/// Bit lines of a resistive-memory branch.
pub const BRANCH_BL: &str = "bl";
/// Word lines of a resistive-memory branch.
pub const BRANCH_WL: &str = "wl";

/// Registry key of a branch module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BranchKey {
    /// Branch technology.
    pub technology: MuxTechnology,
    /// Number of inputs.
    pub fan_in: usize,
}

impl BranchKey {
    /// Creates a key.
    pub fn new(technology: MuxTechnology, fan_in: usize) -> Self {
        Self { technology, fan_in }
    }

    /// Name of the generated branch module.
    pub fn module_name(self) -> String {
        format!("mux_{}_branch_size{}", self.technology.short_name(), self.fan_in)
    }
}

/// How a node binds to its branch module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchPorts {
    /// `in`, `out`, `mem` and `mem_inv` buses.
    Complementary,
    /// A 2:1 cell: the input chosen when the select bit is 0, the input
    /// chosen when it is 1, the select and the output.
    Cell {
        /// Data inputs, select-low first.
        inputs: [String; 2],
        /// Select input.
        select: String,
        /// Output.
        output: String,
    },
    /// `in`, `out`, `bl` and `wl` buses.
    Resistive,
}

/// A registered branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchInfo {
    /// The branch module.
    pub module: ModuleId,
    /// Its port contract.
    pub ports: BranchPorts,
}

/// What makes two requests for the same key produce the same module.
#[derive(Clone, Debug, PartialEq, Eq)]
struct BranchSignature {
    cell: Option<String>,
    structural: bool,
    mem_default: bool,
    globals: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct BranchCatalog {
    entries: HashMap<BranchKey, (BranchInfo, BranchSignature)>,
}

impl BranchCatalog {
    pub(crate) fn get(&self, key: BranchKey) -> Option<&BranchInfo> {
        self.entries.get(&key).map(|(info, _)| info)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn check(&self, key: BranchKey, signature: &BranchSignature) -> Result<Option<BranchInfo>, MuxError> {
        match self.entries.get(&key) {
            Some((info, existing)) if existing == signature => Ok(Some(info.clone())),
            Some(_) => Err(MuxError::BranchConflict {
                module: key.module_name(),
            }),
            None => Ok(None),
        }
    }

    fn insert(&mut self, key: BranchKey, info: BranchInfo, signature: BranchSignature) {
        self.entries.insert(key, (info, signature));
    }
}

/// The branch's output edges with the input index each one reads.
fn branch_edges(branch: &MuxGraph, module: &str) -> Result<Vec<(usize, MuxEdge)>, MuxError> {
    let shape = |reason: &str| MuxError::BranchShape {
        module: module.to_string(),
        reason: reason.to_string(),
    };
    let [output] = branch.outputs() else {
        return Err(shape("a branch has exactly one output"));
    };
    branch
        .node(*output)
        .in_edges
        .iter()
        .map(|e| {
            let edge = *branch.edge(*e);
            match branch.node(edge.from).kind {
                MuxNodeKind::Input(index) => Ok((index, edge)),
                _ => Err(shape("a branch has a single level")),
            }
        })
        .collect()
}

fn mem_default(model: &CircuitModel) -> bool {
    model.kind == CircuitKind::Mux && model.sram_port().is_ok_and(|p| p.default_value == 1)
}

/// One row per edge: every bit at the default value except the edge's own
/// bit, which is flipped unless the edge is inverted.
fn select_cases(edges: &[(usize, MuxEdge)], num_mems: usize, default: bool) -> Vec<SelectCase> {
    let digit = |bit: bool| if bit { '1' } else { '0' };
    edges
        .iter()
        .map(|(input, edge)| {
            let mut code = vec![digit(default); num_mems];
            code[edge.mem.index()] = digit(!default ^ edge.inverted);
            SelectCase {
                code: code.into_iter().collect(),
                input: *input,
            }
        })
        .collect()
}

fn declare_branch_ports(
    registry: &mut ModuleRegistry,
    module: ModuleId,
    globals: &[PortDef],
    fan_in: usize,
    control: [(&str, usize); 2],
) -> Result<(), MuxError> {
    for port in globals {
        registry.add_port(module, &port.name, port.size, ModulePortKind::Global)?;
    }
    registry.add_port(module, BRANCH_IN, fan_in, ModulePortKind::Input)?;
    registry.add_port(module, BRANCH_OUT, 1, ModulePortKind::Output)?;
    for (name, width) in control {
        registry.add_port(module, name, width, ModulePortKind::Input)?;
    }
    Ok(())
}

/// Transmission-gate branch: one pass gate per edge, or a select table
/// when the model is not structural.
pub(crate) fn pass_gate_branch(
    ctx: &mut GenContext<'_>,
    model: CircuitModelId,
    branch: &MuxGraph,
) -> Result<ModuleId, MuxError> {
    let circuits = ctx.circuits;
    let circuit = circuits.model(model);
    let key = BranchKey::new(MuxTechnology::CmosPassGate, branch.num_inputs());
    let name = key.module_name();

    let pass_gate = match (circuit.pass_gate, circuit.structural) {
        (Some(id), _) => Some(id),
        (None, false) => None,
        (None, true) => {
            return Err(MuxError::MissingModel {
                model: circuit.name.clone(),
                role: "pass_gate",
            })
        }
    };
    let globals: Vec<PortDef> = pass_gate
        .map(|id| circuits.model(id).global_ports().cloned().collect())
        .unwrap_or_default();
    let signature = BranchSignature {
        cell: pass_gate
            .filter(|_| circuit.structural)
            .map(|id| circuits.model(id).name.clone()),
        structural: circuit.structural,
        mem_default: !circuit.structural && mem_default(circuit),
        globals: globals.iter().map(|p| p.name.clone()).collect(),
    };
    if let Some(info) = ctx.branches.check(key, &signature)? {
        return Ok(info.module);
    }

    let edges = branch_edges(branch, &name)?;
    let num_mems = branch.num_memory_bits();
    let registry = &mut *ctx.registry;
    let (module, created) = registry.find_or_create_module(&name);
    if created {
        declare_branch_ports(
            registry,
            module,
            &globals,
            branch.num_inputs(),
            [(BRANCH_MEM, num_mems), (BRANCH_MEM_INV, num_mems)],
        )?;
        match pass_gate.filter(|_| circuit.structural) {
            Some(id) => {
                let cell = ensure_cell(registry, circuits, id)?;
                for (input, edge) in &edges {
                    let (sel, selb) = if edge.inverted {
                        (BRANCH_MEM_INV, BRANCH_MEM)
                    } else {
                        (BRANCH_MEM, BRANCH_MEM_INV)
                    };
                    let bindings = vec![
                        (cell.inputs[0].as_str(), vec![registry.bit(BRANCH_IN, *input)]),
                        (cell.inputs[1].as_str(), vec![registry.bit(sel, edge.mem.index())]),
                        (cell.inputs[2].as_str(), vec![registry.bit(selb, edge.mem.index())]),
                        (cell.outputs[0].as_str(), vec![registry.bit(BRANCH_OUT, 0)]),
                    ];
                    registry.add_instance(module, cell.module, bindings)?;
                }
            }
            None => registry.set_body(
                module,
                ModuleBody::Behavioral(select_cases(&edges, num_mems, signature.mem_default)),
            ),
        }
    }

    let info = BranchInfo {
        module,
        ports: BranchPorts::Complementary,
    };
    ctx.branches.insert(key, info, signature);
    Ok(module)
}

/// Standard-cell branch: the 2:1 cell itself.
pub(crate) fn std_cell_branch(
    ctx: &mut GenContext<'_>,
    model: CircuitModelId,
    branch: &MuxGraph,
) -> Result<ModuleId, MuxError> {
    let circuits = ctx.circuits;
    let circuit = circuits.model(model);
    let key = BranchKey::new(MuxTechnology::CmosStdCell, branch.num_inputs());
    if branch.num_inputs() != 2 || branch.num_memory_bits() != 1 {
        return Err(MuxError::BranchShape {
            module: key.module_name(),
            reason: format!(
                "a 2:1 cell cannot select among {} inputs",
                branch.num_inputs()
            ),
        });
    }
    let Some(cell_id) = circuit.pass_gate else {
        return Err(MuxError::MissingModel {
            model: circuit.name.clone(),
            role: "pass_gate",
        });
    };
    let signature = BranchSignature {
        cell: Some(circuits.model(cell_id).name.clone()),
        structural: true,
        mem_default: false,
        globals: Vec::new(),
    };
    if let Some(info) = ctx.branches.check(key, &signature)? {
        return Ok(info.module);
    }

    let cell = ensure_cell(ctx.registry, circuits, cell_id)?;
    let [in0, in1, select] = [0, 1, 2].map(|i| cell.inputs[i].clone());
    let info = BranchInfo {
        module: cell.module,
        ports: BranchPorts::Cell {
            inputs: [in0, in1],
            select,
            output: cell.outputs[0].clone(),
        },
    };
    ctx.branches.insert(key, info, signature);
    Ok(cell.module)
}

/// Resistive-memory branch: a programming cell per input, a programming
/// cell on the output, and one extra bit-line/word-line pair for it.
pub(crate) fn rram_branch(
    ctx: &mut GenContext<'_>,
    model: CircuitModelId,
    branch: &MuxGraph,
) -> Result<ModuleId, MuxError> {
    let circuits = ctx.circuits;
    let circuit = circuits.model(model);
    let key = BranchKey::new(MuxTechnology::Rram, branch.num_inputs());
    let name = key.module_name();
    let globals: Vec<PortDef> = circuit.global_ports().cloned().collect();
    let signature = BranchSignature {
        cell: None,
        structural: circuit.structural,
        mem_default: false,
        globals: globals.iter().map(|p| p.name.clone()).collect(),
    };
    if let Some(info) = ctx.branches.check(key, &signature)? {
        return Ok(info.module);
    }

    let edges = branch_edges(branch, &name)?;
    if edges.iter().any(|(_, e)| e.inverted) {
        return Err(MuxError::BranchShape {
            module: name,
            reason: "resistive branches have no complemented select".to_string(),
        });
    }
    let num_mems = branch.num_memory_bits();
    let registry = &mut *ctx.registry;
    let (module, created) = registry.find_or_create_module(&name);
    if created {
        declare_branch_ports(
            registry,
            module,
            &globals,
            branch.num_inputs(),
            [(BRANCH_BL, num_mems + 1), (BRANCH_WL, num_mems + 1)],
        )?;
        if circuit.structural {
            let (te, be) = ensure_prog_cells(registry)?;
            for (input, edge) in &edges {
                let mem = edge.mem.index();
                let bindings = vec![
                    ("A", vec![registry.bit(BRANCH_IN, *input)]),
                    ("WL", vec![registry.bit(BRANCH_WL, mem)]),
                    ("BLB", vec![registry.bit(BRANCH_BL, mem)]),
                    ("Z", vec![registry.bit(BRANCH_OUT, 0)]),
                ];
                registry.add_instance(module, te, bindings)?;
            }
            let bindings = vec![
                ("INOUT", vec![registry.bit(BRANCH_OUT, 0)]),
                ("WL", vec![registry.bit(BRANCH_WL, num_mems)]),
                ("BLB", vec![registry.bit(BRANCH_BL, num_mems)]),
            ];
            registry.add_instance(module, be, bindings)?;
        } else {
            registry.set_body(
                module,
                ModuleBody::Behavioral(select_cases(&edges, num_mems, false)),
            );
        }
    }

    let info = BranchInfo {
        module,
        ports: BranchPorts::Resistive,
    };
    ctx.branches.insert(key, info, signature);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MemEncoding;
    use crate::ids::MuxMemId;

    #[test]
    fn key_names_the_module() {
        let key = BranchKey::new(MuxTechnology::CmosPassGate, 4);
        assert_eq!(key.module_name(), "mux_tgate_branch_size4");
        assert_eq!(
            BranchKey::new(MuxTechnology::Rram, 2).module_name(),
            "mux_rram_branch_size2"
        );
    }

    #[test]
    fn edges_carry_input_indices() {
        let g = MuxGraph::one_level(3, MemEncoding::Complementary);
        let edges = branch_edges(&g, "b").unwrap();
        let inputs: Vec<_> = edges.iter().map(|(i, _)| *i).collect();
        assert_eq!(inputs, vec![0, 1, 2]);
        assert_eq!(edges[2].1.mem, MuxMemId::from_raw(2));
    }

    #[test]
    fn multi_level_graph_is_not_a_branch() {
        let g = MuxGraph::tree(4, MemEncoding::Complementary);
        let err = branch_edges(&g, "b").unwrap_err();
        assert!(matches!(err, MuxError::BranchShape { .. }));
    }

    #[test]
    fn select_table_is_one_hot() {
        let g = MuxGraph::one_level(3, MemEncoding::Complementary);
        let edges = branch_edges(&g, "b").unwrap();
        let cases = select_cases(&edges, 3, false);
        let codes: Vec<_> = cases.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["100", "010", "001"]);

        let cases = select_cases(&edges, 3, true);
        assert_eq!(cases[1].code, "101");
    }

    #[test]
    fn complementary_pair_uses_both_values() {
        let g = MuxGraph::one_level(2, MemEncoding::Complementary);
        let edges = branch_edges(&g, "b").unwrap();
        let cases = select_cases(&edges, 1, false);
        assert_eq!(cases[0].code, "1");
        assert_eq!(cases[1].code, "0");
        assert_eq!(cases[1].input, 1);
    }
}
