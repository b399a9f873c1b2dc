//! Leaf cells instantiated by generated multiplexers.

use crate::error::MuxError;
use crate::ids::{CircuitModelId, ModuleId};
use crate::library::{CircuitLibrary, CircuitModel};
use crate::registry::{ModuleBody, ModulePortKind, ModuleRegistry};
use aion_config::{CircuitKind, GateKind, PortDef, PortKind};

/// Programming cell on the input side of a resistive-memory branch.
pub const PROG_TE: &str = "PROG_TE";
/// Programming cell on the output side of a resistive-memory branch.
pub const PROG_BE: &str = "PROG_BE";

/// Ports a leaf cell is wired through.
#[derive(Clone, Debug)]
pub struct CellPorts {
    /// The cell module.
    pub module: ModuleId,
    /// Non-global inputs, in declaration order.
    pub inputs: Vec<String>,
    /// Non-global outputs, in declaration order.
    pub outputs: Vec<String>,
}

fn port_kind(port: &PortDef) -> ModulePortKind {
    if port.global {
        ModulePortKind::Global
    } else if port.kind == PortKind::Output {
        ModulePortKind::Output
    } else {
        ModulePortKind::Input
    }
}

fn check_shape(model: &CircuitModel, inputs: usize, outputs: usize) -> Result<(), MuxError> {
    let (expected_in, expected_out, shape) = match (model.kind, model.gate) {
        (CircuitKind::PassGate, _) => (3, 1, "three inputs and one output"),
        (CircuitKind::Gate, Some(GateKind::Mux2)) => (3, 1, "three inputs and one output"),
        (CircuitKind::Gate, _) => (2, 1, "two inputs and one output"),
        (CircuitKind::Buffer | CircuitKind::Inverter, _) => (1, 1, "one input and one output"),
        (CircuitKind::Mux | CircuitKind::Lut, _) => {
            return Err(MuxError::WrongModelKind {
                model: model.name.clone(),
                expected: "a leaf cell",
            })
        }
    };
    if inputs != expected_in {
        return Err(MuxError::PortCount {
            model: model.name.clone(),
            expected: shape,
            found: inputs,
        });
    }
    if outputs != expected_out {
        return Err(MuxError::PortCount {
            model: model.name.clone(),
            expected: shape,
            found: outputs,
        });
    }
    Ok(())
}

/// Finds or creates the module of a leaf-cell model, with one port per
/// model port. Non-global ports must match the cell's shape.
pub fn ensure_cell(
    registry: &mut ModuleRegistry,
    circuits: &CircuitLibrary,
    id: CircuitModelId,
) -> Result<CellPorts, MuxError> {
    let model = circuits.model(id);
    let inputs: Vec<String> = model
        .ports
        .iter()
        .filter(|p| !p.global && p.kind != PortKind::Output)
        .map(|p| p.name.clone())
        .collect();
    let outputs: Vec<String> = model
        .ports_of(PortKind::Output)
        .map(|p| p.name.clone())
        .collect();
    check_shape(model, inputs.len(), outputs.len())?;

    let (module, created) = registry.find_or_create_module(&model.name);
    if created {
        for port in &model.ports {
            registry.add_port(module, &port.name, port.size, port_kind(port))?;
        }
        registry.set_body(module, ModuleBody::Leaf);
    }
    Ok(CellPorts {
        module,
        inputs,
        outputs,
    })
}

/// Finds or creates the two resistive-memory programming cells.
pub fn ensure_prog_cells(registry: &mut ModuleRegistry) -> Result<(ModuleId, ModuleId), MuxError> {
    let (te, created) = registry.find_or_create_module(PROG_TE);
    if created {
        registry.add_port(te, "A", 1, ModulePortKind::Input)?;
        registry.add_port(te, "WL", 1, ModulePortKind::Input)?;
        registry.add_port(te, "BLB", 1, ModulePortKind::Input)?;
        registry.add_port(te, "Z", 1, ModulePortKind::Output)?;
        registry.set_body(te, ModuleBody::Leaf);
    }
    let (be, created) = registry.find_or_create_module(PROG_BE);
    if created {
        registry.add_port(be, "INOUT", 1, ModulePortKind::Inout)?;
        registry.add_port(be, "WL", 1, ModulePortKind::Input)?;
        registry.add_port(be, "BLB", 1, ModulePortKind::Input)?;
        registry.set_body(be, ModuleBody::Leaf);
    }
    Ok((te, be))
}
