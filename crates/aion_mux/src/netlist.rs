//! Whole-multiplexer modules: level buses, one branch instance per node,
//! buffers, and the bindings to the module's external ports.

use crate::branch::{
    BranchInfo, BranchKey, BranchPorts, BRANCH_BL, BRANCH_IN, BRANCH_MEM, BRANCH_MEM_INV,
    BRANCH_OUT, BRANCH_WL,
};
use crate::decoder::{ensure_decoder, DECODER_ADDR_PORT, DECODER_DATA_INV_PORT, DECODER_DATA_PORT};
use crate::error::MuxError;
use crate::graph::MuxGraph;
use crate::ids::{CircuitModelId, ModuleId, MuxMemId, MuxNodeId};
use crate::library::{CircuitModel, MuxTechnology};
use crate::mux_library::datapath_inputs;
use crate::primitive::ensure_cell;
use crate::registry::{ModulePortKind, ModuleRegistry, Signal};
use crate::tech::GenContext;
use aion_config::{CircuitKind, PortDef, PortKind};

/// Bus holding the node values of a level.
pub fn level_bus_name(level: usize) -> String {
    format!("mux_l{level}_in")
}

/// Bus holding the buffered node values of a level.
pub fn buffered_bus_name(level: usize) -> String {
    format!("mux_l{level}_in_buf")
}

/// Name of the module generated for a model and size.
pub fn mux_module_name(model: &CircuitModel, size: usize) -> String {
    match model.kind {
        CircuitKind::Lut => format!("{}_mux", model.name),
        _ => format!("{}_size{}", model.name, size),
    }
}

/// Which node levels get an intermediate buffer. Level 0 holds the inputs
/// and can never be buffered.
pub fn buffered_levels(model: &CircuitModel, graph: &MuxGraph) -> Result<Vec<bool>, MuxError> {
    let levels = graph.num_node_levels();
    let Some(map) = &model.intermediate_buffer_map else {
        return Ok(vec![false; levels]);
    };
    let invalid = |reason: String| MuxError::InvalidBufferMap {
        model: model.name.clone(),
        reason,
    };
    if map.len() != levels {
        return Err(invalid(format!(
            "{} entries for {} node levels",
            map.len(),
            levels
        )));
    }
    if map[0] {
        return Err(invalid("level 0 holds the inputs".to_string()));
    }
    Ok(map.clone())
}

fn slice(registry: &ModuleRegistry, net: &str, start: usize, len: usize) -> Vec<Signal> {
    (start..start + len).map(|i| registry.bit(net, i)).collect()
}

fn mem_bits(registry: &ModuleRegistry, net: &str, mems: &[MuxMemId]) -> Vec<Signal> {
    mems.iter().map(|m| registry.bit(net, m.index())).collect()
}

/// A multiplexer module under construction.
struct Top<'g> {
    module: ModuleId,
    name: String,
    graph: &'g MuxGraph,
    buffered: Vec<bool>,
}

impl Top<'_> {
    /// The node's own bus slot.
    fn raw_bit(&self, registry: &ModuleRegistry, node: MuxNodeId) -> Signal {
        let n = self.graph.node(node);
        registry.bit(&level_bus_name(n.level), n.index)
    }

    /// The slot a later stage reads the node from.
    fn read_bit(&self, registry: &ModuleRegistry, node: MuxNodeId) -> Signal {
        let n = self.graph.node(node);
        if self.buffered[n.level] {
            registry.bit(&buffered_bus_name(n.level), n.index)
        } else {
            registry.bit(&level_bus_name(n.level), n.index)
        }
    }

    fn driver_bits(&self, registry: &ModuleRegistry, node: MuxNodeId) -> Vec<Signal> {
        self.graph
            .driver_nodes(node)
            .into_iter()
            .map(|d| self.read_bit(registry, d))
            .collect()
    }

    fn declare_level_buses(&self, registry: &mut ModuleRegistry) -> Result<(), MuxError> {
        for level in 0..self.graph.num_node_levels() {
            let width = self.graph.num_nodes_at_level(level);
            registry.add_wire(self.module, &level_bus_name(level), width)?;
            if self.buffered[level] {
                registry.add_wire(self.module, &buffered_bus_name(level), width)?;
            }
        }
        Ok(())
    }
}

fn declare_globals(
    registry: &mut ModuleRegistry,
    module: ModuleId,
    model: &CircuitModel,
) -> Result<(), MuxError> {
    for port in model.global_ports() {
        registry.add_port(module, &port.name, port.size, ModulePortKind::Global)?;
    }
    Ok(())
}

/// Output ports of the module. A multiplexer has exactly one.
fn output_ports(model: &CircuitModel) -> Result<Vec<PortDef>, MuxError> {
    let outputs: Vec<PortDef> = model.ports_of(PortKind::Output).cloned().collect();
    match (model.kind, outputs.len()) {
        (_, 0) => Err(MuxError::MissingPort {
            model: model.name.clone(),
            kind: PortKind::Output,
        }),
        (CircuitKind::Mux, n) if n > 1 => Err(MuxError::PortCount {
            model: model.name.clone(),
            expected: "exactly one output port",
            found: n,
        }),
        _ => Ok(outputs),
    }
}

fn add_buffer(
    ctx: &mut GenContext<'_>,
    parent: ModuleId,
    buffer: CircuitModelId,
    input: Signal,
    output: Signal,
) -> Result<(), MuxError> {
    let cell = ensure_cell(ctx.registry, ctx.circuits, buffer)?;
    ctx.registry.add_instance(
        parent,
        cell.module,
        vec![
            (cell.inputs[0].as_str(), vec![input]),
            (cell.outputs[0].as_str(), vec![output]),
        ],
    )?;
    Ok(())
}

fn add_intermediate_buffer(
    ctx: &mut GenContext<'_>,
    top: &Top<'_>,
    model: &CircuitModel,
    node: MuxNodeId,
) -> Result<(), MuxError> {
    if !top.buffered[top.graph.node(node).level] {
        return Ok(());
    }
    let Some(buffer) = model.intermediate_buffer else {
        return Err(MuxError::MissingModel {
            model: model.name.clone(),
            role: "intermediate_buffer",
        });
    };
    let input = top.raw_bit(ctx.registry, node);
    let output = top.read_bit(ctx.registry, node);
    add_buffer(ctx, top.module, buffer, input, output)
}

/// Drives the level-0 bus: the constant for the extra last input, the
/// external port for the rest, directly or through the input buffer.
fn bind_inputs(
    ctx: &mut GenContext<'_>,
    top: &Top<'_>,
    model: &CircuitModel,
    data_port: &str,
    datapath: usize,
) -> Result<(), MuxError> {
    for (i, node) in top.graph.inputs().iter().enumerate() {
        let target = top.raw_bit(ctx.registry, *node);
        if i >= datapath {
            if let Some(value) = model.const_input {
                ctx.registry.add_assign(top.module, target, Signal::Const(value))?;
                continue;
            }
        }
        let source = ctx.registry.bit(data_port, i);
        match model.input_buffer {
            Some(buffer) => add_buffer(ctx, top.module, buffer, source, target)?,
            None => ctx.registry.add_assign(top.module, target, source)?,
        }
    }
    Ok(())
}

/// The node behind every output pin: the last level and node 0 unless the
/// port names a level and per-pin node indices.
fn resolve_outputs(
    name: &str,
    graph: &MuxGraph,
    outputs: Vec<PortDef>,
) -> Result<Vec<(PortDef, Vec<MuxNodeId>)>, MuxError> {
    outputs
        .into_iter()
        .map(|port| {
            let level = port.frac_level.unwrap_or(graph.last_level());
            let nodes = (0..port.size)
                .map(|pin| {
                    let index = port.output_masks.get(pin).copied().unwrap_or(0);
                    graph
                        .node_at(level, index)
                        .filter(|_| level > 0)
                        .ok_or_else(|| MuxError::MissingOutputNode {
                            module: name.to_string(),
                            level,
                            index,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((port, nodes))
        })
        .collect()
}

/// Drives every output pin from its resolved node.
fn bind_outputs(
    ctx: &mut GenContext<'_>,
    top: &Top<'_>,
    model: &CircuitModel,
    outputs: &[(PortDef, Vec<MuxNodeId>)],
) -> Result<(), MuxError> {
    for (port, nodes) in outputs {
        for (pin, node) in nodes.iter().enumerate() {
            let source = top.raw_bit(ctx.registry, *node);
            let target = ctx.registry.bit(&port.name, pin);
            match model.output_buffer {
                Some(buffer) => add_buffer(ctx, top.module, buffer, source, target)?,
                None => ctx.registry.add_assign(top.module, target, source)?,
            }
        }
    }
    Ok(())
}

/// The registered branch of every non-input node, in node order.
fn node_branches(
    ctx: &GenContext<'_>,
    technology: MuxTechnology,
    graph: &MuxGraph,
) -> Result<Vec<(MuxNodeId, BranchInfo)>, MuxError> {
    graph
        .non_input_nodes()
        .into_iter()
        .map(|node| {
            let fan_in = graph.fan_in(node);
            ctx.branch(BranchKey::new(technology, fan_in))
                .cloned()
                .map(|branch| (node, branch))
                .ok_or(MuxError::MissingBranch { technology, fan_in })
        })
        .collect()
}

/// One decoder per memory level, addressed by consecutive slices of the
/// `sram` port, driving the `data`/`data_inv` wires.
fn add_local_decoders(
    ctx: &mut GenContext<'_>,
    module: ModuleId,
    graph: &MuxGraph,
    sram_port: &str,
) -> Result<(), MuxError> {
    let registry = &mut *ctx.registry;
    let mut decoders = Vec::with_capacity(graph.num_levels());
    for level in 0..graph.num_levels() {
        let data_size = graph.num_memory_bits_at_level(level);
        let (decoder, addr_size) = ensure_decoder(registry, data_size)?;
        decoders.push((decoder, addr_size, data_size));
    }

    let addr_total = decoders.iter().map(|(_, addr, _)| addr).sum();
    let num_mems = graph.num_memory_bits();
    registry.add_port(module, sram_port, addr_total, ModulePortKind::Input)?;
    registry.add_wire(module, DECODER_DATA_PORT, num_mems)?;
    registry.add_wire(module, DECODER_DATA_INV_PORT, num_mems)?;

    let (mut addr_offset, mut mem_offset) = (0, 0);
    for (decoder, addr_size, data_size) in decoders {
        let bindings = vec![
            (DECODER_ADDR_PORT, slice(registry, sram_port, addr_offset, addr_size)),
            (DECODER_DATA_PORT, slice(registry, DECODER_DATA_PORT, mem_offset, data_size)),
            (DECODER_DATA_INV_PORT, slice(registry, DECODER_DATA_INV_PORT, mem_offset, data_size)),
        ];
        registry.add_instance(module, decoder, bindings)?;
        addr_offset += addr_size;
        mem_offset += data_size;
    }
    Ok(())
}

/// Builds a CMOS multiplexer or LUT from registered branches.
///
/// For a LUT the roles of the ports swap: the configuration bits are the
/// data inputs and the LUT inputs are the select lines.
pub(crate) fn cmos_top(
    ctx: &mut GenContext<'_>,
    technology: MuxTechnology,
    model: CircuitModelId,
    size: usize,
    graph: &MuxGraph,
) -> Result<ModuleId, MuxError> {
    let circuits = ctx.circuits;
    let circuit = circuits.model(model);
    let is_lut = circuit.kind == CircuitKind::Lut;
    if is_lut && circuit.local_decoder {
        return Err(MuxError::Unsupported {
            model: circuit.name.clone(),
            reason: "local decoders drive multiplexers, not LUTs".to_string(),
        });
    }
    let (data_port, select_port) = if is_lut {
        (circuit.sram_port()?, circuit.require_port(PortKind::Input)?)
    } else {
        (circuit.require_port(PortKind::Input)?, circuit.sram_port()?)
    };
    let (data_port, select_port) = (data_port.name.clone(), select_port.name.clone());
    let select_inv_port = format!("{select_port}_inv");
    let datapath = datapath_inputs(circuits, model, graph);
    let buffered = buffered_levels(circuit, graph)?;
    let name = mux_module_name(circuit, size);
    let outputs = resolve_outputs(&name, graph, output_ports(circuit)?)?;
    let branches = node_branches(ctx, technology, graph)?;

    let (module, created) = ctx.registry.find_or_create_module(&name);
    if !created {
        return Ok(module);
    }
    ctx.mux_modules += 1;
    let top = Top {
        module,
        name,
        graph,
        buffered,
    };

    declare_globals(ctx.registry, module, circuit)?;
    ctx.registry.add_port(module, &data_port, datapath, ModulePortKind::Input)?;
    for (port, _) in &outputs {
        ctx.registry.add_port(module, &port.name, port.size, ModulePortKind::Output)?;
    }
    let (mem_net, mem_inv_net) = if circuit.local_decoder {
        add_local_decoders(ctx, module, graph, &select_port)?;
        (DECODER_DATA_PORT.to_string(), DECODER_DATA_INV_PORT.to_string())
    } else {
        let num_mems = graph.num_memory_bits();
        ctx.registry.add_port(module, &select_port, num_mems, ModulePortKind::Input)?;
        ctx.registry.add_port(module, &select_inv_port, num_mems, ModulePortKind::Input)?;
        (select_port, select_inv_port)
    };
    top.declare_level_buses(ctx.registry)?;

    for (node, branch) in branches {
        let registry = &mut *ctx.registry;
        let output = top.raw_bit(registry, node);
        let mems = graph.node_mems(node);
        let bindings = match &branch.ports {
            BranchPorts::Complementary => vec![
                (BRANCH_IN, top.driver_bits(registry, node)),
                (BRANCH_OUT, vec![output]),
                (BRANCH_MEM, mem_bits(registry, &mem_net, &mems)),
                (BRANCH_MEM_INV, mem_bits(registry, &mem_inv_net, &mems)),
            ],
            BranchPorts::Cell {
                inputs,
                select,
                output: cell_output,
            } => {
                let edges: Vec<_> = graph
                    .node(node)
                    .in_edges
                    .iter()
                    .map(|e| *graph.edge(*e))
                    .collect();
                let low = edges.iter().find(|e| e.inverted);
                let high = edges.iter().find(|e| !e.inverted);
                let (Some(low), Some(high), 2) = (low, high, edges.len()) else {
                    return Err(MuxError::BranchShape {
                        module: top.name.clone(),
                        reason: "a 2:1 cell needs one complemented and one plain input".to_string(),
                    });
                };
                vec![
                    (inputs[0].as_str(), vec![top.read_bit(registry, low.from)]),
                    (inputs[1].as_str(), vec![top.read_bit(registry, high.from)]),
                    (select.as_str(), vec![registry.bit(&mem_net, high.mem.index())]),
                    (cell_output.as_str(), vec![output]),
                ]
            }
            BranchPorts::Resistive => {
                return Err(MuxError::Unsupported {
                    model: circuit.name.clone(),
                    reason: "a CMOS multiplexer cannot use resistive branches".to_string(),
                })
            }
        };
        registry.add_instance(module, branch.module, bindings)?;
        add_intermediate_buffer(ctx, &top, circuit, node)?;
    }

    bind_inputs(ctx, &top, circuit, &data_port, datapath)?;
    bind_outputs(ctx, &top, circuit, &outputs)?;
    Ok(module)
}

/// Builds a resistive-memory multiplexer. Each node's branch gets the bit
/// and word lines of its own inputs plus the extra pair of its level, found
/// after all per-input lines.
pub(crate) fn rram_top(
    ctx: &mut GenContext<'_>,
    model: CircuitModelId,
    size: usize,
    graph: &MuxGraph,
) -> Result<ModuleId, MuxError> {
    let circuits = ctx.circuits;
    let circuit = circuits.model(model);
    if circuit.kind == CircuitKind::Lut {
        return Err(MuxError::Unsupported {
            model: circuit.name.clone(),
            reason: "resistive-memory LUTs are not supported".to_string(),
        });
    }
    if circuit.local_decoder {
        return Err(MuxError::Unsupported {
            model: circuit.name.clone(),
            reason: "resistive-memory multiplexers are programmed without local decoders"
                .to_string(),
        });
    }
    let data_port = circuit.require_port(PortKind::Input)?.name.clone();
    let bl_port = circuit.require_port(PortKind::Blb)?.name.clone();
    let wl_port = circuit.require_port(PortKind::Wl)?.name.clone();
    let datapath = datapath_inputs(circuits, model, graph);
    let buffered = buffered_levels(circuit, graph)?;
    let name = mux_module_name(circuit, size);
    let outputs = resolve_outputs(&name, graph, output_ports(circuit)?)?;
    let branches = node_branches(ctx, MuxTechnology::Rram, graph)?;
    if branches.iter().any(|(_, b)| b.ports != BranchPorts::Resistive) {
        return Err(MuxError::Unsupported {
            model: circuit.name.clone(),
            reason: "a resistive-memory multiplexer needs resistive branches".to_string(),
        });
    }

    let (module, created) = ctx.registry.find_or_create_module(&name);
    if !created {
        return Ok(module);
    }
    ctx.mux_modules += 1;
    let top = Top {
        module,
        name,
        graph,
        buffered,
    };

    let num_mems = graph.num_memory_bits();
    let num_lines = num_mems + graph.num_levels();
    declare_globals(ctx.registry, module, circuit)?;
    ctx.registry.add_port(module, &data_port, datapath, ModulePortKind::Input)?;
    for (port, _) in &outputs {
        ctx.registry.add_port(module, &port.name, port.size, ModulePortKind::Output)?;
    }
    ctx.registry.add_port(module, &bl_port, num_lines, ModulePortKind::Input)?;
    ctx.registry.add_port(module, &wl_port, num_lines, ModulePortKind::Input)?;
    top.declare_level_buses(ctx.registry)?;

    for (node, branch) in branches {
        let registry = &mut *ctx.registry;
        let mems = graph.node_mems(node);
        let extra = num_mems + graph.node(node).level - 1;
        let mut bl = mem_bits(registry, &bl_port, &mems);
        bl.push(registry.bit(&bl_port, extra));
        let mut wl = mem_bits(registry, &wl_port, &mems);
        wl.push(registry.bit(&wl_port, extra));

        let bindings = vec![
            (BRANCH_IN, top.driver_bits(registry, node)),
            (BRANCH_OUT, vec![top.raw_bit(registry, node)]),
            (BRANCH_BL, bl),
            (BRANCH_WL, wl),
        ];
        registry.add_instance(module, branch.module, bindings)?;
        add_intermediate_buffer(ctx, &top, circuit, node)?;
    }

    bind_inputs(ctx, &top, circuit, &data_port, datapath)?;
    bind_outputs(ctx, &top, circuit, &outputs)?;
    Ok(module)
}
