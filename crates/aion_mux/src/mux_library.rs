//! The set of distinct multiplexers a fabric needs, each with its graph.

use crate::error::MuxError;
use crate::graph::MuxGraph;
use crate::ids::{CircuitModelId, MuxId};
use crate::library::{CircuitLibrary, CircuitModel};
use aion_config::{CircuitKind, FabricConfig, MuxStructure, PortKind};
use std::collections::HashMap;

/// One multiplexer of the library.
#[derive(Clone, Debug)]
pub struct MuxEntry {
    /// Its circuit model.
    pub model: CircuitModelId,
    /// Requested datapath input count.
    pub size: usize,
    /// Its graph. A constant input, if any, is the last graph input.
    pub graph: MuxGraph,
}

/// Unique `(model, size)` multiplexers, in request order.
#[derive(Clone, Debug, Default)]
pub struct MuxLibrary {
    muxes: Vec<MuxEntry>,
    lookup: HashMap<(CircuitModelId, usize), MuxId>,
}

impl MuxLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every size of every `[[muxes]]` request.
    pub fn from_config(circuits: &CircuitLibrary, config: &FabricConfig) -> Result<Self, MuxError> {
        let mut library = Self::new();
        for request in &config.muxes {
            let model = circuits.find(&request.model).ok_or_else(|| MuxError::UnknownModel {
                name: request.model.clone(),
                referenced_by: "muxes".to_string(),
            })?;
            for size in &request.sizes {
                library.add_mux(circuits, model, *size)?;
            }
        }
        Ok(library)
    }

    /// Adds a multiplexer unless the same `(model, size)` is already present,
    /// and returns its ID either way.
    pub fn add_mux(
        &mut self,
        circuits: &CircuitLibrary,
        model: CircuitModelId,
        size: usize,
    ) -> Result<MuxId, MuxError> {
        if let Some(id) = self.lookup.get(&(model, size)) {
            return Ok(*id);
        }

        let circuit = circuits.model(model);
        if size < 2 {
            return Err(MuxError::InvalidSize {
                model: circuit.name.clone(),
                size,
            });
        }
        if circuit.kind == CircuitKind::Lut {
            if let Some(existing) = self.muxes.iter().find(|m| m.model == model) {
                return Err(MuxError::LutSizeConflict {
                    model: circuit.name.clone(),
                    size,
                    existing: existing.size,
                });
            }
        }
        let encoding = circuits.mux_technology(model)?.mem_encoding();
        let num_inputs = size + usize::from(has_const_input(circuits, model));
        let graph = match circuit.structure {
            MuxStructure::Tree => MuxGraph::tree(num_inputs, encoding),
            MuxStructure::OneLevel => MuxGraph::one_level(num_inputs, encoding),
            MuxStructure::MultiLevel => {
                MuxGraph::multi_level(num_inputs, circuit.num_levels.unwrap_or(1), encoding)
            }
        };
        check_output_taps(circuit, &graph)?;

        let id = MuxId::from_index(self.muxes.len());
        self.muxes.push(MuxEntry { model, size, graph });
        self.lookup.insert((model, size), id);
        Ok(id)
    }

    /// Returns the multiplexer.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not from this library.
    pub fn mux(&self, id: MuxId) -> &MuxEntry {
        match self.muxes.get(id.index()) {
            Some(entry) => entry,
            None => panic!("multiplexer {id} is not in the library"),
        }
    }

    /// Finds a multiplexer by model and size.
    pub fn find(&self, model: CircuitModelId, size: usize) -> Option<MuxId> {
        self.lookup.get(&(model, size)).copied()
    }

    /// Number of multiplexers.
    pub fn len(&self) -> usize {
        self.muxes.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.muxes.is_empty()
    }

    /// All multiplexers with their IDs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (MuxId, &MuxEntry)> {
        self.muxes
            .iter()
            .enumerate()
            .map(|(i, m)| (MuxId::from_index(i), m))
    }
}

/// Every output pin must tap an existing node: the port's level (the last
/// one by default) and its mask index (node 0 by default).
fn check_output_taps(circuit: &CircuitModel, graph: &MuxGraph) -> Result<(), MuxError> {
    for port in circuit.ports_of(PortKind::Output) {
        let level = port.frac_level.unwrap_or(graph.last_level());
        let out_of_range = |index| MuxError::OutputOutOfRange {
            model: circuit.name.clone(),
            port: port.name.clone(),
            level,
            index,
        };
        if level == 0 || level > graph.last_level() {
            return Err(out_of_range(0));
        }
        let width = graph.num_nodes_at_level(level);
        if let Some(index) = port.output_masks.iter().find(|i| **i >= width) {
            return Err(out_of_range(*index));
        }
    }
    Ok(())
}

/// LUTs never take a constant input.
pub(crate) fn has_const_input(circuits: &CircuitLibrary, model: CircuitModelId) -> bool {
    let circuit = circuits.model(model);
    circuit.kind == CircuitKind::Mux && circuit.const_input.is_some()
}

/// Number of graph inputs wired to the external input port.
pub fn datapath_inputs(circuits: &CircuitLibrary, model: CircuitModelId, graph: &MuxGraph) -> usize {
    graph.num_inputs() - usize::from(has_const_input(circuits, model))
}
