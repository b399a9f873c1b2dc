//! Circuit models resolved from the `[circuits]` tables of `fabric.toml`.

use crate::error::MuxError;
use crate::graph::MemEncoding;
use crate::ids::CircuitModelId;
use aion_config::{
    CircuitDef, CircuitKind, DesignTechnology, FabricConfig, GateKind, MuxStructure, PortDef,
    PortKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Technology of a multiplexer, each variant with its own netlist handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MuxTechnology {
    /// Transmission gates driven by a memory bit and its complement.
    CmosPassGate,
    /// A tree of 2:1 standard-cell multiplexers.
    CmosStdCell,
    /// Resistive memory cells programmed through bit and word lines.
    Rram,
}

impl MuxTechnology {
    /// How the technology selects among the inputs of a node.
    pub fn mem_encoding(self) -> MemEncoding {
        match self {
            MuxTechnology::CmosPassGate | MuxTechnology::CmosStdCell => MemEncoding::Complementary,
            MuxTechnology::Rram => MemEncoding::OneHot,
        }
    }

    /// Short name used in generated module names.
    pub fn short_name(self) -> &'static str {
        match self {
            MuxTechnology::CmosPassGate => "tgate",
            MuxTechnology::CmosStdCell => "stdcell",
            MuxTechnology::Rram => "rram",
        }
    }
}

/// A circuit model with its cross-references resolved to IDs.
#[derive(Clone, Debug)]
pub struct CircuitModel {
    /// Model name, also the name of its primitive module.
    pub name: String,
    /// What the model is.
    pub kind: CircuitKind,
    /// Ports, in declaration order.
    pub ports: Vec<PortDef>,
    /// Mux/LUT technology.
    pub technology: DesignTechnology,
    /// Mux/LUT decomposition.
    pub structure: MuxStructure,
    /// Stage count for multi-level structures.
    pub num_levels: Option<usize>,
    /// Pass gate or 2:1 cell of each stage.
    pub pass_gate: Option<CircuitModelId>,
    /// Input buffer, if inputs are buffered.
    pub input_buffer: Option<CircuitModelId>,
    /// Output buffer, if outputs are buffered.
    pub output_buffer: Option<CircuitModelId>,
    /// Buffer between stages.
    pub intermediate_buffer: Option<CircuitModelId>,
    /// Buffered node levels, one entry per node level.
    pub intermediate_buffer_map: Option<Vec<bool>>,
    /// Value of the extra last input, if any.
    pub const_input: Option<bool>,
    /// Stages are driven by local address decoders.
    pub local_decoder: bool,
    /// Emit primitive instances rather than a select table.
    pub structural: bool,
    /// LUT with fracturable outputs.
    pub fracturable: bool,
    /// Function of a gate model.
    pub gate: Option<GateKind>,
}

impl CircuitModel {
    /// Ports of a kind, global ports excluded.
    pub fn ports_of(&self, kind: PortKind) -> impl Iterator<Item = &PortDef> {
        self.ports
            .iter()
            .filter(move |p| p.kind == kind && !p.global)
    }

    /// Global ports, in declaration order.
    pub fn global_ports(&self) -> impl Iterator<Item = &PortDef> {
        self.ports.iter().filter(|p| p.global)
    }

    /// The first non-global port of a kind.
    pub fn require_port(&self, kind: PortKind) -> Result<&PortDef, MuxError> {
        self.ports_of(kind)
            .next()
            .ok_or_else(|| MuxError::MissingPort {
                model: self.name.clone(),
                kind,
            })
    }

    /// Configuration memory port of the datapath, mode-select bits excluded.
    pub fn sram_port(&self) -> Result<&PortDef, MuxError> {
        self.ports_of(PortKind::Sram)
            .find(|p| !p.mode_select)
            .ok_or_else(|| MuxError::MissingPort {
                model: self.name.clone(),
                kind: PortKind::Sram,
            })
    }

    /// Whether the model is a multiplexer or a LUT.
    pub fn is_mux_like(&self) -> bool {
        matches!(self.kind, CircuitKind::Mux | CircuitKind::Lut)
    }
}

/// All circuit models of a fabric.
#[derive(Clone, Debug, Default)]
pub struct CircuitLibrary {
    models: Vec<CircuitModel>,
    by_name: HashMap<String, CircuitModelId>,
}

impl CircuitLibrary {
    /// Resolves every circuit of the configuration. Models are numbered in
    /// name order.
    pub fn from_config(config: &FabricConfig) -> Result<Self, MuxError> {
        let by_name: HashMap<String, CircuitModelId> = config
            .circuits
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), CircuitModelId::from_index(i)))
            .collect();

        let mut models = Vec::with_capacity(config.circuits.len());
        for (name, def) in &config.circuits {
            models.push(resolve(name, def, &by_name)?);
        }

        let library = Self { models, by_name };
        for model in &library.models {
            library.check_references(model)?;
        }
        Ok(library)
    }

    fn check_references(&self, model: &CircuitModel) -> Result<(), MuxError> {
        if let Some(id) = model.pass_gate {
            let pass_gate = self.model(id);
            let usable = pass_gate.kind == CircuitKind::PassGate
                || pass_gate.gate == Some(GateKind::Mux2);
            if !usable {
                return Err(MuxError::WrongModelKind {
                    model: pass_gate.name.clone(),
                    expected: "a pass gate or a mux2 gate",
                });
            }
        }
        let buffers = [
            model.input_buffer,
            model.output_buffer,
            model.intermediate_buffer,
        ];
        for id in buffers.into_iter().flatten() {
            let buffer = self.model(id);
            if !matches!(buffer.kind, CircuitKind::Buffer | CircuitKind::Inverter) {
                return Err(MuxError::WrongModelKind {
                    model: buffer.name.clone(),
                    expected: "a buffer or an inverter",
                });
            }
        }
        Ok(())
    }

    /// Returns the model.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not from this library.
    pub fn model(&self, id: CircuitModelId) -> &CircuitModel {
        match self.models.get(id.index()) {
            Some(model) => model,
            None => panic!("circuit model {id} is not in the library"),
        }
    }

    /// Looks up a model by name.
    pub fn find(&self, name: &str) -> Option<CircuitModelId> {
        self.by_name.get(name).copied()
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the library has no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// All models with their IDs.
    pub fn iter(&self) -> impl Iterator<Item = (CircuitModelId, &CircuitModel)> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, m)| (CircuitModelId::from_index(i), m))
    }

    /// Netlist technology of a multiplexer or LUT model.
    pub fn mux_technology(&self, id: CircuitModelId) -> Result<MuxTechnology, MuxError> {
        let model = self.model(id);
        if !model.is_mux_like() {
            return Err(MuxError::WrongModelKind {
                model: model.name.clone(),
                expected: "a mux or a lut",
            });
        }
        match model.technology {
            DesignTechnology::Rram => Ok(MuxTechnology::Rram),
            DesignTechnology::Cmos => match model.pass_gate.map(|pg| self.model(pg)) {
                Some(cell) if cell.gate == Some(GateKind::Mux2) => Ok(MuxTechnology::CmosStdCell),
                Some(_) => Ok(MuxTechnology::CmosPassGate),
                None if !model.structural => Ok(MuxTechnology::CmosPassGate),
                None => Err(MuxError::MissingModel {
                    model: model.name.clone(),
                    role: "pass_gate",
                }),
            },
        }
    }
}

fn resolve(
    name: &str,
    def: &CircuitDef,
    by_name: &HashMap<String, CircuitModelId>,
) -> Result<CircuitModel, MuxError> {
    let lookup = |reference: &Option<String>| -> Result<Option<CircuitModelId>, MuxError> {
        match reference {
            None => Ok(None),
            Some(target) => by_name
                .get(target)
                .copied()
                .map(Some)
                .ok_or_else(|| MuxError::UnknownModel {
                    name: target.clone(),
                    referenced_by: name.to_string(),
                }),
        }
    };

    let intermediate_buffer_map = def
        .intermediate_buffer_map
        .as_ref()
        .map(|map| map.chars().map(|c| c == '1').collect());

    Ok(CircuitModel {
        name: name.to_string(),
        kind: def.kind,
        ports: def.ports.clone(),
        technology: def.technology,
        structure: def.structure,
        num_levels: def.num_levels,
        pass_gate: lookup(&def.pass_gate)?,
        input_buffer: lookup(&def.input_buffer)?,
        output_buffer: lookup(&def.output_buffer)?,
        intermediate_buffer: lookup(&def.intermediate_buffer)?,
        intermediate_buffer_map,
        const_input: def.const_input.map(|v| v == 1),
        local_decoder: def.local_decoder,
        structural: def.structural,
        fracturable: def.fracturable,
        gate: def.gate,
    })
}
