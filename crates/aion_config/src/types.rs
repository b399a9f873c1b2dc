//! Configuration types deserialized from `fabric.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level generator configuration parsed from `fabric.toml`.
#[derive(Debug, Deserialize)]
pub struct FabricConfig {
    /// Fabric metadata.
    pub fabric: FabricMeta,
    /// Switch-block deduplication options.
    #[serde(default)]
    pub switch_blocks: SwitchBlockConfig,
    /// Circuit-model library, keyed by model name.
    #[serde(default)]
    pub circuits: BTreeMap<String, CircuitDef>,
    /// Multiplexer sizes to generate, per model.
    #[serde(default)]
    pub muxes: Vec<MuxRequest>,
}

/// Fabric metadata required in every `fabric.toml`.
#[derive(Debug, Deserialize)]
pub struct FabricMeta {
    /// The fabric name.
    pub name: String,
    /// A brief description.
    #[serde(default)]
    pub description: String,
}

/// Options for switch-block deduplication.
#[derive(Debug, Default, Deserialize)]
pub struct SwitchBlockConfig {
    /// Also search for mirrors under rotation. Off unless asked for.
    #[serde(default)]
    pub rotatable_mirrors: bool,
}

/// What a circuit model is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    /// A routing multiplexer.
    Mux,
    /// A look-up table, realized as a multiplexer over its configuration bits.
    Lut,
    /// A transmission gate: three inputs (data, select, inverted select) and one output.
    PassGate,
    /// A non-inverting buffer.
    Buffer,
    /// An inverter.
    Inverter,
    /// A logic gate standard cell.
    Gate,
}

/// The device technology of a multiplexer or LUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesignTechnology {
    /// Transistor-based multiplexing.
    #[default]
    Cmos,
    /// Resistive-memory crossbar programmed through bit/word lines.
    Rram,
}

/// How a multiplexer of a given size is decomposed into levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuxStructure {
    /// Binary tree of 2:1 stages.
    #[default]
    Tree,
    /// A single stage selecting among all inputs.
    OneLevel,
    /// A fixed number of stages of equal branch width.
    MultiLevel,
}

/// The logic function of a [`CircuitKind::Gate`] model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    /// Two-input AND.
    And,
    /// Two-input OR.
    Or,
    /// 2:1 multiplexer cell (`in0`, `in1`, select).
    Mux2,
}

/// The role of a circuit-model port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Data input.
    Input,
    /// Data output.
    Output,
    /// Configuration memory (CMOS).
    Sram,
    /// Bit line, inverted (resistive memory).
    Blb,
    /// Word line (resistive memory).
    Wl,
}

fn default_port_size() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// One port of a circuit model.
#[derive(Debug, Clone, Deserialize)]
pub struct PortDef {
    /// Port name.
    pub name: String,
    /// Port role.
    pub kind: PortKind,
    /// Width in bits.
    #[serde(default = "default_port_size")]
    pub size: usize,
    /// Global ports are not wired per instance; they are shared device-wide.
    #[serde(default)]
    pub global: bool,
    /// Value a memory bit holds when unselected.
    #[serde(default)]
    pub default_value: u8,
    /// Mode-selection memory of a fracturable LUT; not part of the datapath.
    #[serde(default)]
    pub mode_select: bool,
    /// Output port of a fracturable LUT: node level the pins tap.
    #[serde(default)]
    pub frac_level: Option<usize>,
    /// Output port of a fracturable LUT: node index per pin.
    #[serde(default)]
    pub output_masks: Vec<usize>,
}

/// One circuit model of the library.
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitDef {
    /// What the model is.
    pub kind: CircuitKind,
    /// Ports, in declaration order.
    #[serde(default)]
    pub ports: Vec<PortDef>,
    /// Mux/LUT technology.
    #[serde(default)]
    pub technology: DesignTechnology,
    /// Mux/LUT decomposition.
    #[serde(default)]
    pub structure: MuxStructure,
    /// Stage count, for [`MuxStructure::MultiLevel`].
    #[serde(default)]
    pub num_levels: Option<usize>,
    /// Model name of the pass gate (or `mux2` gate) used by each stage.
    #[serde(default)]
    pub pass_gate: Option<String>,
    /// Model name of the input buffer; unbuffered inputs when absent.
    #[serde(default)]
    pub input_buffer: Option<String>,
    /// Model name of the output buffer; unbuffered outputs when absent.
    #[serde(default)]
    pub output_buffer: Option<String>,
    /// Model name of the buffer inserted between stages.
    #[serde(default)]
    pub intermediate_buffer: Option<String>,
    /// One character per node level: `1` buffers that level, `-` does not.
    #[serde(default)]
    pub intermediate_buffer_map: Option<String>,
    /// Adds an extra input tied to this constant.
    #[serde(default)]
    pub const_input: Option<u8>,
    /// Drive each stage from a local address decoder.
    #[serde(default)]
    pub local_decoder: bool,
    /// Emit primitive instances rather than a behavioral select table.
    #[serde(default = "default_true")]
    pub structural: bool,
    /// LUT with fracturable outputs.
    #[serde(default)]
    pub fracturable: bool,
    /// Logic function, for [`CircuitKind::Gate`].
    #[serde(default)]
    pub gate: Option<GateKind>,
}

/// A list of multiplexer sizes to generate for one model.
#[derive(Debug, Clone, Deserialize)]
pub struct MuxRequest {
    /// Circuit model name.
    pub model: String,
    /// Datapath input counts.
    pub sizes: Vec<usize>,
}
