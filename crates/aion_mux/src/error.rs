//! Error types for multiplexer netlist generation.

use crate::library::MuxTechnology;
use aion_config::PortKind;

/// Errors raised while resolving circuit models or generating multiplexer
/// modules. Each one aborts the generation pass.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// A model references a model that does not exist.
    #[error("circuit model '{name}' referenced by '{referenced_by}' does not exist")]
    UnknownModel {
        /// The missing model.
        name: String,
        /// The referencing model.
        referenced_by: String,
    },

    /// A model is used in a role its kind cannot fill.
    #[error("circuit model '{model}' must be {expected}")]
    WrongModelKind {
        /// The offending model.
        model: String,
        /// What was expected.
        expected: &'static str,
    },

    /// A required model reference is absent.
    #[error("circuit model '{model}' has no {role} model")]
    MissingModel {
        /// The model lacking the reference.
        model: String,
        /// The missing role.
        role: &'static str,
    },

    /// A required port is absent.
    #[error("circuit model '{model}' has no {kind:?} port")]
    MissingPort {
        /// The model lacking the port.
        model: String,
        /// Kind of the missing port.
        kind: PortKind,
    },

    /// A primitive has the wrong number of ports of some kind.
    #[error("circuit model '{model}' must have {expected}, found {found}")]
    PortCount {
        /// The offending model.
        model: String,
        /// The expected port shape.
        expected: &'static str,
        /// The number found.
        found: usize,
    },

    /// The model and technology cannot be combined.
    #[error("unsupported configuration for '{model}': {reason}")]
    Unsupported {
        /// The offending model.
        model: String,
        /// Why.
        reason: String,
    },

    /// A multiplexer was requested with fewer than two inputs.
    #[error("multiplexer '{model}' of size {size} needs at least two inputs")]
    InvalidSize {
        /// The model.
        model: String,
        /// The requested size.
        size: usize,
    },

    /// The intermediate buffer map does not fit the graph.
    #[error("intermediate buffer map of '{model}' is invalid: {reason}")]
    InvalidBufferMap {
        /// The model.
        model: String,
        /// Why.
        reason: String,
    },

    /// An output pin maps to a node the graph does not have.
    #[error("module '{module}' has no node {index} at level {level} for an output pin")]
    MissingOutputNode {
        /// The module being generated.
        module: String,
        /// Node level.
        level: usize,
        /// Node index.
        index: usize,
    },

    /// An output port taps a node the graph does not have.
    #[error("output '{port}' of '{model}' taps node {index} of level {level}, which does not exist")]
    OutputOutOfRange {
        /// The model.
        model: String,
        /// The output port.
        port: String,
        /// Requested level.
        level: usize,
        /// Requested node index.
        index: usize,
    },

    /// A LUT model is requested at a second size.
    #[error("LUT '{model}' is requested with {size} inputs but already has {existing}")]
    LutSizeConflict {
        /// The LUT model.
        model: String,
        /// The new size.
        size: usize,
        /// The size already in the library.
        existing: usize,
    },

    /// No branch module was generated for a node's fan-in.
    #[error("no {technology:?} branch of fan-in {fan_in}")]
    MissingBranch {
        /// Branch technology.
        technology: MuxTechnology,
        /// Branch fan-in.
        fan_in: usize,
    },

    /// Two models produce different branches under the same key.
    #[error("branch module '{module}' was already generated with a different cell")]
    BranchConflict {
        /// The branch module.
        module: String,
    },

    /// A branch graph cannot be realized by the technology.
    #[error("branch module '{module}' cannot be built: {reason}")]
    BranchShape {
        /// The branch module.
        module: String,
        /// Why.
        reason: String,
    },

    /// A port or wire name is declared twice on one module.
    #[error("module '{module}' already has a net '{net}'")]
    DuplicateNet {
        /// The module.
        module: String,
        /// The port or wire.
        net: String,
    },

    /// A binding or assignment refers to a bit the module does not have.
    #[error("module '{module}' has no bit {net}[{index}]")]
    UnknownNet {
        /// The module.
        module: String,
        /// The port or wire.
        net: String,
        /// Bit index.
        index: usize,
    },

    /// An instance binds a port its module does not have.
    #[error("module '{module}' has no port '{port}'")]
    UnknownPort {
        /// The instantiated module.
        module: String,
        /// The port.
        port: String,
    },

    /// An instance binds a port with the wrong number of bits.
    #[error("port '{port}' of module '{module}' is {expected} bits wide, bound to {found}")]
    WidthMismatch {
        /// The instantiated module.
        module: String,
        /// The port.
        port: String,
        /// Port width.
        expected: usize,
        /// Bound width.
        found: usize,
    },
}
