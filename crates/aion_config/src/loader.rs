//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{CircuitDef, CircuitKind, FabricConfig, MuxStructure, PortKind};
use std::path::Path;

/// File name looked up inside a fabric directory.
pub const CONFIG_FILE_NAME: &str = "fabric.toml";

/// Loads and validates `<fabric_dir>/fabric.toml`.
pub fn load_config(fabric_dir: &Path) -> Result<FabricConfig, ConfigError> {
    let content = std::fs::read_to_string(fabric_dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates a `fabric.toml` from a string.
pub fn load_config_from_str(content: &str) -> Result<FabricConfig, ConfigError> {
    let config: FabricConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &FabricConfig) -> Result<(), ConfigError> {
    if config.fabric.name.is_empty() {
        return Err(ConfigError::MissingField("fabric.name".to_string()));
    }

    for (name, circuit) in &config.circuits {
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "circuit model names must not be empty".to_string(),
            ));
        }
        validate_circuit(name, circuit)?;
    }

    for request in &config.muxes {
        let Some(circuit) = config.circuits.get(&request.model) else {
            return Err(ConfigError::UnknownCircuit(request.model.clone()));
        };
        if !matches!(circuit.kind, CircuitKind::Mux | CircuitKind::Lut) {
            return Err(ConfigError::ValidationError(format!(
                "circuit '{}' is not a multiplexer or LUT",
                request.model
            )));
        }
        if let Some(size) = request.sizes.iter().find(|&&s| s < 2) {
            return Err(ConfigError::ValidationError(format!(
                "multiplexer size {size} for '{}' is below 2",
                request.model
            )));
        }
    }
    Ok(())
}

fn validate_circuit(name: &str, circuit: &CircuitDef) -> Result<(), ConfigError> {
    for port in &circuit.ports {
        if port.name.is_empty() {
            return Err(ConfigError::MissingField(format!("circuits.{name}.ports.name")));
        }
        if port.size == 0 {
            return Err(ConfigError::ValidationError(format!(
                "port '{}' of '{name}' has zero width",
                port.name
            )));
        }
        if port.default_value > 1 {
            return Err(ConfigError::ValidationError(format!(
                "default_value of port '{}' of '{name}' must be 0 or 1",
                port.name
            )));
        }
        if port.kind != PortKind::Output && (port.frac_level.is_some() || !port.output_masks.is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "port '{}' of '{name}' is not an output but has fracturable settings",
                port.name
            )));
        }
    }

    let fixed_levels = match circuit.structure {
        MuxStructure::OneLevel => Some(1),
        MuxStructure::MultiLevel => circuit.num_levels,
        MuxStructure::Tree => None,
    };
    for port in circuit.ports.iter().filter(|p| p.kind == PortKind::Output) {
        if let Some(level) = port.frac_level {
            if level == 0 || fixed_levels.is_some_and(|levels| level > levels) {
                return Err(ConfigError::ValidationError(format!(
                    "frac_level {level} of port '{}' of '{name}' is not a node level",
                    port.name
                )));
            }
        }
        if port.output_masks.len() > port.size {
            return Err(ConfigError::ValidationError(format!(
                "port '{}' of '{name}' has {} output_masks for {} pins",
                port.name,
                port.output_masks.len(),
                port.size
            )));
        }
    }

    if let Some(value) = circuit.const_input {
        if value > 1 {
            return Err(ConfigError::ValidationError(format!(
                "const_input of '{name}' must be 0 or 1"
            )));
        }
    }

    if let Some(levels) = circuit.num_levels {
        if levels == 0 {
            return Err(ConfigError::ValidationError(format!(
                "num_levels of '{name}' must be at least 1"
            )));
        }
    }

    if let Some(map) = &circuit.intermediate_buffer_map {
        if circuit.intermediate_buffer.is_none() {
            return Err(ConfigError::MissingField(format!(
                "circuits.{name}.intermediate_buffer"
            )));
        }
        if let Some(bad) = map.chars().find(|c| *c != '1' && *c != '-') {
            return Err(ConfigError::ValidationError(format!(
                "intermediate_buffer_map of '{name}' contains '{bad}'; expected '1' or '-'"
            )));
        }
    }

    if circuit.kind == CircuitKind::Gate && circuit.gate.is_none() {
        return Err(ConfigError::MissingField(format!("circuits.{name}.gate")));
    }
    Ok(())
}
