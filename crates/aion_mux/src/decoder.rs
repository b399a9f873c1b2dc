//! Local address decoders driving one multiplexer level each.

use crate::error::MuxError;
use crate::ids::ModuleId;
use crate::registry::{ModuleBody, ModulePortKind, ModuleRegistry};

/// Address port of a decoder module.
pub const DECODER_ADDR_PORT: &str = "addr";
/// One-hot data output of a decoder module.
pub const DECODER_DATA_PORT: &str = "data";
/// Complemented data output of a decoder module.
pub const DECODER_DATA_INV_PORT: &str = "data_inv";

/// Address bits needed to select one of `data_size` outputs.
///
/// A single output still takes one address bit.
pub fn decoder_addr_size(data_size: usize) -> usize {
    if data_size <= 1 {
        return 1;
    }
    (usize::BITS - (data_size - 1).leading_zeros()) as usize
}

/// Name of the decoder module with the given widths.
pub fn decoder_module_name(addr_size: usize, data_size: usize) -> String {
    format!("decoder{addr_size}to{data_size}")
}

/// Finds or creates the decoder for `data_size` outputs and returns it with
/// its address width.
pub fn ensure_decoder(
    registry: &mut ModuleRegistry,
    data_size: usize,
) -> Result<(ModuleId, usize), MuxError> {
    let addr_size = decoder_addr_size(data_size);
    let (id, created) = registry.find_or_create_module(&decoder_module_name(addr_size, data_size));
    if created {
        registry.add_port(id, DECODER_ADDR_PORT, addr_size, ModulePortKind::Input)?;
        registry.add_port(id, DECODER_DATA_PORT, data_size, ModulePortKind::Output)?;
        registry.add_port(id, DECODER_DATA_INV_PORT, data_size, ModulePortKind::Output)?;
        registry.set_body(id, ModuleBody::Leaf);
    }
    Ok((id, addr_size))
}
