//! Whole-device passes that build the switch-block and channel catalogues
//! and report a summary.

use crate::chan::{ChanType, RrChan};
use crate::device::{DeviceSwitchBlocks, MirrorStrategy};
use crate::device_chan::DeviceChanTable;
use crate::error::FabricError;
use crate::rr_graph::RrGraph;
use crate::switch_block::SwitchBlock;
use aion_common::DeviceCoordinate;
use aion_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Summary of the switch-block catalogue.
pub const SWITCH_BLOCK_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Info, 101);
/// The rotation search is enabled.
pub const ROTATION_SEARCH_ENABLED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);
/// Summary of the channel catalogue.
pub const CHANNEL_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Info, 103);

/// Checks the routing graph, then adds every block in iteration order.
pub fn build_switch_block_catalogue(
    graph: &RrGraph,
    blocks: impl IntoIterator<Item = SwitchBlock>,
    strategy: MirrorStrategy,
    sink: &DiagnosticSink,
) -> Result<DeviceSwitchBlocks, FabricError> {
    graph.check_unidirectional()?;

    if strategy == MirrorStrategy::Rotatable {
        sink.emit(
            Diagnostic::warning(ROTATION_SEARCH_ENABLED, "rotatable switch-block search enabled")
                .with_note("search cost grows with channel width and canonical count"),
        );
    }

    let mut table = DeviceSwitchBlocks::new(strategy);
    for block in blocks {
        table.add(graph, block);
    }

    let mut summary = Diagnostic::note(
        SWITCH_BLOCK_SUMMARY,
        format!(
            "{} switch blocks reduced to {} unique mirrors",
            table.num_blocks(),
            table.num_canonical()
        ),
    );
    if strategy == MirrorStrategy::Rotatable {
        summary = summary.with_note(format!("{} rotatable mirrors", table.num_rotatable()));
    }
    sink.emit(summary);
    Ok(table)
}

/// Checks the routing graph, then adds every channel in iteration order.
pub fn build_chan_catalogue(
    graph: &RrGraph,
    chans: impl IntoIterator<Item = (DeviceCoordinate, RrChan)>,
    sink: &DiagnosticSink,
) -> Result<DeviceChanTable, FabricError> {
    graph.check_unidirectional()?;

    let mut table = DeviceChanTable::new();
    for (coord, chan) in chans {
        table.add(graph, coord, chan)?;
    }

    sink.emit(Diagnostic::note(
        CHANNEL_SUMMARY,
        format!(
            "{} unique X channels, {} unique Y channels",
            table.num_classes(ChanType::X),
            table.num_classes(ChanType::Y)
        ),
    ));
    Ok(table)
}
