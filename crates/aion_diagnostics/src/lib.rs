//! Structured reporting for fabric generation.
//!
//! Generation passes do not print. They push [`Diagnostic`]s (progress
//! summaries, warnings, errors) into a [`DiagnosticSink`] that the caller owns,
//! and the caller decides how to show them, typically with a
//! [`TerminalRenderer`].

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Location};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
