//! Shared foundational types for the Aion fabric generator.
//!
//! This crate provides interned names for generated modules and ports,
//! device grid coordinates, and the side indices used to address the
//! faces of a switch block.

#![warn(missing_docs)]

pub mod coord;
pub mod ident;
pub mod side;

pub use coord::DeviceCoordinate;
pub use ident::{Ident, Interner};
pub use side::Side;
