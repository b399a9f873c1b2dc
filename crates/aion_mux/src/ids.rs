//! Opaque ID newtypes for multiplexer graphs, circuit models and generated
//! modules.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// A node of a multiplexer graph.
    MuxNodeId
);

define_id!(
    /// An edge of a multiplexer graph.
    MuxEdgeId
);

define_id!(
    /// A configuration memory bit of a multiplexer graph.
    MuxMemId
);

define_id!(
    /// A circuit model in the [`CircuitLibrary`](crate::CircuitLibrary).
    CircuitModelId
);

define_id!(
    /// A multiplexer in the [`MuxLibrary`](crate::MuxLibrary).
    MuxId
);

define_id!(
    /// A module in the [`ModuleRegistry`](crate::ModuleRegistry).
    ModuleId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(MuxNodeId::from_raw(5).as_raw(), 5);
        assert_eq!(ModuleId::from_index(9).index(), 9);
    }

    #[test]
    fn ordering_follows_index() {
        assert!(MuxMemId::from_raw(1) < MuxMemId::from_raw(2));
    }

    #[test]
    fn serde_roundtrip() {
        let id = CircuitModelId::from_raw(3);
        let json = serde_json::to_string(&id).unwrap();
        let back: CircuitModelId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
