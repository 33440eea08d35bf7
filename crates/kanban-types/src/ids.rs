//! Type-safe identifier wrappers for factories and lines.
//!
//! Factory and line numbers travel as plain integers on the wire and inside
//! counter keys, but mixing them up silently routes an order to the wrong
//! line. Each identifier gets its own newtype so the compiler keeps them apart.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::wire::WireError;

/// Generates a newtype wrapper around `u32` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Wrap a raw identifier.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Return the inner `u32` value.
            pub const fn into_inner(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = WireError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|source| WireError::InvalidInteger {
                        field: $label,
                        value: s.to_owned(),
                        source,
                    })
            }
        }
    };
}

define_id! {
    /// Identifier of a factory (a group of production lines).
    FactoryId, "factory_id"
}

define_id! {
    /// Identifier of a production line within its factory (1-based).
    LineId, "line_id"
}

impl LineId {
    /// Line id addressed by the factory's 0-based line index.
    pub const fn from_index(index: u32) -> Self {
        Self(index.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_integers() {
        assert_eq!("7".parse::<FactoryId>().ok(), Some(FactoryId(7)));
        assert_eq!(" 3 ".parse::<LineId>().ok(), Some(LineId(3)));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let err = "abc".parse::<LineId>();
        assert!(matches!(
            err,
            Err(WireError::InvalidInteger { field: "line_id", .. })
        ));
    }

    #[test]
    fn line_index_is_one_based() {
        assert_eq!(LineId::from_index(0), LineId(1));
        assert_eq!(LineId::from_index(4), LineId(5));
    }
}
