//! Catalog shape a local product takes on the storefront channel.

use serde::{Deserialize, Serialize};

/// How a local product maps onto the channel's catalog.
///
/// A product with no grade declarations syncs as a [`SyncShape::Standalone`]
/// item (one remote product, one implicit variant). A product with one or
/// more declarations becomes a [`SyncShape::Parent`] carrying an explicit
/// variant list, and each declared product is a [`SyncShape::Variant`] bound
/// to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncShape {
    Standalone,
    Parent,
    Variant,
}

impl SyncShape {
    /// Single-character tag stamped on the local product row.
    #[must_use]
    pub const fn tag(self) -> char {
        match self {
            Self::Standalone => 'S',
            Self::Parent => 'P',
            Self::Variant => 'V',
        }
    }

    /// Whether operational fields (price, stock, dimensions) are compared
    /// when detecting divergence for this shape.
    #[must_use]
    pub const fn compares_operational(self) -> bool {
        matches!(self, Self::Standalone | Self::Variant)
    }

    /// Whether taxonomy fields (category, group, subgroup) are compared
    /// when detecting divergence for this shape.
    #[must_use]
    pub const fn compares_taxonomy(self) -> bool {
        matches!(self, Self::Standalone | Self::Parent)
    }
}

impl std::fmt::Display for SyncShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Parent => write!(f, "parent"),
            Self::Variant => write!(f, "variant"),
        }
    }
}

impl std::str::FromStr for SyncShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standalone" => Ok(Self::Standalone),
            "parent" => Ok(Self::Parent),
            "variant" => Ok(Self::Variant),
            _ => Err(format!("invalid sync shape: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tag_chars_are_distinct() {
        assert_eq!(SyncShape::Standalone.tag(), 'S');
        assert_eq!(SyncShape::Parent.tag(), 'P');
        assert_eq!(SyncShape::Variant.tag(), 'V');
    }

    #[test]
    fn test_display_from_str_roundtrip() {
        for shape in [SyncShape::Standalone, SyncShape::Parent, SyncShape::Variant] {
            let parsed = SyncShape::from_str(&shape.to_string()).expect("roundtrip");
            assert_eq!(parsed, shape);
        }
    }

    #[test]
    fn test_comparison_scoping() {
        assert!(SyncShape::Standalone.compares_operational());
        assert!(SyncShape::Standalone.compares_taxonomy());
        assert!(SyncShape::Parent.compares_taxonomy());
        assert!(!SyncShape::Parent.compares_operational());
        assert!(SyncShape::Variant.compares_operational());
        assert!(!SyncShape::Variant.compares_taxonomy());
    }
}
