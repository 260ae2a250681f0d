//! Alias brushes
//!
//! An alias forwards every operation to its target. Geometry follows the
//! target unless `override_transforms` is set; coalescing settings are stored
//! on the alias itself and only copied from the target on request.

use crate::brush::BrushProperties;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasBrush {
    /// Never another alias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Uuid>,
    /// Use the alias's own transform settings instead of the target's
    #[serde(default)]
    pub override_transforms: bool,
    /// Re-apply the alias's flags after the target prepared the tile
    #[serde(default)]
    pub override_flags: bool,
}

impl AliasBrush {
    pub fn new(target: Uuid) -> Self {
        Self {
            target: Some(target),
            override_transforms: false,
            override_flags: false,
        }
    }
}

/// Copy the coalescing settings of `target` onto `alias`
pub(crate) fn revert_coalescing(alias: &mut BrushProperties, target: &BrushProperties) {
    alias.coalescing = target.coalescing.clone();
    alias.group = target.group;
}
