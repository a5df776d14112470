//! Selection state
//!
//! The single mutable selection instance. Fields are only written by
//! [`crate::manager::StateManager`]; everything else reads through getters.

use crate::identity::EntityKey;
use crate::table::SortSpec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tactics_common::config::DisplayDefaults;

/// Inclusive numeric interval restricting one attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushRange {
    min: f64,
    max: f64,
}

impl BrushRange {
    /// Build a range from two bounds in either order
    ///
    /// NaN bounds are rejected; reversed bounds are swapped.
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if a.is_nan() || b.is_nan() {
            return Err(Error::InvalidInput("brush bound is NaN".to_string()));
        }
        Ok(Self {
            min: a.min(b),
            max: a.max(b),
        })
    }

    /// Lower bound
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> f64 {
        self.max
    }

    /// True when `value` lies within the range (bounds included)
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Bounds as a tuple
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Presentation-only plot parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayParam {
    /// Line opacity
    Opacity,
    /// Curve smoothness
    Smoothness,
    /// Edge bundling strength
    Bundling,
}

impl std::str::FromStr for DisplayParam {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opacity" => Ok(DisplayParam::Opacity),
            "smoothness" => Ok(DisplayParam::Smoothness),
            "bundling" => Ok(DisplayParam::Bundling),
            other => Err(Error::InvalidInput(format!("unknown display parameter '{}'", other))),
        }
    }
}

/// Plot display parameters, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayParams {
    /// Line opacity
    pub opacity: f64,
    /// Curve smoothness
    pub smoothness: f64,
    /// Edge bundling strength
    pub bundling: f64,
}

impl DisplayParams {
    pub(crate) fn set(&mut self, param: DisplayParam, value: f64) {
        let value = value.clamp(0.0, 1.0);
        match param {
            DisplayParam::Opacity => self.opacity = value,
            DisplayParam::Smoothness => self.smoothness = value,
            DisplayParam::Bundling => self.bundling = value,
        }
    }
}

impl From<&DisplayDefaults> for DisplayParams {
    fn from(defaults: &DisplayDefaults) -> Self {
        Self {
            opacity: defaults.opacity,
            smoothness: defaults.smoothness,
            bundling: defaults.bundling,
        }
    }
}

/// Canonical selection state
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    pub(crate) active_groups: Vec<String>,
    pub(crate) active_attributes: Vec<String>,
    pub(crate) weights: BTreeMap<String, f64>,
    pub(crate) applied_weights: Option<BTreeMap<String, f64>>,
    pub(crate) cluster_count: usize,
    pub(crate) display: DisplayParams,
    pub(crate) brushes: BTreeMap<String, BrushRange>,
    pub(crate) highlighted: BTreeSet<EntityKey>,
    pub(crate) search_text: String,
    pub(crate) sort: Option<SortSpec>,
    pub(crate) page: usize,
    /// Attributes removed by the last toggle, with their former positions
    pub(crate) last_removed: Vec<(String, usize)>,
}

impl SelectionState {
    pub(crate) fn new(
        groups: Vec<String>,
        attributes: Vec<String>,
        weights: BTreeMap<String, f64>,
        display: DisplayParams,
    ) -> Self {
        Self {
            active_groups: groups,
            active_attributes: attributes,
            weights,
            applied_weights: None,
            cluster_count: 0,
            display,
            brushes: BTreeMap::new(),
            highlighted: BTreeSet::new(),
            search_text: String::new(),
            sort: None,
            page: 1,
            last_removed: Vec::new(),
        }
    }

    /// Active groups in selection order
    pub fn active_groups(&self) -> &[String] {
        &self.active_groups
    }

    /// Active attribute ids, ordered
    pub fn active_attributes(&self) -> &[String] {
        &self.active_attributes
    }

    /// Pending weights (slider positions)
    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weights used by the last `apply_weights`, if any
    pub fn applied_weights(&self) -> Option<&BTreeMap<String, f64>> {
        self.applied_weights.as_ref()
    }

    /// Cluster count (0 = clustering disabled)
    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Display parameters
    pub fn display(&self) -> DisplayParams {
        self.display
    }

    /// Brush ranges by attribute id
    pub fn brushes(&self) -> &BTreeMap<String, BrushRange> {
        &self.brushes
    }

    /// Highlighted entities
    pub fn highlighted(&self) -> &BTreeSet<EntityKey> {
        &self.highlighted
    }

    /// Table search text
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Table sort, if any column was clicked
    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Requested table page (1-indexed, clamped when queried)
    pub fn page(&self) -> usize {
        self.page
    }

    /// True when the group filter is set
    pub fn is_group_active(&self, group: &str) -> bool {
        self.active_groups.iter().any(|g| g == group)
    }

    /// True when the attribute is in the active list
    pub fn is_attribute_active(&self, id: &str) -> bool {
        self.active_attributes.iter().any(|a| a == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brush_bounds_normalized() {
        let r = BrushRange::new(4.5, 1.5).unwrap();
        assert_eq!(r.bounds(), (1.5, 4.5));
        assert!(r.contains(1.5));
        assert!(r.contains(4.5));
        assert!(!r.contains(4.51));
    }

    #[test]
    fn test_brush_rejects_nan() {
        assert!(matches!(BrushRange::new(f64::NAN, 1.0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_display_param_clamped() {
        let mut d = DisplayParams::from(&DisplayDefaults::default());
        d.set(DisplayParam::Opacity, 3.0);
        d.set(DisplayParam::Bundling, -1.0);
        assert_eq!(d.opacity, 1.0);
        assert_eq!(d.bundling, 0.0);
    }

    #[test]
    fn test_display_param_parse() {
        assert_eq!("Smoothness".parse::<DisplayParam>().unwrap(), DisplayParam::Smoothness);
        assert!("width".parse::<DisplayParam>().is_err());
    }
}
