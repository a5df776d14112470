//! Attribute registry
//!
//! Static metadata for every analytical attribute: id, display title, group
//! membership and kind. Ordinal attributes carry an [`OrdinalScale`] mapping
//! category labels to dense ranks starting at 1.
//!
//! The registry is the single source of truth for:
//! - which raw fields are identity, ignored or analytical
//! - title <-> id lookup (views emit display titles)
//! - the fixed order of attribute groups

use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// Column keys the table reserves for identity and derived fields
pub const RESERVED_KEYS: [&str; 4] = ["group", "entity", "cluster", "weightedScore"];

/// Bijective mapping between category labels and ranks `1..=n`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrdinalScale {
    labels: Vec<String>,
}

impl OrdinalScale {
    /// Build a scale from labels in rank order (first label = rank 1)
    ///
    /// Rejects empty scales and duplicate labels, so the mapping is always a
    /// bijection over dense ranks.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::InvalidRegistry("ordinal scale has no labels".to_string()));
        }
        let unique: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
        if unique.len() != labels.len() {
            return Err(Error::InvalidRegistry(format!(
                "ordinal scale has duplicate labels: {:?}",
                labels
            )));
        }
        Ok(Self { labels })
    }

    /// Rank of a category label
    pub fn rank_of(&self, label: &str) -> Option<u32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| i as u32 + 1)
    }

    /// Category label of a rank
    pub fn label_of(&self, rank: u32) -> Option<&str> {
        if rank == 0 {
            return None;
        }
        self.labels.get(rank as usize - 1).map(String::as_str)
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// (rank, label) pairs in rank order, for axis tick relabeling
    pub fn ticks(&self) -> Vec<(u32, String)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, l)| (i as u32 + 1, l.clone()))
            .collect()
    }
}

/// Attribute kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AttributeKind {
    /// Continuous numeric value
    Numeric,
    /// Ranked category
    Ordinal {
        /// Label <-> rank mapping
        scale: OrdinalScale,
    },
}

/// Metadata for one analytical attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDescriptor {
    /// Raw field name / attribute id
    pub id: String,
    /// Display title
    pub title: String,
    /// Attribute group name
    pub group: String,
    /// Numeric or ordinal
    pub kind: AttributeKind,
}

impl AttributeDescriptor {
    /// Ordinal scale, if this attribute is ordinal
    pub fn scale(&self) -> Option<&OrdinalScale> {
        match &self.kind {
            AttributeKind::Ordinal { scale } => Some(scale),
            AttributeKind::Numeric => None,
        }
    }

    /// True for ordinal attributes
    pub fn is_ordinal(&self) -> bool {
        matches!(self.kind, AttributeKind::Ordinal { .. })
    }
}

/// Registry of identity fields, ignored fields and analytical attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRegistry {
    group_field: String,
    entity_field: String,
    group_title: String,
    entity_title: String,
    groups: Vec<String>,
    attributes: Vec<AttributeDescriptor>,
    ignored: BTreeSet<String>,
}

impl AttributeRegistry {
    /// Create an empty registry with the raw field names carrying identity
    pub fn new(group_field: impl Into<String>, entity_field: impl Into<String>) -> Self {
        Self {
            group_field: group_field.into(),
            entity_field: entity_field.into(),
            group_title: "Group".to_string(),
            entity_title: "Entity".to_string(),
            groups: Vec::new(),
            attributes: Vec::new(),
            ignored: BTreeSet::new(),
        }
    }

    /// Set display titles for the two identity columns
    pub fn with_identity_titles(mut self, group: &str, entity: &str) -> Self {
        self.group_title = group.to_string();
        self.entity_title = entity.to_string();
        self
    }

    /// Declare an attribute group (groups keep declaration order)
    pub fn with_group(mut self, name: &str) -> Result<Self> {
        if self.groups.iter().any(|g| g == name) {
            return Err(Error::InvalidRegistry(format!("duplicate group '{}'", name)));
        }
        self.groups.push(name.to_string());
        Ok(self)
    }

    /// Register a numeric attribute
    pub fn with_numeric(self, id: &str, title: &str, group: &str) -> Result<Self> {
        self.with_attribute(id, title, group, AttributeKind::Numeric)
    }

    /// Register an ordinal attribute with labels in rank order
    pub fn with_ordinal(self, id: &str, title: &str, group: &str, labels: &[&str]) -> Result<Self> {
        let scale = OrdinalScale::new(labels.iter().copied())?;
        self.with_attribute(id, title, group, AttributeKind::Ordinal { scale })
    }

    /// Mark raw fields that never become attributes
    pub fn ignoring<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(fields.into_iter().map(Into::into));
        self
    }

    fn with_attribute(mut self, id: &str, title: &str, group: &str, kind: AttributeKind) -> Result<Self> {
        if RESERVED_KEYS.contains(&id) || id == self.group_field || id == self.entity_field {
            return Err(Error::InvalidRegistry(format!("'{}' is a reserved key", id)));
        }
        if self.attributes.iter().any(|a| a.id == id) {
            return Err(Error::InvalidRegistry(format!("duplicate attribute '{}'", id)));
        }
        if !self.groups.iter().any(|g| g == group) {
            return Err(Error::InvalidRegistry(format!(
                "attribute '{}' names undeclared group '{}'",
                id, group
            )));
        }
        self.attributes.push(AttributeDescriptor {
            id: id.to_string(),
            title: title.to_string(),
            group: group.to_string(),
            kind,
        });
        Ok(self)
    }

    /// Registry for the league/team tactical profile dataset
    pub fn tactical_profiles() -> Self {
        let build = || -> Result<Self> {
            Self::new("league_name", "team_name")
                .with_identity_titles("League", "Team")
                .ignoring([
                    "team_fifa_api_id",
                    "team_api_id",
                    "league_name_id",
                    "date",
                    "buildUpPlaySpeedClass",
                    "buildUpPlayDribblingClass",
                    "buildUpPlayPassingClass",
                    "chanceCreationShootingClass",
                    "chanceCreationCrossingClass",
                    "chanceCreationPassingClass",
                    "defencePressureClass",
                    "defenceAggressionClass",
                    "defenceTeamWidthClass",
                ])
                .with_group("Build Up")?
                .with_group("Chance Creation")?
                .with_group("Defence")?
                .with_numeric("buildUpPlaySpeed", "Speed", "Build Up")?
                .with_numeric("buildUpPlayDribbling", "Dribbling", "Build Up")?
                .with_numeric("buildUpPlayPassing", "Passing", "Build Up")?
                .with_ordinal(
                    "buildUpPlayPositioningClass",
                    "Positioning",
                    "Build Up",
                    &["Organised", "Free Form"],
                )?
                .with_numeric("chanceCreationPassing", "Creation Passing", "Chance Creation")?
                .with_numeric("chanceCreationCrossing", "Creation Crossing", "Chance Creation")?
                .with_numeric("chanceCreationShooting", "Creation Shooting", "Chance Creation")?
                .with_ordinal(
                    "chanceCreationPositioningClass",
                    "Creation Positioning",
                    "Chance Creation",
                    &["Organised", "Free Form"],
                )?
                .with_numeric("defencePressure", "Pressure", "Defence")?
                .with_numeric("defenceAggression", "Aggression", "Defence")?
                .with_numeric("defenceTeamWidth", "Team Width", "Defence")?
                .with_ordinal(
                    "defenceDefenderLineClass",
                    "Defender Line",
                    "Defence",
                    &["Cover", "Offside Trap"],
                )
        };
        build().expect("built-in tactical profile registry must be valid")
    }

    /// Raw field carrying the group label
    pub fn group_field(&self) -> &str {
        &self.group_field
    }

    /// Raw field carrying the entity label
    pub fn entity_field(&self) -> &str {
        &self.entity_field
    }

    /// Display title of the group column
    pub fn group_title(&self) -> &str {
        &self.group_title
    }

    /// Display title of the entity column
    pub fn entity_title(&self) -> &str {
        &self.entity_title
    }

    /// Attribute group names in declaration order
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// All registered attributes in declaration order
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Registered attribute ids in declaration order
    pub fn attribute_ids(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.id.clone()).collect()
    }

    /// Look up an attribute descriptor
    pub fn get(&self, id: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.id == id)
    }

    /// True when the raw field is dropped during normalization
    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignored.contains(field)
    }

    /// True for registered ordinal attributes
    pub fn is_ordinal(&self, id: &str) -> bool {
        self.get(id).is_some_and(AttributeDescriptor::is_ordinal)
    }

    /// Ordinal scale for an attribute
    pub fn scale(&self, id: &str) -> Option<&OrdinalScale> {
        self.get(id).and_then(AttributeDescriptor::scale)
    }

    /// Attributes that carry a weight in the scoring engine
    pub fn is_weightable(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Display title, falling back to the id for unregistered fields
    pub fn title<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|a| a.title.as_str()).unwrap_or(id)
    }

    /// Map a display title (or a raw id) back to an attribute id
    pub fn id_for_title<'a>(&'a self, title: &str) -> Option<&'a str> {
        let title = title.trim();
        self.attributes
            .iter()
            .find(|a| a.title == title)
            .or_else(|| self.attributes.iter().find(|a| a.id == title))
            .map(|a| a.id.as_str())
    }

    /// Group name of an attribute
    pub fn group_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|a| a.group.as_str())
    }

    /// Registered attributes of one group, in declaration order
    pub fn attributes_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a AttributeDescriptor> + 'a {
        self.attributes.iter().filter(move |a| a.group == group)
    }
}
