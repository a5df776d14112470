//! Record normalizer
//!
//! Converts raw ingested rows into canonical [`EntityRecord`]s:
//! - ignored fields are dropped
//! - ordinal fields become their integer rank, keeping the raw label
//! - every other field becomes numeric-or-null
//!
//! Bad values never abort the batch. The field is nulled and the problem is
//! recorded as a `MalformedRecord` issue on the report.

use crate::identity::EntityKey;
use crate::record::EntityRecord;
use crate::registry::{AttributeRegistry, OrdinalScale, RESERVED_KEYS};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Raw field value as delivered by the ingestion collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Missing value
    Null,
    /// Already-numeric value
    Number(f64),
    /// Boolean (never valid for an analytical field)
    Bool(bool),
    /// Text value (category label or numeric string)
    Text(String),
}

impl RawValue {
    fn as_text(&self) -> String {
        match self {
            RawValue::Null => String::new(),
            RawValue::Number(n) => n.to_string(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// One raw row: field name -> raw value
pub type RawRow = BTreeMap<String, RawValue>;

/// Outcome of a normalization pass
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    /// Canonical records, in input order
    pub records: Vec<EntityRecord>,
    /// Fields that were nulled (`Error::MalformedRecord`)
    pub issues: Vec<Error>,
    /// Rows skipped because their identity was missing or duplicated
    pub dropped_rows: usize,
}

/// Normalize raw rows, discarding the issue report
pub fn normalize(registry: &AttributeRegistry, rows: &[RawRow]) -> Vec<EntityRecord> {
    normalize_with_report(registry, rows).records
}

/// Normalize raw rows and report every nulled field and dropped row
pub fn normalize_with_report(registry: &AttributeRegistry, rows: &[RawRow]) -> NormalizeReport {
    let mut report = NormalizeReport::default();
    let mut seen: HashSet<EntityKey> = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let group = identity_label(row, registry.group_field());
        let entity = identity_label(row, registry.entity_field());
        let (Some(group), Some(entity)) = (group, entity) else {
            warn!("Row {} has no usable identity, skipping", index);
            report.issues.push(Error::MalformedRecord {
                entity: format!("row {}", index),
                field: format!("{}/{}", registry.group_field(), registry.entity_field()),
                raw: format!(
                    "{:?}/{:?}",
                    row.get(registry.group_field()).map(RawValue::as_text),
                    row.get(registry.entity_field()).map(RawValue::as_text)
                ),
            });
            report.dropped_rows += 1;
            continue;
        };

        let key = EntityKey::new(group, entity);
        if !seen.insert(key.clone()) {
            warn!("Duplicate identity {}, keeping first occurrence", key);
            report.dropped_rows += 1;
            continue;
        }

        let mut record = EntityRecord::new(key.group.clone(), key.entity.clone());
        for (field, raw) in row {
            if field == registry.group_field()
                || field == registry.entity_field()
                || registry.is_ignored(field)
            {
                continue;
            }
            if RESERVED_KEYS.contains(&field.as_str()) {
                warn!("Field '{}' on {} shadows a derived column, dropping it", field, key);
                report.issues.push(Error::MalformedRecord {
                    entity: key.entity.clone(),
                    field: field.clone(),
                    raw: raw.as_text(),
                });
                continue;
            }

            let parsed = match registry.scale(field) {
                Some(scale) => match parse_ordinal(scale, raw) {
                    Ok((rank, label)) => {
                        if let Some(label) = label {
                            record.insert_label(field, label);
                        }
                        Ok(rank)
                    }
                    // Unknown categories keep their text for display
                    Err(text) => {
                        record.insert_label(field, text.trim().to_string());
                        Err(text)
                    }
                },
                None => parse_numeric(raw),
            };

            match parsed {
                Ok(value) => record.insert_value(field, value),
                Err(text) => {
                    debug!("Nulling malformed {} on {}: {:?}", field, key, text);
                    report.issues.push(Error::MalformedRecord {
                        entity: key.entity.clone(),
                        field: field.clone(),
                        raw: text,
                    });
                    record.insert_value(field, None);
                }
            }
        }
        report.records.push(record);
    }

    if !report.issues.is_empty() {
        warn!(
            "Normalized {} records with {} malformed fields ({} rows dropped)",
            report.records.len(),
            report.issues.len(),
            report.dropped_rows
        );
    }
    report
}

fn identity_label(row: &RawRow, field: &str) -> Option<String> {
    match row.get(field)? {
        RawValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        RawValue::Number(n) if n.is_finite() => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric-or-null; `Err(raw text)` when the value is present but unparseable
fn parse_numeric(raw: &RawValue) -> std::result::Result<Option<f64>, String> {
    match raw {
        RawValue::Null => Ok(None),
        RawValue::Number(n) if n.is_finite() => Ok(Some(*n)),
        RawValue::Text(s) if s.trim().is_empty() => Ok(None),
        RawValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(s.clone()),
        },
        other => Err(other.as_text()),
    }
}

/// Rank plus retained display label
fn parse_ordinal(
    scale: &OrdinalScale,
    raw: &RawValue,
) -> std::result::Result<(Option<f64>, Option<String>), String> {
    match raw {
        RawValue::Null => Ok((None, None)),
        RawValue::Text(s) if s.trim().is_empty() => Ok((None, None)),
        RawValue::Text(s) => match scale.rank_of(s.trim()) {
            Some(rank) => Ok((Some(f64::from(rank)), Some(s.trim().to_string()))),
            None => Err(s.clone()),
        },
        // A bare rank is accepted when it names a category
        RawValue::Number(n) if n.fract() == 0.0 && *n >= 1.0 => {
            let rank = *n as u32;
            match scale.label_of(rank) {
                Some(label) => Ok((Some(*n), Some(label.to_string()))),
                None => Err(raw.as_text()),
            }
        }
        other => Err(other.as_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[(&str, RawValue)]) -> RawRow {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn registry() -> AttributeRegistry {
        AttributeRegistry::tactical_profiles()
    }

    #[test]
    fn test_ordinal_becomes_rank_and_keeps_label() {
        let rows = vec![row(&[
            ("league_name", "Spain LIGA BBVA".into()),
            ("team_name", "FC Barcelona".into()),
            ("defenceDefenderLineClass", "Offside Trap".into()),
            ("buildUpPlaySpeed", "35".into()),
        ])];
        let records = normalize(&registry(), &rows);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.value("defenceDefenderLineClass"), Some(2.0));
        assert_eq!(r.label("defenceDefenderLineClass"), Some("Offside Trap"));
        assert_eq!(r.value("buildUpPlaySpeed"), Some(35.0));
    }

    #[test]
    fn test_ignored_fields_dropped() {
        let rows = vec![row(&[
            ("league_name", "L".into()),
            ("team_name", "T".into()),
            ("team_api_id", 9825.0.into()),
            ("buildUpPlaySpeedClass", "Balanced".into()),
        ])];
        let records = normalize(&registry(), &rows);
        assert!(!records[0].has_attribute("team_api_id"));
        assert!(!records[0].has_attribute("buildUpPlaySpeedClass"));
    }

    #[test]
    fn test_malformed_field_nulled_not_fatal() {
        let rows = vec![
            row(&[
                ("league_name", "L".into()),
                ("team_name", "A".into()),
                ("defencePressure", "high-ish".into()),
                ("defenceDefenderLineClass", "Zonal".into()),
            ]),
            row(&[
                ("league_name", "L".into()),
                ("team_name", "B".into()),
                ("defencePressure", 50.0.into()),
            ]),
        ];
        let report = normalize_with_report(&registry(), &rows);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.issues.len(), 2);
        let a = &report.records[0];
        assert!(a.has_attribute("defencePressure"));
        assert_eq!(a.value("defencePressure"), None);
        assert_eq!(a.value("defenceDefenderLineClass"), None);
        assert_eq!(a.label("defenceDefenderLineClass"), Some("Zonal"));
        assert!(matches!(report.issues[0], Error::MalformedRecord { .. }));
        assert_eq!(report.records[1].value("defencePressure"), Some(50.0));
    }

    #[test]
    fn test_missing_values_are_null_without_issue() {
        let rows = vec![row(&[
            ("league_name", "L".into()),
            ("team_name", "A".into()),
            ("buildUpPlayDribbling", RawValue::Null),
            ("buildUpPlayPassing", "".into()),
        ])];
        let report = normalize_with_report(&registry(), &rows);
        assert!(report.issues.is_empty());
        assert_eq!(report.records[0].value("buildUpPlayDribbling"), None);
        assert_eq!(report.records[0].value("buildUpPlayPassing"), None);
    }

    #[test]
    fn test_duplicate_and_anonymous_rows_dropped() {
        let rows = vec![
            row(&[("league_name", "L".into()), ("team_name", "A".into())]),
            row(&[("league_name", "L".into()), ("team_name", "A".into())]),
            row(&[("league_name", "L".into())]),
        ];
        let report = normalize_with_report(&registry(), &rows);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.dropped_rows, 2);
    }

    #[test]
    fn test_unregistered_field_passes_through_numeric() {
        let rows = vec![row(&[
            ("league_name", "L".into()),
            ("team_name", "A".into()),
            ("possession", "54.5".into()),
        ])];
        let records = normalize(&registry(), &rows);
        assert_eq!(records[0].value("possession"), Some(54.5));
    }

    #[test]
    fn test_derived_column_names_rejected() {
        let rows = vec![row(&[
            ("league_name", "L".into()),
            ("team_name", "A".into()),
            ("cluster", 7.0.into()),
            ("weightedScore", "3.5".into()),
            ("possession", 50.0.into()),
        ])];
        let report = normalize_with_report(&registry(), &rows);
        let r = &report.records[0];
        assert!(!r.has_attribute("cluster"));
        assert!(!r.has_attribute("weightedScore"));
        assert_eq!(r.value("possession"), Some(50.0));
        assert_eq!(report.issues.len(), 2);
        assert!(report
            .issues
            .iter()
            .all(|e| matches!(e, Error::MalformedRecord { field, .. } if field == "cluster" || field == "weightedScore")));
    }

    #[test]
    fn test_raw_rows_deserialize_from_json() {
        let json = r#"[{"league_name":"L","team_name":"A","buildUpPlaySpeed":40,"defenceDefenderLineClass":"Cover","date":null}]"#;
        let rows: Vec<RawRow> = serde_json::from_str(json).unwrap();
        let records = normalize(&registry(), &rows);
        assert_eq!(records[0].value("buildUpPlaySpeed"), Some(40.0));
        assert_eq!(records[0].value("defenceDefenderLineClass"), Some(1.0));
    }
}
