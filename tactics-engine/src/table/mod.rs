//! Table query engine
//!
//! Derives the row table's page from the visible records: search filter,
//! brush filter (ANDed), single-column stable sort, then pagination.

pub mod pagination;

use crate::record::EntityRecord;
use crate::registry::{AttributeRegistry, RESERVED_KEYS};
use crate::selection::BrushRange;
use pagination::calculate_pagination;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A table column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableColumn {
    /// Group label
    Group,
    /// Entity label
    Entity,
    /// Analytical attribute
    Attribute(String),
    /// Cluster label
    Cluster,
    /// Weighted score
    WeightedScore,
}

impl TableColumn {
    /// Column key as used in header-click events
    pub fn key(&self) -> &str {
        match self {
            TableColumn::Group => RESERVED_KEYS[0],
            TableColumn::Entity => RESERVED_KEYS[1],
            TableColumn::Cluster => RESERVED_KEYS[2],
            TableColumn::WeightedScore => RESERVED_KEYS[3],
            TableColumn::Attribute(id) => id,
        }
    }

    /// Resolve a column key; raw identity field names are accepted too
    pub fn from_key(key: &str, registry: &AttributeRegistry) -> Self {
        let key = key.trim();
        match key {
            k if k == RESERVED_KEYS[0] || k == registry.group_field() => TableColumn::Group,
            k if k == RESERVED_KEYS[1] || k == registry.entity_field() => TableColumn::Entity,
            k if k == RESERVED_KEYS[2] => TableColumn::Cluster,
            k if k == RESERVED_KEYS[3] => TableColumn::WeightedScore,
            other => TableColumn::Attribute(other.to_string()),
        }
    }
}

impl std::fmt::Display for TableColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// Single-column sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Sorted column
    pub column: TableColumn,
    /// Direction
    pub direction: SortDirection,
}

impl SortSpec {
    /// Sort state after a header click on `column`
    ///
    /// Clicking the current column flips its direction; any other column
    /// starts ascending.
    pub fn after_click(current: Option<&SortSpec>, column: TableColumn) -> SortSpec {
        let direction = match current {
            Some(spec) if spec.column == column && spec.direction == SortDirection::Asc => {
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        SortSpec { column, direction }
    }

    /// True for descending order
    pub fn is_descending(&self) -> bool {
        self.direction == SortDirection::Desc
    }
}

/// Table query parameters
#[derive(Debug, Clone)]
pub struct TableQuery<'a> {
    /// Search text (trimmed, case-insensitive)
    pub search: &'a str,
    /// Brush ranges, ANDed
    pub brushes: &'a BTreeMap<String, BrushRange>,
    /// Sort, if any
    pub sort: Option<&'a SortSpec>,
    /// Requested page (1-indexed)
    pub page: usize,
    /// Rows per page
    pub page_size: usize,
}

/// One page of query results
#[derive(Debug, Clone)]
pub struct TablePage<'a> {
    /// Rows on this page
    pub rows: Vec<&'a EntityRecord>,
    /// Clamped page number
    pub page: usize,
    /// Total pages (at least 1)
    pub total_pages: usize,
    /// Rows matching search and brushes
    pub total_rows: usize,
}

/// Case-insensitive substring match on the entity or group label
pub fn matches_search(record: &EntityRecord, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    record.entity().to_lowercase().contains(&needle) || record.group().to_lowercase().contains(&needle)
}

/// True when the record satisfies every brush; a null value fails its brush
pub fn passes_brushes(record: &EntityRecord, brushes: &BTreeMap<String, BrushRange>) -> bool {
    brushes
        .iter()
        .all(|(id, range)| record.value(id).is_some_and(|v| range.contains(v)))
}

/// Rows matching search and brushes, in input order
pub fn filter_rows<'a>(records: &[&'a EntityRecord], search: &str, brushes: &BTreeMap<String, BrushRange>) -> Vec<&'a EntityRecord> {
    records
        .iter()
        .copied()
        .filter(|r| matches_search(r, search) && passes_brushes(r, brushes))
        .collect()
}

enum SortKey<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

fn sort_key<'a>(record: &'a EntityRecord, column: &TableColumn) -> SortKey<'a> {
    let number = |v: Option<f64>| v.map_or(SortKey::Missing, SortKey::Number);
    match column {
        TableColumn::Group => SortKey::Text(record.group()),
        TableColumn::Entity => SortKey::Text(record.entity()),
        // Ordinal attributes hold their rank, so they sort by rank
        TableColumn::Attribute(id) => number(record.value(id)),
        TableColumn::Cluster => number(record.cluster().map(f64::from)),
        TableColumn::WeightedScore => number(record.weighted_score()),
    }
}

/// Compare two records on one column; missing values sort last either way
pub fn compare_rows(a: &EntityRecord, b: &EntityRecord, spec: &SortSpec) -> Ordering {
    let ordered = |o: Ordering| if spec.is_descending() { o.reverse() } else { o };
    match (sort_key(a, &spec.column), sort_key(b, &spec.column)) {
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => Ordering::Greater,
        (_, SortKey::Missing) => Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => ordered(x.total_cmp(&y)),
        (SortKey::Text(x), SortKey::Text(y)) => ordered(x.cmp(y)),
        (SortKey::Number(_), SortKey::Text(_)) => ordered(Ordering::Less),
        (SortKey::Text(_), SortKey::Number(_)) => ordered(Ordering::Greater),
    }
}

/// Filter, sort and paginate `records`
pub fn query_rows<'a>(records: &[&'a EntityRecord], query: &TableQuery<'_>) -> TablePage<'a> {
    let mut rows = filter_rows(records, query.search, query.brushes);
    if let Some(spec) = query.sort {
        rows.sort_by(|a, b| compare_rows(a, b, spec));
    }

    let total_rows = rows.len();
    let p = calculate_pagination(total_rows, query.page, query.page_size);
    let rows = rows
        .into_iter()
        .skip(p.offset)
        .take(query.page_size.max(1))
        .collect();

    TablePage {
        rows,
        page: p.page,
        total_pages: p.total_pages,
        total_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_records() -> Vec<EntityRecord> {
        vec![
            EntityRecord::new("groupA", "E1")
                .with_value("attr1", Some(2.0))
                .with_value("attr2", Some(4.0)),
            EntityRecord::new("groupA", "E2")
                .with_value("attr1", Some(4.0))
                .with_value("attr2", Some(2.0)),
        ]
    }

    fn query<'a>(brushes: &'a BTreeMap<String, BrushRange>, search: &'a str, sort: Option<&'a SortSpec>) -> TableQuery<'a> {
        TableQuery {
            search,
            brushes,
            sort,
            page: 1,
            page_size: 10,
        }
    }

    fn entities(page: &TablePage<'_>) -> Vec<String> {
        page.rows.iter().map(|r| r.entity().to_string()).collect()
    }

    #[test]
    fn test_search_e1_returns_one_row() {
        let recs = two_records();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let none = BTreeMap::new();
        let page = query_rows(&rows, &query(&none, "e1", None));
        assert_eq!(entities(&page), vec!["E1"]);
    }

    #[test]
    fn test_search_matches_group_label() {
        let recs = two_records();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let none = BTreeMap::new();
        assert_eq!(query_rows(&rows, &query(&none, "  GROUPa ", None)).total_rows, 2);
    }

    #[test]
    fn test_brush_wide_keeps_both() {
        let recs = two_records();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let mut brushes = BTreeMap::new();
        brushes.insert("attr1".to_string(), BrushRange::new(1.5, 4.5).unwrap());
        assert_eq!(query_rows(&rows, &query(&brushes, "", None)).total_rows, 2);
    }

    #[test]
    fn test_brush_narrow_excludes_e2() {
        let recs = two_records();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let mut brushes = BTreeMap::new();
        brushes.insert("attr1".to_string(), BrushRange::new(1.5, 3.0).unwrap());
        assert_eq!(entities(&query_rows(&rows, &query(&brushes, "", None))), vec!["E1"]);
    }

    #[test]
    fn test_brushes_are_anded() {
        let recs = two_records();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let mut brushes = BTreeMap::new();
        brushes.insert("attr1".to_string(), BrushRange::new(1.0, 5.0).unwrap());
        brushes.insert("attr2".to_string(), BrushRange::new(3.0, 5.0).unwrap());
        assert_eq!(entities(&query_rows(&rows, &query(&brushes, "", None))), vec!["E1"]);
    }

    #[test]
    fn test_null_value_fails_brush() {
        let rec = EntityRecord::new("g", "e").with_value("a", None);
        let mut brushes = BTreeMap::new();
        brushes.insert("a".to_string(), BrushRange::new(0.0, 10.0).unwrap());
        assert!(!passes_brushes(&rec, &brushes));
    }

    #[test]
    fn test_sort_numeric_and_nulls_last() {
        let recs = vec![
            EntityRecord::new("g", "a").with_value("x", Some(10.0)),
            EntityRecord::new("g", "b").with_value("x", None),
            EntityRecord::new("g", "c").with_value("x", Some(9.0)),
        ];
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let none = BTreeMap::new();

        let asc = SortSpec::after_click(None, TableColumn::Attribute("x".to_string()));
        assert_eq!(entities(&query_rows(&rows, &query(&none, "", Some(&asc)))), vec!["c", "a", "b"]);

        let desc = SortSpec::after_click(Some(&asc), TableColumn::Attribute("x".to_string()));
        assert!(desc.is_descending());
        assert_eq!(entities(&query_rows(&rows, &query(&none, "", Some(&desc)))), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_identity_lexicographic() {
        let recs = vec![
            EntityRecord::new("g", "Valencia"),
            EntityRecord::new("g", "Arsenal"),
            EntityRecord::new("g", "Milan"),
        ];
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let none = BTreeMap::new();
        let spec = SortSpec::after_click(None, TableColumn::Entity);
        assert_eq!(
            entities(&query_rows(&rows, &query(&none, "", Some(&spec)))),
            vec!["Arsenal", "Milan", "Valencia"]
        );
    }

    #[test]
    fn test_new_column_starts_ascending() {
        let desc = SortSpec {
            column: TableColumn::Entity,
            direction: SortDirection::Desc,
        };
        let next = SortSpec::after_click(Some(&desc), TableColumn::Group);
        assert_eq!(next.direction, SortDirection::Asc);
        let back = SortSpec::after_click(Some(&desc), TableColumn::Entity);
        assert_eq!(back.direction, SortDirection::Asc);
    }

    #[test]
    fn test_pagination_clamped() {
        let recs: Vec<EntityRecord> = (0..25).map(|i| EntityRecord::new("g", format!("e{:02}", i))).collect();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let none = BTreeMap::new();
        let mut q = query(&none, "", None);
        q.page = 7;
        let page = query_rows(&rows, &q);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.rows.len(), 5);
    }

    #[test]
    fn test_column_keys() {
        let reg = AttributeRegistry::tactical_profiles();
        assert_eq!(TableColumn::from_key("league_name", &reg), TableColumn::Group);
        assert_eq!(TableColumn::from_key("weightedScore", &reg), TableColumn::WeightedScore);
        assert_eq!(
            TableColumn::from_key("buildUpPlaySpeed", &reg),
            TableColumn::Attribute("buildUpPlaySpeed".to_string())
        );
        assert_eq!(TableColumn::Cluster.key(), "cluster");
    }
}
