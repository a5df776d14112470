//! Pairwise Pearson correlation matrix
//!
//! Each pair uses only the rows where both attributes are non-null
//! (pairwise-complete observations). A pair with no complete observation or
//! zero variance on either side is degenerate and valued 0. The diagonal is
//! forced to 1 and every entry is clamped to [-1, 1]. Only the upper
//! triangle is computed; the lower triangle is mirrored from it.

use crate::record::EntityRecord;
use crate::Error;
use serde::Serialize;

/// Symmetric correlation matrix indexed by an attribute list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    attributes: Vec<String>,
    values: Vec<Vec<f64>>,
    degenerate: Vec<(String, String)>,
}

impl CorrelationMatrix {
    /// Attribute ids indexing rows and columns
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Row-major values
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Matrix dimension
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when computed over no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Entry at (row, column)
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(column)).copied()
    }

    /// Entry for two attribute ids
    pub fn between(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.attributes.iter().position(|a| a == first)?;
        let j = self.attributes.iter().position(|a| a == second)?;
        self.get(i, j)
    }

    /// Pairs that were valued 0 because they were degenerate
    pub fn degenerate_pairs(&self) -> &[(String, String)] {
        &self.degenerate
    }

    /// Degenerate pairs as `DegenerateCorrelation` diagnostics
    pub fn diagnostics(&self) -> Vec<Error> {
        self.degenerate
            .iter()
            .map(|(first, second)| Error::DegenerateCorrelation {
                first: first.clone(),
                second: second.clone(),
            })
            .collect()
    }
}

/// Pearson correlation over pairwise-complete observations
///
/// Returns `None` for a degenerate pair (no complete observation, or zero
/// variance in either variable).
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut num = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    let denom = (denom_x * denom_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(num / denom)
}

/// Compute the matrix for `attribute_ids` over `rows`
pub fn compute_correlation_matrix(rows: &[&EntityRecord], attribute_ids: &[String]) -> CorrelationMatrix {
    let n = attribute_ids.len();
    let columns: Vec<Vec<Option<f64>>> = attribute_ids
        .iter()
        .map(|id| rows.iter().map(|r| r.value(id)).collect())
        .collect();

    let mut values = vec![vec![0.0; n]; n];
    let mut degenerate = Vec::new();
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = match pearson(&columns[i], &columns[j]) {
                Some(r) => r.clamp(-1.0, 1.0),
                None => {
                    degenerate.push((attribute_ids[i].clone(), attribute_ids[j].clone()));
                    0.0
                }
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        attributes: attribute_ids.to_vec(),
        values,
        degenerate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(columns: &[(&str, &[Option<f64>])]) -> Vec<EntityRecord> {
        let len = columns[0].1.len();
        (0..len)
            .map(|i| {
                columns.iter().fold(
                    EntityRecord::new("g", format!("e{}", i)),
                    |rec, (id, vals)| rec.with_value(id, vals[i]),
                )
            })
            .collect()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let recs = records(&[
            ("attr1", &[Some(1.0), Some(2.0), Some(3.0)]),
            ("attr2", &[Some(3.0), Some(2.0), Some(1.0)]),
        ]);
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let m = compute_correlation_matrix(&rows, &ids(&["attr1", "attr2"]));
        let r = m.between("attr1", "attr2").unwrap();
        assert!((r + 1.0).abs() < 1e-9, "expected -1, got {}", r);
    }

    #[test]
    fn test_symmetric_unit_diagonal_bounded() {
        let recs = records(&[
            ("a", &[Some(1.0), Some(5.0), Some(2.0), None, Some(7.0)]),
            ("b", &[Some(2.0), Some(1.0), None, Some(4.0), Some(3.0)]),
            ("c", &[Some(9.0), Some(9.0), Some(9.0), Some(9.0), Some(9.0)]),
            ("d", &[None, None, None, None, None]),
        ]);
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let m = compute_correlation_matrix(&rows, &ids(&["a", "b", "c", "d"]));
        for i in 0..m.len() {
            assert_eq!(m.get(i, i), Some(1.0));
            for j in 0..m.len() {
                let v = m.get(i, j).unwrap();
                assert_eq!(v, m.get(j, i).unwrap());
                assert!((-1.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_zero_variance_is_degenerate_zero() {
        let recs = records(&[
            ("a", &[Some(1.0), Some(2.0), Some(3.0)]),
            ("flat", &[Some(5.0), Some(5.0), Some(5.0)]),
        ]);
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        let m = compute_correlation_matrix(&rows, &ids(&["a", "flat"]));
        assert_eq!(m.between("a", "flat"), Some(0.0));
        assert_eq!(m.between("flat", "flat"), Some(1.0));
        assert_eq!(m.degenerate_pairs().len(), 1);
        assert!(matches!(m.diagnostics()[0], Error::DegenerateCorrelation { .. }));
    }

    #[test]
    fn test_pairwise_not_listwise() {
        // Row 2 is missing b only; it still counts for (a, c)
        let xs = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let ys = [Some(2.0), Some(4.0), None, Some(8.0)];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_complete_pairs_is_degenerate() {
        assert_eq!(pearson(&[Some(1.0), None], &[None, Some(2.0)]), None);
        assert_eq!(pearson(&[], &[]), None);
    }

    #[test]
    fn test_empty_row_set() {
        let m = compute_correlation_matrix(&[], &ids(&["a", "b"]));
        assert_eq!(m.get(0, 0), Some(1.0));
        assert_eq!(m.get(0, 1), Some(0.0));
    }
}
