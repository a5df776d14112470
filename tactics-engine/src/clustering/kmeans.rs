//! Default k-means collaborator
//!
//! Lloyd iterations over min-max scaled features. Seeding is deterministic
//! (farthest-point), so the same request always yields the same labels.
//! Nulls are imputed with the column mean.

use super::{ClusterLabel, ClusterRequest, ClusteringBackend};

/// Deterministic k-means backend
#[derive(Debug, Clone)]
pub struct KMeans {
    max_iterations: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

impl KMeans {
    /// Create a backend with a custom iteration cap
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Scale each column to [0, 1] and fill nulls with the column mean
fn feature_matrix(request: &ClusterRequest) -> Vec<Vec<f64>> {
    let dims = request.variables.len();
    let mut points = vec![vec![0.0; dims]; request.rows.len()];

    for d in 0..dims {
        let present: Vec<f64> = request
            .rows
            .iter()
            .filter_map(|r| r.values.get(d).copied().flatten())
            .collect();
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        let scale = |v: f64| if span > 0.0 { (v - min) / span } else { 0.0 };
        let mean = if present.is_empty() {
            0.0
        } else {
            present.iter().map(|v| scale(*v)).sum::<f64>() / present.len() as f64
        };

        for (point, row) in points.iter_mut().zip(&request.rows) {
            point[d] = match row.values.get(d).copied().flatten() {
                Some(v) => scale(v),
                None => mean,
            };
        }
    }
    points
}

/// Farthest-point seeding starting from the point nearest the centroid of all points
fn seed(points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let dims = points[0].len();
    let mut mean = vec![0.0; dims];
    for p in points {
        for (m, v) in mean.iter_mut().zip(p) {
            *m += v / points.len() as f64;
        }
    }

    let first = nearest(&mean, points);
    let mut centroids = vec![points[first].clone()];
    while centroids.len() < k {
        let mut far = 0;
        let mut far_dist = -1.0;
        for (i, p) in points.iter().enumerate() {
            let d = centroids
                .iter()
                .map(|c| squared_distance(p, c))
                .fold(f64::INFINITY, f64::min);
            if d > far_dist {
                far = i;
                far_dist = d;
            }
        }
        centroids.push(points[far].clone());
    }
    centroids
}

impl ClusteringBackend for KMeans {
    fn partition(&self, request: &ClusterRequest) -> Vec<ClusterLabel> {
        if request.rows.is_empty() || request.k == 0 {
            return Vec::new();
        }
        let points = feature_matrix(request);
        let k = request.k.min(points.len());
        let mut centroids = seed(&points, k);
        let mut assignment: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();

        for _ in 0..self.max_iterations {
            for (c, centroid) in centroids.iter_mut().enumerate() {
                let members: Vec<&Vec<f64>> = points
                    .iter()
                    .zip(&assignment)
                    .filter(|(_, a)| **a == c)
                    .map(|(p, _)| p)
                    .collect();
                // An emptied cluster keeps its previous centroid
                if members.is_empty() {
                    continue;
                }
                for (d, value) in centroid.iter_mut().enumerate() {
                    *value = members.iter().map(|m| m[d]).sum::<f64>() / members.len() as f64;
                }
            }

            let next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids)).collect();
            if next == assignment {
                break;
            }
            assignment = next;
        }

        request
            .rows
            .iter()
            .zip(assignment)
            .map(|(row, cluster)| ClusterLabel {
                key: row.key.clone(),
                cluster: cluster as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::ClusterRow;
    use crate::identity::EntityKey;

    fn request(values: &[(f64, Option<f64>)], k: usize) -> ClusterRequest {
        ClusterRequest {
            seq: 1,
            k,
            variables: vec!["x".to_string(), "y".to_string()],
            rows: values
                .iter()
                .enumerate()
                .map(|(i, (x, y))| ClusterRow {
                    key: EntityKey::new("g", format!("e{}", i)),
                    values: vec![Some(*x), *y],
                })
                .collect(),
        }
    }

    #[test]
    fn test_two_obvious_groups() {
        let req = request(
            &[(0.0, Some(0.0)), (0.1, Some(0.1)), (10.0, Some(10.0)), (10.1, Some(10.1))],
            2,
        );
        let labels = KMeans::default().partition(&req);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0].cluster, labels[1].cluster);
        assert_eq!(labels[2].cluster, labels[3].cluster);
        assert_ne!(labels[0].cluster, labels[2].cluster);
    }

    #[test]
    fn test_deterministic() {
        let req = request(&[(1.0, Some(5.0)), (2.0, None), (8.0, Some(1.0)), (9.0, Some(2.0))], 2);
        let a = KMeans::default().partition(&req);
        let b = KMeans::default().partition(&req);
        assert_eq!(a, b);
    }

    #[test]
    fn test_k_larger_than_rows_is_capped() {
        let req = request(&[(1.0, Some(1.0)), (2.0, Some(2.0))], 5);
        let labels = KMeans::default().partition(&req);
        assert!(labels.iter().all(|l| l.cluster < 2));
    }

    #[test]
    fn test_respond_carries_sequence() {
        let mut req = request(&[(1.0, Some(1.0))], 1);
        req.seq = 42;
        assert_eq!(KMeans::default().respond(&req).seq, 42);
    }
}
