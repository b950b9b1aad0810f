use crate::config::{ClusterConfig, NoisePolicy};
use crate::error::Result;
use crate::types::{Figure, FragmentArena, FragmentId};

/// Figures produced for one page
#[derive(Debug, Clone)]
pub struct Clustering {
    pub figures: Vec<Figure>,
    /// Dense clusters found
    pub cluster_count: usize,
    /// Fragments not density-reachable from any core point
    pub noise_count: usize,
    /// Figures built from noise fragments
    pub noise_figures: usize,
}

/// Groups a page's graphic fragments into figures with DBSCAN over each
/// fragment's bottom-left corner.
pub struct SpatialClusteringRule<'a> {
    config: &'a ClusterConfig,
}

impl<'a> SpatialClusteringRule<'a> {
    pub fn new(config: &'a ClusterConfig) -> Self {
        Self { config }
    }

    /// Every fragment in the arena ends up in exactly one returned figure.
    pub fn apply(&self, arena: &FragmentArena) -> Result<Clustering> {
        self.config.validate()?;

        if arena.is_empty() {
            return Ok(Clustering {
                figures: Vec::new(),
                cluster_count: 0,
                noise_count: 0,
                noise_figures: 0,
            });
        }

        let points: Vec<(f64, f64)> = arena.iter().map(|(_, f)| f.bbox.bottom_left()).collect();
        let labels = dbscan_labels(&points, self.config.eps, self.config.min_samples);

        let cluster_count = labels.iter().flatten().max().map_or(0, |max| max + 1);
        let mut groups: Vec<Vec<FragmentId>> = vec![Vec::new(); cluster_count];
        let mut noise: Vec<FragmentId> = Vec::new();

        for (id, label) in arena.ids().zip(&labels) {
            match label {
                Some(cluster) => groups[*cluster].push(id),
                None => noise.push(id),
            }
        }

        let noise_count = noise.len();
        let mut figures = Vec::with_capacity(cluster_count + noise_count);
        for group in groups {
            figures.push(Figure::from_fragments(arena, group)?);
        }

        let noise_figures = match self.config.noise_policy {
            NoisePolicy::Singleton => {
                for id in noise {
                    figures.push(Figure::from_fragments(arena, vec![id])?);
                }
                noise_count
            }
            NoisePolicy::Merged if noise.is_empty() => 0,
            NoisePolicy::Merged => {
                figures.push(Figure::from_fragments(arena, noise)?);
                1
            }
        };

        log::debug!(
            "clustered {} fragments into {} clusters + {} noise ({} figures)",
            arena.len(),
            cluster_count,
            noise_count,
            figures.len()
        );

        Ok(Clustering {
            figures,
            cluster_count,
            noise_count,
            noise_figures,
        })
    }
}

/// Convenience wrapper around [`SpatialClusteringRule`]
pub fn cluster_fragments(arena: &FragmentArena, config: &ClusterConfig) -> Result<Clustering> {
    SpatialClusteringRule::new(config).apply(arena)
}

/// DBSCAN cluster labels for a set of points; `None` marks noise.
///
/// A point is core when at least `min_samples` points (itself included) lie
/// within Euclidean distance `eps`. Clusters are numbered in scan order and a
/// border point reachable from several clusters joins the first one that
/// reaches it.
pub fn dbscan_labels(points: &[(f64, f64)], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let eps_sq = eps * eps;
    let neighborhoods: Vec<Vec<usize>> = points
        .iter()
        .map(|&(px, py)| {
            points
                .iter()
                .enumerate()
                .filter(|(_, q)| {
                    let (dx, dy) = (px - q.0, py - q.1);
                    dx * dx + dy * dy <= eps_sq
                })
                .map(|(index, _)| index)
                .collect()
        })
        .collect();

    let is_core: Vec<bool> = neighborhoods.iter().map(|n| n.len() >= min_samples).collect();
    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut next_label = 0;

    for seed in 0..points.len() {
        if labels[seed].is_some() || !is_core[seed] {
            continue;
        }

        let label = next_label;
        next_label += 1;
        labels[seed] = Some(label);

        let mut stack = vec![seed];
        while let Some(point) = stack.pop() {
            for &neighbor in &neighborhoods[point] {
                if labels[neighbor].is_some() {
                    continue;
                }
                labels[neighbor] = Some(label);
                if is_core[neighbor] {
                    stack.push(neighbor);
                }
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, GraphicFragment};
    use std::collections::BTreeSet;

    fn arena(boxes: &[(f64, f64, f64, f64)]) -> FragmentArena {
        FragmentArena::new(
            boxes
                .iter()
                .map(|&(x0, y0, x1, y1)| GraphicFragment {
                    bbox: BoundingBox::new(x0, y0, x1, y1),
                })
                .collect(),
        )
    }

    fn owned_ids(clustering: &Clustering) -> Vec<usize> {
        let mut ids: Vec<usize> = clustering
            .figures
            .iter()
            .flat_map(|f| f.fragments().iter().map(|id| id.index()))
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_two_close_fragments_and_one_outlier() {
        let arena = arena(&[
            (0.0, 0.0, 10.0, 10.0),
            (5.0, 5.0, 15.0, 15.0),
            (200.0, 200.0, 210.0, 210.0),
        ]);
        let config = ClusterConfig::new(20.0, 2);
        let clustering = cluster_fragments(&arena, &config).unwrap();

        assert_eq!(clustering.figures.len(), 2);
        assert_eq!(clustering.cluster_count, 1);
        assert_eq!(clustering.noise_count, 1);
        assert_eq!(clustering.figures[0].bbox(), BoundingBox::new(0.0, 0.0, 15.0, 15.0));
        assert_eq!(
            clustering.figures[1].bbox(),
            BoundingBox::new(200.0, 200.0, 210.0, 210.0)
        );
    }

    #[test]
    fn test_singleton_noise_keeps_distant_outliers_apart() {
        let arena = arena(&[
            (0.0, 0.0, 5.0, 5.0),
            (300.0, 0.0, 305.0, 5.0),
            (0.0, 500.0, 5.0, 505.0),
        ]);
        let config = ClusterConfig::new(10.0, 2);
        let clustering = cluster_fragments(&arena, &config).unwrap();
        assert_eq!(clustering.cluster_count, 0);
        assert_eq!(clustering.figures.len(), 3);
        assert_eq!(clustering.noise_figures, 3);
    }

    #[test]
    fn test_merged_noise_policy_envelopes_all_outliers() {
        let arena = arena(&[
            (0.0, 0.0, 5.0, 5.0),
            (300.0, 0.0, 305.0, 5.0),
            (0.0, 500.0, 5.0, 505.0),
        ]);
        let config = ClusterConfig {
            eps: 10.0,
            min_samples: 2,
            noise_policy: NoisePolicy::Merged,
        };
        let clustering = cluster_fragments(&arena, &config).unwrap();
        assert_eq!(clustering.figures.len(), 1);
        assert_eq!(clustering.noise_figures, 1);
        assert_eq!(clustering.figures[0].bbox(), BoundingBox::new(0.0, 0.0, 305.0, 505.0));
    }

    #[test]
    fn test_every_fragment_owned_exactly_once() {
        let arena = arena(&[
            (0.0, 0.0, 1.0, 1.0),
            (3.0, 0.0, 4.0, 1.0),
            (6.0, 0.0, 7.0, 1.0),
            (100.0, 100.0, 101.0, 101.0),
            (103.0, 100.0, 104.0, 101.0),
            (400.0, 0.0, 401.0, 1.0),
            (0.0, 3.0, 1.0, 4.0),
        ]);
        for policy in [NoisePolicy::Singleton, NoisePolicy::Merged] {
            for min_samples in 1..=4 {
                let config = ClusterConfig {
                    eps: 3.5,
                    min_samples,
                    noise_policy: policy,
                };
                let clustering = cluster_fragments(&arena, &config).unwrap();
                assert_eq!(owned_ids(&clustering), (0..arena.len()).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_chain_connects_through_core_points() {
        // Each point is within eps of the next, so the chain forms one cluster
        let points: Vec<(f64, f64)> = (0..6).map(|i| (i as f64 * 4.0, 0.0)).collect();
        let labels = dbscan_labels(&points, 5.0, 2);
        let distinct: BTreeSet<_> = labels.iter().collect();
        assert_eq!(distinct.len(), 1);
        assert!(labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn test_border_point_is_not_expanded() {
        // 0,1,2 are dense; 3 only touches 2 and is a border point; 4 is
        // reachable from 3 only, so it stays noise.
        let points = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (4.5, 0.0), (7.5, 0.0)];
        let labels = dbscan_labels(&points, 2.6, 3);
        assert_eq!(labels, vec![Some(0), Some(0), Some(0), Some(0), None]);
    }

    #[test]
    fn test_min_samples_one_makes_every_point_core() {
        let points = vec![(0.0, 0.0), (100.0, 0.0)];
        assert_eq!(dbscan_labels(&points, 1.0, 1), vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_empty_arena_yields_no_figures() {
        let clustering =
            cluster_fragments(&FragmentArena::default(), &ClusterConfig::new(5.0, 2)).unwrap();
        assert!(clustering.figures.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let arena = arena(&[(0.0, 0.0, 1.0, 1.0)]);
        assert!(cluster_fragments(&arena, &ClusterConfig::new(-1.0, 2)).is_err());
        assert!(cluster_fragments(&arena, &ClusterConfig::new(1.0, 0)).is_err());
    }
}
