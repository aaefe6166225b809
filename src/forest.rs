use std::collections::HashMap;

use anyhow::{Result, anyhow};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::preprocessor::EncodedRow;

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_trees: usize,
    /// `None` grows every tree until its leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Candidate features per split; `None` means `sqrt(width)`.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict_proba(&self, row: &EncodedRow) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row.value(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[idx] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}

/// Bagged CART trees with Gini splits; predictions average the leaf
/// class distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
    pub n_classes: usize,
    /// Mean decrease in impurity per encoded feature, summing to 1.
    pub importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(
        rows: &[EncodedRow],
        labels: &[usize],
        n_classes: usize,
        width: usize,
        params: ForestParams,
    ) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(anyhow!(
                "forest fit needs matching non-empty rows and labels ({} vs {})",
                rows.len(),
                labels.len()
            ));
        }
        if n_classes == 0 || params.n_trees == 0 {
            return Err(anyhow!("forest fit needs at least one class and one tree"));
        }
        if let Some(&bad) = labels.iter().find(|&&y| y >= n_classes) {
            return Err(anyhow!("label index {bad} out of range for {n_classes} classes"));
        }

        let grower = TreeGrower {
            rows,
            labels,
            n_classes,
            width,
            numeric_width: rows[0].dense.len(),
            max_features: params
                .max_features
                .unwrap_or_else(|| (width as f64).sqrt().floor() as usize)
                .clamp(1, width.max(1)),
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
        };

        let grown: Vec<(DecisionTree, Vec<f64>)> = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                grower.grow(&mut rng)
            })
            .collect();

        let mut importances = vec![0.0; width];
        let mut trees = Vec::with_capacity(grown.len());
        for (tree, imp) in grown {
            let total: f64 = imp.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&imp) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        let max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0);
        info!(
            "random forest: {} trees, max depth {max_depth}",
            trees.len()
        );
        Ok(Self {
            trees,
            n_classes,
            importances,
        })
    }

    pub fn predict_proba(&self, row: &EncodedRow) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.predict_proba(row)) {
                *a += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        acc.iter_mut().for_each(|v| *v /= n);
        acc
    }
}

struct TreeGrower<'a> {
    rows: &'a [EncodedRow],
    labels: &'a [usize],
    n_classes: usize,
    width: usize,
    numeric_width: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

struct Pending {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    /// Count-weighted Gini of the two children.
    child_impurity: f64,
}

impl TreeGrower<'_> {
    fn grow(&self, rng: &mut StdRng) -> (DecisionTree, Vec<f64>) {
        let n = self.rows.len();
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut importances = vec![0.0; self.width];
        let mut stack = vec![Pending {
            node: 0,
            samples: bootstrap,
            depth: 0,
        }];

        while let Some(Pending {
            node,
            samples,
            depth,
        }) = stack.pop()
        {
            let counts = self.class_counts(&samples);
            let m = samples.len() as f64;
            let node_impurity = weighted_gini(&counts);

            let depth_ok = self.max_depth.is_none_or(|max| depth < max);
            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let split = if depth_ok && !pure && samples.len() >= self.min_samples_split {
                self.best_split(&samples, rng)
            } else {
                None
            };

            let Some(split) = split.filter(|s| s.child_impurity < node_impurity) else {
                nodes[node] = Node::Leaf {
                    distribution: counts.iter().map(|&c| c as f64 / m).collect(),
                };
                continue;
            };

            importances[split.feature] += node_impurity - split.child_impurity;

            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .partition(|&&s| self.rows[s].value(split.feature) <= split.threshold);
            let left_id = nodes.len();
            let right_id = left_id + 1;
            nodes.push(Node::Leaf {
                distribution: Vec::new(),
            });
            nodes.push(Node::Leaf {
                distribution: Vec::new(),
            });
            nodes[node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_id,
                right: right_id,
            };
            stack.push(Pending {
                node: right_id,
                samples: right,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left_id,
                samples: left,
                depth: depth + 1,
            });
        }

        (DecisionTree { nodes }, importances)
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &s in samples {
            counts[self.labels[s]] += 1;
        }
        counts
    }

    /// Draws candidate features without replacement until `max_features`
    /// non-constant ones have been examined.
    fn best_split(&self, samples: &[usize], rng: &mut StdRng) -> Option<Candidate> {
        // Per-class counts of rows where each one-hot feature is set.
        let mut ones: HashMap<usize, Vec<usize>> = HashMap::new();
        for &s in samples {
            for &j in &self.rows[s].active {
                ones.entry(j).or_insert_with(|| vec![0; self.n_classes])[self.labels[s]] += 1;
            }
        }
        let total = self.class_counts(samples);
        let m = samples.len();

        let mut binary: Vec<usize> = ones
            .iter()
            .filter(|(_, c)| {
                let set: usize = c.iter().sum();
                set > 0 && set < m
            })
            .map(|(&j, _)| j)
            .collect();
        binary.sort_unstable();
        let mut features: Vec<usize> = (0..self.numeric_width).collect();
        features.extend(binary);

        let mut best: Option<Candidate> = None;
        let mut examined = 0usize;
        for i in 0..features.len() {
            if examined >= self.max_features {
                break;
            }
            let pick = rng.gen_range(i..features.len());
            features.swap(i, pick);
            let feature = features[i];

            let found = if feature < self.numeric_width {
                self.numeric_split(feature, samples, &total)
            } else {
                ones.get(&feature)
                    .map(|set| binary_split(feature, set, &total))
            };
            let Some(candidate) = found else {
                continue;
            };
            examined += 1;
            if best.is_none_or(|b| candidate.child_impurity < b.child_impurity) {
                best = Some(candidate);
            }
        }
        best
    }

    fn numeric_split(
        &self,
        feature: usize,
        samples: &[usize],
        total: &[usize],
    ) -> Option<Candidate> {
        let mut values: Vec<(f64, usize)> = samples
            .iter()
            .map(|&s| (self.rows[s].dense[feature], self.labels[s]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (first, last) = (values.first()?.0, values.last()?.0);
        if first == last {
            return None;
        }

        let mut left = vec![0usize; self.n_classes];
        let mut right = total.to_vec();
        let mut best: Option<Candidate> = None;
        for i in 0..values.len() - 1 {
            let (v, y) = values[i];
            left[y] += 1;
            right[y] -= 1;
            let next = values[i + 1].0;
            if next <= v {
                continue;
            }
            let impurity = weighted_gini(&left) + weighted_gini(&right);
            if best.is_none_or(|b| impurity < b.child_impurity) {
                best = Some(Candidate {
                    feature,
                    threshold: v + (next - v) / 2.0,
                    child_impurity: impurity,
                });
            }
        }
        best
    }
}

fn binary_split(feature: usize, set: &[usize], total: &[usize]) -> Candidate {
    let unset: Vec<usize> = total.iter().zip(set).map(|(t, s)| t - s).collect();
    Candidate {
        feature,
        threshold: 0.5,
        child_impurity: weighted_gini(&unset) + weighted_gini(set),
    }
}

/// `n * gini`, which keeps child impurities additive.
fn weighted_gini(counts: &[usize]) -> f64 {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64).powi(2)).sum();
    n - sum_sq / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: f64, flag: bool) -> EncodedRow {
        EncodedRow {
            dense: vec![x],
            active: if flag { vec![1] } else { vec![2] },
        }
    }

    /// Class is decided by the sign of x alone; the flag is noise.
    fn threshold_data() -> (Vec<EncodedRow>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let x = i as f64 - 30.0;
            rows.push(row(x, i % 3 == 0));
            labels.push(usize::from(x >= 0.0));
        }
        (rows, labels)
    }

    #[test]
    fn gini_of_pure_and_mixed_nodes() {
        assert_eq!(weighted_gini(&[5, 0, 0]), 0.0);
        assert!((weighted_gini(&[2, 2]) - 2.0).abs() < 1e-12);
        assert_eq!(weighted_gini(&[]), 0.0);
    }

    #[test]
    fn separates_on_informative_feature() {
        let (rows, labels) = threshold_data();
        let params = ForestParams {
            n_trees: 15,
            max_features: Some(3),
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &labels, 2, 3, params).unwrap();
        let p_neg = forest.predict_proba(&row(-20.0, true));
        let p_pos = forest.predict_proba(&row(20.0, false));
        assert!(p_neg[0] > 0.9, "{p_neg:?}");
        assert!(p_pos[1] > 0.9, "{p_pos:?}");
        assert!((forest.importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(forest.importances[0] > forest.importances[1]);
    }

    #[test]
    fn same_seed_same_forest() {
        let (rows, labels) = threshold_data();
        let params = ForestParams {
            n_trees: 8,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&rows, &labels, 2, 3, params).unwrap();
        let b = RandomForest::fit(&rows, &labels, 2, 3, params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn depth_limit_is_respected() {
        let (rows, labels) = threshold_data();
        let params = ForestParams {
            n_trees: 4,
            max_depth: Some(1),
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &labels, 2, 3, params).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 1));
    }

    #[test]
    fn single_class_gives_single_leaf() {
        let rows: Vec<EncodedRow> = (0..10).map(|i| row(i as f64, false)).collect();
        let labels = vec![0; 10];
        let forest = RandomForest::fit(&rows, &labels, 1, 3, ForestParams {
            n_trees: 2,
            ..ForestParams::default()
        })
        .unwrap();
        assert!(forest.trees.iter().all(|t| t.nodes.len() == 1));
        assert_eq!(forest.predict_proba(&row(3.0, true)), vec![1.0]);
        assert!(forest.importances.iter().all(|&v| v == 0.0));
    }
}
