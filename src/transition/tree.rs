use serde::{Deserialize, Serialize};

/// Growth limits for [`DecisionTree::fit`].
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        counts: Vec<u32>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART classification tree with Gini impurity.
///
/// Nodes live in a flat arena so serialized artifacts stay shallow
/// regardless of depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_classes: usize,
}

struct Builder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    params: TreeParams,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Fits a tree on `rows` with class indices `labels` (each < `n_classes`).
    pub fn fit(rows: &[Vec<f64>], labels: &[usize], n_classes: usize, params: TreeParams) -> Self {
        let mut builder = Builder {
            rows,
            labels,
            n_classes,
            params,
            nodes: Vec::new(),
        };
        let all: Vec<usize> = (0..rows.len()).collect();
        builder.grow(&all, 0);
        Self {
            nodes: builder.nodes,
            n_classes,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Class distribution of the leaf `row` falls into.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { counts } => {
                    let total: u32 = counts.iter().sum();
                    if total == 0 {
                        return vec![1.0 / self.n_classes as f64; self.n_classes];
                    }
                    return counts.iter().map(|&c| c as f64 / total as f64).collect();
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

impl Builder<'_> {
    fn counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }

    fn grow(&mut self, indices: &[usize], depth: usize) -> usize {
        let counts = self.counts(indices);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            counts: counts.clone(),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= self.params.max_depth || indices.len() < self.params.min_samples_split {
            return id;
        }

        let Some((feature, threshold)) = self.best_split(indices, &counts) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.rows[i][feature] <= threshold);

        let left = self.grow(&left_idx, depth + 1);
        let right = self.grow(&right_idx, depth + 1);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Lowest weighted Gini split; the first candidate wins ties so growth is deterministic.
    fn best_split(&self, indices: &[usize], counts: &[u32]) -> Option<(usize, f64)> {
        let n = indices.len() as f64;
        let parent = gini(counts, indices.len());
        let width = self.rows.first().map_or(0, Vec::len);

        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..width {
            let mut sorted: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.rows[i][feature], self.labels[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0u32; self.n_classes];
            let mut right = counts.to_vec();
            for k in 0..sorted.len() - 1 {
                let (value, label) = sorted[k];
                left[label] += 1;
                right[label] -= 1;
                let next = sorted[k + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = k + 1;
                let n_right = sorted.len() - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n;
                if best.is_none_or(|(_, _, b)| impurity < b - 1e-12) {
                    best = Some((feature, (value + next) / 2.0, impurity));
                }
            }
        }

        best.filter(|&(_, _, impurity)| impurity < parent - 1e-12)
            .map(|(feature, threshold, _)| (feature, threshold))
    }
}

fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}
