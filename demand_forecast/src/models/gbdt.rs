//! Gradient-boosted decision trees for demand regression
//!
//! Histogram-based training with leaf-wise growth: residuals are binned
//! per feature, each split is chosen greedily by regularized gain, and the
//! two categorical columns are partitioned by explicit code subsets rather
//! than one-hot expansion. Training is deterministic for a fixed seed.

use crate::error::{ForecastError, Result};
use crate::models::GbdtDataset;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Smallest gain worth splitting on
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Guard against a runaway categorical code sneaking into training data
const MAX_CATEGORICAL_CARDINALITY: usize = 1_000_000;

/// Training parameters for the boosted ensemble.
///
/// The defaults mirror the production configuration: a very high
/// iteration cap paired with a small learning rate, relying on early
/// stopping against a validation window to pick the actual size.
#[derive(Debug, Clone)]
pub struct GbdtParams {
    /// Upper bound on boosting iterations
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf value
    pub learning_rate: f64,
    /// Maximum leaves per tree
    pub num_leaves: usize,
    /// Maximum tree height
    pub max_depth: usize,
    /// Minimum training rows in each child of a split
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) per iteration
    pub subsample: f64,
    /// Fraction of features drawn per tree
    pub colsample: f64,
    /// L1 leaf-weight regularization
    pub lambda_l1: f64,
    /// L2 leaf-weight regularization
    pub lambda_l2: f64,
    /// Stop after this many iterations without validation improvement
    pub early_stopping_rounds: usize,
    /// Maximum histogram bins per numeric feature
    pub max_bins: usize,
    /// Seed for row and feature sampling
    pub seed: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        GbdtParams {
            n_estimators: 10_000,
            learning_rate: 0.01,
            num_leaves: 50,
            max_depth: 12,
            min_samples_leaf: 15,
            subsample: 0.8,
            colsample: 0.8,
            lambda_l1: 0.1,
            lambda_l2: 0.1,
            early_stopping_rounds: 200,
            max_bins: 255,
            seed: 42,
        }
    }
}

impl GbdtParams {
    /// Check the parameters for values that cannot train a model
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be positive".to_string(),
            ));
        }
        if self.num_leaves < 2 {
            return Err(ForecastError::InvalidParameter(
                "num_leaves must be at least 2".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "subsample must be in (0, 1]".to_string(),
            ));
        }
        if !(self.colsample > 0.0 && self.colsample <= 1.0) {
            return Err(ForecastError::InvalidParameter(
                "colsample must be in (0, 1]".to_string(),
            ));
        }
        if self.lambda_l1 < 0.0 || self.lambda_l2 < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "regularization terms must be non-negative".to_string(),
            ));
        }
        if self.early_stopping_rounds == 0 {
            return Err(ForecastError::InvalidParameter(
                "early_stopping_rounds must be at least 1".to_string(),
            ));
        }
        if self.max_bins < 2 {
            return Err(ForecastError::InvalidParameter(
                "max_bins must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Routing test stored in a split node
#[derive(Debug, Clone, Serialize, Deserialize)]
enum SplitCondition {
    /// Go left when the value is at most the threshold
    LessEq(f64),
    /// Go left when the category code is in the ascending set
    InSet(Vec<u32>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        condition: SplitCondition,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// One regression tree as a flat node array with index links
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Leaf value for one row-major feature vector
    fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    condition,
                    left,
                    right,
                } => {
                    let value = row[*feature];
                    let go_left = match condition {
                        SplitCondition::LessEq(threshold) => value <= *threshold,
                        SplitCondition::InSet(set) => {
                            set.binary_search(&(value as u32)).is_ok()
                        }
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }

    /// Leaf value for row `i` of a column-major matrix
    fn predict_at(&self, columns: &[Vec<f64>], i: usize) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    condition,
                    left,
                    right,
                } => {
                    let value = columns[*feature][i];
                    let go_left = match condition {
                        SplitCondition::LessEq(threshold) => value <= *threshold,
                        SplitCondition::InSet(set) => {
                            set.binary_search(&(value as u32)).is_ok()
                        }
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }
}

/// A trained boosted ensemble: base score plus shrunken leaf values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    base_score: f64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    best_iteration: usize,
    best_validation_rmse: Option<f64>,
}

impl GbdtModel {
    /// Predict one feature vector. The vector length must match the
    /// feature count the model was trained on.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(ForecastError::SchemaError(format!(
                "model expects {} feature values, got {}",
                self.n_features,
                row.len()
            )));
        }
        let mut value = self.base_score;
        for tree in &self.trees {
            value += tree.predict_row(row);
        }
        Ok(value)
    }

    /// Number of trees kept after training
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature count the model was trained on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Iteration the kept ensemble corresponds to
    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    /// Best validation RMSE seen, when a validation set was supplied
    pub fn best_validation_rmse(&self) -> Option<f64> {
        self.best_validation_rmse
    }
}

/// Configurable trainer for `GbdtModel`
#[derive(Debug, Clone)]
pub struct GbdtRegressor {
    params: GbdtParams,
}

impl GbdtRegressor {
    /// Create a trainer with the given parameters
    pub fn new(params: GbdtParams) -> Self {
        GbdtRegressor { params }
    }

    /// The trainer's parameters
    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Fit the ensemble. With a validation set, training stops once RMSE
    /// fails to improve for `early_stopping_rounds` iterations and the
    /// model is truncated to its best iteration; without one, it runs to
    /// the iteration cap.
    pub fn fit(&self, train: &GbdtDataset, validation: Option<&GbdtDataset>) -> Result<GbdtModel> {
        self.params.validate()?;
        train.validate()?;
        if let Some(val) = validation {
            val.validate()?;
            if val.n_features() != train.n_features() {
                return Err(ForecastError::SchemaError(format!(
                    "validation set has {} features, training set has {}",
                    val.n_features(),
                    train.n_features()
                )));
            }
        }

        let n = train.n_rows();
        let n_features = train.n_features();
        let base_score = train.targets.iter().sum::<f64>() / n as f64;

        let (bins, binned) = bin_dataset(train, self.params.max_bins)?;

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut predictions = vec![base_score; n];
        let mut residuals = vec![0.0; n];
        let mut val_predictions = validation.map(|v| vec![base_score; v.n_rows()]);

        let row_sample = ((n as f64 * self.params.subsample).round() as usize).clamp(1, n);
        let feature_sample =
            ((n_features as f64 * self.params.colsample) as usize).clamp(1, n_features);
        let mut all_rows: Vec<u32> = (0..n as u32).collect();
        let mut all_features: Vec<usize> = (0..n_features).collect();

        let mut trees: Vec<DecisionTree> = Vec::new();
        let mut best_iteration = 0;
        let mut best_rmse = f64::INFINITY;
        let mut stalled_rounds = 0;

        for _ in 0..self.params.n_estimators {
            for i in 0..n {
                residuals[i] = train.targets[i] - predictions[i];
            }

            let rows = if row_sample < n {
                all_rows.shuffle(&mut rng);
                let mut sampled = all_rows[..row_sample].to_vec();
                sampled.sort_unstable();
                sampled
            } else {
                all_rows.clone()
            };
            let features = if feature_sample < n_features {
                all_features.shuffle(&mut rng);
                let mut sampled = all_features[..feature_sample].to_vec();
                sampled.sort_unstable();
                sampled
            } else {
                all_features.clone()
            };

            let tree = grow_tree(&binned, &bins, &residuals, rows, &features, &self.params);

            for i in 0..n {
                predictions[i] += tree.predict_at(&train.columns, i);
            }
            if let (Some(val), Some(val_preds)) = (validation, val_predictions.as_mut()) {
                for i in 0..val.n_rows() {
                    val_preds[i] += tree.predict_at(&val.columns, i);
                }
            }

            trees.push(tree);

            if let (Some(val), Some(val_preds)) = (validation, val_predictions.as_ref()) {
                let rmse = rmse_of(&val.targets, val_preds);
                if rmse < best_rmse {
                    best_rmse = rmse;
                    best_iteration = trees.len();
                    stalled_rounds = 0;
                } else {
                    stalled_rounds += 1;
                    if stalled_rounds >= self.params.early_stopping_rounds {
                        break;
                    }
                }
            }
        }

        let best_validation_rmse = if validation.is_some() {
            trees.truncate(best_iteration);
            Some(best_rmse)
        } else {
            best_iteration = trees.len();
            None
        };

        Ok(GbdtModel {
            base_score,
            trees,
            n_features,
            best_iteration,
            best_validation_rmse,
        })
    }
}

/// Histogram layout for one feature
enum FeatureBins {
    /// Ascending upper edges; bin b holds values v with v <= edges[b]
    Numeric { edges: Vec<f64> },
    /// Category codes used directly as bin indices
    Categorical { n_categories: usize },
}

impl FeatureBins {
    fn n_bins(&self) -> usize {
        match self {
            FeatureBins::Numeric { edges } => edges.len(),
            FeatureBins::Categorical { n_categories } => *n_categories,
        }
    }
}

/// Bin every feature column. Numeric edges are actual data values, so bin
/// routing and threshold routing agree exactly on training rows.
fn bin_dataset(data: &GbdtDataset, max_bins: usize) -> Result<(Vec<FeatureBins>, Vec<Vec<u32>>)> {
    let n_features = data.n_features();
    let mut bins = Vec::with_capacity(n_features);
    let mut binned = Vec::with_capacity(n_features);

    for f in 0..n_features {
        let column = &data.columns[f];
        if data.categorical.contains(&f) {
            let mut max_code: u32 = 0;
            for &value in column {
                let code = value as u32;
                if code as usize >= MAX_CATEGORICAL_CARDINALITY {
                    return Err(ForecastError::ConfigError(format!(
                        "categorical feature {} has code {} beyond the supported cardinality",
                        f, code
                    )));
                }
                max_code = max_code.max(code);
            }
            bins.push(FeatureBins::Categorical {
                n_categories: max_code as usize + 1,
            });
            binned.push(column.iter().map(|&v| v as u32).collect());
        } else {
            let edges = numeric_edges(column, max_bins);
            let mapped = column
                .iter()
                .map(|&v| bin_index(&edges, v) as u32)
                .collect();
            bins.push(FeatureBins::Numeric { edges });
            binned.push(mapped);
        }
    }

    Ok((bins, binned))
}

/// Upper bin edges for a numeric column: all unique values when few
/// enough, otherwise evenly spaced quantiles keeping the maximum
fn numeric_edges(column: &[f64], max_bins: usize) -> Vec<f64> {
    let mut sorted = column.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted.dedup();

    if sorted.len() <= max_bins {
        return sorted;
    }

    let mut edges = Vec::with_capacity(max_bins);
    for b in 1..=max_bins {
        edges.push(sorted[b * sorted.len() / max_bins - 1]);
    }
    edges.dedup();
    edges
}

/// Index of the first edge at or above the value
fn bin_index(edges: &[f64], value: f64) -> usize {
    edges
        .partition_point(|&edge| edge < value)
        .min(edges.len().saturating_sub(1))
}

#[derive(Debug, Clone, Copy)]
struct NodeStats {
    sum: f64,
    count: usize,
}

/// How a chosen split partitions the binned training rows
enum SplitRule {
    /// Left when bin index is at most `cut`; the model stores `threshold`
    Numeric { cut: u32, threshold: f64 },
    /// Left when the code is in the ascending set
    Categorical { left_set: Vec<u32> },
}

struct CandidateSplit {
    feature: usize,
    gain: f64,
    rule: SplitRule,
    left: NodeStats,
    right: NodeStats,
}

struct LeafState {
    node: usize,
    rows: Vec<u32>,
    depth: usize,
    stats: NodeStats,
    split: Option<CandidateSplit>,
}

/// Grow one tree leaf-wise until the leaf budget, depth cap, or gain
/// floor stops it
fn grow_tree(
    binned: &[Vec<u32>],
    bins: &[FeatureBins],
    residuals: &[f64],
    rows: Vec<u32>,
    features: &[usize],
    params: &GbdtParams,
) -> DecisionTree {
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let stats = stats_of(&rows, residuals);
    let mut root = LeafState {
        node: 0,
        rows,
        depth: 0,
        stats,
        split: None,
    };
    root.split = best_split(&root, binned, bins, residuals, features, params);

    let mut leaves = vec![root];
    let mut n_leaves = 1;

    while n_leaves < params.num_leaves {
        let mut chosen: Option<usize> = None;
        let mut chosen_gain = 0.0;
        for (i, leaf) in leaves.iter().enumerate() {
            if let Some(split) = &leaf.split {
                if chosen.is_none() || split.gain > chosen_gain {
                    chosen = Some(i);
                    chosen_gain = split.gain;
                }
            }
        }
        let index = match chosen {
            Some(i) => i,
            None => break,
        };

        let leaf = leaves.swap_remove(index);
        let split = match leaf.split {
            Some(split) => split,
            None => break,
        };

        let column = &binned[split.feature];
        let (left_rows, right_rows): (Vec<u32>, Vec<u32>) =
            leaf.rows.iter().copied().partition(|&r| match &split.rule {
                SplitRule::Numeric { cut, .. } => column[r as usize] <= *cut,
                SplitRule::Categorical { left_set } => {
                    left_set.binary_search(&column[r as usize]).is_ok()
                }
            });

        let condition = match &split.rule {
            SplitRule::Numeric { threshold, .. } => SplitCondition::LessEq(*threshold),
            SplitRule::Categorical { left_set } => SplitCondition::InSet(left_set.clone()),
        };
        let left_node = nodes.len();
        nodes.push(Node::Leaf { value: 0.0 });
        let right_node = nodes.len();
        nodes.push(Node::Leaf { value: 0.0 });
        nodes[leaf.node] = Node::Split {
            feature: split.feature,
            condition,
            left: left_node,
            right: right_node,
        };
        n_leaves += 1;

        let mut left_leaf = LeafState {
            node: left_node,
            rows: left_rows,
            depth: leaf.depth + 1,
            stats: split.left,
            split: None,
        };
        let mut right_leaf = LeafState {
            node: right_node,
            rows: right_rows,
            depth: leaf.depth + 1,
            stats: split.right,
            split: None,
        };
        if n_leaves < params.num_leaves {
            if left_leaf.depth < params.max_depth {
                left_leaf.split = best_split(&left_leaf, binned, bins, residuals, features, params);
            }
            if right_leaf.depth < params.max_depth {
                right_leaf.split =
                    best_split(&right_leaf, binned, bins, residuals, features, params);
            }
        }
        leaves.push(left_leaf);
        leaves.push(right_leaf);
    }

    for leaf in &leaves {
        let value = params.learning_rate * leaf_weight(leaf.stats, params);
        nodes[leaf.node] = Node::Leaf { value };
    }

    DecisionTree { nodes }
}

fn stats_of(rows: &[u32], residuals: &[f64]) -> NodeStats {
    let mut sum = 0.0;
    for &r in rows {
        sum += residuals[r as usize];
    }
    NodeStats {
        sum,
        count: rows.len(),
    }
}

/// Regularized leaf weight: L1 soft-thresholded residual sum over the
/// L2-padded count
fn leaf_weight(stats: NodeStats, params: &GbdtParams) -> f64 {
    soft_threshold(stats.sum, params.lambda_l1) / (stats.count as f64 + params.lambda_l2)
}

fn soft_threshold(value: f64, alpha: f64) -> f64 {
    if value > alpha {
        value - alpha
    } else if value < -alpha {
        value + alpha
    } else {
        0.0
    }
}

/// Structure score of a node; gains compare children against the parent
fn split_score(sum: f64, count: f64, params: &GbdtParams) -> f64 {
    let t = soft_threshold(sum, params.lambda_l1);
    t * t / (count + params.lambda_l2)
}

/// Best split across the sampled features, if any clears the gain floor
fn best_split(
    leaf: &LeafState,
    binned: &[Vec<u32>],
    bins: &[FeatureBins],
    residuals: &[f64],
    features: &[usize],
    params: &GbdtParams,
) -> Option<CandidateSplit> {
    if leaf.rows.len() < 2 * params.min_samples_leaf {
        return None;
    }
    let parent_score = split_score(leaf.stats.sum, leaf.stats.count as f64, params);

    let mut best: Option<CandidateSplit> = None;
    for &feature in features {
        let n_bins = bins[feature].n_bins();
        if n_bins < 2 {
            continue;
        }

        let mut hist: Vec<(f64, usize)> = vec![(0.0, 0); n_bins];
        let column = &binned[feature];
        for &r in &leaf.rows {
            let b = column[r as usize] as usize;
            hist[b].0 += residuals[r as usize];
            hist[b].1 += 1;
        }

        let candidate = match &bins[feature] {
            FeatureBins::Numeric { edges } => {
                best_numeric_cut(feature, &hist, edges, leaf.stats, parent_score, params)
            }
            FeatureBins::Categorical { .. } => {
                best_categorical_subset(feature, &hist, leaf.stats, parent_score, params)
            }
        };

        if let Some(candidate) = candidate {
            let better = match &best {
                None => true,
                Some(current) => candidate.gain > current.gain,
            };
            if better {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Scan cumulative bins left to right for the best threshold cut
fn best_numeric_cut(
    feature: usize,
    hist: &[(f64, usize)],
    edges: &[f64],
    total: NodeStats,
    parent_score: f64,
    params: &GbdtParams,
) -> Option<CandidateSplit> {
    let mut left_sum = 0.0;
    let mut left_count = 0;
    let mut best: Option<CandidateSplit> = None;

    for cut in 0..hist.len() - 1 {
        left_sum += hist[cut].0;
        left_count += hist[cut].1;
        let right_count = total.count - left_count;
        if left_count < params.min_samples_leaf {
            continue;
        }
        if right_count < params.min_samples_leaf {
            break;
        }
        let right_sum = total.sum - left_sum;
        let gain = 0.5
            * (split_score(left_sum, left_count as f64, params)
                + split_score(right_sum, right_count as f64, params)
                - parent_score);
        let better = gain > MIN_SPLIT_GAIN
            && match &best {
                None => true,
                Some(current) => gain > current.gain,
            };
        if better {
            best = Some(CandidateSplit {
                feature,
                gain,
                rule: SplitRule::Numeric {
                    cut: cut as u32,
                    threshold: edges[cut],
                },
                left: NodeStats {
                    sum: left_sum,
                    count: left_count,
                },
                right: NodeStats {
                    sum: right_sum,
                    count: right_count,
                },
            });
        }
    }
    best
}

/// Order the node's categories by mean residual and scan prefixes for the
/// best subset partition
fn best_categorical_subset(
    feature: usize,
    hist: &[(f64, usize)],
    total: NodeStats,
    parent_score: f64,
    params: &GbdtParams,
) -> Option<CandidateSplit> {
    let mut present: Vec<(u32, f64, usize)> = hist
        .iter()
        .enumerate()
        .filter(|(_, h)| h.1 > 0)
        .map(|(code, h)| (code as u32, h.0, h.1))
        .collect();
    if present.len() < 2 {
        return None;
    }
    present.sort_by(|a, b| {
        let mean_a = a.1 / a.2 as f64;
        let mean_b = b.1 / b.2 as f64;
        mean_a
            .partial_cmp(&mean_b)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut left_sum = 0.0;
    let mut left_count = 0;
    let mut best_gain = 0.0;
    let mut best_prefix = 0;
    let mut best_left = NodeStats { sum: 0.0, count: 0 };

    for k in 0..present.len() - 1 {
        left_sum += present[k].1;
        left_count += present[k].2;
        let right_count = total.count - left_count;
        if left_count < params.min_samples_leaf {
            continue;
        }
        if right_count < params.min_samples_leaf {
            break;
        }
        let right_sum = total.sum - left_sum;
        let gain = 0.5
            * (split_score(left_sum, left_count as f64, params)
                + split_score(right_sum, right_count as f64, params)
                - parent_score);
        if gain > MIN_SPLIT_GAIN && (best_prefix == 0 || gain > best_gain) {
            best_gain = gain;
            best_prefix = k + 1;
            best_left = NodeStats {
                sum: left_sum,
                count: left_count,
            };
        }
    }

    if best_prefix == 0 {
        return None;
    }
    let mut left_set: Vec<u32> = present[..best_prefix].iter().map(|p| p.0).collect();
    left_set.sort_unstable();

    Some(CandidateSplit {
        feature,
        gain: best_gain,
        rule: SplitRule::Categorical { left_set },
        left: best_left,
        right: NodeStats {
            sum: total.sum - best_left.sum,
            count: total.count - best_left.count,
        },
    })
}

fn rmse_of(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    (sse / n).sqrt()
}
