//! CART decision trees over the three-feature drying vector.
//!
//! Both learners share one greedy grower. Each node sorts its samples per
//! feature and sweeps the candidate thresholds once, keeping running
//! accumulators for the left and right halves, so a level costs
//! O(n log n) per feature. The classifier minimises weighted Gini impurity,
//! the regressor minimises the sum of squared errors.

use std::collections::BTreeSet;

use drier_traits::{BoxError, Features, MoistureRegressor, StatusClassifier};
use serde::{Deserialize, Serialize};

use crate::Sample;
use crate::error::{ModelError, Result};

const NF: usize = Features::LEN;

/// Splits must improve the parent cost by more than this.
const MIN_GAIN: f64 = 1e-12;

/// Growth limits shared by both learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node<T> {
    Leaf {
        value: T,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node<T>>,
        right: Box<Node<T>>,
    },
}

impl<T> Node<T> {
    fn predict(&self, x: &[f64; NF]) -> &T {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.leaves() + right.leaves(),
        }
    }

    /// A split on a feature index outside the vector would panic at predict
    /// time; deserialized trees are checked with this.
    fn features_in_range(&self) -> bool {
        match self {
            Node::Leaf { .. } => true,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                *feature < NF
                    && !threshold.is_nan()
                    && left.features_in_range()
                    && right.features_in_range()
            }
        }
    }
}

/// Impurity bookkeeping for one learner.
trait Criterion {
    type Target: Copy;
    type Acc: Clone;
    type Leaf;

    fn empty(&self) -> Self::Acc;
    fn add(&self, acc: &mut Self::Acc, y: Self::Target);
    fn remove(&self, acc: &mut Self::Acc, y: Self::Target);
    /// Impurity weighted by sample count.
    fn cost(&self, acc: &Self::Acc) -> f64;
    fn leaf(&self, acc: &Self::Acc) -> Self::Leaf;
}

#[derive(Clone)]
struct SumSq {
    n: usize,
    sum: f64,
    sumsq: f64,
}

struct SquaredError;

impl Criterion for SquaredError {
    type Target = f64;
    type Acc = SumSq;
    type Leaf = f64;

    fn empty(&self) -> SumSq {
        SumSq {
            n: 0,
            sum: 0.0,
            sumsq: 0.0,
        }
    }

    fn add(&self, acc: &mut SumSq, y: f64) {
        acc.n += 1;
        acc.sum += y;
        acc.sumsq += y * y;
    }

    fn remove(&self, acc: &mut SumSq, y: f64) {
        acc.n -= 1;
        acc.sum -= y;
        acc.sumsq -= y * y;
    }

    fn cost(&self, acc: &SumSq) -> f64 {
        if acc.n == 0 {
            return 0.0;
        }
        (acc.sumsq - acc.sum * acc.sum / acc.n as f64).max(0.0)
    }

    fn leaf(&self, acc: &SumSq) -> f64 {
        if acc.n == 0 {
            0.0
        } else {
            acc.sum / acc.n as f64
        }
    }
}

#[derive(Clone)]
struct Counts {
    n: usize,
    per_class: Vec<usize>,
}

struct Gini {
    classes: usize,
}

impl Criterion for Gini {
    type Target = usize;
    type Acc = Counts;
    type Leaf = usize;

    fn empty(&self) -> Counts {
        Counts {
            n: 0,
            per_class: vec![0; self.classes],
        }
    }

    fn add(&self, acc: &mut Counts, y: usize) {
        acc.n += 1;
        acc.per_class[y] += 1;
    }

    fn remove(&self, acc: &mut Counts, y: usize) {
        acc.n -= 1;
        acc.per_class[y] -= 1;
    }

    fn cost(&self, acc: &Counts) -> f64 {
        if acc.n == 0 {
            return 0.0;
        }
        let n = acc.n as f64;
        let sq: f64 = acc.per_class.iter().map(|&c| (c as f64) * (c as f64)).sum();
        n - sq / n
    }

    /// Majority class; ties go to the lowest class index.
    fn leaf(&self, acc: &Counts) -> usize {
        let mut best = 0;
        for (i, &c) in acc.per_class.iter().enumerate() {
            if c > acc.per_class[best] {
                best = i;
            }
        }
        best
    }
}

struct Data<'a, T> {
    xs: &'a [[f64; NF]],
    ys: &'a [T],
}

struct SplitAt {
    feature: usize,
    threshold: f64,
}

/// Threshold strictly between two distinct sorted values, so that
/// `lo <= threshold < hi` holds even when the midpoint rounds up.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi { mid } else { lo }
}

fn sort_by_feature(xs: &[[f64; NF]], idx: &mut [usize], feature: usize) {
    idx.sort_by(|&a, &b| xs[a][feature].total_cmp(&xs[b][feature]));
}

fn best_split<C: Criterion>(
    c: &C,
    data: &Data<'_, C::Target>,
    idx: &mut [usize],
    all: &C::Acc,
    parent_cost: f64,
) -> Option<SplitAt> {
    let n = idx.len();
    let mut best: Option<(f64, SplitAt)> = None;
    for feature in 0..NF {
        sort_by_feature(data.xs, idx, feature);
        let mut left = c.empty();
        let mut right = all.clone();
        for k in 0..n - 1 {
            let y = data.ys[idx[k]];
            c.add(&mut left, y);
            c.remove(&mut right, y);
            let lo = data.xs[idx[k]][feature];
            let hi = data.xs[idx[k + 1]][feature];
            if hi <= lo {
                continue;
            }
            let cost = c.cost(&left) + c.cost(&right);
            if best.as_ref().is_none_or(|(b, _)| cost < *b) {
                best = Some((
                    cost,
                    SplitAt {
                        feature,
                        threshold: midpoint(lo, hi),
                    },
                ));
            }
        }
    }
    best.filter(|(cost, _)| *cost < parent_cost - MIN_GAIN)
        .map(|(_, split)| split)
}

fn grow<C: Criterion>(
    c: &C,
    data: &Data<'_, C::Target>,
    idx: &mut [usize],
    depth: usize,
    params: &TreeParams,
) -> Node<C::Leaf> {
    let mut all = c.empty();
    for &i in idx.iter() {
        c.add(&mut all, data.ys[i]);
    }
    let parent_cost = c.cost(&all);
    if depth >= params.max_depth || idx.len() < params.min_samples_split || parent_cost <= MIN_GAIN
    {
        return Node::Leaf { value: c.leaf(&all) };
    }
    let Some(split) = best_split(c, data, idx, &all, parent_cost) else {
        return Node::Leaf { value: c.leaf(&all) };
    };

    sort_by_feature(data.xs, idx, split.feature);
    let mid = idx.partition_point(|&i| data.xs[i][split.feature] <= split.threshold);
    let (l, r) = idx.split_at_mut(mid);
    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(c, data, l, depth + 1, params)),
        right: Box::new(grow(c, data, r, depth + 1, params)),
    }
}

fn feature_matrix(samples: &[Sample]) -> Result<Vec<[f64; NF]>> {
    if samples.is_empty() {
        return Err(ModelError::NoSamples);
    }
    samples
        .iter()
        .enumerate()
        .map(|(index, s)| {
            let x = s.features.as_array();
            if x.iter().all(|v| v.is_finite()) {
                Ok(x)
            } else {
                Err(ModelError::NonFinite { index })
            }
        })
        .collect()
}

/// Dryness classifier (`status_kering` labels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeClassifier {
    classes: Vec<String>,
    root: Node<usize>,
}

impl TreeClassifier {
    pub fn fit(samples: &[Sample], params: &TreeParams) -> Result<Self> {
        let xs = feature_matrix(samples)?;
        let classes: Vec<String> = samples
            .iter()
            .map(|s| s.status.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let ys: Vec<usize> = samples
            .iter()
            .map(|s| classes.binary_search(&s.status).unwrap_or(0))
            .collect();
        let mut idx: Vec<usize> = (0..samples.len()).collect();
        let gini = Gini {
            classes: classes.len(),
        };
        let root = grow(&gini, &Data { xs: &xs, ys: &ys }, &mut idx, 0, params);
        Ok(Self { classes, root })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn root(&self) -> &Node<usize> {
        &self.root
    }

    pub fn predict(&self, features: &Features) -> &str {
        let class = *self.root.predict(&features.as_array());
        self.classes.get(class).map(String::as_str).unwrap_or_default()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        fn leaves_ok(node: &Node<usize>, classes: usize) -> bool {
            match node {
                Node::Leaf { value } => *value < classes,
                Node::Split { left, right, .. } => {
                    leaves_ok(left, classes) && leaves_ok(right, classes)
                }
            }
        }
        !self.classes.is_empty()
            && self.root.features_in_range()
            && leaves_ok(&self.root, self.classes.len())
    }
}

impl StatusClassifier for TreeClassifier {
    fn classify(&self, features: &Features) -> std::result::Result<String, BoxError> {
        Ok(self.predict(features).to_string())
    }
}

/// Moisture content regressor (percent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRegressor {
    root: Node<f64>,
}

impl TreeRegressor {
    pub fn fit(samples: &[Sample], params: &TreeParams) -> Result<Self> {
        let xs = feature_matrix(samples)?;
        let ys: Vec<f64> = samples.iter().map(|s| s.moisture).collect();
        if let Some(index) = ys.iter().position(|y| !y.is_finite()) {
            return Err(ModelError::NonFinite { index });
        }
        let mut idx: Vec<usize> = (0..samples.len()).collect();
        let root = grow(&SquaredError, &Data { xs: &xs, ys: &ys }, &mut idx, 0, params);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Node<f64> {
        &self.root
    }

    pub fn predict(&self, features: &Features) -> f64 {
        *self.root.predict(&features.as_array())
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.root.features_in_range()
    }
}

impl MoistureRegressor for TreeRegressor {
    fn estimate(&self, features: &Features) -> std::result::Result<f64, BoxError> {
        Ok(self.predict(features))
    }
}
