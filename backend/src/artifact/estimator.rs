use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use serde::Deserialize;

/// Node id marking "no child" in the flat tree layout.
const LEAF: i64 = -1;

/// Per-row probability model. `out` has one slot per class, in the order of
/// the pipeline's `classes`.
pub trait Classifier {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String>;
    fn predict_proba_row(&self, row: ArrayView1<'_, f64>, out: ArrayViewMut1<'_, f64>);
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GaussianNb(GaussianNb),
}

impl Estimator {
    pub fn as_classifier(&self) -> &dyn Classifier {
        match self {
            Estimator::LogisticRegression(model) => model,
            Estimator::DecisionTree(model) => model,
            Estimator::RandomForest(model) => model,
            Estimator::GaussianNb(model) => model,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression(_) => "logistic_regression",
            Estimator::DecisionTree(_) => "decision_tree",
            Estimator::RandomForest(_) => "random_forest",
            Estimator::GaussianNb(_) => "gaussian_nb",
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Writes the softmax of `scores` into `out`, shifted by the max for stability.
/// When the max is infinite the mass is shared evenly by the maximal scores.
fn softmax(scores: &[f64], mut out: ArrayViewMut1<'_, f64>) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let winners = scores.iter().filter(|score| **score == max).count();
    if max.is_infinite() && winners > 0 {
        for (slot, score) in out.iter_mut().zip(scores) {
            *slot = if *score == max { 1.0 / winners as f64 } else { 0.0 };
        }
        return;
    }
    let mut sum = 0.0;
    for (slot, score) in out.iter_mut().zip(scores) {
        *slot = (score - max).exp();
        sum += *slot;
    }
    out /= sum;
}

fn check_width(what: &str, idx: usize, len: usize, n_features: usize) -> Result<(), String> {
    if len != n_features {
        return Err(format!(
            "{} row {} has {} entries, expected {}",
            what, idx, len, n_features
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiClass {
    #[default]
    Multinomial,
    Ovr,
}

/// Linear model. A single coefficient row means a binary problem where the
/// decision value scores the second class.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    multi_class: MultiClass,
}

impl Classifier for LogisticRegression {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        match self.coef.len() {
            0 => return Err("logistic regression has no coefficients".to_string()),
            1 if n_classes != 2 => {
                return Err(format!(
                    "a single coefficient row needs exactly 2 classes, found {}",
                    n_classes
                ));
            }
            1 => {}
            rows if rows != n_classes => {
                return Err(format!(
                    "{} coefficient rows for {} classes",
                    rows, n_classes
                ));
            }
            _ => {}
        }
        for (idx, row) in self.coef.iter().enumerate() {
            check_width("coef", idx, row.len(), n_features)?;
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "{} intercepts for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            ));
        }
        Ok(())
    }

    fn predict_proba_row(&self, row: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        let scores: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(weights, bias)| weights.iter().zip(row.iter()).map(|(w, x)| w * x).sum::<f64>() + bias)
            .collect();

        if let [score] = scores.as_slice() {
            let p = sigmoid(*score);
            out[0] = 1.0 - p;
            out[1] = p;
            return;
        }

        match self.multi_class {
            MultiClass::Multinomial => softmax(&scores, out),
            MultiClass::Ovr => {
                for (slot, score) in out.iter_mut().zip(&scores) {
                    *slot = sigmoid(*score);
                }
                let sum = out.sum();
                if sum > 0.0 {
                    out /= sum;
                }
            }
        }
    }
}

/// Binary tree in flat array form: node `i` splits on `feature[i]` at
/// `threshold[i]`, rows with `x <= threshold` go to `children_left[i]`.
/// `value[i]` holds the per-class weight at node `i`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn leaf(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut node = 0;
        loop {
            let left = self.children_left[node];
            if left == LEAF {
                return node;
            }
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }
}

impl Classifier for DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let nodes = self.children_left.len();
        if nodes == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != nodes
            || self.feature.len() != nodes
            || self.threshold.len() != nodes
            || self.value.len() != nodes
        {
            return Err("tree node arrays differ in length".to_string());
        }

        for node in 0..nodes {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {} has a single child", node));
                }
            } else {
                // Children must come after their parent, which also rules out cycles.
                for child in [left, right] {
                    if child <= node as i64 || child >= nodes as i64 {
                        return Err(format!("node {} points to invalid child {}", node, child));
                    }
                }
                let feature = self.feature[node];
                if feature < 0 || feature >= n_features as i64 {
                    return Err(format!(
                        "node {} splits on feature {} of {}",
                        node, feature, n_features
                    ));
                }
            }
            let weights = &self.value[node];
            if weights.len() != n_classes {
                return Err(format!(
                    "node {} has {} class weights, expected {}",
                    node,
                    weights.len(),
                    n_classes
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!("node {} has a negative or non-finite weight", node));
            }
        }
        Ok(())
    }

    fn predict_proba_row(&self, row: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        let weights = &self.value[self.leaf(row)];
        let total: f64 = weights.iter().sum();
        for (slot, weight) in out.iter_mut().zip(weights) {
            *slot = if total > 0.0 { weight / total } else { 0.0 };
        }
    }
}

/// Mean of the member trees' probabilities.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    estimators: Vec<DecisionTree>,
}

impl Classifier for RandomForest {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.estimators.is_empty() {
            return Err("random forest has no trees".to_string());
        }
        for (idx, tree) in self.estimators.iter().enumerate() {
            tree.validate(n_features, n_classes)
                .map_err(|e| format!("tree {}: {}", idx, e))?;
        }
        Ok(())
    }

    fn predict_proba_row(&self, row: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        out.fill(0.0);
        let mut tree_proba = Array1::<f64>::zeros(out.len());
        for tree in &self.estimators {
            tree.predict_proba_row(row, tree_proba.view_mut());
            out += &tree_proba;
        }
        out /= self.estimators.len() as f64;
    }
}

/// Gaussian naive Bayes with per-class feature means (`theta`) and variances.
#[derive(Debug, Clone, Deserialize)]
pub struct GaussianNb {
    theta: Vec<Vec<f64>>,
    var: Vec<Vec<f64>>,
    class_prior: Vec<f64>,
}

impl Classifier for GaussianNb {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.theta.len() != n_classes
            || self.var.len() != n_classes
            || self.class_prior.len() != n_classes
        {
            return Err(format!(
                "naive Bayes parameters do not cover {} classes",
                n_classes
            ));
        }
        for (idx, (theta, var)) in self.theta.iter().zip(&self.var).enumerate() {
            check_width("theta", idx, theta.len(), n_features)?;
            check_width("var", idx, var.len(), n_features)?;
            if var.iter().any(|v| !(*v > 0.0)) {
                return Err(format!("var row {} has a non-positive variance", idx));
            }
        }
        if self.class_prior.iter().any(|p| !(*p > 0.0)) {
            return Err("class priors must be positive".to_string());
        }
        Ok(())
    }

    fn predict_proba_row(&self, row: ArrayView1<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        let joint_log_likelihood: Vec<f64> = self
            .theta
            .iter()
            .zip(&self.var)
            .zip(&self.class_prior)
            .map(|((theta, var), prior)| {
                let mut jll = prior.ln();
                for ((x, mean), variance) in row.iter().zip(theta).zip(var) {
                    jll -= 0.5 * (2.0 * std::f64::consts::PI * variance).ln();
                    jll -= 0.5 * (x - mean).powi(2) / variance;
                }
                jll
            })
            .collect();
        softmax(&joint_log_likelihood, out);
    }
}
