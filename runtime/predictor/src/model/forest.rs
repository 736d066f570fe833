use serde::Deserialize;

use super::{check_input, Classifier, ModelError, ModelLoadError};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Samples with `x[feature] <= threshold` go to `left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights `[negative, positive]` at the leaf.
    Leaf { value: [f64; 2] },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
    pub n_features: usize,
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {i} splits on feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    // Children always follow their parent, so traversal terminates.
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    let bad_weight = value.iter().any(|v| !v.is_finite() || *v < 0.0);
                    if bad_weight || value[0] + value[1] <= 0.0 {
                        return Err(format!("node {i} has invalid leaf weights {value:?}"));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_proba(&self, features: &[f64]) -> [f64; 2] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    return [value[0] / total, value[1] / total];
                }
            }
        }
    }
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        if self.trees.is_empty() {
            return Err(ModelLoadError::Invalid("random forest has no trees".into()));
        }
        if self.n_features == 0 {
            return Err(ModelLoadError::Invalid("random forest has no features".into()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ModelLoadError::Invalid(format!("tree {t}: {e}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
        check_input(features, self.n_features)?;
        let sum = self.trees.iter().fold([0.0, 0.0], |acc, tree| {
            let p = tree.leaf_proba(features);
            [acc[0] + p[0], acc[1] + p[1]]
        });
        let n = self.trees.len() as f64;
        let proba = [sum[0] / n, sum[1] / n];
        if proba.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(ModelError::InvalidOutput(format!(
                "class probabilities {proba:?} out of range"
            )));
        }
        Ok(proba)
    }
}
