//! Risk classification backed by a pre-trained model artifact.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use overuse_core::{AnalysisError, FallbackPolicy, RiskTier};
use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, FEATURE_COLUMNS};

/// Seam for trained classifiers.
pub trait RiskModel: Send + Sync {
    /// Class labels, in the order `predict_proba` reports them.
    fn classes(&self) -> &[String];

    /// Probability of each class for one feature row.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, AnalysisError>;

    /// Most probable label and its probability. Ties go to the first class.
    fn predict(&self, features: &[f64]) -> Result<(String, f64), AnalysisError> {
        let proba = self.predict_proba(features)?;
        let (idx, confidence) = proba
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (idx, p)| match best {
                Some((_, top)) if top >= p => best,
                _ => Some((idx, p)),
            })
            .ok_or_else(|| AnalysisError::Inference("modelo sem classes".to_string()))?;
        let label = self
            .classes()
            .get(idx)
            .cloned()
            .ok_or_else(|| AnalysisError::Inference(format!("classe {idx} inexistente")))?;
        Ok((label, confidence))
    }
}

/// Node of a serialized decision tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Goes to `left` when `x[feature] <= threshold`, else to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class weights (counts or fractions) at this leaf.
    Leaf { value: Vec<f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf_for(&self, features: &[f64]) -> Result<&[f64], AnalysisError> {
        let mut idx = 0;
        // a valid tree reaches a leaf in at most `nodes.len()` steps
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx).ok_or_else(|| {
                AnalysisError::Inference(format!("nó {idx} inexistente"))
            })?;
            match node {
                TreeNode::Leaf { value } => return Ok(value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        AnalysisError::Inference(format!("feature {feature} inexistente"))
                    })?;
                    idx = if x <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
        Err(AnalysisError::Inference(
            "árvore de decisão sem folha alcançável".to_string(),
        ))
    }
}

/// Random-forest artifact: averaged per-tree class distributions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForestModel {
    pub classes: Vec<String>,
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn from_json_str(data: &str) -> Result<Self, AnalysisError> {
        let model: ForestModel =
            serde_json::from_str(data).map_err(|err| AnalysisError::ModelArtifact(err.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|err| {
            AnalysisError::ModelArtifact(format!("{}: {err}", path.display()))
        })?;
        let model = Self::from_json_str(&data)?;
        tracing::info!(
            path = %path.display(),
            trees = model.trees.len(),
            classes = model.classes.len(),
            "risk model loaded"
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.feature_names.len() != FEATURE_COLUMNS.len()
            || self
                .feature_names
                .iter()
                .zip(FEATURE_COLUMNS.iter())
                .any(|(found, expected)| found != expected)
        {
            return Err(AnalysisError::SchemaMismatch {
                expected: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found: self.feature_names.clone(),
            });
        }
        if self.classes.is_empty() {
            return Err(AnalysisError::ModelArtifact("lista de classes vazia".into()));
        }
        if self.trees.is_empty() {
            return Err(AnalysisError::ModelArtifact("nenhuma árvore".into()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(AnalysisError::ModelArtifact(format!("árvore {t} vazia")));
            }
            for (n, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= FEATURE_COLUMNS.len()
                            || *left >= tree.nodes.len()
                            || *right >= tree.nodes.len()
                        {
                            return Err(AnalysisError::ModelArtifact(format!(
                                "árvore {t}, nó {n}: índice fora do intervalo"
                            )));
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(AnalysisError::ModelArtifact(format!(
                                "árvore {t}, nó {n}: folha com {} valores para {} classes",
                                value.len(),
                                self.classes.len()
                            )));
                        }
                        if !leaf_weights_usable(value) {
                            return Err(AnalysisError::ModelArtifact(format!(
                                "árvore {t}, nó {n}: folha sem peso positivo"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Leaf weights must be finite, non-negative and not all zero.
fn leaf_weights_usable(value: &[f64]) -> bool {
    value.iter().all(|w| w.is_finite() && *w >= 0.0) && value.iter().sum::<f64>() > 0.0
}

impl RiskModel for ForestModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, AnalysisError> {
        if features.len() != self.feature_names.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "esperadas {} features, recebidas {}",
                self.feature_names.len(),
                features.len()
            )));
        }

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_for(features)?;
            if !leaf_weights_usable(leaf) {
                return Err(AnalysisError::Inference(
                    "folha sem peso positivo".to_string(),
                ));
            }
            let weight: f64 = leaf.iter().sum();
            for (total, value) in totals.iter_mut().zip(leaf) {
                *total += value / weight;
            }
        }

        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }
}

static SHARED_MODEL: OnceLock<(PathBuf, Arc<ForestModel>)> = OnceLock::new();

/// Loads the artifact once per process and hands out the same instance.
///
/// The first successful load wins; later calls with another path get the
/// already-loaded model.
pub fn load_shared(path: impl AsRef<Path>) -> Result<Arc<ForestModel>, AnalysisError> {
    let path = path.as_ref();
    if let Some((loaded_from, model)) = SHARED_MODEL.get() {
        if loaded_from != path {
            tracing::warn!(
                requested = %path.display(),
                loaded = %loaded_from.display(),
                "risk model already loaded from another path"
            );
        }
        return Ok(Arc::clone(model));
    }

    let model = Arc::new(ForestModel::load(path)?);
    let (_, shared) = SHARED_MODEL.get_or_init(|| (path.to_path_buf(), model));
    Ok(Arc::clone(shared))
}

/// Outcome of a classification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub tier: RiskTier,
    /// Probability of the predicted class; `None` for the heuristic.
    pub confidence: Option<f64>,
    pub model_used: bool,
}

/// Label from completed-visit count alone.
pub fn heuristic_tier(done: u32) -> RiskTier {
    match done {
        n if n >= 10 => RiskTier::ExcessiveUse,
        n if n >= 5 => RiskTier::ModerateUseTrendingExcessive,
        n if n >= 3 => RiskTier::ModerateUse,
        _ => RiskTier::NoRisk,
    }
}

/// Wraps the shared model and the fallback policy.
#[derive(Clone)]
pub struct RiskClassifier {
    model: Option<Arc<dyn RiskModel>>,
    fallback: FallbackPolicy,
}

impl std::fmt::Debug for RiskClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskClassifier")
            .field("model_loaded", &self.model.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl RiskClassifier {
    pub fn new(model: Option<Arc<dyn RiskModel>>, fallback: FallbackPolicy) -> Self {
        Self { model, fallback }
    }

    pub fn with_model(model: Arc<dyn RiskModel>) -> Self {
        Self::new(Some(model), FallbackPolicy::RequireModel)
    }

    /// Classifier that only ever runs the count heuristic.
    pub fn heuristic_only() -> Self {
        Self::new(None, FallbackPolicy::Heuristic)
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, AnalysisError> {
        let Some(model) = &self.model else {
            return match self.fallback {
                FallbackPolicy::RequireModel => {
                    let err = AnalysisError::model_missing();
                    tracing::error!("{err}");
                    Err(err)
                }
                FallbackPolicy::Heuristic => {
                    let done = features.get(FEATURE_COLUMNS[0]) as u32;
                    tracing::warn!(done, "no trained model, using visit-count heuristic");
                    Ok(Classification {
                        tier: heuristic_tier(done),
                        confidence: None,
                        model_used: false,
                    })
                }
            };
        };

        let (label, confidence) = model.predict(features.as_slice())?;
        tracing::debug!(prediction = %label, confidence, "model prediction");
        Ok(Classification {
            tier: RiskTier::from(label),
            confidence: Some(confidence),
            model_used: true,
        })
    }
}
