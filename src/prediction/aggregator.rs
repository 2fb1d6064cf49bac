use crate::config::ClassifierConfig;
use crate::image::ImageTensor;
use crate::models::{ClassCatalog, InferenceBackend};
use crate::prediction::PredictionEntry;
use crate::utils::error::ClassifierError;
use crate::Result;
use std::borrow::Cow;
use std::sync::Arc;

/// 亮度扰动集成预测
///
/// 每个扰动系数运行一次模型，原始分数取平均后做softmax，
/// 按`min_confidence`（百分比）过滤，再把保留类别缩放到总和为100。
pub struct PredictionAggregator {
    backend: Arc<dyn InferenceBackend>,
    catalog: Arc<ClassCatalog>,
    input_size: (u32, u32),
    min_confidence: f64,
    perturbations: Vec<f32>,
}

impl PredictionAggregator {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        catalog: Arc<ClassCatalog>,
        config: &ClassifierConfig,
    ) -> Self {
        Self {
            backend,
            catalog,
            input_size: config.input_size(),
            min_confidence: config.min_confidence,
            perturbations: config.perturbations.clone(),
        }
    }

    pub fn perturbations(&self) -> &[f32] {
        &self.perturbations
    }

    /// 对一张归一化图像给出排序、过滤并重新归一化的预测
    ///
    /// 结果为空表示没有类别达到`min_confidence`
    pub fn aggregate(&self, tensor: &ImageTensor) -> Result<Vec<PredictionEntry>> {
        self.validate(tensor)?;

        let combined = self.ensemble_scores(tensor)?;
        let probabilities = softmax(&combined);

        Ok(rank(&self.catalog, &probabilities, self.min_confidence))
    }

    /// 调用模型前检查张量形状和取值范围
    fn validate(&self, tensor: &ImageTensor) -> Result<()> {
        let (width, height) = self.input_size;
        let expected = [1, height as usize, width as usize, 3];
        if tensor.shape() != expected {
            return Err(ClassifierError::Validation(format!(
                "Expected tensor shape {:?}, got {:?}",
                expected,
                tensor.shape()
            )));
        }

        if let Some(bad) = tensor
            .iter()
            .find(|v| !v.is_finite() || !(0.0..=1.0).contains(*v))
        {
            return Err(ClassifierError::Validation(format!(
                "Tensor value {} outside [0, 1]",
                bad
            )));
        }

        Ok(())
    }

    /// 所有扰动推理结果的逐元素平均
    fn ensemble_scores(&self, tensor: &ImageTensor) -> Result<Vec<f64>> {
        let num_classes = self.catalog.len();
        let passes = self.perturbations.len();
        let mut combined = vec![0.0f64; num_classes];

        for (pass, &factor) in self.perturbations.iter().enumerate() {
            let variant = perturb(tensor, factor);

            let scores = self.backend.infer(variant.view()).map_err(|e| {
                ClassifierError::Inference(format!(
                    "pass {}/{} (x{}) failed: {}",
                    pass + 1,
                    passes,
                    factor,
                    e
                ))
            })?;

            if scores.len() != num_classes {
                return Err(ClassifierError::Inference(format!(
                    "Model returned {} scores for {} classes",
                    scores.len(),
                    num_classes
                )));
            }

            if scores.iter().any(|s| !s.is_finite()) {
                return Err(ClassifierError::Inference(format!(
                    "Model returned non-finite scores on pass {}",
                    pass + 1
                )));
            }

            for (acc, score) in combined.iter_mut().zip(&scores) {
                *acc += *score as f64;
            }

            tracing::trace!("Ensemble pass {} (x{}): {:?}", pass + 1, factor, scores);
        }

        let passes = passes as f64;
        combined.iter_mut().for_each(|s| *s /= passes);

        Ok(combined)
    }
}

/// 逐元素乘以`factor`并裁剪到`[0, 1]`
pub fn perturb(tensor: &ImageTensor, factor: f32) -> Cow<'_, ImageTensor> {
    if factor == 1.0 {
        return Cow::Borrowed(tensor);
    }
    Cow::Owned(tensor.mapv(|v| (v * factor).clamp(0.0, 1.0)))
}

/// 数值稳定的softmax
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();

    exps.into_iter().map(|e| e / total).collect()
}

/// 转为百分比、阈值过滤、降序排序（相同时按类别顺序）、缩放到总和100
pub fn rank(
    catalog: &ClassCatalog,
    probabilities: &[f64],
    min_confidence: f64,
) -> Vec<PredictionEntry> {
    let mut kept: Vec<(usize, f64)> = probabilities
        .iter()
        .map(|p| p * 100.0)
        .enumerate()
        .filter(|(_, percent)| *percent >= min_confidence)
        .collect();

    // 稳定排序，相同百分比保持类别顺序
    kept.sort_by(|a, b| b.1.total_cmp(&a.1));

    let total: f64 = kept.iter().map(|(_, percent)| percent).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let scale = 100.0 / total;
    kept.into_iter()
        .filter_map(|(index, percent)| {
            catalog
                .name(index)
                .map(|name| PredictionEntry::new(name, percent * scale))
        })
        .collect()
}
