use crate::{
    image::ImageNormalizer,
    models::ModelManager,
    prediction::{PredictionAggregator, PredictionEntry},
    Result,
};
use std::time::Instant;

/// 预测流水线：图像字节进，排序后的预测结果出
pub struct PredictionPipeline {
    normalizer: ImageNormalizer,
    aggregator: PredictionAggregator,
}

impl PredictionPipeline {
    pub fn new(normalizer: ImageNormalizer, aggregator: PredictionAggregator) -> Self {
        Self {
            normalizer,
            aggregator,
        }
    }

    pub fn from_manager(manager: &ModelManager) -> Self {
        let config = manager.config();
        let normalizer = ImageNormalizer::from_config(config);
        let aggregator = PredictionAggregator::new(
            manager.backend(),
            manager.catalog(),
            &config.classifier_config,
        );
        Self::new(normalizer, aggregator)
    }

    /// 解码、归一化并分类一张上传图像
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Vec<PredictionEntry>> {
        let start_time = Instant::now();

        let tensor = self.normalizer.normalize(bytes)?;
        let preprocessing_time = start_time.elapsed();

        let predictions = self.aggregator.aggregate(&tensor)?;

        tracing::info!(
            "Prediction completed: kept={}, top={:?}, preprocess={:.3}s, total={:.3}s",
            predictions.len(),
            predictions.first().map(|p| p.class_name.as_str()),
            preprocessing_time.as_secs_f32(),
            start_time.elapsed().as_secs_f32()
        );

        Ok(predictions)
    }
}
