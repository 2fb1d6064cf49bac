use crate::models::{ClassCatalog, InferenceBackend, OnnxModel};
use crate::{Config, Result};
use std::sync::Arc;

/// 模型管理器，持有已加载的模型和类别目录
///
/// 启动时构建一次，通过应用状态交给处理器，构建后不再修改
#[derive(Clone)]
pub struct ModelManager {
    backend: Arc<dyn InferenceBackend>,
    catalog: Arc<ClassCatalog>,
    config: Config,
}

impl ModelManager {
    /// 按配置加载ONNX模型和类别目录
    pub fn load(config: &Config) -> Result<Self> {
        tracing::info!("Initializing model manager...");

        let catalog = ClassCatalog::load_or_builtin(&config.labels_path())?;
        let backend = OnnxModel::new(config)?;

        tracing::info!(
            "Model manager initialized: {} classes, input {}x{}",
            catalog.len(),
            config.classifier_config.input_width,
            config.classifier_config.input_height
        );

        Ok(Self::with_backend(config.clone(), Arc::new(backend), catalog))
    }

    /// 包装已构建的推理后端
    pub fn with_backend(
        config: Config,
        backend: Arc<dyn InferenceBackend>,
        catalog: ClassCatalog,
    ) -> Self {
        Self {
            backend,
            catalog: Arc::new(catalog),
            config,
        }
    }

    pub fn backend(&self) -> Arc<dyn InferenceBackend> {
        Arc::clone(&self.backend)
    }

    pub fn catalog(&self) -> Arc<ClassCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 模型在启动时加载，构建成功的管理器总是健康的
    pub fn health_check(&self) -> Result<()> {
        tracing::debug!("Model health check passed: {}", self.backend.describe());
        Ok(())
    }

    pub fn get_stats(&self) -> ModelStats {
        let classifier = &self.config.classifier_config;
        ModelStats {
            backend: self.backend.describe(),
            classes: self.catalog.names().to_vec(),
            input_size: [classifier.input_width, classifier.input_height],
            min_confidence: classifier.min_confidence,
            perturbations: classifier.perturbations.clone(),
            enhance: classifier.enhance,
            intra_threads: self.config.onnx_config.intra_threads,
            optimization_level: self.config.onnx_config.optimization_level,
        }
    }
}

/// `/api/info`返回的模型信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelStats {
    pub backend: String,
    pub classes: Vec<String>,
    pub input_size: [u32; 2],
    pub min_confidence: f64,
    pub perturbations: Vec<f32>,
    pub enhance: bool,
    pub intra_threads: usize,
    pub optimization_level: i32,
}
