use crate::models::InferenceBackend;
use crate::utils::error::ClassifierError;
use crate::config::OnnxConfig;
use crate::{Config, Result};
use ndarray::ArrayView4;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// 基于ONNX Runtime会话的图像分类模型
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,  // 加载时从模型读取
    output_name: String, // 加载时从模型读取
    model_path: PathBuf,
}

impl OnnxModel {
    pub fn new(config: &Config) -> Result<Self> {
        Self::load(&config.model_path(), &config.onnx_config)
    }

    pub fn load(model_path: &Path, onnx_config: &OnnxConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Classification model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()?
            .with_optimization_level(optimization_level(onnx_config.optimization_level))?
            .with_intra_threads(onnx_config.intra_threads)?
            .commit_from_file(model_path)?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no inputs".to_string(),
                ))
            }
        };

        let output_name = match session.outputs.first() {
            Some(output) => output.name.clone(),
            None => {
                return Err(ClassifierError::ModelLoad(
                    "Classification model has no outputs".to_string(),
                ))
            }
        };

        tracing::info!(
            "Classification model input: '{}', output: '{}'",
            input_name,
            output_name
        );
        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Classification output[{}]: '{}'", i, output.name);
        }

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            model_path: model_path.to_path_buf(),
        })
    }
}

fn optimization_level(level: i32) -> GraphOptimizationLevel {
    match level {
        i32::MIN..=0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

impl InferenceBackend for OnnxModel {
    fn infer(&self, tensor: ArrayView4<'_, f32>) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(tensor.to_owned())?;

        let scores = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(&self.output_name) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(ClassifierError::Inference(format!(
                        "Classification output '{}' not found. Available outputs: {:?}",
                        self.output_name, available_outputs
                    )));
                }
            }
        };

        // 输出形状为(1, N)或(N)
        let shape = scores.shape().to_vec();
        let batch = if shape.len() > 1 { shape[0] } else { 1 };
        if batch != 1 {
            return Err(ClassifierError::Inference(format!(
                "Expected batch size 1 for classification, got output shape {:?}",
                shape
            )));
        }

        Ok(scores.iter().copied().collect())
    }

    fn describe(&self) -> String {
        format!("onnx:{}", self.model_path.display())
    }
}
