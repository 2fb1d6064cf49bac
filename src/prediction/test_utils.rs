use crate::models::{ClassCatalog, InferenceBackend};
use crate::utils::error::ClassifierError;
use crate::Result;
use ndarray::ArrayView4;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn catalog(names: &[&str]) -> ClassCatalog {
    ClassCatalog::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
}

/// 每次调用返回相同分数
pub struct FixedBackend {
    scores: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedBackend {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceBackend for FixedBackend {
    fn infer(&self, _tensor: ArrayView4<'_, f32>) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores.clone())
    }
}

/// 每次调用弹出一个预设结果，并记录每次输入的最大值
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Vec<f32>>>>,
    maxima: Mutex<Vec<f32>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<Vec<f32>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            maxima: Mutex::new(Vec::new()),
        }
    }

    pub fn input_maxima(&self) -> Vec<f32> {
        self.maxima.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.maxima.lock().len()
    }
}

impl InferenceBackend for ScriptedBackend {
    fn infer(&self, tensor: ArrayView4<'_, f32>) -> Result<Vec<f32>> {
        let max = tensor.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        self.maxima.lock().push(max);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClassifierError::Inference("script exhausted".to_string())))
    }
}
