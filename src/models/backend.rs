use crate::Result;
use ndarray::ArrayView4;

/// 推理后端：把一个`(1, H, W, 3)`张量映射为各类别原始分数
///
/// 实现会在请求间共享，必须支持并发调用
pub trait InferenceBackend: Send + Sync {
    fn infer(&self, tensor: ArrayView4<'_, f32>) -> Result<Vec<f32>>;

    /// `/api/info`中显示的简短描述
    fn describe(&self) -> String {
        "custom".to_string()
    }
}
