pub mod local;

pub use local::{sanitize_filename, LocalFileStorage};

use crate::Result;

/// 保存上传图像并返回存储路径
pub trait FileStorage: Send + Sync {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<String>;
}
