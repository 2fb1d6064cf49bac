use crate::storage::FileStorage;
use crate::utils::error::ClassifierError;
use crate::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 本地磁盘文件存储
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// 必要时创建`root`目录
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            ClassifierError::Storage(format!(
                "Failed to create upload directory {}: {}",
                root.display(),
                e
            ))
        })?;
        tracing::info!("Upload directory: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 生成`<uuid>_<清理后的文件名>`，同名上传互不覆盖
    pub fn generate_key(filename: &str) -> String {
        let clean = sanitize_filename(filename);
        let id = Uuid::new_v4().simple().to_string();
        if clean.is_empty() {
            id
        } else {
            format!("{}_{}", id, clean)
        }
    }
}

impl FileStorage for LocalFileStorage {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<String> {
        let path = self.root.join(Self::generate_key(filename));

        std::fs::write(&path, bytes).map_err(|e| {
            ClassifierError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;

        tracing::debug!("Stored upload: {} ({} bytes)", path.display(), bytes.len());
        Ok(path.to_string_lossy().into_owned())
    }
}

/// 清理文件名：只保留最后一段路径，以及ASCII字母数字、`.`、`-`、`_`
/// 空白替换为`_`，去掉开头的点和下划线
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}
