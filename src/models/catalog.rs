use crate::config::DEFAULT_CLASS_NAMES;
use crate::utils::error::ClassifierError;
use crate::Result;
use std::path::Path;

/// 有序类别名称，下标`i`对应模型输出`i`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCatalog {
    names: Vec<String>,
}

impl ClassCatalog {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(ClassifierError::Config("Class catalog is empty".to_string()));
        }
        Ok(Self { names })
    }

    /// 服装模型训练时使用的类别
    pub fn builtin() -> Self {
        Self {
            names: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 每行一个类别名，跳过空行
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let names = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Self::new(names).map_err(|_| {
            ClassifierError::Config(format!("Labels file {} has no classes", path.display()))
        })
    }

    /// 标签文件存在则读取，否则使用内置类别
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            let catalog = Self::from_file(path)?;
            tracing::info!("Loaded {} classes from {}", catalog.len(), path.display());
            Ok(catalog)
        } else {
            tracing::info!("Labels file {} not found, using built-in classes", path.display());
            Ok(Self::builtin())
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_labels_skipping_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Cat\n\n  Dog  \nBird").unwrap();

        let catalog = ClassCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.names(), &["Cat", "Dog", "Bird"]);
        assert_eq!(catalog.name(1), Some("Dog"));
        assert_eq!(catalog.name(3), None);
    }

    #[test]
    fn falls_back_to_builtin_classes() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ClassCatalog::load_or_builtin(&dir.path().join("labels.txt")).unwrap();
        assert_eq!(catalog, ClassCatalog::builtin());
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.name(0), Some("Bags"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(ClassCatalog::new(Vec::new()).is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ClassCatalog::from_file(file.path()),
            Err(ClassifierError::Config(_))
        ));
    }
}
