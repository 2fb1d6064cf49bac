pub mod backend;
pub mod catalog;
pub mod classifier;
pub mod manager;

pub use backend::InferenceBackend;
pub use catalog::ClassCatalog;
pub use classifier::OnnxModel;
pub use manager::{ModelManager, ModelStats};
