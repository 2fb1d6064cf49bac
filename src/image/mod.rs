pub mod loader;
pub mod normalizer;
pub mod preprocessing;

pub use loader::ImageLoader;
pub use normalizer::{ImageNormalizer, ImageTensor};
pub use preprocessing::ImagePreprocessor;
