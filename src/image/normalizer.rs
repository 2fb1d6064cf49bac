use crate::image::{ImageLoader, ImagePreprocessor};
use crate::utils::error::ClassifierError;
use crate::{Config, Result};
use ::image::imageops::{self, FilterType};
use ::image::DynamicImage;
use ndarray::Array4;

/// 模型输入：`(1, H, W, 3)`，取值`[0, 1]`
pub type ImageTensor = Array4<f32>;

/// 图像归一化器，把上传图像转换为模型需要的固定形状张量
#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    width: u32,
    height: u32,
    filter: FilterType,
    enhance: bool,
    max_size: usize,
}

impl ImageNormalizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::CatmullRom,
            enhance: false,
            max_size: usize::MAX,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let (width, height) = config.classifier_config.input_size();
        Self::new(width, height)
            .with_enhance(config.classifier_config.enhance)
            .with_max_size(config.server_config.max_request_size)
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_enhance(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// 解码并归一化上传的原始字节
    pub fn normalize(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let image = ImageLoader::from_bytes(bytes, self.max_size)?;
        self.normalize_image(image)
    }

    pub fn normalize_image(&self, image: DynamicImage) -> Result<ImageTensor> {
        ImageLoader::validate_dimensions(&image)?;

        // 去掉alpha通道，灰度扩展为三通道
        let mut rgb = image.to_rgb8();
        if self.enhance {
            rgb = ImagePreprocessor::enhance(&rgb);
        }

        let resized = imageops::resize(&rgb, self.width, self.height, self.filter);

        let data: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        let shape = (1, self.height as usize, self.width as usize, 3);
        let tensor = Array4::from_shape_vec(shape, data)
            .map_err(|e| ClassifierError::Shape(format!("Failed to build input tensor: {}", e)))?;

        self.check_shape(&tensor)?;

        tracing::debug!(
            "Normalized image to {:?}, range {:.3}..{:.3}",
            tensor.shape(),
            tensor.iter().cloned().fold(f32::INFINITY, f32::min),
            tensor.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
        );

        Ok(tensor)
    }

    fn check_shape(&self, tensor: &ImageTensor) -> Result<()> {
        let expected = [1, self.height as usize, self.width as usize, 3];
        if tensor.shape() != expected {
            return Err(ClassifierError::Shape(format!(
                "Expected tensor shape {:?}, got {:?}",
                expected,
                tensor.shape()
            )));
        }
        Ok(())
    }
}
