use crate::utils::error::ClassifierError;
use crate::Result;
use ::image::error::{DecodingError, ImageFormatHint};
use ::image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

/// 解码时允许分配的最大内存
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// 从内存解码上传图像，超过`max_size`字节直接拒绝
    pub fn from_bytes(bytes: &[u8], max_size: usize) -> Result<DynamicImage> {
        if bytes.len() > max_size {
            return Err(ClassifierError::FileTooLarge(bytes.len(), max_size));
        }

        Self::decode(bytes, Self::decode_limits())
    }

    /// 解码限制：只限制内存分配，不限制宽高
    pub fn decode_limits() -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(MAX_DECODE_ALLOC);
        limits
    }

    /// 按给定限制解码，超限视为解码错误
    pub fn decode(bytes: &[u8], limits: Limits) -> Result<DynamicImage> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(ImageError::IoError)?;
        reader.limits(limits);

        let image = reader.decode()?;

        Ok(image)
    }

    /// 根据文件头判断格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        ::image::guess_format(bytes).ok()
    }

    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::WebP
        )
    }

    /// 拒绝没有像素的图像
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(ClassifierError::Decode(ImageError::Decoding(
                DecodingError::new(
                    ImageFormatHint::Unknown,
                    format!("Image has no pixels: {}x{}", width, height),
                ),
            )));
        }

        Ok(())
    }
}
