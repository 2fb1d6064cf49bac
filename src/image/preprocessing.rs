use ::image::{Rgb, RgbImage};

/// 图像增强，启用`enhance`时在缩放前执行
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// 自动对比度忽略的最暗和最亮像素比例（百分比）
    const AUTOCONTRAST_CUTOFF: usize = 2;
    const BRIGHTNESS: f32 = 1.1;
    const CONTRAST: f32 = 1.2;

    /// 手机照片增强流程
    pub fn enhance(image: &RgbImage) -> RgbImage {
        let mut processed = Self::autocontrast(image, Self::AUTOCONTRAST_CUTOFF);
        processed = Self::adjust_brightness(&processed, Self::BRIGHTNESS);
        Self::adjust_contrast(&processed, Self::CONTRAST)
    }

    /// 按通道线性拉伸，直方图两端各去掉`cutoff`百分比
    pub fn autocontrast(image: &RgbImage, cutoff: usize) -> RgbImage {
        let total = (image.width() * image.height()) as usize;
        let mut luts = [[0u8; 256]; 3];

        for (c, lut) in luts.iter_mut().enumerate() {
            let mut histogram = [0usize; 256];
            for pixel in image.pixels() {
                histogram[pixel[c] as usize] += 1;
            }

            let cut = total * cutoff / 100;
            Self::trim_histogram(&mut histogram, cut, false);
            Self::trim_histogram(&mut histogram, cut, true);

            let low = histogram.iter().position(|&n| n > 0);
            let high = histogram.iter().rposition(|&n| n > 0);

            match (low, high) {
                (Some(low), Some(high)) if high > low => {
                    let scale = 255.0 / (high - low) as f32;
                    let offset = -(low as f32) * scale;
                    for (i, value) in lut.iter_mut().enumerate() {
                        *value = (i as f32 * scale + offset).clamp(0.0, 255.0) as u8;
                    }
                }
                _ => {
                    for (i, value) in lut.iter_mut().enumerate() {
                        *value = i as u8;
                    }
                }
            }
        }

        let mut output = image.clone();
        for pixel in output.pixels_mut() {
            for c in 0..3 {
                pixel[c] = luts[c][pixel[c] as usize];
            }
        }
        output
    }

    fn trim_histogram(histogram: &mut [usize; 256], mut cut: usize, from_top: bool) {
        let indices: Box<dyn Iterator<Item = usize>> = if from_top {
            Box::new((0..256).rev())
        } else {
            Box::new(0..256)
        };

        for i in indices {
            if cut == 0 {
                break;
            }
            if cut > histogram[i] {
                cut -= histogram[i];
                histogram[i] = 0;
            } else {
                histogram[i] -= cut;
                cut = 0;
            }
        }
    }

    /// 每个通道乘以`factor`
    pub fn adjust_brightness(image: &RgbImage, factor: f32) -> RgbImage {
        let mut output = image.clone();
        for pixel in output.pixels_mut() {
            for c in 0..3 {
                pixel[c] = (pixel[c] as f32 * factor).round().clamp(0.0, 255.0) as u8;
            }
        }
        output
    }

    /// 以平均亮度为中心增强（factor > 1）或减弱（factor < 1）对比度
    pub fn adjust_contrast(image: &RgbImage, factor: f32) -> RgbImage {
        let total = (image.width() * image.height()) as f32;
        if total == 0.0 {
            return image.clone();
        }

        let luminance_sum: f32 = image.pixels().map(Self::luminance).sum();
        let mean = (luminance_sum / total).round();

        let mut output = image.clone();
        for pixel in output.pixels_mut() {
            for c in 0..3 {
                let value = mean + factor * (pixel[c] as f32 - mean);
                pixel[c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
        output
    }

    /// ITU-R 601-2 亮度
    fn luminance(pixel: &Rgb<u8>) -> f32 {
        pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114
    }
}
