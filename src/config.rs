use crate::utils::error::ClassifierError;
use crate::Result;
use std::path::PathBuf;

/// 服装模型的内置类别，按模型输出顺序
pub const DEFAULT_CLASS_NAMES: [&str; 7] = [
    "Bags",
    "Bottomwear",
    "Dress",
    "Headwear",
    "Shoes",
    "Topwear",
    "Watches",
];

/// 默认最小置信度（百分比），旧部署使用5.0
pub const DEFAULT_MIN_CONFIDENCE: f64 = 15.0;

/// 默认模型输入尺寸(W, H)，旧部署使用128x128
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (177, 177);

/// 集成预测的亮度系数：原图、增亮、变暗
pub const DEFAULT_PERTURBATIONS: [f32; 3] = [1.0, 1.1, 0.9];

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型和标签文件目录
    pub models_dir: PathBuf,

    /// 模型文件名，相对于`models_dir`
    pub model_file: String,

    /// 可选的标签文件，覆盖内置类别
    pub labels_file: Option<PathBuf>,

    /// 上传图像存储目录
    pub upload_dir: PathBuf,

    /// 开发模式
    pub dev_mode: bool,

    pub onnx_config: OnnxConfig,

    pub server_config: ServerConfig,

    pub classifier_config: ClassifierConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// 单次推理使用的CPU线程数
    pub intra_threads: usize,

    /// 图优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大上传文件大小（字节）
    pub max_request_size: usize,

    /// CORS允许的来源
    pub cors_origins: Vec<String>,

    /// 允许任意来源
    pub cors_permissive: bool,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// 模型输入宽度
    pub input_width: u32,

    /// 模型输入高度
    pub input_height: u32,

    /// 类别被返回所需的最小百分比
    pub min_confidence: f64,

    /// 亮度系数，每个系数运行一次模型
    pub perturbations: Vec<f32>,

    /// 缩放前做自动对比度、亮度和对比度增强
    pub enhance: bool,

    /// 允许的上传扩展名（小写）
    pub allowed_extensions: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_SIZE.0,
            input_height: DEFAULT_INPUT_SIZE.1,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            perturbations: DEFAULT_PERTURBATIONS.to_vec(),
            enhance: false,
            allowed_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(ClassifierError::Config(format!(
                "Input size must be non-zero, got {}x{}",
                self.input_width, self.input_height
            )));
        }

        if !self.min_confidence.is_finite() || !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(ClassifierError::Config(format!(
                "Minimum confidence must be within 0..=100, got {}",
                self.min_confidence
            )));
        }

        if self.perturbations.is_empty() {
            return Err(ClassifierError::Config(
                "At least one perturbation factor is required".to_string(),
            ));
        }

        if let Some(bad) = self
            .perturbations
            .iter()
            .find(|f| !f.is_finite() || **f <= 0.0)
        {
            return Err(ClassifierError::Config(format!(
                "Perturbation factors must be positive, got {}",
                bad
            )));
        }

        Ok(())
    }

    /// 模型输入尺寸(W, H)
    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    pub fn is_allowed_extension(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

impl Config {
    pub fn new(bind_addr: String, models_dir: String, dev_mode: bool) -> Result<Self> {
        let cpu_cores = num_cpus::get();

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1),
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 16 * 1024 * 1024,
            cors_origins: vec!["http://localhost:3000".to_string()],
            cors_permissive: dev_mode,
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            model_file: "classifier.onnx".to_string(),
            labels_file: None,
            upload_dir: PathBuf::from("static/uploads"),
            dev_mode,
            onnx_config,
            server_config,
            classifier_config: ClassifierConfig::default(),
        })
    }

    pub fn with_classifier_config(mut self, classifier_config: ClassifierConfig) -> Result<Self> {
        classifier_config.validate()?;
        self.classifier_config = classifier_config;
        Ok(self)
    }

    pub fn with_upload_dir(mut self, upload_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self
    }

    pub fn with_model_file(mut self, model_file: impl Into<String>) -> Self {
        self.model_file = model_file.into();
        self
    }

    pub fn with_labels_file(mut self, labels_file: Option<PathBuf>) -> Self {
        self.labels_file = labels_file;
        self
    }

    pub fn with_intra_threads(mut self, intra_threads: Option<usize>) -> Self {
        if let Some(threads) = intra_threads {
            self.onnx_config.intra_threads = threads.max(1);
        }
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        if !origins.is_empty() {
            self.server_config.cors_origins = origins;
        }
        self
    }

    pub fn with_cors_permissive(mut self, permissive: bool) -> Self {
        self.server_config.cors_permissive |= permissive;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.server_config.max_request_size = max_request_size;
        self
    }

    /// 获取ONNX模型路径
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_file)
    }

    /// 获取标签文件路径：显式指定的文件，否则为模型目录下的`labels.txt`
    pub fn labels_path(&self) -> PathBuf {
        self.labels_file
            .clone()
            .unwrap_or_else(|| self.models_dir.join("labels.txt"))
    }
}

/// 解析`177x177`、`177X128`或单个`177`（正方形）
pub fn parse_input_size(value: &str) -> Result<(u32, u32)> {
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| ClassifierError::Config(format!("Invalid input size '{}': {}", value, e)))
    };

    match value.split_once(['x', 'X']) {
        Some((w, h)) => Ok((parse(w)?, parse(h)?)),
        None => {
            let side = parse(value)?;
            Ok((side, side))
        }
    }
}
