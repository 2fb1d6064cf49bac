use anyhow::Result;
use clap::Parser;
use onnx_classifier::config::{parse_input_size, ClassifierConfig, Config, DEFAULT_PERTURBATIONS};
use onnx_classifier::web::serve;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onnx-classifier")]
#[command(about = "ONNX-powered image classification service")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:5000")]
    bind: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Model directory path
    #[arg(long, default_value = "models")]
    models_dir: String,

    /// Model file name inside the model directory
    #[arg(long, default_value = "classifier.onnx")]
    model_file: String,

    /// Labels file, one class per line (default: <models-dir>/labels.txt, else built-in classes)
    #[arg(long)]
    labels_file: Option<PathBuf>,

    /// Where uploaded images are stored
    #[arg(long, default_value = "static/uploads")]
    upload_dir: PathBuf,

    /// Minimum class confidence in percent (older deployments used 5.0)
    #[arg(long, default_value_t = 15.0)]
    min_confidence: f64,

    /// Model input size, WxH (older deployments used 128x128)
    #[arg(long, default_value = "177x177")]
    input_size: String,

    /// Brightness factors of the prediction ensemble, comma separated
    #[arg(long, value_delimiter = ',')]
    perturbations: Vec<f32>,

    /// Autocontrast, brighten and add contrast before resizing
    #[arg(long)]
    enhance: bool,

    /// Maximum upload size in bytes
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    max_upload_size: usize,

    /// ONNX Runtime intra-op threads (default: 75% of cores)
    #[arg(long)]
    intra_threads: Option<usize>,

    /// Allowed CORS origin, repeatable
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Allow any CORS origin
    #[arg(long)]
    cors_permissive: bool,

    /// Enable development mode
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting ONNX classification service...");
    tracing::info!("Bind address: {}", args.bind);
    tracing::info!("Models directory: {}", args.models_dir);

    let (input_width, input_height) = parse_input_size(&args.input_size)?;
    let perturbations = if args.perturbations.is_empty() {
        DEFAULT_PERTURBATIONS.to_vec()
    } else {
        args.perturbations
    };

    let classifier_config = ClassifierConfig {
        input_width,
        input_height,
        min_confidence: args.min_confidence,
        perturbations,
        enhance: args.enhance,
        ..ClassifierConfig::default()
    };

    tracing::info!(
        "Classifier: input {}x{}, min confidence {}%, perturbations {:?}, enhance {}",
        classifier_config.input_width,
        classifier_config.input_height,
        classifier_config.min_confidence,
        classifier_config.perturbations,
        classifier_config.enhance
    );

    let config = Config::new(args.bind, args.models_dir, args.dev)?
        .with_classifier_config(classifier_config)?
        .with_model_file(args.model_file)
        .with_labels_file(args.labels_file)
        .with_upload_dir(args.upload_dir)
        .with_max_request_size(args.max_upload_size)
        .with_intra_threads(args.intra_threads)
        .with_cors_origins(args.cors_origins)
        .with_cors_permissive(args.cors_permissive);

    serve(config).await?;

    Ok(())
}
