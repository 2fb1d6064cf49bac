use crate::{
    image::ImageLoader,
    prediction::PredictionEntry,
    utils::error::ClassifierError,
    web::{extractors::RequestId, AppState},
    Result,
};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::time::Instant;

/// 可接受的图像字段名
const FILE_FIELDS: [&str; 2] = ["file", "image"];

/// 预测成功响应
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub predictions: Vec<PredictionEntry>,
    pub image_path: String,
}

/// 从multipart请求体中取出并校验过的上传文件
struct Upload {
    filename: String,
    data: Bytes,
}

/// Multipart图像上传处理器
pub async fn predict_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    multipart: Multipart,
) -> Result<Json<PredictResponse>> {
    let start_time = Instant::now();

    tracing::info!("Processing prediction request: request_id={}", request_id);

    let upload = read_upload(&state, multipart).await?;

    if let Some(format) = ImageLoader::detect_format(&upload.data) {
        if !ImageLoader::is_supported_format(format) {
            return Err(ClassifierError::UnsupportedFormat(format!("{:?}", format)));
        }
    }

    tracing::debug!(
        "Received file: {} ({} bytes), request_id={}",
        upload.filename,
        upload.data.len(),
        request_id
    );

    let pipeline = state.pipeline.clone();
    let storage = state.storage.clone();

    // 解码和推理都是CPU密集型
    let (predictions, image_path) = tokio::task::spawn_blocking(move || {
        let predictions = pipeline.predict_bytes(&upload.data)?;
        let image_path = storage.save(&upload.data, &upload.filename)?;
        Ok::<_, ClassifierError>((predictions, image_path))
    })
    .await
    .map_err(|e| ClassifierError::Internal(format!("Prediction task failed: {}", e)))??;

    tracing::info!(
        "Prediction request completed: request_id={}, classes={}, time={:.3}s",
        request_id,
        predictions.len(),
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(PredictResponse {
        success: true,
        predictions,
        image_path,
    }))
}

async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<Upload> {
    let classifier_config = &state.config.classifier_config;
    let mut upload = None;

    let max_size = state.config.server_config.max_request_size;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to read multipart field", max_size))?
    {
        let field_name = field.name().unwrap_or("unknown").to_string();

        if !FILE_FIELDS.contains(&field_name.as_str()) {
            tracing::debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ClassifierError::InvalidInput("No file selected".to_string()));
        }

        if !classifier_config.is_allowed_extension(&filename) {
            return Err(ClassifierError::InvalidInput(format!(
                "Invalid file type: {}, allowed: {}",
                filename,
                classifier_config.allowed_extensions.join(", ")
            )));
        }

        if let Some(content_type) = field.content_type() {
            if !content_type.starts_with("image/") {
                return Err(ClassifierError::UnsupportedFormat(content_type.to_string()));
            }
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read file data", max_size))?;

        if data.is_empty() {
            return Err(ClassifierError::InvalidInput("Empty file".to_string()));
        }

        if data.len() > max_size {
            return Err(ClassifierError::FileTooLarge(data.len(), max_size));
        }

        upload = Some(Upload { filename, data });
    }

    upload.ok_or_else(|| ClassifierError::InvalidInput("No file uploaded".to_string()))
}

/// 请求体超出限制时返回413，其余multipart错误视为输入错误
fn multipart_error(e: MultipartError, context: &str, max_size: usize) -> ClassifierError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ClassifierError::UploadTooLarge(max_size);
    }
    ClassifierError::InvalidInput(format!("{}: {}", context, e.body_text()))
}
