//! # POST /api/verify-image
//!
//! 所有確認済み画像のピン留め。

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use lakarcade_types::ImageUploadRequest;

use super::{authorize, non_empty, reject_body, require_signed, respond_pinned, MISSING_IMAGE_DATA};
use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::pinning::PinFile;

/// POST /api/verify-image — 所有確認 + 画像のピン留め。
///
/// `bytes`（空配列を含む）・`filename`・`contentType` のいずれかが欠けていれば422。
pub async fn handle_verify_image(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Result<Json<ImageUploadRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(body) = payload.map_err(reject_body)?;

    let file = match (
        body.bytes.filter(|bytes| !bytes.is_empty()),
        non_empty(body.filename),
        non_empty(body.content_type),
    ) {
        (Some(bytes), Some(filename), Some(content_type)) => PinFile {
            bytes,
            filename,
            content_type,
        },
        _ => return Err(GatewayError::Validation(MISSING_IMAGE_DATA.to_string())),
    };
    let (address, signature) = require_signed(body.address, body.signature)?;

    let challenge = authorize(&state, &headers, &address, &signature)?;

    let pin_name = uuid::Uuid::new_v4().to_string();
    let filename = file.filename.clone();
    let size = file.bytes.len();
    let pinned = state.pinning.pin_file(&pin_name, file).await?;

    tracing::info!(
        address = %address,
        challenge_id = %challenge.id,
        filename = %filename,
        size,
        "画像をピン留めしました"
    );
    Ok(respond_pinned(&state, pinned))
}
