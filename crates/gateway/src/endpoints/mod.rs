//! # Gatewayエンドポイント
//!
//! - `GET /api/verify` — チャレンジ発行
//! - `POST /api/verify` — 所有確認 + NFTメタデータのピン留め
//! - `POST /api/verify-image` — 所有確認 + 画像のピン留め

pub mod verify;
pub mod verify_image;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use verify::{handle_issue_challenge, handle_verify_nft};
pub use verify_image::handle_verify_image;

use axum::extract::rejection::JsonRejection;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lakarcade_types::Challenge;

use crate::auth::verify_ownership;
use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::session::unix_now;

pub(crate) const MISSING_FORM_DATA: &str = "Some of the form data are missing!";
pub(crate) const MISSING_IMAGE_DATA: &str = "Image data are missing";
pub(crate) const MISSING_SIGNATURE: &str = "Address or signature is missing";

/// 空文字列を未入力として扱う。
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// JSONボディの抽出失敗をGatewayエラーに変換する。
pub(crate) fn reject_body(rejection: JsonRejection) -> GatewayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(rejection.body_text())
    } else {
        GatewayError::Validation(rejection.body_text())
    }
}

/// アドレスと署名の両方が揃っていることを確認する。
pub(crate) fn require_signed(
    address: Option<String>,
    signature: Option<String>,
) -> Result<(String, String), GatewayError> {
    match (non_empty(address), non_empty(signature)) {
        (Some(address), Some(signature)) => Ok((address, signature)),
        _ => Err(GatewayError::Validation(MISSING_SIGNATURE.to_string())),
    }
}

/// セッションのチャレンジに対する署名を検証する。
/// 台帳が有効な場合はチャレンジを使用済みとして記録する。
pub(crate) fn authorize(
    state: &GatewayState,
    headers: &HeaderMap,
    address: &str,
    signature: &str,
) -> Result<Challenge, GatewayError> {
    let now = unix_now()?;
    let session = state.session.read(headers, now);
    let challenge = verify_ownership(&session, address, signature)?;

    if let Some(ledger) = &state.challenge_ledger {
        ledger.consume(&challenge.id, session.expires_at, now)?;
    }
    Ok(challenge)
}

/// ピン留め結果をそのまま返す。
/// 台帳が有効な場合は使用済みチャレンジを持つCookieも破棄する。
pub(crate) fn respond_pinned(state: &GatewayState, pinned: serde_json::Value) -> Response {
    if state.challenge_ledger.is_some() {
        ([(SET_COOKIE, state.session.clear_cookie())], Json(pinned)).into_response()
    } else {
        Json(pinned).into_response()
    }
}
