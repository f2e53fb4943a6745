//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。レスポンスは常にJSON `{ "message": ... }`。

use axum::http::StatusCode;
use axum::Json;
use lakarcade_types::ErrorBody;

use crate::auth::AuthError;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 必須フィールドの欠落・不正なリクエストボディ
    #[error("{0}")]
    Validation(String),
    /// ウォレット所有確認の失敗
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// リクエストボディがサイズ上限を超えた
    #[error("{0}")]
    PayloadTooLarge(String),
    /// ピン留めサービスの認証情報が未設定
    #[error("{0}")]
    Config(String),
    /// ピン留めサービスの失敗（HTTPエラー・通信失敗）
    #[error("{0}")]
    Upstream(String),
    /// 内部エラー（シリアライズ失敗、時刻取得失敗等）
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) | GatewayError::Auth(_) | GatewayError::Upstream(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Config(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            GatewayError::Internal(detail) => {
                tracing::error!(detail = %detail, "内部エラー");
                "Internal server error".to_string()
            }
            GatewayError::Config(detail) => {
                tracing::error!(detail = %detail, "設定エラー");
                self.to_string()
            }
            _ => {
                tracing::warn!(status = %status, error = %self, "リクエストを拒否しました");
                self.to_string()
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
