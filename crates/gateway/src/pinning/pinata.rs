//! # Pinata ピン留めサービス実装
//!
//! - `POST {api}/pinning/pinJSONToIPFS` — NFTメタデータ
//! - `POST {api}/pinning/pinFileToIPFS` — 画像（multipart/form-data）
//!
//! 認証は `pinata_api_key` / `pinata_secret_api_key` ヘッダの静的APIキー。

use lakarcade_types::NftMetadata;
use serde::{Deserialize, Serialize};

use super::{PinFile, PinningService};
use crate::error::GatewayError;

/// PinataのAPIベースURL（既定値）
pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

const API_KEY_HEADER: &str = "pinata_api_key";
const SECRET_API_KEY_HEADER: &str = "pinata_secret_api_key";

/// Pinata APIキー。
#[derive(Clone)]
pub struct PinataCredentials {
    pub api_key: String,
    pub secret_api_key: String,
}

#[derive(Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinJsonBody<'a> {
    pinata_metadata: PinataMetadata<'a>,
    pinata_content: &'a NftMetadata,
}

/// Pinataのエラーレスポンス。
///
/// エンドポイントによって `{"error": {"reason", "details"}}`、`{"error": "..."}`、
/// `{"message": "..."}` 等の形をとる。
#[derive(Debug, Default, Deserialize)]
struct PinataErrorBody {
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    error: Option<PinataErrorField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PinataErrorField {
    Text(String),
    Detailed {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        details: Option<String>,
    },
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PinataErrorField {
    fn into_message(self) -> Option<String> {
        match self {
            PinataErrorField::Text(text) => Some(text),
            PinataErrorField::Detailed { reason, details } => {
                non_blank(details).or_else(|| non_blank(reason))
            }
        }
    }
}

impl PinataErrorBody {
    /// `details` → `reason` → `error` → `message` の順で最初に見つかったものを返す。
    fn into_message(self) -> Option<String> {
        non_blank(self.details)
            .or_else(|| non_blank(self.reason))
            .or_else(|| non_blank(self.error.and_then(PinataErrorField::into_message)))
            .or_else(|| non_blank(self.message))
    }
}

/// エラーレスポンスからクライアント向けメッセージを抽出する。
fn upstream_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<PinataErrorBody>(body)
        .ok()
        .and_then(PinataErrorBody::into_message)
        .unwrap_or_else(|| format!("Pinning service responded with HTTP {status}"))
}

/// Pinataによるピン留めサービス実装。
pub struct PinataPinning {
    api_url: String,
    credentials: Option<PinataCredentials>,
    http_client: reqwest::Client,
}

impl PinataPinning {
    /// 認証情報がNoneの場合、アップロード時に `GatewayError::Config` を返す。
    pub fn new(
        api_url: &str,
        credentials: Option<PinataCredentials>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
            http_client,
        }
    }

    fn credentials(&self) -> Result<&PinataCredentials, GatewayError> {
        self.credentials.as_ref().ok_or_else(|| {
            GatewayError::Config("Pinata API credentials are not configured".to_string())
        })
    }

    fn post(
        &self,
        path: &str,
        credentials: &PinataCredentials,
    ) -> reqwest::RequestBuilder {
        self.http_client
            .post(format!("{}{}", self.api_url, path))
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(SECRET_API_KEY_HEADER, &credentials.secret_api_key)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value, GatewayError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "ピン留めサービスへの送信に失敗");
            GatewayError::Upstream(format!("Pinning service request failed: {e}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::Upstream(format!("Failed to read pinning service response: {e}"))
        })?;

        if !status.is_success() {
            let message = upstream_error_message(status, &body);
            tracing::warn!(status = %status, message = %message, "ピン留めサービスがエラーを返しました");
            return Err(GatewayError::Upstream(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::Upstream(format!("Malformed pinning service response: {e}"))
        })
    }
}

#[async_trait::async_trait]
impl PinningService for PinataPinning {
    async fn pin_json(
        &self,
        name: &str,
        metadata: &NftMetadata,
    ) -> Result<serde_json::Value, GatewayError> {
        let credentials = self.credentials()?;
        let body = PinJsonBody {
            pinata_metadata: PinataMetadata { name },
            pinata_content: metadata,
        };
        let request = self.post("/pinning/pinJSONToIPFS", credentials).json(&body);
        self.send(request).await
    }

    async fn pin_file(
        &self,
        name: &str,
        file: PinFile,
    ) -> Result<serde_json::Value, GatewayError> {
        let credentials = self.credentials()?;

        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|e| GatewayError::Validation(format!("Invalid content type: {e}")))?;
        let metadata = serde_json::to_string(&PinataMetadata { name })
            .map_err(|e| GatewayError::Internal(format!("pinataMetadataのシリアライズに失敗: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata);

        let request = self.post("/pinning/pinFileToIPFS", credentials).multipart(form);
        self.send(request).await
    }
}
