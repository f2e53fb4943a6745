//! # Gateway クライアント
//!
//! `GET /api/verify` でチャレンジを取得し、ウォレット鍵で署名してから
//! アップロードを送信する。セッションCookieは取得時の `Set-Cookie` をそのまま送り返す。

use std::path::Path;

use lakarcade_crypto::{
    address_from_verifying_key, sign_personal_message, to_checksum_address, CryptoError,
    Secp256k1SigningKey,
};
use lakarcade_types::{
    Challenge, ErrorBody, ImageUploadRequest, NftMetadata, PinResponse, VerifyNftRequest,
};
use reqwest::header::{COOKIE, SET_COOKIE};

/// クライアントのエラー型
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 通信エラー
    #[error("request to gateway failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Gatewayがエラーを返した
    #[error("gateway responded with HTTP {status}: {message}")]
    Gateway { status: u16, message: String },
    /// チャレンジ取得時にセッションCookieが返されなかった
    #[error("gateway did not set a session cookie")]
    MissingSessionCookie,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("failed to encode challenge: {0}")]
    Encode(#[from] serde_json::Error),
}

/// 取得済みチャレンジと、それを保持するセッションCookie。
#[derive(Debug, Clone)]
pub struct ChallengeSession {
    pub cookie: String,
    pub challenge: Challenge,
}

/// アップロードする画像ファイル。
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl ImageFile {
    /// ファイルを読み込む。`content_type` 未指定時は拡張子から推定する。
    pub fn load(path: &Path, content_type: Option<String>) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = content_type.unwrap_or_else(|| guess_content_type(path).to_string());
        Ok(Self {
            bytes,
            filename,
            content_type,
        })
    }
}

/// 拡張子からMIMEタイプを推定する。
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

/// hex秘密鍵（`0x` 任意）をsecp256k1署名鍵として読み込む。
pub fn parse_signing_key(input: &str) -> anyhow::Result<Secp256k1SigningKey> {
    let trimmed = input.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_str)
        .map_err(|e| anyhow::anyhow!("秘密鍵のhexデコードに失敗: {e}"))?;
    Secp256k1SigningKey::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("秘密鍵が不正です: {e}"))
}

/// 署名鍵に対応するEIP-55アドレス。
pub fn wallet_address(key: &Secp256k1SigningKey) -> String {
    to_checksum_address(&address_from_verifying_key(key.verifying_key()))
}

/// チャレンジに対する `personal_sign` 署名。
pub fn sign_challenge(
    key: &Secp256k1SigningKey,
    challenge: &Challenge,
) -> Result<String, ClientError> {
    let message = challenge.signing_message()?;
    Ok(sign_personal_message(key, message.as_bytes())?)
}

/// Lakarcade Gateway のHTTPクライアント。
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// GET /api/verify
    pub async fn fetch_challenge(&self) -> Result<ChallengeSession, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/verify", self.base_url))
            .send()
            .await?;
        let response = check_status(response).await?;

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        if cookie.is_empty() {
            return Err(ClientError::MissingSessionCookie);
        }

        let challenge = response.json::<Challenge>().await?;
        Ok(ChallengeSession { cookie, challenge })
    }

    /// チャレンジ取得 → 署名 → POST /api/verify
    pub async fn pin_metadata(
        &self,
        key: &Secp256k1SigningKey,
        nft: NftMetadata,
    ) -> Result<PinResponse, ClientError> {
        let session = self.fetch_challenge().await?;
        let body = VerifyNftRequest {
            address: Some(wallet_address(key)),
            signature: Some(sign_challenge(key, &session.challenge)?),
            nft: Some(nft),
        };
        self.post_signed("/api/verify", &session.cookie, &body).await
    }

    /// チャレンジ取得 → 署名 → POST /api/verify-image
    pub async fn pin_image(
        &self,
        key: &Secp256k1SigningKey,
        image: ImageFile,
    ) -> Result<PinResponse, ClientError> {
        let session = self.fetch_challenge().await?;
        let body = ImageUploadRequest {
            bytes: Some(image.bytes),
            filename: Some(image.filename),
            content_type: Some(image.content_type),
            address: Some(wallet_address(key)),
            signature: Some(sign_challenge(key, &session.challenge)?),
        };
        self.post_signed("/api/verify-image", &session.cookie, &body).await
    }

    async fn post_signed<T: serde::Serialize>(
        &self,
        path: &str,
        cookie: &str,
        body: &T,
    ) -> Result<PinResponse, ClientError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header(COOKIE, cookie)
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<PinResponse>().await?)
    }
}

/// 非2xxレスポンスを `ClientError::Gateway` に変換する。
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(ClientError::Gateway {
        status: status.as_u16(),
        message,
    })
}
