//! # IPFSピン留めサービス
//!
//! 検証済みリクエストのペイロードを外部のピン留めサービスへ転送する抽象インターフェース。
//! Pinata実装は `pinata` サブモジュールを参照。

pub mod pinata;

pub use pinata::{PinataCredentials, PinataPinning};

use lakarcade_types::NftMetadata;

use crate::error::GatewayError;

/// ピン留めするファイル。
#[derive(Debug, Clone)]
pub struct PinFile {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// ピン留めサービスの抽象インターフェース。
///
/// 成功時はサービスのレスポンスJSONを加工せずに返す。
/// 失敗時は再試行せず、認証情報未設定は `GatewayError::Config`、
/// サービス側の失敗は `GatewayError::Upstream` として返す。
#[async_trait::async_trait]
pub trait PinningService: Send + Sync {
    /// NFTメタデータ（JSON）をピン留めする。`name` はサービス上の管理名。
    async fn pin_json(
        &self,
        name: &str,
        metadata: &NftMetadata,
    ) -> Result<serde_json::Value, GatewayError>;

    /// ファイル（画像）をピン留めする。
    async fn pin_file(&self, name: &str, file: PinFile)
        -> Result<serde_json::Value, GatewayError>;
}
