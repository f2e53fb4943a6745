//! # Lakarcade 共有型定義
//!
//! Gateway・CLI間でやり取りされるJSON構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - フィールド名はフロントエンド（Next.js）に合わせてcamelCase
//! - Ethereumアドレス・署名は `0x` プレフィックス付きhex文字列
//! - 画像バイナリはJSONの数値配列（`number[]`）

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// チャレンジ (GET /api/verify)
// ---------------------------------------------------------------------------

/// ウォレット所有確認用のチャレンジ。
///
/// クライアントはこの構造体のJSONエンコード（`{"contractAddress":..,"id":..}`）を
/// そのまま `personal_sign` する。フィールド順序が署名対象に影響するため並び替えないこと。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// NFTマーケットコントラクトのアドレス
    pub contract_address: String,
    /// チャレンジごとに生成されるUUID v4
    pub id: String,
}

impl Challenge {
    /// 署名対象となる正規化メッセージ（コンパクトなJSON）を返す。
    pub fn signing_message(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// NFTメタデータ (POST /api/verify)
// ---------------------------------------------------------------------------

/// NFTの属性（OpenSea互換）。
///
/// `trait_type` を持たない属性も有効。`display_type` や `max_value` 等の
/// 追加フィールドは `extra` に保持して転送する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NftAttribute {
    /// 属性名 (例: "material", "village")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_type: Option<String>,
    /// 属性値（文字列・数値のどちらも許容）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// ピン留め対象のNFTメタデータ。
///
/// 未知のフィールドは `extra` に保持し、ピン留めサービスへそのまま転送する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 画像のIPFS URL（`/api/verify-image` の結果から組み立てる）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<NftAttribute>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NftMetadata {
    /// 必須フィールド（name, description, attributes）が揃っているか。
    /// 空文字列は未入力として扱う。
    pub fn has_required_fields(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        filled(&self.name) && filled(&self.description) && self.attributes.is_some()
    }
}

/// POST /api/verify リクエスト。
///
/// 必須フィールドの欠落はハンドラ側で422として扱うため、すべてOptionで受ける。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyNftRequest {
    /// クライアントが主張するウォレットアドレス
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// チャレンジに対する `personal_sign` 署名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft: Option<NftMetadata>,
}

// ---------------------------------------------------------------------------
// 画像アップロード (POST /api/verify-image)
// ---------------------------------------------------------------------------

/// POST /api/verify-image リクエスト。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadRequest {
    /// 画像バイナリ（JSON数値配列）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    /// ファイル名。フロントエンドは `fileName` で送信する。
    #[serde(default, rename = "filename", alias = "fileName", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// MIMEタイプ (例: "image/png")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

// ---------------------------------------------------------------------------
// レスポンス
// ---------------------------------------------------------------------------

/// ピン留めサービス（Pinata）の成功レスポンス。
///
/// Gatewayはレスポンスを加工せずに返すため、この型はクライアント側の読み取り用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinResponse {
    /// IPFSコンテンツID
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pub pin_size: u64,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: String,
}

/// すべてのエラーレスポンスの共通ボディ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 署名対象メッセージがJSON.stringifyと同じ形になることを確認
    #[test]
    fn test_challenge_signing_message() {
        let challenge = Challenge {
            contract_address: "0xAbC0000000000000000000000000000000000001".to_string(),
            id: "5b1f2c8e-2f4a-4c5e-9d1e-0a7b3c9d8e6f".to_string(),
        };
        assert_eq!(
            challenge.signing_message().unwrap(),
            r#"{"contractAddress":"0xAbC0000000000000000000000000000000000001","id":"5b1f2c8e-2f4a-4c5e-9d1e-0a7b3c9d8e6f"}"#
        );
    }

    /// 未知フィールドが保持され、転送時に失われないことを確認
    #[test]
    fn test_nft_metadata_preserves_extra_fields() {
        let raw = serde_json::json!({
            "name": "Dumbara Mat",
            "description": "Hand-woven in Kandy",
            "image": "https://gateway.pinata.cloud/ipfs/QmImage",
            "attributes": [{"trait_type": "village", "value": "Dumbara"}],
            "external_url": "https://lakarcade.example/items/1"
        });
        let nft: NftMetadata = serde_json::from_value(raw.clone()).unwrap();
        assert!(nft.has_required_fields());
        assert_eq!(nft.extra.get("external_url").unwrap(), "https://lakarcade.example/items/1");
        assert_eq!(serde_json::to_value(&nft).unwrap(), raw);
    }

    /// 属性の追加フィールドと `trait_type` のない属性がそのまま往復することを確認
    #[test]
    fn test_nft_attributes_roundtrip_verbatim() {
        let raw = serde_json::json!({
            "name": "Brass Lamp",
            "description": "Cast in Pilimathalawa",
            "attributes": [
                {"trait_type": "Age", "value": 3, "display_type": "number", "max_value": 10},
                {"value": "plain"}
            ]
        });
        let nft: NftMetadata = serde_json::from_value(raw.clone()).unwrap();
        assert!(nft.has_required_fields());

        let attributes = nft.attributes.as_ref().unwrap();
        assert_eq!(attributes[0].trait_type.as_deref(), Some("Age"));
        assert_eq!(attributes[0].extra.get("display_type").unwrap(), "number");
        assert_eq!(attributes[1].trait_type, None);
        assert_eq!(serde_json::to_value(&nft).unwrap(), raw);
    }

    /// 必須フィールドの欠落・空文字列を検出することを確認
    #[test]
    fn test_nft_metadata_required_fields() {
        let missing_attributes: NftMetadata =
            serde_json::from_value(serde_json::json!({"name": "a", "description": "b"})).unwrap();
        assert!(!missing_attributes.has_required_fields());

        let empty_name: NftMetadata = serde_json::from_value(
            serde_json::json!({"name": "", "description": "b", "attributes": []}),
        )
        .unwrap();
        assert!(!empty_name.has_required_fields());

        let empty_attributes: NftMetadata = serde_json::from_value(
            serde_json::json!({"name": "a", "description": "b", "attributes": []}),
        )
        .unwrap();
        assert!(empty_attributes.has_required_fields());
    }

    /// `fileName` と `filename` の両方を受け付けることを確認
    #[test]
    fn test_image_request_filename_alias() {
        let camel: ImageUploadRequest = serde_json::from_value(serde_json::json!({
            "bytes": [1, 2, 3],
            "fileName": "mask.png",
            "contentType": "image/png"
        }))
        .unwrap();
        assert_eq!(camel.filename.as_deref(), Some("mask.png"));
        assert_eq!(camel.content_type.as_deref(), Some("image/png"));
        assert_eq!(camel.bytes.as_deref(), Some(&[1u8, 2, 3][..]));

        let lower: ImageUploadRequest =
            serde_json::from_value(serde_json::json!({"filename": "mask.png"})).unwrap();
        assert_eq!(lower.filename.as_deref(), Some("mask.png"));
    }
}
