//! # エンドポイントテスト用共通ヘルパー
//!
//! モックPinataサーバー、テスト用GatewayState、テスト用ウォレット。

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Json;
use lakarcade_crypto::{
    address_from_verifying_key, sign_personal_message, to_checksum_address, Secp256k1SigningKey,
};
use lakarcade_types::Challenge;

use crate::auth::ChallengeLedger;
use crate::config::GatewayState;
use crate::pinning::{PinataCredentials, PinataPinning};
use crate::session::{SessionCodec, SESSION_COOKIE_NAME};

pub const TEST_CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const TEST_SECRET: &[u8] = b"complex_password_at_least_32_characters_long";
pub const MOCK_JSON_HASH: &str = "QmMockJsonHash";
pub const MOCK_FILE_HASH: &str = "QmMockFileHash";

pub fn test_credentials() -> PinataCredentials {
    PinataCredentials {
        api_key: "test-key".to_string(),
        secret_api_key: "test-secret".to_string(),
    }
}

/// テスト用GatewayStateを構築する。
pub fn test_state(
    pinata_url: &str,
    credentials: Option<PinataCredentials>,
    consume_challenge: bool,
) -> Arc<GatewayState> {
    Arc::new(GatewayState {
        contract_address: TEST_CONTRACT.to_string(),
        session: SessionCodec::new(TEST_SECRET, false, 3600).unwrap(),
        pinning: Box::new(PinataPinning::new(
            pinata_url,
            credentials,
            reqwest::Client::new(),
        )),
        challenge_ledger: consume_challenge.then(ChallengeLedger::new),
    })
}

/// 指定ルーターをランダムポートで起動し、ベースURLを返す。
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{port}")
}

/// モックPinataサーバーを起動する。APIキーヘッダを検証し、固定のハッシュを返す。
pub async fn start_mock_pinata() -> String {
    fn check_keys(headers: &HeaderMap) {
        assert_eq!(headers.get("pinata_api_key").unwrap(), "test-key");
        assert_eq!(headers.get("pinata_secret_api_key").unwrap(), "test-secret");
    }

    let app = axum::Router::new()
        .route(
            "/pinning/pinJSONToIPFS",
            axum::routing::post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                check_keys(&headers);
                assert!(body.get("pinataContent").is_some());
                Json(serde_json::json!({
                    "IpfsHash": MOCK_JSON_HASH,
                    "PinSize": 128,
                    "Timestamp": "2026-10-18T00:00:00.000Z"
                }))
            }),
        )
        .route(
            "/pinning/pinFileToIPFS",
            axum::routing::post(|headers: HeaderMap, _body: axum::body::Bytes| async move {
                check_keys(&headers);
                Json(serde_json::json!({
                    "IpfsHash": MOCK_FILE_HASH,
                    "PinSize": 4,
                    "Timestamp": "2026-10-18T00:00:00.000Z"
                }))
            }),
        );
    serve(app).await
}

/// レスポンスの `Set-Cookie` からセッションCookieの `name=value` 部分を取り出す。
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::to_string)
}

/// テスト用ウォレット。
pub struct TestWallet {
    key: Secp256k1SigningKey,
}

impl TestWallet {
    pub fn new() -> Self {
        Self {
            key: Secp256k1SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// EIP-55表記のアドレス
    pub fn address(&self) -> String {
        to_checksum_address(&address_from_verifying_key(self.key.verifying_key()))
    }

    pub fn sign(&self, challenge: &Challenge) -> String {
        let message = challenge.signing_message().unwrap();
        sign_personal_message(&self.key, message.as_bytes()).unwrap()
    }
}
