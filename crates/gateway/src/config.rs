//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 認証情報は起動時に一度だけ読み込み、`GatewayState` 経由で明示的に渡す。

use anyhow::{bail, Context};
use rand::RngCore;

use crate::auth::ChallengeLedger;
use crate::pinning::pinata::DEFAULT_PINATA_API_URL;
use crate::pinning::{PinataCredentials, PinataPinning, PinningService};
use crate::session::SessionCodec;

/// セッション秘密の最小長（バイト）
pub const MIN_SESSION_SECRET_LEN: usize = 32;
/// セッション有効期限の既定値（14日）
pub const DEFAULT_SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60;
/// リクエストボディ上限の既定値（16 MiB）。画像はJSON数値配列で届くため大きめに取る。
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// 環境変数から読み込んだGateway設定。
pub struct GatewayConfig {
    /// 待ち受けアドレス
    pub bind_addr: String,
    /// チャレンジに埋め込むNFTマーケットコントラクトのアドレス（EIP-55表記）
    pub contract_address: String,
    /// セッションCookie封印用の秘密
    pub session_secret: Vec<u8>,
    /// 本番環境ならtrue（Cookieに `Secure` を付与）
    pub production: bool,
    pub session_ttl_secs: u64,
    /// 使用済みチャレンジの再利用を拒否するか
    pub consume_challenge: bool,
    pub max_body_bytes: usize,
    pub pinata_api_url: String,
    /// Noneの場合、アップロードは500（設定エラー）になる
    pub pinata_credentials: Option<PinataCredentials>,
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl GatewayConfig {
    /// プロセス環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ルックアップから構築する。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let production = lookup("LAKARCADE_ENV").is_some_and(|env| env.trim() == "production");

        let contract_address =
            lookup("NFT_CONTRACT_ADDRESS").context("NFT_CONTRACT_ADDRESSが設定されていません")?;
        let contract_address = lakarcade_crypto::parse_address(&contract_address)
            .map(|address| lakarcade_crypto::to_checksum_address(&address))
            .context("NFT_CONTRACT_ADDRESSは20バイトの16進数である必要があります")?;

        let session_secret = match lookup("SECRET_COOKIE_PASSWORD") {
            Some(secret) if secret.len() >= MIN_SESSION_SECRET_LEN => secret.into_bytes(),
            Some(_) => bail!(
                "SECRET_COOKIE_PASSWORDは{MIN_SESSION_SECRET_LEN}文字以上である必要があります"
            ),
            None if production => bail!("本番環境ではSECRET_COOKIE_PASSWORDの設定が必須です"),
            None => {
                // 開発環境用: 再起動でセッションは失効する
                tracing::warn!(
                    "SECRET_COOKIE_PASSWORDが未設定です。ランダムな秘密を生成します（開発環境用）"
                );
                let mut secret = vec![0u8; MIN_SESSION_SECRET_LEN];
                rand::rngs::OsRng.fill_bytes(&mut secret);
                secret
            }
        };

        let session_ttl_secs = match lookup("SESSION_TTL_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .context("SESSION_TTL_SECSは正の整数である必要があります")?,
            None => DEFAULT_SESSION_TTL_SECS,
        };
        if session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECSは1以上である必要があります");
        }

        let consume_challenge = lookup("CONSUME_CHALLENGE").is_some_and(|v| parse_flag(&v));

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .context("MAX_BODY_BYTESは正の整数である必要があります")?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let pinata_api_url =
            lookup("PINATA_API_URL").unwrap_or_else(|| DEFAULT_PINATA_API_URL.to_string());

        let pinata_credentials = match (lookup("PINATA_API_KEY"), lookup("PINATA_SECRET_API_KEY")) {
            (Some(api_key), Some(secret_api_key)) => Some(PinataCredentials {
                api_key,
                secret_api_key,
            }),
            (None, None) => {
                tracing::warn!("Pinata APIキーが未設定です。アップロードは設定エラーになります");
                None
            }
            _ => {
                tracing::warn!(
                    "PINATA_API_KEYとPINATA_SECRET_API_KEYの片方のみ設定されています。アップロードは設定エラーになります"
                );
                None
            }
        };

        Ok(Self {
            bind_addr,
            contract_address,
            session_secret,
            production,
            session_ttl_secs,
            consume_challenge,
            max_body_bytes,
            pinata_api_url,
            pinata_credentials,
        })
    }

    /// 秘密情報を除いた設定内容をログに出力する。
    pub fn log_summary(&self) {
        tracing::info!(
            bind_addr = %self.bind_addr,
            contract_address = %self.contract_address,
            production = self.production,
            session_ttl_secs = self.session_ttl_secs,
            consume_challenge = self.consume_challenge,
            max_body_bytes = self.max_body_bytes,
            pinata_api_url = %self.pinata_api_url,
            pinata_configured = self.pinata_credentials.is_some(),
            "Gateway設定"
        );
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// チャレンジに埋め込むコントラクトアドレス
    pub contract_address: String,
    /// セッションCookieのエンコーダ/デコーダ
    pub session: SessionCodec,
    /// ピン留めサービス（トレイトで抽象化）
    pub pinning: Box<dyn PinningService>,
    /// 使用済みチャレンジ台帳。Noneの場合はチャレンジの再利用を許可する。
    pub challenge_ledger: Option<ChallengeLedger>,
}

impl GatewayState {
    pub fn from_config(
        config: &GatewayConfig,
        http_client: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let session = SessionCodec::new(
            &config.session_secret,
            config.production,
            config.session_ttl_secs,
        )?;
        let pinning = PinataPinning::new(
            &config.pinata_api_url,
            config.pinata_credentials.clone(),
            http_client,
        );

        Ok(Self {
            contract_address: config.contract_address.clone(),
            session,
            pinning: Box::new(pinning),
            challenge_ledger: config.consume_challenge.then(ChallengeLedger::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const SECRET: &str = "complex_password_at_least_32_characters_long";

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("NFT_CONTRACT_ADDRESS", "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            ("SECRET_COOKIE_PASSWORD", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(
            config.contract_address,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(config.session_secret, SECRET.as_bytes());
        assert!(!config.production);
        assert_eq!(config.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
        assert!(!config.consume_challenge);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.pinata_api_url, DEFAULT_PINATA_API_URL);
        assert!(config.pinata_credentials.is_none());
    }

    #[test]
    fn test_full_configuration() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("NFT_CONTRACT_ADDRESS", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            ("SECRET_COOKIE_PASSWORD", SECRET),
            ("LAKARCADE_ENV", "production"),
            ("SESSION_TTL_SECS", "600"),
            ("CONSUME_CHALLENGE", "true"),
            ("MAX_BODY_BYTES", "1024"),
            ("PINATA_API_URL", "http://localhost:9999"),
            ("PINATA_API_KEY", "key"),
            ("PINATA_SECRET_API_KEY", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert!(config.production);
        assert_eq!(config.session_ttl_secs, 600);
        assert!(config.consume_challenge);
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.pinata_api_url, "http://localhost:9999");
        let credentials = config.pinata_credentials.unwrap();
        assert_eq!(credentials.api_key, "key");
        assert_eq!(credentials.secret_api_key, "secret");
    }

    /// 開発環境では秘密が未設定でもランダム生成で起動できることを確認
    #[test]
    fn test_random_secret_in_development() {
        let config = GatewayConfig::from_lookup(lookup(&[(
            "NFT_CONTRACT_ADDRESS",
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        )]))
        .unwrap();
        assert_eq!(config.session_secret.len(), MIN_SESSION_SECRET_LEN);
    }

    #[test]
    fn test_invalid_configuration() {
        // コントラクトアドレス未設定
        assert!(GatewayConfig::from_lookup(lookup(&[("SECRET_COOKIE_PASSWORD", SECRET)])).is_err());

        // 不正なコントラクトアドレス
        assert!(GatewayConfig::from_lookup(lookup(&[
            ("NFT_CONTRACT_ADDRESS", "0xABC"),
            ("SECRET_COOKIE_PASSWORD", SECRET),
        ]))
        .is_err());

        // 短すぎる秘密
        assert!(GatewayConfig::from_lookup(lookup(&[
            ("NFT_CONTRACT_ADDRESS", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            ("SECRET_COOKIE_PASSWORD", "short"),
        ]))
        .is_err());

        // 本番環境で秘密未設定
        assert!(GatewayConfig::from_lookup(lookup(&[
            ("NFT_CONTRACT_ADDRESS", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            ("LAKARCADE_ENV", "production"),
        ]))
        .is_err());

        // 数値でないTTL
        assert!(GatewayConfig::from_lookup(lookup(&[
            ("NFT_CONTRACT_ADDRESS", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            ("SECRET_COOKIE_PASSWORD", SECRET),
            ("SESSION_TTL_SECS", "two weeks"),
        ]))
        .is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
