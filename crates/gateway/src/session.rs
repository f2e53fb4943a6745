//! # セッションストア
//!
//! 発行済みチャレンジをサーバー秘密で暗号化したCookie（`nft-auth-session`）に保持する。
//! サーバー側に状態を持たないため、リクエスト間のロックは不要。
//!
//! Cookie値: `base64url(nonce || AES-256-GCM(JSON(SessionData)))`
//!
//! 復号できないCookie・期限切れのCookieは空のセッションとして扱う。

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use base64::Engine;
use lakarcade_crypto::{CryptoError, SymmetricKey};
use lakarcade_types::Challenge;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// セッションCookie名
pub const SESSION_COOKIE_NAME: &str = "nft-auth-session";

/// Cookieに格納するセッション内容。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// 発行済みの未検証チャレンジ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
    /// セッション有効期限（UNIX秒）
    #[serde(default)]
    pub expires_at: u64,
}

/// base64url（パディングなし）エンジン
fn b64url() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
}

/// 現在時刻（UNIX秒）。
pub fn unix_now() -> Result<u64, GatewayError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| GatewayError::Internal(format!("時刻取得失敗: {e}")))
}

/// セッションCookieのエンコーダ/デコーダ。
pub struct SessionCodec {
    key: SymmetricKey,
    secure: bool,
    ttl_secs: u64,
}

impl SessionCodec {
    /// サーバー秘密からCookie封印鍵を導出して構築する。
    /// `secure` がtrueの場合、Cookieに `Secure` 属性を付与する（本番環境）。
    pub fn new(secret: &[u8], secure: bool, ttl_secs: u64) -> Result<Self, CryptoError> {
        Ok(Self {
            key: lakarcade_crypto::derive_session_key(secret)?,
            secure,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// セッションを封印してCookie値にする。
    pub fn encode(&self, session: &SessionData) -> Result<String, GatewayError> {
        let json = serde_json::to_vec(session)
            .map_err(|e| GatewayError::Internal(format!("セッションのシリアライズに失敗: {e}")))?;
        let sealed = lakarcade_crypto::seal(&self.key, &json)
            .map_err(|e| GatewayError::Internal(format!("セッションの暗号化に失敗: {e}")))?;
        Ok(b64url().encode(sealed))
    }

    /// Cookie値を復号する。不正・期限切れの場合はNone。
    pub fn decode(&self, value: &str, now: u64) -> Option<SessionData> {
        let sealed = b64url().decode(value).ok()?;
        let json = match lakarcade_crypto::unseal(&self.key, &sealed) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!(error = %e, "セッションCookieを復号できません");
                return None;
            }
        };
        let session: SessionData = serde_json::from_slice(&json).ok()?;
        if session.expires_at <= now {
            tracing::debug!(expires_at = session.expires_at, "セッションの有効期限切れ");
            return None;
        }
        Some(session)
    }

    /// リクエストヘッダからセッションを読み出す。該当Cookieがなければ空のセッション。
    pub fn read(&self, headers: &HeaderMap, now: u64) -> SessionData {
        cookie_values(headers, SESSION_COOKIE_NAME)
            .find_map(|value| self.decode(value, now))
            .unwrap_or_default()
    }

    /// セッションを保存する `Set-Cookie` ヘッダ値を構築する。
    pub fn set_cookie(&self, session: &SessionData) -> Result<HeaderValue, GatewayError> {
        let value = self.encode(session)?;
        let secure = if self.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{secure}",
            self.ttl_secs
        );
        HeaderValue::from_str(&cookie)
            .map_err(|e| GatewayError::Internal(format!("Set-Cookieヘッダの構築に失敗: {e}")))
    }

    /// セッションを破棄する `Set-Cookie` ヘッダ値。
    pub fn clear_cookie(&self) -> HeaderValue {
        if self.secure {
            HeaderValue::from_static(
                "nft-auth-session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax; Secure",
            )
        } else {
            HeaderValue::from_static("nft-auth-session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
        }
    }
}

/// `Cookie` ヘッダ群から指定名のCookie値を列挙する。
fn cookie_values<'a>(headers: &'a HeaderMap, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(COOKIE)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(move |pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}
