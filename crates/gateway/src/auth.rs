//! # ウォレット所有確認
//!
//! チャレンジの発行と、`personal_sign` 署名による署名者アドレスの照合。
//!
//! 1. `GET /api/verify` で [`issue_challenge`] がチャレンジを発行し、セッションに保存する
//! 2. クライアントはチャレンジのJSONをウォレットで `personal_sign` する
//! 3. `POST` 時に [`verify_ownership`] が署名から復元したアドレスと主張アドレスを照合する
//!
//! チャレンジは既定では検証後も無効化されず、セッション有効期間内は再利用できる。
//! [`ChallengeLedger`] を有効にすると使用済みチャレンジを記録して再利用を拒否する。

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Mutex;

use lakarcade_crypto::{addresses_match, format_address, CryptoError};
use lakarcade_types::Challenge;

use crate::error::GatewayError;
use crate::session::SessionData;

/// ウォレット所有確認の失敗理由。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// セッションにチャレンジがない（GETを経ずにPOSTした、またはセッション期限切れ）
    #[error("Challenge not found in session")]
    MissingChallenge,
    /// 署名を解釈・復元できない
    #[error("Invalid signature: {0}")]
    MalformedSignature(#[from] CryptoError),
    /// 復元したアドレスが主張アドレスと一致しない
    #[error("Wrong Address")]
    AddressMismatch,
    /// 使用済みチャレンジの再利用
    #[error("Challenge has already been used")]
    ChallengeReused,
}

/// 新しいチャレンジを発行してセッションに保存する。
/// セッションの有効期限は `now + ttl_secs` に更新される。
pub fn issue_challenge(
    session: &mut SessionData,
    contract_address: &str,
    now: u64,
    ttl_secs: u64,
) -> Challenge {
    let challenge = Challenge {
        contract_address: contract_address.to_string(),
        id: uuid::Uuid::new_v4().to_string(),
    };
    session.challenge = Some(challenge.clone());
    session.expires_at = now.saturating_add(ttl_secs);
    challenge
}

/// セッション内のチャレンジに対する署名を検証し、署名者が `claimed_address` であることを確認する。
/// 成功時は検証に使ったチャレンジを返す。
pub fn verify_ownership(
    session: &SessionData,
    claimed_address: &str,
    signature: &str,
) -> Result<Challenge, GatewayError> {
    let challenge = session.challenge.as_ref().ok_or(AuthError::MissingChallenge)?;

    let message = challenge
        .signing_message()
        .map_err(|e| GatewayError::Internal(format!("チャレンジのシリアライズに失敗: {e}")))?;

    let recovered = lakarcade_crypto::recover_address(message.as_bytes(), signature)
        .map_err(AuthError::MalformedSignature)?;
    let recovered = format_address(&recovered);

    if !addresses_match(&recovered, claimed_address) {
        tracing::warn!(
            claimed = %claimed_address,
            recovered = %recovered,
            challenge_id = %challenge.id,
            "署名者アドレスが一致しません"
        );
        return Err(AuthError::AddressMismatch.into());
    }

    Ok(challenge.clone())
}

/// 使用済みチャレンジの台帳。
///
/// チャレンジIDをセッション有効期限まで保持し、同じIDの2回目以降の使用を拒否する。
/// 期限切れのエントリは有効期限順のヒープから取り出して掃除する。
#[derive(Default)]
pub struct ChallengeLedger {
    inner: Mutex<LedgerEntries>,
}

#[derive(Default)]
struct LedgerEntries {
    used: HashMap<String, u64>,
    /// (有効期限, チャレンジID) の最小ヒープ
    expiries: BinaryHeap<Reverse<(u64, String)>>,
}

impl LedgerEntries {
    /// 有効期限が `now` 以前のエントリを削除する。
    fn prune(&mut self, now: u64) {
        while let Some(Reverse((expires_at, _))) = self.expiries.peek() {
            if *expires_at > now {
                break;
            }
            if let Some(Reverse((_, id))) = self.expiries.pop() {
                self.used.remove(&id);
            }
        }
    }
}

impl ChallengeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// チャレンジを使用済みとして記録する。既に使用済みなら `ChallengeReused`。
    pub fn consume(&self, challenge_id: &str, expires_at: u64, now: u64) -> Result<(), AuthError> {
        let mut entries = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.prune(now);

        if entries.used.contains_key(challenge_id) {
            return Err(AuthError::ChallengeReused);
        }
        entries.used.insert(challenge_id.to_string(), expires_at);
        entries
            .expiries
            .push(Reverse((expires_at, challenge_id.to_string())));
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|entries| entries.used.len())
            .unwrap_or_default()
    }
}
