//! # Lakarcade 暗号処理
//!
//! ウォレット所有確認とセッションCookieの保護に使う暗号プリミティブ。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | メッセージハッシュ | Keccak-256 (`personal_sign` 形式) |
//! | 署名・公開鍵復元 | secp256k1 ECDSA (recoverable) |
//! | アドレス表記 | EIP-55 チェックサム |
//! | 鍵導出 | HKDF-SHA256 |
//! | Cookie暗号化 | AES-256-GCM |

pub mod eth;
pub mod seal;

use sha3::{Digest, Keccak256};

pub use eth::{
    address_from_verifying_key, addresses_match, format_address, parse_address,
    parse_signature, personal_message_digest, recover_address, sign_personal_message,
    to_checksum_address, Address,
};
pub use k256::ecdsa::{
    SigningKey as Secp256k1SigningKey, VerifyingKey as Secp256k1VerifyingKey,
};
pub use seal::{derive_session_key, seal, unseal, SymmetricKey};

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// hex文字列として解釈できない
    #[error("malformed hex string: {0}")]
    MalformedHex(String),
    /// 署名長が65バイト（または64バイトのEIP-2098形式）でない
    #[error("signature must be 65 bytes (or 64 bytes compact), got {0}")]
    InvalidSignatureLength(usize),
    /// r, s がsecp256k1のスカラーとして不正
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    /// vが0, 1, 27, 28のいずれでもない
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    /// 公開鍵の復元に失敗
    #[error("failed to recover public key from signature")]
    RecoveryFailed,
    /// 署名生成に失敗
    #[error("failed to sign message: {0}")]
    SigningFailed(String),
    /// 20バイトのアドレスとして解釈できない
    #[error("malformed address: {0}")]
    MalformedAddress(String),
    /// HKDF鍵導出エラー
    #[error("HKDF key derivation failed: {0}")]
    HkdfError(String),
    /// AES-GCM暗号化エラー
    #[error("AES-GCM encryption failed")]
    EncryptError,
    /// AES-GCM復号エラー（改ざん・鍵不一致を含む）
    #[error("AES-GCM decryption failed")]
    DecryptError,
}

/// Keccak-256ハッシュ計算。
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let result = Keccak256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
