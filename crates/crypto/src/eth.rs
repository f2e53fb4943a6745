//! # Ethereum `personal_sign` 署名検証
//!
//! ウォレットが `personal_sign` で生成した署名から署名者アドレスを復元する。
//!
//! 署名対象ダイジェスト:
//! `keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)`

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::{keccak256, CryptoError};

/// 20バイトのEthereumアドレス
pub type Address = [u8; 20];

const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

fn strip_hex_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

fn decode_hex(input: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(strip_hex_prefix(input.trim())).map_err(|e| CryptoError::MalformedHex(e.to_string()))
}

/// `personal_sign` のダイジェストを計算する。
/// メッセージ長はバイト数の10進表記。
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let length = message.len().to_string();
    let mut data =
        Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + length.len() + message.len());
    data.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    data.extend_from_slice(length.as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}

/// RPC形式のhex署名を `(r, s)` とリカバリIDに分解する。
///
/// - 65バイト: `r || s || v`（vは0, 1, 27, 28のいずれか）
/// - 64バイト: EIP-2098コンパクト形式（sの最上位ビットがy parity）
///
/// high-Sの署名は正規化し、y parityを反転して同じ公開鍵が復元されるようにする。
pub fn parse_signature(signature_hex: &str) -> Result<(Signature, RecoveryId), CryptoError> {
    let bytes = decode_hex(signature_hex)?;

    let mut rs = [0u8; 64];
    let parity = match bytes.len() {
        65 => {
            rs.copy_from_slice(&bytes[..64]);
            match bytes[64] {
                v @ (0 | 1) => v,
                v @ (27 | 28) => v - 27,
                other => return Err(CryptoError::InvalidRecoveryId(other)),
            }
        }
        64 => {
            rs.copy_from_slice(&bytes);
            let parity = rs[32] >> 7;
            rs[32] &= 0x7f;
            parity
        }
        len => return Err(CryptoError::InvalidSignatureLength(len)),
    };

    let signature = Signature::from_slice(&rs)
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
    let recovery_id =
        RecoveryId::from_byte(parity).ok_or(CryptoError::InvalidRecoveryId(parity))?;

    match signature.normalize_s() {
        Some(normalized) => Ok((
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        )),
        None => Ok((signature, recovery_id)),
    }
}

/// 公開鍵からEthereumアドレスを導出する。
/// 非圧縮公開鍵（0x04プレフィックスを除く64バイト）のKeccak-256の下位20バイト。
pub fn address_from_verifying_key(verifying_key: &VerifyingKey) -> Address {
    let point = verifying_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// `personal_sign` 署名から署名者アドレスを復元する。
pub fn recover_address(message: &[u8], signature_hex: &str) -> Result<Address, CryptoError> {
    let digest = personal_message_digest(message);
    let (signature, recovery_id) = parse_signature(signature_hex)?;
    let verifying_key = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_from_verifying_key(&verifying_key))
}

/// `personal_sign` 署名を生成する（ウォレット側の処理）。
/// 戻り値は `0x` 付き65バイトhex（v = 27 or 28）。
pub fn sign_personal_message(
    signing_key: &SigningKey,
    message: &[u8],
) -> Result<String, CryptoError> {
    let digest = personal_message_digest(message);
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(&digest)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let mut bytes = Vec::with_capacity(65);
    bytes.extend_from_slice(&signature.to_bytes());
    bytes.push(27 + recovery_id.to_byte());
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// hex文字列（`0x` 任意）を20バイトのアドレスとして解釈する。
pub fn parse_address(input: &str) -> Result<Address, CryptoError> {
    let bytes = decode_hex(input).map_err(|_| CryptoError::MalformedAddress(input.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::MalformedAddress(input.to_string()))
}

/// 小文字hexのアドレス表記（`0x` 付き）。
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

/// EIP-55チェックサム付きアドレス表記。
pub fn to_checksum_address(address: &Address) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// アドレス文字列の比較。大文字小文字（チェックサム表記）と `0x` の有無は区別しない。
pub fn addresses_match(a: &str, b: &str) -> bool {
    strip_hex_prefix(a.trim()).eq_ignore_ascii_case(strip_hex_prefix(b.trim()))
}
