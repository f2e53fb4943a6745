//! # GET/POST /api/verify
//!
//! チャレンジ発行と、所有確認済みNFTメタデータのピン留め。

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lakarcade_types::{NftMetadata, VerifyNftRequest};

use super::{authorize, reject_body, require_signed, respond_pinned, MISSING_FORM_DATA};
use crate::auth::issue_challenge;
use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::session::{unix_now, SessionData};

/// GET /api/verify — チャレンジ発行。
///
/// 新しいチャレンジをセッションCookieに保存し、同じ内容をJSONで返す。
/// 既存のチャレンジは上書きされる。
pub async fn handle_issue_challenge(
    State(state): State<Arc<GatewayState>>,
) -> Result<Response, GatewayError> {
    let now = unix_now()?;
    let mut session = SessionData::default();
    let challenge = issue_challenge(
        &mut session,
        &state.contract_address,
        now,
        state.session.ttl_secs(),
    );
    let cookie = state.session.set_cookie(&session)?;

    tracing::debug!(challenge_id = %challenge.id, "チャレンジを発行しました");
    Ok(([(SET_COOKIE, cookie)], Json(challenge)).into_response())
}

/// POST /api/verify — 所有確認 + NFTメタデータのピン留め。
///
/// 必須フィールド検証 → 署名検証 → Pinataへ転送の順に処理し、
/// Pinataのレスポンスをそのまま返す。
pub async fn handle_verify_nft(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    payload: Result<Json<VerifyNftRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(body) = payload.map_err(reject_body)?;

    let nft = body
        .nft
        .filter(NftMetadata::has_required_fields)
        .ok_or_else(|| GatewayError::Validation(MISSING_FORM_DATA.to_string()))?;
    let (address, signature) = require_signed(body.address, body.signature)?;

    let challenge = authorize(&state, &headers, &address, &signature)?;

    let pin_name = uuid::Uuid::new_v4().to_string();
    let pinned = state.pinning.pin_json(&pin_name, &nft).await?;

    tracing::info!(
        address = %address,
        challenge_id = %challenge.id,
        pin_name = %pin_name,
        "NFTメタデータをピン留めしました"
    );
    Ok(respond_pinned(&state, pinned))
}
