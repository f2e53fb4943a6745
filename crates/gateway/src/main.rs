//! # Lakarcade NFT Upload Gateway
//!
//! NFTメタデータ・画像をIPFS（Pinata）へピン留めする前に、
//! リクエスト送信者がウォレットを所有していることを `personal_sign` 署名で確認する。
//!
//! ## 役割
//! - チャレンジ発行（暗号化セッションCookieに保存）
//! - 署名者アドレスの復元と照合
//! - Pinataへのペイロード転送（レスポンスは素通し）
//!
//! ## API エンドポイント
//! - `GET /api/verify` — チャレンジ発行
//! - `POST /api/verify` — 所有確認 + NFTメタデータのピン留め
//! - `POST /api/verify-image` — 所有確認 + 画像のピン留め

mod auth;
mod config;
mod endpoints;
mod error;
mod pinning;
mod session;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;

use crate::config::{GatewayConfig, GatewayState};
use crate::endpoints::{handle_issue_challenge, handle_verify_image, handle_verify_nft};

/// axumルーターを構築する。
pub(crate) fn build_router(state: Arc<GatewayState>, max_body_bytes: usize) -> axum::Router {
    axum::Router::new()
        .route(
            "/api/verify",
            axum::routing::get(handle_issue_challenge).post(handle_verify_nft),
        )
        .route("/api/verify-image", axum::routing::post(handle_verify_image))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    config.log_summary();

    let state = Arc::new(GatewayState::from_config(&config, reqwest::Client::new())?);
    let app = build_router(state, config.max_body_bytes);

    tracing::info!("Gatewayを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
