//! # Lakarcade CLI
//!
//! ウォレット鍵の確認・署名と、Gateway経由のアップロードを行う。
//!
//! ## コマンド
//! - `address` — 秘密鍵からEIP-55アドレスを表示
//! - `sign` — 任意メッセージに `personal_sign` 署名
//! - `challenge` — Gatewayからチャレンジを取得して表示
//! - `pin-metadata` — NFTメタデータJSONをピン留め
//! - `pin-image` — 画像ファイルをピン留め

mod client;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lakarcade_crypto::sign_personal_message;
use lakarcade_types::{NftMetadata, PinResponse};

use crate::client::{parse_signing_key, wallet_address, GatewayClient, ImageFile};

#[derive(Parser)]
#[command(name = "lakarcade-cli", version, about = "Lakarcade upload gateway client")]
struct Cli {
    /// GatewayのベースURL
    #[arg(
        long,
        global = true,
        env = "LAKARCADE_GATEWAY_URL",
        default_value = "http://localhost:3000"
    )]
    gateway: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the wallet address for a private key
    Address {
        /// hex秘密鍵
        #[arg(long, env = "LAKARCADE_PRIVATE_KEY", hide_env_values = true)]
        key: String,
    },
    /// Sign a message with personal_sign
    Sign {
        #[arg(long, env = "LAKARCADE_PRIVATE_KEY", hide_env_values = true)]
        key: String,
        /// 署名するメッセージ（UTF-8）
        #[arg(long)]
        message: String,
    },
    /// Fetch a challenge from the gateway
    Challenge,
    /// Pin NFT metadata through the gateway
    PinMetadata {
        #[arg(long, env = "LAKARCADE_PRIVATE_KEY", hide_env_values = true)]
        key: String,
        /// NFTメタデータJSONファイル
        #[arg(long, value_name = "JSON")]
        file: PathBuf,
    },
    /// Pin an image through the gateway
    PinImage {
        #[arg(long, env = "LAKARCADE_PRIVATE_KEY", hide_env_values = true)]
        key: String,
        #[arg(long, value_name = "IMAGE")]
        file: PathBuf,
        /// MIMEタイプ（省略時は拡張子から推定）
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let gateway = GatewayClient::new(&cli.gateway);

    match cli.command {
        Commands::Address { key } => {
            let key = parse_signing_key(&key)?;
            println!("{}", wallet_address(&key));
        }
        Commands::Sign { key, message } => {
            let key = parse_signing_key(&key)?;
            println!("{}", sign_personal_message(&key, message.as_bytes())?);
        }
        Commands::Challenge => {
            let session = gateway.fetch_challenge().await?;
            println!("{}", serde_json::to_string_pretty(&session.challenge)?);
            eprintln!("Cookie: {}", session.cookie);
        }
        Commands::PinMetadata { key, file } => {
            let key = parse_signing_key(&key)?;
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("{} の読み込みに失敗", file.display()))?;
            let nft: NftMetadata = serde_json::from_str(&raw)
                .with_context(|| format!("{} はNFTメタデータJSONではありません", file.display()))?;
            let pinned = gateway.pin_metadata(&key, nft).await?;
            print_pinned(&pinned);
        }
        Commands::PinImage {
            key,
            file,
            content_type,
        } => {
            let key = parse_signing_key(&key)?;
            let image = ImageFile::load(&file, content_type)
                .with_context(|| format!("{} の読み込みに失敗", file.display()))?;
            eprintln!(
                "{} ({}, {} bytes) をアップロードします",
                image.filename,
                image.content_type,
                image.bytes.len()
            );
            let pinned = gateway.pin_image(&key, image).await?;
            print_pinned(&pinned);
        }
    }

    Ok(())
}

fn print_pinned(pinned: &PinResponse) {
    println!("IpfsHash:  {}", pinned.ipfs_hash);
    println!("PinSize:   {}", pinned.pin_size);
    if !pinned.timestamp.is_empty() {
        println!("Timestamp: {}", pinned.timestamp);
    }
    println!("URI:       ipfs://{}", pinned.ipfs_hash);
}
