//! Armory - 市场后端函数网关
//!
//! 一组相互独立、无状态的 HTTP 函数，统一挂载在一个轻量网关下。
//!
//! # 功能特性
//!
//! - 枪支图片识别（OpenAI 视觉模型）
//! - 私信发送、删除和会话查询（Supabase）
//! - 配置值查询
//! - 新闻搜索代理（SerpAPI）
//! - 所有函数统一的 CORS 预检和错误信封
//!
//! # 命令行接口
//!
//! - `serve`: 启动网关
//! - `test`: 向本地网关的某个函数发送测试请求

mod commands;
mod config;
mod gateway;
mod providers;
mod store;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Armory CLI
#[derive(Parser)]
#[command(name = "armory")]
#[command(about = "Stateless HTTP function gateway", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 可用的命令
#[derive(Subcommand)]
enum Commands {
    /// 启动网关服务器
    Serve,
    /// 向本地服务器的函数发送测试请求
    Test {
        /// 函数名，如 get-config
        function: String,
        /// JSON 请求体（默认使用示例请求体）
        #[arg(short, long)]
        body: Option<String>,
        /// 作为 Authorization: Bearer 发送的 token
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    if let Ok(dotenv_path) = std::env::var("ARMORY_ENV_FILE") {
        dotenvy::from_path(&dotenv_path).ok();
    } else {
        dotenvy::dotenv().ok();
    }

    // 初始化日志系统
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "armory=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    // 解析命令行参数和配置
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // 执行相应的命令
    match cli.command {
        Commands::Serve => commands::serve_command(config).await,
        Commands::Test {
            function,
            body,
            token,
        } => commands::test_command(config, function, body, token).await,
    }
}
