use anyhow::Result;
use clap::Parser;
use slide_tiler::{logger, App, Config};
use std::path::PathBuf;
use tracing::error;

/// 使用 PyHIST 容器对图像切片
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// 输入的 ZIP 文件或单张图像
    #[arg(long)]
    input: PathBuf,

    /// 输出的切片 ZIP 文件
    #[arg(long = "output_zip", visible_alias = "output-zip")]
    output_zip: PathBuf,

    /// TOML 配置文件（也可通过 TILER_CONFIG 指定）
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    // 初始化日志
    logger::init(&config.log_file)?;

    // 初始化并运行应用
    let app = App::initialize(config)?;
    if let Err(e) = app.run(&cli.input, &cli.output_zip).await {
        error!("❌ 运行中止: {}", e);
        return Err(e.into());
    }

    Ok(())
}
