//! ssender CLI
//!
//! 解析 RSS 文件，将新条目推送到已启用的渠道，并记录到账本

use anyhow::Result;
use clap::Parser;
use ssender::cli::{handle_run, RunArgs};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ssender=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let args = RunArgs::parse();
    info!("Run processing");
    handle_run(args)?;
    info!("End processing");
    Ok(())
}
