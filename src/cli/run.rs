//! 主流程：读取配置 -> 解析 feed -> 初始化或分发

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::feed;
use crate::notification::{initialize, NotificationBuilder, RunReport, RunState};
use crate::store::{DeliveryStore, JsonFileStore};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "ssender")]
#[command(about = "Send new RSS items to Telegram and VK, once per item")]
#[command(version)]
pub struct RunArgs {
    /// 要解析的 RSS 文件
    #[arg(long, short = 'f', value_name = "FILE")]
    pub fileparse: PathBuf,

    /// 配置文件路径
    #[arg(long, short = 'c', value_name = "FILE")]
    pub configpath: Option<PathBuf>,

    /// 用当前文件初始化账本，不发送
    #[arg(long, short = 'i')]
    pub initdb: bool,

    /// 只打印将要发送的条目
    #[arg(long)]
    pub dry_run: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// initdb 输出
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub initialized: usize,
    pub total: usize,
}

/// 处理一次运行
pub fn handle_run(args: RunArgs) -> Result<()> {
    let config_path = Config::resolve_path(args.configpath);
    info!(path = %config_path.display(), "Config from");
    let config = Config::load(&config_path).context("config stage failed")?;
    config.validate().context("config stage failed")?;

    info!(path = %args.fileparse.display(), "Parse file");
    let items = feed::parse_file(&args.fileparse).context("parse stage failed")?;

    let mut store = JsonFileStore::open_with(config.db_path(), &config.bucket, config.lock_timeout())
        .context("store stage failed")?;

    if args.initdb {
        let initialized = initialize(&items, &mut store).context("store stage failed")?;
        let output = InitOutput {
            initialized,
            total: store.len().context("store stage failed")?,
        };
        if args.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Initialized {} items ({} recorded)", output.initialized, output.total);
        }
        return Ok(());
    }

    let dispatcher = NotificationBuilder::new(&config).dry_run(args.dry_run).build()?;
    let report = dispatcher.run(&items, &mut store)?;
    print_report(&report, args.json)?;
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match report.state {
        RunState::NothingNew => println!("No new items ({} in feed)", report.feed),
        RunState::DryRun => println!("{} new items (dry-run, nothing sent)", report.delta),
        RunState::Done => println!(
            "Sent {} new items ({} sends, {} skipped)",
            report.committed, report.sent, report.skipped
        ),
    }
    Ok(())
}
