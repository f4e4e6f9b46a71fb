use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use remotesync::config::{self, Preferences};
use remotesync::logging::{init_logging, log_dir};
use remotesync::session::ProgressListener;
use remotesync::{
    ComparisonServiceFilter, ComparisonSummary, OperatorBackend, Session, StorageConfig,
    TransferItem,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(name = "remotesync")]
#[clap(about = "Compare local folders with remote storage", long_about = None)]
struct Cli {
    /// 配置目录，默认使用系统配置目录下的 remotesync
    #[clap(long, global = true)]
    config_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 比较本地目录与远程目录
    Compare {
        /// 存储配置 JSON 文件
        #[clap(long)]
        storage: PathBuf,
        /// 本地目录
        #[clap(long)]
        local: PathBuf,
        /// 远程目录，默认为存储根目录
        #[clap(long)]
        remote: Option<String>,
        /// 比较校验和
        #[clap(long)]
        hash: bool,
        /// 比较文件大小
        #[clap(long)]
        size: bool,
    },
}

/// 进度消息输出到标准错误
struct StderrProgress;

impl ProgressListener for StderrProgress {
    fn message(&self, message: &str) {
        eprintln!("{}", message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = cli.config_dir.unwrap_or_else(config::config_dir);
    let preferences = Preferences::load(&config_dir);
    init_logging(&log_dir(&config_dir), &preferences.log);

    match cli.command {
        Command::Compare {
            storage,
            local,
            remote,
            hash,
            size,
        } => compare(preferences, storage, local, remote, hash, size).await,
    }
}

async fn compare(
    preferences: Preferences,
    storage: PathBuf,
    local: PathBuf,
    remote: Option<String>,
    hash: bool,
    size: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(&storage)
        .with_context(|| format!("无法读取存储配置 {:?}", storage))?;
    let storage: StorageConfig =
        serde_json::from_str(&content).with_context(|| format!("存储配置格式错误 {:?}", storage))?;

    let mut host = storage.to_host();
    if let Some(remote) = remote {
        host = host.with_default_path(remote);
    }
    let backend = OperatorBackend::new(storage)
        .with_timeout(Duration::from_secs(preferences.connection.timeout_secs));
    let session = Session::with_preferences(host, backend, preferences.connection.clone());
    let progress: Arc<dyn ProgressListener> = Arc::new(StderrProgress);
    session.add_progress_listener(&progress);

    let mut compare_config = preferences.compare.clone();
    compare_config.hash |= hash;
    compare_config.size |= size;

    session.connect().await?;
    let result = run_compare(&session, &local, compare_config).await;
    session.close().await;

    let summary = result?;
    println!(
        "equal={} notequal={} local={} remote={} failed={}",
        summary.equal_count,
        summary.not_equal_count,
        summary.local_only_count,
        summary.remote_only_count,
        summary.failed_count
    );
    Ok(())
}

async fn run_compare(
    session: &Session<OperatorBackend>,
    local: &std::path::Path,
    config: remotesync::CompareConfig,
) -> Result<ComparisonSummary> {
    let root = session.mount().await?;
    session.message(&format!("比较 {:?} 与 {}", local, session.to_url(&root, false)));

    let items: Vec<TransferItem> = TransferItem::walk(local, &root)
        .await?
        .into_iter()
        .filter(|item| !item.remote.is_directory())
        .collect();

    let filter = ComparisonServiceFilter::with_cache(session, session.cache(), config)?;
    let results = filter.compare_all(&items, session.max_connections()).await;

    for (item, result) in items.iter().zip(&results) {
        match result {
            Ok(verdict) => println!("{}\t{}", verdict, item.remote),
            Err(e) => println!("error\t{}\t{}", item.remote, e),
        }
    }
    Ok(ComparisonSummary::from_results(&results))
}
