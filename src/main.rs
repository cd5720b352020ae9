//! layout2epub - 命令行入口
//!
//! 提交一个排版包，轮询状态，按需自动确认评审，最后写出 EPUB

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use layout2epub::application::{
    build_phases, ApproveAltTexts, ApproveAltTextsHandler, ApproveLangMarkup,
    ApproveLangMarkupHandler, GetPendingDetails, GetPendingDetailsHandler, GetResult,
    GetResultHandler, ImageDescriberPort, LanguageDetectorPort, PendingReviewStores,
    SubmitPackage, SubmitPackageHandler,
};
use layout2epub::config::{load_config_from_path, print_config, AppConfig};
use layout2epub::domain::processing::{metadata_keys, FileId, ProcessingStatus, ReviewKind};
use layout2epub::infrastructure::adapters::{
    CachedImageDescriber, FakeImageDescriber, FakeLanguageDetector, HttpImageDescriber,
    HttpLanguageDetector,
};
use layout2epub::infrastructure::events::EventPublisher;
use layout2epub::infrastructure::memory::{InMemoryPendingReviewStore, InMemoryResultStore};
use layout2epub::infrastructure::persistence::SledDescriptionCache;
use layout2epub::infrastructure::worker::PipelineOrchestrator;

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "layout2epub", version, about = "Convert a layout package into an EPUB")]
struct Cli {
    /// 排版包路径
    package: PathBuf,

    /// 输出路径，默认与输入同名的 .epub
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    creator: Option<String>,

    #[arg(long)]
    publisher: Option<String>,

    #[arg(long)]
    language: Option<String>,

    #[arg(long)]
    identifier: Option<String>,

    /// 原样接受替代文本与语言标记提议
    #[arg(long)]
    auto_approve: bool,

    /// 等待单次状态变化的最长时间（秒）
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

impl Cli {
    fn metadata(&self) -> BTreeMap<String, String> {
        [
            (metadata_keys::TITLE, &self.title),
            (metadata_keys::CREATOR, &self.creator),
            (metadata_keys::PUBLISHER, &self.publisher),
            (metadata_keys::LANGUAGE, &self.language),
            (metadata_keys::IDENTIFIER, &self.identifier),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
        .collect()
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.package.with_extension("epub"))
    }
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},layout2epub={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_describer(config: &AppConfig) -> anyhow::Result<Arc<dyn ImageDescriberPort>> {
    if !config.vision.enabled {
        tracing::info!("Vision provider disabled, alt texts will not be proposed");
        return Ok(Arc::new(FakeImageDescriber::silent()));
    }

    let http: Arc<dyn ImageDescriberPort> =
        Arc::new(HttpImageDescriber::new(config.vision.chat_config())?);
    if !config.cache.enabled {
        return Ok(http);
    }

    if let Some(parent) = config.cache.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let cache = SledDescriptionCache::new(&config.cache.sled_config())?;
    Ok(Arc::new(CachedImageDescriber::new(http, cache.arc())))
}

fn build_detector(config: &AppConfig) -> anyhow::Result<Arc<dyn LanguageDetectorPort>> {
    if !config.language.enabled {
        tracing::info!("Language provider disabled, no language markup will be proposed");
        return Ok(Arc::new(FakeLanguageDetector::silent()));
    }
    Ok(Arc::new(HttpLanguageDetector::new(
        config.language.chat_config(),
    )?))
}

/// 流水线停住时的退出码
const EXIT_PARKED: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    print_config(&config);

    let bytes = tokio::fs::read(&cli.package)
        .await
        .with_context(|| format!("Failed to read {}", cli.package.display()))?;

    // 存储
    let results = Arc::new(InMemoryResultStore::new());
    let stores = PendingReviewStores {
        metadata: Arc::new(InMemoryPendingReviewStore::new(ReviewKind::Metadata)),
        alt_texts: Arc::new(InMemoryPendingReviewStore::new(ReviewKind::AltTexts)),
        lang_markup: Arc::new(InMemoryPendingReviewStore::new(ReviewKind::LangMarkup)),
    };
    let event_publisher = Arc::new(EventPublisher::new());

    // 流水线
    let phases = build_phases(
        &config.pipeline.phase_settings(),
        build_describer(&config)?,
        build_detector(&config)?,
    );
    let orchestrator = PipelineOrchestrator::start(
        phases,
        results.clone(),
        stores.clone(),
        event_publisher,
        config.pipeline.orchestrator_config(),
    );

    let submit = SubmitPackageHandler::new(orchestrator.clone(), config.metadata.clone());
    let response = submit
        .handle(SubmitPackage {
            original_filename: cli
                .package
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default(),
            content_type: "application/zip".to_string(),
            bytes,
            metadata: cli.metadata(),
        })
        .await?;
    let file_id = response.file_id;

    let outcome = drive(&cli, file_id, &orchestrator, &results, &stores).await;
    orchestrator.shutdown().await;

    match outcome? {
        Some(payload) => {
            let output = cli.output_path();
            tokio::fs::write(&output, &payload)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(file_id = %file_id, output = %output.display(), "EPUB written");
            Ok(())
        }
        None => std::process::exit(EXIT_PARKED),
    }
}

/// 推进到终态；停在评审时返回 Ok(None)
async fn drive(
    cli: &Cli,
    file_id: FileId,
    orchestrator: &Arc<PipelineOrchestrator>,
    results: &Arc<InMemoryResultStore>,
    stores: &PendingReviewStores,
) -> anyhow::Result<Option<Vec<u8>>> {
    let timeout = Duration::from_secs(cli.timeout_secs);
    let alt_texts = ApproveAltTextsHandler::new(
        stores.alt_texts.clone(),
        results.clone(),
        orchestrator.clone(),
    );
    let lang_markup = ApproveLangMarkupHandler::new(
        stores.lang_markup.clone(),
        results.clone(),
        orchestrator.clone(),
    );
    let details = GetPendingDetailsHandler::new(stores.clone(), results.clone());

    loop {
        let status = orchestrator.wait_until_settled(&file_id, timeout).await;
        match status {
            Some(ProcessingStatus::Ready) => {
                let result = GetResultHandler::new(results.clone())
                    .handle(GetResult { file_id })?
                    .and_then(|result| result.payload);
                return result.map(Some).context("Ready result has no payload");
            }
            Some(ProcessingStatus::Error) => {
                let message = GetResultHandler::new(results.clone())
                    .handle(GetResult { file_id })?
                    .and_then(|result| result.error)
                    .unwrap_or_default();
                bail!("Conversion failed: {}", message);
            }
            Some(ProcessingStatus::AwaitingAltTexts) if cli.auto_approve => {
                alt_texts
                    .handle(ApproveAltTexts {
                        file_id,
                        edits: Vec::new(),
                    })
                    .await?;
            }
            Some(ProcessingStatus::AwaitingLangMarkupReview) if cli.auto_approve => {
                lang_markup
                    .handle(ApproveLangMarkup {
                        file_id,
                        edits: Vec::new(),
                    })
                    .await?;
            }
            Some(status) if status.is_awaiting_review() => {
                let pending = details.handle(GetPendingDetails { file_id })?;
                eprintln!(
                    "{} is waiting for review ({}): {}",
                    file_id,
                    pending.kind.as_str(),
                    serde_json::to_string(&pending.details)?
                );
                return Ok(None);
            }
            Some(_) => bail!("Timed out waiting for {}", file_id),
            None => bail!("Unknown file id {}", file_id),
        }
    }
}
