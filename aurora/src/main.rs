// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Binary entry point: wires configuration, logging, the manifest, and
//! every service into the pipeline engine, then runs it against the CLI
//! root directory.

use std::sync::Arc;

use tracing::{error, info};

use aurora_bootstrap::{parse_cli, ExitCode, ShutdownCoordinator};
use aurora_domain::error::AuroraError;
use aurora_domain::repositories::Manifest;

use aurora::application::services::{LibraryScanner, Pipeline};
use aurora::application::stages::{
    BilingualSubtitleStage, CorrectSubtitleStage, DenoiseAudioStage, ExtractAudioStage,
    MovieStage, ScrapeStage, StageContext, TranscribeAudioStage, TranslateSubtitleStage,
    VideoStageRunner,
};
use aurora::infrastructure::adapters::{
    DemucsDenoiser, FfmpegAudioExtractor, QualityChecker, WhisperTranscriber,
};
use aurora::infrastructure::config::{self, AppConfig};
use aurora::infrastructure::logging;
use aurora::infrastructure::repositories::{schema, SqliteManifest};
use aurora::infrastructure::services::CodeExtractor;

#[tokio::main]
async fn main() {
    let cli = parse_cli();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            ExitCode::ConfigError.exit();
        }
    };

    let _log_guard = match logging::init_logging(&config.log_dir, cli.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Logging setup failed: {}", err);
            ExitCode::Failure.exit();
        }
    };

    let shutdown = ShutdownCoordinator::new();
    shutdown.listen_for_signals();

    match run(&cli.root, config, shutdown).await {
        Ok(()) => ExitCode::Success.exit(),
        Err(AuroraError::Cancelled(reason)) => {
            info!("Run interrupted: {}", reason);
            ExitCode::Interrupted.exit()
        }
        Err(err @ AuroraError::InvalidConfiguration(_)) => {
            error!("{}", err);
            ExitCode::ConfigError.exit()
        }
        Err(err) => {
            error!("Pipeline run failed: {}", err);
            ExitCode::Failure.exit()
        }
    }
}

async fn run(
    root: &std::path::Path,
    config: AppConfig,
    shutdown: ShutdownCoordinator,
) -> Result<(), AuroraError> {
    let pool = schema::open_manifest_database(&config.database_url).await?;
    let manifest: Arc<dyn Manifest> = Arc::new(SqliteManifest::new(pool));

    let scrapers = config::build_scrapers(&config.scrapers);
    let extractor = Arc::new(CodeExtractor::new(
        scrapers.clone(),
        config.data_dir.join("prefix.txt"),
        config.data_dir.join("noise.txt"),
    )?);
    let translator = Arc::new(config::build_orchestrator(&config.translate_orchestrator));

    // The quality judge is the first configured checker provider; with
    // none configured the LLM gate always passes.
    let judge = config
        .transcriber
        .quality_checker
        .providers
        .first()
        .and_then(|provider_config| match config::build_provider(provider_config) {
            Ok(provider) => Some(provider),
            Err(err) => {
                error!("Quality judge unavailable: {}", err);
                None
            }
        });
    let quality = Arc::new(QualityChecker::new(
        judge,
        config.transcriber.quality_checker.interval,
    ));

    let movie_stages: Vec<Arc<dyn MovieStage>> = vec![Arc::new(ScrapeStage::new(scrapers.clone()))];
    let video_stages: Vec<Arc<dyn VideoStageRunner>> = vec![
        Arc::new(ExtractAudioStage::new(Arc::new(FfmpegAudioExtractor::new(
            config.tools.ffmpeg.clone(),
            config.tools.ffprobe.clone(),
        )))),
        Arc::new(DenoiseAudioStage::new(Arc::new(DemucsDenoiser::new(
            config.tools.demucs.clone(),
        )))),
        Arc::new(TranscribeAudioStage::new(
            Arc::new(WhisperTranscriber::new(
                config.tools.whisper.clone(),
                config.transcriber.config.model_size.clone(),
                config.transcriber.config.language.clone(),
            )),
            quality,
            config.transcriber.quality_checker.max_retries,
        )),
        Arc::new(CorrectSubtitleStage),
        Arc::new(TranslateSubtitleStage),
        Arc::new(BilingualSubtitleStage),
    ];

    let scanner = LibraryScanner::new(manifest.clone(), extractor);
    let context = StageContext {
        manifest,
        translator,
        output_dir: config.output_dir.clone(),
    };

    let pipeline = Pipeline::new(movie_stages, video_stages, scanner, context, shutdown.token())?;
    pipeline.run(root).await
}
