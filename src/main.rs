// src/main.rs
use anyhow::Context;
use clap::Parser;
use crm_outreach::{
    CampaignOrchestrator, CancellationFlag, CommandLineInput, CrmRepository, HubspotClient,
    Notifier, OutreachConfig, RunReport, SparkPostNotifier, TokioClock,
};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

/// Sets up logging: stderr at the requested level, a debug log file in the temp dir.
fn setup_logging(verbose: bool) -> anyhow::Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("crm_outreach.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)
        .with_context(|| format!("opening log file {}", log_file_path.display()))?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stderr", Box::new(stderr_appender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .logger(Logger::builder().build("reqwest", LevelFilter::Info))
        .logger(Logger::builder().build("hyper_util", LevelFilter::Info))
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(LevelFilter::Debug),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Builds the clients and runs the campaign once.
async fn execute_campaign(config: OutreachConfig, cancellation: CancellationFlag) -> RunReport {
    let limiter = Arc::new(config.campaign.pacing.rate_limiter(Arc::new(TokioClock)));

    let crm = match HubspotClient::new(
        &config.crm_token,
        config.crm_base_url.clone(),
        limiter.clone(),
    ) {
        Ok(client) => client
            .with_segment_property(config.campaign.segment_property.clone())
            .with_request_timeout(config.request_timeout),
        Err(err) => return RunReport::aborted(Default::default(), err),
    };
    let notifier =
        match SparkPostNotifier::new(&config.mail_token, config.mail_base_url.clone(), limiter.clone()) {
            Ok(notifier) => notifier.with_request_timeout(config.request_timeout),
            Err(err) => return RunReport::aborted(Default::default(), err),
        };

    let crm: Arc<dyn CrmRepository> = Arc::new(crm);
    let notifier: Arc<dyn Notifier> = Arc::new(notifier);

    CampaignOrchestrator::new(crm, notifier, limiter, config.campaign)
        .with_failure_policy(config.failure_policy)
        .with_cancellation(cancellation)
        .run()
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CommandLineInput::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Could not set up logging: {:#}", e);
    }

    let config = match OutreachConfig::resolve(cli) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };
    log::debug!(
        "CRM token {}, mail token {}, policy {:?}, request timeout {:?}",
        config.crm_token,
        config.mail_token,
        config.failure_policy,
        config.request_timeout
    );

    let cancellation = CancellationFlag::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; finishing the current step");
            on_interrupt.cancel();
        }
    });

    let report = execute_campaign(config, cancellation).await;

    println!("{}", report.tally);
    if let Some(err) = report.error() {
        log::error!("Run aborted: {}", err);
        if err.is_transient() {
            log::info!(
                "The failure may be temporary. Running again is safe: contacted organizations are skipped."
            );
        }
    } else if report.tally.failed > 0 {
        log::warn!("{} organization(s) failed", report.tally.failed);
    }

    ExitCode::from(report.exit_code() as u8)
}
