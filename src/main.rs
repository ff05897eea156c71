use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};

use kindle_gateway::config::GatewayConfig;
use kindle_gateway::converter::EbookConvert;
use kindle_gateway::mail::SmtpRelay;
use kindle_gateway::pipeline::event::Notification;
use kindle_gateway::pipeline::{EventProcessor, ProcessorDeps, ProcessorSettings};
use kindle_gateway::server;
use kindle_gateway::store::{FsObjectStore, LibSqlPolicyStore};

const USAGE: &str = "usage: kindle-gateway [serve | process <notification.json>...]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "serve".to_string());
    let files: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let config = GatewayConfig::from_env()?;

    match command.as_str() {
        "serve" => serve(&config).await,
        "process" if !files.is_empty() => process_files(&config, &files).await,
        "-h" | "--help" | "help" => {
            eprintln!("{USAGE}");
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

async fn build_processor(config: &GatewayConfig) -> anyhow::Result<Arc<EventProcessor>> {
    let policies = LibSqlPolicyStore::new_local(&config.policy_db)
        .await
        .with_context(|| format!("opening policy database {}", config.policy_db.display()))?;
    let transport = SmtpRelay::new(config.require_smtp()?)?;

    let deps = ProcessorDeps {
        policies: Arc::new(policies),
        objects: Arc::new(FsObjectStore::new(config.object_root.clone())),
        converter: Arc::new(EbookConvert::new(
            config.converter.clone(),
            config.convert_timeout,
        )),
        transport: Arc::new(transport),
    };

    tracing::info!(
        receive_domain = %config.receive_domain,
        sender = %config.sender,
        max_message_size = config.max_message_size,
        scratch = %config.scratch_dir.display(),
        "Gateway configured"
    );

    Ok(Arc::new(EventProcessor::new(
        ProcessorSettings::from(config),
        deps,
    )))
}

async fn serve(config: &GatewayConfig) -> anyhow::Result<()> {
    let processor = build_processor(config).await?;
    let app = server::routes(processor);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.listen_port))
        .await
        .with_context(|| format!("binding port {}", config.listen_port))?;
    tracing::info!(port = config.listen_port, "Notification endpoint started");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn process_files(config: &GatewayConfig, files: &[PathBuf]) -> anyhow::Result<()> {
    let processor = build_processor(config).await?;

    for file in files {
        let body = tokio::fs::read(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        let notification = Notification::parse(&body)?;
        let reports = processor
            .process_notification(&notification)
            .await
            .with_context(|| format!("processing {}", file.display()))?;
        for report in reports {
            tracing::info!(
                key = %report.object_key,
                messages = report.messages_sent,
                "Processed {}",
                file.display()
            );
        }
    }
    Ok(())
}
