use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use perf_report::handlers::reports::ReportSummary;
use perf_report::{
    parse_batch, server, AppState, DiagnosticSink, ParserKind, ReportConfig, ReportMap,
    TracingSink,
};

#[derive(Parser, Debug)]
#[command(name = "perf-report", about = "Summarise JMeter and JUnit performance logs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the configured reports and serve them over HTTP.
    Serve {
        /// Path to a JSON file containing the ReportConfig.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Parse log files and print their summaries as JSON.
    Summarize {
        /// JMeter result files (.jtl)
        #[arg(long)]
        jmeter: Vec<PathBuf>,
        /// JUnit XML reports
        #[arg(long)]
        junit: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);

    match args.command {
        Command::Serve { config } => {
            let config = match config {
                Some(path) => ReportConfig::from_file(path)?,
                None => ReportConfig::default(),
            };

            let reports = ReportMap::load(
                config.inputs.clone(),
                Some(config.snapshot_store()),
                sink,
            )
            .await;

            let state = Arc::new(AppState {
                reports: Arc::new(reports),
            });
            let app = server::create_router(state);

            let listener = tokio::net::TcpListener::bind(config.listen).await?;
            tracing::info!("Reports API listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
        Command::Summarize { jmeter, junit } => {
            let mut reports = parse_batch(ParserKind::JMeter.parser(), jmeter, sink.clone()).await;
            reports.extend(parse_batch(ParserKind::JUnit.parser(), junit, sink).await);
            reports.sort_by(|a, b| a.source_name().cmp(b.source_name()));

            let summaries: Vec<_> = reports.iter().map(ReportSummary::from_report).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}
