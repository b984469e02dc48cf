use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use prospector::{
    client::{friendly_error, ResearchClient},
    config::{ApiKeys, ResearchConfig},
    handler::ResearchHandler,
    http::ReqwestTransport,
    pipeline::{validate_url, ResearchPipeline},
    progress::BarProgress,
    report::{ReportView, ResearchSession, Tab},
    server,
    CompanyProfile, ResearchRequest,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "prospector",
    version,
    about = "Research a company from its website and build a structured profile"
)]
struct Cli {
    /// Config file, with or without extension.
    #[arg(long, global = true, default_value = "prospector")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP research endpoint.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Research a single website and print the report.
    Research {
        website_url: String,
        /// Accepted for compatibility; only the landing page is fetched.
        #[arg(long, default_value_t = 5)]
        max_pages: u32,
        /// Skip the web-search enrichment step.
        #[arg(long)]
        no_external: bool,
        /// Send the request to a running server instead of researching in-process.
        #[arg(long)]
        server: Option<String>,
        /// Only print this tab.
        #[arg(long, value_enum)]
        tab: Option<Tab>,
        /// Directory to export the JSON report into.
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

/// The main entry point of the application.
///
/// Initializes logging and configuration, then either serves the research endpoint or
/// researches one website from the command line.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ResearchConfig::load(&cli.config).context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let handler = ResearchHandler::new(Arc::new(build_pipeline(&config)?));
            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("failed to bind {}:{}", host, port))?;
            server::serve(listener, handler).await?;
        }
        Commands::Research {
            website_url,
            max_pages,
            no_external,
            server,
            tab,
            export,
        } => {
            if validate_url(Some(&website_url)).is_err() {
                bail!("Please enter a valid URL");
            }
            let request = ResearchRequest::new(website_url)
                .with_max_pages(max_pages)
                .with_external(!no_external);

            let start_time = Instant::now();
            let profile = match server {
                Some(base_url) => research_remote(&base_url, &request).await,
                None => research_local(&config, &request).await,
            };
            let profile = match profile {
                Ok(profile) => profile,
                Err(message) => {
                    error!("Research failed: {}", message);
                    bail!(friendly_error(&message));
                }
            };

            let mut session = ResearchSession::new();
            session.set_result(profile);
            if let Some(profile) = session.current() {
                print_report(profile, tab);
            }
            println!("\nProcessing time: {:.2?}", start_time.elapsed());

            if let Some(dir) = export {
                let path = session.export(&dir, chrono::Utc::now().date_naive())?;
                println!("Report saved to {}", path.display());
            }
            session.clear();
        }
    }

    Ok(())
}

fn build_pipeline(config: &ResearchConfig) -> Result<ResearchPipeline> {
    let transport = ReqwestTransport::new(&config.user_agent)?;
    Ok(ResearchPipeline::new(
        config,
        Arc::new(transport),
        ApiKeys::from_env(),
    ))
}

/// Runs the pipeline in-process; the progress bar follows the real steps.
async fn research_local(
    config: &ResearchConfig,
    request: &ResearchRequest,
) -> std::result::Result<CompanyProfile, String> {
    let pipeline = build_pipeline(config).map_err(|e| e.to_string())?;
    let progress = BarProgress::new();

    match pipeline.run(request, &progress).await {
        Ok(profile) => {
            progress.finish("Research completed!");
            Ok(profile)
        }
        Err(e) => {
            progress.abandon();
            Err(e.to_string())
        }
    }
}

/// Asks a running server. The server reports no intermediate steps, so this only
/// shows a spinner.
async fn research_remote(
    base_url: &str,
    request: &ResearchRequest,
) -> std::result::Result<CompanyProfile, String> {
    let client = ResearchClient::new(base_url).map_err(|e| e.to_string())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Researching via {}...", base_url));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = client.research(request).await.map_err(|e| e.to_string());
    spinner.finish_and_clear();
    result
}

fn print_report(profile: &CompanyProfile, tab: Option<Tab>) {
    let view = ReportView::new(profile);
    match tab {
        Some(tab) => {
            println!("{}\n", view.header());
            println!("{}", view.render_tab(tab));
        }
        None => println!("{}", view.render_all()),
    }
}
