// * Prospect-Flow batch runner
// * Reads a JSON array of company jobs, runs the pipeline against the live
// * collaborators and writes one JSON line per company.

use prospect_flow::engine::{Collaborators, Orchestrator};
use prospect_flow::network::{CompaniesHouseClient, HttpFetcher, SearchEngineProfileSearch};
use prospect_flow::ops::telemetry;
use prospect_flow::persistence::report::ReportWriter;
use prospect_flow::persistence::schema::CompanyJob;
use prospect_flow::refinery::Lexicon;
use prospect_flow::PipelineConfig;
use std::sync::Arc;

fn usage() -> ! {
    eprintln!("Usage: prospect-flow <jobs.json> [config.json]");
    eprintln!("\nEnv:");
    eprintln!("  COMPANIES_HOUSE_API_KEY=... (required, registry lookups)");
    eprintln!("  PROSPECT_LEXICON=lexicon.json (optional, extends the built-in name lists)");
    eprintln!("  PROSPECT_RENDER_ENDPOINT=http://localhost:3000/render?url= (optional, rendering fallback)");
    eprintln!("  PROSPECT_REPORT=report.jsonl (optional, defaults to stdout)");
    eprintln!("  PROSPECT_LOG=pretty (optional, human-readable logs)");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("PROSPECT_LOG").is_ok_and(|v| v == "pretty") {
        telemetry::init_tracing_pretty();
    } else {
        telemetry::init_tracing();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(jobs_path) = args.first() else {
        usage();
    };
    let config = match args.get(1) {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let Ok(api_key) = std::env::var("COMPANIES_HOUSE_API_KEY") else {
        usage();
    };

    let jobs: Vec<CompanyJob> = serde_json::from_str(&std::fs::read_to_string(jobs_path)?)?;
    let lexicon = match std::env::var("PROSPECT_LEXICON") {
        Ok(path) => Lexicon::load(path)?,
        Err(_) => Lexicon::builtin(),
    };

    let o = &config.orchestration;
    let mut fetcher = HttpFetcher::new(o.page_timeout())?;
    if let Ok(endpoint) = std::env::var("PROSPECT_RENDER_ENDPOINT") {
        fetcher = fetcher.with_render_endpoint(endpoint);
    }
    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        registry: Arc::new(CompaniesHouseClient::new(api_key, o.collaborator_timeout())?),
        profiles: Arc::new(SearchEngineProfileSearch::new(o.collaborator_timeout())?),
    };

    let concurrency = o.concurrency;
    tracing::info!(jobs = jobs.len(), concurrency, "Prospect-Flow starting");
    let orchestrator = Orchestrator::new(config, Arc::new(lexicon), collaborators);
    let finished = orchestrator.run_batch(jobs, concurrency).await;

    match std::env::var("PROSPECT_REPORT") {
        Ok(path) => {
            let mut writer = ReportWriter::create(&path)?;
            for job in &finished {
                writer.write_job(job)?;
            }
            tracing::info!(path = %path, reports = writer.written(), "Report written");
            writer.finish()?;
        }
        Err(_) => {
            let mut writer = ReportWriter::new(std::io::stdout().lock());
            for job in &finished {
                writer.write_job(job)?;
            }
            writer.finish()?;
        }
    }

    tracing::debug!(metrics = %telemetry::get_metrics_string(), "Final metrics");
    Ok(())
}
