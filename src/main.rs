use clap::Parser;
use seq_retriever::cli::{apply_cli, resolve_inputs, Cli};
use seq_retriever::config::Config;
use seq_retriever::entrez::{EntrezClient, EntrezSettings};
use seq_retriever::infra::http_client::ReqwestHttp;
use seq_retriever::infra::rate_limiter_adapter::RateLimiterAdapter;
use seq_retriever::logging;
use seq_retriever::pipeline::{self, Retriever};
use seq_retriever::prompt::Prompter;
use seq_retriever::rate_limiter::{Limits, RateLimiter};
use std::io;
use tracing::{error, info};

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();
    apply_cli(&mut config, &cli);

    let inputs = {
        let stdin = io::stdin();
        let mut prompter = Prompter::new(stdin.lock(), io::stdout());
        resolve_inputs(&mut config, &cli, &mut prompter)?
    };
    config.validate()?;

    let requests_per_sec = config.entrez.requests_per_sec();
    info!(
        taxid = %inputs.taxid,
        min_len = inputs.range.min(),
        max_len = inputs.range.max(),
        requests_per_sec,
        "starting retrieval"
    );

    let http = ReqwestHttp::new(config.entrez.timeout())?;
    let limiter = RateLimiterAdapter(RateLimiter::new(Limits::per_second(requests_per_sec)));
    let settings = EntrezSettings::from_config(&config.entrez)?;
    let client = EntrezClient::new(Box::new(http), Box::new(limiter), settings);
    let retriever = Retriever::new(client, inputs.range, &config.fetch);

    let handle = retriever.search(&inputs.taxid).await?;
    println!("Total records found: {}. Downloading and filtering...", handle.count);

    let result = retriever.fetch(&handle).await?;
    println!("Filtered records: {}", result.summaries.len());

    let paths = pipeline::save_outputs(
        &config.output.dir,
        &inputs.taxid,
        &result.summaries,
        config.output.plot_format,
    )?;
    println!("Saved CSV to {}", paths.csv.display());
    match &paths.plot {
        Some(plot) => println!("Saved plot to {}", plot.display()),
        None => println!("No records passed the length filter; plot skipped"),
    }

    info!(report = ?result.report, "run complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        // reported once, through tracing
        error!("Run failed: {:#}", e);
        std::process::exit(1);
    }
}
