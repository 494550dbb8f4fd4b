use crate::config::{self, Config};
use crate::error::Result;
use crate::export::plot::PlotFormat;
use crate::prompt::Prompter;
use crate::types::{LengthRange, TaxId};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "seq_retriever")]
#[command(about = "Fetch NCBI nucleotide records for a taxonomy id, filter by length, export CSV and a plot")]
#[command(version)]
pub struct Cli {
    /// Contact email sent to NCBI with every request
    #[arg(long)]
    pub email: Option<String>,
    /// NCBI API key (raises the request budget from 3/s to 10/s)
    #[arg(long)]
    pub api_key: Option<String>,
    /// NCBI taxonomy id, e.g. 2697049
    #[arg(long)]
    pub taxid: Option<String>,
    /// Shortest sequence length to keep (inclusive)
    #[arg(long)]
    pub min_len: Option<usize>,
    /// Longest sequence length to keep (inclusive)
    #[arg(long)]
    pub max_len: Option<usize>,
    /// Upper bound on records downloaded
    #[arg(long)]
    pub max_records: Option<usize>,
    /// Records requested per EFetch call
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Directory for the CSV and plot
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub plot_format: Option<PlotFormat>,
    /// TOML config file (defaults to ./seq_retriever.toml when present)
    #[arg(long, env = config::CONFIG_PATH_ENV)]
    pub config: Option<PathBuf>,
}

/// Layer command-line values over the loaded config.
pub fn apply_cli(config: &mut Config, cli: &Cli) {
    if let Some(email) = config::non_blank(cli.email.clone()) {
        config.entrez.email = Some(email);
    }
    if let Some(key) = config::non_blank(cli.api_key.clone()) {
        config.entrez.api_key = Some(key);
    }
    if let Some(n) = cli.max_records {
        config.fetch.max_records = n;
    }
    if let Some(n) = cli.batch_size {
        config.fetch.batch_size = n;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(format) = cli.plot_format {
        config.output.plot_format = format;
    }
}

#[derive(Debug)]
pub struct RunInputs {
    pub taxid: TaxId,
    pub range: LengthRange,
}

/// Fill in whatever the command line, environment and config left open.
pub fn resolve_inputs<R: BufRead, W: Write>(
    config: &mut Config,
    cli: &Cli,
    prompter: &mut Prompter<R, W>,
) -> Result<RunInputs> {
    // the key is only asked for on a fully interactive run
    if config.entrez.email.is_none() {
        config.entrez.email = Some(prompter.ask("Enter your email: ")?);
        if config.entrez.api_key.is_none() {
            config.entrez.api_key = prompter.ask_optional("Enter your NCBI API key: ")?;
        }
    }

    let taxid: TaxId = match &cli.taxid {
        Some(t) => t.parse()?,
        None => prompter.ask_parsed("Enter taxonomic ID: ")?,
    };
    let min_len = match cli.min_len {
        Some(n) => n,
        None => prompter.ask_parsed("Min sequence length: ")?,
    };
    let max_len = match cli.max_len {
        Some(n) => n,
        None => prompter.ask_parsed("Max sequence length: ")?,
    };

    Ok(RunInputs { taxid, range: LengthRange::new(min_len, max_len)? })
}
