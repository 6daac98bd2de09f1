use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{command, Args, Parser, Subcommand};
use co2ddf::{
    config::Config,
    ddf::{concepts_to_df, extract_concepts},
    formatters::{CSVFormatter, OutputGenerator},
    source::Domain,
    Co2Ddf,
};
use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use spinners::{Spinner, Spinners};
use strum_macros::EnumString;

use crate::display::{display_concepts, display_summary};
use crate::error::Co2DdfCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";

/// Defines the formats the concept listing can be printed in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    Table,
    Csv,
}

fn write_output<U>(mut data: DataFrame, output_file: Option<U>) -> Co2DdfCliResult<()>
where
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        CSVFormatter.save(&mut f, &mut data)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        CSVFormatter.save(&mut stdout_lock, &mut data)?;
    };
    Ok(())
}

fn start_spinner(quiet: bool, message: &str) -> Option<Spinner> {
    (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            message.to_string() + RUNNING_TAIL_STRING,
        )
    })
}

fn stop_spinner(sp: Option<Spinner>) {
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    async fn run(&self, config: Config) -> Co2DdfCliResult<()>;
}

/// Paths that can be overridden on the command line for any command reading the source.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    #[arg(short, long, help = "Directory containing the global.*.csv and nation.*.csv files")]
    source_dir: Option<PathBuf>,
    #[arg(short, long, help = "Directory the DDF files are written to")]
    out_dir: Option<PathBuf>,
}

impl PathArgs {
    fn apply(&self, mut config: Config) -> Config {
        if let Some(source_dir) = &self.source_dir {
            config.source_dir = source_dir.clone();
        }
        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        config
    }
}

/// The `run` command performs the full transformation and writes the DDF dataset.
#[derive(Args, Debug)]
pub struct RunEtlCommand {
    #[command(flatten)]
    paths: PathArgs,
    #[arg(long, help = "Do not write ddf--index.csv")]
    no_index: bool,
    #[arg(long, help = "Do not write datapackage.json")]
    no_manifest: bool,
    #[arg(long, help = "Significant figures kept in datapoint values")]
    sigfig: Option<usize>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunEtlCommand {
    fn config(&self, config: Config) -> Config {
        let mut config = self.paths.apply(config);
        if self.no_index {
            config.write_index = false;
        }
        if self.no_manifest {
            config.write_manifest = false;
        }
        if let Some(sigfig) = self.sigfig {
            config.sigfig = sigfig;
        }
        config
    }
}

impl RunCommand for RunEtlCommand {
    async fn run(&self, config: Config) -> Co2DdfCliResult<()> {
        info!("Running `run` subcommand");
        let co2ddf = Co2Ddf::new_with_config(self.config(config));
        let sp = start_spinner(self.quiet, "Transforming source files");
        let summary = co2ddf.run()?;
        stop_spinner(sp);
        debug!("{summary:#?}");
        display_summary(&summary);
        Ok(())
    }
}

/// The `update` command downloads the source files when a newer release is published.
#[derive(Args, Debug)]
pub struct UpdateCommand {
    #[arg(short, long, help = "Directory the source files are downloaded to")]
    source_dir: Option<PathBuf>,
    #[arg(short, long, help = "Download even when the source is not newer")]
    force: bool,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for UpdateCommand {
    async fn run(&self, mut config: Config) -> Co2DdfCliResult<()> {
        info!("Running `update` subcommand");
        if let Some(source_dir) = &self.source_dir {
            config.source_dir = source_dir.clone();
        }
        let co2ddf = Co2Ddf::new_with_config(config);
        let sp = start_spinner(self.quiet, "Checking source");
        let paths = co2ddf.update_source(self.force).await?;
        stop_spinner(sp);
        if paths.is_empty() {
            println!("No newer source!");
        } else {
            println!(
                "Downloaded:\n{}",
                paths.iter().map(|p| format!("  {}", p.display())).join("\n")
            );
        }
        Ok(())
    }
}

/// The `concepts` command classifies the source headers and lists the resulting concepts.
#[derive(Args, Debug)]
pub struct ConceptsCommand {
    #[arg(short, long, help = "Directory containing the source files")]
    source_dir: Option<PathBuf>,
    #[arg(
        short = 'f',
        long,
        value_name = "table|csv",
        default_value = "table",
        help = "Output format for the concepts"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file for csv output")]
    output_file: Option<String>,
    #[arg(long, help = "Only list the measures")]
    measures_only: bool,
}

impl ConceptsCommand {
    fn concepts(&self, mut config: Config) -> Co2DdfCliResult<DataFrame> {
        if let Some(source_dir) = &self.source_dir {
            config.source_dir = source_dir.clone();
        }
        let co2ddf = Co2Ddf::new_with_config(config);
        let global = co2ddf.load(Domain::Global)?;
        let nation = co2ddf.load(Domain::Nation)?;
        let (discrete, continuous) = extract_concepts(&global, &nation);
        let concepts = if self.measures_only {
            continuous
        } else {
            discrete.into_iter().chain(continuous).collect_vec()
        };
        Ok(concepts_to_df(&concepts)?)
    }
}

impl RunCommand for ConceptsCommand {
    async fn run(&self, config: Config) -> Co2DdfCliResult<()> {
        info!("Running `concepts` subcommand");
        let concepts = self.concepts(config)?;
        match self.output_format {
            OutputFormat::Table => display_concepts(&concepts)?,
            OutputFormat::Csv => write_output(concepts, self.output_file.as_deref())?,
        }
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Transform the CDIAC CO2 emissions dataset into DDF", long_about = None, name="co2ddf")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command should implmement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Transform the source files and write the DDF dataset
    Run(RunEtlCommand),
    /// Download the source files if a newer release is available
    Update(UpdateCommand),
    /// List the concepts found in the source files
    Concepts(ConceptsCommand),
}
