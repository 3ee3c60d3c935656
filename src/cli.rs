use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::io::Write;
use std::path::PathBuf;

use pipelens::host::{load_snapshot, BuildRef, Host, SnapshotHost};
use pipelens::pipeline::{PipelineDefinition, Resolver};
use pipelens::token::ExpanderRegistry;

use crate::config::{Config, OutputFormat};
use crate::output::{self, PhaseProgress};
use crate::report::StatusReport;

#[derive(Parser)]
#[command(name = "pipelens")]
#[command(author, version, about = "Delivery Pipeline Status", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file, otherwise searched in the working and user config directories
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the status of every stage of a pipeline
    Status {
        #[arg(short = 'P', long)]
        pipeline: String,

        /// Build number of the first job to render, defaults to its latest build
        #[arg(short, long)]
        run: Option<u64>,

        /// Host snapshot path or URL, overrides the configured one
        #[arg(short, long)]
        snapshot: Option<String>,

        #[arg(short, long, env = "PIPELENS_TOKEN")]
        token: Option<String>,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// List configured pipelines
    Pipelines {
        #[arg(short, long)]
        snapshot: Option<String>,
    },
}

impl Cli {
    async fn execute_status(
        &self,
        config: &Config,
        pipeline: &str,
        run: Option<u64>,
        snapshot: Option<&str>,
        token: Option<&str>,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        info!("Resolving status for pipeline: {}", pipeline);

        let pipeline_config = config
            .pipeline(pipeline)
            .ok_or_else(|| pipelens::PipelensError::UnknownPipeline(pipeline.to_owned()))?;
        let source = snapshot_source(config, snapshot)?;
        let token = token
            .map(ToOwned::to_owned)
            .or_else(|| config.host.token.clone());

        let progress = PhaseProgress::start_loading(&source);
        let snapshot = match load_snapshot(&source, token).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                progress.abandon();
                return Err(e).with_context(|| format!("Failed to load host snapshot: {source}"));
            }
        };
        let host = SnapshotHost::new(snapshot);
        let progress = progress.finish_loading_start_resolving(host.jobs().len());

        let report = match build_report(config, &host, &pipeline_config.name, &pipeline_config.first_job, run) {
            Ok(report) => report,
            Err(e) => {
                progress.abandon();
                return Err(e);
            }
        };
        progress.finish_resolving();

        match format.unwrap_or(config.output.format) {
            OutputFormat::Summary => output::print_summary(&report),
            OutputFormat::Json => self.write_json(&report, config)?,
        }

        Ok(())
    }

    async fn execute_pipelines(&self, config: &Config, snapshot: Option<&str>) -> Result<()> {
        let host = match snapshot.or(config.host.snapshot.as_deref()) {
            Some(source) => Some(SnapshotHost::new(
                load_snapshot(source, config.host.token.clone())
                    .await
                    .with_context(|| format!("Failed to load host snapshot: {source}"))?,
            )),
            None => None,
        };

        let mut listing = Vec::new();
        for pipeline in &config.pipelines {
            let stages = match &host {
                Some(host) => {
                    let definition =
                        PipelineDefinition::discover(host, &pipeline.name, &pipeline.first_job)?;
                    Some(definition.stages.len())
                }
                None => None,
            };
            listing.push(serde_json::json!({
                "name": pipeline.name,
                "firstJob": pipeline.first_job,
                "stages": stages,
            }));
        }

        if matches!(config.output.format, OutputFormat::Json) || self.output.is_some() {
            return self.write_json(&listing, config);
        }

        for entry in &listing {
            let stages = entry["stages"]
                .as_u64()
                .map_or_else(String::new, |n| format!(" ({n} stages)"));
            println!(
                "{} {}{}",
                output::cyan(entry["name"].as_str().unwrap_or_default()),
                output::dim(format!("starts at {}", entry["firstJob"].as_str().unwrap_or_default())),
                stages
            );
        }
        Ok(())
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, value: &T, config: &Config) -> Result<()> {
        let pretty = self.pretty || config.output.pretty;
        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
            output::export_json(value, pretty, &mut file)?;
            info!("Status written to: {}", output_path.display());
        } else {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            output::export_json(value, pretty, &mut handle)?;
            handle.flush()?;
        }
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Status {
                pipeline,
                run,
                snapshot,
                token,
                format,
            } => {
                self.execute_status(
                    &config,
                    pipeline,
                    *run,
                    snapshot.as_deref(),
                    token.as_deref(),
                    *format,
                )
                .await
            }
            Commands::Pipelines { snapshot } => {
                self.execute_pipelines(&config, snapshot.as_deref()).await
            }
        }
    }
}

fn snapshot_source(config: &Config, snapshot: Option<&str>) -> Result<String> {
    snapshot
        .map(ToOwned::to_owned)
        .or_else(|| config.host.snapshot.clone())
        .ok_or_else(|| anyhow!("No host snapshot given, pass --snapshot or set [host] snapshot"))
}

/// Renders the requested run, or the latest one, alongside the run before it.
fn build_report(
    config: &Config,
    host: &SnapshotHost,
    name: &str,
    first_job: &str,
    run: Option<u64>,
) -> Result<StatusReport> {
    let definition = PipelineDefinition::discover(host, name, first_job)?;
    let expanders = ExpanderRegistry::default();
    let resolver = Resolver::new(host, &expanders);

    let upstream = match run {
        Some(number) => Some(BuildRef::new(first_job, number)),
        None => definition.latest_run(host),
    };
    let view = definition.render(&resolver, upstream.as_ref())?;
    let previous = upstream
        .as_ref()
        .and_then(|current| definition.previous_run(host, current))
        .map(|previous| definition.render(&resolver, Some(&previous)))
        .transpose()?;

    let mut report = StatusReport::new(view, previous);
    if let Some(base_url) = &config.host.base_url {
        report.absolutize_links(base_url)?;
    }
    Ok(report)
}
