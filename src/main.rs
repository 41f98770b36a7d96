use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use testbench_reporter::model::Epic;
use testbench_reporter::parser::{self, TestResult, DEFAULT_EPIC, DEFAULT_SPEC_SUFFIX};
use testbench_reporter::report::{self, PublishStatus, PublishSummary};
use testbench_reporter::utils::{
    self,
    config::{Options, ReportingMode},
};
use testbench_reporter::{HttpGateway, Orchestrator};

#[derive(Parser)]
#[command(name = "testbench-reporter")]
#[command(version)]
#[command(about = "Publish automated test results to TestBench", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Debug logging for this crate
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append log lines to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the configuration file
#[derive(Args)]
struct ConnectionArgs {
    /// Configuration file (default: ./testbench.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long, global = true)]
    server: Option<String>,

    #[arg(long, global = true)]
    workspace: Option<String>,

    #[arg(long, global = true)]
    username: Option<String>,

    #[arg(long, global = true)]
    product_id: Option<i64>,

    /// Prefix of the reporting session name
    #[arg(long, global = true)]
    session_prefix: Option<String>,

    /// Never create test cases or rewrite their steps
    #[arg(long, global = true)]
    skip_test_case_updates: bool,

    /// Terminate a running automation for the same test case and retry
    #[arg(long, global = true)]
    close_already_running_automation: bool,

    /// Submit each result as a single automation run
    #[arg(long, global = true)]
    automation_run: bool,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    insecure: bool,
}

impl ConnectionArgs {
    fn resolve(&self) -> anyhow::Result<Options> {
        let mut options = Options::load(self.config.as_deref())?;

        if let Some(server) = &self.server {
            options.server_url = server.clone();
        }
        if let Some(workspace) = &self.workspace {
            options.workspace = workspace.clone();
        }
        if let Some(username) = &self.username {
            options.username = username.clone();
        }
        if let Some(product_id) = self.product_id {
            options.product_id = product_id;
        }
        if let Some(prefix) = &self.session_prefix {
            options.session_prefix = prefix.clone();
        }
        options.skip_test_case_updates |= self.skip_test_case_updates;
        options.close_already_running_automation |= self.close_already_running_automation;
        options.accept_invalid_certs |= self.insecure;
        if self.automation_run {
            options.reporting_mode = ReportingMode::AutomationRun;
        }

        options.apply_env();
        options.validate()?;
        Ok(options)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the results of a finished run
    Publish {
        /// Results file (YAML or JSON list of test cases with a verdict)
        results: PathBuf,

        /// Write JSON and JUnit reports of the publish into this directory
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Create or update test cases from Cypress specs, without results
    Import {
        /// Directory containing the specs
        specs: PathBuf,

        /// File name suffix of spec files
        #[arg(long, default_value = DEFAULT_SPEC_SUFFIX)]
        suffix: String,

        /// Epic that receives one user story per describe block
        #[arg(long, default_value = DEFAULT_EPIC)]
        epic: String,

        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Print the epic, user stories and test cases found in Cypress specs
    Scan {
        specs: PathBuf,

        #[arg(long, default_value = DEFAULT_SPEC_SUFFIX)]
        suffix: String,

        #[arg(long, default_value = DEFAULT_EPIC)]
        epic: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::logging::init(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Publish {
            results,
            report_dir,
        } => {
            let options = cli.connection.resolve()?;
            let items = parser::load_results(&results)?;
            println!(
                "{} Publishing {} result(s) from: {}",
                "▶".green().bold(),
                items.len(),
                results.display()
            );
            println!("  Server: {}", options.server_url.cyan());

            let mut orchestrator = connect(options)?;
            let summary = orchestrator
                .run(items.into_iter().map(TestResult::into_pair))
                .await
                .context("Failed to start the publish session")?;

            finish(&summary, report_dir.as_deref())?;
        }

        Commands::Import {
            specs,
            suffix,
            epic,
            report_dir,
        } => {
            let options = cli.connection.resolve()?;
            let epic = parser::scan_epic(&specs, &suffix, &epic)?;
            println!(
                "{} Importing {} test case(s) from: {}",
                "▶".green().bold(),
                epic.test_cases().count(),
                specs.display()
            );
            println!("  Epic: {}", epic.name.cyan());

            let mut orchestrator = connect(options)?;
            orchestrator
                .start()
                .await
                .context("Failed to start the import session")?;
            orchestrator.import_epic(&epic).await;
            if let Err(e) = orchestrator.end().await {
                log::error!("Ending the session failed: {}", e);
            }

            finish(&orchestrator.summary(), report_dir.as_deref())?;
        }

        Commands::Scan {
            specs,
            suffix,
            epic,
        } => {
            let epic = parser::scan_epic(&specs, &suffix, &epic)?;
            print_epic(&epic);
        }
    }

    Ok(())
}

fn connect(options: Options) -> anyhow::Result<Orchestrator> {
    let gateway = HttpGateway::new(
        &options.server_url,
        options.request_timeout_secs,
        options.accept_invalid_certs,
    )?;
    Ok(Orchestrator::new(Box::new(gateway), options))
}

fn finish(summary: &PublishSummary, report_dir: Option<&Path>) -> anyhow::Result<()> {
    print_summary(summary);
    if let Some(dir) = report_dir {
        report::write_reports(summary, dir)?;
        println!("  Reports: {}", dir.display().to_string().cyan());
    }
    Ok(())
}

fn print_summary(summary: &PublishSummary) {
    println!();
    if let Some(name) = &summary.session_name {
        println!("Session: {}", name.cyan());
    }
    for record in &summary.records {
        let mark = match record.status {
            PublishStatus::Published => "✓".green(),
            PublishStatus::Skipped => "-".yellow(),
            PublishStatus::Failed => "✗".red(),
        };
        let verdict = record
            .verdict
            .map(|v| format!(" [{}]", v))
            .unwrap_or_default();
        match &record.message {
            Some(message) => println!(
                "  {} {} ({}){}: {}",
                mark,
                record.name,
                record.external_id,
                verdict,
                message.dimmed()
            ),
            None => println!(
                "  {} {} ({}){}",
                mark, record.name, record.external_id, verdict
            ),
        }
    }
    println!(
        "\n{} published, {} skipped, {} failed",
        summary.count(PublishStatus::Published).to_string().green(),
        summary.count(PublishStatus::Skipped).to_string().yellow(),
        summary.count(PublishStatus::Failed).to_string().red()
    );
}

fn print_epic(epic: &Epic) {
    println!("Epic: {}", epic.name.cyan());
    for story in &epic.user_stories {
        println!("  User Story: {}", story.name);
        for definition in &story.test_cases {
            let external_id = if definition.external_id.is_empty() {
                "no external id".yellow()
            } else {
                definition.external_id.normal()
            };
            println!("    Test Case: {} ({})", definition.name, external_id);
            for step in &definition.test_steps {
                println!("      Test Step: {}", step);
            }
        }
    }
}
