//! Command-line entry point for the IAM policy auditor.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use iam_policy_auditor_scan::{
    default_output_path, write_results, AwsCredentialOverrides, ClassifierConfig, FailureMode,
    OutputFormat, PolicyClassifier, ScanError, ScanOptions, Scanner, DEFAULT_MODEL,
};

#[derive(Parser, Debug)]
#[command(
    name = "iam-policy-auditor",
    version,
    about = "Retrieve all customer managed policies and check the default policy version for vulnerabilities"
)]
struct Cli {
    /// OpenAI API key
    #[arg(short, long)]
    key: String,

    /// AWS profile name to use
    #[arg(short, long)]
    profile: Option<String>,

    /// Redact account identifiers and classify each policy (pass `--redact false`
    /// to persist raw policies without contacting the model)
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    redact: bool,

    /// Output file name. If not set results are saved under the 'cache' folder
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save results as JSON instead of CSV
    #[arg(short, long, default_value_t = false)]
    json: bool,

    /// Model used for classification
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Continue when a single classification call fails; the policy is
    /// persisted unclassified and the failure reported at the end
    #[arg(long, default_value_t = false)]
    isolate_failures: bool,

    /// The AWS access key id
    #[arg(long)]
    access_key_id: Option<String>,

    /// The AWS secret access key
    #[arg(long)]
    secret_access_key: Option<String>,

    /// The AWS session token to use
    #[arg(long)]
    session_token: Option<String>,

    /// Region to use
    #[arg(long)]
    region: Option<String>,
}

async fn run(cli: Cli) -> Result<(), ScanError> {
    let overrides = AwsCredentialOverrides {
        access_key_id: cli.access_key_id,
        secret_access_key: cli.secret_access_key,
        session_token: cli.session_token,
        profile: cli.profile,
        region: cli.region,
    };
    let scanner = Scanner::new(&overrides).await;

    let classifier = PolicyClassifier::new(ClassifierConfig::new(cli.key, cli.model));
    let options = ScanOptions {
        redact: cli.redact,
        failure_mode: if cli.isolate_failures {
            FailureMode::Isolate
        } else {
            FailureMode::Abort
        },
    };

    let report = scanner.run(&options, &classifier).await?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Csv
    };
    let path = cli
        .output
        .unwrap_or_else(|| default_output_path(&report.account, chrono::Utc::now(), format));
    write_results(&path, &report.records, format)?;

    for failure in &report.failures {
        log::warn!(
            "Policy {} ({}) was not classified: {}",
            failure.name,
            failure.arn,
            failure.reason
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        log::error!("{err}");
        std::process::exit(err.exit_code());
    }
}
