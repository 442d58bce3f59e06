//! swad2prado - command-line entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use swad2prado::{ConversionReport, ConvertError, ConvertOptions, convert_file, mapping};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the mapping located no questions.
const EXIT_NO_QUESTIONS: u8 = 2;

/// Convert SWAD XML to PRADO/Moodle XML (CDATA bodies, category from --category)
#[derive(Parser, Debug)]
#[command(name = "swad2prado")]
#[command(version)]
struct Args {
    /// SWAD XML export to read
    input: PathBuf,

    /// PRADO/Moodle XML file to write
    output: PathBuf,

    /// JSON file overriding the built-in field mapping
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Moodle/PRADO category for the questions (e.g. "$course$/top/Tema 1")
    #[arg(long)]
    category: String,

    /// Shuffle answers in PRADO
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    shuffle: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swad2prado=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(report) => {
            println!(
                "[✓] Converted {} questions → {}",
                report.questions,
                report.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => match err.downcast_ref::<ConvertError>() {
            Some(ConvertError::NoQuestionsFound) => {
                eprintln!("[!] No questions found. Check 'question_xpath' in the mapping.");
                ExitCode::from(EXIT_NO_QUESTIONS)
            }
            _ => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(args: &Args) -> Result<ConversionReport> {
    let mapping = mapping::resolve(args.mapping.as_deref()).with_context(|| match &args.mapping {
        Some(path) => format!("failed to load mapping {}", path.display()),
        None => "failed to load the built-in mapping".to_string(),
    })?;
    info!("question path: {}", mapping.question_xpath);

    let options = ConvertOptions {
        category: args.category.clone(),
        shuffle: args.shuffle,
    };
    let report = convert_file(&args.input, &args.output, &mapping, &options)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;
    Ok(report)
}
