//! scan2md - batch converter from scanned PDFs and images to markdown/text.

mod batch;
mod config;
mod document;
mod error;
mod naming;
mod ocr;
mod text_layer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use batch::{BatchDriver, BatchOptions, OutputFormat};
use config::Settings;
use naming::NamingPolicy;
use ocr::invoker::OcrInvoker;
use ocr::raster::Pdftoppm;
use ocr::registry::PROVIDERS;
use ocr::BackendChoice;

const DEFAULT_OUTPUT_DIR: &str = "markdown_output";

/// Convert scanned PDFs and images to markdown via the embedded text layer or cloud OCR.
#[derive(Debug, Parser)]
#[command(name = "scan2md", version, about)]
struct Args {
    /// PDF/image file or directory to convert
    #[arg(required_unless_present = "list_backends")]
    input: Option<PathBuf>,

    /// Output directory [default: <INPUT dir>/markdown_output]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OCR backend: auto, ocrspace or baidu
    #[arg(short, long, default_value = "auto")]
    backend: BackendChoice,

    /// Rasterization DPI for scanned PDFs
    #[arg(long, value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: Option<u32>,

    /// Skip documents that already have an output file
    #[arg(long)]
    skip_existing: bool,

    /// OCR PDFs even when they carry a usable text layer
    #[arg(long)]
    force_ocr: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Output format: md or txt
    #[arg(long, default_value = "md")]
    format: OutputFormat,

    /// Output naming: smart (from content) or stem (input file name)
    #[arg(long, default_value = "smart")]
    naming: NamingPolicy,

    /// Use Baidu's high-precision endpoint
    #[arg(long)]
    high_precision: bool,

    /// OCR.space language code
    #[arg(long)]
    language: Option<String>,

    /// Delay between consecutive OCR calls, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request HTTP timeout, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// JSON config file [default: ./scan2md.json if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print configured backends and exit
    #[arg(long)]
    list_backends: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scan2md=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Errors returned here happen before any document is processed.
async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load(args.config.as_deref())?;
    apply_overrides(&mut settings, &args);

    if args.list_backends {
        print_backends(&settings);
        return Ok(ExitCode::SUCCESS);
    }

    settings.validate()?;
    let input = args
        .input
        .clone()
        .context("INPUT is required")?;
    if !input.exists() {
        anyhow::bail!("Input not found: {}", input.display());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.tuning.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;
    let providers = ocr::build_providers(&settings, client);
    info!(
        "Backends: {}",
        providers
            .iter()
            .map(|p| p.kind().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(&input));
    let docs = document::discover(&input, args.recursive, &output_dir)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;
    if docs.is_empty() {
        warn!("No supported documents found in {}", input.display());
        return Ok(ExitCode::SUCCESS);
    }

    let rasterizer = Pdftoppm;
    let invoker = OcrInvoker::new(
        &rasterizer,
        settings.tuning.dpi,
        Duration::from_millis(settings.tuning.delay_ms),
    );
    let options = BatchOptions {
        output_dir,
        skip_existing: args.skip_existing,
        force_ocr: args.force_ocr,
        naming: args.naming,
        format: args.format,
        backend: args.backend,
    };

    let mut driver = BatchDriver::new(&providers, invoker, options);
    let summary = driver
        .run(docs)
        .await
        .context("Failed to prepare output directory")?;

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// CLI flags win over file and environment values.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(dpi) = args.dpi {
        settings.tuning.dpi = dpi;
    }
    if let Some(delay_ms) = args.delay_ms {
        settings.tuning.delay_ms = delay_ms;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.tuning.timeout_secs = timeout_secs;
    }
    if let (Some(language), Some(creds)) = (&args.language, settings.ocr_space.as_mut()) {
        creds.language = language.clone();
    }
    if args.high_precision {
        if let Some(creds) = settings.baidu.as_mut() {
            creds.high_precision = true;
        }
    }
}

fn default_output_dir(input: &Path) -> PathBuf {
    let base = if input.is_dir() {
        input
    } else {
        input.parent().unwrap_or(Path::new("."))
    };
    base.join(DEFAULT_OUTPUT_DIR)
}

fn print_backends(settings: &Settings) {
    let configured = settings.configured_backends();
    for spec in PROVIDERS.iter() {
        let status = if configured.contains(&spec.kind) {
            "configured"
        } else {
            "missing credentials"
        };
        let pdf = match spec.limits.native_pdf_pages {
            Some(pages) => format!("PDF up to {} pages", pages),
            None => "images only".to_string(),
        };
        println!(
            "{:<9} {:<10} {} ({}), max {} KiB, {}, {} free/month{}",
            spec.kind.as_str(),
            spec.display_name,
            status,
            spec.credential_vars.join(" + "),
            spec.limits.max_bytes / 1024,
            pdf,
            spec.monthly_free_quota,
            if spec.strong_on_cjk { ", strong on CJK" } else { "" }
        );
        println!("          {} [{}]", spec.endpoint, spec.api_version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["scan2md", "scans"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("scans")));
        assert_eq!(args.backend, BackendChoice::Auto);
        assert_eq!(args.format, OutputFormat::Md);
        assert_eq!(args.naming, NamingPolicy::Smart);
        assert!(!args.skip_existing);
        assert!(args.dpi.is_none());
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "scan2md",
            "scans",
            "-o",
            "out",
            "-b",
            "baidu",
            "--dpi",
            "300",
            "--skip-existing",
            "--format",
            "txt",
            "--naming",
            "stem",
            "--recursive",
        ])
        .unwrap();
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert_eq!(args.backend, BackendChoice::Baidu);
        assert_eq!(args.dpi, Some(300));
        assert!(args.skip_existing);
        assert!(args.recursive);
        assert_eq!(args.format, OutputFormat::Txt);
        assert_eq!(args.naming, NamingPolicy::Stem);
    }

    #[test]
    fn test_args_rejects_bad_values() {
        assert!(Args::try_parse_from(["scan2md", "scans", "--dpi", "20"]).is_err());
        assert!(Args::try_parse_from(["scan2md", "scans", "-b", "tesseract"]).is_err());
        assert!(Args::try_parse_from(["scan2md"]).is_err());
        assert!(Args::try_parse_from(["scan2md", "--list-backends"]).is_ok());
    }

    #[test]
    fn test_overrides_apply_to_configured_backends() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            config::ENV_OCR_SPACE_API_KEY => Some("k".to_string()),
            _ => None,
        });
        let args = Args::try_parse_from([
            "scan2md",
            "scans",
            "--language",
            "eng",
            "--high-precision",
            "--delay-ms",
            "0",
        ])
        .unwrap();
        apply_overrides(&mut settings, &args);

        assert_eq!(settings.ocr_space.unwrap().language, "eng");
        assert!(settings.baidu.is_none());
        assert_eq!(settings.tuning.delay_ms, 0);
    }

    #[test]
    fn test_default_output_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        assert_eq!(
            default_output_dir(temp.path()),
            temp.path().join(DEFAULT_OUTPUT_DIR)
        );
        let file = temp.path().join("scan.pdf");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(default_output_dir(&file), temp.path().join(DEFAULT_OUTPUT_DIR));
    }
}
