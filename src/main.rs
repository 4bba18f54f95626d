//! # taxforme CLI
//!
//! Usage:
//!   taxforme single --kind 1040 --input record.json --year 2023 -o form.pdf
//!   taxforme batch --count 10 --years 2021,2022 --mode composite --out-dir out
//!   taxforme inspect form.pdf
//!   taxforme example > record.json

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use taxforme::archive::Packager;
use taxforme::batch::{run_batch, BatchMode, BatchRequest};
use taxforme::compose::{Composer, Composition};
use taxforme::manifest::{render_manifest, ManifestFormat};
use taxforme::pdf::inspect::inspect;
use taxforme::synth::{RecordStrategy, StrategyChoice};
use taxforme::{FieldRecord, FormKind, GeneratorConfig, RequestContext, TaxFormError};

#[derive(Parser, Debug)]
#[command(name = "taxforme", version, about = "Generate fixed-layout tax form documents")]
struct Cli {
    /// Generator config as JSON; defaults apply to anything left out.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one form, from a record file, stdin, or a synthesized record.
    Single {
        #[arg(long, default_value = "1040")]
        kind: FormKind,
        /// Record JSON. Use `-` for stdin. Omit to synthesize one.
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a batch and package it into a ZIP archive.
    Batch {
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
        #[arg(long, value_enum, default_value_t = ModeArg::Triplet)]
        mode: ModeArg,
        /// Form kind for `--mode single`.
        #[arg(long, default_value = "1040")]
        kind: FormKind,
        #[arg(long, value_enum, default_value_t = StrategyArg::Incremental)]
        strategy: StrategyArg,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Also write the manifest next to the archive in this format.
        #[arg(long, value_enum)]
        manifest: Option<ManifestArg>,
    },
    /// Print what a generated PDF contains.
    Inspect { file: PathBuf },
    /// Print an example record.
    Example,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Single,
    Triplet,
    Composite,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Incremental,
    Random,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ManifestArg {
    Csv,
    Json,
}

impl From<ManifestArg> for ManifestFormat {
    fn from(arg: ManifestArg) -> Self {
        match arg {
            ManifestArg::Csv => ManifestFormat::Csv,
            ManifestArg::Json => ManifestFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TaxFormError> {
    let config = match &cli.config {
        Some(path) => GeneratorConfig::from_json(&fs::read_to_string(path)?)?,
        None => GeneratorConfig::default(),
    };

    match cli.command {
        Command::Single {
            kind,
            input,
            year,
            output,
        } => single(config, kind, input.as_deref(), year, output),
        Command::Batch {
            count,
            years,
            mode,
            kind,
            strategy,
            seed,
            out_dir,
            manifest,
        } => {
            let mode = match mode {
                ModeArg::Single => BatchMode::Single(kind),
                ModeArg::Triplet => BatchMode::Triplet,
                ModeArg::Composite => BatchMode::Composite,
            };
            let strategy = match strategy {
                StrategyArg::Incremental => StrategyChoice::Incremental,
                StrategyArg::Random => StrategyChoice::Random { seed },
            };
            let request = BatchRequest::new(count, mode).with_years(years);
            batch(config, &request, strategy.build().as_ref(), &out_dir, manifest)
        }
        Command::Inspect { file } => {
            let report = inspect(&fs::read(&file)?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Example => {
            print!("{}", example_record_json());
            Ok(())
        }
    }
}

fn single(
    config: GeneratorConfig,
    kind: FormKind,
    input: Option<&str>,
    year: Option<i32>,
    output: Option<PathBuf>,
) -> Result<(), TaxFormError> {
    let record = match input {
        Some("-") => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            FieldRecord::from_json(&buf)?
        }
        Some(path) => FieldRecord::from_json(&fs::read_to_string(path)?)?,
        None => StrategyChoice::Incremental.build().synthesize(kind, 1),
    };
    if record.kind != kind {
        return Err(TaxFormError::InvalidRequest(format!(
            "record is a {} form but --kind is {}",
            record.kind, kind
        )));
    }

    let composer = Composer::new(config);
    let document = composer.generate(Composition::Single(&record), year, &RequestContext::new())?;
    let path = output.unwrap_or_else(|| PathBuf::from(document.file_name()));
    fs::write(&path, document.bytes())?;
    eprintln!("✓ Written {} bytes to {}", document.bytes().len(), path.display());
    Ok(())
}

fn batch(
    config: GeneratorConfig,
    request: &BatchRequest,
    strategy: &dyn RecordStrategy,
    out_dir: &Path,
    manifest: Option<ManifestArg>,
) -> Result<(), TaxFormError> {
    let ctx = RequestContext::new();
    let packager = Packager::new(&config);
    let composer = Composer::new(config);

    let mut last_percent = 0u32;
    let mut progress = |fraction: f64| {
        let percent = (fraction * 100.0).round() as u32;
        if percent != last_percent {
            last_percent = percent;
            eprint!("\r  {:>3}%", percent);
        }
    };
    let output = run_batch(&composer, request, strategy, &ctx, &mut progress)?;
    eprintln!();

    let timestamp = ctx.now();
    let archive = packager.package_batch(&output, &timestamp)?;
    fs::create_dir_all(out_dir)?;
    let archive_path = out_dir.join(&archive.file_name);
    fs::write(&archive_path, &archive.bytes)?;
    eprintln!(
        "✓ Written {} documents ({} bytes) to {}",
        output.len(),
        archive.bytes.len(),
        archive_path.display()
    );

    if let Some(format) = manifest {
        let format = ManifestFormat::from(format);
        let stem = archive.file_name.trim_end_matches(".zip");
        let manifest_path = out_dir.join(format!("{}_manifest.{}", stem, format.extension()));
        fs::write(&manifest_path, render_manifest(&output.manifest, format)?)?;
        eprintln!("✓ Written manifest to {}", manifest_path.display());
    }
    Ok(())
}

fn example_record_json() -> &'static str {
    r##"{
  "kind": "1040",
  "fields": {
    "first_name": "Jane",
    "last_name": "Garcia",
    "id_suffix": "4821",
    "wages": 55000,
    "interest": 1250.5
  }
}
"##
}
