// splatbench-cli/src/main.rs

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use batch::{BatchDriver, BenchmarkRequest, IterationFilter};
use clap::{Parser, Subcommand};
use log::{info, warn};
use roundtrip::{CodecOptions, RoundTripEngine, RoundTripRequest};
use splatbench_common::common_config::CONFIG;
use splatbench_common::{CompressionFormat, Device, FileFormat};

#[derive(Parser)]
#[command(name = "splatbench")]
#[command(about = "splatbench: round-trip benchmark for splat compression codecs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress and decompress one .ply file, print and record the statistics
    RoundTrip {
        input: PathBuf,

        #[arg(short, long, value_enum)]
        format: CompressionFormat,

        /// Defaults to <stem>.<format> next to the input
        #[arg(long)]
        compressed: Option<PathBuf>,

        /// Defaults to <stem>_decompressed_<format>.ply next to the input
        #[arg(long)]
        decompressed: Option<PathBuf>,

        #[arg(long)]
        overwrite: bool,

        #[arg(long)]
        use_cpu: bool,
    },

    /// Round-trip every scene of a directory or .tar corpus
    Benchmark {
        source: PathBuf,

        output_dir: PathBuf,

        #[arg(short, long = "format", value_enum, required = true)]
        formats: Vec<CompressionFormat>,

        /// Keep scenes whose path contains any of these; defaults to the configured iteration
        #[arg(long)]
        iteration_filter: Vec<String>,

        /// Process every scene regardless of iteration
        #[arg(long, conflicts_with = "iteration_filter")]
        no_filter: bool,

        #[arg(long)]
        overwrite: bool,

        #[arg(long)]
        use_cpu: bool,

        #[arg(long)]
        keep_extracted: bool,

        /// Treat the source as a directory of per-scene tars and process one at a time
        #[arg(long)]
        streaming: bool,
    },

    /// Convert between .ply and one compressed format
    Convert {
        input: PathBuf,

        output: PathBuf,

        #[arg(long, value_enum)]
        from: FileFormat,

        #[arg(long, value_enum)]
        to: FileFormat,

        #[arg(long)]
        overwrite: bool,

        #[arg(long)]
        use_cpu: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::RoundTrip {
            input,
            format,
            compressed,
            decompressed,
            overwrite,
            use_cpu,
        } => {
            let request = RoundTripRequest {
                compressed,
                decompressed,
                overwrite,
                device: Device::from_use_cpu(use_cpu),
                ..RoundTripRequest::new(&input, format)
            };
            let stats = RoundTripEngine::from_config()
                .run(&request)
                .with_context(|| format!("round trip of {} as {}", input.display(), format))?;
            println!("{stats}");
        }

        Commands::Benchmark {
            source,
            output_dir,
            formats,
            iteration_filter,
            no_filter,
            overwrite,
            use_cpu,
            keep_extracted,
            streaming,
        } => {
            let iteration_filter = if no_filter {
                IterationFilter::none()
            } else if iteration_filter.is_empty() {
                IterationFilter::new([CONFIG.default_iteration_filter.clone()])
            } else {
                IterationFilter::new(iteration_filter)
            };
            let request = BenchmarkRequest {
                source,
                output_dir,
                formats,
                iteration_filter,
                overwrite,
                device: Device::from_use_cpu(use_cpu),
                keep_extracted,
            };

            info!(
                "Benchmarking {} into {} with formats {:?}",
                request.source.display(),
                request.output_dir.display(),
                request.formats
            );
            let driver = BatchDriver::from_config();
            let report = if streaming {
                driver.run_streaming(&request)
            } else {
                driver.run(&request)
            }
            .with_context(|| format!("benchmark of {}", request.source.display()))?;

            println!("\nBenchmark done:");
            println!("  Scenes:       {}", report.assets);
            println!("  Round trips:  {}", report.succeeded);
            println!("  Skipped:      {}", report.skipped);
            println!("  Failed:       {}", report.failures.len());
            if !report.failures.is_empty() {
                warn!("{} round trips failed, see the log above", report.failures.len());
            }
            for archive in &report.archives {
                println!("  Archive:      {}", archive.display());
            }
        }

        Commands::Convert {
            input,
            output,
            from,
            to,
            overwrite,
            use_cpu,
        } => {
            if from == to {
                bail!("--from and --to are both .{from}");
            }
            let options = CodecOptions {
                overwrite,
                device: Device::from_use_cpu(use_cpu),
            };
            RoundTripEngine::from_config()
                .codec()
                .convert(from, to, &input, &output, options)
                .with_context(|| format!("converting {} to {}", input.display(), output.display()))?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}
