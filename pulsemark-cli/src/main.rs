mod audio;
mod telemetry;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use pulsemark_core::{DetectConfig, PcmBuffer, ScanConfig, ToneSpec, WatermarkSpec, export, watermark};

#[derive(Parser)]
#[command(name = "pulsemark", about = "Low-frequency audio watermarking tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mix a watermark into a WAV file
    Encode {
        /// Input WAV file (any bit depth, mono or stereo)
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file (16-bit stereo)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        tones: ToneArgs,
    },
    /// Write a watermark over silence
    Generate {
        /// Output WAV file (16-bit stereo)
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "20")]
        duration: f64,

        /// Sample rate in Hz
        #[arg(long, default_value = "44100")]
        sample_rate: u32,

        #[command(flatten)]
        tones: ToneArgs,
    },
    /// Detect a watermark in a WAV file
    Detect {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Write the magnitude grid as CSV (rows = Hz, columns = hops)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the magnitude grid as JSON
        #[arg(long)]
        grid_json: Option<PathBuf>,

        /// Report every frequency above threshold instead of the top two
        #[arg(long)]
        all: bool,

        /// Minimum magnitude variance over time
        #[arg(long, default_value = "0.0001")]
        min_variance: f64,

        /// Minimum mean magnitude
        #[arg(long, default_value = "0.001")]
        min_magnitude: f64,

        /// Lowest scanned frequency in Hz
        #[arg(long, default_value = "30")]
        freq_low: u32,

        /// Highest scanned frequency in Hz
        #[arg(long, default_value = "60")]
        freq_high: u32,
    },
}

#[derive(Args)]
struct ToneArgs {
    /// Watermark tone as HZ:PULSE_RATE, e.g. 37:0.25 (repeat for 2-3 tones)
    #[arg(short, long = "tone", value_parser = parse_tone)]
    tones: Vec<ToneSpec>,

    /// Draw random tones instead of --tone
    #[arg(long, conflicts_with = "tones")]
    random: bool,

    /// Number of random tones
    #[arg(long, default_value = "3")]
    count: usize,

    /// Seed for --random (entropy if omitted)
    #[arg(long, requires = "random")]
    seed: Option<u64>,
}

fn parse_tone(s: &str) -> Result<ToneSpec, String> {
    let (hz, rate) = s
        .split_once(':')
        .ok_or_else(|| format!("expected HZ:PULSE_RATE, got {s:?}"))?;
    let hz: u32 = hz
        .trim()
        .parse()
        .map_err(|e| format!("bad frequency {hz:?}: {e}"))?;
    let rate: f64 = rate
        .trim()
        .parse()
        .map_err(|e| format!("bad pulse rate {rate:?}: {e}"))?;
    Ok(ToneSpec::new(hz, rate))
}

fn resolve_spec(args: ToneArgs) -> Result<WatermarkSpec, Box<dyn std::error::Error>> {
    if !args.random {
        if args.tones.is_empty() {
            return Err("give --tone HZ:RATE two or three times, or --random".into());
        }
        return Ok(WatermarkSpec::new(args.tones)?);
    }

    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let generated = WatermarkSpec::generate(&mut rng, args.count)?;
    if generated.exhausted {
        warn!(
            attempts = generated.attempts,
            kept = generated.spec.tones().len(),
            "could not place all tones {} Hz apart, using best effort",
            watermark::MIN_SEPARATION_HZ
        );
    }
    Ok(generated.spec)
}

fn print_spec(spec: &WatermarkSpec) {
    for tone in spec.tones() {
        println!(
            "Tone: {} Hz pulsing at {} Hz",
            tone.frequency_hz, tone.pulse_rate_hz
        );
    }
}

fn write_encoded(
    output: &Path,
    host: &PcmBuffer,
    spec: &WatermarkSpec,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = pulsemark_core::encode_wav(host, spec)?;
    std::fs::write(output, bytes)?;
    eprintln!("Watermarked audio written to {}", output.display());
    print_spec(spec);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Encode {
            input,
            output,
            tones,
        } => {
            let spec = resolve_spec(tones)?;
            let host = audio::read_wav(&input)?;

            eprintln!(
                "Embedding watermark into {} ({} samples, {} ch, {}Hz)...",
                input.display(),
                host.len(),
                host.num_channels(),
                host.sample_rate()
            );
            if host.duration_seconds() < ScanConfig::default().span_seconds {
                eprintln!(
                    "Warning: audio is {:.2}s long; detection analyses {:.0}s and will see a clamped window.",
                    host.duration_seconds(),
                    ScanConfig::default().span_seconds
                );
            }

            write_encoded(&output, &host, &spec)?;
        }
        Command::Generate {
            output,
            duration,
            sample_rate,
            tones,
        } => {
            let spec = resolve_spec(tones)?;
            let host = PcmBuffer::silence(sample_rate, 2, duration)?;
            info!(duration, sample_rate, "generating watermark over silence");
            write_encoded(&output, &host, &spec)?;
        }
        Command::Detect {
            input,
            json,
            csv,
            grid_json,
            all,
            min_variance,
            min_magnitude,
            freq_low,
            freq_high,
        } => {
            let buf = audio::read_wav(&input)?;
            let scan_config = ScanConfig {
                freq_low,
                freq_high,
                ..ScanConfig::default()
            };
            let detect_config = DetectConfig {
                min_variance,
                min_magnitude,
                max_results: if all { None } else { Some(2) },
            };

            eprintln!(
                "Detecting watermark in {} ({} samples, {}Hz)...",
                input.display(),
                buf.len(),
                buf.sample_rate()
            );
            if buf.num_channels() > 1 {
                eprintln!("Note: only the first channel is analysed.");
            }

            #[cfg(feature = "parallel")]
            let analysis = pulsemark_core::analyze_parallel(&buf, &scan_config, &detect_config)?;
            #[cfg(not(feature = "parallel"))]
            let analysis =
                pulsemark_core::analyze_with_config(&buf, &scan_config, &detect_config)?;

            if let Some(path) = &csv {
                std::fs::write(path, export::grid_to_csv(&analysis.grid))?;
                eprintln!("Grid CSV written to {}", path.display());
            }
            if let Some(path) = &grid_json {
                std::fs::write(path, export::grid_to_json(&analysis.grid)?)?;
                eprintln!("Grid JSON written to {}", path.display());
            }

            if json {
                println!("{}", export::analysis_to_json(&analysis, false)?);
            } else {
                for (i, r) in analysis.results.iter().enumerate() {
                    println!("Detection #{}", i + 1);
                    println!("  Frequency:  {} Hz", r.frequency_hz);
                    println!("  Pulse rate: {:.1} Hz", r.pulse_rate_estimate);
                    println!("  Variance:   {:.3e}", r.variance);
                    println!("  Magnitude:  {:.4}", r.avg_magnitude);
                }
            }

            if !analysis.is_watermarked() {
                eprintln!("No watermark detected.");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
