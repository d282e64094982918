use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use trkio::check::TrackHealth;
use trkio::io_stream::WriteOptions;
use trkio::sample::{sample_file, SampleOptions, DEFAULT_SAMPLE_RATE};
use trkio::TrackFileReader;

#[derive(Parser)]
#[command(name = "trk", about = "Inspect, check and sample TrackVis .trk files")]
struct Cli {
    /// Log per-track detail
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields
    Info {
        input: PathBuf,
        /// Print the header as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the point count of every track
    Tracks {
        input: PathBuf,
    },
    /// Print the points of one track, or a single point
    Dump {
        input: PathBuf,
        #[arg(short, long)]
        track: usize,
        #[arg(short, long)]
        point: Option<u32>,
    },
    /// Read every record and report damaged tracks
    Check {
        input: PathBuf,
    },
    /// Copy a random sample of tracks into a new file
    Sample {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Probability of keeping each track (0.0-1.0)
        #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
        rate: f64,
        /// Seed for a reproducible selection
        #[arg(short, long)]
        seed: Option<u64>,
        /// Store the number of written tracks in the output header
        #[arg(long)]
        record_count: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, json } => {
            let reader  = TrackFileReader::open_path(&input)?;
            let summary = reader.header()?.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            let recorded = match summary.n_count {
                0 => "not recorded".to_string(),
                n => n.to_string(),
            };
            println!("── .trk file ────────────────────────────────────────────");
            println!("  Path            {}", input.display());
            println!("  Version         {}", summary.version);
            println!("  Dimensions      {:?}", summary.dim);
            println!("  Voxel size      {:?}", summary.voxel_size);
            println!("  Voxel order     {}", summary.voxel_order);
            println!("  Scalars         {} {:?}", summary.n_scalars, summary.scalar_names);
            println!("  Properties      {} {:?}", summary.n_properties, summary.property_names);
            println!("  n_count         {}", recorded);
            println!("  Tracks indexed  {}", reader.track_count());
            match summary.vox_to_ras {
                Some(m) => {
                    println!("  vox_to_ras");
                    for row in m {
                        println!("    {:>10.4} {:>10.4} {:>10.4} {:>10.4}", row[0], row[1], row[2], row[3]);
                    }
                }
                None => println!("  vox_to_ras      not recorded"),
            }
        }

        // ── Tracks ───────────────────────────────────────────────────────────
        Commands::Tracks { input } => {
            let reader = TrackFileReader::open_path(&input)?;
            println!("{:>10} {:>10}", "Track", "Points");
            for i in 0..reader.track_count() {
                if let Some(n) = reader.point_count(i) {
                    println!("{:>10} {:>10}", i, n);
                }
            }
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, track, point } => {
            let mut reader = TrackFileReader::open_path(&input)?;
            match point {
                Some(p) => {
                    let [x, y, z] = reader.read_point(track, p)?;
                    println!("{x} {y} {z}");
                }
                None => {
                    for xyz in reader.read_track(track)?.chunks_exact(3) {
                        println!("{} {} {}", xyz[0], xyz[1], xyz[2]);
                    }
                }
            }
        }

        // ── Check ────────────────────────────────────────────────────────────
        Commands::Check { input } => {
            let mut reader = TrackFileReader::open_path(&input)?;
            let report = reader.validate()?;
            for t in report.tracks.iter().filter(|t| t.health != TrackHealth::Intact) {
                println!("  track {:>8} @ {:>12}  {:?}", t.index, t.offset, t.health);
            }
            println!("{}", report.summary());
            if !report.is_valid() {
                return Err("track file failed validation".into());
            }
        }

        // ── Sample ───────────────────────────────────────────────────────────
        Commands::Sample { input, output, rate, seed, record_count } => {
            let opts = SampleOptions {
                rate,
                seed,
                write: WriteOptions { record_track_count: record_count },
            };
            let report = sample_file(&input, &output, &opts)?;
            println!(
                "Sampled {} of {} track(s) ({} points) → {}",
                report.tracks_written, report.tracks_scanned, report.points_written, output.display()
            );
        }
    }

    Ok(())
}
