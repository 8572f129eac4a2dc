//! CLI for chunkwatch: process chunks, watch the CPU window, seal the result.

mod commands;
mod logging;
mod tui;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chunkwatch")]
#[command(about = "chunkwatch: process data in chunks while watching CPU live, then seal the result")]
#[command(version = chunkwatch_core::VERSION)]
struct Cli {
    /// Write log records to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process chunks with a live CPU chart, then encrypt the result.
    /// The encryption key is printed once at the end; store it safely.
    Run {
        /// JSON config file; flags below override its values
        #[arg(long)]
        config: Option<String>,

        /// Number of chunks to process
        #[arg(long)]
        chunks: Option<usize>,

        /// Rows per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Simulated work per chunk in milliseconds
        #[arg(long)]
        work_delay_ms: Option<u64>,

        /// Width of the visible time window in seconds
        #[arg(long)]
        window: Option<f64>,

        /// Render tick in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Background sampling interval in milliseconds
        #[arg(long)]
        sample_interval_ms: Option<u64>,

        /// Fraction of generated rows with a missing value (0.0 - 1.0)
        #[arg(long)]
        missing_rate: Option<f64>,

        /// Seed for reproducible chunk contents
        #[arg(long)]
        seed: Option<u64>,

        /// Start background sampling only after processing finishes
        #[arg(long)]
        sample_after_processing: bool,

        /// Run without the terminal chart (log frames instead)
        #[arg(long)]
        headless: bool,

        /// Headless only: keep the virtual display open this many seconds
        /// (default: until Ctrl+C)
        #[arg(long)]
        duration: Option<f64>,

        /// Report this CPU percentage instead of reading the host
        #[arg(long)]
        fixed_cpu: Option<f64>,

        /// Report this memory percentage instead of reading the host
        #[arg(long, requires = "fixed_cpu")]
        fixed_mem: Option<f64>,

        /// Write the sealed payload here (default: print it)
        #[arg(long)]
        output: Option<String>,

        /// Write a JSON run summary here (never contains the key)
        #[arg(long)]
        summary: Option<String>,
    },

    /// Decrypt a sealed payload back to CSV
    Unseal {
        /// Key printed by `chunkwatch run`
        #[arg(long)]
        key: String,

        /// File holding the sealed payload
        #[arg(long)]
        input: String,

        /// Write the CSV here (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let tui_mode = matches!(
        cli.command,
        Commands::Run {
            headless: false,
            ..
        }
    );
    if let Err(e) = logging::init(cli.log_file.as_deref(), tui_mode) {
        eprintln!("Error: cannot open log file: {e}");
        std::process::exit(1);
    }

    match cli.command {
        Commands::Run {
            config,
            chunks,
            chunk_size,
            work_delay_ms,
            window,
            tick_ms,
            sample_interval_ms,
            missing_rate,
            seed,
            sample_after_processing,
            headless,
            duration,
            fixed_cpu,
            fixed_mem,
            output,
            summary,
        } => commands::run::run(commands::run::RunCommandConfig {
            config_path: config.as_deref(),
            chunks,
            chunk_size,
            work_delay_ms,
            window_secs: window,
            tick_ms,
            sample_interval_ms,
            missing_rate,
            seed,
            sample_after_processing,
            headless,
            duration_secs: duration,
            fixed_cpu,
            fixed_mem,
            output_path: output.as_deref(),
            summary_path: summary.as_deref(),
        }),
        Commands::Unseal { key, input, output } => {
            commands::unseal::run(&key, &input, output.as_deref())
        }
    }
}
