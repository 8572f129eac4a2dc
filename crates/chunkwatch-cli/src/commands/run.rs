//! `chunkwatch run`: process chunks with a live CPU window, then seal the result.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Serialize;

use chunkwatch_core::{Pipeline, PipelineConfig, RunOutcome, SamplerStart, TimedSurface};

use crate::tui::app::TerminalSurface;

pub struct RunCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub chunks: Option<usize>,
    pub chunk_size: Option<usize>,
    pub work_delay_ms: Option<u64>,
    pub window_secs: Option<f64>,
    pub tick_ms: Option<u64>,
    pub sample_interval_ms: Option<u64>,
    pub missing_rate: Option<f64>,
    pub seed: Option<u64>,
    pub sample_after_processing: bool,
    pub headless: bool,
    pub duration_secs: Option<f64>,
    pub fixed_cpu: Option<f64>,
    pub fixed_mem: Option<f64>,
    pub output_path: Option<&'a str>,
    pub summary_path: Option<&'a str>,
}

/// JSON written by `--summary`. Holds no key material.
#[derive(Debug, Serialize)]
struct RunSummary {
    run_id: String,
    chunkwatch_version: String,
    chunks: usize,
    rows: usize,
    dropped_rows: usize,
    samples: usize,
    worker_samples: usize,
    skipped_samples: usize,
    render_ticks: u64,
    frames_drawn: u64,
    plaintext_bytes: usize,
    ciphertext_bytes: usize,
    ciphertext_sha256: String,
    sealed_path: Option<String>,
}

/// Apply command-line overrides on top of the file/default config.
fn apply_overrides(mut config: PipelineConfig, cmd: &RunCommandConfig<'_>) -> PipelineConfig {
    if let Some(n) = cmd.chunks {
        config.chunk_count = n;
    }
    if let Some(n) = cmd.chunk_size {
        config.chunk_size = n;
    }
    if let Some(ms) = cmd.work_delay_ms {
        config.work_delay_ms = ms;
    }
    if let Some(w) = cmd.window_secs {
        config.visible_window_secs = w;
    }
    if let Some(ms) = cmd.tick_ms {
        config.render_tick_ms = ms;
    }
    if let Some(ms) = cmd.sample_interval_ms {
        config.sample_interval_ms = ms;
    }
    if let Some(rate) = cmd.missing_rate {
        config.missing_rate = rate;
    }
    if cmd.seed.is_some() {
        config.seed = cmd.seed;
    }
    if cmd.sample_after_processing {
        config.sampler_start = SamplerStart::AfterProcessing;
    }
    config
}

fn summarize(outcome: &RunOutcome, sealed_path: Option<&str>) -> RunSummary {
    RunSummary {
        run_id: uuid::Uuid::new_v4().to_string(),
        chunkwatch_version: chunkwatch_core::VERSION.to_string(),
        chunks: outcome.worker.chunks,
        rows: outcome.worker.rows,
        dropped_rows: outcome.worker.dropped_rows,
        samples: outcome.samples.len(),
        worker_samples: outcome.worker.samples,
        skipped_samples: outcome.worker.skipped_samples,
        render_ticks: outcome.render.ticks,
        frames_drawn: outcome.render.frames_drawn,
        plaintext_bytes: outcome.sealed.plaintext_len(),
        ciphertext_bytes: outcome.sealed.ciphertext().len(),
        ciphertext_sha256: outcome.sealed.fingerprint(),
        sealed_path: sealed_path.map(str::to_string),
    }
}

/// Run the pipeline command.
pub fn run(cmd: RunCommandConfig<'_>) {
    let config = apply_overrides(super::load_config(cmd.config_path), &cmd);
    let source = super::make_source(&config, cmd.fixed_cpu, cmd.fixed_mem);

    let pipeline = match Pipeline::new(config) {
        Ok(p) => p.with_source(source),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = if cmd.headless {
        let mut surface = TimedSurface::new(cmd.duration_secs.map(Duration::from_secs_f64));
        let stop = surface.stop_handle();
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
            log::warn!("could not install Ctrl+C handler: {e}");
        }
        pipeline.run(&mut surface)
    } else {
        let mut surface = TerminalSurface::new();
        pipeline.run(&mut surface)
    };

    let outcome = match result {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    report(&outcome, cmd.output_path, cmd.summary_path);
}

fn report(outcome: &RunOutcome, output_path: Option<&str>, summary_path: Option<&str>) {
    let sealed = &outcome.sealed;
    println!(
        "Processed {} chunks ({} rows, {} dropped), {} CPU samples.",
        outcome.worker.chunks,
        outcome.worker.rows,
        outcome.worker.dropped_rows,
        outcome.samples.len()
    );
    println!();
    println!("Data processed and encrypted. Encryption key (store it safely):");
    println!("{}", sealed.key().expose());
    println!();

    match output_path {
        Some(path) => {
            if let Err(e) = std::fs::write(path, sealed.ciphertext()) {
                eprintln!("Error writing {path}: {e}");
                std::process::exit(1);
            }
            println!("Sealed payload written to {path}");
        }
        None => {
            println!("Sealed payload:");
            println!("{}", String::from_utf8_lossy(sealed.ciphertext()));
        }
    }
    println!("  {} bytes, sha256 {}", sealed.ciphertext().len(), sealed.fingerprint());

    if let Some(path) = summary_path {
        let summary = summarize(outcome, output_path);
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                if let Err(e) = std::fs::write(Path::new(path), json) {
                    eprintln!("Error writing {path}: {e}");
                    std::process::exit(1);
                }
                println!("Summary written to {path}");
            }
            Err(e) => {
                eprintln!("Error serializing summary: {e}");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cmd() -> RunCommandConfig<'static> {
        RunCommandConfig {
            config_path: None,
            chunks: None,
            chunk_size: None,
            work_delay_ms: None,
            window_secs: None,
            tick_ms: None,
            sample_interval_ms: None,
            missing_rate: None,
            seed: None,
            sample_after_processing: false,
            headless: true,
            duration_secs: None,
            fixed_cpu: None,
            fixed_mem: None,
            output_path: None,
            summary_path: None,
        }
    }

    #[test]
    fn no_flags_keep_config() {
        let base = PipelineConfig::default();
        assert_eq!(apply_overrides(base.clone(), &empty_cmd()), base);
    }

    #[test]
    fn flags_override_config() {
        let cmd = RunCommandConfig {
            chunks: Some(3),
            chunk_size: Some(10),
            window_secs: Some(20.0),
            seed: Some(4),
            sample_after_processing: true,
            ..empty_cmd()
        };
        let c = apply_overrides(PipelineConfig::default(), &cmd);
        assert_eq!(c.chunk_count, 3);
        assert_eq!(c.chunk_size, 10);
        assert_eq!(c.visible_window_secs, 20.0);
        assert_eq!(c.seed, Some(4));
        assert_eq!(c.sampler_start, SamplerStart::AfterProcessing);
    }

    #[test]
    fn summary_never_contains_key() {
        let pipeline = Pipeline::new(PipelineConfig {
            chunk_count: 2,
            chunk_size: 5,
            work_delay_ms: 0,
            render_tick_ms: 10,
            ..Default::default()
        })
        .unwrap()
        .with_source(std::sync::Arc::new(chunkwatch_core::FixedSensor::new(
            42.0, 10.0,
        )));
        let mut surface = TimedSurface::new(Some(Duration::from_millis(50)));
        let outcome = pipeline.run(&mut surface).unwrap();

        let json = serde_json::to_string(&summarize(&outcome, Some("out.bin"))).unwrap();
        assert!(!json.contains(outcome.sealed.key().expose()));
        assert!(json.contains("\"chunks\":2"));
        assert!(json.contains("out.bin"));
    }
}
