//! env_logger setup.
//!
//! The TUI owns the terminal, so records go to `--log-file` when given and
//! are otherwise disabled in TUI mode unless `RUST_LOG` asks for them.

use std::fs::File;

use env_logger::{Builder, Env, Target};

pub fn init(log_file: Option<&str>, tui_mode: bool) -> std::io::Result<()> {
    let default_level = match (log_file, tui_mode) {
        (Some(_), _) => "info",
        (None, true) => "off",
        (None, false) => "info",
    };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format_timestamp_millis();

    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    // A second init (tests) is harmless.
    let _ = builder.try_init();
    Ok(())
}
