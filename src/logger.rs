// src/logger.rs
// =============================================================================
// Diagnostic logging to stderr through the `log` facade.
//
// RUST_LOG wins when it is set. Otherwise the default filter follows the
// number of -v flags: none = warn, -v = info, -vv and more = debug.
// Our own crate is the only one raised; dependencies stay at warn.
// =============================================================================

use log::LevelFilter;

// Level for this crate's own log lines
fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

// Initializes env_logger; safe to call once per process
pub fn init(verbosity: u8) {
    let default_filter = format!(
        "warn,{}={}",
        env!("CARGO_PKG_NAME").replace('-', "_"),
        level_for(verbosity).as_str().to_lowercase()
    );

    let result = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .format_timestamp(None)
    .try_init();

    if let Err(e) = result {
        eprintln!("Warning: logger already initialized: {}", e);
    }
}
