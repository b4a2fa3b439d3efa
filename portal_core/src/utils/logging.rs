use log::LevelFilter;

/// Initialize logging using env_logger.
///
/// `default_level` applies when `RUST_LOG` is unset; `RUST_LOG` always wins,
/// e.g. `RUST_LOG=portal_core=debug ssh-portal connect web-1`.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(default_level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}
