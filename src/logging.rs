//! Tracing setup.
//!
//! Output goes to a daily log file under the data directory so it never
//! interleaves with command output, or to stderr when running verbose.
//! `FLIGHTDESK_LOG` (then `RUST_LOG`) overrides the default `info` filter.

use std::path::PathBuf;

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_ENV: &str = "FLIGHTDESK_LOG";
const DEFAULT_FILTER: &str = "flightdesk=info";
const VERBOSE_FILTER: &str = "flightdesk=debug";

fn env_filter(verbose: bool) -> EnvFilter {
  let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
  EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_from_default_env())
    .unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn log_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .map(|d| d.join("flightdesk").join("logs"))
    .ok_or_else(|| eyre!("could not determine data directory"))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file output is flushed.
pub fn init(verbose: bool) -> Result<Option<WorkerGuard>> {
  if verbose {
    let _ = tracing_subscriber::registry()
      .with(env_filter(true))
      .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
      .try_init();
    return Ok(None);
  }

  let dir = log_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
  let appender = tracing_appender::rolling::daily(&dir, "flightdesk.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let _ = tracing_subscriber::registry()
    .with(env_filter(false))
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .try_init();

  Ok(Some(guard))
}
