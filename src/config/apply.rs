use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{BenchArgs, PositiveUsize};
use crate::error::{AppResult, ConfigError};

use super::types::ConfigFile;

/// Applies configuration values to CLI arguments that were not given
/// explicitly on the command line.
///
/// # Errors
///
/// Returns an error when a config value is out of range or unparsable.
pub fn apply_config(
    args: &mut BenchArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "host")
        && let Some(host) = config.host.clone()
    {
        args.host = host;
    }

    if !is_cli(matches, "port")
        && let Some(port) = config.port
    {
        args.port = port;
    }

    if !is_cli(matches, "mode")
        && let Some(mode) = config.mode
    {
        args.mode = mode;
    }

    if !is_cli(matches, "connections")
        && let Some(connections) = config.connections
    {
        args.connections = ensure_positive_usize(connections, "connections")?;
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = Some(concurrency);
    }

    if !is_cli(matches, "max_concurrency")
        && let Some(max) = config.max_concurrency
    {
        args.max_concurrency = Some(ensure_positive_usize(max, "max_concurrency")?);
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = timeout.to_duration("connect_timeout")?;
    }

    if !is_cli(matches, "read_timeout")
        && let Some(timeout) = config.read_timeout.as_ref()
    {
        args.read_timeout = timeout.to_duration("read_timeout")?;
    }

    if !is_cli(matches, "interval")
        && let Some(interval) = config.interval.as_ref()
    {
        args.interval = interval.to_duration("interval")?;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration.as_ref()
    {
        args.duration = duration.to_duration("duration")?;
    }

    if !is_cli(matches, "message")
        && let Some(message) = config.message.clone()
    {
        args.message = message;
    }

    if !is_cli(matches, "drain_grace")
        && let Some(grace) = config.drain_grace.as_ref()
    {
        args.drain_grace = grace.to_duration("drain_grace")?;
    }

    if !is_cli(matches, "output_dir")
        && let Some(dir) = config.output_dir.clone()
    {
        args.output_dir = Some(dir);
    }

    if !is_cli(matches, "quiet")
        && let Some(quiet) = config.quiet
    {
        args.quiet = quiet;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_usize(value: usize, field: &'static str) -> Result<PositiveUsize, ConfigError> {
    PositiveUsize::try_from(value)
        .map_err(|source| ConfigError::FieldMustBePositive { field, source })
}
