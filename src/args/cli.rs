use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::domain::{
    Concurrency, DEFAULT_PARALLEL_CONNECT_LANES, RunConfig, RunMode, Target,
};
use crate::echo::DEFAULT_ECHO_BIND;
use crate::error::ValidationError;

use super::parsers::{parse_duration_arg, parse_positive_usize};
use super::types::{ConcurrencyArg, ModeArg, PositiveUsize};

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a byte echo server to probe against
    Echo(EchoArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EchoArgs {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_ECHO_BIND, env = "SOCKSTRESS_ECHO_BIND")]
    pub bind: String,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "TCP connection load generator: connect-time benchmarks and line-echo latency probes against a single endpoint."
)]
pub struct BenchArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Target host name or IP address
    #[arg(long, default_value = "127.0.0.1", env = "SOCKSTRESS_HOST")]
    pub host: String,

    /// Target TCP port
    #[arg(long, short = 'p', default_value_t = 5050, env = "SOCKSTRESS_PORT")]
    pub port: u16,

    /// Run mode: connect (time connect + close) or probe (echo round trips)
    #[arg(long, default_value = "connect", value_enum)]
    pub mode: ModeArg,

    /// Number of connections (workers) in the run
    #[arg(
        long,
        short = 'c',
        default_value = "100",
        value_parser = parse_positive_usize
    )]
    pub connections: PositiveUsize,

    /// Sequential or parallel workers (default: sequential for connect, parallel for probe)
    #[arg(long, value_enum)]
    pub concurrency: Option<ConcurrencyArg>,

    /// Max workers in flight for parallel runs (connect default: 50, probe default: unbounded)
    #[arg(long = "max-concurrency", value_parser = parse_positive_usize)]
    pub max_concurrency: Option<PositiveUsize>,

    /// Timeout for establishing a connection (supports ms/s/m/h)
    #[arg(
        long = "connect-timeout",
        default_value = "10s",
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// Timeout for one probe exchange, write plus read (supports ms/s/m/h)
    #[arg(
        long = "read-timeout",
        default_value = "5s",
        value_parser = parse_duration_arg
    )]
    pub read_timeout: Duration,

    /// Pause between probes of one client (supports ms/s/m/h)
    #[arg(long, default_value = "100ms", value_parser = parse_duration_arg)]
    pub interval: Duration,

    /// Probe run length (supports ms/s/m/h)
    #[arg(
        long,
        short = 't',
        default_value = "10s",
        value_parser = parse_duration_arg
    )]
    pub duration: Duration,

    /// Probe message text, sent as "<MESSAGE> <client_id> <timestamp_ms>"
    #[arg(long, default_value = "PING")]
    pub message: String,

    /// Extra time granted to in-flight workers after cancellation (supports ms/s/m/h)
    #[arg(
        long = "drain-grace",
        default_value = "1s",
        value_parser = parse_duration_arg
    )]
    pub drain_grace: Duration,

    /// Path to config file (TOML/JSON). Defaults to ./sockstress.toml or ./sockstress.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Directory for CSV exports of the run
    #[arg(long = "output-dir", short = 'o')]
    pub output_dir: Option<String>,

    /// Do not print the summary at the end of the run
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by SOCKSTRESS_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl BenchArgs {
    /// Builds the immutable run description from the parsed options.
    ///
    /// Connect runs fall back to a parallel pool of 50 when
    /// `--max-concurrency` is given without `--concurrency`.
    ///
    /// # Errors
    ///
    /// Returns an error when the resulting configuration is invalid, e.g. a
    /// sequential probe run.
    pub fn run_config(&self) -> Result<RunConfig, ValidationError> {
        let mode = RunMode::from(self.mode);
        let max = self.max_concurrency.map(PositiveUsize::non_zero);
        let concurrency = match (self.concurrency, mode) {
            (Some(ConcurrencyArg::Sequential), _) => Concurrency::Sequential,
            (None, RunMode::Connect) if max.is_none() => Concurrency::Sequential,
            (Some(ConcurrencyArg::Parallel) | None, RunMode::Connect) => Concurrency::Parallel {
                max: max.or(std::num::NonZeroUsize::new(DEFAULT_PARALLEL_CONNECT_LANES)),
            },
            (Some(ConcurrencyArg::Parallel) | None, RunMode::Probe) => {
                Concurrency::Parallel { max }
            }
        };

        let config = RunConfig::new(
            Target::new(self.host.trim(), self.port),
            mode,
            self.connections.non_zero(),
        )
        .with_concurrency(concurrency)
        .with_timeouts(self.connect_timeout, self.read_timeout)
        .with_pacing(self.interval, self.duration)
        .with_drain_grace(self.drain_grace)
        .with_message(self.message.as_str());
        config.validate()?;
        Ok(config)
    }
}
