use std::future::{Future, pending};
use std::io;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::domain::{RunConfig, RunMode, Target};
use crate::error::{AppError, AppResult};
use crate::samples::MemorySink;

use super::transport::{Connection, Connector};
use super::{RunOutcome, Scheduler};


const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn connections(value: usize) -> AppResult<NonZeroUsize> {
    NonZeroUsize::new(value).ok_or_else(|| AppError::validation("zero connections"))
}

fn config_for(addr: SocketAddr, mode: RunMode, count: usize) -> AppResult<RunConfig> {
    Ok(RunConfig::new(
        Target::new(addr.ip().to_string(), addr.port()),
        mode,
        connections(count)?,
    )
    .with_timeouts(Duration::from_secs(1), Duration::from_secs(1))
    .with_drain_grace(Duration::from_millis(100)))
}

fn stub_config(mode: RunMode, count: usize) -> AppResult<RunConfig> {
    Ok(
        RunConfig::new(Target::new("stub.invalid", 5050), mode, connections(count)?)
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(1))
            .with_drain_grace(Duration::from_millis(100)),
    )
}

async fn run_with(
    scheduler: &Scheduler,
    config: &RunConfig,
    shutdown: Option<crate::shutdown::ShutdownReceiver>,
) -> AppResult<RunOutcome> {
    tokio::time::timeout(TEST_TIMEOUT, scheduler.run_all(config, shutdown))
        .await
        .map_err(|err| AppError::validation(format!("Run did not finish: {}", err)))?
}

fn memory_scheduler(connector: Arc<dyn Connector>) -> Scheduler {
    Scheduler::new(connector, Arc::new(MemorySink::new()))
}

/// Line echo peer on an ephemeral loopback port.
async fn spawn_echo_server() -> AppResult<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                drop(tokio::io::copy(&mut reader, &mut writer).await);
            });
        }
    });
    Ok((addr, handle))
}

/// Peer that answers the first line with `reply`, then holds the socket open.
async fn spawn_scripted_peer(reply: Vec<u8>) -> AppResult<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let mut stream = BufReader::new(stream);
        let mut request = String::new();
        if stream.read_line(&mut request).await.is_err() {
            return;
        }
        if stream.get_mut().write_all(&reply).await.is_err() {
            return;
        }
        sleep(TEST_TIMEOUT).await;
    });
    Ok((addr, handle))
}

/// A loopback port with nothing listening on it.
fn closed_port() -> AppResult<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

#[derive(Debug, Clone, Copy)]
enum StubBehavior {
    /// Echo every probe back.
    Echo,
    /// Echo, but reset the connection of `client` after `after` answered probes.
    ResetClient { client: u64, after: u64 },
    /// Close the stream instead of answering.
    Eof,
    /// Answer with the probe minus its line terminator.
    PartialLine,
    /// Never answer.
    StallRead,
    /// Never answer and never finish closing.
    StallReadAndClose,
}

/// In-memory connector with scripted peers.
struct StubConnector {
    behavior: StubBehavior,
    connect_delay: Duration,
    fail_every: Option<u64>,
    attempts: AtomicU64,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl StubConnector {
    fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            connect_delay: Duration::ZERO,
            fail_every: None,
            attempts: AtomicU64::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    const fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Refuses every `every`-th connect attempt (1-based).
    const fn failing_every(mut self, every: u64) -> Self {
        self.fail_every = Some(every);
        self
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self, _target: &Target) -> io::Result<Box<dyn Connection>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let active = self.active.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        self.peak.fetch_max(active, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            sleep(self.connect_delay).await;
        }
        let refused = self
            .fail_every
            .is_some_and(|every| attempt.checked_rem(every) == Some(0));
        if refused {
            self.active.fetch_sub(1, Ordering::SeqCst);
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
        }
        Ok(Box::new(StubConnection {
            behavior: self.behavior,
            last_line: None,
            answered: 0,
            active: Arc::clone(&self.active),
        }))
    }
}

struct StubConnection {
    behavior: StubBehavior,
    last_line: Option<String>,
    answered: u64,
    active: Arc<AtomicUsize>,
}

impl StubConnection {
    fn client_id(&self) -> Option<u64> {
        self.last_line
            .as_deref()?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    }

    fn echo(&mut self, line: &mut String) -> io::Result<usize> {
        let Some(last) = self.last_line.take() else {
            return Ok(0);
        };
        line.push_str(&last);
        self.answered = self.answered.saturating_add(1);
        Ok(last.len())
    }
}

#[async_trait]
impl Connection for StubConnection {
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.last_line = Some(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    async fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        match self.behavior {
            StubBehavior::Echo => self.echo(line),
            StubBehavior::ResetClient { client, after } => {
                if self.client_id() == Some(client) && self.answered >= after {
                    return Err(io::Error::from(io::ErrorKind::ConnectionReset));
                }
                self.echo(line)
            }
            StubBehavior::Eof => Ok(0),
            StubBehavior::PartialLine => {
                let last = self.last_line.take().unwrap_or_default();
                let partial = last.trim_end_matches('\n');
                line.push_str(partial);
                Ok(partial.len())
            }
            StubBehavior::StallRead | StubBehavior::StallReadAndClose => pending().await,
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        if matches!(self.behavior, StubBehavior::StallReadAndClose) {
            pending::<()>().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
