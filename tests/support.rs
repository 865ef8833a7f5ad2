use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Blocking line echo server; stops accepting when dropped.
pub struct EchoServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    acceptor: Option<thread::JoinHandle<()>>,
}

impl EchoServer {
    /// Bind on an ephemeral loopback port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub fn start() -> Result<Self, String> {
        let listener =
            TcpListener::bind("127.0.0.1:0").map_err(|err| format!("echo bind failed: {}", err))?;
        let addr = listener
            .local_addr()
            .map_err(|err| format!("echo addr failed: {}", err))?;
        let stop = Arc::new(AtomicBool::new(false));
        let acceptor = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    if let Ok(stream) = stream {
                        thread::spawn(move || echo_lines(stream));
                    }
                }
            })
        };
        Ok(Self {
            addr,
            stop,
            acceptor: Some(acceptor),
        })
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Wake the blocking accept so the loop sees the flag.
        drop(TcpStream::connect(self.addr));
        if let Some(acceptor) = self.acceptor.take() {
            drop(acceptor.join());
        }
    }
}

fn echo_lines(stream: TcpStream) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut writer = stream;
    let mut line = Vec::new();
    while matches!(reader.read_until(b'\n', &mut line), Ok(n) if n > 0) {
        if writer.write_all(&line).is_err() {
            break;
        }
        line.clear();
    }
}

/// A loopback port with nothing listening on it.
///
/// # Errors
///
/// Returns an error if a probe listener cannot be bound.
pub fn closed_port() -> Result<u16, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe listener failed: {}", err))?;
    let port = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?
        .port();
    drop(listener);
    Ok(port)
}

/// Run the `sockstress` binary in `cwd` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_sockstress<I, S>(cwd: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = sockstress_bin()?;
    Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .env("SOCKSTRESS_LOG", "error")
        .env_remove("SOCKSTRESS_HOST")
        .env_remove("SOCKSTRESS_PORT")
        .output()
        .map_err(|err| format!("run sockstress failed: {}", err))
}

/// Fails with both output streams when the process did not exit cleanly.
///
/// # Errors
///
/// Returns an error describing the output of a failed run.
pub fn expect_success(output: &Output) -> Result<String, String> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(format!(
            "stdout: {}\nstderr: {}",
            stdout,
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(stdout)
}

fn sockstress_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_sockstress").map_or_else(
        || Err("CARGO_BIN_EXE_sockstress missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
