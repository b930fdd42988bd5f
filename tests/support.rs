use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    hits: Arc<AtomicU64>,
}

impl ServerHandle {
    /// Requests served so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a small fake of the TWIST API that answers every route the virtual
/// users call with a payload that passes its checks.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_api_server() -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let hits = Arc::new(AtomicU64::new(0));
    let server_hits = Arc::clone(&hits);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    server_hits.fetch_add(1, Ordering::Relaxed);
                    thread::spawn(move || handle_client(stream));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            hits,
        },
    ))
}

fn route(method: &str, path: &str) -> &'static str {
    match (method, path) {
        ("POST", "/api/auth/login") => r#"{"token":"e2e-token"}"#,
        ("POST", "/api/staking/stake") => r#"{"success":true,"transactionId":"tx-1"}"#,
        ("POST", "/api/staking/claim") => r#"{"claimed":"0"}"#,
        ("GET", "/api/staking/user/stakes") => r#"[{"influencer":{"id":"inf-1"}}]"#,
        ("GET", p) if p.starts_with("/api/staking/search") => r#"[{"id":"inf-1"}]"#,
        ("GET", p) if p.starts_with("/api/influencers/") => r#"{"pool":{},"metrics":{}}"#,
        ("GET", p) if p.starts_with("/api/content?") => r#"{"items":[{"id":"content-1"}]}"#,
        _ => r#"{"ok":true}"#,
    }
}

fn handle_client(stream: TcpStream) {
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let payload = route(&method, &path);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let mut stream = stream;
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

/// Run the `twist-loadtest` binary and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_loadtest<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = loadtest_bin()?;
    Command::new(bin)
        .args(args)
        .env("TWIST_LOADTEST_LOG", "error")
        .env_remove("TWIST_LOADTEST_HOST")
        .output()
        .map_err(|err| format!("run twist-loadtest failed: {}", err))
}

fn loadtest_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_twist-loadtest").map_or_else(
        || Err("CARGO_BIN_EXE_twist-loadtest missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
