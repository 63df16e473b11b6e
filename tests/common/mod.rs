//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use xredis::ClusterOptions;

pub const PONG: &str = "+PONG\r\n";
pub const OK: &str = "+OK\r\n";
pub const NIL: &str = "$-1\r\n";

pub fn bulk(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}

pub fn error(message: &str) -> String {
    format!("-ERR {message}\r\n")
}

/// What a scripted mock does with one command.
#[allow(dead_code)]
pub enum Action {
    Reply(String),
    /// Reply after a pause, holding up the connection meanwhile.
    Delay(Duration, String),
    /// Never reply.
    Hang,
    /// Close the socket without replying.
    Close,
}

/// In-process RESP server answering through a programmable script.
///
/// Connection setup traffic (`CLIENT SETINFO`, `SELECT`, `AUTH`) is answered
/// with `+OK` and never reaches the script or the counters.
pub struct MockRedis {
    pub addr: SocketAddr,
    commands: Arc<Mutex<HashMap<String, usize>>>,
    connections: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl MockRedis {
    /// Commands received with the given (upper case) name.
    pub fn count(&self, name: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockRedis {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a mock answering PING with PONG, everything else through `reply`.
pub async fn start_mock_redis<F>(reply: F) -> MockRedis
where
    F: Fn(&[String]) -> String + Send + Sync + 'static,
{
    start_scripted_redis(move |args| {
        if args[0].eq_ignore_ascii_case("PING") {
            Action::Reply(PONG.to_string())
        } else {
            Action::Reply(reply(args))
        }
    })
    .await
}

/// Start a mock handing every command, PING included, to `script`.
pub async fn start_scripted_redis<F>(script: F) -> MockRedis
where
    F: Fn(&[String]) -> Action + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let script = Arc::new(script);
    let commands = Arc::new(Mutex::new(HashMap::new()));
    let connections = Arc::new(AtomicUsize::new(0));

    let handle = {
        let commands = commands.clone();
        let connections = connections.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                connections.fetch_add(1, Ordering::SeqCst);
                let script = script.clone();
                let commands = commands.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, script, commands).await;
                });
            }
        })
    };

    MockRedis {
        addr,
        commands,
        connections,
        handle,
    }
}

async fn serve<F>(
    socket: TcpStream,
    script: Arc<F>,
    commands: Arc<Mutex<HashMap<String, usize>>>,
) -> std::io::Result<()>
where
    F: Fn(&[String]) -> Action + Send + Sync + 'static,
{
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    while let Some(args) = read_command(&mut reader).await? {
        let Some(name) = args.first().map(|name| name.to_ascii_uppercase()) else {
            continue;
        };
        let action = match name.as_str() {
            "CLIENT" | "SELECT" | "AUTH" => Action::Reply(OK.to_string()),
            _ => {
                *commands.lock().unwrap().entry(name.clone()).or_insert(0) += 1;
                script(&args)
            }
        };
        match action {
            Action::Reply(response) => write.write_all(response.as_bytes()).await?,
            Action::Delay(pause, response) => {
                tokio::time::sleep(pause).await;
                write.write_all(response.as_bytes()).await?;
            }
            Action::Hang => std::future::pending::<()>().await,
            Action::Close => return Ok(()),
        }
    }
    Ok(())
}

async fn read_command<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<Vec<String>>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    let count: usize = line
        .trim_end()
        .strip_prefix('*')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "expected array"))?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        line.clear();
        reader.read_line(&mut line).await?;
        let len: usize = line
            .trim_end()
            .strip_prefix('$')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, "expected bulk string")
            })?;
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).await?;
        buf.truncate(len);
        args.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(Some(args))
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Options with short timeouts for talking to local mocks.
pub fn test_options(addrs: &[SocketAddr]) -> ClusterOptions {
    let mut options = ClusterOptions::new(addrs.iter().map(|addr| addr.to_string()));
    options.client.dial_timeout_ms = 500;
    options.client.read_timeout_ms = 500;
    options.client.write_timeout_ms = 500;
    options.client.pool_timeout_ms = Some(500);
    options.balancer.check_interval_ms = 100;
    options
}

/// Poll `condition` every 20ms until it holds or `limit` elapses.
#[allow(dead_code)]
pub async fn wait_until<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
