//! Minimal HTTP/1.1 server that replays canned responses in order and records
//! every request it receives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use stylegpt::{ApiClient, ClientConfig, MemoryStorage, Storage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone, Debug)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    /// Body pieces, written with `pause` in between.
    pub chunks: Vec<String>,
    pub pause: Duration,
}

impl Canned {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_string()],
            pause: Duration::ZERO,
        }
    }

    pub fn events(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            pause: Duration::from_millis(10),
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct CannedServer {
    pub url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl CannedServer {
    pub async fn start(responses: Vec<Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let recorded = Arc::new(Mutex::new(Vec::new()));

        let log = recorded.clone();
        tokio::spawn(async move {
            let mut queue = VecDeque::from(responses);
            while let Ok((socket, _)) = listener.accept().await {
                let canned = queue
                    .pop_front()
                    .unwrap_or_else(|| Canned::json(500, serde_json::json!({"error": "unexpected request"})));
                if let Err(err) = handle(socket, canned, &log).await {
                    eprintln!("canned server: {err}");
                }
            }
        });

        Self { url, recorded }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

/// Client whose both services point at `server`, with a short retry delay.
pub fn client_for(server: &CannedServer) -> (ApiClient, Arc<MemoryStorage>) {
    let store = Arc::new(MemoryStorage::new());
    let config = ClientConfig::default()
        .with_api_url(&server.url)
        .with_fashion_chat_url(&server.url)
        .with_retry_delay(Duration::from_millis(20));
    let shared: Arc<dyn Storage> = store.clone();
    (ApiClient::new(config, shared), store)
}

async fn handle(
    mut socket: TcpStream,
    canned: Canned,
    log: &Mutex<Vec<Recorded>>,
) -> std::io::Result<()> {
    let request = read_request(&mut socket).await?;
    log.lock().unwrap().push(request);

    let head = format!(
        "HTTP/1.1 {} Canned\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
        canned.status, canned.content_type
    );
    socket.write_all(head.as_bytes()).await?;
    for (i, chunk) in canned.chunks.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(canned.pause).await;
        }
        socket.write_all(chunk.as_bytes()).await?;
        socket.flush().await?;
    }
    socket.shutdown().await
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
        .collect();

    let length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok());
    let chunked = headers
        .iter()
        .any(|(key, value)| key == "transfer-encoding" && value.contains("chunked"));

    loop {
        let body = &buf[header_end..];
        let complete = match length {
            Some(len) => body.len() >= len,
            None if chunked => body.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if complete {
            break;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(Recorded {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
