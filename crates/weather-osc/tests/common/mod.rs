//! Test helpers: a scripted HTTP server and an in-memory OSC sink

#![allow(dead_code)]

use async_trait::async_trait;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use weather_osc::config::PartialConfig;
use weather_osc::{
    Config, Destinations, OpenWeatherClient, OscMessage, OscSink, PollLoop, RetryPolicy,
};

/// How the stub server answers one request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with the given status and body
    Json(u16, String),
    /// Read the request, then never answer
    Hang,
}

/// Minimal HTTP/1.1 server replaying scripted replies in order.
///
/// The last reply repeats once the script runs out.
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "stub server needs at least one reply");

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let url = format!("http://{}/data/2.5/weather", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let counter = Arc::new(AtomicUsize::new(0));
        let replies = Arc::new(replies);

        {
            let requests = requests.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        break;
                    };
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    let reply = replies[index.min(replies.len() - 1)].clone();
                    let requests = requests.clone();
                    tokio::spawn(handle(stream, reply, requests));
                }
            });
        }

        Self { url, requests }
    }

    /// Request lines received so far, e.g. `GET /data/2.5/weather?q=.. HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(mut stream: TcpStream, reply: Reply, requests: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    let mut buffer = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buffer[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let request_line = head.lines().next().unwrap_or_default().to_string();
    requests.lock().unwrap().push(request_line);

    match reply {
        Reply::Json(status, body) => {
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    }
}

/// Records every message instead of sending it.
#[derive(Clone, Default)]
pub struct CaptureSink {
    sent: Arc<Mutex<Vec<(SocketAddr, OscMessage)>>>,
}

impl CaptureSink {
    pub fn sent(&self) -> Vec<(SocketAddr, OscMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OscSink for CaptureSink {
    async fn send(&self, target: SocketAddr, message: &OscMessage) -> io::Result<()> {
        self.sent.lock().unwrap().push((target, message.clone()));
        Ok(())
    }
}

pub fn test_config(units: &str) -> Config {
    PartialConfig {
        api_key: Some("secret-key".into()),
        location: Some("New York".into()),
        units: Some(units.parse().unwrap()),
        ..Default::default()
    }
    .resolve()
    .unwrap()
}

/// Poll loop wired to `server` with a short timeout and no retry delay.
pub fn poll_loop_for(
    server: &StubServer,
    config: Config,
    sink: CaptureSink,
) -> PollLoop<OpenWeatherClient, CaptureSink> {
    let config = Config {
        api_url: server.url.clone(),
        ..config
    };
    let client = OpenWeatherClient::with_timeout(&config, Duration::from_millis(300)).unwrap();
    let destinations = Destinations::new(Ipv4Addr::LOCALHOST.into(), config.base_port);
    PollLoop::new(config, client, sink, destinations).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
    })
}

pub fn weather_body(temp: f64, wind: f64, rain: Option<f64>) -> String {
    let mut body = serde_json::json!({
        "coord": {"lon": -74.006, "lat": 40.7143},
        "main": {"temp": temp, "feels_like": temp, "pressure": 1016, "humidity": 58},
        "wind": {"speed": wind, "deg": 240},
        "name": "New York",
        "cod": 200
    });
    if let Some(rain) = rain {
        body["rain"] = serde_json::json!({"1h": rain});
    }
    body.to_string()
}
