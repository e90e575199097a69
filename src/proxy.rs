//! # TCP reverse proxy fronting the supervised backend.
//!
//! Clients connect to a stable listen address while the backend is
//! repeatedly killed and restarted behind it. Each accepted connection dials
//! the backend with a bounded retry ([`RetryPolicy`]) so the brief
//! kill→build→restart gap is absorbed here, not by the controller; once
//! connected, bytes are streamed both ways until either side closes.
//!
//! ```text
//! client ──► TcpListener (cfg.port) ──► accept loop ──► connect w/ retry ──► backend (cfg.backend)
//!                                           │
//!                                    CancellationToken (close)
//! ```
//!
//! The accept loop runs independently of the rebuild cycle; it is torn down
//! by [`Proxy::close`] via a cancellation token. In-flight connections are
//! not interrupted by `close` — their forward tasks finish on their own.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Listen/forward addresses for one proxy instance.
///
/// `port = 0` binds an ephemeral port (used by tests); the bound address is
/// returned from [`Proxy::run`].
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Public port the proxy listens on.
    pub port: u16,
    /// Backend address connections are forwarded to, e.g. `127.0.0.1:8080`.
    pub backend: String,
}

/// Bounded retry schedule for dialing the backend.
///
/// The delay for attempt `n` is `first × factor^n`, clamped to `max`; after
/// `attempts` failures the connection is given up and reported. Defaults
/// cover roughly two seconds — comfortably wider than a kill→build→restart
/// gap for a small service, without retrying forever against a backend that
/// never comes up.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Initial delay after the first failed dial.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Total dial attempts before giving up.
    pub attempts: u32,
}

impl Default for RetryPolicy {
    /// `first = 50ms`, `max = 250ms`, `factor = 2.0`, `attempts = 12`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(50),
            max: Duration::from_millis(250),
            factor: 2.0,
            attempts: 12,
        }
    }
}

impl RetryPolicy {
    /// Computes the delay after the given attempt number (0-indexed).
    ///
    /// The base is `first × factor^attempt`, clamped to [`RetryPolicy::max`].
    /// Non-finite or negative intermediate values clamp to `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// TCP reverse proxy with cancellable accept loop.
///
/// `run` once, `close` once; both take `&self` so the proxy can be owned by
/// the controller while the supervisor starts it beforehand.
pub struct Proxy {
    bus: Bus,
    retry: RetryPolicy,
    token: CancellationToken,
    accept: Mutex<Option<JoinHandle<()>>>,
}

impl Proxy {
    /// Creates a proxy publishing reachability events to `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            retry: RetryPolicy::default(),
            token: CancellationToken::new(),
            accept: Mutex::new(None),
        }
    }

    /// Overrides the backend connect retry schedule.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Binds the listen address and spawns the accept loop.
    ///
    /// Returns the bound address. A bind failure is fatal at startup
    /// ([`RuntimeError::ProxyBind`]): there is no usable system without the
    /// proxy.
    pub async fn run(&self, cfg: &ProxyConfig) -> Result<SocketAddr, RuntimeError> {
        let addr = format!("127.0.0.1:{}", cfg.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| RuntimeError::ProxyBind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener
            .local_addr()
            .map_err(|source| RuntimeError::ProxyBind { addr, source })?;

        let backend: Arc<str> = cfg.backend.as_str().into();
        let token = self.token.clone();
        let bus = self.bus.clone();
        let retry = self.retry;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((inbound, _peer)) => {
                            let backend = Arc::clone(&backend);
                            let bus = bus.clone();
                            tokio::spawn(async move {
                                forward(inbound, &backend, retry, &bus).await;
                            });
                        }
                        // transient accept errors (EMFILE and friends); don't spin
                        Err(_) => time::sleep(Duration::from_millis(50)).await,
                    },
                }
            }
        });

        *self.accept.lock().await = Some(handle);
        Ok(local)
    }

    /// Stops accepting inbound connections and waits for the accept loop.
    ///
    /// Idempotent; in-flight connections are left to finish on their own.
    pub async fn close(&self) -> io::Result<()> {
        self.token.cancel();
        if let Some(handle) = self.accept.lock().await.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

/// Dials the backend (with retry) and streams bytes both ways.
async fn forward(mut inbound: TcpStream, backend: &str, retry: RetryPolicy, bus: &Bus) {
    let Some(mut outbound) = connect_with_retry(backend, retry, bus).await else {
        return; // inbound drops, client sees a reset
    };
    let _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await;
}

/// Dials `backend` up to `retry.attempts` times.
///
/// The backend being briefly unreachable is expected during a restart gap;
/// only exhaustion is reported, as [`EventKind::BackendUnreachable`].
async fn connect_with_retry(backend: &str, retry: RetryPolicy, bus: &Bus) -> Option<TcpStream> {
    let mut last_err = None;
    for attempt in 0..retry.attempts {
        match TcpStream::connect(backend).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < retry.attempts {
                    time::sleep(retry.delay(attempt)).await;
                }
            }
        }
    }

    let reason = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no attempts configured".to_string());
    bus.publish(Event::new(EventKind::BackendUnreachable).with_reason(reason));
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_millis(40),
            factor: 2.0,
            attempts: 30,
        }
    }

    #[test]
    fn test_retry_delay_growth_and_cap() {
        let p = RetryPolicy {
            first: Duration::from_millis(50),
            max: Duration::from_millis(250),
            factor: 2.0,
            attempts: 12,
        };
        assert_eq!(p.delay(0), Duration::from_millis(50));
        assert_eq!(p.delay(1), Duration::from_millis(100));
        assert_eq!(p.delay(2), Duration::from_millis(200));
        assert_eq!(p.delay(3), Duration::from_millis(250));
        assert_eq!(p.delay(100), Duration::from_millis(250));
    }

    #[test]
    fn test_retry_huge_attempt_clamps_to_max() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(u32::MAX), p.max);
    }

    #[tokio::test]
    async fn test_forwards_bytes_to_backend() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr = backend.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut s, _) = backend.accept().await.unwrap();
            let mut buf = [0u8; 4];
            s.read_exact(&mut buf).await.unwrap();
            s.write_all(&buf).await.unwrap();
        });

        let proxy = Proxy::new(Bus::new(16));
        let addr = proxy
            .run(&ProxyConfig {
                port: 0,
                backend: backend_addr.to_string(),
            })
            .await
            .unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        proxy.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_tolerates_backend_restart_gap() {
        // Reserve an ephemeral port, then free it so the backend is down
        // when the client connects through the proxy.
        let placeholder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backend_addr = placeholder.local_addr().unwrap();
        drop(placeholder);

        let proxy = Proxy::new(Bus::new(16)).with_retry(fast_retry());
        let addr = proxy
            .run(&ProxyConfig {
                port: 0,
                backend: backend_addr.to_string(),
            })
            .await
            .unwrap();

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hi").await.unwrap();

        // Backend comes up inside the retry window.
        time::sleep(Duration::from_millis(60)).await;
        let backend = TcpListener::bind(backend_addr).await.unwrap();
        tokio::spawn(async move {
            let (mut s, _) = backend.accept().await.unwrap();
            let mut buf = [0u8; 2];
            s.read_exact(&mut buf).await.unwrap();
            s.write_all(&buf).await.unwrap();
        });

        let mut buf = [0u8; 2];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");

        proxy.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_exhausted_retries_publish_unreachable() {
        let placeholder = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = placeholder.local_addr().unwrap();
        drop(placeholder);

        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let proxy = Proxy::new(bus).with_retry(RetryPolicy {
            first: Duration::from_millis(1),
            max: Duration::from_millis(2),
            factor: 1.0,
            attempts: 3,
        });
        let addr = proxy
            .run(&ProxyConfig {
                port: 0,
                backend: dead_addr.to_string(),
            })
            .await
            .unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();

        let ev = time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ev.kind, EventKind::BackendUnreachable);

        proxy.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let proxy = Proxy::new(Bus::new(4));
        let addr = proxy
            .run(&ProxyConfig {
                port: 0,
                backend: "127.0.0.1:1".to_string(),
            })
            .await
            .unwrap();

        proxy.close().await.unwrap();
        proxy.close().await.unwrap();

        // the listener is gone after close
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
