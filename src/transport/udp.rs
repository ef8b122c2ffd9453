//! UDP command link
//!
//! One socket, one background receiver, and a single response slot. The
//! Tello wire protocol has no request IDs, so the link enforces a single
//! outstanding command: every inbound datagram is treated as the reply to
//! whatever command is currently in flight. The `in_flight` mutex is held
//! across the whole send/await pair; a second `send` blocks behind it
//! rather than interleaving.

use bytes::Bytes;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tello_shared::{safety, LinkError};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the command link
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Drone command address
    pub drone_addr: SocketAddr,
    /// Local bind address; port 0 lets the system pick
    pub bind_addr: SocketAddr,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            drone_addr: SocketAddr::from(([192, 168, 10, 1], 8889)),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
        }
    }
}

/// A single reply datagram from the vehicle
#[derive(Debug, Clone)]
pub struct Response {
    payload: Bytes,
    from: SocketAddr,
}

impl Response {
    /// The vehicle signals success with an affirmative token ("ok",
    /// sometimes "OK") somewhere in the reply.
    pub fn is_ok(&self) -> bool {
        self.text().to_ascii_lowercase().contains("ok")
    }

    /// Reply as trimmed text (lossy; the protocol is plain ASCII)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).trim().to_string()
    }

    /// Parse a numeric query reply such as battery percentage
    pub fn as_number(&self) -> Option<i64> {
        self.text().parse().ok()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn source_addr(&self) -> SocketAddr {
        self.from
    }
}

/// The outstanding-response slot shared between the receiver task and the
/// waiter in `send`. One value, one wakeup.
struct ResponseSlot {
    value: std::sync::Mutex<Option<Response>>,
    ready: Notify,
}

impl ResponseSlot {
    fn new() -> Self {
        Self {
            value: std::sync::Mutex::new(None),
            ready: Notify::new(),
        }
    }

    /// Drop any stale response left over from an abandoned command
    fn clear(&self) {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Store the newest datagram and wake exactly one waiter
    fn put(&self, response: Response) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(response);
        self.ready.notify_one();
    }

    async fn wait(&self) -> Response {
        loop {
            let notified = self.ready.notified();
            if let Some(response) = self.value.lock().unwrap_or_else(|e| e.into_inner()).take() {
                return response;
            }
            notified.await;
        }
    }
}

/// UDP command transport with retry, timeout, and response correlation
pub struct CommandLink {
    socket: Arc<UdpSocket>,
    drone_addr: SocketAddr,
    slot: Arc<ResponseSlot>,
    /// Held for the full send/await pair; enforces one outstanding command
    in_flight: Mutex<()>,
    recv_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl CommandLink {
    /// Bind the command socket and start the background receiver
    pub async fn connect(config: LinkConfig) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        let slot = Arc::new(ResponseSlot::new());

        let recv_socket = socket.clone();
        let recv_slot = slot.clone();
        let recv_task = tokio::spawn(async move {
            receive_loop(recv_socket, recv_slot).await;
        });

        info!(
            "Command link bound to {} for drone {}",
            socket.local_addr()?,
            config.drone_addr
        );

        Ok(Self {
            socket,
            drone_addr: config.drone_addr,
            slot,
            in_flight: Mutex::new(()),
            recv_task: std::sync::Mutex::new(Some(recv_task)),
            closed: AtomicBool::new(false),
        })
    }

    /// Local socket address (useful for tests)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send a command string and wait for its single correlated reply.
    ///
    /// Blocks the caller (never the receiver) until a response arrives or
    /// the wall-clock `timeout` elapses.
    pub async fn send(&self, command: &str, timeout: Duration) -> Result<Response, LinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LinkError::Closed);
        }
        self.dispatch(command, timeout).await
    }

    /// Inner send path, also used by `close` for the final streamoff
    async fn dispatch(&self, command: &str, timeout: Duration) -> Result<Response, LinkError> {
        let _guard = self.in_flight.lock().await;

        // A response left behind by a previous, abandoned command belongs
        // to that command, not this one.
        self.slot.clear();

        debug!("Sending command: '{}' to {}", command, self.drone_addr);

        let socket = self.socket.clone();
        let addr = self.drone_addr;
        let payload: Arc<[u8]> = command.as_bytes().into();
        send_attempts(
            move || {
                let socket = socket.clone();
                let payload = payload.clone();
                async move { socket.send_to(&payload, addr).await.map(|_| ()) }
            },
            safety::SEND_MAX_ATTEMPTS,
            safety::SEND_RETRY_DELAY,
        )
        .await?;

        match tokio::time::timeout(timeout, self.slot.wait()).await {
            Ok(response) => {
                debug!("Command '{}' response: '{}'", command, response.text());
                Ok(response)
            }
            Err(_) => {
                warn!("Command '{}' timed out after {:?}", command, timeout);
                Err(LinkError::Timeout(timeout))
            }
        }
    }

    /// Scoped release: stop any active stream, then release the socket.
    /// Safe to call multiple times.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.dispatch("streamoff", Duration::from_secs(3)).await {
            debug!("streamoff during close failed: {}", e);
        }

        let task = self.recv_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            task.abort();
        }
        info!("Command link closed");
    }
}

/// Background receiver: blocks on socket receipt for the lifetime of the
/// link. A socket error is the clean stop signal, not a fault.
async fn receive_loop(socket: Arc<UdpSocket>, slot: Arc<ResponseSlot>) {
    let mut buf = [0u8; 1024];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, from)) => {
                debug!("Received {} bytes from {}", n, from);
                slot.put(Response {
                    payload: Bytes::copy_from_slice(&buf[..n]),
                    from,
                });
            }
            Err(e) => {
                debug!("Receiver stopped: {}", e);
                break;
            }
        }
    }
}

/// Run `attempt` up to `max_attempts` times with a fixed delay between
/// failures, returning the last error once exhausted.
async fn send_attempts<F, Fut>(
    mut attempt: F,
    max_attempts: u32,
    delay: Duration,
) -> io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let mut last_err = None;
    for n in 1..=max_attempts {
        match attempt().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!("Send attempt {}/{} failed: {}", n, max_attempts, e);
                last_err = Some(e);
                if n < max_attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("no send attempts made")))
}
