//! Video packet receiver
//!
//! Binds the vehicle's video port and keeps the newest packet available
//! for the perception collaborator. The payload is opaque: nothing here
//! parses or decodes the stream.

use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Configuration for the video stream receiver
#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// Local bind address; the Tello streams to port 11111
    pub bind_addr: SocketAddr,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 11111)),
        }
    }
}

/// Receives opaque video packets and exposes the latest one
pub struct VideoStream {
    latest: Arc<std::sync::Mutex<Option<Bytes>>>,
    packets: Arc<AtomicU64>,
    local_addr: SocketAddr,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl VideoStream {
    /// Bind the video socket and start receiving
    pub async fn start(config: VideoConfig) -> io::Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        let local_addr = socket.local_addr()?;
        let latest = Arc::new(std::sync::Mutex::new(None));
        let packets = Arc::new(AtomicU64::new(0));

        let latest_clone = latest.clone();
        let packets_clone = packets.clone();
        let task = tokio::spawn(async move {
            let mut buf = [0u8; 2048];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, _)) => {
                        *latest_clone.lock().unwrap_or_else(|e| e.into_inner()) =
                            Some(Bytes::copy_from_slice(&buf[..n]));
                        packets_clone.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        debug!("Video receiver stopped: {}", e);
                        break;
                    }
                }
            }
        });

        info!("Video stream listening on {}", local_addr);

        Ok(Self {
            latest,
            packets,
            local_addr,
            task: std::sync::Mutex::new(Some(task)),
        })
    }

    /// The most recent raw packet, if any has arrived
    pub fn latest_packet(&self) -> Option<Bytes> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Total packets received since start
    pub fn packet_count(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop receiving and release the socket. Safe to call twice.
    pub fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            task.abort();
            info!("Video stream stopped");
        }
    }
}

impl Drop for VideoStream {
    fn drop(&mut self) {
        self.stop();
    }
}
