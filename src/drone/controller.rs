//! Drone controller
//!
//! Translates actions into wire commands over the command link. The
//! executor only sees the `DroneController` contract, never the wire.

use crate::transport::CommandLink;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tello_shared::{Action, LinkError};
use tracing::{debug, error, info, warn};

/// Dispatch contract between the executor and the vehicle
#[async_trait]
pub trait DroneController: Send + Sync {
    /// Execute one action to completion; true on success
    async fn execute(&self, action: &Action) -> bool;
}

/// Controller speaking the Tello SDK dialect over a [`CommandLink`]
pub struct TelloController {
    link: Arc<CommandLink>,
}

impl TelloController {
    pub fn new(link: Arc<CommandLink>) -> Self {
        Self { link }
    }

    /// Enter SDK mode. The vehicle ignores everything else until this
    /// handshake succeeds.
    pub async fn connect(&self) -> Result<()> {
        let response = self
            .link
            .send("command", tello_shared::safety::RESPONSE_TIMEOUT)
            .await?;
        if response.is_ok() {
            info!("Drone connected");
            Ok(())
        } else {
            Err(anyhow!("drone refused SDK mode: '{}'", response.text()))
        }
    }

    /// Battery percentage query
    pub async fn battery(&self) -> Result<i64> {
        let response = self
            .link
            .send("battery?", tello_shared::safety::RESPONSE_TIMEOUT)
            .await?;
        response
            .as_number()
            .ok_or_else(|| anyhow!("non-numeric battery reply: '{}'", response.text()))
    }

    /// Start the video stream
    pub async fn stream_on(&self) -> bool {
        self.simple_command("streamon").await
    }

    /// Stop the video stream
    pub async fn stream_off(&self) -> bool {
        self.simple_command("streamoff").await
    }

    async fn simple_command(&self, command: &str) -> bool {
        match self
            .link
            .send(command, tello_shared::safety::RESPONSE_TIMEOUT)
            .await
        {
            Ok(response) if response.is_ok() => true,
            Ok(response) => {
                warn!("Command '{}' rejected: '{}'", command, response.text());
                false
            }
            Err(e) => {
                error!("Command '{}' failed: {}", command, e);
                false
            }
        }
    }
}

#[async_trait]
impl DroneController for TelloController {
    async fn execute(&self, action: &Action) -> bool {
        // The vehicle's cw/ccw commands accept 1-360 degrees; a zero
        // rotation is complete before it starts.
        if matches!(action, Action::Rotate { angle_deg: 0 }) {
            debug!("Zero-degree rotation; nothing to send");
            return true;
        }

        let command = action.wire_command();
        let timeout = action.response_timeout();

        // The vehicle does not reliably answer an emergency kill; it is
        // fire-and-forget by design.
        if matches!(action, Action::EmergencyStop) {
            match self.link.send(&command, Duration::from_secs(2)).await {
                Ok(_) | Err(LinkError::Timeout(_)) => return true,
                Err(e) => {
                    error!("Emergency stop send failed: {}", e);
                    return false;
                }
            }
        }

        let ok = match self.link.send(&command, timeout).await {
            Ok(response) if response.is_ok() => true,
            Ok(response) => {
                warn!(
                    "Action '{}' rejected by drone: '{}'",
                    action.kind(),
                    response.text()
                );
                false
            }
            Err(e) => {
                error!("Action '{}' failed: {}", action.kind(), e);
                false
            }
        };

        // Hover holds position for the requested duration after the
        // vehicle acknowledges the stop.
        if ok {
            if let Action::Hover { duration_s } = action {
                tokio::time::sleep(Duration::from_secs(u64::from(*duration_s))).await;
            }
        }

        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LinkConfig;
    use tokio::net::UdpSocket;

    async fn controller_with_drone() -> (TelloController, UdpSocket) {
        let drone = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = LinkConfig {
            drone_addr: drone.local_addr().unwrap(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
        };
        let link = Arc::new(CommandLink::connect(config).await.unwrap());
        (TelloController::new(link), drone)
    }

    #[tokio::test]
    async fn test_connect_handshake() {
        let (controller, drone) = controller_with_drone().await;

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (n, from) = drone.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"command");
            drone.send_to(b"ok", from).await.unwrap();
        });

        assert!(controller.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_battery_query() {
        let (controller, drone) = controller_with_drone().await;

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (n, from) = drone.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"battery?");
            drone.send_to(b"87\r\n", from).await.unwrap();
        });

        assert_eq!(controller.battery().await.unwrap(), 87);
    }

    #[tokio::test]
    async fn test_execute_reports_rejection() {
        let (controller, drone) = controller_with_drone().await;

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (n, from) = drone.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"takeoff");
            drone.send_to(b"error Motor stop", from).await.unwrap();
        });

        assert!(!controller.execute(&Action::Takeoff).await);
    }

    #[tokio::test]
    async fn test_zero_rotation_never_reaches_the_wire() {
        let (controller, drone) = controller_with_drone().await;

        assert!(controller.execute(&Action::Rotate { angle_deg: 0 }).await);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut buf = [0u8; 1024];
        assert!(drone.try_recv_from(&mut buf).is_err());
    }

    #[tokio::test]
    async fn test_emergency_stop_is_fire_and_forget() {
        // No reply at all: emergency must still count as dispatched
        let (controller, drone) = controller_with_drone().await;

        let listener = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            let (n, _) = drone.recv_from(&mut buf).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        assert!(controller.execute(&Action::EmergencyStop).await);
        assert_eq!(listener.await.unwrap(), "emergency");
    }
}
