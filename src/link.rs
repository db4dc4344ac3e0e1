//! Network link capability.
//!
//! Connectivity management (drivers, association, DHCP, bounded reconnect
//! timeouts) is an external collaborator; the engine only asks whether the
//! link is up and, if not, asks it to come back.

use async_trait::async_trait;

/// Errors that can occur while recovering connectivity.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkError {
    /// The link could not be re-established
    ReconnectFailed(String),
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::ReconnectFailed(msg) => write!(f, "reconnect failed: {}", msg),
        }
    }
}

impl std::error::Error for LinkError {}

/// Capability trait for the network link carrying deliveries.
#[async_trait]
pub trait NetworkLink: Send {
    /// Whether the link is currently usable.
    fn is_connected(&self) -> bool;

    /// Attempt to bring the link back up.
    ///
    /// Attempt bounds and timeouts are the implementation's concern.
    async fn reconnect(&mut self) -> Result<(), LinkError>;
}

/// Link for hosts whose connectivity is owned by the operating system.
///
/// Reports connected and treats reconnect as a no-op; transport-level
/// failures still surface per upload attempt.
pub struct OsManagedLink;

#[async_trait]
impl NetworkLink for OsManagedLink {
    fn is_connected(&self) -> bool {
        true
    }

    async fn reconnect(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockLink;
    use super::*;

    #[tokio::test]
    async fn test_os_managed_link_is_always_up() {
        let mut link = OsManagedLink;
        assert!(link.is_connected());
        assert!(link.reconnect().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_link_recovers_after_scripted_failures() {
        let mut link = MockLink::offline_until(2);
        assert!(!link.is_connected());

        assert!(link.reconnect().await.is_err());
        assert!(link.reconnect().await.is_err());
        assert!(!link.is_connected());

        assert!(link.reconnect().await.is_ok());
        assert!(link.is_connected());
        assert_eq!(link.reconnect_calls(), 3);
    }

    #[test]
    fn test_link_error_display() {
        assert_eq!(
            format!("{}", LinkError::ReconnectFailed("no access point".to_string())),
            "reconnect failed: no access point"
        );
    }
}
