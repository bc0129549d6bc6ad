//! Permission gate
//!
//! Verifies the OS capabilities needed before scanning. All three are
//! requested together so the platform shows a single prompt.

use crate::infrastructure::bluetooth::radio::{RadioStack, REQUIRED_CAPABILITIES};
use tracing::{info, warn};

pub struct PermissionGate;

impl PermissionGate {
    /// True only when every required capability is granted.
    ///
    /// A denial or a failed check is final for this attempt; the caller
    /// asks again on the next user action.
    pub async fn ensure_permissions<R: RadioStack + ?Sized>(radio: &R) -> bool {
        let grants = match radio.request_capabilities(&REQUIRED_CAPABILITIES).await {
            Ok(grants) => grants,
            Err(e) => {
                warn!("Permission check failed: {}", e);
                return false;
            }
        };

        let denied: Vec<_> = REQUIRED_CAPABILITIES
            .iter()
            .filter(|c| !grants.get(*c).copied().unwrap_or(false))
            .collect();

        if denied.is_empty() {
            info!("Bluetooth permissions granted");
            true
        } else {
            warn!("Bluetooth permissions denied: {:?}", denied);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::radio::mock::MockRadio;
    use crate::infrastructure::bluetooth::radio::Capability;

    #[tokio::test]
    async fn test_all_granted() {
        let radio = MockRadio::granting_all();
        assert!(PermissionGate::ensure_permissions(&radio).await);
        assert_eq!(radio.permission_requests(), 1);
    }

    #[tokio::test]
    async fn test_single_denial_blocks() {
        let radio = MockRadio::granting_all();
        radio.grant(Capability::Location, false);
        assert!(!PermissionGate::ensure_permissions(&radio).await);
        // one batched request, no retry
        assert_eq!(radio.permission_requests(), 1);
    }

    #[tokio::test]
    async fn test_check_error_blocks() {
        let radio = MockRadio::granting_all();
        radio.fail_permission_check();
        assert!(!PermissionGate::ensure_permissions(&radio).await);
    }
}
