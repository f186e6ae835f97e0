//! Heartbeat monitor — follower-side check that the leader is alive.

use beacon_core::HeartbeatReply;
use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::node::Node;

/// What one heartbeat to the believed leader produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// The leader acknowledged.
    Acked { leader: String },
    /// The callee is not leader and pointed elsewhere (or nowhere).
    Redirected { from: String, to: Option<String> },
    /// The leader could not be reached; it was forgotten.
    LeaderLost { leader: String, error: ClusterError },
    /// The call failed without proving the leader dead.
    Failed { leader: String, error: ClusterError },
}

impl Node {
    /// Send one heartbeat to the believed leader.
    ///
    /// Returns `None` when there is nobody to heartbeat: no leader known,
    /// or this node is the leader.
    pub async fn send_heartbeat(&self) -> Option<HeartbeatOutcome> {
        let leader = self.state().leader().await?;
        if leader == self.name() {
            return None;
        }

        let sender = self.name().to_string();
        let message = format!("heartbeat from {sender}");
        let result = self
            .call_peer(&leader, move |p| async move {
                p.receive_heartbeat(&sender, &message).await
            })
            .await;

        let outcome = match result {
            Ok(HeartbeatReply::Ack { message }) => {
                self.state().mark_acked(&leader).await;
                debug!(%leader, response = %message, "leader responded to heartbeat");
                HeartbeatOutcome::Acked { leader }
            }
            Ok(HeartbeatReply::Rejection { leader: target }) => {
                info!(%leader, redirect = ?target, "leader says it is not leader now");
                let to = target.filter(|t| !t.is_empty() && t != self.name());
                self.state().replace_leader(&leader, to.clone()).await;
                HeartbeatOutcome::Redirected { from: leader, to }
            }
            Err(error) if error.dead_peer().is_some() => {
                warn!(%leader, %error, "leader not in quorum now");
                self.state().replace_leader(&leader, None).await;
                self.forget_peer(&leader).await;
                HeartbeatOutcome::LeaderLost { leader, error }
            }
            Err(error) => {
                warn!(%leader, %error, "heartbeat failed");
                HeartbeatOutcome::Failed { leader, error }
            }
        };
        Some(outcome)
    }
}
