//! Membership tracker — leader-side liveness sweep over known followers.
//!
//! Followers join the set only by heartbeating the leader. The sweep is
//! the only thing that removes them: it probes a snapshot of the set and
//! prunes each follower that cannot be reached, leaving names added by
//! concurrent heartbeats untouched.

use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::node::Node;

/// Result of one sweep.
#[derive(Debug, Clone, Default)]
pub struct Sweep {
    /// Followers probed (size of the snapshot).
    pub probed: usize,
    /// Followers removed because they were unreachable.
    pub pruned: Vec<String>,
    pub errors: Vec<ClusterError>,
}

impl Node {
    /// Probe every known follower. Returns `None` when not leader.
    pub async fn sweep_followers(&self) -> Option<Sweep> {
        if self.state().leader().await.as_deref() != Some(self.name()) {
            return None;
        }

        let followers = self.state().followers().await;
        debug!(followers = followers.len(), "checking for dead followers");

        let mut sweep = Sweep {
            probed: followers.len(),
            ..Default::default()
        };

        for follower in followers {
            match self
                .call_peer(&follower, |p| async move { p.get_leader().await })
                .await
            {
                Ok(leader) => {
                    if leader.as_deref() != Some(self.name()) {
                        debug!(%follower, ?leader, "follower is alive but follows another leader");
                    }
                }
                Err(e) if e.dead_peer().is_some() => {
                    warn!(%follower, error = %e, "follower is dead");
                    self.state().remove_follower(&follower).await;
                    self.forget_peer(&follower).await;
                    sweep.pruned.push(follower);
                    sweep.errors.push(e);
                }
                Err(e) => {
                    warn!(%follower, error = %e, "follower probe failed");
                    sweep.errors.push(e);
                }
            }
        }

        if !sweep.pruned.is_empty() {
            info!(pruned = sweep.pruned.len(), "pruned dead followers");
        }
        Some(sweep)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use beacon_core::{Directory, MemoryDirectory, NodeIdentity, NodeRpc};

    use super::*;
    use crate::local::LocalNetwork;

    async fn spawn(name: &str, dir: &MemoryDirectory, net: &LocalNetwork) -> Node {
        let node = Node::new(
            NodeIdentity::new(name, format!("{name}:1"), true),
            Arc::new(dir.clone()),
            Arc::new(net.clone()),
            Duration::from_millis(200),
        );
        net.attach(&node).await;
        node.register().await.unwrap();
        node
    }

    /// a leads, b and c heartbeat it once.
    async fn led_cluster(dir: &MemoryDirectory, net: &LocalNetwork) -> (Node, Node, Node) {
        let a = spawn("node-a", dir, net).await;
        let b = spawn("node-b", dir, net).await;
        let c = spawn("node-c", dir, net).await;
        a.run_election("node-a").await.unwrap();
        b.send_heartbeat().await.unwrap();
        c.send_heartbeat().await.unwrap();
        (a, b, c)
    }

    #[tokio::test]
    async fn followers_do_not_sweep() {
        let dir = MemoryDirectory::new();
        let net = LocalNetwork::new();
        let (_a, b, _c) = led_cluster(&dir, &net).await;

        assert!(b.sweep_followers().await.is_none());
    }

    #[tokio::test]
    async fn live_followers_are_kept() {
        let dir = MemoryDirectory::new();
        let net = LocalNetwork::new();
        let (a, _b, _c) = led_cluster(&dir, &net).await;

        let sweep = a.sweep_followers().await.unwrap();
        assert_eq!(sweep.probed, 2);
        assert!(sweep.pruned.is_empty());
        assert_eq!(a.state().followers().await, vec!["node-b", "node-c"]);
    }

    #[tokio::test]
    async fn dead_follower_is_pruned_and_unbound() {
        let dir = MemoryDirectory::new();
        let net = LocalNetwork::new();
        let (a, _b, _c) = led_cluster(&dir, &net).await;
        net.kill("node-c:1").await;

        let sweep = a.sweep_followers().await.unwrap();
        assert_eq!(sweep.pruned, vec!["node-c"]);
        assert_eq!(a.state().followers().await, vec!["node-b"]);
        assert!(dir.lookup("node-c").await.unwrap().is_none());
        assert!(dir.lookup("node-b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn revived_follower_rejoins_by_heartbeat() {
        let dir = MemoryDirectory::new();
        let net = LocalNetwork::new();
        let (a, _b, c) = led_cluster(&dir, &net).await;
        net.kill("node-c:1").await;
        a.sweep_followers().await.unwrap();

        net.revive("node-c:1").await;
        c.register().await.unwrap();
        c.send_heartbeat().await.unwrap();
        assert_eq!(a.state().followers().await, vec!["node-b", "node-c"]);
    }

    #[tokio::test]
    async fn sweep_tolerates_concurrent_heartbeats() {
        let dir = MemoryDirectory::new();
        let net = LocalNetwork::new();
        let (a, _b, _c) = led_cluster(&dir, &net).await;
        let d = spawn("node-d", &dir, &net).await;
        d.adopt_leader("node-a").await.unwrap();
        net.kill("node-b:1").await;

        let sweeper = a.clone();
        let sweep = tokio::spawn(async move { sweeper.sweep_followers().await });
        d.send_heartbeat().await.unwrap();
        let sweep = sweep.await.unwrap().unwrap();

        assert_eq!(sweep.pruned, vec!["node-b"]);
        let followers = a.state().followers().await;
        assert!(followers.contains(&"node-d".to_string()));
        assert!(!followers.contains(&"node-b".to_string()));
    }
}
