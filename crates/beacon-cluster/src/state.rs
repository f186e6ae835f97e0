//! Mutable election state of a node.
//!
//! The scheduler tick and inbound calls from peers both mutate this state,
//! so all of it sits behind one mutex. The lock is only ever held for the
//! duration of a method here, never across a remote call.

use std::collections::BTreeSet;

use beacon_core::{NodeIdentity, NodeStatus, Role};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct RoleState {
    leader: Option<String>,
    /// Only non-empty while `leader` names this node.
    followers: BTreeSet<String>,
    leader_acked: bool,
}

/// Identity plus the shared, lock-protected role state.
#[derive(Debug)]
pub struct ClusterState {
    identity: NodeIdentity,
    inner: Mutex<RoleState>,
}

impl ClusterState {
    /// Fresh state: leader unknown.
    pub fn new(identity: NodeIdentity) -> Self {
        Self {
            identity,
            inner: Mutex::new(RoleState::default()),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub async fn leader(&self) -> Option<String> {
        self.inner.lock().await.leader.clone()
    }

    pub async fn role(&self) -> Role {
        let inner = self.inner.lock().await;
        self.role_of(inner.leader.as_deref())
    }

    /// Believe `leader` (or nobody). Returns the previous belief.
    ///
    /// Setting the same leader twice leaves the state unchanged.
    pub async fn set_leader(&self, leader: Option<String>) -> Option<String> {
        let mut inner = self.inner.lock().await;
        self.apply_leader(&mut inner, leader)
    }

    /// Claim leadership. Returns `true` if this node already was leader.
    pub async fn become_leader(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let previous = self.apply_leader(&mut inner, Some(self.identity.name().to_string()));
        previous.as_deref() == Some(self.identity.name())
    }

    /// Replace the leader only if the current belief is still `expected`.
    ///
    /// Guards tick-side updates against an inbound `adopt_leader` that
    /// landed while the tick was waiting on a remote call.
    pub async fn replace_leader(&self, expected: &str, leader: Option<String>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.leader.as_deref() != Some(expected) {
            debug!(%expected, current = ?inner.leader, "leader changed concurrently, keeping it");
            return false;
        }
        self.apply_leader(&mut inner, leader);
        true
    }

    /// Record a heartbeat sender as follower.
    ///
    /// Returns `Err` with the believed leader when this node is not leader.
    pub async fn record_follower(&self, sender: &str) -> Result<(), Option<String>> {
        let mut inner = self.inner.lock().await;
        if inner.leader.as_deref() != Some(self.identity.name()) {
            return Err(inner.leader.clone());
        }
        if sender != self.identity.name() && inner.followers.insert(sender.to_string()) {
            info!(follower = %sender, followers = inner.followers.len(), "follower joined");
        }
        Ok(())
    }

    /// Copy of the follower set, safe to iterate while inbound heartbeats
    /// keep adding to the live set.
    pub async fn followers(&self) -> Vec<String> {
        self.inner.lock().await.followers.iter().cloned().collect()
    }

    pub async fn remove_follower(&self, name: &str) -> bool {
        self.inner.lock().await.followers.remove(name)
    }

    /// Reset the per-tick acknowledgement flag.
    pub async fn begin_tick(&self) {
        self.inner.lock().await.leader_acked = false;
    }

    /// Mark the current tick acknowledged if `leader` is still believed.
    pub async fn mark_acked(&self, leader: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.leader.as_deref() == Some(leader) {
            inner.leader_acked = true;
            return true;
        }
        false
    }

    pub async fn leader_acked(&self) -> bool {
        self.inner.lock().await.leader_acked
    }

    pub async fn snapshot(&self) -> NodeStatus {
        let inner = self.inner.lock().await;
        NodeStatus {
            name: self.identity.name().to_string(),
            endpoint: self.identity.endpoint().to_string(),
            eligible: self.identity.is_eligible(),
            role: self.role_of(inner.leader.as_deref()),
            leader: inner.leader.clone(),
            followers: inner.followers.iter().cloned().collect(),
            leader_acked: inner.leader_acked,
        }
    }

    fn role_of(&self, leader: Option<&str>) -> Role {
        match leader {
            None => Role::Seeking,
            Some(l) if l == self.identity.name() => Role::Leader,
            Some(_) => Role::Follower,
        }
    }

    fn apply_leader(&self, inner: &mut RoleState, leader: Option<String>) -> Option<String> {
        let leader = leader.filter(|l| !l.is_empty());
        let previous = std::mem::replace(&mut inner.leader, leader);
        let now_leader = self.role_of(inner.leader.as_deref()) == Role::Leader;
        if !now_leader {
            inner.followers.clear();
        }

        if previous != inner.leader {
            inner.leader_acked = false;
            let from = self.role_of(previous.as_deref());
            let to = self.role_of(inner.leader.as_deref());
            match &inner.leader {
                Some(leader) => info!(%leader, %from, %to, "leader changed"),
                None => info!(%from, %to, "leader cleared"),
            }
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str) -> ClusterState {
        ClusterState::new(NodeIdentity::new(name, format!("{name}:1"), true))
    }

    #[tokio::test]
    async fn starts_seeking() {
        let s = state("node-a");
        assert_eq!(s.role().await, Role::Seeking);
        assert!(s.leader().await.is_none());
        assert!(s.followers().await.is_empty());
    }

    #[tokio::test]
    async fn roles_follow_leader_belief() {
        let s = state("node-a");

        s.set_leader(Some("node-b".to_string())).await;
        assert_eq!(s.role().await, Role::Follower);

        assert!(!s.become_leader().await);
        assert_eq!(s.role().await, Role::Leader);
        assert!(s.become_leader().await);

        s.set_leader(None).await;
        assert_eq!(s.role().await, Role::Seeking);
    }

    #[tokio::test]
    async fn empty_leader_name_means_unknown() {
        let s = state("node-a");
        s.set_leader(Some(String::new())).await;
        assert_eq!(s.role().await, Role::Seeking);
    }

    #[tokio::test]
    async fn followers_only_recorded_while_leader() {
        let s = state("node-a");
        s.set_leader(Some("node-b".to_string())).await;
        assert_eq!(
            s.record_follower("node-c").await,
            Err(Some("node-b".to_string()))
        );

        s.become_leader().await;
        assert_eq!(s.record_follower("node-c").await, Ok(()));
        assert_eq!(s.record_follower("node-c").await, Ok(()));
        assert_eq!(s.followers().await, vec!["node-c"]);
    }

    #[tokio::test]
    async fn losing_leadership_clears_followers() {
        let s = state("node-a");
        s.become_leader().await;
        s.record_follower("node-b").await.unwrap();

        s.set_leader(Some("node-c".to_string())).await;
        assert!(s.followers().await.is_empty());
    }

    #[tokio::test]
    async fn self_is_never_a_follower() {
        let s = state("node-a");
        s.become_leader().await;
        s.record_follower("node-a").await.unwrap();
        assert!(s.followers().await.is_empty());
    }

    #[tokio::test]
    async fn replace_leader_is_compare_and_set() {
        let s = state("node-a");
        s.set_leader(Some("node-b".to_string())).await;

        assert!(!s.replace_leader("node-x", None).await);
        assert_eq!(s.leader().await.as_deref(), Some("node-b"));

        assert!(s.replace_leader("node-b", None).await);
        assert!(s.leader().await.is_none());
    }

    #[tokio::test]
    async fn ack_flag_is_per_tick() {
        let s = state("node-a");
        s.set_leader(Some("node-b".to_string())).await;

        assert!(!s.mark_acked("node-c").await);
        assert!(s.mark_acked("node-b").await);
        assert!(s.leader_acked().await);

        s.begin_tick().await;
        assert!(!s.leader_acked().await);
    }

    #[tokio::test]
    async fn snapshot_reflects_state() {
        let s = state("node-a");
        s.become_leader().await;
        s.record_follower("node-b").await.unwrap();

        let status = s.snapshot().await;
        assert_eq!(status.name, "node-a");
        assert_eq!(status.role, Role::Leader);
        assert_eq!(status.leader.as_deref(), Some("node-a"));
        assert_eq!(status.followers, vec!["node-b"]);
    }
}
