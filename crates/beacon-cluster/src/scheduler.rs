//! Scheduler — the single periodic driver of a node.
//!
//! Each tick first makes sure the node's own name is still bound, then
//! runs, in order: the membership sweep (leader), the heartbeat
//! (follower), and discovery (no leader known, including a leader lost
//! during this tick's heartbeat). Ticks never overlap; inbound calls from
//! peers run concurrently with them.

use std::time::Duration;

use beacon_core::{Role, Timing};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::election::ElectionOutcome;
use crate::error::ClusterError;
use crate::heartbeat::HeartbeatOutcome;
use crate::membership::Sweep;
use crate::node::Node;

/// Everything one tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Role once the tick finished.
    pub role: Role,
    pub leader: Option<String>,
    /// The node's name had been unbound and was bound again.
    pub reregistered: bool,
    pub sweep: Option<Sweep>,
    pub heartbeat: Option<HeartbeatOutcome>,
    pub election: Option<ElectionOutcome>,
    /// Every failure met during the tick, dead peers included.
    pub errors: Vec<ClusterError>,
}

const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

pub struct Scheduler {
    node: Node,
    timing: Timing,
}

impl Scheduler {
    pub fn new(node: Node, timing: Timing) -> Self {
        Self { node, timing }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Run one tick.
    pub async fn tick(&self) -> TickReport {
        let state = self.node.state();
        state.begin_tick().await;

        let mut errors = Vec::new();

        let reregistered = match self.node.ensure_registered().await {
            Ok(rebound) => rebound,
            Err(e) => {
                warn!(error = %e, "could not check own registration");
                errors.push(e.into());
                false
            }
        };

        let sweep = self.node.sweep_followers().await;
        if let Some(sweep) = &sweep {
            errors.extend(sweep.errors.iter().cloned());
        }

        let heartbeat = self.node.send_heartbeat().await;
        if let Some(HeartbeatOutcome::LeaderLost { error, .. } | HeartbeatOutcome::Failed { error, .. }) =
            &heartbeat
        {
            errors.push(error.clone());
        }

        let mut election = None;
        if state.leader().await.is_none() {
            match self.node.discover_or_elect().await {
                Ok(round) => {
                    errors.extend(round.errors);
                    election = Some(round.outcome);
                }
                Err(e) => {
                    warn!(error = %e, "leader discovery failed");
                    errors.push(e);
                }
            }
        }

        TickReport {
            role: state.role().await,
            leader: state.leader().await,
            reregistered,
            sweep,
            heartbeat,
            election,
            errors,
        }
    }

    /// Tick every interval after the startup delay until `shutdown` fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            node = %self.node.name(),
            delay = ?self.timing.startup_delay,
            interval = ?self.timing.tick_interval,
            "scheduler started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.timing.startup_delay) => {}
            _ = shutdown.changed() => {
                info!("scheduler stopped before first tick");
                return;
            }
        }

        // `interval` panics on a zero period; config rejects it, but
        // `Timing` can also be built by hand.
        let period = self.timing.tick_interval.max(MIN_TICK_INTERVAL);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick().await;
                    debug!(
                        role = %report.role,
                        leader = ?report.leader,
                        errors = report.errors.len(),
                        "tick complete"
                    );
                }
                _ = shutdown.changed() => {
                    info!("scheduler shutting down");
                    break;
                }
            }
        }
    }
}
