//! Election engine — find the current leader or make one.
//!
//! There is no vote and no epoch: the first leader any peer reports is
//! adopted, and an election simply tells every registered node who won.
//! Peers that cannot be reached along the way are unbound from the
//! directory.
//!
//! A candidate answers `start_election` only after its broadcast, so the
//! wait for it scales with the cluster size. Running out of that wait does
//! not mark the candidate dead: it claimed leadership before broadcasting.

use std::time::Duration;

use beacon_core::PeerError;
use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::node::Node;

/// How a discovery round ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// A peer already knew a leader.
    AdoptedExisting { leader: String, reported_by: String },
    /// An eligible peer was asked to run an election and did.
    ElectedPeer { leader: String },
    /// Nobody led and nobody else could; this node took over.
    ElectedSelf,
    /// No leader anywhere and this node may not lead.
    NoLeader,
}

/// Outcome of a discovery round plus the peer failures met on the way.
#[derive(Debug, Clone)]
pub struct ElectionRound {
    pub outcome: ElectionOutcome,
    pub errors: Vec<ClusterError>,
}

/// Result of announcing leadership to all registered peers.
#[derive(Debug, Clone, Default)]
pub struct Broadcast {
    /// Peers that accepted the new leader.
    pub adopted: Vec<String>,
    pub errors: Vec<ClusterError>,
}

impl Node {
    /// Claim leadership and tell every registered peer.
    ///
    /// The local claim is unconditional. A directory failure while
    /// enumerating peers is returned; individual peer failures are
    /// collected in the `Broadcast`.
    pub async fn run_election(&self, requested_by: &str) -> Result<Broadcast, ClusterError> {
        let was_leader = self.state().become_leader().await;
        info!(%requested_by, was_leader, "starting election");

        let peers = self.registered_peers().await?;
        let mut broadcast = Broadcast::default();

        for peer in peers {
            let leader = self.name().to_string();
            match self
                .call_peer(&peer, move |p| async move { p.adopt_leader(&leader).await })
                .await
            {
                Ok(()) => broadcast.adopted.push(peer),
                Err(e) => self.note_failure(e, &mut broadcast.errors).await,
            }
        }

        info!(
            adopted = broadcast.adopted.len(),
            failed = broadcast.errors.len(),
            "leader election done"
        );
        Ok(broadcast)
    }

    /// Discovery round run by the scheduler when no leader is known.
    ///
    /// 1. Ask every registered peer for its leader; the first answer naming
    ///    a still-registered node wins.
    /// 2. Otherwise ask eligible peers, in directory order, to run an
    ///    election; the first that completes wins.
    /// 3. Otherwise, if eligible, elect ourselves.
    pub async fn discover_or_elect(&self) -> Result<ElectionRound, ClusterError> {
        let peers = self.registered_peers().await?;
        debug!(peers = peers.len(), "figuring out leader");
        let election_wait = self.election_wait(peers.len());

        let mut errors = Vec::new();
        let mut candidates = Vec::new();

        for peer in peers {
            match self
                .call_peer(&peer, |p| async move { p.get_leader().await })
                .await
            {
                Ok(Some(leader)) if !leader.is_empty() => {
                    if self.is_registered(&leader).await {
                        self.state().set_leader(Some(leader.clone())).await;
                        info!(%leader, reported_by = %peer, "adopted existing leader");
                        return Ok(ElectionRound {
                            outcome: ElectionOutcome::AdoptedExisting {
                                leader,
                                reported_by: peer,
                            },
                            errors,
                        });
                    }
                    // The peer has not noticed yet that its leader died.
                    debug!(%leader, reported_by = %peer, "ignoring unregistered leader");
                }
                Ok(_) => {}
                Err(e) => {
                    self.note_failure(e, &mut errors).await;
                    continue;
                }
            }

            match self
                .call_peer(&peer, |p| async move { p.get_eligibility().await })
                .await
            {
                Ok(true) => candidates.push(peer),
                Ok(false) => debug!(%peer, "peer is not eligible"),
                Err(e) => self.note_failure(e, &mut errors).await,
            }
        }

        for candidate in candidates {
            let me = self.name().to_string();
            match self
                .call_peer_within(&candidate, election_wait, move |p| async move {
                    p.start_election(&me).await
                })
                .await
            {
                Ok(token) if !token.is_empty() => {
                    // The candidate's broadcast normally reached us already.
                    if self.state().leader().await.is_none() {
                        self.state().set_leader(Some(candidate.clone())).await;
                    }
                    info!(leader = %candidate, %token, "peer elected");
                    return Ok(ElectionRound {
                        outcome: ElectionOutcome::ElectedPeer { leader: candidate },
                        errors,
                    });
                }
                Ok(_) => debug!(%candidate, "peer did not complete election"),
                Err(e @ ClusterError::Peer(PeerError::Timeout { .. })) => {
                    // Still broadcasting; asking another candidate now would
                    // make a second leader. A hung candidate is caught by the
                    // next heartbeat.
                    warn!(%candidate, error = %e, "election still running, following candidate");
                    errors.push(e);
                    if self.state().leader().await.is_none() {
                        self.state().set_leader(Some(candidate.clone())).await;
                    }
                    return Ok(ElectionRound {
                        outcome: ElectionOutcome::ElectedPeer { leader: candidate },
                        errors,
                    });
                }
                Err(e) => self.note_failure(e, &mut errors).await,
            }
        }

        if self.identity().is_eligible() {
            info!("no leader found, electing myself");
            match self.run_election(self.name()).await {
                Ok(broadcast) => errors.extend(broadcast.errors),
                Err(e) => errors.push(e),
            }
            return Ok(ElectionRound {
                outcome: ElectionOutcome::ElectedSelf,
                errors,
            });
        }

        debug!("no leader found and not eligible, waiting for next round");
        Ok(ElectionRound {
            outcome: ElectionOutcome::NoLeader,
            errors,
        })
    }

    /// Upper bound for a candidate's `start_election`: its peer listing,
    /// then a lookup and an announcement per peer, each under its own RPC
    /// timeout, plus one timeout of slack.
    fn election_wait(&self, peers: usize) -> Duration {
        let calls = u32::try_from(2 * peers + 2).unwrap_or(u32::MAX);
        self.rpc_timeout().saturating_mul(calls)
    }
}
