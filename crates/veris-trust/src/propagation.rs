//! Trust propagation engine
//!
//! Maintains the directed trust graph sourced from active boundaries
//! (edge weight = trust level / 100) and computes transitive trust
//! along discounted paths: a path's score is the product of its edge
//! weights times `discount^(hops - 1)`. The search is a depth-first
//! walk bounded by the maximum path length, visiting neighbors in
//! descending edge weight and skipping edges below the propagation
//! threshold. Decay and reinforcement mutate boundaries through the
//! manager and rebuild the graph; queries never mutate.

use crate::boundary::BoundaryManager;
use parking_lot::RwLock;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use veris_core::{
    now, ConflictId, InstanceId, PropagationConfig, Result, Timestamp, VerisError,
};
use veris_journal::Ledger;

/// Flat trust deduction applied when a conflict is recorded
pub const CONFLICT_TRUST_PENALTY: u8 = 20;

/// One recorded change to a trust relationship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustChange {
    /// Trusting instance
    pub source: InstanceId,
    /// Trusted instance
    pub target: InstanceId,
    /// Trust level after the change, in [0, 1]
    pub trust: f64,
    /// Why the trust changed
    pub reason: String,
}

/// Resolution state of a trust conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustConflictStatus {
    /// Awaiting resolution
    Pending,
    /// Resolved; see resolution data
    Resolved,
    /// Dismissed without action
    Dismissed,
}

/// A recorded trust conflict between two instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConflict {
    /// Conflict identifier
    pub conflict_id: ConflictId,
    /// Instance on the trusting side
    pub source: InstanceId,
    /// Instance on the trusted side
    pub target: InstanceId,
    /// Caller-supplied conflict type
    pub conflict_type: String,
    /// Supporting data
    pub conflict_data: serde_json::Value,
    /// Resolution state
    pub resolution_status: TrustConflictStatus,
    /// Resolution data, once resolved
    pub resolution_data: Option<serde_json::Value>,
    /// Detection time
    pub created_at: Timestamp,
    /// Resolution time
    pub resolved_at: Option<Timestamp>,
}

/// Filter for conflict queries
#[derive(Debug, Clone, Default)]
pub struct ConflictFilter {
    /// Match this source instance
    pub source: Option<InstanceId>,
    /// Match this target instance
    pub target: Option<InstanceId>,
    /// Match this conflict type
    pub conflict_type: Option<String>,
    /// Match this resolution status
    pub resolution_status: Option<TrustConflictStatus>,
}

/// The directed trust graph and its propagation rules
pub struct TrustPropagationEngine {
    config: PropagationConfig,
    boundaries: Arc<BoundaryManager>,
    graph: RwLock<DiGraphMap<InstanceId, f64>>,
    history: Ledger<TrustChange>,
    conflicts: RwLock<Vec<TrustConflict>>,
}

impl TrustPropagationEngine {
    /// Create an engine over a boundary manager
    pub fn new(boundaries: Arc<BoundaryManager>, config: PropagationConfig) -> Self {
        let engine = Self {
            config,
            boundaries,
            graph: RwLock::new(DiGraphMap::new()),
            history: Ledger::new("trust-history"),
            conflicts: RwLock::new(Vec::new()),
        };
        engine.update_graph();
        engine
    }

    /// Rebuild the adjacency from scratch out of the active boundaries
    pub fn update_graph(&self) {
        let mut graph = DiGraphMap::new();
        for boundary in self.boundaries.list_active() {
            graph.add_edge(boundary.source, boundary.target, boundary.edge_weight());
        }
        tracing::debug!(edges = graph.edge_count(), "trust graph rebuilt");
        *self.graph.write() = graph;
    }

    /// Direct trust from `source` to `target`, or 0 without an edge
    pub fn direct_trust(&self, source: InstanceId, target: InstanceId) -> f64 {
        self.graph
            .read()
            .edge_weight(source, target)
            .copied()
            .unwrap_or(0.0)
    }

    /// Best propagated trust from `source` to `target` with its path.
    ///
    /// A direct edge short-circuits the search. Otherwise the best
    /// discounted path is returned, or `(0.0, [])` when no admissible
    /// path exists within the length bound.
    pub fn propagated_trust(&self, source: InstanceId, target: InstanceId) -> (f64, Vec<InstanceId>) {
        if source == target {
            return (0.0, Vec::new());
        }
        let graph = self.graph.read();
        if let Some(&weight) = graph.edge_weight(source, target) {
            if weight > 0.0 {
                return (weight, vec![source, target]);
            }
        }

        let mut visited = HashSet::new();
        visited.insert(source);
        let mut path = vec![source];
        match self.search(&graph, source, target, &mut visited, &mut path, 0) {
            Some((score, path)) => (score, path),
            None => (0.0, Vec::new()),
        }
    }

    /// Apply multiplicative decay to every active boundary.
    ///
    /// New level = floor(old * (1 - rate)^days); monotone
    /// non-increasing. Invoked by a scheduled task, never by queries.
    pub fn apply_decay(&self, days: u32) -> Result<()> {
        let factor = (1.0 - self.config.decay_rate).powi(days as i32);
        for boundary in self.boundaries.list_active() {
            let decayed = (f64::from(boundary.trust_level) * factor) as u8;
            self.boundaries.update_trust(boundary.boundary_id, decayed)?;
        }
        tracing::info!(days, factor, "trust decay applied");
        self.update_graph();
        Ok(())
    }

    /// Reinforce trust on the boundary from `source` to `target`.
    ///
    /// Adds floor(value * 100) points, capped at 100, records the
    /// change, and rebuilds the graph. Returns the new trust level.
    pub fn reinforce(
        &self,
        source: InstanceId,
        target: InstanceId,
        value: f64,
        reason: &str,
    ) -> Result<u8> {
        let boundary = self.boundaries.between(source, target).ok_or_else(|| {
            VerisError::not_found(format!("no active boundary from {source} to {target}"))
        })?;
        let points = (value * 100.0).floor() as u8;
        let new_level = boundary.trust_level.saturating_add(points).min(100);
        self.boundaries.update_trust(boundary.boundary_id, new_level)?;
        self.history.append(TrustChange {
            source,
            target,
            trust: f64::from(new_level) / 100.0,
            reason: format!("reinforcement: {reason}"),
        });
        self.update_graph();
        Ok(new_level)
    }

    /// Record a trust conflict and deduct the flat penalty from the
    /// `source -> target` boundary
    pub fn handle_conflict(
        &self,
        source: InstanceId,
        target: InstanceId,
        conflict_type: &str,
        conflict_data: serde_json::Value,
    ) -> Result<ConflictId> {
        let conflict = TrustConflict {
            conflict_id: ConflictId::new(),
            source,
            target,
            conflict_type: conflict_type.to_string(),
            conflict_data,
            resolution_status: TrustConflictStatus::Pending,
            resolution_data: None,
            created_at: now(),
            resolved_at: None,
        };
        let conflict_id = conflict.conflict_id;
        self.conflicts.write().push(conflict);

        if let Some(boundary) = self.boundaries.between(source, target) {
            let new_level = boundary.trust_level.saturating_sub(CONFLICT_TRUST_PENALTY);
            self.boundaries.update_trust(boundary.boundary_id, new_level)?;
            self.history.append(TrustChange {
                source,
                target,
                trust: f64::from(new_level) / 100.0,
                reason: format!("conflict: {conflict_type}"),
            });
            self.update_graph();
        }
        tracing::warn!(conflict = %conflict_id, source = %source, target = %target, conflict_type, "trust conflict recorded");
        Ok(conflict_id)
    }

    /// Resolve a trust conflict, applying a signed trust adjustment
    pub fn resolve_conflict(
        &self,
        conflict_id: ConflictId,
        status: TrustConflictStatus,
        resolution_data: serde_json::Value,
        trust_adjustment: i16,
    ) -> Result<()> {
        let (source, target) = {
            let mut conflicts = self.conflicts.write();
            let conflict = conflicts
                .iter_mut()
                .find(|conflict| conflict.conflict_id == conflict_id)
                .ok_or_else(|| {
                    VerisError::not_found(format!("trust conflict {conflict_id} not found"))
                })?;
            conflict.resolution_status = status;
            conflict.resolution_data = Some(resolution_data);
            conflict.resolved_at = Some(now());
            (conflict.source, conflict.target)
        };

        if trust_adjustment != 0 {
            if let Some(boundary) = self.boundaries.between(source, target) {
                let adjusted =
                    (i16::from(boundary.trust_level) + trust_adjustment).clamp(0, 100) as u8;
                self.boundaries.update_trust(boundary.boundary_id, adjusted)?;
                self.history.append(TrustChange {
                    source,
                    target,
                    trust: f64::from(adjusted) / 100.0,
                    reason: format!("conflict resolution: {trust_adjustment:+}"),
                });
                self.update_graph();
            }
        }
        Ok(())
    }

    /// Conflicts matching a filter
    pub fn conflicts(&self, filter: &ConflictFilter) -> Vec<TrustConflict> {
        self.conflicts
            .read()
            .iter()
            .filter(|conflict| {
                filter.source.map_or(true, |source| conflict.source == source)
                    && filter.target.map_or(true, |target| conflict.target == target)
                    && filter
                        .conflict_type
                        .as_deref()
                        .map_or(true, |t| conflict.conflict_type == t)
                    && filter
                        .resolution_status
                        .map_or(true, |status| conflict.resolution_status == status)
            })
            .cloned()
            .collect()
    }

    /// Recorded trust changes between two instances, oldest first
    pub fn trust_history(&self, source: InstanceId, target: InstanceId) -> Vec<TrustChange> {
        self.history
            .filtered(|change| change.source == source && change.target == target)
            .into_iter()
            .map(|entry| entry.value)
            .collect()
    }

    fn search(
        &self,
        graph: &DiGraphMap<InstanceId, f64>,
        current: InstanceId,
        target: InstanceId,
        visited: &mut HashSet<InstanceId>,
        path: &mut Vec<InstanceId>,
        depth: usize,
    ) -> Option<(f64, Vec<InstanceId>)> {
        if current == target {
            return Some((self.score_path(graph, path), path.clone()));
        }
        if depth >= self.config.max_path_length {
            return None;
        }

        let mut neighbors: Vec<(InstanceId, f64)> = graph
            .edges(current)
            .map(|(_, neighbor, &weight)| (neighbor, weight))
            .filter(|(neighbor, weight)| {
                *weight >= self.config.propagation_threshold && !visited.contains(neighbor)
            })
            .collect();
        neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let mut best: Option<(f64, Vec<InstanceId>)> = None;
        for (neighbor, _) in neighbors {
            visited.insert(neighbor);
            path.push(neighbor);
            let candidate = self.search(graph, neighbor, target, visited, path, depth + 1);
            path.pop();
            visited.remove(&neighbor);

            if let Some((score, found)) = candidate {
                if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                    best = Some((score, found));
                }
            }
        }
        best
    }

    fn score_path(&self, graph: &DiGraphMap<InstanceId, f64>, path: &[InstanceId]) -> f64 {
        let raw: f64 = path
            .windows(2)
            .map(|pair| graph.edge_weight(pair[0], pair[1]).copied().unwrap_or(0.0))
            .product();
        raw * self
            .config
            .transitive_discount
            .powi(path.len() as i32 - 2)
    }
}
