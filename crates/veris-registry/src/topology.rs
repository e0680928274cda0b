//! Network topology
//!
//! A topology snapshot is the set of node identifiers and the
//! undirected connections between them (trust direction is a separate
//! concern on the trust surface). The manager keeps one current
//! topology plus its full history; mutations are transactional - the
//! candidate is validated before commit, and a failed mutation leaves
//! the prior topology intact.

use crate::node::{NodeRole, VerificationNode};
use crate::registry::NodeRegistry;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use veris_core::{now, NodeId, Result, Timestamp, TopologyId, VerisError};
use veris_journal::Ledger;

/// Placeholder latency assigned to newly created connections
pub const PLACEHOLDER_LATENCY_MS: u32 = 10;

/// Connection health at the topology layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Connection is usable
    Active,
    /// Connection is known-down
    Inactive,
}

/// An undirected connection between two nodes.
///
/// Endpoints are stored in normalized order (smaller id first) so an
/// edge appears exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// First endpoint (smaller id)
    pub source: NodeId,
    /// Second endpoint (larger id)
    pub target: NodeId,
    /// Latency hint in milliseconds
    pub latency_hint_ms: u32,
    /// Connection health
    pub status: ConnectionStatus,
}

impl Connection {
    /// Create a normalized connection with the placeholder latency
    pub fn between(a: NodeId, b: NodeId) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source,
            target,
            latency_hint_ms: PLACEHOLDER_LATENCY_MS,
            status: ConnectionStatus::Active,
        }
    }

    /// Whether the connection touches a node
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// A topology snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// Snapshot identifier
    pub topology_id: TopologyId,
    /// Member node identifiers
    pub nodes: Vec<NodeId>,
    /// Undirected connections, normalized
    pub connections: Vec<Connection>,
    /// Snapshot creation time
    pub created_at: Timestamp,
}

impl Topology {
    /// Schema check: connections reference members only, no self-edges
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(VerisError::schema("topology has no nodes"));
        }
        for connection in &self.connections {
            if connection.source == connection.target {
                return Err(VerisError::schema(format!(
                    "self-connection on node {}",
                    connection.source
                )));
            }
            for endpoint in [connection.source, connection.target] {
                if !self.nodes.contains(&endpoint) {
                    return Err(VerisError::schema(format!(
                        "connection references unknown node {endpoint}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Owner of the current topology and its history
pub struct TopologyManager {
    current: RwLock<Option<Topology>>,
    history: Ledger<Topology>,
}

impl TopologyManager {
    /// Create a manager with no topology yet
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            history: Ledger::new("topology-history"),
        }
    }

    /// Build a complete graph over the given nodes and make it current
    pub fn create_topology(&self, node_ids: &[NodeId]) -> Result<Topology> {
        let mut connections =
            Vec::with_capacity(node_ids.len() * node_ids.len().saturating_sub(1) / 2);
        for (i, &a) in node_ids.iter().enumerate() {
            for &b in &node_ids[i + 1..] {
                connections.push(Connection::between(a, b));
            }
        }
        let topology = Topology {
            topology_id: TopologyId::new(),
            nodes: node_ids.to_vec(),
            connections,
            created_at: now(),
        };
        topology.validate()?;
        self.commit(topology.clone());
        Ok(topology)
    }

    /// The current topology, if any
    pub fn current(&self) -> Option<Topology> {
        self.current.read().clone()
    }

    /// A historical topology by id
    pub fn get(&self, topology_id: TopologyId) -> Option<Topology> {
        self.history
            .entries()
            .into_iter()
            .map(|entry| entry.value)
            .find(|topology| topology.topology_id == topology_id)
    }

    /// All topologies ever committed, oldest first
    pub fn history(&self) -> Vec<Topology> {
        self.history.replay()
    }

    /// Add a node, connecting it to every existing member.
    ///
    /// Transactional: the candidate topology is validated before
    /// commit.
    pub fn add_node(&self, node_id: NodeId) -> Result<Topology> {
        let mut candidate = self.require_current()?;
        if candidate.nodes.contains(&node_id) {
            return Err(VerisError::invariant(format!(
                "node {node_id} is already in the topology"
            )));
        }
        for &existing in &candidate.nodes {
            candidate.connections.push(Connection::between(existing, node_id));
        }
        candidate.nodes.push(node_id);
        self.recommit(candidate)
    }

    /// Remove a node and all incident connections
    pub fn remove_node(&self, node_id: NodeId) -> Result<Topology> {
        let mut candidate = self.require_current()?;
        let before = candidate.nodes.len();
        candidate.nodes.retain(|&n| n != node_id);
        if candidate.nodes.len() == before {
            return Err(VerisError::not_found(format!(
                "node {node_id} is not in the topology"
            )));
        }
        candidate.connections.retain(|c| !c.touches(node_id));
        self.recommit(candidate)
    }

    /// Record that a member node's data changed.
    ///
    /// The topology holds identifiers only, so the change itself lives
    /// in the registry; this re-validates and commits a fresh snapshot
    /// so the history reflects when the membership was touched.
    pub fn update_node(&self, node_id: NodeId) -> Result<Topology> {
        let candidate = self.require_current()?;
        if !candidate.nodes.contains(&node_id) {
            return Err(VerisError::not_found(format!(
                "node {node_id} is not in the topology"
            )));
        }
        self.recommit(candidate)
    }

    /// Member nodes with a given role, resolved through the registry
    pub fn nodes_by_role(&self, registry: &NodeRegistry, role: NodeRole) -> Vec<VerificationNode> {
        self.member_nodes(registry)
            .into_iter()
            .filter(|node| node.role == role)
            .collect()
    }

    /// Member nodes advertising a capability, resolved through the
    /// registry
    pub fn nodes_by_capability(
        &self,
        registry: &NodeRegistry,
        capability: &str,
    ) -> Vec<VerificationNode> {
        self.member_nodes(registry)
            .into_iter()
            .filter(|node| node.has_capability(capability))
            .collect()
    }

    fn member_nodes(&self, registry: &NodeRegistry) -> Vec<VerificationNode> {
        let Some(topology) = self.current() else {
            return Vec::new();
        };
        topology
            .nodes
            .iter()
            .filter_map(|&id| registry.get(id))
            .collect()
    }

    fn require_current(&self) -> Result<Topology> {
        self.current
            .read()
            .clone()
            .ok_or_else(|| VerisError::not_found("no current topology"))
    }

    fn recommit(&self, mut candidate: Topology) -> Result<Topology> {
        candidate.topology_id = TopologyId::new();
        candidate.created_at = now();
        candidate.validate()?;
        self.commit(candidate.clone());
        Ok(candidate)
    }

    fn commit(&self, topology: Topology) {
        tracing::debug!(
            topology = %topology.topology_id,
            nodes = topology.nodes.len(),
            connections = topology.connections.len(),
            "topology committed"
        );
        self.history.append(topology.clone());
        *self.current.write() = Some(topology);
    }
}

impl Default for TopologyManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(|_| NodeId::new()).collect()
    }

    #[test]
    fn create_builds_complete_graph() {
        let manager = TopologyManager::new();
        let nodes = ids(4);
        let topology = manager.create_topology(&nodes).unwrap();
        assert_eq!(topology.connections.len(), 6);
        assert!(topology.validate().is_ok());
    }

    #[test]
    fn add_node_connects_to_all_members() {
        let manager = TopologyManager::new();
        let nodes = ids(3);
        manager.create_topology(&nodes).unwrap();
        let new_node = NodeId::new();
        let topology = manager.add_node(new_node).unwrap();
        assert_eq!(topology.nodes.len(), 4);
        // 3 original edges + 3 new ones
        assert_eq!(topology.connections.len(), 6);
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let manager = TopologyManager::new();
        let nodes = ids(4);
        manager.create_topology(&nodes).unwrap();
        let topology = manager.remove_node(nodes[0]).unwrap();
        assert_eq!(topology.nodes.len(), 3);
        assert_eq!(topology.connections.len(), 3);
        assert!(!topology.connections.iter().any(|c| c.touches(nodes[0])));
    }

    #[test]
    fn failed_mutation_leaves_prior_topology() {
        let manager = TopologyManager::new();
        let nodes = ids(3);
        let original = manager.create_topology(&nodes).unwrap();
        assert!(manager.remove_node(NodeId::new()).is_err());
        assert_eq!(
            manager.current().unwrap().topology_id,
            original.topology_id
        );
    }

    #[test]
    fn history_records_every_commit() {
        let manager = TopologyManager::new();
        let nodes = ids(2);
        manager.create_topology(&nodes).unwrap();
        manager.add_node(NodeId::new()).unwrap();
        manager.remove_node(nodes[0]).unwrap();
        assert_eq!(manager.history().len(), 3);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let manager = TopologyManager::new();
        let nodes = ids(2);
        manager.create_topology(&nodes).unwrap();
        assert!(manager.add_node(nodes[1]).is_err());
    }
}
