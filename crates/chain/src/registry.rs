//! Named chain instances that simulate independent nodes.
//!
//! Nodes share nothing. Propagation happens only when the host calls
//! [`NodeRegistry::broadcast_from`], which offers the origin's full chain to
//! every other node's fork choice.

use crate::blockchain::{Blockchain, BlockchainError, Result};
use crate::config::ChainConfig;
use std::collections::BTreeMap;

/// Result of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Nodes that adopted the origin's chain.
    pub accepted: usize,
    /// Nodes the chain was offered to.
    pub total: usize,
}

/// An explicit, host-owned map of node id to chain.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    config: ChainConfig,
    nodes: BTreeMap<String, Blockchain>,
}

impl NodeRegistry {
    /// An empty registry whose lazily created nodes use `config`.
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
        }
    }

    /// A registry pre-populated with one node per id.
    pub fn with_nodes<I, S>(ids: I, config: ChainConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new(config);
        for id in ids {
            registry.get_or_create(id);
        }
        registry
    }

    pub fn node(&self, id: &str) -> Option<&Blockchain> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Blockchain> {
        self.nodes.get_mut(id)
    }

    /// Fetch a node, creating it on first use.
    pub fn get_or_create(&mut self, id: impl Into<String>) -> &mut Blockchain {
        let config = &self.config;
        self.nodes.entry(id.into()).or_insert_with_key(|id| {
            tracing::info!(node = %id, "node created");
            Blockchain::new(config.clone())
        })
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Offer `origin`'s chain to every other node.
    pub fn broadcast_from(&mut self, origin: &str) -> Result<BroadcastReport> {
        let chain = self
            .nodes
            .get(origin)
            .map(|node| node.blocks().to_vec())
            .ok_or_else(|| BlockchainError::NotFound(format!("node {}", origin)))?;

        let mut report = BroadcastReport { accepted: 0, total: 0 };
        for (id, node) in self.nodes.iter_mut().filter(|(id, _)| id.as_str() != origin) {
            report.total += 1;
            if node.try_add_external_chain(&chain) {
                report.accepted += 1;
                tracing::debug!(from = origin, to = %id, "broadcast accepted");
            }
        }
        tracing::info!(
            origin,
            accepted = report.accepted,
            total = report.total,
            "broadcast finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_nodes_and_lazy_creation() {
        let mut registry = NodeRegistry::with_nodes(["A", "B", "C"], ChainConfig::default());
        assert_eq!(registry.node_ids().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert!(registry.node("D").is_none());

        registry.get_or_create("D");
        assert_eq!(registry.len(), 4);
        assert!(registry.node_mut("D").is_some());
    }

    #[test]
    fn test_nodes_share_genesis() {
        let registry = NodeRegistry::with_nodes(["A", "B"], ChainConfig::default());
        let a = registry.node("A").unwrap();
        let b = registry.node("B").unwrap();
        assert_eq!(a.genesis().hash, b.genesis().hash);
    }

    #[test]
    fn test_broadcast_unknown_origin() {
        let mut registry = NodeRegistry::with_nodes(["A"], ChainConfig::default());
        assert!(matches!(
            registry.broadcast_from("Z"),
            Err(BlockchainError::NotFound(_))
        ));
    }

    #[test]
    fn test_broadcast_longer_chain() {
        let mut registry = NodeRegistry::with_nodes(["A", "B", "C"], ChainConfig::default());
        let node_a = registry.node_mut("A").unwrap();
        let (_, miner) = node_a.create_wallet("Miner");
        node_a.mine_pending(&miner).unwrap();

        let report = registry.broadcast_from("A").unwrap();
        assert_eq!(report, BroadcastReport { accepted: 2, total: 2 });
        assert_eq!(registry.node("B").unwrap().chain_length(), 2);

        // Nothing new to offer the second time.
        let report = registry.broadcast_from("A").unwrap();
        assert_eq!(report, BroadcastReport { accepted: 0, total: 2 });
    }
}
