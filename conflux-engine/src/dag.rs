//! The DAG router (§4.6): maps an entity type, reached from a given
//! producer node, to the ordered chain of transformers feeding toward a
//! destination set. Resolved chains are memoized per `(node, entity type)`
//! pair using the ambient TTL cache, since a DAG's shape never changes
//! within a job.

use async_trait::async_trait;
use conflux_cache::TtlCache;
use conflux_core::entity::Entity;
use std::collections::HashMap;

pub type NodeId = String;
pub type EntityTypeId = &'static str;

#[derive(Debug, Clone)]
pub enum NodeKind {
    Source,
    Transformer,
    Destination,
}

#[derive(Debug, Clone)]
pub struct DagNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// For `Transformer` nodes: the entity type this node accepts.
    pub accepts: Option<EntityTypeId>,
}

#[derive(Debug, Clone)]
pub struct DagEdge {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug)]
pub enum DagError {
    MissingSourceNode,
    MultipleSourceNodes,
    Cycle,
    UnknownNode(NodeId),
}

impl std::fmt::Display for DagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DagError::MissingSourceNode => write!(f, "DAG has no source node"),
            DagError::MultipleSourceNodes => write!(f, "DAG has more than one source node"),
            DagError::Cycle => write!(f, "DAG contains a cycle"),
            DagError::UnknownNode(id) => write!(f, "DAG references unknown node '{id}'"),
        }
    }
}

impl std::error::Error for DagError {}

/// A transformer node's behavior: consumes one entity, emits zero or more.
#[async_trait]
pub trait Transformer: Send + Sync {
    fn node_id(&self) -> &str;
    async fn transform(&self, entity: Box<dyn Entity>) -> Vec<Box<dyn Entity>>;
}

pub struct Dag {
    nodes: HashMap<NodeId, DagNode>,
    edges: Vec<DagEdge>,
}

impl Dag {
    pub fn new(nodes: Vec<DagNode>, edges: Vec<DagEdge>) -> Result<Self, DagError> {
        let source_count = nodes.iter().filter(|n| matches!(n.kind, NodeKind::Source)).count();
        if source_count == 0 {
            return Err(DagError::MissingSourceNode);
        }
        if source_count > 1 {
            return Err(DagError::MultipleSourceNodes);
        }
        let by_id: HashMap<NodeId, DagNode> = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        for edge in &edges {
            if !by_id.contains_key(&edge.from) {
                return Err(DagError::UnknownNode(edge.from.clone()));
            }
            if !by_id.contains_key(&edge.to) {
                return Err(DagError::UnknownNode(edge.to.clone()));
            }
        }
        let dag = Self { nodes: by_id, edges };
        if dag.has_cycle() {
            return Err(DagError::Cycle);
        }
        Ok(dag)
    }

    fn children(&self, node: &str) -> impl Iterator<Item = &NodeId> {
        self.edges.iter().filter(move |e| e.from == node).map(|e| &e.to)
    }

    fn has_cycle(&self) -> bool {
        let mut visiting = std::collections::HashSet::new();
        let mut visited = std::collections::HashSet::new();

        fn visit<'a>(
            dag: &'a Dag,
            node: &'a str,
            visiting: &mut std::collections::HashSet<&'a str>,
            visited: &mut std::collections::HashSet<&'a str>,
        ) -> bool {
            if visited.contains(node) {
                return false;
            }
            if !visiting.insert(node) {
                return true;
            }
            for child in dag.children(node) {
                if visit(dag, child, visiting, visited) {
                    return true;
                }
            }
            visiting.remove(node);
            visited.insert(node);
            false
        }

        for id in self.nodes.keys() {
            if visit(self, id, &mut visiting, &mut visited) {
                return true;
            }
        }
        false
    }

    /// Whether `node` has any path to a destination node.
    fn reaches_destination(&self, node: &str) -> bool {
        let mut stack = vec![node.to_string()];
        let mut seen = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(n) = self.nodes.get(&current) {
                if matches!(n.kind, NodeKind::Destination) {
                    return true;
                }
            }
            stack.extend(self.children(&current).cloned());
        }
        false
    }

    /// The ordered chain of transformer node ids reachable from `producer_id`
    /// whose `accepts` matches `entity_type`, ending before any destination
    /// node. A DAG with no path from `producer_id` to a destination yields
    /// an empty chain (§4.6 invariant: `Keep`, zero children).
    fn resolve_chain(&self, producer_id: &str, entity_type: EntityTypeId) -> Vec<NodeId> {
        if !self.reaches_destination(producer_id) {
            return Vec::new();
        }
        let mut chain = Vec::new();
        let mut current = producer_id.to_string();
        loop {
            let next = self
                .children(&current)
                .find(|child_id| matches!(self.nodes.get(*child_id), Some(n) if matches!(n.kind, NodeKind::Transformer) && n.accepts == Some(entity_type)))
                .cloned();
            match next {
                Some(id) => {
                    chain.push(id.clone());
                    current = id;
                }
                None => break,
            }
        }
        chain
    }
}

/// Wraps a [`Dag`] with per-`(node, entity type)` memoization of resolved
/// transformer chains.
pub struct DagRouter {
    dag: Dag,
    cache: TtlCache<(NodeId, EntityTypeId), Vec<NodeId>>,
}

impl DagRouter {
    pub fn new(dag: Dag) -> Self {
        Self { dag, cache: TtlCache::unbounded_ttl() }
    }

    /// The ordered transformer chain for `entity_type`, reached from
    /// `producer_id`. Memoized: a DAG's shape is fixed for the lifetime of
    /// a job, so repeated lookups for the same pair are pure cache hits.
    pub fn chain_for(&self, producer_id: &str, entity_type: EntityTypeId) -> Vec<NodeId> {
        let key = (producer_id.to_string(), entity_type);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }
        let chain = self.dag.resolve_chain(producer_id, entity_type);
        self.cache.insert(key, chain.clone());
        chain
    }
}
