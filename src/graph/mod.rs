// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph
//!
//! Every remote resource (and every derived value that other resources read)
//! is a named node in a [`ResourceGraph`]. A node is an [`AsyncValue`] whose
//! producer first waits for the nodes it depends on, then issues its own
//! request.
//!
//! # Edges
//!
//! ```text
//! vlan ──────────────┬──────────────► gateway
//! reserved-ip-block ─┴─► address-set ─► device/control-plane-1
//!                                          │
//!                                          ▼
//!                        network-type/control-plane-1
//!                                          │
//!                    vlan ───────────────► ▼
//!                        port-attachment/control-plane-1
//! ```
//!
//! Edges are either data edges (the node reads the value of another node) or
//! structural edges (the node must wait for another node's side effect, as a
//! port attachment waits for the network-type change). Both are declared the
//! same way, through [`Dependency`].
//!
//! # Lifecycle
//!
//! Each node walks the [`NodeStatus`] machine. A node whose dependency failed
//! is `Skipped`: its request is never issued and it resolves to the
//! dependency's error unchanged.
//!
//! # Realization
//!
//! Registration builds the graph lazily; nothing runs until
//! [`ResourceGraph::realize`] submits every node as its own task. Independent
//! branches keep running when another branch fails.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::errors::{ProvisionError, ProvisionResult};
use crate::frp::{join_vec, AsyncValue};
use crate::state_machine::{NodeEvent, NodeStatus, StateMachineWithHistory};

/// Unique name of a graph node, e.g. `device/data-plane-2`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Keys, tags and other identity material
    Identity,
    /// VLAN, address block, gateway
    Network,
    /// Pure derivation of other nodes (no provider call)
    Derived,
    /// Bare-metal device
    Compute,
    /// Network-type change or port attachment of a device
    Attachment,
    /// Boot documents assembled for a device
    Bootstrap,
}

/// Completion of a node, used as an edge by the nodes that depend on it
#[derive(Clone)]
pub struct Dependency {
    id: NodeId,
    done: AsyncValue<()>,
}

impl Dependency {
    pub fn id(&self) -> &NodeId {
        &self.id
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency({})", self.id)
    }
}

/// Handle to a registered node and the value it produces
pub struct Resource<T> {
    id: NodeId,
    value: AsyncValue<T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({}, {:?})", self.id, self.value)
    }
}

impl<T: Send + Sync + 'static> Resource<T> {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Value produced by the node
    pub fn value(&self) -> &AsyncValue<T> {
        &self.value
    }

    /// Edge onto this node for a dependent registration
    pub fn dependency(&self) -> Dependency {
        Dependency {
            id: self.id.clone(),
            done: self.value.completion(),
        }
    }

    /// Wait for the node's value
    pub async fn get(&self) -> ProvisionResult<Arc<T>> {
        self.value.get().await
    }
}

type Lifecycle = Arc<Mutex<StateMachineWithHistory<NodeStatus>>>;

struct NodeEntry {
    id: NodeId,
    kind: NodeKind,
    depends_on: Vec<NodeId>,
    lifecycle: Lifecycle,
    done: AsyncValue<()>,
}

/// Final state of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub kind: NodeKind,
    pub depends_on: Vec<NodeId>,
    pub status: NodeStatus,
    /// Number of lifecycle transitions taken
    pub transitions: usize,
}

/// Snapshot of every node in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub nodes: Vec<NodeReport>,
}

impl ProvisionReport {
    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|node| node.id.as_str() == name)
    }

    pub fn status(&self, name: &str) -> Option<NodeStatus> {
        self.node(name).map(|node| node.status)
    }

    /// Nodes currently in `status`
    pub fn with_status(&self, status: NodeStatus) -> Vec<&NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.status == status)
            .map(|node| &node.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Registry of provisioning nodes
///
/// The registry only holds bookkeeping (names, edges, lifecycles); resolved
/// values live in the nodes' [`AsyncValue`]s.
#[derive(Default)]
pub struct ResourceGraph {
    nodes: Mutex<Vec<NodeEntry>>,
}

impl fmt::Debug for ResourceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGraph")
            .field("nodes", &self.entries().len())
            .finish()
    }
}

fn advance(lifecycle: &Lifecycle, id: &NodeId, event: NodeEvent) {
    let mut fsm = lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = fsm.transition_with_history(event, chrono::Utc::now()) {
        warn!(node = %id, error = %e, "Ignoring lifecycle transition");
    }
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<NodeEntry>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a node
    ///
    /// `body` is called at most once, after every dependency has resolved
    /// successfully. If any dependency fails, the node is skipped and resolves
    /// to that failure. Names must be unique within the graph.
    pub fn register<T, F, Fut>(
        &self,
        name: impl Into<String>,
        kind: NodeKind,
        depends_on: Vec<Dependency>,
        body: F,
    ) -> ProvisionResult<Resource<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ProvisionResult<T>> + Send + 'static,
    {
        let id = NodeId::new(name);
        let dependencies = depends_on;

        let mut entries = self.entries();
        if entries.iter().any(|entry| entry.id == id) {
            return Err(ProvisionError::Composition(format!(
                "node {} registered twice",
                id
            )));
        }
        if let Some(unknown) = dependencies
            .iter()
            .find(|dep| !entries.iter().any(|entry| entry.id == dep.id))
        {
            return Err(ProvisionError::Composition(format!(
                "node {} depends on unregistered node {}",
                id, unknown.id
            )));
        }

        let lifecycle: Lifecycle =
            Arc::new(Mutex::new(StateMachineWithHistory::new(NodeStatus::Pending)));
        let depends_on: Vec<NodeId> = dependencies.iter().map(|dep| dep.id.clone()).collect();
        let ready = join_vec(dependencies.into_iter().map(|dep| dep.done).collect());

        let node_id = id.clone();
        let node_lifecycle = lifecycle.clone();
        let value = AsyncValue::from_future(async move {
            if let Err(err) = ready.get().await {
                advance(&node_lifecycle, &node_id, NodeEvent::DependencyFailed);
                debug!(node = %node_id, error = %err, "Skipping node, dependency failed");
                return Err(err);
            }

            advance(&node_lifecycle, &node_id, NodeEvent::Submit);
            debug!(node = %node_id, kind = ?kind, "Submitting node");

            match body().await {
                Ok(value) => {
                    advance(&node_lifecycle, &node_id, NodeEvent::Succeed);
                    info!(node = %node_id, "Node created");
                    Ok(value)
                }
                Err(err) => {
                    advance(&node_lifecycle, &node_id, NodeEvent::Fail);
                    error!(node = %node_id, error = %err, "Node failed");
                    Err(err)
                }
            }
        });

        entries.push(NodeEntry {
            id: id.clone(),
            kind,
            depends_on,
            lifecycle,
            done: value.completion(),
        });

        Ok(Resource { id, value })
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Current status of a node
    pub fn status(&self, name: &str) -> Option<NodeStatus> {
        self.entries()
            .iter()
            .find(|entry| entry.id.as_str() == name)
            .map(|entry| {
                *entry
                    .lifecycle
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .current_state()
            })
    }

    /// Snapshot of every node's status
    pub fn report(&self) -> ProvisionReport {
        let nodes = self
            .entries()
            .iter()
            .map(|entry| {
                let fsm = entry.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
                NodeReport {
                    id: entry.id.clone(),
                    kind: entry.kind,
                    depends_on: entry.depends_on.clone(),
                    status: *fsm.current_state(),
                    transitions: fsm.history().len(),
                }
            })
            .collect();

        ProvisionReport { nodes }
    }

    /// Submit every node and wait until all of them have settled
    ///
    /// Fails with the first error observed; branches that do not depend on
    /// the failing node still run to completion.
    pub async fn realize(&self) -> ProvisionResult<ProvisionReport> {
        let submitted: Vec<(NodeId, AsyncValue<()>)> = self
            .entries()
            .iter()
            .map(|entry| (entry.id.clone(), entry.done.clone()))
            .collect();

        info!(nodes = submitted.len(), "Realizing resource graph");

        let mut tasks: FuturesUnordered<_> = submitted
            .into_iter()
            .map(|(id, done)| {
                let handle = tokio::spawn(done.into_future());
                async move { (id, handle.await) }
            })
            .collect();

        let mut first_error: Option<ProvisionError> = None;
        while let Some((id, joined)) = tasks.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome.map(|_| ()),
                Err(join_err) => Err(ProvisionError::Composition(format!(
                    "task for node {} did not finish: {}",
                    id, join_err
                ))),
            };
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }

        let report = self.report();
        match first_error {
            Some(err) => {
                error!(
                    failed = report.with_status(NodeStatus::Failed).len(),
                    skipped = report.with_status(NodeStatus::Skipped).len(),
                    error = %err,
                    "Resource graph failed"
                );
                Err(err)
            }
            None => {
                info!(nodes = report.len(), "Resource graph realized");
                Ok(report)
            }
        }
    }
}
