//! Edit/delete behavior attached to nodes at hydration time.
//!
//! Persisted nodes carry only ids. Each rendered node gets a [`BoundNode`]
//! that forwards to the dispatch supplied by the host, so reloading never
//! leaves a node calling into stale state.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::model::{NodeId, TableNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    Edit(NodeId),
    Delete(NodeId),
}

pub trait NodeDispatch {
    fn dispatch(&self, action: NodeAction);
}

/// Dispatch that records actions for the session to apply later.
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: RefCell<Vec<NodeAction>>,
}

impl ActionQueue {
    pub fn drain(&self) -> Vec<NodeAction> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl NodeDispatch for ActionQueue {
    fn dispatch(&self, action: NodeAction) {
        self.pending.borrow_mut().push(action);
    }
}

#[derive(Clone)]
pub struct BoundNode {
    pub id: NodeId,
    dispatch: Rc<dyn NodeDispatch>,
}

impl BoundNode {
    pub fn edit(&self) {
        self.dispatch.dispatch(NodeAction::Edit(self.id.clone()));
    }

    pub fn delete(&self) {
        self.dispatch.dispatch(NodeAction::Delete(self.id.clone()));
    }
}

impl std::fmt::Debug for BoundNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundNode").field("id", &self.id).finish()
    }
}

#[derive(Default)]
pub struct NodeBindings {
    dispatch: Option<Rc<dyn NodeDispatch>>,
    nodes: Option<Arc<Vec<TableNode>>>,
    bound: Vec<BoundNode>,
}

impl NodeBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every node to `dispatch`, in node order.
    ///
    /// Does nothing when both the dispatch and the node snapshot are the
    /// ones already bound. Returns whether a rebind happened.
    pub fn attach(&mut self, nodes: &Arc<Vec<TableNode>>, dispatch: &Rc<dyn NodeDispatch>) -> bool {
        let same_dispatch = self
            .dispatch
            .as_ref()
            .is_some_and(|d| std::ptr::addr_eq(Rc::as_ptr(d), Rc::as_ptr(dispatch)));
        let same_nodes = self.nodes.as_ref().is_some_and(|n| Arc::ptr_eq(n, nodes));
        if same_dispatch && same_nodes {
            return false;
        }

        self.bound = nodes
            .iter()
            .map(|n| BoundNode {
                id: n.id.clone(),
                dispatch: Rc::clone(dispatch),
            })
            .collect();
        self.dispatch = Some(Rc::clone(dispatch));
        self.nodes = Some(Arc::clone(nodes));
        true
    }

    pub fn bound(&self) -> &[BoundNode] {
        &self.bound
    }

    pub fn get(&self, id: &str) -> Option<&BoundNode> {
        self.bound.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeData, Position};

    fn nodes(ids: &[&str]) -> Arc<Vec<TableNode>> {
        Arc::new(
            ids.iter()
                .map(|id| TableNode::new(*id, Position::default(), NodeData::default()))
                .collect(),
        )
    }

    #[test]
    fn test_bound_nodes_dispatch_current_behavior() {
        let queue = Rc::new(ActionQueue::default());
        let dispatch: Rc<dyn NodeDispatch> = queue.clone();
        let mut bindings = NodeBindings::new();
        bindings.attach(&nodes(&["a", "b"]), &dispatch);

        bindings.get("b").unwrap().edit();
        bindings.get("a").unwrap().delete();
        assert_eq!(
            queue.drain(),
            vec![NodeAction::Edit("b".into()), NodeAction::Delete("a".into())]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_rebinds_once_per_change() {
        let first: Rc<dyn NodeDispatch> = Rc::new(ActionQueue::default());
        let second: Rc<dyn NodeDispatch> = Rc::new(ActionQueue::default());
        let snapshot = nodes(&["a", "b", "c"]);
        let mut bindings = NodeBindings::new();

        assert!(bindings.attach(&snapshot, &first));
        assert!(!bindings.attach(&snapshot, &first));
        assert!(!bindings.attach(&snapshot, &Rc::clone(&first)));

        assert!(bindings.attach(&snapshot, &second));
        assert!(!bindings.attach(&snapshot, &second));

        let ids: Vec<&str> = bindings.bound().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_new_snapshot_rebinds() {
        let dispatch: Rc<dyn NodeDispatch> = Rc::new(ActionQueue::default());
        let mut bindings = NodeBindings::new();
        bindings.attach(&nodes(&["a"]), &dispatch);
        assert!(bindings.attach(&nodes(&["a", "b"]), &dispatch));
        assert_eq!(bindings.bound().len(), 2);
    }
}
