//! MCTS tree node representation.
//!
//! Each node represents a game state reached by taking an action from the parent.
//! Nodes store visit statistics used for PUCT selection and policy export.

use engine_core::Player;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
///
/// `S` and `A` are the state and action types of the game being searched.
/// Parent and children are arena indices, never owning pointers.
#[derive(Debug, Clone)]
pub struct MctsNode<S, A> {
    /// Game state at this node, owned exclusively by the node.
    pub state: S,

    /// Action that led to this node from parent (None for root)
    pub action: Option<A>,

    /// Parent node index (None for root)
    pub parent: Option<NodeId>,

    /// Children in insertion order. Empty until node is expanded.
    pub children: Vec<(A, NodeId)>,

    /// Number of times this node has been visited
    pub visits: u32,

    /// Sum of values backpropagated through this node, from the point of
    /// view of `player`.
    pub value_sum: f32,

    /// `value_sum / visits`, or 0 before the first visit.
    pub q_value: f32,

    /// Prior probability from the evaluator (noise-mixed at the root).
    pub prior: f32,

    /// Player to move at this node's state
    pub player: Player,

    /// Whether this is a terminal state (game over)
    pub terminal: bool,
}

impl<S, A> MctsNode<S, A> {
    /// Create a new root node.
    pub fn new_root(state: S, player: Player, terminal: bool) -> Self {
        Self {
            state,
            action: None,
            parent: None,
            children: Vec::new(),
            visits: 0,
            value_sum: 0.0,
            q_value: 0.0,
            prior: 1.0, // Root has prior 1.0
            player,
            terminal,
        }
    }

    /// Create a new child node.
    pub fn new_child(
        parent: NodeId,
        action: A,
        prior: f32,
        state: S,
        player: Player,
        terminal: bool,
    ) -> Self {
        Self {
            state,
            action: Some(action),
            parent: Some(parent),
            children: Vec::new(),
            visits: 0,
            value_sum: 0.0,
            q_value: 0.0,
            prior,
            player,
            terminal,
        }
    }

    /// Account for one more visit carrying `value` (already in this node's
    /// perspective) and refresh the cached mean.
    #[inline]
    pub fn record(&mut self, value: f32) {
        self.visits += 1;
        self.value_sum += value;
        self.q_value = self.value_sum / self.visits as f32;
    }

    /// Value of this node as seen by `viewer`.
    #[inline]
    pub fn q_for(&self, viewer: Player) -> f32 {
        if viewer == self.player {
            self.q_value
        } else {
            -self.q_value
        }
    }

    /// Check if this node has been expanded (has children).
    #[inline]
    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    /// Check if this is a leaf node (not expanded or terminal).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.terminal || !self.is_expanded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Node = MctsNode<u8, u8>;

    #[test]
    fn test_new_root() {
        let node = Node::new_root(7, Player::First, false);

        assert!(node.parent.is_none());
        assert!(node.action.is_none());
        assert_eq!(node.visits, 0);
        assert!((node.prior - 1.0).abs() < 1e-6);
        assert!(!node.terminal);
        assert!(node.children.is_empty());
        assert_eq!(node.state, 7);
    }

    #[test]
    fn test_new_child() {
        let node = Node::new_child(NodeId(0), 3, 0.4, 9, Player::Second, true);
        assert_eq!(node.parent, Some(NodeId(0)));
        assert_eq!(node.action, Some(3));
        assert!((node.prior - 0.4).abs() < 1e-6);
        assert!(node.terminal);
    }

    #[test]
    fn test_record_updates_q_value() {
        let mut node = Node::new_root(0, Player::First, false);

        // Unvisited
        assert!(node.q_value.abs() < 1e-6);

        node.record(1.0);
        node.record(0.0);
        node.record(-0.5);
        node.record(1.5);
        assert_eq!(node.visits, 4);
        assert!((node.value_sum - 2.0).abs() < 1e-6);
        assert!((node.q_value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_q_for_flips_for_opponent() {
        let mut node = Node::new_root(0, Player::Second, false);
        node.record(0.25);

        assert!((node.q_for(Player::Second) - 0.25).abs() < 1e-6);
        assert!((node.q_for(Player::First) + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_is_leaf() {
        let mut node = Node::new_root(0, Player::First, false);

        // Initially a leaf (no children)
        assert!(node.is_leaf());

        // Add a child
        node.children.push((0, NodeId(1)));
        assert!(!node.is_leaf());

        // Terminal nodes are always leaves
        let mut terminal = Node::new_root(0, Player::First, true);
        terminal.children.push((0, NodeId(1)));
        assert!(terminal.is_leaf());
    }
}
