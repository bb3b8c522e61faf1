//! MCTS tree structure with arena allocation.
//!
//! The tree uses arena allocation for efficient node storage and
//! cache-friendly traversal. Nodes are stored in a contiguous Vec
//! and referenced by NodeId indices. A child is always allocated after its
//! parent, so every parent index is smaller than its children's.

use engine_core::{GameRules, Player, RulesError};
use rand::Rng;

use crate::config::Exploration;
use crate::node::{MctsNode, NodeId};
use crate::policy::{exploration_constant, gamma_noise, mix_noise, puct_score, visit_fractions};
use crate::search::SearchError;

/// Node type for a given game.
pub type Node<G> = MctsNode<<G as GameRules>::State, <G as GameRules>::Action>;

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<G: GameRules> {
    /// Arena storing all nodes
    nodes: Vec<Node<G>>,

    /// Root node index (always 0 after initialization)
    root: NodeId,
}

impl<G: GameRules> MctsTree<G> {
    /// Create a new tree whose root holds `state`.
    pub fn new(rules: &G, state: G::State) -> Self {
        let player = rules.player_to_move(&state);
        let terminal = rules.terminal_test(&state);
        Self {
            nodes: vec![MctsNode::new_root(state, player, terminal)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<G> {
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<G> {
        &mut self.nodes[id.index()]
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (should never be true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the arena slice for read access.
    #[inline]
    pub fn arena(&self) -> &[Node<G>] {
        &self.nodes
    }

    /// Add a child to a parent node.
    /// Returns the new child's NodeId.
    pub fn add_child(
        &mut self,
        parent_id: NodeId,
        action: G::Action,
        prior: f32,
        state: G::State,
        player: Player,
        terminal: bool,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MctsNode::new_child(
            parent_id, action, prior, state, player, terminal,
        ));
        self.get_mut(parent_id).children.push((action, id));
        id
    }

    /// Expand a node with one child per `(action, prior)` pair.
    ///
    /// A node that is terminal or already expanded is left untouched and
    /// `Ok(0)` is returned. Otherwise returns the number of children created.
    /// Fails on the first action the rules refuse, leaving the node unexpanded.
    pub fn expand(
        &mut self,
        rules: &G,
        node_id: NodeId,
        priors: &[(G::Action, f32)],
    ) -> Result<usize, RulesError> {
        let node = self.get(node_id);
        if node.terminal || node.is_expanded() {
            return Ok(0);
        }

        let mut successors = Vec::with_capacity(priors.len());
        for &(action, prior) in priors {
            if successors.iter().any(|(a, _, _)| *a == action) {
                continue;
            }
            let state = rules.result(&node.state, action)?;
            successors.push((action, prior, state));
        }

        let created = successors.len();
        for (action, prior, state) in successors {
            let player = rules.player_to_move(&state);
            let terminal = rules.terminal_test(&state);
            self.add_child(node_id, action, prior, state, player, terminal);
        }
        Ok(created)
    }

    /// Select the best child of a node using PUCT.
    ///
    /// Each child's value is read from the selecting node's player, so a
    /// child where the opponent is to move contributes `-q`. The first child
    /// in insertion order wins ties.
    ///
    /// A child's stored `q_value` is from its own mover's side, so it carries
    /// the opposite sign of the score the parent sees for it. A child the
    /// parent rates at 0.2 stores -0.2.
    pub fn select_child(&self, node_id: NodeId, exploration: &Exploration) -> Option<NodeId> {
        let node = self.get(node_id);
        let c = exploration_constant(exploration, node.visits);

        let mut best: Option<(NodeId, f32)> = None;
        for &(_, child_id) in &node.children {
            let child = self.get(child_id);
            let score = puct_score(
                child.q_for(node.player),
                child.prior,
                node.visits,
                child.visits,
                c,
            );
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((child_id, score));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Descend from the root to a leaf, returning it and its depth.
    pub fn select_leaf(&self, exploration: &Exploration) -> (NodeId, u32) {
        let mut current = self.root;
        let mut depth = 0;

        while !self.get(current).is_leaf() {
            match self.select_child(current, exploration) {
                Some(child) => {
                    current = child;
                    depth += 1;
                }
                None => break,
            }
        }
        (current, depth)
    }

    /// Backpropagate a value from a leaf to the root.
    ///
    /// `value` is from the leaf's player to move. Every ancestor whose player
    /// to move differs receives the negated value.
    pub fn backpropagate(&mut self, leaf_id: NodeId, value: f32) {
        let origin = self.get(leaf_id).player;
        let mut current = Some(leaf_id);

        while let Some(id) = current {
            let node = self.get_mut(id);
            let signed = if node.player == origin { value } else { -value };
            node.record(signed);
            current = node.parent;
        }
    }

    /// Perturb the priors of the root's children with independent
    /// Gamma(concentration, 1) samples.
    ///
    /// A concentration or fraction of 0 leaves the priors untouched.
    pub fn add_root_noise<R: Rng + ?Sized>(
        &mut self,
        concentration: f32,
        fraction: f32,
        rng: &mut R,
    ) -> Result<(), SearchError> {
        if concentration <= 0.0 || fraction <= 0.0 {
            return Ok(());
        }

        let children: Vec<NodeId> = self
            .get(self.root)
            .children
            .iter()
            .map(|(_, id)| *id)
            .collect();
        let noise = gamma_noise(children.len(), concentration, rng)?;

        for (child_id, sample) in children.into_iter().zip(noise) {
            let child = self.get_mut(child_id);
            child.prior = mix_noise(child.prior, sample, fraction);
        }
        Ok(())
    }

    /// Visit counts of the root's children in insertion order.
    pub fn root_visits(&self) -> Vec<(G::Action, u32)> {
        self.get(self.root)
            .children
            .iter()
            .map(|&(action, id)| (action, self.get(id).visits))
            .collect()
    }

    /// Normalised visit distribution over the root's children.
    /// Empty when the root has no children.
    pub fn root_policy(&self) -> Vec<(G::Action, f32)> {
        let visits = self.root_visits();
        let counts: Vec<u32> = visits.iter().map(|(_, v)| *v).collect();
        visits
            .into_iter()
            .zip(visit_fractions(&counts))
            .map(|((action, _), p)| (action, p))
            .collect()
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visits,
            root_value: root.q_value,
            max_depth: self.compute_max_depth(),
        }
    }

    fn compute_max_depth(&self) -> u32 {
        // Parents precede children in the arena, so one forward pass suffices
        let mut depths = vec![0u32; self.nodes.len()];
        let mut max_depth = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                depths[i] = depths[parent.index()] + 1;
                max_depth = max_depth.max(depths[i]);
            }
        }
        max_depth
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}
