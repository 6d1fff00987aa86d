use log::debug;
use pattern::Symbol;
use pattern::Token;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use thiserror::Error;

/// 1-based index of a leaf, in the order leaves appear in the postfix stream.
pub type Position = usize;
pub type PositionSet = BTreeSet<Position>;
/// Index of a node in its tree's node arena.
pub type NodeId = usize;

static NO_POSITIONS: PositionSet = PositionSet::new();

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Operator '{0}' is missing an operand")]
    StackUnderflow(Token),
    #[error("Unexpected '{0}' in postfix input")]
    UnexpectedToken(Token),
    #[error("Postfix input left {0} disconnected subtrees")]
    DanglingNodes(usize),
    #[error("Empty postfix input")]
    EmptyInput,
    #[error("Postfix input has no end-marker")]
    MissingEndMarker,
    #[error("Postfix input has more than one end-marker")]
    DuplicateEndMarker,
}

/// Operands are referenced by [`NodeId`] and always precede their operator in
/// the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { symbol: Symbol, position: Position },
    /// Matches the empty string. Carries no position.
    Empty,
    Star(NodeId),
    Concat(NodeId, NodeId),
    Alternation(NodeId, NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub nullable: bool,
    pub firstpos: PositionSet,
    pub lastpos: PositionSet,
}

impl SyntaxNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            nullable: false,
            firstpos: PositionSet::new(),
            lastpos: PositionSet::new(),
        }
    }
}

/// A syntax tree rebuilt from a postfix token stream, attributes not yet computed.
///
/// Nodes live in a flat arena in postfix order, which is a postorder walk of
/// the tree: children before parents, left subtree before right subtree. The
/// root is the last node. Every pass over the tree is a loop over the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    leaf_count: usize,
}

impl SyntaxTree {
    pub fn from_postfix(postfix: &[Token]) -> Result<Self, TreeError> {
        let mut position = 0;
        let mut nodes: Vec<SyntaxNode> = Vec::with_capacity(postfix.len());
        let mut stack: Vec<NodeId> = Vec::new();

        for token in postfix {
            let kind = match token {
                Token::Symbol(Symbol::Epsilon) => NodeKind::Empty,
                Token::Symbol(symbol) => {
                    position += 1;
                    NodeKind::Leaf {
                        symbol: symbol.clone(),
                        position,
                    }
                }
                Token::Star => NodeKind::Star(pop_operand(&mut stack, token)?),
                Token::Concat => {
                    let right = pop_operand(&mut stack, token)?;
                    let left = pop_operand(&mut stack, token)?;
                    NodeKind::Concat(left, right)
                }
                Token::Pipe => {
                    let right = pop_operand(&mut stack, token)?;
                    let left = pop_operand(&mut stack, token)?;
                    NodeKind::Alternation(left, right)
                }
                Token::LeftParen | Token::RightParen => {
                    return Err(TreeError::UnexpectedToken(token.clone()));
                }
            };
            stack.push(nodes.len());
            nodes.push(SyntaxNode::new(kind));
        }

        if stack.pop().is_none() {
            return Err(TreeError::EmptyInput);
        }
        if !stack.is_empty() {
            return Err(TreeError::DanglingNodes(stack.len() + 1));
        }
        Ok(Self {
            nodes,
            leaf_count: position,
        })
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    /// Children before parents, left subtree before right subtree.
    pub fn postorder(&self) -> std::slice::Iter<'_, SyntaxNode> {
        self.nodes.iter()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    fn compute_nullable(&mut self) {
        for i in 0..self.nodes.len() {
            let (done, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];
            node.nullable = match node.kind {
                NodeKind::Leaf { .. } => false,
                NodeKind::Empty | NodeKind::Star(_) => true,
                NodeKind::Alternation(left, right) => done[left].nullable || done[right].nullable,
                NodeKind::Concat(left, right) => done[left].nullable && done[right].nullable,
            };
        }
    }

    /// Requires `nullable` to be computed.
    fn compute_firstpos(&mut self) {
        for i in 0..self.nodes.len() {
            let (done, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];
            node.firstpos = match node.kind {
                NodeKind::Leaf { position, .. } => PositionSet::from([position]),
                NodeKind::Empty => PositionSet::new(),
                NodeKind::Star(left) => done[left].firstpos.clone(),
                NodeKind::Alternation(left, right) => &done[left].firstpos | &done[right].firstpos,
                NodeKind::Concat(left, right) if done[left].nullable => {
                    &done[left].firstpos | &done[right].firstpos
                }
                NodeKind::Concat(left, _) => done[left].firstpos.clone(),
            };
        }
    }

    /// Requires `nullable` to be computed.
    fn compute_lastpos(&mut self) {
        for i in 0..self.nodes.len() {
            let (done, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];
            node.lastpos = match node.kind {
                NodeKind::Leaf { position, .. } => PositionSet::from([position]),
                NodeKind::Empty => PositionSet::new(),
                NodeKind::Star(left) => done[left].lastpos.clone(),
                NodeKind::Alternation(left, right) => &done[left].lastpos | &done[right].lastpos,
                NodeKind::Concat(left, right) if done[right].nullable => {
                    &done[left].lastpos | &done[right].lastpos
                }
                NodeKind::Concat(_, right) => done[right].lastpos.clone(),
            };
        }
    }
}

fn pop_operand(stack: &mut Vec<NodeId>, operator: &Token) -> Result<NodeId, TreeError> {
    stack
        .pop()
        .ok_or_else(|| TreeError::StackUnderflow(operator.clone()))
}

/// A syntax tree with every attribute computed, plus the indexes the DFA
/// builder consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTreeInfo {
    tree: SyntaxTree,
    alphabets: BTreeSet<Symbol>,
    positions: BTreeMap<Symbol, PositionSet>,
    final_state_pos: Position,
    followsets: BTreeMap<Position, PositionSet>,
}

impl SyntaxTreeInfo {
    pub fn new(mut tree: SyntaxTree) -> Result<Self, TreeError> {
        tree.compute_nullable();
        tree.compute_firstpos();
        tree.compute_lastpos();

        let mut alphabets = BTreeSet::new();
        let mut positions: BTreeMap<Symbol, PositionSet> = BTreeMap::new();
        let mut final_state_pos = None;
        for node in tree.postorder() {
            let NodeKind::Leaf { symbol, position } = &node.kind else {
                continue;
            };
            if symbol.is_end_marker() {
                if final_state_pos.replace(*position).is_some() {
                    return Err(TreeError::DuplicateEndMarker);
                }
                continue;
            }
            alphabets.insert(symbol.clone());
            positions.entry(symbol.clone()).or_default().insert(*position);
        }
        let final_state_pos = final_state_pos.ok_or(TreeError::MissingEndMarker)?;

        let followsets = followpos(&tree);
        debug!(
            "syntax tree has {} leaves, {} symbols, end-marker at {final_state_pos}",
            tree.leaf_count(),
            alphabets.len()
        );

        Ok(Self {
            tree,
            alphabets,
            positions,
            final_state_pos,
            followsets,
        })
    }

    pub fn root(&self) -> &SyntaxNode {
        self.tree.root()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        self.tree.node(id)
    }

    pub fn postorder(&self) -> std::slice::Iter<'_, SyntaxNode> {
        self.tree.postorder()
    }

    pub fn leaf_count(&self) -> usize {
        self.tree.leaf_count()
    }

    pub fn alphabets(&self) -> &BTreeSet<Symbol> {
        &self.alphabets
    }

    /// Leaf positions labelled with `symbol`.
    pub fn positions(&self, symbol: &Symbol) -> &PositionSet {
        self.positions.get(symbol).unwrap_or(&NO_POSITIONS)
    }

    pub fn final_state_pos(&self) -> Position {
        self.final_state_pos
    }

    pub fn followpos(&self, position: Position) -> &PositionSet {
        self.followsets.get(&position).unwrap_or(&NO_POSITIONS)
    }

    pub fn followsets(&self) -> &BTreeMap<Position, PositionSet> {
        &self.followsets
    }
}

fn followpos(tree: &SyntaxTree) -> BTreeMap<Position, PositionSet> {
    let mut follow: BTreeMap<Position, PositionSet> = BTreeMap::new();
    for node in tree.postorder() {
        match node.kind {
            NodeKind::Concat(left, right) => {
                let firstpos = &tree.node(right).firstpos;
                for pos in &tree.node(left).lastpos {
                    follow.entry(*pos).or_default().extend(firstpos);
                }
            }
            NodeKind::Star(_) => {
                for pos in &node.lastpos {
                    follow.entry(*pos).or_default().extend(&node.firstpos);
                }
            }
            NodeKind::Leaf { .. } | NodeKind::Empty | NodeKind::Alternation(..) => {}
        }
    }
    follow
}
