//! Concrete syntax trees: the original, byte-faithful rendering.
//!
//! A [`ConcreteTree`] is read-only during reconstruction. Composites mirror
//! rule invocations and may record which semantic object they were parsed
//! into; leaves carry literal text spans. Whitespace and comments are leaves
//! tagged with a [`HiddenKind`] - they are never part of the semantic token
//! sequence but hold exactly the bytes needed for faithful output.

use crate::grammar::ElemId;
use crate::model::ObjId;

/// Index of a node in its [`ConcreteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenKind {
    Whitespace,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Composite {
        children: Vec<NodeId>,
        /// Semantic object this composite was parsed into, if any.
        object: Option<ObjId>,
    },
    Leaf {
        text: String,
        hidden: Option<HiddenKind>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Grammar element this node was parsed by, if known.
    pub elem: Option<ElemId>,
}

/// Arena of concrete syntax nodes, possibly holding several trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConcreteTree {
    nodes: Vec<CstNode>,
}

impl ConcreteTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: CstNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn composite(&mut self, object: Option<ObjId>, elem: Option<ElemId>) -> NodeId {
        self.push(CstNode {
            kind: NodeKind::Composite {
                children: Vec::new(),
                object,
            },
            parent: None,
            elem,
        })
    }

    pub fn leaf(&mut self, text: &str, elem: Option<ElemId>) -> NodeId {
        self.push(CstNode {
            kind: NodeKind::Leaf {
                text: text.to_string(),
                hidden: None,
            },
            parent: None,
            elem,
        })
    }

    pub fn whitespace(&mut self, text: &str) -> NodeId {
        self.push(CstNode {
            kind: NodeKind::Leaf {
                text: text.to_string(),
                hidden: Some(HiddenKind::Whitespace),
            },
            parent: None,
            elem: None,
        })
    }

    pub fn comment(&mut self, text: &str) -> NodeId {
        self.push(CstNode {
            kind: NodeKind::Leaf {
                text: text.to_string(),
                hidden: Some(HiddenKind::Comment),
            },
            parent: None,
            elem: None,
        })
    }

    /// Attach `child` as the next child of `composite`.
    pub fn add_child(&mut self, composite: NodeId, child: NodeId) {
        debug_assert!(self.nodes[child.0 as usize].parent.is_none());
        self.nodes[child.0 as usize].parent = Some(composite);
        match &mut self.nodes[composite.0 as usize].kind {
            NodeKind::Composite { children, .. } => children.push(child),
            NodeKind::Leaf { .. } => panic!("cannot attach children to a leaf"),
        }
    }

    pub fn node(&self, id: NodeId) -> &CstNode {
        &self.nodes[id.0 as usize]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Composite { children, .. } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    pub fn object_of(&self, id: NodeId) -> Option<ObjId> {
        match &self.node(id).kind {
            NodeKind::Composite { object, .. } => *object,
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Leaf { .. })
    }

    pub fn hidden_kind(&self, id: NodeId) -> Option<HiddenKind> {
        match &self.node(id).kind {
            NodeKind::Leaf { hidden, .. } => *hidden,
            NodeKind::Composite { .. } => None,
        }
    }

    pub fn is_whitespace(&self, id: NodeId) -> bool {
        self.hidden_kind(id) == Some(HiddenKind::Whitespace)
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        self.hidden_kind(id) == Some(HiddenKind::Comment)
    }

    /// A leaf that carries source text visible to the parser.
    pub fn is_semantic_leaf(&self, id: NodeId) -> bool {
        self.is_leaf(id) && self.hidden_kind(id).is_none()
    }

    /// Leaf text, or the concatenated leaf text of a composite.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match &self.node(n).kind {
                NodeKind::Leaf { text, .. } => out.push_str(text),
                NodeKind::Composite { children, .. } => {
                    stack.extend(children.iter().rev().copied());
                }
            }
        }
        out
    }

    /// Topmost ancestor of a node.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        cur
    }

    /// All leaves under `root` in document order.
    pub fn leaves(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            match &self.node(n).kind {
                NodeKind::Leaf { .. } => out.push(n),
                NodeKind::Composite { children, .. } => {
                    stack.extend(children.iter().rev().copied());
                }
            }
        }
        out
    }

    /// The semantic object owning a leaf: the nearest enclosing composite
    /// that was parsed into an object.
    pub fn owner(&self, leaf: NodeId) -> Option<ObjId> {
        let mut cur = self.parent(leaf);
        while let Some(n) = cur {
            if let Some(obj) = self.object_of(n) {
                return Some(obj);
            }
            cur = self.parent(n);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SemanticModel;
    use pretty_assertions::assert_eq;

    /// Tree for the text `1 /*c*/ foo`.
    fn sample() -> (ConcreteTree, NodeId, Vec<NodeId>) {
        let mut model = SemanticModel::new();
        let obj = model.add_object("Model");

        let mut t = ConcreteTree::new();
        let root = t.composite(Some(obj), None);
        let l1 = t.leaf("1", None);
        let w1 = t.whitespace(" ");
        let c = t.comment("/*c*/");
        let w2 = t.whitespace(" ");
        let l2 = t.leaf("foo", None);
        for n in [l1, w1, c, w2, l2] {
            t.add_child(root, n);
        }
        (t, root, vec![l1, w1, c, w2, l2])
    }

    #[test]
    fn leaves_in_document_order() {
        let (t, root, expected) = sample();
        assert_eq!(t.leaves(root), expected);
    }

    #[test]
    fn text_concatenates_all_leaves() {
        let (t, root, _) = sample();
        assert_eq!(t.text(root), "1 /*c*/ foo");
    }

    #[test]
    fn hidden_classification() {
        let (t, _, leaves) = sample();
        assert!(t.is_semantic_leaf(leaves[0]));
        assert!(t.is_whitespace(leaves[1]));
        assert!(t.is_comment(leaves[2]));
        assert!(!t.is_semantic_leaf(leaves[3]));
    }

    #[test]
    fn owner_walks_to_tagged_composite() {
        let (t, root, leaves) = sample();
        let obj = t.object_of(root).unwrap();
        assert_eq!(t.owner(leaves[4]), Some(obj));
        assert_eq!(t.root_of(leaves[4]), root);
    }
}
