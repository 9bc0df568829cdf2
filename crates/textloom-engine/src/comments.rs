//! Comment-to-object association.
//!
//! Before matching, every comment leaf of the original trees is attributed
//! to the semantic object it conceptually belongs to; the node-matcher then
//! splices a comment token into that object's token children. The mapping
//! is an input to the engine - [`DefaultCommentAssociator`] implements the
//! usual heuristic, and callers with better knowledge (e.g. from an IDE's
//! documentation model) can substitute their own.

use std::collections::BTreeMap;

use textloom_syntax::{ConcreteTree, NodeId, ObjId, SemanticModel};

pub trait CommentAssociator {
    /// Map each comment leaf under the given roots to its owning object.
    /// Comments missing from the map are dropped from the output.
    fn associate(
        &self,
        model: &SemanticModel,
        cst: &ConcreteTree,
        roots: &[NodeId],
    ) -> BTreeMap<NodeId, ObjId>;
}

/// Attaches a comment trailing other text on its line to the object of the
/// preceding semantic leaf, and any other comment to the object of the next
/// semantic leaf (falling back to the preceding one at end of input).
#[derive(Debug, Default)]
pub struct DefaultCommentAssociator;

impl CommentAssociator for DefaultCommentAssociator {
    fn associate(
        &self,
        _model: &SemanticModel,
        cst: &ConcreteTree,
        roots: &[NodeId],
    ) -> BTreeMap<NodeId, ObjId> {
        let mut out = BTreeMap::new();
        for &root in roots {
            let leaves = cst.leaves(root);
            for (i, &leaf) in leaves.iter().enumerate() {
                if !cst.is_comment(leaf) {
                    continue;
                }
                let owner = if trails_on_same_line(cst, &leaves, i) {
                    preceding_owner(cst, &leaves, i)
                } else {
                    following_owner(cst, &leaves, i).or_else(|| preceding_owner(cst, &leaves, i))
                };
                if let Some(obj) = owner {
                    out.insert(leaf, obj);
                }
            }
        }
        out
    }
}

/// True when a semantic leaf precedes the comment with no line break in
/// between - an end-of-line comment.
fn trails_on_same_line(cst: &ConcreteTree, leaves: &[NodeId], comment: usize) -> bool {
    for &leaf in leaves[..comment].iter().rev() {
        if cst.is_whitespace(leaf) {
            if cst.text(leaf).contains('\n') {
                return false;
            }
        } else if cst.is_semantic_leaf(leaf) {
            return true;
        } else {
            return false;
        }
    }
    false
}

fn preceding_owner(cst: &ConcreteTree, leaves: &[NodeId], comment: usize) -> Option<ObjId> {
    leaves[..comment]
        .iter()
        .rev()
        .find(|&&l| cst.is_semantic_leaf(l))
        .and_then(|&l| cst.owner(l))
}

fn following_owner(cst: &ConcreteTree, leaves: &[NodeId], comment: usize) -> Option<ObjId> {
    leaves[comment + 1..]
        .iter()
        .find(|&&l| cst.is_semantic_leaf(l))
        .and_then(|&l| cst.owner(l))
}
