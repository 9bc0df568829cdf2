//! Whitespace recovery between emitted tokens.
//!
//! The merger tracks a position in the flattened leaf sequence of the
//! original trees. A token bound to an original leaf advances the position
//! to that leaf, re-emitting the whitespace passed over on the way; if
//! anything other than whitespace sits in between (a deleted token, a
//! relocated comment) the gap is dropped silently, as is a bound leaf that
//! lies behind the position. A fresh token claims the whitespace run
//! immediately following the current position and then stands in for the
//! next original leaf, so a value replacing an old one inherits the
//! separators around the old one. With no original tree at all, tokens are
//! emitted bare.

use std::collections::BTreeMap;

use textloom_syntax::{ConcreteTree, ElemId, NodeId};

use crate::sink::TokenStream;

pub struct WsMerger<'a> {
    cst: Option<&'a ConcreteTree>,
    /// Leaves of all original roots, concatenated in document order.
    leaves: Vec<NodeId>,
    index: BTreeMap<NodeId, usize>,
    /// Index of the last original leaf accounted for.
    pos: Option<usize>,
}

impl<'a> WsMerger<'a> {
    pub fn new(cst: Option<&'a ConcreteTree>, roots: &[NodeId]) -> Self {
        let mut leaves = Vec::new();
        if let Some(tree) = cst {
            for &root in roots {
                leaves.extend(tree.leaves(root));
            }
        }
        let index = leaves
            .iter()
            .enumerate()
            .map(|(i, &n)| (n, i))
            .collect();
        Self {
            cst,
            leaves,
            index,
            pos: None,
        }
    }

    pub fn write_semantic(
        &mut self,
        out: &mut dyn TokenStream,
        elem: Option<ElemId>,
        text: &str,
        node: Option<NodeId>,
    ) {
        match node.and_then(|n| self.index.get(&n).copied()) {
            Some(target) => {
                self.advance_to(out, target);
                self.pos = Some(target);
            }
            None => self.recover_following_ws(out),
        }
        out.write_semantic(elem, text);
    }

    pub fn write_comment(&mut self, out: &mut dyn TokenStream, node: NodeId) {
        let text = match self.cst {
            Some(tree) => tree.text(node),
            None => return,
        };
        if let Some(target) = self.index.get(&node).copied() {
            self.advance_to(out, target);
            self.pos = Some(target);
        }
        out.write_hidden(None, &text);
    }

    /// Emit any trailing whitespace directly following the last position,
    /// then flush the sink.
    pub fn flush(&mut self, out: &mut dyn TokenStream) {
        if let (Some(tree), Some(p)) = (self.cst, self.pos) {
            let mut trailing = String::new();
            for &leaf in &self.leaves[p + 1..] {
                if !tree.is_whitespace(leaf) {
                    break;
                }
                trailing.push_str(&tree.text(leaf));
            }
            if !trailing.is_empty() {
                out.write_hidden(None, &trailing);
            }
        }
        out.flush();
    }

    /// Re-emit original whitespace between the current position and
    /// `target`. A non-whitespace leaf in between belongs to something no
    /// longer serialized, so the whole gap is dropped; otherwise an empty
    /// gap still produces an empty hidden event as a token separator.
    /// A target behind the position cannot be walked to and emits nothing.
    fn advance_to(&mut self, out: &mut dyn TokenStream, target: usize) {
        let tree = match self.cst {
            Some(t) => t,
            None => return,
        };
        let start = match self.pos {
            Some(p) => p + 1,
            None => 0,
        };
        if start > target {
            return;
        }
        let mut run = String::new();
        for &leaf in &self.leaves[start..target] {
            if !tree.is_whitespace(leaf) {
                return;
            }
            run.push_str(&tree.text(leaf));
        }
        if !run.is_empty() {
            out.write_hidden(None, &run);
        } else if self.pos.is_some() {
            out.write_hidden(None, "");
        }
    }

    /// A fresh token takes over the whitespace run that follows the
    /// current position and then stands in for the next original leaf, so
    /// a replacement inherits the separators of the leaf it replaced.
    fn recover_following_ws(&mut self, out: &mut dyn TokenStream) {
        let tree = match self.cst {
            Some(t) => t,
            None => return,
        };
        let mut i = match self.pos {
            Some(p) => p + 1,
            None => 0,
        };
        let mut run = String::new();
        while i < self.leaves.len() && tree.is_whitespace(self.leaves[i]) {
            run.push_str(&tree.text(self.leaves[i]));
            i += 1;
        }
        if self.pos.is_some() || !run.is_empty() {
            out.write_hidden(None, &run);
        }
        if i < self.leaves.len() && !tree.is_whitespace(self.leaves[i]) {
            self.pos = Some(i);
        } else if i > 0 {
            self.pos = Some(i - 1);
        }
    }
}
