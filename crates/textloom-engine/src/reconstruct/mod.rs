//! The reconstruction pipeline.
//!
//! [`Reconstructor::serialize_recursive`] runs the full sequence for one
//! top-level object: search for a token chain that consumes the model,
//! fold the chain into a token tree, reconcile it against the original
//! concrete tree, then emit the event stream with original whitespace
//! merged back in.

pub mod cursor;
pub mod matching;
pub mod report;
pub mod search;
pub mod token;
pub mod ws_merge;

use textloom_syntax::{ConcreteTree, Grammar, NodeId, ObjId, SemanticModel};

use crate::comments::{CommentAssociator, DefaultCommentAssociator};
use crate::error::ReconstructError;
use crate::reconstruct::matching::Matcher;
use crate::reconstruct::report::DeadEndReport;
use crate::reconstruct::search::Search;
use crate::reconstruct::token::{render_literal, TokenArena, TokenId, TokenKind};
use crate::reconstruct::ws_merge::WsMerger;
use crate::serializer::Serializers;
use crate::sink::TokenStream;

#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    /// Upper bound on bound tokens in one search; guards against
    /// runaway recursion on pathological grammars.
    pub max_depth: usize,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self { max_depth: 10_000 }
    }
}

pub struct Reconstructor<'g> {
    grammar: &'g Grammar,
    serializers: Serializers,
    comment_associator: Box<dyn CommentAssociator>,
    options: ReconstructOptions,
}

impl<'g> Reconstructor<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            serializers: Serializers::default(),
            comment_associator: Box::new(DefaultCommentAssociator),
            options: ReconstructOptions::default(),
        }
    }

    pub fn with_serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = serializers;
        self
    }

    pub fn with_comment_associator(mut self, associator: Box<dyn CommentAssociator>) -> Self {
        self.comment_associator = associator;
        self
    }

    pub fn with_options(mut self, options: ReconstructOptions) -> Self {
        self.options = options;
        self
    }

    /// Serialize `obj` and everything reachable from it to `out`.
    ///
    /// `cst` is the original concrete tree the model was parsed from, when
    /// one exists; its unchanged literals, whitespace and comments are
    /// preserved in the output. The returned report is empty on success;
    /// dead ends hit on the way to an eventually successful chain are
    /// discarded.
    pub fn serialize_recursive(
        &self,
        model: &SemanticModel,
        obj: ObjId,
        cst: Option<&ConcreteTree>,
        out: &mut dyn TokenStream,
    ) -> Result<DeadEndReport, ReconstructError> {
        let mut search = Search::new(
            self.grammar,
            model,
            &self.serializers,
            self.options.max_depth,
        );
        let last = search.run(obj)?;
        let mut arena = search.arena;
        let (root, obj2frame) = arena.fold_into_tree(last);

        let mut roots: Vec<NodeId> = Vec::new();
        if let Some(tree) = cst {
            for (o, _) in &obj2frame {
                if let Some(node) = model.object(*o).cst {
                    let r = tree.root_of(node);
                    if !roots.contains(&r) {
                        roots.push(r);
                    }
                }
            }
            let comments = self.comment_associator.associate(model, tree, &roots);
            let matcher = Matcher {
                grammar: self.grammar,
                model,
                serializers: &self.serializers,
                cst: tree,
            };
            matcher.assign_nodes(&mut arena, &obj2frame, &roots, &comments);
        }

        let mut merger = WsMerger::new(cst, &roots);
        self.write_tree(model, cst, &arena, root, &mut merger, out)?;
        merger.flush(out);
        Ok(DeadEndReport::new())
    }

    /// Depth-first walk of the token tree, emitting in document order.
    fn write_tree(
        &self,
        model: &SemanticModel,
        cst: Option<&ConcreteTree>,
        arena: &TokenArena,
        root: TokenId,
        merger: &mut WsMerger<'_>,
        out: &mut dyn TokenStream,
    ) -> Result<(), ReconstructError> {
        let mut stack = vec![root];
        while let Some(t) = stack.pop() {
            let tok = arena.get(t);
            match tok.kind {
                TokenKind::Comment => {
                    if let Some(node) = tok.node {
                        merger.write_comment(out, node);
                    }
                }
                _ => {
                    if let Some(text) =
                        render_literal(self.grammar, model, &self.serializers, cst, tok)?
                    {
                        merger.write_semantic(out, tok.elem, &text, tok.node);
                    }
                }
            }
            for &child in tok.children.iter().rev() {
                stack.push(child);
            }
        }
        Ok(())
    }
}
