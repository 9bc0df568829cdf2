//! Reconciling the token tree against the original concrete tree.
//!
//! The matcher walks the original leaves in document order. Each semantic
//! leaf is offered to the token frame of its owning object; the first
//! unbound token that would serialize to the same text gets the leaf bound
//! to it and will later copy its text (and the whitespace in front of it)
//! verbatim. A changed assignment only refuses its own leaf: the scan
//! skips past it so the unchanged leaves of other attributes in the same
//! frame still reuse their literals. Only a leaf carrying the same grammar
//! element as a non-matching token stops early, so a stale occurrence of a
//! list attribute cannot pair up with a later one.
//!
//! Comment leaves are routed through the comment-association map and
//! spliced into the owning frame as extra tokens, before the first unbound
//! keyword or assignment child so they keep preceding the text they
//! annotate.

use std::collections::BTreeMap;

use textloom_syntax::{ConcreteTree, Grammar, NodeId, ObjId, SemanticModel};

use crate::reconstruct::token::{
    matches_existing, AssignKind, TokenArena, TokenId, TokenKind, TokenNode,
};
use crate::serializer::Serializers;

pub struct Matcher<'a> {
    pub grammar: &'a Grammar,
    pub model: &'a SemanticModel,
    pub serializers: &'a Serializers,
    pub cst: &'a ConcreteTree,
}

impl<'a> Matcher<'a> {
    /// Bind original leaves to tokens across all original roots.
    pub fn assign_nodes(
        &self,
        arena: &mut TokenArena,
        obj2frame: &[(ObjId, TokenId)],
        roots: &[NodeId],
        comments: &BTreeMap<NodeId, ObjId>,
    ) {
        for &root in roots {
            for leaf in self.cst.leaves(root) {
                if self.cst.is_whitespace(leaf) {
                    continue;
                }
                if self.cst.is_comment(leaf) {
                    if let Some(&owner) = comments.get(&leaf) {
                        if let Some(frame) = frame_of(obj2frame, owner) {
                            splice_comment(arena, frame, owner, leaf);
                        }
                    }
                    continue;
                }
                if let Some(owner) = self.cst.owner(leaf) {
                    if let Some(frame) = frame_of(obj2frame, owner) {
                        self.try_match(arena, frame, leaf);
                    }
                }
            }
        }
    }

    /// Offer `leaf` to the frame's tokens in document order. Unassigned
    /// rule calls open a nested frame for the same object, so the scan
    /// recurses through them; assignment-produced child objects have their
    /// own frames and are not entered.
    fn try_match(&self, arena: &mut TokenArena, frame: TokenId, leaf: NodeId) -> bool {
        let children = arena.get(frame).children.clone();
        for child in children {
            let tok = arena.get(child);
            match tok.kind {
                TokenKind::RuleCall => {
                    if self.try_match(arena, child, leaf) {
                        return true;
                    }
                }
                TokenKind::Keyword | TokenKind::UnassignedText => {
                    if tok.node.is_none()
                        && matches_existing(
                            self.grammar,
                            self.model,
                            self.serializers,
                            self.cst,
                            tok,
                            leaf,
                        )
                    {
                        arena.get_mut(child).node = Some(leaf);
                        return true;
                    }
                }
                TokenKind::Assignment(AssignKind::Parser) => {}
                TokenKind::Assignment(_) => {
                    if tok.node.is_none() {
                        if matches_existing(
                            self.grammar,
                            self.model,
                            self.serializers,
                            self.cst,
                            tok,
                            leaf,
                        ) {
                            arena.get_mut(child).node = Some(leaf);
                            return true;
                        }
                        // the leaf came from this very assignment but the
                        // value changed; binding it to a later occurrence
                        // would reorder the original text
                        if tok.elem.is_some() && tok.elem == self.cst.node(leaf).elem {
                            return false;
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }
}

fn frame_of(obj2frame: &[(ObjId, TokenId)], obj: ObjId) -> Option<TokenId> {
    obj2frame.iter().find(|(o, _)| *o == obj).map(|(_, f)| *f)
}

/// Insert a comment token before the first unbound keyword or assignment
/// child, appending when all are bound.
fn splice_comment(arena: &mut TokenArena, frame: TokenId, owner: ObjId, leaf: NodeId) {
    let state = arena.get(frame).state_before.clone();
    let comment = arena.push(TokenNode {
        kind: TokenKind::Comment,
        elem: None,
        obj: owner,
        attempt: 0,
        continuation: None,
        parent: Some(frame),
        state_before: state,
        value: None,
        node: Some(leaf),
        children: Vec::new(),
    });
    let children = &arena.get(frame).children;
    let at = children
        .iter()
        .position(|&c| {
            let t = arena.get(c);
            matches!(t.kind, TokenKind::Keyword | TokenKind::Assignment(_)) && t.node.is_none()
        })
        .unwrap_or(children.len());
    arena.get_mut(frame).children.insert(at, comment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use textloom_syntax::{AssignTarget, GrammarBuilder, Value};

    use crate::reconstruct::search::Search;

    // Greeting: "hello" name=ID
    fn greeting() -> (Grammar, SemanticModel, ObjId) {
        let mut b = GrammarBuilder::new();
        let id = b.datatype_rule("ID");
        let greeting = b.parser_rule("Greeting", "Greeting");
        let hello = b.keyword("hello");
        let name = b.assign("name", AssignTarget::Rule(id));
        let body = b.group(&[hello, name]);
        b.set_body(greeting, body);
        let g = b.finish();

        let mut model = SemanticModel::new();
        let obj = model.add_object("Greeting");
        model.push_value(obj, "name", Value::Str("world".into()));
        (g, model, obj)
    }

    fn original(model: &mut SemanticModel, obj: ObjId, name: &str) -> (ConcreteTree, NodeId) {
        let mut cst = ConcreteTree::new();
        let root = cst.composite(Some(obj), None);
        let hello = cst.leaf("hello", None);
        let ws = cst.whitespace(" ");
        let name = cst.leaf(name, None);
        cst.add_child(root, hello);
        cst.add_child(root, ws);
        cst.add_child(root, name);
        model.set_cst(obj, root);
        (cst, root)
    }

    fn bound_nodes(arena: &TokenArena, frame: TokenId) -> Vec<Option<NodeId>> {
        arena
            .get(frame)
            .children
            .iter()
            .map(|&c| arena.get(c).node)
            .collect()
    }

    #[test]
    fn unchanged_leaves_bind_in_order() {
        let (g, mut model, obj) = greeting();
        let (cst, root) = original(&mut model, obj, "world");

        let serializers = Serializers::default();
        let mut search = Search::new(&g, &model, &serializers, 1000);
        let last = search.run(obj).unwrap();
        let (tree_root, obj2frame) = search.arena.fold_into_tree(last);

        let matcher = Matcher {
            grammar: &g,
            model: &model,
            serializers: &serializers,
            cst: &cst,
        };
        matcher.assign_nodes(&mut search.arena, &obj2frame, &[root], &BTreeMap::new());

        // group token first, then "hello" and the name - both bound
        let nodes = bound_nodes(&search.arena, tree_root);
        assert_eq!(nodes[0], None);
        assert!(nodes[1].is_some());
        assert!(nodes[2].is_some());
    }

    #[test]
    fn changed_assignment_stays_unbound() {
        let (g, mut model, obj) = greeting();
        // original text said "world", the model now says "moon"
        let (cst, root) = original(&mut model, obj, "world");
        model.set_values(obj, "name", vec![Value::Str("moon".into())]);

        let serializers = Serializers::default();
        let mut search = Search::new(&g, &model, &serializers, 1000);
        let last = search.run(obj).unwrap();
        let (tree_root, obj2frame) = search.arena.fold_into_tree(last);

        let matcher = Matcher {
            grammar: &g,
            model: &model,
            serializers: &serializers,
            cst: &cst,
        };
        matcher.assign_nodes(&mut search.arena, &obj2frame, &[root], &BTreeMap::new());

        let nodes = bound_nodes(&search.arena, tree_root);
        assert!(nodes[1].is_some(), "unchanged keyword is reused");
        assert_eq!(nodes[2], None, "changed name must serialize fresh");
    }

    #[test]
    fn later_leaves_still_bind_past_a_changed_assignment() {
        // Pair: value=INT name=ID, with `value` changed and `name` not
        let mut b = GrammarBuilder::new();
        let id = b.datatype_rule("ID");
        let int = b.datatype_rule("INT");
        let pair = b.parser_rule("Pair", "Pair");
        let value = b.assign("value", AssignTarget::Rule(int));
        let name = b.assign("name", AssignTarget::Rule(id));
        let body = b.group(&[value, name]);
        b.set_body(pair, body);
        let g = b.finish();

        let mut model = SemanticModel::new();
        let obj = model.add_object("Pair");
        model.push_value(obj, "value", Value::Int(2));
        model.push_value(obj, "name", Value::Str("foo".into()));

        let mut cst = ConcreteTree::new();
        let root = cst.composite(Some(obj), None);
        let one = cst.leaf("1", None);
        let ws = cst.whitespace(" ");
        let foo = cst.leaf("foo", None);
        for n in [one, ws, foo] {
            cst.add_child(root, n);
        }
        model.set_cst(obj, root);

        let serializers = Serializers::default();
        let mut search = Search::new(&g, &model, &serializers, 1000);
        let last = search.run(obj).unwrap();
        let (tree_root, obj2frame) = search.arena.fold_into_tree(last);

        let matcher = Matcher {
            grammar: &g,
            model: &model,
            serializers: &serializers,
            cst: &cst,
        };
        matcher.assign_nodes(&mut search.arena, &obj2frame, &[root], &BTreeMap::new());

        let nodes = bound_nodes(&search.arena, tree_root);
        assert_eq!(nodes[1], None, "changed value serializes fresh");
        assert_eq!(nodes[2], Some(foo), "unchanged name reuses its leaf");
    }

    #[test]
    fn comment_is_spliced_before_first_unbound_child() {
        let (g, mut model, obj) = greeting();
        let mut cst = ConcreteTree::new();
        let root = cst.composite(Some(obj), None);
        let comment = cst.comment("// greeting\n");
        let hello = cst.leaf("hello", None);
        let ws = cst.whitespace(" ");
        let name = cst.leaf("world", None);
        for n in [comment, hello, ws, name] {
            cst.add_child(root, n);
        }
        model.set_cst(obj, root);

        let serializers = Serializers::default();
        let mut search = Search::new(&g, &model, &serializers, 1000);
        let last = search.run(obj).unwrap();
        let (tree_root, obj2frame) = search.arena.fold_into_tree(last);

        let mut comments = BTreeMap::new();
        comments.insert(comment, obj);
        let matcher = Matcher {
            grammar: &g,
            model: &model,
            serializers: &serializers,
            cst: &cst,
        };
        matcher.assign_nodes(&mut search.arena, &obj2frame, &[root], &comments);

        let kinds: Vec<_> = search
            .arena
            .get(tree_root)
            .children
            .iter()
            .map(|&c| search.arena.get(c).kind)
            .collect();
        // comment lands ahead of the keyword it precedes in the original
        let comment_at = kinds
            .iter()
            .position(|k| *k == TokenKind::Comment)
            .unwrap();
        let keyword_at = kinds.iter().position(|k| *k == TokenKind::Keyword).unwrap();
        assert!(comment_at < keyword_at);
    }
}
