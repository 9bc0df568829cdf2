//! The token graph: grammar-element-tagged search nodes.
//!
//! Every node the search binds lives in a [`TokenArena`]; `continuation`,
//! `parent` and `children` are arena indices, so the continuation chain can
//! point across sibling and parent boundaries (and even form the
//! self-referential shapes the recursion guard looks for) without any
//! ownership cycle.
//!
//! A token is one committed step through the grammar: a keyword, an
//! assignment that consumed one attribute value, a structural frame (group,
//! alternatives, unordered group, action), or a rule-call frame under which
//! a nested object serializes. Comment tokens are never produced by the
//! forward search; the node-matcher splices them in afterwards.

use textloom_syntax::{
    AssignTarget, ConcreteTree, ElemId, ElemKind, Grammar, NodeId, ObjId, RuleId, RuleKind,
    SemanticModel, Value,
};

use crate::error::ReconstructError;
use crate::reconstruct::cursor::CursorState;
use crate::serializer::Serializers;

/// Index of a token in its [`TokenArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u32);

/// The value kind of an assignment token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignKind {
    Keyword,
    CrossRef,
    Datatype,
    Parser,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Search anchor; also the frame of the top-level object.
    Root,
    Keyword,
    Assignment(AssignKind),
    /// Unassigned call into a parser rule; a frame for the same object.
    RuleCall,
    /// Unassigned call into a datatype rule; produces text, consumes nothing.
    UnassignedText,
    Group,
    Alternatives,
    UnorderedGroup,
    Action,
    /// Carries an original hidden leaf; inserted by the node-matcher only.
    Comment,
}

#[derive(Debug, Clone)]
pub struct TokenNode {
    pub kind: TokenKind,
    /// Grammar element this token was proposed from; `None` for root and
    /// comment tokens.
    pub elem: Option<ElemId>,
    /// Object being serialized when this token was proposed. For parser
    /// rule assignments this is still the *parent* object; the consumed
    /// child sits in `value`.
    pub obj: ObjId,
    /// Attempt index this token was proposed at - the resume point after
    /// backtracking through it.
    pub attempt: u32,
    /// Previous frontier: the token to resume when this one is abandoned.
    pub continuation: Option<TokenId>,
    /// Enclosing frame (rule-call origin), used to fold the chain into a
    /// tree after the search succeeds.
    pub parent: Option<TokenId>,
    /// Cursor snapshot captured when this token was proposed; backtracking
    /// restores exactly this.
    pub state_before: CursorState,
    /// The attribute value consumed by an assignment token.
    pub value: Option<Value>,
    /// Original concrete leaf this token may reuse, bound by the matcher.
    pub node: Option<NodeId>,
    /// Document-ordered children, filled in after the search.
    pub children: Vec<TokenId>,
}

impl TokenNode {
    /// Frames open a nested serialization scope: tokens bound inside them
    /// name them as `parent`.
    pub fn is_frame(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Root | TokenKind::RuleCall | TokenKind::Assignment(AssignKind::Parser)
        )
    }

    /// The object serialized *inside* this frame.
    pub fn frame_obj(&self) -> ObjId {
        match (&self.kind, &self.value) {
            (TokenKind::Assignment(AssignKind::Parser), Some(Value::Object(child))) => *child,
            _ => self.obj,
        }
    }
}

#[derive(Debug, Default)]
pub struct TokenArena {
    nodes: Vec<TokenNode>,
}

impl TokenArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: TokenNode) -> TokenId {
        let id = TokenId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: TokenId) -> &TokenNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut TokenNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Walk the continuation chain from `last` back to the root and return
    /// the bound tokens in document order (root first).
    pub fn chain(&self, last: TokenId) -> Vec<TokenId> {
        let mut out = Vec::new();
        let mut cur = Some(last);
        while let Some(t) = cur {
            out.push(t);
            cur = self.get(t).continuation;
        }
        out.reverse();
        out
    }

    /// Fold a successful chain into a token tree: attach every bound token
    /// to its frame's child list in document order, and map each semantic
    /// object to the outermost frame serializing it.
    pub fn fold_into_tree(&mut self, last: TokenId) -> (TokenId, Vec<(ObjId, TokenId)>) {
        let chain = self.chain(last);
        let root = chain[0];
        for &t in &chain[1..] {
            if let Some(p) = self.get(t).parent {
                self.get_mut(p).children.push(t);
            }
        }
        let mut obj2frame: Vec<(ObjId, TokenId)> = Vec::new();
        for &t in &chain {
            let tok = self.get(t);
            if tok.is_frame() {
                let obj = tok.frame_obj();
                if !obj2frame.iter().any(|(o, _)| *o == obj) {
                    obj2frame.push((obj, t));
                }
            }
        }
        (root, obj2frame)
    }
}

fn assignment_attr<'g>(grammar: &'g Grammar, elem: ElemId) -> Option<&'g str> {
    match &grammar.element(elem).kind {
        ElemKind::Assignment { attr, .. } => Some(attr.as_str()),
        _ => None,
    }
}

fn assignment_rule(grammar: &Grammar, elem: ElemId) -> Option<RuleId> {
    match &grammar.element(elem).kind {
        ElemKind::Assignment { target, .. } => match target {
            AssignTarget::Rule(r) | AssignTarget::CrossRef(r) => Some(*r),
            AssignTarget::Keyword(_) => None,
        },
        _ => None,
    }
}

/// Whether a token bound to `leaf` would serialize to the text the leaf
/// already holds - the literal-reuse test of the node-matcher.
pub fn matches_existing(
    grammar: &Grammar,
    model: &SemanticModel,
    serializers: &Serializers,
    cst: &ConcreteTree,
    token: &TokenNode,
    leaf: NodeId,
) -> bool {
    let text = cst.text(leaf);
    match token.kind {
        TokenKind::Keyword | TokenKind::Assignment(AssignKind::Keyword) => {
            if let Some(Value::Bool(false)) = token.value {
                return false;
            }
            token
                .elem
                .and_then(|e| grammar.keyword_text(e))
                .is_some_and(|kw| serializers.keyword.equals_node(kw, &text))
        }
        TokenKind::Assignment(AssignKind::Datatype) => {
            match (token.elem, &token.value) {
                (Some(elem), Some(value)) => assignment_attr(grammar, elem).is_some_and(|attr| {
                    serializers
                        .value
                        .equals_node(model, token.obj, attr, value, &text)
                }),
                _ => false,
            }
        }
        TokenKind::Assignment(AssignKind::Enum) => match (token.elem, &token.value) {
            (Some(elem), Some(Value::Enum(name))) => assignment_rule(grammar, elem)
                .is_some_and(|rule| serializers.enum_lit.equals_node(grammar, rule, name, &text)),
            _ => false,
        },
        TokenKind::Assignment(AssignKind::CrossRef) => match &token.value {
            Some(Value::Ref(target)) => serializers.cross_ref.refers_to(model, *target, &text),
            _ => false,
        },
        // Unassigned text has no value to compare; the grammar element tag
        // is its identity.
        TokenKind::UnassignedText => {
            token.elem.is_some() && cst.node(leaf).elem == token.elem
        }
        _ => false,
    }
}

/// The literal text a token writes, with literal reuse already resolved:
/// a bound original node is copied verbatim, everything else serializes
/// fresh. `None` for structural tokens that write nothing themselves.
pub fn render_literal(
    grammar: &Grammar,
    model: &SemanticModel,
    serializers: &Serializers,
    cst: Option<&ConcreteTree>,
    token: &TokenNode,
) -> Result<Option<String>, ReconstructError> {
    let kept = match (token.node, cst) {
        (Some(node), Some(tree)) => Some(tree.text(node)),
        _ => None,
    };
    match token.kind {
        TokenKind::Keyword | TokenKind::Assignment(AssignKind::Keyword) => {
            // a flag consumed as false writes nothing
            if let Some(Value::Bool(false)) = token.value {
                return Ok(None);
            }
            let kw = token
                .elem
                .and_then(|e| grammar.keyword_text(e))
                .unwrap_or_default();
            Ok(Some(serializers.keyword.serialize_keyword(kw)))
        }
        TokenKind::Assignment(AssignKind::Datatype) => {
            if let Some(text) = kept {
                return Ok(Some(text));
            }
            let (elem, value) = match (token.elem, &token.value) {
                (Some(e), Some(v)) => (e, v),
                _ => return Ok(None),
            };
            let attr = assignment_attr(grammar, elem).unwrap_or_default();
            serializers
                .value
                .serialize_value(model, token.obj, attr, value)
                .map(Some)
        }
        TokenKind::Assignment(AssignKind::Enum) => {
            if let Some(text) = kept {
                return Ok(Some(text));
            }
            match (token.elem, &token.value) {
                (Some(elem), Some(Value::Enum(name))) => {
                    let rule = assignment_rule(grammar, elem);
                    rule.and_then(|r| serializers.enum_lit.serialize_enum(grammar, r, name))
                        .map(Some)
                        .ok_or_else(|| ReconstructError::Serialization {
                            object_path: model.object_path(token.obj),
                            attribute: assignment_attr(grammar, elem)
                                .unwrap_or_default()
                                .to_string(),
                            reason: format!("enum value '{name}' has no literal"),
                        })
                }
                _ => Ok(None),
            }
        }
        TokenKind::Assignment(AssignKind::CrossRef) => {
            if let Some(text) = kept {
                return Ok(Some(text));
            }
            match &token.value {
                Some(Value::Ref(target)) => serializers
                    .cross_ref
                    .serialize_ref(model, token.obj, *target)
                    .map(Some)
                    .ok_or_else(|| ReconstructError::Serialization {
                        object_path: model.object_path(token.obj),
                        attribute: token
                            .elem
                            .and_then(|e| assignment_attr(grammar, e))
                            .unwrap_or_default()
                            .to_string(),
                        reason: "cross-reference target has no referable name".to_string(),
                    }),
                _ => Ok(None),
            }
        }
        TokenKind::UnassignedText => {
            if let Some(text) = kept {
                return Ok(Some(text));
            }
            match token.elem.map(|e| &grammar.element(e).kind) {
                Some(ElemKind::RuleCall(rule)) => serializers
                    .value
                    .serialize_unassigned(model, token.obj, *rule, grammar)
                    .map(Some),
                _ => Ok(None),
            }
        }
        TokenKind::Root
        | TokenKind::RuleCall
        | TokenKind::Assignment(AssignKind::Parser)
        | TokenKind::Group
        | TokenKind::Alternatives
        | TokenKind::UnorderedGroup
        | TokenKind::Action
        | TokenKind::Comment => Ok(None),
    }
}

/// Best-effort short rendering of a bound token for report paths; `None`
/// for tokens that write nothing.
pub fn describe_bound(
    grammar: &Grammar,
    model: &SemanticModel,
    serializers: &Serializers,
    token: &TokenNode,
) -> Option<String> {
    match token.kind {
        TokenKind::Keyword | TokenKind::Assignment(AssignKind::Keyword) => token
            .elem
            .and_then(|e| grammar.keyword_text(e))
            .map(|kw| format!("'{kw}'")),
        TokenKind::Assignment(AssignKind::Datatype) => match &token.value {
            Some(v) => {
                let attr = token
                    .elem
                    .and_then(|e| assignment_attr(grammar, e))
                    .unwrap_or_default();
                Some(
                    serializers
                        .value
                        .serialize_value(model, token.obj, attr, v)
                        .unwrap_or_else(|_| "?".to_string()),
                )
            }
            None => None,
        },
        TokenKind::Assignment(AssignKind::Enum) => match &token.value {
            Some(Value::Enum(name)) => Some(name.clone()),
            _ => None,
        },
        TokenKind::Assignment(AssignKind::CrossRef) => match &token.value {
            Some(Value::Ref(target)) => serializers
                .cross_ref
                .serialize_ref(model, token.obj, *target)
                .or_else(|| Some("<unresolved>".to_string())),
            _ => None,
        },
        _ => None,
    }
}

/// Token kind for a grammar element about to be entered.
pub fn kind_for_element(grammar: &Grammar, elem: ElemId) -> TokenKind {
    match &grammar.element(elem).kind {
        ElemKind::Keyword(_) => TokenKind::Keyword,
        ElemKind::Assignment { target, .. } => TokenKind::Assignment(match target {
            AssignTarget::Keyword(_) => AssignKind::Keyword,
            AssignTarget::CrossRef(_) => AssignKind::CrossRef,
            AssignTarget::Rule(r) => match &grammar.rule(*r).kind {
                RuleKind::Parser => AssignKind::Parser,
                RuleKind::Datatype => AssignKind::Datatype,
                RuleKind::Enum(_) => AssignKind::Enum,
            },
        }),
        ElemKind::RuleCall(r) => match &grammar.rule(*r).kind {
            RuleKind::Parser => TokenKind::RuleCall,
            _ => TokenKind::UnassignedText,
        },
        ElemKind::Group(_) => TokenKind::Group,
        ElemKind::Alternatives(_) => TokenKind::Alternatives,
        ElemKind::UnorderedGroup(_) => TokenKind::UnorderedGroup,
        ElemKind::Action { .. } => TokenKind::Action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use textloom_syntax::GrammarBuilder;

    fn token(kind: TokenKind, state: CursorState) -> TokenNode {
        TokenNode {
            kind,
            elem: None,
            obj: ObjId(0),
            attempt: 0,
            continuation: None,
            parent: None,
            state_before: state,
            value: None,
            node: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn chain_returns_document_order() {
        let model = SemanticModel::new();
        let state = CursorState::new(&model);
        let mut arena = TokenArena::new();
        let root = arena.push(token(TokenKind::Root, state.clone()));
        let a = arena.push(TokenNode {
            continuation: Some(root),
            parent: Some(root),
            ..token(TokenKind::Keyword, state.clone())
        });
        let b = arena.push(TokenNode {
            continuation: Some(a),
            parent: Some(root),
            ..token(TokenKind::Keyword, state.clone())
        });
        assert_eq!(arena.chain(b), vec![root, a, b]);
    }

    #[test]
    fn fold_attaches_children_to_frames() {
        let mut model = SemanticModel::new();
        let obj = model.add_object("M");
        let state = CursorState::new(&model);
        let mut arena = TokenArena::new();
        let root = arena.push(TokenNode {
            obj,
            ..token(TokenKind::Root, state.clone())
        });
        let kw = arena.push(TokenNode {
            obj,
            continuation: Some(root),
            parent: Some(root),
            ..token(TokenKind::Keyword, state.clone())
        });
        let (tree_root, obj2frame) = arena.fold_into_tree(kw);
        assert_eq!(tree_root, root);
        assert_eq!(arena.get(root).children, vec![kw]);
        assert_eq!(obj2frame, vec![(obj, root)]);
    }

    #[test]
    fn kind_for_element_distinguishes_rule_flavours() {
        let mut b = GrammarBuilder::new();
        let id = b.datatype_rule("ID");
        let color = b.enum_rule("Color", &[("Red", "red")]);
        let item = b.parser_rule("Item", "Item");
        let kw = b.keyword("k");
        let dt = b.assign("name", AssignTarget::Rule(id));
        let en = b.assign("color", AssignTarget::Rule(color));
        let ch = b.assign("child", AssignTarget::Rule(item));
        let xr = b.assign("ref", AssignTarget::CrossRef(item));
        let call = b.rule_call(item);
        let text = b.rule_call(id);
        let g = b.finish();

        assert_eq!(kind_for_element(&g, kw), TokenKind::Keyword);
        assert_eq!(
            kind_for_element(&g, dt),
            TokenKind::Assignment(AssignKind::Datatype)
        );
        assert_eq!(
            kind_for_element(&g, en),
            TokenKind::Assignment(AssignKind::Enum)
        );
        assert_eq!(
            kind_for_element(&g, ch),
            TokenKind::Assignment(AssignKind::Parser)
        );
        assert_eq!(
            kind_for_element(&g, xr),
            TokenKind::Assignment(AssignKind::CrossRef)
        );
        assert_eq!(kind_for_element(&g, call), TokenKind::RuleCall);
        assert_eq!(kind_for_element(&g, text), TokenKind::UnassignedText);
    }
}
