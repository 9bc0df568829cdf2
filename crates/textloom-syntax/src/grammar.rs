//! Grammar structure: rules and elements in a flat arena.
//!
//! A [`Grammar`] holds every rule of the language and, per rule, a tree of
//! [`Element`]s describing its concrete syntax. Elements reference each other
//! by [`ElemId`], and every element knows its containing element, so the
//! reconstruction engine can both descend into a rule body and climb back out
//! of it without walking owned pointers.
//!
//! Grammars are assembled through [`GrammarBuilder`]; the builder wires the
//! parent links when a container is created, which keeps the invariant that
//! an element has at most one container.

use serde::Serialize;

/// Index of a rule in its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(pub u32);

/// Index of an element in its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElemId(pub u32);

/// How often an element may occur at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cardinality {
    One,
    Optional,
    Many,
    AtLeastOne,
}

impl Cardinality {
    /// Whether another occurrence may follow a completed one (`*`, `+`).
    pub fn allows_repeat(self) -> bool {
        matches!(self, Cardinality::Many | Cardinality::AtLeastOne)
    }

    /// Whether the element may be skipped entirely (`?`, `*`).
    pub fn allows_skip(self) -> bool {
        matches!(self, Cardinality::Optional | Cardinality::Many)
    }
}

/// What an assignment writes into its attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    /// A fixed keyword; the attribute holds the keyword text (or a boolean
    /// flag that is true when the keyword was present).
    Keyword(String),
    /// A call to another rule; the rule's kind decides whether the value is
    /// a nested object (parser rule), a primitive (datatype rule) or an
    /// enum literal (enum rule).
    Rule(RuleId),
    /// A cross-reference to an object produced elsewhere by the given rule.
    CrossRef(RuleId),
}

/// One grammar element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElemKind {
    Keyword(String),
    Assignment { attr: String, target: AssignTarget },
    RuleCall(RuleId),
    Group(Vec<ElemId>),
    Alternatives(Vec<ElemId>),
    UnorderedGroup(Vec<ElemId>),
    Action { type_name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElemKind,
    pub cardinality: Cardinality,
    /// Containing element within the same rule, if any.
    pub parent: Option<ElemId>,
}

/// The flavour of a rule, which decides how its calls serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// Produces a semantic object; calls descend into the rule body.
    Parser,
    /// Produces a primitive value serialized as a single token.
    Datatype,
    /// Maps enum value names to literal texts, in declaration order.
    Enum(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    /// Type name of the objects/values this rule produces.
    pub returns: String,
    /// Concrete syntax of the rule. Datatype and enum rules have no body;
    /// their text comes from the value serializers.
    pub body: Option<ElemId>,
}

/// A complete grammar: rule and element arenas plus the entry rule.
///
/// The entry rule is the first parser rule added to the builder, matching
/// the usual convention that the first rule of a grammar definition is the
/// one a document starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    rules: Vec<Rule>,
    elements: Vec<Element>,
}

impl Grammar {
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    pub fn element(&self, id: ElemId) -> &Element {
        &self.elements[id.0 as usize]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (RuleId(i as u32), r))
    }

    pub fn rule_by_name(&self, name: &str) -> Option<RuleId> {
        self.rules
            .iter()
            .position(|r| r.name == name)
            .map(|i| RuleId(i as u32))
    }

    /// First parser rule of the grammar; where reconstruction starts.
    pub fn entry_rule(&self) -> Option<RuleId> {
        self.rules
            .iter()
            .position(|r| r.kind == RuleKind::Parser)
            .map(|i| RuleId(i as u32))
    }

    /// First parser rule returning the given type, falling back to the
    /// entry rule when no rule declares it.
    pub fn rule_for_type(&self, type_name: &str) -> Option<RuleId> {
        self.rules
            .iter()
            .position(|r| r.kind == RuleKind::Parser && r.returns == type_name)
            .map(|i| RuleId(i as u32))
            .or_else(|| self.entry_rule())
    }

    pub fn parent_of(&self, elem: ElemId) -> Option<ElemId> {
        self.element(elem).parent
    }

    /// Child elements of a container, empty for non-containers.
    pub fn children_of(&self, elem: ElemId) -> &[ElemId] {
        match &self.element(elem).kind {
            ElemKind::Group(c) | ElemKind::Alternatives(c) | ElemKind::UnorderedGroup(c) => c,
            _ => &[],
        }
    }

    pub fn keyword_text(&self, elem: ElemId) -> Option<&str> {
        match &self.element(elem).kind {
            ElemKind::Keyword(text) => Some(text),
            ElemKind::Assignment {
                target: AssignTarget::Keyword(text),
                ..
            } => Some(text),
            _ => None,
        }
    }

    /// Whether the element can match without producing any token.
    ///
    /// Cardinality counts: an `Optional` or `Many` element is always
    /// skippable. Beyond that, a group is empty-matchable when all children
    /// are, alternatives when any child is. Keywords, assignments, rule
    /// calls and actions always leave a trace (a token or an object type
    /// commitment), so they are only skippable by cardinality.
    pub fn can_be_empty(&self, elem: ElemId) -> bool {
        let e = self.element(elem);
        if e.cardinality.allows_skip() {
            return true;
        }
        match &e.kind {
            ElemKind::Group(children) => children.iter().all(|&c| self.can_be_empty(c)),
            ElemKind::Alternatives(children) => children.iter().any(|&c| self.can_be_empty(c)),
            ElemKind::UnorderedGroup(children) => children.iter().all(|&c| self.can_be_empty(c)),
            _ => false,
        }
    }

    /// Whether an occurrence of the element can consume attribute values.
    ///
    /// Repetitions of non-consuming elements make no progress, so the
    /// follower enumeration only proposes repeats for consuming ones.
    pub fn consumes_input(&self, elem: ElemId) -> bool {
        self.consumes_input_walk(elem, &mut Vec::new())
    }

    /// `visiting` holds the parser rules on the current walk path; a rule
    /// call back into one of them contributes nothing, so recursive
    /// grammars terminate instead of looping.
    fn consumes_input_walk(&self, elem: ElemId, visiting: &mut Vec<RuleId>) -> bool {
        match &self.element(elem).kind {
            ElemKind::Assignment { .. } => true,
            ElemKind::RuleCall(rule) => match &self.rule(*rule).kind {
                RuleKind::Parser => {
                    if visiting.contains(rule) {
                        return false;
                    }
                    visiting.push(*rule);
                    let consumes = self
                        .rule(*rule)
                        .body
                        .is_some_and(|b| self.consumes_input_walk(b, visiting));
                    visiting.pop();
                    consumes
                }
                _ => false,
            },
            ElemKind::Group(children)
            | ElemKind::Alternatives(children)
            | ElemKind::UnorderedGroup(children) => children
                .iter()
                .any(|&c| self.consumes_input_walk(c, visiting)),
            ElemKind::Keyword(_) | ElemKind::Action { .. } => false,
        }
    }

    /// Human-readable description of an element, used in diagnostics.
    pub fn describe(&self, elem: ElemId) -> String {
        match &self.element(elem).kind {
            ElemKind::Keyword(text) => format!("keyword '{text}'"),
            ElemKind::Assignment { attr, target } => match target {
                AssignTarget::Keyword(text) => format!("assignment {attr}='{text}'"),
                AssignTarget::Rule(r) => format!("assignment {attr}={}", self.rule(*r).name),
                AssignTarget::CrossRef(r) => {
                    format!("assignment {attr}=[{}]", self.rule(*r).name)
                }
            },
            ElemKind::RuleCall(r) => format!("rule call {}", self.rule(*r).name),
            ElemKind::Group(_) => "group".to_string(),
            ElemKind::Alternatives(_) => "alternatives".to_string(),
            ElemKind::UnorderedGroup(_) => "unordered group".to_string(),
            ElemKind::Action { type_name } => format!("action {{{type_name}}}"),
        }
    }
}

/// Programmatic construction surface for [`Grammar`].
///
/// Rules are declared first (so they can reference each other), bodies are
/// attached afterwards. Containers set the parent link of their children;
/// attaching the same element to two containers is a caller bug and panics.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<Rule>,
    elements: Vec<Element>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parser_rule(&mut self, name: &str, returns: &str) -> RuleId {
        self.push_rule(Rule {
            name: name.to_string(),
            kind: RuleKind::Parser,
            returns: returns.to_string(),
            body: None,
        })
    }

    pub fn datatype_rule(&mut self, name: &str) -> RuleId {
        self.push_rule(Rule {
            name: name.to_string(),
            kind: RuleKind::Datatype,
            returns: name.to_string(),
            body: None,
        })
    }

    pub fn enum_rule(&mut self, name: &str, literals: &[(&str, &str)]) -> RuleId {
        let literals = literals
            .iter()
            .map(|(value, text)| (value.to_string(), text.to_string()))
            .collect();
        self.push_rule(Rule {
            name: name.to_string(),
            kind: RuleKind::Enum(literals),
            returns: name.to_string(),
            body: None,
        })
    }

    pub fn set_body(&mut self, rule: RuleId, body: ElemId) {
        self.rules[rule.0 as usize].body = Some(body);
    }

    pub fn keyword(&mut self, text: &str) -> ElemId {
        self.push_elem(ElemKind::Keyword(text.to_string()))
    }

    pub fn assign(&mut self, attr: &str, target: AssignTarget) -> ElemId {
        self.push_elem(ElemKind::Assignment {
            attr: attr.to_string(),
            target,
        })
    }

    pub fn rule_call(&mut self, rule: RuleId) -> ElemId {
        self.push_elem(ElemKind::RuleCall(rule))
    }

    pub fn action(&mut self, type_name: &str) -> ElemId {
        self.push_elem(ElemKind::Action {
            type_name: type_name.to_string(),
        })
    }

    pub fn group(&mut self, children: &[ElemId]) -> ElemId {
        let id = self.push_elem(ElemKind::Group(children.to_vec()));
        self.adopt(id, children);
        id
    }

    pub fn alternatives(&mut self, children: &[ElemId]) -> ElemId {
        let id = self.push_elem(ElemKind::Alternatives(children.to_vec()));
        self.adopt(id, children);
        id
    }

    pub fn unordered_group(&mut self, children: &[ElemId]) -> ElemId {
        let id = self.push_elem(ElemKind::UnorderedGroup(children.to_vec()));
        self.adopt(id, children);
        id
    }

    /// Change the cardinality of an already-created element.
    pub fn with_cardinality(&mut self, elem: ElemId, cardinality: Cardinality) -> ElemId {
        self.elements[elem.0 as usize].cardinality = cardinality;
        elem
    }

    pub fn optional(&mut self, elem: ElemId) -> ElemId {
        self.with_cardinality(elem, Cardinality::Optional)
    }

    pub fn many(&mut self, elem: ElemId) -> ElemId {
        self.with_cardinality(elem, Cardinality::Many)
    }

    pub fn at_least_one(&mut self, elem: ElemId) -> ElemId {
        self.with_cardinality(elem, Cardinality::AtLeastOne)
    }

    pub fn finish(self) -> Grammar {
        Grammar {
            rules: self.rules,
            elements: self.elements,
        }
    }

    fn push_rule(&mut self, rule: Rule) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(rule);
        id
    }

    fn push_elem(&mut self, kind: ElemKind) -> ElemId {
        let id = ElemId(self.elements.len() as u32);
        self.elements.push(Element {
            kind,
            cardinality: Cardinality::One,
            parent: None,
        });
        id
    }

    fn adopt(&mut self, parent: ElemId, children: &[ElemId]) {
        for &child in children {
            let slot = &mut self.elements[child.0 as usize].parent;
            assert!(
                slot.is_none(),
                "element {child:?} already has a container"
            );
            *slot = Some(parent);
        }
    }
}
