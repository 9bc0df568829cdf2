//! The backtracking search over grammar alternatives and attribute values.
//!
//! The search keeps one frontier token and a cursor snapshot. Each round it
//! enumerates the follower candidates of the frontier in greedy order
//! (repeat a just-completed `*`/`+` element first, then advance past
//! skippable siblings, then ascend) and binds the first one the model
//! admits. When none binds, it backtracks along the continuation chain:
//! frontier becomes the abandoned token's predecessor, the cursor snapshot
//! captured at that token is restored, and enumeration resumes after the
//! attempt index the token was bound at. A position that fails immediately
//! after a successful bind is recorded as a dead end; re-failing on the way
//! further back is not recorded again.
//!
//! Termination on left-recursive or empty-repeating grammars rests on two
//! guards: a rule call may not re-enter the same rule on the same object
//! without the cursor having moved, and a repeat of an element is only
//! proposed when the element can consume input and is rejected when nothing
//! was consumed since its previous entry.

use textloom_syntax::{
    AssignTarget, ElemId, ElemKind, Grammar, ObjId, SemanticModel, Value,
};
use tracing::trace;

use crate::error::ReconstructError;
use crate::reconstruct::cursor::CursorState;
use crate::reconstruct::report::{DeadEnd, DeadEndReport, FailedAttempt};
use crate::reconstruct::token::{
    describe_bound, kind_for_element, AssignKind, TokenArena, TokenId, TokenKind, TokenNode,
};
use crate::serializer::Serializers;

/// What a candidate does when bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Produce a token for this grammar element.
    Enter(ElemId),
    /// Accept the chain as a complete serialization.
    Finish,
}

/// One proposed follower of the current frontier.
#[derive(Debug, Clone)]
struct Candidate {
    step: Step,
    /// Frame the new token will live under (for `Finish`, the root).
    frame: TokenId,
    /// Objects whose attributes must be fully consumed before this step;
    /// collected while ascending out of their frames.
    guards: Vec<ObjId>,
    /// Re-iteration of a `*`/`+` element, subject to the progress guard.
    repeat: bool,
}

enum Bind {
    Finished,
    Bound(TokenId, CursorState),
}

pub struct Search<'a> {
    grammar: &'a Grammar,
    model: &'a SemanticModel,
    serializers: &'a Serializers,
    max_depth: usize,
    pub arena: TokenArena,
    pub report: DeadEndReport,
}

impl<'a> Search<'a> {
    pub fn new(
        grammar: &'a Grammar,
        model: &'a SemanticModel,
        serializers: &'a Serializers,
        max_depth: usize,
    ) -> Self {
        Self {
            grammar,
            model,
            serializers,
            max_depth,
            arena: TokenArena::new(),
            report: DeadEndReport::new(),
        }
    }

    /// Run the search for `top` and return the last token of the winning
    /// chain. On exhaustion the accumulated dead-end report becomes the
    /// error payload.
    pub fn run(&mut self, top: ObjId) -> Result<TokenId, ReconstructError> {
        let initial = CursorState::new(self.model);
        let root = self.arena.push(TokenNode {
            kind: TokenKind::Root,
            elem: None,
            obj: top,
            attempt: 0,
            continuation: None,
            parent: None,
            state_before: initial.clone(),
            value: None,
            node: None,
            children: Vec::new(),
        });

        let mut frontier = root;
        let mut inst = initial;
        let mut attempt: u32 = 0;
        let mut last_succeeded = true;
        let mut bound_tokens: usize = 0;

        loop {
            let candidates = self.candidates(frontier);
            let mut fails: Vec<FailedAttempt> = Vec::new();
            let mut bound = None;
            while (attempt as usize) < candidates.len() {
                let cand = &candidates[attempt as usize];
                match self.try_bind(frontier, cand, &inst, attempt) {
                    Ok(Bind::Finished) => {
                        trace!(tokens = bound_tokens, "serialization chain complete");
                        return Ok(frontier);
                    }
                    Ok(Bind::Bound(id, state)) => {
                        bound = Some((id, state));
                        break;
                    }
                    Err(fail) => {
                        fails.push(fail);
                        attempt += 1;
                    }
                }
            }

            match bound {
                Some((id, state)) => {
                    trace!(
                        token = %self.describe_step(&candidates[attempt as usize].step),
                        attempt,
                        "bound"
                    );
                    frontier = id;
                    inst = state;
                    attempt = 0;
                    last_succeeded = true;
                    bound_tokens += 1;
                    if bound_tokens > self.max_depth {
                        return Err(ReconstructError::DepthExceeded {
                            limit: self.max_depth,
                        });
                    }
                }
                None => {
                    if last_succeeded {
                        let attempts = if fails.is_empty() {
                            vec![FailedAttempt {
                                token: "<no follower>".to_string(),
                                diagnostic: "grammar position has no candidates".to_string(),
                            }]
                        } else {
                            fails
                        };
                        self.report.push(DeadEnd {
                            path: self.render_path(frontier),
                            attempts,
                        });
                    }
                    let t = self.arena.get(frontier);
                    attempt = t.attempt + 1;
                    inst = t.state_before.clone();
                    last_succeeded = false;
                    match t.continuation {
                        Some(prev) => {
                            trace!("backtracking");
                            frontier = prev;
                        }
                        None => {
                            return Err(ReconstructError::Failure {
                                report: std::mem::take(&mut self.report),
                            })
                        }
                    }
                }
            }
        }
    }

    fn candidates(&self, frontier: TokenId) -> Vec<Candidate> {
        let t = self.arena.get(frontier);
        let mut out = Vec::new();
        if t.is_frame() {
            self.descend(frontier, &mut out);
            return out;
        }
        let frame = match t.parent {
            Some(f) => f,
            None => return out,
        };
        let elem = match t.elem {
            Some(e) => e,
            None => return out,
        };
        match t.kind {
            TokenKind::Group => {
                let mut all_skippable = true;
                for &child in self.grammar.children_of(elem) {
                    out.push(self.enter(child, frame, Vec::new()));
                    if !self.grammar.can_be_empty(child) {
                        all_skippable = false;
                        break;
                    }
                }
                if all_skippable {
                    self.element_finished(elem, frame, Vec::new(), frontier, &mut out);
                }
            }
            TokenKind::Alternatives => {
                let mut any_empty = false;
                for &child in self.grammar.children_of(elem) {
                    out.push(self.enter(child, frame, Vec::new()));
                    any_empty |= self.grammar.can_be_empty(child);
                }
                if any_empty {
                    self.element_finished(elem, frame, Vec::new(), frontier, &mut out);
                }
            }
            TokenKind::UnorderedGroup => {
                let used = self.unordered_members_used(elem, frame, frontier);
                let mut all_skippable = true;
                for &member in self.grammar.children_of(elem) {
                    if used.contains(&member) {
                        continue;
                    }
                    out.push(self.enter(member, frame, Vec::new()));
                    all_skippable &= self.grammar.can_be_empty(member);
                }
                if all_skippable {
                    self.element_finished(elem, frame, Vec::new(), frontier, &mut out);
                }
            }
            // keywords, assignments, unassigned text, actions: the element
            // itself is done, continue after it
            _ => self.element_finished(elem, frame, Vec::new(), frontier, &mut out),
        }
        out
    }

    /// Candidates for a freshly-bound frame: enter its rule body.
    fn descend(&self, frame: TokenId, out: &mut Vec<Candidate>) {
        let ft = self.arena.get(frame);
        let rule = match ft.kind {
            TokenKind::Root => self
                .grammar
                .rule_for_type(&self.model.object(ft.obj).type_name),
            _ => ft.elem.and_then(|e| match &self.grammar.element(e).kind {
                ElemKind::RuleCall(r) => Some(*r),
                ElemKind::Assignment {
                    target: AssignTarget::Rule(r),
                    ..
                } => Some(*r),
                _ => None,
            }),
        };
        let rule = match rule {
            Some(r) => r,
            None => return,
        };
        match self.grammar.rule(rule).body {
            Some(body) => {
                out.push(self.enter(body, frame, Vec::new()));
                if self.grammar.can_be_empty(body) {
                    self.rule_completed(frame, Vec::new(), frame, out);
                }
            }
            None => self.rule_completed(frame, Vec::new(), frame, out),
        }
    }

    fn enter(&self, elem: ElemId, frame: TokenId, guards: Vec<ObjId>) -> Candidate {
        Candidate {
            step: Step::Enter(elem),
            frame,
            guards,
            repeat: false,
        }
    }

    /// Followers of a completed element: maybe repeat it, then continue in
    /// its container, climbing out of containers that are complete too.
    fn element_finished(
        &self,
        mut cur: ElemId,
        frame: TokenId,
        guards: Vec<ObjId>,
        frontier: TokenId,
        out: &mut Vec<Candidate>,
    ) {
        loop {
            let e = self.grammar.element(cur);
            if e.cardinality.allows_repeat() && self.grammar.consumes_input(cur) {
                out.push(Candidate {
                    step: Step::Enter(cur),
                    frame,
                    guards: guards.clone(),
                    repeat: true,
                });
            }
            match self.grammar.parent_of(cur) {
                Some(parent) => match &self.grammar.element(parent).kind {
                    ElemKind::Group(children) => {
                        let idx = children
                            .iter()
                            .position(|&c| c == cur)
                            .unwrap_or(children.len());
                        let mut all_skippable = true;
                        for &next in &children[idx + 1..] {
                            out.push(self.enter(next, frame, guards.clone()));
                            if !self.grammar.can_be_empty(next) {
                                all_skippable = false;
                                break;
                            }
                        }
                        if !all_skippable {
                            return;
                        }
                        cur = parent;
                    }
                    ElemKind::UnorderedGroup(members) => {
                        let used = self.unordered_members_used(parent, frame, frontier);
                        let mut all_skippable = true;
                        for &member in members {
                            if used.contains(&member) {
                                continue;
                            }
                            out.push(self.enter(member, frame, guards.clone()));
                            all_skippable &= self.grammar.can_be_empty(member);
                        }
                        if !all_skippable {
                            return;
                        }
                        cur = parent;
                    }
                    // one alternative completes the whole alternatives
                    _ => cur = parent,
                },
                None => {
                    self.rule_completed(frame, guards, frontier, out);
                    return;
                }
            }
        }
    }

    /// The rule body of `frame` is complete: close the frame and continue
    /// in its surrounding frame, carrying the consumption guard for the
    /// object that is being left.
    fn rule_completed(
        &self,
        frame: TokenId,
        mut guards: Vec<ObjId>,
        frontier: TokenId,
        out: &mut Vec<Candidate>,
    ) {
        let ft = self.arena.get(frame);
        match ft.kind {
            TokenKind::Root => {
                guards.push(ft.obj);
                out.push(Candidate {
                    step: Step::Finish,
                    frame,
                    guards,
                    repeat: false,
                });
            }
            TokenKind::Assignment(AssignKind::Parser) => {
                guards.push(ft.frame_obj());
                if let (Some(elem), Some(parent)) = (ft.elem, ft.parent) {
                    self.element_finished(elem, parent, guards, frontier, out);
                }
            }
            _ => {
                if let (Some(elem), Some(parent)) = (ft.elem, ft.parent) {
                    self.element_finished(elem, parent, guards, frontier, out);
                }
            }
        }
    }

    /// Members of the unordered group already entered in the current pass:
    /// every member token bound under `frame` since the group was entered.
    fn unordered_members_used(
        &self,
        group: ElemId,
        frame: TokenId,
        frontier: TokenId,
    ) -> Vec<ElemId> {
        let members = self.grammar.children_of(group);
        let mut used = Vec::new();
        let mut cur = Some(frontier);
        while let Some(t) = cur {
            let tok = self.arena.get(t);
            if tok.kind == TokenKind::UnorderedGroup
                && tok.elem == Some(group)
                && tok.parent == Some(frame)
            {
                break;
            }
            if tok.parent == Some(frame) {
                if let Some(e) = tok.elem {
                    if members.contains(&e) && !used.contains(&e) {
                        used.push(e);
                    }
                }
            }
            cur = tok.continuation;
        }
        used
    }

    fn try_bind(
        &mut self,
        frontier: TokenId,
        cand: &Candidate,
        inst: &CursorState,
        attempt: u32,
    ) -> Result<Bind, FailedAttempt> {
        let described = self.describe_step(&cand.step);
        for &guard in &cand.guards {
            if !inst.is_fully_consumed(self.model, guard) {
                return Err(FailedAttempt {
                    token: described,
                    diagnostic: format!(
                        "attributes of {} remain unconsumed",
                        self.model.object_path(guard)
                    ),
                });
            }
        }
        let elem = match cand.step {
            Step::Finish => return Ok(Bind::Finished),
            Step::Enter(e) => e,
        };
        let kind = kind_for_element(self.grammar, elem);
        let obj = self.arena.get(cand.frame).frame_obj();

        if cand.repeat {
            self.check_progress_since(frontier, elem, obj, inst, &described, |d| {
                format!("{d} would repeat without consuming any value")
            })?;
        }

        let mut value = None;
        let mut next_state = inst.clone();
        match kind {
            TokenKind::Keyword
            | TokenKind::Group
            | TokenKind::Alternatives
            | TokenKind::UnorderedGroup
            | TokenKind::UnassignedText => {}
            TokenKind::Action => {
                if let ElemKind::Action { type_name } = &self.grammar.element(elem).kind {
                    let actual = &self.model.object(obj).type_name;
                    if actual != type_name {
                        return Err(FailedAttempt {
                            token: described,
                            diagnostic: format!(
                                "{} is a {actual}, not a {type_name}",
                                self.model.object_path(obj)
                            ),
                        });
                    }
                }
            }
            TokenKind::RuleCall => {
                self.check_progress_since(frontier, elem, obj, inst, &described, |d| {
                    format!("recursive {d} on the same object without consumed input")
                })?;
            }
            TokenKind::Assignment(akind) => {
                let (to_consume, state) =
                    self.bind_assignment(elem, akind, obj, inst, &described)?;
                value = Some(to_consume);
                next_state = state;
            }
            TokenKind::Root | TokenKind::Comment => {}
        }

        let id = self.arena.push(TokenNode {
            kind,
            elem: Some(elem),
            obj,
            attempt,
            continuation: Some(frontier),
            parent: Some(cand.frame),
            state_before: inst.clone(),
            value,
            node: None,
            children: Vec::new(),
        });
        Ok(Bind::Bound(id, next_state))
    }

    /// Reject re-entering `elem` on `obj` when the first earlier entry in
    /// the chain saw the identical cursor state.
    fn check_progress_since(
        &self,
        frontier: TokenId,
        elem: ElemId,
        obj: ObjId,
        inst: &CursorState,
        described: &str,
        message: impl FnOnce(&str) -> String,
    ) -> Result<(), FailedAttempt> {
        let mut cur = Some(frontier);
        while let Some(t) = cur {
            let tok = self.arena.get(t);
            if tok.elem == Some(elem) && tok.obj == obj {
                if &tok.state_before == inst {
                    return Err(FailedAttempt {
                        token: described.to_string(),
                        diagnostic: message(described),
                    });
                }
                break;
            }
            cur = tok.continuation;
        }
        Ok(())
    }

    fn bind_assignment(
        &self,
        elem: ElemId,
        akind: AssignKind,
        obj: ObjId,
        inst: &CursorState,
        described: &str,
    ) -> Result<(Value, CursorState), FailedAttempt> {
        let (attr, target) = match &self.grammar.element(elem).kind {
            ElemKind::Assignment { attr, target } => (attr.as_str(), target.clone()),
            _ => {
                return Err(FailedAttempt {
                    token: described.to_string(),
                    diagnostic: "element is not an assignment".to_string(),
                })
            }
        };
        let fail = |diagnostic: String| FailedAttempt {
            token: described.to_string(),
            diagnostic,
        };
        let path = self.model.object_path(obj);
        let next = match inst.peek_next(self.model, obj, attr) {
            Some(v) => v,
            None => {
                let diagnostic = match self.model.attr(obj, attr) {
                    None => format!("{path} has no attribute '{attr}'"),
                    Some(a) if a.values.is_empty() => format!("{path}.{attr} is not set"),
                    Some(a) => format!(
                        "all {} values of {path}.{attr} are already consumed",
                        a.values.len()
                    ),
                };
                return Err(fail(diagnostic));
            }
        };

        let admissible = match (akind, &target) {
            (AssignKind::Keyword, AssignTarget::Keyword(kw)) => match next {
                Value::Str(s) => s == kw,
                // a false flag is consumed too; rendering suppresses it
                Value::Bool(_) => true,
                _ => false,
            },
            (AssignKind::Datatype, _) => {
                matches!(next, Value::Str(_) | Value::Int(_) | Value::Bool(_))
            }
            (AssignKind::Enum, AssignTarget::Rule(rule)) => match next {
                Value::Enum(name) => self
                    .serializers
                    .enum_lit
                    .serialize_enum(self.grammar, *rule, name)
                    .is_some(),
                _ => false,
            },
            (AssignKind::Parser, AssignTarget::Rule(rule)) => match next {
                Value::Object(child) => {
                    self.model.object(*child).type_name == self.grammar.rule(*rule).returns
                }
                _ => false,
            },
            (AssignKind::CrossRef, AssignTarget::CrossRef(_)) => match next {
                Value::Ref(target_obj) => self
                    .serializers
                    .cross_ref
                    .serialize_ref(self.model, obj, *target_obj)
                    .is_some(),
                _ => false,
            },
            _ => false,
        };
        if !admissible {
            return Err(fail(format!(
                "next value of {path}.{attr} does not fit {described}"
            )));
        }
        match inst.consume(self.model, obj, attr) {
            Some(pair) => Ok(pair),
            None => Err(fail(format!("{path}.{attr} has no next value"))),
        }
    }

    fn describe_step(&self, step: &Step) -> String {
        match step {
            Step::Enter(elem) => self.grammar.describe(*elem),
            Step::Finish => "end of document".to_string(),
        }
    }

    /// Last few written literals before the frontier, oldest first.
    fn render_path(&self, frontier: TokenId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(frontier);
        while let Some(t) = cur {
            if parts.len() == 8 {
                break;
            }
            let tok = self.arena.get(t);
            if let Some(text) = describe_bound(self.grammar, self.model, self.serializers, tok) {
                parts.push(text);
            }
            cur = tok.continuation;
        }
        let truncated = cur.is_some() && parts.len() == 8;
        parts.reverse();
        if parts.is_empty() {
            return "<document start>".to_string();
        }
        let joined = parts.join(" ");
        if truncated {
            format!("... {joined}")
        } else {
            joined
        }
    }
}
