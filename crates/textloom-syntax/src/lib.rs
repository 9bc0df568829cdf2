//! # textloom-syntax
//!
//! The three read-only input structures the reconstruction engine works on:
//!
//! - [`grammar`] - a context-free grammar as an arena of rules and elements
//!   (keywords, assignments, rule calls, groups, alternatives, unordered
//!   groups, actions), built programmatically via [`GrammarBuilder`].
//!   Grammar *loading* from a definition format is out of scope; this crate
//!   is the access surface a loader would target.
//! - [`model`] - the semantic object graph: typed objects with ordered,
//!   possibly multi-valued attributes. Objects may point back at the
//!   concrete syntax node they were parsed from, which is what enables
//!   whitespace and comment preservation downstream.
//! - [`cst`] - concrete syntax trees: composites over leaves, where
//!   whitespace and comments are leaves tagged hidden. Every byte of the
//!   original text is held by some leaf, so copying leaf text verbatim
//!   reproduces the original rendering.
//!
//! All three are arena-based: nodes are addressed by small copyable ids
//! (`RuleId`, `ElemId`, `ObjId`, `NodeId`) rather than references, so
//! cross-links (parent pointers, object-to-node backlinks) never form
//! ownership cycles.

pub mod cst;
pub mod grammar;
pub mod model;

pub use cst::{ConcreteTree, CstNode, HiddenKind, NodeId, NodeKind};
pub use grammar::{
    AssignTarget, Cardinality, ElemId, ElemKind, Element, Grammar, GrammarBuilder, Rule, RuleId,
    RuleKind,
};
pub use model::{Attribute, ObjId, SemanticModel, SemanticObject, Value};
