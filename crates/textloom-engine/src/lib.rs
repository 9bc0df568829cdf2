/*!
 * # textloom-engine
 *
 * Reconstructs concrete, formatted source text from a semantic model that
 * conforms to a context-free grammar, while maximally preserving an
 * existing concrete-syntax rendering: original whitespace, comments, and
 * unchanged literal tokens survive a round-trip untouched.
 *
 * ## Pipeline
 *
 * ```text
 * semantic object
 *     │  backtracking search over grammar alternatives × unconsumed values
 *     ▼
 * abstract token chain ──folded──▶ token tree
 *     │  reconcile against the original concrete tree + comment oracle
 *     ▼
 * node-matched token tree (tokens marked for literal reuse, comments spliced)
 *     │  depth-first walk, recovering original hidden text between tokens
 *     ▼
 * semantic / hidden token events ──▶ TokenStream sink
 * ```
 *
 * - **Search** ([`reconstruct::search`]): walks a lazily-expanded token
 *   graph ([`reconstruct::token`]) against immutable attribute-cursor
 *   snapshots ([`reconstruct::cursor`]). Alternatives are tried in grammar
 *   declaration order, depth-first; failures backtrack by restoring the
 *   cursor snapshot captured at the branch point. Every dead end is
 *   recorded in a [`reconstruct::report::DeadEndReport`].
 * - **Matching** ([`reconstruct::matching`]): walks the original concrete
 *   tree's leaves in document order, binding each unchanged leaf to the
 *   abstract token that would serialize to the same text, and splicing
 *   comment tokens in at the correct sibling position.
 * - **Writing** ([`reconstruct::ws_merge`]): emits the final event stream,
 *   copying original whitespace and bound leaf text verbatim where a
 *   literal-reuse path exists and serializing fresh values elsewhere.
 *
 * ## Pluggable collaborators
 *
 * Value, keyword, cross-reference and enum-literal rendering go through the
 * [`serializer`] traits; comment ownership goes through
 * [`comments::CommentAssociator`]; output goes to a [`sink::TokenStream`].
 * Defaults for all of them live in this crate.
 *
 * ## Entry point
 *
 * ```
 * use textloom_engine::{Reconstructor, TextTokenStream};
 * use textloom_syntax::{AssignTarget, GrammarBuilder, SemanticModel, Value};
 *
 * let mut b = GrammarBuilder::new();
 * let id = b.datatype_rule("ID");
 * let greeting = b.parser_rule("Greeting", "Greeting");
 * let hello = b.keyword("hello");
 * let name = b.assign("name", AssignTarget::Rule(id));
 * let body = b.group(&[hello, name]);
 * b.set_body(greeting, body);
 * let grammar = b.finish();
 *
 * let mut model = SemanticModel::new();
 * let obj = model.add_object("Greeting");
 * model.push_value(obj, "name", Value::Str("world".into()));
 *
 * let mut out = TextTokenStream::new();
 * Reconstructor::new(&grammar)
 *     .serialize_recursive(&model, obj, None, &mut out)
 *     .unwrap();
 * assert_eq!(out.into_text(), "helloworld"); // no original text to merge
 * ```
 */

pub mod comments;
pub mod error;
pub mod reconstruct;
pub mod serializer;
pub mod sink;

pub use comments::{CommentAssociator, DefaultCommentAssociator};
pub use error::ReconstructError;
pub use reconstruct::report::{DeadEnd, DeadEndReport, FailedAttempt};
pub use reconstruct::{ReconstructOptions, Reconstructor};
pub use serializer::{
    CrossRefSerializer, EnumLiteralSerializer, KeywordSerializer, Serializers, ValueSerializer,
};
pub use sink::{RecordingTokenStream, TextTokenStream, TokenEvent, TokenStream};
