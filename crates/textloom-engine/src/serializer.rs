//! Pluggable token serializers.
//!
//! Four small traits decide how values, keywords, cross-references and enum
//! literals turn into text, and when a produced token counts as equal to an
//! existing concrete-syntax leaf. The engine only ever compares and renders
//! through these traits, so swapping one changes both the matching and the
//! output consistently.
//!
//! The bundled defaults mirror the common cases: values serialize to their
//! obvious textual form, cross-references resolve through the target
//! object's `name` attribute, enum literals through the rule's declaration
//! table.

use textloom_syntax::{Grammar, ObjId, RuleId, RuleKind, SemanticModel, Value};

use crate::error::ReconstructError;

pub trait ValueSerializer {
    /// Render a primitive attribute value assigned through a datatype rule.
    fn serialize_value(
        &self,
        model: &SemanticModel,
        obj: ObjId,
        attr: &str,
        value: &Value,
    ) -> Result<String, ReconstructError>;

    /// Whether the value would serialize to exactly the given leaf text.
    fn equals_node(&self, model: &SemanticModel, obj: ObjId, attr: &str, value: &Value, text: &str)
        -> bool;

    /// Render an unassigned rule call that produces text but no value.
    /// Without an original node to reuse there is usually nothing to say.
    fn serialize_unassigned(
        &self,
        model: &SemanticModel,
        obj: ObjId,
        rule: RuleId,
        grammar: &Grammar,
    ) -> Result<String, ReconstructError>;
}

pub trait KeywordSerializer {
    fn serialize_keyword(&self, text: &str) -> String;

    fn equals_node(&self, keyword: &str, node_text: &str) -> bool;
}

pub trait CrossRefSerializer {
    /// Render the reference to `target`, or `None` when it has no referable
    /// text (the caller raises a serialization error).
    fn serialize_ref(&self, model: &SemanticModel, obj: ObjId, target: ObjId) -> Option<String>;

    /// Whether `node_text` denotes `target` - target identity, not text
    /// equality, is what matters for literal reuse.
    fn refers_to(&self, model: &SemanticModel, target: ObjId, node_text: &str) -> bool;
}

pub trait EnumLiteralSerializer {
    fn serialize_enum(
        &self,
        grammar: &Grammar,
        rule: RuleId,
        value_name: &str,
    ) -> Option<String>;

    fn equals_node(
        &self,
        grammar: &Grammar,
        rule: RuleId,
        value_name: &str,
        node_text: &str,
    ) -> bool;
}

/// The serializer bundle the engine threads through search, matching and
/// writing.
pub struct Serializers {
    pub value: Box<dyn ValueSerializer>,
    pub keyword: Box<dyn KeywordSerializer>,
    pub cross_ref: Box<dyn CrossRefSerializer>,
    pub enum_lit: Box<dyn EnumLiteralSerializer>,
}

impl Default for Serializers {
    fn default() -> Self {
        Self {
            value: Box::new(DefaultValueSerializer),
            keyword: Box::new(DefaultKeywordSerializer),
            cross_ref: Box::new(DefaultCrossRefSerializer),
            enum_lit: Box::new(DefaultEnumLiteralSerializer),
        }
    }
}

pub struct DefaultValueSerializer;

impl DefaultValueSerializer {
    fn render(value: &Value) -> Option<String> {
        match value {
            Value::Str(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Enum(name) => Some(name.clone()),
            Value::Object(_) | Value::Ref(_) => None,
        }
    }
}

impl ValueSerializer for DefaultValueSerializer {
    fn serialize_value(
        &self,
        model: &SemanticModel,
        obj: ObjId,
        attr: &str,
        value: &Value,
    ) -> Result<String, ReconstructError> {
        Self::render(value).ok_or_else(|| ReconstructError::Serialization {
            object_path: model.object_path(obj),
            attribute: attr.to_string(),
            reason: "value is not a primitive".to_string(),
        })
    }

    fn equals_node(
        &self,
        _model: &SemanticModel,
        _obj: ObjId,
        _attr: &str,
        value: &Value,
        text: &str,
    ) -> bool {
        Self::render(value).is_some_and(|s| s == text)
    }

    fn serialize_unassigned(
        &self,
        model: &SemanticModel,
        obj: ObjId,
        rule: RuleId,
        grammar: &Grammar,
    ) -> Result<String, ReconstructError> {
        Err(ReconstructError::Serialization {
            object_path: model.object_path(obj),
            attribute: grammar.rule(rule).name.clone(),
            reason: "no original text to reuse for unassigned rule call".to_string(),
        })
    }
}

pub struct DefaultKeywordSerializer;

impl KeywordSerializer for DefaultKeywordSerializer {
    fn serialize_keyword(&self, text: &str) -> String {
        text.to_string()
    }

    fn equals_node(&self, keyword: &str, node_text: &str) -> bool {
        keyword == node_text
    }
}

pub struct DefaultCrossRefSerializer;

impl CrossRefSerializer for DefaultCrossRefSerializer {
    fn serialize_ref(&self, model: &SemanticModel, _obj: ObjId, target: ObjId) -> Option<String> {
        model.name_of(target).map(str::to_string)
    }

    fn refers_to(&self, model: &SemanticModel, target: ObjId, node_text: &str) -> bool {
        model.name_of(target) == Some(node_text)
    }
}

pub struct DefaultEnumLiteralSerializer;

impl EnumLiteralSerializer for DefaultEnumLiteralSerializer {
    fn serialize_enum(&self, grammar: &Grammar, rule: RuleId, value_name: &str) -> Option<String> {
        match &grammar.rule(rule).kind {
            RuleKind::Enum(literals) => literals
                .iter()
                .find(|(name, _)| name == value_name)
                .map(|(_, text)| text.clone()),
            _ => None,
        }
    }

    fn equals_node(
        &self,
        grammar: &Grammar,
        rule: RuleId,
        value_name: &str,
        node_text: &str,
    ) -> bool {
        self.serialize_enum(grammar, rule, value_name).as_deref() == Some(node_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use textloom_syntax::GrammarBuilder;

    #[test]
    fn default_value_serializer_renders_primitives() {
        let mut model = SemanticModel::new();
        let obj = model.add_object("M");
        let s = DefaultValueSerializer;
        assert_eq!(
            s.serialize_value(&model, obj, "a", &Value::Int(42)).unwrap(),
            "42"
        );
        assert_eq!(
            s.serialize_value(&model, obj, "a", &Value::Str("x".into()))
                .unwrap(),
            "x"
        );
        assert!(s.equals_node(&model, obj, "a", &Value::Bool(true), "true"));
        assert!(!s.equals_node(&model, obj, "a", &Value::Int(1), "2"));
    }

    #[test]
    fn default_value_serializer_rejects_objects() {
        let mut model = SemanticModel::new();
        let obj = model.add_object("M");
        let s = DefaultValueSerializer;
        let err = s
            .serialize_value(&model, obj, "child", &Value::Object(obj))
            .unwrap_err();
        assert!(matches!(err, ReconstructError::Serialization { .. }));
    }

    #[test]
    fn default_cross_ref_resolves_through_name() {
        let mut model = SemanticModel::new();
        let obj = model.add_object("M");
        let target = model.add_object("Item");
        model.push_value(target, "name", Value::Str("it".into()));

        let s = DefaultCrossRefSerializer;
        assert_eq!(s.serialize_ref(&model, obj, target), Some("it".into()));
        assert!(s.refers_to(&model, target, "it"));
        assert!(!s.refers_to(&model, target, "other"));
        assert_eq!(s.serialize_ref(&model, obj, obj), None);
    }

    #[test]
    fn default_enum_serializer_uses_declaration_table() {
        let mut b = GrammarBuilder::new();
        let color = b.enum_rule("Color", &[("Red", "red"), ("Blue", "blue")]);
        let g = b.finish();

        let s = DefaultEnumLiteralSerializer;
        assert_eq!(s.serialize_enum(&g, color, "Red"), Some("red".into()));
        assert_eq!(s.serialize_enum(&g, color, "Green"), None);
        assert!(s.equals_node(&g, color, "Blue", "blue"));
    }
}
