//! The semantic model: typed objects with ordered attribute values.
//!
//! This is the *input* side of reconstruction. Objects are immutable while
//! the engine runs; consumption bookkeeping lives in the engine's cursor
//! snapshots, never here. Attribute values keep their caller-defined order,
//! and that order is what the engine is obliged to reproduce in the output.

use crate::cst::NodeId;

/// Index of an object in its [`SemanticModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

/// One attribute value. `Object` owns a nested object, `Ref` points at an
/// object owned elsewhere (a cross-reference).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Object(ObjId),
    Ref(ObjId),
    Enum(String),
}

/// An attribute with zero, one or many values in stable order.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticObject {
    pub type_name: String,
    /// Declaration-ordered attributes; the order is part of the model.
    pub attributes: Vec<Attribute>,
    /// The concrete syntax node this object was parsed from, if any.
    pub cst: Option<NodeId>,
}

/// Arena of semantic objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticModel {
    objects: Vec<SemanticObject>,
}

impl SemanticModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, type_name: &str) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(SemanticObject {
            type_name: type_name.to_string(),
            attributes: Vec::new(),
            cst: None,
        });
        id
    }

    pub fn object(&self, id: ObjId) -> &SemanticObject {
        &self.objects[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append a value to an attribute, creating the attribute at the end of
    /// the object's attribute list if it does not exist yet.
    pub fn push_value(&mut self, obj: ObjId, attr: &str, value: Value) {
        let object = &mut self.objects[obj.0 as usize];
        match object.attributes.iter_mut().find(|a| a.name == attr) {
            Some(a) => a.values.push(value),
            None => object.attributes.push(Attribute {
                name: attr.to_string(),
                values: vec![value],
            }),
        }
    }

    /// Replace an attribute's values wholesale, preserving its position.
    pub fn set_values(&mut self, obj: ObjId, attr: &str, values: Vec<Value>) {
        let object = &mut self.objects[obj.0 as usize];
        match object.attributes.iter_mut().find(|a| a.name == attr) {
            Some(a) => a.values = values,
            None => object.attributes.push(Attribute {
                name: attr.to_string(),
                values,
            }),
        }
    }

    pub fn attr(&self, obj: ObjId, name: &str) -> Option<&Attribute> {
        self.object(obj).attributes.iter().find(|a| a.name == name)
    }

    pub fn attr_index(&self, obj: ObjId, name: &str) -> Option<usize> {
        self.object(obj).attributes.iter().position(|a| a.name == name)
    }

    pub fn set_cst(&mut self, obj: ObjId, node: NodeId) {
        self.objects[obj.0 as usize].cst = Some(node);
    }

    /// The object's `name` attribute, used by the default cross-reference
    /// serializer as the referable text.
    pub fn name_of(&self, obj: ObjId) -> Option<&str> {
        match self.attr(obj, "name").and_then(|a| a.values.first()) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Diagnostic path for an object, e.g. `Item@2`.
    pub fn object_path(&self, obj: ObjId) -> String {
        format!("{}@{}", self.object(obj).type_name, obj.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn values_keep_insertion_order() {
        let mut m = SemanticModel::new();
        let o = m.add_object("Model");
        m.push_value(o, "items", Value::Str("a".into()));
        m.push_value(o, "items", Value::Str("b".into()));
        m.push_value(o, "items", Value::Str("c".into()));

        let items = m.attr(o, "items").unwrap();
        assert_eq!(
            items.values,
            vec![
                Value::Str("a".into()),
                Value::Str("b".into()),
                Value::Str("c".into())
            ]
        );
    }

    #[test]
    fn attributes_keep_declaration_order() {
        let mut m = SemanticModel::new();
        let o = m.add_object("Model");
        m.push_value(o, "value", Value::Int(1));
        m.push_value(o, "name", Value::Str("foo".into()));

        assert_eq!(m.attr_index(o, "value"), Some(0));
        assert_eq!(m.attr_index(o, "name"), Some(1));
    }

    #[test]
    fn name_of_reads_first_name_value() {
        let mut m = SemanticModel::new();
        let o = m.add_object("Item");
        m.push_value(o, "name", Value::Str("foo".into()));
        assert_eq!(m.name_of(o), Some("foo"));
        assert_eq!(m.object_path(o), "Item@0");
    }
}
