//! Concept, axiom and relationship types.
//!
//! Field names follow the Snowstorm browser representation. Every type keeps
//! the fields it does not model in a flattened `extra` map, so a concept
//! loaded from the server serialises back with descriptions, terms and other
//! untouched content intact.

use crate::rule::{INTEGER_DATA_TYPE, STATED_RELATIONSHIP};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A terminology concept as returned by the browser bulk-load endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    /// Concept identifier.
    #[serde(deserialize_with = "crate::id::required")]
    pub concept_id: String,
    /// Owning module.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub module_id: Option<String>,
    /// Default definition status.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub definition_status_id: Option<String>,
    /// Whether the concept is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Stated class axioms.
    #[serde(default)]
    pub class_axioms: Vec<Axiom>,
    /// Fields not modelled here, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Concept {
    /// Creates a concept with no axioms.
    pub fn new(concept_id: impl Into<String>) -> Self {
        Self {
            concept_id: concept_id.into(),
            module_id: None,
            definition_status_id: None,
            active: None,
            class_axioms: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Sets the module.
    pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Appends an axiom.
    pub fn with_axiom(mut self, axiom: Axiom) -> Self {
        self.class_axioms.push(axiom);
        self
    }

    /// Iterates over stated relationships across all axioms, in order.
    pub fn stated_relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.class_axioms
            .iter()
            .flat_map(|axiom| axiom.relationships.iter())
            .filter(|rel| rel.is_stated())
    }
}

/// A class axiom: one logical definition of a concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axiom {
    /// Axiom identifier, absent until the server assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axiom_id: Option<String>,
    /// Whether the axiom is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Whether the axiom has been released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<bool>,
    /// Definition status of this axiom.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub definition_status_id: Option<String>,
    /// Relationships of this axiom.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Fields not modelled here, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Axiom {
    /// Creates an active, unreleased axiom with the given definition status.
    pub fn new(definition_status_id: impl Into<String>) -> Self {
        Self {
            axiom_id: None,
            active: Some(true),
            released: Some(false),
            definition_status_id: Some(definition_status_id.into()),
            relationships: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Appends a relationship.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }
}

/// What a relationship points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipTarget<'a> {
    /// An edge to another concept.
    Destination(&'a str),
    /// An edge to a literal.
    Concrete(&'a ConcreteValue),
    /// Neither is present.
    None,
}

/// A typed edge from a concept, either to a concept or to a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Relationship identifier, absent for new relationships.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub relationship_id: Option<String>,
    /// Relationship type.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_id: Option<String>,
    /// Type concept summary (`{"conceptId": ...}` plus terms).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_concept: Option<Value>,
    /// Characteristic type, e.g. `STATED_RELATIONSHIP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristic_type: Option<String>,
    /// Relationship group; absent means group 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    /// Whether the relationship is active; absent means active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Whether the relationship has been released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<bool>,
    /// Owning module.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub module_id: Option<String>,
    /// Source concept.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_id: Option<String>,
    /// Modifier, e.g. `EXISTENTIAL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    /// Destination concept for structural relationships.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub destination_id: Option<String>,
    /// Literal value for concrete relationships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concrete_value: Option<ConcreteValue>,
    /// Fields not modelled here, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Relationship {
    /// Creates an active stated relationship of the given type in group 0.
    pub fn stated(type_id: impl Into<String>) -> Self {
        Self {
            relationship_id: None,
            type_id: Some(type_id.into()),
            type_concept: None,
            characteristic_type: Some(STATED_RELATIONSHIP.into()),
            group_id: Some(0),
            active: Some(true),
            released: None,
            module_id: None,
            source_id: None,
            modifier: None,
            destination_id: None,
            concrete_value: None,
            extra: Map::new(),
        }
    }

    /// Sets the destination concept.
    pub fn with_destination(mut self, destination_id: impl Into<String>) -> Self {
        self.destination_id = Some(destination_id.into());
        self
    }

    /// Sets the relationship group.
    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Sets the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Sets the characteristic type.
    pub fn with_characteristic(mut self, characteristic_type: impl Into<String>) -> Self {
        self.characteristic_type = Some(characteristic_type.into());
        self
    }

    /// Sets the module.
    pub fn with_module(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = Some(module_id.into());
        self
    }

    /// Sets a concrete value, clearing any destination.
    pub fn with_concrete_value(mut self, value: ConcreteValue) -> Self {
        self.set_concrete_value(value);
        self
    }

    /// Returns true for `STATED_RELATIONSHIP`.
    pub fn is_stated(&self) -> bool {
        self.characteristic_type.as_deref() == Some(STATED_RELATIONSHIP)
    }

    /// Returns the active flag, treating absence as active.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    /// Returns the relationship group, treating absence as group 0.
    pub fn group(&self) -> i64 {
        self.group_id.unwrap_or(0)
    }

    /// Returns true if the relationship has the given type.
    pub fn has_type(&self, type_id: &str) -> bool {
        self.type_id.as_deref() == Some(type_id)
    }

    /// Returns what this relationship points at.
    ///
    /// A concrete value takes precedence over a stray destination id.
    pub fn target(&self) -> RelationshipTarget<'_> {
        match (&self.concrete_value, &self.destination_id) {
            (Some(value), _) => RelationshipTarget::Concrete(value),
            (None, Some(dest)) => RelationshipTarget::Destination(dest),
            (None, None) => RelationshipTarget::None,
        }
    }

    /// Replaces the target with a concrete value.
    ///
    /// Any structural destination (`destinationId`, `target`) is removed.
    pub fn set_concrete_value(&mut self, value: ConcreteValue) {
        self.destination_id = None;
        self.extra.remove("target");
        self.concrete_value = Some(value);
    }
}

/// A literal attached to a concrete relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcreteValue {
    /// Data type tag, e.g. `INTEGER`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Value without prefix.
    #[serde(
        default,
        deserialize_with = "crate::id::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
    /// Value with its RF2 prefix (`#` for numbers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_with_prefix: Option<String>,
}

impl ConcreteValue {
    /// Creates an integer value with matching plain and prefixed encodings.
    pub fn integer(value: u64) -> Self {
        let digits = value.to_string();
        Self {
            data_type: Some(INTEGER_DATA_TYPE.into()),
            value_with_prefix: Some(format!("#{digits}")),
            value: Some(digits),
        }
    }

    /// Returns true if this is exactly the integer encoding of `value`.
    pub fn encodes_integer(&self, value: u64) -> bool {
        *self == Self::integer(value)
    }

    /// Parses the plain value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<u64> {
        self.value.as_deref()?.parse().ok()
    }
}
