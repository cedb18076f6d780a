//! Count derivation and in-place patching.
//!
//! The stored count lives on a stated concrete relationship in group 0 of the
//! primary axiom. It must equal the number of active stated "contains"
//! relationships across all axioms. When several count relationships qualify,
//! the first one is authoritative and the others are left as they are.

use serde_json::json;
use termsync_model::{
    Axiom, Concept, ConcreteValue, CountRule, Relationship, DEFAULT_DEFINITION_STATUS_ID,
    DEFAULT_MODULE_ID, EXISTENTIAL_MODIFIER,
};

/// A change made to one concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountChange {
    /// Concept that was patched.
    pub concept_id: String,
    /// Value stored before the patch, if a count relationship existed.
    pub previous: Option<ConcreteValue>,
    /// The new count.
    pub count: u64,
    /// True if a new relationship was appended rather than updated.
    pub created: bool,
}

/// Counts active stated relationships of the rule's "contains" type.
///
/// All axioms and all groups are considered.
pub fn count_contained(concept: &Concept, rule: &CountRule) -> u64 {
    concept
        .stated_relationships()
        .filter(|rel| rel.is_active() && rel.has_type(&rule.contains_type_id))
        .count() as u64
}

/// Brings the stored count of `concept` in line with its relationships.
///
/// Returns the change when the concept was modified, `None` when it already
/// held the correct value.
pub fn apply_count(concept: &mut Concept, rule: &CountRule) -> Option<CountChange> {
    let count = count_contained(concept, rule);
    ensure_count(concept, rule, count)
}

/// Ensures the primary axiom carries `count` as the stored count.
pub fn ensure_count(concept: &mut Concept, rule: &CountRule, count: u64) -> Option<CountChange> {
    let module_id = stated_module(concept);
    let source_id = concept.concept_id.clone();
    let axiom_index = primary_axiom(concept, rule);
    let axiom = &mut concept.class_axioms[axiom_index];

    let existing = axiom.relationships.iter_mut().find(|rel| {
        rel.is_stated() && rel.has_type(&rule.count_type_id) && rel.group() == 0 && rel.is_active()
    });

    match existing {
        Some(rel) => {
            if rel
                .concrete_value
                .as_ref()
                .is_some_and(|value| value.encodes_integer(count))
            {
                return None;
            }
            let previous = rel.concrete_value.clone();
            rel.set_concrete_value(ConcreteValue::integer(count));
            rel.module_id = Some(module_id);
            rel.source_id = Some(source_id.clone());
            rel.released = Some(false);
            rel.modifier = Some(EXISTENTIAL_MODIFIER.into());
            Some(CountChange {
                concept_id: source_id,
                previous,
                count,
                created: false,
            })
        }
        None => {
            let mut rel = Relationship::stated(rule.count_type_id.clone())
                .with_module(module_id)
                .with_concrete_value(ConcreteValue::integer(count));
            rel.type_concept = Some(json!({ "conceptId": rule.count_type_id }));
            rel.source_id = Some(source_id.clone());
            rel.released = Some(false);
            rel.modifier = Some(EXISTENTIAL_MODIFIER.into());
            axiom.relationships.push(rel);
            Some(CountChange {
                concept_id: source_id,
                previous: None,
                count,
                created: true,
            })
        }
    }
}

/// Module of the first stated relationship naming one, else the concept's.
fn stated_module(concept: &Concept) -> String {
    concept
        .stated_relationships()
        .find_map(|rel| rel.module_id.clone().filter(|id| !id.is_empty()))
        .or_else(|| concept.module_id.clone().filter(|id| !id.is_empty()))
        .unwrap_or_else(|| DEFAULT_MODULE_ID.to_string())
}

/// Index of the axiom stating `is a` the rule's parent, else the first axiom.
///
/// A concept without axioms gets a new active, unreleased one.
fn primary_axiom(concept: &mut Concept, rule: &CountRule) -> usize {
    let is_primary = |axiom: &Axiom| {
        axiom.relationships.iter().any(|rel| {
            rel.is_stated()
                && rel.has_type(&rule.is_a_type_id)
                && rel.destination_id.as_deref() == Some(rule.primary_parent_id.as_str())
        })
    };

    if let Some(index) = concept.class_axioms.iter().position(is_primary) {
        return index;
    }
    if !concept.class_axioms.is_empty() {
        return 0;
    }

    let status = concept
        .definition_status_id
        .clone()
        .unwrap_or_else(|| DEFAULT_DEFINITION_STATUS_ID.to_string());
    concept.class_axioms.push(Axiom::new(status));
    concept.class_axioms.len() - 1
}
