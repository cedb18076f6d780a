//! Terminology constants for the clinical drug count rule.

/// Characteristic type of author-asserted relationships.
pub const STATED_RELATIONSHIP: &str = "STATED_RELATIONSHIP";

/// Modifier written on count relationships.
pub const EXISTENTIAL_MODIFIER: &str = "EXISTENTIAL";

/// Concrete value data type for counts.
pub const INTEGER_DATA_TYPE: &str = "INTEGER";

/// Module used when neither a stated relationship nor the concept names one.
pub const DEFAULT_MODULE_ID: &str = "900000000000207008";

/// Definition status of synthesised axioms when the concept has none (primitive).
pub const DEFAULT_DEFINITION_STATUS_ID: &str = "900000000000073002";

/// Which concepts to select and which relationship types to count and store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRule {
    /// ECL expression selecting the concepts to check.
    pub ecl: String,
    /// Type of the relationships being counted.
    pub contains_type_id: String,
    /// Type of the concrete relationship holding the count.
    pub count_type_id: String,
    /// The `is a` relationship type.
    pub is_a_type_id: String,
    /// Parent whose `is a` edge marks the primary axiom.
    pub primary_parent_id: String,
}

impl CountRule {
    /// "Count of clinical drug type" over AMT medicinal product packages.
    ///
    /// Selects packages whose stated form lacks a count but contains clinical
    /// drugs, counts `774160008 |Contains clinical drug|` and stores the
    /// result as `1142143009 |Count of clinical drug type|`.
    pub fn clinical_drug_count() -> Self {
        Self {
            ecl: "(<<(^ 929360081000036101)) : ([0..0] 1142143009 = *, 774160008 = *)".into(),
            contains_type_id: "774160008".into(),
            count_type_id: "1142143009".into(),
            is_a_type_id: "116680003".into(),
            primary_parent_id: "781405001".into(),
        }
    }

    /// Sets the ECL expression.
    pub fn with_ecl(mut self, ecl: impl Into<String>) -> Self {
        self.ecl = ecl.into();
        self
    }
}

impl Default for CountRule {
    fn default() -> Self {
        Self::clinical_drug_count()
    }
}
