//! Shape classification and attribute-matrix construction.
//!
//! The channel integration supports a single variant attribute: the parent
//! declares one attribute name and every variant carries one value for it.
//! The matrix is built once per sync and reused for both the parent payload
//! and every variant payload - deriving the two independently would corrupt
//! the channel's variant grid.

use std::collections::HashMap;

use vitrine_core::{ProductId, SyncShape};

use crate::models::GradeDeclaration;

/// Attribute name used when no declaration carries an axis name.
pub const DEFAULT_AXIS_LABEL: &str = "Variation";

/// Variant value used when every fallback is blank.
pub const DEFAULT_VALUE_LABEL: &str = "Default";

/// Classify a product by its ordered variant declarations.
#[must_use]
pub fn classify(grades: &[GradeDeclaration]) -> SyncShape {
    if grades.is_empty() {
        SyncShape::Standalone
    } else {
        SyncShape::Parent
    }
}

/// The single supported variant attribute: one name, one value per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatrix {
    name: String,
    values: Vec<(ProductId, String)>,
}

impl AttributeMatrix {
    /// Build the matrix from ordered declarations.
    ///
    /// The attribute name is the first non-empty axis name across the
    /// declarations (in order), defaulting to [`DEFAULT_AXIS_LABEL`]. Each
    /// variant's value is its own axis value, falling back to its axis name,
    /// then to the variant's description, then to [`DEFAULT_VALUE_LABEL`].
    #[must_use]
    pub fn build(
        grades: &[GradeDeclaration],
        descriptions: &HashMap<ProductId, String>,
    ) -> Self {
        let name = grades
            .iter()
            .find_map(|g| non_blank(g.axis_name.as_deref()))
            .map_or_else(|| DEFAULT_AXIS_LABEL.to_string(), normalize_label);

        let values = grades
            .iter()
            .map(|g| {
                let value = non_blank(g.axis_value.as_deref())
                    .or_else(|| non_blank(g.axis_name.as_deref()))
                    .or_else(|| {
                        non_blank(descriptions.get(&g.variant_id).map(String::as_str))
                    })
                    .map_or_else(|| DEFAULT_VALUE_LABEL.to_string(), normalize_label);
                (g.variant_id, value)
            })
            .collect();

        Self { name, values }
    }

    /// The declared attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value for one variant, when declared.
    #[must_use]
    pub fn value_for(&self, variant_id: ProductId) -> Option<&str> {
        self.values
            .iter()
            .find(|(id, _)| *id == variant_id)
            .map(|(_, value)| value.as_str())
    }

    /// Ordered (variant, value) pairs.
    #[must_use]
    pub fn values(&self) -> &[(ProductId, String)] {
        &self.values
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Trim and capitalize so equal values normalize identically.
fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::GradeId;

    fn grade(
        id: i64,
        variant_id: i64,
        axis_name: Option<&str>,
        axis_value: Option<&str>,
    ) -> GradeDeclaration {
        GradeDeclaration {
            id: GradeId::new(id),
            parent_id: ProductId::new(1),
            variant_id: ProductId::new(variant_id),
            axis_name: axis_name.map(ToString::to_string),
            axis_value: axis_value.map(ToString::to_string),
            position: i32::try_from(id).unwrap_or(0),
        }
    }

    #[test]
    fn test_classify_by_declaration_count() {
        assert_eq!(classify(&[]), SyncShape::Standalone);
        assert_eq!(
            classify(&[grade(1, 10, Some("Size"), Some("M"))]),
            SyncShape::Parent
        );
    }

    #[test]
    fn test_matrix_name_is_first_non_empty_axis() {
        let grades = vec![
            grade(1, 10, None, Some("M")),
            grade(2, 11, Some("  size "), Some("L")),
            grade(3, 12, Some("color"), Some("Blue")),
        ];
        let matrix = AttributeMatrix::build(&grades, &HashMap::new());
        assert_eq!(matrix.name(), "Size");
    }

    #[test]
    fn test_matrix_name_defaults_when_all_blank() {
        let grades = vec![grade(1, 10, Some("  "), Some("M"))];
        let matrix = AttributeMatrix::build(&grades, &HashMap::new());
        assert_eq!(matrix.name(), DEFAULT_AXIS_LABEL);
    }

    #[test]
    fn test_value_fallback_chain() {
        let mut descriptions = HashMap::new();
        descriptions.insert(ProductId::new(12), "blue shirt".to_string());

        let grades = vec![
            grade(1, 10, Some("Size"), Some("m")),
            grade(2, 11, Some("Size"), None),
            grade(3, 12, None, None),
            grade(4, 13, None, None),
        ];
        let matrix = AttributeMatrix::build(&grades, &descriptions);

        // Own value, capitalized.
        assert_eq!(matrix.value_for(ProductId::new(10)), Some("M"));
        // Falls back to the axis name.
        assert_eq!(matrix.value_for(ProductId::new(11)), Some("Size"));
        // Falls back to the variant description.
        assert_eq!(matrix.value_for(ProductId::new(12)), Some("Blue shirt"));
        // Nothing left: placeholder.
        assert_eq!(matrix.value_for(ProductId::new(13)), Some(DEFAULT_VALUE_LABEL));
    }

    #[test]
    fn test_equal_values_normalize_identically() {
        let grades = vec![
            grade(1, 10, Some("Size"), Some(" m ")),
            grade(2, 11, Some("Size"), Some("M")),
        ];
        let matrix = AttributeMatrix::build(&grades, &HashMap::new());
        assert_eq!(
            matrix.value_for(ProductId::new(10)),
            matrix.value_for(ProductId::new(11))
        );
    }

    #[test]
    fn test_values_preserve_declaration_order() {
        let grades = vec![
            grade(1, 20, Some("Size"), Some("P")),
            grade(2, 10, Some("Size"), Some("M")),
            grade(3, 30, Some("Size"), Some("G")),
        ];
        let matrix = AttributeMatrix::build(&grades, &HashMap::new());
        let ids: Vec<i64> = matrix.values().iter().map(|(id, _)| id.as_i64()).collect();
        assert_eq!(ids, vec![20, 10, 30]);
    }
}
