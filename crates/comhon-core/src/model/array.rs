use super::ModelType;
use crate::restriction::{self, Restriction};

/// Homogeneous list or string-keyed map of values of one model
#[derive(Debug, Clone)]
pub struct ModelArray {
    element: ModelType,
    associative: bool,
    element_name: String,
    not_null_element: bool,
    isolated_element: bool,
    restrictions: Vec<Restriction>,
    element_restrictions: Vec<Restriction>,
}

impl ModelArray {
    pub fn new(element: ModelType, associative: bool, element_name: impl Into<String>) -> Self {
        Self {
            element,
            associative,
            element_name: element_name.into(),
            not_null_element: false,
            isolated_element: false,
            restrictions: Vec::new(),
            element_restrictions: Vec::new(),
        }
    }

    pub fn with_not_null_element(mut self, not_null: bool) -> Self {
        self.not_null_element = not_null;
        self
    }

    pub fn with_isolated_element(mut self, isolated: bool) -> Self {
        self.isolated_element = isolated;
        self
    }

    /// Restrictions on the array itself (size, emptiness)
    pub fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn with_element_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.element_restrictions = restrictions;
        self
    }

    pub fn element(&self) -> &ModelType {
        &self.element
    }

    pub fn is_associative(&self) -> bool {
        self.associative
    }

    /// Node name of each element in tree formats
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn is_not_null_element(&self) -> bool {
        self.not_null_element
    }

    pub fn is_isolated_element(&self) -> bool {
        self.isolated_element
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn element_restrictions(&self) -> &[Restriction] {
        &self.element_restrictions
    }

    pub fn name(&self) -> String {
        if self.associative {
            format!("map<{}>", self.element.name())
        } else {
            format!("array<{}>", self.element.name())
        }
    }

    /// Structural equality, element node names excluded
    pub fn is_equal(&self, other: &ModelArray) -> bool {
        self.associative == other.associative
            && self.not_null_element == other.not_null_element
            && self.isolated_element == other.isolated_element
            && self.element.is_equal(&other.element)
            && restriction::compare(&self.restrictions, &other.restrictions)
            && restriction::compare(&self.element_restrictions, &other.element_restrictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SimpleKind;
    use crate::restriction::{Interval, IntervalDomain};

    fn strings() -> ModelArray {
        ModelArray::new(ModelType::Simple(SimpleKind::String), false, "tag")
    }

    #[test]
    fn test_equality_ignores_element_name() {
        let other = ModelArray::new(ModelType::Simple(SimpleKind::String), false, "label");
        assert!(strings().is_equal(&other));
    }

    #[test]
    fn test_equality_checks_shape_and_restrictions() {
        let map = ModelArray::new(ModelType::Simple(SimpleKind::String), true, "tag");
        assert!(!strings().is_equal(&map));

        let sized = strings().with_restrictions(vec![Restriction::Size(
            Interval::parse("[0,3]", IntervalDomain::Integer).unwrap(),
        )]);
        assert!(!strings().is_equal(&sized));
        assert_eq!(sized.name(), "array<string>");
    }
}
