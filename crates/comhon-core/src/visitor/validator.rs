use super::{Visit, VisitControl, Visitor};
use crate::errors::Result;
use crate::object::validate::{validate_array, validate_object};
use crate::object::Instance;

/// Validates every owned instance of a graph
///
/// Errors carry the path of the failing instance.
#[derive(Debug, Default)]
pub struct ObjectValidator {
    visited: usize,
}

impl ObjectValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances validated so far
    pub fn visited(&self) -> usize {
        self.visited
    }
}

impl Visitor for ObjectValidator {
    fn visit(&mut self, visit: &Visit<'_>) -> Result<VisitControl> {
        if visit.foreign {
            return Ok(VisitControl::SkipChildren);
        }
        self.visited += 1;
        let checked = match visit.instance {
            Instance::Object(object) => validate_object(object),
            Instance::Array(array) => validate_array(array),
        };
        checked.map_err(|err| err.at_path(visit.path))?;
        Ok(VisitControl::Continue)
    }
}
