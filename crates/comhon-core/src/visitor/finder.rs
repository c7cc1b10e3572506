use super::{Visit, VisitControl, Visitor};
use crate::errors::Result;
use crate::model::Model;
use crate::object::Instance;

/// Locates an object written inline somewhere in a graph
///
/// Objects only referenced through foreign values do not match.
#[derive(Debug)]
pub struct ObjectFinder<'m> {
    model: &'m Model,
    id: &'m str,
    found: Option<Vec<String>>,
}

impl<'m> ObjectFinder<'m> {
    pub fn new(model: &'m Model, id: &'m str) -> Self {
        Self {
            model,
            id,
            found: None,
        }
    }

    /// Path of the first match
    pub fn found(&self) -> Option<&[String]> {
        self.found.as_deref()
    }

    pub fn into_found(self) -> Option<Vec<String>> {
        self.found
    }
}

impl Visitor for ObjectFinder<'_> {
    fn visit(&mut self, visit: &Visit<'_>) -> Result<VisitControl> {
        if visit.foreign {
            return Ok(VisitControl::Continue);
        }
        if let Instance::Object(object) = visit.instance {
            if object.model().key_name() == self.model.key_name()
                && object.id_key().as_deref() == Some(self.id)
            {
                self.found = Some(visit.path.to_vec());
                return Ok(VisitControl::Stop);
            }
        }
        Ok(VisitControl::Continue)
    }
}
