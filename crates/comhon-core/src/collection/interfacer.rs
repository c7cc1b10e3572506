use super::ObjectCollection;
use crate::errors::Result;
use crate::model::Model;
use crate::value::InstanceRef;

/// Identity bookkeeping of one import or export scope
///
/// `start` holds the objects that existed before the operation, `new` the
/// objects read or written inline, `new_foreign` the objects only met as
/// references. References never met inline must be found elsewhere in the
/// document once the scope ends.
#[derive(Debug, Default, Clone)]
pub struct ObjectCollectionInterfacer {
    start: ObjectCollection,
    new: ObjectCollection,
    new_foreign: ObjectCollection,
}

impl ObjectCollectionInterfacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(start: ObjectCollection) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn start(&self) -> &ObjectCollection {
        &self.start
    }

    pub fn new_objects(&self) -> &ObjectCollection {
        &self.new
    }

    pub fn new_foreign_objects(&self) -> &ObjectCollection {
        &self.new_foreign
    }

    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if another instance was already met
    /// inline with the same identity.
    pub fn add_new_object(&mut self, model: &Model, id: &str, handle: InstanceRef) -> Result<()> {
        self.new.add(model, id, handle)
    }

    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if another instance was already met as
    /// a reference with the same identity.
    pub fn add_new_foreign_object(&mut self, model: &Model, id: &str, handle: InstanceRef) -> Result<()> {
        self.new_foreign.add(model, id, handle)
    }

    pub fn get_new(&self, model: &Model, id: &str) -> Option<InstanceRef> {
        self.new.get(model, id)
    }

    pub fn get_new_foreign(&self, model: &Model, id: &str) -> Option<InstanceRef> {
        self.new_foreign.get(model, id)
    }

    pub fn get_start(&self, model: &Model, id: &str) -> Option<InstanceRef> {
        self.start.get(model, id)
    }

    pub fn has_new_object(&self, model: &Model, id: &str) -> bool {
        self.new.contains(model, id)
    }

    /// Objects met only as references, as (partition, id, handle)
    pub fn unresolved_foreign(&self) -> Vec<(String, String, InstanceRef)> {
        self.new_foreign
            .entries()
            .filter(|(partition, id, _)| {
                !self
                    .new
                    .entries()
                    .any(|(p, i, _)| p == *partition && i == *id)
            })
            .map(|(partition, id, handle)| (partition.to_string(), id.to_string(), handle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestVersion;
    use crate::model::ModelDefinition;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_unresolved_foreign_excludes_inline_objects() {
        let person = Arc::new(Model::new("Person"));
        person
            .publish(ModelDefinition {
                version: ManifestVersion::V3,
                parents: Vec::new(),
                properties: Default::default(),
                is_abstract: false,
                is_main: false,
                shared_id_model: None,
                conflicts: HashMap::new(),
                serialization: None,
            })
            .unwrap();

        let mut scope = ObjectCollectionInterfacer::new();
        scope.add_new_foreign_object(&person, "1", InstanceRef(0)).unwrap();
        scope.add_new_foreign_object(&person, "2", InstanceRef(1)).unwrap();
        scope.add_new_object(&person, "1", InstanceRef(0)).unwrap();

        let unresolved = scope.unresolved_foreign();
        assert_eq!(unresolved, vec![("Person".to_string(), "2".to_string(), InstanceRef(1))]);
        assert!(scope.has_new_object(&person, "1"));
    }
}
