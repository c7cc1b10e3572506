//! Graph traversal
//!
//! [`walk`] visits the instances reachable from a root with an explicit
//! stack, in preorder and in declared property order. Each instance is
//! expanded at most once. Objects reached through a foreign property are
//! reported with `foreign` set and are only expanded when the walk goes
//! through foreign values.

mod finder;
mod validator;

pub use finder::ObjectFinder;
pub use validator::ObjectValidator;

use crate::errors::Result;
use crate::model::ModelType;
use crate::object::{Instance, InstanceArena};
use crate::value::InstanceRef;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Expand objects reached through foreign values
    pub through_foreign: bool,
    /// Report the root itself to the visitor
    pub visit_root: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            through_foreign: false,
            visit_root: true,
        }
    }
}

/// One instance met during a walk
#[derive(Debug)]
pub struct Visit<'a> {
    pub handle: InstanceRef,
    pub instance: &'a Instance,
    /// Property names and array keys or indexes from the root
    pub path: &'a [String],
    /// Reached through a foreign value
    pub foreign: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
    Continue,
    /// Do not expand the visited instance
    SkipChildren,
    /// End the walk
    Stop,
}

pub trait Visitor {
    /// # Errors
    ///
    /// An error ends the walk and is returned by [`walk`].
    fn visit(&mut self, visit: &Visit<'_>) -> Result<VisitControl>;
}

struct Frame {
    handle: InstanceRef,
    path: Vec<String>,
    foreign: bool,
    /// Objects below are references
    foreign_scope: bool,
    is_root: bool,
}

/// Walk the graph reachable from `root`
///
/// # Errors
///
/// Returns `InvalidInstance` for dangling handles and any error raised by
/// the visitor.
pub fn walk<V: Visitor>(arena: &InstanceArena, root: InstanceRef, options: WalkOptions, visitor: &mut V) -> Result<()> {
    let mut expanded = HashSet::new();
    let mut stack = vec![Frame {
        handle: root,
        path: Vec::new(),
        foreign: false,
        foreign_scope: false,
        is_root: true,
    }];

    while let Some(frame) = stack.pop() {
        let instance = arena.get(frame.handle)?;
        let control = if frame.is_root && !options.visit_root {
            VisitControl::Continue
        } else {
            visitor.visit(&Visit {
                handle: frame.handle,
                instance,
                path: &frame.path,
                foreign: frame.foreign,
            })?
        };
        match control {
            VisitControl::Stop => return Ok(()),
            VisitControl::SkipChildren => continue,
            VisitControl::Continue => {}
        }
        if frame.foreign && !options.through_foreign {
            continue;
        }
        if !expanded.insert(frame.handle) {
            continue;
        }

        let mut children = Vec::new();
        match instance {
            Instance::Object(object) => {
                let definition = object.model().definition()?;
                for (name, property) in definition.properties() {
                    let Some(child) = object.value(name).and_then(|v| v.as_instance()) else {
                        continue;
                    };
                    let (foreign, foreign_scope) = match property.model() {
                        ModelType::Foreign(inner) => (inner.as_complex().is_some(), true),
                        _ => (false, false),
                    };
                    let mut path = frame.path.clone();
                    path.push(name.clone());
                    children.push(Frame {
                        handle: child,
                        path,
                        foreign,
                        foreign_scope,
                        is_root: false,
                    });
                }
            }
            Instance::Array(array) => {
                if array.model().element().is_simple() {
                    continue;
                }
                let element = array.model().element();
                let foreign_scope = frame.foreign_scope || element.is_foreign();
                for (index, (key, value)) in array.values().entries().into_iter().enumerate() {
                    let Some(child) = value.as_instance() else {
                        continue;
                    };
                    let is_object = value.as_object().is_some();
                    let mut path = frame.path.clone();
                    path.push(key.map(str::to_string).unwrap_or_else(|| index.to_string()));
                    children.push(Frame {
                        handle: child,
                        path,
                        foreign: foreign_scope && is_object,
                        foreign_scope,
                        is_root: false,
                    });
                }
            }
        }
        stack.extend(children.into_iter().rev());
    }
    Ok(())
}
