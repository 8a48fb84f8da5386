//! Step dependency registration.
//!
//! Creators that publish a value other steps consume (the infrastructure
//! section) register an instructor under a key. Later creators resolve the key
//! to the producing node and outcome name and store that reference in their
//! own parameters.

use std::cell::RefCell;

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDependencyInstructor {
    pub key: String,
    pub producer_node_id: String,
    pub outcome: String,
}

/// Outcome name published by the infrastructure node.
pub const INFRASTRUCTURE_OUTCOME: &str = "infrastructure";

/// Key under which a stage's infrastructure is registered.
pub fn infrastructure_key(stage_identifier: &str) -> String {
    format!("stages.{}.infrastructure", stage_identifier)
}

pub trait StepDependencyService {
    fn register_instructor(&self, key: &str, producer_node_id: &str, outcome: &str);

    fn instructor(&self, key: &str) -> Option<StepDependencyInstructor>;
}

/// In-memory sink. Reusable across compiles: each compile resolves only its
/// own registrations.
#[derive(Debug, Default)]
pub struct InMemoryStepDependencies {
    instructors: RefCell<IndexMap<String, StepDependencyInstructor>>,
}

impl InMemoryStepDependencies {
    pub fn instructors(&self) -> Vec<StepDependencyInstructor> {
        self.instructors.borrow().values().cloned().collect()
    }
}

impl StepDependencyService for InMemoryStepDependencies {
    fn register_instructor(&self, key: &str, producer_node_id: &str, outcome: &str) {
        tracing::debug!(key, producer_node_id, outcome, "registered step dependency instructor");
        self.instructors.borrow_mut().insert(
            key.to_string(),
            StepDependencyInstructor {
                key: key.to_string(),
                producer_node_id: producer_node_id.to_string(),
                outcome: outcome.to_string(),
            },
        );
    }

    fn instructor(&self, key: &str) -> Option<StepDependencyInstructor> {
        self.instructors.borrow().get(key).cloned()
    }
}

/// Registrations of one compile call.
///
/// Lookups only see instructors registered by this compile. They are handed to
/// the caller's sink by `commit`, once the plan was created without error.
pub(crate) struct CompileScope<'a> {
    sink: &'a dyn StepDependencyService,
    local: InMemoryStepDependencies,
}

impl<'a> CompileScope<'a> {
    pub(crate) fn new(sink: &'a dyn StepDependencyService) -> Self {
        CompileScope {
            sink,
            local: InMemoryStepDependencies::default(),
        }
    }

    pub(crate) fn commit(self) {
        for instructor in self.local.instructors.into_inner().into_values() {
            self.sink
                .register_instructor(&instructor.key, &instructor.producer_node_id, &instructor.outcome);
        }
    }
}

impl StepDependencyService for CompileScope<'_> {
    fn register_instructor(&self, key: &str, producer_node_id: &str, outcome: &str) {
        self.local.register_instructor(key, producer_node_id, outcome);
    }

    fn instructor(&self, key: &str) -> Option<StepDependencyInstructor> {
        self.local.instructor(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_registration_replaces_earlier() {
        let deps = InMemoryStepDependencies::default();
        let key = infrastructure_key("deploy");
        deps.register_instructor(&key, "node-1", INFRASTRUCTURE_OUTCOME);
        deps.register_instructor(&key, "node-2", INFRASTRUCTURE_OUTCOME);

        let instructor = deps.instructor(&key).unwrap();
        assert_eq!(instructor.producer_node_id, "node-2");
        assert_eq!(deps.instructors().len(), 1);
    }

    #[test]
    fn scope_hides_outer_registrations_until_commit() {
        let sink = InMemoryStepDependencies::default();
        sink.register_instructor(&infrastructure_key("dev"), "old-node", INFRASTRUCTURE_OUTCOME);

        let scope = CompileScope::new(&sink);
        assert!(scope.instructor(&infrastructure_key("dev")).is_none());
        scope.register_instructor(&infrastructure_key("qa"), "new-node", INFRASTRUCTURE_OUTCOME);
        assert!(sink.instructor(&infrastructure_key("qa")).is_none());

        scope.commit();
        assert_eq!(sink.instructor(&infrastructure_key("qa")).unwrap().producer_node_id, "new-node");
        assert_eq!(sink.instructors().len(), 2);
    }

    #[test]
    fn unknown_key_resolves_to_none() {
        let deps = InMemoryStepDependencies::default();
        assert!(deps.instructor("stages.other.infrastructure").is_none());
    }
}
