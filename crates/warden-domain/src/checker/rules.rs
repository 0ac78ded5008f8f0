//! Linked-resource rules.
//!
//! A rule `evidence -> [control, subcontrol, ...]` means readers of a linked
//! control may read the evidence. Links are stored as
//! `(linked, associated_with, object)` tuples.

use std::collections::HashMap;

use crate::model::ObjectKind;

/// Registry of which linked kinds confer read access on which object kinds.
#[derive(Debug, Clone)]
pub struct LinkedResourceRules {
    rules: HashMap<ObjectKind, Vec<ObjectKind>>,
}

impl Default for LinkedResourceRules {
    fn default() -> Self {
        use ObjectKind::*;

        Self::empty()
            .with_rule(Evidence, [Control, Subcontrol, ControlObjective, Task, Program])
            .with_rule(File, [TrustCenterDoc, Evidence, InternalPolicy, Procedure])
            .with_rule(TrustCenterDoc, [TrustCenter])
            .with_rule(Subcontrol, [Control])
            .with_rule(ControlObjective, [Control, Program])
            .with_rule(Task, [Control, Subcontrol, InternalPolicy, Procedure, Program])
            .with_rule(Control, [Program])
            .with_rule(Risk, [Program, Control])
            .with_rule(Narrative, [Program, Control, InternalPolicy, Procedure])
    }
}

impl LinkedResourceRules {
    /// A registry without any rules.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Adds linked kinds for an object kind.
    pub fn with_rule(
        mut self,
        object: ObjectKind,
        linked: impl IntoIterator<Item = ObjectKind>,
    ) -> Self {
        let entry = self.rules.entry(object).or_default();
        for kind in linked {
            if !entry.contains(&kind) {
                entry.push(kind);
            }
        }
        self
    }

    /// Kinds whose readers may read objects of `object`.
    pub fn linked_kinds(&self, object: ObjectKind) -> &[ObjectKind] {
        self.rules.get(&object).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if an object of kind `object` may link to `linked`.
    pub fn allows(&self, object: ObjectKind, linked: ObjectKind) -> bool {
        self.linked_kinds(object).contains(&linked)
    }
}
