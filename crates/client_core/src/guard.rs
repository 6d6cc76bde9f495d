//! In-flight flags for mutation slots.

use std::collections::BTreeMap;

use shared::domain::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKind {
    Claim,
    Release,
    Complete,
    Create,
    Save,
}

impl MutationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Release => "release",
            Self::Complete => "complete",
            Self::Create => "create",
            Self::Save => "save",
        }
    }

    pub fn success_text(self) -> &'static str {
        match self {
            Self::Claim => "Task claimed",
            Self::Release => "Task released",
            Self::Complete => "Task completed",
            Self::Create => "Task created",
            Self::Save => "Task saved",
        }
    }
}

/// What a submitting slot is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub target: Option<TaskId>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct MutationGuards {
    submitting: BTreeMap<MutationKind, Submission>,
}

impl MutationGuards {
    /// `Idle -> Submitting`. Returns `false` if the slot is already
    /// submitting; the caller must then dispatch nothing.
    pub fn try_begin(
        &mut self,
        kind: MutationKind,
        target: Option<TaskId>,
        expected_version: Option<i64>,
    ) -> bool {
        if self.submitting.contains_key(&kind) {
            return false;
        }
        self.submitting.insert(
            kind,
            Submission {
                target,
                expected_version,
            },
        );
        true
    }

    /// `Submitting -> Idle`, returning what was in flight.
    pub fn finish(&mut self, kind: MutationKind) -> Option<Submission> {
        self.submitting.remove(&kind)
    }

    pub fn is_submitting(&self, kind: MutationKind) -> bool {
        self.submitting.contains_key(&kind)
    }

    pub fn any_submitting(&self) -> bool {
        !self.submitting.is_empty()
    }

    pub fn reset_all(&mut self) {
        self.submitting.clear();
    }
}
