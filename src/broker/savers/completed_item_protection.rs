//! The single most-repeated invariant across post-processors: no saver may let an Agent-supplied payload
//! overwrite a `Task` or `Subtask` whose status is `done`/`completed`.
//! Centralized here as `(existingItem, proposedReplacement) -> finalItem`
//! so every saver applies the same rule rather than re-deriving it.

use crate::broker::types::{Subtask, Task};
use std::collections::{HashMap, HashSet};

/// Merge a proposed task into its existing counterpart, protecting a
/// completed parent outright and protecting any completed subtask
/// individually. `warn` receives one message per protection that fired.
pub fn merge_task(
    existing: Option<&Task>,
    proposed: Task,
    warn: &mut impl FnMut(String),
) -> Task {
    let Some(existing) = existing else {
        return proposed;
    };
    if existing.status.is_completed() {
        warn(format!(
            "task {} is already completed; update skipped",
            existing.id
        ));
        return existing.clone();
    }
    let mut merged = proposed;
    merged.subtasks = merge_subtasks(&existing.subtasks, merged.subtasks, warn);
    merged
}

/// Same rule applied to a single subtask in isolation (used by savers that
/// touch exactly one subtask, e.g. update-one-subtask).
pub fn merge_subtask(
    existing: Option<&Subtask>,
    proposed: Subtask,
    warn: &mut impl FnMut(String),
) -> Subtask {
    match existing {
        Some(existing) if existing.status.is_completed() => {
            warn(format!(
                "subtask {} is already completed; update skipped",
                existing.id
            ));
            existing.clone()
        }
        _ => proposed,
    }
}

/// Merge a parent's subtask list: any subtask id that is completed on the
/// existing side is restored verbatim whether the proposed list modified it
/// or dropped it entirely.
pub fn merge_subtasks(
    existing: &[Subtask],
    proposed: Vec<Subtask>,
    warn: &mut impl FnMut(String),
) -> Vec<Subtask> {
    let existing_by_id: HashMap<u32, &Subtask> = existing.iter().map(|s| (s.id, s)).collect();
    let mut protected_ids = HashSet::new();

    let mut result: Vec<Subtask> = proposed
        .into_iter()
        .map(|candidate| match existing_by_id.get(&candidate.id) {
            Some(existing) if existing.status.is_completed() => {
                protected_ids.insert(candidate.id);
                warn(format!(
                    "subtask {} is completed; existing content preserved",
                    candidate.id
                ));
                (*existing).clone()
            }
            _ => candidate,
        })
        .collect();

    for existing_subtask in existing {
        let already_present = result.iter().any(|r| r.id == existing_subtask.id);
        if existing_subtask.status.is_completed()
            && !protected_ids.contains(&existing_subtask.id)
            && !already_present
        {
            warn(format!(
                "subtask {} is completed; restored after removal from agent payload",
                existing_subtask.id
            ));
            result.push(existing_subtask.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::types::TaskStatus;

    fn subtask(id: u32, status: TaskStatus, details: &str) -> Subtask {
        Subtask {
            id,
            title: format!("sub {id}"),
            description: String::new(),
            details: details.to_string(),
            status,
            dependencies: vec![],
        }
    }

    #[test]
    fn completed_subtask_survives_modification() {
        let existing = vec![subtask(2, TaskStatus::Done, "OLD")];
        let proposed = vec![subtask(2, TaskStatus::Pending, "NEW")];
        let mut warnings = vec![];
        let merged = merge_subtasks(&existing, proposed, &mut |w| warnings.push(w));
        assert_eq!(merged[0].details, "OLD");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn completed_subtask_survives_removal() {
        let existing = vec![
            subtask(1, TaskStatus::Pending, "keep-me"),
            subtask(2, TaskStatus::Done, "OLD"),
        ];
        let proposed = vec![subtask(1, TaskStatus::Pending, "keep-me-updated")];
        let mut warnings = vec![];
        let merged = merge_subtasks(&existing, proposed, &mut |w| warnings.push(w));
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|s| s.id == 2 && s.details == "OLD"));
    }

    #[test]
    fn completed_parent_task_is_never_mutated() {
        let existing = Task {
            id: 5,
            title: "done task".to_string(),
            description: "orig".to_string(),
            details: String::new(),
            status: TaskStatus::Done,
            priority: "high".to_string(),
            dependencies: vec![],
            subtasks: vec![],
        };
        let proposed = Task {
            description: "hacked".to_string(),
            ..existing.clone()
        };
        let mut warnings = vec![];
        let merged = merge_task(Some(&existing), proposed, &mut |w| warnings.push(w));
        assert_eq!(merged.description, "orig");
        assert_eq!(warnings.len(), 1);
    }
}
