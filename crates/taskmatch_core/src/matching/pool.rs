//! Candidate pool selection for one assignment run.
//!
//! Policy, each step only when the previous one leaves the pool short:
//! 1. free members of the project;
//! 2. when there are none, every free candidate;
//! 3. when fewer than `MIN_POOL_SIZE`, top up from free candidates.

use crate::model::directory::{Candidate, ProjectId};
use crate::repo::assignment_repo::AssignmentStore;
use crate::repo::RepoResult;
use std::collections::BTreeSet;

/// Pool size below which the top-up step runs.
pub const MIN_POOL_SIZE: usize = 3;

/// Builds the ordered candidate pool for `project_id`.
///
/// Order: project members by ascending id, followed by top-up candidates by
/// ascending id. Calling this twice over unchanged data returns the same
/// sequence.
pub fn build_pool<S: AssignmentStore + ?Sized>(
    store: &S,
    project_id: ProjectId,
) -> RepoResult<Vec<Candidate>> {
    let mut pool = store.free_candidates_for_project(project_id)?;
    if pool.len() >= MIN_POOL_SIZE {
        return Ok(pool);
    }

    let free = store.free_candidates_global()?;
    if pool.is_empty() {
        // Already the whole free population; nothing left to top up from.
        return Ok(free);
    }

    let mut seen: BTreeSet<_> = pool.iter().map(|candidate| candidate.id).collect();
    for candidate in free {
        if pool.len() >= MIN_POOL_SIZE {
            break;
        }
        if seen.insert(candidate.id) {
            pool.push(candidate);
        }
    }
    Ok(pool)
}
