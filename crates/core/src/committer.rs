//! Persistence committer — applies an allocation plan in one transaction.
//!
//! New classes are inserted first so their store-assigned id can be used for
//! the enrollment rows. Any failure rolls the whole transaction back; a plan
//! is never partially applied and nothing is retried.

use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::model::{AllocationPlan, CommitSummary, PlanGroup};
use crate::store::{ClassStore, StoreTransaction};

/// Apply `plan` atomically and report what was written.
///
/// An empty plan is a no-op and does not open a transaction.
pub async fn commit_plan(store: &dyn ClassStore, plan: &AllocationPlan) -> Result<CommitSummary> {
    if plan.is_empty() {
        debug!("Empty allocation plan, nothing to commit");
        return Ok(CommitSummary::default());
    }

    let mut tx = store.begin().await?;
    match apply(tx.as_mut(), plan).await {
        Ok(summary) => {
            tx.commit().await?;
            info!(
                "Committed {} enrollments ({} new classes, {} reused)",
                summary.students_enrolled, summary.classes_created, summary.classes_reused
            );
            Ok(summary)
        }
        Err(e) => {
            warn!("Allocation commit failed, rolling back: {e}");
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback failed: {rollback_err}");
            }
            Err(e.into())
        }
    }
}

async fn apply(
    tx: &mut dyn StoreTransaction,
    plan: &AllocationPlan,
) -> std::result::Result<CommitSummary, StoreError> {
    let mut summary = CommitSummary::default();

    for group in &plan.groups {
        match group {
            PlanGroup::Existing {
                class_id, students, ..
            } => {
                tx.enroll(*class_id, students).await?;
                summary.classes_reused += 1;
                debug!(class_id = %class_id, added = students.len(), "Enrolled into existing class");
            }
            PlanGroup::New { class, students } => {
                let class_id = tx.create_class(class).await?;
                tx.enroll(class_id, students).await?;
                summary.classes_created += 1;
                debug!(class_id = %class_id, name = %class.name, size = students.len(), "Created class");
            }
        }
        summary.students_enrolled += group.students().len();
    }

    if summary.classes_created > 0 {
        tx.advance_sequence(plan.next_sequence).await?;
    }

    Ok(summary)
}
