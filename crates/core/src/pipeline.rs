//! Allocation pipeline: eligibility → registry → allocator → committer.
//!
//! Bounds are validated before the store is touched. Runs are sequential and
//! assume exclusive access to the store between the registry read and the
//! commit.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allocator::{Allocator, SizeBounds, SizeSource};
use crate::committer::commit_plan;
use crate::eligibility::{self, EligibilityFilter};
use crate::error::Result;
use crate::model::{AllocationPlan, CommitSummary, EducatorId};
use crate::registry::{self, ClassNaming, RegistrySnapshot};
use crate::store::ClassStore;

/// Everything one allocation run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub min_size: usize,
    pub max_size: usize,
    pub educator_id: EducatorId,
    #[serde(default)]
    pub naming: ClassNaming,
    #[serde(default)]
    pub eligibility: EligibilityFilter,
    /// Plan only; do not write anything
    #[serde(default)]
    pub dry_run: bool,
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    pub bounds: SizeBounds,
    pub candidates: usize,
    pub registry: RegistrySnapshot,
    pub plan: AllocationPlan,
    /// Written counts, or the counts the plan would write on a dry run
    pub summary: CommitSummary,
    pub committed: bool,
}

/// Run the full pipeline against `store`, drawing group sizes from `sizes`.
pub async fn run_allocation<S: SizeSource + ?Sized>(
    store: &dyn ClassStore,
    request: &AllocationRequest,
    sizes: &mut S,
) -> Result<AllocationReport> {
    let bounds = SizeBounds::new(request.min_size, request.max_size)?;
    info!(
        backend = store.name(),
        %bounds,
        educator = %request.educator_id,
        dry_run = request.dry_run,
        "Starting class allocation"
    );

    let candidates = eligibility::eligible_students(store, &request.eligibility).await?;
    let registry = registry::read_registry(store, &request.naming, bounds.min()).await?;

    let allocator = Allocator::new(bounds, request.educator_id, request.naming.clone());
    let plan = allocator.plan(&candidates, &registry, sizes)?;
    info!(
        "Planned {} groups: {} new classes, {} reused",
        plan.groups.len(),
        plan.new_class_count(),
        plan.reused_class_count()
    );

    let (summary, committed) = if request.dry_run {
        (plan.summary(), false)
    } else {
        (commit_plan(store, &plan).await?, true)
    };

    Ok(AllocationReport {
        bounds,
        candidates: candidates.len(),
        registry,
        plan,
        summary,
        committed,
    })
}
