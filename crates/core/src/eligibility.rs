//! Eligibility query — which students may be placed into a class.
//!
//! A student is eligible when they completed every required measurement
//! (all five value fields present), belong to the configured cohort, are
//! not on the team-member disallow list, and hold no enrollment yet.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::model::StudentId;
use crate::store::ClassStore;

/// Predicates applied by [`ClassStore::eligible_students`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityFilter {
    /// Only consider students with the cohort `seed` flag set
    #[serde(default = "default_true")]
    pub require_seed: bool,

    /// Team members never placed into generated classes
    #[serde(default)]
    pub excluded_team_members: Vec<String>,

    /// Number of fully measured galaxies a student needs
    #[serde(default = "default_required_measurements")]
    pub required_measurements: u32,
}

fn default_true() -> bool {
    true
}
fn default_required_measurements() -> u32 {
    5
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self {
            require_seed: true,
            excluded_team_members: vec![],
            required_measurements: default_required_measurements(),
        }
    }
}

impl EligibilityFilter {
    /// Whether a team-member tag passes the disallow list.
    pub fn admits_team_member(&self, team_member: Option<&str>) -> bool {
        match team_member {
            Some(member) => !self.excluded_team_members.iter().any(|m| m == member),
            None => true,
        }
    }
}

/// Fetch the ordered candidate list. The order is the assignment priority.
pub async fn eligible_students(
    store: &dyn ClassStore,
    filter: &EligibilityFilter,
) -> Result<Vec<StudentId>> {
    debug!(
        backend = store.name(),
        require_seed = filter.require_seed,
        excluded = filter.excluded_team_members.len(),
        "Querying eligible students"
    );
    let students = store.eligible_students(filter).await?;
    info!("{} eligible students without a class", students.len());
    Ok(students)
}
