//! Domain model — identities, allocation plans, and commit summaries.
//!
//! Students, classes, and enrollments live in the store. The only structure
//! owned by this crate is the [`AllocationPlan`]: an ordered list of groups
//! produced by the allocator and consumed once by the committer.

use serde::{Deserialize, Serialize};

/// Identifier of a student row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub i64);

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a class row, assigned by the store on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i64);

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the educator who owns generated classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EducatorId(pub i64);

impl std::fmt::Display for EducatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptor of a class the committer must create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClass {
    /// Sequence number embedded in both name and code
    pub sequence: u64,

    /// Display name, e.g. `Test class 3`
    pub name: String,

    /// Join code; identical to the name for generated classes
    pub code: String,

    /// Owning educator
    pub educator_id: EducatorId,

    /// The target size drawn when the class was planned
    pub expected_size: usize,
}

/// One step of an allocation plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanGroup {
    /// Top up an existing, under-filled class.
    Existing {
        class_id: ClassId,
        name: String,
        /// Enrollment count before this plan is applied
        enrolled_before: usize,
        students: Vec<StudentId>,
    },
    /// Create a class and enroll the students into it.
    New {
        class: NewClass,
        students: Vec<StudentId>,
    },
}

impl PlanGroup {
    pub fn students(&self) -> &[StudentId] {
        match self {
            Self::Existing { students, .. } | Self::New { students, .. } => students,
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            Self::Existing { name, .. } => name,
            Self::New { class, .. } => &class.name,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New { .. })
    }

    /// Class size once this group is applied.
    pub fn size_after(&self) -> usize {
        match self {
            Self::Existing {
                enrolled_before,
                students,
                ..
            } => enrolled_before + students.len(),
            Self::New { students, .. } => students.len(),
        }
    }
}

/// Ordered allocation plan. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub groups: Vec<PlanGroup>,

    /// Sequence number the next generated class will take after this plan
    pub next_sequence: u64,
}

impl AllocationPlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn student_count(&self) -> usize {
        self.groups.iter().map(|g| g.students().len()).sum()
    }

    pub fn new_class_count(&self) -> usize {
        self.groups.iter().filter(|g| g.is_new()).count()
    }

    pub fn reused_class_count(&self) -> usize {
        self.groups.len() - self.new_class_count()
    }

    /// Counts this plan writes when committed.
    pub fn summary(&self) -> CommitSummary {
        CommitSummary {
            students_enrolled: self.student_count(),
            classes_created: self.new_class_count(),
            classes_reused: self.reused_class_count(),
        }
    }

    /// All students in plan order.
    pub fn students(&self) -> impl Iterator<Item = StudentId> + '_ {
        self.groups.iter().flat_map(|g| g.students().iter().copied())
    }
}

/// Counts reported after a plan is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub students_enrolled: usize,
    pub classes_created: usize,
    pub classes_reused: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::RangeInclusive<i64>) -> Vec<StudentId> {
        range.map(StudentId).collect()
    }

    fn sample_plan() -> AllocationPlan {
        AllocationPlan {
            groups: vec![
                PlanGroup::Existing {
                    class_id: ClassId(7),
                    name: "Test class 0".into(),
                    enrolled_before: 2,
                    students: ids(1..=3),
                },
                PlanGroup::New {
                    class: NewClass {
                        sequence: 1,
                        name: "Test class 1".into(),
                        code: "Test class 1".into(),
                        educator_id: EducatorId(1),
                        expected_size: 5,
                    },
                    students: ids(4..=5),
                },
            ],
            next_sequence: 2,
        }
    }

    #[test]
    fn plan_counts() {
        let plan = sample_plan();
        assert_eq!(plan.student_count(), 5);
        assert_eq!(plan.new_class_count(), 1);
        assert_eq!(plan.reused_class_count(), 1);
        assert_eq!(plan.students().collect::<Vec<_>>(), ids(1..=5));
    }

    #[test]
    fn size_after_includes_existing_enrollment() {
        let plan = sample_plan();
        assert_eq!(plan.groups[0].size_after(), 5);
        assert_eq!(plan.groups[1].size_after(), 2);
        assert_eq!(plan.groups[1].class_name(), "Test class 1");
    }

    #[test]
    fn plan_group_serializes_with_kind_tag() {
        let json = serde_json::to_string(&sample_plan().groups[1]).unwrap();
        assert!(json.contains(r#""kind":"new""#));
        assert!(json.contains(r#""students":[4,5]"#));
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(StudentId(42).to_string(), "42");
        assert_eq!(ClassId(3).to_string(), "3");
        assert_eq!(EducatorId(1).to_string(), "1");
    }
}
