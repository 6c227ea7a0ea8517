//! # classbatch Core
//!
//! Domain types, store traits, and the class-allocation pipeline for
//! classbatch. Students who finished their measurement set are grouped into
//! classes of bounded size, reusing under-filled generated classes before
//! new ones are created.
//!
//! ## Design Philosophy
//!
//! The relational store is defined as a trait here ([`ClassStore`]).
//! Implementations live in `classbatch-store`. This keeps the allocator
//! testable against scripted stores and scripted size draws.
//!
//! Pipeline order: [`eligibility`] → [`registry`] → [`allocator`] → [`committer`],
//! wired together by [`pipeline::run_allocation`].

pub mod error;
pub mod model;
pub mod store;
pub mod eligibility;
pub mod registry;
pub mod allocator;
pub mod committer;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result, StoreError};
pub use model::{AllocationPlan, ClassId, CommitSummary, EducatorId, NewClass, PlanGroup, StudentId};
pub use store::{ClassEnrollment, ClassStore, StoreTransaction};
pub use eligibility::EligibilityFilter;
pub use registry::{ClassNaming, GeneratedClass, RegistrySnapshot, ReusableClass};
pub use allocator::{Allocator, RandomSizes, SizeBounds, SizeSource};
pub use committer::commit_plan;
pub use pipeline::{AllocationReport, AllocationRequest, run_allocation};
