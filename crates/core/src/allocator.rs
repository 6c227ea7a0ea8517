//! Capacity-aware allocator.
//!
//! Walks the candidate list in priority order. Each iteration draws a target
//! size from `[min, max]`; while under-filled generated classes remain, the
//! next one is topped up to that target, otherwise a new class is planned
//! with up to `target` students. Only the last group may end up below `min`,
//! when candidates run out.
//!
//! Size draws go through [`SizeSource`] so tests can script them and CLI runs
//! can be reproduced from a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{AllocationPlan, EducatorId, PlanGroup, StudentId};
use crate::registry::{ClassNaming, RegistrySnapshot};

/// Inclusive class-size bounds with `1 <= min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds", into = "RawBounds")]
pub struct SizeBounds {
    min: usize,
    max: usize,
}

#[derive(Serialize, Deserialize)]
struct RawBounds {
    min: usize,
    max: usize,
}

impl TryFrom<RawBounds> for SizeBounds {
    type Error = Error;

    fn try_from(raw: RawBounds) -> Result<Self> {
        Self::new(raw.min, raw.max)
    }
}

impl From<SizeBounds> for RawBounds {
    fn from(bounds: SizeBounds) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

impl SizeBounds {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min < 1 {
            return Err(Error::configuration(format!(
                "min_size must be at least 1 (got {min})"
            )));
        }
        if min > max {
            return Err(Error::configuration(format!(
                "min_size ({min}) must not exceed max_size ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, size: usize) -> bool {
        (self.min..=self.max).contains(&size)
    }

    fn clamp(&self, size: usize) -> usize {
        size.clamp(self.min, self.max)
    }
}

impl std::fmt::Display for SizeBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Source of per-iteration target sizes.
pub trait SizeSource {
    /// Draw a target size. Values outside `bounds` are clamped by the caller.
    fn draw(&mut self, bounds: SizeBounds) -> usize;
}

impl<S: SizeSource + ?Sized> SizeSource for &mut S {
    fn draw(&mut self, bounds: SizeBounds) -> usize {
        (**self).draw(bounds)
    }
}

/// Uniform draws from a random number generator.
pub struct RandomSizes<R> {
    rng: R,
}

impl<R: Rng> RandomSizes<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomSizes<StdRng> {
    /// Reproducible draws.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Draws seeded from the thread-local generator.
    pub fn from_thread_rng() -> Self {
        Self::new(StdRng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> SizeSource for RandomSizes<R> {
    fn draw(&mut self, bounds: SizeBounds) -> usize {
        self.rng.random_range(bounds.min..=bounds.max)
    }
}

/// Plans how candidates are distributed over reusable and new classes.
#[derive(Debug, Clone)]
pub struct Allocator {
    bounds: SizeBounds,
    educator_id: EducatorId,
    naming: ClassNaming,
}

impl Allocator {
    pub fn new(bounds: SizeBounds, educator_id: EducatorId, naming: ClassNaming) -> Self {
        Self {
            bounds,
            educator_id,
            naming,
        }
    }

    pub fn bounds(&self) -> SizeBounds {
        self.bounds
    }

    /// Build the allocation plan. Pure: reads nothing, writes nothing.
    ///
    /// Fails only when the sequence numbers run out.
    pub fn plan<S: SizeSource + ?Sized>(
        &self,
        candidates: &[StudentId],
        registry: &RegistrySnapshot,
        sizes: &mut S,
    ) -> Result<AllocationPlan> {
        let mut remaining = candidates;
        let mut reusable = registry.reusable.iter();
        let mut next_sequence = registry.next_sequence;
        let mut groups = Vec::new();

        while !remaining.is_empty() {
            let target = self.bounds.clamp(sizes.draw(self.bounds));

            if let Some(class) = reusable.next() {
                let deficit = target.saturating_sub(class.enrolled);
                if deficit == 0 {
                    debug!(
                        class = %class.name,
                        enrolled = class.enrolled,
                        target,
                        "Skipping reusable class already at target"
                    );
                    continue;
                }

                let (taken, rest) = remaining.split_at(deficit.min(remaining.len()));
                debug!(class = %class.name, added = taken.len(), target, "Topping up class");
                groups.push(PlanGroup::Existing {
                    class_id: class.id,
                    name: class.name.clone(),
                    enrolled_before: class.enrolled,
                    students: taken.to_vec(),
                });
                remaining = rest;
            } else {
                let (taken, rest) = remaining.split_at(target.min(remaining.len()));
                let class = self.naming.new_class(next_sequence, self.educator_id, target);
                debug!(class = %class.name, size = taken.len(), target, "Planning new class");
                next_sequence = self.naming.successor(next_sequence)?;
                groups.push(PlanGroup::New {
                    class,
                    students: taken.to_vec(),
                });
                remaining = rest;
            }
        }

        Ok(AllocationPlan {
            groups,
            next_sequence,
        })
    }
}
