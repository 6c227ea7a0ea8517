//! `classbatch allocate` — Place eligible students into classes.

use classbatch_config::AppConfig;
use classbatch_core::{
    AllocationReport, AllocationRequest, EducatorId, PlanGroup, RandomSizes, SizeBounds,
};
use std::path::Path;

use super::{load_config, open_store};

/// Command-line overrides for one run.
#[derive(Debug, Default, Clone)]
pub struct AllocateArgs {
    pub min: Option<usize>,
    pub max: Option<usize>,
    pub educator: Option<i64>,
    pub seed: Option<u64>,
    pub dry_run: bool,
    pub json: bool,
}

/// Merge the overrides into the configured request.
fn build_request(config: &AppConfig, args: &AllocateArgs) -> AllocationRequest {
    let mut request = config.allocation_request(args.dry_run);
    if let Some(min) = args.min {
        request.min_size = min;
    }
    if let Some(max) = args.max {
        request.max_size = max;
    }
    if let Some(educator) = args.educator {
        request.educator_id = EducatorId(educator);
    }
    request
}

pub async fn run(
    config_path: Option<&Path>,
    args: AllocateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let request = build_request(&config, &args);
    // Overrides bypass config validation; reject them before the database is opened
    SizeBounds::new(request.min_size, request.max_size)?;
    let store = open_store(&config).await?;

    let report = match args.seed {
        Some(seed) => {
            let mut sizes = RandomSizes::seeded(seed);
            classbatch_core::run_allocation(&store, &request, &mut sizes).await?
        }
        None => {
            let mut sizes = RandomSizes::from_thread_rng();
            classbatch_core::run_allocation(&store, &request, &mut sizes).await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &AllocationReport) {
    if report.committed {
        println!("🏫 Class allocation");
    } else {
        println!("🏫 Class allocation (dry run, nothing written)");
    }
    println!("==================");
    println!("  Size bounds:     {}", report.bounds);
    println!("  Candidates:      {}", report.candidates);
    println!("  Next sequence:   {}", report.registry.next_sequence);

    if report.plan.is_empty() {
        println!("\n  ✅ No eligible students — nothing to do");
        return;
    }

    println!();
    for group in &report.plan.groups {
        println!("  {}", describe_group(group));
    }

    let summary = &report.summary;
    let verb = if report.committed { "Enrolled" } else { "Would enroll" };
    println!(
        "\n  ✅ {verb} {} students: {} new classes, {} reused",
        summary.students_enrolled, summary.classes_created, summary.classes_reused
    );
}

fn describe_group(group: &PlanGroup) -> String {
    match group {
        PlanGroup::Existing {
            name,
            enrolled_before,
            students,
            ..
        } => format!(
            "♻️  {name}: +{} ({enrolled_before} → {})",
            students.len(),
            group.size_after()
        ),
        PlanGroup::New { class, students } => format!(
            "🆕 {}: {} students (expected {})",
            class.name,
            students.len(),
            class.expected_size
        ),
    }
}
