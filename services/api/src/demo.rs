use crate::infra::{parse_year, AllocationServices};
use clap::Args;
use std::path::PathBuf;
use timetable_allocation::error::AppError;
use timetable_allocation::workflows::allocation::{
    AcademicYear, AllocationReassignment, AllocationResult, AllocationServiceError,
    AllocationYearView, BatchDetails, BatchId, DirectorySnapshot, FacultyId, FacultyProfile,
    FacultyRole, PriorityRoster, PrioritySubmission, SubjectDetails, SubjectId, SubjectType,
    SubmittedPriority, YearId,
};
use timetable_allocation::workflows::import::{ImportedCatalog, PriorityCsvImporter};

const DEMO_YEAR: YearId = YearId(1);

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Priority export (CSV) holding submissions and directory columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Academic year id to allocate
    #[arg(long, value_parser = crate::infra::parse_year)]
    pub(crate) year: YearId,
    /// Print the allocation result as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional priority export to allocate instead of the built-in department.
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Year to allocate when a CSV export is supplied (defaults to its first year).
    #[arg(long, value_parser = parse_year)]
    pub(crate) year: Option<YearId>,
    /// Skip the manual reassignment portion of the demo.
    #[arg(long)]
    pub(crate) skip_reassignment: bool,
}

pub(crate) fn run_allocation(args: AllocateArgs) -> Result<(), AppError> {
    let AllocateArgs { csv, year, json } = args;

    let catalog = PriorityCsvImporter::from_path(&csv)?;
    let label = year_label(&catalog.directory, year);
    let services = AllocationServices::from_catalog(catalog, None);
    let result = services.engine.allocate_subjects(year)?;

    if json {
        let payload = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
        println!("{payload}");
    } else {
        println!("Subject allocation for {label}");
        render_allocation_result(&result);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        csv,
        year,
        skip_reassignment,
    } = args;

    let (services, year) = match csv {
        Some(path) => {
            let catalog = PriorityCsvImporter::from_path(&path)?;
            let year = year
                .or_else(|| catalog.years().first().copied())
                .unwrap_or(DEMO_YEAR);
            println!("Subject allocation demo");
            println!("Data source: {}", path.display());
            (AllocationServices::from_catalog(catalog, None), year)
        }
        None => {
            println!("Subject allocation demo");
            println!("Data source: built-in department (no CSV provided)");
            (seed_demo_services(), DEMO_YEAR)
        }
    };

    let label = year_label(services.engine.directory(), year);
    println!("Academic year: {label}");

    let result = services.engine.allocate_subjects(year)?;
    println!("\nAllocation run");
    render_allocation_result(&result);

    println!("\nAllocations by batch");
    let views = services.engine.allocations_by_batch(year)?;
    if views.is_empty() {
        println!("  (nothing allocated)");
    }
    for view in &views {
        render_year_view(view);
    }

    if skip_reassignment {
        return Ok(());
    }

    let Some(first) = result.allocations.first() else {
        return Ok(());
    };
    let replacement = services
        .engine
        .directory()
        .faculty_profiles()
        .map(|profile| profile.faculty_id)
        .find(|faculty_id| *faculty_id != first.faculty_id);
    let Some(replacement) = replacement else {
        return Ok(());
    };

    println!("\nManual reassignment");
    let updated = services.engine.reassign(
        first.allocation_id,
        AllocationReassignment {
            faculty_id: replacement,
            co_faculty_id: Some(first.faculty_id),
            venue: Some("Lab Complex 2".to_string()),
        },
    )?;
    println!(
        "  Allocation {} ({} / batch {}) now taught by {} with {} assisting",
        updated.allocation_id.0,
        first.subject_code,
        first.batch_section,
        replacement,
        first.faculty_id
    );

    let rerun = services.engine.allocate_subjects(year)?;
    println!(
        "  Re-running the year recomputes {} allocations and discards the manual edit",
        rerun.total_allocations
    );
    println!(
        "  Records held by the store: {}",
        services
            .store
            .len()
            .map_err(AllocationServiceError::Persistence)?
    );

    Ok(())
}

/// Department with one contested first choice, one fallback and one faculty left out.
fn seed_demo_services() -> AllocationServices {
    let directory = demo_directory();
    let catalog = ImportedCatalog {
        roster: PriorityRoster::new(),
        directory,
    };
    let services = AllocationServices::from_catalog(catalog, None);

    let submissions: [(u32, &[(u32, u32)]); 4] = [
        (1, &[(10, 1), (11, 1)]),
        (2, &[(10, 1), (12, 1), (11, 1)]),
        (3, &[(11, 1), (13, 1)]),
        (4, &[(10, 1), (11, 1), (12, 1)]),
    ];
    for (faculty, choices) in submissions {
        let submission = PrioritySubmission {
            faculty_id: FacultyId(faculty),
            year_id: DEMO_YEAR,
            priorities: choices
                .iter()
                .zip(1u8..)
                .map(|(&(subject, batch), priority)| SubmittedPriority {
                    subject_id: SubjectId(subject),
                    batch_id: BatchId(batch),
                    priority,
                })
                .collect(),
        };
        match services.intake.submit(submission) {
            Ok(receipt) => println!(
                "  {} submitted {} priorities",
                receipt.faculty_id, receipt.accepted
            ),
            Err(err) => println!("  Submission rejected: {}", err),
        }
    }

    services
}

fn demo_directory() -> DirectorySnapshot {
    let faculty = [
        (1, "Anand Iyer", FacultyRole::Faculty, 2012),
        (2, "Bhavna Nair", FacultyRole::Admin, 2016),
        (3, "Chitra Rao", FacultyRole::TimetableCoordinator, 2019),
        (4, "Deepak Menon", FacultyRole::Faculty, 2022),
    ];
    let subjects = [
        (10, "Data Structures", "CS201", SubjectType::Core, "DS"),
        (11, "Operating Systems", "CS301", SubjectType::Core, "OS"),
        (12, "Computer Networks", "CS302", SubjectType::Core, "CN"),
        (13, "Machine Learning", "CS451", SubjectType::Elective, "ML"),
    ];

    let mut directory = DirectorySnapshot::new()
        .with_year(AcademicYear {
            year_id: DEMO_YEAR,
            label: "2024-2025".to_string(),
        })
        .with_batch(BatchDetails {
            batch_id: BatchId(1),
            section: "A".to_string(),
            student_count: 60,
        });
    for (id, name, role, joining_year) in faculty {
        directory.insert_faculty(FacultyProfile {
            faculty_id: FacultyId(id),
            name: name.to_string(),
            email: format!(
                "{}@college.test",
                name.to_ascii_lowercase().replace(' ', ".")
            ),
            role,
            joining_year,
        });
    }
    for (id, name, code, subject_type, abbreviation) in subjects {
        directory.insert_subject(SubjectDetails {
            subject_id: SubjectId(id),
            name: name.to_string(),
            code: code.to_string(),
            subject_type,
            abbreviation: abbreviation.to_string(),
        });
    }
    directory
}

fn year_label(directory: &DirectorySnapshot, year: YearId) -> String {
    directory
        .year(year)
        .map(|year| year.label.clone())
        .unwrap_or_else(|| year.to_string())
}

pub(crate) fn render_allocation_result(result: &AllocationResult) {
    if result.allocations.is_empty() {
        println!("  No priorities were submitted for this year");
        return;
    }

    println!("  Total allocations: {}", result.total_allocations);
    for detail in &result.allocations {
        println!(
            "  - {:<18} {:<8} {:<28} batch {:<3} (choice #{})",
            detail.faculty_name,
            detail.subject_code,
            detail.subject_name,
            detail.batch_section,
            detail.allocated_priority.get()
        );
    }

    if result.unallocated.is_empty() {
        println!("  Every faculty member received a subject");
    } else {
        println!("  Outranked on every choice:");
        for faculty_id in &result.unallocated {
            println!("  - {}", faculty_id);
        }
    }
}

fn render_year_view(view: &AllocationYearView) {
    println!("  {} ({})", view.year, view.year_id);
    for batch in view.batches.values() {
        println!(
            "  Batch {} ({} students)",
            batch.section, batch.student_count
        );
        for subject in batch.subjects.values() {
            let venue = subject.venue.as_deref().unwrap_or("unassigned");
            println!(
                "    {:<6} {:<28} {:<18} venue: {}",
                subject.abbreviation,
                subject.subject_name,
                subject.allocated_faculty.name,
                venue
            );
        }
    }
}
