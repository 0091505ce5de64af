use std::sync::Arc;

use timetable_allocation::workflows::allocation::{
    AllocationEngine, FacultyId, InMemoryAllocationStore, PriorityCatalog, SubjectType, YearId,
};
use timetable_allocation::workflows::import::{PriorityCsvImporter, PriorityImportError};

const EXPORT: &[u8] = include_bytes!("../fixtures/faculty_priorities.csv");

#[test]
fn importer_reads_the_full_export() {
    let catalog = PriorityCsvImporter::from_reader(EXPORT).expect("export imports");

    assert_eq!(catalog.years(), vec![YearId(1), YearId(2)]);
    assert_eq!(catalog.roster.entry_count(YearId(1)), 19);
    assert_eq!(catalog.directory.faculty_profiles().count(), 7);

    let lab = catalog
        .directory
        .subject_details(timetable_allocation::workflows::allocation::SubjectId(15))
        .expect("lab subject present");
    assert_eq!(lab.subject_type, SubjectType::Lab);
    assert_eq!(lab.abbreviation, "DSL");

    let order: Vec<u32> = catalog
        .roster
        .faculty_with_priorities(YearId(1))
        .expect("roster read")
        .iter()
        .map(|member| member.faculty_id.0)
        .collect();
    assert_eq!(order, vec![7, 3, 1, 4, 5, 2, 6]);
}

#[test]
fn imported_catalog_allocates_by_seniority() {
    let catalog = PriorityCsvImporter::from_reader(EXPORT).expect("export imports");
    let engine = AllocationEngine::new(
        Arc::new(catalog.roster),
        Arc::new(InMemoryAllocationStore::new()),
        Arc::new(catalog.directory),
    );

    let result = engine.allocate_subjects(YearId(1)).expect("run succeeds");

    let awarded: Vec<(u32, u32, u32, u8)> = result
        .allocations
        .iter()
        .map(|detail| {
            (
                detail.faculty_id.0,
                detail.subject_id.0,
                detail.batch_id.0,
                detail.allocated_priority.get(),
            )
        })
        .collect();
    assert_eq!(
        awarded,
        vec![
            (1, 11, 1, 1),
            (2, 12, 1, 1),
            (3, 13, 1, 3),
            (4, 14, 1, 1),
            (5, 15, 1, 2),
            (7, 10, 1, 1),
        ]
    );
    assert_eq!(result.unallocated, vec![FacultyId(6)]);
    assert_eq!(result.allocations[5].faculty_name, "Gauri Kulkarni");
    assert_eq!(result.allocations[5].academic_year, "2024-2025");

    let next_year = engine.allocate_subjects(YearId(2)).expect("run succeeds");
    assert_eq!(next_year.total_allocations, 2);
    assert_eq!(next_year.allocations[1].subject_code, "CS302");
    assert_eq!(next_year.allocations[1].allocated_priority.get(), 2);
}

#[test]
fn importer_rejects_gapped_rankings() {
    let csv = "Faculty ID,Faculty Name,Email,Role,Joining Year,Year ID,Academic Year,Subject ID,Subject Name,Subject Code,Subject Type,Abbreviation,Batch ID,Section,Student Count,Priority\n\
1,Anand Iyer,,,2015,1,2024-2025,10,Data Structures,CS201,CORE,DS,1,A,60,1\n\
1,Anand Iyer,,,2015,1,2024-2025,11,Operating Systems,CS301,CORE,OS,1,A,60,4\n";

    let error = PriorityCsvImporter::from_reader(csv.as_bytes()).expect_err("gap in levels");

    match error {
        PriorityImportError::Submission { faculty_id, .. } => {
            assert_eq!(faculty_id, FacultyId(1));
        }
        other => panic!("expected submission error, got {other:?}"),
    }
}
