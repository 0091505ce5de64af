use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One submitted priority from a flat export, with display text normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PriorityRecord {
    pub(crate) faculty_id: u32,
    pub(crate) faculty_name: String,
    pub(crate) email: String,
    pub(crate) role: Option<String>,
    pub(crate) joining_year: i32,
    pub(crate) year_id: u32,
    pub(crate) academic_year: String,
    pub(crate) subject_id: u32,
    pub(crate) subject_name: String,
    pub(crate) subject_code: String,
    pub(crate) subject_type: Option<String>,
    pub(crate) abbreviation: String,
    pub(crate) batch_id: u32,
    pub(crate) section: String,
    pub(crate) student_count: u32,
    pub(crate) priority: u8,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<PriorityRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for record in csv_reader.deserialize::<PriorityRow>() {
        let row = record?;
        let subject_code = normalize_text(&row.subject_code);
        let abbreviation = row
            .abbreviation
            .as_deref()
            .map(normalize_text)
            .unwrap_or_else(|| subject_code.clone());

        records.push(PriorityRecord {
            faculty_id: row.faculty_id,
            faculty_name: normalize_text(&row.faculty_name),
            email: row.email.unwrap_or_default().to_ascii_lowercase(),
            role: row.role,
            joining_year: row.joining_year,
            year_id: row.year_id,
            academic_year: normalize_text(&row.academic_year),
            subject_id: row.subject_id,
            subject_name: normalize_text(&row.subject_name),
            subject_code,
            subject_type: row.subject_type,
            abbreviation,
            batch_id: row.batch_id,
            section: normalize_text(&row.section),
            student_count: row.student_count.unwrap_or(0),
            priority: row.priority,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct PriorityRow {
    #[serde(rename = "Faculty ID")]
    faculty_id: u32,
    #[serde(rename = "Faculty Name")]
    faculty_name: String,
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(rename = "Role", default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(rename = "Joining Year")]
    joining_year: i32,
    #[serde(rename = "Year ID")]
    year_id: u32,
    #[serde(rename = "Academic Year")]
    academic_year: String,
    #[serde(rename = "Subject ID")]
    subject_id: u32,
    #[serde(rename = "Subject Name")]
    subject_name: String,
    #[serde(rename = "Subject Code")]
    subject_code: String,
    #[serde(
        rename = "Subject Type",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    subject_type: Option<String>,
    #[serde(
        rename = "Abbreviation",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    abbreviation: Option<String>,
    #[serde(rename = "Batch ID")]
    batch_id: u32,
    #[serde(rename = "Section")]
    section: String,
    #[serde(rename = "Student Count", default)]
    student_count: Option<u32>,
    #[serde(rename = "Priority")]
    priority: u8,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Collapses internal whitespace runs to one space.
fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
