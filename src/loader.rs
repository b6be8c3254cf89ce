use crate::assignment::Assignment;
use crate::error::{CfResult, ClassForgeError};
use crate::model::{Gender, Roster, Student};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Gender,
    GoodLanguage,
    TeacherChild,
    Lively,
    SpecialNeeds,
    Friends,
    Conflicts,
}

// Header aliases, already normalised (lowercase, no spaces or underscores, no final sigma)
const ALIASES: &[(&str, Column)] = &[
    ("name", Column::Name),
    ("student", Column::Name),
    ("ονομα", Column::Name),
    ("gender", Column::Gender),
    ("sex", Column::Gender),
    ("φυλο", Column::Gender),
    ("goodlanguage", Column::GoodLanguage),
    ("language", Column::GoodLanguage),
    ("καληγνωσηελληνικων", Column::GoodLanguage),
    ("teacherchild", Column::TeacherChild),
    ("παιδιεκπαιδευτικου", Column::TeacherChild),
    ("lively", Column::Lively),
    ("ζωηροσ", Column::Lively),
    ("specialneeds", Column::SpecialNeeds),
    ("special", Column::SpecialNeeds),
    ("ιδιαιτεροτητα", Column::SpecialNeeds),
    ("friends", Column::Friends),
    ("φιλοι", Column::Friends),
    ("conflicts", Column::Conflicts),
    ("συγκρουση", Column::Conflicts),
];

const YES: &[&str] = &["y", "yes", "true", "1", "ν", "ναι"];
const NO: &[&str] = &["", "n", "no", "false", "0", "ο", "οχι", "όχι"];
const MALE: &[&str] = &["m", "male", "boy", "b", "α"];
const FEMALE: &[&str] = &["f", "female", "girl", "g", "κ"];

pub fn normalize_header(h: &str) -> String {
    h.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .map(|c| if c == 'ς' { 'σ' } else { c })
        .collect()
}

fn column_for(header: &str) -> Option<Column> {
    let key = normalize_header(header);
    ALIASES.iter().find(|(a, _)| *a == key).map(|(_, c)| *c)
}

/// Strict yes/no token table. `None` for anything not in it.
pub fn parse_flag(token: &str) -> Option<bool> {
    let t = token.trim().to_lowercase();
    if YES.contains(&t.as_str()) {
        Some(true)
    } else if NO.contains(&t.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_gender(token: &str) -> Option<Gender> {
    let t = token.trim().to_lowercase();
    if MALE.contains(&t.as_str()) {
        Some(Gender::Male)
    } else if FEMALE.contains(&t.as_str()) {
        Some(Gender::Female)
    } else {
        None
    }
}

/// Accepts `['A', 'B']` style literals or text split on `, | ; / ·` and newlines.
pub fn parse_list(cell: &str) -> Vec<String> {
    let t = cell.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("none") {
        return Vec::new();
    }

    let clean = |s: &str| s.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string();
    let parts: Vec<String> = if t.starts_with('[') && t.ends_with(']') {
        t[1..t.len() - 1].split(',').map(clean).collect()
    } else {
        t.split(|c: char| matches!(c, ',' | '|' | ';' | '/' | '·' | '\n'))
            .map(clean)
            .collect()
    };
    parts.into_iter().filter(|s| !s.is_empty()).collect()
}

fn flag_at(rec: &csv::StringRecord, idx: Option<usize>, row: usize, what: &str) -> CfResult<bool> {
    let Some(i) = idx else { return Ok(false) };
    let raw = rec.get(i).unwrap_or("");
    parse_flag(raw).ok_or_else(|| {
        ClassForgeError::Validation(format!(
            "row {}: '{}' is not a yes/no value for {}",
            row, raw, what
        ))
    })
}

pub fn read_students<R: Read>(reader: R) -> CfResult<Vec<Student>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let find = |col: Column| headers.iter().position(|h| column_for(h) == Some(col));

    let name_idx = find(Column::Name)
        .ok_or_else(|| ClassForgeError::Config("missing required column 'name'".to_string()))?;
    let gender_idx = find(Column::Gender)
        .ok_or_else(|| ClassForgeError::Config("missing required column 'gender'".to_string()))?;
    let language_idx = find(Column::GoodLanguage);
    let teacher_idx = find(Column::TeacherChild);
    let lively_idx = find(Column::Lively);
    let special_idx = find(Column::SpecialNeeds);
    let friends_idx = find(Column::Friends);
    let conflicts_idx = find(Column::Conflicts);

    let mut students = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let rec = result?;
        let row = i + 2; // header is row 1

        let name = rec.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            debug!("Skipping row {} without a name", row);
            continue;
        }
        let raw_gender = rec.get(gender_idx).unwrap_or("");
        let gender = parse_gender(raw_gender).ok_or_else(|| {
            ClassForgeError::Validation(format!("row {}: unknown gender '{}'", row, raw_gender))
        })?;

        let list_at = |idx: Option<usize>| {
            idx.and_then(|i| rec.get(i))
                .map(parse_list)
                .unwrap_or_default()
        };

        students.push(Student {
            name: name.to_string(),
            gender,
            good_language: flag_at(&rec, language_idx, row, "good_language")?,
            teacher_child: flag_at(&rec, teacher_idx, row, "teacher_child")?,
            lively: flag_at(&rec, lively_idx, row, "lively")?,
            special_needs: flag_at(&rec, special_idx, row, "special_needs")?,
            friends: list_at(friends_idx),
            conflicts: list_at(conflicts_idx),
        });
    }
    Ok(students)
}

pub fn read_roster<R: Read>(reader: R) -> CfResult<Roster> {
    Roster::new(read_students(reader)?)
}

pub fn load_roster<P: AsRef<Path>>(path: P) -> CfResult<Roster> {
    let file = File::open(path.as_ref())?;
    let roster = read_roster(file)?;
    info!("Loaded {} students from {}", roster.len(), path.as_ref().display());
    Ok(roster)
}

/// Reads a `name,section` table into an assignment. Empty section cells
/// leave the student unplaced; students missing from the file are unplaced.
pub fn read_assignment<R: Read>(
    reader: R,
    roster: &Roster,
    labels: &[String],
) -> CfResult<Assignment> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(|h| column_for(h) == Some(Column::Name))
        .ok_or_else(|| {
            ClassForgeError::Config("assignment file needs a 'name' column".to_string())
        })?;
    let section_idx = headers
        .iter()
        .position(|h| matches!(normalize_header(h).as_str(), "section" | "class" | "τμημα"))
        .ok_or_else(|| {
            ClassForgeError::Config("assignment file needs a 'section' column".to_string())
        })?;

    let mut assignment = Assignment::new(roster.len(), labels.len());
    for result in rdr.records() {
        let rec = result?;
        let name = rec.get(name_idx).unwrap_or("").trim();
        let label = rec.get(section_idx).unwrap_or("").trim();
        if name.is_empty() || label.is_empty() {
            continue;
        }
        let id = roster
            .id_of(name)
            .ok_or_else(|| ClassForgeError::Validation(format!("unknown student '{}'", name)))?;
        let sec = labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| {
                ClassForgeError::Validation(format!("unknown section '{}' for '{}'", label, name))
            })?;
        assignment.place(id, sec, None);
    }
    Ok(assignment)
}

pub fn load_assignment<P: AsRef<Path>>(
    path: P,
    roster: &Roster,
    labels: &[String],
) -> CfResult<Assignment> {
    let file = File::open(path)?;
    read_assignment(file, roster, labels)
}
