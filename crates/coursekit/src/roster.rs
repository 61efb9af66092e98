//! Course roster input: the student CSV and the folder-structure file.
//!
//! The roster is a CSV file with a header row containing `name` and `github_link` columns; other
//! columns are ignored. The structure file lists one folder path per line.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum RosterError {
    Io { path: PathBuf, source: std::io::Error },
    Csv(csv::Error),
    MissingColumn(&'static str),
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            RosterError::Csv(e) => write!(f, "malformed roster: {e}"),
            RosterError::MissingColumn(c) => write!(f, "roster is missing the {c:?} column"),
        }
    }
}

impl std::error::Error for RosterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterError::Io { source, .. } => Some(source),
            RosterError::Csv(e) => Some(e),
            RosterError::MissingColumn(_) => None,
        }
    }
}

impl From<csv::Error> for RosterError {
    fn from(err: csv::Error) -> Self {
        RosterError::Csv(err)
    }
}

pub type Result<T> = std::result::Result<T, RosterError>;

/// One roster row, with surrounding whitespace trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Student {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub github_link: String,
}

impl Student {
    /// The GitHub username from the row's profile link, if it has a usable one.
    pub fn username(&self) -> Option<&str> {
        parse_github_username(&self.github_link)
    }

    /// The repository name for this student.
    pub fn repo_name(&self, prefix: Option<&str>) -> String {
        repo_name(prefix, &self.name)
    }
}

/// Read roster rows from CSV input.
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<Student>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    for column in ["name", "github_link"] {
        if !headers.iter().any(|h| h == column) {
            return Err(RosterError::MissingColumn(column));
        }
    }

    reader
        .deserialize::<Student>()
        .map(|row| row.map_err(RosterError::from))
        .collect()
}

/// Read roster rows from a CSV file.
pub fn read_roster_file(path: &Path) -> Result<Vec<Student>> {
    let file = std::fs::File::open(path).map_err(|source| RosterError::Io {
        path: path.to_owned(),
        source,
    })?;
    read_roster(file)
}

lazy_static! {
    static ref GITHUB_USER_PATTERN: Regex =
        Regex::new(r"github\.com/([^/?#\s]+)").expect("github username regex should compile");
}

/// Extract the username from a GitHub profile link such as `https://github.com/octocat`.
pub fn parse_github_username(github_link: &str) -> Option<&str> {
    GITHUB_USER_PATTERN
        .captures(github_link.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Collapse whitespace runs to underscores and lowercase, e.g. `Ada  Lovelace` -> `ada_lovelace`.
pub fn normalize_student_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// `<prefix>-<normalized name>`, or just the normalized name without a prefix.
pub fn repo_name(prefix: Option<&str>, student_name: &str) -> String {
    let normalized = normalize_student_name(student_name);
    match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}-{normalized}"),
        None => normalized,
    }
}

/// Parse folder-structure text: one folder per non-blank line, with surrounding whitespace and
/// slashes removed.
pub fn parse_structure(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_matches('/'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_structure(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse_structure(&text))
}
