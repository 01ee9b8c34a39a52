use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::cli::RepositoryRef;
use crate::error::PreconditionError;

const PAIR_SEPARATOR: &str = "::";
const COMMENT_PREFIX: char = '#';

/// One line of the job list: move `source` to `target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub source: RepositoryRef,
    pub target: RepositoryRef,
}

impl JobRecord {
    pub fn new(source: RepositoryRef, target: RepositoryRef) -> Self {
        JobRecord { source, target }
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Which line shape the job list uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobGrammar {
    /// `owner/name::owner/name`
    Pair,
    /// `owner/name`, landing under `target_owner` when set, otherwise in place.
    Single { target_owner: Option<String> },
    /// Pair lines as written; single lines land under `target_owner`.
    Mixed { target_owner: String },
}

impl JobGrammar {
    pub fn parse(&self, line: &str) -> Option<JobRecord> {
        match self {
            JobGrammar::Pair => parse_pair(line),
            JobGrammar::Single { target_owner } => parse_single(line, target_owner.as_deref()),
            JobGrammar::Mixed { target_owner } => {
                if line.contains(PAIR_SEPARATOR) {
                    parse_pair(line)
                } else {
                    parse_single(line, Some(target_owner))
                }
            }
        }
    }
}

fn parse_pair(line: &str) -> Option<JobRecord> {
    let (source, target) = line.split_once(PAIR_SEPARATOR)?;
    Some(JobRecord::new(
        parse_repository(source)?,
        parse_repository(target)?,
    ))
}

fn parse_single(line: &str, target_owner: Option<&str>) -> Option<JobRecord> {
    let source = parse_repository(line)?;
    let target = match target_owner {
        Some(owner) => RepositoryRef::new(owner, source.name.clone()),
        None => source.clone(),
    };
    Some(JobRecord::new(source, target))
}

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("identifier pattern"))
}

pub fn is_identifier(value: &str) -> bool {
    value != "." && value != ".." && identifier().is_match(value)
}

fn parse_repository(value: &str) -> Option<RepositoryRef> {
    let (owner, name) = value.split_once('/')?;

    if is_identifier(owner) && is_identifier(name) {
        Some(RepositoryRef::new(owner, name))
    } else {
        None
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    pub line_number: usize,
    pub line: String,
}

impl fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: skipping invalid line `{}`", self.line_number, self.line)
    }
}

#[derive(Debug, Error)]
pub enum JobListError {
    #[error("{0}")]
    Malformed(MalformedLine),

    #[error("could not read job list")]
    Io(#[from] std::io::Error),
}

/// Lazily reads job records from a line-oriented source.
///
/// Blank lines and `#` comments are skipped silently; lines that do not match the grammar are
/// yielded once as [`JobListError::Malformed`]. A read error ends the sequence.
pub struct JobReader<R> {
    lines: Lines<R>,
    grammar: JobGrammar,
    line_number: usize,
    finished: bool,
}

impl JobReader<BufReader<File>> {
    pub fn open(path: &Path, grammar: JobGrammar) -> Result<Self, PreconditionError> {
        if !path.exists() {
            return Err(PreconditionError::JobFileMissing(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|source| PreconditionError::JobFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(JobReader::from_reader(BufReader::new(file), grammar))
    }
}

impl<R: BufRead> JobReader<R> {
    pub fn from_reader(reader: R, grammar: JobGrammar) -> Self {
        JobReader {
            lines: reader.lines(),
            grammar,
            line_number: 0,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for JobReader<R> {
    type Item = Result<JobRecord, JobListError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let raw = match self.lines.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(error)) => {
                    self.finished = true;
                    return Some(Err(JobListError::Io(error)));
                }
                Some(Ok(raw)) => raw,
            };
            self.line_number += 1;

            let line = raw.trim();
            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }

            return Some(self.grammar.parse(line).ok_or_else(|| {
                JobListError::Malformed(MalformedLine {
                    line_number: self.line_number,
                    line: line.to_string(),
                })
            }));
        }

        None
    }
}
