//! Migration discovery and file parsing
//!
//! Files are named `<version>[_<name>].sql` and split into sections by
//! annotation comments:
//!
//! ```sql
//! -- +goose Up
//! CREATE TABLE users (...);
//!
//! -- +goose Down
//! DROP TABLE users;
//! ```
//!
//! `-- +migrate` works the same as `-- +goose`. `NO TRANSACTION` marks the
//! script as non-transactional.
//!
//! Each section is split into statements at lines ending in `;`. Wrap
//! anything that contains its own semicolons (function bodies, `DO` blocks)
//! in `StatementBegin` / `StatementEnd` to keep it as one statement.

use std::fs;
use std::path::{Path, PathBuf};

use super::MigrateError;

/// A single migration script loaded from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub path: PathBuf,
    /// Statements of the Up section, in file order
    pub up: Vec<String>,
    /// Statements of the Down section; empty when there is none
    pub down: Vec<String>,
    /// Run the up/down body outside a transaction
    pub no_transaction: bool,
}

impl Migration {
    /// Human readable identifier, e.g. `001_create_users`
    pub fn label(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}_{}", self.version, self.name))
    }
}

/// Load every `*.sql` migration in `dir`, sorted by version.
///
/// Sub-directories and files with other extensions are skipped.
pub fn discover(dir: &Path) -> Result<Vec<Migration>, MigrateError> {
    let entries = fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;

    let mut migrations = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MigrateError::io(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }

        let contents = fs::read_to_string(&path).map_err(|e| MigrateError::io(&path, e))?;
        migrations.push(parse_migration(&path, &contents)?);
    }

    sort_migrations(migrations)
}

/// Parse one migration from its path and contents
pub fn parse_migration(path: &Path, contents: &str) -> Result<Migration, MigrateError> {
    let (version, name) = parse_file_name(path)?;
    let sections = parse_sections(path, contents)?;

    Ok(Migration {
        version,
        name,
        path: path.to_path_buf(),
        up: sections.up,
        down: sections.down,
        no_transaction: sections.no_transaction,
    })
}

/// Sort by version and reject duplicates
pub(crate) fn sort_migrations(
    mut migrations: Vec<Migration>,
) -> Result<Vec<Migration>, MigrateError> {
    migrations.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));

    if let Some(pair) = migrations
        .windows(2)
        .find(|pair| pair[0].version == pair[1].version)
    {
        return Err(MigrateError::DuplicateVersion {
            version: pair[0].version,
            first: pair[0].path.clone(),
            second: pair[1].path.clone(),
        });
    }

    Ok(migrations)
}

fn parse_file_name(path: &Path) -> Result<(i64, String), MigrateError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| MigrateError::invalid_file_name(path, "file name is not valid UTF-8"))?;

    let (digits, name) = stem.split_once('_').unwrap_or((stem, ""));
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MigrateError::invalid_file_name(
            path,
            "expected a numeric version prefix, e.g. 001_create_users.sql",
        ));
    }

    let version = digits
        .parse::<i64>()
        .map_err(|_| MigrateError::invalid_file_name(path, "version prefix is out of range"))?;

    Ok((version, name.to_owned()))
}

#[derive(Debug, Default)]
struct Sections {
    up: Vec<String>,
    down: Vec<String>,
    no_transaction: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Annotation {
    Up,
    Down,
    NoTransaction,
    StatementBegin,
    StatementEnd,
    Unknown(String),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Accumulates one section's lines into statements
#[derive(Debug, Default)]
struct StatementSplitter {
    statements: Vec<String>,
    buffer: Vec<String>,
    in_block: bool,
}

impl StatementSplitter {
    fn push_line(&mut self, line: &str) {
        self.buffer.push(line.to_owned());
        if !self.in_block && !is_comment(line) && line.trim_end().ends_with(';') {
            self.flush();
        }
    }

    fn begin_block(&mut self) -> Result<(), &'static str> {
        if self.in_block {
            return Err("nested StatementBegin");
        }
        self.flush();
        self.in_block = true;
        Ok(())
    }

    fn end_block(&mut self) -> Result<(), &'static str> {
        if !self.in_block {
            return Err("StatementEnd without StatementBegin");
        }
        self.in_block = false;
        self.flush();
        Ok(())
    }

    fn flush(&mut self) {
        let has_sql = self
            .buffer
            .iter()
            .any(|line| !line.trim().is_empty() && !is_comment(line));
        if has_sql {
            self.statements.push(self.buffer.join("\n").trim().to_owned());
        }
        self.buffer.clear();
    }

    fn finish(mut self) -> Result<Vec<String>, &'static str> {
        if self.in_block {
            return Err("StatementBegin without StatementEnd");
        }
        self.flush();
        Ok(self.statements)
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("--")
}

fn parse_sections(path: &Path, contents: &str) -> Result<Sections, MigrateError> {
    let mut up: Option<StatementSplitter> = None;
    let mut down: Option<StatementSplitter> = None;
    let mut current = Section::Preamble;
    let mut no_transaction = false;

    for line in contents.lines() {
        let annotation = parse_annotation(line);

        let splitter = match current {
            Section::Preamble => None,
            Section::Up => up.as_mut(),
            Section::Down => down.as_mut(),
        };
        if matches!(annotation, Some(Annotation::Up | Annotation::Down))
            && splitter.as_ref().is_some_and(|s| s.in_block)
        {
            return Err(MigrateError::parse(path, "StatementBegin without StatementEnd"));
        }

        match annotation {
            Some(Annotation::Up) => {
                if up.is_some() {
                    return Err(MigrateError::parse(path, "duplicate Up section"));
                }
                up = Some(StatementSplitter::default());
                current = Section::Up;
            }
            Some(Annotation::Down) => {
                if down.is_some() {
                    return Err(MigrateError::parse(path, "duplicate Down section"));
                }
                down = Some(StatementSplitter::default());
                current = Section::Down;
            }
            Some(Annotation::NoTransaction) => no_transaction = true,
            Some(Annotation::StatementBegin) => splitter
                .ok_or_else(|| MigrateError::parse(path, "StatementBegin outside Up/Down"))?
                .begin_block()
                .map_err(|reason| MigrateError::parse(path, reason))?,
            Some(Annotation::StatementEnd) => splitter
                .ok_or_else(|| MigrateError::parse(path, "StatementEnd outside Up/Down"))?
                .end_block()
                .map_err(|reason| MigrateError::parse(path, reason))?,
            Some(Annotation::Unknown(directive)) => {
                return Err(MigrateError::parse(
                    path,
                    format!("unknown annotation '{}'", directive),
                ));
            }
            None => {
                if let Some(splitter) = splitter {
                    splitter.push_line(line);
                }
            }
        }
    }

    let up = up.ok_or_else(|| MigrateError::parse(path, "missing '-- +goose Up' section"))?;

    Ok(Sections {
        up: up.finish().map_err(|reason| MigrateError::parse(path, reason))?,
        down: down
            .map(StatementSplitter::finish)
            .transpose()
            .map_err(|reason| MigrateError::parse(path, reason))?
            .unwrap_or_default(),
        no_transaction,
    })
}

/// Recognise `-- +goose <directive>` / `-- +migrate <directive>`.
/// Any other line, including ordinary SQL comments, returns `None`.
fn parse_annotation(line: &str) -> Option<Annotation> {
    let rest = line.trim().strip_prefix("--")?.trim_start();
    let rest = rest.strip_prefix('+')?;
    let (tool, directive) = rest.split_once(char::is_whitespace)?;

    if !tool.eq_ignore_ascii_case("goose") && !tool.eq_ignore_ascii_case("migrate") {
        return None;
    }

    let normalized = directive
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase();

    Some(match normalized.as_str() {
        "up" => Annotation::Up,
        "down" => Annotation::Down,
        "no transaction" => Annotation::NoTransaction,
        "statementbegin" => Annotation::StatementBegin,
        "statementend" => Annotation::StatementEnd,
        _ => Annotation::Unknown(directive.trim().to_owned()),
    })
}
