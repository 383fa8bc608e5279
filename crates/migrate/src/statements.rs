//! Statement extraction - turns schema files into ordered statement lists
//!
//! The default splitter is deliberately naive: it cuts on every `;`, so a
//! terminator inside a string literal, a dollar-quoted function body or a
//! comment splits the statement in two. Schema files that need those
//! constructs should use [`SplitMode::Parsed`].

use std::fs;
use std::path::Path;

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::definitions::{SchemaDocument, SplitMode, Statement};
use crate::error::{MigrateError, MigrateResult};

/// Statement terminator
pub const STATEMENT_TERMINATOR: char = ';';

/// Line comment marker
pub const COMMENT_MARKER: &str = "--";

/// Read a schema file and split it into statements.
///
/// A missing or unreadable file is fatal for the run.
pub fn load_schema(path: &Path, mode: SplitMode) -> MigrateResult<SchemaDocument> {
    let content = fs::read_to_string(path).map_err(|source| MigrateError::SchemaRead {
        path: path.to_path_buf(),
        source,
    })?;

    let statements = split_statements_with(&content, mode);
    tracing::debug!(
        "Extracted {} statement(s) from {}",
        statements.len(),
        path.display()
    );

    Ok(SchemaDocument {
        source: Some(path.to_path_buf()),
        statements,
    })
}

/// Split schema text using the given mode
pub fn split_statements_with(sql: &str, mode: SplitMode) -> Vec<Statement> {
    match mode {
        SplitMode::Naive => split_statements(sql),
        SplitMode::Parsed => parse_statements(sql),
    }
}

/// Split on the statement terminator, dropping empty and comment-only fragments.
///
/// Leading comment lines are stripped from each fragment, so a comment that
/// trails one statement does not swallow the next one.
pub fn split_statements(sql: &str) -> Vec<Statement> {
    sql.split(STATEMENT_TERMINATOR)
        .map(|fragment| strip_leading_comments(fragment).trim())
        .filter(|fragment| !fragment.is_empty())
        .enumerate()
        .map(|(index, fragment)| Statement::new(index + 1, fragment))
        .collect()
}

/// Split using a PostgreSQL parser so quoted terminators survive
pub fn parse_statements(sql: &str) -> Vec<Statement> {
    let dialect = PostgreSqlDialect {};

    match Parser::parse_sql(&dialect, sql) {
        Ok(parsed) => parsed
            .into_iter()
            .enumerate()
            .map(|(index, stmt)| Statement::new(index + 1, stmt.to_string()))
            .collect(),
        Err(e) => {
            tracing::warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            split_statements(sql)
        }
    }
}

fn strip_leading_comments(fragment: &str) -> &str {
    let mut rest = fragment.trim_start();
    while rest.starts_with(COMMENT_MARKER) {
        match rest.find('\n') {
            Some(newline) => rest = rest[newline + 1..].trim_start(),
            None => return "",
        }
    }
    rest
}
