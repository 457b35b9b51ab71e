//! Template compilation.
//!
//! Turns `SELECT * FROM EMPLOYEES WHERE EMPLOYEE_ID = #{employeeId}` into
//! `SELECT * FROM EMPLOYEES WHERE EMPLOYEE_ID = ?` plus the ordered list of
//! normalized field names whose values fill the `?` markers.

use crate::error::{MapperError, MapperResult};

const PLACEHOLDER_OPEN: &str = "#{";
const POSITIONAL_MARKER: char = '?';

/// A template after placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    pub sql: String,
    /// Normalized field names, one per `?`, left to right. Duplicates are kept.
    pub param_fields: Vec<String>,
}

/// Normalize a column or field name: drop underscores, lower-case the rest.
///
/// `FIRST_NAME`, `firstName` and `first_name` all become `firstname`.
pub fn normalize_field_name(name: &str) -> String {
    name.chars()
        .filter(|ch| *ch != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Replace every `#{name}` placeholder with a positional marker.
pub fn compile(template: &str) -> MapperResult<CompiledStatement> {
    let mut sql = String::with_capacity(template.len());
    let mut param_fields = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        sql.push_str(&rest[..start]);
        let after_open = &rest[start + PLACEHOLDER_OPEN.len()..];
        let end = after_open.find('}').ok_or_else(|| {
            MapperError::configuration(format!(
                "Unterminated placeholder at byte {} in template: {}",
                template.len() - rest.len() + start,
                template
            ))
        })?;

        let name = &after_open[..end];
        if name.is_empty() || !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
            return Err(MapperError::configuration(format!(
                "Invalid placeholder '#{{{}}}' in template: {}",
                name, template
            )));
        }

        sql.push(POSITIONAL_MARKER);
        param_fields.push(normalize_field_name(name));
        rest = &after_open[end + 1..];
    }
    sql.push_str(rest);

    Ok(CompiledStatement { sql, param_fields })
}
