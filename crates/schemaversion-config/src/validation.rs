use schemaversion_common::{Error, Result};

const MAX_IDENTIFIER_LEN: usize = 64;

/// Validation for SQL identifiers that are spliced into statements.
pub struct IdentifierValidator;

impl IdentifierValidator {
    /// Accepts `[A-Za-z_][A-Za-z0-9_]*` up to 64 characters. `kind` names the
    /// identifier in the error message.
    pub fn validate(kind: &str, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Config(format!("{kind} name cannot be empty")));
        }
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(Error::Config(format!("{kind} name too long: {name}")));
        }

        let mut chars = name.chars();
        let starts_well = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !starts_well || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!(
                "{kind} name is not a plain SQL identifier: {name}"
            )));
        }
        Ok(())
    }
}
