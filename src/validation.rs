//! Input validation for operator-typed text: file names, task fields and guild names.

/// Validation errors with operator-facing messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Action text cannot be empty")]
    EmptyAction,

    #[error("\"{text}\" is not a whole number")]
    NotANumber { text: String },

    #[error("Amount must be at least 1 (got {value})")]
    AmountTooSmall { value: i64 },

    #[error("Guild name \"{name}\" is not a usable directory name")]
    InvalidGuildName { name: String },
}

/// File name used when the operator submits an empty name.
pub const DEFAULT_FILE_NAME: &str = "new-quest.yml";

/// Extensions recognized as quest documents. The first one is appended when missing.
pub const DOCUMENT_EXTENSIONS: [&str; 2] = [".yml", ".yaml"];

/// Word that aborts any pending text request, compared case-insensitively.
pub const CANCEL_WORD: &str = "cancel";

/// Whether `name` ends with one of the recognized document extensions.
pub fn has_document_extension(name: &str) -> bool {
    DOCUMENT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Turn an operator-proposed name into a safe quest file name.
///
/// The result only contains `[A-Za-z0-9._-]`, never starts with a dot, always ends in a recognized
/// extension, and `sanitize_file_name(sanitize_file_name(x)) == sanitize_file_name(x)`.
pub fn sanitize_file_name(proposed: &str) -> String {
    let trimmed = proposed.trim();
    let bare = DOCUMENT_EXTENSIONS
        .iter()
        .find_map(|ext| trimmed.strip_suffix(ext))
        .unwrap_or(trimmed);
    // Hidden files are never listed, so a leading dot would lose the document.
    if bare.trim_start_matches('.').is_empty() {
        return DEFAULT_FILE_NAME.to_string();
    }
    let mut name = trimmed.trim_start_matches('.').to_string();
    if !has_document_extension(&name) {
        name.push_str(DOCUMENT_EXTENSIONS[0]);
    }
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Validate free text destined for a task's `action` field.
pub fn validate_action(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyAction);
    }
    Ok(trimmed.to_string())
}

/// Parse free text destined for a task's `args.amount` field.
pub fn parse_amount(text: &str) -> Result<i64, ValidationError> {
    let trimmed = text.trim();
    let value: i64 = trimmed.parse().map_err(|_| ValidationError::NotANumber {
        text: trimmed.to_string(),
    })?;
    if value < 1 {
        return Err(ValidationError::AmountTooSmall { value });
    }
    Ok(value)
}

/// Whether the submitted text is the cancel word.
pub fn is_cancel(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(CANCEL_WORD)
}

/// Guild names become directory names directly under the store root.
pub fn validate_guild_name(name: &str) -> Result<&str, ValidationError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if bad {
        return Err(ValidationError::InvalidGuildName {
            name: name.to_string(),
        });
    }
    Ok(name)
}
