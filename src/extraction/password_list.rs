use std::path::Path;
use tracing::debug;

/// Password list collector for archive extraction
///
/// Collects passwords in priority order:
/// 1. Configured password
/// 2. Password file (one password per line)
/// 3. Empty password (optional fallback)
///
/// Unencrypted archives open with any password, so the list is tried as-is
/// for every format.
#[derive(Debug, Clone)]
pub struct PasswordList {
    passwords: Vec<String>,
}

impl PasswordList {
    /// Collect passwords from all sources, de-duplicated, in priority order
    pub async fn collect(
        configured: Option<&str>,
        password_file: Option<&Path>,
        try_empty: bool,
    ) -> Self {
        let mut passwords: Vec<String> = Vec::new();

        if let Some(pw) = configured
            && !pw.is_empty()
        {
            passwords.push(pw.to_string());
        }

        if let Some(path) = password_file {
            match tokio::fs::read_to_string(path).await {
                Ok(file_content) => {
                    for line in file_content.lines() {
                        let pw = line.trim();
                        if !pw.is_empty() && !passwords.iter().any(|p| p == pw) {
                            passwords.push(pw.to_string());
                        }
                    }
                }
                Err(e) => {
                    debug!(?path, error = %e, "password file unreadable, ignoring");
                }
            }
        }

        // Empty password last
        if try_empty {
            passwords.push(String::new());
        }

        debug!(
            "collected {} unique passwords for extraction",
            passwords.len()
        );

        Self { passwords }
    }

    /// A list holding only the empty password
    pub fn empty_only() -> Self {
        Self {
            passwords: vec![String::new()],
        }
    }

    /// Get an iterator over passwords
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.passwords.iter()
    }

    /// Check if there are any passwords to try
    pub fn is_empty(&self) -> bool {
        self.passwords.is_empty()
    }

    /// Get the number of passwords
    pub fn len(&self) -> usize {
        self.passwords.len()
    }
}
