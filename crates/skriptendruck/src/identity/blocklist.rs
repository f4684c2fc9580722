use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

/// Case-insensitive set of usernames that may not order.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    usernames: HashSet<String>,
}

impl Blocklist {
    pub fn new<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            usernames: usernames
                .into_iter()
                .map(|u| u.as_ref().trim().to_lowercase())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }

    /// One username per line; blank lines and `#` comments are skipped.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut usernames = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }
            if line.split_whitespace().count() > 1 {
                return Err(ConfigError::InvalidLine {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason: format!("expected a single username, got '{}'", line),
                });
            }
            usernames.push(line);
        }

        Ok(Self::new(usernames))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.usernames.contains(&username.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.usernames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }
}

pub(crate) fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_contains_is_case_insensitive() {
        let blocklist = Blocklist::new(["XX99999", "ab1"]);
        assert!(blocklist.contains("xx99999"));
        assert!(blocklist.contains("AB1"));
        assert!(!blocklist.contains("ab12"));
    }

    #[test]
    fn test_load_skips_comments_and_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# blocked after unpaid orders").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "xx99999").unwrap();
        writeln!(file, "  yy11111  # since 2024").unwrap();

        let blocklist = Blocklist::load(file.path()).unwrap();
        assert_eq!(blocklist.len(), 2);
        assert!(blocklist.contains("yy11111"));
    }

    #[test]
    fn test_load_rejects_multiple_names_per_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "xx99999 yy11111").unwrap();

        let result = Blocklist::load(file.path());
        assert!(matches!(result, Err(ConfigError::InvalidLine { line: 1, .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Blocklist::load(Path::new("/nonexistent/blocklist.txt"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
