use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use super::blocklist::strip_comment;
use crate::error::ConfigError;
use crate::order::Identity;

/// File-backed list of known users, consulted when the directory has no answer.
#[derive(Debug, Clone, Default)]
pub struct FallbackRegistry {
    users: HashMap<String, Identity>,
}

impl FallbackRegistry {
    pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
        let mut users = HashMap::new();
        for identity in identities {
            users
                .entry(identity.username.to_lowercase())
                .or_insert(identity);
        }
        Self { users }
    }

    /// Reads `username firstname lastname [faculty]` records.
    ///
    /// Fields are split on `,` or `;` when the line contains one, otherwise on
    /// whitespace. With four or more fields the last one is the faculty.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut users = HashMap::new();
        for (index, raw) in content.lines().enumerate() {
            let line = strip_comment(raw);
            if line.is_empty() {
                continue;
            }

            let identity = parse_record(line).ok_or_else(|| ConfigError::InvalidLine {
                path: path.to_path_buf(),
                line: index + 1,
                reason: "expected at least a username and a name".to_string(),
            })?;

            let key = identity.username.clone();
            if users.contains_key(&key) {
                warn!(
                    "Duplicate registry entry for {} on line {}, keeping the first",
                    key,
                    index + 1
                );
                continue;
            }
            users.insert(key, identity);
        }

        Ok(Self { users })
    }

    pub fn get(&self, username: &str) -> Option<&Identity> {
        self.users.get(&username.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn parse_record(line: &str) -> Option<Identity> {
    let fields: Vec<&str> = if line.contains([',', ';']) {
        line.split([',', ';'])
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    } else {
        line.split_whitespace().collect()
    };

    if fields.len() < 2 {
        return None;
    }

    let username = fields[0].to_lowercase();
    let (name_fields, faculty) = if fields.len() >= 4 {
        (&fields[1..fields.len() - 1], Some(fields[fields.len() - 1]))
    } else {
        (&fields[1..], None)
    };

    let mut identity = Identity::new(username, name_fields.join(" "));
    if let Some(faculty) = faculty {
        identity = identity.with_faculty(faculty);
    }
    Some(identity)
}
