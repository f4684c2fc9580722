use crate::order::Identity;

/// Answer of an external user directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryOutcome {
    Found(Identity),
    NotFound,
    Ambiguous(Vec<Identity>),
    /// Directory disabled or unreachable; callers degrade to other sources.
    Unavailable(String),
}

/// Lookup contract for an institutional user directory (LDAP or similar).
///
/// Implementations are shared between workers and must not panic on
/// transport failures; report them as [`DirectoryOutcome::Unavailable`].
pub trait DirectoryLookup: Send + Sync {
    fn lookup(&self, username: &str) -> DirectoryOutcome;

    fn name(&self) -> &str {
        "directory"
    }
}

/// Used when no directory is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDirectory;

impl DirectoryLookup for DisabledDirectory {
    fn lookup(&self, _username: &str) -> DirectoryOutcome {
        DirectoryOutcome::Unavailable("directory lookup disabled".to_string())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
