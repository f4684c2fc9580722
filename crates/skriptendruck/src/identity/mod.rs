//! Username → person resolution.
//!
//! Sources are consulted in a fixed order: blocklist, directory, fallback
//! registry. A blocklisted user is rejected before the directory is queried.

pub mod blocklist;
pub mod directory;
pub mod registry;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::order::Identity;

pub use blocklist::Blocklist;
pub use directory::{DirectoryLookup, DirectoryOutcome, DisabledDirectory};
pub use registry::FallbackRegistry;

/// Business outcome of a lookup. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Identity),
    NotFound,
    Blocked,
    Ambiguous(Vec<Identity>),
}

pub struct IdentityResolver {
    blocklist: Blocklist,
    directory: Arc<dyn DirectoryLookup>,
    registry: FallbackRegistry,
}

impl IdentityResolver {
    pub fn new(
        blocklist: Blocklist,
        directory: Arc<dyn DirectoryLookup>,
        registry: FallbackRegistry,
    ) -> Self {
        Self {
            blocklist,
            directory,
            registry,
        }
    }

    /// Gives back the file-backed sources, dropping the directory handle.
    pub fn into_sources(self) -> (Blocklist, FallbackRegistry) {
        (self.blocklist, self.registry)
    }

    pub fn resolve(&self, username: &str) -> Resolution {
        if self.blocklist.contains(username) {
            debug!("User {} is on the blocklist", username);
            return Resolution::Blocked;
        }

        match self.directory.lookup(username) {
            DirectoryOutcome::Found(identity) if identity.blocked => {
                debug!("User {} is blocked in {}", username, self.directory.name());
                return Resolution::Blocked;
            }
            DirectoryOutcome::Found(identity) => return Resolution::Resolved(identity),
            DirectoryOutcome::Ambiguous(candidates) => {
                debug!(
                    "User {} matched {} directory entries",
                    username,
                    candidates.len()
                );
                return Resolution::Ambiguous(candidates);
            }
            DirectoryOutcome::Unavailable(reason) => {
                warn!(
                    "Directory '{}' unavailable for {}: {}; using fallback registry",
                    self.directory.name(),
                    username,
                    reason
                );
            }
            DirectoryOutcome::NotFound => {
                debug!("User {} not in {}", username, self.directory.name());
            }
        }

        match self.registry.get(username) {
            Some(identity) => Resolution::Resolved(Identity {
                blocked: false,
                ..identity.clone()
            }),
            None => Resolution::NotFound,
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(
            Blocklist::default(),
            Arc::new(DisabledDirectory),
            FallbackRegistry::default(),
        )
    }
}
