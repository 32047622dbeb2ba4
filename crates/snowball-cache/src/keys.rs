//! Cache key builders.

use snowball_core::types::id::RepositoryId;

const PREFIX: &str = "snowball";

/// Key of the cached network snapshot of a repository.
pub fn network_snapshot(repository_id: RepositoryId) -> String {
    format!("{PREFIX}:network:{repository_id}")
}
