// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Collision-safe allocation of the on-disk session directory

use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Number of hash bytes kept for the directory name (10 hex characters).
const DIRECTORY_NAME_BYTES: usize = 5;

/// Upper bound on collision retries before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 16;

#[derive(Debug, Error)]
pub enum DirectoryAllocationError {
    #[error("gave up allocating a session directory after {0} attempts")]
    Exhausted(u32),
    #[error("failed to create session directory: {0}")]
    CreateFailed(#[from] std::io::Error),
}

/// An allocated, empty session directory.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    /// The candidate identifier the directory name was derived from.
    pub id: Uuid,
    /// Fixed-length hex name, a SHA-256 prefix of `id`.
    pub name: String,
    pub path: PathBuf,
}

/// Allocates unique session directories under a base path.
///
/// Directory names are a fixed-length hex prefix of the SHA-256 of a fresh
/// v4 UUID: stable length, collision resistant, and the raw identifier never
/// appears on disk. Creation is atomic (`create_dir`), so two concurrent
/// allocations can never claim the same name; a collision simply draws a new
/// identifier, bounded by [`MAX_ALLOCATION_ATTEMPTS`].
pub struct SessionAllocator {
    base_path: PathBuf,
}

impl SessionAllocator {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn allocate(&self) -> Result<SessionDirectory, DirectoryAllocationError> {
        self.allocate_with(Uuid::new_v4).await
    }

    /// Allocation with an injected candidate source; `allocate` draws fresh
    /// v4 UUIDs, tests can force collisions with a deterministic sequence.
    pub async fn allocate_with(
        &self,
        mut next_candidate: impl FnMut() -> Uuid,
    ) -> Result<SessionDirectory, DirectoryAllocationError> {
        if !self.base_path.exists() {
            info!("creating recording base directory: {}", self.base_path.display());
            fs::create_dir_all(&self.base_path).await?;
        }

        for attempt in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = next_candidate();
            let name = directory_name(&id);
            let path = self.base_path.join(&name);

            match fs::create_dir(&path).await {
                Ok(()) => {
                    debug!(%id, %name, attempt, "allocated session directory");
                    return Ok(SessionDirectory { id, name, path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(%name, attempt, "session directory name collision, regenerating");
                }
                Err(e) => return Err(DirectoryAllocationError::CreateFailed(e)),
            }
        }

        Err(DirectoryAllocationError::Exhausted(MAX_ALLOCATION_ATTEMPTS))
    }
}

fn directory_name(id: &Uuid) -> String {
    let digest = Sha256::digest(id.hyphenated().to_string().as_bytes());
    digest[..DIRECTORY_NAME_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_name_is_fixed_length_hex() {
        let name = directory_name(&Uuid::new_v4());
        assert_eq!(name.len(), 10);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn directory_name_is_stable_per_id() {
        let id = Uuid::new_v4();
        assert_eq!(directory_name(&id), directory_name(&id));
    }

    #[tokio::test]
    async fn allocate_creates_directory() {
        let temp = TempDir::new().unwrap();
        let allocator = SessionAllocator::new(temp.path());
        let session = allocator.allocate().await.unwrap();
        assert!(session.path.is_dir());
        assert_eq!(session.path, temp.path().join(&session.name));
    }

    #[tokio::test]
    async fn allocate_creates_missing_base_path() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("nested").join("recordings");
        let allocator = SessionAllocator::new(&base);
        let session = allocator.allocate().await.unwrap();
        assert!(session.path.starts_with(&base));
        assert!(session.path.is_dir());
    }

    #[tokio::test]
    async fn unwritable_base_path_is_create_failed() {
        let temp = TempDir::new().unwrap();
        // A regular file where the base directory should be.
        let base = temp.path().join("occupied");
        std::fs::write(&base, b"not a directory").unwrap();

        let allocator = SessionAllocator::new(&base);
        match allocator.allocate().await {
            Err(DirectoryAllocationError::CreateFailed(_)) => {}
            other => panic!("expected CreateFailed, got {:?}", other.map(|s| s.name)),
        }
    }
}
