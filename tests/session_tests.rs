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

// Session directory allocation tests

use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use dataset_recorder::{DirectoryAllocationError, SessionAllocator};
use dataset_recorder::session::MAX_ALLOCATION_ATTEMPTS;

#[tokio::test]
async fn names_are_fixed_length_hex() {
    let temp = TempDir::new().unwrap();
    let allocator = SessionAllocator::new(temp.path());

    let session = allocator.allocate().await.unwrap();
    assert_eq!(session.name.len(), 10);
    assert!(session.name.chars().all(|c| c.is_ascii_hexdigit()));
    // The raw identifier must not leak into the directory name.
    assert!(!session.name.contains(&session.id.simple().to_string()));
}

#[tokio::test]
async fn repeated_allocations_are_unique() {
    let temp = TempDir::new().unwrap();
    let allocator = SessionAllocator::new(temp.path());

    let mut names = HashSet::new();
    for _ in 0..32 {
        let session = allocator.allocate().await.unwrap();
        assert!(names.insert(session.name), "duplicate directory name");
    }
}

#[tokio::test]
async fn concurrent_allocations_never_share_a_directory() {
    let temp = TempDir::new().unwrap();
    let allocator = Arc::new(SessionAllocator::new(temp.path()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let allocator = allocator.clone();
        handles.push(tokio::spawn(
            async move { allocator.allocate().await.unwrap() },
        ));
    }

    let mut names = HashSet::new();
    for handle in handles {
        let session = handle.await.unwrap();
        assert!(names.insert(session.name));
    }
}

#[tokio::test]
async fn collision_triggers_exactly_one_regeneration() {
    let temp = TempDir::new().unwrap();
    let allocator = SessionAllocator::new(temp.path());

    // Occupy the directory derived from a known candidate.
    let occupied = Uuid::new_v4();
    let first = allocator.allocate_with(|| occupied).await;
    // Only the first draw succeeds; retrying the same candidate collides.
    let first = first.unwrap();

    let fresh = Uuid::new_v4();
    let mut draws = Vec::new();
    let session = allocator
        .allocate_with(|| {
            let next = if draws.is_empty() { occupied } else { fresh };
            draws.push(next);
            next
        })
        .await
        .unwrap();

    assert_eq!(draws.len(), 2);
    assert_ne!(session.name, first.name);
}

#[tokio::test]
async fn retries_are_bounded() {
    let temp = TempDir::new().unwrap();
    let allocator = SessionAllocator::new(temp.path());

    let stuck = Uuid::new_v4();
    allocator.allocate_with(|| stuck).await.unwrap();

    // Every further candidate collides with the directory above.
    match allocator.allocate_with(|| stuck).await {
        Err(DirectoryAllocationError::Exhausted(attempts)) => {
            assert_eq!(attempts, MAX_ALLOCATION_ATTEMPTS);
        }
        other => panic!("expected Exhausted, got {:?}", other.map(|s| s.name)),
    }
}

#[tokio::test]
async fn os_failure_is_create_failed_not_a_panic() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("blocked");
    std::fs::write(&base, b"file in the way").unwrap();

    let allocator = SessionAllocator::new(&base);
    assert!(matches!(
        allocator.allocate().await,
        Err(DirectoryAllocationError::CreateFailed(_))
    ));
}
