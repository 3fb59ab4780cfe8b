// Copyright 2025 rtbedge Authors
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

use async_trait::async_trait;
use rtbedge_common::Result;

/// A shared score-ordered set, the single source of truth for fleet liveness.
///
/// Implementations must make each call atomic with respect to the others on
/// the same set. Range deletes must be idempotent: removing a range that is
/// already empty succeeds and reports zero.
///
/// Any error returned here is treated by pool nodes as fatal.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Insert `member` or update its score.
    async fn upsert_score(&self, set: &str, member: &str, score: i64) -> Result<()>;

    /// Members with `min <= score <= max`, ordered by score then name.
    async fn range_by_score(&self, set: &str, min: i64, max: i64) -> Result<Vec<String>>;

    /// Remove members with `min <= score <= max`, returning how many were removed.
    async fn remove_range_by_score(&self, set: &str, min: i64, max: i64) -> Result<u64>;

    /// Remove one member, returning whether it was present.
    async fn remove_member(&self, set: &str, member: &str) -> Result<bool>;
}
