use async_trait::async_trait;
use rtbedge_common::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::store::MembershipStore;

/// Process-local score-ordered sets.
///
/// Each set maps member name to score. Writes take the lock for the whole
/// operation, so a range delete is atomic against concurrent sweeps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sets: RwLock<HashMap<String, HashMap<String, i64>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score of a member, if present.
    pub async fn score(&self, set: &str, member: &str) -> Option<i64> {
        let sets = self.sets.read().await;
        sets.get(set).and_then(|members| members.get(member).copied())
    }

    /// Number of members in a set.
    pub async fn len(&self, set: &str) -> usize {
        let sets = self.sets.read().await;
        sets.get(set).map(|members| members.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self, set: &str) -> bool {
        self.len(set).await == 0
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn upsert_score(&self, set: &str, member: &str, score: i64) -> Result<()> {
        let mut sets = self.sets.write().await;
        sets.entry(set.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn range_by_score(&self, set: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let sets = self.sets.read().await;
        let Some(members) = sets.get(set) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(i64, &String)> = members
            .iter()
            .filter(|(_, score)| (min..=max).contains(*score))
            .map(|(name, score)| (*score, name))
            .collect();
        matched.sort();

        Ok(matched.into_iter().map(|(_, name)| name.clone()).collect())
    }

    async fn remove_range_by_score(&self, set: &str, min: i64, max: i64) -> Result<u64> {
        let mut sets = self.sets.write().await;
        let Some(members) = sets.get_mut(set) else {
            return Ok(0);
        };

        let before = members.len();
        members.retain(|_, score| !(min..=max).contains(&*score));
        Ok((before - members.len()) as u64)
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<bool> {
        let mut sets = self.sets.write().await;
        Ok(sets
            .get_mut(set)
            .map(|members| members.remove(member).is_some())
            .unwrap_or(false))
    }
}
