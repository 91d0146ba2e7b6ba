//! Retention trimming and season cleanup over the stored match collection.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::store::{MAX_BATCH_OPS, MatchStore, StoreError, WriteBatch};

use super::{ClubId, Match, SeasonRules};

async fn delete_ids<S: MatchStore>(store: &S, ids: HashSet<String>) -> Result<usize, StoreError> {
    let deleted = ids.len();
    let mut batch = WriteBatch::new();
    for id in ids {
        batch.delete(id);
    }
    for chunk in batch.into_chunks(MAX_BATCH_OPS) {
        store.commit(chunk).await?;
    }
    Ok(deleted)
}

/// Deletes each club's excess matches beyond the retention cap.
///
/// Pre-season matches are left to [`clean_old`]. Within a club's group the
/// newest `cap` matches survive; a match missing its timestamp ranks oldest
/// and is evicted first. The union of excess ids across all clubs is removed
/// in batched atomic deletes, so a match excess for either participant goes.
/// Running twice with no intervening ingestion deletes nothing the second
/// time.
pub async fn trim<S: MatchStore>(store: &S, rules: &SeasonRules) -> Result<usize, StoreError> {
    let matches = store.get_all().await?;

    let mut by_club: HashMap<ClubId, Vec<&Match>> = HashMap::new();
    for m in &matches {
        if let Some(ts) = m.timestamp {
            if ts < rules.season_start {
                continue;
            }
        }
        for side in m.sides() {
            by_club.entry(side.club_id).or_default().push(m);
        }
    }

    let mut doomed: HashSet<String> = HashSet::new();
    for group in by_club.values_mut() {
        group.sort_by_key(|m| Reverse(m.timestamp.unwrap_or(0)));
        for m in group.iter().skip(rules.retention_cap) {
            doomed.insert(m.match_id.clone());
        }
    }

    if doomed.is_empty() {
        debug!("trim pass found nothing to delete");
        return Ok(0);
    }

    let deleted = delete_ids(store, doomed).await?;
    info!(deleted, "trimmed excess matches");
    Ok(deleted)
}

/// Purges matches with a timestamp strictly before the season start.
/// Matches without a timestamp are never treated as old and survive.
pub async fn clean_old<S: MatchStore>(store: &S, rules: &SeasonRules) -> Result<usize, StoreError> {
    let matches = store.get_all().await?;

    let doomed: HashSet<String> = matches
        .iter()
        .filter(|m| m.timestamp.is_some_and(|ts| ts < rules.season_start))
        .map(|m| m.match_id.clone())
        .collect();

    delete_ids(store, doomed).await
}

/// One-off corrective cleanup: deletes every stored match involving
/// `club_id` with a timestamp strictly earlier than `cutoff`.
pub async fn delete_before<S: MatchStore>(
    store: &S,
    club_id: ClubId,
    cutoff: i64,
) -> Result<usize, StoreError> {
    let matches = store.get_all().await?;

    let doomed: HashSet<String> = matches
        .iter()
        .filter(|m| m.involves(club_id) && m.timestamp.is_some_and(|ts| ts < cutoff))
        .map(|m| m.match_id.clone())
        .collect();

    delete_ids(store, doomed).await
}
