//! Merges freshly fetched matches into the store.
//!
//! Deduplication, season cutoff, per-club skip overrides and the retention
//! cap are all enforced here, before anything is written. The cap is a hard
//! gate: a match is skipped outright when either participant is already at
//! the cap, it is never saved and trimmed later.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::store::{MAX_BATCH_OPS, MatchStore, StoreError, WriteBatch};

use super::{ClubId, Match, Roster, SeasonRules};

/// Counts season-eligible matches per participating club. Seeds the counters
/// handed to [`ingest`] so the cap covers already-stored matches.
pub fn season_counts(matches: &[Match], rules: &SeasonRules) -> HashMap<ClubId, usize> {
    let mut counts = HashMap::new();
    for m in matches {
        if !rules.in_season(m.timestamp) {
            continue;
        }
        for side in m.sides() {
            *counts.entry(side.club_id).or_insert(0) += 1;
        }
    }
    counts
}

/// Stages new matches for write and commits them in bounded atomic batches.
///
/// Counters in `counts` are updated synchronously between staging decisions,
/// so the cap holds even when one call carries many matches for the same
/// club. Returns the number of matches actually staged; the store is the
/// only side effect.
pub async fn ingest<S: MatchStore>(
    store: &S,
    rules: &SeasonRules,
    roster: &Roster,
    fetched: Vec<Match>,
    existing: &HashSet<String>,
    counts: &mut HashMap<ClubId, usize>,
) -> Result<usize, StoreError> {
    let mut staged = WriteBatch::new();
    let mut staged_ids: HashSet<String> = HashSet::new();

    for mut m in fetched {
        if m.match_id.is_empty() || existing.contains(&m.match_id) {
            continue;
        }
        if !staged_ids.insert(m.match_id.clone()) {
            continue;
        }

        if !rules.in_season(m.timestamp) {
            debug!(match_id = %m.match_id, "skipping pre-season match");
            continue;
        }

        if let Some(ts) = m.timestamp {
            let skipped = m.sides().iter().any(|side| {
                rules
                    .skip_before
                    .get(&side.club_id)
                    .is_some_and(|cutoff| ts < *cutoff)
            });
            if skipped {
                debug!(match_id = %m.match_id, "skipping match before club override cutoff");
                continue;
            }
        }

        if !m.sides().iter().any(|side| roster.contains(side.club_id)) {
            continue;
        }

        let at_cap = m
            .sides()
            .iter()
            .any(|side| counts.get(&side.club_id).copied().unwrap_or(0) >= rules.retention_cap);
        if at_cap {
            debug!(match_id = %m.match_id, "skipping match, a participant is at the retention cap");
            continue;
        }

        for side in [&mut m.home, &mut m.away] {
            if side.club_name.is_none() {
                side.club_name = roster.name_of(side.club_id).map(str::to_string);
            }
        }

        *counts.entry(m.home.club_id).or_insert(0) += 1;
        *counts.entry(m.away.club_id).or_insert(0) += 1;
        staged.put(m);
    }

    let saved = staged.len();
    for chunk in staged.into_chunks(MAX_BATCH_OPS) {
        store.commit(chunk).await?;
    }
    Ok(saved)
}
