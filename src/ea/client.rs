use std::collections::HashMap;
use std::time::{Duration, Instant};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use nonzero_ext::nonzero;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use crate::league::ClubId;

use super::types::{MatchesPayload, MembersPayload, RawMatch, RawMember};
use super::SourceError;

pub const DEFAULT_BASE_URL: &str = "https://proclubs.ea.com/api/fc";

const PLATFORM: &str = "common-gen5";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const CACHE_TTL: Duration = Duration::from_secs(60);
/// At most this many requests in flight across all clubs; the rest queue
/// in submission order.
const MAX_IN_FLIGHT: usize = 3;

struct CachedMatches {
    fetched_at: Instant,
    matches: Vec<RawMatch>,
}

/// Client for the EA Pro Clubs endpoints with timeout, retry, rate
/// limiting, bounded concurrency and a short per-club result cache.
pub struct EaApiClient {
    client: reqwest::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    slots: Semaphore,
    match_cache: Mutex<HashMap<ClubId, CachedMatches>>,
    base_url: String,
}

impl EaApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        // EA refuses requests without a browser-looking identity.
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
            ),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(REFERER, HeaderValue::from_static("https://www.ea.com/"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.ea.com"));

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .expect("HTTP client construction cannot fail with static options");

        let quota = Quota::per_minute(nonzero!(60_u32)).allow_burst(nonzero!(10_u32));

        Self {
            client,
            limiter: RateLimiter::direct(quota),
            slots: Semaphore::new(MAX_IN_FLIGHT),
            match_cache: Mutex::new(HashMap::new()),
            base_url: base_url.into(),
        }
    }

    /// Fetches the recent league matches for one club.
    ///
    /// Results are cached for a short TTL to absorb repeated calls within
    /// one scheduling tick.
    pub async fn fetch_matches(&self, club_id: ClubId) -> Result<Vec<RawMatch>, SourceError> {
        {
            let cache = self.match_cache.lock().await;
            if let Some(entry) = cache.get(&club_id) {
                if entry.fetched_at.elapsed() < CACHE_TTL {
                    debug!(club_id, "serving matches from cache");
                    return Ok(entry.matches.clone());
                }
            }
        }

        let url = format!(
            "{}/clubs/matches?matchType=leagueMatch&platform={PLATFORM}&clubId={club_id}",
            self.base_url
        );
        let payload: MatchesPayload = self.request_json(&url).await?;
        let matches = payload.into_matches();

        let mut cache = self.match_cache.lock().await;
        cache.insert(
            club_id,
            CachedMatches { fetched_at: Instant::now(), matches: matches.clone() },
        );
        Ok(matches)
    }

    /// Fetches the member/roster stats list for one club. Not cached; the
    /// call sites are infrequent.
    pub async fn fetch_members(&self, club_id: ClubId) -> Result<Vec<RawMember>, SourceError> {
        let url = format!(
            "{}/members/stats?platform={PLATFORM}&clubId={club_id}",
            self.base_url
        );
        let payload: MembersPayload = self.request_json(&url).await?;
        Ok(payload.into_members())
    }

    async fn request_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let _permit = self
            .slots
            .acquire()
            .await
            .expect("request semaphore is never closed");

        let mut attempt = 1;
        loop {
            self.limiter.until_ready().await;

            match self.try_request(url).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < MAX_ATTEMPTS && err.is_transient() => {
                    warn!(url, attempt, error = %err, "EA request failed, retrying");
                    tokio::time::sleep(BACKOFF_BASE * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_request<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Err(SourceError::Status(res.status()));
        }
        let body = res.bytes().await?;
        // Decode separately from the transfer so malformed payloads are
        // distinguishable from transport failures and never retried.
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for EaApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EaApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn match_body() -> serde_json::Value {
        json!([{
            "matchId": "m1",
            "timestamp": 1_700_000_000,
            "clubs": {"1": {"goals": "2"}, "2": {"goals": "0"}}
        }])
    }

    #[tokio::test]
    async fn fetches_and_decodes_matches() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/clubs/matches")
                    .query_param("clubId", "1")
                    .query_param("platform", PLATFORM);
                then.status(200).json_body(match_body());
            })
            .await;

        let client = EaApiClient::new(server.base_url());
        let matches = client.fetch_matches(1).await.unwrap();

        mock.assert_async().await;
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn repeated_calls_within_ttl_hit_the_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/clubs/matches");
                then.status(200).json_body(match_body());
            })
            .await;

        let client = EaApiClient::new(server.base_url());
        client.fetch_matches(1).await.unwrap();
        client.fetch_matches(1).await.unwrap();

        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_surfaced() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/clubs/matches");
                then.status(503);
            })
            .await;

        let client = EaApiClient::new(server.base_url());
        let err = client.fetch_matches(1).await.unwrap_err();

        assert!(matches!(err, SourceError::Status(s) if s.as_u16() == 503));
        mock.assert_hits_async(MAX_ATTEMPTS as usize).await;
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/clubs/matches");
                then.status(404);
            })
            .await;

        let client = EaApiClient::new(server.base_url());
        let err = client.fetch_matches(1).await.unwrap_err();

        assert!(matches!(err, SourceError::Status(s) if s.as_u16() == 404));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn malformed_payloads_fail_without_retry() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/clubs/matches");
                then.status(200).body("not json at all");
            })
            .await;

        let client = EaApiClient::new(server.base_url());
        let err = client.fetch_matches(1).await.unwrap_err();

        assert!(matches!(err, SourceError::Decode(_)));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn members_endpoint_handles_the_wrapped_shape() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/members/stats");
                then.status(200)
                    .json_body(json!({"members": [{"name": "Pele", "goals": "12"}]}));
            })
            .await;

        let client = EaApiClient::new(server.base_url());
        let members = client.fetch_members(1).await.unwrap();

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name.as_deref(), Some("Pele"));
        assert_eq!(members[0].goals.as_u32(), Some(12));
    }
}
