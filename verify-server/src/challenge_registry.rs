// verify-server/src/challenge_registry.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::credential::MAX_TTL_SECS;
use common::utils::generate_nonce;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

// Default challenge TTL in seconds (5 minutes)
const DEFAULT_CHALLENGE_TTL: i64 = 300;

/// Actor message: Issue a fresh single-use challenge
#[derive(Message)]
#[rtype(result = "IssuedChallenge")]
pub struct IssueChallenge;

/// Actor message: Consume a previously issued challenge
#[derive(Message)]
#[rtype(result = "ChallengeResult")]
pub struct ConsumeChallenge {
    pub nonce: String,
}

/// Actor message: Drop expired challenges
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredChallenges;

#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of presenting a nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeResult {
    Consumed,
    /// Never issued, or already consumed
    NotFound,
    Expired,
}

#[derive(Debug, Clone, Default)]
struct ChallengeMetrics {
    outstanding: usize,
    issued: usize,
    consumed: usize,
    expired: usize,
}

#[derive(Debug, Clone)]
struct PendingChallenge {
    expires_at: DateTime<Utc>,
}

/// Registry of server-issued nonces, each accepted at most once
pub struct ChallengeRegistryActor {
    pending: Arc<DashMap<String, PendingChallenge>>,
    ttl: ChronoDuration,
    // Cleanup interval in seconds
    cleanup_interval: u64,
    metrics: ChallengeMetrics,
}

impl Default for ChallengeRegistryActor {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeRegistryActor {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            ttl: ChronoDuration::seconds(DEFAULT_CHALLENGE_TTL),
            cleanup_interval: 60,
            metrics: ChallengeMetrics::default(),
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.ttl = ChronoDuration::seconds(ttl_seconds.clamp(0, MAX_TTL_SECS));
        self
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds.max(1);
        self
    }

    fn cleanup_challenges(&mut self) -> usize {
        let now = Utc::now();
        let before = self.pending.len();
        self.pending.retain(|_, challenge| challenge.expires_at > now);
        let removed = before - self.pending.len();

        self.metrics.expired += removed;
        self.metrics.outstanding = self.pending.len();
        removed
    }
}

impl Actor for ChallengeRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "ChallengeRegistryActor started with TTL: {}s",
            self.ttl.num_seconds()
        );

        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired = act.cleanup_challenges();
            if expired > 0 {
                tracing::info!("Cleaned up {} expired challenges", expired);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "ChallengeRegistryActor stopped. {} outstanding, {} issued, {} consumed, {} expired",
            self.metrics.outstanding,
            self.metrics.issued,
            self.metrics.consumed,
            self.metrics.expired
        );
    }
}

impl Handler<IssueChallenge> for ChallengeRegistryActor {
    type Result = MessageResult<IssueChallenge>;

    fn handle(&mut self, _msg: IssueChallenge, _ctx: &mut Self::Context) -> Self::Result {
        let nonce = generate_nonce();
        let expires_at = Utc::now() + self.ttl;

        self.pending
            .insert(nonce.clone(), PendingChallenge { expires_at });
        self.metrics.issued += 1;
        self.metrics.outstanding = self.pending.len();

        tracing::debug!("Issued challenge expiring at {}", expires_at);
        MessageResult(IssuedChallenge { nonce, expires_at })
    }
}

impl Handler<ConsumeChallenge> for ChallengeRegistryActor {
    type Result = MessageResult<ConsumeChallenge>;

    fn handle(&mut self, msg: ConsumeChallenge, _ctx: &mut Self::Context) -> Self::Result {
        // Removal on first presentation makes every nonce single-use
        let result = match self.pending.remove(&msg.nonce) {
            Some((_, challenge)) if Utc::now() >= challenge.expires_at => {
                self.metrics.expired += 1;
                ChallengeResult::Expired
            }
            Some(_) => {
                self.metrics.consumed += 1;
                ChallengeResult::Consumed
            }
            None => ChallengeResult::NotFound,
        };
        self.metrics.outstanding = self.pending.len();

        MessageResult(result)
    }
}

impl Handler<CleanupExpiredChallenges> for ChallengeRegistryActor {
    type Result = MessageResult<CleanupExpiredChallenges>;

    fn handle(&mut self, _msg: CleanupExpiredChallenges, _ctx: &mut Self::Context) -> Self::Result {
        let expired = self.cleanup_challenges();
        tracing::info!("Cleaned up {} expired challenges", expired);
        MessageResult(expired)
    }
}
