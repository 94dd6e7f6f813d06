//! Per-tenant roster cache.
//!
//! Each club gets one cache holding its resources, members, and groups.
//! Reads never block on the network: accessors hand out the currently
//! installed snapshot, and a due refresh is started by whichever caller
//! wins an atomic flag. A failed refresh keeps the stale snapshot and
//! shortens the next attempt window; callers only ever see degraded
//! freshness, never a refresh error.

use chrono::{DateTime, Duration, Utc};
use coxswain_core::model::{GroupId, Resource, SchedGroup, SchedUser, UserId};
use coxswain_scheduling::client::SchedulingApi;
use coxswain_scheduling::error::Result as SchedResult;
use coxswain_scheduling::retry::{RetryPolicy, retry_with};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Refresh timing for a tenant cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTimes {
    /// Normal refresh interval
    pub ttl: Duration,
    /// Re-attempt interval after a failed refresh
    pub retry: Duration,
}

impl Default for CacheTimes {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(8),
            retry: Duration::minutes(10),
        }
    }
}

/// One complete, immutable view of a tenant's roster.
///
/// Snapshots are replaced wholesale; readers hold an `Arc` and never
/// observe a partially updated roster.
#[derive(Debug, Clone, Default)]
pub struct RosterSnapshot {
    pub resources: Vec<Resource>,
    pub users: HashMap<UserId, SchedUser>,
    pub groups: HashMap<GroupId, SchedGroup>,
    /// When this snapshot was fetched; `None` for the initial empty one
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl RosterSnapshot {
    pub fn resource(&self, id: i64) -> Option<&Resource> {
        self.resources.iter().find(|r| r.resource_id == id)
    }
}

/// Cache of one tenant's scheduling roster.
pub struct TenantCache {
    tenant_id: String,
    bot_user_name: String,
    api: Arc<dyn SchedulingApi>,
    retry_policy: RetryPolicy,
    times: CacheTimes,
    snapshot: RwLock<Arc<RosterSnapshot>>,
    /// Millisecond timestamp after which the next access refreshes
    next_refresh: AtomicI64,
    /// Set while a refresh is in flight; losers of the swap read stale
    refreshing: AtomicBool,
}

impl TenantCache {
    pub fn new(
        tenant_id: impl Into<String>,
        bot_user_name: impl Into<String>,
        api: Arc<dyn SchedulingApi>,
        times: CacheTimes,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            bot_user_name: bot_user_name.into(),
            api,
            retry_policy: RetryPolicy::background(),
            times,
            snapshot: RwLock::new(Arc::new(RosterSnapshot::default())),
            next_refresh: AtomicI64::new(i64::MIN),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Overrides the refresh retry schedule (defaults to the background
    /// policy).
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// When the next access will attempt a refresh.
    pub fn refresh_deadline(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.next_refresh.load(Ordering::Acquire))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Refreshes if the snapshot is past due. At most one refresh runs
    /// at a time; a caller that finds one already in flight returns
    /// immediately and reads the current snapshot.
    pub async fn ensure_current(&self) {
        let now = Utc::now();
        if now.timestamp_millis() <= self.next_refresh.load(Ordering::Acquire) {
            return;
        }
        self.try_refresh(now).await;
    }

    /// Administrative refresh: bypasses the timeout check but is still
    /// deduplicated against an in-flight refresh.
    pub async fn force_refresh(&self) {
        self.try_refresh(Utc::now()).await;
    }

    async fn try_refresh(&self, now: DateTime<Utc>) {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another caller is already refreshing; stale reads are fine
            return;
        }

        match self.fetch_roster().await {
            Ok(snapshot) => {
                let count = (
                    snapshot.resources.len(),
                    snapshot.users.len(),
                    snapshot.groups.len(),
                );
                *self.snapshot.write().await = Arc::new(snapshot);
                self.next_refresh.store(
                    (now + self.times.ttl).timestamp_millis(),
                    Ordering::Release,
                );
                tracing::info!(
                    "[TenantCache] {} refreshed: {} resources, {} users, {} groups",
                    self.tenant_id,
                    count.0,
                    count.1,
                    count.2
                );
            }
            Err(err) => {
                // Keep the stale snapshot and come back sooner
                self.next_refresh.store(
                    (now + self.times.retry).timestamp_millis(),
                    Ordering::Release,
                );
                tracing::warn!(
                    "[TenantCache] {} refresh failed, serving stale data: {}",
                    self.tenant_id,
                    err
                );
            }
        }

        self.refreshing.store(false, Ordering::Release);
    }

    /// Fetches the complete roster: sign-in, resources, every member's
    /// detail record, every group's detail record. Nothing is installed
    /// unless all of it succeeds.
    async fn fetch_roster(&self) -> SchedResult<RosterSnapshot> {
        let api = &self.api;
        let policy = &self.retry_policy;

        retry_with(policy, || api.sign_in()).await?;

        let resources = retry_with(policy, || api.list_resources()).await?;

        let summaries = retry_with(policy, || api.list_users()).await?;
        let mut users = HashMap::with_capacity(summaries.len());
        for summary in summaries {
            let detail = retry_with(policy, || api.get_user(summary.id)).await?;
            users.insert(detail.id, detail);
        }

        let group_summaries = retry_with(policy, || api.list_groups()).await?;
        let mut groups = HashMap::with_capacity(group_summaries.len());
        for summary in group_summaries {
            let detail = retry_with(policy, || api.get_group(summary.id)).await?;
            groups.insert(detail.id, detail);
        }

        Ok(RosterSnapshot {
            resources,
            users,
            groups,
            refreshed_at: Some(Utc::now()),
        })
    }

    /// The currently installed snapshot, refreshing first if due.
    pub async fn snapshot(&self) -> Arc<RosterSnapshot> {
        self.ensure_current().await;
        self.snapshot.read().await.clone()
    }

    pub async fn resources(&self) -> Vec<Resource> {
        self.snapshot().await.resources.clone()
    }

    pub async fn get_user(&self, id: UserId) -> Option<SchedUser> {
        self.snapshot().await.users.get(&id).cloned()
    }

    pub async fn users(&self) -> Vec<SchedUser> {
        self.snapshot().await.users.values().cloned().collect()
    }

    pub async fn get_group(&self, id: GroupId) -> Option<SchedGroup> {
        self.snapshot().await.groups.get(&id).cloned()
    }

    /// The member record the bot acts as, found by login name.
    pub async fn bot_user(&self) -> Option<SchedUser> {
        let snapshot = self.snapshot().await;
        snapshot
            .users
            .values()
            .find(|user| user.user_name.eq_ignore_ascii_case(&self.bot_user_name))
            .cloned()
    }
}

/// All tenants' caches, for lookup by the transport and for the
/// administrative refresh trigger.
#[derive(Default)]
pub struct CacheRegistry {
    tenants: RwLock<HashMap<String, Arc<TenantCache>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, cache: Arc<TenantCache>) {
        let mut tenants = self.tenants.write().await;
        tenants.insert(cache.tenant_id().to_string(), cache);
    }

    pub async fn get(&self, tenant_id: &str) -> Option<Arc<TenantCache>> {
        let tenants = self.tenants.read().await;
        tenants.get(tenant_id).cloned()
    }

    /// Forces a refresh for one tenant, or for every tenant when none is
    /// named. Unknown tenants are ignored.
    pub async fn refresh_cache(&self, tenant_id: Option<&str>) {
        let targets: Vec<Arc<TenantCache>> = {
            let tenants = self.tenants.read().await;
            match tenant_id {
                Some(id) => tenants.get(id).cloned().into_iter().collect(),
                None => tenants.values().cloned().collect(),
            }
        };
        for cache in targets {
            tracing::info!("[CacheRegistry] Forced refresh for {}", cache.tenant_id());
            cache.force_refresh().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coxswain_core::model::{NewReservation, Reservation, ReservationFilter};
    use coxswain_scheduling::error::SchedulingError;
    use coxswain_scheduling::retry::Backoff;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::Semaphore;

    /// Scripted roster source: serves a fixed roster, can be told to
    /// fail, and can hold sign-ins until the test releases them.
    struct MockApi {
        sign_ins: AtomicU32,
        fail: AtomicBool,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                sign_ins: AtomicU32::new(0),
                fail: AtomicBool::new(false),
                gate: None,
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }

        fn user(id: i64, user_name: &str) -> SchedUser {
            SchedUser {
                id,
                user_name: user_name.to_string(),
                first_name: user_name.to_string(),
                last_name: "Test".to_string(),
                timezone: None,
                permissions: vec![1],
                group_ids: vec![],
            }
        }
    }

    #[async_trait]
    impl SchedulingApi for MockApi {
        async fn sign_in(&self) -> SchedResult<()> {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            self.sign_ins.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(SchedulingError::transport("scripted outage"))
            } else {
                Ok(())
            }
        }

        async fn list_resources(&self) -> SchedResult<Vec<Resource>> {
            Ok(vec![Resource {
                resource_id: 1,
                name: "Santa Maria".to_string(),
                alternate_names: vec![],
                tag_ids: vec![],
                is_private: false,
                max_participants: 2,
            }])
        }

        async fn list_users(&self) -> SchedResult<Vec<SchedUser>> {
            Ok(vec![Self::user(10, "coxbot"), Self::user(11, "ada")])
        }

        async fn get_user(&self, id: i64) -> SchedResult<SchedUser> {
            let name = if id == 10 { "coxbot" } else { "ada" };
            Ok(Self::user(id, name))
        }

        async fn list_groups(&self) -> SchedResult<Vec<SchedGroup>> {
            Ok(vec![SchedGroup {
                id: 5,
                name: "Rowers".to_string(),
                permissions: vec![1],
            }])
        }

        async fn get_group(&self, id: i64) -> SchedResult<SchedGroup> {
            Ok(SchedGroup {
                id,
                name: "Rowers".to_string(),
                permissions: vec![1],
            })
        }

        async fn get_reservations(
            &self,
            _filter: &ReservationFilter,
        ) -> SchedResult<Vec<Reservation>> {
            Ok(vec![])
        }

        async fn create_reservation(&self, _request: &NewReservation) -> SchedResult<Reservation> {
            Err(SchedulingError::rejected("not in this test"))
        }

        async fn delete_reservation(&self, _reference: &str) -> SchedResult<()> {
            Ok(())
        }

        async fn check_in(&self, _reference: &str) -> SchedResult<()> {
            Ok(())
        }

        async fn check_out(&self, _reference: &str) -> SchedResult<()> {
            Ok(())
        }
    }

    fn cache_with(api: Arc<MockApi>) -> TenantCache {
        // Instant single-attempt retries keep failure tests fast
        let policy = RetryPolicy {
            name: "test",
            max_attempts: 1,
            backoff: Backoff::Linear {
                start: std::time::Duration::ZERO,
                increment: std::time::Duration::ZERO,
                cap: std::time::Duration::ZERO,
            },
        };
        TenantCache::new("club-1", "coxbot", api, CacheTimes::default()).with_retry_policy(policy)
    }

    #[tokio::test]
    async fn test_accessors_populate_and_serve() {
        let api = Arc::new(MockApi::new());
        let cache = cache_with(api.clone());

        let resources = cache.resources().await;
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "Santa Maria");

        assert_eq!(cache.get_user(11).await.unwrap().user_name, "ada");
        assert_eq!(cache.get_group(5).await.unwrap().name, "Rowers");
        assert_eq!(cache.bot_user().await.unwrap().id, 10);

        // The roster was fetched once; later reads hit the snapshot
        assert_eq!(api.sign_ins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_single_flight_refresh() {
        let gate = Arc::new(Semaphore::new(0));
        let api = Arc::new(MockApi::gated(gate.clone()));
        let cache = Arc::new(cache_with(api.clone()));

        // First caller wins the flag and parks inside sign_in
        let winner = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.ensure_current().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Second caller must return immediately with the stale (empty)
        // snapshot instead of starting another refresh
        cache.ensure_current().await;
        let stale = cache.snapshot.read().await.clone();
        assert!(stale.refreshed_at.is_none());

        gate.add_permits(1);
        winner.await.unwrap();

        assert_eq!(api.sign_ins.load(Ordering::SeqCst), 1);
        let fresh = cache.snapshot.read().await.clone();
        assert!(fresh.refreshed_at.is_some());
        assert_eq!(fresh.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_snapshot() {
        let api = Arc::new(MockApi::new());
        let cache = cache_with(api.clone());

        // Populate, then break the upstream
        let before = cache.snapshot().await;
        assert!(before.refreshed_at.is_some());
        api.fail.store(true, Ordering::SeqCst);

        let failed_at = Utc::now();
        cache.force_refresh().await;

        // Old snapshot still served
        let after = cache.snapshot.read().await.clone();
        assert_eq!(after.refreshed_at, before.refreshed_at);
        assert_eq!(after.resources.len(), 1);

        // Next attempt lands in the short retry window, not the full TTL
        let deadline = cache.refresh_deadline();
        assert!(deadline > failed_at);
        assert!(deadline <= failed_at + Duration::minutes(10) + Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_registry_forced_refresh() {
        let api = Arc::new(MockApi::new());
        let cache = Arc::new(cache_with(api.clone()));
        let registry = CacheRegistry::new();
        registry.register(cache.clone()).await;

        assert!(registry.get("club-1").await.is_some());
        assert!(registry.get("club-2").await.is_none());

        registry.refresh_cache(Some("club-1")).await;
        assert_eq!(api.sign_ins.load(Ordering::SeqCst), 1);

        // Refreshing all tenants hits it again, bypassing the TTL
        registry.refresh_cache(None).await;
        assert_eq!(api.sign_ins.load(Ordering::SeqCst), 2);
    }
}
