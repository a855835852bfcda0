//! Per-session entity store.
//!
//! A `DataStore` holds the last-fetched snapshot of every entity kind for one
//! user session. Reads are synchronous scans over the cache; writes go to the
//! marketplace API first and are spliced into the cache only after a
//! successful response. The cache is mirrored into session storage after
//! every change and rehydrated when the session is opened again.

pub mod cache;
pub mod persistence;
pub mod registry;
pub mod rules;
pub mod single_flight;

pub use cache::{Cached, EntityCache};
pub use persistence::{FileStorage, MemoryStorage, SessionStorage};
pub use registry::{BackendFactory, SessionRegistry, StorageBackend};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    Bid, BidInvitation, BidStatus, Client, Consultation, Conversation, CreateBidInput,
    CreateBidInvitationInput, CreateConsultationInput, CreateConversationInput,
    CreateDisputeInput, CreateMilestoneInput, CreatePaymentInput, CreateProjectInput, Dispute,
    Entity, EntityKind, Freelancer, Message, Milestone, Notification, Payment, Project,
    ProjectStatus, SendMessageInput, UpdateBidInput, UpdateBidInvitationInput,
    UpdateConsultationInput, UpdateDisputeInput, UpdateMilestoneInput, UpdatePaymentInput,
    UpdateProjectInput,
};
use crate::error::{ApiError, ApiResult};
use crate::services::{NotificationChannel, ResourceService, RestBackend};
use persistence::{read_timestamp, restore_cache, CACHE_KEY, PROJECTS_LOADED_AT_KEY};
use rules::Notifiable;
use single_flight::SingleFlight;

/// Timing knobs for list loads.
#[derive(Debug, Clone, Copy)]
pub struct LoadPolicy {
    /// Cached projects younger than this are served without a fetch.
    pub project_freshness: Duration,
    /// Delay before the single retry after a rate-limited load.
    pub rate_limit_retry_delay: Duration,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            project_freshness: Duration::from_millis(30_000),
            rate_limit_retry_delay: Duration::from_millis(5_000),
        }
    }
}

/// Result of accepting a bid: the accepted bid and the assigned project.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedBid {
    pub bid: Bid,
    pub project: Project,
    pub rejected_bid_ids: Vec<String>,
}

#[derive(Clone)]
pub struct DataStore {
    inner: Arc<Inner>,
}

struct Inner {
    user_id: String,
    backend: RwLock<Arc<dyn RestBackend>>,
    storage: Arc<dyn SessionStorage>,
    channel: Option<Arc<dyn NotificationChannel>>,
    policy: LoadPolicy,
    cache: RwLock<EntityCache>,
    loads: SingleFlight<EntityKind, ApiResult<()>>,
    loaded: Mutex<HashSet<EntityKind>>,
    retry_pending: Mutex<HashSet<EntityKind>>,
    persist_lock: tokio::sync::Mutex<()>,
    active: AtomicBool,
}

/// Milestones share the project load.
fn load_key(kind: EntityKind) -> EntityKind {
    match kind {
        EntityKind::Milestone => EntityKind::Project,
        other => other,
    }
}

fn log_failure(action: &'static str, kind: EntityKind, error: ApiError) -> ApiError {
    tracing::error!(kind = %kind, action, error = %error, "Marketplace request failed");
    error
}

impl DataStore {
    /// Open a session store, rehydrating whatever `storage` holds.
    pub async fn open(
        user_id: impl Into<String>,
        backend: Arc<dyn RestBackend>,
        storage: Arc<dyn SessionStorage>,
        channel: Option<Arc<dyn NotificationChannel>>,
        policy: LoadPolicy,
    ) -> Self {
        let user_id = user_id.into();
        let cache = restore_cache(storage.as_ref()).await;
        let rehydrated: HashSet<EntityKind> = EntityKind::ALL
            .into_iter()
            .filter(|kind| cache.len_of(*kind) > 0)
            .collect();

        tracing::debug!(
            user_id = %user_id,
            projects = cache.projects.len(),
            notifications = cache.notifications.len(),
            "Opened session store"
        );

        Self {
            inner: Arc::new(Inner {
                user_id,
                backend: RwLock::new(backend),
                storage,
                channel,
                policy,
                cache: RwLock::new(cache),
                loads: SingleFlight::new(),
                loaded: Mutex::new(rehydrated),
                retry_pending: Mutex::new(HashSet::new()),
                persist_lock: tokio::sync::Mutex::new(()),
                active: AtomicBool::new(true),
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Copy of the whole cache.
    pub fn snapshot(&self) -> EntityCache {
        self.inner.cache.read().clone()
    }

    /// Route later requests through `backend`, e.g. after a token change.
    /// Requests already in flight finish on the old one.
    pub fn set_backend(&self, backend: Arc<dyn RestBackend>) {
        *self.inner.backend.write() = backend;
    }

    fn service<T: Entity>(&self) -> ResourceService<T> {
        ResourceService::new(self.inner.backend.read().clone())
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load projects unless the cached list is non-empty and fresh.
    #[tracing::instrument(skip(self), fields(user_id = %self.inner.user_id))]
    pub async fn load_projects(&self) -> ApiResult<()> {
        if self.projects_fresh().await {
            tracing::debug!("Projects are fresh, skipping fetch");
            return Ok(());
        }
        self.refresh(EntityKind::Project).await
    }

    pub async fn refresh_projects(&self) -> ApiResult<()> {
        self.refresh(EntityKind::Project).await
    }

    /// Load `kind` once per session; rehydrated data counts as loaded.
    /// Entities spliced in by local mutations do not, so a list holding only
    /// those is still fetched. Milestones only arrive embedded in projects.
    pub async fn ensure_loaded(&self, kind: EntityKind) -> ApiResult<()> {
        if matches!(kind, EntityKind::Project | EntityKind::Milestone) {
            return self.load_projects().await;
        }
        if self.inner.loaded.lock().contains(&kind) {
            return Ok(());
        }
        self.refresh(kind).await
    }

    /// Fetch `kind` now. Concurrent callers share a single request.
    pub async fn refresh(&self, kind: EntityKind) -> ApiResult<()> {
        self.load(load_key(kind), true).await
    }

    /// Projects first, then every other kind concurrently. Returns the first
    /// failure after all loads have settled.
    #[tracing::instrument(skip(self), fields(user_id = %self.inner.user_id))]
    pub async fn load_all(&self) -> ApiResult<()> {
        let projects = self.load_projects().await;
        let others = futures::future::join_all(
            EntityKind::ALL
                .into_iter()
                .filter(|kind| load_key(*kind) == *kind && *kind != EntityKind::Project)
                .map(|kind| self.ensure_loaded(kind)),
        )
        .await;

        projects?;
        others.into_iter().collect()
    }

    /// Refetch every kind, ignoring freshness.
    pub async fn refresh_all(&self) -> ApiResult<()> {
        let projects = self.refresh_projects().await;
        let others = futures::future::join_all(
            EntityKind::ALL
                .into_iter()
                .filter(|kind| load_key(*kind) == *kind && *kind != EntityKind::Project)
                .map(|kind| self.refresh(kind)),
        )
        .await;

        projects?;
        others.into_iter().collect()
    }

    pub fn has_cached(&self, kind: EntityKind) -> bool {
        self.inner.cache.read().len_of(kind) > 0
    }

    async fn load(&self, kind: EntityKind, retry_on_limit: bool) -> ApiResult<()> {
        let store = self.clone();
        self.inner
            .loads
            .run(kind, move || async move {
                let result = store.fetch(kind).await;
                match &result {
                    Ok(()) => {
                        store.inner.loaded.lock().insert(kind);
                    }
                    Err(e) if e.is_rate_limited() => {
                        tracing::warn!(kind = %kind, "Load rate limited");
                        if retry_on_limit {
                            store.schedule_retry(kind);
                        }
                    }
                    Err(e) => {
                        tracing::error!(kind = %kind, error = %e, "Load failed, keeping cached data");
                    }
                }
                result
            })
            .await
    }

    /// Arrange the one retry after a rate-limited load. A retry that is
    /// already pending for `kind` absorbs further rate limits.
    fn schedule_retry(&self, kind: EntityKind) {
        if !self.inner.retry_pending.lock().insert(kind) {
            tracing::debug!(kind = %kind, "Retry already pending");
            return;
        }

        let delay = self.inner.policy.rate_limit_retry_delay;
        tracing::info!(kind = %kind, delay_ms = delay.as_millis() as u64, "Scheduling load retry");

        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if !store.is_active() {
                store.inner.retry_pending.lock().remove(&kind);
                return;
            }
            if store.inner.loads.is_in_flight(&kind) {
                tracing::debug!(kind = %kind, "Load already in flight, dropping retry");
            } else if let Err(e) = store.load(kind, false).await {
                tracing::warn!(kind = %kind, error = %e, "Load retry failed");
            }
            store.inner.retry_pending.lock().remove(&kind);
        });
    }

    async fn fetch(&self, kind: EntityKind) -> ApiResult<()> {
        match kind {
            EntityKind::Project | EntityKind::Milestone => self.fetch_projects().await,
            EntityKind::Bid => self.fetch_list::<Bid>().await,
            EntityKind::BidInvitation => self.fetch_list::<BidInvitation>().await,
            EntityKind::Consultation => self.fetch_list::<Consultation>().await,
            EntityKind::Payment => self.fetch_list::<Payment>().await,
            EntityKind::Dispute => self.fetch_list::<Dispute>().await,
            EntityKind::Message => self.fetch_list::<Message>().await,
            EntityKind::Conversation => self.fetch_list::<Conversation>().await,
            EntityKind::Notification => self.fetch_list::<Notification>().await,
            EntityKind::Freelancer => self.fetch_list::<Freelancer>().await,
            EntityKind::Client => self.fetch_list::<Client>().await,
        }
    }

    async fn fetch_projects(&self) -> ApiResult<()> {
        let mut projects = self.service::<Project>().list().await?;
        if !self.is_active() {
            return Ok(());
        }

        let mut milestones = Vec::new();
        for project in &mut projects {
            milestones.extend(project.detach_milestones());
        }
        let fetched: HashSet<String> = projects.iter().map(|p| p.id.clone()).collect();

        tracing::info!(
            projects = projects.len(),
            milestones = milestones.len(),
            "Loaded projects"
        );

        {
            let mut cache = self.inner.cache.write();
            cache.milestones.retain(|m| !fetched.contains(&m.project_id));
            cache.milestones.extend(milestones);
            cache.replace_all(projects);
        }

        self.stamp_projects_loaded().await;
        self.persist().await;
        Ok(())
    }

    async fn fetch_list<T: Cached>(&self) -> ApiResult<()> {
        let items = self.service::<T>().list().await?;
        if !self.is_active() {
            return Ok(());
        }
        tracing::debug!(kind = %T::KIND, count = items.len(), "Loaded list");
        self.inner.cache.write().replace_all(items);
        self.persist().await;
        Ok(())
    }

    async fn projects_fresh(&self) -> bool {
        if self.inner.cache.read().projects.is_empty() {
            return false;
        }
        let Some(loaded_at) =
            read_timestamp(self.inner.storage.as_ref(), PROJECTS_LOADED_AT_KEY).await
        else {
            return false;
        };
        let age_ms = Utc::now().timestamp_millis() - loaded_at;
        (0..self.inner.policy.project_freshness.as_millis() as i64).contains(&age_ms)
    }

    async fn stamp_projects_loaded(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        if !self.is_active() {
            return;
        }
        let now = Utc::now().timestamp_millis().to_string();
        if let Err(e) = self
            .inner
            .storage
            .set_item(PROJECTS_LOADED_AT_KEY, &now)
            .await
        {
            tracing::warn!(error = %e, "Failed to store projects timestamp");
        }
    }

    // ========================================================================
    // Persistence and session lifecycle
    // ========================================================================

    async fn persist(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        if !self.is_active() {
            return;
        }

        let serialized = {
            let cache = self.inner.cache.read();
            serde_json::to_string(&*cache)
        };
        let json = match serialized {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize session cache");
                return;
            }
        };

        if let Err(e) = self.inner.storage.set_item(CACHE_KEY, &json).await {
            tracing::warn!(error = %e, "Failed to persist session cache");
        }
    }

    /// Stop this store from writing to storage while leaving what it holds
    /// there for the next open.
    pub async fn detach(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        self.inner.active.store(false, Ordering::SeqCst);
        tracing::debug!(user_id = %self.inner.user_id, "Session store detached");
    }

    /// Sign-out: drop the cache and both storage keys. Nothing is persisted
    /// afterwards.
    pub async fn end_session(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        self.inner.active.store(false, Ordering::SeqCst);
        *self.inner.cache.write() = EntityCache::default();
        self.inner.loaded.lock().clear();

        for key in [CACHE_KEY, PROJECTS_LOADED_AT_KEY] {
            if let Err(e) = self.inner.storage.remove_item(key).await {
                tracing::warn!(key, error = %e, "Failed to clear session storage");
            }
        }
        tracing::info!(user_id = %self.inner.user_id, "Session ended");
    }

    // ========================================================================
    // Getters
    // ========================================================================

    fn select<T: Cached>(&self, keep: impl Fn(&T) -> bool) -> Vec<T> {
        self.inner
            .cache
            .read()
            .all::<T>()
            .iter()
            .filter(|&e| keep(e))
            .cloned()
            .collect()
    }

    fn find<T: Cached>(&self, id: &str) -> Option<T> {
        self.inner.cache.read().find::<T>(id).cloned()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.select(|_: &Project| true)
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.find(id)
    }

    /// Projects where `user_id` is the client, assigned freelancer or agent.
    pub fn get_projects_by_user(&self, user_id: &str) -> Vec<Project> {
        self.select(|p: &Project| p.involves(user_id))
    }

    /// Milestones of a project in `order`.
    pub fn milestones_by_project(&self, project_id: &str) -> Vec<Milestone> {
        let mut milestones = self.select(|m: &Milestone| m.project_id == project_id);
        milestones.sort_by_key(|m| m.order);
        milestones
    }

    pub fn milestone(&self, id: &str) -> Option<Milestone> {
        self.find(id)
    }

    pub fn bids_by_project(&self, project_id: &str) -> Vec<Bid> {
        self.select(|b: &Bid| b.project_id == project_id)
    }

    pub fn bids_by_freelancer(&self, freelancer_id: &str) -> Vec<Bid> {
        self.select(|b: &Bid| b.freelancer_id == freelancer_id)
    }

    pub fn bid(&self, id: &str) -> Option<Bid> {
        self.find(id)
    }

    pub fn invitations_by_project(&self, project_id: &str) -> Vec<BidInvitation> {
        self.select(|i: &BidInvitation| i.project_id == project_id)
    }

    pub fn invitations_for_freelancer(&self, freelancer_id: &str) -> Vec<BidInvitation> {
        self.select(|i: &BidInvitation| i.freelancer_id == freelancer_id)
    }

    pub fn consultations_by_user(&self, user_id: &str) -> Vec<Consultation> {
        self.select(|c: &Consultation| c.involves(user_id))
    }

    pub fn payments_by_project(&self, project_id: &str) -> Vec<Payment> {
        self.select(|p: &Payment| p.project_id == project_id)
    }

    pub fn disputes_by_project(&self, project_id: &str) -> Vec<Dispute> {
        self.select(|d: &Dispute| d.project_id == project_id)
    }

    pub fn disputes(&self) -> Vec<Dispute> {
        self.select(|_: &Dispute| true)
    }

    pub fn conversations_for_user(&self, user_id: &str) -> Vec<Conversation> {
        self.select(|c: &Conversation| c.participants.iter().any(|p| p == user_id))
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.find(id)
    }

    pub fn messages_by_conversation(&self, conversation_id: &str) -> Vec<Message> {
        let mut messages = self.select(|m: &Message| m.conversation_id == conversation_id);
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    /// Newest first.
    pub fn notifications_for_user(&self, user_id: &str) -> Vec<Notification> {
        let mut notifications = self.select(|n: &Notification| n.user_id == user_id);
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    pub fn unread_notification_count(&self, user_id: &str) -> usize {
        self.inner
            .cache
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count()
    }

    pub fn freelancers(&self) -> Vec<Freelancer> {
        self.select(|_: &Freelancer| true)
    }

    pub fn freelancer(&self, id: &str) -> Option<Freelancer> {
        self.find(id)
    }

    pub fn clients(&self) -> Vec<Client> {
        self.select(|_: &Client| true)
    }

    pub fn client(&self, id: &str) -> Option<Client> {
        self.find(id)
    }

    // ========================================================================
    // Cache updates
    // ========================================================================

    async fn store_entity<T: Cached>(&self, entity: &T) {
        if !self.is_active() {
            return;
        }
        self.inner.cache.write().upsert(entity.clone());
        self.persist().await;
    }

    fn previous_status<T: Notifiable>(&self, id: &str) -> Option<&'static str> {
        self.inner
            .cache
            .read()
            .find::<T>(id)
            .map(|e| e.status_key())
    }

    /// Splice `entity` into the cache and raise the notifications its status
    /// change calls for. `previous` is `None` for a newly created entity.
    async fn store_transition<T: Notifiable>(&self, entity: &T, previous: Option<&'static str>) {
        if !self.is_active() {
            return;
        }

        let notifications = {
            let mut cache = self.inner.cache.write();
            cache.upsert(entity.clone());
            let notifications = rules::notifications_for(entity, previous, &cache);
            for notification in &notifications {
                cache.upsert(notification.clone());
            }
            notifications
        };
        self.persist().await;

        if notifications.is_empty() {
            return;
        }
        tracing::debug!(
            kind = %T::KIND,
            status = entity.status_key(),
            count = notifications.len(),
            "Raised status notifications"
        );
        if let Some(channel) = &self.inner.channel {
            if channel.is_connected() {
                for notification in &notifications {
                    channel.emit(notification);
                }
            }
        }
    }

    // ========================================================================
    // Projects
    // ========================================================================

    #[tracing::instrument(skip(self, input), fields(user_id = %self.inner.user_id))]
    pub async fn create_project(&self, mut input: CreateProjectInput) -> ApiResult<Project> {
        if input.client_id.is_none() {
            input.client_id = Some(self.inner.user_id.clone());
        }
        let mut project = self
            .service::<Project>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Project, e))?;

        let milestones = project.detach_milestones();
        for milestone in &milestones {
            self.store_entity(milestone).await;
        }
        self.store_transition(&project, None).await;
        Ok(project)
    }

    #[tracing::instrument(skip(self, input), fields(user_id = %self.inner.user_id))]
    pub async fn update_project(
        &self,
        project_id: &str,
        input: UpdateProjectInput,
    ) -> ApiResult<Project> {
        let previous = self.previous_status::<Project>(project_id);
        let mut project = self
            .service::<Project>()
            .update(project_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::Project, e))?;

        let milestones = project.detach_milestones();
        for milestone in &milestones {
            self.store_entity(milestone).await;
        }
        self.store_transition(&project, previous).await;
        Ok(project)
    }

    /// Delete a project along with its cached milestones.
    pub async fn delete_project(&self, project_id: &str) -> ApiResult<()> {
        self.service::<Project>()
            .delete(project_id)
            .await
            .map_err(|e| log_failure("delete", EntityKind::Project, e))?;

        if !self.is_active() {
            return Ok(());
        }
        {
            let mut cache = self.inner.cache.write();
            cache.remove::<Project>(project_id);
            cache.milestones.retain(|m| m.project_id != project_id);
        }
        self.persist().await;
        Ok(())
    }

    // ========================================================================
    // Milestones
    // ========================================================================

    pub async fn create_milestone(&self, mut input: CreateMilestoneInput) -> ApiResult<Milestone> {
        if input.order.is_none() {
            input.order = Some(self.milestones_by_project(&input.project_id).len() as u32);
        }
        let milestone = self
            .service::<Milestone>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Milestone, e))?;

        self.store_transition(&milestone, None).await;
        Ok(milestone)
    }

    pub async fn update_milestone(
        &self,
        milestone_id: &str,
        input: UpdateMilestoneInput,
    ) -> ApiResult<Milestone> {
        let previous = self.previous_status::<Milestone>(milestone_id);
        let mut milestone = self
            .service::<Milestone>()
            .update(milestone_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::Milestone, e))?;

        // Keep the position we already know when the API omits it
        if input.order.is_none() {
            if let Some(cached) = self.milestone(milestone_id) {
                if milestone.order == 0 {
                    milestone.order = cached.order;
                }
            }
        }
        self.store_transition(&milestone, previous).await;
        Ok(milestone)
    }

    pub async fn delete_milestone(&self, milestone_id: &str) -> ApiResult<()> {
        self.service::<Milestone>()
            .delete(milestone_id)
            .await
            .map_err(|e| log_failure("delete", EntityKind::Milestone, e))?;

        if self.is_active() {
            self.inner.cache.write().remove::<Milestone>(milestone_id);
            self.persist().await;
        }
        Ok(())
    }

    // ========================================================================
    // Bids and invitations
    // ========================================================================

    pub async fn create_bid(&self, mut input: CreateBidInput) -> ApiResult<Bid> {
        if input.freelancer_id.is_none() {
            input.freelancer_id = Some(self.inner.user_id.clone());
        }
        let bid = self
            .service::<Bid>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Bid, e))?;

        self.store_transition(&bid, None).await;
        Ok(bid)
    }

    pub async fn update_bid(&self, bid_id: &str, input: UpdateBidInput) -> ApiResult<Bid> {
        let previous = self.previous_status::<Bid>(bid_id);
        let bid = self
            .service::<Bid>()
            .update(bid_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::Bid, e))?;

        self.store_transition(&bid, previous).await;
        Ok(bid)
    }

    /// Accept a bid, reject its live siblings and assign the project to the
    /// bidder at the bid amount.
    ///
    /// The steps are independent requests; a failure part way leaves the
    /// earlier steps applied.
    #[tracing::instrument(skip(self), fields(user_id = %self.inner.user_id))]
    pub async fn accept_bid(&self, bid_id: &str) -> ApiResult<AcceptedBid> {
        self.ensure_loaded(EntityKind::Bid).await?;

        let accepted = self
            .update_bid(bid_id, UpdateBidInput::status(BidStatus::Accepted))
            .await?;

        let siblings: Vec<String> = self
            .bids_by_project(&accepted.project_id)
            .into_iter()
            .filter(|b| b.id != accepted.id && b.status.is_live())
            .map(|b| b.id)
            .collect();

        for sibling in &siblings {
            self.update_bid(sibling, UpdateBidInput::status(BidStatus::Rejected))
                .await?;
        }

        let project = self
            .update_project(
                &accepted.project_id,
                UpdateProjectInput {
                    status: Some(ProjectStatus::Assigned),
                    freelancer_id: Some(accepted.freelancer_id.clone()),
                    freelancer_budget: Some(accepted.amount),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            project_id = %project.id,
            bid_id = %accepted.id,
            freelancer_id = %accepted.freelancer_id,
            rejected = siblings.len(),
            "Bid accepted"
        );

        Ok(AcceptedBid {
            bid: accepted,
            project,
            rejected_bid_ids: siblings,
        })
    }

    pub async fn create_bid_invitation(
        &self,
        mut input: CreateBidInvitationInput,
    ) -> ApiResult<BidInvitation> {
        if input.invited_by.is_none() {
            input.invited_by = Some(self.inner.user_id.clone());
        }
        let invitation = self
            .service::<BidInvitation>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::BidInvitation, e))?;

        self.store_transition(&invitation, None).await;
        Ok(invitation)
    }

    pub async fn update_bid_invitation(
        &self,
        invitation_id: &str,
        input: UpdateBidInvitationInput,
    ) -> ApiResult<BidInvitation> {
        let previous = self.previous_status::<BidInvitation>(invitation_id);
        let invitation = self
            .service::<BidInvitation>()
            .update(invitation_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::BidInvitation, e))?;

        self.store_transition(&invitation, previous).await;
        Ok(invitation)
    }

    // ========================================================================
    // Consultations, payments, disputes
    // ========================================================================

    pub async fn create_consultation(
        &self,
        mut input: CreateConsultationInput,
    ) -> ApiResult<Consultation> {
        if input.client_id.is_none() {
            input.client_id = Some(self.inner.user_id.clone());
        }
        let consultation = self
            .service::<Consultation>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Consultation, e))?;

        self.store_transition(&consultation, None).await;
        Ok(consultation)
    }

    pub async fn update_consultation(
        &self,
        consultation_id: &str,
        input: UpdateConsultationInput,
    ) -> ApiResult<Consultation> {
        let previous = self.previous_status::<Consultation>(consultation_id);
        let consultation = self
            .service::<Consultation>()
            .update(consultation_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::Consultation, e))?;

        self.store_transition(&consultation, previous).await;
        Ok(consultation)
    }

    pub async fn create_payment(&self, input: CreatePaymentInput) -> ApiResult<Payment> {
        let payment = self
            .service::<Payment>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Payment, e))?;

        self.store_transition(&payment, None).await;
        Ok(payment)
    }

    pub async fn update_payment(
        &self,
        payment_id: &str,
        input: UpdatePaymentInput,
    ) -> ApiResult<Payment> {
        let previous = self.previous_status::<Payment>(payment_id);
        let payment = self
            .service::<Payment>()
            .update(payment_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::Payment, e))?;

        self.store_transition(&payment, previous).await;
        Ok(payment)
    }

    pub async fn create_dispute(&self, mut input: CreateDisputeInput) -> ApiResult<Dispute> {
        if input.raised_by.is_none() {
            input.raised_by = Some(self.inner.user_id.clone());
        }
        let dispute = self
            .service::<Dispute>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Dispute, e))?;

        self.store_transition(&dispute, None).await;
        Ok(dispute)
    }

    pub async fn update_dispute(
        &self,
        dispute_id: &str,
        input: UpdateDisputeInput,
    ) -> ApiResult<Dispute> {
        let previous = self.previous_status::<Dispute>(dispute_id);
        let dispute = self
            .service::<Dispute>()
            .update(dispute_id, &input)
            .await
            .map_err(|e| log_failure("update", EntityKind::Dispute, e))?;

        self.store_transition(&dispute, previous).await;
        Ok(dispute)
    }

    // ========================================================================
    // Messaging
    // ========================================================================

    pub async fn create_conversation(
        &self,
        mut input: CreateConversationInput,
    ) -> ApiResult<Conversation> {
        if !input.participants.contains(&self.inner.user_id) {
            input.participants.push(self.inner.user_id.clone());
        }
        let conversation = self
            .service::<Conversation>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Conversation, e))?;

        self.store_entity(&conversation).await;
        Ok(conversation)
    }

    /// Send a message and bump the cached conversation preview.
    pub async fn send_message(&self, mut input: SendMessageInput) -> ApiResult<Message> {
        if input.sender_id.is_none() {
            input.sender_id = Some(self.inner.user_id.clone());
        }
        let message = self
            .service::<Message>()
            .create(&input)
            .await
            .map_err(|e| log_failure("create", EntityKind::Message, e))?;

        if !self.is_active() {
            return Ok(message);
        }
        {
            let mut cache = self.inner.cache.write();
            cache.upsert(message.clone());
            let preview = cache
                .find::<Conversation>(&message.conversation_id)
                .cloned()
                .map(|mut conversation| {
                    conversation.last_message = Some(message.content.clone());
                    conversation.updated_at = message.created_at.or_else(|| Some(Utc::now()));
                    conversation
                });
            if let Some(conversation) = preview {
                cache.upsert(conversation);
            }
        }
        self.persist().await;
        Ok(message)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Ingest a notification pushed over the socket. Returns whether it was
    /// new and addressed to this session's user.
    pub async fn receive_notification(&self, notification: Notification) -> bool {
        if notification.user_id != self.inner.user_id || !self.is_active() {
            return false;
        }
        {
            let mut cache = self.inner.cache.write();
            if cache.find::<Notification>(&notification.id).is_some() {
                return false;
            }
            cache.upsert(notification);
        }
        self.persist().await;
        true
    }

    /// Mark one notification read. Notifications raised by this gateway are
    /// unknown to the API, so a 404 for a cached one is settled locally.
    pub async fn mark_notification_read(&self, notification_id: &str) -> ApiResult<Notification> {
        let result = self
            .service::<Notification>()
            .update(notification_id, &serde_json::json!({ "read": true }))
            .await;

        let notification = match result {
            Ok(notification) => notification,
            Err(ApiError::NotFound(_)) if self.find::<Notification>(notification_id).is_some() => {
                let mut local = self
                    .find::<Notification>(notification_id)
                    .ok_or_else(|| ApiError::not_found("Notification not found"))?;
                local.read = true;
                local
            }
            Err(e) => return Err(log_failure("update", EntityKind::Notification, e)),
        };

        self.store_entity(&notification).await;
        Ok(notification)
    }

    /// Mark every unread notification of this user read. Returns how many
    /// changed.
    pub async fn mark_all_notifications_read(&self) -> ApiResult<usize> {
        let unread: Vec<String> = self
            .select(|n: &Notification| n.user_id == self.inner.user_id && !n.read)
            .into_iter()
            .map(|n| n.id)
            .collect();

        for id in &unread {
            self.mark_notification_read(id).await?;
        }
        Ok(unread.len())
    }
}
