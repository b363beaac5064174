//! The testimonials dashboard page.
//!
//! Owns no records itself: the list lives in the [`QueryCache`] under the
//! current principal's key, edits live in the [`TestimonialForm`], and every
//! successful write invalidates the list so the next render re-reads it.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::api::{ApiError, TestimonyApi};
use super::cache::{QueryCache, QueryKey, QueryState};
use super::form::{Field, FormError, FormMode, SaveRequest, TestimonialForm};
use super::view::{render_page, PageView, SaveStatus};
use super::SessionProvider;
use crate::types::Testimonial;

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this testimonial?";

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Not signed in")]
    NotSignedIn,
    #[error("A save is already in progress")]
    SaveInFlight,
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

struct UiState {
    form: TestimonialForm,
    saving: bool,
    error: Option<String>,
}

pub struct TestimonialsPage {
    api: Arc<dyn TestimonyApi>,
    session: Arc<dyn SessionProvider>,
    cache: Arc<QueryCache<Vec<Testimonial>>>,
    // Never held across an await.
    ui: Mutex<UiState>,
}

impl TestimonialsPage {
    pub fn new(
        api: Arc<dyn TestimonyApi>,
        session: Arc<dyn SessionProvider>,
        cache: Arc<QueryCache<Vec<Testimonial>>>,
    ) -> Self {
        let principal = session.principal_id().unwrap_or_default();
        Self {
            api,
            session,
            cache,
            ui: Mutex::new(UiState {
                form: TestimonialForm::new(principal),
                saving: false,
                error: None,
            }),
        }
    }

    /// The signed-in principal. A change of principal discards the draft of
    /// the previous one and marks its cached reads stale, so switching back
    /// re-reads instead of showing what was cached before.
    fn current_principal(&self) -> Option<String> {
        let id = self.session.principal_id()?;
        let mut ui = self.ui.lock();
        if ui.form.principal_id() != id {
            let previous = ui.form.principal_id().to_string();
            if !previous.is_empty() {
                self.cache.invalidate_scope(&previous);
                log::info!("Session changed from {} to {}", previous, id);
            }
            ui.form = TestimonialForm::new(id.clone());
            ui.error = None;
        }
        Some(id)
    }

    /// Read the principal's list through the cache. Disabled (`Idle`, no
    /// request) until a principal is known.
    pub async fn load(&self) -> QueryState<Vec<Testimonial>> {
        let Some(principal) = self.current_principal() else {
            return QueryState::Idle;
        };
        let key = QueryKey::testimonials(&principal);
        let api = self.api.clone();
        self.cache
            .fetch(&key, || async move { api.list(&principal).await })
            .await
    }

    /// Fetch if needed, then render.
    pub async fn render(&self) -> PageView {
        let list = self.load().await;
        self.render_with(&list)
    }

    /// Render from what is cached right now, without a request. A stale list
    /// shows as loading rather than as outdated data.
    pub fn snapshot(&self) -> PageView {
        let list = match self.session.principal_id() {
            None => QueryState::Idle,
            Some(principal) => {
                let key = QueryKey::testimonials(&principal);
                match self.cache.state(&key) {
                    QueryState::Ready(_) if self.cache.is_stale(&key) => QueryState::Loading,
                    QueryState::Idle => QueryState::Loading,
                    state => state,
                }
            }
        };
        self.render_with(&list)
    }

    fn render_with(&self, list: &QueryState<Vec<Testimonial>>) -> PageView {
        let ui = self.ui.lock();
        render_page(
            list,
            &ui.form,
            SaveStatus {
                submitting: ui.saving,
                error: ui.error.as_deref(),
            },
        )
    }

    pub fn form(&self) -> TestimonialForm {
        self.ui.lock().form.clone()
    }

    pub fn edit(&self, testimonial: &Testimonial) {
        let mut ui = self.ui.lock();
        ui.form.begin_edit(testimonial);
        ui.error = None;
    }

    pub fn cancel_edit(&self) {
        let mut ui = self.ui.lock();
        ui.form.cancel();
        ui.error = None;
    }

    pub fn set_field(&self, field: Field, value: impl Into<String>) {
        self.ui.lock().form.set_field(field, value);
    }

    /// Upload collaborator callback.
    pub fn on_image_uploaded(&self, url: impl Into<String>) {
        self.ui.lock().form.on_image_uploaded(url);
    }

    /// Save the draft: create in create mode, update in edit mode.
    ///
    /// On success the list is invalidated and the form reset. On failure the
    /// draft is kept and the error is shown on the form so the user can
    /// resubmit. While a save is outstanding further submits are refused
    /// without a request.
    pub async fn submit(&self) -> Result<Testimonial, PageError> {
        let principal = self.current_principal().ok_or(PageError::NotSignedIn)?;

        let request = {
            let mut ui = self.ui.lock();
            if ui.saving {
                return Err(PageError::SaveInFlight);
            }
            match ui.form.submit() {
                Ok(request) => {
                    ui.saving = true;
                    ui.error = None;
                    request
                }
                Err(e) => {
                    ui.error = Some(e.to_string());
                    return Err(e.into());
                }
            }
        };

        let result = match &request {
            SaveRequest::Create(new) => self.api.create(new).await,
            SaveRequest::Update { id, patch } => self.api.update(*id, patch).await,
        };

        // Invalidate the key captured before the await, so a save that
        // completes after a principal switch only touches its own list.
        let mut ui = self.ui.lock();
        ui.saving = false;
        match result {
            Ok(saved) => {
                self.cache.invalidate(&QueryKey::testimonials(&principal));
                if ui.form.principal_id() == principal {
                    ui.form.reset();
                }
                log::info!("Saved testimonial {} for {}", saved.id, principal);
                Ok(saved)
            }
            Err(e) => {
                log::warn!("Saving testimonial for {} failed: {}", principal, e);
                ui.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Delete the selected record after explicit confirmation. The target
    /// comes from the card, never from the draft.
    pub async fn request_delete(
        &self,
        id: i64,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, PageError> {
        if !confirm.confirm(DELETE_CONFIRMATION) {
            return Ok(DeleteOutcome::Cancelled);
        }
        let principal = self.current_principal().ok_or(PageError::NotSignedIn)?;

        if let Err(e) = self.api.delete(id).await {
            log::warn!("Deleting testimonial {} failed: {}", id, e);
            self.ui.lock().error = Some(e.to_string());
            return Err(e.into());
        }

        self.cache.invalidate(&QueryKey::testimonials(&principal));
        let mut ui = self.ui.lock();
        if ui.form.mode() == FormMode::Edit(id) {
            ui.form.reset();
        }
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::auth::Principal;
    use crate::client::view::CardView;
    use crate::db::test_utils::{seed_user, test_db};
    use crate::db::TestimonialDb;
    use crate::error::{ErrorBody, ServiceError};
    use crate::services::testimonials as service;
    use crate::types::{NewTestimonial, TestimonialPatch};

    /// In-process transport backed by the real service layer.
    struct LocalApi {
        db: Arc<Mutex<TestimonialDb>>,
        principal: Principal,
        list_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        fail_writes: AtomicBool,
        delay: Duration,
    }

    impl LocalApi {
        fn new(db: Arc<Mutex<TestimonialDb>>, principal: &str) -> Self {
            Self {
                db,
                principal: Principal::new(principal),
                list_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
                fail_writes: AtomicBool::new(false),
                delay: Duration::ZERO,
            }
        }

        fn check_writes(&self) -> Result<(), ApiError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 500,
                    message: "Internal server error".to_string(),
                });
            }
            Ok(())
        }
    }

    fn api_error(e: ServiceError) -> ApiError {
        ApiError::Status {
            status: e.status_code().as_u16(),
            message: ErrorBody::from(&e).error,
        }
    }

    #[async_trait]
    impl TestimonyApi for LocalApi {
        async fn list(&self, user_id: &str) -> Result<Vec<Testimonial>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            service::list_testimonials(&self.db.lock(), user_id).map_err(api_error)
        }

        async fn create(&self, new: &NewTestimonial) -> Result<Testimonial, ApiError> {
            tokio::time::sleep(self.delay).await;
            self.check_writes()?;
            service::create_testimonial(&self.db.lock(), &self.principal, new.clone())
                .map_err(api_error)
        }

        async fn update(&self, id: i64, patch: &TestimonialPatch) -> Result<Testimonial, ApiError> {
            tokio::time::sleep(self.delay).await;
            self.check_writes()?;
            service::update_testimonial(&self.db.lock(), &self.principal, id, patch.clone())
                .map_err(api_error)
        }

        async fn delete(&self, id: i64) -> Result<(), ApiError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.check_writes()?;
            service::delete_testimonial(&self.db.lock(), &self.principal, id).map_err(api_error)
        }
    }

    struct SwitchableSession(Mutex<Option<String>>);

    impl SessionProvider for SwitchableSession {
        fn principal_id(&self) -> Option<String> {
            self.0.lock().clone()
        }
    }

    fn shared_db() -> Arc<Mutex<TestimonialDb>> {
        let db = test_db();
        seed_user(&db, "u1");
        seed_user(&db, "u2");
        Arc::new(Mutex::new(db))
    }

    fn page_for(api: Arc<LocalApi>, principal: Option<&str>) -> TestimonialsPage {
        TestimonialsPage::new(
            api,
            Arc::new(crate::client::StaticSession(principal.map(str::to_string))),
            Arc::new(QueryCache::new()),
        )
    }

    fn fill_ana(page: &TestimonialsPage) {
        page.set_field(Field::Name, "Ana");
        page.set_field(Field::Testimony, "Great product");
        page.set_field(Field::OrgName, "Acme");
        page.set_field(Field::Role, "CTO");
    }

    fn cards(view: PageView) -> Vec<CardView> {
        match view {
            PageView::Ready { cards, .. } => cards,
            other => panic!("expected ready view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_edit_and_foreign_patch_scenario() {
        let db = shared_db();
        let api = Arc::new(LocalApi::new(db.clone(), "u1"));
        let page = page_for(api.clone(), Some("u1"));

        assert!(cards(page.render().await).is_empty());

        fill_ana(&page);
        let created = page.submit().await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.user_id, "u1");
        assert_eq!(page.form().mode(), FormMode::Create, "form resets after save");

        let listed = cards(page.render().await);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        page.edit(&created);
        page.set_field(Field::Testimony, "Even better now");
        let updated = page.submit().await.unwrap();
        assert_eq!(updated.id, created.id);

        let listed = cards(page.render().await);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body, "Even better now");
        assert_eq!(listed[0].name, "Ana");
        assert_eq!(listed[0].subtitle, "CTO at Acme");

        let intruder = LocalApi::new(db.clone(), "u2");
        let patch = TestimonialPatch {
            testimony: Some("pwned".to_string()),
            ..Default::default()
        };
        let err = intruder.update(created.id, &patch).await.unwrap_err();
        assert_eq!(err.status(), Some(404));

        page.cache.invalidate(&QueryKey::testimonials("u1"));
        let listed = cards(page.render().await);
        assert_eq!(listed[0].body, "Even better now");
        assert!(intruder.list("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_disabled_until_signed_in() {
        let api = Arc::new(LocalApi::new(shared_db(), "u1"));
        let page = page_for(api.clone(), None);

        assert_eq!(page.render().await, PageView::SignedOut);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);

        fill_ana(&page);
        assert!(matches!(page.submit().await, Err(PageError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_save_invalidates_and_next_render_refetches() {
        let api = Arc::new(LocalApi::new(shared_db(), "u1"));
        let page = page_for(api.clone(), Some("u1"));

        page.render().await;
        page.render().await;
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1, "fresh list is reused");

        fill_ana(&page);
        page.submit().await.unwrap();
        assert_eq!(page.snapshot(), PageView::Loading, "stale list is not shown");

        let listed = cards(page.render().await);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let api = Arc::new(LocalApi::new(shared_db(), "u1"));
        let page = page_for(api.clone(), Some("u1"));
        fill_ana(&page);
        let created = page.submit().await.unwrap();

        let declined = page.request_delete(created.id, &|_: &str| false).await.unwrap();
        assert_eq!(declined, DeleteOutcome::Cancelled);
        assert_eq!(api.delete_calls.load(Ordering::SeqCst), 0);
        assert_eq!(cards(page.render().await).len(), 1);

        let asked = Mutex::new(None);
        let confirm = |message: &str| {
            *asked.lock() = Some(message.to_string());
            true
        };
        let outcome = page.request_delete(created.id, &confirm).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(asked.lock().as_deref(), Some(DELETE_CONFIRMATION));
        assert!(cards(page.render().await).is_empty());
    }

    #[tokio::test]
    async fn test_deleting_record_under_edit_resets_form() {
        let api = Arc::new(LocalApi::new(shared_db(), "u1"));
        let page = page_for(api.clone(), Some("u1"));
        fill_ana(&page);
        let created = page.submit().await.unwrap();

        page.edit(&created);
        page.request_delete(created.id, &|_: &str| true).await.unwrap();
        assert_eq!(page.form().mode(), FormMode::Create);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_draft_and_cache() {
        let api = Arc::new(LocalApi::new(shared_db(), "u1"));
        let page = page_for(api.clone(), Some("u1"));
        page.render().await;

        api.fail_writes.store(true, Ordering::SeqCst);
        fill_ana(&page);
        let err = page.submit().await.unwrap_err();
        assert!(matches!(err, PageError::Api(_)));

        assert_eq!(page.form().draft().name, "Ana", "draft survives the failure");
        let view = page.render().await;
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1, "cache untouched");
        match view {
            PageView::Ready { form, .. } => {
                assert_eq!(
                    form.error.as_deref(),
                    Some("API error 500: Internal server error")
                );
            }
            other => panic!("expected ready view, got {other:?}"),
        }

        api.fail_writes.store(false, Ordering::SeqCst);
        page.submit().await.unwrap();
        assert_eq!(cards(page.render().await).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_dispatched() {
        let api = Arc::new(LocalApi::new(shared_db(), "u1"));
        let page = page_for(api.clone(), Some("u1"));
        page.set_field(Field::Name, "Ana");

        let err = page.submit().await.unwrap_err();
        assert!(matches!(err, PageError::Form(_)));
        assert_eq!(db_count(&api, "u1"), 0);
    }

    fn db_count(api: &LocalApi, user: &str) -> i64 {
        api.db.lock().count_testimonials_for_user(user).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_shows_submitting_while_save_is_outstanding() {
        let mut api = LocalApi::new(shared_db(), "u1");
        api.delay = Duration::from_millis(30);
        let api = Arc::new(api);
        let page = page_for(api.clone(), Some("u1"));
        page.render().await;
        fill_ana(&page);

        let (saved, during) = tokio::join!(page.submit(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            page.snapshot()
        });

        saved.unwrap();
        match during {
            PageView::Ready { form, .. } => assert!(form.submitting),
            other => panic!("expected ready view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_principal_switch_uses_separate_list_and_fresh_form() {
        let db = shared_db();
        let api = Arc::new(LocalApi::new(db.clone(), "u1"));
        let session = Arc::new(SwitchableSession(Mutex::new(Some("u1".to_string()))));
        let page = TestimonialsPage::new(api.clone(), session.clone(), Arc::new(QueryCache::new()));

        fill_ana(&page);
        page.submit().await.unwrap();
        assert_eq!(cards(page.render().await).len(), 1);

        page.set_field(Field::Name, "half-typed");
        *session.0.lock() = Some("u2".to_string());

        assert!(cards(page.render().await).is_empty());
        let form = page.form();
        assert_eq!(form.principal_id(), "u2");
        assert_eq!(form.draft().name, "");
        assert_eq!(form.draft().user_id, "u2");
    }

    #[tokio::test]
    async fn test_second_submit_while_saving_is_refused() {
        let mut api = LocalApi::new(shared_db(), "u1");
        api.delay = Duration::from_millis(30);
        let api = Arc::new(api);
        let page = page_for(api.clone(), Some("u1"));
        fill_ana(&page);

        let (first, second) = tokio::join!(page.submit(), page.submit());

        assert!(first.is_ok());
        assert!(matches!(second, Err(PageError::SaveInFlight)));
        assert_eq!(db_count(&api, "u1"), 1, "only one record is created");
        assert_eq!(page.form().mode(), FormMode::Create);
    }

    #[tokio::test]
    async fn test_switching_back_rereads_previous_principal() {
        let db = shared_db();
        let api = Arc::new(LocalApi::new(db.clone(), "u1"));
        let session = Arc::new(SwitchableSession(Mutex::new(Some("u1".to_string()))));
        let page = TestimonialsPage::new(api.clone(), session.clone(), Arc::new(QueryCache::new()));

        assert!(cards(page.render().await).is_empty());
        *session.0.lock() = Some("u2".to_string());
        assert!(cards(page.render().await).is_empty());

        // Another u1 session writes while this page shows u2.
        let new = NewTestimonial {
            name: "Ana".to_string(),
            testimony: "Written elsewhere".to_string(),
            org_name: "Acme".to_string(),
            role: "CTO".to_string(),
            ..Default::default()
        };
        service::create_testimonial(&db.lock(), &Principal::new("u1"), new).unwrap();

        *session.0.lock() = Some("u1".to_string());
        let listed = cards(page.render().await);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body, "Written elsewhere");
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 3);
    }
}
