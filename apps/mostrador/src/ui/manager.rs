use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::api::{CatalogClient, CatalogError};
use crate::model::{Product, ProductDraft};
use crate::ui::form::ProductForm;

/// How long a transient banner stays on screen.
pub const MESSAGE_TTL: Duration = Duration::from_secs(2);

const SAVE_ERROR: &str = "An error occurred while saving the product.";
const DELETE_ERROR: &str = "An error occurred while deleting the product.";

/// A transient status message carrying its own dismissal deadline. Setting a
/// new banner replaces the old one wholesale, so a replaced banner's deadline
/// never fires.
#[derive(Debug, Clone)]
pub struct Banner {
    text: String,
    expires_at: Instant,
}

impl Banner {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            expires_at: Instant::now() + MESSAGE_TTL,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Which part of the screen receives key input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Name,
    Description,
    Price,
    List,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Name => Focus::Description,
            Focus::Description => Focus::Price,
            Focus::Price => Focus::List,
            Focus::List => Focus::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Name => Focus::List,
            Focus::Description => Focus::Name,
            Focus::Price => Focus::Description,
            Focus::List => Focus::Price,
        }
    }
}

/// A catalog call the event loop should issue on the manager's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRequest {
    List,
    Create(ProductDraft),
    Update(u64, ProductDraft),
    Delete(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Created,
    Updated,
}

/// Completion of a catalog call, fed back into [`ProductManager::apply`].
#[derive(Debug)]
pub enum CatalogEvent {
    Listed(Result<Vec<Product>, CatalogError>),
    Saved {
        kind: SaveKind,
        result: Result<Product, CatalogError>,
    },
    Deleted {
        id: u64,
        result: Result<(), CatalogError>,
    },
}

/// Run one catalog request to completion. The event loop spawns this so the
/// UI stays responsive; tests await it inline against a mock backend.
pub async fn execute(client: &CatalogClient, request: CatalogRequest) -> CatalogEvent {
    match request {
        CatalogRequest::List => CatalogEvent::Listed(client.list().await),
        CatalogRequest::Create(draft) => CatalogEvent::Saved {
            kind: SaveKind::Created,
            result: client.create(&draft).await,
        },
        CatalogRequest::Update(id, draft) => CatalogEvent::Saved {
            kind: SaveKind::Updated,
            result: client.update(id, &draft).await,
        },
        CatalogRequest::Delete(id) => CatalogEvent::Deleted {
            id,
            result: client.delete(id).await,
        },
    }
}

/// All screen state: the product list, the edit target, the form, and the
/// two transient banners. Mutated only from the event loop; network
/// completions re-enter through [`apply`](Self::apply) in arrival order, so
/// overlapping operations resolve last-write-wins.
#[derive(Debug, Default)]
pub struct ProductManager {
    pub products: Vec<Product>,
    pub editing: Option<Product>,
    pub form: ProductForm,
    pub focus: Focus,
    pub selected: usize,
    pub error: Option<Banner>,
    pub success: Option<Banner>,
}

impl ProductManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the form and produce the save request: an update when an
    /// edit target is set, a create otherwise. An invalid form surfaces the
    /// first problem through the error banner and issues nothing.
    pub fn submit(&mut self) -> Option<CatalogRequest> {
        let draft = match self.form.to_draft() {
            Ok(draft) => draft,
            Err(err) => {
                self.set_error(err.to_string());
                return None;
            }
        };
        match &self.editing {
            Some(product) => Some(CatalogRequest::Update(product.id, draft)),
            None => Some(CatalogRequest::Create(draft)),
        }
    }

    /// Seed the form from the selected product and make it the edit target.
    pub fn begin_edit_selected(&mut self) {
        if let Some(product) = self.products.get(self.selected) {
            self.form = ProductForm::from_product(product);
            self.editing = Some(product.clone());
            self.focus = Focus::Name;
        }
    }

    /// Leave edit mode without saving. Local only; nothing is issued.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.form.clear();
    }

    pub fn delete_selected(&self) -> Option<CatalogRequest> {
        self.products
            .get(self.selected)
            .map(|product| CatalogRequest::Delete(product.id))
    }

    /// Fold a completion back into the state. Returns the follow-up request
    /// to issue, if any (every successful mutation re-fetches the list).
    pub fn apply(&mut self, event: CatalogEvent) -> Option<CatalogRequest> {
        match event {
            CatalogEvent::Listed(Ok(products)) => {
                self.selected = self.selected.min(products.len().saturating_sub(1));
                self.products = products;
                None
            }
            CatalogEvent::Listed(Err(err)) => {
                // Deliberately silent for the user: the list degrades to
                // stale instead of surfacing an error on every refresh.
                warn!(target = "mostrador::catalog", error = %err, "list refresh failed");
                None
            }
            CatalogEvent::Saved {
                kind,
                result: Ok(product),
            } => {
                debug!(
                    target = "mostrador::catalog",
                    id = product.id,
                    ?kind,
                    "product saved"
                );
                self.set_success(match kind {
                    SaveKind::Created => "Product saved.",
                    SaveKind::Updated => "Product updated.",
                });
                self.form.clear();
                self.editing = None;
                Some(CatalogRequest::List)
            }
            CatalogEvent::Saved {
                kind,
                result: Err(err),
            } => {
                error!(target = "mostrador::catalog", error = %err, ?kind, "save failed");
                self.set_error(SAVE_ERROR);
                None
            }
            CatalogEvent::Deleted { id, result: Ok(()) } => {
                debug!(target = "mostrador::catalog", id, "product deleted");
                self.set_success("Product deleted.");
                self.form.clear();
                self.editing = None;
                Some(CatalogRequest::List)
            }
            CatalogEvent::Deleted {
                id,
                result: Err(err),
            } => {
                error!(target = "mostrador::catalog", error = %err, id, "delete failed");
                self.set_error(DELETE_ERROR);
                None
            }
        }
    }

    pub fn select_next(&mut self) {
        if !self.products.is_empty() {
            self.selected = (self.selected + 1).min(self.products.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// The form field the focus points at, if any.
    pub fn active_field_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::Name => Some(&mut self.form.name),
            Focus::Description => Some(&mut self.form.description),
            Focus::Price => Some(&mut self.form.price),
            Focus::List => None,
        }
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.error = Some(Banner::new(text));
        self.success = None;
    }

    fn set_success(&mut self, text: impl Into<String>) {
        self.success = Some(Banner::new(text));
        self.error = None;
    }

    /// Drop any banner whose deadline has passed.
    pub fn expire_messages(&mut self) {
        let now = Instant::now();
        if self.error.as_ref().is_some_and(|b| b.expired(now)) {
            self.error = None;
        }
        if self.success.as_ref().is_some_and(|b| b.expired(now)) {
            self.success = None;
        }
    }

    /// The nearest pending banner deadline, for the event loop to sleep on.
    pub fn next_message_deadline(&self) -> Option<Instant> {
        let deadlines = [
            self.error.as_ref().map(|b| b.expires_at),
            self.success.as_ref().map(|b| b.expires_at),
        ];
        deadlines.into_iter().flatten().min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MockCatalogBackend;
    use crate::api::ApiConfig;
    use std::sync::Arc;
    use tokio::time::advance;

    fn client_with(backend: Arc<MockCatalogBackend>) -> CatalogClient {
        let config = ApiConfig::new("http://mock.server")
            .unwrap()
            .with_credentials("admin", "secret");
        CatalogClient::with_backend(config, backend)
    }

    fn fill_form(manager: &mut ProductManager) {
        manager.form.name = "Pen".into();
        manager.form.description = "Blue ink".into();
        manager.form.price = "1.5".into();
    }

    fn pen(id: u64) -> Product {
        Product {
            id,
            name: "Pen".into(),
            description: "Blue ink".into(),
            price: 1.5,
        }
    }

    /// Run a request and every follow-up it triggers, exactly the way the
    /// event loop does, minus the spawning.
    async fn drive(
        manager: &mut ProductManager,
        client: &CatalogClient,
        mut request: Option<CatalogRequest>,
    ) {
        while let Some(next) = request.take() {
            let event = execute(client, next).await;
            request = manager.apply(event);
        }
    }

    #[tokio::test]
    async fn valid_submit_without_edit_target_creates_then_refreshes() {
        let backend = Arc::new(MockCatalogBackend::new());
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        fill_form(&mut manager);

        let request = manager.submit();
        assert!(matches!(request, Some(CatalogRequest::Create(_))));

        drive(&mut manager, &client, request).await;

        assert_eq!(
            backend.calls().await,
            vec!["POST /productos", "GET /productos"]
        );
        let draft = backend.last_draft().await.unwrap();
        assert_eq!(draft.name, "Pen");
        assert_eq!(draft.description, "Blue ink");
        assert_eq!(draft.price, 1.5);

        assert_eq!(manager.success.as_ref().unwrap().text(), "Product saved.");
        assert!(manager.error.is_none());
        assert!(manager.form.is_empty());
        assert!(manager.editing.is_none());
        assert_eq!(manager.products.len(), 1);
    }

    #[tokio::test]
    async fn submit_with_edit_target_updates_that_id() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![pen(7)]));
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;

        manager.begin_edit_selected();
        assert_eq!(manager.editing.as_ref().unwrap().id, 7);
        assert_eq!(manager.form.name, "Pen");

        manager.form.price = "2.0".into();
        let request = manager.submit();
        assert!(matches!(request, Some(CatalogRequest::Update(7, _))));

        drive(&mut manager, &client, request).await;

        assert!(
            backend
                .calls()
                .await
                .contains(&"PUT /productos/7".to_string())
        );
        assert_eq!(backend.last_draft().await.unwrap().price, 2.0);
        assert_eq!(
            manager.success.as_ref().unwrap().text(),
            "Product updated."
        );
        assert!(manager.editing.is_none());
        assert!(manager.form.is_empty());
    }

    #[tokio::test]
    async fn failed_submit_preserves_form_and_edit_target() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![pen(7)]));
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;

        manager.begin_edit_selected();
        manager.form.price = "2.0".into();
        backend.set_fail(true);

        let request = manager.submit();
        drive(&mut manager, &client, request).await;

        assert_eq!(manager.error.as_ref().unwrap().text(), SAVE_ERROR);
        assert!(manager.success.is_none());
        assert_eq!(manager.editing.as_ref().unwrap().id, 7);
        assert_eq!(manager.form.price, "2.0");
        assert_eq!(manager.form.name, "Pen");
    }

    #[tokio::test]
    async fn successful_delete_refreshes_and_returns_to_idle() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![pen(7)]));
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;
        manager.begin_edit_selected();

        let request = manager.delete_selected();
        assert_eq!(request, Some(CatalogRequest::Delete(7)));

        drive(&mut manager, &client, request).await;

        assert_eq!(
            manager.success.as_ref().unwrap().text(),
            "Product deleted."
        );
        assert!(manager.error.is_none());
        assert!(manager.editing.is_none());
        assert!(manager.form.is_empty());
        assert!(manager.products.is_empty());
    }

    #[tokio::test]
    async fn failed_delete_sets_error_and_leaves_list_unchanged() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![pen(7)]));
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;

        backend.set_fail(true);
        let request = manager.delete_selected();
        drive(&mut manager, &client, request).await;

        assert_eq!(manager.error.as_ref().unwrap().text(), DELETE_ERROR);
        assert!(manager.success.is_none());
        assert_eq!(manager.products.len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_is_silent() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![pen(7)]));
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;

        backend.set_fail(true);
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;

        assert!(manager.error.is_none());
        assert!(manager.success.is_none());
        assert_eq!(manager.products.len(), 1);
    }

    #[tokio::test]
    async fn invalid_form_issues_nothing_and_surfaces_first_problem() {
        let backend = Arc::new(MockCatalogBackend::new());
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        manager.form.description = "Blue ink".into();

        let request = manager.submit();
        assert!(request.is_none());
        drive(&mut manager, &client, request).await;

        assert_eq!(manager.error.as_ref().unwrap().text(), "Name is required");
        assert!(backend.calls().await.is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn banners_clear_each_other() {
        let mut manager = ProductManager::new();
        manager.set_success("Product saved.");
        assert!(manager.success.is_some());

        manager.set_error(SAVE_ERROR);
        assert!(manager.success.is_none());
        assert!(manager.error.is_some());

        manager.set_success("Product saved.");
        assert!(manager.error.is_none());
        assert!(manager.success.is_some());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn banner_expires_after_exactly_two_seconds() {
        let mut manager = ProductManager::new();
        manager.set_success("Product saved.");

        advance(Duration::from_millis(1999)).await;
        manager.expire_messages();
        assert!(manager.success.is_some());

        advance(Duration::from_millis(1)).await;
        manager.expire_messages();
        assert!(manager.success.is_none());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn replaced_banner_never_fires_its_original_dismissal() {
        let mut manager = ProductManager::new();
        manager.set_success("Product saved.");

        advance(Duration::from_millis(1500)).await;
        manager.set_success("Product updated.");

        // Past the first banner's deadline, within the second's.
        advance(Duration::from_millis(1500)).await;
        manager.expire_messages();
        assert_eq!(
            manager.success.as_ref().unwrap().text(),
            "Product updated."
        );

        advance(Duration::from_millis(500)).await;
        manager.expire_messages();
        assert!(manager.success.is_none());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn next_deadline_tracks_the_pending_banner() {
        let mut manager = ProductManager::new();
        assert!(manager.next_message_deadline().is_none());

        manager.set_error(SAVE_ERROR);
        let deadline = manager.next_message_deadline().unwrap();
        assert_eq!(deadline, Instant::now() + MESSAGE_TTL);
    }

    #[tokio::test]
    async fn refresh_clamps_selection() {
        let backend = Arc::new(MockCatalogBackend::with_products(vec![pen(1), pen(2)]));
        let client = client_with(backend.clone());
        let mut manager = ProductManager::new();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;

        manager.select_next();
        assert_eq!(manager.selected, 1);

        client.delete(2).await.unwrap();
        drive(&mut manager, &client, Some(CatalogRequest::List)).await;
        assert_eq!(manager.selected, 0);

        manager.select_prev();
        assert_eq!(manager.selected, 0);
    }
}
