use std::borrow::Cow;
use std::path::Path;

use crate::api::{
    ApiClient, Category, CategoryDraft, CategoryId, CropRect, GalleryFilter, GalleryImage,
    GalleryPage, NewGalleryEntry, KNOWN_RATIOS, MAX_UPLOAD_SIZE,
};
use crate::catalog::{mutator, FetchTicket, MutateError, Navigator};

// ============================================================================
// Gallery Browser
// ============================================================================

/// Paged view over the gallery service.
///
/// Mirrors the frontier discipline: `rows` is replaced wholesale per fetch,
/// never patched, and the page cursor only advances when the store confirms
/// there is somewhere to go.
pub struct GalleryBrowser {
    pub filter: GalleryFilter,
    page: u32,
    limit: u32,
    rows: Vec<GalleryImage>,
    total_pages: u32,
}

impl GalleryBrowser {
    fn new(limit: u32) -> Self {
        Self {
            filter: GalleryFilter::default(),
            page: 1,
            limit: limit.clamp(1, 100),
            rows: Vec::new(),
            total_pages: 0,
        }
    }

    pub fn rows(&self) -> &[GalleryImage] {
        &self.rows
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Replaces the filter and rewinds to the first page; the old result rows
    /// belong to the old filter and are dropped on the next fetch.
    pub fn set_filter(&mut self, filter: GalleryFilter) {
        self.filter = filter;
        self.page = 1;
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    /// Steps to the next page if the last fetch said one exists.
    fn step_forward(&mut self) -> bool {
        if self.page < self.total_pages {
            self.page += 1;
            true
        } else {
            false
        }
    }

    fn step_back(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    fn absorb(&mut self, fetched: GalleryPage) {
        self.rows = fetched.images;
        self.total_pages = fetched.total_pages;
        // The store may report fewer pages than the cursor sits on when the
        // underlying set shrank between fetches.
        if self.total_pages > 0 && self.page > self.total_pages {
            self.page = self.total_pages;
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Holds everything the shell operates on: the catalog cursor, the gallery
/// browser, the pending-delete confirmation, and the one-shot status notice.
///
/// Every method reports failure through the status notice and `tracing`
/// instead of returning errors upward; nothing here is fatal to the session.
pub struct App {
    pub api: ApiClient,
    pub nav: Navigator,
    pub gallery: GalleryBrowser,
    status_message: Option<Cow<'static, str>>,
    pending_delete: Option<Category>,
}

impl App {
    pub fn new(api: ApiClient, gallery_page_size: u32) -> Self {
        Self {
            api,
            nav: Navigator::new(),
            gallery: GalleryBrowser::new(gallery_page_size),
            status_message: None,
            pending_delete: None,
        }
    }

    // ------------------------------------------------------------------
    // Status notices
    // ------------------------------------------------------------------

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some(msg.into());
    }

    /// Takes the pending notice; printed once by the next prompt render.
    pub fn take_status(&mut self) -> Option<Cow<'static, str>> {
        self.status_message.take()
    }

    // ------------------------------------------------------------------
    // Catalog navigation
    // ------------------------------------------------------------------

    /// Performs the fetch a ticket asks for and settles it. Returns whether
    /// the frontier was updated.
    async fn settle(&mut self, ticket: FetchTicket) -> bool {
        match self.api.fetch_frontier(ticket.parent()).await {
            Ok(rows) => self.nav.absorb(ticket, rows),
            Err(e) => {
                tracing::warn!(parent = ?ticket.parent(), error = %e, "Frontier fetch failed");
                self.set_status(format!("Fetch failed: {e}"));
                self.nav.rescind(ticket);
                false
            }
        }
    }

    /// Refetches the current frontier.
    pub async fn refresh(&mut self) -> bool {
        let ticket = self.nav.refresh();
        self.settle(ticket).await
    }

    /// Descends into a frontier member.
    pub async fn drill(&mut self, id: &CategoryId) -> bool {
        match self.nav.drill_into(id) {
            Ok(ticket) => self.settle(ticket).await,
            Err(e) => {
                self.set_status(e.to_string());
                false
            }
        }
    }

    /// Ascends one level.
    pub async fn back(&mut self) -> bool {
        match self.nav.go_back() {
            Some(ticket) => self.settle(ticket).await,
            None => {
                self.set_status("Already at the top level");
                false
            }
        }
    }

    /// Resolves an operator-supplied key against the displayed frontier:
    /// 1-based row index first, then slug, then raw id.
    pub fn resolve_subject(&self, key: &str) -> Option<&Category> {
        let frontier = self.nav.frontier();
        if let Ok(idx) = key.parse::<usize>() {
            if idx >= 1 {
                if let Some(row) = frontier.get(idx - 1) {
                    return Some(row);
                }
            }
        }
        frontier
            .iter()
            .find(|c| c.slug == key)
            .or_else(|| frontier.iter().find(|c| c.id.as_str() == key))
    }

    // ------------------------------------------------------------------
    // Catalog mutations
    // ------------------------------------------------------------------

    fn report_mutation_failure(&mut self, op: &'static str, err: MutateError) {
        tracing::warn!(op, error = %err, "Mutation failed");
        self.set_status(format!("{op} failed: {err}"));
    }

    /// Creates a new child under `subject`, then refetches the frontier so
    /// the view shows what the store actually recorded.
    pub async fn create_category(&mut self, subject: &Category, draft: &CategoryDraft) -> bool {
        match mutator::create(&self.api, subject, draft).await {
            Ok(created) => {
                tracing::info!(id = %created.id, parent = %subject.id, "Created category");
                self.set_status(format!("Created '{}' under '{}'", created.name, subject.name));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.report_mutation_failure("Create", e);
                false
            }
        }
    }

    /// Children of `subject` fetched fresh, for the insert picker.
    pub async fn eligible_children(&mut self, subject: &Category) -> Option<Vec<Category>> {
        match self.api.fetch_children(&subject.id).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                self.set_status(format!("Fetch failed: {e}"));
                None
            }
        }
    }

    /// Splices a new category between `subject` and the child named by
    /// `child_key` (slug or id, resolved against a fresh children fetch).
    pub async fn insert_category(
        &mut self,
        subject: &Category,
        draft: &CategoryDraft,
        child_key: &str,
    ) -> bool {
        let Some(eligible) = self.eligible_children(subject).await else {
            return false;
        };
        let child_id = match eligible
            .iter()
            .find(|c| c.slug == child_key || c.id.as_str() == child_key)
        {
            Some(child) => child.id.clone(),
            None => {
                self.set_status(format!(
                    "'{child_key}' is not a current child of '{}'",
                    subject.name
                ));
                return false;
            }
        };
        match mutator::insert(&self.api, subject, draft, &child_id, &eligible).await {
            Ok(created) => {
                tracing::info!(id = %created.id, above = %child_id, "Inserted category");
                self.set_status(format!(
                    "Inserted '{}' between '{}' and its child",
                    created.name, subject.name
                ));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.report_mutation_failure("Insert", e);
                false
            }
        }
    }

    /// Arms the delete confirmation; the next `y` line fires it.
    pub fn arm_delete(&mut self, subject: Category) {
        self.set_status(format!(
            "Delete '{}'? Descendants follow store policy. Type y to confirm",
            subject.name
        ));
        self.pending_delete = Some(subject);
    }

    /// Drops an armed delete, returning it so the caller can name it.
    pub fn disarm_delete(&mut self) -> Option<Category> {
        self.pending_delete.take()
    }

    pub fn has_pending_delete(&self) -> bool {
        self.pending_delete.is_some()
    }

    /// Fires the armed delete, then refetches to reflect whatever the store
    /// decided to do with descendants.
    pub async fn confirm_delete(&mut self) -> bool {
        let Some(subject) = self.pending_delete.take() else {
            self.set_status("Nothing pending confirmation");
            return false;
        };
        match mutator::delete(&self.api, &subject).await {
            Ok(()) => {
                tracing::info!(id = %subject.id, name = %subject.name, "Deleted category");
                self.set_status(format!("Deleted '{}'", subject.name));
                self.refresh().await;
                true
            }
            Err(e) => {
                self.report_mutation_failure("Delete", e);
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Gallery
    // ------------------------------------------------------------------

    /// Fetches the browser's current page under its current filter.
    pub async fn gallery_fetch(&mut self) -> bool {
        let page = self.gallery.page();
        let limit = self.gallery.limit();
        match self.api.filter_gallery(&self.gallery.filter, page, limit).await {
            Ok(fetched) => {
                self.gallery.absorb(fetched);
                true
            }
            Err(e) => {
                tracing::warn!(page, error = %e, "Gallery fetch failed");
                self.set_status(format!("Gallery fetch failed: {e}"));
                false
            }
        }
    }

    pub async fn gallery_next(&mut self) -> bool {
        let prior = self.gallery.page();
        if !self.gallery.step_forward() {
            self.set_status("Already on the last page");
            return false;
        }
        if self.gallery_fetch().await {
            true
        } else {
            self.gallery.set_page(prior);
            false
        }
    }

    pub async fn gallery_prev(&mut self) -> bool {
        let prior = self.gallery.page();
        if !self.gallery.step_back() {
            self.set_status("Already on the first page");
            return false;
        }
        if self.gallery_fetch().await {
            true
        } else {
            self.gallery.set_page(prior);
            false
        }
    }

    /// Uploads an image file, returning the minted `image_uri`. The bytes are
    /// forwarded untouched; cropping happens server-side.
    pub async fn gallery_upload(
        &mut self,
        path: &Path,
        ratio: Option<&str>,
        crop: Option<CropRect>,
    ) -> Option<String> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) => {
                self.set_status(format!("Cannot read {}: {e}", path.display()));
                return None;
            }
        };
        if bytes.len() > MAX_UPLOAD_SIZE {
            self.set_status(format!(
                "File is {} bytes (upload limit {})",
                bytes.len(),
                MAX_UPLOAD_SIZE
            ));
            return None;
        }
        if let Some(r) = ratio {
            if !KNOWN_RATIOS.contains(&r) {
                tracing::warn!(ratio = r, "Ratio not in the known set, forwarding anyway");
            }
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin");
        match self.api.upload_image(file_name, bytes, ratio, crop).await {
            Ok(uri) => {
                tracing::info!(uri = %uri, "Image uploaded");
                self.set_status(format!("Uploaded as {uri}"));
                Some(uri)
            }
            Err(e) => {
                self.set_status(format!("Upload failed: {e}"));
                None
            }
        }
    }

    /// Registers a gallery entry, then refetches the current page.
    pub async fn gallery_create(&mut self, entry: NewGalleryEntry) -> bool {
        match self.api.create_gallery_entry(&entry).await {
            Ok(img) => {
                tracing::info!(id = %img.id, "Gallery entry created");
                self.set_status(format!("Gallery entry {} created", img.id));
                self.gallery_fetch().await;
                true
            }
            Err(e) => {
                self.set_status(format!("Gallery create failed: {e}"));
                false
            }
        }
    }
}
