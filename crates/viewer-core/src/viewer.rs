//! The document viewer state machine.
//!
//! ```text
//! Unmounted --mount--> Measuring --first settled resize--> Sized --load--> Ready
//!                          |                                 ^  |           |  ^
//!                          |                                 +--+ resize    +--+ resize
//!                          +------------------- unmount (from any state) ------> Unmounted
//! ```
//!
//! A load that completes while still measuring keeps the viewer in
//! `Measuring` (pages render at the default height); the first settled resize
//! then moves it straight to `Ready`.
//!
//! A failed load clears the displayed document: no pages are shown and
//! `Ready` falls back to `Sized`. The last known page count stays in
//! [`ViewerState`] but is not rendered until a load succeeds again.

use crate::config::ViewerConfig;
use crate::debounce::Debouncer;
use crate::layout::Layout;
use crate::load::{DocumentResource, LoadError, LoadTicket, LoadToken, LoadTracker};
use crate::observer::{BoxMetrics, ContainerHandle, LayoutObserver, Subscription};
use crate::pages::{PagePlan, Pages};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Unmounted,
    /// Container attached, no settled width yet; default dimensions in use.
    Measuring,
    /// Width known, page count not yet.
    Sized,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub container_width_px: f32,
    pub document_height_px: u32,
    pub page_count: Option<u32>,
    pub container: Option<ContainerHandle>,
}

impl ViewerState {
    fn initial(config: &ViewerConfig, container: Option<ContainerHandle>) -> Self {
        let layout = Layout::for_width(config.default_width_px, config.page_aspect);
        Self {
            container_width_px: layout.width_px,
            document_height_px: layout.height_px,
            page_count: None,
            container,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { page_count: u32 },
    /// A newer load was started (or the viewer was torn down); result dropped.
    Stale,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("viewer is not mounted")]
    NotMounted,
    #[error(transparent)]
    Load(#[from] LoadError),
}

#[derive(Debug)]
pub struct DocumentViewer {
    config: ViewerConfig,
    phase: ViewerPhase,
    state: ViewerState,
    observer: LayoutObserver,
    debouncer: Debouncer<f32>,
    loads: LoadTracker,
    plan: PagePlan,
    /// Document whose pages are shown.
    resource: Option<DocumentResource>,
    /// Document of the load in flight.
    requested: Option<DocumentResource>,
}

impl DocumentViewer {
    pub fn new(config: ViewerConfig) -> Self {
        let state = ViewerState::initial(&config, None);
        let debouncer = Debouncer::new(config.debounce());

        Self {
            config,
            phase: ViewerPhase::Unmounted,
            state,
            observer: LayoutObserver::new(),
            debouncer,
            loads: LoadTracker::new(),
            plan: PagePlan::new(),
            resource: None,
            requested: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn phase(&self) -> ViewerPhase {
        self.phase
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn layout(&self) -> Layout {
        Layout { width_px: self.state.container_width_px, height_px: self.state.document_height_px }
    }

    /// The document currently displayed, set only by a successful load.
    pub fn resource(&self) -> Option<&DocumentResource> {
        self.resource.as_ref()
    }

    pub fn requested(&self) -> Option<&DocumentResource> {
        self.requested.as_ref()
    }

    fn shown_page_count(&self) -> Option<u32> {
        self.resource.as_ref().and(self.state.page_count)
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.observer.subscription()
    }

    /// Attaches to `container` with default dimensions. Mounting an already
    /// mounted viewer tears the previous mount down first.
    pub fn mount(&mut self, container: ContainerHandle) -> Subscription {
        if self.phase != ViewerPhase::Unmounted {
            self.unmount();
        }

        self.state = ViewerState::initial(&self.config, Some(container));
        self.plan.update(self.shown_page_count(), self.state.document_height_px);
        let subscription = self.observer.attach(container);
        self.transition(ViewerPhase::Measuring);

        subscription
    }

    /// Feeds a size notification through the observer into the debouncer.
    ///
    /// Returns `true` if a layout update was scheduled.
    pub fn notify_resize(
        &mut self,
        subscription: Subscription,
        metrics: BoxMetrics,
        now: Instant,
    ) -> bool {
        if self.phase == ViewerPhase::Unmounted {
            return false;
        }

        let Some(width) = self.observer.observe(subscription, metrics) else {
            return false;
        };

        let deadline = self.debouncer.schedule(width, now);
        tracing::trace!(width, ?deadline, "resize scheduled");
        true
    }

    pub fn is_resize_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// When the host should next call [`DocumentViewer::poll`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Applies a settled resize, if one is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Layout> {
        let width = self.debouncer.poll(now)?;
        Some(self.apply_width(width))
    }

    fn apply_width(&mut self, width: f32) -> Layout {
        let layout = Layout::for_width(width, self.config.page_aspect);
        self.state.container_width_px = layout.width_px;
        self.state.document_height_px = layout.height_px;

        if self.plan.update(self.shown_page_count(), layout.height_px) {
            tracing::debug!(
                width = layout.width_px,
                height = layout.height_px,
                revision = self.plan.revision(),
                "page plan re-derived"
            );
        }

        if self.phase == ViewerPhase::Measuring {
            let next = match self.shown_page_count() {
                Some(_) => ViewerPhase::Ready,
                None => ViewerPhase::Sized,
            };
            self.transition(next);
        }

        layout
    }

    /// Starts a load of `resource`, superseding any load still in flight.
    pub fn begin_load(
        &mut self,
        resource: impl Into<DocumentResource>,
    ) -> Result<LoadTicket, ViewerError> {
        if self.phase == ViewerPhase::Unmounted {
            return Err(ViewerError::NotMounted);
        }

        let resource = resource.into();
        let token = self.loads.begin();
        tracing::debug!(token = token.raw(), %resource, "load started");
        self.requested = Some(resource.clone());

        Ok(LoadTicket { token, resource })
    }

    /// Reports the result of the load identified by `token`.
    ///
    /// Completions of superseded loads are dropped whatever their result.
    /// A failed current load is returned as an error. It keeps the page count
    /// where it was but stops showing the previous document.
    pub fn complete_load(
        &mut self,
        token: LoadToken,
        result: Result<u32, LoadError>,
    ) -> Result<LoadOutcome, ViewerError> {
        if !self.loads.finish(token) {
            tracing::debug!(token = token.raw(), "discarding stale load completion");
            return Ok(LoadOutcome::Stale);
        }

        let requested = self.requested.take();
        let page_count = match result {
            Ok(page_count) => page_count,
            Err(error) => {
                tracing::warn!(token = token.raw(), %error, "document load failed");
                self.resource = None;
                self.plan.update(None, self.state.document_height_px);
                if self.phase == ViewerPhase::Ready {
                    self.transition(ViewerPhase::Sized);
                }
                return Err(error.into());
            }
        };

        self.resource = requested;
        self.state.page_count = Some(page_count);
        self.plan.update(self.shown_page_count(), self.state.document_height_px);

        if self.phase == ViewerPhase::Sized {
            self.transition(ViewerPhase::Ready);
        }

        Ok(LoadOutcome::Applied { page_count })
    }

    pub fn pages(&self) -> Pages {
        self.plan.pages()
    }

    /// Moves only when the page sequence was re-derived.
    pub fn plan_revision(&self) -> u64 {
        self.plan.revision()
    }

    /// Tears the viewer down. Returns `false` if it was not mounted.
    pub fn unmount(&mut self) -> bool {
        if self.phase == ViewerPhase::Unmounted {
            return false;
        }

        // Timer and observer go first so nothing can touch the old container.
        if let Some(width) = self.debouncer.cancel() {
            tracing::trace!(width, "pending resize cancelled");
        }
        self.observer.detach();
        self.loads.invalidate();

        self.resource = None;
        self.requested = None;
        self.state = ViewerState::initial(&self.config, None);
        self.plan.update(None, self.state.document_height_px);
        self.transition(ViewerPhase::Unmounted);

        true
    }

    fn transition(&mut self, next: ViewerPhase) {
        if self.phase != next {
            tracing::debug!(from = ?self.phase, to = ?next, "viewer phase changed");
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn width(value: f32) -> BoxMetrics {
        BoxMetrics::from_content_width(value)
    }

    fn parse_error(resource: &str) -> LoadError {
        LoadError::Parse { resource: DocumentResource::from(resource), message: "bad xref".into() }
    }

    fn mounted() -> (DocumentViewer, Subscription, Instant) {
        let mut viewer = DocumentViewer::new(ViewerConfig::default());
        let subscription = viewer.mount(ContainerHandle::new(1));
        (viewer, subscription, Instant::now())
    }

    #[test]
    fn mount_uses_default_width_and_derived_height() {
        let (viewer, _, _) = mounted();

        assert_eq!(viewer.phase(), ViewerPhase::Measuring);
        assert_eq!(viewer.state().container_width_px, 400.0);
        assert_eq!(viewer.state().document_height_px, 517);
        assert_eq!(viewer.state().container, Some(ContainerHandle::new(1)));
        assert_eq!(viewer.pages().count(), 0);
    }

    #[test]
    fn settled_resize_updates_height() {
        let (mut viewer, subscription, start) = mounted();

        assert!(viewer.notify_resize(subscription, width(800.0), start));
        assert_eq!(viewer.poll(start + ms(99)), None);
        assert_eq!(viewer.state().document_height_px, 517);

        let layout = viewer.poll(start + ms(100)).expect("resize should settle");
        assert_eq!(layout, Layout { width_px: 800.0, height_px: 1035 });
        assert_eq!(viewer.state().document_height_px, 1035);
        assert_eq!(viewer.phase(), ViewerPhase::Sized);
    }

    #[test]
    fn resize_burst_applies_only_last_width() {
        let (mut viewer, subscription, start) = mounted();

        viewer.notify_resize(subscription, width(800.0), start);
        viewer.notify_resize(subscription, width(900.0), start + ms(50));

        assert_eq!(viewer.poll(start + ms(100)), None);
        let layout = viewer.poll(start + ms(150)).expect("burst should settle once");
        assert_eq!(layout.height_px, 1164);
        assert_eq!(viewer.poll(start + ms(1_000)), None);
        assert_eq!(viewer.state().container_width_px, 900.0);
    }

    #[test]
    fn unmount_before_deadline_drops_pending_resize() {
        let (mut viewer, subscription, start) = mounted();

        viewer.notify_resize(subscription, width(800.0), start);
        assert!(viewer.unmount());

        assert!(!viewer.is_resize_pending());
        assert_eq!(viewer.next_deadline(), None);
        assert_eq!(viewer.poll(start + ms(1_000)), None);
        assert_eq!(viewer.phase(), ViewerPhase::Unmounted);
        assert_eq!(viewer.state().container, None);
        assert!(!viewer.notify_resize(subscription, width(900.0), start + ms(1_000)));
    }

    #[test]
    fn no_observation_keeps_measuring_with_defaults() {
        let (mut viewer, _, start) = mounted();

        assert_eq!(viewer.poll(start + ms(10_000)), None);
        assert_eq!(viewer.phase(), ViewerPhase::Measuring);
        assert_eq!(viewer.layout(), Layout { width_px: 400.0, height_px: 517 });
    }

    #[test]
    fn successful_load_renders_every_page_in_order() {
        let (mut viewer, subscription, start) = mounted();
        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));

        let ticket = viewer.begin_load("/static/resume.pdf").unwrap();
        let outcome = viewer.complete_load(ticket.token, Ok(4)).unwrap();

        assert_eq!(outcome, LoadOutcome::Applied { page_count: 4 });
        assert_eq!(viewer.phase(), ViewerPhase::Ready);

        let pages: Vec<_> = viewer.pages().collect();
        assert_eq!(pages.iter().map(|page| page.number).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(pages.iter().all(|page| page.height_px == 1035));
    }

    #[test]
    fn superseded_load_never_applies() {
        let (mut viewer, _, _) = mounted();

        let a = viewer.begin_load("a.pdf").unwrap();
        let b = viewer.begin_load("b.pdf").unwrap();

        let applied = viewer.complete_load(b.token, Ok(3)).unwrap();
        assert_eq!(applied, LoadOutcome::Applied { page_count: 3 });
        assert_eq!(viewer.complete_load(a.token, Ok(5)).unwrap(), LoadOutcome::Stale);

        assert_eq!(viewer.state().page_count, Some(3));
        assert_eq!(viewer.pages().count(), 3);
        assert_eq!(viewer.resource(), Some(&DocumentResource::from("b.pdf")));
    }

    #[test]
    fn superseded_failure_is_not_reported() {
        let (mut viewer, _, _) = mounted();

        let a = viewer.begin_load("a.pdf").unwrap();
        let _b = viewer.begin_load("b.pdf").unwrap();

        let outcome = viewer.complete_load(a.token, Err(parse_error("a.pdf"))).unwrap();
        assert_eq!(outcome, LoadOutcome::Stale);
    }

    #[test]
    fn first_failed_load_shows_nothing() {
        let (mut viewer, subscription, start) = mounted();
        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));

        let ticket = viewer.begin_load("broken.pdf").unwrap();
        assert_eq!(viewer.requested(), Some(&DocumentResource::from("broken.pdf")));
        let err = viewer.complete_load(ticket.token, Err(parse_error("broken.pdf"))).unwrap_err();

        assert!(matches!(err, ViewerError::Load(LoadError::Parse { .. })));
        assert_eq!(viewer.state().page_count, None);
        assert_eq!(viewer.phase(), ViewerPhase::Sized);
        assert_eq!(viewer.pages().count(), 0);
        assert_eq!(viewer.resource(), None);
        assert_eq!(viewer.requested(), None);
    }

    #[test]
    fn failed_reload_clears_previous_document() {
        let (mut viewer, subscription, start) = mounted();
        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));
        let good = viewer.begin_load("a.pdf").unwrap();
        viewer.complete_load(good.token, Ok(2)).unwrap();
        let revision = viewer.plan_revision();

        let broken = viewer.begin_load("broken.pdf").unwrap();
        assert_eq!(viewer.resource(), Some(&DocumentResource::from("a.pdf")));
        assert!(viewer.complete_load(broken.token, Err(parse_error("broken.pdf"))).is_err());

        assert_eq!(viewer.state().page_count, Some(2));
        assert_eq!(viewer.resource(), None);
        assert_eq!(viewer.pages().count(), 0);
        assert_eq!(viewer.phase(), ViewerPhase::Sized);
        assert_ne!(viewer.plan_revision(), revision);

        viewer.notify_resize(subscription, width(900.0), start + ms(200));
        viewer.poll(start + ms(300));
        assert_eq!(viewer.pages().count(), 0);
        assert_eq!(viewer.phase(), ViewerPhase::Sized);

        let retry = viewer.begin_load("a.pdf").unwrap();
        viewer.complete_load(retry.token, Ok(2)).unwrap();
        assert_eq!(viewer.phase(), ViewerPhase::Ready);
        assert_eq!(viewer.resource(), Some(&DocumentResource::from("a.pdf")));
        assert!(viewer.pages().all(|page| page.height_px == 1164));
    }

    #[test]
    fn failed_reload_while_measuring_stays_measuring() {
        let (mut viewer, subscription, start) = mounted();
        let good = viewer.begin_load("a.pdf").unwrap();
        viewer.complete_load(good.token, Ok(3)).unwrap();
        let broken = viewer.begin_load("broken.pdf").unwrap();
        assert!(viewer.complete_load(broken.token, Err(parse_error("broken.pdf"))).is_err());

        assert_eq!(viewer.phase(), ViewerPhase::Measuring);
        assert_eq!(viewer.pages().count(), 0);

        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));
        assert_eq!(viewer.phase(), ViewerPhase::Sized);
        assert_eq!(viewer.pages().count(), 0);
    }

    #[test]
    fn resize_while_ready_keeps_page_count() {
        let (mut viewer, subscription, start) = mounted();
        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));
        let ticket = viewer.begin_load("resume.pdf").unwrap();
        viewer.complete_load(ticket.token, Ok(2)).unwrap();

        viewer.notify_resize(subscription, width(900.0), start + ms(200));
        viewer.poll(start + ms(300));

        assert_eq!(viewer.phase(), ViewerPhase::Ready);
        assert_eq!(viewer.state().page_count, Some(2));
        assert!(viewer.pages().all(|page| page.height_px == 1164));
    }

    #[test]
    fn load_while_measuring_renders_at_default_height() {
        let (mut viewer, subscription, start) = mounted();

        let ticket = viewer.begin_load("resume.pdf").unwrap();
        viewer.complete_load(ticket.token, Ok(2)).unwrap();
        assert_eq!(viewer.phase(), ViewerPhase::Measuring);
        assert!(viewer.pages().all(|page| page.height_px == 517));

        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));
        assert_eq!(viewer.phase(), ViewerPhase::Ready);
    }

    #[test]
    fn plan_is_not_re_derived_for_unrelated_changes() {
        let (mut viewer, subscription, start) = mounted();
        let ticket = viewer.begin_load("resume.pdf").unwrap();
        viewer.complete_load(ticket.token, Ok(2)).unwrap();
        viewer.notify_resize(subscription, width(800.0), start);
        viewer.poll(start + ms(100));
        let revision = viewer.plan_revision();

        // 800.5 still floors to a 1035px page.
        viewer.notify_resize(subscription, width(800.5), start + ms(200));
        viewer.poll(start + ms(300));
        assert_eq!(viewer.state().container_width_px, 800.5);
        assert_eq!(viewer.plan_revision(), revision);

        let stale = viewer.begin_load("other.pdf").unwrap();
        let _newer = viewer.begin_load("resume.pdf").unwrap();
        viewer.complete_load(stale.token, Ok(9)).unwrap();
        assert_eq!(viewer.plan_revision(), revision);
    }

    #[test]
    fn unmount_invalidates_in_flight_load() {
        let (mut viewer, _, _) = mounted();
        let ticket = viewer.begin_load("resume.pdf").unwrap();

        viewer.unmount();
        viewer.mount(ContainerHandle::new(1));

        assert_eq!(viewer.complete_load(ticket.token, Ok(4)).unwrap(), LoadOutcome::Stale);
        assert_eq!(viewer.state().page_count, None);
        assert_eq!(viewer.phase(), ViewerPhase::Measuring);
    }

    #[test]
    fn remount_ignores_notifications_for_previous_mount() {
        let (mut viewer, old, start) = mounted();
        let fresh = viewer.mount(ContainerHandle::new(1));

        assert!(!viewer.notify_resize(old, width(800.0), start));
        assert!(viewer.notify_resize(fresh, width(800.0), start));
    }

    #[test]
    fn begin_load_requires_mount() {
        let mut viewer = DocumentViewer::new(ViewerConfig::default());

        assert!(matches!(viewer.begin_load("resume.pdf"), Err(ViewerError::NotMounted)));
        assert!(!viewer.unmount());
    }

    #[test]
    fn configured_debounce_and_default_width_are_used() {
        let config = ViewerConfig::default().with_default_width(850.0).with_debounce_ms(20);
        let mut viewer = DocumentViewer::new(config);
        let subscription = viewer.mount(ContainerHandle::new(3));
        let start = Instant::now();

        assert_eq!(viewer.state().document_height_px, 1100);

        viewer.notify_resize(subscription, width(400.0), start);
        assert_eq!(viewer.next_deadline(), Some(start + ms(20)));
        assert_eq!(viewer.poll(start + ms(20)).map(|layout| layout.height_px), Some(517));
    }
}
