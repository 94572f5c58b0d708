//! Container size observation.
//!
//! The observer is attached to one container at a time. Each attachment hands
//! out a [`Subscription`]; notifications carry the subscription that produced
//! them, so anything still in flight after a detach (or a later re-attach to
//! the same container) is dropped instead of reaching the viewer.

/// Opaque reference to a mounted container element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerHandle(u64);

impl ContainerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Horizontal box metrics of a container, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxMetrics {
    pub border_box_width: f32,
    pub padding_left: f32,
    pub padding_right: f32,
    pub border_left: f32,
    pub border_right: f32,
}

impl BoxMetrics {
    /// Metrics for a container with no padding or border.
    pub fn from_content_width(width: f32) -> Self {
        Self { border_box_width: width, ..Self::default() }
    }

    /// Width excluding padding and border, never negative.
    pub fn content_width(&self) -> f32 {
        let insets = self.padding_left + self.padding_right + self.border_left + self.border_right;
        (self.border_box_width - insets).max(0.0)
    }
}

/// Proof of a specific attachment; see the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    container: ContainerHandle,
    generation: u64,
}

impl Subscription {
    pub fn container(&self) -> ContainerHandle {
        self.container
    }
}

#[derive(Debug, Default)]
pub struct LayoutObserver {
    generation: u64,
    active: Option<Subscription>,
    last_width: Option<f32>,
}

impl LayoutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches to `container`, replacing any previous attachment.
    pub fn attach(&mut self, container: ContainerHandle) -> Subscription {
        self.generation += 1;
        let subscription = Subscription { container, generation: self.generation };
        self.active = Some(subscription);
        self.last_width = None;
        subscription
    }

    /// Returns `true` if an attachment was dropped.
    pub fn detach(&mut self) -> bool {
        self.last_width = None;
        self.active.take().is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.active.is_some()
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.active
    }

    /// Filters a raw size notification.
    ///
    /// Returns the content-box width when the notification belongs to the
    /// active subscription and the width differs from the last one reported.
    /// The first notification after attach is always reported.
    pub fn observe(&mut self, subscription: Subscription, metrics: BoxMetrics) -> Option<f32> {
        if self.active != Some(subscription) {
            return None;
        }

        let width = metrics.content_width();
        if !width.is_finite() {
            return None;
        }

        if self.last_width == Some(width) {
            return None;
        }

        self.last_width = Some(width);
        Some(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_width_excludes_padding_and_border() {
        let metrics = BoxMetrics {
            border_box_width: 840.0,
            padding_left: 16.0,
            padding_right: 16.0,
            border_left: 4.0,
            border_right: 4.0,
        };

        assert_eq!(metrics.content_width(), 800.0);
        let overflowing = BoxMetrics { border_box_width: 10.0, padding_left: 20.0, ..metrics };
        assert_eq!(overflowing.content_width(), 0.0);
    }

    #[test]
    fn first_measurement_is_always_reported() {
        let mut observer = LayoutObserver::new();
        let subscription = observer.attach(ContainerHandle::new(1));

        let reported = observer.observe(subscription, BoxMetrics::from_content_width(400.0));
        assert_eq!(reported, Some(400.0));
    }

    #[test]
    fn unchanged_width_is_suppressed() {
        let mut observer = LayoutObserver::new();
        let subscription = observer.attach(ContainerHandle::new(1));

        assert!(observer.observe(subscription, BoxMetrics::from_content_width(640.0)).is_some());
        assert!(observer.observe(subscription, BoxMetrics::from_content_width(640.0)).is_none());
        let reported = observer.observe(subscription, BoxMetrics::from_content_width(641.0));
        assert_eq!(reported, Some(641.0));
    }

    #[test]
    fn detached_observer_drops_in_flight_notifications() {
        let mut observer = LayoutObserver::new();
        let subscription = observer.attach(ContainerHandle::new(7));

        assert!(observer.detach());
        assert!(!observer.is_attached());
        assert!(observer.observe(subscription, BoxMetrics::from_content_width(500.0)).is_none());
        assert!(!observer.detach());
    }

    #[test]
    fn reattach_does_not_revive_old_subscription() {
        let mut observer = LayoutObserver::new();
        let container = ContainerHandle::new(7);
        let stale = observer.attach(container);
        observer.detach();
        let fresh = observer.attach(container);

        assert_ne!(stale, fresh);
        assert_eq!(fresh.container(), container);
        assert!(observer.observe(stale, BoxMetrics::from_content_width(500.0)).is_none());
        assert_eq!(observer.observe(fresh, BoxMetrics::from_content_width(500.0)), Some(500.0));
    }
}
