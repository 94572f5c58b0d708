//! Responsive multi-page document viewer core.
//!
//! Runtime-free: the host owns the clock and the event loop, feeds resize
//! notifications and load results in, and polls for settled layout.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use viewer_core::{BoxMetrics, ContainerHandle, DocumentViewer, ViewerConfig, ViewerPhase};
//!
//! let mut viewer = DocumentViewer::new(ViewerConfig::default());
//! let subscription = viewer.mount(ContainerHandle::new(1));
//! assert_eq!(viewer.state().document_height_px, 517);
//!
//! let start = Instant::now();
//! viewer.notify_resize(subscription, BoxMetrics::from_content_width(800.0), start);
//! viewer.poll(start + Duration::from_millis(100));
//! assert_eq!(viewer.state().document_height_px, 1035);
//!
//! let ticket = viewer.begin_load("/static/resume.pdf").unwrap();
//! viewer.complete_load(ticket.token, Ok(2)).unwrap();
//! assert_eq!(viewer.phase(), ViewerPhase::Ready);
//! assert_eq!(viewer.pages().count(), 2);
//! ```

mod config;
mod debounce;
mod layout;
mod load;
mod observer;
mod pages;
mod viewer;

pub use config::{
    ConfigError, DocumentOptions, ViewerConfig, ENV_DEBOUNCE_MS, ENV_DEFAULT_WIDTH_PX,
};
pub use debounce::Debouncer;
pub use layout::{Layout, PageAspect};
pub use load::{DocumentLoader, DocumentResource, LoadError, LoadTicket, LoadToken, LoadTracker};
pub use observer::{BoxMetrics, ContainerHandle, LayoutObserver, Subscription};
pub use pages::{PageKey, PagePlan, PageRender, Pages};
pub use viewer::{DocumentViewer, LoadOutcome, ViewerError, ViewerPhase, ViewerState};
