//! Async host for the document viewer.
//!
//! Runs a [`viewer_core::DocumentViewer`] on a tokio task, loading documents
//! with `pdf-engine` on the blocking pool.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewer_core::{BoxMetrics, ContainerHandle, ViewerConfig};
//! use viewer_host::{spawn_viewer, EngineLoader, ViewerEvent};
//!
//! # async fn demo() -> Result<(), viewer_host::HostError> {
//! let loader = Arc::new(EngineLoader::with_root("public"));
//! let (handle, mut events, _task) =
//!     spawn_viewer(ViewerConfig::default(), ContainerHandle::new(1), loader);
//!
//! handle.resize(BoxMetrics::from_content_width(800.0))?;
//! handle.load("/static/resume.pdf")?;
//!
//! while let Some(event) = events.recv().await {
//!     if let ViewerEvent::Pages { pages, .. } = event {
//!         println!("{} pages", pages.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod host;
mod loader;

pub use host::{spawn_viewer, HostError, ViewerCommand, ViewerEvent, ViewerHandle};
pub use loader::EngineLoader;
