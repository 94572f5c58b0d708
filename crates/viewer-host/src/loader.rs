//! Page-count loading backed by `pdf-engine`.

use pdf_engine::{default_engine, OpenSource, PdfEngine, PdfEngineError};
use std::path::{Path, PathBuf};
use viewer_core::{DocumentLoader, DocumentResource, LoadError};

/// Loads documents from the local filesystem.
///
/// Without a root, resources are used as paths as-is. With a root, resources
/// are treated as site-relative (`/static/resume.pdf`) and joined onto it.
#[derive(Debug, Clone, Default)]
pub struct EngineLoader {
    root: Option<PathBuf>,
}

impl EngineLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self { root: Some(root.as_ref().to_path_buf()) }
    }

    pub fn resolve(&self, resource: &DocumentResource) -> PathBuf {
        match &self.root {
            Some(root) => root.join(resource.as_str().trim_start_matches('/')),
            None => PathBuf::from(resource.as_str()),
        }
    }
}

impl DocumentLoader for EngineLoader {
    fn load_page_count(&self, resource: &DocumentResource) -> Result<u32, LoadError> {
        let path = self.resolve(resource);
        let to_load_error = |error| load_error(resource, error);

        let mut engine = default_engine();
        let handle = engine.open(OpenSource::Path(path)).map_err(to_load_error)?;
        let page_count = engine.page_count(handle).map_err(to_load_error)?;
        engine.close(handle).map_err(to_load_error)?;

        tracing::debug!(%resource, page_count, "counted pages");
        Ok(page_count)
    }
}

fn load_error(resource: &DocumentResource, error: PdfEngineError) -> LoadError {
    match error {
        PdfEngineError::Io(source) => LoadError::Fetch { resource: resource.clone(), source },
        other => LoadError::Parse { resource: resource.clone(), message: other.to_string() },
    }
}
