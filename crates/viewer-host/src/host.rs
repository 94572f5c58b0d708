//! Event loop driving a [`DocumentViewer`] on a tokio runtime.
//!
//! All viewer state lives on one task. Resize notifications and load
//! requests arrive as [`ViewerCommand`]s, loads run on the blocking pool and
//! report back through a `JoinSet`, and the debounce deadline is awaited
//! with `sleep_until`. Observable changes leave as [`ViewerEvent`]s.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use viewer_core::{
    BoxMetrics, ContainerHandle, DocumentLoader, DocumentResource, DocumentViewer, Layout,
    LoadError, LoadOutcome, LoadTicket, PageRender, Subscription, ViewerConfig, ViewerError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    Resize(BoxMetrics),
    Load(DocumentResource),
    Unmount,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Mounted(Layout),
    /// A resize burst settled.
    Layout(Layout),
    /// The page sequence was re-derived.
    Pages { revision: u64, page_count: Option<u32>, pages: Vec<PageRender> },
    LoadFailed { resource: DocumentResource, error: String },
    Unmounted,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("viewer task has stopped")]
    Closed,
}

/// Sending half of a running viewer.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    commands: mpsc::UnboundedSender<ViewerCommand>,
}

impl ViewerHandle {
    pub fn send(&self, command: ViewerCommand) -> Result<(), HostError> {
        self.commands.send(command).map_err(|_| HostError::Closed)
    }

    pub fn resize(&self, metrics: BoxMetrics) -> Result<(), HostError> {
        self.send(ViewerCommand::Resize(metrics))
    }

    pub fn load(&self, resource: impl Into<DocumentResource>) -> Result<(), HostError> {
        self.send(ViewerCommand::Load(resource.into()))
    }

    pub fn unmount(&self) -> Result<(), HostError> {
        self.send(ViewerCommand::Unmount)
    }
}

type LoadResult = (LoadTicket, Result<u32, LoadError>);

struct ViewerHost<L> {
    viewer: DocumentViewer,
    container: ContainerHandle,
    loader: Arc<L>,
    commands: mpsc::UnboundedReceiver<ViewerCommand>,
    events: mpsc::UnboundedSender<ViewerEvent>,
    loads: JoinSet<LoadResult>,
    published_revision: Option<u64>,
}

/// Mounts a viewer on `container` and runs it on the current runtime.
///
/// The task ends after [`ViewerCommand::Unmount`] or once every
/// [`ViewerHandle`] is dropped.
pub fn spawn_viewer<L>(
    config: ViewerConfig,
    container: ContainerHandle,
    loader: Arc<L>,
) -> (ViewerHandle, mpsc::UnboundedReceiver<ViewerEvent>, JoinHandle<()>)
where
    L: DocumentLoader + Send + Sync + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let host = ViewerHost {
        viewer: DocumentViewer::new(config),
        container,
        loader,
        commands: command_rx,
        events: event_tx,
        loads: JoinSet::new(),
        published_revision: None,
    };

    let task = tokio::spawn(host.run());
    (ViewerHandle { commands: command_tx }, event_rx, task)
}

impl<L> ViewerHost<L>
where
    L: DocumentLoader + Send + Sync + 'static,
{
    async fn run(mut self) {
        let subscription = self.viewer.mount(self.container);
        self.emit(ViewerEvent::Mounted(self.viewer.layout()));
        self.publish_pages();

        loop {
            let deadline = self.viewer.next_deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(ViewerCommand::Resize(metrics)) => self.on_resize(subscription, metrics),
                    Some(ViewerCommand::Load(resource)) => self.start_load(resource),
                    Some(ViewerCommand::Unmount) | None => break,
                },
                Some(joined) = self.loads.join_next() => match joined {
                    Ok((ticket, result)) => self.finish_load(ticket, result),
                    Err(error) => tracing::error!(%error, "load task did not complete"),
                },
                _ = wait_until(deadline) => {
                    if let Some(layout) = self.viewer.poll(Instant::now().into_std()) {
                        self.emit(ViewerEvent::Layout(layout));
                        self.publish_pages();
                    }
                }
            }
        }

        self.viewer.unmount();
        self.loads.abort_all();
        self.emit(ViewerEvent::Unmounted);
    }

    fn on_resize(&mut self, subscription: Subscription, metrics: BoxMetrics) {
        self.viewer.notify_resize(subscription, metrics, Instant::now().into_std());
    }

    fn start_load(&mut self, resource: DocumentResource) {
        let ticket = match self.viewer.begin_load(resource) {
            Ok(ticket) => ticket,
            Err(error) => {
                tracing::warn!(%error, "load rejected");
                return;
            }
        };

        let loader = Arc::clone(&self.loader);
        self.loads.spawn_blocking(move || {
            let result = loader.load_page_count(&ticket.resource);
            (ticket, result)
        });
    }

    fn finish_load(&mut self, ticket: LoadTicket, result: Result<u32, LoadError>) {
        match self.viewer.complete_load(ticket.token, result) {
            Ok(LoadOutcome::Applied { .. }) => self.publish_pages(),
            Ok(LoadOutcome::Stale) => {}
            Err(ViewerError::Load(error)) => {
                self.emit(ViewerEvent::LoadFailed {
                    resource: ticket.resource,
                    error: error.to_string(),
                });
                self.publish_pages();
            }
            Err(error) => tracing::warn!(%error, "load completion rejected"),
        }
    }

    fn publish_pages(&mut self) {
        let revision = self.viewer.plan_revision();
        if self.published_revision == Some(revision) {
            return;
        }

        self.published_revision = Some(revision);
        self.emit(ViewerEvent::Pages {
            revision,
            page_count: self.viewer.state().page_count,
            pages: self.viewer.pages().collect(),
        });
    }

    fn emit(&self, event: ViewerEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }
}

async fn wait_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
