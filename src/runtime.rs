//! Wiring of the dispatcher, the normalizer and the command handler

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::collaborators::{GlossaryStore, Outbound};
use crate::config::InteractionConfig;
use crate::error::InteractionResult;
use crate::events::{EventNormalizer, RawEvent};
use crate::handlers::GlossaryCommandHandler;
use crate::routing::Dispatcher;

/// A running interaction layer
///
/// Owns the background tasks: upstream ingestion and the expiry sweeper.
/// Dropping the runtime leaves them running; call [`shutdown`](Self::shutdown).
pub struct InteractionRuntime {
    handler: GlossaryCommandHandler,
    ingest: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl InteractionRuntime {
    /// Validate `config` and start consuming `events`
    pub fn start(
        config: InteractionConfig,
        store: Arc<dyn GlossaryStore>,
        outbound: Arc<dyn Outbound>,
        events: mpsc::Receiver<RawEvent>,
    ) -> InteractionResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new();

        let ingest = EventNormalizer::new(dispatcher.clone()).spawn(events);
        let sweeper = dispatcher.spawn_sweeper(config.sweep_interval());
        let handler = GlossaryCommandHandler::new(dispatcher, store, outbound, config.clone());
        info!(
            page_size = config.page_size,
            signal_style = ?config.signal_style,
            "interaction runtime started"
        );

        Ok(Self {
            handler,
            ingest,
            sweeper,
        })
    }

    pub fn handler(&self) -> &GlossaryCommandHandler {
        &self.handler
    }

    /// Stop ingestion, cancel every pending waiter and stop the sweeper
    pub async fn shutdown(self) {
        self.ingest.abort();
        let _ = self.ingest.await;
        let cancelled = self.handler.dispatcher().cancel_all();
        self.sweeper.abort();
        let _ = self.sweeper.await;
        info!(cancelled, "interaction runtime stopped");
    }
}
