use tokio::sync::broadcast;

/// Emitted once per committed cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The root entity list of a project changed.
    EntitiesChanged { project_id: String },
    /// An entity or one of its attributes/options changed.
    EntityChanged { entity_id: String },
    /// Values of a record changed.
    ValuesChanged { record_id: String },
}

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl EventBus {
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
