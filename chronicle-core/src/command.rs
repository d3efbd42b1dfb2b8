//! Commands: requests to change one aggregate.

use serde::{Deserialize, Serialize};

/// Intent to change the aggregate identified by [`Command::aggregate_id`].
///
/// Commands are handled by aggregates implementing
/// [`Handle<C>`](crate::aggregate::Handle) and produce zero or more events.
pub trait Command: std::fmt::Debug + Send + Sync {
    fn aggregate_id(&self) -> &str;
}

/// Minimal command that carries nothing but the target aggregate id.
///
/// Useful on its own for payload-free intents, or flattened into a larger
/// command struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandModel {
    pub id: String,
}

impl CommandModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Command for CommandModel {
    fn aggregate_id(&self) -> &str {
        &self.id
    }
}
