use crate::model::{EntityId, ScopeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("unknown scope {0}")]
    UnknownScope(ScopeId),
    #[error("entity {0} is not tracked by any scope")]
    UnknownEntity(EntityId),
    #[error("a drag of {0} is already in progress")]
    DragInProgress(EntityId),
    #[error("no drag in progress")]
    NoActiveDrag,
    #[error("unknown journey {0}")]
    UnknownJourney(EntityId),
}
