pub mod canvas;
pub mod compose;
pub mod config;
pub mod drag;
pub mod error;
pub mod events;
pub mod layout;
pub mod measure;
pub mod model;
pub mod persist;
pub mod store;

pub use canvas::CanvasSession;
pub use config::{CanvasConfig, load_config};
pub use drag::{DragCoordinator, HoverTarget};
pub use error::CanvasError;
pub use layout::{CanvasLayout, LayoutEdge, LayoutInput, LayoutNode, NodeRole, Viewport};
pub use measure::{Measure, Size, StaticMeasure, Unmeasured};
pub use model::{EntityId, JourneyPayload, ScopeId, ScopeKind};
pub use persist::{PersistError, PersistScheduler, Persistence};
pub use store::{OrderingStore, Snapshot, StoreEvent};
