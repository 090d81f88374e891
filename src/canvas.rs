//! Session facade: owns the store, drag coordinator, debounce scheduler
//! and the current layout for one open journey. The host feeds it pointer
//! events, frame callbacks (for measurement passes and persistence
//! flushes) and authoritative reloads.

use crate::compose::compose_graph;
use crate::config::CanvasConfig;
use crate::drag::{DragCoordinator, HoverTarget};
use crate::error::CanvasError;
use crate::layout::{self, CanvasLayout, Viewport};
use crate::measure::Measure;
use crate::model::{EntityId, JourneyPayload};
use crate::persist::{PersistScheduler, Persistence};
use crate::store::OrderingStore;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

pub struct CanvasSession<P: Persistence> {
    config: CanvasConfig,
    root: JourneyPayload,
    focus: EntityId,
    store: OrderingStore,
    drag: DragCoordinator,
    scheduler: PersistScheduler,
    persistence: P,
    layout: CanvasLayout,
    dirty: Rc<Cell<bool>>,
    remeasure_attempts: u32,
    measurements_stable: bool,
    fresh_load: bool,
}

impl<P: Persistence> CanvasSession<P> {
    pub fn new(root: JourneyPayload, config: CanvasConfig, persistence: P) -> Self {
        let mut store = OrderingStore::new();
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        store.subscribe(move |_| flag.set(true));
        store.load_journey(&root);

        let scheduler = PersistScheduler::new(config.drag.persist_debounce_ms);
        let focus = root.id.clone();
        Self {
            config,
            root,
            focus,
            store,
            drag: DragCoordinator::new(),
            scheduler,
            persistence,
            layout: CanvasLayout::default(),
            dirty,
            remeasure_attempts: 0,
            measurements_stable: false,
            fresh_load: true,
        }
    }

    pub fn store(&self) -> &OrderingStore {
        &self.store
    }

    pub fn layout(&self) -> &CanvasLayout {
        &self.layout
    }

    pub fn focus(&self) -> &str {
        &self.focus
    }

    /// Open another journey of the loaded tree. Counts as a fresh load for
    /// auto-fit purposes.
    pub fn set_focus(&mut self, journey_id: &str) -> Result<(), CanvasError> {
        if self.root.find(journey_id).is_none() {
            return Err(CanvasError::UnknownJourney(journey_id.to_string()));
        }
        self.focus = journey_id.to_string();
        self.dirty.set(true);
        self.fresh_load = true;
        Ok(())
    }

    /// Replace the whole tree with a fresh authoritative payload. Local
    /// optimistic state is discarded; this is how persistence drift heals.
    pub fn reload(&mut self, root: JourneyPayload) {
        if root.find(&self.focus).is_none() {
            self.focus = root.id.clone();
        }
        self.store.load_journey(&root);
        self.root = root;
        self.fresh_load = true;
    }

    /// Recompute what the current frame needs: a full re-derive + layout
    /// when the store changed, otherwise one bounded measurement pass.
    /// Call once per frame with the host's measurement source.
    pub fn refresh(&mut self, measure: &dyn Measure) -> &CanvasLayout {
        if self.dirty.replace(false) {
            let input = compose_graph(&self.root, &self.focus, &self.store);
            self.layout = layout::solve_layout(&input, measure, &self.config.layout);
            self.remeasure_attempts = 0;
            self.measurements_stable = false;
        } else if self.needs_remeasure() {
            self.remeasure_attempts += 1;
            let changed = layout::apply_measurements(&mut self.layout, measure, &self.config.layout);
            if !changed {
                self.measurements_stable = true;
            }
        }
        &self.layout
    }

    /// Whether another measurement pass is worth scheduling. Exhausting
    /// the attempt budget means the engine proceeds with the best values
    /// available rather than blocking.
    pub fn needs_remeasure(&self) -> bool {
        !self.measurements_stable
            && self.remeasure_attempts < self.config.layout.remeasure_attempts
    }

    /// The fit transform, handed out once per fresh load so deselections
    /// and drags never yank the viewport around.
    pub fn take_fit_viewport(&mut self, view_width: f32, view_height: f32) -> Option<Viewport> {
        if !self.fresh_load {
            return None;
        }
        self.fresh_load = false;
        Some(layout::fit_viewport(
            &self.layout,
            view_width,
            view_height,
            &self.config.fit,
        ))
    }

    pub fn drag_start(&mut self, entity: &str) -> Result<(), CanvasError> {
        self.drag.drag_start(&self.store, entity)
    }

    pub fn drag_over(&mut self, target: &HoverTarget) -> Result<(), CanvasError> {
        self.drag.drag_over(&mut self.store, target)
    }

    pub fn drag_end(&mut self, now: Instant) -> Result<(), CanvasError> {
        self.drag
            .drag_end(&self.store, &mut self.scheduler, &mut self.persistence, now)
    }

    pub fn drag_cancel(&mut self) -> Result<(), CanvasError> {
        self.drag.drag_cancel(&mut self.store)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Flush debounced persistence writes whose window elapsed. Returns
    /// the number of calls issued; failures are logged and swallowed.
    pub fn flush_persistence(&mut self, now: Instant) -> usize {
        self.scheduler
            .flush_due(now, &self.store, &mut self.persistence)
    }

    pub fn pending_persistence(&self) -> usize {
        self.scheduler.pending_count()
    }
}
