use shared::domain::{ContextId, RecordId};

use crate::{
    route::{Route, RouteParam, Router},
    store::RecordStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEffect {
    Changed(RecordId),
    Navigate(RouteParam),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteDecision {
    pub effects: Vec<SelectionEffect>,
    /// Context whose summary still has to be fetched.
    pub fetch: Option<ContextId>,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    selected: RecordId,
    context: ContextId,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> RecordId {
        self.selected
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Moves the selection. Emits a change notification when the id differs,
    /// and asks the router to carry the id when it names a loaded record.
    pub fn select(&mut self, id: RecordId, store: &RecordStore) -> Vec<SelectionEffect> {
        if id == self.selected {
            return Vec::new();
        }
        self.selected = id;

        let mut effects = vec![SelectionEffect::Changed(id)];
        if id.is_persisted() && store.contains(id) {
            effects.push(SelectionEffect::Navigate(RouteParam::record(id)));
        }
        effects
    }

    /// Switches to a new non-zero context, dropping the old population.
    /// `None` when the context is unchanged or zero.
    pub fn on_context_change(
        &mut self,
        context_id: ContextId,
        store: &mut RecordStore,
    ) -> Option<Vec<SelectionEffect>> {
        if context_id == self.context || context_id.is_none() {
            return None;
        }
        self.context = context_id;
        store.reset();
        Some(self.select(RecordId::NONE, store))
    }

    pub fn on_route_change(
        &mut self,
        route: &Route,
        router: &dyn Router,
        store: &RecordStore,
    ) -> RouteDecision {
        if !route.active {
            return RouteDecision {
                effects: self.select(RecordId::NONE, store),
                fetch: None,
            };
        }

        let sub_route = router.route_change(route);
        if !sub_route.active {
            return RouteDecision {
                effects: self.select(RecordId::NONE, store),
                fetch: None,
            };
        }

        let fetch = (!store.is_fetched() && !self.context.is_none()).then_some(self.context);
        let id = sub_route.params.rid.record_id().unwrap_or(RecordId::NONE);
        RouteDecision {
            effects: self.select(id, store),
            fetch,
        }
    }

    pub fn detach(&mut self, store: &mut RecordStore) -> Vec<SelectionEffect> {
        self.context = ContextId::NONE;
        store.reset();
        self.select(RecordId::NONE, store)
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
