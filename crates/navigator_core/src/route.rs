use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};
use shared::domain::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteParam {
    Id(i64),
    Text(String),
}

impl Default for RouteParam {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl RouteParam {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn record(id: RecordId) -> Self {
        Self::Id(id.0)
    }

    /// Integers, and text holding an integer, name a record; anything else does not.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Self::Id(id) => Some(RecordId(*id)),
            Self::Text(text) => text.trim().parse::<i64>().ok().map(RecordId),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParams {
    #[serde(default)]
    pub rid: RouteParam,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub active: bool,
    #[serde(default)]
    pub params: RouteParams,
    #[serde(default)]
    pub query: HashMap<String, String>,
}

impl Route {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn active(rid: RouteParam) -> Self {
        Self {
            active: true,
            params: RouteParams { rid },
            query: HashMap::new(),
        }
    }

    pub fn record(id: RecordId) -> Self {
        Self::active(RouteParam::record(id))
    }
}

pub trait Router: Send + Sync {
    fn route_change(&self, route: &Route) -> Route;
    fn navigate(&self, rid: RouteParam);
}

#[derive(Debug, Default)]
pub struct MemoryRouter {
    navigations: Mutex<Vec<RouteParam>>,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigations(&self) -> Vec<RouteParam> {
        match self.navigations.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last_navigation(&self) -> Option<RouteParam> {
        self.navigations().pop()
    }
}

impl Router for MemoryRouter {
    fn route_change(&self, route: &Route) -> Route {
        route.clone()
    }

    fn navigate(&self, rid: RouteParam) {
        match self.navigations.lock() {
            Ok(mut guard) => guard.push(rid),
            Err(poisoned) => poisoned.into_inner().push(rid),
        }
    }
}
