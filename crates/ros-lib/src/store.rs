//! Shared application state
//!
//! Actions are immutable messages dispatched to a root reducer and then to
//! any reducers registered at runtime. Every fetch is tagged with a
//! generation taken from the store; a fulfilment or rejection whose
//! generation is not the latest one issued for its request kind is stale and
//! never reaches the state.

use crate::columns::Column;
use crate::models::{PageResult, RecommendationRecord, SystemRecord};
use crate::query::SortDirection;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub const CHANGE_SORT: &str = "CHANGE_SORT";
pub const EXPAND_ROW: &str = "EXPAND_ROW";

/// Name under which the systems table registers its reducer
pub const ENTITY_DETAIL_REDUCER: &str = "entityDetails";

#[derive(Debug, Clone)]
pub enum Action {
    ChangeSort {
        key: String,
        direction: SortDirection,
    },
    ExpandRow {
        id: String,
        is_open: bool,
    },
    SystemsPending {
        generation: u64,
    },
    SystemsFulfilled {
        generation: u64,
        page: PageResult<SystemRecord>,
    },
    SystemsRejected {
        generation: u64,
        error: String,
    },
    RecommendationsPending {
        generation: u64,
        inventory_id: String,
    },
    RecommendationsFulfilled {
        generation: u64,
        page: PageResult<RecommendationRecord>,
    },
    RecommendationsRejected {
        generation: u64,
        error: String,
    },
}

impl Action {
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::ChangeSort { .. } => CHANGE_SORT,
            Action::ExpandRow { .. } => EXPAND_ROW,
            Action::SystemsPending { .. } => "LOAD_SYSTEMS_PENDING",
            Action::SystemsFulfilled { .. } => "LOAD_SYSTEMS_FULFILLED",
            Action::SystemsRejected { .. } => "LOAD_SYSTEMS_REJECTED",
            Action::RecommendationsPending { .. } => "LOAD_SYS_RECS_PENDING",
            Action::RecommendationsFulfilled { .. } => "LOAD_SYS_RECS_FULFILLED",
            Action::RecommendationsRejected { .. } => "LOAD_SYS_RECS_REJECTED",
        }
    }
}

/// What a dispatch did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Applied,
    /// No reducer handles the action
    Ignored,
    /// A newer request of the same kind is outstanding or committed
    Stale { latest: u64 },
}

/// Lifecycle of the latest request of one kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestState {
    pub loading: bool,
    pub latest_generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestState {
    fn begin(&mut self, generation: u64) -> Reduction {
        if generation < self.latest_generation {
            return Reduction::Stale {
                latest: self.latest_generation,
            };
        }
        self.latest_generation = generation;
        self.loading = true;
        self.error = None;
        Reduction::Applied
    }

    fn settle(&mut self, generation: u64, error: Option<String>) -> Reduction {
        if generation != self.latest_generation {
            return Reduction::Stale {
                latest: self.latest_generation,
            };
        }
        self.loading = false;
        self.error = error;
        Reduction::Applied
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemsState {
    pub request: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageResult<SystemRecord>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecommendationsState {
    pub request: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageResult<RecommendationRecord>>,
}

impl RecommendationsState {
    pub fn total(&self) -> u64 {
        self.page.as_ref().map(|p| p.total_count()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortBy {
    pub key: String,
    pub direction: SortDirection,
}

/// Table state owned by the registered entity-detail reducer
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntitiesState {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    pub columns: Vec<Column>,
    pub expanded: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    pub systems: SystemsState,
    pub recommendations: RecommendationsState,
    pub entities: EntitiesState,
}

/// Root reducer for the request lifecycles of both views
pub fn root_reducer(state: &mut AppState, action: &Action) -> Reduction {
    match action {
        Action::SystemsPending { generation } => state.systems.request.begin(*generation),
        Action::SystemsFulfilled { generation, page } => {
            let reduction = state.systems.request.settle(*generation, None);
            if reduction == Reduction::Applied {
                state.systems.page = Some(page.clone());
            }
            reduction
        }
        Action::SystemsRejected { generation, error } => state
            .systems
            .request
            .settle(*generation, Some(error.clone())),
        Action::RecommendationsPending {
            generation,
            inventory_id,
        } => {
            let reduction = state.recommendations.request.begin(*generation);
            if reduction == Reduction::Applied
                && state.recommendations.inventory_id.as_deref() != Some(inventory_id.as_str())
            {
                state.recommendations.inventory_id = Some(inventory_id.clone());
                state.recommendations.page = None;
            }
            reduction
        }
        Action::RecommendationsFulfilled { generation, page } => {
            let reduction = state.recommendations.request.settle(*generation, None);
            if reduction == Reduction::Applied {
                state.recommendations.page = Some(page.clone());
            }
            reduction
        }
        Action::RecommendationsRejected { generation, error } => state
            .recommendations
            .request
            .settle(*generation, Some(error.clone())),
        Action::ChangeSort { .. } | Action::ExpandRow { .. } => Reduction::Ignored,
    }
}

/// A reducer registered at runtime
pub type Reducer = Arc<dyn Fn(&mut AppState, &Action) -> Reduction + Send + Sync>;

/// Reducers keyed by registration name
pub type ReducerMap = BTreeMap<String, Reducer>;

/// Reducer for sort and row expansion of the systems table
pub fn entity_detail_reducer(columns: Vec<Column>) -> ReducerMap {
    let reducer: Reducer = Arc::new(move |state: &mut AppState, action: &Action| match action {
        Action::ChangeSort { key, direction } => {
            state.entities.sort_by = Some(SortBy {
                key: key.clone(),
                direction: *direction,
            });
            Reduction::Applied
        }
        Action::ExpandRow { id, is_open } => {
            let known = state
                .systems
                .page
                .as_ref()
                .is_some_and(|page| page.items().iter().any(|s| &s.inventory_id == id));
            if !known {
                return Reduction::Ignored;
            }
            if *is_open {
                state.entities.expanded.insert(id.clone());
            } else {
                state.entities.expanded.remove(id);
            }
            Reduction::Applied
        }
        Action::SystemsFulfilled { page, .. } => {
            state.entities.loaded = true;
            state.entities.columns = columns.clone();
            state
                .entities
                .expanded
                .retain(|id| page.items().iter().any(|s| &s.inventory_id == id));
            Reduction::Applied
        }
        _ => Reduction::Ignored,
    });

    let mut map = ReducerMap::new();
    map.insert(ENTITY_DETAIL_REDUCER.to_string(), reducer);
    map
}

/// Handle to the shared state; clones share the same state
#[derive(Clone, Default)]
pub struct Store {
    state: Arc<RwLock<AppState>>,
    reducers: Arc<RwLock<ReducerMap>>,
    generation: Arc<AtomicU64>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generation for a new request, unique and increasing across the store
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `action` to the root reducer, then to every registered reducer.
    ///
    /// Registered reducers do not see actions the root reducer found stale.
    pub async fn dispatch(&self, action: Action) -> Reduction {
        let mut state = self.state.write().await;
        let mut reduction = root_reducer(&mut *state, &action);

        if !matches!(reduction, Reduction::Stale { .. }) {
            let reducers = self.reducers.read().await;
            for reducer in reducers.values() {
                if reducer(&mut *state, &action) == Reduction::Applied {
                    reduction = Reduction::Applied;
                }
            }
        }

        debug!(action = action.action_type(), ?reduction, "Dispatched action");
        reduction
    }

    /// Add reducers; a name that is already registered is replaced.
    ///
    /// Returns how many names were not registered before.
    pub async fn register(&self, reducers: ReducerMap) -> usize {
        let mut registered = self.reducers.write().await;
        let mut added = 0;
        for (name, reducer) in reducers {
            if registered.insert(name, reducer).is_none() {
                added += 1;
            }
        }
        added
    }

    /// Names of the registered reducers
    pub async fn registered(&self) -> Vec<String> {
        self.reducers.read().await.keys().cloned().collect()
    }

    /// Run `f` against the current state
    pub async fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn systems_page(ids: &[&str]) -> PageResult<SystemRecord> {
        let items = ids.iter().map(|id| SystemRecord::new(*id)).collect();
        PageResult::new(items, ids.len() as u64, 1, 10).unwrap()
    }

    #[tokio::test]
    async fn test_generations_increase() {
        let store = Store::new();
        let a = store.next_generation();
        let b = store.clone().next_generation();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_request_lifecycle() {
        let store = Store::new();
        let generation = store.next_generation();

        store.dispatch(Action::SystemsPending { generation }).await;
        assert!(store.read(|s| s.systems.request.loading).await);

        let reduction = store
            .dispatch(Action::SystemsFulfilled {
                generation,
                page: systems_page(&["a", "b"]),
            })
            .await;
        assert_eq!(reduction, Reduction::Applied);

        let state = store.snapshot().await;
        assert!(!state.systems.request.loading);
        assert_eq!(state.systems.page.unwrap().items().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_fulfilment_is_discarded() {
        let store = Store::new();
        let first = store.next_generation();
        let second = store.next_generation();

        store.dispatch(Action::SystemsPending { generation: first }).await;
        store.dispatch(Action::SystemsPending { generation: second }).await;

        store
            .dispatch(Action::SystemsFulfilled {
                generation: second,
                page: systems_page(&["new"]),
            })
            .await;
        let reduction = store
            .dispatch(Action::SystemsFulfilled {
                generation: first,
                page: systems_page(&["old"]),
            })
            .await;

        assert_eq!(reduction, Reduction::Stale { latest: second });
        let page = store.read(|s| s.systems.page.clone()).await.unwrap();
        assert_eq!(page.items()[0].inventory_id, "new");
    }

    #[tokio::test]
    async fn test_stale_rejection_keeps_loading() {
        let store = Store::new();
        let first = store.next_generation();
        let second = store.next_generation();

        store
            .dispatch(Action::RecommendationsPending {
                generation: first,
                inventory_id: "a".into(),
            })
            .await;
        store
            .dispatch(Action::RecommendationsPending {
                generation: second,
                inventory_id: "a".into(),
            })
            .await;
        store
            .dispatch(Action::RecommendationsRejected {
                generation: first,
                error: "Bad Gateway".into(),
            })
            .await;

        let state = store.snapshot().await;
        assert!(state.recommendations.request.loading);
        assert_eq!(state.recommendations.request.error, None);
    }

    #[tokio::test]
    async fn test_rejection_clears_loading() {
        let store = Store::new();
        let generation = store.next_generation();
        store.dispatch(Action::SystemsPending { generation }).await;
        store
            .dispatch(Action::SystemsRejected {
                generation,
                error: "Internal Server Error".into(),
            })
            .await;

        let request = store.read(|s| s.systems.request.clone()).await;
        assert!(!request.loading);
        assert_eq!(request.error.as_deref(), Some("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_sort_and_expand_need_registered_reducer() {
        let store = Store::new();
        let sort = Action::ChangeSort {
            key: "display_name".into(),
            direction: SortDirection::Asc,
        };
        assert_eq!(store.dispatch(sort.clone()).await, Reduction::Ignored);

        assert_eq!(store.register(entity_detail_reducer(Column::ALL.to_vec())).await, 1);
        // Registering again under the same name adds nothing
        assert_eq!(store.register(entity_detail_reducer(Column::ALL.to_vec())).await, 0);

        assert_eq!(store.dispatch(sort).await, Reduction::Applied);
        let sort_by = store.read(|s| s.entities.sort_by.clone()).await.unwrap();
        assert_eq!(sort_by.key, "display_name");
    }

    #[tokio::test]
    async fn test_expand_row_tracks_visible_rows() {
        let store = Store::new();
        store.register(entity_detail_reducer(Column::ALL.to_vec())).await;

        let generation = store.next_generation();
        store.dispatch(Action::SystemsPending { generation }).await;
        store
            .dispatch(Action::SystemsFulfilled {
                generation,
                page: systems_page(&["a", "b"]),
            })
            .await;

        let open = |id: &str, is_open| Action::ExpandRow {
            id: id.to_string(),
            is_open,
        };
        assert_eq!(store.dispatch(open("a", true)).await, Reduction::Applied);
        assert_eq!(store.dispatch(open("zzz", true)).await, Reduction::Ignored);
        assert!(store.read(|s| s.entities.expanded.contains("a")).await);

        store.dispatch(open("a", false)).await;
        assert!(store.read(|s| s.entities.expanded.is_empty()).await);

        // Rows that leave the page lose their expansion
        store.dispatch(open("b", true)).await;
        let generation = store.next_generation();
        store.dispatch(Action::SystemsPending { generation }).await;
        store
            .dispatch(Action::SystemsFulfilled {
                generation,
                page: systems_page(&["c"]),
            })
            .await;
        let state = store.snapshot().await;
        assert!(state.entities.expanded.is_empty());
        assert!(state.entities.loaded);
        assert_eq!(state.entities.columns.len(), 6);
    }

    #[tokio::test]
    async fn test_switching_system_clears_recommendations() {
        let store = Store::new();
        let generation = store.next_generation();
        store
            .dispatch(Action::RecommendationsPending {
                generation,
                inventory_id: "a".into(),
            })
            .await;
        store
            .dispatch(Action::RecommendationsFulfilled {
                generation,
                page: PageResult::new(vec![], 4, 1, 10).unwrap(),
            })
            .await;
        assert_eq!(store.read(|s| s.recommendations.total()).await, 4);

        let generation = store.next_generation();
        store
            .dispatch(Action::RecommendationsPending {
                generation,
                inventory_id: "b".into(),
            })
            .await;
        assert_eq!(store.read(|s| s.recommendations.total()).await, 0);
    }
}
