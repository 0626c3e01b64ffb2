//! Process-local counters fed by `GlobalMetricsSink`.
#![allow(clippy::cast_precision_loss)]

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for composition and execution.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub plugins: BTreeMap<String, u64>,
    pub since_ms: i64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            plugins: BTreeMap::new(),
            since_ms: Utc::now().timestamp_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Composer
    pub compose_calls: u64,
    pub compose_failures: u64,
    pub fragments_closed: u64,
    pub substitutions: u64,

    // Executor
    pub exec_calls: u64,
    pub rows_scanned: u64,
    pub rows_returned: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub compose_calls: u64,
    pub compose_failures: u64,
    pub exec_calls: u64,
    pub rows_scanned: u64,
    pub rows_returned: u64,
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: Option<EventState>,
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub exec_calls: u64,
    pub rows_returned: u64,
    pub avg_rows_returned: f64,
    pub avg_rows_scanned: f64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Build a report, optionally only when the window started at or after
/// `window_start_ms`.
pub(crate) fn report_window_start(window_start_ms: Option<i64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if let Some(requested) = window_start_ms
        && requested > snap.since_ms
    {
        return EventReport::default();
    }

    let entity_counters = snap
        .entities
        .iter()
        .map(|(path, ops)| {
            let (avg_rows_returned, avg_rows_scanned) = if ops.exec_calls > 0 {
                (
                    ops.rows_returned as f64 / ops.exec_calls as f64,
                    ops.rows_scanned as f64 / ops.exec_calls as f64,
                )
            } else {
                (0.0, 0.0)
            };

            EntitySummary {
                path: path.clone(),
                exec_calls: ops.exec_calls,
                rows_returned: ops.rows_returned,
                avg_rows_returned,
                avg_rows_scanned,
            }
        })
        .collect();

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}
