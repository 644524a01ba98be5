//! Shared node state.
//!
//! One mutex guards the whole state: every field is coupled to the
//! histories' cursors, and the tasks only ever hold the lock for a few
//! microseconds (one record or one chart snapshot).

use atmo_core::station::SensorHistories;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex as AsyncMutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRunState {
    Initializing,
    WifiConnecting,
    Sampling,
}

/// Everything the sampling loop writes and the render/telemetry side reads.
pub struct NodeState {
    pub run_state: NodeRunState,
    pub histories: SensorHistories,
}

impl NodeState {
    pub const fn new() -> Self {
        Self {
            run_state: NodeRunState::Initializing,
            histories: SensorHistories::new(),
        }
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedNodeState = AsyncMutex<CriticalSectionRawMutex, NodeState>;
