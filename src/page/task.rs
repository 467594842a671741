// src/page/task.rs

use crate::model::slot::SlotPosition;
use crate::page::dom::NodeId;

/// Steps of a slot's load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotTask {
    MoveContent,
    CheckLoad,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTask {
    Evaluate,
    /// deadline for a deferred decision
    Expire,
    Display,
}

/// Everything that can be waiting on the page's timer queue.
///
/// Slot tasks and script writes carry the page generation they were scheduled
/// under; a settings rebuild bumps the generation and stale tasks are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTask {
    Slot {
        generation: u64,
        position: SlotPosition,
        task: SlotTask,
    },
    ScriptWrite {
        generation: u64,
        script: NodeId,
        markup: String,
    },
    Gate(GateTask),
}
