// src/interstitial.rs

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classifier::contains_loading_marker;
use crate::model::slot::{AdCreative, SlotPosition};
use crate::page::dom::{Document, NodeId};
use crate::slot::{AdSlotController, SlotStatus};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// evaluation timer not fired yet
    Scheduled,
    /// timer fired while the observed slot was still loading
    AwaitingSlot,
    Declined,
    /// display timer running
    Armed,
    Visible,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayElements {
    pub overlay: NodeId,
    pub close_button: Option<NodeId>,
}

/// 插屏广告是否展示：创意有效、广告位已加载且容器内有真实内容
pub fn should_show(doc: &Document, slot: &AdSlotController) -> bool {
    let deliverable = slot
        .current_creative()
        .is_some_and(AdCreative::is_deliverable);
    if !deliverable || slot.status() != SlotStatus::Loaded {
        return false;
    }
    let elements = slot.elements();
    if elements.fallback.is_some_and(|f| !doc.is_display_none(f)) {
        return false;
    }
    let container = elements.container;
    if doc.inner_html(container).trim().is_empty() {
        return false;
    }
    doc.element_children(container).into_iter().any(|child| {
        let html = doc.inner_html(child);
        !html.trim().is_empty() && !contains_loading_marker(&html)
    })
}

/// One-shot decision on showing the full-screen interstitial.
#[derive(Debug, Clone)]
pub struct InterstitialGate {
    observed: SlotPosition,
    overlay: OverlayElements,
    state: GateState,
}

impl InterstitialGate {
    pub fn new(observed: SlotPosition, overlay: OverlayElements) -> Self {
        Self {
            observed,
            overlay,
            state: GateState::Scheduled,
        }
    }

    pub fn observed(&self) -> SlotPosition {
        self.observed
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Runs when the evaluation timer fires. A slot still loading defers the
    /// decision to its first terminal status. Returns true when the overlay
    /// should be scheduled.
    pub fn on_evaluate(&mut self, doc: &Document, slot: Option<&AdSlotController>) -> bool {
        if self.state != GateState::Scheduled {
            return false;
        }
        match slot {
            Some(s) if s.is_active() && !s.status().is_terminal() => {
                info!(position = %self.observed, "interstitial slot still loading, deferring decision");
                self.state = GateState::AwaitingSlot;
                false
            }
            _ => self.decide(doc, slot),
        }
    }

    /// Runs when a deferred decision times out: the slot never settled (e.g.
    /// rotation keeps restarting an empty creative), so it is judged as is.
    pub fn on_deadline(&mut self, doc: &Document, slot: Option<&AdSlotController>) -> bool {
        if self.state != GateState::AwaitingSlot {
            return false;
        }
        info!(position = %self.observed, "interstitial slot never settled, deciding now");
        self.decide(doc, slot)
    }

    pub fn on_slot_progress(&mut self, doc: &Document, slot: &AdSlotController) -> bool {
        if self.state != GateState::AwaitingSlot || !slot.status().is_terminal() {
            return false;
        }
        self.decide(doc, Some(slot))
    }

    fn decide(&mut self, doc: &Document, slot: Option<&AdSlotController>) -> bool {
        let show = slot.is_some_and(|s| should_show(doc, s));
        self.state = if show {
            GateState::Armed
        } else {
            GateState::Declined
        };
        info!(position = %self.observed, show, "interstitial decision");
        show
    }

    pub fn display(&mut self, doc: &mut Document) {
        if self.state != GateState::Armed {
            return;
        }
        let overlay = self.overlay.overlay;
        doc.remove_class(overlay, "hidden");
        doc.set_style(overlay, "display", "flex");
        let body = doc.body();
        doc.set_style(body, "overflow", "hidden");
        self.state = GateState::Visible;
        info!("interstitial shown");
    }

    pub fn close(&mut self, doc: &mut Document) {
        if self.state != GateState::Visible {
            return;
        }
        let overlay = self.overlay.overlay;
        doc.add_class(overlay, "hidden");
        doc.set_style(overlay, "display", "none");
        let body = doc.body();
        doc.set_style(body, "overflow", "auto");
        self.state = GateState::Closed;
    }
}
