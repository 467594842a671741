// src/page/runtime.rs

use std::collections::BTreeMap;

use tracing::info;

use crate::config::{DeviceProfile, EngineConfig};
use crate::interstitial::{GateState, InterstitialGate, OverlayElements};
use crate::model::settings::SettingsEvent;
use crate::model::slot::SlotPosition;
use crate::model::source::SlotAdSource;
use crate::page::dom::Document;
use crate::page::script_host::{apply_write, ScriptHost};
use crate::page::task::{GateTask, PageTask};
use crate::page::timers::TimerQueue;
use crate::slot::{AdSlotController, SlotContext, SlotElements};

/// Element handles for every slot on the page plus the interstitial overlay.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub slots: BTreeMap<SlotPosition, SlotElements>,
    pub overlay: Option<OverlayElements>,
}

impl PageLayout {
    /// Builds the streaming site's layout: one banner block per position, the
    /// interstitial block living inside a hidden overlay.
    pub fn standard(doc: &mut Document) -> Self {
        let body = doc.body();
        let overlay = doc.create_element("div");
        doc.set_attribute(overlay, "id", "interstitialAdOverlay");
        doc.set_attribute(overlay, "class", "interstitial-overlay hidden");
        doc.set_style(overlay, "display", "none");
        let close_button = doc.create_element("button");
        doc.set_attribute(close_button, "id", "closeInterstitialBtn");
        doc.set_text(close_button, "×");
        doc.append_child(overlay, close_button);

        let mut slots = BTreeMap::new();
        for position in SlotPosition::ALL {
            let banner = doc.create_element("div");
            doc.set_attribute(banner, "id", &format!("{}-ad-banner", position));
            doc.set_attribute(banner, "class", "ad-banner");

            let container = doc.create_element("div");
            doc.set_attribute(container, "id", &format!("{}-ad-content", position));
            let fallback = doc.create_element("div");
            doc.set_attribute(fallback, "id", &format!("{}-ad-fallback", position));
            doc.set_attribute(fallback, "class", "ad-fallback");
            let loading = doc.create_element("div");
            doc.set_attribute(loading, "id", &format!("{}-loading", position));
            doc.set_style(loading, "display", "none");
            let dots = doc.create_element("div");
            doc.set_attribute(dots, "id", &format!("{}-ad-dots", position));

            for child in [container, fallback, loading, dots] {
                doc.append_child(banner, child);
            }
            let parent = if position == SlotPosition::Interstitial {
                overlay
            } else {
                body
            };
            doc.append_child(parent, banner);
            slots.insert(
                position,
                SlotElements {
                    container,
                    fallback: Some(fallback),
                    loading: Some(loading),
                    dots: Some(dots),
                },
            );
        }
        doc.append_child(body, overlay);

        Self {
            slots,
            overlay: Some(OverlayElements {
                overlay,
                close_button: Some(close_button),
            }),
        }
    }
}

/// 单个页面会话：文档、定时器队列、各广告位控制器与插屏门控
pub struct AdPage<H: ScriptHost> {
    doc: Document,
    timers: TimerQueue<PageTask>,
    host: H,
    config: EngineConfig,
    profile: DeviceProfile,
    layout: PageLayout,
    controllers: BTreeMap<SlotPosition, AdSlotController>,
    gate_slot: SlotPosition,
    gate: Option<InterstitialGate>,
    generation: u64,
}

impl<H: ScriptHost> AdPage<H> {
    pub fn new(config: EngineConfig, profile: DeviceProfile, host: H) -> Self {
        let mut doc = Document::new();
        let layout = PageLayout::standard(&mut doc);
        Self::with_layout(config, profile, host, doc, layout)
    }

    pub fn with_layout(
        config: EngineConfig,
        profile: DeviceProfile,
        host: H,
        doc: Document,
        layout: PageLayout,
    ) -> Self {
        Self {
            doc,
            timers: TimerQueue::new(),
            host,
            config,
            profile,
            layout,
            controllers: BTreeMap::new(),
            gate_slot: SlotPosition::Interstitial,
            gate: None,
            generation: 0,
        }
    }

    /// Chooses the slot whose outcome gates the interstitial overlay.
    /// Only effective before the first `load`.
    pub fn observe_interstitial(&mut self, position: SlotPosition) {
        self.gate_slot = position;
    }

    /// Initial page load: builds every slot and schedules the one-shot
    /// interstitial evaluation. Later calls only rebuild the slots.
    pub fn load(&mut self, source: &SlotAdSource) {
        self.rebuild(source);
        if self.gate.is_some() {
            return;
        }
        if let Some(overlay) = self.layout.overlay {
            self.gate = Some(InterstitialGate::new(self.gate_slot, overlay));
            self.timers
                .schedule(self.config.gate_delay_ms, PageTask::Gate(GateTask::Evaluate));
        }
    }

    /// Tears down every controller and constructs fresh ones from `Idle`.
    pub fn rebuild(&mut self, source: &SlotAdSource) {
        let (mut ctx, controllers) = self.parts();
        for controller in controllers.values_mut() {
            controller.deactivate(&mut ctx);
        }
        controllers.clear();

        self.generation += 1;
        let slots: Vec<(SlotPosition, SlotElements)> =
            self.layout.slots.iter().map(|(p, e)| (*p, *e)).collect();
        for (position, elements) in slots {
            let mut controller = AdSlotController::new(
                position,
                source.creatives(position).to_vec(),
                elements,
                self.profile,
            );
            let (mut ctx, controllers) = self.parts();
            controller.activate(&mut ctx);
            controllers.insert(position, controller);
        }
        info!(
            generation = self.generation,
            slots = self.controllers.len(),
            deliverable = ?source.deliverable_positions(),
            "ad slots built"
        );
    }

    /// Applies a message from the real-time settings channel. Returns true
    /// when the slots were rebuilt.
    pub fn handle_settings_event(&mut self, event: &SettingsEvent, source: &SlotAdSource) -> bool {
        if !event.requires_slot_rebuild() {
            return false;
        }
        info!("banner settings changed, rebuilding ad slots");
        self.rebuild(source);
        true
    }

    /// Fires every task due up to `until_ms` and moves the clock there.
    pub fn run_until(&mut self, until_ms: u64) {
        while let Some((_, task)) = self.timers.pop_due(until_ms) {
            self.dispatch(task);
        }
        self.timers.advance_to(until_ms);
    }

    pub fn advance_by(&mut self, delta_ms: u64) {
        let until = self.timers.now() + delta_ms;
        self.run_until(until);
    }

    /// Click on a rotation dot.
    pub fn select_ad(&mut self, position: SlotPosition, index: usize) {
        let (mut ctx, controllers) = self.parts();
        if let Some(controller) = controllers.get_mut(&position) {
            controller.show_ad(&mut ctx, index);
        }
        self.poll_gate(position);
    }

    pub fn close_interstitial(&mut self) {
        if let Some(gate) = self.gate.as_mut() {
            gate.close(&mut self.doc);
        }
    }

    pub fn slot(&self, position: SlotPosition) -> Option<&AdSlotController> {
        self.controllers.get(&position)
    }

    pub fn slots(&self) -> impl Iterator<Item = &AdSlotController> {
        self.controllers.values()
    }

    pub fn gate_state(&self) -> Option<GateState> {
        self.gate.as_ref().map(InterstitialGate::state)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn now(&self) -> u64 {
        self.timers.now()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    fn parts(&mut self) -> (SlotContext<'_>, &mut BTreeMap<SlotPosition, AdSlotController>) {
        (
            SlotContext {
                doc: &mut self.doc,
                timers: &mut self.timers,
                host: &mut self.host,
                config: &self.config,
                generation: self.generation,
            },
            &mut self.controllers,
        )
    }

    fn dispatch(&mut self, task: PageTask) {
        match task {
            PageTask::Slot {
                generation,
                position,
                task,
            } => {
                if generation != self.generation {
                    return;
                }
                let (mut ctx, controllers) = self.parts();
                if let Some(controller) = controllers.get_mut(&position) {
                    controller.handle(&mut ctx, task);
                }
                self.poll_gate(position);
            }
            PageTask::ScriptWrite {
                generation,
                script,
                markup,
            } => {
                if generation == self.generation {
                    apply_write(&mut self.doc, script, &markup);
                }
            }
            PageTask::Gate(GateTask::Evaluate) => {
                let Some(gate) = self.gate.as_mut() else {
                    return;
                };
                let slot = self.controllers.get(&gate.observed());
                if gate.on_evaluate(&self.doc, slot) {
                    self.timers.schedule(
                        self.config.interstitial_display_delay_ms,
                        PageTask::Gate(GateTask::Display),
                    );
                } else if gate.state() == GateState::AwaitingSlot {
                    self.timers
                        .schedule(self.config.gate_max_wait_ms, PageTask::Gate(GateTask::Expire));
                }
            }
            PageTask::Gate(GateTask::Expire) => {
                let Some(gate) = self.gate.as_mut() else {
                    return;
                };
                let slot = self.controllers.get(&gate.observed());
                if gate.on_deadline(&self.doc, slot) {
                    self.timers.schedule(
                        self.config.interstitial_display_delay_ms,
                        PageTask::Gate(GateTask::Display),
                    );
                }
            }
            PageTask::Gate(GateTask::Display) => {
                if let Some(gate) = self.gate.as_mut() {
                    gate.display(&mut self.doc);
                }
            }
        }
    }

    fn poll_gate(&mut self, position: SlotPosition) {
        let Some(gate) = self.gate.as_mut() else {
            return;
        };
        if gate.observed() != position {
            return;
        }
        let Some(slot) = self.controllers.get(&position) else {
            return;
        };
        if gate.on_slot_progress(&self.doc, slot) {
            self.timers.schedule(
                self.config.interstitial_display_delay_ms,
                PageTask::Gate(GateTask::Display),
            );
        }
    }
}
