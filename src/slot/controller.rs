// src/slot/controller.rs

use tracing::{debug, info, warn};

use crate::classifier::{has_meaningful_content, is_invalid_content, is_url_only};
use crate::config::{DeviceProfile, EngineConfig};
use crate::model::slot::{AdCreative, SlotPosition};
use crate::page::dom::{Document, NodeId};
use crate::page::script_host::{apply_write, strip_script_tags, ScriptHost};
use crate::page::task::{PageTask, SlotTask};
use crate::page::timers::{TimerId, TimerQueue};
use crate::slot::state::{SlotState, SlotStatus};

/// Handles to the page elements one slot renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotElements {
    pub container: NodeId,
    pub fallback: Option<NodeId>,
    pub loading: Option<NodeId>,
    pub dots: Option<NodeId>,
}

impl SlotElements {
    pub fn bare(container: NodeId) -> Self {
        Self {
            container,
            fallback: None,
            loading: None,
            dots: None,
        }
    }
}

/// Page resources a controller borrows while handling one callback.
pub struct SlotContext<'a> {
    pub doc: &'a mut Document,
    pub timers: &'a mut TimerQueue<PageTask>,
    pub host: &'a mut dyn ScriptHost,
    pub config: &'a EngineConfig,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Injection {
    marker: NodeId,
    script: NodeId,
}

/// 单个广告位控制器：注入、等待、校验、重试、降级与轮播
#[derive(Debug)]
pub struct AdSlotController {
    position: SlotPosition,
    creatives: Vec<AdCreative>,
    elements: SlotElements,
    profile: DeviceProfile,
    state: SlotState,
    active: bool,
    injection: Option<Injection>,
    pending: Vec<TimerId>,
    rotation: Option<TimerId>,
    checks: u32,
}

impl AdSlotController {
    pub fn new(
        position: SlotPosition,
        creatives: Vec<AdCreative>,
        elements: SlotElements,
        profile: DeviceProfile,
    ) -> Self {
        let active = creatives.iter().any(AdCreative::is_deliverable);
        Self {
            position,
            creatives,
            elements,
            profile,
            state: SlotState::default(),
            active,
            injection: None,
            pending: Vec::new(),
            rotation: None,
            checks: 0,
        }
    }

    pub fn position(&self) -> SlotPosition {
        self.position
    }

    pub fn status(&self) -> SlotStatus {
        self.state.status
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn retry_count(&self) -> u32 {
        self.state.retry_count
    }

    pub fn creatives(&self) -> &[AdCreative] {
        &self.creatives
    }

    pub fn current_creative(&self) -> Option<&AdCreative> {
        self.creatives.get(self.state.current_index)
    }

    pub fn elements(&self) -> &SlotElements {
        &self.elements
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// False when no creative has a usable payload; such a slot never leaves `Idle`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of load checks run since construction.
    pub fn checks_run(&self) -> u32 {
        self.checks
    }

    /// Starts the slot lifecycle. An inactive slot only hides its fallback
    /// message and leaves everything else on the slot (e.g. a VAST overlay)
    /// untouched.
    pub fn activate(&mut self, ctx: &mut SlotContext<'_>) {
        if !self.active {
            info!(position = %self.position, "no deliverable creative, slot stays idle");
            self.hide_fallback(ctx.doc);
            return;
        }
        info!(position = %self.position, creatives = self.creatives.len(), "activating ad slot");
        self.create_dots(ctx.doc);
        self.show_ad(ctx, 0);
        if self.creatives.len() > 1 {
            let interval = ctx.config.rotation_interval_ms;
            self.rotation = Some(self.schedule(ctx, interval, SlotTask::Rotate));
        }
    }

    /// Stops every timer of this slot and clears what it rendered.
    pub fn deactivate(&mut self, ctx: &mut SlotContext<'_>) {
        self.cancel_pending(ctx.timers);
        if let Some(rotation) = self.rotation.take() {
            ctx.timers.cancel(rotation);
        }
        self.discard_injection(ctx.doc);
        ctx.doc.clear_children(self.elements.container);
        self.hide_loading_indicator(ctx.doc);
        self.hide_fallback(ctx.doc);
        if let Some(dots) = self.elements.dots {
            ctx.doc.clear_children(dots);
        }
    }

    pub fn handle(&mut self, ctx: &mut SlotContext<'_>, task: SlotTask) {
        match task {
            SlotTask::MoveContent => self.move_content(ctx),
            SlotTask::CheckLoad => self.check_load(ctx),
            SlotTask::Rotate => self.rotate(ctx),
        }
    }

    /// (Re)enters `Loading` with the creative at `index`.
    pub fn show_ad(&mut self, ctx: &mut SlotContext<'_>, index: usize) {
        if !self.active || index >= self.creatives.len() {
            return;
        }
        self.cancel_pending(ctx.timers);
        self.discard_injection(ctx.doc);
        self.state.current_index = index;
        self.state.retry_count = 0;
        self.state.status = SlotStatus::Loading;

        ctx.doc.clear_children(self.elements.container);
        self.hide_fallback(ctx.doc);
        if self.profile.is_mobile() {
            self.show_loading_indicator(ctx.doc);
        }
        self.update_dots(ctx.doc);

        let creative_id = self.creatives[index].id.clone();
        let payload = self.creatives[index].payload.clone();
        let source = strip_script_tags(&payload);

        let body = ctx.doc.body();
        let marker = ctx.doc.create_element("div");
        ctx.doc
            .set_attribute(marker, "id", &format!("ad-marker-{}", creative_id));
        ctx.doc.set_style(marker, "display", "none");
        ctx.doc.append_child(body, marker);

        let script = ctx.doc.create_element("script");
        ctx.doc.set_text(script, &source);
        if self.profile.is_mobile() {
            ctx.doc.set_attribute(script, "data-mobile", "true");
            ctx.doc.set_attribute(script, "data-viewport", "mobile");
            ctx.doc.set_attribute(script, "data-device", "mobile");
        }
        ctx.doc.append_child(body, script);
        self.injection = Some(Injection { marker, script });
        debug!(position = %self.position, creative = %creative_id, index, "creative injected");

        let generation = ctx.generation;
        match ctx.host.execute(self.position, &payload) {
            Ok(writes) => {
                for write in writes {
                    if write.delay_ms == 0 {
                        apply_write(ctx.doc, script, &write.markup);
                    } else {
                        ctx.timers.schedule(
                            write.delay_ms,
                            PageTask::ScriptWrite {
                                generation,
                                script,
                                markup: write.markup,
                            },
                        );
                    }
                }
            }
            Err(err) => {
                warn!(position = %self.position, creative = %creative_id, error = %err, "ad script failed to load");
                self.show_fallback(ctx);
                return;
            }
        }

        let timings = *ctx.config.timings(self.profile);
        self.schedule(ctx, timings.move_delay_ms, SlotTask::MoveContent);
        self.schedule(ctx, timings.check_delay_ms, SlotTask::CheckLoad);
    }

    pub fn next_ad(&mut self, ctx: &mut SlotContext<'_>) {
        if self.creatives.is_empty() {
            return;
        }
        let next = (self.state.current_index + 1) % self.creatives.len();
        self.show_ad(ctx, next);
    }

    fn rotate(&mut self, ctx: &mut SlotContext<'_>) {
        if !self.active || self.creatives.len() < 2 {
            return;
        }
        self.next_ad(ctx);
        let interval = ctx.config.rotation_interval_ms;
        self.rotation = Some(self.schedule(ctx, interval, SlotTask::Rotate));
    }

    /// Moves what the script rendered between the marker and the script tag
    /// into the container, leaving URL-only text (and on mobile, placeholder
    /// text) behind. Marker and script are removed afterwards.
    fn move_content(&mut self, ctx: &mut SlotContext<'_>) {
        let Some(Injection { marker, script }) = self.injection.take() else {
            return;
        };
        let doc = &mut *ctx.doc;
        let container = self.elements.container;
        let mut moved = 0usize;
        if doc.is_connected(marker) {
            let mut cursor = doc.next_sibling(marker);
            while let Some(node) = cursor {
                if node == script {
                    break;
                }
                cursor = doc.next_sibling(node);
                if !doc.is_element(node) {
                    continue;
                }
                if is_url_only(&doc.text_content(node)) {
                    debug!(position = %self.position, "skipping url-only content");
                    continue;
                }
                if self.profile.is_mobile() && is_invalid_content(doc, node) {
                    debug!(position = %self.position, "skipping placeholder content");
                    continue;
                }
                doc.append_child(container, node);
                moved += 1;
            }
        }
        doc.detach(marker);
        doc.detach(script);
        if moved > 0 && self.profile.is_mobile() {
            self.hide_loading_indicator(doc);
        }
        debug!(position = %self.position, moved, "injected content moved");
    }

    fn check_load(&mut self, ctx: &mut SlotContext<'_>) {
        if !self.active || self.state.status.is_terminal() {
            return;
        }
        let timings = *ctx.config.timings(self.profile);
        let max_retries = ctx.config.max_retries;
        let container = self.elements.container;
        self.checks += 1;

        if ctx.doc.child_element_count(container) == 0 {
            self.state.retry_count += 1;
            if self.state.retry_count < max_retries {
                self.state.status = SlotStatus::Loading;
                info!(position = %self.position, attempt = self.state.retry_count, "slot still empty, retrying");
                self.schedule(ctx, timings.retry_move_delay_ms(), SlotTask::MoveContent);
                self.schedule(ctx, timings.retry_check_delay_ms(), SlotTask::CheckLoad);
            } else {
                warn!(position = %self.position, attempts = max_retries, "ad failed to load");
                self.show_fallback(ctx);
            }
            return;
        }

        self.state.status = SlotStatus::Validating;
        if has_meaningful_content(ctx.doc, container) {
            self.state.retry_count = 0;
            self.state.status = SlotStatus::Loaded;
            self.hide_loading_indicator(ctx.doc);
            self.hide_fallback(ctx.doc);
            info!(position = %self.position, index = self.state.current_index, "ad loaded");
        } else if self.state.retry_count >= max_retries {
            warn!(position = %self.position, "ad content invalid, showing fallback");
            self.show_fallback(ctx);
        } else {
            self.state.retry_count += 1;
            debug!(position = %self.position, attempt = self.state.retry_count, "revalidating ad content");
            self.schedule(ctx, timings.revalidate_delay_ms, SlotTask::CheckLoad);
        }
    }

    /// The fallback message only appears over an empty container; partial
    /// content stays visible with the message hidden.
    fn show_fallback(&mut self, ctx: &mut SlotContext<'_>) {
        self.cancel_pending(ctx.timers);
        self.discard_injection(ctx.doc);
        self.state.status = SlotStatus::Fallback;
        if let Some(fallback) = self.elements.fallback {
            if ctx.doc.child_element_count(self.elements.container) == 0 {
                render_fallback_message(ctx.doc, fallback, self.profile);
                ctx.doc.set_style(fallback, "display", "block");
            } else {
                ctx.doc.set_style(fallback, "display", "none");
            }
        }
        self.hide_loading_indicator(ctx.doc);
    }

    fn schedule(&mut self, ctx: &mut SlotContext<'_>, delay_ms: u64, task: SlotTask) -> TimerId {
        let id = ctx.timers.schedule(
            delay_ms,
            PageTask::Slot {
                generation: ctx.generation,
                position: self.position,
                task,
            },
        );
        if task != SlotTask::Rotate {
            self.pending.push(id);
        }
        id
    }

    fn cancel_pending(&mut self, timers: &mut TimerQueue<PageTask>) {
        for id in self.pending.drain(..) {
            timers.cancel(id);
        }
    }

    fn discard_injection(&mut self, doc: &mut Document) {
        if let Some(Injection { marker, script }) = self.injection.take() {
            doc.detach(marker);
            doc.detach(script);
        }
    }

    fn hide_fallback(&self, doc: &mut Document) {
        if let Some(fallback) = self.elements.fallback {
            doc.set_style(fallback, "display", "none");
        }
    }

    fn show_loading_indicator(&self, doc: &mut Document) {
        if let Some(loading) = self.elements.loading {
            doc.set_text(loading, "Loading advertisement...");
            doc.set_style(loading, "display", "block");
        }
    }

    fn hide_loading_indicator(&self, doc: &mut Document) {
        if let Some(loading) = self.elements.loading {
            doc.set_style(loading, "display", "none");
        }
    }

    fn create_dots(&self, doc: &mut Document) {
        let Some(dots) = self.elements.dots else {
            return;
        };
        if self.creatives.len() < 2 {
            return;
        }
        doc.clear_children(dots);
        for index in 0..self.creatives.len() {
            let dot = doc.create_element("button");
            doc.set_attribute(dot, "data-index", &index.to_string());
            doc.append_child(dots, dot);
        }
        self.update_dots(doc);
    }

    fn update_dots(&self, doc: &mut Document) {
        let Some(dots) = self.elements.dots else {
            return;
        };
        for (index, dot) in doc.element_children(dots).into_iter().enumerate() {
            let class = if index == self.state.current_index {
                "ad-dot active"
            } else {
                "ad-dot inactive"
            };
            doc.set_attribute(dot, "class", class);
        }
    }
}

fn render_fallback_message(doc: &mut Document, fallback: NodeId, profile: DeviceProfile) {
    doc.clear_children(fallback);
    let title = doc.create_element("h4");
    doc.set_text(title, "🎬 Advertisement");
    let message = doc.create_element("p");
    let text = if profile.is_mobile() {
        "Mobile ad content loading..."
    } else {
        "External ad content loading..."
    };
    doc.set_text(message, text);
    doc.append_child(fallback, title);
    doc.append_child(fallback, message);
}

#[cfg(test)]
mod tests {
    use crate::config::{DeviceProfile, EngineConfig};
    use crate::model::slot::{AdCreative, SlotPosition};
    use crate::model::source::SlotAdSource;
    use crate::page::script_host::ScriptWrite;
    use crate::page::testing::ScriptedHost;
    use crate::page::AdPage;
    use crate::slot::SlotStatus;

    const TOP: SlotPosition = SlotPosition::Top;

    fn page(host: ScriptedHost, profile: DeviceProfile) -> AdPage<ScriptedHost> {
        AdPage::new(EngineConfig::default(), profile, host)
    }

    fn top_only(payload: &str) -> SlotAdSource {
        SlotAdSource::new().with_creatives(TOP, vec![AdCreative::new("top-1", payload)])
    }

    #[test]
    fn empty_or_placeholder_creatives_stay_idle() {
        for payload in ["", "   ", "<script>load('//ads.invalid/footer-ad-script')</script>"] {
            let mut page = page(ScriptedHost::default(), DeviceProfile::Desktop);
            page.load(&top_only(payload));
            page.run_until(20_000);

            let slot = page.slot(TOP).unwrap();
            assert_eq!(slot.status(), SlotStatus::Idle);
            assert!(!slot.is_active());
            let elements = *slot.elements();
            let doc = page.document();
            assert_eq!(doc.child_element_count(elements.container), 0);
            assert!(doc.is_display_none(elements.fallback.unwrap()));
            assert_eq!(doc.get_element_by_id("ad-marker-top-1"), None);
        }
    }

    #[test]
    fn slot_without_creatives_stays_idle() {
        let mut page = page(ScriptedHost::default(), DeviceProfile::Desktop);
        page.load(&SlotAdSource::new());
        page.run_until(10_000);
        for position in SlotPosition::ALL {
            assert_eq!(page.slot(position).unwrap().status(), SlotStatus::Idle);
        }
    }

    #[test]
    fn real_content_reaches_loaded_with_zero_retries() {
        let host = ScriptedHost::default()
            .respond(TOP, vec![ScriptWrite::immediate("<div class=\"ad\">Fresh coffee beans, 20% off</div>")]);
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>render()</script>"));

        page.run_until(2_999);
        assert_eq!(page.slot(TOP).unwrap().status(), SlotStatus::Loading);

        page.run_until(3_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loaded);
        assert_eq!(slot.retry_count(), 0);
        let container = slot.elements().container;
        assert_eq!(page.document().text_content(container), "Fresh coffee beans, 20% off");
        // marker and script are gone from the body
        assert_eq!(page.document().get_element_by_id("ad-marker-top-1"), None);
    }

    #[test]
    fn empty_container_falls_back_after_exactly_three_checks() {
        let mut page = page(ScriptedHost::default(), DeviceProfile::Desktop);
        page.load(&top_only("<script>silent()</script>"));

        // checks at 3000, 3600 and 4200
        page.run_until(4_199);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loading);
        assert_eq!(slot.retry_count(), 2);
        assert_eq!(slot.checks_run(), 2);

        page.run_until(4_200);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.retry_count(), 3);
        assert_eq!(slot.checks_run(), 3);
        let fallback = slot.elements().fallback.unwrap();
        assert_eq!(page.document().style(fallback, "display"), Some("block"));
        assert!(page.document().text_content(fallback).contains("External ad content loading..."));

        page.run_until(60_000);
        assert_eq!(page.slot(TOP).unwrap().checks_run(), 3);
        assert_eq!(page.pending_timers(), 0);
    }

    #[test]
    fn url_only_output_is_treated_as_empty() {
        let host = ScriptedHost::default().respond(
            TOP,
            vec![ScriptWrite::immediate("<div>https://distortedwin.com/bvX.VzscdqG</div>")],
        );
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>noisy()</script>"));
        page.run_until(5_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(page.document().child_element_count(slot.elements().container), 0);
    }

    #[test]
    fn noise_is_filtered_around_real_creative() {
        let host = ScriptedHost::default().respond(
            TOP,
            vec![ScriptWrite::immediate(
                "<div>//cdn.example.net/loader.js</div><div class=\"ad\">Weekend flights from $49</div>",
            )],
        );
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>mixed()</script>"));
        page.run_until(3_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loaded);
        assert_eq!(page.document().child_element_count(slot.elements().container), 1);
    }

    #[test]
    fn trivial_content_revalidates_then_falls_back() {
        let host = ScriptedHost::default().respond(TOP, vec![ScriptWrite::immediate("<div>hi</div>")]);
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>tiny()</script>"));

        // checks at 3000, 4000, 5000 and 6000
        page.run_until(5_999);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Validating);
        assert_eq!(slot.retry_count(), 3);

        page.run_until(6_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.retry_count(), 3);
        // partial content keeps the fallback message hidden
        assert!(page.document().is_display_none(slot.elements().fallback.unwrap()));
    }

    #[test]
    fn late_output_within_move_delay_is_captured() {
        let host = ScriptedHost::default()
            .respond(TOP, vec![ScriptWrite::after(150, "<div>Async creative rendered</div>")]);
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>async()</script>"));
        page.run_until(3_000);
        assert_eq!(page.slot(TOP).unwrap().status(), SlotStatus::Loaded);
    }

    #[test]
    fn script_error_forces_immediate_fallback() {
        let host = ScriptedHost::default().fail(TOP, "net::ERR_BLOCKED_BY_CLIENT");
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>blocked()</script>"));

        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.checks_run(), 0);
        assert_eq!(page.document().get_element_by_id("ad-marker-top-1"), None);

        page.run_until(10_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.checks_run(), 0);
    }

    #[test]
    fn mobile_uses_longer_delays_and_filters_placeholders() {
        let host = ScriptedHost::default().respond(
            TOP,
            vec![ScriptWrite::immediate("<p>Ad loading...</p><div>Mobile creative for phones</div>")],
        );
        let mut page = page(host, DeviceProfile::Mobile);
        page.load(&top_only("<script>mobile()</script>"));

        let loading = page.slot(TOP).unwrap().elements().loading.unwrap();
        assert_eq!(page.document().style(loading, "display"), Some("block"));

        page.run_until(3_999);
        assert_eq!(page.slot(TOP).unwrap().status(), SlotStatus::Loading);
        page.run_until(4_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loaded);
        assert_eq!(page.document().child_element_count(slot.elements().container), 1);
        assert!(page.document().is_display_none(loading));
    }

    #[test]
    fn rotation_cycles_through_creatives() {
        let host = ScriptedHost::default()
            .respond(TOP, vec![ScriptWrite::immediate("<div>Rotating creative body</div>")]);
        let mut page = page(host, DeviceProfile::Desktop);
        let source = SlotAdSource::new().with_creatives(
            TOP,
            vec![
                AdCreative::new("top-1", "<script>a()</script>"),
                AdCreative::new("top-2", "<script>b()</script>"),
                AdCreative::new("top-3", "<script>c()</script>"),
            ],
        );
        page.load(&source);

        let mut seen = vec![page.slot(TOP).unwrap().current_index()];
        for tick in 1..=3u64 {
            page.run_until(tick * 5_000);
            seen.push(page.slot(TOP).unwrap().current_index());
        }
        assert_eq!(seen, vec![0, 1, 2, 0]);

        let dots = page.slot(TOP).unwrap().elements().dots.unwrap();
        let doc = page.document();
        let classes: Vec<_> = doc
            .element_children(dots)
            .into_iter()
            .map(|d| doc.attribute(d, "class").unwrap_or_default().to_string())
            .collect();
        assert_eq!(classes, vec!["ad-dot active", "ad-dot inactive", "ad-dot inactive"]);
    }

    #[test]
    fn selecting_a_dot_restarts_loading_at_that_creative() {
        let host = ScriptedHost::default()
            .respond(TOP, vec![ScriptWrite::immediate("<div>Selectable creative body</div>")]);
        let mut page = page(host, DeviceProfile::Desktop);
        let source = SlotAdSource::new().with_creatives(
            TOP,
            vec![
                AdCreative::new("top-1", "<script>a()</script>"),
                AdCreative::new("top-2", "<script>b()</script>"),
            ],
        );
        page.load(&source);
        page.run_until(3_000);
        assert_eq!(page.slot(TOP).unwrap().status(), SlotStatus::Loaded);

        page.select_ad(TOP, 1);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.current_index(), 1);
        assert_eq!(slot.status(), SlotStatus::Loading);

        // out of range selections are ignored
        page.select_ad(TOP, 7);
        assert_eq!(page.slot(TOP).unwrap().current_index(), 1);
    }

    #[test]
    fn single_creative_slots_never_rotate() {
        let host = ScriptedHost::default()
            .respond(TOP, vec![ScriptWrite::immediate("<div>Only creative here</div>")]);
        let mut page = page(host, DeviceProfile::Desktop);
        page.load(&top_only("<script>only()</script>"));
        page.run_until(30_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.current_index(), 0);
        assert_eq!(slot.status(), SlotStatus::Loaded);
        assert_eq!(page.pending_timers(), 0);
    }

    fn silent_creatives(count: usize) -> SlotAdSource {
        let creatives = (1..=count)
            .map(|i| AdCreative::new(&format!("top-{}", i), "<script>silent()</script>"))
            .collect();
        SlotAdSource::new().with_creatives(TOP, creatives)
    }

    #[test]
    fn each_rotated_creative_gets_its_own_three_checks() {
        let mut long_run = page(ScriptedHost::default(), DeviceProfile::Desktop);
        long_run.load(&silent_creatives(3));
        for now in (0..=60_000u64).step_by(100) {
            long_run.run_until(now);
            let slot = long_run.slot(TOP).unwrap();
            assert!(slot.retry_count() <= 3, "retry_count {} at {}ms", slot.retry_count(), now);
        }

        let mut page = page(ScriptedHost::default(), DeviceProfile::Desktop);
        page.load(&silent_creatives(3));
        page.run_until(4_200);
        let slot = page.slot(TOP).unwrap();
        assert_eq!((slot.current_index(), slot.status()), (0, SlotStatus::Fallback));
        assert_eq!(slot.checks_run(), 3);

        // rotation at 5000 starts creative 2 from scratch: checks at 8000, 8600, 9200
        page.run_until(5_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!((slot.current_index(), slot.status()), (1, SlotStatus::Loading));
        assert_eq!(slot.retry_count(), 0);

        page.run_until(9_199);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loading);
        assert_eq!(slot.checks_run(), 5);

        page.run_until(9_200);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.retry_count(), 3);
        assert_eq!(slot.checks_run(), 6);
    }

    #[test]
    fn selecting_after_fallback_runs_a_fresh_check_cycle() {
        let mut page = page(ScriptedHost::default(), DeviceProfile::Desktop);
        page.load(&top_only("<script>silent()</script>"));
        page.run_until(4_200);
        assert_eq!(page.slot(TOP).unwrap().status(), SlotStatus::Fallback);

        page.select_ad(TOP, 0);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loading);
        assert_eq!(slot.retry_count(), 0);
        let fallback = slot.elements().fallback.unwrap();
        assert!(page.document().is_display_none(fallback));

        // 7200, 7800, 8400
        page.run_until(8_399);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loading);
        assert_eq!(slot.retry_count(), 2);

        page.run_until(8_400);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.retry_count(), 3);
        assert_eq!(slot.checks_run(), 6);
        page.run_until(30_000);
        assert_eq!(page.slot(TOP).unwrap().checks_run(), 6);
    }

    #[test]
    fn mobile_empty_container_checks_at_4000_5500_and_7000() {
        let mut page = page(ScriptedHost::default(), DeviceProfile::Mobile);
        page.load(&top_only("<script>silent()</script>"));

        page.run_until(4_000);
        assert_eq!(page.slot(TOP).unwrap().checks_run(), 1);
        page.run_until(5_500);
        assert_eq!(page.slot(TOP).unwrap().checks_run(), 2);

        page.run_until(6_999);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loading);
        assert_eq!(slot.retry_count(), 2);

        page.run_until(7_000);
        let slot = page.slot(TOP).unwrap();
        assert_eq!(slot.status(), SlotStatus::Fallback);
        assert_eq!(slot.checks_run(), 3);
        assert!(page.document().text_content(slot.elements().fallback.unwrap()).contains("Mobile ad content loading..."));
        assert!(page.document().is_display_none(slot.elements().loading.unwrap()));
    }

    #[test]
    fn mobile_rotation_restarts_empty_creatives_before_their_last_check() {
        let mut page = page(ScriptedHost::default(), DeviceProfile::Mobile);
        page.load(&silent_creatives(2));

        page.run_until(4_999);
        assert_eq!(page.slot(TOP).unwrap().retry_count(), 1);

        // rotation lands before the 5500 retry check and cancels it
        page.run_until(5_500);
        let slot = page.slot(TOP).unwrap();
        assert_eq!((slot.current_index(), slot.retry_count()), (1, 0));
        assert_eq!(slot.checks_run(), 1);

        page.run_until(30_000);
        let slot = page.slot(TOP).unwrap();
        assert!(!slot.status().is_terminal());
        assert!(slot.retry_count() <= 1);
    }
}
