use eframe::egui::{self, Key, Response, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::peer::RawStore;
use crate::util::short_address;

use super::super::{GraphSource, ViewModel};

const SEARCH_RESULT_ROWS: usize = 8;
const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
    integer_carry: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Arrow keys held on a focused slider step faster the longer they are held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut usize,
    min: usize,
    max: usize,
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        hold_state.integer_carry = 0.0;
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, hold_state));
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    hold_state.integer_carry += direction as f32 * speed * delta_time;

    let whole_delta = hold_state.integer_carry.trunc() as isize;
    hold_state.integer_carry -= whole_delta as f32;

    let old_value = *value;
    if whole_delta != 0 {
        *value = (*value as isize + whole_delta).clamp(min as isize, max as isize) as usize;
    }

    ui.ctx().request_repaint();
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));
    *value != old_value
}

/// Records whose display name or address fuzzily match `query`, best first.
fn search_matches(store: &RawStore, query: &str, limit: usize) -> Vec<(i64, String)> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut matches = store
        .iter()
        .filter_map(|record| {
            let by_name = matcher.fuzzy_match(&record.display_name, query);
            let by_address = matcher.fuzzy_match(short_address(&record.id), query);
            by_name
                .max(by_address)
                .map(|score| (score, record.id.clone()))
        })
        .collect::<Vec<_>>();

    matches.sort_by(|a, b| b.0.cmp(&a.0));
    matches.truncate(limit);
    matches
}

/// Every loaded peer, in the order its portal arrived.
fn loaded_peer_ids(store: &RawStore) -> Vec<String> {
    store.iter().map(|record| record.id.clone()).collect()
}

impl ViewModel {
    fn draw_crawl_controls(&mut self, ui: &mut Ui) {
        ui.label("Root address")
            .on_hover_text("Peer whose portal document seeds the crawl.");
        let mut submit = false;
        ui.horizontal(|ui| {
            let input = ui.text_edit_singleline(&mut self.root_input);
            submit |= input.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            submit |= ui.button("Crawl").clicked();
        });
        if submit {
            self.submit_root();
        }

        if ui
            .button("Clear crawl")
            .on_hover_text("Forget every loaded peer and stop following links.")
            .clicked()
        {
            self.clear_crawl();
        }

        if let GraphSource::Crawl(crawler) = &self.source {
            if let Some(root) = crawler.root() {
                ui.small(format!("crawling from {root}"));
            }
            ui.label(format!(
                "loaded {}  |  in flight {}  |  queued {}",
                crawler.loaded(),
                crawler.in_flight(),
                crawler.queued()
            ));
        }

        let loaded = loaded_peer_ids(self.source.store());
        ui.add_space(4.0);
        let heading = format!("Loaded peers ({})", loaded.len());
        ui.label(RichText::new(heading).strong());
        if let Some(id) = self.draw_peer_list(ui, "loaded_peers", &loaded) {
            self.on_node_clicked(&id);
        }
    }

    fn draw_search(&mut self, ui: &mut Ui) {
        ui.label("Search peers")
            .on_hover_text("Fuzzy match on names and addresses. Enter selects the best match.");
        let response = ui.text_edit_singleline(&mut self.search);
        let submitted = response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));

        let matches = search_matches(self.source.store(), &self.search, SEARCH_RESULT_ROWS);
        let mut picked = None;
        if submitted {
            picked = matches.first().map(|(_, id)| id.clone());
        }

        for (_score, id) in &matches {
            let label = self
                .source
                .store()
                .get(id)
                .map(|record| record.display_name.as_str())
                .unwrap_or(id.as_str());
            if ui.link(label).on_hover_text(id.as_str()).clicked() {
                picked = Some(id.clone());
            }
        }

        if let Some(id) = picked {
            self.set_selected(Some(id));
        }
    }

    fn draw_cap_controls(&mut self, ui: &mut Ui) {
        let store_len = self.source.store().len().max(2);
        let mut capped = self.max_nodes.is_some();
        let mut changed = ui
            .checkbox(&mut capped, "Limit rendered nodes")
            .on_hover_text("Only the first peers in load order are drawn.")
            .changed();

        let mut cap = self.max_nodes.unwrap_or(store_len).clamp(2, store_len);
        if capped {
            let slider = ui.add(
                egui::Slider::new(&mut cap, 2..=store_len)
                    .text("Max rendered nodes")
                    .clamping(egui::SliderClamping::Always),
            );
            if slider.hovered() {
                slider.request_focus();
            }
            changed |= slider.changed();
            changed |= apply_slider_arrow_acceleration(ui, &slider, &mut cap, 2, store_len);
        }

        if changed {
            self.max_nodes = capped.then_some(cap);
            self.graph_dirty = true;
        }
    }

    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        if matches!(self.source, GraphSource::Crawl(_)) {
            self.draw_crawl_controls(ui);
            ui.separator();
        }

        self.draw_search(ui);
        ui.separator();

        self.draw_cap_controls(ui);
        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Advance the force layout every frame.");
        if ui
            .button("Reheat layout")
            .on_hover_text("Restart the layout at full energy.")
            .clicked()
        {
            self.simulation.restart(self.restart_policy);
        }
        let running = self.simulation.is_running();
        ui.label(format!(
            "{} particles  |  energy {:.3} (target {:.2}){}",
            self.simulation.nodes().len() + self.simulation.midpoint_count(),
            self.simulation.alpha(),
            self.simulation.alpha_target(),
            if running { "" } else { ", resting" }
        ));
    }
}
