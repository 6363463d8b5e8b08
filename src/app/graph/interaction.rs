use eframe::egui::{self, PointerButton, Pos2, Rect, Ui};

use super::super::render_utils::{NODE_RADIUS, screen_to_world, world_to_screen};
use super::super::{GraphSource, ViewModel};

const MIN_HIT_RADIUS: f32 = 4.0;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 12.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Topmost live node under `pointer`. Later nodes are drawn over earlier ones, so
    /// the last hit wins.
    pub(in crate::app) fn node_at(&self, rect: Rect, pointer: Pos2, now: f64) -> Option<String> {
        let radius = (NODE_RADIUS * self.zoom).max(MIN_HIT_RADIUS);
        self.node_binder
            .live(now)
            .filter(|(_, visual, _)| {
                world_to_screen(rect, self.pan, self.zoom, visual.position).distance(pointer)
                    <= radius
            })
            .last()
            .map(|(key, _, _)| key.to_owned())
    }

    /// Primary-button drags on a node drive the pin protocol.
    pub(in crate::app) fn handle_node_drag(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if response.drag_started_by(PointerButton::Primary)
            && let Some(origin) = ui.input(|input| input.pointer.press_origin())
            && let Some(id) = self.node_at(rect, origin, self.clock)
            && self.simulation.pin_start(&id)
        {
            self.dragging = Some(id);
        }

        if let Some(id) = &self.dragging
            && response.dragged_by(PointerButton::Primary)
            && let Some(pointer) = ui.input(|input| input.pointer.interact_pos())
        {
            let world = screen_to_world(rect, self.pan, self.zoom, pointer);
            self.simulation.pin_move(id, world);
        }

        if response.drag_stopped()
            && let Some(id) = self.dragging.take()
        {
            self.simulation.pin_end(&id);
        }
    }

    pub(in crate::app) fn handle_graph_click(
        &mut self,
        response: &egui::Response,
        hovered: Option<String>,
    ) {
        if !response.clicked_by(PointerButton::Primary) {
            return;
        }

        match hovered {
            Some(id) => self.on_node_clicked(&id),
            None => self.on_background_clicked(),
        }
    }

    /// Selects the node; in crawl mode the node also becomes the crawl focus.
    pub(in crate::app) fn on_node_clicked(&mut self, id: &str) {
        self.set_selected(Some(id.to_owned()));
        if let GraphSource::Crawl(crawler) = &mut self.source {
            crawler.focus(id);
        }
    }

    pub(in crate::app) fn on_background_clicked(&mut self) {
        self.set_selected(None);
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<String>) {
        if self.selected == selected {
            return;
        }

        tracing::debug!(selected = ?selected, "selection changed");
        self.selected = selected;
        self.graph_dirty = true;
    }
}
