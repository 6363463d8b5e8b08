use eframe::egui::epaint::CubicBezierShape;
use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, vec2};

use crate::util::short_address;

use super::super::physics::EdgeCurve;
use super::super::render_utils::{
    blend_color, circle_visible, curve_visible, draw_background, edge_color, entering_radius,
    exiting_radius, world_to_screen,
};
use super::super::{GraphSource, NodeVisual, ViewModel};

const NODE_COLOR: Color32 = Color32::from_rgb(103, 196, 255);
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const HOVERED_COLOR: Color32 = Color32::from_rgb(255, 164, 101);

fn curve_points(rect: Rect, pan: Vec2, zoom: f32, curve: &EdgeCurve) -> [Pos2; 4] {
    let start = world_to_screen(rect, pan, zoom, curve.start);
    let control = world_to_screen(rect, pan, zoom, curve.control);
    let end = world_to_screen(rect, pan, zoom, curve.end);
    [start, start, control, end]
}

impl ViewModel {
    /// Copies the simulation's geometry onto every live visual. Exiting visuals keep the
    /// geometry they had when they left.
    fn sync_geometry(&mut self) {
        for node in self.simulation.nodes() {
            if let Some(visual) = self.node_binder.get_mut(&node.id) {
                visual.position = node.position;
            }
        }

        for (key, edge) in &self.visible_edges {
            if let Some(curve) = self.simulation.edge_curve(edge)
                && let Some(visual) = self.edge_binder.get_mut(key)
            {
                visual.curve = curve;
            }
        }
    }

    fn draw_edge(&self, painter: &egui::Painter, rect: Rect, curve: &EdgeCurve, color: Color32) {
        let points = curve_points(rect, self.pan, self.zoom, curve);
        if !curve_visible(rect, &points, 2.0) {
            return;
        }

        let width = self.zoom.sqrt().clamp(0.5, 2.5);
        painter.add(CubicBezierShape::from_points_stroke(
            points,
            false,
            Color32::TRANSPARENT,
            Stroke::new(width, color),
        ));
    }

    fn draw_node(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        visual: &NodeVisual,
        radius: f32,
        hovered: bool,
    ) {
        let position = world_to_screen(rect, self.pan, self.zoom, visual.position);
        let radius = radius * self.zoom;
        if radius <= 0.0 || !circle_visible(rect, position, radius) {
            return;
        }

        let color = if hovered {
            HOVERED_COLOR
        } else if visual.selected {
            SELECTED_COLOR
        } else if self.selected.is_some() {
            blend_color(NODE_COLOR, Color32::from_rgb(19, 23, 29), 0.35)
        } else {
            NODE_COLOR
        };
        let stroke_width = if visual.selected { 1.5 } else { 1.0 };

        painter.circle_filled(position, radius, color);
        let outline = Color32::from_rgba_unmultiplied(15, 15, 15, 190);
        painter.circle_stroke(position, radius, Stroke::new(stroke_width, outline));

        if hovered || visual.selected || self.zoom > 1.35 {
            painter.text(
                position + vec2(radius + 5.0, 0.0),
                Align2::LEFT_CENTER,
                visual.label.as_str(),
                FontId::proportional(12.0),
                Color32::from_gray(238),
            );
        }
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.handle_node_drag(ui, rect, &response);

        let physics_moving = self.live_physics && self.simulation.tick();
        self.sync_geometry();

        let now = self.clock;
        self.node_binder.retire(now);
        self.edge_binder.retire(now);

        for (_key, visual, _progress) in self.edge_binder.live(now) {
            self.draw_edge(&painter, rect, &visual.curve, edge_color(visual.emphasis));
        }
        for (exiting, scale) in self.edge_binder.exiting(now) {
            let color = edge_color(exiting.visual.emphasis).gamma_multiply(scale);
            self.draw_edge(&painter, rect, &exiting.visual.curve, color);
        }

        let hovered = ui
            .input(|input| input.pointer.hover_pos())
            .and_then(|pointer| self.node_at(rect, pointer, now));
        if hovered.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        for (exiting, scale) in self.node_binder.exiting(now) {
            let radius = exiting_radius(scale);
            self.draw_node(&painter, rect, &exiting.visual, radius, false);
        }
        for (key, visual, progress) in self.node_binder.live(now) {
            let is_hovered = hovered.as_deref() == Some(key);
            let radius = entering_radius(progress);
            self.draw_node(&painter, rect, visual, radius, is_hovered);
        }

        if self.node_binder.len() == 0 {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                self.empty_graph_text(),
                FontId::proportional(14.0),
                Color32::from_gray(170),
            );
        }

        if let Some(id) = &hovered
            && let Some(node) = self.source.store().get(id)
        {
            let panel_text = format!(
                "{}  |  {}  |  links {}",
                node.display_name,
                short_address(&node.id),
                node.neighbor_ids.len()
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        self.handle_graph_click(&response, hovered);

        let animating = self.node_binder.is_animating(now) || self.edge_binder.is_animating(now);
        if physics_moving || animating || self.dragging.is_some() {
            ui.ctx().request_repaint();
        }
    }

    fn empty_graph_text(&self) -> &'static str {
        match &self.source {
            GraphSource::Crawl(crawler) if crawler.root().is_none() => {
                "Enter a root address to start crawling."
            }
            GraphSource::Crawl(_) => "Waiting for peers...",
            GraphSource::Static(_) => "No peers matched the current selection.",
        }
    }
}
