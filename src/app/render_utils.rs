use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

use super::highlight::EdgeEmphasis;

pub(super) const NODE_RADIUS: f32 = 10.0;
pub(super) const ENTER_RADIUS: f32 = 1.0;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;

    let mut x = origin.x.rem_euclid(step);
    while x < rect.right() {
        painter.line_segment(
            [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        x += step;
    }

    let mut y = origin.y.rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70)),
        );
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// A curve lies inside the convex hull of its control points, so their bounding box is
/// a safe cull test.
pub(super) fn curve_visible(rect: Rect, points: &[Pos2], padding: f32) -> bool {
    let Some(first) = points.first() else {
        return false;
    };
    let mut bounds = Rect::from_min_max(*first, *first);
    for point in &points[1..] {
        bounds.extend_with(*point);
    }
    rect.intersects(bounds.expand(padding))
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn ease_cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - (u * u * u) / 2.0
    }
}

/// Radius of an entering node: grows from [`ENTER_RADIUS`] to [`NODE_RADIUS`].
pub(super) fn entering_radius(progress: f32) -> f32 {
    ENTER_RADIUS + (NODE_RADIUS - ENTER_RADIUS) * ease_cubic_in_out(progress)
}

/// Radius of an exiting node: shrinks from [`NODE_RADIUS`] to nothing.
pub(super) fn exiting_radius(scale: f32) -> f32 {
    NODE_RADIUS * ease_cubic_in_out(scale)
}

pub(super) fn edge_color(emphasis: EdgeEmphasis) -> Color32 {
    match emphasis {
        EdgeEmphasis::Outgoing => Color32::from_rgba_unmultiplied(255, 0, 0, 128),
        EdgeEmphasis::Incoming => Color32::from_rgba_unmultiplied(0, 255, 0, 128),
        EdgeEmphasis::Context => Color32::from_rgba_unmultiplied(200, 205, 215, 40),
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn test_screen_and_world_round_trip_through_pan_and_zoom() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(200.0, 100.0));
        let pan = vec2(15.0, -5.0);
        let world = vec2(3.0, 4.0);
        let screen = world_to_screen(rect, pan, 2.5, world);
        assert!((screen_to_world(rect, pan, 2.5, screen) - world).length() < 1e-4);
    }

    #[test]
    fn test_node_transitions_hit_their_end_radii() {
        assert_eq!(entering_radius(0.0), ENTER_RADIUS);
        assert_eq!(entering_radius(1.0), NODE_RADIUS);
        assert_eq!(exiting_radius(1.0), NODE_RADIUS);
        assert_eq!(exiting_radius(0.0), 0.0);
        assert!((ease_cubic_in_out(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_curve_culling_uses_control_points() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        let arc = [pos2(-50.0, -10.0), pos2(50.0, 50.0), pos2(150.0, -10.0)];
        assert!(curve_visible(rect, &arc, 0.0));

        let outside = [pos2(-50.0, -10.0), pos2(50.0, -40.0), pos2(150.0, -10.0)];
        assert!(!curve_visible(rect, &outside, 2.0));
        assert!(!curve_visible(rect, &[], 2.0));
    }
}
