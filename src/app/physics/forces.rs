use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

/// Spring between two particles, already resolved to particle indices.
#[derive(Clone, Copy, Debug)]
pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    /// Share of the correction applied to the target; the source gets the rest.
    pub(super) bias: f32,
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) theta_sq: f32,
    pub(super) distance_min_sq: f32,
    pub(super) alpha: f32,
}

fn jiggle(index: usize) -> f32 {
    (((index as f32) * 0.618_034).fract() - 0.5) * 1e-6
}

pub(super) fn apply_springs(
    springs: &[Spring],
    distance: f32,
    strength: f32,
    alpha: f32,
    positions: &[Vec2],
    velocities: &mut [Vec2],
) {
    for (index, spring) in springs.iter().enumerate() {
        let (source, target) = (spring.source, spring.target);
        let mut delta =
            (positions[target] + velocities[target]) - (positions[source] + velocities[source]);
        if delta.x == 0.0 {
            delta.x = jiggle(index);
        }
        if delta.y == 0.0 {
            delta.y = jiggle(index + 1);
        }

        let length = delta.length();
        let correction = delta * (((length - distance) / length) * alpha * strength);
        velocities[target] -= correction * spring.bias;
        velocities[source] += correction * (1.0 - spring.bias);
    }
}

fn charge_from(delta: Vec2, distance_sq: f32, charge: f32, params: ChargeParams) -> Vec2 {
    let mut distance_sq = distance_sq;
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    delta * (charge * params.alpha / distance_sq)
}

/// Accumulates the many-body velocity change for particle `index`. `delta` points
/// from the particle toward the other mass, so a negative strength pushes away.
pub(super) fn accumulate_charge_for_particle(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let delta = positions[other_index] - point;
            let distance_sq = delta.length_sq();
            if distance_sq <= 0.0 {
                continue;
            }
            *velocity += charge_from(delta, distance_sq, params.strength, params);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq();
    let side = node.bounds.side_length();
    if distance_sq > 0.0 && (side * side) / params.theta_sq < distance_sq {
        *velocity += charge_from(delta, distance_sq, params.strength * node.mass, params);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_particle(child, index, positions, params, velocity);
    }
}

pub(super) fn apply_charge(
    positions: &[Vec2],
    velocities: &mut [Vec2],
    params: ChargeParams,
) {
    let Some(tree) = QuadNode::build(positions) else {
        return;
    };

    for (index, velocity) in velocities.iter_mut().enumerate() {
        accumulate_charge_for_particle(&tree, index, positions, params, velocity);
    }
}

/// Translates every position so the mean lands on `center`.
pub(super) fn apply_centering(positions: &mut [Vec2], center: Vec2) {
    if positions.is_empty() {
        return;
    }

    let mut sum = Vec2::ZERO;
    for position in positions.iter() {
        sum += *position;
    }
    let shift = center - sum / positions.len() as f32;
    if shift.length_sq() <= f32::EPSILON {
        return;
    }
    for position in positions.iter_mut() {
        *position += shift;
    }
}
