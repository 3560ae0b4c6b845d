mod forces;
mod quadtree;

use eframe::egui::Vec2;

use forces::{CollisionParams, accumulate_collisions, accumulate_repulsion};
use quadtree::QuadNode;

use super::{PhysicsConfig, RenderGraph};

const BARNES_HUT_THETA: f32 = 0.72;

/// Advance the layout simulation one frame. Mutates node positions and
/// velocities in place; this module is the only writer of that state apart
/// from an active drag, which shows up here as a pinned node. Pinned nodes
/// still exert forces on their neighbors but are never moved themselves.
///
/// Returns whether anything is still moving, so the caller knows to keep
/// requesting repaints.
pub(super) fn step_physics(cache: &mut RenderGraph, config: PhysicsConfig) -> bool {
    let node_count = cache.nodes.len();
    if node_count < 2 {
        return false;
    }

    let scratch = &mut cache.physics_scratch;
    scratch.forces.resize(node_count, Vec2::ZERO);
    scratch.forces.fill(Vec2::ZERO);
    scratch.positions.clear();
    scratch.radii.clear();
    let mut max_radius = 0.0_f32;
    let mut any_pinned = false;
    for node in &cache.nodes {
        scratch.positions.push(node.world_pos);
        scratch.radii.push(node.radius);
        max_radius = max_radius.max(node.radius);
        any_pinned |= node.pinned.is_some();
    }

    let forces = &mut scratch.forces;
    let positions = &scratch.positions;
    let radii = &scratch.radii;

    let intensity = config.intensity.clamp(0.2, 2.5);
    let repulsion_strength = 52_000.0 * intensity * config.repulsion_scale.clamp(0.25, 2.6);
    let spring_strength = 0.020 * intensity * config.spring_scale.clamp(0.2, 2.2);
    let spring_damping = 0.22;
    let collision_strength = 1.6 * intensity * config.collision_scale.clamp(0.2, 2.0);
    let center_pull = 0.0014 * intensity;
    let damping = (config.velocity_damping - (intensity * 0.015)).clamp(0.78, 0.97);
    let softening = 620.0;
    let time_step_scale = (config.delta_seconds * 60.0).clamp(0.25, 3.0);
    let damping_factor = damping.powf(time_step_scale);

    if let Some(quadtree) = QuadNode::build(positions) {
        for (index, force) in forces.iter_mut().enumerate() {
            accumulate_repulsion(
                &quadtree,
                index,
                positions,
                repulsion_strength,
                softening,
                BARNES_HUT_THETA,
                force,
            );
        }

        let max_collision_distance = (max_radius * 2.0) * 3.0;
        if max_collision_distance > 0.0 {
            accumulate_collisions(
                &quadtree,
                &quadtree,
                true,
                positions,
                radii,
                CollisionParams {
                    strength: collision_strength,
                    max_distance_sq: max_collision_distance * max_collision_distance,
                    margin: 2.1,
                },
                forces,
            );
        }
    }

    // Springs along reply edges; rest length grows with the endpoint radii
    // so chains cluster without collapsing onto a point.
    for &(from, to) in &cache.edges {
        if from >= node_count || to >= node_count || from == to {
            continue;
        }

        let delta = cache.nodes[from].world_pos - cache.nodes[to].world_pos;
        let distance_sq = delta.length_sq();
        if distance_sq <= 0.0001 * 0.0001 {
            continue;
        }
        let distance = distance_sq.sqrt();
        let direction = delta / distance;

        let rest_length = 72.0 + (cache.nodes[from].radius + cache.nodes[to].radius) * 3.2;
        let spring = (distance - rest_length) * spring_strength;
        let relative_velocity = cache.nodes[from].velocity - cache.nodes[to].velocity;
        let damping_force = relative_velocity.dot(direction) * spring_damping;
        let correction = direction * (spring + damping_force);

        forces[from] -= correction;
        forces[to] += correction;
    }

    for (index, force) in forces.iter_mut().enumerate().take(node_count) {
        *force -= cache.nodes[index].world_pos * center_pull;
    }

    let max_force = 165.0 + (intensity * 90.0);
    let max_force_sq = max_force * max_force;
    let max_speed = 11.0 + (intensity * 15.0);
    let max_speed_sq = max_speed * max_speed;
    let min_sleep_speed_sq = 0.02 * 0.02;
    let min_sleep_force_sq = 0.08 * 0.08;
    let mut any_motion = false;
    let mut average_velocity = Vec2::ZERO;
    for (index, force_value) in forces.iter().enumerate().take(node_count) {
        let node = &mut cache.nodes[index];
        if let Some(pin) = node.pinned {
            node.world_pos = pin;
            node.velocity = Vec2::ZERO;
            any_motion = true;
            continue;
        }

        let mut force = *force_value;
        let force_sq = force.length_sq();
        if force_sq > max_force_sq {
            force *= max_force / force_sq.sqrt();
        }

        let mut velocity = (node.velocity + (force * (0.055 * time_step_scale))) * damping_factor;
        let mut speed_sq = velocity.length_sq();
        if speed_sq > max_speed_sq {
            velocity *= max_speed / speed_sq.sqrt();
            speed_sq = max_speed_sq;
        }

        if speed_sq < min_sleep_speed_sq && force_sq < min_sleep_force_sq {
            velocity = Vec2::ZERO;
            speed_sq = 0.0;
        }

        node.velocity = velocity;
        average_velocity += velocity;
        node.world_pos += velocity * time_step_scale;
        if speed_sq > 0.000_001 {
            any_motion = true;
        }
    }

    // Drift correction fights an active drag, so skip it while pinned.
    if !any_pinned {
        average_velocity /= node_count as f32;
        if average_velocity.length_sq() > 0.000_001 {
            for node in &mut cache.nodes {
                node.velocity -= average_velocity;
            }
        }

        let mut centroid = Vec2::ZERO;
        for node in &cache.nodes {
            centroid += node.world_pos;
        }
        centroid /= node_count as f32;
        if centroid.length_sq() > 0.000_001 {
            for node in &mut cache.nodes {
                node.world_pos -= centroid;
            }
        }
    }

    any_motion
}
