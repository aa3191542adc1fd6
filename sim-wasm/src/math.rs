use glam::{BVec3, Quat, Vec3};

pub const EPSILON: f32 = 1.0e-6;

/// Launch direction for a stationary boid sitting exactly at the box centre.
pub const FALLBACK_HEADING: Vec3 = Vec3::X;

/// Axis the renderer's cone mesh points along at rest.
pub const MODEL_UP: Vec3 = Vec3::Y;

/// Rescales `velocity` so its length lies in `[min_speed, max_speed]`.
///
/// Slowing down preserves the heading. Speeding up preserves the components
/// on the `held` axes and stretches only the rest; when the free axes carry
/// no speed the velocity is returned unchanged. With nothing held this is a
/// plain direction-preserving clamp.
pub fn clamp_speed(velocity: Vec3, held: BVec3, min_speed: f32, max_speed: f32) -> Vec3 {
    let speed_sq = velocity.length_squared();
    if speed_sq > max_speed * max_speed {
        return velocity * (max_speed / speed_sq.sqrt());
    }
    let min_sq = min_speed * min_speed;
    if speed_sq >= min_sq {
        return velocity;
    }

    let fixed = Vec3::select(held, velocity, Vec3::ZERO);
    let free = velocity - fixed;
    let free_sq = free.length_squared();
    if free_sq <= EPSILON * EPSILON {
        return velocity;
    }
    fixed + free * ((min_sq - fixed.length_squared()) / free_sq).sqrt()
}

/// Unit direction from `position` toward the origin, or `FALLBACK_HEADING`
/// at the origin itself.
pub fn homeward_heading(position: Vec3) -> Vec3 {
    (-position).try_normalize().unwrap_or(FALLBACK_HEADING)
}

/// Rotation taking `MODEL_UP` onto the direction of `velocity`.
///
/// Zero velocity gives the identity rotation.
pub fn heading_rotation(velocity: Vec3) -> Quat {
    if velocity.length_squared() <= EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(MODEL_UP, velocity.normalize())
}
