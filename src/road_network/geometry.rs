// geometry.rs
//
// Planar helpers shared by the planner, the controllers and perception.
// Road coordinates are (x, z) from the asset, stored as DVec2 (x, y). The
// mapping mirrors handedness: +y lies to the right of +x, and the left of a
// direction `d` is `(d.y, -d.x)`.

use glam::DVec2;

/// Signed angle between `direction` and `vector`, computed as
/// `atan2(direction.y * v.x - direction.x * v.y, direction · v)`.
pub fn signed_angle(direction: DVec2, vector: DVec2) -> f64 {
    (direction.y * vector.x - direction.x * vector.y).atan2(direction.dot(vector))
}

/// True if `vector` lies strictly inside the cone of half-width `max_angle`
/// around `direction`.
pub fn in_direction(direction: DVec2, vector: DVec2, max_angle: f64) -> bool {
    let angle = signed_angle(direction, vector);
    angle < max_angle && angle > -max_angle
}

/// Signed perpendicular distance from `point` to the infinite line through
/// `p1` and `p2`. Returns `None` when the two points coincide.
pub fn cross_track_distance(p1: DVec2, p2: DVec2, point: DVec2) -> Option<f64> {
    let d = p2 - p1;
    let length = d.length();
    if length <= f64::EPSILON {
        return None;
    }
    Some((d.x * (p1.y - point.y) - (p1.x - point.x) * d.y) / length)
}
