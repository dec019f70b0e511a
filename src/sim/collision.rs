//! Collision detection and response for spacecraft and projectiles
//!
//! Spacecraft are treated as spheres. Projectiles and missiles move far
//! enough per tick to tunnel through small craft, so they are tested as swept
//! segments instead of points.

use glam::Vec3;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point (if hit)
    pub point: Vec3,
    /// Surface normal at contact, pointing from the second body toward the first
    pub normal: Vec3,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two spheres
pub fn sphere_sphere_collision(pos_a: Vec3, radius_a: f32, pos_b: Vec3, radius_b: f32) -> CollisionResult {
    let offset = pos_a - pos_b;
    let dist_sq = offset.length_squared();
    let reach = radius_a + radius_b;
    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }
    let dist = dist_sq.sqrt();
    // Coincident centers: pick an arbitrary but stable axis
    let normal = if dist > 1e-6 { offset / dist } else { Vec3::Y };
    CollisionResult {
        hit: true,
        point: pos_b + normal * radius_b,
        normal,
        penetration: reach - dist,
    }
}

/// First intersection of the segment `start → end` with a sphere
///
/// Returns the segment parameter in `0..=1`, or `None` on a miss. A segment
/// starting inside the sphere hits at `0`.
pub fn segment_sphere_intersection(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let d = end - start;
    let m = start - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let a = d.length_squared();
    if a < 1e-12 {
        return None;
    }
    let b = m.dot(d);
    // Moving away from the sphere
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / a;
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Push two equal-mass spheres apart and exchange momentum along the normal
///
/// `normal` points from b toward a. Returns the closing speed along the
/// normal before the response (0 if they were already separating).
pub fn resolve_sphere_contact(
    pos_a: &mut Vec3,
    vel_a: &mut Vec3,
    pos_b: &mut Vec3,
    vel_b: &mut Vec3,
    contact: &CollisionResult,
    restitution: f32,
) -> f32 {
    if !contact.hit {
        return 0.0;
    }
    let half = contact.normal * (contact.penetration * 0.5);
    *pos_a += half;
    *pos_b -= half;

    let closing = (*vel_b - *vel_a).dot(contact.normal);
    if closing <= 0.0 {
        return 0.0;
    }
    let impulse = contact.normal * closing * (1.0 + restitution) * 0.5;
    *vel_a += impulse;
    *vel_b -= impulse;
    closing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_sphere_collision() {
        let hit = sphere_sphere_collision(Vec3::new(15.0, 0.0, 0.0), 10.0, Vec3::ZERO, 10.0);
        assert!(hit.hit);
        assert!((hit.penetration - 5.0).abs() < 1e-5);
        // Normal points from b toward a
        assert!((hit.normal - Vec3::X).length() < 1e-5);

        let miss = sphere_sphere_collision(Vec3::new(25.0, 0.0, 0.0), 10.0, Vec3::ZERO, 10.0);
        assert!(!miss.hit);
    }

    #[test]
    fn test_segment_crosses_sphere() {
        // Projectile sweeping through a small craft in one step
        let t = segment_sphere_intersection(
            Vec3::new(-100.0, 0.0, 0.0),
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::ZERO,
            5.0,
        );
        let t = t.expect("segment should hit");
        assert!((t - 0.475).abs() < 1e-4);
    }

    #[test]
    fn test_segment_misses_sphere() {
        assert!(segment_sphere_intersection(
            Vec3::new(-100.0, 20.0, 0.0),
            Vec3::new(100.0, 20.0, 0.0),
            Vec3::ZERO,
            5.0
        )
        .is_none());
        // Stops short
        assert!(segment_sphere_intersection(
            Vec3::new(-100.0, 0.0, 0.0),
            Vec3::new(-50.0, 0.0, 0.0),
            Vec3::ZERO,
            5.0
        )
        .is_none());
        // Starts inside
        assert_eq!(
            segment_sphere_intersection(Vec3::ZERO, Vec3::X, Vec3::ZERO, 5.0),
            Some(0.0)
        );
    }

    #[test]
    fn test_resolve_contact_separates_and_bounces() {
        let mut pos_a = Vec3::new(15.0, 0.0, 0.0);
        let mut pos_b = Vec3::ZERO;
        let mut vel_a = Vec3::new(-10.0, 0.0, 0.0);
        let mut vel_b = Vec3::new(10.0, 0.0, 0.0);
        let contact = sphere_sphere_collision(pos_a, 10.0, pos_b, 10.0);
        let closing = resolve_sphere_contact(&mut pos_a, &mut vel_a, &mut pos_b, &mut vel_b, &contact, 1.0);
        assert!((closing - 20.0).abs() < 1e-4);
        assert!((pos_a - pos_b).length() >= 20.0 - 1e-4);
        // Perfectly elastic equal masses swap velocities
        assert!((vel_a.x - 10.0).abs() < 1e-4);
        assert!((vel_b.x + 10.0).abs() < 1e-4);
    }
}
