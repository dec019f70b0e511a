//! Mission environment: the backdrop bodies drifting through the scene
//!
//! Rendering of the environment is external; the mission only keeps body
//! positions advancing and shifts them when the world origin is recentered.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ms_to_secs;

/// A moving background object (dust cloud, debris field, distant station)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentBody {
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Bodies marked relative stay fixed relative to the camera (skyboxes, far nebulae)
    pub camera_relative: bool,
}

impl Default for EnvironmentBody {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            camera_relative: false,
        }
    }
}

/// Inline environment definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentDescriptor {
    pub name: String,
    pub bodies: Vec<EnvironmentBody>,
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub name: String,
    pub bodies: Vec<EnvironmentBody>,
    /// Accumulated simulation time (ms)
    pub time: f64,
}

impl Environment {
    pub fn new(descriptor: EnvironmentDescriptor) -> Self {
        Self {
            name: descriptor.name,
            bodies: descriptor.bodies,
            time: 0.0,
        }
    }

    /// Environment known only by name (content comes from the asset layer)
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn simulate(&mut self, dt: f32) {
        self.time += dt as f64;
        let dt_secs = ms_to_secs(dt);
        for body in &mut self.bodies {
            body.position += body.velocity * dt_secs;
        }
    }

    /// Shift world-anchored bodies (world origin recentering)
    pub fn translate(&mut self, offset: Vec3) {
        for body in self.bodies.iter_mut().filter(|b| !b.camera_relative) {
            body.position += offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_drift_and_translate() {
        let mut environment = Environment::new(EnvironmentDescriptor {
            name: "nebula".into(),
            bodies: vec![
                EnvironmentBody {
                    name: "debris".into(),
                    velocity: Vec3::X * 10.0,
                    ..EnvironmentBody::default()
                },
                EnvironmentBody {
                    name: "sky".into(),
                    camera_relative: true,
                    ..EnvironmentBody::default()
                },
            ],
        });
        environment.simulate(500.0);
        assert_eq!(environment.bodies[0].position, Vec3::new(5.0, 0.0, 0.0));
        environment.translate(Vec3::new(-5.0, 0.0, 0.0));
        assert_eq!(environment.bodies[0].position, Vec3::ZERO);
        assert_eq!(environment.bodies[1].position, Vec3::ZERO);
        assert!((environment.time - 500.0).abs() < 1e-9);
    }
}
