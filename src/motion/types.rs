use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Wraps an angle in radians into (−π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Robot yaw in radians, always wrapped to (−π, π].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Heading(f64);

impl Heading {
    pub fn from_radians(radians: f64) -> Self {
        Heading(wrap_angle(radians))
    }

    /// Yaw of an orientation quaternion (x, y, z, w); roll and pitch are discarded.
    #[cfg_attr(not(feature = "ros"), allow(dead_code))]
    pub fn from_quaternion(q: Quaternion) -> Self {
        let siny_cosp = 2.0 * (q.w * q.z + q.x * q.y);
        let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
        Heading::from_radians(siny_cosp.atan2(cosy_cosp))
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

impl std::fmt::Display for Heading {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:.2}°", self.degrees())
    }
}

#[cfg_attr(not(feature = "ros"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[cfg(test)]
impl Quaternion {
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw / 2.0;
        Quaternion {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }
}

/// Planar velocity command: forward speed (m/s) and yaw rate (rad/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear: f64,
    pub angular: f64,
}

impl VelocityCommand {
    pub const STOP: VelocityCommand = VelocityCommand {
        linear: 0.0,
        angular: 0.0,
    };

    pub fn linear(linear: f64) -> Self {
        VelocityCommand {
            linear,
            angular: 0.0,
        }
    }

    pub fn angular(angular: f64) -> Self {
        VelocityCommand {
            linear: 0.0,
            angular,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.linear == 0.0 && self.angular == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Sign of the yaw rate for this rotation.
    pub fn sign(self) -> f64 {
        match self {
            Rotation::Clockwise => -1.0,
            Rotation::CounterClockwise => 1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Rotation::Clockwise => Rotation::CounterClockwise,
            Rotation::CounterClockwise => Rotation::Clockwise,
        }
    }
}
