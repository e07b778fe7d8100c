//! Rigid 3D transform shared by planes, objects and wire messages.
//!
//! # Responsibility
//! - Represent position + unit quaternion rotation.
//! - Convert to and from the column-major 4x4 matrices used by scene graphs.
//!
//! # Invariants
//! - Every component is finite.
//! - `rotation` has non-zero norm; constructors normalize it.
//! - `canonical_bits` maps `-0.0` to `0.0` so equal transforms hash equally.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MIN_ROTATION_NORM: f32 = 1e-6;

/// Transform validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// A position, rotation or matrix component is NaN or infinite.
    NonFinite,
    /// Rotation quaternion norm is (close to) zero.
    DegenerateRotation,
}

impl Display for TransformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite => write!(f, "transform contains a non-finite component"),
            Self::DegenerateRotation => write!(f, "transform rotation has zero norm"),
        }
    }
}

impl Error for TransformError {}

/// Position (metres) and rotation quaternion `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    /// Creates a validated transform with a normalized rotation.
    pub fn new(position: [f32; 3], rotation: [f32; 4]) -> Result<Self, TransformError> {
        if !all_finite(&position) || !all_finite(&rotation) {
            return Err(TransformError::NonFinite);
        }
        Ok(Self {
            position,
            rotation: normalize_quat(rotation)?,
        })
    }

    /// Creates an unrotated transform at `position`.
    pub fn from_position(position: [f32; 3]) -> Result<Self, TransformError> {
        Self::new(position, Self::IDENTITY.rotation)
    }

    /// Checks the invariants on a transform that did not go through `new`
    /// (for example one decoded from the wire).
    pub fn validate(&self) -> Result<(), TransformError> {
        if !all_finite(&self.position) || !all_finite(&self.rotation) {
            return Err(TransformError::NonFinite);
        }
        if quat_norm(self.rotation) < MIN_ROTATION_NORM {
            return Err(TransformError::DegenerateRotation);
        }
        Ok(())
    }

    /// Builds a transform from a column-major 4x4 matrix without scale.
    ///
    /// Translation is read from elements 12..15. The upper-left 3x3 block is
    /// treated as a pure rotation.
    pub fn from_matrix(m: &[f32; 16]) -> Result<Self, TransformError> {
        if !all_finite(m) {
            return Err(TransformError::NonFinite);
        }
        // r{row}{col}, column-major storage.
        let (r00, r10, r20) = (m[0], m[1], m[2]);
        let (r01, r11, r21) = (m[4], m[5], m[6]);
        let (r02, r12, r22) = (m[8], m[9], m[10]);

        let trace = r00 + r11 + r22;
        let rotation = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            [(r21 - r12) / s, (r02 - r20) / s, (r10 - r01) / s, 0.25 * s]
        } else if r00 > r11 && r00 > r22 {
            let s = (1.0 + r00 - r11 - r22).sqrt() * 2.0;
            [0.25 * s, (r01 + r10) / s, (r02 + r20) / s, (r21 - r12) / s]
        } else if r11 > r22 {
            let s = (1.0 + r11 - r00 - r22).sqrt() * 2.0;
            [(r01 + r10) / s, 0.25 * s, (r12 + r21) / s, (r02 - r20) / s]
        } else {
            let s = (1.0 + r22 - r00 - r11).sqrt() * 2.0;
            [(r02 + r20) / s, (r12 + r21) / s, 0.25 * s, (r10 - r01) / s]
        };

        Self::new([m[12], m[13], m[14]], rotation)
    }

    /// Returns the column-major 4x4 matrix for this transform.
    pub fn to_matrix(&self) -> [f32; 16] {
        let [x, y, z, w] = self.rotation;
        let [px, py, pz] = self.position;
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + z * w),
            2.0 * (x * z - y * w),
            0.0,
            2.0 * (x * y - z * w),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + x * w),
            0.0,
            2.0 * (x * z + y * w),
            2.0 * (y * z - x * w),
            1.0 - 2.0 * (x * x + y * y),
            0.0,
            px,
            py,
            pz,
            1.0,
        ]
    }

    /// Returns a copy moved to `position`.
    pub fn with_position(&self, position: [f32; 3]) -> Result<Self, TransformError> {
        Self::new(position, self.rotation)
    }

    /// Returns a copy with `rotation` (normalized).
    pub fn with_rotation(&self, rotation: [f32; 4]) -> Result<Self, TransformError> {
        Self::new(self.position, rotation)
    }

    /// Rotates about the world up axis (+Y) by `yaw_radians`.
    pub fn rotated_by_yaw(&self, yaw_radians: f32) -> Result<Self, TransformError> {
        if !yaw_radians.is_finite() {
            return Err(TransformError::NonFinite);
        }
        let half = yaw_radians * 0.5;
        let yaw = [0.0, half.sin(), 0.0, half.cos()];
        Self::new(self.position, quat_mul(yaw, self.rotation))
    }

    /// Bit patterns of the seven components with `-0.0` folded into `0.0`.
    pub(crate) fn canonical_bits(&self) -> [u32; 7] {
        let p = self.position;
        let r = self.rotation;
        [p[0], p[1], p[2], r[0], r[1], r[2], r[3]].map(|value| {
            if value == 0.0 {
                0.0f32.to_bits()
            } else {
                value.to_bits()
            }
        })
    }

    /// Component-wise comparison within `epsilon`.
    pub fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        let position_close = self
            .position
            .iter()
            .zip(other.position.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon);
        // q and -q describe the same rotation.
        let dot: f32 = self
            .rotation
            .iter()
            .zip(other.rotation.iter())
            .map(|(a, b)| a * b)
            .sum();
        position_close && (1.0 - dot.abs()) <= epsilon
    }
}

fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|value| value.is_finite())
}

fn quat_norm(q: [f32; 4]) -> f32 {
    (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt()
}

fn normalize_quat(q: [f32; 4]) -> Result<[f32; 4], TransformError> {
    let norm = quat_norm(q);
    if norm < MIN_ROTATION_NORM {
        return Err(TransformError::DegenerateRotation);
    }
    Ok([q[0] / norm, q[1] / norm, q[2] / norm, q[3] / norm])
}

fn quat_mul(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    let [ax, ay, az, aw] = a;
    let [bx, by, bz, bw] = b;
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}
