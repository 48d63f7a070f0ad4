use shared::Intent;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down, matching screen coordinates.
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    ///Returns the normalized vector, or zero for the zero vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2::ZERO
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

/// Axis-aligned region a point is confined to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vector2,
    pub max: Vector2,
}

impl Bounds {
    /// The `width` x `height` rectangle shrunk by `margin` on every side.
    pub fn inset(width: f32, height: f32, margin: f32) -> Self {
        Bounds {
            min: Vector2::new(margin, margin),
            max: Vector2::new(width - margin, height - margin),
        }
    }

    /// Clamps each axis independently. No bounce.
    pub fn clamp(&self, point: Vector2) -> Vector2 {
        Vector2 {
            x: point.x.clamp(self.min.x, self.max.x),
            y: point.y.clamp(self.min.y, self.max.y),
        }
    }

    pub fn contains(&self, point: Vector2) -> bool {
        (self.min.x..=self.max.x).contains(&point.x) && (self.min.y..=self.max.y).contains(&point.y)
    }
}

/// Velocity commanded by an intent: unit direction scaled to `speed`.
///
/// Opposing directions cancel, and diagonal movement is as fast as straight
/// movement.
pub fn intent_velocity(intent: &Intent, speed: f32) -> Vector2 {
    let mut direction = Vector2::ZERO;
    if intent.left {
        direction.x -= 1.0;
    }
    if intent.right {
        direction.x += 1.0;
    }
    if intent.up {
        direction.y -= 1.0;
    }
    if intent.down {
        direction.y += 1.0;
    }
    direction.normalize().scale(speed)
}

/// True when two circles touch or overlap.
pub fn circles_overlap(a: Vector2, radius_a: f32, b: Vector2, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.sub(&b).magnitude_squared() <= reach * reach
}
