use crate::input::AxisSample;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

/// Axis-aligned rectangle in screen pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPx {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectPx {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle of the given size centered on (cx, cy).
    pub fn centered(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &RectPx) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// True when the two rectangles overlap at all.
    pub fn intersects(&self, other: &RectPx) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Diameter of the pointer circle the subject steers.
pub const POINTER_DIAMETER: f32 = 24.0;
/// Pointer speed in pixels per tick at full stick deflection.
pub const POINTER_GAIN: f32 = 10.0;
/// Target speed in pixels per tick along each axis.
pub const TARGET_SPEED: f32 = 5.0;

/// The subject-controlled cursor. Position is its bounding rectangle;
/// it never leaves the screen rectangle.
#[derive(Debug, Clone)]
pub struct Pointer {
    pub rect: RectPx,
}

impl Pointer {
    pub fn new() -> Self {
        Self {
            rect: RectPx::new(0.0, 0.0, POINTER_DIAMETER, POINTER_DIAMETER),
        }
    }

    /// Places the pointer so that it is centered on (cx, cy).
    pub fn reset_center(&mut self, cx: f32, cy: f32) {
        self.rect = RectPx::centered(cx, cy, POINTER_DIAMETER, POINTER_DIAMETER);
    }

    /// Places the pointer's top-left corner at (x, y).
    pub fn reset(&mut self, x: f32, y: f32) {
        self.rect.x = x;
        self.rect.y = y;
    }

    /// Applies one analog input sample, keeping the pointer on screen.
    pub fn apply(&mut self, sample: AxisSample, screen: RectPx) {
        self.rect.x += sample.x * POINTER_GAIN;
        self.rect.y += sample.y * POINTER_GAIN;
        self.clamp(screen);
    }

    fn clamp(&mut self, screen: RectPx) {
        let max_x = screen.w - (self.rect.w + 1.0);
        let max_y = screen.h - (self.rect.h + 1.0);
        self.rect.x = self.rect.x.clamp(0.0, max_x);
        self.rect.y = self.rect.y.clamp(0.0, max_y);
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::new()
    }
}

/// The moving circle the subject chases or pursues. Bounces off every
/// screen edge by inverting the corresponding velocity component.
#[derive(Debug, Clone)]
pub struct Target {
    pub rect: RectPx,
    pub vel_x: f32,
    pub vel_y: f32,
    pub diameter: f32,
    /// Pursuit flips this while the pointer is held inside the target.
    pub engaged: bool,
}

impl Target {
    /// Spawns a target of the given diameter at a random on-screen position
    /// with a random diagonal velocity.
    pub fn spawn(rng: &mut StdRng, screen: RectPx, diameter: f32) -> Self {
        let x = rng.random_range(0.0..=(screen.w - diameter).max(0.0));
        let y = rng.random_range(0.0..=(screen.h - diameter).max(0.0));
        let signs = [-TARGET_SPEED, TARGET_SPEED];
        Self {
            rect: RectPx::new(x, y, diameter, diameter),
            vel_x: *signs.choose(rng).unwrap_or(&TARGET_SPEED),
            vel_y: *signs.choose(rng).unwrap_or(&TARGET_SPEED),
            diameter,
            engaged: false,
        }
    }

    /// Moves one step and bounces off screen edges.
    pub fn advance(&mut self, screen: RectPx) {
        self.rect.x += self.vel_x;
        self.rect.y += self.vel_y;

        let max_x = screen.w - (self.diameter + 1.0);
        let max_y = screen.h - (self.diameter + 1.0);
        if self.rect.x >= max_x {
            self.rect.x = max_x;
            self.vel_x = -self.vel_x;
        }
        if self.rect.x < 0.0 {
            self.rect.x = 0.0;
            self.vel_x = -self.vel_x;
        }
        if self.rect.y >= max_y {
            self.rect.y = max_y;
            self.vel_y = -self.vel_y;
        }
        if self.rect.y < 0.0 {
            self.rect.y = 0.0;
            self.vel_y = -self.vel_y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn screen() -> RectPx {
        RectPx::new(0.0, 0.0, 1920.0, 1080.0)
    }

    #[test]
    fn contains_and_intersects() {
        let outer = RectPx::new(0.0, 0.0, 100.0, 100.0);
        let inner = RectPx::new(10.0, 10.0, 20.0, 20.0);
        let overlapping = RectPx::new(90.0, 90.0, 30.0, 30.0);
        let apart = RectPx::new(200.0, 200.0, 5.0, 5.0);

        assert!(outer.contains_rect(&inner));
        assert!(!outer.contains_rect(&overlapping));
        assert!(outer.intersects(&overlapping));
        assert!(!outer.intersects(&apart));
    }

    #[test]
    fn pointer_stays_on_screen() {
        let mut pointer = Pointer::new();
        pointer.reset_center(10.0, 10.0);
        for _ in 0..100 {
            pointer.apply(AxisSample { x: -1.0, y: -1.0 }, screen());
        }
        assert_eq!(pointer.rect.x, 0.0);
        assert_eq!(pointer.rect.y, 0.0);

        for _ in 0..1000 {
            pointer.apply(AxisSample { x: 1.0, y: 1.0 }, screen());
        }
        assert!(pointer.rect.right() < screen().w);
        assert!(pointer.rect.bottom() < screen().h);
    }

    #[test]
    fn target_bounces_off_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut target = Target::spawn(&mut rng, screen(), 100.0);
        target.rect.x = 0.0;
        target.rect.y = 0.0;
        target.vel_x = -TARGET_SPEED;
        target.vel_y = -TARGET_SPEED;

        target.advance(screen());
        assert_eq!(target.rect.x, 0.0);
        assert!(target.vel_x > 0.0);
        assert!(target.vel_y > 0.0);

        for _ in 0..10_000 {
            target.advance(screen());
            assert!(target.rect.x >= 0.0 && target.rect.right() < screen().w + 1.0);
            assert!(target.rect.y >= 0.0 && target.rect.bottom() < screen().h + 1.0);
        }
    }

    #[test]
    fn spawn_is_on_screen() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let target = Target::spawn(&mut rng, screen(), 300.0);
            assert!(target.rect.x >= 0.0);
            assert!(target.rect.y >= 0.0);
            assert!(target.rect.right() <= screen().w);
            assert!(target.rect.bottom() <= screen().h);
        }
    }
}
