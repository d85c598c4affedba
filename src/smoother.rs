/// Exponential moving average for cursor motion.
///
/// Each step moves `1 / factor` of the way from the previous location to the
/// raw target. A fresh smoother starts at the origin, so the first step jumps
/// from `(0, 0)`.
#[derive(Debug, Clone)]
pub struct PointerSmoother {
    factor: f32,
    previous: (f32, f32),
}

impl PointerSmoother {
    pub const DEFAULT_FACTOR: f32 = 7.0;

    /// Factors below 1 would overshoot the target; they are raised to 1 (no smoothing).
    pub fn new(factor: f32) -> Self {
        Self {
            factor: if factor.is_finite() { factor.max(1.0) } else { Self::DEFAULT_FACTOR },
            previous: (0.0, 0.0),
        }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn position(&self) -> (f32, f32) {
        self.previous
    }

    pub fn reset(&mut self) {
        self.previous = (0.0, 0.0);
    }

    pub fn step(&mut self, target: (f32, f32)) -> (f32, f32) {
        let (px, py) = self.previous;
        let current = (
            px + (target.0 - px) / self.factor,
            py + (target.1 - py) / self.factor,
        );
        self.previous = current;
        current
    }
}

impl Default for PointerSmoother {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FACTOR)
    }
}
