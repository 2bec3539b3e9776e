/// Number of cached points; sized for the largest consumer (the discoball).
pub const LAYOUT_POINTS: usize = 1000;

/// Two parallel arrays of random integer world coordinates shared by the
/// point-cloud presets.
pub struct RandomLayoutCache {
    xs: [i32; LAYOUT_POINTS],
    ys: [i32; LAYOUT_POINTS],
    width: i32,
    height: i32,
    generation: u64,
}

impl RandomLayoutCache {
    pub fn new() -> Self {
        Self {
            xs: [0; LAYOUT_POINTS],
            ys: [0; LAYOUT_POINTS],
            width: 1,
            height: 1,
            generation: 0,
        }
    }

    /// Redraws every point uniformly from `[0, width) x [0, height)`.
    pub fn regenerate(&mut self, width: f32, height: f32, rng: &mut fastrand::Rng) {
        self.width = (width.floor() as i32).max(1);
        self.height = (height.floor() as i32).max(1);
        for i in 0..LAYOUT_POINTS {
            self.xs[i] = rng.i32(0..self.width);
            self.ys[i] = rng.i32(0..self.height);
        }
        self.generation += 1;
    }

    pub fn point(&self, i: usize) -> (f32, f32) {
        let i = i % LAYOUT_POINTS;
        (self.xs[i] as f32, self.ys[i] as f32)
    }

    pub fn len(&self) -> usize {
        LAYOUT_POINTS
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Extent the current points were drawn from.
    pub fn extent(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    /// Bumped on every regeneration.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for RandomLayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_stay_inside_extent() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut cache = RandomLayoutCache::new();
        cache.regenerate(320.0, 180.0, &mut rng);
        assert_eq!(cache.generation(), 1);
        for i in 0..cache.len() {
            let (x, y) = cache.point(i);
            assert!((0.0..320.0).contains(&x), "x={x}");
            assert!((0.0..180.0).contains(&y), "y={y}");
        }
    }

    #[test]
    fn degenerate_extent_is_clamped() {
        let mut rng = fastrand::Rng::with_seed(1);
        let mut cache = RandomLayoutCache::new();
        cache.regenerate(0.0, -5.0, &mut rng);
        assert_eq!(cache.extent(), (1.0, 1.0));
        assert_eq!(cache.point(3), (0.0, 0.0));
    }
}
