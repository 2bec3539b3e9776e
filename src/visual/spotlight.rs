pub const SPOTLIGHT_POOL: usize = 12;

/// A bouncing ball. Position and velocity are in world units; velocity is
/// per 60 Hz frame at speed 50.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spotlight {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub r: f32,
}

impl Spotlight {
    pub fn spawn(width: f32, height: f32, rng: &mut fastrand::Rng) -> Self {
        let angle = rng.f32() * std::f32::consts::TAU;
        let pace = 2.0 + rng.f32() * 3.0;
        Self {
            x: rng.f32() * width,
            y: rng.f32() * height,
            vx: angle.cos() * pace,
            vy: angle.sin() * pace,
            r: 10.0,
        }
    }

    /// Radius for a size control in 0..=100.
    pub fn radius_for(size: f32) -> f32 {
        8.0 + size.clamp(0.0, 100.0) * 0.32
    }

    /// Moves one step and reflects off `[r, extent - r]` on both axes.
    pub fn step(&mut self, width: f32, height: f32, speed: f32, size: f32, fs: f32) {
        self.r = Self::radius_for(size);
        let k = speed.max(0.0) / 50.0 * fs;
        self.x += self.vx * k;
        self.y += self.vy * k;
        (self.x, self.vx) = reflect(self.x, self.vx, self.r, width - self.r);
        (self.y, self.vy) = reflect(self.y, self.vy, self.r, height - self.r);
    }
}

fn reflect(pos: f32, vel: f32, lo: f32, hi: f32) -> (f32, f32) {
    if hi <= lo {
        return ((lo + hi) * 0.5, vel);
    }
    if pos < lo {
        ((2.0 * lo - pos).min(hi), vel.abs())
    } else if pos > hi {
        ((2.0 * hi - pos).max(lo), -vel.abs())
    } else {
        (pos, vel)
    }
}

pub fn spawn_pool(width: f32, height: f32, rng: &mut fastrand::Rng) -> Vec<Spotlight> {
    (0..SPOTLIGHT_POOL)
        .map(|_| Spotlight::spawn(width, height, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_inside_bounds() {
        let mut rng = fastrand::Rng::with_seed(3);
        let mut pool = spawn_pool(400.0, 300.0, &mut rng);
        for frame in 0..2000 {
            let size = (frame % 101) as f32;
            for s in pool.iter_mut() {
                s.step(400.0, 300.0, 100.0, size, 1.0);
                assert!(s.x >= s.r - 1e-3 && s.x <= 400.0 - s.r + 1e-3);
                assert!(s.y >= s.r - 1e-3 && s.y <= 300.0 - s.r + 1e-3);
            }
        }
    }

    #[test]
    fn speed_zero_holds_position() {
        let mut s = Spotlight {
            x: 50.0,
            y: 60.0,
            vx: 3.0,
            vy: -2.0,
            r: 10.0,
        };
        s.step(400.0, 300.0, 0.0, 70.0, 1.0);
        assert_eq!((s.x, s.y), (50.0, 60.0));
        assert_eq!(s.r, Spotlight::radius_for(70.0));
    }
}
