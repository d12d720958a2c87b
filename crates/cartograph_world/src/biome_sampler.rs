//! # Biome Sampler
//!
//! Chunks store biomes on a 4x4x4 grid ("quart" cells). The game blurs the
//! cell boundaries by picking, for each block, the nearest of the eight
//! surrounding cell corners after pushing every corner by a seed-dependent
//! pseudo-random offset of at most ±0.45 cells per axis.
//!
//! The selection below is bit-exact with the game, including the hashing
//! order and the strict `>` tie-break that keeps the earliest corner.
//!
//! ```text
//! corner p in 0..8:   bit 2 -> +1 cell in X
//!                     bit 1 -> +1 cell in Y
//!                     bit 0 -> +1 cell in Z
//! ```

use crate::biome::BiomeId;

const LCG_MULTIPLIER: i64 = 6_364_136_223_846_793_005;
const LCG_INCREMENT: i64 = 1_442_695_040_888_963_407;

/// One step of the multiply-add hash chain.
#[inline]
#[must_use]
pub const fn lcg_next(state: i64, value: i64) -> i64 {
    state
        .wrapping_mul(state.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT))
        .wrapping_add(value)
}

/// Maps a hash state to an offset in `[-0.45, 0.45)`.
#[inline]
#[must_use]
pub fn fiddle(state: i64) -> f64 {
    let bucket = (state >> 24).rem_euclid(1024);
    (bucket as f64 / 1024.0 - 0.5) * 0.9
}

/// Squared distance from the query offset to a perturbed corner.
#[inline]
fn fiddled_distance(seed: i64, cell: (i32, i32, i32), dx: f64, dy: f64, dz: f64) -> f64 {
    let (x, y, z) = (i64::from(cell.0), i64::from(cell.1), i64::from(cell.2));
    let mut state = lcg_next(seed, x);
    state = lcg_next(state, y);
    state = lcg_next(state, z);
    state = lcg_next(state, x);
    state = lcg_next(state, y);
    state = lcg_next(state, z);
    let fx = fiddle(state);
    state = lcg_next(state, seed);
    let fy = fiddle(state);
    state = lcg_next(state, seed);
    let fz = fiddle(state);

    let sq = |v: f64| v * v;
    sq(dz + fz) + sq(dy + fy) + sq(dx + fx)
}

/// Seeded biome zoom.
///
/// `seed` is the world's hashed biome-zoom seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BiomeSampler {
    seed: i64,
}

impl BiomeSampler {
    /// Creates a sampler for a world.
    #[inline]
    #[must_use]
    pub const fn new(seed: i64) -> Self {
        Self { seed }
    }

    /// The zoom seed.
    #[inline]
    #[must_use]
    pub const fn seed(self) -> i64 {
        self.seed
    }

    /// Quart cell whose stored biome is shown at block `(x, y, z)`.
    #[must_use]
    pub fn cell(self, x: i32, y: i32, z: i32) -> (i32, i32, i32) {
        let (i, j, k) = (x.wrapping_sub(2), y.wrapping_sub(2), z.wrapping_sub(2));
        let (cx, cy, cz) = (i >> 2, j >> 2, k >> 2);
        let fx = f64::from(i & 3) / 4.0;
        let fy = f64::from(j & 3) / 4.0;
        let fz = f64::from(k & 3) / 4.0;

        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for p in 0..8 {
            let step_x = p & 4 != 0;
            let step_y = p & 2 != 0;
            let step_z = p & 1 != 0;
            let corner = (
                if step_x { cx + 1 } else { cx },
                if step_y { cy + 1 } else { cy },
                if step_z { cz + 1 } else { cz },
            );
            let distance = fiddled_distance(
                self.seed,
                corner,
                if step_x { fx - 1.0 } else { fx },
                if step_y { fy - 1.0 } else { fy },
                if step_z { fz - 1.0 } else { fz },
            );
            if best_distance > distance {
                best = p;
                best_distance = distance;
            }
        }

        (
            if best & 4 != 0 { cx + 1 } else { cx },
            if best & 2 != 0 { cy + 1 } else { cy },
            if best & 1 != 0 { cz + 1 } else { cz },
        )
    }

    /// Smoothed biome at block `(x, y, z)`.
    ///
    /// `lookup` receives quart-cell coordinates and returns the stored biome
    /// of that cell, loading chunks as needed.
    pub fn sample<F>(self, x: i32, y: i32, z: i32, lookup: F) -> BiomeId
    where
        F: FnOnce(i32, i32, i32) -> BiomeId,
    {
        let (qx, qy, qz) = self.cell(x, y, z);
        lookup(qx, qy, qz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_values() {
        assert_eq!(lcg_next(0, 0), 0);
        assert_eq!(lcg_next(12345, 7), -4_650_592_213_636_512_581);
    }

    #[test]
    fn test_fiddle_bounds() {
        assert!((fiddle(0) + 0.45).abs() < 1e-12);
        assert!(fiddle(1023 << 24) < 0.45);
        assert!(fiddle(-1) >= -0.45 && fiddle(-1) < 0.45);
    }

    #[test]
    fn test_cell_origin() {
        assert_eq!(BiomeSampler::new(0).cell(0, 0, 0), (-1, -1, -1));
    }

    #[test]
    fn test_sample_uses_chosen_cell() {
        let sampler = BiomeSampler::new(12345);
        let biome = sampler.sample(100, 70, -200, |x, y, z| {
            assert_eq!((x, y, z), (25, 17, -50));
            BiomeId(7)
        });
        assert_eq!(biome, BiomeId(7));
    }
}
