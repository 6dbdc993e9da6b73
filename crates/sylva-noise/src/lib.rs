//! Seeded noise for procedural vegetation.
//!
//! Two kinds of noise are provided:
//!
//! - Smooth gradient noise ([`Perlin3D`], [`Simplex2D`]) for perturbing
//!   turtle angles and picking leaf variants from a position in space.
//! - Hashed white noise ([`WhiteNoise`]) for discrete choices that must be
//!   uniformly distributed, such as picking one of several weighted
//!   productions.
//!
//! [`NoiseSource`] bundles all of them behind a single seed, so one plant
//! instance carries one source and every draw it makes is reproducible.
//!
//! ```
//! use sylva_noise::NoiseSource;
//! use glam::Vec3;
//!
//! let noise = NoiseSource::new(858);
//! let a = noise.perlin3(Vec3::new(0.3, 1.2, -0.7));
//! let b = NoiseSource::new(858).perlin3(Vec3::new(0.3, 1.2, -0.7));
//! assert_eq!(a, b);
//! assert!((0.0..=1.0).contains(&a));
//! ```

use glam::Vec3;

// =============================================================================
// Noise Traits
// =============================================================================

/// Trait for 2D noise functions.
pub trait Noise2D {
    /// Sample the noise at position (x, y), in [0, 1].
    fn sample(&self, x: f32, y: f32) -> f32;

    /// Sample the noise, returning value in [-1, 1] range.
    fn sample_signed(&self, x: f32, y: f32) -> f32 {
        self.sample(x, y) * 2.0 - 1.0
    }
}

/// Trait for 3D noise functions.
pub trait Noise3D {
    /// Sample the noise at position (x, y, z), in [0, 1].
    fn sample(&self, x: f32, y: f32, z: f32) -> f32;

    /// Sample the noise at position p.
    fn sample_vec(&self, p: Vec3) -> f32 {
        self.sample(p.x, p.y, p.z)
    }

    /// Sample the noise, returning value in [-1, 1] range.
    fn sample_signed(&self, x: f32, y: f32, z: f32) -> f32 {
        self.sample(x, y, z) * 2.0 - 1.0
    }
}

// =============================================================================
// Internal: Permutation table and helpers
// =============================================================================

/// Classic permutation from Ken Perlin's reference implementation.
const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

#[inline]
fn perm(x: i32, seed: i32) -> u8 {
    PERM[(x.wrapping_add(seed) & 255) as usize]
}

#[inline]
fn grad2(hash: u8, x: f32, y: f32) -> f32 {
    let h = hash & 7;
    let u = if h < 4 { x } else { y };
    let v = if h < 4 { y } else { x };
    (if h & 1 != 0 { -u } else { u }) + (if h & 2 != 0 { -2.0 * v } else { 2.0 * v })
}

#[inline]
fn grad3(hash: u8, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 != 0 { -u } else { u }) + (if h & 2 != 0 { -v } else { v })
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// SplitMix64 finalizer. Full avalanche on 64 bits.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

// Simplex noise helpers
const F2: f32 = 0.5 * (1.732_050_8 - 1.0); // (sqrt(3) - 1) / 2
const G2: f32 = (3.0 - 1.732_050_8) / 6.0; // (3 - sqrt(3)) / 6

// =============================================================================
// Perlin Noise
// =============================================================================

/// 3D Perlin (gradient) noise.
///
/// Returns values in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Perlin3D {
    /// Offset into the permutation table.
    pub seed: i32,
}

impl Perlin3D {
    /// Creates Perlin noise with the given seed.
    pub fn with_seed(seed: i32) -> Self {
        Self { seed }
    }
}

impl Noise3D for Perlin3D {
    fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let (xi, yi, zi) = (x.floor() as i32, y.floor() as i32, z.floor() as i32);
        let (xf, yf, zf) = (x - x.floor(), y - y.floor(), z - z.floor());
        let (u, v, w) = (fade(xf), fade(yf), fade(zf));

        let s = self.seed;
        let corner = |dx: i32, dy: i32, dz: i32| -> u8 {
            perm(perm(perm(xi + dx, s) as i32 + yi + dy, s) as i32 + zi + dz, s)
        };

        let near = lerp(
            lerp(
                grad3(corner(0, 0, 0), xf, yf, zf),
                grad3(corner(1, 0, 0), xf - 1.0, yf, zf),
                u,
            ),
            lerp(
                grad3(corner(0, 1, 0), xf, yf - 1.0, zf),
                grad3(corner(1, 1, 0), xf - 1.0, yf - 1.0, zf),
                u,
            ),
            v,
        );
        let far = lerp(
            lerp(
                grad3(corner(0, 0, 1), xf, yf, zf - 1.0),
                grad3(corner(1, 0, 1), xf - 1.0, yf, zf - 1.0),
                u,
            ),
            lerp(
                grad3(corner(0, 1, 1), xf, yf - 1.0, zf - 1.0),
                grad3(corner(1, 1, 1), xf - 1.0, yf - 1.0, zf - 1.0),
                u,
            ),
            v,
        );

        (lerp(near, far, w) * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

// =============================================================================
// Simplex Noise
// =============================================================================

/// 2D Simplex noise.
///
/// Returns values in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Simplex2D {
    /// Offset into the permutation table.
    pub seed: i32,
}

impl Simplex2D {
    /// Creates Simplex noise with the given seed.
    pub fn with_seed(seed: i32) -> Self {
        Self { seed }
    }
}

impl Noise2D for Simplex2D {
    fn sample(&self, x: f32, y: f32) -> f32 {
        let s = (x + y) * F2;
        let i = (x + s).floor() as i32;
        let j = (y + s).floor() as i32;

        let t = (i + j) as f32 * G2;
        let x0 = x - (i as f32 - t);
        let y0 = y - (j as f32 - t);

        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let corners = [
            (x0, y0, perm(perm(i, self.seed) as i32 + j, self.seed)),
            (
                x0 - i1 as f32 + G2,
                y0 - j1 as f32 + G2,
                perm(perm(i + i1, self.seed) as i32 + j + j1, self.seed),
            ),
            (
                x0 - 1.0 + 2.0 * G2,
                y0 - 1.0 + 2.0 * G2,
                perm(perm(i + 1, self.seed) as i32 + j + 1, self.seed),
            ),
        ];

        let total: f32 = corners
            .iter()
            .map(|&(cx, cy, hash)| {
                let t = 0.5 - cx * cx - cy * cy;
                if t < 0.0 {
                    0.0
                } else {
                    let t2 = t * t;
                    t2 * t2 * grad2(hash, cx, cy)
                }
            })
            .sum();

        ((70.0 * total) * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

// =============================================================================
// White Noise
// =============================================================================

/// Hashed white noise over a 3D integer lattice.
///
/// Unlike gradient noise, neighbouring lattice points are uncorrelated and
/// values are uniformly distributed in [0, 1). Suitable wherever noise
/// stands in for a random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhiteNoise {
    /// Seed mixed into every lattice hash.
    pub seed: u64,
}

impl WhiteNoise {
    /// Creates white noise with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Raw 64-bit hash of a lattice point.
    pub fn hash(&self, a: u64, b: u64, c: u64) -> u64 {
        let mut h = mix64(self.seed ^ GOLDEN_GAMMA);
        h = mix64(h ^ a);
        h = mix64(h.wrapping_add(b).wrapping_mul(GOLDEN_GAMMA));
        mix64(h ^ c.rotate_left(32))
    }

    /// Uniform value in [0, 1) at a lattice point.
    pub fn sample(&self, a: u64, b: u64, c: u64) -> f32 {
        // Top 24 bits fit an f32 mantissa exactly, so the result is < 1.0.
        (self.hash(a, b, c) >> 40) as f32 / (1u64 << 24) as f32
    }
}

// =============================================================================
// NoiseSource
// =============================================================================

/// Every noise function a plant instance draws from, seeded once.
///
/// Gradient noise lattices are offset from the seed; the white noise hash
/// uses the full 64-bit seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoiseSource {
    seed: u64,
    perlin: Perlin3D,
    simplex: Simplex2D,
    white: WhiteNoise,
}

impl NoiseSource {
    /// Creates a noise source from a seed.
    pub fn new(seed: u64) -> Self {
        let folded = mix64(seed);
        Self {
            seed,
            perlin: Perlin3D::with_seed(folded as i32),
            simplex: Simplex2D::with_seed((folded >> 32) as i32),
            white: WhiteNoise::with_seed(seed),
        }
    }

    /// The seed this source was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Perlin noise at a point, in [0, 1].
    pub fn perlin3(&self, p: Vec3) -> f32 {
        self.perlin.sample_vec(p)
    }

    /// Perlin noise at a point, in [-1, 1].
    pub fn perlin3_signed(&self, p: Vec3) -> f32 {
        self.perlin.sample_signed(p.x, p.y, p.z)
    }

    /// Simplex noise at a 2D point, in [0, 1].
    pub fn simplex2(&self, x: f32, y: f32) -> f32 {
        self.simplex.sample(x, y)
    }

    /// One uniform draw in [0, 1) for a production selection event.
    ///
    /// Keyed by the rewrite pass, the position of the symbol in the string
    /// being rewritten, and the symbol itself, so the same derivation always
    /// sees the same draws.
    pub fn selection_sample(&self, pass: u32, position: usize, symbol: char) -> f32 {
        self.white
            .sample(u64::from(pass), position as u64, u64::from(u32::from(symbol)))
    }
}
