//! CPU mirror of the value noise evaluated by the backdrop fragment shader.
//!
//! The GLSL in [`crate::compile`] and the functions here implement the same
//! sine hash, trilinear layer, and octave average. GPU `sin` precision varies
//! between drivers, so results only agree visually, not bit for bit.

/// Number of octaves summed by [`perlin`].
pub const OCTAVES: u32 = 8;

/// Spatial frequency applied to the aspect-corrected uv before sampling.
pub const FREQUENCY: f32 = 5.0;

/// Scale applied to seconds to form the third noise axis.
pub const TIME_SCALE: f32 = 0.1;

/// Noise values above this are drawn in the foreground colour.
pub const FOREGROUND_THRESHOLD: f32 = 0.58;

/// Noise values above this (and at most [`FOREGROUND_THRESHOLD`]) get the fringe mix.
pub const FRINGE_THRESHOLD: f32 = 0.53;

/// Blend factor towards the foreground used for the fringe band.
pub const FRINGE_MIX: f32 = 0.25;

const HASH_WEIGHTS: [f32; 3] = [12.9898, 78.233, 144.7272];
const HASH_SCALE: f32 = 43758.5453;

fn fract(value: f32) -> f32 {
    value - value.floor()
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Sine hash of a lattice coordinate, in `[0, 1)`.
pub fn rand3d(co: [f32; 3]) -> f32 {
    let dot = co[0] * HASH_WEIGHTS[0] + co[1] * HASH_WEIGHTS[1] + co[2] * HASH_WEIGHTS[2];
    fract(dot.sin() * HASH_SCALE)
}

/// One octave: trilinear interpolation of the eight corner hashes.
pub fn perlin_layer(co: [f32; 3]) -> f32 {
    let [fx, fy, fz] = co.map(f32::floor);
    let [tx, ty, tz] = co.map(fract);

    let corner = |dx: f32, dy: f32, dz: f32| rand3d([fx + dx, fy + dy, fz + dz]);

    let bot_back = mix(corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), tx);
    let top_back = mix(corner(0.0, 1.0, 0.0), corner(1.0, 1.0, 0.0), tx);
    let bot_front = mix(corner(0.0, 0.0, 1.0), corner(1.0, 0.0, 1.0), tx);
    let top_front = mix(corner(0.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), tx);

    let back = mix(bot_back, top_back, ty);
    let front = mix(bot_front, top_front, ty);

    mix(back, front, tz)
}

/// Unweighted mean of [`OCTAVES`] layers at doubling frequency. Octaves have
/// no amplitude falloff.
pub fn perlin(co: [f32; 3]) -> f32 {
    let mut sum = 0.0;
    for octave in 0..OCTAVES {
        let scale = 2f32.powi(octave as i32);
        sum += perlin_layer(co.map(|axis| axis * scale));
    }
    sum / OCTAVES as f32
}

/// Fraction of the way from background to foreground for a noise value.
pub fn band(value: f32) -> f32 {
    if value > FOREGROUND_THRESHOLD {
        1.0
    } else if value > FRINGE_THRESHOLD {
        FRINGE_MIX
    } else {
        0.0
    }
}

/// Backdrop colour for a noise value.
pub fn backdrop_color(value: f32, background: [f32; 3], foreground: [f32; 3]) -> [f32; 3] {
    let t = band(value);
    [
        mix(background[0], foreground[0], t),
        mix(background[1], foreground[1], t),
        mix(background[2], foreground[2], t),
    ]
}

/// Noise-space coordinate for a fragment, matching the backdrop shader's `main`.
pub fn sample_coordinate(uv: [f32; 2], aspect: f32, seconds: f32) -> [f32; 3] {
    [
        uv[0] * aspect * FREQUENCY,
        uv[1] * FREQUENCY,
        seconds * TIME_SCALE,
    ]
}
