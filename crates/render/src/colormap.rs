//! HF-radio color palette
//!
//! Seven linear bands run from blue-black through blue, cyan, green,
//! yellow and orange to bright red. The low bands are wide so weak signals
//! stay distinguishable from the noise floor.

/// Band boundaries and the color at each boundary
pub const STOPS: [(f32, [u8; 3]); 8] = [
    (0.00, [0, 0, 16]),
    (0.10, [0, 0, 96]),
    (0.30, [0, 96, 255]),
    (0.50, [0, 224, 224]),
    (0.70, [64, 255, 0]),
    (0.85, [255, 255, 0]),
    (0.95, [255, 128, 0]),
    (1.00, [255, 0, 0]),
];

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8
}

/// Color for a normalized value; inputs outside [0, 1] are clamped
pub fn color_for(value: f32) -> [u8; 3] {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };

    for pair in STOPS.windows(2) {
        let (lo, c0) = pair[0];
        let (hi, c1) = pair[1];
        if v <= hi {
            let t = (v - lo) / (hi - lo);
            return [lerp(c0[0], c1[0], t), lerp(c0[1], c1[1], t), lerp(c0[2], c1[2], t)];
        }
    }
    STOPS[STOPS.len() - 1].1
}
