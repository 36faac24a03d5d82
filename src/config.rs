/// Physics timing (one simulation tick per fixed step)
pub const PHYSICS_HZ: f64 = 60.0;

/// Body radii, in capture pixels
pub const VISUAL_RADIUS: f32 = 17.0;
pub const COLLISION_RADIUS: f32 = 12.0;
pub const CORE_RADIUS: f32 = 4.0;

/// Initial horizontal speed range on spawn (pixels per tick). Sign is set to point inward.
pub const SPAWN_VEL_X_MIN: f32 = 1.0;
pub const SPAWN_VEL_X_MAX: f32 = 5.0;

/// Initial upward speed range on spawn. Ignored when spawning in the top third.
pub const SPAWN_VEL_Y_MIN: f32 = 1.0;
pub const SPAWN_VEL_Y_MAX: f32 = 5.0;

/// Lifespan jitter, milliseconds per second of `Params::lifespan`.
pub const LIFESPAN_JITTER_MS: std::ops::Range<f64> = 800.0..1200.0;

/// Mask intensities at or below this count as "blocked" (rejects sensor noise).
pub const BLOCKED_EPSILON: u8 = 2;

/// Spawn target oscillation: desired = sin(t * rate) + 1, t in seconds.
pub const SPAWN_OSCILLATION_RATE: f64 = 0.3;

/// Ticks to wait for the capture backend before assuming it is ready.
pub const READY_WAIT_TICKS: u32 = 100;

/// How often the params file is polled for changes (seconds).
pub const PARAMS_POLL_SECS: f32 = 0.5;

/// Colour palettes the balls burst into. One is active per `color_palette_time` window.
pub const PALETTES: [[&str; 5]; 5] = [
    ["05A8AA", "047476", "F9AF10", "D52941", "990D35"], // vibrant
    ["334E58", "6DB1BF", "FFEAEC", "F39A9D", "FC6471"], // blue & red
    ["F9DBBD", "FFA5AB", "DA627D", "A53860", "6C0E32"], // reddish
    ["2B3A64", "007991", "439A86", "BCD8C1", "E9D985"], // blue & yellow
    ["B8D8BA", "D9DBBC", "FCDDBC", "EF959D", "69585F"], // pastel
];
