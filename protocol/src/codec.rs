// Conversions between absolute step counts and the 0-100 percentage the
// coordinator speaks. Both directions round half-up in integer arithmetic.

/// Highest percentage the protocol carries.
pub const MAX_PERCENT: i32 = 100;

/// Convert a step count into a percentage of `max_steps`.
///
/// Steps beyond `max_steps` saturate at 100. A zero-length travel always
/// reports 0.
pub fn to_percentage(steps: u32, max_steps: u32) -> u8 {
    if max_steps == 0 {
        return 0;
    }
    let steps = u64::from(steps.min(max_steps));
    let max = u64::from(max_steps);
    // round(100 * steps / max) == floor((200 * steps + max) / (2 * max))
    ((200 * steps + max) / (2 * max)) as u8
}

/// Convert a percentage into a step count, clamping `pct` to [0, 100] first.
pub fn from_percentage(pct: i32, max_steps: u32) -> u32 {
    let pct = pct.clamp(0, MAX_PERCENT) as u64;
    ((pct * u64::from(max_steps) + 50) / 100) as u32
}
