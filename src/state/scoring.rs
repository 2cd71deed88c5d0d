//! Pure scoring arithmetic for correct answers.

/// Points granted for any correct answer, however slow.
pub const BASE_POINTS: u32 = 100;
/// Extra points per full second left on the round clock.
pub const BONUS_PER_SECOND: u32 = 10;

/// Points for a correct answer submitted at `answered_at_ms`.
///
/// The elapsed time is measured against the round-start anchor and clamped
/// at zero, so a timestamp racing slightly ahead of the anchor still yields
/// the full bonus. An answer arriving after the time limit (but before the
/// forced resolution landed) earns exactly [`BASE_POINTS`].
///
/// Incorrect or missing answers never reach this function; they contribute 0.
pub fn score(answered_at_ms: u64, round_started_at_ms: u64, time_limit_secs: u32) -> u32 {
    let elapsed_secs = answered_at_ms.saturating_sub(round_started_at_ms) as f64 / 1000.0;
    let speed_bonus = (f64::from(time_limit_secs) - elapsed_secs).max(0.0);
    (f64::from(BASE_POINTS) + speed_bonus * f64::from(BONUS_PER_SECOND)).round() as u32
}
