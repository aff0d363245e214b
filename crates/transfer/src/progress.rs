/// Percentage reported only by the post-finalize completion event.
pub const COMPLETE_PERCENTAGE: u8 = 100;

/// Highest percentage a progress event may report while the server has not
/// yet confirmed the assembled object.
pub const MAX_PROGRESS_PERCENTAGE: u8 = 99;

/// Rounded share of acknowledged chunks, capped at
/// [`MAX_PROGRESS_PERCENTAGE`].
///
/// Rounds half up. Returns 0 when `total` is 0.
pub fn progress_percentage(acknowledged: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let acknowledged = acknowledged.min(total) as u64;
    let total = total as u64;
    let rounded = (acknowledged * 200 + total) / (total * 2);
    (rounded as u8).min(MAX_PROGRESS_PERCENTAGE)
}
