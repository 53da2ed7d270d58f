use crate::handles::OpenBatch;
use tracing::debug;

/// Whole degrees from a millidegree reading. Truncates toward zero.
pub fn millidegrees_to_degrees(raw: i64) -> i64 {
    raw / 1000
}

/// Reads every handle in the batch once, in order. Unreadable sensors are
/// dropped from the result.
pub fn read_temps(batch: &mut OpenBatch) -> Vec<String> {
    batch
        .handles
        .iter_mut()
        .filter_map(|handle| match handle.read_i64() {
            Ok(raw) => Some(millidegrees_to_degrees(raw).to_string()),
            Err(err) => {
                debug!(error = %err, "skipping temperature sensor");
                None
            }
        })
        .collect()
}
