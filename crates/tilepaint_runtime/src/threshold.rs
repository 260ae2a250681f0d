//! Process-wide corner-matching tolerance for bounds comparison

use std::sync::atomic::{AtomicU32, Ordering};

/// Bit pattern of `0.01_f32`
const DEFAULT_THRESHOLD_BITS: u32 = 0x3C23_D70A;

static ERROR_THRESHOLD: AtomicU32 = AtomicU32::new(DEFAULT_THRESHOLD_BITS);

/// Absolute tolerance used when testing bounds corners for coincidence
pub fn error_threshold() -> f32 {
    f32::from_bits(ERROR_THRESHOLD.load(Ordering::Relaxed))
}

pub fn set_error_threshold(threshold: f32) {
    ERROR_THRESHOLD.store(threshold.to_bits(), Ordering::Relaxed);
}

/// Overrides the error threshold until dropped, then restores the previous value
#[derive(Debug)]
#[must_use = "the threshold is restored as soon as the scope is dropped"]
pub struct ThresholdScope {
    previous: u32,
}

impl ThresholdScope {
    pub fn new(threshold: f32) -> Self {
        let previous = ERROR_THRESHOLD.swap(threshold.to_bits(), Ordering::Relaxed);
        Self { previous }
    }
}

impl Drop for ThresholdScope {
    fn drop(&mut self) {
        ERROR_THRESHOLD.store(self.previous, Ordering::Relaxed);
    }
}

/// Serialises tests that touch the process-wide threshold
#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_restores_threshold() {
        let _lock = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        assert_eq!(DEFAULT_THRESHOLD_BITS, 0.01_f32.to_bits());
        let before = error_threshold();
        {
            let _scope = ThresholdScope::new(0.25);
            assert_eq!(error_threshold(), 0.25);
            {
                let _inner = ThresholdScope::new(0.5);
                assert_eq!(error_threshold(), 0.5);
            }
            assert_eq!(error_threshold(), 0.25);
        }
        assert_eq!(error_threshold(), before);
    }
}
