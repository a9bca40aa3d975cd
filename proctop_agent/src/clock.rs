//! Scheduler clock rate used to turn ticks into seconds.

use once_cell::sync::OnceCell;
use tracing::warn;

// USER_HZ on every mainstream Linux build
const FALLBACK_HZ: u64 = 100;

/// Clock ticks per second as reported by the platform, queried once per process.
pub fn clock_ticks_per_second() -> u64 {
    static HZ: OnceCell<u64> = OnceCell::new();
    *HZ.get_or_init(|| {
        // SAFETY: sysconf has no preconditions and only reads a configuration value.
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if hz > 0 {
            hz as u64
        } else {
            warn!("sysconf(_SC_CLK_TCK) failed, assuming {FALLBACK_HZ} Hz");
            FALLBACK_HZ
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_rate_is_positive_and_stable() {
        let a = clock_ticks_per_second();
        assert!(a > 0);
        assert_eq!(a, clock_ticks_per_second());
    }
}
