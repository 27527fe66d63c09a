//! Capacity growth policy.

use strata_core::SyncError;

/// Growth policy shared by every capacity-managed array.
///
/// Validated at engine construction; all values are immutable after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityConfig {
    /// Elements allocated up front.
    ///
    /// Default: 1024. Must be a multiple of `parallel_batch_width`.
    pub initial_capacity: usize,

    /// Width of one parallel batch on the consumer side. Every grown
    /// capacity is rounded up to a multiple of this.
    ///
    /// Default: 64. Must be at least 1.
    pub parallel_batch_width: usize,

    /// Largest single growth step in elements.
    ///
    /// A resize to hold `required` elements allocates
    /// `required + min(required, growth_step_cap)`, so small arrays double
    /// while large ones grow linearly. Default: 65_536. Must be a multiple
    /// of `parallel_batch_width`.
    pub growth_step_cap: usize,

    /// Absolute element ceiling. Growth past it is reported as
    /// [`SyncError::CapacityExceeded`]. Must be a multiple of
    /// `parallel_batch_width` so growth clamped to it stays aligned.
    ///
    /// Default and maximum: [`CapacityConfig::ABSOLUTE_CEILING`].
    pub ceiling: usize,
}

impl CapacityConfig {
    /// Default initial capacity.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 1024;

    /// Default consumer batch width.
    pub const DEFAULT_PARALLEL_BATCH_WIDTH: usize = 64;

    /// Default cap on a single growth step.
    pub const DEFAULT_GROWTH_STEP_CAP: usize = 65_536;

    /// Sanity ceiling on any array: 100M elements.
    pub const ABSOLUTE_CEILING: usize = 100_000_000;

    /// Create a config with the given initial capacity and batch width,
    /// using defaults for the rest.
    pub fn new(initial_capacity: usize, parallel_batch_width: usize) -> Self {
        Self {
            initial_capacity,
            parallel_batch_width,
            growth_step_cap: Self::DEFAULT_GROWTH_STEP_CAP,
            ceiling: Self::ABSOLUTE_CEILING,
        }
    }

    /// Check structural invariants. Returns a human-readable reason on
    /// failure.
    pub fn validate(&self) -> Result<(), String> {
        let width = self.parallel_batch_width;
        if width == 0 {
            return Err("parallel_batch_width must be at least 1".to_string());
        }
        if self.initial_capacity % width != 0 {
            return Err(format!(
                "initial_capacity ({}) is not a multiple of parallel_batch_width ({width})",
                self.initial_capacity,
            ));
        }
        if self.growth_step_cap == 0 || self.growth_step_cap % width != 0 {
            return Err(format!(
                "growth_step_cap ({}) must be a non-zero multiple of parallel_batch_width ({width})",
                self.growth_step_cap,
            ));
        }
        if self.ceiling % width != 0 {
            return Err(format!(
                "ceiling ({}) is not a multiple of parallel_batch_width ({width})",
                self.ceiling,
            ));
        }
        if self.ceiling > Self::ABSOLUTE_CEILING {
            return Err(format!(
                "ceiling ({}) exceeds the absolute ceiling of {}",
                self.ceiling,
                Self::ABSOLUTE_CEILING,
            ));
        }
        if self.initial_capacity > self.ceiling {
            return Err(format!(
                "initial_capacity ({}) exceeds ceiling ({})",
                self.initial_capacity, self.ceiling,
            ));
        }
        Ok(())
    }

    /// Capacity to grow to so that `required` elements fit.
    ///
    /// Returns `required + min(required, growth_step_cap)` rounded up to a
    /// multiple of the batch width, clamped to the ceiling. Fails when
    /// `required` itself exceeds the ceiling.
    pub fn grown_capacity(&self, required: usize) -> Result<usize, SyncError> {
        if required > self.ceiling {
            return Err(SyncError::CapacityExceeded {
                requested: required,
                ceiling: self.ceiling,
            });
        }
        let step = required.min(self.growth_step_cap);
        let raw = required.saturating_add(step);
        let width = self.parallel_batch_width.max(1);
        let aligned = raw.div_ceil(width).saturating_mul(width);
        Ok(aligned.min(self.ceiling).max(required))
    }

    /// Make sure `vec` can hold `required` elements without reallocating
    /// outside of this policy.
    pub fn reserve<T>(&self, vec: &mut Vec<T>, required: usize) -> Result<(), SyncError> {
        if vec.capacity() >= required {
            return Ok(());
        }
        let target = self.grown_capacity(required)?;
        vec.reserve_exact(target - vec.len());
        Ok(())
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INITIAL_CAPACITY,
            Self::DEFAULT_PARALLEL_BATCH_WIDTH,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(CapacityConfig::default().validate().is_ok());
    }

    #[test]
    fn misaligned_initial_capacity_rejected() {
        let cfg = CapacityConfig::new(100, 64);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_width_rejected() {
        let cfg = CapacityConfig::new(0, 0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ceiling_above_absolute_rejected() {
        let cfg = CapacityConfig {
            ceiling: CapacityConfig::ABSOLUTE_CEILING + 1,
            ..CapacityConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn small_arrays_double_and_align() {
        let cfg = CapacityConfig::new(64, 64);
        // 65 + min(65, cap) = 130, rounded up to 192.
        assert_eq!(cfg.grown_capacity(65).unwrap(), 192);
    }

    #[test]
    fn large_arrays_grow_by_step_cap() {
        let cfg = CapacityConfig {
            growth_step_cap: 1024,
            ..CapacityConfig::new(64, 64)
        };
        // 10_000 + 1024 = 11_024, rounded up to 11_072.
        assert_eq!(cfg.grown_capacity(10_000).unwrap(), 11_072);
    }

    #[test]
    fn misaligned_ceiling_rejected() {
        let cfg = CapacityConfig {
            ceiling: 1000,
            ..CapacityConfig::new(64, 64)
        };
        let reason = cfg.validate().unwrap_err();
        assert!(reason.contains("ceiling (1000)"), "{reason}");
    }

    #[test]
    fn default_ceiling_aligns_with_default_width() {
        let cfg = CapacityConfig::default();
        assert_eq!(cfg.ceiling % cfg.parallel_batch_width, 0);
    }

    #[test]
    fn growth_clamps_to_aligned_ceiling() {
        let cfg = CapacityConfig {
            ceiling: 1024,
            ..CapacityConfig::new(64, 64)
        };
        assert!(cfg.validate().is_ok());
        let cap = cfg.grown_capacity(900).unwrap();
        assert_eq!(cap, 1024);
        assert_eq!(cap % 64, 0);
    }

    #[test]
    fn past_ceiling_is_capacity_error() {
        let cfg = CapacityConfig {
            ceiling: 1024,
            ..CapacityConfig::new(64, 64)
        };
        let err = cfg.grown_capacity(1025).unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn reserve_follows_policy() {
        let cfg = CapacityConfig::new(64, 64);
        let mut v: Vec<u32> = Vec::new();
        cfg.reserve(&mut v, 10).unwrap();
        assert!(v.capacity() >= 64);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn grown_capacity_fits_and_aligns(
                width_pow in 0u32..8,
                required in 1usize..1_000_000,
            ) {
                let width = 1usize << width_pow;
                let cfg = CapacityConfig::new(width, width);
                prop_assert!(cfg.validate().is_ok());
                let cap = cfg.grown_capacity(required).unwrap();
                prop_assert!(cap >= required);
                prop_assert_eq!(cap % width, 0);
            }
        }
    }
}
