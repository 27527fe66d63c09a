//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use strata_arena::CapacityConfig;
use strata_core::{Depth, SyncError};

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SyncConfig::validate()`] or engine
/// construction.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Capacity settings are inconsistent.
    InvalidCapacity {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// `max_depth` is zero or does not fit the depth type.
    InvalidMaxDepth {
        /// The configured value.
        value: u32,
    },
    /// `max_delta_batch_size` is zero.
    ZeroBatchSize,
    /// `bones_per_skeleton` is zero.
    ZeroBoneStride,
    /// Building a component failed.
    Sync(SyncError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { reason } => write!(f, "invalid capacity config: {reason}"),
            Self::InvalidMaxDepth { value } => {
                write!(f, "max_depth must be in 1..={}, got {value}", Depth::MAX)
            }
            Self::ZeroBatchSize => write!(f, "max_delta_batch_size must be at least 1"),
            Self::ZeroBoneStride => write!(f, "bones_per_skeleton must be at least 1"),
            Self::Sync(e) => write!(f, "sync: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for ConfigError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

// ── SyncConfig ─────────────────────────────────────────────────────

/// Construction-time configuration of a
/// [`SynchronizationEngine`](crate::SynchronizationEngine).
///
/// These values bound memory layout and are immutable after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncConfig {
    /// Exclusive depth ceiling: nodes live at depths `0..max_depth`.
    /// Default: 64. Must be in `1..=u16::MAX`.
    pub max_depth: u32,
    /// Largest page any flush returns. Default: 4096. Must be at least 1.
    pub max_delta_batch_size: usize,
    /// Elements allocated up front in every id-indexed array.
    /// Default: 1024. Must be a multiple of `parallel_batch_width`.
    pub initial_capacity: usize,
    /// Consumer dispatch width; every capacity is a multiple of it.
    /// Default: 64.
    pub parallel_batch_width: usize,
    /// Largest single growth step. Default: 65_536. Must be a multiple of
    /// `parallel_batch_width`.
    pub growth_step_cap: usize,
    /// Element ceiling for every array. Default and maximum: 100_000_000.
    /// Must be a multiple of `parallel_batch_width`.
    pub capacity_ceiling: usize,
    /// Reject reparenting under a descendant. Default: true.
    pub check_cycles: bool,
    /// Ids per skeleton bone block. Default: 64.
    pub bones_per_skeleton: u32,
    /// Idle traversal buffers retained by the scratch pool. Default: 8.
    pub scratch_pool_size: usize,
}

impl SyncConfig {
    /// Default depth ceiling.
    pub const DEFAULT_MAX_DEPTH: u32 = 64;

    /// Default flush page size.
    pub const DEFAULT_MAX_DELTA_BATCH_SIZE: usize = 4096;

    /// Default bone block stride.
    pub const DEFAULT_BONES_PER_SKELETON: u32 = 64;

    /// Default scratch pool size.
    pub const DEFAULT_SCRATCH_POOL_SIZE: usize = 8;

    /// Check all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Depth ceiling fits the depth type and admits roots.
        if self.max_depth == 0 || self.max_depth > u32::from(Depth::MAX) {
            return Err(ConfigError::InvalidMaxDepth {
                value: self.max_depth,
            });
        }
        // 2. Flushes make progress.
        if self.max_delta_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        // 3. Capacity layout.
        self.capacity()
            .validate()
            .map_err(|reason| ConfigError::InvalidCapacity { reason })?;
        // 4. Bone blocks are non-empty.
        if self.bones_per_skeleton == 0 {
            return Err(ConfigError::ZeroBoneStride);
        }
        Ok(())
    }

    /// The growth policy handed to every capacity-managed array.
    pub fn capacity(&self) -> CapacityConfig {
        CapacityConfig {
            initial_capacity: self.initial_capacity,
            parallel_batch_width: self.parallel_batch_width,
            growth_step_cap: self.growth_step_cap,
            ceiling: self.capacity_ceiling,
        }
    }

    /// `max_depth` as the depth type. Only meaningful after
    /// [`validate`](Self::validate).
    pub fn depth_ceiling(&self) -> Depth {
        Depth::try_from(self.max_depth).unwrap_or(Depth::MAX)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_delta_batch_size: Self::DEFAULT_MAX_DELTA_BATCH_SIZE,
            initial_capacity: CapacityConfig::DEFAULT_INITIAL_CAPACITY,
            parallel_batch_width: CapacityConfig::DEFAULT_PARALLEL_BATCH_WIDTH,
            growth_step_cap: CapacityConfig::DEFAULT_GROWTH_STEP_CAP,
            capacity_ceiling: CapacityConfig::ABSOLUTE_CEILING,
            check_cycles: true,
            bones_per_skeleton: Self::DEFAULT_BONES_PER_SKELETON,
            scratch_pool_size: Self::DEFAULT_SCRATCH_POOL_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_max_depth_rejected() {
        let cfg = SyncConfig {
            max_depth: 0,
            ..SyncConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidMaxDepth { value: 0 })
        );
    }

    #[test]
    fn oversized_max_depth_rejected() {
        let cfg = SyncConfig {
            max_depth: u32::from(Depth::MAX) + 1,
            ..SyncConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidMaxDepth { .. })
        ));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let cfg = SyncConfig {
            max_delta_batch_size: 0,
            ..SyncConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn misaligned_capacity_rejected() {
        let cfg = SyncConfig {
            initial_capacity: 100,
            parallel_batch_width: 64,
            ..SyncConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidCapacity { reason }) => {
                assert!(reason.contains("initial_capacity"));
            }
            other => panic!("expected InvalidCapacity, got {other:?}"),
        }
    }

    #[test]
    fn zero_bone_stride_rejected() {
        let cfg = SyncConfig {
            bones_per_skeleton: 0,
            ..SyncConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBoneStride));
    }

    #[test]
    fn misaligned_capacity_ceiling_rejected() {
        let cfg = SyncConfig {
            initial_capacity: 64,
            parallel_batch_width: 64,
            capacity_ceiling: 1000,
            ..SyncConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidCapacity { reason }) => {
                assert!(reason.contains("ceiling"), "{reason}");
            }
            other => panic!("expected InvalidCapacity, got {other:?}"),
        }
    }

    #[test]
    fn sync_error_is_source() {
        let err = ConfigError::from(SyncError::InvalidBatchSize);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn capacity_carries_all_fields() {
        let cfg = SyncConfig {
            initial_capacity: 128,
            parallel_batch_width: 32,
            growth_step_cap: 256,
            capacity_ceiling: 4096,
            ..SyncConfig::default()
        };
        let cap = cfg.capacity();
        assert_eq!(cap.initial_capacity, 128);
        assert_eq!(cap.parallel_batch_width, 32);
        assert_eq!(cap.growth_step_cap, 256);
        assert_eq!(cap.ceiling, 4096);
    }
}
