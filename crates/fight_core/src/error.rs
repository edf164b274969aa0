//! Error types for the fight engine.
//!
//! Only contract violations by the caller surface as errors. Game-logic
//! outcomes (missing ability, dead target, failed chance roll, resisted
//! effect) are silent no-ops or log lines, never errors.

use thiserror::Error;

/// Result type alias using [`FightError`].
pub type Result<T> = std::result::Result<T, FightError>;

/// Top-level error type for all fight engine errors.
#[derive(Debug, Error)]
pub enum FightError {
    /// Random range wider than the supported span.
    #[error("Random range span {span} exceeds the supported maximum of 65536")]
    RngSpanTooWide {
        /// Requested `max - min` span.
        span: i64,
    },

    /// Random range with `max <= min`.
    #[error("Random range is empty: [{min}, {max})")]
    EmptyRngRange {
        /// Lower bound (inclusive).
        min: i32,
        /// Upper bound (exclusive).
        max: i32,
    },

    /// Grid coordinates outside the packed-key bound of [0, 15].
    #[error("Cell ({x}, {y}) is outside the [0, 15] grid bound")]
    CellOutOfBounds {
        /// X coordinate.
        x: u32,
        /// Y coordinate.
        y: u32,
    },

    /// Malformed unit identifier.
    #[error("Invalid unit ID: {0:?}")]
    InvalidUnitId(String),

    /// Unit reference that does not exist in the roster.
    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    /// Cell already occupied by another unit.
    #[error("Cell ({x}, {y}) is already occupied")]
    CellOccupied {
        /// X coordinate.
        x: u8,
        /// Y coordinate.
        y: u8,
    },

    /// Invalid fight state.
    #[error("Invalid fight state: {0}")]
    InvalidState(String),

    /// Snapshot serialization or restore failure.
    #[error("Snapshot error: {0}")]
    SnapshotError(String),
}
