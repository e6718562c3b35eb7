/// Number of independent random assignments drawn by the initial trial search.
pub const DEFAULT_TRIAL_COUNT: usize = 10;

/// Equal-width bins per layering parameter.
pub const DEFAULT_BIN_COUNT: usize = 5;

/// Alphabet and length of result ids ("3FA90C").
pub const RESULT_ID_ALPHABET: &[u8] = b"0123456789ABCDEF";
pub const RESULT_ID_LEN: usize = 6;

/// Attempts at drawing an unused id before the store gives up.
pub const MAX_ID_ATTEMPTS: usize = 64;

/// A candidate must beat the current score by more than this (relative) margin
/// to be accepted, so incremental and full rescoring never disagree on direction.
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;
