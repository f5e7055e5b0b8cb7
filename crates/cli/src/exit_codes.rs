//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                      |
//! |------|-----------|--------------------------------------------------|
//! | 0    | Universal | Success                                          |
//! | 1    | Universal | General error (unspecified)                      |
//! | 2    | Universal | CLI usage error (bad args, missing directory)    |
//! | 3    | reconcile | At least one major discrepancy found             |
//! | 4    | reconcile | At least one game could not be reconciled        |
//! | 5    | config    | Config file failed to parse or validate          |
//!
//! When both 3 and 4 apply, 4 wins: a failed game means the batch is
//! incomplete, which matters more than what the completed games found.

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - every game reconciled, no major discrepancies.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable games directory.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Reconcile (3-4)
// =============================================================================

/// A derived feed disagrees with the authoritative feed beyond the minor
/// threshold for at least one player or team.
pub const EXIT_MAJOR_DISCREPANCY: u8 = 3;

/// At least one game failed: its metadata or authoritative feed is missing.
/// An unreadable roster or derived feed only adds warnings.
pub const EXIT_GAMES_FAILED: u8 = 4;

// =============================================================================
// Config (5)
// =============================================================================

/// Config file could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 5;
