//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Comparison clean (every column matched on every row)     |
//! | 1    | Differences detected (warning, error or info-band column)|
//! | 2    | CLI usage error (bad args, unreadable config path)       |
//! | 3    | Primary key gate failed; comparison aborted              |
//! | 4    | Invalid config (TOML syntax or validation)               |
//! | 5    | Input dataset could not be read or parsed                |
//! | 6    | An output file could not be written                      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - comparison ran and nothing was flagged.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found. Like `diff(1)`, exit 1 means "datasets differ."
pub const EXIT_DIFFERENCES: u8 = 1;

/// Usage error - bad arguments, missing config file.
pub const EXIT_USAGE: u8 = 2;

/// Primary key missing or not unique; nothing after the gate ran.
pub const EXIT_IDENTITY: u8 = 3;

/// Config parse or validation error.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Input file unreadable or malformed.
pub const EXIT_INPUT: u8 = 5;

/// Report, joined export or audit log could not be written.
pub const EXIT_OUTPUT: u8 = 6;
