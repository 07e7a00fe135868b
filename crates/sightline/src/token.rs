//! Reserved token-type values.
//!
//! Token types are plain integers assigned by the lexer, starting at
//! [`MIN_USER`]. Values below that are reserved sentinels that can never
//! collide with a real token type, which is what lets lookahead sets carry
//! "end of input" and "empty derivation" alongside ordinary tokens.

/// Integer token type, as produced by a lexer.
pub type TokenType = i32;

/// End of input.
pub const EOF: TokenType = -1;

/// The empty derivation: the queried position can complete without
/// consuming any token.
pub const EPSILON: TokenType = -2;

/// Never a legal token type. Also used internally as the marker recorded
/// when an unevaluated predicate blocks further analysis.
pub const INVALID: TokenType = 0;

/// Smallest token type a lexer may assign.
pub const MIN_USER: TokenType = 1;
