//! Limits for decoding untrusted input and for bounded encoding.

/// Maximum nesting depth of arrays, maps and tags (binary and JSON).
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Free stack below which recursive readers and writers move to a new segment.
pub const STACK_RED_ZONE: usize = 64 * 1024;

/// Size of each stack segment allocated for deep nesting.
pub const STACK_SEGMENT_SIZE: usize = 1024 * 1024;

/// Chunk length used when streaming long strings as indefinite-length items.
pub const STRING_CHUNK_SIZE: usize = 4096;

/// Largest read performed in one step when a declared length comes from a stream.
pub const MAX_READ_CHUNK: usize = 64 * 1024;

/// Upper bound on preallocated container capacity derived from a declared length.
pub const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// Decimal and binary float exponents beyond this magnitude are written to
/// JSON as a double approximation.
pub const JSON_EXPONENT_LIMIT: u64 = 2500;

/// Largest exponent expanded into an exact integer by numeric conversions.
pub const MAX_EXPANSION_EXPONENT: u64 = 1_000_000;

/// Largest magnitude (in bits) of the exponent of tags 4 and 5.
pub const MAX_FRACTION_EXPONENT_BITS: u64 = 64;
