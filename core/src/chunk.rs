//! Splitting key batches to fit the engine's bound parameter limit.

/// SQLite's default `SQLITE_LIMIT_VARIABLE_NUMBER`.
pub const MAX_SQL_KEYS: usize = 999;

/// Iterate over `items` in slices of at most [`MAX_SQL_KEYS`].
pub fn key_chunks<T>(items: &[T]) -> std::slice::Chunks<'_, T> { chunks_of(items, MAX_SQL_KEYS) }

/// Like [`key_chunks`] with an explicit limit. A limit of zero is treated as one.
fn chunks_of<T>(items: &[T], limit: usize) -> std::slice::Chunks<'_, T> { items.chunks(limit.max(1)) }
