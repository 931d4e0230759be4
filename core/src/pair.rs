use crate::error::StoreError;

/// A key/value pair as it arrives from the transport: any number of nullable strings.
pub type RawPair = Vec<Option<String>>;

/// Build a well-formed [`RawPair`].
pub fn pair(key: impl Into<String>, value: impl Into<String>) -> RawPair { vec![Some(key.into()), Some(value.into())] }

/// Check every pair before anything is written.
///
/// The first malformed pair decides the error for the whole batch: a pair that is not exactly two
/// elements or has a null value is `InvalidValue`, a null key is `InvalidKey`.
pub fn validate_pairs(pairs: Vec<RawPair>) -> Result<Vec<(String, String)>, StoreError> {
    let mut validated = Vec::with_capacity(pairs.len());
    for raw in pairs {
        let [key, value]: [Option<String>; 2] = raw.try_into().map_err(|_| StoreError::InvalidValue)?;
        let key = key.ok_or(StoreError::InvalidKey)?;
        let value = value.ok_or(StoreError::InvalidValue)?;
        validated.push((key, value));
    }
    Ok(validated)
}
