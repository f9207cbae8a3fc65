/// Failure of an engine operation
///
/// `E` is the error type of the register bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// The register bus rejected a read or write.
    ///
    /// The in-memory image keeps the state of the attempted command, so a retry
    /// resends the same bytes.
    Transport(E),
    /// Parameter out of range or malformed. Nothing was changed.
    InvalidInput,
    /// Configuration value does not fit its register field.
    Configuration,
}

/// Bus-independent subset of [`Error`] produced by settings validation and
/// command parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingError {
    InvalidInput,
    Configuration,
}

impl<E> From<SettingError> for Error<E> {
    fn from(value: SettingError) -> Self {
        match value {
            SettingError::InvalidInput => Error::InvalidInput,
            SettingError::Configuration => Error::Configuration,
        }
    }
}
