use super::snapshot::ControllerSnapshot;

/// A controller currently visible to a [`ControllerSource`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Index to pass to [`ControllerSource::snapshot`]
    pub index: usize,
    pub name: String,
    /// Stable identifier persisted as `settings.deviceguid`
    pub guid: String,
}

// Source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to initialize controller backend: {0}")]
    InitializationError(String),

    #[error("Failed to read controller state: {0}")]
    ReadError(String),

    #[error("Failed to suspend controller backend: {0}")]
    SuspendError(String),
}

/// Hardware access used by the sampling loop and the link controller.
///
/// A disconnected controller is not an error: `snapshot` reports it with
/// `connected == false`. `Err` is reserved for failures that end a session.
pub trait ControllerSource: Send {
    /// Re-enumerates controllers and returns the connected ones in index order
    fn refresh(&mut self) -> Vec<DeviceInfo>;

    /// Current state of the controller at `index`
    fn snapshot(&mut self, index: usize) -> Result<ControllerSnapshot, SourceError>;

    /// Releases the hardware after a session has been joined
    fn suspend(&mut self) -> Result<(), SourceError>;
}
