use thiserror::Error;

/// Failures reported by the drive handshake.
///
/// None of these is retried: the operation in progress is abandoned and the outputs are left
/// as they were when the failure was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriveError {
    #[error("No cartridge in drive.")]
    CartridgeAbsent,
    #[error("Drive did not respond to select request.")]
    DriveNotResponding,
    #[error("failed to start drive motor. Drive not selected.")]
    NotSelected,
}
