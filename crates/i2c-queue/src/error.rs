/// Errors returned synchronously to the caller.
///
/// Bus-level failures (busy bus, rejected start, error interrupt) never show
/// up here; they are absorbed by the reset cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No transaction exists at the given index.
    InvalidIndex(usize),
    /// Buffer of the given length does not fit a 16-bit transfer size.
    BufferTooLong(usize),
    /// A receive operation was given a read-only buffer.
    ReadOnlyBuffer,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidIndex(index) => {
                write!(f, "No transaction at index {}", index)
            }
            Error::BufferTooLong(len) => {
                write!(f, "Buffer of {} bytes exceeds the 16-bit transfer size", len)
            }
            Error::ReadOnlyBuffer => {
                write!(f, "Receive operation needs a writable buffer")
            }
        }
    }
}
