//! Audio output abstraction

/// Destination for one unsigned 8-bit sample at a time.
///
/// Called from the sample interrupt, so implementations must not block for
/// longer than one sample period.
pub trait SampleSink {
    /// Error type
    type Error: core::fmt::Debug;

    /// Emit one sample immediately.
    fn write_sample(&mut self, value: u8) -> Result<(), Self::Error>;
}

impl<T: SampleSink + ?Sized> SampleSink for &mut T {
    type Error = T::Error;

    fn write_sample(&mut self, value: u8) -> Result<(), Self::Error> {
        T::write_sample(self, value)
    }
}
