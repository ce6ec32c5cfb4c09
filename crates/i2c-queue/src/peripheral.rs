use crate::transaction::{MemAddressSize, TransferBuffer};

/// Interrupt-driven I2C controller as seen by the queue driver.
///
/// The `start_*` methods only kick off a transfer; completion or failure is
/// reported later by the interrupt handler through the matching
/// [`ControlBlock`](crate::ControlBlock) callback. Returning `Ok` means the
/// transfer was accepted, not that it finished.
///
/// The buffer stays valid for as long as the driver lives, so an
/// implementation may keep its pointer until the transfer completes.
pub trait I2cPeripheral {
    /// Identity carried by interrupt events, compared against the identity
    /// a [`ControlBlock`](crate::ControlBlock) was bound to.
    type Id: Copy + PartialEq;
    /// Reason a start request was rejected.
    type Error: core::fmt::Debug;

    fn id(&self) -> Self::Id;

    fn start_master_transmit(
        &mut self,
        address: u16,
        buffer: &TransferBuffer<'_>,
    ) -> Result<(), Self::Error>;

    fn start_master_receive(
        &mut self,
        address: u16,
        buffer: &TransferBuffer<'_>,
    ) -> Result<(), Self::Error>;

    fn start_mem_write(
        &mut self,
        address: u16,
        mem_address: u16,
        mem_address_size: MemAddressSize,
        buffer: &TransferBuffer<'_>,
    ) -> Result<(), Self::Error>;

    fn start_mem_read(
        &mut self,
        address: u16,
        mem_address: u16,
        mem_address_size: MemAddressSize,
        buffer: &TransferBuffer<'_>,
    ) -> Result<(), Self::Error>;

    /// Hardware busy flag. A busy bus at dispatch time is treated as stuck.
    fn is_busy(&self) -> bool;

    fn deinit(&mut self);

    fn init(&mut self);
}
