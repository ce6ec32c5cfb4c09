use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::error::Error;

/// Non-owning view of caller memory handed to the peripheral.
///
/// The peripheral may keep reading or writing through this view after its
/// start call has returned, so the queue borrows the underlying slice for
/// `'a` and never copies, frees or reallocates it.
pub struct TransferBuffer<'a> {
    ptr: NonNull<u8>,
    len: u16,
    /// False for views over shared (`&[u8]`) memory.
    writable: bool,
    _phantom: PhantomData<&'a mut [u8]>,
}

// SAFETY: A TransferBuffer stands in for `&'a mut [u8]`, which is Send.
// Moving it across contexts does not create additional aliases.
unsafe impl Send for TransferBuffer<'_> {}

impl<'a> TransferBuffer<'a> {
    /// View over bytes the peripheral will only read from.
    pub fn from_ref(data: &'a [u8]) -> Result<Self, Error> {
        let len = checked_len(data.len())?;
        Ok(Self {
            ptr: NonNull::from(data).cast(),
            len,
            writable: false,
            _phantom: PhantomData,
        })
    }

    /// View over bytes the peripheral will write into.
    pub fn from_mut(buffer: &'a mut [u8]) -> Result<Self, Error> {
        let len = checked_len(buffer.len())?;
        Ok(Self {
            ptr: NonNull::from(buffer).cast(),
            len,
            writable: true,
            _phantom: PhantomData,
        })
    }

    /// Build a view from a raw pointer and length.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes for all of
    /// `'a`. Any other access to that memory while the owning queue can
    /// still dispatch the transaction must be synchronized by the caller
    /// against the peripheral's interrupt-driven transfer.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, len: u16) -> Self {
        Self { ptr, len, writable: true, _phantom: PhantomData }
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Write pointer for receive transfers. Only transactions over a
    /// writable view are ever handed to a receive primitive.
    #[inline]
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Whether the peripheral may write through this view.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Transfer size in bytes.
    #[inline]
    pub fn len(&self) -> u16 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// No transfer into this buffer may be in flight.
    pub unsafe fn as_slice(&self) -> &[u8] {
        core::slice::from_raw_parts(self.ptr.as_ptr(), self.len as usize)
    }

    /// # Safety
    ///
    /// No transfer using this buffer may be in flight, and
    /// [`is_writable`](Self::is_writable) must return true.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> &mut [u8] {
        core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len as usize)
    }
}

impl core::fmt::Debug for TransferBuffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("writable", &self.writable)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransferBuffer<'_> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "TransferBuffer {{ ptr: {=usize:#x}, len: {=u16}, writable: {=bool} }}",
            self.ptr.as_ptr() as usize,
            self.len,
            self.writable
        )
    }
}

fn checked_len(len: usize) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| Error::BufferTooLong(len))
}

/// Width of the register address sent before a memory transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemAddressSize {
    #[default]
    Bits8,
    Bits16,
}

impl MemAddressSize {
    /// Address width in bytes.
    pub const fn bytes(self) -> u16 {
        match self {
            MemAddressSize::Bits8 => 1,
            MemAddressSize::Bits16 => 2,
        }
    }
}

/// Operation kind without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransactionKind {
    MasterTransmit,
    MasterReceive,
    MemWrite,
    MemRead,
}

/// Bus operation performed by a queued transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// Plain controller write of the buffer.
    MasterTransmit,
    /// Plain controller read into the buffer.
    MasterReceive,
    /// Write the buffer starting at `address` inside the device.
    MemWrite { address: u16, address_size: MemAddressSize },
    /// Read into the buffer starting at `address` inside the device.
    MemRead { address: u16, address_size: MemAddressSize },
}

impl Operation {
    /// Whether the peripheral writes into the transaction buffer.
    pub const fn is_receive(&self) -> bool {
        matches!(self, Operation::MasterReceive | Operation::MemRead { .. })
    }

    pub const fn kind(&self) -> TransactionKind {
        match self {
            Operation::MasterTransmit => TransactionKind::MasterTransmit,
            Operation::MasterReceive => TransactionKind::MasterReceive,
            Operation::MemWrite { .. } => TransactionKind::MemWrite,
            Operation::MemRead { .. } => TransactionKind::MemRead,
        }
    }
}

/// A queued bus transaction.
///
/// Everything but the start counter is fixed at construction.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transaction<'a> {
    operation: Operation,
    device_address: u16,
    buffer: TransferBuffer<'a>,
    start_count: u32,
}

impl<'a> Transaction<'a> {
    /// Fails with [`Error::ReadOnlyBuffer`] when a receive operation is
    /// paired with a view built by [`TransferBuffer::from_ref`].
    pub fn new(
        operation: Operation,
        device_address: u16,
        buffer: TransferBuffer<'a>,
    ) -> Result<Self, Error> {
        if operation.is_receive() && !buffer.is_writable() {
            return Err(Error::ReadOnlyBuffer);
        }
        Ok(Self { operation, device_address, buffer, start_count: 0 })
    }

    pub fn master_transmit(
        device_address: u16,
        data: &'a [u8],
    ) -> Result<Self, Error> {
        let buffer = TransferBuffer::from_ref(data)?;
        Self::new(Operation::MasterTransmit, device_address, buffer)
    }

    pub fn master_receive(
        device_address: u16,
        buffer: &'a mut [u8],
    ) -> Result<Self, Error> {
        let buffer = TransferBuffer::from_mut(buffer)?;
        Self::new(Operation::MasterReceive, device_address, buffer)
    }

    pub fn mem_write(
        device_address: u16,
        address: u16,
        address_size: MemAddressSize,
        data: &'a [u8],
    ) -> Result<Self, Error> {
        let buffer = TransferBuffer::from_ref(data)?;
        Self::new(
            Operation::MemWrite { address, address_size },
            device_address,
            buffer,
        )
    }

    pub fn mem_read(
        device_address: u16,
        address: u16,
        address_size: MemAddressSize,
        buffer: &'a mut [u8],
    ) -> Result<Self, Error> {
        let buffer = TransferBuffer::from_mut(buffer)?;
        Self::new(
            Operation::MemRead { address, address_size },
            device_address,
            buffer,
        )
    }

    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[inline]
    pub fn kind(&self) -> TransactionKind {
        self.operation.kind()
    }

    #[inline]
    pub fn device_address(&self) -> u16 {
        self.device_address
    }

    #[inline]
    pub fn buffer(&self) -> &TransferBuffer<'a> {
        &self.buffer
    }

    /// Transfer size in bytes.
    #[inline]
    pub fn size(&self) -> u16 {
        self.buffer.len()
    }

    /// Times this transaction was accepted by the peripheral since the
    /// counter was last cleared.
    #[inline]
    pub fn start_count(&self) -> u32 {
        self.start_count
    }

    /// Wraps on overflow; callers are expected to poll often enough.
    pub(crate) fn record_start(&mut self) {
        self.start_count = self.start_count.wrapping_add(1);
    }

    pub(crate) fn take_start_count(&mut self) -> u32 {
        core::mem::take(&mut self.start_count)
    }
}
