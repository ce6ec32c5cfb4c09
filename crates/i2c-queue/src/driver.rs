use crate::config::Config;
use crate::control::ControlBlock;
use crate::error::Error;
use crate::fmt::debug2format;
use crate::peripheral::I2cPeripheral;
use crate::queue::TransactionQueue;
use crate::state::{AtomicStateCell, ControlState, StateCell};
use crate::transaction::{MemAddressSize, Operation, Transaction};

/// Main-loop half of the driver.
///
/// Owns the transaction schedule and the peripheral. Call [`tick`] often
/// from the application loop; it either dispatches the next transaction or
/// resets the peripheral, depending on what the interrupt callbacks on the
/// shared [`ControlBlock`] requested since the last tick.
///
/// Every buffer handed to an `add_*` method stays borrowed for `'a`. The
/// schedule is cyclic and never drained, so the peripheral may access any
/// of them again for as long as the driver exists.
///
/// [`tick`]: I2cQueue::tick
pub struct I2cQueue<'a, 'c, P, C = AtomicStateCell>
where
    P: I2cPeripheral,
    C: StateCell,
{
    peripheral: P,
    control: &'c ControlBlock<P::Id, C>,
    queue: TransactionQueue<'a>,
}

impl<'a, 'c, P, C> I2cQueue<'a, 'c, P, C>
where
    P: I2cPeripheral,
    C: StateCell,
{
    pub fn new(peripheral: P, control: &'c ControlBlock<P::Id, C>) -> Self {
        Self::with_config(peripheral, control, Config::default())
    }

    pub fn with_config(
        peripheral: P,
        control: &'c ControlBlock<P::Id, C>,
        config: Config,
    ) -> Self {
        if control.id() != peripheral.id() {
            warn!("control block is bound to a different peripheral");
        }

        let driver = Self {
            peripheral,
            control,
            queue: TransactionQueue::with_capacity(config.capacity),
        };
        if config.auto_start {
            driver.start();
        }
        driver
    }

    /// Enable dispatching; see [`ControlBlock::start`].
    pub fn start(&self) {
        self.control.start();
    }

    /// Disable dispatching; see [`ControlBlock::stop`].
    pub fn stop(&self) {
        self.control.stop();
    }

    #[inline]
    pub fn state(&self) -> ControlState {
        self.control.state()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Queue a plain write of `data` to `address`.
    pub fn add_master_transmit(
        &mut self,
        address: u16,
        data: &'a [u8],
    ) -> Result<usize, Error> {
        let transaction = Transaction::master_transmit(address, data)?;
        Ok(self.add_transaction(transaction))
    }

    /// Queue a plain read from `address` into `buffer`.
    pub fn add_master_receive(
        &mut self,
        address: u16,
        buffer: &'a mut [u8],
    ) -> Result<usize, Error> {
        let transaction = Transaction::master_receive(address, buffer)?;
        Ok(self.add_transaction(transaction))
    }

    /// Queue a write of `data` to register `mem_address` of `address`.
    pub fn add_mem_write(
        &mut self,
        address: u16,
        mem_address: u16,
        mem_address_size: MemAddressSize,
        data: &'a [u8],
    ) -> Result<usize, Error> {
        let transaction = Transaction::mem_write(
            address,
            mem_address,
            mem_address_size,
            data,
        )?;
        Ok(self.add_transaction(transaction))
    }

    /// Queue a read of register `mem_address` of `address` into `buffer`.
    pub fn add_mem_read(
        &mut self,
        address: u16,
        mem_address: u16,
        mem_address_size: MemAddressSize,
        buffer: &'a mut [u8],
    ) -> Result<usize, Error> {
        let transaction = Transaction::mem_read(
            address,
            mem_address,
            mem_address_size,
            buffer,
        )?;
        Ok(self.add_transaction(transaction))
    }

    /// Queue a prebuilt transaction, e.g. one built over a
    /// [`TransferBuffer::from_raw_parts`](crate::TransferBuffer::from_raw_parts) view.
    pub fn add_transaction(&mut self, transaction: Transaction<'a>) -> usize {
        self.queue.push(transaction)
    }

    /// Number of times the transaction at `index` was accepted by the
    /// peripheral since the last call, clearing the count.
    ///
    /// An accepted start is not a confirmed transfer; a failed transfer is
    /// retried silently after the next reset.
    pub fn poll_and_clear(&mut self, index: usize) -> Result<u32, Error> {
        let count = self.queue.poll_and_clear(index);
        if count.is_err() {
            debug!("poll of unknown transaction {}", index);
        }
        count
    }

    /// Advance the state machine by one step.
    pub fn tick(&mut self) {
        let word = self.control.word();
        if !word.running {
            return;
        }

        match word.state {
            ControlState::Idle => {}
            ControlState::ReadyToSend => {
                // Stay armed so transactions added later get picked up.
                if self.queue.is_empty() {
                    return;
                }
                if self.control.transition(word, ControlState::Idle) {
                    self.dispatch();
                }
            }
            ControlState::NeedsReset => {
                if self.control.transition(word, ControlState::ReadyToSend) {
                    self.reset();
                }
            }
        }
    }

    fn dispatch(&mut self) {
        self.queue.normalize_cursor();

        if self.peripheral.is_busy() {
            warn!("bus busy at dispatch, scheduling reset");
            self.control.schedule_reset();
            return;
        }

        let Some((index, transaction)) = self.queue.next() else {
            return;
        };
        let address = transaction.device_address();
        let buffer = transaction.buffer();

        trace!("dispatch #{} {:?}", index, transaction.kind());
        let result = match transaction.operation() {
            Operation::MasterTransmit => {
                self.peripheral.start_master_transmit(address, buffer)
            }
            Operation::MasterReceive => {
                self.peripheral.start_master_receive(address, buffer)
            }
            Operation::MemWrite { address: mem_address, address_size } => {
                self.peripheral.start_mem_write(
                    address,
                    mem_address,
                    address_size,
                    buffer,
                )
            }
            Operation::MemRead { address: mem_address, address_size } => {
                self.peripheral.start_mem_read(
                    address,
                    mem_address,
                    address_size,
                    buffer,
                )
            }
        };

        match result {
            Ok(()) => {
                transaction.record_start();
                self.queue.advance();
            }
            Err(_e) => {
                warn!(
                    "start of #{} rejected: {:?}, scheduling reset",
                    index,
                    debug2format(&_e)
                );
                self.control.schedule_reset();
            }
        }
    }

    fn reset(&mut self) {
        info!("resetting peripheral");
        self.peripheral.deinit();
        self.peripheral.init();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Raw cursor position; equal to [`len`](Self::len) right after the last
    /// entry was dispatched.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.queue.cursor()
    }

    pub fn get(&self, index: usize) -> Option<&Transaction<'a>> {
        self.queue.get(index)
    }

    pub fn control(&self) -> &'c ControlBlock<P::Id, C> {
        self.control
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// Tear down the driver and hand back the peripheral. Clears the run
    /// flag so later events on the shared control block stay inert.
    pub fn release(self) -> P {
        self.control.stop();
        self.peripheral
    }
}
