use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::state::{
    AtomicStateCell, ControlState, ControlWord, MutexStateCell, StateCell,
};

/// Interrupt-facing half of the driver.
///
/// Holds the run flag and control state for one peripheral. It only needs
/// `&self`, so it can live in a `static` and be shared between the main loop
/// and the peripheral's interrupt handlers. Events tagged with a different
/// peripheral identity are ignored, which lets several drivers share one
/// interrupt dispatcher.
///
/// A block always starts stopped and idle, whichever cell backs it.
pub struct ControlBlock<Id, C: StateCell = AtomicStateCell> {
    id: Id,
    cell: C,
}

impl<Id: Copy + PartialEq> ControlBlock<Id, AtomicStateCell> {
    /// Control block backed by an atomic byte.
    pub const fn new(id: Id) -> Self {
        Self { id, cell: AtomicStateCell::new(ControlWord::STOPPED) }
    }
}

impl<Id: Copy + PartialEq, M: RawMutex> ControlBlock<Id, MutexStateCell<M>> {
    /// Control block guarded by a blocking mutex, usable in a `static`.
    pub const fn with_mutex(id: Id) -> Self {
        Self { id, cell: MutexStateCell::new(ControlWord::STOPPED) }
    }
}

impl<Id: Copy + PartialEq, C: StateCell> ControlBlock<Id, C> {
    /// Control block backed by a caller-chosen cell. Whatever the cell
    /// holds is overwritten with [`ControlWord::STOPPED`].
    pub fn with_cell(id: Id, cell: C) -> Self {
        cell.store(ControlWord::STOPPED);
        Self { id, cell }
    }

    /// Peripheral identity this block answers to.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Enable dispatching and arm the next tick. Calling it while already
    /// running simply re-arms dispatch.
    pub fn start(&self) {
        debug!("start");
        self.cell
            .store(ControlWord::new(true, ControlState::ReadyToSend));
    }

    /// Disable dispatching. A transfer already accepted by the peripheral
    /// still runs to completion or error.
    pub fn stop(&self) {
        debug!("stop");
        let _ = self.cell.update(|word| Some(word.with_running(false)));
    }

    #[inline]
    pub fn state(&self) -> ControlState {
        self.cell.load().state
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.cell.load().running
    }

    /// Current run flag and state, read together.
    #[inline]
    pub fn word(&self) -> ControlWord {
        self.cell.load()
    }

    pub fn on_master_tx_complete(&self, id: Id) {
        self.on_complete(id);
    }

    pub fn on_master_rx_complete(&self, id: Id) {
        self.on_complete(id);
    }

    pub fn on_mem_tx_complete(&self, id: Id) {
        self.on_complete(id);
    }

    pub fn on_mem_rx_complete(&self, id: Id) {
        self.on_complete(id);
    }

    /// Error interrupt. Schedules a reset even while stopped; the reset
    /// itself only runs once the driver is started again.
    pub fn on_error(&self, id: Id) {
        if id != self.id {
            trace!("error event for another peripheral ignored");
            return;
        }
        warn!("peripheral error, scheduling reset");
        let _ = self.cell.update(|word| {
            Some(word.with_state(ControlState::NeedsReset))
        });
    }

    fn on_complete(&self, id: Id) {
        if id != self.id {
            trace!("completion event for another peripheral ignored");
            return;
        }
        let _ = self.cell.update(|word| {
            word.running.then_some(word.with_state(ControlState::ReadyToSend))
        });
    }

    /// Tick-side transition: only succeeds if no event changed the word
    /// since it was read.
    pub(crate) fn transition(
        &self,
        from: ControlWord,
        to: ControlState,
    ) -> bool {
        self.cell.compare_exchange(from, from.with_state(to)).is_ok()
    }

    /// Tick-side failure path; overrides whatever an event wrote meanwhile.
    pub(crate) fn schedule_reset(&self) {
        let _ = self.cell.update(|word| {
            Some(word.with_state(ControlState::NeedsReset))
        });
    }
}

impl<Id: core::fmt::Debug, C: StateCell> core::fmt::Debug
    for ControlBlock<Id, C>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlBlock")
            .field("id", &self.id)
            .field("word", &self.cell.load())
            .finish()
    }
}
