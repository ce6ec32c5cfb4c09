//! Control state shared between the main loop and interrupt handlers.
//!
//! The run flag and the control state are packed into one byte so a single
//! access observes both consistently. [`StateCell`] abstracts over how that
//! byte is protected.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::{AtomicU8, Ordering};

/// What the next tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlState {
    /// Nothing to do until a completion event or `start()`.
    Idle = 0,
    /// Dispatch the transaction under the cursor.
    ReadyToSend = 1,
    /// De-init and re-init the peripheral.
    NeedsReset = 2,
}

impl ControlState {
    const fn from_bits(bits: u8) -> Self {
        match bits & ControlWord::STATE_MASK {
            1 => ControlState::ReadyToSend,
            2 => ControlState::NeedsReset,
            _ => ControlState::Idle,
        }
    }
}

/// Run flag and control state as one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlWord {
    pub running: bool,
    pub state: ControlState,
}

impl ControlWord {
    const STATE_MASK: u8 = 0b0000_0011;
    const RUNNING_BIT: u8 = 0b1000_0000;

    pub const STOPPED: Self =
        Self { running: false, state: ControlState::Idle };

    pub const fn new(running: bool, state: ControlState) -> Self {
        Self { running, state }
    }

    pub const fn with_state(self, state: ControlState) -> Self {
        Self { running: self.running, state }
    }

    pub const fn with_running(self, running: bool) -> Self {
        Self { running, state: self.state }
    }

    pub const fn to_bits(self) -> u8 {
        let running = if self.running { Self::RUNNING_BIT } else { 0 };
        running | self.state as u8
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            running: bits & Self::RUNNING_BIT != 0,
            state: ControlState::from_bits(bits),
        }
    }
}

impl Default for ControlWord {
    fn default() -> Self {
        Self::STOPPED
    }
}

/// Storage for a [`ControlWord`] that may be accessed from interrupt context.
///
/// Implementations must make every method appear atomic with respect to an
/// interrupt handler preempting the caller.
pub trait StateCell {
    fn load(&self) -> ControlWord;

    fn store(&self, word: ControlWord);

    /// Apply `f` to the current word and store its result, if any.
    ///
    /// Returns the previous word on success, or the unchanged word when `f`
    /// returned `None`.
    fn update<F>(&self, f: F) -> Result<ControlWord, ControlWord>
    where
        F: FnMut(ControlWord) -> Option<ControlWord>;

    /// Replace `current` with `new` only if the cell still holds `current`.
    fn compare_exchange(
        &self,
        current: ControlWord,
        new: ControlWord,
    ) -> Result<ControlWord, ControlWord> {
        self.update(|word| (word == current).then_some(new))
    }
}

/// Lock-free cell backed by an atomic byte.
///
/// On targets without native compare-and-swap, enable the `critical-section`
/// feature of `portable-atomic`.
#[derive(Debug)]
pub struct AtomicStateCell {
    bits: AtomicU8,
}

impl AtomicStateCell {
    pub const fn new(word: ControlWord) -> Self {
        Self { bits: AtomicU8::new(word.to_bits()) }
    }
}

impl Default for AtomicStateCell {
    fn default() -> Self {
        Self::new(ControlWord::STOPPED)
    }
}

impl StateCell for AtomicStateCell {
    fn load(&self) -> ControlWord {
        ControlWord::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn store(&self, word: ControlWord) {
        self.bits.store(word.to_bits(), Ordering::Release);
    }

    fn update<F>(&self, mut f: F) -> Result<ControlWord, ControlWord>
    where
        F: FnMut(ControlWord) -> Option<ControlWord>,
    {
        self.bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                f(ControlWord::from_bits(bits)).map(ControlWord::to_bits)
            })
            .map(ControlWord::from_bits)
            .map_err(ControlWord::from_bits)
    }

    fn compare_exchange(
        &self,
        current: ControlWord,
        new: ControlWord,
    ) -> Result<ControlWord, ControlWord> {
        self.bits
            .compare_exchange(
                current.to_bits(),
                new.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(ControlWord::from_bits)
            .map_err(ControlWord::from_bits)
    }
}

/// Cell guarded by an embassy blocking mutex, e.g. `CriticalSectionRawMutex`
/// to mask interrupts around each access.
pub struct MutexStateCell<M: RawMutex> {
    inner: Mutex<M, Cell<ControlWord>>,
}

impl<M: RawMutex> MutexStateCell<M> {
    pub const fn new(word: ControlWord) -> Self {
        Self { inner: Mutex::new(Cell::new(word)) }
    }
}

impl<M: RawMutex> Default for MutexStateCell<M> {
    fn default() -> Self {
        Self::new(ControlWord::STOPPED)
    }
}

impl<M: RawMutex> StateCell for MutexStateCell<M> {
    fn load(&self) -> ControlWord {
        self.inner.lock(Cell::get)
    }

    fn store(&self, word: ControlWord) {
        self.inner.lock(|cell| cell.set(word));
    }

    fn update<F>(&self, mut f: F) -> Result<ControlWord, ControlWord>
    where
        F: FnMut(ControlWord) -> Option<ControlWord>,
    {
        self.inner.lock(|cell| {
            let previous = cell.get();
            match f(previous) {
                Some(next) => {
                    cell.set(next);
                    Ok(previous)
                }
                None => Err(previous),
            }
        })
    }
}
