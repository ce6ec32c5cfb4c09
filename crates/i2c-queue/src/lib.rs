#![no_std]
//! Non-blocking queued transaction driver for interrupt-driven I2C
//! peripherals.
//!
//! Transactions are registered once and then dispatched one at a time, in
//! insertion order and cyclically, as the peripheral's completion interrupts
//! arrive. A stuck bus or an error interrupt triggers a peripheral reset
//! before dispatching resumes.
//!
//! The driver has two entry points:
//!
//! - [`I2cQueue::tick`], polled from the application's main loop, which
//!   owns the schedule and the peripheral.
//! - The callbacks on [`ControlBlock`], invoked from the peripheral's
//!   interrupt handlers, which only flip the shared control state.

extern crate alloc;

// Must go first so the other modules see its macros.
mod fmt;

mod config;
mod control;
mod driver;
mod error;
mod peripheral;
mod queue;
mod state;
mod transaction;

pub use config::Config;
pub use control::ControlBlock;
pub use driver::I2cQueue;
pub use error::Error;
pub use peripheral::I2cPeripheral;
pub use queue::TransactionQueue;
pub use state::{
    AtomicStateCell, ControlState, ControlWord, MutexStateCell, StateCell,
};
pub use transaction::{
    MemAddressSize, Operation, Transaction, TransactionKind, TransferBuffer,
};
