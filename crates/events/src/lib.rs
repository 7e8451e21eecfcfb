//! `teller-events`: domain events and the notification hook.
//!
//! Every successful balance mutation and invoice payment emits a
//! [`BankEvent`] on an [`EventBus`]. The bus is the explicit seam for a
//! downstream notification layer: publication happens after commit and a
//! publish failure never un-commits the operation.

pub mod bus;
pub mod domain;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use domain::BankEvent;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
