//! Deferred publish/subscribe messaging for the SELF simulation kernel.
//!
//! Entities never call each other directly. They post [`Message`]s to a
//! [`PostOffice`], which queues them until the scheduler's next delivery
//! phase and then hands each message to every subscriber of its topic and
//! of the wildcard topic `*`. Nothing is ever delivered synchronously.
//!
//! # Modules
//!
//! - [`error`] -- [`HandlerError`], the failure a message handler reports.
//! - [`message`] -- The immutable [`Message`] record and standard topics.
//! - [`post_office`] -- The subscription registry, pending queue, and
//!   batched delivery.
//!
//! [`HandlerError`]: error::HandlerError
//! [`Message`]: message::Message
//! [`PostOffice`]: post_office::PostOffice

pub mod error;
pub mod message;
pub mod post_office;

pub use error::HandlerError;
pub use message::{Message, Payload, topics};
pub use post_office::{DeliveryReport, PostOffice};
