//! # Event subscribers: the operator-visible notification sink.
//!
//! All operator output flows through here: the controller and proxy publish
//! [`Event`](crate::events::Event)s to the [`Bus`](crate::events::Bus), the
//! supervisor's listener forwards them to a [`SubscriberSet`], and each
//! [`Subscribe`] implementation renders or reacts to them.
//!
//! ```text
//! Controller/Proxy ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                        ┌─────────┼─────────┐
//!                                                        ▼         ▼         ▼
//!                                                   LogWriter   metrics   custom
//! ```
//!
//! The built-in [`LogWriter`] prints one line per event; custom subscribers
//! implement [`Subscribe`].

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
