#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! `CheckoutKit` core: decodes the actions the checkout backend returns and drives each one
//! to exactly one terminal result for the host app.

mod action;
pub use action::*;

mod action_component;
pub use action_component::*;

mod components;
pub use components::*;

mod config;
pub use config::*;

mod dropin;
pub use dropin::*;

mod error;
pub use error::*;

mod logger;
pub use logger::*;

mod persisted;
pub use persisted::*;

mod redirect_listener;
pub use redirect_listener::*;

pub mod assertion;
pub mod network;

#[cfg(test)]
mod test_support;

uniffi::setup_scaffolding!("checkoutkit_core");
