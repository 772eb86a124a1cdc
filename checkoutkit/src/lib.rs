//! Foreign bindings entry point. Everything lives in `checkoutkit_core`; this crate only
//! re-exports it and its `UniFFI` scaffolding so a single library is shipped to Swift and Kotlin.

checkoutkit_core::uniffi_reexport_scaffolding!();

pub use checkoutkit_core::*;
