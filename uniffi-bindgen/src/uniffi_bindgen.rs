//! Generates the Swift and Kotlin bindings from the compiled `checkoutkit` library.
//!
//! ```bash
//! cargo run -p uniffi-bindgen -- generate \
//!     --library target/release/libcheckoutkit.so \
//!     --language kotlin \
//!     --out-dir kotlin/checkoutkit/src/main/java
//! ```

fn main() {
    uniffi::uniffi_bindgen_main();
}
