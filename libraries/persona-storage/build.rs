//! Build script for persona-storage.
//!
//! The `users` schema is embedded with `include_str!`; rebuild whenever a
//! migration file is added or removed.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
