//! Places `memory.x` where the RP2040 linker script can find it.
//!
//! Host builds (unit tests) ignore the search path, since `link.x` is only passed to the linker
//! for `thumbv6m-none-eabi` in `.cargo/config.toml`.

use std::{env, fs, path::PathBuf};

fn main() {
    let out = PathBuf::from(env::var_os("OUT_DIR").expect("cargo always sets OUT_DIR"));
    fs::write(out.join("memory.x"), include_bytes!("memory.x")).expect("unable to copy memory.x");
    println!("cargo:rustc-link-search={}", out.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
