//! Generates `sblookup.h` from the `extern "C"` surface into `OUT_DIR`.
//! Set `SBLOOKUP_HEADER_DIR` to also write it to a directory of your choice.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-env-changed=SBLOOKUP_HEADER_DIR");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };

    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SBLOOKUP_H")
        .generate()
    {
        Ok(bindings) => bindings,
        // a missing header must not break the Rust build
        Err(err) => {
            println!("cargo:warning=cbindgen failed: {err}");
            return;
        }
    };

    bindings.write_to_file(PathBuf::from(out_dir).join("sblookup.h"));
    if let Ok(dir) = env::var("SBLOOKUP_HEADER_DIR") {
        bindings.write_to_file(PathBuf::from(dir).join("sblookup.h"));
    }
}
