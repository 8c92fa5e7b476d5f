//! Build script for armtrap-core
//!
//! This script checks system requirements before compilation:
//! - Minimum Rust version (Edition 2021 = Rust 1.56.0+)
//! - macOS on Apple Silicon for the Mach backend
//!
//! Other hosts still build: the platform-agnostic core (slot tables, command
//! parsing, formatting) compiles everywhere so it can be tested anywhere.

fn main()
{
    if let Ok(rustc_version) = rustc_version::version() {
        if let Ok(min_rust_version) = rustc_version::Version::parse("1.56.0") {
            if rustc_version < min_rust_version {
                panic!(
                    "armtrap-core requires Rust {} or newer (Edition 2021), found {}",
                    min_rust_version, rustc_version
                );
            }
        }
    } else {
        println!("cargo:warning=could not verify Rust version");
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();

    if target_os == "macos" && target_arch == "aarch64" {
        check_macos_arm64_requirements();
    } else {
        println!(
            "cargo:warning=armtrap-core: no Mach backend for {target_os}/{target_arch}; only the portable core is built"
        );
    }
}

fn check_macos_arm64_requirements()
{
    // ARM_DEBUG_STATE64 with six usable comparator pairs needs Apple Silicon, i.e. Big Sur or later.
    let min_macos_version = (11, 0, 0);

    if let Some(version) = get_macos_version() {
        if version < min_macos_version {
            panic!(
                "armtrap-core on Apple Silicon requires macOS {}.{}.{} or newer (Big Sur+), found {}.{}.{}",
                min_macos_version.0, min_macos_version.1, min_macos_version.2, version.0, version.1, version.2
            );
        }
    } else {
        // Might be cross-compiling
        println!("cargo:warning=could not detect macOS version");
    }
}

fn get_macos_version() -> Option<(u32, u32, u32)>
{
    use std::process::Command;

    let output = Command::new("sw_vers").arg("-productVersion").output().ok()?;

    let version_str = String::from_utf8(output.stdout).ok()?;
    let version_str = version_str.trim();

    // e.g. "14.2.1" or "11.0"
    let parts: Vec<&str> = version_str.split('.').collect();
    if parts.len() < 2 {
        return None;
    }

    let major = parts[0].parse::<u32>().ok()?;
    let minor = parts[1].parse::<u32>().ok()?;
    let patch = parts.get(2).and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);

    Some((major, minor, patch))
}
