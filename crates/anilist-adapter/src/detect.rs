//! Chrome/Chromium executable discovery.
//!
//! Detection is table-driven: per-OS candidate tables below feed one
//! iterator, and the first candidate that exists on disk wins.

use std::env;
use std::path::PathBuf;

use which::which;

/// Overrides autodetection with an explicit executable path.
pub const CHROME_ENV: &str = "ANILIKE_CHROME";

/// Any non-empty value drops the install-location sweep, which keeps
/// tests hermetic.
pub const SKIP_INSTALLS_ENV: &str = "ANILIKE_SKIP_OS_PATHS";

/// Bare names worth resolving through `PATH`.
#[cfg(target_os = "windows")]
const BINARY_NAMES: &[&str] = &["chrome.exe", "chromium.exe", "msedge.exe"];

#[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
const BINARY_NAMES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chromium",
    "chromium-browser",
];

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd"
)))]
const BINARY_NAMES: &[&str] = &["chrome"];

#[cfg(target_os = "macos")]
const INSTALL_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

#[cfg(any(target_os = "linux", target_os = "freebsd"))]
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
];

#[cfg(not(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "freebsd"
)))]
const INSTALL_PATHS: &[&str] = &[];

/// Environment variables naming the roots Chrome installs under.
#[cfg(target_os = "windows")]
const INSTALL_ROOT_VARS: &[&str] = &["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"];

#[cfg(target_os = "windows")]
const INSTALL_SUBPATHS: &[&str] = &[
    "Google/Chrome/Application/chrome.exe",
    "Chromium/Application/chrome.exe",
    "Microsoft/Edge/Application/msedge.exe",
];

/// Locate a Chrome-family executable.
///
/// Candidates are tried cheapest first: the [`CHROME_ENV`] override,
/// then `PATH`, then the usual install locations for this OS. An
/// override pointing at a missing file falls through to the later
/// candidates rather than failing detection outright.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    candidates().find(|path| path.exists())
}

fn candidates() -> impl Iterator<Item = PathBuf> {
    let override_path = non_empty_env(CHROME_ENV).map(PathBuf::from);
    let on_path = BINARY_NAMES.iter().filter_map(|name| which(name).ok());
    override_path
        .into_iter()
        .chain(on_path)
        .chain(install_candidates())
}

#[cfg(target_os = "windows")]
fn install_candidates() -> Vec<PathBuf> {
    if skip_installs() {
        return Vec::new();
    }
    let mut found = Vec::new();
    for root in INSTALL_ROOT_VARS.iter().filter_map(|var| non_empty_env(var)) {
        let root = PathBuf::from(root);
        found.extend(INSTALL_SUBPATHS.iter().map(|tail| root.join(tail)));
    }
    found
}

#[cfg(not(target_os = "windows"))]
fn install_candidates() -> Vec<PathBuf> {
    if skip_installs() {
        return Vec::new();
    }
    INSTALL_PATHS.iter().map(PathBuf::from).collect()
}

fn skip_installs() -> bool {
    non_empty_env(SKIP_INSTALLS_ENV).is_some()
}

fn non_empty_env(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}
