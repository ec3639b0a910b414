pub mod catalog;
pub mod compat;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod inherit;
pub mod install;
pub mod loader;
pub mod maven;
pub mod modpack;
pub mod optifine;
pub mod repair;
pub mod rule;
pub mod staging;

#[cfg(target_os = "windows")]
pub const TARGET_OS: &str = "windows";
#[cfg(target_os = "macos")]
pub const TARGET_OS: &str = "osx";
#[cfg(target_os = "linux")]
pub const TARGET_OS: &str = "linux";

#[cfg(target_os = "windows")]
pub const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(target_os = "windows"))]
pub const CLASSPATH_SEPARATOR: &str = ":";
