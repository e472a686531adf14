// Library root: exposes the app modules to the binary and to integration
// tests.

pub mod app;
pub mod config;
pub mod console;
pub mod db;
pub mod import;
pub mod protocol;
