//! surveyor-modules: built-in topic catalogs
//!
//! Each submodule declares the probes for one report section. Catalogs are
//! pure data; the engine decides how to run them.

pub mod network;
pub mod process;
pub mod security;
pub mod software;
pub mod system;

use surveyor_engine::Module;

/// All built-in modules in report order
#[must_use]
pub fn catalog() -> Vec<Module> {
    vec![
        system::module(),
        software::module(),
        process::module(),
        network::module(),
        security::module(),
    ]
}

/// Look up one built-in module by id
#[must_use]
pub fn by_id(id: &str) -> Option<Module> {
    catalog().into_iter().find(|module| module.id == id)
}
