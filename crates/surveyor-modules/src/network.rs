//! Network facts: addresses and listening sockets
//!
//! `ip -j` emits real JSON, so the interface fallback still produces rows;
//! `ss` only gives text. A one-row query result comes back unwrapped
//! rather than as a list, so each list probe also declares its row's
//! columns.

use surveyor_engine::{FieldKind, FieldSpec, Module, Probe};

/// Build the network module
#[must_use]
pub fn module() -> Module {
    Module::new("network")
        .probe(
            Probe::new("interfaces")
                .with_query("SELECT interface, address, mask FROM interface_addresses")
                .with_script("ip -j addr")
                .field(FieldSpec::new("items", FieldKind::Rows))
                .field(FieldSpec::new("interface", FieldKind::Text))
                .field(FieldSpec::new("address", FieldKind::Text))
                .field(FieldSpec::new("mask", FieldKind::Text)),
        )
        .probe(
            Probe::new("listening_ports")
                .with_query("SELECT pid, port, protocol, family FROM listening_ports")
                .with_script("ss -tlnH")
                .field(FieldSpec::new("items", FieldKind::Rows))
                .field(FieldSpec::new("pid", FieldKind::Int))
                .field(FieldSpec::new("port", FieldKind::Int))
                .field(FieldSpec::new("protocol", FieldKind::Int))
                .field(FieldSpec::new("family", FieldKind::Int))
                .field(FieldSpec::new("raw", FieldKind::Text).alias("output")),
        )
}
