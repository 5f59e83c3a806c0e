//! System facts: OS release, host identity, uptime, kernel
//!
//! Fallbacks lean on hostnamectl and /proc, which exist on any systemd
//! host even when the query source is missing.

use surveyor_engine::{FieldKind, FieldSpec, Module, Probe};

/// Build the system module
#[must_use]
pub fn module() -> Module {
    Module::new("system")
        .probe(
            Probe::new("os_version")
                .with_query("SELECT name, version, codename, platform, arch FROM os_version")
                .with_script("hostnamectl --json=short")
                .field(
                    FieldSpec::new("name", FieldKind::Text).alias("OperatingSystemPrettyName"),
                )
                .field(FieldSpec::new("version", FieldKind::Text))
                .field(FieldSpec::new("codename", FieldKind::Text))
                .field(FieldSpec::new("platform", FieldKind::Text))
                .field(FieldSpec::new("arch", FieldKind::Text).alias("Architecture")),
        )
        .probe(
            Probe::new("host")
                .with_query(
                    "SELECT hostname, cpu_brand, cpu_physical_cores, cpu_logical_cores, \
                     physical_memory FROM system_info",
                )
                .with_script("hostname")
                .field(FieldSpec::new("hostname", FieldKind::Text).alias("output"))
                .field(FieldSpec::new("cpu_brand", FieldKind::Text))
                .field(FieldSpec::new("cpu_physical_cores", FieldKind::Int))
                .field(FieldSpec::new("cpu_logical_cores", FieldKind::Int))
                .field(FieldSpec::new("physical_memory", FieldKind::Int)),
        )
        .probe(
            Probe::new("uptime")
                .with_query("SELECT total_seconds FROM uptime")
                .with_script("cut -d. -f1 /proc/uptime")
                .field(FieldSpec::new("total_seconds", FieldKind::Int).alias("output")),
        )
        .probe(
            Probe::new("kernel")
                .with_query("SELECT version, arguments FROM kernel_info")
                .with_script("uname -r")
                .field(FieldSpec::new("version", FieldKind::Text).alias("output"))
                .field(FieldSpec::new("arguments", FieldKind::Text)),
        )
}
