//! Unattended-upgrades posture
//!
//! Four probes feed one derived status: is the agent installed, is its
//! service active, when did it last complete, and did its log record
//! problems. Rule order matters: problems outrank liveness.

use surveyor_engine::{FieldKind, FieldSpec, FieldTest, Module, Probe, SummarySpec};

const UPGRADE_LOG: &str = "/var/log/unattended-upgrades/unattended-upgrades.log";

/// Build the security module
#[must_use]
pub fn module() -> Module {
    Module::new("security")
        .probe(
            Probe::new("agent")
                .with_query(
                    "SELECT name, version FROM deb_packages WHERE name = 'unattended-upgrades'",
                )
                .with_script("dpkg-query -W -f '${Version}' unattended-upgrades")
                .field(FieldSpec::new("name", FieldKind::Text))
                .field(FieldSpec::new("version", FieldKind::Text).alias("output")),
        )
        .probe(
            // Both sources yield data only when the unit is really active:
            // the query filters on active_state and systemctl exits nonzero
            // otherwise. active_state stays empty on inactive hosts.
            Probe::new("service")
                .with_query(
                    "SELECT id, active_state, sub_state FROM systemd_units \
                     WHERE id = 'unattended-upgrades.service' AND active_state = 'active'",
                )
                .with_script("systemctl is-active unattended-upgrades")
                .field(FieldSpec::new("active_state", FieldKind::Text).alias("output"))
                .field(FieldSpec::new("sub_state", FieldKind::Text)),
        )
        .probe(
            Probe::new("last_run")
                .with_script("stat -c %Y /var/lib/apt/periodic/upgrade-stamp")
                .field(FieldSpec::new("completed_at", FieldKind::Timestamp).alias("output")),
        )
        .probe(
            Probe::new("issues")
                .with_script(format!(
                    r#"awk '/ERROR/{{e++}} /WARNING/{{w++}} END{{printf "{{\"errors\": %d, \"warnings\": %d}}", e+0, w+0}}' {UPGRADE_LOG}"#
                ))
                .field(FieldSpec::new("errors", FieldKind::Int))
                .field(FieldSpec::new("warnings", FieldKind::Int)),
        )
        .with_summary(
            SummarySpec::new("summary", "inactive")
                .rule("issues", "errors", FieldTest::NonZero, "error")
                .rule("issues", "warnings", FieldTest::NonZero, "warning")
                .rule("service", "active_state", FieldTest::NonEmpty, "active")
                .overlay("agent", "version", "agent_version")
                .overlay("last_run", "completed_at", "last_run"),
        )
}
