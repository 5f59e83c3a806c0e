//! Installed software facts
//!
//! The full package list comes back as rows from the query source; the
//! dpkg fallback only yields flat text, which lands in the raw field so
//! degraded hosts still report something.

use surveyor_engine::{FieldKind, FieldSpec, FieldTest, Module, Probe, SummarySpec};

/// Build the software module
#[must_use]
pub fn module() -> Module {
    Module::new("software")
        .probe(
            Probe::new("packages")
                .with_query("SELECT name, version, arch FROM deb_packages")
                .with_script("dpkg-query -W -f '${Package} ${Version}\\n'")
                .field(FieldSpec::new("items", FieldKind::Rows))
                .field(FieldSpec::new("name", FieldKind::Text))
                .field(FieldSpec::new("version", FieldKind::Text))
                .field(FieldSpec::new("arch", FieldKind::Text))
                .field(FieldSpec::new("raw", FieldKind::Text).alias("output")),
        )
        .probe(
            Probe::new("package_count")
                .with_query("SELECT COUNT(*) AS n FROM deb_packages")
                .with_script("dpkg-query -W | wc -l")
                .field(FieldSpec::new("n", FieldKind::Int).alias("output")),
        )
        .with_summary(
            SummarySpec::new("summary", "unknown")
                .rule("package_count", "n", FieldTest::NonZero, "ok")
                .overlay("package_count", "n", "package_count"),
        )
}
