//! Running process facts

use surveyor_engine::{FieldKind, FieldSpec, Module, Probe};

/// Build the process module
#[must_use]
pub fn module() -> Module {
    Module::new("process")
        .probe(
            Probe::new("processes")
                .with_query("SELECT pid, name, path, state FROM processes")
                .with_script("ps -eo pid,comm,stat --no-headers")
                .field(FieldSpec::new("items", FieldKind::Rows))
                .field(FieldSpec::new("pid", FieldKind::Int))
                .field(FieldSpec::new("name", FieldKind::Text))
                .field(FieldSpec::new("path", FieldKind::Text))
                .field(FieldSpec::new("state", FieldKind::Text))
                .field(FieldSpec::new("raw", FieldKind::Text).alias("output")),
        )
        .probe(
            Probe::new("process_count")
                .with_query("SELECT COUNT(*) AS n FROM processes")
                .with_script("ps -e --no-headers | wc -l")
                .field(FieldSpec::new("n", FieldKind::Int).alias("output")),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_list_carries_rows_and_raw() {
        let module = module();
        let list = module.probes.iter().find(|p| p.id == "processes").unwrap();
        assert_eq!(list.fields[0].kind, FieldKind::Rows);
        assert_eq!(list.fields.last().unwrap().name, "raw");
    }

    #[test]
    fn test_process_list_declares_row_columns() {
        let module = module();
        let list = module.probes.iter().find(|p| p.id == "processes").unwrap();
        for column in ["pid", "name", "path", "state"] {
            assert!(list.fields.iter().any(|f| f.name == column));
        }
    }
}
