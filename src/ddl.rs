//! MySQL DDL rendering. Pure string generation, no I/O: this module is the
//! only place dialect syntax lives, so porting to another engine means
//! replacing these functions and nothing else.

use crate::spec::{ColumnDefault, ColumnSpec, ColumnType, TableSpec};

pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn render_type(ty: &ColumnType) -> String {
    match ty {
        ColumnType::Integer => "INT".to_string(),
        ColumnType::Decimal { precision, scale } => format!("DECIMAL({},{})", precision, scale),
        ColumnType::VarChar { length } => format!("VARCHAR({})", length),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Timestamp { .. } => "TIMESTAMP".to_string(),
        ColumnType::Enum { values } => {
            let values = values
                .iter()
                .map(|v| quote_str(v))
                .collect::<Vec<_>>()
                .join(",");
            format!("ENUM({})", values)
        }
    }
}

fn render_default(default: &ColumnDefault, ty: &ColumnType) -> String {
    match default {
        ColumnDefault::Null => "NULL".to_string(),
        ColumnDefault::Int(v) => v.to_string(),
        // Decimal defaults render at the declared scale so the generated
        // fragment matches the canonical form, e.g. DECIMAL(15,2) DEFAULT 0.00
        ColumnDefault::Float(v) => match ty {
            ColumnType::Decimal { scale, .. } => format!("{:.*}", *scale as usize, v),
            _ => v.to_string(),
        },
        ColumnDefault::Text(v) => quote_str(v),
        ColumnDefault::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
    }
}

fn column_def(col: &ColumnSpec) -> String {
    let mut def = format!("{} {}", quote_ident(&col.name), render_type(&col.ty));
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if col.auto_increment {
        def.push_str(" AUTO_INCREMENT");
    }
    if let Some(default) = &col.default {
        def.push_str(" DEFAULT ");
        def.push_str(&render_default(default, &col.ty));
    }
    if let ColumnType::Timestamp { auto_update: true } = col.ty {
        def.push_str(" ON UPDATE CURRENT_TIMESTAMP");
    }
    def
}

fn ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single CREATE TABLE IF NOT EXISTS statement covering every declared
/// column and constraint. Idempotent at the database level, which makes the
/// concurrent-first-request race harmless.
pub fn create_table(spec: &TableSpec) -> String {
    let mut parts: Vec<String> = spec.columns.iter().map(column_def).collect();
    if !spec.primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", ident_list(&spec.primary_key)));
    }
    for unique in &spec.unique {
        parts.push(format!("UNIQUE KEY ({})", ident_list(unique)));
    }
    for fk in &spec.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            ident_list(&fk.columns),
            quote_ident(&fk.ref_table),
            ident_list(&fk.ref_columns),
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        quote_ident(&spec.name),
        parts.join(", "),
    )
}

pub fn add_column(table: &str, col: &ColumnSpec) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        column_def(col),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ColumnDefault, ColumnSpec, ColumnType, TableSpec};

    #[test]
    fn test_enum_column_with_default() {
        let col = ColumnSpec::new(
            "status",
            ColumnType::Enum {
                values: vec!["Active".to_string(), "Inactive".to_string()],
            },
        )
        .default_value(ColumnDefault::Text("Active".to_string()));
        assert_eq!(
            column_def(&col),
            "`status` ENUM('Active','Inactive') NOT NULL DEFAULT 'Active'"
        );
    }

    #[test]
    fn test_decimal_default_renders_at_declared_scale() {
        let col = ColumnSpec::new(
            "basic_salary",
            ColumnType::Decimal {
                precision: 15,
                scale: 2,
            },
        )
        .default_value(ColumnDefault::Float(0.0));
        assert_eq!(
            column_def(&col),
            "`basic_salary` DECIMAL(15,2) NOT NULL DEFAULT 0.00"
        );
    }

    #[test]
    fn test_timestamp_with_auto_update() {
        let col = ColumnSpec::new("updated_at", ColumnType::Timestamp { auto_update: true })
            .default_value(ColumnDefault::CurrentTimestamp);
        assert_eq!(
            column_def(&col),
            "`updated_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_nullable_column_omits_not_null() {
        let col = ColumnSpec::new("notes", ColumnType::Text).nullable();
        assert_eq!(column_def(&col), "`notes` TEXT");
    }

    #[test]
    fn test_create_table_with_constraints() {
        let spec = TableSpec::with_id(
            "employees",
            vec![
                ColumnSpec::new("email", ColumnType::VarChar { length: 100 }),
                ColumnSpec::new("dept_id", ColumnType::Integer).nullable(),
            ],
        )
        .unique(&["email"])
        .foreign_key(&["dept_id"], "departments", &["id"]);

        let sql = create_table(&spec);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `employees` ("));
        assert!(sql.contains("`id` INT NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains("UNIQUE KEY (`email`)"));
        assert!(sql.contains("FOREIGN KEY (`dept_id`) REFERENCES `departments` (`id`)"));
        assert!(sql.ends_with(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    }

    #[test]
    fn test_add_column_statement() {
        let col = ColumnSpec::new("hired_on", ColumnType::Date).nullable();
        assert_eq!(
            add_column("employees", &col),
            "ALTER TABLE `employees` ADD COLUMN `hired_on` DATE"
        );
    }

    #[test]
    fn test_identifier_and_literal_escaping() {
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
        let col = ColumnSpec::new("label", ColumnType::VarChar { length: 20 })
            .default_value(ColumnDefault::Text("it's".to_string()));
        assert!(column_def(&col).ends_with("DEFAULT 'it''s'"));
    }
}
