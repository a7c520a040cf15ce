use super::{Database, DatabaseError, KeyKind, UuidGenerator};
use tracing::info;

/// The four benchmark tables, children before their parents so a drop in
/// this order respects the foreign key dependency.
pub const TABLES: [&str; 4] = ["child_serial", "parent_serial", "child_uuid", "parent_uuid"];

/// Drop and recreate both table pairs plus the secondary index on each
/// child table's foreign key. Safe to call on a fresh database and on one
/// holding leftovers from a previous run.
pub fn reset(db: &mut Database) -> Result<(), DatabaseError> {
    let generator = db.generator();

    drop_tables(db)?;

    for kind in KeyKind::ALL {
        info!(variant = kind.suffix(), "Creating tables");
        db.batch_execute(&parent_table_ddl(kind, generator))?;
        db.batch_execute(&child_table_ddl(kind, generator))?;
        db.batch_execute(&child_index_ddl(kind))?;
    }

    Ok(())
}

pub fn drop_tables(db: &mut Database) -> Result<(), DatabaseError> {
    for table in TABLES {
        db.batch_execute(&format!("DROP TABLE IF EXISTS {table} CASCADE"))?;
    }

    Ok(())
}

fn id_column(kind: KeyKind, generator: UuidGenerator) -> String {
    match kind {
        KeyKind::Serial => "id SERIAL PRIMARY KEY".to_owned(),
        KeyKind::Uuid => format!("id UUID PRIMARY KEY DEFAULT {}", generator.sql()),
    }
}

fn key_type(kind: KeyKind) -> &'static str {
    match kind {
        KeyKind::Serial => "INTEGER",
        KeyKind::Uuid => "UUID",
    }
}

fn parent_table_ddl(kind: KeyKind, generator: UuidGenerator) -> String {
    format!(
        "CREATE TABLE parent_{} (
            {},
            name VARCHAR(100),
            value INTEGER
        )",
        kind.suffix(),
        id_column(kind, generator),
    )
}

fn child_table_ddl(kind: KeyKind, generator: UuidGenerator) -> String {
    let suffix = kind.suffix();

    format!(
        "CREATE TABLE child_{suffix} (
            {},
            parent_id {} REFERENCES parent_{suffix}(id),
            description VARCHAR(200),
            active BOOLEAN
        )",
        id_column(kind, generator),
        key_type(kind),
    )
}

fn child_index_ddl(kind: KeyKind) -> String {
    let suffix = kind.suffix();

    format!("CREATE INDEX idx_child_{suffix}_parent_id ON child_{suffix}(parent_id)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_order_lists_children_first() {
        for kind in KeyKind::ALL {
            let child = format!("child_{}", kind.suffix());
            let parent = format!("parent_{}", kind.suffix());
            let child_pos = TABLES.iter().position(|t| *t == child).unwrap();
            let parent_pos = TABLES.iter().position(|t| *t == parent).unwrap();

            assert!(child_pos < parent_pos);
        }
    }

    #[test]
    fn serial_tables_use_auto_increment_keys() {
        let parent = parent_table_ddl(KeyKind::Serial, UuidGenerator::V7);
        let child = child_table_ddl(KeyKind::Serial, UuidGenerator::V7);

        assert!(parent.contains("CREATE TABLE parent_serial"));
        assert!(parent.contains("id SERIAL PRIMARY KEY"));
        assert!(child.contains("parent_id INTEGER REFERENCES parent_serial(id)"));
        // the generator choice must not leak into the serial variant
        assert!(!parent.contains("uuid_generate"));
    }

    #[test]
    fn uuid_tables_default_to_the_probed_generator() {
        let v7 = parent_table_ddl(KeyKind::Uuid, UuidGenerator::V7);
        let v4 = parent_table_ddl(KeyKind::Uuid, UuidGenerator::V4);

        assert!(v7.contains("id UUID PRIMARY KEY DEFAULT uuid_generate_v7()"));
        assert!(v4.contains("id UUID PRIMARY KEY DEFAULT uuid_generate_v4()"));

        let child = child_table_ddl(KeyKind::Uuid, UuidGenerator::V7);
        assert!(child.contains("parent_id UUID REFERENCES parent_uuid(id)"));
    }

    #[test]
    fn child_index_targets_the_foreign_key() {
        assert_eq!(
            child_index_ddl(KeyKind::Serial),
            "CREATE INDEX idx_child_serial_parent_id ON child_serial(parent_id)"
        );
        assert_eq!(
            child_index_ddl(KeyKind::Uuid),
            "CREATE INDEX idx_child_uuid_parent_id ON child_uuid(parent_id)"
        );
    }
}
