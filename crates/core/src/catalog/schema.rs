//! Declarative storage schema for the catalog.
//!
//! Entity structs carry no storage annotations; the mapping to tables and
//! columns lives here, once. Versions are tracked with `PRAGMA user_version`.

use rusqlite::Connection;

use super::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    /// Trailing column constraints, e.g. `NOT NULL DEFAULT 0`.
    pub constraints: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub references: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Index {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
    pub indices: &'static [Index],
}

/// One schema revision. `migration` upgrades the previous revision in place;
/// a fresh database is created directly from the latest `tables`.
#[derive(Debug, Clone, Copy)]
pub struct VersionedSchema {
    pub version: u32,
    pub tables: &'static [Table],
    pub migration: Option<&'static str>,
}

const fn col(name: &'static str, sql_type: SqlType, constraints: &'static str) -> Column {
    Column {
        name,
        sql_type,
        constraints,
    }
}

pub const PRODUCERS_TABLE: Table = Table {
    name: "producers",
    columns: &[
        col("id", SqlType::Text, "PRIMARY KEY"),
        col("name", SqlType::Text, "NOT NULL"),
        col("slug", SqlType::Text, "NOT NULL UNIQUE"),
        col("description", SqlType::Text, "NOT NULL DEFAULT ''"),
        col("avatar", SqlType::Text, "NOT NULL DEFAULT ''"),
        col("specialties", SqlType::Text, "NOT NULL DEFAULT '[]'"), // JSON array
        col(
            "rating",
            SqlType::Real,
            "NOT NULL DEFAULT 0 CHECK (rating BETWEEN 0 AND 5)",
        ),
        col(
            "followers",
            SqlType::Integer,
            "NOT NULL DEFAULT 0 CHECK (followers >= 0)",
        ),
        col(
            "video_count",
            SqlType::Integer,
            "NOT NULL DEFAULT 0 CHECK (video_count >= 0)",
        ),
        col("created_at", SqlType::Text, "NOT NULL"),
        col("updated_at", SqlType::Text, "NOT NULL"),
    ],
    foreign_keys: &[],
    indices: &[Index {
        name: "idx_producers_name",
        columns: &["name"],
        unique: false,
    }],
};

pub const CATEGORIES_TABLE: Table = Table {
    name: "categories",
    columns: &[
        col("id", SqlType::Text, "PRIMARY KEY"),
        col("name", SqlType::Text, "NOT NULL"),
        col("slug", SqlType::Text, "NOT NULL UNIQUE"),
        col("description", SqlType::Text, "NOT NULL DEFAULT ''"),
        col("icon", SqlType::Text, "NOT NULL DEFAULT ''"),
        col(
            "video_count",
            SqlType::Integer,
            "NOT NULL DEFAULT 0 CHECK (video_count >= 0)",
        ),
        col("created_at", SqlType::Text, "NOT NULL"),
        col("updated_at", SqlType::Text, "NOT NULL"),
    ],
    foreign_keys: &[],
    indices: &[Index {
        name: "idx_categories_name",
        columns: &["name"],
        unique: false,
    }],
};

pub const VIDEOS_TABLE: Table = Table {
    name: "videos",
    columns: &[
        col("id", SqlType::Text, "PRIMARY KEY"),
        col("title", SqlType::Text, "NOT NULL CHECK (title <> '')"),
        col("description", SqlType::Text, "NOT NULL DEFAULT ''"),
        col("url", SqlType::Text, "NOT NULL CHECK (url <> '')"),
        col("thumbnail", SqlType::Text, "NOT NULL DEFAULT ''"),
        col(
            "duration",
            SqlType::Integer,
            "NOT NULL DEFAULT 0 CHECK (duration >= 0)",
        ),
        col(
            "views",
            SqlType::Integer,
            "NOT NULL DEFAULT 0 CHECK (views >= 0)",
        ),
        col("producer_id", SqlType::Text, ""),
        col("category_id", SqlType::Text, ""),
        col("created_at", SqlType::Text, "NOT NULL"),
        col("updated_at", SqlType::Text, "NOT NULL"),
    ],
    foreign_keys: &[
        ForeignKey {
            column: "producer_id",
            table: "producers",
            references: "id",
        },
        ForeignKey {
            column: "category_id",
            table: "categories",
            references: "id",
        },
    ],
    indices: &[
        Index {
            name: "idx_videos_created_at",
            columns: &["created_at", "id"],
            unique: false,
        },
        Index {
            name: "idx_videos_producer_id",
            columns: &["producer_id"],
            unique: false,
        },
        Index {
            name: "idx_videos_category_id",
            columns: &["category_id"],
            unique: false,
        },
    ],
};

/// All schema revisions, oldest first.
pub const CATALOG_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[PRODUCERS_TABLE, CATEGORIES_TABLE, VIDEOS_TABLE],
    migration: None,
}];

impl Table {
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if c.constraints.is_empty() {
                    format!("{} {}", c.name, c.sql_type.as_sql())
                } else {
                    format!("{} {} {}", c.name, c.sql_type.as_sql(), c.constraints)
                }
            })
            .collect();

        for fk in self.foreign_keys {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                fk.column, fk.table, fk.references
            ));
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
            self.name,
            parts.join(",\n    ")
        );

        for index in self.indices {
            sql.push_str(&format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {}({});\n",
                if index.unique { "UNIQUE " } else { "" },
                index.name,
                self.name,
                index.columns.join(", ")
            ));
        }

        sql
    }

    /// Comma-separated column list, optionally qualified with a table alias.
    pub fn column_list(&self, alias: Option<&str>) -> String {
        self.columns
            .iter()
            .map(|c| match alias {
                Some(a) => format!("{}.{}", a, c.name),
                None => c.name.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn latest() -> &'static VersionedSchema {
    CATALOG_SCHEMAS
        .last()
        .expect("CATALOG_SCHEMAS must contain at least one revision")
}

/// Bring the database schema up to the latest revision.
pub fn migrate(conn: &Connection) -> Result<(), CatalogError> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let target = latest();

    if current == target.version {
        return Ok(());
    }

    if current > target.version {
        return Err(CatalogError::Store(format!(
            "database schema version {} is newer than supported version {}",
            current, target.version
        )));
    }

    if current == 0 {
        let ddl: String = target.tables.iter().map(Table::create_sql).collect();
        conn.execute_batch(&format!("BEGIN;\n{}COMMIT;", ddl))?;
    } else {
        for schema in CATALOG_SCHEMAS.iter().filter(|s| s.version > current) {
            if let Some(migration) = schema.migration {
                tracing::info!(version = schema.version, "Applying catalog schema migration");
                conn.execute_batch(&format!("BEGIN;\n{}\nCOMMIT;", migration))?;
            }
        }
    }

    conn.pragma_update(None, "user_version", target.version)?;
    tracing::debug!(version = target.version, "Catalog schema is up to date");
    Ok(())
}
