//! Column model for virtual table definitions
//!
//! A column couples a name and SQL type with a getter that writes the value
//! for one row into the engine's result context. Writable columns (indexed
//! flavor only) additionally carry a setter invoked during `UPDATE`.
//!
//! The row-context type `Ctx` varies by adapter flavor: the indexed flavor
//! reads by `usize` row index, while the cached and generator flavors hand
//! getters a reference to the host-defined row struct.

use crate::value::ValueToken;
use rusqlite::vtab::Context;

/// SQL storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Real,
    Blob,
}

impl ColumnType {
    /// The SQL type keyword used in the declared schema.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Getter: writes the column value for the given row context into the
/// engine's result context.
pub type Getter<Ctx> =
    Box<dyn Fn(&mut Context, &Ctx) -> rusqlite::Result<()> + Send + Sync + 'static>;

/// Setter: applies an engine-supplied value to the host for the given row
/// context. Returns `false` to reject the write.
pub type Setter<Ctx> = Box<dyn Fn(&Ctx, &ValueToken) -> bool + Send + Sync + 'static>;

/// One column of a virtual table definition.
pub struct Column<Ctx> {
    name: String,
    ty: ColumnType,
    writable: bool,
    getter: Getter<Ctx>,
    setter: Option<Setter<Ctx>>,
}

impl<Ctx> Column<Ctx> {
    /// A read-only column.
    pub fn new(name: impl Into<String>, ty: ColumnType, getter: Getter<Ctx>) -> Self {
        Column {
            name: name.into(),
            ty,
            writable: false,
            getter,
            setter: None,
        }
    }

    /// A writable column. The setter is invoked for `UPDATE` statements.
    pub fn new_writable(
        name: impl Into<String>,
        ty: ColumnType,
        getter: Getter<Ctx>,
        setter: Setter<Ctx>,
    ) -> Self {
        Column {
            name: name.into(),
            ty,
            writable: true,
            getter,
            setter: Some(setter),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Write this column's value for `row` into the result context.
    pub fn read(&self, ctx: &mut Context, row: &Ctx) -> rusqlite::Result<()> {
        (self.getter)(ctx, row)
    }

    /// Apply `value` to the host, if this column carries a setter.
    ///
    /// Returns `None` when no setter exists (the caller skips the column),
    /// otherwise the setter's success flag.
    pub fn write(&self, row: &Ctx, value: &ValueToken) -> Option<bool> {
        self.setter.as_ref().map(|set| set(row, value))
    }
}

impl<Ctx> std::fmt::Debug for Column<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("writable", &self.writable)
            .finish()
    }
}

/// Render the declared schema for a table: `CREATE TABLE <name>(<col> <TYPE>, ...)`.
pub(crate) fn schema_sql<Ctx>(name: &str, columns: &[Column<Ctx>]) -> String {
    let mut sql = String::from("CREATE TABLE ");
    sql.push_str(name);
    sql.push('(');
    for (i, col) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(col.name());
        sql.push(' ');
        sql.push_str(col.column_type().sql_type());
    }
    sql.push(')');
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_col(name: &str) -> Column<usize> {
        Column::new(
            name,
            ColumnType::Integer,
            Box::new(|ctx, row: &usize| ctx.set_result(&(*row as i64))),
        )
    }

    #[test]
    fn test_sql_type_keywords() {
        assert_eq!(ColumnType::Integer.sql_type(), "INTEGER");
        assert_eq!(ColumnType::Text.sql_type(), "TEXT");
        assert_eq!(ColumnType::Real.sql_type(), "REAL");
        assert_eq!(ColumnType::Blob.sql_type(), "BLOB");
    }

    #[test]
    fn test_schema_rendering() {
        let cols = vec![
            int_col("id"),
            Column::new(
                "name",
                ColumnType::Text,
                Box::new(|ctx, _row: &usize| ctx.set_result(&"")),
            ),
            Column::new(
                "v",
                ColumnType::Real,
                Box::new(|ctx, _row: &usize| ctx.set_result(&0.0f64)),
            ),
        ];
        let schema = schema_sql("t", &cols);
        assert_eq!(schema, "CREATE TABLE t(id INTEGER, name TEXT, v REAL)");
    }

    #[test]
    fn test_write_without_setter_is_skipped() {
        let col = int_col("n");
        let token = ValueToken::new(rusqlite::types::Value::Integer(1));
        assert_eq!(col.write(&0usize, &token), None);
        assert!(!col.is_writable());
    }
}
