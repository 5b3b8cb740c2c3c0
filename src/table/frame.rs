use std::fmt;

// ---------------------------------------------------------------------------
// Cell – a single entry of a table column
// ---------------------------------------------------------------------------

/// A dynamically-typed table entry. `Null` is the missing-value marker used
/// when stacked tables do not share a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Null,
}

impl fmt::Display for Cell {
    /// CSV rendering: shortest round-trip float (`2.0`, `0.1`), NaN and
    /// `Null` as an empty field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) if v.is_nan() => Ok(()),
            Cell::Number(v) => write!(f, "{v:?}"),
            Cell::Null => Ok(()),
        }
    }
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Table – ordered, rectangular column store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

/// Column-oriented table. Columns keep insertion order and always have the
/// same number of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.cells.as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// One row as cells in column order.
    pub fn row(&self, i: usize) -> Option<Vec<&Cell>> {
        (i < self.n_rows).then(|| self.columns.iter().map(|c| &c.cells[i]).collect())
    }

    /// Build from columns that are already equally long.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        let n_rows = columns.first().map_or(0, |c| c.cells.len());
        debug_assert!(columns.iter().all(|c| c.cells.len() == n_rows));
        Table { columns, n_rows }
    }

    /// Stack `other` below this table. Columns are matched by name; new
    /// columns are appended at the end and every gap is filled with `Null`.
    pub fn append(&mut self, other: &Table) {
        let before = self.n_rows;
        for col in &other.columns {
            if !self.columns.iter().any(|c| c.name == col.name) {
                self.columns.push(Column {
                    name: col.name.clone(),
                    cells: vec![Cell::Null; before],
                });
            }
        }
        for col in &mut self.columns {
            match other.columns.iter().find(|c| c.name == col.name) {
                Some(src) => col.cells.extend(src.cells.iter().cloned()),
                None => col.cells.extend(std::iter::repeat(Cell::Null).take(other.n_rows)),
            }
        }
        self.n_rows = before + other.n_rows;
    }

    /// Row-wise union of several tables.
    pub fn concat<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Table {
        let mut out = Table::new();
        for t in tables {
            out.append(t);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[(&str, Vec<Cell>)]) -> Table {
        Table::from_columns(
            cols.iter()
                .map(|(name, cells)| Column {
                    name: name.to_string(),
                    cells: cells.clone(),
                })
                .collect(),
        )
    }

    #[test]
    fn display_follows_csv_conventions() {
        assert_eq!(Cell::Number(2.0).to_string(), "2.0");
        assert_eq!(Cell::Number(0.1).to_string(), "0.1");
        assert_eq!(Cell::Number(f64::NAN).to_string(), "");
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::from("gold").to_string(), "gold");
    }

    #[test]
    fn append_pads_missing_columns_with_null() {
        let mut a = table(&[("sample", vec!["s".into()]), ("x", vec![1.0.into()])]);
        let b = table(&[("sample", vec!["s".into(), "s".into()]), ("y", vec![2.0.into(), 3.0.into()])]);

        a.append(&b);

        assert_eq!(a.n_rows(), 3);
        assert_eq!(a.column_names(), vec!["sample", "x", "y"]);
        assert_eq!(a.column("x").unwrap(), &[Cell::Number(1.0), Cell::Null, Cell::Null]);
        assert_eq!(a.column("y").unwrap(), &[Cell::Null, Cell::Number(2.0), Cell::Number(3.0)]);
        assert_eq!(a.row(1).unwrap(), vec![&Cell::from("s"), &Cell::Null, &Cell::Number(2.0)]);
        assert!(a.row(3).is_none());
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let t = Table::concat(Vec::<&Table>::new());
        assert!(t.is_empty());
        assert_eq!(t.n_cols(), 0);
    }
}
