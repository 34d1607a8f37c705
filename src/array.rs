// rows and columns are kept in index order
use std::collections::BTreeMap;

// our own stuff that we need
use crate::datatype::Scalar;
use crate::error::{GsmParamError, Result};

/// One row of an array: a single value in a 1-D array, or columns in a 2-D one.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Cell(Scalar),
    Columns(BTreeMap<usize, Scalar>),
}
impl Default for Row {
    fn default() -> Self {
        Row::Columns(BTreeMap::new())
    }
}
impl Row {
    pub fn columns<I, S>(cells: I) -> Row
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<Scalar>,
    {
        Row::Columns(cells.into_iter().map(|(c, s)| (c, s.into())).collect())
    }
    pub fn scalar(&self) -> Option<&Scalar> {
        match self {
            Row::Cell(scalar) => Some(scalar),
            Row::Columns(_) => None,
        }
    }
    pub fn column(&self, column: usize) -> Option<&Scalar> {
        match self {
            Row::Cell(_) => None,
            Row::Columns(columns) => columns.get(&column),
        }
    }
    fn widest(&self) -> usize {
        match self {
            Row::Cell(_) => 0,
            Row::Columns(columns) => columns.keys().next_back().copied().unwrap_or(0),
        }
    }
}

/// Sparse, 1-indexed storage for array values. Writes grow the declared
/// dimensions, reads never do.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayStore {
    rows: BTreeMap<usize, Row>,
    first_dimension: usize,
    second_dimension: usize,
}

impl ArrayStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_dimensions(first_dimension: usize, second_dimension: usize) -> Self {
        Self {
            rows: BTreeMap::new(),
            first_dimension,
            second_dimension,
        }
    }
    pub fn first_dimension(&self) -> usize {
        self.first_dimension
    }
    pub fn second_dimension(&self) -> usize {
        self.second_dimension
    }
    pub fn is_two_dimensional(&self) -> bool {
        self.second_dimension > 0
    }
    /// Number of rows that actually hold something.
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn has(&self, row: usize) -> bool {
        self.rows.contains_key(&row)
    }
    pub fn get(&self, row: usize) -> Option<&Row> {
        self.rows.get(&row)
    }
    pub fn get_or_default(&self, row: usize) -> Row {
        self.rows.get(&row).cloned().unwrap_or_default()
    }
    pub fn cell(&self, row: usize, column: usize) -> Option<&Scalar> {
        self.rows.get(&row).and_then(|r| r.column(column))
    }
    pub fn rows(&self) -> impl Iterator<Item = (usize, &Row)> {
        self.rows.iter().map(|(index, row)| (*index, row))
    }
    /// Write access to a row, creating an empty nested row when it is missing.
    pub fn row_mut(&mut self, row: usize) -> &mut Row {
        self.first_dimension = self.first_dimension.max(row);
        self.rows.entry(row).or_default()
    }
    /// Stores a whole row. Once the store has a second dimension every row
    /// keeps its values in columns, a single value going to column 1.
    pub fn set(&mut self, row: usize, value: Row) {
        self.first_dimension = self.first_dimension.max(row);
        let widest = value.widest();
        self.rows.insert(row, value);
        self.widen(widest);
    }
    /// Writes one cell, turning a 1-D store into a 2-D one if needed.
    pub fn set_cell(&mut self, row: usize, column: usize, value: Scalar) -> Result<()> {
        if column == 0 {
            return Err(GsmParamError::MalformedDocument(format!(
                "row {} has no column 0, columns start at 1",
                row
            )));
        }
        self.widen(column);
        if let Row::Columns(columns) = self.row_mut(row) {
            columns.insert(column, value);
        }
        Ok(())
    }
    fn widen(&mut self, columns: usize) {
        self.second_dimension = self.second_dimension.max(columns);
        if self.second_dimension == 0 {
            return;
        }
        for row in self.rows.values_mut() {
            if let Row::Cell(scalar) = row {
                let scalar = scalar.clone();
                *row = Row::Columns(BTreeMap::from([(1, scalar)]));
            }
        }
    }
    /// Builds a store from rows listed in order, the first one becoming row 1.
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut store = ArrayStore::new();
        for (index, row) in rows.into_iter().enumerate() {
            store.set(index + 1, row);
        }
        store
    }
}
