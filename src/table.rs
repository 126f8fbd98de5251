use crate::error::TableError;

/// Rows read from or written to a sheet, with the first sheet row as header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let rows = rows.into_iter().map(|row| pad(row, width)).collect();
        Self { header, rows }
    }

    /// Build from raw sheet values. The Sheets API drops trailing empty
    /// cells, so short rows are padded out to the header width.
    pub fn from_values(values: Vec<Vec<String>>) -> Self {
        let mut values = values.into_iter();
        match values.next() {
            Some(header) => Self::new(header, values.collect()),
            None => Self::default(),
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<usize, TableError> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Project the named columns, in the given order, out of every row.
    pub fn select(&self, names: &[&str]) -> Result<Vec<Vec<&str>>, TableError> {
        let indices = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].as_str()).collect())
            .collect())
    }

    /// Header followed by the rows, ready for a sheet write.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

fn pad(mut row: Vec<String>, width: usize) -> Vec<String> {
    if row.len() < width {
        row.resize(width, String::new());
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn first_row_is_header_and_short_rows_are_padded() {
        let table = Table::from_values(vec![
            strings(&["formatted_name", "group"]),
            strings(&["Doe, Jane", "Alpha"]),
            strings(&["Roe, Rick"]),
        ]);
        assert_eq!(table.header(), strings(&["formatted_name", "group"]).as_slice());
        assert_eq!(table.rows()[1], strings(&["Roe, Rick", ""]));
        assert_eq!(
            table.select(&["group", "formatted_name"]).unwrap(),
            vec![vec!["Alpha", "Doe, Jane"], vec!["", "Roe, Rick"]]
        );
    }

    #[test]
    fn empty_sheet_reads_as_empty_table() {
        let table = Table::from_values(Vec::new());
        assert!(table.is_empty());
        assert!(table.header().is_empty());
        assert_eq!(
            table.column("group"),
            Err(TableError::MissingColumn("group".to_string()))
        );
    }

    #[test]
    fn values_include_header() {
        let table = Table::new(strings(&["a", "b"]), vec![strings(&["1"])]);
        assert_eq!(
            table.to_values(),
            vec![strings(&["a", "b"]), strings(&["1", ""])]
        );
    }
}
