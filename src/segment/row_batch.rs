//! Row-major input batches and their conversion to columns.

use crate::schema::Schema;
use crate::Timestamp;

/// Borrowed row-major rows: `count` rows of `sizeof_per_row` bytes each,
/// fields concatenated in schema order.
#[derive(Debug, Clone, Copy)]
pub struct RowBatch<'a> {
    pub data: &'a [u8],
    pub sizeof_per_row: usize,
    pub count: usize,
}

impl<'a> RowBatch<'a> {
    pub fn new(data: &'a [u8], sizeof_per_row: usize, count: usize) -> Self {
        Self {
            data,
            sizeof_per_row,
            count,
        }
    }

    pub fn row(&self, index: usize) -> &'a [u8] {
        &self.data[index * self.sizeof_per_row..(index + 1) * self.sizeof_per_row]
    }
}

/// A batch sorted by `(timestamp, primary key)` and split per field.
#[derive(Debug, Default)]
pub(crate) struct ColumnBatch {
    pub(crate) timestamps: Vec<Timestamp>,
    pub(crate) primary_keys: Vec<i64>,
    pub(crate) columns: Vec<Vec<u8>>,
}

/// Sort rows by `(timestamp, primary key)` and transpose them into columns.
///
/// Equal keys keep their input order. Lengths must already be validated.
pub(crate) fn sort_and_transpose(
    schema: &Schema,
    primary_keys: &[i64],
    timestamps: &[Timestamp],
    rows: &RowBatch<'_>,
) -> ColumnBatch {
    let size = rows.count;
    let mut ordering: Vec<(Timestamp, i64, usize)> = (0..size)
        .map(|i| (timestamps[i], primary_keys[i], i))
        .collect();
    ordering.sort_unstable();

    let sizeof_infos = schema.sizeof_infos();
    let mut columns: Vec<Vec<u8>> = sizeof_infos
        .iter()
        .map(|len| Vec::with_capacity(len * size))
        .collect();
    let mut batch = ColumnBatch {
        timestamps: Vec::with_capacity(size),
        primary_keys: Vec::with_capacity(size),
        columns: Vec::new(),
    };

    for &(timestamp, primary_key, order_index) in &ordering {
        batch.timestamps.push(timestamp);
        batch.primary_keys.push(primary_key);
        let row = rows.row(order_index);
        let mut field_begin = 0;
        for (column, len) in columns.iter_mut().zip(&sizeof_infos) {
            column.extend_from_slice(&row[field_begin..field_begin + len]);
            field_begin += len;
        }
    }
    batch.columns = columns;
    batch
}

/// Sort delete records by `(timestamp, primary key)`.
pub(crate) fn sort_deletes(
    primary_keys: &[i64],
    timestamps: &[Timestamp],
) -> (Vec<Timestamp>, Vec<i64>) {
    let mut ordering: Vec<(Timestamp, i64)> = timestamps
        .iter()
        .copied()
        .zip(primary_keys.iter().copied())
        .collect();
    ordering.sort_unstable();
    ordering.into_iter().unzip()
}
