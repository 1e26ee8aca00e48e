//! Dense byte grids backing the fog layer buffers.

use thiserror::Error;

use crate::{GridCoord, GridSize, HIDDEN};

/// Reasons a grid buffer could not be allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The requested dimensions produce a cell count that does not fit in memory addressing.
    #[error("grid of {width}x{height} cells overflows the addressable size")]
    Overflow {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// The allocator refused to provide the requested storage.
    #[error("failed to allocate {bytes} bytes for grid storage")]
    OutOfMemory {
        /// Number of bytes requested from the allocator.
        bytes: usize,
    },
}

/// Fixed-size grid storing one byte per cell in row-major order.
///
/// The storage is allocated once by [`GridBuffer::new`] and never resized.
#[derive(Debug, PartialEq, Eq)]
pub struct GridBuffer {
    size: GridSize,
    cells: Vec<u8>,
}

impl GridBuffer {
    /// Allocates a zeroed grid with the provided dimensions.
    pub fn new(size: GridSize) -> Result<Self, AllocationError> {
        let len = size.cell_count().ok_or(AllocationError::Overflow {
            width: size.width(),
            height: size.height(),
        })?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| AllocationError::OutOfMemory { bytes: len })?;
        cells.resize(len, HIDDEN);

        Ok(Self { size, cells })
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Number of bytes held by the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the grid holds no cells at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the coordinate addresses a cell inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: GridCoord) -> bool {
        cell.column() < self.size.width() && cell.row() < self.size.height()
    }

    /// Maps a coordinate onto its row-major byte offset.
    ///
    /// # Panics
    ///
    /// Panics when the coordinate lies outside the grid. Callers validate
    /// agent-derived coordinates before reaching this point.
    #[must_use]
    pub fn index(&self, cell: GridCoord) -> usize {
        assert!(
            self.contains(cell),
            "grid coordinate ({}, {}) lies outside the {}x{} buffer",
            cell.column(),
            cell.row(),
            self.size.width(),
            self.size.height(),
        );
        cell.row() as usize * self.size.width() as usize + cell.column() as usize
    }

    /// Reads a single cell.
    #[must_use]
    pub fn get(&self, cell: GridCoord) -> u8 {
        self.cells[self.index(cell)]
    }

    /// Overwrites a single cell.
    pub fn write(&mut self, cell: GridCoord, value: u8) {
        let index = self.index(cell);
        self.cells[index] = value;
    }

    /// Resets every cell to [`HIDDEN`].
    pub fn clear_all(&mut self) {
        self.cells.fill(HIDDEN);
    }

    /// Borrows a single row of cells.
    #[must_use]
    pub fn row(&self, row: u32) -> &[u8] {
        assert!(
            row < self.size.height(),
            "row {row} lies outside a grid of height {}",
            self.size.height()
        );
        let width = self.size.width() as usize;
        let start = row as usize * width;
        &self.cells[start..start + width]
    }

    /// Mutably borrows a single row of cells.
    pub fn row_mut(&mut self, row: u32) -> &mut [u8] {
        assert!(
            row < self.size.height(),
            "row {row} lies outside a grid of height {}",
            self.size.height()
        );
        let width = self.size.width() as usize;
        let start = row as usize * width;
        &mut self.cells[start..start + width]
    }

    /// Borrows the raw row-major cell storage.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Copies the full grid into an independently owned [`Snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            size: self.size,
            bytes: self.cells.clone().into_boxed_slice(),
        }
    }
}

/// Independently owned copy of a grid's bytes taken at a point in time.
///
/// A snapshot shares nothing with the buffer it was taken from, so it can be
/// moved to another thread while the live buffer keeps changing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    size: GridSize,
    bytes: Box<[u8]>,
}

impl Snapshot {
    /// Dimensions of the grid the snapshot was taken from.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Number of bytes carried by the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Reports whether the snapshot carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the captured bytes in row-major order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the snapshot, yielding the captured bytes.
    #[must_use]
    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VISIBLE;

    fn buffer(width: u32, height: u32) -> GridBuffer {
        GridBuffer::new(GridSize::new(width, height)).expect("small grids allocate")
    }

    #[test]
    fn new_buffer_is_zeroed() {
        let grid = buffer(8, 4);
        assert_eq!(grid.len(), 32);
        assert!(grid.as_bytes().iter().all(|cell| *cell == HIDDEN));
    }

    #[test]
    fn index_is_row_major() {
        let grid = buffer(4, 4);
        assert_eq!(grid.index(GridCoord::new(2, 1)), 6);
        assert_eq!(grid.index(GridCoord::new(3, 3)), 15);
    }

    #[test]
    fn write_then_snapshot_changes_only_the_target_byte() {
        let mut grid = buffer(5, 3);
        for row in 0..3 {
            for column in 0..5 {
                let cell = GridCoord::new(column, row);
                let mut probe = buffer(5, 3);
                probe.write(cell, 0x7f);
                let snapshot = probe.snapshot();
                let index = probe.index(cell);
                for (offset, byte) in snapshot.as_bytes().iter().enumerate() {
                    let expected = if offset == index { 0x7f } else { HIDDEN };
                    assert_eq!(*byte, expected, "cell ({column}, {row}) offset {offset}");
                }
            }
        }

        grid.write(GridCoord::new(4, 2), VISIBLE);
        assert_eq!(grid.get(GridCoord::new(4, 2)), VISIBLE);
    }

    #[test]
    fn snapshot_is_independent_of_later_writes() {
        let mut grid = buffer(4, 4);
        grid.write(GridCoord::new(1, 1), VISIBLE);
        let snapshot = grid.snapshot();

        grid.write(GridCoord::new(0, 0), VISIBLE);
        grid.clear_all();

        assert_eq!(snapshot.as_bytes()[5], VISIBLE);
        assert_eq!(snapshot.as_bytes()[0], HIDDEN);
        assert!(grid.as_bytes().iter().all(|cell| *cell == HIDDEN));
    }

    #[test]
    fn clear_all_resets_every_cell() {
        let mut grid = buffer(2, 2);
        grid.write(GridCoord::new(0, 1), VISIBLE);
        grid.write(GridCoord::new(1, 0), 0x10);
        grid.clear_all();
        assert_eq!(grid.as_bytes(), &[HIDDEN; 4]);
    }

    #[test]
    fn rows_address_contiguous_slices() {
        let mut grid = buffer(3, 2);
        grid.row_mut(1).copy_from_slice(&[1, 2, 3]);
        assert_eq!(grid.row(0), &[0, 0, 0]);
        assert_eq!(grid.row(1), &[1, 2, 3]);
        assert_eq!(grid.get(GridCoord::new(2, 1)), 3);
    }

    #[test]
    fn oversized_allocation_is_reported() {
        let result = GridBuffer::new(GridSize::new(u32::MAX, u32::MAX));
        assert!(result.is_err(), "expected allocation failure, got {result:?}");
    }

    #[test]
    #[should_panic(expected = "outside the 4x4 buffer")]
    fn out_of_bounds_index_panics() {
        let grid = buffer(4, 4);
        let _ = grid.index(GridCoord::new(4, 0));
    }

    #[test]
    #[should_panic(expected = "outside the 4x4 buffer")]
    fn out_of_bounds_write_panics() {
        let mut grid = buffer(4, 4);
        grid.write(GridCoord::new(0, 9), VISIBLE);
    }
}
