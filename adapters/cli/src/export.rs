//! Single-line text encoding of a fog grid, suitable for clipboard transfer.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use fog_core::{GridSize, Snapshot, VISIBLE};
use thiserror::Error;

const EXPORT_DOMAIN: &str = "fog";
const EXPORT_VERSION: &str = "v1";

/// Identifier prefix emitted before the grid dimensions.
pub(crate) const EXPORT_HEADER: &str = "fog:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Row-major cell values of a fog grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExportedGrid {
    size: GridSize,
    cells: Vec<u8>,
}

impl ExportedGrid {
    /// Captures the cells of a snapshot.
    #[must_use]
    pub(crate) fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            size: snapshot.size(),
            cells: snapshot.as_bytes().to_vec(),
        }
    }

    /// Dimensions of the exported grid.
    #[must_use]
    pub(crate) const fn size(&self) -> GridSize {
        self.size
    }

    /// Number of cells holding the visible mark.
    #[must_use]
    pub(crate) fn visible_cells(&self) -> usize {
        self.cells.iter().filter(|cell| **cell == VISIBLE).count()
    }

    /// Encodes the grid as `fog:v1:<width>x<height>:<base64>`.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let encoded = STANDARD_NO_PAD.encode(&self.cells);
        format!(
            "{EXPORT_HEADER}:{}x{}:{encoded}",
            self.size.width(),
            self.size.height()
        )
    }

    /// Decodes a grid from its string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, ExportDecodeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ExportDecodeError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(ExportDecodeError::MissingPrefix)?;
        let version = parts.next().ok_or(ExportDecodeError::MissingVersion)?;
        let dimensions = parts.next().ok_or(ExportDecodeError::MissingDimensions)?;
        let payload = parts.next().ok_or(ExportDecodeError::MissingPayload)?;
        if parts.next().is_some() {
            return Err(ExportDecodeError::TrailingData);
        }

        if domain != EXPORT_DOMAIN {
            return Err(ExportDecodeError::InvalidPrefix(domain.to_owned()));
        }
        if version != EXPORT_VERSION {
            return Err(ExportDecodeError::UnsupportedVersion(version.to_owned()));
        }

        let size = parse_dimensions(dimensions)?;
        let cells = STANDARD_NO_PAD.decode(payload.as_bytes())?;
        let expected = size
            .cell_count()
            .ok_or_else(|| ExportDecodeError::InvalidDimensions(dimensions.to_owned()))?;
        if cells.len() != expected {
            return Err(ExportDecodeError::LengthMismatch {
                expected,
                actual: cells.len(),
            });
        }

        Ok(Self { size, cells })
    }
}

/// Errors that can occur while decoding exported grids.
#[derive(Debug, Error)]
pub(crate) enum ExportDecodeError {
    /// The provided string was empty or contained only whitespace.
    #[error("export payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("export string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("export string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("export string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("export string is missing the payload")]
    MissingPayload,
    /// Segments followed the payload.
    #[error("export string has data after the payload")]
    TrailingData,
    /// The prefix segment named another format.
    #[error("export prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment named an unsupported revision.
    #[error("export version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode export payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The payload does not hold one byte per cell.
    #[error("export payload holds {actual} cells but the grid needs {expected}")]
    LengthMismatch {
        /// Cells implied by the dimensions.
        expected: usize,
        /// Cells carried by the payload.
        actual: usize,
    },
}

fn parse_dimensions(dimensions: &str) -> Result<GridSize, ExportDecodeError> {
    let invalid = || ExportDecodeError::InvalidDimensions(dimensions.to_owned());
    let (width, height) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok(GridSize::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fog_core::{GridBuffer, GridCoord};

    fn exported(size: GridSize, visible: &[GridCoord]) -> ExportedGrid {
        let mut buffer = GridBuffer::new(size).expect("allocate");
        for cell in visible {
            buffer.write(*cell, VISIBLE);
        }
        ExportedGrid::from_snapshot(&buffer.snapshot())
    }

    #[test]
    fn round_trip_preserves_marks() {
        let grid = exported(
            GridSize::new(4, 2),
            &[GridCoord::new(0, 0), GridCoord::new(3, 1)],
        );

        let encoded = grid.encode();
        assert!(encoded.starts_with(&format!("{EXPORT_HEADER}:4x2:")));

        let decoded = ExportedGrid::decode(&encoded).expect("export decodes");
        assert_eq!(decoded, grid);
        assert_eq!(decoded.visible_cells(), 2);
        assert_eq!(decoded.size(), GridSize::new(4, 2));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let grid = exported(GridSize::square(2), &[GridCoord::new(1, 1)]);
        let padded = format!("  {}\n", grid.encode());

        assert_eq!(ExportedGrid::decode(&padded).expect("decodes"), grid);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            ExportedGrid::decode("   "),
            Err(ExportDecodeError::EmptyPayload)
        ));
    }

    #[test]
    fn rejects_foreign_prefix_and_version() {
        assert!(matches!(
            ExportedGrid::decode("fow:v1:2x2:AAAAAA"),
            Err(ExportDecodeError::InvalidPrefix(prefix)) if prefix == "fow"
        ));
        assert!(matches!(
            ExportedGrid::decode("fog:v2:2x2:AAAAAA"),
            Err(ExportDecodeError::UnsupportedVersion(version)) if version == "v2"
        ));
    }

    #[test]
    fn rejects_malformed_dimensions() {
        assert!(matches!(
            ExportedGrid::decode("fog:v1:0x2:AA"),
            Err(ExportDecodeError::InvalidDimensions(_))
        ));
        assert!(matches!(
            ExportedGrid::decode("fog:v1:wide:AA"),
            Err(ExportDecodeError::InvalidDimensions(_))
        ));
        assert!(matches!(
            ExportedGrid::decode("fog:v1:2x2"),
            Err(ExportDecodeError::MissingPayload)
        ));
    }

    #[test]
    fn rejects_segments_after_payload() {
        let grid = exported(GridSize::square(2), &[GridCoord::new(0, 1)]);
        let extended = format!("{}:garbage", grid.encode());

        assert!(matches!(
            ExportedGrid::decode(&extended),
            Err(ExportDecodeError::TrailingData)
        ));
        assert!(matches!(
            ExportedGrid::decode("fog:v1:2x2:AAAAAA:"),
            Err(ExportDecodeError::TrailingData)
        ));
    }

    #[test]
    fn rejects_payload_with_wrong_cell_count() {
        let grid = exported(GridSize::square(2), &[]);
        let encoded = grid.encode().replacen("2x2", "4x4", 1);

        assert!(matches!(
            ExportedGrid::decode(&encoded),
            Err(ExportDecodeError::LengthMismatch {
                expected: 16,
                actual: 4
            })
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(
            ExportedGrid::decode("fog:v1:2x2:!!!!"),
            Err(ExportDecodeError::InvalidEncoding(_))
        ));
    }
}
