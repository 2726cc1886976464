//! Decoding of stored query-result buffers into rows plus a column
//! schema for display.

use serde::{Deserialize, Serialize};

use super::ClientError;

const SERVICE: &str = "result decoder";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Decodes a fetched binary buffer into a displayable table.
pub trait ResultDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ResultTable, ClientError>;
}

/// Decoder for the engine's JSON columnar layout:
/// `{"columns": [{"name", "data_type"}], "rows": [[..], ..]}`.
#[derive(Debug, Clone, Default)]
pub struct JsonResultDecoder;

impl ResultDecoder for JsonResultDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ResultTable, ClientError> {
        let table: ResultTable =
            serde_json::from_slice(bytes).map_err(|e| ClientError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        // Ragged rows would render misaligned against the column header
        let width = table.columns.len();
        if let Some(bad) = table.rows.iter().find(|r| r.len() != width) {
            return Err(ClientError::Decode {
                service: SERVICE,
                message: format!(
                    "row width {} does not match {} columns",
                    bad.len(),
                    width
                ),
            });
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_table() {
        let buf = br#"{
            "columns": [
                {"name": "id", "data_type": "int64"},
                {"name": "city", "data_type": "utf8"}
            ],
            "rows": [[1, "Berlin"], [2, "Osaka"]]
        }"#;

        let table = JsonResultDecoder.decode(buf).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns[1].name, "city");
    }

    #[test]
    fn test_decode_rejects_ragged_rows() {
        let buf = br#"{
            "columns": [{"name": "id", "data_type": "int64"}],
            "rows": [[1], [2, "extra"]]
        }"#;

        assert!(JsonResultDecoder.decode(buf).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(JsonResultDecoder.decode(b"not json").is_err());
    }
}
