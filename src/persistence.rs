//! Versioned parameter export/import (`spec.md` §4.2/§6): a small shape
//! header (format version, head/hidden/embedding dims) followed by the
//! bincode-encoded `LevelParamStore` body, so a shape mismatch is
//! caught before the (potentially large) body is even decoded.

use std::io::Cursor;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, PersistenceError};
use crate::params::LevelParamStore;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct ShapeHeader {
    version: u32,
    num_heads: usize,
    hidden_dim: usize,
    embedding_dim: usize,
    max_level: usize,
}

/// Serialises `store` into `[header][body]`, both bincode-encoded.
pub fn export_parameters(store: &LevelParamStore) -> Result<Vec<u8>, CoreError> {
    let header = ShapeHeader {
        version: FORMAT_VERSION,
        num_heads: store.num_heads,
        hidden_dim: store.hidden_dim,
        embedding_dim: store.embedding_dim,
        max_level: store.max_level(),
    };
    let mut bytes =
        bincode::serialize(&header).map_err(|e| PersistenceError::Decode(e.to_string()))?;
    let body = bincode::serialize(store).map_err(|e| PersistenceError::Decode(e.to_string()))?;
    bytes.extend(body);
    Ok(bytes)
}

/// Deserialises bytes produced by [`export_parameters`]. Validates the
/// format version and, if `expected_shape` is given, that the header's
/// dimensions match before decoding the (larger) body.
pub fn import_parameters(
    bytes: &[u8],
    expected_shape: Option<(usize, usize, usize)>,
) -> Result<LevelParamStore, CoreError> {
    let mut cursor = Cursor::new(bytes);
    let header: ShapeHeader = bincode::deserialize_from(&mut cursor)
        .map_err(|e| PersistenceError::Decode(e.to_string()))?;

    if header.version != FORMAT_VERSION {
        return Err(PersistenceError::VersionMismatch {
            expected: FORMAT_VERSION,
            got: header.version,
        }
        .into());
    }

    if let Some((num_heads, hidden_dim, embedding_dim)) = expected_shape {
        if header.num_heads != num_heads
            || header.hidden_dim != hidden_dim
            || header.embedding_dim != embedding_dim
        {
            return Err(PersistenceError::ShapeMismatch {
                expected_heads: num_heads,
                expected_hidden: hidden_dim,
                expected_embedding: embedding_dim,
                got_heads: header.num_heads,
                got_hidden: header.hidden_dim,
                got_embedding: header.embedding_dim,
            }
            .into());
        }
    }

    let store: LevelParamStore = bincode::deserialize_from(&mut cursor)
        .map_err(|e| PersistenceError::Decode(e.to_string()))?;
    Ok(store)
}
