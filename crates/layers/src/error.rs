use thiserror::Error;

/// Rejected layer definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no layers configured")]
    Empty,

    #[error("duplicate layer id: {0}")]
    DuplicateId(String),

    #[error("layer {id}: grid has {rows} rows, at most {max} are addressable")]
    GridTooTall { id: String, rows: u32, max: u32 },

    #[error("layer {id}: unknown inclusion mode {mode:?} (expected \"auto\" or a key set)")]
    UnknownInclusionMode { id: String, mode: String },
}
