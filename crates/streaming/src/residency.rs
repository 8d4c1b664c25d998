use crate::error::AssetLoadError;

/// Lifecycle of one cached asset:
///
/// `Unrequested → Pending → {Ready | Failed}`
///
/// `Ready` and `Failed` are terminal until the entry is evicted; a later
/// reference then starts again from `Unrequested`. Being a single enum, an
/// entry can never be both loaded and in flight.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AssetState<A> {
    #[default]
    Unrequested,
    Pending,
    Ready(A),
    Failed(AssetLoadError),
}

impl<A> AssetState<A> {
    pub fn is_unrequested(&self) -> bool {
        matches!(self, AssetState::Unrequested)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AssetState::Failed(_))
    }

    pub fn asset(&self) -> Option<&A> {
        match self {
            AssetState::Ready(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&AssetLoadError> {
        match self {
            AssetState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<A> From<Result<A, AssetLoadError>> for AssetState<A> {
    fn from(result: Result<A, AssetLoadError>) -> Self {
        match result {
            Ok(asset) => AssetState::Ready(asset),
            Err(err) => AssetState::Failed(err),
        }
    }
}
