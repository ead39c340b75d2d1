use thiserror::Error;

/// Failures surfaced by checked indexed access.
///
/// Plain lookups report absence through their return value (`bool`,
/// `Option`); only [`crate::AvlMap::value_mut`] fails hard, since it must
/// hand out a live mutable reference and has no way to represent "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MapError {
    /// The requested key is not stored in the map.
    #[error("key not found")]
    KeyNotFound,
}
