/// Tower middleware for the API server
///
/// Authentication lives in [`crate::app`] because it needs `AppState`; this
/// module holds the state-free layers.

pub mod security;
