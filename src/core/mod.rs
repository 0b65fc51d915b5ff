//! Fingerprint engine: data model, extraction, reference storage, validation

pub mod extractor;
pub mod fingerprint;
pub mod reference_store;
pub mod session;
pub mod validator;
