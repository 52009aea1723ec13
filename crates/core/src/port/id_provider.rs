// ID Provider Port (for deterministic testing)

/// ID provider interface (allows deterministic suffixes in tests)
///
/// Snapshot ids are assembled as `<kind>-<epoch_ms>-<suffix>`; the suffix
/// must be collision-resistant under concurrent capture within the same
/// millisecond, so a timestamp alone is not enough.
pub trait IdProvider: Send + Sync {
    /// Generate a random id suffix
    fn generate_suffix(&self) -> String;
}

/// UUID v4 provider (production): first 8 hex chars of a v4 UUID
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_suffix(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}
