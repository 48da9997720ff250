//! ID port used when naming new workspaces.

/// Source of fresh identifiers.
///
/// Workspaces keep the first eight hex digits, so implementations should
/// vary the leading characters.
pub trait IdGenerator: Send + Sync {
    /// Returns an identifier not handed out before.
    fn generate_id(&self) -> String;
}
