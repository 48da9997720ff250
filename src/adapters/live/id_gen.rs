//! Random UUID identifiers.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Produces random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_uuids() {
        let a = LiveIdGenerator.generate_id();
        let b = LiveIdGenerator.generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
