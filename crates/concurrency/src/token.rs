//! Lease owner tokens

use leaselog_core::TokenGenerator;
use uuid::Uuid;

/// Random v4 UUID tokens in simple (32 hex chars) form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenGenerator;

impl TokenGenerator for UuidTokenGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
