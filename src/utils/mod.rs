pub mod identifiers;
pub use identifiers::{participant_identity, room_name};
