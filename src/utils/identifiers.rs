//! Room and participant name generation.
//!
//! Names are a fixed prefix plus a random number in `0..10_000`. They are not
//! cryptographically random and two requests can collide; the provider treats
//! a repeated room name as the same room.

use rand::Rng;

pub const ROOM_NAME_PREFIX: &str = "voice_assistant_room_";
pub const PARTICIPANT_IDENTITY_PREFIX: &str = "voice_assistant_user_";

/// Exclusive upper bound of the numeric suffix.
pub const SUFFIX_BOUND: u32 = 10_000;

fn random_suffix() -> u32 {
    rand::thread_rng().gen_range(0..SUFFIX_BOUND)
}

pub fn room_name() -> String {
    format!("{ROOM_NAME_PREFIX}{}", random_suffix())
}

pub fn participant_identity() -> String {
    format!("{PARTICIPANT_IDENTITY_PREFIX}{}", random_suffix())
}
