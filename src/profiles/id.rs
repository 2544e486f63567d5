use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate an entity id: unix millis, a dash, then 9 random base36 chars.
///
/// 36^9 (~1e14) suffixes per millisecond make collisions within one store
/// negligible.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Current time at millisecond precision, the resolution persisted
/// timestamps carry.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
