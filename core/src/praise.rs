/// Canned praise shown when the server is unreachable or the praise poll
/// gives up. Picked deterministically per moment so the same moment always
/// shows the same line.
pub const OFFLINE_PRAISE: &[&str] = &[
    "That counts. Every small step does.",
    "Look at you, showing up for yourself.",
    "Noted, and worth being proud of.",
    "Small win logged. They add up faster than you think.",
    "You did the thing. That's the whole trick.",
    "One more brick in the wall. Nice work.",
    "Future you says thanks.",
    "Quietly impressive. Keep going.",
];

/// FNV-1a 64-bit hash. Used wherever a stable, seed-free value is needed
/// from a moment uuid (offline praise pick, galaxy placement).
#[must_use]
pub fn fnv1a64(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Stable offline praise line for a moment uuid.
#[must_use]
pub fn offline_praise_for(uuid: &str) -> &'static str {
    let idx = (fnv1a64(uuid) % OFFLINE_PRAISE.len() as u64) as usize;
    OFFLINE_PRAISE[idx]
}
