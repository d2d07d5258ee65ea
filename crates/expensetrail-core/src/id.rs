use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random part of generated ids.
const SUFFIX_LEN: usize = 11;

/// Random lowercase base-36 suffix that keeps ids distinct when several are
/// minted within the same millisecond.
pub(crate) fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// `<millis>-<suffix>`
pub(crate) fn timestamped(millis: i64) -> String {
    format!("{}-{}", millis, random_suffix())
}
