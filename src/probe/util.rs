use rand::{Rng, distributions::Alphanumeric};

const SYNTHETIC_LOCAL_LEN: usize = 20;

/// A local part nobody registers: 20 random lowercase alphanumerics.
pub(crate) fn random_local_part() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SYNTHETIC_LOCAL_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}
