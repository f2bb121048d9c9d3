use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated document ids, matching hosted store auto-ids.
pub const GENERATED_ID_LEN: usize = 20;

/// Generate a random alphanumeric document id.
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ID_LEN)
        .map(char::from)
        .collect()
}
