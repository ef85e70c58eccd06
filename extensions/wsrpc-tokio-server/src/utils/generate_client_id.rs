use crate::constants::CLIENT_ID_LENGTH;
use rand::{Rng, distr::Alphanumeric};

/// Generates an opaque client id from the thread-local CSPRNG.
///
/// Ids are not sequential and cannot be guessed from previously issued ones.
pub fn generate_client_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CLIENT_ID_LENGTH)
        .map(char::from)
        .collect()
}
