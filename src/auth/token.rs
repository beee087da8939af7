use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{self, RngCore};

/// Opaque random material for temporary credentials and code suffixes.
pub fn generate_opaque_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tokens_are_distinct() {
        assert_ne!(generate_opaque_token(16), generate_opaque_token(16));
    }
}
