use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN};
use crate::error::{Error, Result};

/// Encrypt plaintext, returning `ciphertext ‖ tag`. `aad` is authenticated
/// but not encrypted.
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| Error::Encryption("cipher rejected plaintext".into()))
}

/// Verify the tag and decrypt. Nothing is released unless the tag matches.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::AuthenticationFailed)?;
    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TAG_LEN;

    #[test]
    fn output_carries_appended_tag() {
        let ct = seal(&[3u8; KEY_LEN], &[4u8; NONCE_LEN], b"master", &[]).unwrap();
        assert_eq!(ct.len(), b"master".len() + TAG_LEN);
    }

    #[test]
    fn open_reverses_seal() {
        let key = [3u8; KEY_LEN];
        let nonce = [4u8; NONCE_LEN];

        let ct = seal(&key, &nonce, b"master", b"hdr").unwrap();
        let pt = open(&key, &nonce, &ct, b"hdr").unwrap();

        assert_eq!(pt.as_slice(), b"master");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let nonce = [4u8; NONCE_LEN];
        let ct = seal(&[3u8; KEY_LEN], &nonce, b"master", &[]).unwrap();

        assert!(matches!(
            open(&[5u8; KEY_LEN], &nonce, &ct, &[]),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn wrong_nonce_fails_authentication() {
        let key = [3u8; KEY_LEN];
        let ct = seal(&key, &[4u8; NONCE_LEN], b"master", &[]).unwrap();

        assert!(matches!(
            open(&key, &[6u8; NONCE_LEN], &ct, &[]),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn changed_associated_data_fails_authentication() {
        let key = [3u8; KEY_LEN];
        let nonce = [4u8; NONCE_LEN];
        let ct = seal(&key, &nonce, b"master", b"PS\x01").unwrap();

        assert!(matches!(
            open(&key, &nonce, &ct, b"PS\x02"),
            Err(Error::AuthenticationFailed)
        ));
        assert!(matches!(
            open(&key, &nonce, &ct, &[]),
            Err(Error::AuthenticationFailed)
        ));
    }

    #[test]
    fn round_keys_are_wiped_on_drop() {
        fn assert_zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<aes::Aes256>();
    }
}
