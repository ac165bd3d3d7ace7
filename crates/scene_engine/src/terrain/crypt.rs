//! Map file obfuscation
//!
//! Mapping and attribute files are stored through a keyed XOR stream with a
//! running subtraction; attribute files additionally go through a three byte
//! XOR ("Bux") pass.

const XOR_KEY: [u8; 16] = [
    0xD1, 0x73, 0x52, 0xF6, 0xD2, 0x9A, 0xCB, 0x27, 0x3E, 0xAF, 0x59, 0x31, 0x37, 0xB3, 0xE7, 0xA2,
];

const XOR_SEED: u8 = 0x5E;
const XOR_STEP: u8 = 0x3D;

const BUX_KEY: [u8; 3] = [0xFC, 0xCF, 0xAB];

/// Decrypt a map file in place
pub fn xor_decrypt(data: &mut [u8]) {
    let mut running = XOR_SEED;
    for (i, byte) in data.iter_mut().enumerate() {
        let encrypted = *byte;
        *byte = (encrypted ^ XOR_KEY[i % XOR_KEY.len()]).wrapping_sub(running);
        running = encrypted.wrapping_add(XOR_STEP);
    }
}

/// Inverse of [`xor_decrypt`], for writing map files
pub fn xor_encrypt(data: &mut [u8]) {
    let mut running = XOR_SEED;
    for (i, byte) in data.iter_mut().enumerate() {
        let encrypted = byte.wrapping_add(running) ^ XOR_KEY[i % XOR_KEY.len()];
        *byte = encrypted;
        running = encrypted.wrapping_add(XOR_STEP);
    }
}

/// Apply the Bux transform in place; it is its own inverse
pub fn bux_convert(data: &mut [u8]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= BUX_KEY[i % BUX_KEY.len()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_bytes_decrypt() {
        // (0x00 ^ 0xD1) - 0x5E = 0x73, running becomes 0x3D
        let mut data = [0x00, 0x00];
        xor_decrypt(&mut data);
        assert_eq!(data[0], 0x73);
        assert_eq!(data[1], (0x00u8 ^ 0x73).wrapping_sub(0x3D));
    }

    #[test]
    fn test_encrypt_inverts_decrypt() {
        let plain: Vec<u8> = (0..=255).chain(0..40).collect();
        let mut data = plain.clone();
        xor_encrypt(&mut data);
        assert_ne!(data, plain);
        xor_decrypt(&mut data);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_bux_is_involution() {
        let mut data = [1, 2, 3, 4, 5];
        bux_convert(&mut data);
        assert_eq!(data, [1 ^ 0xFC, 2 ^ 0xCF, 3 ^ 0xAB, 4 ^ 0xFC, 5 ^ 0xCF]);
        bux_convert(&mut data);
        assert_eq!(data, [1, 2, 3, 4, 5]);
    }
}
