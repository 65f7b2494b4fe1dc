// Masks or unmasks a buffer with payload bytes. The offset is the offset of the buffer within the
// frames payload segment. Any multiple of 4 may be added to or subtracted from the offset without
// any effect on the result. Applying the same key twice restores the input.
pub fn mask(key: [u8; 4], mut offset: usize, buffer: &mut [u8]) {
    if key != [0u8, 0u8, 0u8, 0u8] {
        for byte in buffer.iter_mut() {
            *byte ^= key[offset & 3];
            offset = offset.wrapping_add(1);
        }
    }
}

/// Splits a 32-bit masking key into the byte order used on the wire, most significant first.
pub fn masking_key(key: u32) -> [u8; 4] {
    key.to_be_bytes()
}
