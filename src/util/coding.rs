/// Appends `v` to `dst` as 8 little-endian bytes.
pub fn put_fixed_64(dst: &mut Vec<u8>, v: u64) {
    dst.extend_from_slice(&v.to_le_bytes());
}

/// Decodes the first 8 bytes of `src` as a little-endian u64.
///
/// Panics if `src` holds fewer than 8 bytes.
pub fn decode_fixed_64(src: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&src[..8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_64() {
        let mut buf = vec![];
        put_fixed_64(&mut buf, 0);
        put_fixed_64(&mut buf, 1 << 56);
        put_fixed_64(&mut buf, u64::MAX);
        assert_eq!(decode_fixed_64(&buf[0..]), 0);
        assert_eq!(decode_fixed_64(&buf[8..]), 1 << 56);
        assert_eq!(decode_fixed_64(&buf[16..]), u64::MAX);
    }
}
