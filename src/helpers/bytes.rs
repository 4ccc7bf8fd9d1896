//! Little-endian field decoding shared by the compound file and BIFF8 readers.

macro_rules! le_decoder {
    ($name:ident, $kind:ty) => {
        #[inline]
        pub(crate) fn $name(bytes: &[u8]) -> $kind {
            const WIDTH: usize = std::mem::size_of::<$kind>();
            let mut raw = [0u8; WIDTH];
            raw.copy_from_slice(&bytes[..WIDTH]);
            <$kind>::from_le_bytes(raw)
        }
    };
}

le_decoder!(to_u16, u16);
le_decoder!(to_u32, u32);
le_decoder!(to_u64, u64);
le_decoder!(to_f64, f64);

/// Decodes a 32-bit little-endian field as an index.
#[inline]
pub(crate) fn to_usize(bytes: &[u8]) -> usize {
    to_u32(bytes) as usize
}

/// Splits a sector into its 32-bit sector identifiers.
pub(crate) fn to_sector_ids(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(to_usize)
}
