//! Depth-agnostic channel access over raw RGBA pixel bytes.
//!
//! Filters in this crate work on both 8- and 16-bit buffers. These
//! helpers address storage by *channel index* (pixel index × 4 plus the
//! channel) and hide the byte layout: one byte per channel at 8-bit
//! depth, two native-endian bytes at 16-bit.

/// Channels per pixel in storage (RGBA, alpha always present).
pub(crate) const CHANNELS: usize = 4;

/// Full-scale channel value for the given depth.
pub(crate) const fn max_value(sixteen_bit: bool) -> u32 {
    if sixteen_bit { 65535 } else { 255 }
}

/// Read channel `idx` from `data`.
pub(crate) fn get(data: &[u8], sixteen_bit: bool, idx: usize) -> u32 {
    if sixteen_bit {
        let off = idx * 2;
        u32::from(u16::from_ne_bytes([data[off], data[off + 1]]))
    } else {
        u32::from(data[idx])
    }
}

/// Write channel `idx` in `data`, clamping to the depth's full scale.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn set(data: &mut [u8], sixteen_bit: bool, idx: usize, value: u32) {
    if sixteen_bit {
        let off = idx * 2;
        let clamped = value.min(65535) as u16;
        data[off..off + 2].copy_from_slice(&clamped.to_ne_bytes());
    } else {
        data[idx] = value.min(255) as u8;
    }
}

/// Percent completed after processing band `index` out of `total`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn band_progress(index: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    ((u64::from(index) + 1) * 100 / u64::from(total)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_round_trip() {
        let mut data = vec![0u8; 8];
        set(&mut data, false, 3, 200);
        assert_eq!(get(&data, false, 3), 200);
        set(&mut data, false, 0, 300);
        assert_eq!(get(&data, false, 0), 255, "8-bit writes clamp at 255");
    }

    #[test]
    fn sixteen_bit_round_trip() {
        let mut data = vec![0u8; 16];
        set(&mut data, true, 2, 40000);
        assert_eq!(get(&data, true, 2), 40000);
        set(&mut data, true, 0, 70000);
        assert_eq!(get(&data, true, 0), 65535, "16-bit writes clamp at 65535");
    }

    #[test]
    fn band_progress_reaches_exactly_one_hundred() {
        assert_eq!(band_progress(0, 4), 25);
        assert_eq!(band_progress(3, 4), 100);
        assert_eq!(band_progress(0, 1), 100);
    }
}
