//! Synthetic Annex-B H.264 stream construction.

/// NAL header byte for an IDR slice with nal_ref_idc 3.
pub const IDR_HEADER: u8 = 0x65;
/// NAL header byte for a non-IDR slice with nal_ref_idc 2.
pub const NON_IDR_HEADER: u8 = 0x41;

/// Slice body whose prefix decodes as first_mb_in_slice=0, slice_type=7 (I).
pub const I_SLICE_BODY: [u8; 2] = [0b1000_1000, 0xD0];
/// Slice body whose prefix decodes as first_mb_in_slice=0, slice_type=0 (P).
pub const P_SLICE_BODY: [u8; 2] = [0b1100_0000, 0xD1];
/// Slice body whose prefix decodes as first_mb_in_slice=0, slice_type=1 (B).
pub const B_SLICE_BODY: [u8; 2] = [0b1010_0000, 0xD2];

/// Builds an Annex-B byte stream NAL by NAL, 4-byte start codes.
#[derive(Default)]
pub struct AnnexBBuilder {
    bytes: Vec<u8>,
}

impl AnnexBBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a NAL unit with the given header byte and body.
    pub fn nal(mut self, header: u8, body: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x01, header]);
        self.bytes.extend_from_slice(body);
        self
    }

    /// Append SPS + PPS stubs.
    pub fn parameter_sets(self) -> Self {
        self.nal(0x67, &[0x64, 0x00, 0x1F]).nal(0x68, &[0xE8, 0x43])
    }

    /// Append an IDR frame whose slice body carries `tag` as trailing
    /// payload, so individual frames remain byte-distinguishable.
    pub fn idr_frame(self, tag: u8) -> Self {
        let mut body = I_SLICE_BODY.to_vec();
        body.push(tag);
        self.nal(IDR_HEADER, &body)
    }

    /// Append a P frame tagged with `tag`.
    pub fn p_frame(self, tag: u8) -> Self {
        let mut body = P_SLICE_BODY.to_vec();
        body.push(tag);
        self.nal(NON_IDR_HEADER, &body)
    }

    /// Append a B frame tagged with `tag`.
    pub fn b_frame(self, tag: u8) -> Self {
        let mut body = B_SLICE_BODY.to_vec();
        body.push(tag);
        self.nal(NON_IDR_HEADER, &body)
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_start_code_delimited_stream() {
        let stream = AnnexBBuilder::new()
            .parameter_sets()
            .idr_frame(1)
            .p_frame(2)
            .build();

        assert_eq!(&stream[0..5], &[0x00, 0x00, 0x00, 0x01, 0x67]);
        let start_codes = stream
            .windows(4)
            .filter(|w| w == &[0x00, 0x00, 0x00, 0x01])
            .count();
        assert_eq!(start_codes, 4);
    }
}
