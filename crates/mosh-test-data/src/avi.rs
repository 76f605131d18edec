//! Synthetic AVI construction.

/// idx1 keyframe flag.
const AVIIF_KEYFRAME: u32 = 0x10;

/// An MPEG-4 ASP frame payload: VOP start code, coding-type byte, filler.
///
/// `coding_type` uses the 2-bit VOP values (0 I, 1 P, 2 B, 3 S).
pub fn vop_payload(coding_type: u8, filler: &[u8]) -> Vec<u8> {
    let mut payload = vec![0x00, 0x00, 0x01, 0xB6, (coding_type & 0b11) << 6];
    payload.extend_from_slice(filler);
    payload
}

struct PendingFrame {
    payload: Vec<u8>,
    is_key: bool,
}

/// Builds a single-video-stream AVI with proper hdrl, movi, and idx1
/// structure around caller-supplied frame payloads.
pub struct AviBuilder {
    frames: Vec<PendingFrame>,
    handler: [u8; 4],
    write_idx1: bool,
}

impl Default for AviBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AviBuilder {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            handler: *b"xvid",
            write_idx1: true,
        }
    }

    /// Override the strh handler FourCC (default `xvid`).
    pub fn handler(mut self, fourcc: [u8; 4]) -> Self {
        self.handler = fourcc;
        self
    }

    /// Skip the idx1 chunk.
    pub fn without_idx1(mut self) -> Self {
        self.write_idx1 = false;
        self
    }

    /// Append an MPEG-4 ASP frame: an I-VOP when `is_key`, else a P-VOP,
    /// padded out with `filler`.
    pub fn frame(self, is_key: bool, filler: &[u8]) -> Self {
        let coding_type = if is_key { 0 } else { 1 };
        self.raw_frame(vop_payload(coding_type, filler), is_key)
    }

    /// Append a frame with an exact payload.
    pub fn raw_frame(mut self, payload: Vec<u8>, is_key: bool) -> Self {
        self.frames.push(PendingFrame { payload, is_key });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes()); // patched at the end
        out.extend_from_slice(b"AVI ");

        self.write_hdrl(&mut out);

        // LIST movi
        let movi_list_pos = out.len();
        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&0u32.to_le_bytes()); // patched below
        out.extend_from_slice(b"movi");
        let movi_fourcc_pos = movi_list_pos + 8;

        let mut index = Vec::new();
        for frame in &self.frames {
            let chunk_pos = out.len();
            out.extend_from_slice(b"00dc");
            out.extend_from_slice(&(frame.payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&frame.payload);
            if frame.payload.len() % 2 == 1 {
                out.push(0);
            }
            index.push((
                (chunk_pos - movi_fourcc_pos) as u32,
                frame.payload.len() as u32,
                frame.is_key,
            ));
        }

        let movi_size = (out.len() - movi_list_pos - 8) as u32;
        out[movi_list_pos + 4..movi_list_pos + 8].copy_from_slice(&movi_size.to_le_bytes());

        if self.write_idx1 {
            out.extend_from_slice(b"idx1");
            out.extend_from_slice(&((index.len() * 16) as u32).to_le_bytes());
            for (offset, size, is_key) in index {
                out.extend_from_slice(b"00dc");
                let flags = if is_key { AVIIF_KEYFRAME } else { 0 };
                out.extend_from_slice(&flags.to_le_bytes());
                out.extend_from_slice(&offset.to_le_bytes());
                out.extend_from_slice(&size.to_le_bytes());
            }
        }

        let riff_size = (out.len() - 8) as u32;
        out[4..8].copy_from_slice(&riff_size.to_le_bytes());
        out
    }

    fn write_hdrl(&self, out: &mut Vec<u8>) {
        let n = self.frames.len() as u32;

        // hdrl = avih (56) + LIST strl (strh 56 + strf 40)
        let strl_size = 4 + 8 + 56 + 8 + 40;
        let hdrl_size = 4 + 8 + 56 + 8 + strl_size;

        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&(hdrl_size as u32).to_le_bytes());
        out.extend_from_slice(b"hdrl");

        // avih: MainAVIHeader
        out.extend_from_slice(b"avih");
        out.extend_from_slice(&56u32.to_le_bytes());
        out.extend_from_slice(&33_333u32.to_le_bytes()); // dwMicroSecPerFrame
        out.extend_from_slice(&0u32.to_le_bytes()); // dwMaxBytesPerSec
        out.extend_from_slice(&0u32.to_le_bytes()); // dwPaddingGranularity
        let flags = if self.write_idx1 { 0x10u32 } else { 0 }; // AVIF_HASINDEX
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&n.to_le_bytes()); // dwTotalFrames
        out.extend_from_slice(&0u32.to_le_bytes()); // dwInitialFrames
        out.extend_from_slice(&1u32.to_le_bytes()); // dwStreams
        out.extend_from_slice(&0u32.to_le_bytes()); // dwSuggestedBufferSize
        out.extend_from_slice(&320u32.to_le_bytes()); // dwWidth
        out.extend_from_slice(&240u32.to_le_bytes()); // dwHeight
        out.extend_from_slice(&[0u8; 16]); // dwReserved

        // LIST strl
        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&(strl_size as u32).to_le_bytes());
        out.extend_from_slice(b"strl");

        // strh: AVIStreamHeader
        out.extend_from_slice(b"strh");
        out.extend_from_slice(&56u32.to_le_bytes());
        out.extend_from_slice(b"vids"); // fccType
        out.extend_from_slice(&self.handler); // fccHandler
        out.extend_from_slice(&0u32.to_le_bytes()); // dwFlags
        out.extend_from_slice(&0u32.to_le_bytes()); // wPriority + wLanguage
        out.extend_from_slice(&0u32.to_le_bytes()); // dwInitialFrames
        out.extend_from_slice(&1u32.to_le_bytes()); // dwScale
        out.extend_from_slice(&30u32.to_le_bytes()); // dwRate
        out.extend_from_slice(&0u32.to_le_bytes()); // dwStart
        out.extend_from_slice(&n.to_le_bytes()); // dwLength
        out.extend_from_slice(&0u32.to_le_bytes()); // dwSuggestedBufferSize
        out.extend_from_slice(&0u32.to_le_bytes()); // dwQuality
        out.extend_from_slice(&0u32.to_le_bytes()); // dwSampleSize
        out.extend_from_slice(&[0u8; 8]); // rcFrame

        // strf: BITMAPINFOHEADER
        out.extend_from_slice(b"strf");
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&40u32.to_le_bytes()); // biSize
        out.extend_from_slice(&320u32.to_le_bytes()); // biWidth
        out.extend_from_slice(&240u32.to_le_bytes()); // biHeight
        out.extend_from_slice(&1u16.to_le_bytes()); // biPlanes
        out.extend_from_slice(&24u16.to_le_bytes()); // biBitCount
        out.extend_from_slice(&self.handler); // biCompression
        out.extend_from_slice(&0u32.to_le_bytes()); // biSizeImage
        out.extend_from_slice(&[0u8; 16]); // resolution + color fields
    }
}
