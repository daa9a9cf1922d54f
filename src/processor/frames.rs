//! Frame deduplication.

use crate::model::RawFrame;
use std::collections::HashMap;

/// Pixels in one 8×8 frame.
pub const FRAME_PIXELS: usize = 64;

#[derive(Debug, Default)]
pub struct FrameAtlas {
    /// Distinct bitmaps, in order of first appearance.
    pub unique: Vec<Vec<u8>>,
    /// Document frame index → position in `unique`.
    index_of: Vec<usize>,
}

impl FrameAtlas {
    /// Empty frame slots map to index 0.
    pub fn build(frames: &[RawFrame]) -> Self {
        let mut seen: HashMap<&[u8], usize> = HashMap::new();
        let mut atlas = FrameAtlas::default();

        for frame in frames {
            let idx = match frame {
                RawFrame::Data { data } => *seen.entry(data.as_slice()).or_insert_with(|| {
                    atlas.unique.push(data.clone());
                    atlas.unique.len() - 1
                }),
                RawFrame::Empty(_) => 0,
            };
            atlas.index_of.push(idx);
        }

        log::debug!(
            "{} frame(s), {} distinct",
            atlas.index_of.len(),
            atlas.unique.len()
        );
        atlas
    }

    pub fn index_of(&self, frame: usize) -> Option<usize> {
        self.index_of.get(frame).copied()
    }
}

/// One byte per row, leftmost pixel in the high bit. A set bit is paper,
/// a clear bit is ink.
pub fn pack_frames(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frames.len() * 8);
    for frame in frames {
        for row in 0..8 {
            let mut byte = 0u8;
            for col in 0..8 {
                let p = frame.get(row * 8 + col).copied().unwrap_or(0);
                byte = (byte << 1) | (1 - p % 2);
            }
            out.push(byte);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn frame(fill: u8) -> RawFrame {
        RawFrame::Data {
            data: vec![fill; FRAME_PIXELS],
        }
    }

    #[test]
    fn test_dedup_by_content() {
        let frames = vec![
            frame(0),
            frame(1),
            RawFrame::Empty(Value::Bool(false)),
            frame(0),
            frame(1),
        ];
        let atlas = FrameAtlas::build(&frames);

        assert_eq!(atlas.unique.len(), 2);
        let test_cases = vec![(0, Some(0)), (1, Some(1)), (2, Some(0)), (3, Some(0)), (4, Some(1)), (5, None)];
        for (input, expected) in test_cases {
            assert_eq!(atlas.index_of(input), expected, "frame {input}");
        }
    }

    #[test]
    fn test_pack_rows_msb_first() {
        let mut data = vec![0u8; FRAME_PIXELS];
        data[0] = 1; // top-left ink
        data[15] = 1; // right end of the second row
        let packed = pack_frames(&[data, vec![1; FRAME_PIXELS]]);

        assert_eq!(packed.len(), 16);
        assert_eq!(packed[0], 0b0111_1111);
        assert_eq!(packed[1], 0b1111_1110);
        assert_eq!(&packed[2..8], &[0xff; 6]);
        assert_eq!(&packed[8..], &[0u8; 8]);
    }
}
