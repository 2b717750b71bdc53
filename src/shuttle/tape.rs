//! Source tape model: a contiguous run of colored segments on a frame grid.
//!
//! Every boundary on the tape is a multiple of [`FRAME_PIXELS`], so marks and
//! stop points always land frame-accurate. Segments are half-open intervals
//! `[x, x + width)` laid out from 0 with no gaps; adjacent segments never
//! share a color at generation time (ripple splices may later leave same-color
//! neighbors, which is fine; the constraint only shapes fresh tapes).

/// Pixel width of one frame on the tape; the quantum every position snaps to.
pub const FRAME_PIXELS: f64 = 6.0;

/// Segments on a freshly generated source tape.
pub const SEGMENT_COUNT: usize = 200;

/// Segment width bounds in tape pixels, before rounding to the frame grid.
pub const MIN_SEG_WIDTH: f64 = 24.0;
pub const MAX_SEG_WIDTH: f64 = 240.0;

/// The six tape colors. Also indexes the scrub-tone scale in standard mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

pub const PALETTE: [Color; 6] = [
    Color::Red,
    Color::Orange,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Purple,
];

impl Color {
    pub fn css(self) -> &'static str {
        match self {
            Color::Red => "#e05252",
            Color::Orange => "#e0914d",
            Color::Yellow => "#e0c94d",
            Color::Green => "#5cb85c",
            Color::Blue => "#5b8fd9",
            Color::Purple => "#9b6fd0",
        }
    }

    /// Parse a palette name from the presentation layer ("red", "Blue", ...).
    pub fn from_name(name: &str) -> Option<Color> {
        match name.to_ascii_lowercase().as_str() {
            "red" => Some(Color::Red),
            "orange" => Some(Color::Orange),
            "yellow" => Some(Color::Yellow),
            "green" => Some(Color::Green),
            "blue" => Some(Color::Blue),
            "purple" => Some(Color::Purple),
            _ => None,
        }
    }
}

/// One contiguous run of a single color on the source tape.
#[derive(Clone, Copy, Debug)]
pub struct Segment {
    pub id: u32,
    pub x: f64,
    pub width: f64,
    pub color: Color,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.x + self.width
    }
}

/// Small LCG on the same multiplier/increment the prototype randomness used.
/// Deterministic given a seed so tape generation is replayable in tests.
#[derive(Clone, Debug)]
pub struct Lcg(u32);

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Lcg(seed)
    }

    pub fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1664525).wrapping_add(1013904223);
        self.0
    }

    /// Uniform index into `0..len` (len 0 maps to 0).
    pub fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.next() as usize % len
    }

    /// Uniform sample in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        f64::from(self.next()) / (f64::from(u32::MAX) + 1.0)
    }
}

/// The remaining, not-yet-extracted source tape.
#[derive(Clone, Debug, Default)]
pub struct Tape {
    segments: Vec<Segment>,
    next_id: u32,
}

impl Tape {
    /// Generate a fresh source tape: frame-quantized widths drawn uniformly
    /// from the width bounds, colors uniform with no adjacent repeat.
    pub fn generate(seed: u32) -> Self {
        let mut rng = Lcg::new(seed);
        let mut segments = Vec::with_capacity(SEGMENT_COUNT);
        let mut x = 0.0;
        let mut prev: Option<usize> = None;
        for id in 0..SEGMENT_COUNT {
            let raw = MIN_SEG_WIDTH + rng.unit() * (MAX_SEG_WIDTH - MIN_SEG_WIDTH);
            let width = (raw / FRAME_PIXELS).round().max(1.0) * FRAME_PIXELS;
            // Offset draw over the other five colors guarantees the no-repeat rule.
            let cidx = match prev {
                None => rng.pick(PALETTE.len()),
                Some(p) => (p + 1 + rng.pick(PALETTE.len() - 1)) % PALETTE.len(),
            };
            segments.push(Segment {
                id: id as u32,
                x,
                width,
                color: PALETTE[cidx],
            });
            x += width;
            prev = Some(cidx);
        }
        Tape {
            segments,
            next_id: SEGMENT_COUNT as u32,
        }
    }

    /// Build a tape from prepared segments (scripted runs, tests).
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let next_id = segments.iter().map(|s| s.id + 1).max().unwrap_or(0);
        Tape { segments, next_id }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_width(&self) -> f64 {
        self.segments.last().map(Segment::end).unwrap_or(0.0)
    }

    /// The segment whose half-open interval contains `x`, if any.
    pub fn segment_at(&self, x: f64) -> Option<&Segment> {
        if x < 0.0 {
            return None;
        }
        let i = self.segments.partition_point(|s| s.end() <= x);
        self.segments.get(i).filter(|s| s.x <= x)
    }

    /// Ripple-delete the half-open range `[start, end)`: content before stays,
    /// content straddling the edges is truncated, everything after shifts left
    /// by the removed length. The tape stays contiguous with no gaps.
    pub fn ripple_delete(&mut self, start: f64, end: f64) {
        debug_assert!(end > start);
        let removed = end - start;
        let mut out = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            let (s0, s1) = (seg.x, seg.end());
            if s1 <= start {
                out.push(*seg);
            } else if s0 >= end {
                out.push(Segment {
                    x: s0 - removed,
                    ..*seg
                });
            } else {
                let lead = start - s0;
                if lead > 0.0 {
                    out.push(Segment {
                        width: lead,
                        ..*seg
                    });
                }
                let tail = s1 - end;
                if tail > 0.0 {
                    // A segment containing the whole range splits in two; the
                    // right half needs its own id.
                    let id = if lead > 0.0 {
                        let id = self.next_id;
                        self.next_id += 1;
                        id
                    } else {
                        seg.id
                    };
                    out.push(Segment {
                        id,
                        x: start,
                        width: tail,
                        color: seg.color,
                    });
                }
            }
        }
        self.segments = out;
    }
}
