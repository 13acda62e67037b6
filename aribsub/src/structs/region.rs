//! Positioned, styled and timed caption text.

/// One run of caption text with uniform style.
///
/// Positions and sizes are in caption plane pixels. `start` and `stop`
/// are 90 kHz clock ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRegion {
    pub text: String,
    pub font_family: String,
    /// `0xRRGGBB`.
    pub font_color: u32,
    pub plane_width: u32,
    pub plane_height: u32,
    pub font_width: u32,
    pub font_height: u32,
    pub vertical_interval: u32,
    pub horizontal_interval: u32,
    pub left: i32,
    pub bottom: i32,
    pub start: u64,
    pub stop: u64,
}

/// Top-left anchored placement derived from a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPlacement {
    pub x: i32,
    pub y: i32,
    pub font_size: u32,
    pub spacing: u32,
    pub halfwidth: bool,
}

impl TextRegion {
    /// Placement for compositors that anchor text at the top-left corner
    /// of the first character cell.
    pub fn placement(&self) -> RegionPlacement {
        let cell_width = (self.font_width + self.horizontal_interval) as i32;
        let cell_height = (self.font_height + self.vertical_interval) as i32;

        RegionPlacement {
            x: self.left - cell_width,
            y: self.bottom - cell_height,
            font_size: if self.font_height == 36 {
                40
            } else {
                self.font_height
            },
            spacing: self.horizontal_interval + self.font_width,
            halfwidth: self.font_width != self.font_height,
        }
    }

    pub fn is_ruby(&self) -> bool {
        self.font_height == 18
    }
}

/// The regions produced by one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleEvent {
    pub start: u64,
    pub stop: u64,
    /// Set when the frame carries no duration, i.e. `start == stop`.
    pub ephemeral: bool,
    pub regions: Vec<TextRegion>,
}

impl SubtitleEvent {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region texts joined with line breaks.
    pub fn text(&self) -> String {
        self.regions
            .iter()
            .map(|region| region.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(font_width: u32, font_height: u32) -> TextRegion {
        TextRegion {
            text: "字幕".into(),
            font_family: "sans-serif".into(),
            font_color: 0xFFFFFF,
            plane_width: 960,
            plane_height: 540,
            font_width,
            font_height,
            vertical_interval: 24,
            horizontal_interval: 4,
            left: 200,
            bottom: 480,
            start: 0,
            stop: 0,
        }
    }

    #[test]
    fn placement_of_normal_size() {
        let placement = region(36, 36).placement();
        assert_eq!(placement.x, 160);
        assert_eq!(placement.y, 420);
        assert_eq!(placement.font_size, 40);
        assert_eq!(placement.spacing, 40);
        assert!(!placement.halfwidth);
    }

    #[test]
    fn placement_of_medium_size() {
        let placement = region(18, 36).placement();
        assert_eq!(placement.x, 178);
        assert_eq!(placement.font_size, 40);
        assert!(placement.halfwidth);

        let small = region(18, 18);
        assert!(small.is_ruby());
        assert_eq!(small.placement().font_size, 18);
    }
}
