//! ARIB STD-B24 eight-unit code.
//!
//! Four graphic sets G0 to G3 are designated with escape sequences and
//! invoked into GL (0x21 to 0x7E) and GR (0xA1 to 0xFE) by locking or
//! single shifts. C0 and C1 controls move the active position and change
//! character size and color; every such change closes the current region.
//!
//! The initial state is G0 = kanji, G1 = alphanumeric, G2 = hiragana,
//! G3 = macro, GL = G0 and GR = G2, on a 960x540 plane with 36x36 fonts,
//! a horizontal interval of 4 and a vertical interval of 24.

use std::time::Duration;

use anyhow::Result;
use encoding_rs::EUC_JP;
use log::{debug, trace};

use crate::text::symbols::additional_symbol;
use crate::text::{DecodedRegion, DecodedText, DrcsContext, TextDecoder};
use crate::utils::errors::TextError;

/// Substituted for characters that cannot be represented.
pub const GETA: char = '\u{3013}';

/// Default macros 0x60 to 0x6F.
pub const DEFAULT_MACROS: [&[u8]; 16] = [
    b"\x1B\x24\x42\x1B\x29\x4A\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x31\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x41\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x32\x1B\x29\x34\x1B\x2A\x35\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x32\x1B\x29\x33\x1B\x2A\x35\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x32\x1B\x29\x20\x41\x1B\x2A\x35\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x41\x1B\x29\x20\x42\x1B\x2A\x20\x43\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x44\x1B\x29\x20\x45\x1B\x2A\x20\x46\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x47\x1B\x29\x20\x48\x1B\x2A\x20\x49\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x4A\x1B\x29\x20\x4B\x1B\x2A\x20\x4C\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x20\x4D\x1B\x29\x20\x4E\x1B\x2A\x20\x4F\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x42\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x43\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x24\x42\x1B\x29\x20\x44\x1B\x2A\x30\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x31\x1B\x29\x30\x1B\x2A\x4A\x1B\x2B\x20\x70\x0F\x1B\x7D",
    b"\x1B\x28\x4A\x1B\x29\x32\x1B\x2A\x20\x41\x1B\x2B\x20\x70\x0F\x1B\x7D",
];

/// Colors selected by BKF to WHF.
pub const BASIC_COLORS: [u32; 8] = [
    0x000000, 0xFF0000, 0x00FF00, 0xFFFF00, 0x0000FF, 0xFF00FF, 0x00FFFF, 0xFFFFFF,
];

// C0
const NUL: u8 = 0x00;
const BEL: u8 = 0x07;
const APB: u8 = 0x08;
const APF: u8 = 0x09;
const APD: u8 = 0x0A;
const APU: u8 = 0x0B;
const CS: u8 = 0x0C;
const APR: u8 = 0x0D;
const LS1: u8 = 0x0E;
const LS0: u8 = 0x0F;
const PAPF: u8 = 0x16;
const CAN: u8 = 0x18;
const SS2: u8 = 0x19;
const ESC: u8 = 0x1B;
const APS: u8 = 0x1C;
const SS3: u8 = 0x1D;
const RS: u8 = 0x1E;
const US: u8 = 0x1F;
const SP: u8 = 0x20;
const DEL: u8 = 0x7F;

// C1
const SSZ: u8 = 0x88;
const MSZ: u8 = 0x89;
const NSZ: u8 = 0x8A;
const SZX: u8 = 0x8B;
const COL: u8 = 0x90;
const FLC: u8 = 0x91;
const CDC: u8 = 0x92;
const POL: u8 = 0x93;
const WMM: u8 = 0x94;
const MACRO: u8 = 0x95;
const HLC: u8 = 0x97;
const RPC: u8 = 0x98;
const SPL: u8 = 0x99;
const STL: u8 = 0x9A;
const CSI: u8 = 0x9B;
const TIME: u8 = 0x9D;

// CSI finals
const GSM: u8 = 0x42;
const SWF: u8 = 0x53;
const SDF: u8 = 0x56;
const SSM: u8 = 0x57;
const SHS: u8 = 0x58;
const SVS: u8 = 0x59;
const SDP: u8 = 0x5F;
const ACPS: u8 = 0x61;

/// CSI parameters have at most four digits.
const MAX_CSI_PARAM: u32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharSet {
    Kanji,
    Alphanumeric,
    Hiragana,
    Katakana,
    MosaicA,
    MosaicB,
    MosaicC,
    MosaicD,
    ProportionalAlphanumeric,
    ProportionalHiragana,
    ProportionalKatakana,
    JisX0201Katakana,
    JisKanjiPlane1,
    JisKanjiPlane2,
    AdditionalSymbols,
    /// DRCS-0 (two-byte) to DRCS-15.
    Drcs(u8),
    Macro,
}

impl CharSet {
    /// Graphic set for the final byte of a designation.
    pub fn from_final(byte: u8) -> Option<Self> {
        Some(match byte {
            0x42 => Self::Kanji,
            0x4A => Self::Alphanumeric,
            0x30 => Self::Hiragana,
            0x31 => Self::Katakana,
            0x32 => Self::MosaicA,
            0x33 => Self::MosaicB,
            0x34 => Self::MosaicC,
            0x35 => Self::MosaicD,
            0x36 => Self::ProportionalAlphanumeric,
            0x37 => Self::ProportionalHiragana,
            0x38 => Self::ProportionalKatakana,
            0x49 => Self::JisX0201Katakana,
            0x39 => Self::JisKanjiPlane1,
            0x3A => Self::JisKanjiPlane2,
            0x3B => Self::AdditionalSymbols,
            _ => return None,
        })
    }

    /// DRCS or macro set for the final byte of a DRCS designation.
    pub fn from_drcs_final(byte: u8) -> Option<Self> {
        match byte {
            0x40..=0x4F => Some(Self::Drcs(byte - 0x40)),
            0x70 => Some(Self::Macro),
            _ => None,
        }
    }

    pub fn is_two_byte(self) -> bool {
        matches!(
            self,
            Self::Kanji
                | Self::JisKanjiPlane1
                | Self::JisKanjiPlane2
                | Self::AdditionalSymbols
                | Self::Drcs(0)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CharSize {
    Small,
    Medium,
    #[default]
    Normal,
}

/// Writing format and character metrics in effect at the start of a
/// statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub plane_width: u32,
    pub plane_height: u32,
    pub font_width: u32,
    pub font_height: u32,
    pub horizontal_interval: u32,
    pub vertical_interval: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            plane_width: 960,
            plane_height: 540,
            font_width: 36,
            font_height: 36,
            horizontal_interval: 4,
            vertical_interval: 24,
        }
    }
}

/// Reference [`TextDecoder`] for the eight-unit code.
///
/// Decoding state does not carry over between statements.
#[derive(Debug, Clone, Default)]
pub struct EightUnitDecoder {
    pub layout: Layout,
}

impl TextDecoder for EightUnitDecoder {
    fn decode(&mut self, bytes: &[u8], drcs: &DrcsContext<'_>) -> Result<DecodedText> {
        let mut session = Session::new(self.layout, drcs);
        session.run(bytes, 0);
        Ok(session.finish())
    }
}

struct Input<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> Input<'b> {
    fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn param(&mut self, control: u8) -> Result<u8, TextError> {
        self.next().ok_or(TextError::TruncatedControl(control))
    }
}

#[derive(Debug, Clone, Copy)]
struct Metrics {
    font_width: u32,
    font_height: u32,
    horizontal_interval: u32,
    vertical_interval: u32,
}

impl Metrics {
    fn cell_width(&self) -> i32 {
        cell(self.font_width, self.horizontal_interval)
    }

    fn cell_height(&self) -> i32 {
        cell(self.font_height, self.vertical_interval)
    }
}

fn cell(font: u32, interval: u32) -> i32 {
    i32::try_from(font.saturating_add(interval)).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, Copy)]
enum Repeat {
    Times(usize),
    ToLineEnd,
}

struct Session<'a> {
    drcs: &'a DrcsContext<'a>,

    sets: [CharSet; 4],
    gl: usize,
    gr: usize,
    single_shift: Option<usize>,

    layout: Layout,
    area_x: i32,
    area_y: i32,
    area_width: u32,
    area_height: u32,

    size: CharSize,
    color: u32,
    repeat: Option<Repeat>,
    x: i32,
    y: i32,

    text: String,
    regions: Vec<DecodedRegion>,
    open: Option<DecodedRegion>,
    duration: Duration,
}

impl<'a> Session<'a> {
    fn new(layout: Layout, drcs: &'a DrcsContext<'a>) -> Self {
        let mut session = Self {
            drcs,

            sets: [
                CharSet::Kanji,
                CharSet::Alphanumeric,
                CharSet::Hiragana,
                CharSet::Macro,
            ],
            gl: 0,
            gr: 2,
            single_shift: None,

            layout,
            area_x: 0,
            area_y: 0,
            area_width: layout.plane_width,
            area_height: layout.plane_height,

            size: CharSize::Normal,
            color: BASIC_COLORS[7],
            repeat: None,
            x: 0,
            y: 0,

            text: String::new(),
            regions: Vec::new(),
            open: None,
            duration: Duration::ZERO,
        };
        session.home();
        session
    }

    fn finish(mut self) -> DecodedText {
        self.close_region();

        DecodedText {
            text: self.text,
            regions: self.regions,
            duration: self.duration,
        }
    }

    fn run(&mut self, bytes: &[u8], depth: usize) {
        let mut input = Input::new(bytes);

        while let Some(byte) = input.next() {
            if let Err(e) = self.step(byte, &mut input, depth) {
                debug!("{e}");
                break;
            }
        }
    }

    fn step(&mut self, byte: u8, input: &mut Input, depth: usize) -> Result<(), TextError> {
        match byte {
            0x21..=0x7E => {
                let g = self.single_shift.take().unwrap_or(self.gl);
                self.graphic(g, byte, input, depth)
            }
            0xA1..=0xFE => {
                let g = self.single_shift.take().unwrap_or(self.gr);
                self.graphic(g, byte & 0x7F, input, depth)
            }
            SP => {
                let space = if self.size == CharSize::Normal {
                    '\u{3000}'
                } else {
                    ' '
                };
                self.put_char(space);
                Ok(())
            }
            0x00..=0x1F => self.c0(byte, input),
            0x80..=0x9F => self.c1(byte, input),
            DEL | 0xA0 | 0xFF => Ok(()),
        }
    }

    fn metrics(&self) -> Metrics {
        let layout = &self.layout;
        match self.size {
            CharSize::Normal => Metrics {
                font_width: layout.font_width,
                font_height: layout.font_height,
                horizontal_interval: layout.horizontal_interval,
                vertical_interval: layout.vertical_interval,
            },
            CharSize::Medium => Metrics {
                font_width: layout.font_width / 2,
                font_height: layout.font_height,
                horizontal_interval: layout.horizontal_interval / 2,
                vertical_interval: layout.vertical_interval,
            },
            CharSize::Small => Metrics {
                font_width: layout.font_width / 2,
                font_height: layout.font_height / 2,
                horizontal_interval: layout.horizontal_interval / 2,
                vertical_interval: layout.vertical_interval / 2,
            },
        }
    }

    fn area_right(&self) -> i32 {
        self.area_x
            .saturating_add(i32::try_from(self.area_width).unwrap_or(i32::MAX))
    }

    fn home(&mut self) {
        self.x = self.area_x;
        self.y = self.area_y.saturating_add(self.metrics().cell_height());
    }

    fn new_line(&mut self) {
        self.close_region();
        self.x = self.area_x;
        self.y = self.y.saturating_add(self.metrics().cell_height());

        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    fn open_region(&mut self) {
        let metrics = self.metrics();
        let start = self.text.len();

        self.open = Some(DecodedRegion {
            span: start..start,
            foreground_color: self.color,
            plane_width: self.layout.plane_width,
            plane_height: self.layout.plane_height,
            font_width: metrics.font_width,
            font_height: metrics.font_height,
            horizontal_interval: metrics.horizontal_interval,
            vertical_interval: metrics.vertical_interval,
            left: self.x.saturating_add(metrics.cell_width()),
            bottom: self.y,
            horizontal_adjustment: (metrics.horizontal_interval / 2) as i32,
            vertical_adjustment: (metrics.vertical_interval / 2) as i32,
        });
    }

    fn close_region(&mut self) {
        if let Some(mut region) = self.open.take() {
            region.span.end = self.text.len();
            if !region.span.is_empty() {
                self.regions.push(region);
            }
        }
    }

    fn put_char(&mut self, c: char) {
        let mut buf = [0; 4];
        self.put_str(c.encode_utf8(&mut buf));
    }

    /// Writes `s` into one character cell, honouring a pending repeat.
    fn put_str(&mut self, s: &str) {
        let cell_width = self.metrics().cell_width();

        let count = match self.repeat.take() {
            Some(Repeat::Times(n)) => n.max(1),
            Some(Repeat::ToLineEnd) => {
                let remaining = self.area_right().saturating_sub(self.x);
                // a zero-width cell never reaches the line end
                remaining
                    .checked_div(cell_width)
                    .map_or(1, |n| n.max(1) as usize)
            }
            None => 1,
        };

        for _ in 0..count {
            if self.x.saturating_add(cell_width) > self.area_right() {
                self.new_line();
            }
            if self.open.is_none() {
                self.open_region();
            }

            self.text.push_str(s);
            self.x = self.x.saturating_add(cell_width);
        }
    }

    fn put_drcs(&mut self, index: usize) {
        let c = self.drcs.resolve(index).unwrap_or(GETA);
        trace!("DRCS {index} -> {c}");
        self.put_char(c);
    }

    fn designate(&mut self, g: usize, set: Option<CharSet>, final_byte: u8) {
        match set {
            Some(set) => {
                trace!("G{g} = {set:?}");
                self.sets[g] = set;
            }
            None => debug!("Unknown graphic set final {final_byte:#04X} for G{g}"),
        }
    }

    fn graphic(&mut self, g: usize, c1: u8, input: &mut Input, depth: usize) -> Result<(), TextError> {
        let set = self.sets[g];
        let c2 = if set.is_two_byte() {
            input.param(c1)? & 0x7F
        } else {
            0
        };

        match set {
            CharSet::Kanji | CharSet::JisKanjiPlane1 => self.put_kanji(c1, c2),
            CharSet::AdditionalSymbols => {
                match additional_symbol(u16::from_be_bytes([c1, c2])) {
                    Some(symbol) => self.put_str(symbol),
                    None => self.put_kanji(c1, c2),
                }
            }
            CharSet::JisKanjiPlane2 => self.put_char(GETA),
            CharSet::Alphanumeric | CharSet::ProportionalAlphanumeric => {
                let c = alphanumeric(c1, self.size != CharSize::Normal);
                self.put_char(c);
            }
            CharSet::Hiragana | CharSet::ProportionalHiragana => {
                if let Some(c) = hiragana(c1) {
                    self.put_char(c);
                }
            }
            CharSet::Katakana | CharSet::ProportionalKatakana => {
                if let Some(c) = katakana(c1) {
                    self.put_char(c);
                }
            }
            CharSet::JisX0201Katakana => {
                if let Some(c) = jis_x0201_katakana(c1) {
                    self.put_char(c);
                }
            }
            CharSet::MosaicA | CharSet::MosaicB | CharSet::MosaicC | CharSet::MosaicD => {}
            CharSet::Drcs(0) => self.put_drcs(c2.saturating_sub(0x21) as usize),
            CharSet::Drcs(_) => self.put_drcs((c1 - 0x21) as usize),
            CharSet::Macro => {
                if depth == 0 && (0x60..=0x6F).contains(&c1) {
                    self.run(DEFAULT_MACROS[(c1 - 0x60) as usize], depth + 1);
                }
            }
        }

        Ok(())
    }

    fn put_kanji(&mut self, c1: u8, c2: u8) {
        let bytes = [c1 | 0x80, c2 | 0x80];
        let (decoded, had_errors) = EUC_JP.decode_without_bom_handling(&bytes);
        if had_errors {
            self.put_char(GETA);
        } else {
            self.put_str(&decoded);
        }
    }

    fn c0(&mut self, byte: u8, input: &mut Input) -> Result<(), TextError> {
        let metrics = self.metrics();

        match byte {
            NUL | BEL | CAN | RS | US => {}
            APB => {
                self.close_region();
                self.x = self.x.saturating_sub(metrics.cell_width());
                if self.x < self.area_x {
                    self.x = self.area_right().saturating_sub(metrics.cell_width());
                    self.y = self.y.saturating_sub(metrics.cell_height());
                }
            }
            APF => {
                self.close_region();
                self.x = self.x.saturating_add(metrics.cell_width());
                if self.x.saturating_add(metrics.cell_width()) > self.area_right() {
                    self.new_line();
                }
            }
            APD => {
                self.close_region();
                self.y = self.y.saturating_add(metrics.cell_height());
            }
            APU => {
                self.close_region();
                self.y = self.y.saturating_sub(metrics.cell_height());
            }
            CS => {
                self.open = None;
                self.text.clear();
                self.regions.clear();
                self.home();
            }
            APR => self.new_line(),
            LS1 => self.gl = 1,
            LS0 => self.gl = 0,
            PAPF => {
                let p1 = input.param(byte)?;
                self.close_region();
                let offset = i32::from(p1 & 0x3F).saturating_mul(metrics.cell_width());
                self.x = self.x.saturating_add(offset);
            }
            SS2 => self.single_shift = Some(2),
            SS3 => self.single_shift = Some(3),
            ESC => self.escape(input)?,
            APS => {
                let p1 = input.param(byte)?;
                let p2 = input.param(byte)?;
                self.close_region();
                let column = i32::from(p2 & 0x3F).saturating_mul(metrics.cell_width());
                let row = (i32::from(p1 & 0x3F) + 1).saturating_mul(metrics.cell_height());
                self.x = self.area_x.saturating_add(column);
                self.y = self.area_y.saturating_add(row);
            }
            _ => debug!("{}", TextError::UnsupportedControl(byte)),
        }

        Ok(())
    }

    fn escape(&mut self, input: &mut Input) -> Result<(), TextError> {
        let b1 = input.param(ESC)?;

        match b1 {
            0x6E => self.gl = 2,
            0x6F => self.gl = 3,
            0x7E => self.gr = 1,
            0x7D => self.gr = 2,
            0x7C => self.gr = 3,
            0x28..=0x2B => {
                let g = (b1 - 0x28) as usize;
                let b2 = input.param(ESC)?;
                if b2 == 0x20 {
                    let f = input.param(ESC)?;
                    self.designate(g, CharSet::from_drcs_final(f), f);
                } else {
                    self.designate(g, CharSet::from_final(b2), b2);
                }
            }
            0x24 => {
                let b2 = input.param(ESC)?;
                match b2 {
                    0x28..=0x2B => {
                        let g = (b2 - 0x28) as usize;
                        let b3 = input.param(ESC)?;
                        if b3 == 0x20 {
                            let f = input.param(ESC)?;
                            self.designate(g, CharSet::from_drcs_final(f), f);
                        } else {
                            self.designate(g, CharSet::from_final(b3), b3);
                        }
                    }
                    _ => self.designate(0, CharSet::from_final(b2), b2),
                }
            }
            _ => debug!("Unsupported escape sequence ESC {b1:#04X}"),
        }

        Ok(())
    }

    fn set_size(&mut self, size: CharSize) {
        if self.size != size {
            self.close_region();
            self.size = size;
        }
    }

    fn set_color(&mut self, color: u32) {
        if self.color != color {
            self.close_region();
            self.color = color;
        }
    }

    fn c1(&mut self, byte: u8, input: &mut Input) -> Result<(), TextError> {
        match byte {
            0x80..=0x87 => self.set_color(BASIC_COLORS[(byte & 0x7) as usize]),
            SSZ => self.set_size(CharSize::Small),
            MSZ => self.set_size(CharSize::Medium),
            NSZ => self.set_size(CharSize::Normal),
            SZX | FLC | POL | WMM | HLC => {
                input.param(byte)?;
            }
            COL => {
                let p1 = input.param(byte)?;
                match p1 {
                    0x20 => {
                        input.param(byte)?;
                    }
                    0x48..=0x4F => self.set_color(BASIC_COLORS[(p1 & 0x7) as usize]),
                    _ => {}
                }
            }
            CDC => {
                if input.param(byte)? == 0x20 {
                    input.param(byte)?;
                }
            }
            MACRO => loop {
                if input.param(byte)? == MACRO && input.param(byte)? == 0x4F {
                    break;
                }
            },
            RPC => {
                let p1 = input.param(byte)?;
                self.repeat = Some(match p1 & 0x3F {
                    0 => Repeat::ToLineEnd,
                    n => Repeat::Times(n as usize),
                });
            }
            SPL | STL => {}
            CSI => self.csi(input)?,
            TIME => self.time(input)?,
            _ => debug!("{}", TextError::UnsupportedControl(byte)),
        }

        Ok(())
    }

    fn time(&mut self, input: &mut Input) -> Result<(), TextError> {
        match input.param(TIME)? {
            0x20 => {
                let p2 = input.param(TIME)?;
                self.duration += Duration::from_millis((p2 & 0x3F) as u64 * 100);
            }
            0x28 => {
                input.param(TIME)?;
            }
            0x29 => while !(0x40..=0x43).contains(&input.param(TIME)?) {},
            _ => {}
        }

        Ok(())
    }

    fn csi(&mut self, input: &mut Input) -> Result<(), TextError> {
        let mut params = vec![0u32];

        let final_byte = loop {
            match input.param(CSI)? {
                digit @ 0x30..=0x39 => {
                    if let Some(last) = params.last_mut() {
                        *last = (*last * 10 + (digit - 0x30) as u32).min(MAX_CSI_PARAM);
                    }
                }
                0x3B => params.push(0),
                0x20 => break input.param(CSI)?,
                other => break other,
            }
        };

        let p = |i: usize| params.get(i).copied();

        match final_byte {
            SWF => {
                let plane = match p(0) {
                    Some(5) => Some((1920, 1080)),
                    Some(7) => Some((960, 540)),
                    Some(9) => Some((720, 480)),
                    _ => None,
                };
                if let Some((width, height)) = plane {
                    self.close_region();
                    self.layout.plane_width = width;
                    self.layout.plane_height = height;
                    self.area_x = 0;
                    self.area_y = 0;
                    self.area_width = width;
                    self.area_height = height;
                    self.home();
                }
            }
            SDF => {
                if let (Some(width), Some(height)) = (p(0), p(1)) {
                    self.close_region();
                    self.area_width = width;
                    self.area_height = height;
                }
            }
            SDP => {
                if let (Some(x), Some(y)) = (p(0), p(1)) {
                    self.close_region();
                    self.area_x = x as i32;
                    self.area_y = y as i32;
                    self.home();
                }
            }
            SSM => {
                if let (Some(width), Some(height)) = (p(0), p(1)) {
                    self.close_region();
                    self.layout.font_width = width;
                    self.layout.font_height = height;
                }
            }
            SHS => {
                if let Some(interval) = p(0) {
                    self.close_region();
                    self.layout.horizontal_interval = interval;
                }
            }
            SVS => {
                if let Some(interval) = p(0) {
                    self.close_region();
                    self.layout.vertical_interval = interval;
                }
            }
            ACPS => {
                if let (Some(x), Some(y)) = (p(0), p(1)) {
                    self.close_region();
                    self.x = x as i32;
                    self.y = y as i32;
                }
            }
            GSM => {}
            _ => trace!("Ignoring CSI final {final_byte:#04X} {params:?}"),
        }

        Ok(())
    }
}

fn punctuation(c: u8) -> Option<char> {
    Some(match c {
        0x79 => 'ー',
        0x7A => '。',
        0x7B => '「',
        0x7C => '」',
        0x7D => '、',
        0x7E => '・',
        _ => return None,
    })
}

fn hiragana(c: u8) -> Option<char> {
    match c {
        0x21..=0x73 => char::from_u32(0x3041 + (c - 0x21) as u32),
        0x77 => Some('ゝ'),
        0x78 => Some('ゞ'),
        _ => punctuation(c),
    }
}

fn katakana(c: u8) -> Option<char> {
    match c {
        0x21..=0x76 => char::from_u32(0x30A1 + (c - 0x21) as u32),
        0x77 => Some('ヽ'),
        0x78 => Some('ヾ'),
        _ => punctuation(c),
    }
}

fn jis_x0201_katakana(c: u8) -> Option<char> {
    match c {
        0x21..=0x5F => char::from_u32(0xFF61 + (c - 0x21) as u32),
        _ => None,
    }
}

/// Alphanumerics are fullwidth in normal size.
fn alphanumeric(c: u8, halfwidth: bool) -> char {
    match (c, halfwidth) {
        (0x5C, true) => '¥',
        (0x7E, true) => '‾',
        (_, true) => c as char,
        (0x5C, false) => '￥',
        (0x7E, false) => '￣',
        (_, false) => char::from_u32(0xFF01 + (c - 0x21) as u32).unwrap_or(GETA),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::drcs::{DrcsConversionTable, DrcsSlotTable};

    fn decode(bytes: &[u8]) -> DecodedText {
        let slots = DrcsSlotTable::default();
        let conversion = DrcsConversionTable::default();
        let drcs = DrcsContext::new(&slots, &conversion);

        let mut session = Session::new(Layout::default(), &drcs);
        session.run(bytes, 0);
        session.finish()
    }

    #[test]
    fn kanji_and_hiragana() {
        let decoded = decode(&[0x3B, 0x7A, 0x4B, 0x6B, 0xC7, 0xB9]);
        assert_eq!(decoded.text, "字幕です");
        assert_eq!(decoded.regions.len(), 1);

        let region = &decoded.regions[0];
        assert_eq!(decoded.region_text(region), "字幕です");
        assert_eq!(region.foreground_color, 0xFFFFFF);
        assert_eq!((region.plane_width, region.plane_height), (960, 540));
        assert_eq!((region.font_width, region.font_height), (36, 36));
        assert_eq!((region.left, region.bottom), (40, 60));
        assert_eq!(
            (region.horizontal_adjustment, region.vertical_adjustment),
            (2, 12)
        );
    }

    #[test]
    fn katakana_and_alphanumerics() {
        // LS1 with G1 = alphanumeric, then G1 = katakana
        let decoded = decode(&[0x0E, 0x41, 0x89, 0x42, 0x1B, 0x29, 0x31, 0x21, 0x7C]);
        assert_eq!(decoded.text, "ＡBァ」");
        assert_eq!(decoded.regions.len(), 2);
        assert_eq!(decoded.regions[1].font_width, 18);
        assert_eq!(decoded.regions[1].font_height, 36);
    }

    #[test]
    fn position_and_size_controls() {
        let decoded = decode(&[0xA4, 0x1C, 0x48, 0x45, 0x88, 0xA4, 0xA4]);
        assert_eq!(decoded.text, "いいい");
        assert_eq!(decoded.regions.len(), 2);

        let small = &decoded.regions[1];
        assert_eq!(decoded.region_text(small), "いい");
        assert_eq!((small.font_width, small.font_height), (18, 18));
        assert_eq!(
            (small.horizontal_interval, small.vertical_interval),
            (2, 12)
        );
        assert_eq!((small.left, small.bottom), (220, 540));
    }

    #[test]
    fn carriage_return_splits_lines() {
        let decoded = decode(&[0xA4, 0x0D, 0xA4, 0x81, 0xA4]);
        assert_eq!(decoded.text, "い\nいい");
        assert_eq!(decoded.regions.len(), 3);
        assert_eq!(decoded.regions[1].bottom, 120);
        assert_eq!(decoded.regions[2].foreground_color, 0xFF0000);
        assert_eq!(decoded.regions[2].left, 80);
    }

    #[test]
    fn time_sets_duration() {
        let decoded = decode(&[0x9D, 0x20, 0x5E, 0xA4, 0x9D, 0x29, 0x30, 0x41]);
        assert_eq!(decoded.duration, Duration::from_secs(3));
        assert_eq!(decoded.text, "い");
    }

    #[test]
    fn csi_changes_layout() {
        let decoded = decode(&[
            0x9B, 0x35, 0x20, 0x53, // SWF 5
            0x9B, 0x33, 0x32, 0x3B, 0x34, 0x30, 0x20, 0x57, // SSM 32;40
            0x9B, 0x31, 0x30, 0x30, 0x3B, 0x32, 0x30, 0x30, 0x20, 0x5F, // SDP 100;200
            0xA4,
        ]);

        let region = &decoded.regions[0];
        assert_eq!((region.plane_width, region.plane_height), (1920, 1080));
        assert_eq!((region.font_width, region.font_height), (32, 40));
        assert_eq!((region.left, region.bottom), (136, 264));
    }

    #[test]
    fn default_macro_designates_katakana() {
        let decoded = decode(&[0x1B, 0x6F, 0x61, 0x0E, 0x21, 0x0F, 0x3B, 0x7A]);
        assert_eq!(decoded.text, "ァ字");
    }

    #[test]
    fn drcs_references() {
        let hash = "0123456789abcdef0123456789abcdef";
        let conversion = DrcsConversionTable::parse(&format!("{hash}=U+266A"));
        let mut slots = DrcsSlotTable::default();
        slots.register(hash);
        slots.register("ffffffffffffffffffffffffffffffff");

        let drcs = DrcsContext::new(&slots, &conversion);
        let mut decoder = EightUnitDecoder::default();

        // G1 = DRCS-1, LS1
        let decoded = decoder
            .decode(&[0x1B, 0x29, 0x20, 0x41, 0x0E, 0x21, 0x22, 0x23], &drcs)
            .expect("decode");
        assert_eq!(decoded.text, "♪〓〓");
    }

    #[test]
    fn repeat_with_zero_width_cell() {
        let decoded = decode(&[
            0x9B, 0x3B, 0x20, 0x57, // SSM ;
            0x9B, 0x20, 0x58, // SHS
            0x98, 0x40, // RPC to line end
            0xA4, 0xA2,
        ]);
        assert_eq!(decoded.text, "いあ");
        assert_eq!(decoded.regions.len(), 1);
        assert_eq!(decoded.regions[0].font_width, 0);
        assert_eq!(decoded.regions[0].horizontal_interval, 0);
    }

    #[test]
    fn oversized_csi_parameters_are_clamped() {
        let mut bytes = vec![0x9B];
        bytes.extend_from_slice(b"4294967295;36");
        bytes.extend_from_slice(&[0x20, 0x57, 0xA4, 0xA2]);
        bytes.extend_from_slice(&[0x9B]);
        bytes.extend_from_slice(b"99999999;99999999");
        bytes.extend_from_slice(&[0x20, 0x61, 0x1C, 0x7F, 0x7F, 0xA4]);

        let decoded = decode(&bytes);
        assert_eq!(decoded.text, "い\nあ\nい");
        assert_eq!(decoded.regions.len(), 3);
        assert_eq!(decoded.regions[0].font_width, MAX_CSI_PARAM);
        assert_eq!(decoded.regions[0].left, 10_003);
        assert_eq!(decoded.regions[1].bottom, 180);
    }

    #[test]
    fn truncated_control_stops_decoding() {
        let decoded = decode(&[0xA4, 0x1C, 0x48]);
        assert_eq!(decoded.text, "い");
        assert_eq!(decoded.regions.len(), 1);

        let decoded = decode(&[0xA4, 0x3B]);
        assert_eq!(decoded.text, "い");
    }

    #[test]
    fn clear_screen_discards_earlier_text() {
        let decoded = decode(&[0xA4, 0x0C, 0xA6]);
        assert_eq!(decoded.text, "う");
        assert_eq!(decoded.regions[0].left, 40);
    }
}
