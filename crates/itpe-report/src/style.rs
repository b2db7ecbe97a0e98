use std::collections::HashMap;

pub const LINE_WIDTH: u32 = 2;
pub const MARKER_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const COLORS: [Rgb; 7] = [
    Rgb(238, 46, 47),
    Rgb(0, 140, 72),
    Rgb(24, 90, 169),
    Rgb(244, 125, 35),
    Rgb(102, 44, 145),
    Rgb(162, 29, 33),
    Rgb(180, 56, 148),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dash {
    Solid,
    Dashed,
    Dotted,
    LongDash,
}

impl Dash {
    /// Dash length and gap in pixels; `None` draws a solid line.
    pub fn pattern(&self) -> Option<(u32, u32)> {
        match self {
            Dash::Solid => None,
            Dash::Dashed => Some((6, 3)),
            Dash::Dotted => Some((2, 3)),
            Dash::LongDash => Some((12, 4)),
        }
    }
}

pub const DASHES: [Dash; 4] = [Dash::Solid, Dash::Dashed, Dash::Dotted, Dash::LongDash];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Circle,
    Triangle,
    Cross,
    Ring,
}

pub const MARKERS: [Marker; 4] = [Marker::Circle, Marker::Triangle, Marker::Cross, Marker::Ring];

/// Number of distinct (color, dash, marker) combinations.
pub const PALETTE_SIZE: usize = COLORS.len() * DASHES.len() * MARKERS.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineStyle {
    pub color: Rgb,
    pub dash: Dash,
    pub width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphStyle {
    pub color: Rgb,
    pub marker: Marker,
    pub size: u32,
}

/// Palette entry for the `index`-th assigned label.
///
/// Odometer order: color turns fastest, then dash, then marker. Indices past
/// the palette wrap to the start.
pub fn palette_entry(index: usize) -> (Rgb, Dash, Marker) {
    let i = index % PALETTE_SIZE;
    let color = COLORS[i % COLORS.len()];
    let dash = DASHES[(i / COLORS.len()) % DASHES.len()];
    let marker = MARKERS[i / (COLORS.len() * DASHES.len())];
    (color, dash, marker)
}

/// Hands out one style per label and keeps it for the lifetime of the manager,
/// so a label looks the same on every chart of a family.
///
/// Not synchronized: charts rendered in parallel must share it behind a lock.
#[derive(Debug, Default)]
pub struct StyleManager {
    assigned: HashMap<String, (LineStyle, GlyphStyle)>,
    next: usize,
}

impl StyleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style_for(&mut self, label: &str) -> (LineStyle, GlyphStyle) {
        if let Some(style) = self.assigned.get(label) {
            return *style;
        }

        let (color, dash, marker) = palette_entry(self.next);
        self.next += 1;

        let style = (
            LineStyle {
                color,
                dash,
                width: LINE_WIDTH,
            },
            GlyphStyle {
                color,
                marker,
                size: MARKER_SIZE,
            },
        );
        self.assigned.insert(label.to_string(), style);
        style
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
