//! # Swara Table
//!
//! The 17 canonical Carnatic scale degrees, their semitone positions above
//! Sa, and the enharmonic groups that share a pitch class.
//!
//! Five of the twelve pitch classes carry more than one name (S/Ṡ, R2/G1,
//! G2/R3, D2/N1, N2/D3). Those classes are labelled with a `/`-joined
//! composite whose order is fixed by variant priority: `2` first, then `1`,
//! then `3`, then unnumbered names, alphabetically within a priority.

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

/// The seven base letters of the sargam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BaseDegree {
    Sa,
    Ri,
    Ga,
    Ma,
    Pa,
    Dha,
    Ni,
}

impl BaseDegree {
    /// All base degrees in ascending order.
    pub const ALL: [BaseDegree; 7] = [
        BaseDegree::Sa,
        BaseDegree::Ri,
        BaseDegree::Ga,
        BaseDegree::Ma,
        BaseDegree::Pa,
        BaseDegree::Dha,
        BaseDegree::Ni,
    ];

    /// Single-letter abbreviation used in degree labels.
    pub fn letter(self) -> char {
        match self {
            BaseDegree::Sa => 'S',
            BaseDegree::Ri => 'R',
            BaseDegree::Ga => 'G',
            BaseDegree::Ma => 'M',
            BaseDegree::Pa => 'P',
            BaseDegree::Dha => 'D',
            BaseDegree::Ni => 'N',
        }
    }

    /// Spoken name, as shown on the analysis cards.
    pub fn display_name(self) -> &'static str {
        match self {
            BaseDegree::Sa => "Sa",
            BaseDegree::Ri => "Ri",
            BaseDegree::Ga => "Ga",
            BaseDegree::Ma => "Ma",
            BaseDegree::Pa => "Pa",
            BaseDegree::Dha => "Dha",
            BaseDegree::Ni => "Ni",
        }
    }
}

impl fmt::Display for BaseDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One canonical scale degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swara {
    pub name: &'static str,
    pub base: BaseDegree,
    /// Variant number (`R2` → 2), `None` for S, P and Ṡ.
    pub variant: Option<u8>,
    /// Semitones above Sa; 12 for the upper Sa.
    pub semitones: u8,
}

const fn swara(name: &'static str, base: BaseDegree, variant: Option<u8>, semitones: u8) -> Swara {
    Swara {
        name,
        base,
        variant,
        semitones,
    }
}

/// The canonical degrees, in canonical order.
pub static SWARAS: [Swara; 17] = [
    swara("S", BaseDegree::Sa, None, 0),
    swara("R1", BaseDegree::Ri, Some(1), 1),
    swara("R2", BaseDegree::Ri, Some(2), 2),
    swara("R3", BaseDegree::Ri, Some(3), 3),
    swara("G1", BaseDegree::Ga, Some(1), 2),
    swara("G2", BaseDegree::Ga, Some(2), 3),
    swara("G3", BaseDegree::Ga, Some(3), 4),
    swara("M1", BaseDegree::Ma, Some(1), 5),
    swara("M2", BaseDegree::Ma, Some(2), 6),
    swara("P", BaseDegree::Pa, None, 7),
    swara("D1", BaseDegree::Dha, Some(1), 8),
    swara("D2", BaseDegree::Dha, Some(2), 9),
    swara("D3", BaseDegree::Dha, Some(3), 10),
    swara("N1", BaseDegree::Ni, Some(1), 9),
    swara("N2", BaseDegree::Ni, Some(2), 10),
    swara("N3", BaseDegree::Ni, Some(3), 11),
    swara("Ṡ", BaseDegree::Sa, None, 12),
];

/// Sort key for composite labels: variant 2, then 1, then 3, then the rest.
fn variant_priority(swara: &Swara) -> u8 {
    match swara.variant {
        Some(2) => 0,
        Some(1) => 1,
        Some(3) => 2,
        _ => 3,
    }
}

/// Pitch-class lookup, built once.
struct DegreeTable {
    /// Indices into `SWARAS`, per pitch class, in label order.
    members: [Vec<usize>; 12],
    /// Display label per pitch class.
    labels: [String; 12],
}

static TABLE: Lazy<DegreeTable> = Lazy::new(|| {
    let mut members: [Vec<usize>; 12] = Default::default();
    for (index, swara) in SWARAS.iter().enumerate() {
        members[(swara.semitones % 12) as usize].push(index);
    }

    for class in members.iter_mut() {
        class.sort_by(|&a, &b| {
            let (a, b) = (&SWARAS[a], &SWARAS[b]);
            match variant_priority(a).cmp(&variant_priority(b)) {
                Ordering::Equal => a.name.cmp(b.name),
                other => other,
            }
        });
    }

    let labels = std::array::from_fn(|class| {
        members[class]
            .iter()
            .map(|&i| SWARAS[i].name)
            .collect::<Vec<_>>()
            .join("/")
    });

    DegreeTable { members, labels }
});

/// Label for a pitch class (0-11) above Sa, composites included.
pub fn label_for_semitone(semitone: u8) -> &'static str {
    let table: &'static DegreeTable = &TABLE;
    &table.labels[(semitone % 12) as usize]
}

/// The degrees sharing a pitch class, in label order.
pub fn swaras_for_semitone(semitone: u8) -> impl Iterator<Item = &'static Swara> {
    let table: &'static DegreeTable = &TABLE;
    table.members[(semitone % 12) as usize]
        .iter()
        .map(|&i| &SWARAS[i])
}

/// Looks up a single canonical degree by name.
pub fn find_swara(name: &str) -> Option<&'static Swara> {
    SWARAS.iter().find(|s| s.name == name)
}

/// Resolves a label to its interned form.
///
/// Accepts any of the 17 canonical names and any composite label produced by
/// [`label_for_semitone`]. Anything else returns `None`.
pub fn resolve_label(label: &str) -> Option<&'static str> {
    if let Some(swara) = find_swara(label) {
        return Some(swara.name);
    }
    let table: &'static DegreeTable = &TABLE;
    table
        .labels
        .iter()
        .find(|l| l.as_str() == label)
        .map(String::as_str)
}

/// Base letter of a label. Composites use their first member.
pub fn base_degree(label: &str) -> Option<BaseDegree> {
    let first = label.split('/').next()?;
    find_swara(first).map(|s| s.base)
}

/// Position of the first member of a label in canonical order.
pub fn canonical_index(label: &str) -> Option<usize> {
    label
        .split('/')
        .filter_map(|part| SWARAS.iter().position(|s| s.name == part))
        .min()
}

/// An sRGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB` form.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Violet through red, cycled over the canonical degree order.
pub const PALETTE: [Color; 7] = [
    Color::new(0x8A, 0x2B, 0xE2),
    Color::new(0x4B, 0x00, 0x82),
    Color::new(0x00, 0x00, 0xFF),
    Color::new(0x00, 0x80, 0x00),
    Color::new(0xFF, 0xD5, 0x00),
    Color::new(0xFF, 0xA5, 0x00),
    Color::new(0xFF, 0x00, 0x00),
];

/// Display color for a label.
///
/// Composite labels take the color of whichever member comes first in
/// canonical order, so `"R2/G1"` is colored as `R2`.
pub fn label_to_color(label: &str) -> Option<Color> {
    canonical_index(label).map(|i| PALETTE[i % PALETTE.len()])
}
