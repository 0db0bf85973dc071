//! World-coordinate header cards.
//!
//! Raw headers describe the celestial projection in one of three dialects
//! (`CDi_j`, `PCi_j` + `CDELTi`, or `CDELTi` + `CROTA2`). [`Wcs::from_header`]
//! reads any of them and [`Wcs::to_cards`] emits a single normalised
//! `PCi_j` + `CDELTi` form.

use crate::io::header::{Card, FitsHeader};

/// Keywords owned by the WCS description; stripped before fresh cards are
/// inserted.
const WCS_KEYWORDS: [&str; 29] = [
    "WCSAXES", "CTYPE1", "CTYPE2", "CUNIT1", "CUNIT2", "CRPIX1", "CRPIX2", "CRVAL1", "CRVAL2",
    "CDELT1", "CDELT2", "CD1_1", "CD1_2", "CD2_1", "CD2_2", "PC1_1", "PC1_2", "PC2_1", "PC2_2",
    "CROTA1", "CROTA2", "LONPOLE", "LATPOLE", "RADESYS", "RADECSYS", "EQUINOX", "EPOCH",
    "WCSNAME", "PV2_1",
];

/// Linear part of a two-axis celestial WCS.
#[derive(Clone, Debug, PartialEq)]
pub struct Wcs {
    pub ctype: [String; 2],
    pub cunit: [String; 2],
    /// Reference pixel, 1-based FITS convention.
    pub crpix: [f64; 2],
    pub crval: [f64; 2],
    pub cdelt: [f64; 2],
    /// Row-major `[[PC1_1, PC1_2], [PC2_1, PC2_2]]`.
    pub pc: [[f64; 2]; 2],
    pub lonpole: Option<f64>,
    pub latpole: Option<f64>,
    pub radesys: Option<String>,
    pub equinox: Option<f64>,
}

impl Wcs {
    /// Parse the WCS of a header. Returns `None` when the header carries no
    /// projection (no `CTYPE1`/`CTYPE2`).
    pub fn from_header(header: &FitsHeader) -> Option<Self> {
        let ctype1 = header.get_str("CTYPE1")?.to_string();
        let ctype2 = header.get_str("CTYPE2")?.to_string();

        let num = |key: &str, default: f64| header.get_f64(key).unwrap_or(default);

        let has_cd = ["CD1_1", "CD1_2", "CD2_1", "CD2_2"]
            .iter()
            .any(|k| header.contains(k));
        let has_pc = ["PC1_1", "PC1_2", "PC2_1", "PC2_2"]
            .iter()
            .any(|k| header.contains(k));

        let (cdelt, pc) = if has_cd {
            (
                [1.0, 1.0],
                [
                    [num("CD1_1", 0.0), num("CD1_2", 0.0)],
                    [num("CD2_1", 0.0), num("CD2_2", 0.0)],
                ],
            )
        } else if has_pc {
            (
                [num("CDELT1", 1.0), num("CDELT2", 1.0)],
                [
                    [num("PC1_1", 1.0), num("PC1_2", 0.0)],
                    [num("PC2_1", 0.0), num("PC2_2", 1.0)],
                ],
            )
        } else {
            let cdelt = [num("CDELT1", 1.0), num("CDELT2", 1.0)];
            let rho = num("CROTA2", 0.0).to_radians();
            let (sin, cos) = rho.sin_cos();
            let ratio = if cdelt[0] != 0.0 { cdelt[1] / cdelt[0] } else { 1.0 };
            let inv_ratio = if cdelt[1] != 0.0 { cdelt[0] / cdelt[1] } else { 1.0 };
            (cdelt, [[cos, -sin * ratio], [sin * inv_ratio, cos]])
        };

        Some(Self {
            ctype: [ctype1, ctype2],
            cunit: [
                header.get_str("CUNIT1").unwrap_or("deg").to_string(),
                header.get_str("CUNIT2").unwrap_or("deg").to_string(),
            ],
            crpix: [num("CRPIX1", 0.0), num("CRPIX2", 0.0)],
            crval: [num("CRVAL1", 0.0), num("CRVAL2", 0.0)],
            cdelt,
            pc,
            lonpole: header.get_f64("LONPOLE"),
            latpole: header.get_f64("LATPOLE"),
            radesys: header
                .get_str("RADESYS")
                .or_else(|| header.get_str("RADECSYS"))
                .map(str::to_string),
            equinox: header.get_f64("EQUINOX").or_else(|| header.get_f64("EPOCH")),
        })
    }

    /// Move the reference pixel so the WCS describes a sub-array whose first
    /// row/column are `row0`/`col0` (0-based) of the original array.
    pub fn cropped(mut self, row0: usize, col0: usize) -> Self {
        self.crpix[0] -= col0 as f64;
        self.crpix[1] -= row0 as f64;
        self
    }

    /// Normalised cards in the order `WCSAXES, CRPIX, PC, CDELT, CUNIT,
    /// CTYPE, CRVAL, LONPOLE, LATPOLE, RADESYS, EQUINOX`.
    pub fn to_cards(&self) -> Vec<Card> {
        let mut cards = vec![
            Card::new("WCSAXES", 2i64),
            Card::new("CRPIX1", self.crpix[0]),
            Card::new("CRPIX2", self.crpix[1]),
        ];
        let identity = [[1.0, 0.0], [0.0, 1.0]];
        for (i, row) in self.pc.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if v != identity[i][j] {
                    cards.push(Card::new(&format!("PC{}_{}", i + 1, j + 1), v));
                }
            }
        }
        for i in 0..2 {
            cards.push(Card::new(&format!("CDELT{}", i + 1), self.cdelt[i]));
        }
        for i in 0..2 {
            cards.push(Card::new(&format!("CUNIT{}", i + 1), self.cunit[i].as_str()));
        }
        for i in 0..2 {
            cards.push(Card::new(&format!("CTYPE{}", i + 1), self.ctype[i].as_str()));
        }
        for i in 0..2 {
            cards.push(Card::new(&format!("CRVAL{}", i + 1), self.crval[i]));
        }
        if let Some(v) = self.lonpole {
            cards.push(Card::new("LONPOLE", v));
        }
        if let Some(v) = self.latpole {
            cards.push(Card::new("LATPOLE", v));
        }
        if let Some(ref v) = self.radesys {
            cards.push(Card::new("RADESYS", v.as_str()));
        }
        if let Some(v) = self.equinox {
            cards.push(Card::new("EQUINOX", v));
        }
        cards
    }
}

/// Drop every WCS-owned card from `header`.
pub fn strip_wcs(header: &mut FitsHeader) {
    header.remove_where(|k| WCS_KEYWORDS.contains(&k));
}

/// Replace the WCS cards of `header` with a fresh, normalised set computed
/// from `source` and shifted by the trim origin.
pub fn refresh_wcs(header: &mut FitsHeader, source: &FitsHeader, row0: usize, col0: usize) {
    let wcs = Wcs::from_header(source).map(|w| w.cropped(row0, col0));
    strip_wcs(header);
    if let Some(wcs) = wcs {
        for card in wcs.to_cards() {
            header.push(card);
        }
    }
}
