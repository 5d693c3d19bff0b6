// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font assembly. Builds every required TrueType table from a character to
// outline map and serializes the result with write-fonts. Glyph order is
// .notdef first, then characters in ascending codepoint order, so repeated
// runs over the same input produce byte-identical fonts.

use std::collections::{BTreeMap, BTreeSet};

use kurbo::{BezPath, CubicBez, PathEl, Point, Rect, Shape};
use tracing::{debug, info, instrument};
use write_fonts::FontBuilder;
use write_fonts::read::tables::name::NameId;
use write_fonts::tables::cmap::Cmap;
use write_fonts::tables::glyf::{GlyfLocaBuilder, Glyph, SimpleGlyph};
use write_fonts::tables::head::Head;
use write_fonts::tables::hhea::Hhea;
use write_fonts::tables::hmtx::Hmtx;
use write_fonts::tables::loca::LocaFormat;
use write_fonts::tables::maxp::Maxp;
use write_fonts::tables::name::{Name, NameRecord};
use write_fonts::tables::os2::Os2;
use write_fonts::tables::post::Post;
use write_fonts::tables::vmtx::LongMetric;
use write_fonts::types::{FWord, Fixed, GlyphId, LongDateTime, UfWord};

use schriftwerk_core::config::FontConfig;
use schriftwerk_core::error::{Result, SchriftwerkError};
use schriftwerk_core::types::JobId;

/// Error accuracy when lowering cubic segments to the quadratics glyf needs.
const QUAD_ACCURACY: f64 = 1.0;

/// Assembles a TrueType font from character outlines in design space.
pub struct FontAssembler {
    config: FontConfig,
}

/// A glyph ready for the glyf builder, with the bookkeeping maxp needs.
struct PreparedGlyph {
    name: String,
    glyph: Glyph,
    bounds: Option<Rect>,
    points: u16,
    contours: u16,
}

impl FontAssembler {
    pub fn new(config: FontConfig) -> Self {
        Self { config }
    }

    /// Build a complete TTF from the traced outlines. `outlines` maps each
    /// recognized character to its outline in font design units; characters
    /// whose cells were empty are simply absent and get no glyph. Always
    /// succeeds on an empty map, yielding a font with only `.notdef`.
    #[instrument(skip(self, outlines), fields(job_id = %job_id, glyphs = outlines.len()))]
    pub fn assemble(&self, outlines: &BTreeMap<char, BezPath>, job_id: &JobId) -> Result<Vec<u8>> {
        let mut prepared = Vec::with_capacity(outlines.len() + 1);
        prepared.push(self.prepare_glyph(".notdef".to_string(), &self.notdef_outline())?);
        for (ch, outline) in outlines {
            prepared.push(self.prepare_glyph(glyph_name(*ch), outline)?);
        }

        let num_glyphs = u16::try_from(prepared.len())
            .map_err(|_| SchriftwerkError::Assembly("too many glyphs for one font".into()))?;

        let mut glyf_builder = GlyfLocaBuilder::new();
        for entry in &prepared {
            glyf_builder
                .add_glyph(&entry.glyph)
                .map_err(|e| SchriftwerkError::Assembly(format!("glyf: {e}")))?;
        }
        let (glyf, loca, loca_format) = glyf_builder.build();

        let bounds = prepared
            .iter()
            .filter_map(|g| g.bounds)
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO);

        let mappings = outlines
            .keys()
            .enumerate()
            .map(|(i, ch)| (*ch, GlyphId::new(i as u16 + 1)));
        let cmap = Cmap::from_mappings(mappings)
            .map_err(|e| SchriftwerkError::Assembly(format!("cmap: {e}")))?;

        let head = Head {
            font_revision: Fixed::from_f64(1.0),
            units_per_em: self.config.units_per_em,
            // Pinned so identical inputs give byte-identical fonts.
            created: LongDateTime::new(0),
            modified: LongDateTime::new(0),
            x_min: bounds.min_x().floor() as i16,
            y_min: bounds.min_y().floor() as i16,
            x_max: bounds.max_x().ceil() as i16,
            y_max: bounds.max_y().ceil() as i16,
            index_to_loc_format: match loca_format {
                LocaFormat::Short => 0,
                LocaFormat::Long => 1,
            },
            ..Default::default()
        };

        let hhea = Hhea {
            ascender: FWord::new(self.config.ascent),
            descender: FWord::new(self.config.descent),
            line_gap: FWord::new(0),
            advance_width_max: UfWord::new(self.config.advance_width),
            number_of_long_metrics: num_glyphs,
            ..Default::default()
        };

        // .notdef keeps a visible side bearing; drawn glyphs sit flush left,
        // their placement inside the cell is the side bearing.
        let metrics = prepared
            .iter()
            .enumerate()
            .map(|(i, g)| LongMetric {
                advance: self.config.advance_width,
                side_bearing: if i == 0 {
                    50
                } else {
                    g.bounds.map_or(0, |b| b.min_x().floor() as i16)
                },
            })
            .collect();
        let hmtx = Hmtx::new(metrics, Vec::new());

        let maxp = Maxp {
            num_glyphs,
            max_points: Some(prepared.iter().map(|g| g.points).max().unwrap_or(0)),
            max_contours: Some(prepared.iter().map(|g| g.contours).max().unwrap_or(0)),
            max_composite_points: Some(0),
            max_composite_contours: Some(0),
            max_zones: Some(2),
            max_twilight_points: Some(0),
            max_storage: Some(0),
            max_function_defs: Some(0),
            max_instruction_defs: Some(0),
            max_stack_elements: Some(0),
            max_size_of_instructions: Some(0),
            max_component_elements: Some(0),
            max_component_depth: Some(0),
            ..Default::default()
        };

        // The OS/2 version is inferred from which optional fields are set;
        // setting any version-2 field requires the whole version-2 block.
        let os2 = Os2 {
            s_typo_ascender: self.config.ascent,
            s_typo_descender: self.config.descent,
            s_typo_line_gap: 0,
            us_win_ascent: self.config.ascent.max(0) as u16,
            us_win_descent: self.config.descent.unsigned_abs(),
            ul_code_page_range_1: Some(0),
            ul_code_page_range_2: Some(0),
            sx_height: Some(0),
            s_cap_height: Some(self.config.cap_height),
            us_default_char: Some(0),
            us_break_char: Some(32),
            us_max_context: Some(0),
            ..Default::default()
        };

        let name = self.name_table(job_id);
        let post = Post::new_v2(prepared.iter().map(|g| g.name.as_str()));

        let mut builder = FontBuilder::default();
        builder
            .add_table(&head)
            .and_then(|b| b.add_table(&hhea))
            .and_then(|b| b.add_table(&maxp))
            .and_then(|b| b.add_table(&os2))
            .and_then(|b| b.add_table(&hmtx))
            .and_then(|b| b.add_table(&cmap))
            .and_then(|b| b.add_table(&name))
            .and_then(|b| b.add_table(&post))
            .map_err(|e| SchriftwerkError::Assembly(format!("table build: {e}")))?;
        builder.add_table(&glyf).map_err(|e| {
            SchriftwerkError::Assembly(format!("glyf build: {e}"))
        })?;
        builder.add_table(&loca).map_err(|e| {
            SchriftwerkError::Assembly(format!("loca build: {e}"))
        })?;

        let bytes = builder.build();
        info!(glyphs = num_glyphs, size = bytes.len(), "font assembled");
        Ok(bytes)
    }

    fn prepare_glyph(&self, name: String, outline: &BezPath) -> Result<PreparedGlyph> {
        if outline.elements().is_empty() {
            return Ok(PreparedGlyph {
                name,
                glyph: Glyph::Empty,
                bounds: None,
                points: 0,
                contours: 0,
            });
        }
        let quads = to_quadratic(outline, QUAD_ACCURACY);
        let (points, contours) = count_points(&quads);
        let simple = SimpleGlyph::from_bezpath(&quads)
            .map_err(|e| SchriftwerkError::Assembly(format!("glyph {name}: {e:?}")))?;
        debug!(%name, points, contours, "glyph prepared");
        Ok(PreparedGlyph {
            name,
            glyph: simple.into(),
            bounds: Some(quads.bounding_box()),
            points,
            contours,
        })
    }

    /// The conventional hollow-rectangle .notdef.
    fn notdef_outline(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(Point::new(100.0, 0.0));
        path.line_to(Point::new(100.0, 800.0));
        path.line_to(Point::new(500.0, 800.0));
        path.line_to(Point::new(500.0, 0.0));
        path.close_path();
        path.move_to(Point::new(150.0, 50.0));
        path.line_to(Point::new(450.0, 50.0));
        path.line_to(Point::new(450.0, 750.0));
        path.line_to(Point::new(150.0, 750.0));
        path.close_path();
        path
    }

    /// Naming entries. The full, unique, and PostScript names carry the job
    /// id so fonts from concurrent jobs never collide when installed
    /// side by side.
    fn name_entries(&self, job_id: &JobId) -> [(NameId, String); 6] {
        let family = &self.config.family_name;
        let style = &self.config.style_name;
        let ps_name: String = format!("{family}-{job_id}")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        [
            (NameId::FAMILY_NAME, family.clone()),
            (NameId::SUBFAMILY_NAME, style.clone()),
            (NameId::UNIQUE_ID, format!("{family} {style} {job_id}")),
            (NameId::FULL_NAME, format!("{family} {job_id}")),
            (NameId::VERSION_STRING, self.config.version.clone()),
            (NameId::POSTSCRIPT_NAME, ps_name),
        ]
    }

    fn name_table(&self, job_id: &JobId) -> Name {
        let records: BTreeSet<NameRecord> = self
            .name_entries(job_id)
            .into_iter()
            .map(|(id, value)| NameRecord::new(3, 1, 0x409, id, value.into()))
            .collect();
        Name::new(records)
    }
}

/// Production glyph name for a character, in the uniXXXX convention.
fn glyph_name(ch: char) -> String {
    let cp = ch as u32;
    if cp <= 0xFFFF {
        format!("uni{cp:04X}")
    } else {
        format!("u{cp:X}")
    }
}

/// Lower any cubic segments to quadratics; glyf stores quadratics only.
fn to_quadratic(path: &BezPath, accuracy: f64) -> BezPath {
    let mut out = BezPath::new();
    let mut start = Point::ZERO;
    let mut current = Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                out.move_to(p);
                start = p;
                current = p;
            }
            PathEl::LineTo(p) => {
                out.line_to(p);
                current = p;
            }
            PathEl::QuadTo(c, p) => {
                out.quad_to(c, p);
                current = p;
            }
            PathEl::CurveTo(c1, c2, p) => {
                let cubic = CubicBez::new(current, c1, c2, p);
                for (_, _, quad) in cubic.to_quads(accuracy) {
                    out.quad_to(quad.p1, quad.p2);
                }
                current = p;
            }
            PathEl::ClosePath => {
                out.close_path();
                current = start;
            }
        }
    }
    out
}

/// (max points per contour set, contour count) for maxp. Counts on-curve
/// endpoints plus quadratic off-curve points; a safe upper bound.
fn count_points(path: &BezPath) -> (u16, u16) {
    let mut points = 0u32;
    let mut contours = 0u32;
    for el in path.elements() {
        match el {
            PathEl::MoveTo(_) => {
                contours += 1;
                points += 1;
            }
            PathEl::LineTo(_) => points += 1,
            PathEl::QuadTo(..) => points += 2,
            PathEl::CurveTo(..) => points += 3,
            PathEl::ClosePath => {}
        }
    }
    (points.min(u16::MAX as u32) as u16, contours.min(u16::MAX as u32) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use write_fonts::read::{FontRef, TableProvider};

    fn triangle() -> BezPath {
        let mut path = BezPath::new();
        path.move_to(Point::new(10.0, 10.0));
        path.line_to(Point::new(50.0, 90.0));
        path.line_to(Point::new(90.0, 10.0));
        path.close_path();
        path
    }

    fn assembler() -> FontAssembler {
        FontAssembler::new(FontConfig::default())
    }

    #[test]
    fn single_triangle_builds_a_parsable_font() {
        let mut outlines = BTreeMap::new();
        outlines.insert('A', triangle());
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();

        let font = FontRef::new(&bytes).unwrap();
        assert_eq!(font.maxp().unwrap().num_glyphs(), 2);
        let cmap = font.cmap().unwrap();
        assert_eq!(cmap.map_codepoint('A'), Some(GlyphId::new(1)));
        assert_eq!(cmap.map_codepoint('B'), None);
    }

    #[test]
    fn glyph_order_is_notdef_then_ascending_codepoints() {
        let mut outlines = BTreeMap::new();
        for ch in ['z', 'A', '9', 'm'] {
            outlines.insert(ch, triangle());
        }
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();
        let font = FontRef::new(&bytes).unwrap();
        let cmap = font.cmap().unwrap();

        // BTreeMap iteration gives ascending codepoints, so gids follow suit.
        assert_eq!(cmap.map_codepoint('9'), Some(GlyphId::new(1)));
        assert_eq!(cmap.map_codepoint('A'), Some(GlyphId::new(2)));
        assert_eq!(cmap.map_codepoint('m'), Some(GlyphId::new(3)));
        assert_eq!(cmap.map_codepoint('z'), Some(GlyphId::new(4)));
    }

    #[test]
    fn empty_outline_map_yields_notdef_only_font() {
        let outlines = BTreeMap::new();
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();
        let font = FontRef::new(&bytes).unwrap();
        assert_eq!(font.maxp().unwrap().num_glyphs(), 1);
    }

    #[test]
    fn vertical_metrics_come_from_config() {
        let mut outlines = BTreeMap::new();
        outlines.insert('A', triangle());
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();
        let font = FontRef::new(&bytes).unwrap();

        let hhea = font.hhea().unwrap();
        assert_eq!(hhea.ascender().to_i16(), 800);
        assert_eq!(hhea.descender().to_i16(), -200);
        assert_eq!(font.head().unwrap().units_per_em(), 1000);
    }

    #[test]
    fn advance_width_is_uniform() {
        let mut outlines = BTreeMap::new();
        outlines.insert('A', triangle());
        outlines.insert('B', triangle());
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();
        let font = FontRef::new(&bytes).unwrap();

        let hmtx = font.hmtx().unwrap();
        for gid in 0..3u16 {
            assert_eq!(hmtx.advance(GlyphId::new(gid)), Some(600));
        }
    }

    #[test]
    fn assembly_is_deterministic_for_the_same_job() {
        let mut outlines = BTreeMap::new();
        outlines.insert('A', triangle());
        let job = JobId::new();
        let first = assembler().assemble(&outlines, &job).unwrap();
        let second = assembler().assemble(&outlines, &job).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cubic_outlines_are_accepted() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.curve_to(
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Point::new(100.0, 0.0),
        );
        path.close_path();
        let mut outlines = BTreeMap::new();
        outlines.insert('o', path);
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();
        assert!(FontRef::new(&bytes).is_ok());
    }

    #[test]
    fn lowering_cubics_leaves_no_curveto_behind() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.curve_to(
            Point::new(25.0, 50.0),
            Point::new(75.0, 50.0),
            Point::new(100.0, 0.0),
        );
        path.close_path();
        let quads = to_quadratic(&path, 1.0);
        assert!(
            !quads
                .elements()
                .iter()
                .any(|el| matches!(el, PathEl::CurveTo(..))),
            "cubics must be gone after lowering"
        );
        assert!(
            quads
                .elements()
                .iter()
                .any(|el| matches!(el, PathEl::QuadTo(..))),
            "curvature must survive as quadratics"
        );
    }

    #[test]
    fn os2_table_builds_and_reads_back_complete() {
        let mut outlines = BTreeMap::new();
        outlines.insert('A', triangle());
        let bytes = assembler().assemble(&outlines, &JobId::new()).unwrap();
        let font = FontRef::new(&bytes).unwrap();

        let os2 = font.os2().unwrap();
        assert!(os2.version() >= 2, "cap height needs a version-2 OS/2");
        assert_eq!(os2.s_typo_ascender(), 800);
        assert_eq!(os2.s_typo_descender(), -200);
        assert_eq!(os2.s_cap_height(), Some(750));
        assert_eq!(os2.us_break_char(), Some(32));
    }

    #[test]
    fn full_and_postscript_names_carry_the_job_id() {
        let job = JobId::new();
        let entries = assembler().name_entries(&job);
        let job_str = job.to_string();

        let (_, full) = entries
            .iter()
            .find(|(id, _)| *id == NameId::FULL_NAME)
            .unwrap();
        assert_eq!(full, &format!("Handwriting {job_str}"));

        let (_, ps) = entries
            .iter()
            .find(|(id, _)| *id == NameId::POSTSCRIPT_NAME)
            .unwrap();
        assert!(ps.contains(&job_str));
        assert!(
            ps.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
            "PostScript name must stay in the safe character set: {ps}"
        );
    }

    #[test]
    fn glyph_names_follow_the_uni_convention() {
        assert_eq!(glyph_name('A'), "uni0041");
        assert_eq!(glyph_name('z'), "uni007A");
        assert_eq!(glyph_name('0'), "uni0030");
    }

}
