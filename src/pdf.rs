use crate::backend::{FontWeight, PaintMode, TextAlign, WatermarkMark};
use crate::error::EngineError;
use crate::font::{FontMetrics, postscript_name};
use crate::recorder::{Command, Document, Page};
use crate::types::{Color, Pt, Rect};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LoDocument, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::BTreeSet;

const FONT_RESOURCES: [(FontWeight, &str); 3] = [
    (FontWeight::Regular, "F1"),
    (FontWeight::Bold, "F2"),
    (FontWeight::Italic, "F3"),
];

// Cubic Bezier control distance for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

fn font_resource(weight: FontWeight) -> &'static str {
    FONT_RESOURCES
        .iter()
        .find(|(w, _)| *w == weight)
        .map(|(_, name)| *name)
        .unwrap_or("F1")
}

fn gs_name(opacity: f32) -> String {
    format!("GS{}", opacity_key(opacity))
}

fn opacity_key(opacity: f32) -> u32 {
    (opacity.clamp(0.0, 1.0) * 1000.0).round() as u32
}

/// Maps text to WinAnsiEncoding bytes; unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (c as u32) < 0x80 => c as u8,
            c if (0xa0..=0xff).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn real(value: f32) -> Object {
    Object::from(value)
}

fn color_operands(color: Color) -> Vec<Object> {
    vec![real(color.r), real(color.g), real(color.b)]
}

struct PageWriter<'a> {
    width: f32,
    height: f32,
    metrics: &'a FontMetrics,
    font: (FontWeight, Pt),
    ops: Vec<Operation>,
}

impl<'a> PageWriter<'a> {
    fn new(page: &Page, metrics: &'a FontMetrics) -> Self {
        Self {
            width: page.size.width.to_f32(),
            height: page.size.height.to_f32(),
            metrics,
            font: (FontWeight::Regular, Pt::from_f32(12.0)),
            ops: Vec::new(),
        }
    }

    fn flip(&self, y: Pt) -> f32 {
        self.height - y.to_f32()
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn write(&mut self, command: &Command) {
        match command {
            Command::SetFillColor(color) => self.op("rg", color_operands(*color)),
            Command::SetStrokeColor(color) => self.op("RG", color_operands(*color)),
            Command::SetLineWidth(width) => self.op("w", vec![real(width.to_f32())]),
            Command::SetFont { weight, size } => self.font = (*weight, *size),
            Command::Rect { rect, mode, radius } => self.rect(*rect, *mode, *radius),
            Command::Line { x1, y1, x2, y2 } => {
                self.op("m", vec![real(x1.to_f32()), real(self.flip(*y1))]);
                self.op("l", vec![real(x2.to_f32()), real(self.flip(*y2))]);
                self.op("S", vec![]);
            }
            Command::Text { x, y, text, align } => self.text(*x, *y, text, *align),
            Command::Watermark(mark) => self.watermark(mark),
        }
    }

    fn rect(&mut self, rect: Rect, mode: PaintMode, radius: Pt) {
        let x = rect.x.to_f32();
        let w = rect.width.to_f32();
        let h = rect.height.to_f32();
        let bottom = self.flip(rect.bottom());
        let r = radius.to_f32().min(w / 2.0).min(h / 2.0);
        if r <= 0.0 {
            self.op("re", vec![real(x), real(bottom), real(w), real(h)]);
        } else {
            let top = bottom + h;
            let right = x + w;
            let c = r * KAPPA;
            self.op("m", vec![real(x + r), real(top)]);
            self.op("l", vec![real(right - r), real(top)]);
            self.curve(right - r + c, top, right, top - r + c, right, top - r);
            self.op("l", vec![real(right), real(bottom + r)]);
            self.curve(right, bottom + r - c, right - r + c, bottom, right - r, bottom);
            self.op("l", vec![real(x + r), real(bottom)]);
            self.curve(x + r - c, bottom, x, bottom + r - c, x, bottom + r);
            self.op("l", vec![real(x), real(top - r)]);
            self.curve(x, top - r + c, x + r - c, top, x + r, top);
            self.op("h", vec![]);
        }
        let paint = match mode {
            PaintMode::Fill => "f",
            PaintMode::Stroke => "S",
            PaintMode::FillStroke => "B",
        };
        self.op(paint, vec![]);
    }

    fn curve(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.op(
            "c",
            vec![real(x1), real(y1), real(x2), real(y2), real(x), real(y)],
        );
    }

    fn text(&mut self, x: Pt, y: Pt, text: &str, align: TextAlign) {
        let (weight, size) = self.font;
        let width = self.metrics.measure(text, weight, size);
        let x = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - width.half(),
            TextAlign::Right => x - width,
        };
        self.op("BT", vec![]);
        self.op(
            "Tf",
            vec![
                Object::Name(font_resource(weight).as_bytes().to_vec()),
                real(size.to_f32()),
            ],
        );
        self.op("Td", vec![real(x.to_f32()), real(self.flip(y))]);
        self.op(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    fn watermark(&mut self, mark: &WatermarkMark) {
        let width = self.metrics.measure(&mark.text, FontWeight::Bold, mark.size);
        let (sin, cos) = mark.angle_deg.to_radians().sin_cos();
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        // Shift the origin back along the rotated baseline so the mark is centred.
        let dx = width.to_f32() / 2.0;
        let dy = mark.size.to_f32() * 0.35;
        let e = cx - (dx * cos - dy * sin);
        let f = cy - (dx * sin + dy * cos);
        self.op("q", vec![]);
        self.op(
            "gs",
            vec![Object::Name(gs_name(mark.opacity).into_bytes())],
        );
        self.op("rg", color_operands(mark.color));
        self.op("BT", vec![]);
        self.op(
            "Tf",
            vec![
                Object::Name(font_resource(FontWeight::Bold).as_bytes().to_vec()),
                real(mark.size.to_f32()),
            ],
        );
        self.op(
            "Tm",
            vec![real(cos), real(sin), real(-sin), real(cos), real(e), real(f)],
        );
        self.op(
            "Tj",
            vec![Object::String(encode_win_ansi(&mark.text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
        self.op("Q", vec![]);
    }
}

fn watermark_opacities(document: &Document) -> BTreeSet<u32> {
    document
        .pages
        .iter()
        .flat_map(|page| page.commands.iter())
        .filter_map(|cmd| match cmd {
            Command::Watermark(mark) => Some(opacity_key(mark.opacity)),
            _ => None,
        })
        .collect()
}

fn resources_dictionary(font_ids: &[(FontWeight, ObjectId)], opacities: &BTreeSet<u32>) -> Dictionary {
    let mut fonts = Dictionary::new();
    for (weight, id) in font_ids {
        fonts.set(font_resource(*weight), *id);
    }
    let mut resources = dictionary! { "Font" => fonts };
    if !opacities.is_empty() {
        let mut states = Dictionary::new();
        for key in opacities {
            let alpha = *key as f32 / 1000.0;
            states.set(
                format!("GS{key}").into_bytes(),
                dictionary! { "Type" => "ExtGState", "ca" => alpha, "CA" => alpha },
            );
        }
        resources.set("ExtGState", states);
    }
    resources
}

/// Serializes a recorded document to PDF bytes.
pub fn document_to_pdf(
    document: &Document,
    title: Option<&str>,
    metrics: &FontMetrics,
) -> Result<Vec<u8>, EngineError> {
    let mut doc = LoDocument::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_ids: Vec<(FontWeight, ObjectId)> = FONT_RESOURCES
        .iter()
        .map(|(weight, _)| {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => postscript_name(*weight),
                "Encoding" => "WinAnsiEncoding",
            });
            (*weight, id)
        })
        .collect();
    let resources_id = doc.add_object(resources_dictionary(
        &font_ids,
        &watermark_opacities(document),
    ));

    let mut kids: Vec<Object> = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let mut writer = PageWriter::new(page, metrics);
        for command in &page.commands {
            writer.write(command);
        }
        let content = Content {
            operations: writer.ops,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                real(0.0),
                real(0.0),
                real(page.size.width.to_f32()),
                real(page.size.height.to_f32()),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! { "Producer" => Object::string_literal("folio") };
    if let Some(title) = title {
        info.set("Title", Object::String(encode_win_ansi(title), StringFormat::Literal));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;

    fn sample_document(pages: usize) -> Document {
        Document {
            pages: (0..pages)
                .map(|idx| Page {
                    size: Size::a4(),
                    commands: vec![
                        Command::SetFillColor(Color::BLACK),
                        Command::SetFont {
                            weight: FontWeight::Bold,
                            size: Pt::from_f32(9.0),
                        },
                        Command::Text {
                            x: Pt::from_f32(100.0),
                            y: Pt::from_f32(100.0),
                            text: format!("Page {} \u{2014} total", idx + 1),
                            align: TextAlign::Right,
                        },
                        Command::Rect {
                            rect: Rect::new(
                                Pt::from_f32(10.0),
                                Pt::from_f32(10.0),
                                Pt::from_f32(50.0),
                                Pt::from_f32(20.0),
                            ),
                            mode: PaintMode::FillStroke,
                            radius: Pt::from_f32(4.0),
                        },
                    ],
                })
                .collect(),
        }
    }

    #[test]
    fn win_ansi_maps_typographic_punctuation() {
        assert_eq!(encode_win_ansi("a\u{2014}b"), vec![b'a', 0x97, b'b']);
        assert_eq!(encode_win_ansi("\u{e9}"), vec![0xe9]);
        assert_eq!(encode_win_ansi("\u{4e2d}"), vec![b'?']);
    }

    #[test]
    fn serialized_pdf_has_one_page_per_recorded_page() {
        let metrics = FontMetrics::default();
        let bytes = document_to_pdf(&sample_document(3), Some("Estimate EST-1"), &metrics)
            .expect("serialize");
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let parsed = LoDocument::load_mem(&bytes).expect("parse back");
        assert_eq!(parsed.get_pages().len(), 3);
    }

    #[test]
    fn watermark_opacity_becomes_an_ext_gstate() {
        let mut document = sample_document(1);
        document.pages[0].commands.push(Command::Watermark(WatermarkMark {
            text: "DRAFT".to_string(),
            size: Pt::from_f32(72.0),
            color: Color::rgb(0.5, 0.5, 0.5),
            opacity: 0.12,
            angle_deg: 45.0,
        }));
        let opacities = watermark_opacities(&document);
        assert_eq!(opacities.into_iter().collect::<Vec<_>>(), vec![120]);
        let bytes = document_to_pdf(&document, None, &FontMetrics::default()).expect("serialize");
        let parsed = LoDocument::load_mem(&bytes).expect("parse back");
        assert_eq!(parsed.get_pages().len(), 1);
    }
}
