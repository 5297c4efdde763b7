//! A4 renderer for [`ReportDocument`].
//!
//! Rendering runs in two passes: `layout` places every element on pages using
//! top-left millimetre coordinates, then `render_pdf` replays the operations
//! through printpdf and stamps the `Página i de N` footer once the page count
//! is known.

use std::path::Path;

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::*;

use super::{Fill, LogoPlacement, ReportDocument, Section, ZEBRA};
use crate::error::AppError;

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const TOP: f32 = 15.0;
const BOTTOM: f32 = 20.0;
const FOOTER_Y: f32 = PAGE_H - 10.0;
const PT_TO_MM: f32 = 0.3528;
const CELL_PAD: f32 = 1.5;
const BODY_SIZE: f32 = 9.0;

const BLACK: Fill = [0, 0, 0];
const WHITE: Fill = [255, 255, 255];
const GRID: Fill = [190, 190, 190];
const MUTED: Fill = [90, 90, 90];

// ─── Logo ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Logo {
    image: DynamicImage,
}

impl Logo {
    pub fn from_image(image: DynamicImage) -> Self {
        // The PDF image path has no alpha channel.
        Logo { image: DynamicImage::ImageRgb8(image.to_rgb8()) }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let image = image_crate::load_from_memory(bytes).map_err(|e| AppError::Pdf(e.to_string()))?;
        Ok(Logo::from_image(image))
    }

    fn pixels(&self) -> (u32, u32) {
        GenericImageView::dimensions(&self.image)
    }

    /// Printed height for a given printed width.
    pub fn height_for(&self, width_mm: f32) -> f32 {
        let (w, h) = self.pixels();
        if w == 0 {
            return 0.0;
        }
        width_mm * h as f32 / w as f32
    }
}

/// Reads the institutional logo. Any failure is logged and yields `None`:
/// reports are still produced without it.
pub fn load_logo(path: &Path) -> Option<Logo> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("No se pudo leer el logo {}: {}", path.display(), e);
            return None;
        }
    };
    match Logo::from_bytes(&bytes) {
        Ok(logo) => Some(logo),
        Err(e) => {
            log::warn!("Logo inválido {}: {}", path.display(), e);
            None
        }
    }
}

// ─── Text metrics ────────────────────────────────────────────────────────────

/// Drops characters the builtin Helvetica (WinAnsi) cannot show.
pub fn pdf_safe(text: &str) -> String {
    const WIN_ANSI_EXTRA: &str = "•–—€‘’“”…";
    let cleaned: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\t' || c == '\r' { ' ' } else { c })
        .filter(|c| (*c as u32) < 0x100 || WIN_ANSI_EXTRA.contains(*c))
        .filter(|c| !c.is_control())
        .collect();
    cleaned.trim().to_string()
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.25
}

/// Greedy word wrap; words longer than the width are split.
fn wrap(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * 0.5 * PT_TO_MM)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

// ─── Layout ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    /// `y` is the baseline.
    Text { x: f32, y: f32, size: f32, bold: bool, color: Fill, text: String },
    Rect { x: f32, y: f32, w: f32, h: f32, fill: Fill },
    Rule { x1: f32, y1: f32, x2: f32, y2: f32 },
    Image { x: f32, y: f32, width: f32 },
}

struct Layout<'a> {
    doc: &'a ReportDocument,
    done: Vec<Vec<Op>>,
    current: Vec<Op>,
    y: f32,
}

impl<'a> Layout<'a> {
    fn new(doc: &'a ReportDocument) -> Self {
        Layout { doc, done: Vec::new(), current: Vec::new(), y: TOP }
    }

    fn content_width(&self) -> f32 {
        PAGE_W - 2.0 * self.doc.margin_mm
    }

    fn new_page(&mut self) {
        self.done.push(std::mem::take(&mut self.current));
        self.y = TOP;
    }

    /// Starts a new page when `h` does not fit; returns whether it did.
    fn ensure(&mut self, h: f32) -> bool {
        if self.y + h > PAGE_H - BOTTOM && self.y > TOP {
            self.new_page();
            return true;
        }
        false
    }

    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, color: Fill, text: &str) {
        let text = pdf_safe(text);
        if text.is_empty() {
            return;
        }
        self.current.push(Op::Text { x, y, size, bold, color, text });
    }

    fn centered(&mut self, y: f32, size: f32, bold: bool, color: Fill, text: &str) {
        let x = ((PAGE_W - text_width(&pdf_safe(text), size)) / 2.0).max(self.doc.margin_mm);
        self.text(x, y, size, bold, color, text);
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Fill) {
        self.current.push(Op::Rect { x, y, w, h, fill });
    }

    fn rule(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.current.push(Op::Rule { x1, y1, x2, y2 });
    }

    /// Cell borders for a row of widths starting at the left margin.
    fn grid(&mut self, widths: &[f32], y: f32, h: f32) {
        let left = self.doc.margin_mm;
        let right = left + widths.iter().sum::<f32>();
        self.rule(left, y, right, y);
        self.rule(left, y + h, right, y + h);
        let mut x = left;
        self.rule(x, y, x, y + h);
        for w in widths {
            x += w;
            self.rule(x, y, x, y + h);
        }
    }

    fn cells(&mut self, widths: &[f32], cells: &[Vec<String>], y: f32, bold: bool, color: Fill) {
        let mut x = self.doc.margin_mm;
        for (w, lines) in widths.iter().zip(cells) {
            for (i, line) in lines.iter().enumerate() {
                let baseline = y + CELL_PAD + line_height(BODY_SIZE) * (i as f32 + 1.0) - 0.8;
                self.text(x + CELL_PAD, baseline, BODY_SIZE, bold, color, line);
            }
            x += w;
        }
    }

    fn row_height(cells: &[Vec<String>]) -> f32 {
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        lines as f32 * line_height(BODY_SIZE) + 2.0 * CELL_PAD
    }

    fn wrap_cells(widths: &[f32], values: &[String]) -> Vec<Vec<String>> {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = values.get(i).map(|v| pdf_safe(v)).unwrap_or_default();
                wrap(&value, w - 2.0 * CELL_PAD, BODY_SIZE)
            })
            .collect()
    }

    fn header(&mut self) {
        let doc = self.doc;
        let logo_top = 10.0;
        let logo_h = doc.logo.as_ref().map(|l| l.height_for(doc.logo_width_mm));

        let mut y = match (doc.logo_placement, logo_h) {
            (LogoPlacement::Centered, Some(h)) => {
                let x = (PAGE_W - doc.logo_width_mm) / 2.0;
                self.current.push(Op::Image { x, y: logo_top, width: doc.logo_width_mm });
                logo_top + h + 4.0
            }
            (LogoPlacement::Left, Some(_)) => {
                self.current.push(Op::Image { x: 15.0, y: logo_top, width: doc.logo_width_mm });
                logo_top
            }
            (_, None) => logo_top,
        };

        for line in &doc.header {
            y += line_height(line.size) + 1.0;
            self.centered(y, line.size, line.bold, line.color.unwrap_or(BLACK), &line.text);
        }
        if let (LogoPlacement::Left, Some(h)) = (doc.logo_placement, logo_h) {
            y = y.max(logo_top + h);
        }
        y += 4.0;

        let margin = doc.margin_mm;
        for (key, value) in &doc.metadata {
            y += line_height(BODY_SIZE);
            let label = format!("{}:", key);
            let offset = text_width(&pdf_safe(&label), BODY_SIZE) + 2.0;
            self.text(margin, y, BODY_SIZE, true, BLACK, &label);
            self.text(margin + offset, y, BODY_SIZE, false, BLACK, value);
        }
        if !doc.metadata.is_empty() {
            y += 4.0;
        }
        self.y = y;
    }

    fn key_value(&mut self, title: &str, rows: &[(String, String)], fill: Fill) {
        let width = self.content_width();
        let label_w = 55.0_f32.min(width * 0.4);
        let widths = [label_w, width - label_w];
        let bar_h = line_height(10.0) + 2.0 * CELL_PAD;

        self.ensure(bar_h + Self::row_height(&[vec![String::new()]]));
        let margin = self.doc.margin_mm;
        let top = self.y;
        self.rect(margin, top, width, bar_h, fill);
        self.text(margin + CELL_PAD, top + bar_h - CELL_PAD - 0.8, 10.0, true, WHITE, title);
        self.y += bar_h;

        for (label, value) in rows {
            let cells = Self::wrap_cells(&widths, &[label.clone(), value.clone()]);
            let h = Self::row_height(&cells);
            self.ensure(h);
            let y = self.y;
            self.grid(&widths, y, h);
            let mut x = margin;
            for (i, lines) in cells.iter().enumerate() {
                for (n, line) in lines.iter().enumerate() {
                    let baseline = y + CELL_PAD + line_height(BODY_SIZE) * (n as f32 + 1.0) - 0.8;
                    self.text(x + CELL_PAD, baseline, BODY_SIZE, i == 0, BLACK, line);
                }
                x += widths[i];
            }
            self.y += h;
        }
        self.y += 6.0;
    }

    fn table_header(&mut self, widths: &[f32], titles: &[String], fill: Fill) {
        let cells = Self::wrap_cells(widths, titles);
        let h = Self::row_height(&cells);
        let y = self.y;
        self.rect(self.doc.margin_mm, y, widths.iter().sum(), h, fill);
        self.grid(widths, y, h);
        self.cells(widths, &cells, y, true, WHITE);
        self.y += h;
    }

    fn table(
        &mut self,
        title: Option<&str>,
        columns: &[super::Column],
        rows: &[Vec<String>],
        fill: Fill,
        zebra: bool,
    ) {
        let width = self.content_width();
        let total: f32 = columns.iter().map(|c| c.weight.max(0.0)).sum();
        let widths: Vec<f32> = columns
            .iter()
            .map(|c| {
                if total > 0.0 {
                    width * c.weight.max(0.0) / total
                } else {
                    width / columns.len() as f32
                }
            })
            .collect();
        let titles: Vec<String> = columns.iter().map(|c| c.title.clone()).collect();

        if let Some(title) = title {
            self.ensure(line_height(11.0) + 2.0 * line_height(BODY_SIZE));
            self.y += line_height(11.0);
            let margin = self.doc.margin_mm;
            self.text(margin, self.y, 11.0, true, BLACK, title);
            self.y += 2.0;
        }
        self.ensure(2.0 * line_height(BODY_SIZE) + 4.0 * CELL_PAD);
        self.table_header(&widths, &titles, fill);

        for (i, row) in rows.iter().enumerate() {
            let cells = Self::wrap_cells(&widths, row);
            let h = Self::row_height(&cells);
            if self.ensure(h) {
                self.table_header(&widths, &titles, fill);
            }
            let y = self.y;
            if zebra && i % 2 == 1 {
                self.rect(self.doc.margin_mm, y, width, h, ZEBRA);
            }
            self.grid(&widths, y, h);
            self.cells(&widths, &cells, y, false, BLACK);
            self.y += h;
        }
        self.y += 6.0;
    }

    fn placeholder(&mut self, text: &str) {
        self.ensure(12.0);
        self.y += 8.0;
        let margin = self.doc.margin_mm;
        self.text(margin, self.y, 10.0, false, MUTED, text);
        self.y += 4.0;
    }

    fn signatures(&mut self, labels: &[String]) {
        if labels.is_empty() {
            return;
        }
        self.ensure(45.0);
        self.y += 30.0;
        let slot = self.content_width() / labels.len() as f32;
        let line_w = 70.0_f32.min(slot - 10.0);
        for (i, label) in labels.iter().enumerate() {
            let cx = self.doc.margin_mm + slot * (i as f32 + 0.5);
            self.rule(cx - line_w / 2.0, self.y, cx + line_w / 2.0, self.y);
            let x = cx - text_width(&pdf_safe(label), BODY_SIZE) / 2.0;
            self.text(x, self.y + 5.0, BODY_SIZE, false, BLACK, label);
        }
        self.y += 10.0;
    }

    fn run(mut self) -> Vec<Vec<Op>> {
        self.header();
        let doc = self.doc;
        for section in &doc.sections {
            match section {
                Section::KeyValue { title, rows, header_fill } => self.key_value(title, rows, *header_fill),
                Section::Table { title, columns, rows, header_fill, zebra } => {
                    self.table(title.as_deref(), columns, rows, *header_fill, *zebra)
                }
                Section::Placeholder(text) => self.placeholder(text),
                Section::Signatures(labels) => self.signatures(labels),
            }
        }
        self.done.push(self.current);
        self.done
    }
}

/// Places every element and appends the page footers.
pub(crate) fn layout(doc: &ReportDocument) -> Vec<Vec<Op>> {
    let mut pages = Layout::new(doc).run();
    let total = pages.len();
    for (i, ops) in pages.iter_mut().enumerate() {
        let label = format!("Página {} de {}", i + 1, total);
        let x = PAGE_W - doc.margin_mm - text_width(&label, 8.0);
        ops.push(Op::Text { x, y: FOOTER_Y, size: 8.0, bold: false, color: MUTED, text: label });
        if let Some(note) = &doc.footer_note {
            let text = pdf_safe(note);
            if !text.is_empty() {
                ops.push(Op::Text { x: doc.margin_mm, y: FOOTER_Y, size: 8.0, bold: false, color: MUTED, text });
            }
        }
    }
    pages
}

// ─── Rendering ───────────────────────────────────────────────────────────────

fn pdf_err<E: std::fmt::Debug>(e: E) -> AppError {
    AppError::Pdf(format!("{:?}", e))
}

fn color(fill: Fill) -> Color {
    Color::Rgb(Rgb::new(
        fill[0] as f32 / 255.0,
        fill[1] as f32 / 255.0,
        fill[2] as f32 / 255.0,
        None,
    ))
}

fn point(x: f32, y_top: f32) -> Point {
    Point::new(Mm(x), Mm(PAGE_H - y_top))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn draw(layer: &PdfLayerReference, op: &Op, fonts: &Fonts, logo: Option<&Logo>) {
    match op {
        Op::Text { x, y, size, bold, color: c, text } => {
            layer.set_fill_color(color(*c));
            let font = if *bold { &fonts.bold } else { &fonts.regular };
            layer.use_text(text.as_str(), *size, Mm(*x), Mm(PAGE_H - y), font);
        }
        Op::Rect { x, y, w, h, fill } => {
            layer.set_fill_color(color(*fill));
            layer.add_polygon(Polygon {
                rings: vec![vec![
                    (point(*x, *y), false),
                    (point(x + w, *y), false),
                    (point(x + w, y + h), false),
                    (point(*x, y + h), false),
                ]],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        Op::Rule { x1, y1, x2, y2 } => {
            layer.set_outline_color(color(GRID));
            layer.set_outline_thickness(0.5);
            layer.add_line(Line {
                points: vec![(point(*x1, *y1), false), (point(*x2, *y2), false)],
                is_closed: false,
            });
        }
        Op::Image { x, y, width } => {
            let Some(logo) = logo else { return };
            let (px_w, _) = logo.pixels();
            let height = logo.height_for(*width);
            Image::from_dynamic_image(&logo.image).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(Mm(*x)),
                    translate_y: Some(Mm(PAGE_H - y - height)),
                    dpi: Some(px_w as f32 * 25.4 / width),
                    ..Default::default()
                },
            );
        }
    }
}

pub fn render_pdf(doc: &ReportDocument) -> Result<Vec<u8>, AppError> {
    let pages = layout(doc);
    let (pdf, first_page, first_layer) =
        PdfDocument::new(pdf_safe(&doc.title), Mm(PAGE_W), Mm(PAGE_H), "Capa 1");
    let fonts = Fonts {
        regular: pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: pdf.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
    };

    for (i, ops) in pages.iter().enumerate() {
        let (page, layer) = if i == 0 {
            (first_page, first_layer)
        } else {
            pdf.add_page(Mm(PAGE_W), Mm(PAGE_H), "Capa 1")
        };
        let layer = pdf.get_page(page).get_layer(layer);
        for op in ops {
            draw(&layer, op, &fonts, doc.logo.as_ref());
        }
    }

    let bytes = pdf.save_to_bytes().map_err(pdf_err)?;
    log::info!("PDF generado: {} ({} páginas, {} bytes)", doc.file_name, pages.len(), bytes.len());
    Ok(bytes)
}
