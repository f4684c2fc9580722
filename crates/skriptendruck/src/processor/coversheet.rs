//! Single-page A4 cover sheet placed in front of every printed order.

use std::path::Path;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use tracing::{debug, warn};

use crate::config::CoversheetConfig;
use crate::error::RenderError;
use crate::filename::NAMING_CONVENTION;
use crate::logging::file_label;
use crate::order::{BindingType, Order, OrderStatus};
use crate::processor::thumbnail::{Thumbnail, ThumbnailRenderer};

pub const A4_WIDTH: f32 = 595.276;
pub const A4_HEIGHT: f32 = 841.89;

const MARGIN: f32 = 50.0;
const LINE_HEIGHT: f32 = 20.0;
const VALUE_OFFSET: f32 = 120.0;
/// Helvetica-Bold runs up to this much wider than the regular metrics.
const BOLD_WIDTH_FACTOR: f32 = 1.1;

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Regular => b"F1",
            Font::Bold => b"F2",
        }
    }
}

/// Result of a successful render. Thumbnail problems end up in `warnings`.
#[derive(Debug, Default)]
pub struct Rendered {
    pub thumbnail: bool,
    pub warnings: Vec<String>,
}

pub struct CoversheetRenderer {
    thumbnails: Arc<dyn ThumbnailRenderer>,
    header: String,
    footer: String,
}

impl CoversheetRenderer {
    pub fn new(
        thumbnails: Arc<dyn ThumbnailRenderer>,
        header: impl Into<String>,
        footer: impl Into<String>,
    ) -> Self {
        Self {
            thumbnails,
            header: header.into(),
            footer: footer.into(),
        }
    }

    pub fn from_config(config: &CoversheetConfig, thumbnails: Arc<dyn ThumbnailRenderer>) -> Self {
        Self::new(thumbnails, config.header.clone(), config.footer.clone())
    }

    pub fn with_thumbnails(mut self, thumbnails: Arc<dyn ThumbnailRenderer>) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn render(&self, order: &Order, output_path: &Path) -> Result<Rendered, RenderError> {
        let _span = tracing::info_span!("processor.coversheet").entered();

        let mut rendered = Rendered::default();
        let thumbnail = match self.thumbnails.render_first_page(&order.filepath) {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                warn!(
                    "No thumbnail for {}: {}",
                    file_label(&order.filepath),
                    e
                );
                rendered.warnings.push(e.to_string());
                None
            }
        };
        rendered.thumbnail = thumbnail.is_some();

        let bytes = self.build(order, thumbnail.as_ref())?;
        std::fs::write(output_path, bytes).map_err(|e| RenderError::Write {
            path: output_path.to_path_buf(),
            source: e,
        })?;

        debug!("Cover sheet written: {}", file_label(output_path));
        Ok(rendered)
    }

    /// Encodes the cover sheet as PDF bytes.
    pub fn build(&self, order: &Order, thumbnail: Option<&Thumbnail>) -> Result<Vec<u8>, RenderError> {
        let canvas = self.layout(order, thumbnail);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut resources = dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        };

        if let Some(thumbnail) = thumbnail {
            let mut image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => thumbnail.width as i64,
                    "Height" => thumbnail.height as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                thumbnail.rgb.clone(),
            );
            if let Err(e) = image.compress() {
                debug!("Thumbnail left uncompressed: {}", e);
            }
            let image_id = doc.add_object(image);
            resources.set(
                "XObject",
                dictionary! {
                    "Im1" => image_id,
                },
            );
        }

        let resources_id = doc.add_object(resources);

        let content = Content {
            operations: canvas.operations,
        };
        let content_bytes = content
            .encode()
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(A4_WIDTH), Object::Real(A4_HEIGHT)],
            "Resources" => resources_id,
            "Contents" => content_id,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        Ok(buffer)
    }

    fn layout(&self, order: &Order, thumbnail: Option<&Thumbnail>) -> Canvas {
        let mut c = Canvas::default();
        let right_margin = A4_WIDTH - MARGIN;

        c.fill_gray(0.4);
        c.text(Font::Regular, 10.0, MARGIN, A4_HEIGHT - 40.0, &self.header);
        c.fill_gray(0.0);

        let full_width = right_margin - MARGIN;
        let mut y = A4_HEIGHT - 75.0;
        let name = fit_text(order.display_name(), 24.0, full_width / BOLD_WIDTH_FACTOR);
        c.text(Font::Bold, 24.0, MARGIN, y, &name);
        y -= 22.0;

        if let Some(user) = &order.user {
            let mut parts = vec![format!("Username: {}", user.username)];
            if let Some(faculty) = &user.faculty {
                parts.push(format!("Faculty: {}", faculty));
            }
            c.fill_gray(0.3);
            let line = fit_text(&parts.join("   \u{2022}   "), 11.0, full_width);
            c.text(Font::Regular, 11.0, MARGIN, y, &line);
            c.fill_gray(0.0);
        }
        y -= 14.0;

        c.stroke_gray(0.7);
        c.line(MARGIN, y, right_margin, y, 1.0);
        y -= 25.0;

        let info_top = y;
        let thumb_x = A4_WIDTH / 2.0 + 20.0;
        let value_x = MARGIN + VALUE_OFFSET;
        let value_width = thumb_x - value_x - 10.0;

        let field = |c: &mut Canvas, y: &mut f32, label: &str, value: &str| {
            c.text(Font::Bold, 10.0, MARGIN, *y, label);
            c.text(Font::Regular, 10.0, value_x, *y, &fit_text(value, 10.0, value_width));
            *y -= LINE_HEIGHT;
        };

        field(&mut c, &mut y, "Order ID:", &format!("#{}", order.order_id));
        field(
            &mut c,
            &mut y,
            "Date:",
            &order.created_at.format("%d.%m.%Y %H:%M").to_string(),
        );
        field(&mut c, &mut y, "Filename:", &order.filename);
        if let Some(pages) = order.page_count {
            field(&mut c, &mut y, "Pages:", &pages.to_string());
        }
        y -= 8.0;

        if let Some(calc) = &order.price_calculation {
            field(
                &mut c,
                &mut y,
                "Print:",
                &format!("{} ({})", calc.color_mode.label(), calc.pages_price_formatted()),
            );

            let binding = match calc.binding_type {
                BindingType::None => "No binding".to_string(),
                BindingType::Folder => format!("Folder ({})", calc.binding_price_formatted()),
                BindingType::Ring => match calc.binding_size_mm {
                    Some(size) => format!(
                        "Ring binding ({}), {} mm",
                        calc.binding_price_formatted(),
                        size
                    ),
                    None => format!("Ring binding ({})", calc.binding_price_formatted()),
                },
            };
            field(&mut c, &mut y, "Binding:", &binding);
            y -= 8.0;

            field(&mut c, &mut y, "Total:", &calc.total_price_formatted());

            y -= 4.0;
            c.text(Font::Bold, 10.0, MARGIN, y, "Amount due:");
            c.text(Font::Bold, 18.0, value_x, y, &calc.price_after_deposit_formatted());
            y -= 14.0;
            c.fill_gray(0.4);
            c.text(
                Font::Regular,
                9.0,
                value_x,
                y,
                &format!("(minus {} deposit)", calc.deposit_formatted()),
            );
            c.fill_gray(0.0);
            y -= LINE_HEIGHT;
        }

        if let Some(thumbnail) = thumbnail.filter(|t| t.width > 0 && t.height > 0) {
            let max_w = right_margin - thumb_x - 10.0;
            let max_h = info_top - 80.0;
            let (img_w, img_h) = (thumbnail.width as f32, thumbnail.height as f32);
            let scale = (max_w / img_w).min(max_h / img_h).min(1.0);
            let (w, h) = (img_w * scale, img_h * scale);
            let thumb_y = info_top - h;

            c.fill_gray(0.4);
            c.text(Font::Regular, 8.0, thumb_x, info_top + 4.0, "Preview:");
            c.fill_gray(0.0);
            c.stroke_gray(0.8);
            c.rect(thumb_x - 2.0, thumb_y - 2.0, w + 4.0, h + 4.0, 0.5);
            c.image(b"Im1", thumb_x, thumb_y, w, h);
        }

        if order.status == OrderStatus::ErrorInvalidFilename {
            y -= 10.0;
            c.fill_rgb(0.8, 0.0, 0.0);
            c.text(
                Font::Bold,
                10.0,
                MARGIN,
                y,
                "ATTENTION: filename does not follow the naming convention!",
            );
            y -= LINE_HEIGHT;
            c.text(Font::Regular, 9.0, MARGIN, y, "Please name your file like this next time:");
            y -= LINE_HEIGHT;
            c.text(Font::Regular, 9.0, MARGIN, y, NAMING_CONVENTION);
            c.fill_gray(0.0);
        }

        c.fill_gray(0.5);
        c.text(Font::Regular, 8.0, MARGIN, 30.0, &self.footer);
        let order_label = format!("Order #{}", order.order_id);
        let label_x = right_margin - text_width(&order_label, 8.0);
        c.text(Font::Regular, 8.0, label_x, 30.0, &order_label);

        c
    }
}

#[derive(Default)]
struct Canvas {
    operations: Vec<Operation>,
}

impl Canvas {
    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn fill_gray(&mut self, gray: f32) {
        self.op("g", vec![Object::Real(gray)]);
    }

    fn fill_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.op("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]);
    }

    fn stroke_gray(&mut self, gray: f32) {
        self.op("G", vec![Object::Real(gray)]);
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op("BT", vec![]);
        self.op(
            "Tf",
            vec![
                Object::Name(font.resource_name().to_vec()),
                Object::Real(size),
            ],
        );
        self.op("Td", vec![Object::Real(x), Object::Real(y)]);
        self.op(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.op("w", vec![Object::Real(width)]);
        self.op("m", vec![Object::Real(x1), Object::Real(y1)]);
        self.op("l", vec![Object::Real(x2), Object::Real(y2)]);
        self.op("S", vec![]);
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32) {
        self.op("w", vec![Object::Real(width)]);
        self.op(
            "re",
            vec![Object::Real(x), Object::Real(y), Object::Real(w), Object::Real(h)],
        );
        self.op("S", vec![]);
    }

    fn image(&mut self, name: &[u8], x: f32, y: f32, w: f32, h: f32) {
        self.op("q", vec![]);
        self.op(
            "cm",
            vec![
                Object::Real(w),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(h),
                Object::Real(x),
                Object::Real(y),
            ],
        );
        self.op("Do", vec![Object::Name(name.to_vec())]);
        self.op("Q", vec![]);
    }
}

/// Maps text to WinAnsiEncoding bytes. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => ch as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            _ => b'?',
        })
        .collect()
}

/// Approximate Helvetica advance width (1/1000 em) for layout decisions.
fn glyph_width(ch: char) -> u32 {
    match ch {
        ' ' | '.' | ',' | ':' | ';' | 'f' | 't' | 'I' | '!' => 278,
        'i' | 'j' | 'l' => 222,
        'r' | '-' | '(' | ')' => 333,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 500,
        'm' | 'M' => 833,
        'w' => 722,
        'W' => 944,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 722,
        'G' | 'O' | 'Q' => 778,
        'F' | 'T' | 'Z' => 611,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667,
        _ => 556,
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(glyph_width).sum();
    units as f32 * size / 1000.0
}

/// Truncates `text` with `...` so it fits into `max_width` points.
fn fit_text(text: &str, size: f32, max_width: f32) -> String {
    if text_width(text, size) <= max_width {
        return text.to_string();
    }

    let available = max_width - text_width("...", size);
    let mut used = 0.0;
    let mut fitted = String::new();
    for ch in text.chars() {
        let w = glyph_width(ch) as f32 * size / 1000.0;
        if used + w > available {
            break;
        }
        used += w;
        fitted.push(ch);
    }
    fitted.push_str("...");
    fitted
}
