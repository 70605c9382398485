//! Flatten overlays into a PDF
//!
//! Each page that carries fields gets its existing content wrapped in
//! `q … Q` followed by one appended content stream that draws the fields in
//! insertion order. Signatures become image XObjects; text is set in a
//! standard Type1 font with `WinAnsiEncoding`.

use crate::coords::{MediaBox, PdfScale, PreviewSize};
use crate::data_uri::DataUri;
use crate::error::{Result, StampError};
use crate::fonts::{encode_win_ansi, StandardFont};
use crate::overlay::{FieldKind, OverlayField, OverlayLayer};
use crate::wrap::{line_height, wrap_text};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use std::io::{Cursor, Write};

fn parse_error(e: lopdf::Error) -> StampError {
    StampError::DocumentParse(e.to_string())
}

fn load(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(parse_error)?;
    if doc.is_encrypted() {
        return Err(StampError::UnsupportedDocument(
            "encrypted PDFs are not supported".into(),
        ));
    }
    Ok(doc)
}

/// Box of every page as a viewer shows it, in page order.
pub(crate) fn page_boxes(bytes: &[u8]) -> Result<Vec<MediaBox>> {
    let doc = load(bytes)?;
    doc.get_pages()
        .values()
        .map(|&page_id| PageFrame::read(&doc, page_id).map(|frame| frame.displayed()))
        .collect()
}

/// Look up a page attribute, following `Parent` links for inherited ones.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Result<Option<&'a Object>> {
    let mut current = Some(page_id);
    // Bounded walk so a malformed cyclic tree cannot spin forever
    for _ in 0..64 {
        let Some(id) = current else { break };
        let dict = doc.get_dictionary(id).map_err(parse_error)?;
        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(None)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    doc.dereference(object)
        .map(|(_, resolved)| resolved)
        .map_err(parse_error)
}

fn media_box(doc: &Document, page_id: ObjectId) -> Result<MediaBox> {
    let Some(raw) = inherited(doc, page_id, b"MediaBox")? else {
        tracing::warn!(?page_id, "page has no MediaBox, assuming US Letter");
        return Ok(MediaBox::letter());
    };
    let values = resolve(doc, raw)?
        .as_array()
        .map_err(parse_error)?
        .iter()
        .map(|v| resolve(doc, v).and_then(|v| v.as_float().map_err(parse_error)))
        .collect::<Result<Vec<f32>>>()?;
    match values.as_slice() {
        [llx, lly, urx, ury] => Ok(MediaBox::from_corners(
            *llx as f64,
            *lly as f64,
            *urx as f64,
            *ury as f64,
        )),
        _ => Err(StampError::DocumentParse(format!(
            "MediaBox has {} entries, expected 4",
            values.len()
        ))),
    }
}

/// Media box of a page plus the clockwise turn a viewer applies to it.
#[derive(Debug, Clone, Copy)]
struct PageFrame {
    media_box: MediaBox,
    rotate: u16,
}

impl PageFrame {
    fn read(doc: &Document, page_id: ObjectId) -> Result<Self> {
        let media_box = media_box(doc, page_id)?;
        let degrees = match inherited(doc, page_id, b"Rotate")? {
            Some(raw) => resolve(doc, raw)?.as_i64().map_err(parse_error)?,
            None => 0,
        };
        let rotate = match degrees.rem_euclid(360) {
            turn @ (0 | 90 | 180 | 270) => turn as u16,
            _ => {
                tracing::warn!(?page_id, degrees, "Rotate is not a multiple of 90, ignoring it");
                0
            }
        };
        Ok(Self { media_box, rotate })
    }

    /// Quarter-turned pages swap width and height on screen.
    fn displayed(&self) -> MediaBox {
        match self.rotate {
            0 => self.media_box,
            90 | 270 => MediaBox::from_size(self.media_box.height, self.media_box.width),
            _ => MediaBox::from_size(self.media_box.width, self.media_box.height),
        }
    }

    /// `cm` operands mapping the displayed box onto the unrotated page.
    fn to_page_space(&self) -> Option<[f64; 6]> {
        let MediaBox {
            x,
            y,
            width,
            height,
        } = self.media_box;
        match self.rotate {
            90 => Some([0.0, 1.0, -1.0, 0.0, x + width, y]),
            180 => Some([-1.0, 0.0, 0.0, -1.0, x + width, y + height]),
            270 => Some([0.0, -1.0, 1.0, 0.0, x, y + height]),
            _ => None,
        }
    }
}

/// Resources in effect for a page, copied so they can be extended without
/// touching dictionaries shared with other pages.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match inherited(doc, page_id, b"Resources")? {
        Some(obj) => Ok(resolve(doc, obj)?.as_dict().map_err(parse_error)?.clone()),
        None => Ok(Dictionary::new()),
    }
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Result<Dictionary> {
    match resources.get(key) {
        Ok(obj) => Ok(resolve(doc, obj)?.as_dict().map_err(parse_error)?.clone()),
        Err(_) => Ok(Dictionary::new()),
    }
}

/// First `<prefix><n>` not already used in `dict`.
fn fresh_name(dict: &Dictionary, prefix: &str) -> Vec<u8> {
    (1u32..)
        .map(|n| format!("{}{}", prefix, n).into_bytes())
        .find(|name| !dict.has(name))
        .unwrap_or_else(|| prefix.as_bytes().to_vec())
}

/// Objects shared across pages: one XObject per distinct signature image,
/// one font dictionary per standard font.
#[derive(Default)]
struct Embedded<'a> {
    images: HashMap<&'a str, ObjectId>,
    fonts: HashMap<StandardFont, ObjectId>,
}

impl<'a> Embedded<'a> {
    fn image(&mut self, doc: &mut Document, field: &'a OverlayField) -> Result<ObjectId> {
        if let Some(&id) = self.images.get(field.content.as_str()) {
            return Ok(id);
        }
        let id = embed_image(doc, field)?;
        self.images.insert(field.content.as_str(), id);
        Ok(id)
    }

    fn font(&mut self, doc: &mut Document, font: StandardFont) -> ObjectId {
        *self.fonts.entry(font).or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            })
        })
    }
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Width, height and PDF color space of a JPEG that can be embedded as-is.
///
/// `image` reports CMYK and YCCK JPEGs as RGB, so an ICC profile for any
/// other color space also rules out pass-through.
fn passthrough_jpeg(data: &[u8]) -> Option<(u32, u32, &'static str)> {
    let mut decoder = JpegDecoder::new(Cursor::new(data)).ok()?;
    let (color_space, profile_space): (&'static str, &[u8]) =
        match decoder.original_color_type() {
            ExtendedColorType::L8 => ("DeviceGray", &b"GRAY"[..]),
            ExtendedColorType::Rgb8 => ("DeviceRGB", &b"RGB "[..]),
            _ => return None,
        };
    if let Some(icc) = decoder.icc_profile().ok().flatten() {
        if icc.get(16..20) != Some(profile_space) {
            return None;
        }
    }
    let (width, height) = decoder.dimensions();
    Some((width, height, color_space))
}

fn embed_image(doc: &mut Document, field: &OverlayField) -> Result<ObjectId> {
    let asset = |reason: String| StampError::asset(Some(field.id), reason);
    let uri = DataUri::parse(&field.content).map_err(|e| asset(e.to_string()))?;
    let format = image::guess_format(&uri.data).map_err(|e| asset(e.to_string()))?;

    // Gray and RGB JPEGs go in untouched
    if format == ImageFormat::Jpeg {
        if let Some((width, height, color_space)) = passthrough_jpeg(&uri.data) {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            };
            return Ok(doc.add_object(Stream::new(dict, uri.data)));
        }
    }

    let rgba = image::load_from_memory_with_format(&uri.data, format)
        .map_err(|e| asset(e.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px[3]);
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if alpha.iter().any(|&a| a < 255) {
        let smask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let smask_id = doc.add_object(Stream::new(smask, deflate(&alpha)?));
        dict.set("SMask", Object::Reference(smask_id));
    }

    Ok(doc.add_object(Stream::new(dict, deflate(&rgb)?)))
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn stamp_page<'a>(
    doc: &mut Document,
    page_id: ObjectId,
    fields: &[&'a OverlayField],
    preview: PreviewSize,
    embedded: &mut Embedded<'a>,
) -> Result<()> {
    let frame = PageFrame::read(doc, page_id)?;
    let scale = PdfScale::new(preview, frame.displayed())?;
    let mut resources = effective_resources(doc, page_id)?;
    let mut xobjects = sub_dictionary(doc, &resources, b"XObject")?;
    let mut fonts = sub_dictionary(doc, &resources, b"Font")?;
    let mut font_names: HashMap<StandardFont, Vec<u8>> = HashMap::new();

    // Closes the q that now precedes the original content
    let mut ops = vec![Operation::new("Q", vec![])];
    if let Some(matrix) = frame.to_page_space() {
        ops.push(Operation::new("cm", matrix.into_iter().map(real).collect()));
    }

    for &field in fields {
        let rect = scale.rect(&field.rect());
        match field.kind {
            FieldKind::Signature => {
                let image_id = embedded.image(doc, field)?;
                let name = fresh_name(&xobjects, "InkIm");
                xobjects.set(name.clone(), Object::Reference(image_id));
                ops.extend([
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            real(rect.width),
                            real(0.0),
                            real(0.0),
                            real(rect.height),
                            real(rect.x),
                            real(rect.y),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(name)]),
                    Operation::new("Q", vec![]),
                ]);
            }
            FieldKind::Text => {
                let font = StandardFont::from_family(&field.style.font_family);
                let size = field.style.font_size * scale.sy;
                let lines = wrap_text(&font, &field.content, size, rect.width);
                if lines.is_empty() {
                    continue;
                }
                let (r, g, b) = field.style.rgb()?.to_unit();

                let name = match font_names.get(&font) {
                    Some(name) => name.clone(),
                    None => {
                        let font_id = embedded.font(doc, font);
                        let name = fresh_name(&fonts, "InkF");
                        fonts.set(name.clone(), Object::Reference(font_id));
                        font_names.insert(font, name.clone());
                        name
                    }
                };

                // First baseline sits one font size below the field's top edge
                let top = scale.top(field.y);
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![Object::Name(name), real(size)]));
                ops.push(Operation::new(
                    "rg",
                    vec![Object::Real(r), Object::Real(g), Object::Real(b)],
                ));
                for (i, line) in lines.iter().enumerate() {
                    let encoded = encode_win_ansi(line)
                        .map_err(|ch| StampError::TextEncoding { field: field.id, ch })?;
                    let baseline = top - size - i as f64 * line_height(size);
                    ops.push(Operation::new(
                        "Tm",
                        vec![
                            real(1.0),
                            real(0.0),
                            real(0.0),
                            real(1.0),
                            real(rect.x),
                            real(baseline),
                        ],
                    ));
                    ops.push(Operation::new(
                        "Tj",
                        vec![Object::String(encoded, StringFormat::Literal)],
                    ));
                }
                ops.push(Operation::new("ET", vec![]));
            }
        }
        tracing::debug!(field = %field.id, kind = ?field.kind, ?rect, "stamped field");
    }

    let content = Content { operations: ops }
        .encode()
        .map_err(|e| StampError::Export(e.to_string()))?;

    let existing = {
        let page = doc.get_dictionary(page_id).map_err(parse_error)?;
        match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(parts)) => parts.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(parts)) => parts.clone(),
            Ok(_) => {
                return Err(StampError::Export(
                    "page Contents is neither a stream reference nor an array".into(),
                ))
            }
            Err(_) => Vec::new(),
        }
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    if !xobjects.is_empty() {
        resources.set("XObject", xobjects);
    }
    if !fonts.is_empty() {
        resources.set("Font", fonts);
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(parse_error)?;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", resources);
    Ok(())
}

/// Draw every field of `layer` onto its page and return the new PDF.
///
/// With no fields the input bytes are returned unchanged. Any failure
/// aborts the whole export.
#[tracing::instrument(skip_all, fields(fields = layer.len()))]
pub fn stamp_pdf(bytes: &[u8], layer: &OverlayLayer, preview: PreviewSize) -> Result<Vec<u8>> {
    if layer.is_empty() {
        return Ok(bytes.to_vec());
    }

    let mut doc = load(bytes)?;
    let pages = doc.get_pages();
    let page_count = pages.len() as u32;
    if let Some(field) = layer.fields().iter().find(|f| f.page > page_count) {
        return Err(StampError::PageOutOfRange {
            page: field.page,
            page_count,
        });
    }
    super::check_bounds(layer, preview)?;

    let mut embedded = Embedded::default();
    for (page_number, page_id) in pages {
        let fields = layer.fields_for_page(page_number);
        if fields.is_empty() {
            continue;
        }
        stamp_page(&mut doc, page_id, &fields, preview, &mut embedded)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| StampError::Export(e.to_string()))?;

    tracing::info!(pages = page_count, bytes = output.len(), "stamped PDF");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::PreviewRect;
    use crate::signature::encode_png;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    fn create_test_pdf(page_count: usize) -> Vec<u8> {
        create_turned_pdf(page_count, 0)
    }

    fn create_turned_pdf(page_count: usize, rotate: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..page_count {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Page {}", i + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Rotate" => rotate,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn signature_uri() -> String {
        let img = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 128]));
        DataUri::png(encode_png(&img).unwrap()).encode()
    }

    fn letter() -> PreviewSize {
        PreviewSize::new(612.0, 792.0).unwrap()
    }

    fn rect(x: f64, y: f64, width: f64, height: f64) -> PreviewRect {
        PreviewRect {
            x,
            y,
            width,
            height,
        }
    }

    fn page_ops(bytes: &[u8], page: u32) -> Vec<Operation> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = doc.get_pages()[&page];
        let content = doc.get_page_content(page_id).unwrap();
        Content::decode(&content).unwrap().operations
    }

    fn floats(op: &Operation) -> Vec<f32> {
        op.operands.iter().map(|o| o.as_float().unwrap()).collect()
    }

    #[test]
    fn test_inherited_media_box() {
        let boxes = page_boxes(&create_test_pdf(2)).unwrap();
        assert_eq!(boxes, vec![MediaBox::letter(), MediaBox::letter()]);
    }

    #[test]
    fn test_turned_pages_report_displayed_size() {
        let landscape = MediaBox::from_size(792.0, 612.0);
        assert_eq!(page_boxes(&create_turned_pdf(1, 90)).unwrap(), vec![landscape]);
        assert_eq!(page_boxes(&create_turned_pdf(1, -90)).unwrap(), vec![landscape]);
        assert_eq!(
            page_boxes(&create_turned_pdf(1, 180)).unwrap(),
            vec![MediaBox::letter()]
        );
        assert_eq!(
            page_boxes(&create_turned_pdf(1, 45)).unwrap(),
            vec![MediaBox::letter()]
        );
    }

    #[test]
    fn test_signature_on_turned_page_follows_viewer() {
        let pdf = create_turned_pdf(1, 90);
        let mut layer = OverlayLayer::new();
        layer
            .add(OverlayField::new(
                FieldKind::Signature,
                1,
                rect(0.0, 0.0, 100.0, 50.0),
                signature_uri(),
            ))
            .unwrap();

        let landscape = PreviewSize::new(792.0, 612.0).unwrap();
        let out = stamp_pdf(&pdf, &layer, landscape).unwrap();
        let ops = page_ops(&out, 1);
        let cms: Vec<Vec<f32>> = ops
            .iter()
            .filter(|op| op.operator == "cm")
            .map(floats)
            .collect();
        // Displayed top-left corner is the page's bottom-left corner
        assert_eq!(
            cms,
            vec![
                vec![0.0, 1.0, -1.0, 0.0, 612.0, 0.0],
                vec![100.0, 0.0, 0.0, 50.0, 0.0, 562.0],
            ]
        );
    }

    #[test]
    fn test_empty_layer_returns_original() {
        let pdf = create_test_pdf(1);
        let out = stamp_pdf(&pdf, &OverlayLayer::new(), letter()).unwrap();
        assert_eq!(out, pdf);
    }

    #[test]
    fn test_signature_drawn_at_transformed_box() {
        let pdf = create_test_pdf(1);
        let mut layer = OverlayLayer::new();
        layer
            .add(OverlayField::new(
                FieldKind::Signature,
                1,
                rect(100.0, 100.0, 200.0, 100.0),
                signature_uri(),
            ))
            .unwrap();

        let out = stamp_pdf(&pdf, &layer, letter()).unwrap();
        let ops = page_ops(&out, 1);

        assert_eq!(ops.first().unwrap().operator, "q");
        let cm = ops.iter().find(|op| op.operator == "cm").unwrap();
        assert_eq!(floats(cm), vec![200.0, 0.0, 0.0, 100.0, 100.0, 592.0]);
        let dos: Vec<_> = ops.iter().filter(|op| op.operator == "Do").collect();
        assert_eq!(dos.len(), 1);
        assert_eq!(dos[0].operands[0], Object::Name(b"InkIm1".to_vec()));
    }

    #[test]
    fn test_translucent_signature_gets_soft_mask() {
        let pdf = create_test_pdf(1);
        let mut layer = OverlayLayer::new();
        layer
            .add(OverlayField::new(
                FieldKind::Signature,
                1,
                rect(0.0, 0.0, 100.0, 50.0),
                signature_uri(),
            ))
            .unwrap();
        let out = stamp_pdf(&pdf, &layer, letter()).unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages()[&1];
        let resources = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap();
        let image_ref = resources
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"InkIm1")
            .unwrap()
            .as_reference()
            .unwrap();
        let image = doc.get_object(image_ref).unwrap().as_stream().unwrap();
        assert!(image.dict.has(b"SMask"));
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
    }

    #[test]
    fn test_text_lines_and_font() {
        let pdf = create_test_pdf(1);
        let mut layer = OverlayLayer::new();
        let mut field = OverlayField::new(
            FieldKind::Text,
            1,
            rect(50.0, 100.0, 200.0, 100.0),
            "Signed in duplicate by both parties on the date written below",
        );
        field.style.color = "#ff0000".into();
        layer.add(field).unwrap();

        let out = stamp_pdf(&pdf, &layer, letter()).unwrap();
        let ops = page_ops(&out, 1);

        let tf = ops.iter().find(|op| op.operator == "Tf").unwrap();
        assert_eq!(tf.operands[0], Object::Name(b"InkF1".to_vec()));
        let rg = ops.iter().find(|op| op.operator == "rg").unwrap();
        assert_eq!(floats(rg), vec![1.0, 0.0, 0.0]);

        let baselines: Vec<f32> = ops
            .iter()
            .filter(|op| op.operator == "Tm")
            .map(|op| floats(op)[5])
            .collect();
        assert!(baselines.len() >= 2);
        // top = 792 - 100, first baseline one 12pt size below it
        assert!((baselines[0] - 680.0).abs() < 1e-3);
        assert!((baselines[0] - baselines[1] - 14.4).abs() < 1e-3);
    }

    #[test]
    fn test_non_win_ansi_text_names_field() {
        let pdf = create_test_pdf(1);
        let mut layer = OverlayLayer::new();
        let id = layer
            .add(OverlayField::new(
                FieldKind::Text,
                1,
                rect(50.0, 100.0, 200.0, 100.0),
                "签名",
            ))
            .unwrap();
        let err = stamp_pdf(&pdf, &layer, letter()).unwrap_err();
        assert!(matches!(err, StampError::TextEncoding { field, .. } if field == id));
    }

    #[test]
    fn test_bad_image_aborts_export() {
        let pdf = create_test_pdf(1);
        let mut layer = OverlayLayer::new();
        let id = layer
            .add(OverlayField::new(
                FieldKind::Signature,
                1,
                rect(0.0, 0.0, 100.0, 50.0),
                "data:image/png;base64,AAAA",
            ))
            .unwrap();
        let err = stamp_pdf(&pdf, &layer, letter()).unwrap_err();
        assert!(matches!(err, StampError::AssetLoad { field: Some(f), .. } if f == id));
    }

    #[test]
    fn test_field_past_last_page() {
        let pdf = create_test_pdf(1);
        let mut layer = OverlayLayer::new();
        layer
            .add(OverlayField::new(
                FieldKind::Text,
                3,
                rect(0.0, 0.0, 100.0, 50.0),
                "x",
            ))
            .unwrap();
        assert!(matches!(
            stamp_pdf(&pdf, &layer, letter()),
            Err(StampError::PageOutOfRange {
                page: 3,
                page_count: 1
            })
        ));
    }

    #[test]
    fn test_fresh_name_skips_existing() {
        let dict = dictionary! {
            "InkIm1" => Object::Null,
            "InkIm2" => Object::Null,
        };
        assert_eq!(fresh_name(&dict, "InkIm"), b"InkIm3".to_vec());
    }

    #[test]
    fn test_passthrough_jpeg() {
        let rgb = image::RgbImage::from_pixel(7, 5, image::Rgb([9, 9, 9]));
        let mut jpeg = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(passthrough_jpeg(&jpeg), Some((7, 5, "DeviceRGB")));

        let gray = image::GrayImage::from_pixel(4, 6, image::Luma([80]));
        let mut jpeg = Vec::new();
        gray.write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        assert_eq!(passthrough_jpeg(&jpeg), Some((4, 6, "DeviceGray")));

        assert_eq!(passthrough_jpeg(b"\x89PNG"), None);
        assert_eq!(passthrough_jpeg(b"\xFF\xD8\xFF"), None);
    }
}
