//! Signature compositing into PDF documents
//!
//! Takes the original document bytes, one captured signature asset and the
//! full field list, and produces a new signed artifact. The raster is
//! embedded exactly once as an image XObject and drawn at every field's
//! rect, converted from the stored top-left fractions to the page's
//! bottom-left point coordinates. The original bytes are never modified;
//! any embed/draw/serialize failure aborts the whole operation.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::capture::SignatureAsset;
use crate::coords::{self, PageRect};
use crate::error::FieldsignError;
use crate::fields::SignatureField;

/// XObject name the signature image is registered under on each page
const XOBJECT_NAME: &[u8] = b"SigImg";

/// Stamp the signature into every field and serialize a new artifact
pub fn compose_signed_document(
    pdf_bytes: &[u8],
    asset: &SignatureAsset,
    fields: &[SignatureField],
) -> Result<Vec<u8>, FieldsignError> {
    if fields.is_empty() {
        return Err(FieldsignError::OperationError(
            "no signature fields to stamp".to_string(),
        ));
    }

    let decoded = decode_signature_image(&asset.bytes)?;

    let mut doc = Document::load_mem(pdf_bytes)
        .map_err(|e| FieldsignError::ParseError(e.to_string()))?;

    // Embed once, reuse the same reference for every field
    let xobject_id = embed_image(&mut doc, decoded);

    let pages = doc.get_pages();
    for field in fields {
        let page_number = field.page + 1;
        let page_id = *pages
            .get(&page_number)
            .ok_or(FieldsignError::PageNotFound(field.page))?;

        let (page_width, page_height) = page_size(&doc, page_id)?;
        let rect = coords::to_page_rect(&field.rect().clamped(), page_width, page_height);

        register_page_xobject(&mut doc, page_id, xobject_id)?;
        append_page_content(&mut doc, page_id, draw_image_ops(&rect))?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| FieldsignError::OperationError(e.to_string()))?;
    Ok(output)
}

/// Sanitize a filename to a safe storage character set
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

struct DecodedImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, when the source has one
    alpha: Option<Vec<u8>>,
}

/// Resolve the asset codec: PNG first, then JPEG, then fail closed
fn decode_signature_image(bytes: &[u8]) -> Result<DecodedImage, FieldsignError> {
    if let Ok(decoded) = image::load_from_memory_with_format(bytes, image::ImageFormat::Png) {
        let (width, height) = decoded.dimensions();
        let rgba = decoded.to_rgba8();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        let mut has_alpha = false;
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            if a != 255 {
                has_alpha = true;
            }
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        return Ok(DecodedImage {
            width,
            height,
            color_space: "DeviceRGB",
            filter: "FlateDecode",
            data: flate_compress(&rgb)?,
            alpha: if has_alpha {
                Some(flate_compress(&alpha)?)
            } else {
                None
            },
        });
    }

    if let Ok(decoded) = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg) {
        let (width, height) = decoded.dimensions();
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "DeviceGray",
            _ => "DeviceRGB",
        };
        // JPEG passes through untouched under DCTDecode
        return Ok(DecodedImage {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: bytes.to_vec(),
            alpha: None,
        });
    }

    Err(FieldsignError::UnsupportedImage(
        "signature is neither PNG nor JPEG".to_string(),
    ))
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>, FieldsignError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| FieldsignError::OperationError(e.to_string()))
}

/// Add the image (and its soft mask, if any) to the document
fn embed_image(doc: &mut Document, image: DecodedImage) -> ObjectId {
    let smask_id = image.alpha.map(|alpha| {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            alpha,
        ))
    });

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => image.color_space,
        "BitsPerComponent" => 8,
        "Filter" => image.filter,
    };
    if let Some(smask_id) = smask_id {
        dict.set("SMask", Object::Reference(smask_id));
    }

    doc.add_object(Stream::new(dict, image.data))
}

/// Read the page size from its MediaBox, walking up the page tree when the
/// entry is inherited
fn page_size(doc: &Document, page_id: ObjectId) -> Result<(f64, f64), FieldsignError> {
    let mut current = page_id;
    // Page trees are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        let dict = doc
            .get_object(current)
            .and_then(Object::as_dict)
            .map_err(|e| FieldsignError::OperationError(e.to_string()))?;

        if let Ok(media_box) = dict.get(b"MediaBox").and_then(Object::as_array) {
            if media_box.len() == 4 {
                let v: Vec<f64> = media_box.iter().map(object_as_f64).collect();
                return Ok(((v[2] - v[0]).abs(), (v[3] - v[1]).abs()));
            }
            return Err(FieldsignError::OperationError(
                "malformed MediaBox".to_string(),
            ));
        }

        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }
    Err(FieldsignError::OperationError(
        "page has no MediaBox".to_string(),
    ))
}

fn object_as_f64(obj: &Object) -> f64 {
    match obj {
        Object::Real(v) => *v as f64,
        Object::Integer(v) => *v as f64,
        _ => 0.0,
    }
}

/// Content stream operations drawing the unit image into the target rect
fn draw_image_ops(rect: &PageRect) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                (rect.width as f32).into(),
                0.into(),
                0.into(),
                (rect.height as f32).into(),
                (rect.x as f32).into(),
                (rect.y as f32).into(),
            ],
        ),
        Operation::new("Do", vec![Object::Name(XOBJECT_NAME.to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

/// Where a page's Resources dictionary lives
#[derive(Clone, Copy)]
enum ResourcesLocation {
    Inline,
    Referenced(ObjectId),
}

/// Register the signature XObject under the page's resources
fn register_page_xobject(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<(), FieldsignError> {
    // Locate the Resources dictionary, creating an inline one when absent
    let found = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| FieldsignError::OperationError(e.to_string()))?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(ResourcesLocation::Referenced(*id)),
            Ok(Object::Dictionary(_)) => Some(ResourcesLocation::Inline),
            Ok(_) => {
                return Err(FieldsignError::OperationError(
                    "page Resources is not a dictionary".to_string(),
                ))
            }
            Err(_) => None,
        }
    };
    let location = match found {
        Some(location) => location,
        None => {
            page_dict_mut(doc, page_id)?
                .set("Resources", Object::Dictionary(Dictionary::new()));
            ResourcesLocation::Inline
        }
    };

    // The XObject entry inside Resources may itself be a reference
    let xobject_ref = {
        let resources = resources_dict(doc, page_id, location)?;
        match resources.get(b"XObject") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(id) = xobject_ref {
        doc.get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| FieldsignError::OperationError(e.to_string()))?
            .set(XOBJECT_NAME, Object::Reference(xobject_id));
        return Ok(());
    }

    let resources = resources_dict_mut(doc, page_id, location)?;
    if let Ok(Object::Dictionary(xobjects)) = resources.get_mut(b"XObject") {
        xobjects.set(XOBJECT_NAME, Object::Reference(xobject_id));
    } else {
        let mut xobjects = Dictionary::new();
        xobjects.set(XOBJECT_NAME, Object::Reference(xobject_id));
        resources.set("XObject", Object::Dictionary(xobjects));
    }
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, FieldsignError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| FieldsignError::OperationError(e.to_string()))
}

fn resources_dict(
    doc: &Document,
    page_id: ObjectId,
    location: ResourcesLocation,
) -> Result<&Dictionary, FieldsignError> {
    let result = match location {
        ResourcesLocation::Referenced(id) => doc.get_object(id).and_then(Object::as_dict),
        ResourcesLocation::Inline => doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .and_then(|page| page.get(b"Resources"))
            .and_then(Object::as_dict),
    };
    result.map_err(|e| FieldsignError::OperationError(e.to_string()))
}

fn resources_dict_mut(
    doc: &mut Document,
    page_id: ObjectId,
    location: ResourcesLocation,
) -> Result<&mut Dictionary, FieldsignError> {
    let result = match location {
        ResourcesLocation::Referenced(id) => doc.get_object_mut(id).and_then(Object::as_dict_mut),
        ResourcesLocation::Inline => doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .and_then(|page| page.get_mut(b"Resources"))
            .and_then(Object::as_dict_mut),
    };
    result.map_err(|e| FieldsignError::OperationError(e.to_string()))
}

/// Append a fresh content stream to the page without disturbing existing ones
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), FieldsignError> {
    let encoded = Content { operations }
        .encode()
        .map_err(|e| FieldsignError::OperationError(e.to_string()))?;
    let new_stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let existing = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| FieldsignError::OperationError(e.to_string()))?;
        page.get(b"Contents").ok().cloned()
    };

    let contents = match existing {
        None => Object::Reference(new_stream_id),
        Some(Object::Array(mut ids)) => {
            ids.push(Object::Reference(new_stream_id));
            Object::Array(ids)
        }
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(ids)) => {
                let mut ids = ids.clone();
                ids.push(Object::Reference(new_stream_id));
                Object::Array(ids)
            }
            _ => Object::Array(vec![
                Object::Reference(id),
                Object::Reference(new_stream_id),
            ]),
        },
        Some(_) => {
            return Err(FieldsignError::OperationError(
                "page Contents is malformed".to_string(),
            ))
        }
    };

    page_dict_mut(doc, page_id)?.set("Contents", contents);
    Ok(())
}
