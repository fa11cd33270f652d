use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::catalog::Job;
use crate::error::StageError;
use crate::stages::frames::{Frame, FrameSet};
use crate::stages::PageAssembler;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Idempotency predicate for assembly.
pub fn document_exists(path: &Path) -> bool {
    path.is_file()
}

/// Builds one PDF page per frame, each page sized to the frame's pixels.
pub struct PdfPageAssembler {
    jpeg_quality: u8,
}

impl PdfPageAssembler {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn encode_frame(&self, frame: &Frame) -> Result<EncodedFrame, StageError> {
        let failed = |reason: String| StageError::AssemblyFailed {
            cause: format!("{}: {}", frame.path.display(), reason),
        };

        let img = ImageReader::open(&frame.path)
            .map_err(|e| failed(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| failed(e.to_string()))?
            .decode()
            .map_err(|e| failed(format!("failed to decode: {}", e)))?;

        // Frames may arrive as CMYK, grayscale or 16-bit; DCTDecode pages are
        // always written as 8-bit RGB.
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut jpeg = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality))
            .map_err(|e| failed(format!("failed to encode: {}", e)))?;

        Ok(EncodedFrame {
            width,
            height,
            jpeg,
        })
    }
}

impl Default for PdfPageAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

struct EncodedFrame {
    width: u32,
    height: u32,
    jpeg: Vec<u8>,
}

impl PageAssembler for PdfPageAssembler {
    fn assemble(&self, job: &Job, frames: &FrameSet) -> Result<PathBuf, StageError> {
        if document_exists(&job.document_path) {
            info!("Document already exists for {}", job.file_name);
            return Ok(job.document_path.clone());
        }

        if frames.is_empty() {
            return Err(StageError::AssemblyFailed {
                cause: format!("no frames in {}", frames.dir().display()),
            });
        }

        let mut pages = Vec::with_capacity(frames.len());
        for frame in frames.iter() {
            pages.push(self.encode_frame(frame)?);
        }

        let mut doc = build_document(&pages);
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| StageError::AssemblyFailed {
            cause: format!("failed to serialize PDF: {}", e),
        })?;

        write_atomically(&job.document_path, &buffer)?;

        debug!(
            "Wrote {} pages to {}",
            pages.len(),
            job.document_path.display()
        );
        Ok(job.document_path.clone())
    }
}

fn build_document(pages: &[EncodedFrame]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let page_id = add_page(&mut doc, pages_id, page);
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
    doc
}

fn add_page(doc: &mut Document, pages_id: ObjectId, page: &EncodedFrame) -> ObjectId {
    let width = page.width as i64;
    let height = page.height as i64;

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        page.jpeg.clone(),
    ));

    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im0" => image_id,
        },
    });

    // Full-bleed: one image pixel per point.
    let content = format!("q\n{} 0 0 {} 0 0 cm\n/Im0 Do\nQ\n", width, height);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    })
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    let failed = |e: std::io::Error| StageError::AssemblyFailed {
        cause: format!("failed to write {}: {}", path.display(), e),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }

    let partial = partial_path(path);
    let result = std::fs::write(&partial, bytes).and_then(|_| std::fs::rename(&partial, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(failed(e));
    }
    Ok(())
}

/// Sibling path a document is written to before it is renamed into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
