use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::MergeError;
use crate::merge::DocumentMerger;

/// Concatenates PDFs with lopdf.
///
/// Each input is renumbered past the objects already taken, its catalog is
/// dropped, and its page tree root becomes one kid of a new root `Pages`
/// node. Page order within each input is untouched.
pub struct LopdfMerger;

impl DocumentMerger for LopdfMerger {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<usize, MergeError> {
        if inputs.is_empty() {
            return Err(MergeError::NothingToMerge);
        }

        let mut merged = Document::with_version("1.5");
        let root_pages_id = merged.new_object_id();

        let mut kids: Vec<Object> = Vec::with_capacity(inputs.len());
        let mut page_count = 0usize;

        for path in inputs {
            let (pages_id, pages) = graft(&mut merged, path, root_pages_id)?;
            debug!("Merged {} pages from {}", pages, path.display());
            kids.push(pages_id.into());
            page_count += pages;
        }

        merged.objects.insert(
            root_pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
            }),
        );

        let catalog_id = merged.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => root_pages_id,
        });
        merged.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        merged
            .save_to(&mut buffer)
            .map_err(|e| MergeError::Write {
                path: output.to_path_buf(),
                cause: e.to_string(),
            })?;

        write_atomically(output, &buffer)?;
        Ok(page_count)
    }
}

/// Moves one input's objects into `merged`, hanging its page tree under
/// `parent`. Returns the grafted `Pages` id and the input's page count.
fn graft(
    merged: &mut Document,
    path: &Path,
    parent: ObjectId,
) -> Result<(ObjectId, usize), MergeError> {
    let corrupt = |cause: String| MergeError::CorruptInput {
        path: path.to_path_buf(),
        cause,
    };

    let mut doc = Document::load(path).map_err(|e| corrupt(e.to_string()))?;
    doc.renumber_objects_with(merged.max_id + 1);

    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| corrupt(format!("no document catalog: {}", e)))?;
    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| corrupt(format!("no page tree: {}", e)))?;

    let pages = doc.get_pages().len();
    if pages == 0 {
        return Err(corrupt("document has no pages".to_string()));
    }

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(tree)) => tree.set("Parent", parent),
        _ => return Err(corrupt("page tree root is not a dictionary".to_string())),
    }
    doc.objects.remove(&catalog_id);

    let highest = doc.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    merged.max_id = merged.max_id.max(highest);
    merged.objects.extend(doc.objects);

    Ok((pages_id, pages))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), MergeError> {
    let failed = |e: std::io::Error| MergeError::Write {
        path: path.to_path_buf(),
        cause: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }

    let partial = crate::stages::assemble::partial_path(path);
    let result = std::fs::write(&partial, bytes).and_then(|_| std::fs::rename(&partial, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(failed(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes a PDF whose pages are told apart by MediaBox width.
    fn write_pdf(path: &Path, widths: &[i64]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = widths
            .iter()
            .map(|w| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), (*w).into(), 10.into()],
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => widths.len() as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn page_widths(path: &Path) -> Vec<i64> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                let page = doc.get_object(*id).unwrap().as_dict().unwrap();
                let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
                media_box[2].as_i64().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_merge_preserves_order_within_and_across_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.pdf");
        let b = temp_dir.path().join("b.pdf");
        write_pdf(&a, &[11, 12]);
        write_pdf(&b, &[21, 22, 23]);

        let output = temp_dir.path().join("merged.pdf");
        let pages = LopdfMerger.merge(&[a, b], &output).unwrap();

        assert_eq!(pages, 5);
        assert_eq!(page_widths(&output), vec![11, 12, 21, 22, 23]);
    }

    #[test]
    fn test_merge_follows_input_order_not_file_names() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.pdf");
        let b = temp_dir.path().join("b.pdf");
        write_pdf(&a, &[1]);
        write_pdf(&b, &[2]);

        let output = temp_dir.path().join("merged.pdf");
        LopdfMerger.merge(&[b, a], &output).unwrap();
        assert_eq!(page_widths(&output), vec![2, 1]);
    }

    #[test]
    fn test_merge_overwrites_previous_output() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.pdf");
        write_pdf(&a, &[7]);
        let output = temp_dir.path().join("merged.pdf");
        std::fs::write(&output, b"stale").unwrap();

        LopdfMerger.merge(&[a], &output).unwrap();
        assert_eq!(page_widths(&output), vec![7]);
        assert!(!partial_sibling(&output).exists());
    }

    #[test]
    fn test_merge_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.pdf");
        let b = temp_dir.path().join("b.pdf");
        write_pdf(&a, &[1, 2]);
        write_pdf(&b, &[3]);

        let first = temp_dir.path().join("first.pdf");
        let second = temp_dir.path().join("second.pdf");
        LopdfMerger.merge(&[a.clone(), b.clone()], &first).unwrap();
        LopdfMerger.merge(&[a, b], &second).unwrap();
        assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn test_corrupt_input_reported_with_path() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.pdf");
        let bad = temp_dir.path().join("bad.pdf");
        write_pdf(&good, &[1]);
        std::fs::write(&bad, b"this is not a pdf").unwrap();

        let output = temp_dir.path().join("merged.pdf");
        let err = LopdfMerger.merge(&[good, bad.clone()], &output).unwrap_err();
        match err {
            MergeError::CorruptInput { path, .. } => assert_eq!(path, bad),
            other => panic!("Expected CorruptInput, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_input_list_is_nothing_to_merge() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("merged.pdf");
        let err = LopdfMerger.merge(&[], &output).unwrap_err();
        assert!(matches!(err, MergeError::NothingToMerge));
    }

    fn partial_sibling(path: &Path) -> PathBuf {
        crate::stages::assemble::partial_path(path)
    }
}
