use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::job::{Job, OutputLayout};
use crate::config::MediaFormats;
use crate::error::CatalogError;

pub struct JobCatalog {
    input_directory: PathBuf,
    formats: MediaFormats,
    layout: OutputLayout,
}

impl JobCatalog {
    pub fn new<P: AsRef<Path>>(input_directory: P, formats: MediaFormats, layout: OutputLayout) -> Self {
        Self {
            input_directory: input_directory.as_ref().to_path_buf(),
            formats,
            layout,
        }
    }

    pub fn input_directory(&self) -> &Path {
        &self.input_directory
    }

    /// Lists every supported file directly inside the input directory, in
    /// catalog order. Read-only.
    pub fn scan(&self) -> Result<Vec<Job>, CatalogError> {
        let mut sources = Vec::new();

        for entry in WalkDir::new(&self.input_directory)
            .min_depth(1)
            .max_depth(1) // Only the top level; subdirectories are not jobs
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(CatalogError::ScanFailed {
                        path: self.input_directory.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if self.formats.supports(ext) {
                    debug!("Found video: {}", path.display());
                    sources.push(path.to_path_buf());
                }
            }
        }

        if sources.is_empty() {
            return Err(CatalogError::NoJobsFound(self.input_directory.clone()));
        }

        let stems = assign_artifact_stems(&sources);
        let mut jobs: Vec<Job> = sources
            .into_iter()
            .zip(stems)
            .map(|(path, stem)| Job::new(0, path, stem, &self.layout))
            .collect();

        jobs.sort_by(|a, b| a.catalog_cmp(b));
        for (position, job) in jobs.iter_mut().enumerate() {
            job.position = position;
        }

        info!(
            "Cataloged {} videos in {}",
            jobs.len(),
            self.input_directory.display()
        );
        Ok(jobs)
    }
}

/// Picks a per-job artifact name: the file stem, or the full file name when
/// the stem would clash with another job's name. Clashes are compared
/// case-insensitively so case-folding filesystems cannot merge two jobs;
/// full names that differ only by case are numbered as a last resort.
fn assign_artifact_stems(sources: &[PathBuf]) -> Vec<String> {
    let names: Vec<(String, String)> = sources
        .iter()
        .map(|p| {
            let file_name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let stem = p
                .file_stem()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone());
            (file_name, stem)
        })
        .collect();

    let mut use_full_name = vec![false; names.len()];
    loop {
        let assigned: Vec<String> = names
            .iter()
            .zip(&use_full_name)
            .map(|((file_name, stem), full)| {
                if *full {
                    file_name.to_lowercase()
                } else {
                    stem.to_lowercase()
                }
            })
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for name in &assigned {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }

        let mut changed = false;
        for (i, name) in assigned.iter().enumerate() {
            if !use_full_name[i] && counts.get(name.as_str()).copied().unwrap_or(0) > 1 {
                use_full_name[i] = true;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    let mut stems: Vec<String> = names
        .into_iter()
        .zip(use_full_name)
        .map(|((file_name, stem), full)| if full { file_name } else { stem })
        .collect();
    number_case_clashes(&mut stems);
    stems
}

/// Renames all but the first of each group of names equal up to case to
/// `<name> (<n>)`. Groups and members are visited in byte order, so the result
/// does not depend on directory listing order.
fn number_case_clashes(stems: &mut [String]) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, stem) in stems.iter().enumerate() {
        groups.entry(stem.to_lowercase()).or_default().push(i);
    }

    let mut taken: HashSet<String> = groups.keys().cloned().collect();
    let mut clashing: Vec<(String, Vec<usize>)> =
        groups.into_iter().filter(|(_, g)| g.len() > 1).collect();
    clashing.sort_by(|a, b| a.0.cmp(&b.0));

    for (_, mut members) in clashing {
        members.sort_by(|&a, &b| stems[a].cmp(&stems[b]));
        for &i in &members[1..] {
            let mut n = 2;
            let candidate = loop {
                let candidate = format!("{} ({})", stems[i], n);
                if taken.insert(candidate.to_lowercase()) {
                    break candidate;
                }
                n += 1;
            };
            stems[i] = candidate;
        }
    }
}
