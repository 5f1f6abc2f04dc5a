//! Image Library - Source Image Handles
//!
//! Images are resolved before synthesis starts. A failed load leaves the slot
//! empty; the builder treats that as "map absent".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "tif", "tiff", "bmp", "tga", "exr", "hdr", "webp",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Cannot resolve {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How the host decodes texels into linear data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    #[serde(rename = "sRGB")]
    Srgb,
    #[serde(rename = "Non-Color")]
    NonColor,
}

impl ColorSpace {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Srgb => "sRGB",
            Self::NonColor => "Non-Color",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
}

impl ImageRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filepath: None,
        }
    }
}

/// Source maps available to one synthesis call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSet {
    pub color: Option<ImageRef>,
    pub normal: Option<ImageRef>,
    pub emission: Option<ImageRef>,
    pub packed: Option<ImageRef>,
    pub displacement: Option<ImageRef>,
}

impl ImageSet {
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Present images with their slot names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ImageRef)> + '_ {
        [
            ("color", &self.color),
            ("normal", &self.normal),
            ("emission", &self.emission),
            ("packed", &self.packed),
            ("displacement", &self.displacement),
        ]
        .into_iter()
        .filter_map(|(slot, image)| image.as_ref().map(|i| (slot, i)))
    }

    fn slots_mut(&mut self) -> [&mut Option<ImageRef>; 5] {
        [
            &mut self.color,
            &mut self.normal,
            &mut self.emission,
            &mut self.packed,
            &mut self.displacement,
        ]
    }
}

/// Loaded images, deduplicated by resolved path.
#[derive(Debug, Default)]
pub struct ImageLibrary {
    images: Vec<(PathBuf, ImageRef)>,
}

impl ImageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<ImageRef, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotAFile(path.to_path_buf()));
        }
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if !supported {
            return Err(LoadError::UnsupportedFormat(path.to_path_buf()));
        }

        let resolved = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some((_, existing)) = self.images.iter().find(|(p, _)| *p == resolved) {
            return Ok(existing.clone());
        }

        let image = ImageRef {
            name: self.unique_name(&resolved),
            filepath: Some(resolved.clone()),
        };
        tracing::info!(name = %image.name, "loaded image");
        self.images.push((resolved, image.clone()));
        Ok(image)
    }

    /// Load every image in `set` that carries a file path. Slots whose load
    /// fails are emptied and their errors returned.
    pub fn resolve_set(&mut self, set: &ImageSet) -> (ImageSet, Vec<LoadError>) {
        let mut resolved = set.clone();
        let mut errors = vec![];
        for slot in resolved.slots_mut() {
            let Some(path) = slot.as_ref().and_then(|i| i.filepath.clone()) else {
                continue;
            };
            match self.load(&path) {
                Ok(image) => *slot = Some(image),
                Err(e) => {
                    tracing::warn!(error = %e, "image load failed, slot left empty");
                    *slot = None;
                    errors.push(e);
                }
            }
        }
        (resolved, errors)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    fn unique_name(&self, path: &Path) -> String {
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Image".to_string());
        let taken = |name: &str| self.images.iter().any(|(_, i)| i.name == name);
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{}.{:03}", base, n))
            .find(|candidate| !taken(candidate))
            .unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("albedo.png");
        fs::write(&path, b"png").unwrap();

        let mut library = ImageLibrary::new();
        let first = library.load(&path).unwrap();
        let second = library.load(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(library.len(), 1);
        assert_eq!(first.name, "albedo.png");
    }

    #[test]
    fn test_same_file_name_in_two_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/orm.png"), b"x").unwrap();
        fs::write(dir.path().join("b/orm.png"), b"y").unwrap();

        let mut library = ImageLibrary::new();
        let a = library.load(&dir.path().join("a/orm.png")).unwrap();
        let b = library.load(&dir.path().join("b/orm.png")).unwrap();
        assert_eq!(a.name, "orm.png");
        assert_eq!(b.name, "orm.png.001");
    }

    #[test]
    fn test_rejects_missing_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        fs::write(&text, b"hi").unwrap();

        let mut library = ImageLibrary::new();
        assert!(matches!(library.load(&text), Err(LoadError::UnsupportedFormat(_))));
        assert!(matches!(
            library.load(&dir.path().join("missing.png")),
            Err(LoadError::NotAFile(_))
        ));
        assert!(library.is_empty());
    }

    #[test]
    fn test_resolve_set_empties_failed_slots() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("normal.tga");
        fs::write(&good, b"tga").unwrap();

        let set = ImageSet {
            normal: Some(ImageRef {
                name: "normal".into(),
                filepath: Some(good),
            }),
            packed: Some(ImageRef {
                name: "packed".into(),
                filepath: Some(dir.path().join("gone.png")),
            }),
            color: Some(ImageRef::named("already-loaded")),
            ..Default::default()
        };

        let mut library = ImageLibrary::new();
        let (resolved, errors) = library.resolve_set(&set);
        assert_eq!(errors.len(), 1);
        assert!(resolved.packed.is_none());
        assert_eq!(resolved.normal.unwrap().name, "normal.tga");
        assert_eq!(resolved.color, Some(ImageRef::named("already-loaded")));
    }
}
