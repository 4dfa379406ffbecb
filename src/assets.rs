use crate::error::PlayfieldError;
use crate::game::skin::SkinConfiguration;
use image::ImageReader;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// File name of the skin descriptor inside a skin.
pub const SKIN_DESCRIPTOR: &str = "skin.ini";

const IMAGE_SUFFIXES: [&str; 3] = ["", "@2x.png", ".png"];

// --- Texture Metadata ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexMeta {
    pub w: u32,
    pub h: u32,
}

/// Reads image dimensions from encoded bytes without decoding pixels.
pub fn texture_dims(bytes: &[u8]) -> Result<TexMeta, PlayfieldError> {
    let (w, h) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(TexMeta { w, h })
}

// --- Providers ---

/// Byte lookup keyed by lowercase asset name.
pub trait AssetProvider {
    fn get(&self, name: &str) -> Option<Vec<u8>>;

    /// Resolves an image reference, trying the bare name, then the `@2x`
    /// and plain `.png` variants. Returns the name that matched.
    fn find_image(&self, name: &str) -> Option<(String, Vec<u8>)> {
        let base = name.trim().to_ascii_lowercase();
        IMAGE_SUFFIXES.iter().find_map(|suffix| {
            let candidate = format!("{base}{suffix}");
            self.get(&candidate).map(|bytes| (candidate, bytes))
        })
    }
}

/// Assets held in memory, e.g. already extracted by a collaborator.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) {
        self.files.insert(name.to_ascii_lowercase(), bytes);
    }
}

impl AssetProvider for MemoryAssets {
    fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(&name.to_ascii_lowercase()).cloned()
    }
}

/// Assets read from a directory tree. Names are relative paths with `/`
/// separators, matched case-insensitively.
#[derive(Debug)]
pub struct DirAssets {
    index: HashMap<String, PathBuf>,
}

impl DirAssets {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, PlayfieldError> {
        let root = root.as_ref().to_path_buf();
        let mut index = HashMap::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)?.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                let Ok(rel) = path.strip_prefix(&root) else {
                    continue;
                };
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_ascii_lowercase())
                    .collect::<Vec<_>>()
                    .join("/");
                index.insert(key, path);
            }
        }
        info!("Indexed {} skin file(s) under '{}'.", index.len(), root.display());
        Ok(Self { index })
    }
}

impl AssetProvider for DirAssets {
    fn get(&self, name: &str) -> Option<Vec<u8>> {
        let path = self.index.get(&name.to_ascii_lowercase())?;
        match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to read asset '{}': {e}", path.display());
                None
            }
        }
    }
}

/// The descriptor text, if the provider has one. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn load_skin_descriptor(provider: &dyn AssetProvider) -> Option<String> {
    provider
        .get(SKIN_DESCRIPTOR)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

// --- Skin texture resolution ---

#[derive(Debug, Default)]
pub struct SkinTextures {
    /// Dimensions keyed by the asset name the skin refers to.
    pub dims: HashMap<String, TexMeta>,
    /// One entry per descriptor key whose image could not be used.
    pub missing: Vec<PlayfieldError>,
}

impl SkinTextures {
    pub fn dims_of(&self, name: &str) -> Option<(u32, u32)> {
        self.dims.get(name).map(|m| (m.w, m.h))
    }
}

/// Probes every image the skin references. Missing or unreadable images are
/// collected and logged; the rest of the skin stays usable.
pub fn resolve_skin_textures(skin: &SkinConfiguration, provider: &dyn AssetProvider) -> SkinTextures {
    let mut out = SkinTextures::default();
    let mut failed: HashSet<&str> = HashSet::new();

    for (key, name) in skin.images.referenced() {
        if out.dims.contains_key(name) {
            continue;
        }
        if failed.contains(name) {
            out.missing.push(PlayfieldError::AssetMissing {
                key,
                name: name.to_string(),
            });
            continue;
        }
        let Some((found, bytes)) = provider.find_image(name) else {
            warn!("Skin image '{key}' -> '{name}' not found.");
            failed.insert(name);
            out.missing.push(PlayfieldError::AssetMissing {
                key,
                name: name.to_string(),
            });
            continue;
        };
        match texture_dims(&bytes) {
            Ok(meta) => {
                debug!("Skin image '{key}' -> '{found}' ({}x{}).", meta.w, meta.h);
                out.dims.insert(name.to_string(), meta);
            }
            Err(e) => {
                warn!("Skin image '{key}' -> '{found}' unreadable: {e}");
                failed.insert(name);
                out.missing.push(e);
            }
        }
    }

    out
}
