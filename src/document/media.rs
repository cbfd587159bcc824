//! Embedded media (word/media/imageN.ext)

use crate::error::{Error, Result};
use crate::ids::{IdManager, IdNamespace};
use crate::opc::{rel_types, well_known, PartUri, RelationshipRegistry, TargetMode};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Image formats accepted for embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Emf,
    Wmf,
}

impl ImageFormat {
    /// Detect image format from byte signature.
    pub fn detect_from_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if data.starts_with(b"BM") {
            return Some(Self::Bmp);
        }
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
            return Some(Self::Tiff);
        }
        // EMF: " EMF" signature at offset 40 of the header record
        if data.len() >= 44 && data[40..44] == [0x20, 0x45, 0x4D, 0x46] {
            return Some(Self::Emf);
        }
        // WMF: placeable header or standard metafile header
        if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) || data.starts_with(&[0x01, 0x00, 0x09, 0x00]) {
            return Some(Self::Wmf);
        }
        None
    }

    /// Format implied by a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "emf" => Some(Self::Emf),
            "wmf" => Some(Self::Wmf),
            _ => None,
        }
    }

    /// Get file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Emf => "emf",
            Self::Wmf => "wmf",
        }
    }

    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Emf => "image/x-emf",
            Self::Wmf => "image/x-wmf",
        }
    }
}

/// One stored media file and the relationships that point at it
#[derive(Clone, Debug)]
pub struct MediaAsset {
    id: u64,
    part: PartUri,
    data: Vec<u8>,
    format: ImageFormat,
    digest: [u8; 20],
    bindings: Vec<(PartUri, String)>,
}

impl MediaAsset {
    /// Asset number, also used in the part name
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Part name, e.g. `/word/media/image1.png`
    pub fn part(&self) -> &PartUri {
        &self.part
    }

    /// Image bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Detected image format
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// `(source part, relationship ID)` pairs referencing this asset
    pub fn bindings(&self) -> &[(PartUri, String)] {
        &self.bindings
    }

    fn binding(&self, source: &PartUri) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(part, _)| part == source)
            .map(|(_, id)| id.as_str())
    }
}

/// Media store of one document, deduplicated by content
#[derive(Debug)]
pub struct MediaManager {
    ids: Arc<IdManager>,
    assets: Vec<MediaAsset>,
}

fn digest(data: &[u8]) -> [u8; 20] {
    sha1_smol::Sha1::from(data).digest().bytes()
}

/// Number in `imageN.ext`, if the file name follows that pattern
fn image_number(part: &PartUri) -> Option<u64> {
    let stem = part.file_name()?.split('.').next()?;
    stem.strip_prefix("image")?.parse().ok()
}

impl MediaManager {
    /// Empty manager; asset numbers come from `ids`
    pub fn new(ids: Arc<IdManager>) -> Self {
        MediaManager {
            ids,
            assets: Vec::new(),
        }
    }

    /// Store `data` and reference it from `source`, returning `(media id, rId)`.
    ///
    /// Identical bytes are stored once. A source part that already references
    /// the asset gets its existing relationship ID back.
    pub fn embed(
        &mut self,
        registry: &mut RelationshipRegistry,
        source: &PartUri,
        data: Vec<u8>,
        filename: &str,
    ) -> Result<(u64, String)> {
        if data.is_empty() {
            return Err(Error::validation("embed_media", "data", "empty"));
        }

        let hash = digest(&data);
        if let Some(index) = self
            .assets
            .iter()
            .position(|a| a.digest == hash && a.data == data)
        {
            return self.bind_existing(registry, source, index);
        }

        let ext = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let by_name = ImageFormat::from_extension(ext);
        let format = match (ImageFormat::detect_from_bytes(&data), by_name) {
            (Some(sniffed), Some(named)) if sniffed != named => {
                log::warn!(
                    "{} looks like {} despite its extension",
                    filename,
                    sniffed.extension()
                );
                sniffed
            }
            (Some(sniffed), _) => sniffed,
            (None, Some(named)) => named,
            (None, None) => return Err(Error::validation("embed_media", "image format", filename)),
        };
        // Keep the caller's spelling of the extension when it names the same format
        let ext = match by_name {
            Some(named) if named == format => ext.to_ascii_lowercase(),
            _ => format.extension().to_string(),
        };

        let id = self.ids.next_id(&IdNamespace::Media);
        let part = well_known::media(id, &ext);
        let rel_id = registry.register(
            source,
            &source.relative_target(&part),
            rel_types::IMAGE,
            TargetMode::Internal,
        )?;
        log::debug!("embedded {} as {} ({} bytes)", filename, part, data.len());

        self.assets.push(MediaAsset {
            id,
            part,
            data,
            format,
            digest: hash,
            bindings: vec![(source.clone(), rel_id.clone())],
        });
        Ok((id, rel_id))
    }

    fn bind_existing(
        &mut self,
        registry: &mut RelationshipRegistry,
        source: &PartUri,
        index: usize,
    ) -> Result<(u64, String)> {
        let asset = &mut self.assets[index];
        if let Some(rel_id) = asset.binding(source) {
            log::debug!("reusing {} for {}", asset.part, source);
            return Ok((asset.id, rel_id.to_string()));
        }
        let rel_id = registry.register(
            source,
            &source.relative_target(&asset.part),
            rel_types::IMAGE,
            TargetMode::Internal,
        )?;
        asset.bindings.push((source.clone(), rel_id.clone()));
        Ok((asset.id, rel_id))
    }

    /// Adopt a media part read from a package.
    ///
    /// Returns the data back when the part is not an image this manager
    /// handles, so the caller can preserve it as-is.
    pub fn load(&mut self, part: PartUri, data: Vec<u8>) -> std::result::Result<u64, Vec<u8>> {
        let format = ImageFormat::detect_from_bytes(&data)
            .or_else(|| part.extension().and_then(ImageFormat::from_extension));
        let format = match format {
            Some(format) => format,
            None => return Err(data),
        };

        let id = match image_number(&part) {
            Some(n) => {
                self.ids.initialize_from(&IdNamespace::Media, n);
                n
            }
            None => self.ids.next_id(&IdNamespace::Media),
        };
        self.assets.push(MediaAsset {
            id,
            part,
            digest: digest(&data),
            data,
            format,
            bindings: Vec::new(),
        });
        Ok(id)
    }

    /// Record that `source` references the asset stored at `target` through `rel_id`
    pub fn bind(&mut self, target: &PartUri, source: &PartUri, rel_id: &str) -> bool {
        match self.assets.iter_mut().find(|a| &a.part == target) {
            Some(asset) => {
                if asset.binding(source).is_none() {
                    asset.bindings.push((source.clone(), rel_id.to_string()));
                }
                true
            }
            None => false,
        }
    }

    /// Stored assets in insertion order
    pub fn assets(&self) -> &[MediaAsset] {
        &self.assets
    }

    /// Asset by ID
    pub fn get(&self, id: u64) -> Option<&MediaAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Extensions in use with their content types
    pub fn extensions(&self) -> BTreeMap<String, &'static str> {
        self.assets
            .iter()
            .filter_map(|a| {
                let ext = a.part.extension()?.to_ascii_lowercase();
                Some((ext, a.format.mime_type()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, 1, 2, 3];

    fn setup() -> (MediaManager, RelationshipRegistry) {
        let ids = Arc::new(IdManager::new());
        let mut registry = RelationshipRegistry::new(ids.clone());
        registry.declare_part(well_known::document());
        registry.declare_part(well_known::header(1));
        (MediaManager::new(ids), registry)
    }

    #[test]
    fn test_embed_sniffs_format() {
        let (mut media, mut registry) = setup();
        let doc = well_known::document();
        let (id, rel) = media.embed(&mut registry, &doc, PNG.to_vec(), "logo.bin").unwrap();
        assert_eq!(id, 1);
        assert_eq!(rel, "rId1");

        let asset = media.get(id).unwrap();
        assert_eq!(asset.part().as_str(), "/word/media/image1.png");
        assert_eq!(asset.format(), ImageFormat::Png);
        assert_eq!(registry.resolve(&doc, &rel).unwrap().target, "media/image1.png");
    }

    #[test]
    fn test_identical_bytes_are_stored_once() {
        let (mut media, mut registry) = setup();
        let doc = well_known::document();
        let header = well_known::header(1);

        let first = media.embed(&mut registry, &doc, PNG.to_vec(), "a.png").unwrap();
        let again = media.embed(&mut registry, &doc, PNG.to_vec(), "b.png").unwrap();
        assert_eq!(first, again);

        let (id, rel) = media.embed(&mut registry, &header, PNG.to_vec(), "c.png").unwrap();
        assert_eq!(id, first.0);
        assert_eq!(rel, "rId1");
        assert_eq!(media.assets().len(), 1);
        assert_eq!(media.assets()[0].bindings().len(), 2);
    }

    #[test]
    fn test_rejects_unknown_and_empty_data() {
        let (mut media, mut registry) = setup();
        let doc = well_known::document();
        let err = media
            .embed(&mut registry, &doc, b"plain text".to_vec(), "notes.txt")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = media.embed(&mut registry, &doc, Vec::new(), "x.png").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_extension_fallback_and_spelling() {
        let (mut media, mut registry) = setup();
        let doc = well_known::document();
        let (id, _) = media
            .embed(&mut registry, &doc, vec![1, 2, 3, 4, 5], "chart.EMF")
            .unwrap();
        assert_eq!(media.get(id).unwrap().part().as_str(), "/word/media/image1.emf");

        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 16];
        let (id, _) = media.embed(&mut registry, &doc, jpeg, "photo.jpg").unwrap();
        assert_eq!(media.get(id).unwrap().part().as_str(), "/word/media/image2.jpg");
        assert_eq!(media.extensions().get("jpg"), Some(&"image/jpeg"));
    }

    #[test]
    fn test_load_reseeds_numbering() {
        let (mut media, mut registry) = setup();
        let part = PartUri::new("/word/media/image7.png").unwrap();
        assert_eq!(media.load(part.clone(), PNG.to_vec()), Ok(7));
        assert!(media.bind(&part, &well_known::document(), "rId3"));

        let svg = PartUri::new("/word/media/image8.svg").unwrap();
        assert!(media.load(svg, b"<svg/>".to_vec()).is_err());

        let gif = b"GIF89a\x01\x00".to_vec();
        let (id, _) = media
            .embed(&mut registry, &well_known::document(), gif, "anim.gif")
            .unwrap();
        assert_eq!(id, 8);
    }
}
