//! Scene collaborator: origin lookup, template lookup, anchor cloning.
//!
//! [`Scene`] is what the search and materialize steps need from a host scene
//! graph. [`SceneDocument`] implements it over a JSON file:
//!
//! ```json
//! {
//!   "origins": [{"name": "Origin", "latitude": 37.78, "longitude": -122.41}],
//!   "anchors": [{"name": "Anchor", "latitude": 37.78, "longitude": -122.41, "altitude": 10.0}]
//! }
//! ```
//!
//! Unknown anchor keys are kept and copied onto clones.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SceneError;

/// Stable handle to an anchor inside one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AnchorId(pub usize);

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The coordinate-system reference point used as the search bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoOrigin {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GeoOrigin {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            extra: serde_json::Map::new(),
        }
    }
}

/// Read-only view of an anchor for lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorRef {
    pub id: AnchorId,
    pub name: String,
}

pub trait Scene {
    /// Every origin object in the scene.
    fn origins(&self) -> Vec<GeoOrigin>;

    /// Every anchor object in the scene.
    fn anchors(&self) -> Vec<AnchorRef>;

    /// Clone `template`, returning the new anchor.
    fn instantiate(&mut self, template: AnchorId) -> Result<AnchorId, SceneError>;

    fn set_anchor_location(
        &mut self,
        id: AnchorId,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), SceneError>;

    fn set_anchor_name(&mut self, id: AnchorId, name: &str) -> Result<(), SceneError>;
}

/// The scene's single origin. Zero or several is a configuration error.
pub fn resolve_origin<S: Scene + ?Sized>(scene: &S) -> Result<GeoOrigin, SceneError> {
    let mut origins = scene.origins();
    match origins.len() {
        0 => Err(SceneError::NoOrigin),
        1 => Ok(origins.remove(0)),
        n => Err(SceneError::MultipleOrigins(n)),
    }
}

/// The template anchor: the one named `name`, or the only anchor present.
pub fn resolve_template<S: Scene + ?Sized>(
    scene: &S,
    name: Option<&str>,
) -> Result<AnchorId, SceneError> {
    let anchors = scene.anchors();
    match name {
        Some(name) => {
            let matches: Vec<_> = anchors.iter().filter(|a| a.name == name).collect();
            match matches.as_slice() {
                [] => Err(SceneError::TemplateNotFound(name.to_string())),
                [only] => Ok(only.id),
                many => Err(SceneError::DuplicateTemplateName {
                    name: name.to_string(),
                    count: many.len(),
                }),
            }
        }
        None => match anchors.as_slice() {
            [] => Err(SceneError::NoTemplate),
            [only] => Ok(only.id),
            many => Err(SceneError::AmbiguousTemplate(many.len())),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Anchor {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            altitude: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// JSON-file backed scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub origins: Vec<GeoOrigin>,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    /// Top-level keys this crate does not interpret, written back verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl SceneDocument {
    pub fn new(origins: Vec<GeoOrigin>, anchors: Vec<Anchor>) -> Self {
        Self {
            origins,
            anchors,
            extra: serde_json::Map::new(),
            path: None,
        }
    }

    /// Load a scene and remember its path for [`SceneDocument::save`].
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut doc: Self = serde_json::from_str(&content).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        doc.path = Some(path.to_path_buf());
        debug!(
            path = %path.display(),
            origins = doc.origins.len(),
            anchors = doc.anchors.len(),
            "loaded scene"
        );
        Ok(doc)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write back to the file this scene was loaded from.
    pub fn save(&self) -> Result<PathBuf, SceneError> {
        let path = self.path.clone().ok_or(SceneError::NoBackingFile)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SceneError> {
        let write_err = |source: std::io::Error| SceneError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        json.push('\n');
        std::fs::write(path, json).map_err(write_err)?;
        Ok(())
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(id.0)
    }

    fn anchor_mut(&mut self, id: AnchorId) -> Result<&mut Anchor, SceneError> {
        self.anchors
            .get_mut(id.0)
            .ok_or(SceneError::UnknownAnchor(id))
    }
}

impl Scene for SceneDocument {
    fn origins(&self) -> Vec<GeoOrigin> {
        self.origins.clone()
    }

    fn anchors(&self) -> Vec<AnchorRef> {
        self.anchors
            .iter()
            .enumerate()
            .map(|(idx, anchor)| AnchorRef {
                id: AnchorId(idx),
                name: anchor.name.clone(),
            })
            .collect()
    }

    fn instantiate(&mut self, template: AnchorId) -> Result<AnchorId, SceneError> {
        let clone = self
            .anchor(template)
            .cloned()
            .ok_or(SceneError::UnknownAnchor(template))?;
        self.anchors.push(clone);
        Ok(AnchorId(self.anchors.len() - 1))
    }

    fn set_anchor_location(
        &mut self,
        id: AnchorId,
        latitude: f64,
        longitude: f64,
    ) -> Result<(), SceneError> {
        let anchor = self.anchor_mut(id)?;
        anchor.latitude = latitude;
        anchor.longitude = longitude;
        Ok(())
    }

    fn set_anchor_name(&mut self, id: AnchorId, name: &str) -> Result<(), SceneError> {
        self.anchor_mut(id)?.name = name.to_string();
        Ok(())
    }
}
