//! Turn cached search results into anchors.
//!
//! One clone of the template per result, in result order. There is no
//! rollback: a failure mid-loop leaves earlier clones in the scene and the
//! error says how many were made.

use serde::Serialize;
use tracing::{error, info};

use crate::error::MaterializeError;
use crate::places::PlaceResult;
use crate::scene::{AnchorId, Scene, resolve_template};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedAnchor {
    pub id: AnchorId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Anchors created by one materialize pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterializeReport {
    pub template: Option<AnchorId>,
    pub created: Vec<CreatedAnchor>,
}

impl MaterializeReport {
    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }
}

/// Clone `template` (or the scene's only anchor) once per result.
///
/// With no cached results the scene is not touched.
pub fn materialize_results<S: Scene + ?Sized>(
    results: Option<&[PlaceResult]>,
    scene: &mut S,
    template: Option<&str>,
) -> Result<MaterializeReport, MaterializeError> {
    let results = match results {
        Some(results) if !results.is_empty() => results,
        _ => {
            error!("Cannot create anchors: no search results are cached");
            return Err(MaterializeError::NoResults);
        }
    };

    let template_id = resolve_template(&*scene, template).inspect_err(|e| {
        error!("Cannot create anchors: {e}");
    })?;

    let mut report = MaterializeReport {
        template: Some(template_id),
        created: Vec::with_capacity(results.len()),
    };

    for place in results {
        if let Err(source) = clone_for(scene, template_id, place, &mut report) {
            error!(
                created = report.len(),
                "anchor creation stopped early: {source}"
            );
            return Err(MaterializeError::Partial {
                created: report.len(),
                source,
            });
        }
    }

    info!(
        count = report.len(),
        template = %template_id,
        "created anchors from places results"
    );
    Ok(report)
}

fn clone_for<S: Scene + ?Sized>(
    scene: &mut S,
    template: AnchorId,
    place: &PlaceResult,
    report: &mut MaterializeReport,
) -> Result<(), crate::error::SceneError> {
    let id = scene.instantiate(template)?;
    report.created.push(CreatedAnchor {
        id,
        name: place.display_name.clone(),
        latitude: place.latitude,
        longitude: place.longitude,
    });
    scene.set_anchor_location(id, place.latitude, place.longitude)?;
    scene.set_anchor_name(id, &place.display_name)?;
    Ok(())
}
