//! Folding a point-cloud measurement into a relational state.
//!
//! A completed measurement for record `R` becomes:
//!
//! ```text
//! entity      R::spatial_object   (type spatial_object, source 3d)
//! relations   has_shape / has_volume / has_extent   (confidence 0.9, source 3d)
//! constraints spatial{bounds, units} hard, spatial{volume, units} soft (source 3d)
//! ```
//!
//! Attaching is idempotent: earlier `3d` rows for the same subject are
//! replaced, rows from any other source are left alone.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    AttributeMap, Constraint, Entity, Entry, Relation, RelationalState, Severity, SpatialArgs,
    Value,
};

/// Source tag carried by every derived row.
pub const SPATIAL_SOURCE: &str = "3d";

const ENTITY_SUFFIX: &str = "::spatial_object";
const ENTITY_KIND: &str = "spatial_object";
const DERIVED_CONFIDENCE: f64 = 0.9;

/// Axis-aligned bounding box corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl From<&Bounds> for Value {
    fn from(b: &Bounds) -> Self {
        let mut map = AttributeMap::new();
        map.insert("min".into(), Value::from(b.min.to_vec()));
        map.insert("max".into(), Value::from(b.max.to_vec()));
        Value::Map(map)
    }
}

/// Summary produced by a point-cloud measurement engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudMeasurement {
    pub units: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub centroid: Option<[f64; 3]>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub shape: Option<String>,
    /// Box extent per axis, e.g. `{"x": 1.0, "y": 2.0, "z": 0.5}`.
    #[serde(default)]
    pub aabb_dimensions: AttributeMap,
    #[serde(default)]
    pub aabb_surface_area: Option<f64>,
    #[serde(default = "default_ok")]
    pub ok: bool,
}

fn default_ok() -> bool {
    true
}

impl PointCloudMeasurement {
    pub fn new(units: impl Into<String>) -> Self {
        Self {
            units: units.into(),
            count: 0,
            centroid: None,
            bounds: None,
            volume: None,
            shape: None,
            aabb_dimensions: AttributeMap::new(),
            aabb_surface_area: None,
            ok: true,
        }
    }

    fn attributes(&self) -> AttributeMap {
        let mut attrs = AttributeMap::new();
        attrs.insert("units".into(), Value::from(self.units.as_str()));
        attrs.insert("count".into(), Value::from(self.count));
        attrs.insert("centroid".into(), Value::from(self.centroid.map(|c| c.to_vec())));
        attrs.insert("bounds".into(), self.bounds.as_ref().map(Value::from).unwrap_or_default());
        attrs.insert("volume".into(), Value::from(self.volume));
        attrs.insert("shape".into(), Value::from(self.shape.clone()));
        attrs.insert("aabb_dimensions".into(), Value::Map(self.aabb_dimensions.clone()));
        attrs.insert("aabb_surface_area".into(), Value::from(self.aabb_surface_area));
        attrs
    }

    /// Compact, key-sorted JSON of the box extent.
    fn extent_json(&self) -> String {
        serde_json::to_string(&self.aabb_dimensions).unwrap_or_else(|_| "{}".to_owned())
    }
}

/// Id of the entity derived for `record_id`.
pub fn spatial_entity_id(record_id: &str) -> String {
    format!("{record_id}{ENTITY_SUFFIX}")
}

/// Return `state` with `measurement` attached for `record_id`.
///
/// A measurement with `ok == false` returns the state unchanged.
pub fn attach_measurement(
    state: &RelationalState,
    record_id: &str,
    measurement: &PointCloudMeasurement,
) -> RelationalState {
    let mut next = state.clone();
    if !measurement.ok {
        debug!(record_id, "measurement not ok, nothing attached");
        return next;
    }

    let entity_id = spatial_entity_id(record_id);

    next.entities
        .retain(|e| e.valid().is_none_or(|e| e.id != entity_id));
    next.entities.push(Entry::Valid(Entity {
        id: entity_id.clone(),
        attributes: measurement.attributes(),
        kind: Some(ENTITY_KIND.to_owned()),
        source: Some(SPATIAL_SOURCE.to_owned()),
    }));

    next.relations.retain(|r| {
        r.valid()
            .is_none_or(|r| !(r.source_str() == Some(SPATIAL_SOURCE) && r.subj == entity_id))
    });
    next.relations
        .extend(derived_relations(&entity_id, measurement).into_iter().map(Entry::Valid));

    next.constraints.retain(|c| {
        c.valid()
            .is_none_or(|c| !(c.source() == Some(SPATIAL_SOURCE) && c.entity_id() == entity_id))
    });
    next.constraints
        .extend(derived_constraints(&entity_id, measurement).into_iter().map(Entry::Valid));

    debug!(
        record_id,
        entities = next.entities.len(),
        relations = next.relations.len(),
        constraints = next.constraints.len(),
        "measurement attached"
    );
    next
}

fn derived_relations(entity_id: &str, m: &PointCloudMeasurement) -> [Relation; 3] {
    let shape = m.shape.as_deref().filter(|s| !s.is_empty()).unwrap_or("unknown");
    let volume = m.volume.unwrap_or(0.0);
    let relation = |pred: &str, obj: String| {
        Relation::new(entity_id, pred, obj, DERIVED_CONFIDENCE).with_source(SPATIAL_SOURCE)
    };
    [
        relation("has_shape", shape.to_owned()),
        relation("has_volume", format!("{volume:?}")),
        relation("has_extent", m.extent_json()),
    ]
}

fn derived_constraints(entity_id: &str, m: &PointCloudMeasurement) -> [Constraint; 2] {
    let units = Some(Value::from(m.units.as_str()));
    let bounds = SpatialArgs {
        entity_id: entity_id.to_owned(),
        bounds: m.bounds.as_ref().map(Value::from),
        units: units.clone(),
        volume: None,
    };
    let volume = SpatialArgs {
        entity_id: entity_id.to_owned(),
        bounds: None,
        units,
        volume: m.volume.map(Value::from),
    };
    [
        Constraint::spatial(bounds, Severity::Hard).with_source(SPATIAL_SOURCE),
        Constraint::spatial(volume, Severity::Soft).with_source(SPATIAL_SOURCE),
    ]
}
