//! Cutting parameters and job configuration for chunkcam
//!
//! Provides the immutable parameter struct handed to every engine stage and
//! the job description the CLI reads from disk. Jobs are stored as JSON or
//! TOML and validated on load and on save.
//!
//! A job is organized into:
//! - Cutting parameters (cutter, stepping, entry/exit shaping, bridges)
//! - Depth range and strategy (profile or pocket)
//! - Input geometry (polygons, bridge tabs, material silhouette, height map)

use chunkcam_core::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Corner treatment when offsetting polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    /// Arc around convex corners
    #[default]
    Round,
    /// Extend edges to a point, limited by `mitre_limit`
    Mitre,
    /// Cut the corner with a straight chord
    Bevel,
}

/// Direction the cutter engages the material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Climb milling
    #[default]
    Climb,
    /// Conventional milling
    Conventional,
    /// Alternate direction to avoid lifts; open chunks may be reversed
    Meander,
}

/// Spindle rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpindleDirection {
    /// Clockwise seen from above
    #[default]
    Cw,
    /// Counter-clockwise seen from above
    Ccw,
}

/// Containment policy used to order chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyPolicy {
    /// Parent polygon contains the child's first point
    Polygon,
    /// Parent passes within the adjacency distance of the child
    Distance,
}

/// How the input polygons become chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One offset contour per polygon ring
    #[default]
    Profile,
    /// Successive inward offsets until the area is exhausted
    Pocket,
}

/// Which side of the contour a profile cuts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CutSide {
    #[default]
    Outside,
    Inside,
    On,
}

/// Cutting order of pocket rings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PocketDirection {
    /// Innermost ring first
    #[default]
    InsideOut,
    /// Outermost ring first
    OutsideIn,
}

/// Cutting parameters
///
/// Supplied once per operation and read by every engine stage. Lengths are
/// millimetres, angles are degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuttingParameters {
    /// Cutter radius
    pub cutter_radius: f64,
    /// Offset corner treatment
    pub join_style: JoinStyle,
    /// Maximum mitre length as a multiple of the offset distance
    pub mitre_limit: f64,
    /// Maximum depth removed per layer
    pub stepdown: f64,
    /// Split the depth range into layers of `stepdown`
    pub use_layers: bool,
    /// Milling direction policy
    pub movement: MovementType,
    /// Spindle rotation
    pub spindle_direction: SpindleDirection,
    /// Distance between successive pocket rings
    pub distance_between_paths: f64,
    /// Parallel pattern stepping back between passes; doubles adjacency limits
    pub parallel_step_back: bool,
    /// Ramp into each pass instead of plunging
    pub ramp: bool,
    /// Ramp-in angle
    pub ramp_in_angle: f64,
    /// Ramp out of closed passes
    pub ramp_out: bool,
    /// Ramp-out angle
    pub ramp_out_angle: f64,
    /// Enter leaf chunks with a helix on their first layer
    pub helix_enter: bool,
    /// Helix diameter as a fraction of the cutter diameter
    pub helix_diameter_ratio: f64,
    /// Leave outermost chunks with a tangential arc
    pub retract_tangential: bool,
    /// Radius of the tangential retract arc
    pub retract_radius: f64,
    /// Height gained over the tangential retract arc
    pub retract_height: f64,
    /// Raise the cut over bridge tabs
    pub use_bridges: bool,
    /// Width of a bridge tab
    pub bridge_width: f64,
    /// Height of a bridge tab above the end depth
    pub bridge_height: f64,
    /// Lead-in/out radius for closed chunks, 0 disables leads
    pub lead_radius: f64,
    /// Distance along a closed chunk where the lead attaches
    pub lead_start_offset: f64,
    /// Cut every layer of a chunk before moving to the next chunk
    pub first_down: bool,
    /// Link nearby passes on the same layer without lifting
    pub stay_low: bool,
    /// Largest gap bridged by a low link; defaults to three path distances
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_distance: Option<f64>,
    /// Longest segment kept after refinement, 0 disables refinement
    pub max_segment_length: f64,
    /// Collinearity tolerance for the final simplification, 0 disables it
    pub simplify_tolerance: f64,
    /// Segments used to approximate a full circle
    pub circle_segments: u32,
}

impl Default for CuttingParameters {
    fn default() -> Self {
        Self {
            cutter_radius: 1.5,
            join_style: JoinStyle::Round,
            mitre_limit: 2.0,
            stepdown: 1.0,
            use_layers: true,
            movement: MovementType::Climb,
            spindle_direction: SpindleDirection::Cw,
            distance_between_paths: 1.2,
            parallel_step_back: false,
            ramp: false,
            ramp_in_angle: 30.0,
            ramp_out: false,
            ramp_out_angle: 30.0,
            helix_enter: false,
            helix_diameter_ratio: 0.9,
            retract_tangential: false,
            retract_radius: 2.0,
            retract_height: 1.0,
            use_bridges: false,
            bridge_width: 2.0,
            bridge_height: 1.0,
            lead_radius: 0.0,
            lead_start_offset: 0.0,
            first_down: false,
            stay_low: false,
            merge_distance: None,
            max_segment_length: 0.0,
            simplify_tolerance: 0.0,
            circle_segments: 32,
        }
    }
}

impl CuttingParameters {
    /// Create parameters with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cutter_diameter(&self) -> f64 {
        self.cutter_radius * 2.0
    }

    pub fn ramp_in_radians(&self) -> f64 {
        self.ramp_in_angle.to_radians()
    }

    pub fn ramp_out_radians(&self) -> f64 {
        self.ramp_out_angle.to_radians()
    }

    /// Adjacency limit of the distance hierarchy policy.
    pub fn hierarchy_distance(&self) -> f64 {
        let limit = 2.0 * self.distance_between_paths;
        if self.parallel_step_back {
            limit * 2.0
        } else {
            limit
        }
    }

    /// Largest gap a low link may bridge.
    pub fn effective_merge_distance(&self) -> f64 {
        let base = self
            .merge_distance
            .unwrap_or(3.0 * self.distance_between_paths);
        if self.parallel_step_back {
            base * 2.0
        } else {
            base
        }
    }

    /// Validate parameters
    pub fn validate(&self) -> SettingsResult<()> {
        let finite = [
            ("cutter_radius", self.cutter_radius),
            ("mitre_limit", self.mitre_limit),
            ("stepdown", self.stepdown),
            ("distance_between_paths", self.distance_between_paths),
            ("ramp_in_angle", self.ramp_in_angle),
            ("ramp_out_angle", self.ramp_out_angle),
            ("helix_diameter_ratio", self.helix_diameter_ratio),
            ("retract_radius", self.retract_radius),
            ("retract_height", self.retract_height),
            ("bridge_width", self.bridge_width),
            ("bridge_height", self.bridge_height),
            ("lead_radius", self.lead_radius),
            ("lead_start_offset", self.lead_start_offset),
            ("max_segment_length", self.max_segment_length),
            ("simplify_tolerance", self.simplify_tolerance),
        ];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(SettingsError::invalid(key, "must be a finite number"));
            }
        }

        if self.cutter_radius <= 0.0 {
            return Err(SettingsError::invalid("cutter_radius", "must be > 0"));
        }
        if self.use_layers && self.stepdown <= 0.0 {
            return Err(SettingsError::invalid(
                "stepdown",
                "must be > 0 when layers are used",
            ));
        }
        if self.distance_between_paths <= 0.0 {
            return Err(SettingsError::invalid("distance_between_paths", "must be > 0"));
        }
        if self.mitre_limit < 1.0 {
            return Err(SettingsError::invalid("mitre_limit", "must be >= 1"));
        }
        for (key, angle) in [
            ("ramp_in_angle", self.ramp_in_angle),
            ("ramp_out_angle", self.ramp_out_angle),
        ] {
            if angle <= 0.0 || angle >= 90.0 {
                return Err(ConfigError::ValueOutOfRange {
                    key: key.to_string(),
                    value: angle.to_string(),
                }
                .into());
            }
        }
        if self.helix_diameter_ratio <= 0.0 {
            return Err(SettingsError::invalid("helix_diameter_ratio", "must be > 0"));
        }
        if self.retract_radius < 0.0 || self.retract_height < 0.0 {
            return Err(SettingsError::invalid(
                "retract_radius",
                "retract radius and height must be >= 0",
            ));
        }
        if self.use_bridges && self.bridge_width <= 0.0 {
            return Err(SettingsError::invalid(
                "bridge_width",
                "must be > 0 when bridges are used",
            ));
        }
        if self.bridge_height < 0.0 {
            return Err(SettingsError::invalid("bridge_height", "must be >= 0"));
        }
        if self.lead_radius < 0.0 || self.lead_start_offset < 0.0 {
            return Err(SettingsError::invalid(
                "lead_radius",
                "lead radius and start offset must be >= 0",
            ));
        }
        if let Some(merge) = self.merge_distance {
            if !merge.is_finite() || merge < 0.0 {
                return Err(SettingsError::invalid("merge_distance", "must be >= 0"));
            }
        }
        if self.max_segment_length < 0.0 || self.simplify_tolerance < 0.0 {
            return Err(SettingsError::invalid(
                "max_segment_length",
                "refinement and simplification lengths must be >= 0",
            ));
        }
        if self.circle_segments < 4 {
            return Err(SettingsError::invalid("circle_segments", "must be >= 4"));
        }
        Ok(())
    }
}

/// A polygon given as an exterior ring and optional holes
///
/// Rings may be open or closed; a repeated first point is tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PolygonSpec {
    pub exterior: Vec<Point2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Point2>>,
}

impl PolygonSpec {
    pub fn new(exterior: Vec<Point2>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    /// Axis-aligned rectangle, counter-clockwise from `(x, y)`.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(vec![
            Point2::new(x, y),
            Point2::new(x + width, y),
            Point2::new(x + width, y + height),
            Point2::new(x, y + height),
        ])
    }

    pub fn with_hole(mut self, hole: Vec<Point2>) -> Self {
        self.holes.push(hole);
        self
    }

    fn validate(&self, key: &str) -> SettingsResult<()> {
        for ring in std::iter::once(&self.exterior).chain(self.holes.iter()) {
            if ring.len() < 3 {
                return Err(SettingsError::invalid(key, "rings need at least 3 points"));
            }
            if ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(SettingsError::invalid(key, "coordinates must be finite"));
            }
        }
        Ok(())
    }
}

/// Regular grid of floor heights
///
/// `heights` is row-major, `columns * rows` long, cell `(0, 0)` centred on
/// `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightMapSpec {
    pub origin: Point2,
    pub resolution: f64,
    pub columns: usize,
    pub rows: usize,
    pub heights: Vec<f64>,
}

impl HeightMapSpec {
    fn validate(&self) -> SettingsResult<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(SettingsError::invalid("heightmap.resolution", "must be > 0"));
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(SettingsError::invalid(
                "heightmap",
                "grid needs at least one cell",
            ));
        }
        if self.heights.len() != self.columns * self.rows {
            return Err(SettingsError::invalid(
                "heightmap.heights",
                format!(
                    "expected {} values, found {}",
                    self.columns * self.rows,
                    self.heights.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Complete job description
///
/// Aggregates the parameters, depth range and input geometry of one
/// operation and provides file I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Job name, used in logs
    pub name: String,
    /// Top of the cut
    pub start_depth: f64,
    /// Bottom of the cut
    pub end_depth: f64,
    /// How the polygons become chunks
    pub strategy: Strategy,
    /// Profile side
    pub cut_side: CutSide,
    /// Pocket ring order
    pub pocket_direction: PocketDirection,
    /// Containment policy; defaults by strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<HierarchyPolicy>,
    /// Tool position before the first chunk
    pub start_position: Point3,
    /// Cutting parameters
    pub params: CuttingParameters,
    /// Input polygons
    pub polygons: Vec<PolygonSpec>,
    /// Bridge tab polylines, buffered to the bridge width
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<Vec<Point2>>,
    /// Material silhouette for helix and retract validation; empty accepts all
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub silhouette: Vec<PolygonSpec>,
    /// Floor heights; absent means flat stock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heightmap: Option<HeightMapSpec>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: "job".to_string(),
            start_depth: 0.0,
            end_depth: -3.0,
            strategy: Strategy::Profile,
            cut_side: CutSide::Outside,
            pocket_direction: PocketDirection::InsideOut,
            hierarchy: None,
            start_position: Point3::new(0.0, 0.0, 0.0),
            params: CuttingParameters::default(),
            polygons: Vec::new(),
            tabs: Vec::new(),
            silhouette: Vec::new(),
            heightmap: None,
        }
    }
}

impl JobConfig {
    /// Create a new job with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Hierarchy policy, falling back to the strategy's natural one.
    pub fn hierarchy_policy(&self) -> HierarchyPolicy {
        self.hierarchy.unwrap_or(match self.strategy {
            Strategy::Profile => HierarchyPolicy::Polygon,
            Strategy::Pocket => HierarchyPolicy::Distance,
        })
    }

    /// Load a job from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let job: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        job.validate()?;
        debug!(
            "Loaded job '{}' with {} polygons from {}",
            job.name,
            job.polygons.len(),
            path.display()
        );
        Ok(job)
    }

    /// Save the job to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|source| SettingsError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(())
    }

    /// Validate the job
    ///
    /// The depth range is checked by the engine when the operation starts.
    pub fn validate(&self) -> SettingsResult<()> {
        self.params.validate()?;

        if !self.start_depth.is_finite() || !self.end_depth.is_finite() {
            return Err(SettingsError::invalid("start_depth", "depths must be finite"));
        }
        for polygon in &self.polygons {
            polygon.validate("polygons")?;
        }
        for polygon in &self.silhouette {
            polygon.validate("silhouette")?;
        }
        if self.tabs.iter().any(|tab| tab.is_empty()) {
            return Err(SettingsError::invalid("tabs", "tabs need at least one point"));
        }
        if let Some(map) = &self.heightmap {
            map.validate()?;
        }
        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )
            .into()),
        }
    }
}
