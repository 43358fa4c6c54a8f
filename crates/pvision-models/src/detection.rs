//! Detection results produced by the object detector.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates, corner format.
///
/// Invariant: `x1 <= x2` and `y1 <= y2`, enforced by [`BBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    /// Create a bounding box, normalizing corner order.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Get the center point in pixel coordinates.
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Box area in square pixels.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp the box to `[0, width] x [0, height]`.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }
}

/// Field role inferred from detection geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    RefereeOrCoach,
    SpectatorOrOther,
    Ball,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::RefereeOrCoach => "referee_or_coach",
            Role::SpectatorOrOther => "spectator_or_other",
            Role::Ball => "ball",
        }
    }
}

/// Area thresholds separating person roles.
///
/// The cutoffs are resolution- and model-dependent, so they are carried as
/// configuration rather than baked into the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleThresholds {
    /// Boxes larger than this are players
    pub player_min_area: f32,
    /// Boxes larger than this (but not player-sized) are referees or coaches
    pub referee_min_area: f32,
}

impl Default for RoleThresholds {
    fn default() -> Self {
        Self {
            player_min_area: 5000.0,
            referee_min_area: 2000.0,
        }
    }
}

impl RoleThresholds {
    /// Classify a person box by its area.
    pub fn classify(&self, area: f32) -> Role {
        if area > self.player_min_area {
            Role::Player
        } else if area > self.referee_min_area {
            Role::RefereeOrCoach
        } else {
            Role::SpectatorOrOther
        }
    }
}

/// One detected object instance in a frame.
///
/// Immutable once produced by the detector, except for the derived `role`
/// tag appended during classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// COCO class ID (0 = person, 32 = sports ball, ...)
    pub class_id: usize,
    #[serde(rename = "class")]
    pub class_name: String,
    /// Detection confidence [0, 1]
    pub confidence: f32,
    pub bbox: BBox,
    /// Derived midpoint of the box
    pub center: (f32, f32),
    /// Derived box area in square pixels
    pub area: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Detection {
    /// Create a detection, deriving center and area from the box.
    pub fn new(class_id: usize, class_name: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
        Self {
            class_id,
            class_name: class_name.into(),
            confidence,
            bbox,
            center: bbox.center(),
            area: bbox.area(),
            role: None,
        }
    }

    /// Attach a derived role tag.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Label text drawn over the box: `"{class}: {confidence:.2}"`,
    /// suffixed with the role when present.
    pub fn label(&self) -> String {
        match self.role {
            Some(role) => format!("{}: {:.2} ({})", self.class_name, self.confidence, role.as_str()),
            None => format!("{}: {:.2}", self.class_name, self.confidence),
        }
    }
}

/// Ordered detections for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    /// Unique class names present, in first-seen order.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for det in &self.detections {
            if !names.iter().any(|n| n == &det.class_name) {
                names.push(det.class_name.clone());
            }
        }
        names
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.iter()
    }
}
