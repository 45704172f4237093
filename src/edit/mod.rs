// Transform model
//
// EditSpec is the full, explicit description of one edit. Every field has an
// identity value and missing JSON fields deserialize to it, so a spec is never
// partially specified.

pub mod geometry;
pub mod history;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ADJUSTMENT_IDENTITY, ADJUSTMENT_MAX, ADJUSTMENT_MIN, CROP_MIN_EXTENT, ROTATION_LIMIT_DEGREES,
};
use crate::error::ValidationError;

/// Named filter preset applied after the tone adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Filter {
    #[default]
    Normal,
    Grayscale,
    Sepia,
    Vintage,
    Cool,
    Warm,
}

impl Filter {
    pub const ALL: [Filter; 6] = [
        Filter::Normal,
        Filter::Grayscale,
        Filter::Sepia,
        Filter::Vintage,
        Filter::Cool,
        Filter::Warm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::Normal => "normal",
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Vintage => "vintage",
            Filter::Cool => "cool",
            Filter::Warm => "warm",
        }
    }
}

impl FromStr for Filter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownFilter(s.to_string()))
    }
}

impl TryFrom<String> for Filter {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.as_str().to_string()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crop rectangle in percentages of the image dimensions at crop time
/// (after rotation), not absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("x", self.x, 0.0),
            ("y", self.y, 0.0),
            ("width", self.width, CROP_MIN_EXTENT),
            ("height", self.height, CROP_MIN_EXTENT),
        ];
        for (field, value, min) in fields {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            if value < min || value > 100.0 {
                return Err(ValidationError::CropFieldOutOfRange { field, value, min });
            }
        }

        let right = self.x + self.width;
        if right > 100.0 {
            return Err(ValidationError::CropOutOfBounds { axis: "x", total: right });
        }
        let bottom = self.y + self.height;
        if bottom > 100.0 {
            return Err(ValidationError::CropOutOfBounds { axis: "y", total: bottom });
        }
        Ok(())
    }
}

/// All edit parameters for one transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditSpec {
    /// Degrees, signed. 0 = identity.
    pub rotation: f32,
    /// Percent, [0, 200]. 100 = identity.
    pub brightness: f32,
    /// Percent, [0, 200]. 100 = identity.
    pub contrast: f32,
    /// Percent, [0, 200]. 100 = identity.
    pub saturation: f32,
    pub filter: Filter,
    pub crop: Option<CropRect>,
}

impl Default for EditSpec {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            brightness: ADJUSTMENT_IDENTITY,
            contrast: ADJUSTMENT_IDENTITY,
            saturation: ADJUSTMENT_IDENTITY,
            filter: Filter::Normal,
            crop: None,
        }
    }
}

impl EditSpec {
    pub fn identity() -> Self {
        Self::default()
    }

    /// True iff every field holds its no-op value. Identity specs never reach
    /// the commit pipeline.
    pub fn is_identity(&self) -> bool {
        self.rotation == 0.0
            && self.brightness == ADJUSTMENT_IDENTITY
            && self.contrast == ADJUSTMENT_IDENTITY
            && self.saturation == ADJUSTMENT_IDENTITY
            && self.filter == Filter::Normal
            && self.crop.is_none()
    }

    /// Validate against the source dimensions. Runs before both preview and
    /// commit, so a spec accepted here is also accepted at commit time.
    pub fn validate(&self, source_dims: (u32, u32)) -> Result<(), ValidationError> {
        let (width, height) = source_dims;
        if width == 0 || height == 0 {
            return Err(ValidationError::EmptySource(width, height));
        }

        if !self.rotation.is_finite() {
            return Err(ValidationError::NotFinite { field: "rotation" });
        }
        if self.rotation.abs() > ROTATION_LIMIT_DEGREES {
            return Err(ValidationError::RotationOutOfRange(self.rotation));
        }

        for (field, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            if !(ADJUSTMENT_MIN..=ADJUSTMENT_MAX).contains(&value) {
                return Err(ValidationError::AdjustmentOutOfRange { field, value });
            }
        }

        if let Some(crop) = &self.crop {
            crop.validate()?;
            // Percentages can be in range and still round to zero pixels on a
            // small canvas; resolve now so commit cannot reject it later.
            let canvas = geometry::rotated_dimensions(width, height, self.rotation);
            geometry::resolve_crop(crop, canvas).map_err(|reason| {
                ValidationError::CropTooSmall {
                    canvas_width: canvas.0,
                    canvas_height: canvas.1,
                    reason,
                }
            })?;
        }

        Ok(())
    }

    /// Convert to JSON string for database storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from database or CLI input)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ValidationError {
    /// Crop problems surface as InvalidCrop from the commit pipeline.
    pub fn is_crop(&self) -> bool {
        matches!(
            self,
            ValidationError::CropFieldOutOfRange { .. }
                | ValidationError::CropOutOfBounds { .. }
                | ValidationError::CropTooSmall { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        let spec = EditSpec::default();
        assert!(spec.is_identity());
        assert!(spec.validate((100, 100)).is_ok());
    }

    #[test]
    fn test_any_field_breaks_identity() {
        let variants = [
            EditSpec { rotation: 90.0, ..EditSpec::default() },
            EditSpec { rotation: 360.0, ..EditSpec::default() },
            EditSpec { brightness: 101.0, ..EditSpec::default() },
            EditSpec { contrast: 99.0, ..EditSpec::default() },
            EditSpec { saturation: 0.0, ..EditSpec::default() },
            EditSpec { filter: Filter::Sepia, ..EditSpec::default() },
            EditSpec { crop: Some(CropRect::new(0.0, 0.0, 100.0, 100.0)), ..EditSpec::default() },
        ];
        for spec in variants {
            assert!(!spec.is_identity(), "{:?} should not be identity", spec);
        }
    }

    #[test]
    fn test_missing_json_fields_are_identity() {
        let spec = EditSpec::from_json("{}").unwrap();
        assert!(spec.is_identity());

        let spec = EditSpec::from_json(r#"{"brightness": 150}"#).unwrap();
        assert_eq!(spec.brightness, 150.0);
        assert_eq!(spec.contrast, 100.0);
        assert_eq!(spec.filter, Filter::Normal);
        assert!(spec.crop.is_none());
    }

    #[test]
    fn test_json_roundtrip_uses_filter_names() {
        let spec = EditSpec {
            rotation: -45.0,
            filter: Filter::Vintage,
            crop: Some(CropRect::new(10.0, 5.0, 50.0, 60.0)),
            ..EditSpec::default()
        };
        let json = spec.to_json().unwrap();
        assert!(json.contains(r#""filter":"vintage""#));
        assert_eq!(EditSpec::from_json(&json).unwrap(), spec);
    }

    #[test]
    fn test_unknown_filter_rejected() {
        assert_eq!(
            "polaroid".parse::<Filter>(),
            Err(ValidationError::UnknownFilter("polaroid".to_string()))
        );
        let err = EditSpec::from_json(r#"{"filter": "polaroid"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown filter"));
        assert_eq!("WARM".parse::<Filter>(), Ok(Filter::Warm));
    }

    #[test]
    fn test_adjustment_range() {
        let ok = EditSpec { brightness: 0.0, contrast: 200.0, ..EditSpec::default() };
        assert!(ok.validate((10, 10)).is_ok());

        let bad = EditSpec { saturation: 200.5, ..EditSpec::default() };
        assert!(matches!(
            bad.validate((10, 10)),
            Err(ValidationError::AdjustmentOutOfRange { field: "saturation", .. })
        ));

        let nan = EditSpec { contrast: f32::NAN, ..EditSpec::default() };
        assert!(matches!(
            nan.validate((10, 10)),
            Err(ValidationError::NotFinite { field: "contrast" })
        ));
    }

    #[test]
    fn test_rotation_range() {
        let ok = EditSpec { rotation: -360.0, ..EditSpec::default() };
        assert!(ok.validate((10, 10)).is_ok());
        let bad = EditSpec { rotation: 361.0, ..EditSpec::default() };
        assert_eq!(bad.validate((10, 10)), Err(ValidationError::RotationOutOfRange(361.0)));
    }

    #[test]
    fn test_crop_bounds() {
        let cases = [
            CropRect::new(60.0, 0.0, 50.0, 100.0),
            CropRect::new(0.0, 30.0, 10.0, 80.0),
            CropRect::new(0.0, 0.0, 0.0, 50.0),
            CropRect::new(0.0, 0.0, 50.0, -5.0),
            CropRect::new(-1.0, 0.0, 50.0, 50.0),
        ];
        for crop in cases {
            let spec = EditSpec { crop: Some(crop), ..EditSpec::default() };
            let err = spec.validate((1000, 500)).unwrap_err();
            assert!(err.is_crop(), "{:?} should be a crop error, got {:?}", crop, err);
        }
    }

    #[test]
    fn test_crop_that_rounds_to_nothing_is_rejected() {
        let spec = EditSpec {
            crop: Some(CropRect::new(0.0, 0.0, 1.0, 1.0)),
            ..EditSpec::default()
        };
        assert!(spec.validate((1000, 1000)).is_ok());
        assert!(matches!(
            spec.validate((20, 20)),
            Err(ValidationError::CropTooSmall { .. })
        ));
    }

    #[test]
    fn test_empty_source_rejected() {
        assert_eq!(
            EditSpec::default().validate((0, 10)),
            Err(ValidationError::EmptySource(0, 10))
        );
    }
}
