use std::path::Path;

use serde_json::Value;

use crate::error::{LottiecapError, LottiecapResult};

// Lottie exports that omit `w`/`h` are treated like the bodymovin player
// treats them: a 640x480 canvas.
const DEFAULT_INTRINSIC_WIDTH: u32 = 640;
const DEFAULT_INTRINSIC_HEIGHT: u32 = 480;

/// A validated Lottie animation plus the metadata the pipeline needs up front.
///
/// The payload itself stays opaque: it is embedded verbatim into the render
/// document and interpreted by the lottie-web player, never by this crate.
/// `fr`, `w` and `h` are checked here so that a malformed export fails before
/// any browser or encoder subprocess is started.
#[derive(Clone, Debug)]
pub struct AnimationSource {
    frame_rate: u32,
    intrinsic_width: u32,
    intrinsic_height: u32,
    payload: Value,
}

impl AnimationSource {
    pub fn from_value(data: Value) -> LottiecapResult<Self> {
        let obj = data
            .as_object()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| {
                LottiecapError::config("animation data must be a non-empty JSON object")
            })?;

        let frame_rate = positive_integer(obj.get("fr"), "fr")?;
        let intrinsic_width = match obj.get("w") {
            None => DEFAULT_INTRINSIC_WIDTH,
            Some(v) => positive_integer(Some(v), "w")?,
        };
        let intrinsic_height = match obj.get("h") {
            None => DEFAULT_INTRINSIC_HEIGHT,
            Some(v) => positive_integer(Some(v), "h")?,
        };

        Ok(Self {
            frame_rate,
            intrinsic_width,
            intrinsic_height,
            payload: data,
        })
    }

    pub fn from_path(path: &Path) -> LottiecapResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            LottiecapError::config(format!(
                "failed to read animation JSON '{}': {e}",
                path.display()
            ))
        })?;
        let data: Value = serde_json::from_slice(&bytes).map_err(|e| {
            LottiecapError::config(format!(
                "failed to parse animation JSON '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_value(data)
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn intrinsic_width(&self) -> u32 {
        self.intrinsic_width
    }

    pub fn intrinsic_height(&self) -> u32 {
        self.intrinsic_height
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

fn positive_integer(value: Option<&Value>, name: &str) -> LottiecapResult<u32> {
    let err = || {
        LottiecapError::config(format!(
            "animation field '{name}' must be a positive integer"
        ))
    };

    let Some(v) = value else {
        return Err(err());
    };

    if let Some(u) = v.as_u64()
        && u > 0
        && u <= u64::from(u32::MAX)
    {
        return Ok(u as u32);
    }

    // Some exporters write integral values as floats (e.g. 30.0).
    if let Some(f) = v.as_f64()
        && f > 0.0
        && f.fract() == 0.0
        && f <= f64::from(u32::MAX)
    {
        return Ok(f as u32);
    }

    Err(err())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_valid_metadata() {
        let anim =
            AnimationSource::from_value(json!({ "fr": 30, "w": 1820, "h": 275, "layers": [] }))
                .unwrap();
        assert_eq!(anim.frame_rate(), 30);
        assert_eq!(anim.intrinsic_width(), 1820);
        assert_eq!(anim.intrinsic_height(), 275);
    }

    #[test]
    fn accepts_integral_float_fields() {
        let anim = AnimationSource::from_value(json!({ "fr": 30.0, "w": 100.0, "h": 50 })).unwrap();
        assert_eq!(anim.frame_rate(), 30);
        assert_eq!(anim.intrinsic_width(), 100);
    }

    #[test]
    fn defaults_missing_dimensions() {
        let anim = AnimationSource::from_value(json!({ "fr": 24 })).unwrap();
        assert_eq!(anim.intrinsic_width(), 640);
        assert_eq!(anim.intrinsic_height(), 480);
    }

    #[test]
    fn rejects_missing_or_fractional_frame_rate() {
        assert!(matches!(
            AnimationSource::from_value(json!({ "w": 10, "h": 10 })),
            Err(LottiecapError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            AnimationSource::from_value(json!({ "fr": 29.97, "w": 10, "h": 10 })),
            Err(LottiecapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_non_positive_fields() {
        assert!(AnimationSource::from_value(json!({ "fr": 0 })).is_err());
        assert!(AnimationSource::from_value(json!({ "fr": 30, "w": 0 })).is_err());
        assert!(AnimationSource::from_value(json!({ "fr": 30, "h": -5 })).is_err());
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(AnimationSource::from_value(json!([1, 2, 3])).is_err());
        assert!(AnimationSource::from_value(json!({})).is_err());
    }
}
