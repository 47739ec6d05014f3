use crate::error::{LottiecapError, LottiecapResult};

/// Final page geometry for one pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: u32,
}

/// Compute the output width/height from the requested dimensions and the
/// animation's intrinsic size.
///
/// - Neither requested: the intrinsic size is used unchanged.
/// - Exactly one requested: the other is derived preserving the intrinsic
///   aspect ratio, truncated to an integer (1820x275 at width 640 gives
///   640x96, at height 100 gives 661x100).
/// - Both requested: returned unchanged, aspect ratio is not enforced.
pub fn resolve_dimensions(
    requested_width: Option<u32>,
    requested_height: Option<u32>,
    intrinsic_width: u32,
    intrinsic_height: u32,
) -> LottiecapResult<(u32, u32)> {
    if intrinsic_width == 0 || intrinsic_height == 0 {
        return Err(LottiecapError::dimension(format!(
            "intrinsic size must be positive, got {intrinsic_width}x{intrinsic_height}"
        )));
    }
    if requested_width == Some(0) || requested_height == Some(0) {
        return Err(LottiecapError::dimension(
            "requested width/height must be positive",
        ));
    }

    let aspect = f64::from(intrinsic_width) / f64::from(intrinsic_height);

    let (width, height) = match (requested_width, requested_height) {
        (None, None) => (intrinsic_width, intrinsic_height),
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, (f64::from(w) / aspect) as u32),
        (None, Some(h)) => ((f64::from(h) * aspect) as u32, h),
    };

    if width == 0 || height == 0 {
        return Err(LottiecapError::dimension(format!(
            "resolved size {width}x{height} collapsed to zero"
        )));
    }

    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neither_requested_returns_intrinsic() {
        assert_eq!(resolve_dimensions(None, None, 1820, 275).unwrap(), (1820, 275));
    }

    #[test]
    fn width_only_derives_truncated_height() {
        // 640 * 275 / 1820 = 96.70 -> 96
        assert_eq!(resolve_dimensions(Some(640), None, 1820, 275).unwrap(), (640, 96));
    }

    #[test]
    fn height_only_derives_truncated_width() {
        // 100 * 1820 / 275 = 661.8 -> 661
        assert_eq!(resolve_dimensions(None, Some(100), 1820, 275).unwrap(), (661, 100));
    }

    #[test]
    fn both_requested_skip_aspect_enforcement() {
        assert_eq!(resolve_dimensions(Some(10), Some(999), 1820, 275).unwrap(), (10, 999));
    }

    #[test]
    fn zero_inputs_are_rejected() {
        assert!(resolve_dimensions(None, None, 0, 275).is_err());
        assert!(resolve_dimensions(Some(0), None, 1820, 275).is_err());
        assert!(resolve_dimensions(None, Some(0), 1820, 275).is_err());
    }

    #[test]
    fn collapsed_derived_size_is_rejected() {
        // 1 * 1 / 10000 truncates to zero height.
        assert!(resolve_dimensions(Some(1), None, 10000, 1).is_err());
    }
}
