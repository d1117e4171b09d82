//! Transform identifiers and the boundary vocabulary.

use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

use crate::TransformError;

/// A color transform the engine can apply to the original.
///
/// Dispatch over this enum is an exhaustive `match`; adding a variant is a
/// compile error everywhere a kernel is selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Identity: the original pixels, unchanged.
    #[default]
    Original,
    /// `255 - c` on each color channel.
    Invert,
    /// BT.601 luma copied to all three color channels.
    Grayscale,
    /// Standard sepia tone matrix.
    Sepia,
    /// Block average over `block × block` tiles.
    Mosaic {
        /// Tile edge length in pixels.
        block: NonZeroU32,
    },
    /// 3×3 luma blur with chroma preserved.
    Smooth,
}

impl Transform {
    /// Tile size used by a bare `"mosaic"` request.
    pub const DEFAULT_MOSAIC_BLOCK: NonZeroU32 = match NonZeroU32::new(8) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// The point-wise transforms, in the order a picker would list them.
    pub const POINTWISE: [Transform; 4] = [
        Transform::Original,
        Transform::Invert,
        Transform::Grayscale,
        Transform::Sepia,
    ];

    /// Mosaic with the given tile size.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidParameter`] if `block` is zero.
    pub fn mosaic(block: u32) -> Result<Self, TransformError> {
        NonZeroU32::new(block)
            .map(|block| Transform::Mosaic { block })
            .ok_or(TransformError::InvalidParameter {
                transform: "mosaic",
                reason: "block size must be at least 1",
            })
    }

    /// Canonical identifier, as accepted by [`parse`](Self::parse).
    pub fn name(self) -> &'static str {
        match self {
            Transform::Original => "original",
            Transform::Invert => "invert",
            Transform::Grayscale => "grayscale",
            Transform::Sepia => "sepia",
            Transform::Mosaic { .. } => "mosaic",
            Transform::Smooth => "smooth",
        }
    }

    /// Whether each output pixel depends only on the same input pixel.
    pub fn is_pointwise(self) -> bool {
        match self {
            Transform::Original | Transform::Invert | Transform::Grayscale | Transform::Sepia => {
                true
            }
            Transform::Mosaic { .. } | Transform::Smooth => false,
        }
    }

    /// Parse a transform identifier (case-insensitive).
    ///
    /// Accepts the canonical names plus a few aliases. Mosaic takes an
    /// optional tile size: `"mosaic"` or `"mosaic:16"`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnknownTransform`] for unrecognized names,
    /// or [`TransformError::InvalidParameter`] for a malformed mosaic size.
    pub fn parse(id: &str) -> Result<Self, TransformError> {
        let id = id.trim();
        let (name, param) = match id.split_once(':') {
            Some((name, param)) => (name.trim_end(), Some(param.trim_start())),
            None => (id, None),
        };
        let is = |candidates: &[&str]| candidates.iter().any(|c| name.eq_ignore_ascii_case(c));

        if is(&["mosaic"]) {
            return match param {
                None => Ok(Transform::Mosaic {
                    block: Self::DEFAULT_MOSAIC_BLOCK,
                }),
                Some(p) => {
                    let block = p.parse::<u32>().map_err(|_| TransformError::InvalidParameter {
                        transform: "mosaic",
                        reason: "block size is not an integer",
                    })?;
                    Self::mosaic(block)
                }
            };
        }

        let transform = if is(&["original", "identity", "none"]) {
            Transform::Original
        } else if is(&["invert", "inverted"]) {
            Transform::Invert
        } else if is(&["grayscale", "greyscale", "gray", "grey"]) {
            Transform::Grayscale
        } else if is(&["sepia"]) {
            Transform::Sepia
        } else if is(&["smooth", "smoothing"]) {
            Transform::Smooth
        } else {
            return Err(TransformError::UnknownTransform(id.to_owned()));
        };

        // Only mosaic takes a parameter.
        if param.is_some() {
            return Err(TransformError::UnknownTransform(id.to_owned()));
        }
        Ok(transform)
    }
}

impl FromStr for Transform {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Mosaic { block } if *block != Self::DEFAULT_MOSAIC_BLOCK => {
                write!(f, "mosaic:{block}")
            }
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_names() {
        assert_eq!(Transform::parse("original").unwrap(), Transform::Original);
        assert_eq!(Transform::parse("invert").unwrap(), Transform::Invert);
        assert_eq!(Transform::parse("grayscale").unwrap(), Transform::Grayscale);
        assert_eq!(Transform::parse("sepia").unwrap(), Transform::Sepia);
        assert_eq!(Transform::parse("smooth").unwrap(), Transform::Smooth);
    }

    #[test]
    fn parse_aliases_and_case() {
        assert_eq!(Transform::parse("inverted").unwrap(), Transform::Invert);
        assert_eq!(Transform::parse("GreyScale").unwrap(), Transform::Grayscale);
        assert_eq!(Transform::parse(" SEPIA ").unwrap(), Transform::Sepia);
        assert_eq!(Transform::parse("identity").unwrap(), Transform::Original);
    }

    #[test]
    fn parse_unknown() {
        let err = Transform::parse("vignette").unwrap_err();
        assert!(matches!(err, TransformError::UnknownTransform(ref s) if s == "vignette"));
        assert!(Transform::parse("").is_err());
        assert!(Transform::parse("sepia:3").is_err());
    }

    #[test]
    fn parse_mosaic_block() {
        assert_eq!(
            Transform::parse("mosaic").unwrap(),
            Transform::Mosaic {
                block: Transform::DEFAULT_MOSAIC_BLOCK
            }
        );
        assert_eq!(Transform::parse("mosaic:16").unwrap(), Transform::mosaic(16).unwrap());
        assert!(matches!(
            Transform::parse("mosaic:0"),
            Err(TransformError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Transform::parse("mosaic:big"),
            Err(TransformError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let all = [
            Transform::Original,
            Transform::Invert,
            Transform::Grayscale,
            Transform::Sepia,
            Transform::Smooth,
            Transform::mosaic(8).unwrap(),
            Transform::mosaic(3).unwrap(),
        ];
        for t in all {
            assert_eq!(t.to_string().parse::<Transform>().unwrap(), t);
        }
        assert_eq!(Transform::mosaic(3).unwrap().to_string(), "mosaic:3");
    }

    #[test]
    fn pointwise_classification() {
        assert!(Transform::POINTWISE.iter().all(|t| t.is_pointwise()));
        assert!(!Transform::Smooth.is_pointwise());
        assert!(!Transform::mosaic(2).unwrap().is_pointwise());
    }

    #[test]
    fn default_is_original() {
        assert_eq!(Transform::default(), Transform::Original);
    }
}
