use kurbo::BezPath;

use crate::model::ShapeId;

/// Closed outline data for every catalog shape, authored in a fixed 0..1024
/// coordinate space. The paths are not parametrized by canvas size; callers
/// render onto a canvas of the same extent (known limitation).
fn path_data(id: ShapeId) -> &'static str {
    match id {
        ShapeId::Heart => {
            "M512,182 C347,17 72,127 72,402 C72,677 512,1007 512,1007 C512,1007 952,677 952,402 C952,127 677,17 512,182"
        }
        ShapeId::Circle => "M 512 50 A 486.4 486.4 0 1 1 511.99 50",
        ShapeId::Triangle => "M 512 62 L 0 741 L 1024 741 Z",
        ShapeId::Cross => "M398 102 V398 H102 V626 H398 V922 H626 V626 H922 V398 H626 V102 Z",
        ShapeId::Star => {
            "M512,-0.9759 L602.3,380.5311 L1028.96,359.9301 L717.362,563.2401 L835.07,992.5581 L512,728.4531 L188.93,992.5581 L306.638,563.2401 L-4.96,359.9301 L421.7,380.5311 "
        }
        ShapeId::Pentagon => {
            "M920.1445651649736,808.2437680794063 L356.65543483502663,991.3324842127572 L8.4,512 L356.6554348350264,32.66751578724263 L920.1445651649734,215.75623284459345 Z"
        }
        ShapeId::Octagon => {
            "M992.25,710.426375 L711.155,991.812375 L313.828,991.812375 L32.686,710.426375 L32.686,312.936375 L313.992,31.794375 L711.155,31.794375 L992.25,313.100375 Z"
        }
        ShapeId::Decaton => {
            "M992,512 L896.5304,806.768 L646.5896,991.2296 L377.4104,991.2296 L127.4696,806.768 L32,512 L127.4696,217.232 L377.4104,32.7704 L646.5896,32.7704 L896.5304,217.232 Z"
        }
        ShapeId::Rhombus => "M512,3.18 L897.32,512 L512,1020.82 L126.68,512 Z",
    }
}

/// Outline for a known shape id. Total; the literal data is known-valid, so a
/// parse failure degrades to the empty path rather than erroring.
pub fn path_for(id: ShapeId) -> BezPath {
    BezPath::from_svg(path_data(id)).unwrap_or_default()
}

/// Outline for a wire-level shape name. Unrecognized names map to the empty
/// path, which masks to a fully transparent result downstream.
pub fn path_for_name(name: &str) -> BezPath {
    match ShapeId::parse(name) {
        Some(id) => path_for(id),
        None => {
            tracing::warn!(shape = name, "unknown shape id, using empty path");
            BezPath::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Shape as _;

    use super::*;
    use crate::model::ShapeId;

    #[test]
    fn every_catalog_shape_parses_to_a_fill_region() {
        for id in ShapeId::ALL {
            let path = path_for(id);
            assert!(!path.elements().is_empty(), "{id:?} parsed empty");
            let bbox = path.bounding_box();
            assert!(
                bbox.width() > 100.0 && bbox.height() > 100.0,
                "{id:?} has degenerate bounds {bbox:?}"
            );
            assert!(
                bbox.x0 >= -16.0 && bbox.y0 >= -16.0 && bbox.x1 <= 1040.0 && bbox.y1 <= 1040.0,
                "{id:?} escapes the authored 0..1024 space: {bbox:?}"
            );
        }
    }

    #[test]
    fn path_for_is_pure() {
        let a = path_for(ShapeId::Star);
        let b = path_for(ShapeId::Star);
        assert_eq!(a.elements(), b.elements());
    }

    #[test]
    fn unknown_name_degrades_to_empty_path() {
        assert!(path_for_name("hexagon").elements().is_empty());
        assert!(!path_for_name("heart").elements().is_empty());
    }
}
