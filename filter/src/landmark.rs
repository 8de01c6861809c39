//! Per-landmark bounding-box prediction and detectability, computed once at startup and held
//! as shared-immutable values thereafter — a single owner, shared read borrow, no lifecycle
//! complexity.

use crate::geometry::{self, WorldPoint, GRID_H, GRID_THETA, GRID_W};
use crate::grid::Grid3;

/// A known, static landmark object: a label plus the five points (centre and four corners)
/// defining its vertical rectangular face.
#[derive(Clone, Debug)]
pub struct WorldObject {
    pub label: String,
    pub centre: WorldPoint,
    pub bottom_left: WorldPoint,
    pub bottom_right: WorldPoint,
    pub top_left: WorldPoint,
    pub top_right: WorldPoint,
}

/// Per-cell predicted bounding box, as four `[H, W, Theta]` grids.
pub struct BoundingBoxGrid {
    pub centre_u: Grid3,
    pub centre_v: Grid3,
    pub width: Grid3,
    pub height: Grid3,
}

/// The box prediction and detectability prior for one landmark, computed once.
pub struct LandmarkPrediction {
    pub class_id: String,
    pub boxes: BoundingBoxGrid,
    pub detectability: Grid3,
}

fn mean_grid(a: &Grid3, b: &Grid3) -> Grid3 {
    a.add(b).scale(0.5)
}

/// Builds the predicted bounding box and detectability grids for a single landmark.
fn predict_landmark(object: &WorldObject) -> LandmarkPrediction {
    let (centre_u, centre_v) = geometry::project_grid(object.centre);
    let (bl_u, bl_v) = geometry::project_grid(object.bottom_left);
    let (br_u, br_v) = geometry::project_grid(object.bottom_right);
    let (tl_u, tl_v) = geometry::project_grid(object.top_left);
    let (tr_u, tr_v) = geometry::project_grid(object.top_right);

    let left = mean_grid(&bl_u, &tl_u);
    let right = mean_grid(&br_u, &tr_u);
    let top = mean_grid(&tl_v, &tr_v);
    let bottom = mean_grid(&bl_v, &br_v);

    let width = right.add(&left.scale(-1.0)).map(|v| v.max(0.0));
    let height = bottom.add(&top.scale(-1.0)).map(|v| v.max(0.0));

    let detectability = Grid3::from_fn(GRID_H, GRID_W, GRID_THETA, |iy, ix, it| {
        let cx = centre_u.get(iy, ix, it);
        let cy = centre_v.get(iy, ix, it);
        let w = width.get(iy, ix, it);
        let h = height.get(iy, ix, it);

        let c_left = (cx - w).clamp(-geometry::PRINCIPAL_X, geometry::PRINCIPAL_X);
        let c_right = (cx + w).clamp(-geometry::PRINCIPAL_X, geometry::PRINCIPAL_X);
        let c_bottom = (cy - h).clamp(-geometry::PRINCIPAL_Y, geometry::PRINCIPAL_Y);
        let c_top = (cy + h).clamp(-geometry::PRINCIPAL_Y, geometry::PRINCIPAL_Y);

        let clipped_area = (c_right - c_left) * (c_top - c_bottom);
        let full_area = w * h;
        let ratio = clipped_area / (full_area + clipped_area);
        let ratio = if ratio.is_nan() { 0.0 } else { ratio };

        0.05 + 0.90 * ratio
    });

    LandmarkPrediction {
        class_id: object.label.clone(),
        boxes: BoundingBoxGrid {
            centre_u,
            centre_v,
            width,
            height,
        },
        detectability,
    }
}

/// The fixed table of known landmarks and their precomputed predictions.
pub struct LandmarkSet {
    pub landmarks: Vec<LandmarkPrediction>,
}

impl LandmarkSet {
    /// Builds predictions for every landmark object, preserving the table's declaration order
    /// (a `Vec`, not a `HashMap`) so the data-association recursion in
    /// [`crate::observation`] sees deterministic landmark indices.
    pub fn new(objects: &[WorldObject]) -> Self {
        Self {
            landmarks: objects.iter().map(predict_landmark).collect(),
        }
    }

    /// Two example landmarks: a "dog" facing -x at
    /// `(1.5, 0, 0.27)` and a "cat" facing -y at `(0.5, -1.5, 0.27)`.
    ///
    /// The corner offsets mirror the `world_dog`/`world_cat` tables' geometry, with one fix: a
    /// naive `world_cat` corner pair would carry `y = +1.5` (matching the dog's unrelated
    /// `x = 1.5`), three metres away from the cat's own centre `y = -1.5` — evidently a
    /// copy/paste slip, since a landmark's corners are meant to form a vertical rectangular
    /// face near its own centre. Corrected here to `y = -1.5`, with the corners at
    /// `x = 0.5 +/- 0.11` so the face is perpendicular to the cat's actual viewing axis,
    /// mirroring how the dog's face is perpendicular to its own.
    pub fn standard() -> Self {
        let dog = WorldObject {
            label: "dog".to_string(),
            centre: WorldPoint::new(1.5, 0.0, 0.27),
            bottom_left: WorldPoint::new(1.5, 0.11, 0.02),
            bottom_right: WorldPoint::new(1.5, -0.11, 0.02),
            top_left: WorldPoint::new(1.5, 0.11, 0.52),
            top_right: WorldPoint::new(1.5, -0.11, 0.52),
        };
        let cat = WorldObject {
            label: "cat".to_string(),
            centre: WorldPoint::new(0.5, -1.5, 0.27),
            bottom_left: WorldPoint::new(0.5 - 0.11, -1.5, 0.02),
            bottom_right: WorldPoint::new(0.5 + 0.11, -1.5, 0.02),
            top_left: WorldPoint::new(0.5 - 0.11, -1.5, 0.52),
            top_right: WorldPoint::new(0.5 + 0.11, -1.5, 0.52),
        };
        Self::new(&[dog, cat])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detectability_bounds_hold_everywhere() {
        let set = LandmarkSet::standard();
        for landmark in &set.landmarks {
            for it in 0..GRID_THETA {
                for iy in 0..GRID_H {
                    for ix in 0..GRID_W {
                        let v = landmark.detectability.get(iy, ix, it);
                        assert!((0.05..=1.0).contains(&v), "detectability out of bounds: {v}");
                    }
                }
            }
        }
    }

    #[test]
    fn standard_landmarks_are_dog_then_cat() {
        let set = LandmarkSet::standard();
        assert_eq!(set.landmarks.len(), 2);
        assert_eq!(set.landmarks[0].class_id, "dog");
        assert_eq!(set.landmarks[1].class_id, "cat");
    }
}
