//! Rays against byte height fields.
//!
//! The 4×4 field built from the ASCII bytes `"1234567890123456"` covers
//! `[0, 3] × [0, 3]` with heights between 48 and 57. Rays starting outside
//! that footprint must be answered from the tree alone, without reading
//! past the sample grid.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use nalgebra::{IsometryMatrix3, Point3, Vector3};
use sim_collide::geometry::Ray;
use sim_collide::heightfield::{HeightField, HeightFieldData};
use sim_types::{ColliderConfig, TreeConfig};

use crate::collision_test_utils::{translation, GEOM_TOL};

fn byte_field(config: TreeConfig) -> HeightField {
    let data = HeightFieldData::from_bytes(b"1234567890123456", 4, 4, 1.0, 1.0, 0.0).unwrap();
    HeightField::with_config(data, config).unwrap()
}

fn layouts() -> [TreeConfig; 3] {
    [TreeConfig::plain(), TreeConfig::no_leaf(), TreeConfig::quantized()]
}

#[test]
fn byte_field_samples() {
    let field = byte_field(TreeConfig::default());
    let data = field.data();
    assert_eq!(data.get(0, 0), Some(f64::from(b'1')));
    assert_eq!(data.get(1, 2), Some(f64::from(b'0')));
    assert_eq!(data.get(3, 3), Some(f64::from(b'6')));
    assert_eq!(data.min_height(), 48.0);
    assert_eq!(data.max_height(), 57.0);
    assert!(data.get(4, 0).is_none());
}

#[test]
fn ray_outside_bounds_misses_without_panicking() {
    for config in layouts() {
        let field = byte_field(config);
        let ray = Ray::new(Point3::new(5.0, 10.0, 1.0), -Vector3::y(), 20.0).unwrap();
        let hit = field.raycast(&ray, &IsometryMatrix3::identity(), ColliderConfig::default());
        assert!(hit.is_none());
    }
}

#[test]
fn ray_outside_bounds_under_placed_field() {
    for config in layouts() {
        let field = byte_field(config);
        let ray = Ray::new(Point3::new(105.0, 110.0, 1.0), -Vector3::y(), 20.0).unwrap();
        let hit = field.raycast(&ray, &translation(100.0, 100.0, 0.0), ColliderConfig::default());
        assert!(hit.is_none());
    }
}

#[test]
fn ray_from_outside_reaches_surface() {
    // Enters over the far edge at y = 10 and descends onto the field.
    let dir = Vector3::new(0.0, -1.0, -1.0);
    let origin = Point3::new(1.5, 10.0, 60.0);
    for config in layouts() {
        let field = byte_field(config);
        let ray = Ray::new(origin, dir, 100.0).unwrap();
        let hit = field
            .raycast(&ray, &IsometryMatrix3::identity(), ColliderConfig::default())
            .expect("descending ray should land on the field");

        let surface = field.data().sample(hit.point.x, hit.point.y).unwrap();
        assert!((hit.point.z - surface).abs() < GEOM_TOL);
        assert!(hit.point.y >= 0.0 && hit.point.y <= 3.0);
        assert!(hit.normal.dot(&ray.dir) < 0.0, "normal faces the ray");
    }
}

#[test]
fn ray_from_above_hits_every_cell_center() {
    let field = byte_field(TreeConfig::default());
    for cy in 0..3 {
        for cx in 0..3 {
            let (x, y) = (f64::from(cx) + 0.3, f64::from(cy) + 0.6);
            let ray = Ray::new(Point3::new(x, y, 100.0), -Vector3::z(), 200.0).unwrap();
            let hit = field
                .raycast(&ray, &IsometryMatrix3::identity(), ColliderConfig::default())
                .unwrap();
            let expected = field.data().sample(x, y).unwrap();
            assert!((hit.distance - (100.0 - expected)).abs() < GEOM_TOL);
        }
    }
}
