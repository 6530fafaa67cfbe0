use euclid::*;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;

/// Editor viewport: a normalized pan offset (roughly [-1, 1] across the
/// canvas) and a zoom scale. World space is y-up, canvas space is y-down;
/// the two transforms below are exact inverses of each other so a drag can
/// round-trip through them with zero drift.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub offset: Vector2D<f32>,
    pub scale: f32,
}

impl Default for Camera {
    fn default() -> Camera {
        Camera {
            offset: vec2(0.0, 0.1),
            scale: 2.0,
        }
    }
}

impl Camera {
    pub fn new() -> Camera {
        Default::default()
    }

    /// Canvas pixel position of the world origin.
    pub fn origin_px(&self, size: Vector2D<f32>) -> Point2D<f32> {
        point2(
            size.x * (0.5 + self.offset.x * 0.5),
            size.y * (0.5 + self.offset.y * 0.5),
        )
    }

    pub fn world_to_canvas(&self, size: Vector2D<f32>, world: Point2D<f32>) -> Point2D<f32> {
        let origin = self.origin_px(size);
        point2(
            world.x * self.scale + origin.x,
            -world.y * self.scale + origin.y,
        )
    }

    pub fn canvas_to_world(&self, size: Vector2D<f32>, canvas: Point2D<f32>) -> Point2D<f32> {
        let origin = self.origin_px(size);
        point2(
            (canvas.x - origin.x) / self.scale,
            -(canvas.y - origin.y) / self.scale,
        )
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.max(MIN_ZOOM).min(MAX_ZOOM);
    }

    pub fn pan(&mut self, delta: Vector2D<f32>) {
        self.offset += delta;
    }

    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

#[test]
fn test_transform_round_trip() {
    let sizes = [vec2(800.0, 600.0), vec2(1280.0, 720.0), vec2(333.0, 117.0)];
    let cameras = [
        Camera::new(),
        Camera {
            offset: vec2(-1.0, 1.0),
            scale: 0.1,
        },
        Camera {
            offset: vec2(0.25, -0.75),
            scale: 7.5,
        },
    ];
    let points = [
        point2(0.0, 0.0),
        point2(15.0, -40.0),
        point2(-123.5, 456.25),
    ];
    for size in &sizes {
        for camera in &cameras {
            for world in &points {
                let canvas = camera.world_to_canvas(*size, *world);
                let back = camera.canvas_to_world(*size, canvas);
                assert!((back.x - world.x).abs() < 1e-3);
                assert!((back.y - world.y).abs() < 1e-3);
            }
        }
    }
}

#[test]
fn test_world_origin_lands_on_origin_px() {
    let camera = Camera::new();
    let size = vec2(640.0, 480.0);
    let canvas = camera.world_to_canvas(size, point2(0.0, 0.0));
    assert_eq!(canvas, camera.origin_px(size));
}

#[test]
fn test_y_axis_flips() {
    let camera = Camera {
        offset: vec2(0.0, 0.0),
        scale: 2.0,
    };
    let size = vec2(100.0, 100.0);
    let up = camera.world_to_canvas(size, point2(0.0, 10.0));
    let down = camera.world_to_canvas(size, point2(0.0, -10.0));
    assert!(up.y < down.y);
}

#[test]
fn test_scale_clamp() {
    let mut camera = Camera::new();
    camera.set_scale(100.0);
    assert_eq!(camera.scale, MAX_ZOOM);
    camera.set_scale(0.0);
    assert_eq!(camera.scale, MIN_ZOOM);
}
