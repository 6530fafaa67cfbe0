use euclid::*;

use crate::camera::Camera;
use crate::doc::{Animation, BUBBLE_STRIDE};

/// Finds every hurtbubble of `keyframe` containing the canvas-space point
/// `screen`, returned as flat buffer offsets (multiples of 4) sorted by
/// squared distance from the bubble center, closest first. Ties keep buffer
/// order (the sort is stable).
///
/// This runs on every mouse move; it builds only the two result vectors and
/// no per-bubble objects.
pub fn find_bubbles(
    animation: &Animation,
    keyframe: usize,
    camera: &Camera,
    size: Vector2D<f32>,
    screen: Point2D<f32>,
) -> Vec<usize> {
    let buffer = match animation
        .get_keyframe(keyframe)
        .and_then(|kf| kf.hurtbubbles.as_ref())
    {
        Some(buffer) => buffer,
        None => return Vec::new(),
    };

    let world = camera.canvas_to_world(size, screen);
    let count = buffer.len() / BUBBLE_STRIDE;
    let mut sq_dists = Vec::with_capacity(count);
    let mut hits = Vec::with_capacity(count);

    let mut offset = 0;
    while offset + BUBBLE_STRIDE <= buffer.len() {
        let dx = buffer[offset] - world.x;
        let dy = buffer[offset + 1] - world.y;
        let radius = buffer[offset + 2];
        let sq_dist = dx * dx + dy * dy;
        sq_dists.push(sq_dist);
        if sq_dist < radius * radius {
            hits.push(offset);
        }
        offset += BUBBLE_STRIDE;
    }

    hits.sort_by(|a, b| sq_dists[a / BUBBLE_STRIDE].total_cmp(&sq_dists[b / BUBBLE_STRIDE]));
    hits
}

#[cfg(test)]
use crate::doc::{Hitbubbles, Keyframe};

#[cfg(test)]
fn single_keyframe_animation(buffer: Option<Vec<f32>>) -> Animation {
    Animation {
        keyframes: vec![Keyframe {
            duration: 1,
            hurtbubbles: buffer,
            hitbubbles: Hitbubbles::Absent,
            extra: Default::default(),
        }],
        iasa: None,
        extra: Default::default(),
    }
}

#[test]
fn test_find_bubbles_sorted_nearest_first() {
    let animation = single_keyframe_animation(Some(vec![
        0.0, 20.0, 10.0, 0.0, // slot 0, contains origin (dist 20 < r? no: 400 >= 100)
        0.0, 0.0, 8.0, 0.0, // slot 1, centered on origin
        0.0, -20.0, 10.0, 0.0, // slot 2
        0.0, 3.0, 30.0, 0.0, // slot 3, large, also contains origin
    ]));
    let camera = Camera::new();
    let size = vec2(400.0, 300.0);
    let screen = camera.world_to_canvas(size, point2(0.0, 0.0));

    let found = find_bubbles(&animation, 0, &camera, size, screen);
    assert_eq!(found, vec![4, 12]);
}

#[test]
fn test_find_bubbles_strict_radius() {
    // Squared distance equal to squared radius is a miss.
    let animation = single_keyframe_animation(Some(vec![10.0, 0.0, 10.0, 0.0]));
    let camera = Camera::new();
    let size = vec2(400.0, 300.0);
    let screen = camera.world_to_canvas(size, point2(0.0, 0.0));
    assert_eq!(find_bubbles(&animation, 0, &camera, size, screen), Vec::<usize>::new());
}

#[test]
fn test_find_bubbles_missing_data() {
    let camera = Camera::new();
    let size = vec2(400.0, 300.0);
    let screen = point2(10.0, 10.0);

    let no_buffer = single_keyframe_animation(None);
    assert!(find_bubbles(&no_buffer, 0, &camera, size, screen).is_empty());
    assert!(find_bubbles(&no_buffer, 7, &camera, size, screen).is_empty());

    let far_away = single_keyframe_animation(Some(vec![1000.0, 1000.0, 5.0, 0.0]));
    assert!(find_bubbles(&far_away, 0, &camera, size, screen).is_empty());
}

#[test]
fn test_find_bubbles_tie_keeps_buffer_order() {
    // Two concentric bubbles, both containing the query point at the same
    // squared distance.
    let animation = single_keyframe_animation(Some(vec![
        5.0, 0.0, 20.0, 0.0, //
        5.0, 0.0, 10.0, 0.0,
    ]));
    let camera = Camera::new();
    let size = vec2(400.0, 300.0);
    let screen = camera.world_to_canvas(size, point2(0.0, 0.0));
    assert_eq!(find_bubbles(&animation, 0, &camera, size, screen), vec![0, 4]);
}
