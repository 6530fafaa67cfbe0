use std::f32::consts::PI;

use euclid::*;

use crate::camera::Camera;
use crate::doc::{Animation, BoneMap, EntityData, Hitbubble, HurtbubbleData, BUBBLE_STRIDE};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Color {
        Color { r, g, b, a }
    }
}

pub const GRID: Color = Color::rgb(0x66, 0x66, 0x66);
pub const OUTLINE: Color = Color::rgb(0, 0, 0);
pub const HITBUBBLE_FILL: Color = Color::rgba(255, 0, 0, 0.6);
pub const HURTBUBBLE_FILL: Color = Color::rgba(255, 255, 255, 0.5);
pub const HIGHLIGHT_STROKE: Color = Color::rgb(0, 128, 0);
pub const HIGHLIGHT_FILL: Color = Color::rgba(0, 255, 0, 0.25);
pub const ACTIVE_STROKE: Color = Color::rgb(255, 255, 0);
pub const ACTIVE_FILL: Color = Color::rgba(255, 255, 0, 0.33);
pub const CONNECTOR_STROKE: Color = Color::rgba(100, 0, 0, 1.0);
pub const GUIDE_ON_AXIS: Color = Color::rgba(64, 255, 64, 0.6);
pub const GUIDE_OFF_AXIS: Color = Color::rgba(64, 255, 64, 0.2);

/// Minimal 2D drawing capability the painter runs against, so the whole
/// render path works headlessly. Mirrors immediate-mode canvas semantics:
/// a current path, and stroke/fill color state applied by `stroke`/`fill`.
pub trait Surface {
    fn clear(&mut self);
    fn begin_path(&mut self);
    fn move_to(&mut self, p: Point2D<f32>);
    fn line_to(&mut self, p: Point2D<f32>);
    fn close_path(&mut self);
    fn set_stroke_color(&mut self, color: Color);
    fn set_fill_color(&mut self, color: Color);
    fn stroke(&mut self);
    fn fill(&mut self);
}

/// Appends a regular polygon approximating a circle to the current path.
pub fn path_circle<S: Surface>(surface: &mut S, center: Point2D<f32>, radius: f32, segments: u32) {
    let mut angle = -PI;
    let step = 2.0 * PI / segments as f32;
    surface.begin_path();
    surface.move_to(point2(
        center.x + angle.cos() * radius,
        center.y + angle.sin() * radius,
    ));
    for _ in 0..segments {
        angle += step;
        surface.line_to(point2(
            center.x + angle.cos() * radius,
            center.y + angle.sin() * radius,
        ));
    }
    surface.close_path();
}

/// Appends a capsule (stadium) between two points to the current path: two
/// polygonal half-circle caps of `segments` arcs each, joined by the side
/// edges.
pub fn path_capsule<S: Surface>(
    surface: &mut S,
    a: Point2D<f32>,
    b: Point2D<f32>,
    radius: f32,
    segments: u32,
) {
    let rads = 2.0 * PI - (b.x - a.x).atan2(b.y - a.y);
    let step = PI / segments as f32;

    let mut perp = rads - PI;
    surface.begin_path();
    surface.move_to(point2(a.x + perp.cos() * radius, a.y + perp.sin() * radius));
    for _ in 0..segments {
        perp += step;
        surface.line_to(point2(a.x + perp.cos() * radius, a.y + perp.sin() * radius));
    }
    let mut perp = rads + 2.0 * PI;
    for _ in 0..=segments {
        surface.line_to(point2(b.x + perp.cos() * radius, b.y + perp.sin() * radius));
        perp += step;
    }
    surface.close_path();
}

/// Resolved anchor position of a hitbubble: its own x/y offsets plus, when
/// following a bone, that endpoint's current buffer coordinates.
fn hitbubble_position(
    hitbubble: &Hitbubble,
    bone_map: &BoneMap,
    bones: &[HurtbubbleData],
    buffer: Option<&[f32]>,
) -> Point2D<f32> {
    let mut x = hitbubble.x.unwrap_or(0.0);
    let mut y = hitbubble.y.unwrap_or(0.0);
    if let Some(follow) = &hitbubble.follow {
        if let (Some(offset), Some(buffer)) = (bone_map.follow_offset(follow, bones), buffer) {
            if offset + 1 < buffer.len() {
                x += buffer[offset];
                y += buffer[offset + 1];
            }
        }
    }
    point2(x, y)
}

/// Anchor point (without the hitbubble's own offset) a following hitbubble
/// is attached to, if its reference resolves.
fn follow_anchor(
    hitbubble: &Hitbubble,
    bone_map: &BoneMap,
    bones: &[HurtbubbleData],
    buffer: Option<&[f32]>,
) -> Option<Point2D<f32>> {
    let follow = hitbubble.follow.as_ref()?;
    let offset = bone_map.follow_offset(follow, bones)?;
    let buffer = buffer?;
    if offset + 1 < buffer.len() {
        Some(point2(buffer[offset], buffer[offset + 1]))
    } else {
        None
    }
}

/// Paints one keyframe of an animation: origin grid, resolved hitbubbles,
/// hurtbubble capsules, highlight/active overlays, follow connectors, and
/// alignment guides. Pure with respect to the model; every call sequence is
/// deterministic for a given input, which is what makes thumbnail rendering
/// and the editor canvas share this code path.
///
/// This runs on every repaint and every thumbnail; allocation is limited to
/// the bone map.
pub fn paint_bubbles<S: Surface>(
    character: &EntityData,
    animation: &Animation,
    keyframe: usize,
    surface: &mut S,
    camera: &Camera,
    size: Vector2D<f32>,
    highlight: Option<usize>,
    active: Option<usize>,
) {
    let origin = camera.origin_px(size);

    // Origin crosshair, snapped to half-pixel offsets for crisp 1px lines.
    let snapped_x = origin.x as i32 as f32 + 0.5;
    let snapped_y = origin.y as i32 as f32 + 0.5;
    surface.begin_path();
    surface.move_to(point2(0.0, snapped_y));
    surface.line_to(point2(size.x, snapped_y));
    surface.move_to(point2(snapped_x, 0.0));
    surface.line_to(point2(snapped_x, size.y));
    surface.set_stroke_color(GRID);
    surface.stroke();

    let kf = match animation.get_keyframe(keyframe) {
        Some(kf) => kf,
        None => return,
    };
    let buffer = kf.hurtbubbles.as_deref();
    let bones = &character.hurtbubbles;
    let hitbubbles = animation.resolve_hitbubbles(keyframe as isize);

    // Hitbubbles, with follow offsets applied.
    if let Some(hitbubbles) = hitbubbles {
        let bone_map = BoneMap::new(bones);
        surface.set_stroke_color(OUTLINE);
        surface.set_fill_color(HITBUBBLE_FILL);
        for hitbubble in hitbubbles {
            let world = hitbubble_position(hitbubble, &bone_map, bones, buffer);
            let center = camera.world_to_canvas(size, world);
            path_circle(surface, center, hitbubble.radius * camera.scale, 8);
            surface.stroke();
            surface.fill();
        }
    }

    // Hurtbubble capsules. The capsule body takes the i1 endpoint's radius;
    // i2's radius is ignored (not a tapered capsule).
    if let Some(buffer) = buffer {
        surface.set_stroke_color(OUTLINE);
        surface.set_fill_color(HURTBUBBLE_FILL);
        for bone in bones {
            let e1 = bone.i1 * BUBBLE_STRIDE;
            let e2 = bone.i2 * BUBBLE_STRIDE;
            if e1 + 2 >= buffer.len() || e2 + 1 >= buffer.len() {
                continue;
            }
            let a = camera.world_to_canvas(size, point2(buffer[e1], buffer[e1 + 1]));
            let b = camera.world_to_canvas(size, point2(buffer[e2], buffer[e2 + 1]));
            path_capsule(surface, a, b, buffer[e1 + 2] * camera.scale, 4);
            surface.stroke();
            surface.fill();
        }

        if let Some(slot) = highlight {
            paint_overlay(surface, camera, size, buffer, slot, HIGHLIGHT_STROKE, HIGHLIGHT_FILL);
        }
        if let Some(slot) = active {
            paint_overlay(surface, camera, size, buffer, slot, ACTIVE_STROKE, ACTIVE_FILL);
        }
    }

    // Connector line and marker from each following hitbubble to its anchor.
    if let Some(hitbubbles) = hitbubbles {
        let bone_map = BoneMap::new(bones);
        surface.set_stroke_color(CONNECTOR_STROKE);
        for hitbubble in hitbubbles {
            if let Some(anchor) = follow_anchor(hitbubble, &bone_map, bones, buffer) {
                let world = hitbubble_position(hitbubble, &bone_map, bones, buffer);
                let from = camera.world_to_canvas(size, world);
                let to = camera.world_to_canvas(size, anchor);
                surface.begin_path();
                surface.move_to(from);
                surface.line_to(to);
                surface.stroke();
                path_circle(surface, from, 3.0, 6);
                surface.stroke();
            }
        }
    }

    // Full-span alignment guides through the highlighted bubble, brighter
    // when its coordinate sits exactly on the origin axis.
    if let (Some(slot), Some(buffer)) = (highlight, buffer) {
        let offset = slot * BUBBLE_STRIDE;
        if offset + 1 < buffer.len() {
            let canvas = camera.world_to_canvas(size, point2(buffer[offset], buffer[offset + 1]));

            surface.set_stroke_color(if buffer[offset + 1] == 0.0 {
                GUIDE_ON_AXIS
            } else {
                GUIDE_OFF_AXIS
            });
            surface.begin_path();
            surface.move_to(point2(0.0, canvas.y));
            surface.line_to(point2(size.x, canvas.y));
            surface.stroke();

            surface.set_stroke_color(if buffer[offset] == 0.0 {
                GUIDE_ON_AXIS
            } else {
                GUIDE_OFF_AXIS
            });
            surface.begin_path();
            surface.move_to(point2(canvas.x, 0.0));
            surface.line_to(point2(canvas.x, size.y));
            surface.stroke();
        }
    }
}

fn paint_overlay<S: Surface>(
    surface: &mut S,
    camera: &Camera,
    size: Vector2D<f32>,
    buffer: &[f32],
    slot: usize,
    stroke: Color,
    fill: Color,
) {
    let offset = slot * BUBBLE_STRIDE;
    if offset + 2 >= buffer.len() {
        return;
    }
    let center = camera.world_to_canvas(size, point2(buffer[offset], buffer[offset + 1]));
    surface.set_stroke_color(stroke);
    surface.set_fill_color(fill);
    path_circle(surface, center, buffer[offset + 2] * camera.scale, 8);
    surface.fill();
    surface.stroke();
}

/// Records draw calls instead of rasterizing, for headless tests and
/// thumbnail pipelines.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clear,
    BeginPath,
    MoveTo(Point2D<f32>),
    LineTo(Point2D<f32>),
    ClosePath,
    StrokeColor(Color),
    FillColor(Color),
    Stroke,
    Fill,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new() -> RecordingSurface {
        Default::default()
    }

    pub fn count(&self, matches: impl Fn(&DrawCall) -> bool) -> usize {
        self.calls.iter().filter(|c| matches(c)).count()
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }
    fn begin_path(&mut self) {
        self.calls.push(DrawCall::BeginPath);
    }
    fn move_to(&mut self, p: Point2D<f32>) {
        self.calls.push(DrawCall::MoveTo(p));
    }
    fn line_to(&mut self, p: Point2D<f32>) {
        self.calls.push(DrawCall::LineTo(p));
    }
    fn close_path(&mut self) {
        self.calls.push(DrawCall::ClosePath);
    }
    fn set_stroke_color(&mut self, color: Color) {
        self.calls.push(DrawCall::StrokeColor(color));
    }
    fn set_fill_color(&mut self, color: Color) {
        self.calls.push(DrawCall::FillColor(color));
    }
    fn stroke(&mut self) {
        self.calls.push(DrawCall::Stroke);
    }
    fn fill(&mut self) {
        self.calls.push(DrawCall::Fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{Hitbubble, Hitbubbles, HurtbubbleData, Keyframe};

    fn test_character() -> EntityData {
        EntityData {
            name: "crab".to_owned(),
            hurtbubbles: vec![HurtbubbleData {
                name: "head".to_owned(),
                i1: 0,
                i2: 1,
                z: 0.0,
                ik: false,
            }],
            extra: Default::default(),
        }
    }

    fn test_animation() -> Animation {
        Animation {
            keyframes: vec![Keyframe {
                duration: 4,
                hurtbubbles: Some(vec![
                    0.0, 10.0, 6.0, 0.0, //
                    0.0, -10.0, 4.0, 0.0,
                ]),
                hitbubbles: Hitbubbles::Inline(vec![Hitbubble {
                    x: Some(2.0),
                    y: Some(3.0),
                    radius: 5.0,
                    follow: Some("head".to_owned()),
                    kind: None,
                    extra: Default::default(),
                }]),
                extra: Default::default(),
            }],
            iasa: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_path_circle_segment_count() {
        let mut surface = RecordingSurface::new();
        path_circle(&mut surface, point2(0.0, 0.0), 10.0, 8);
        assert_eq!(surface.count(|c| matches!(c, DrawCall::LineTo(_))), 8);
        assert_eq!(surface.count(|c| matches!(c, DrawCall::MoveTo(_))), 1);
        assert_eq!(surface.calls.last(), Some(&DrawCall::ClosePath));
    }

    #[test]
    fn test_path_circle_vertices_on_radius() {
        let mut surface = RecordingSurface::new();
        path_circle(&mut surface, point2(5.0, -3.0), 10.0, 8);
        for call in &surface.calls {
            if let DrawCall::MoveTo(p) | DrawCall::LineTo(p) = call {
                let d = ((p.x - 5.0).powi(2) + (p.y + 3.0).powi(2)).sqrt();
                assert!((d - 10.0).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_path_capsule_vertices_near_endpoints() {
        let a = point2(0.0, 0.0);
        let b = point2(20.0, 0.0);
        let mut surface = RecordingSurface::new();
        path_capsule(&mut surface, a, b, 5.0, 4);
        // 4 cap segments around each endpoint plus the closing edge.
        assert_eq!(surface.count(|c| matches!(c, DrawCall::LineTo(_))), 9);
        for call in &surface.calls {
            if let DrawCall::MoveTo(p) | DrawCall::LineTo(p) = call {
                let da = ((p.x - a.x).powi(2) + (p.y - a.y).powi(2)).sqrt();
                let db = ((p.x - b.x).powi(2) + (p.y - b.y).powi(2)).sqrt();
                assert!((da - 5.0).abs() < 1e-3 || (db - 5.0).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_paint_layers_in_order() {
        let mut surface = RecordingSurface::new();
        paint_bubbles(
            &test_character(),
            &test_animation(),
            0,
            &mut surface,
            &Camera::new(),
            vec2(400.0, 300.0),
            Some(0),
            None,
        );

        let color_order: Vec<Color> = surface
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::StrokeColor(color) => Some(*color),
                _ => None,
            })
            .collect();
        // Grid, hitbubble outline, hurtbubble outline, highlight,
        // connector, then the horizontal and vertical guide lines.
        assert_eq!(color_order[0], GRID);
        assert_eq!(color_order[1], OUTLINE);
        assert_eq!(color_order[2], OUTLINE);
        assert_eq!(color_order[3], HIGHLIGHT_STROKE);
        assert_eq!(color_order[4], CONNECTOR_STROKE);
        // Slot 0 sits at (0, 10): off the x axis, exactly on the y axis.
        assert_eq!(color_order[5], GUIDE_OFF_AXIS);
        assert_eq!(color_order[6], GUIDE_ON_AXIS);
    }

    #[test]
    fn test_paint_missing_keyframe_draws_grid_only() {
        let mut surface = RecordingSurface::new();
        paint_bubbles(
            &test_character(),
            &test_animation(),
            9,
            &mut surface,
            &Camera::new(),
            vec2(400.0, 300.0),
            None,
            None,
        );
        assert_eq!(surface.count(|c| matches!(c, DrawCall::Stroke)), 1);
        assert_eq!(surface.count(|c| matches!(c, DrawCall::Fill)), 0);
    }

    #[test]
    fn test_follow_offset_applied_to_hitbubble() {
        let character = test_character();
        let animation = test_animation();
        let bone_map = BoneMap::new(&character.hurtbubbles);
        let kf = animation.get_keyframe(0).unwrap();
        let pos = hitbubble_position(
            &match &kf.hitbubbles {
                Hitbubbles::Inline(v) => v[0].clone(),
                _ => unreachable!(),
            },
            &bone_map,
            &character.hurtbubbles,
            kf.hurtbubbles.as_deref(),
        );
        // Offset (2, 3) from the head i1 endpoint at (0, 10).
        assert_eq!(pos, point2(2.0, 13.0));
    }
}
