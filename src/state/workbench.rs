use std::time::Instant;

use euclid::*;

use crate::camera::Camera;
use crate::doc::{Animation, BUBBLE_STRIDE};
use crate::query::find_bubbles;
use crate::state::{Direction, Nudge};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
}

/// Current pointer action. `MoveBubble` keeps the grab offset between the
/// bubble center and the cursor at mouse-down so the bubble tracks the
/// cursor without snapping to its center.
#[derive(Clone, Debug, PartialEq)]
pub enum Drag {
    Idle,
    MoveBubble { active: usize, grab: Vector2D<f32> },
    PanCamera { start: Vector2D<f32>, grab: Point2D<f32> },
}

impl Default for Drag {
    fn default() -> Drag {
        Drag::Idle
    }
}

/// Canvas interaction state: camera, pointer drag, hover and selection,
/// keyboard nudge. Every transition method returns whether the caller needs
/// to repaint, and all of them are plain synchronous functions over the
/// animation document, so the machine is testable without a live canvas.
#[derive(Clone, Debug, Default)]
pub struct Workbench {
    pub camera: Camera,
    drag: Drag,
    hovered: Option<usize>,
    selected: Option<usize>,
    nudge: Nudge,
}

impl Workbench {
    pub fn new() -> Workbench {
        Default::default()
    }

    pub fn drag(&self) -> &Drag {
        &self.drag
    }

    /// Hovered bubble slot, if any.
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Selected bubble slot, if any. Survives mouse-up; cleared by clicking
    /// empty space.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Forgets hover state, e.g. when switching keyframes or animations.
    pub fn reset_hover(&mut self) {
        self.hovered = None;
    }

    fn hover_at(
        &mut self,
        animation: &Animation,
        keyframe: usize,
        size: Vector2D<f32>,
        pos: Point2D<f32>,
    ) -> bool {
        let found = find_bubbles(animation, keyframe, &self.camera, size, pos);
        let hover = found.first().map(|offset| offset / BUBBLE_STRIDE);
        if self.hovered == hover {
            return false;
        }
        self.hovered = hover;
        true
    }

    pub fn mouse_down(
        &mut self,
        animation: &mut Animation,
        keyframe: usize,
        size: Vector2D<f32>,
        pos: Point2D<f32>,
        button: MouseButton,
    ) -> bool {
        match button {
            MouseButton::Secondary => {
                self.drag = Drag::PanCamera {
                    start: self.camera.offset,
                    grab: pos,
                };
                false
            }
            MouseButton::Primary => {
                self.hover_at(animation, keyframe, size, pos);
                self.selected = self.hovered;

                let slot = match self.hovered {
                    Some(slot) => slot,
                    None => {
                        self.drag = Drag::Idle;
                        return true;
                    }
                };

                // The buffer can have shrunk under us since the hover query
                // (external reload); abort instead of indexing out of bounds.
                let offset = slot * BUBBLE_STRIDE;
                let buffer = animation
                    .get_keyframe(keyframe)
                    .and_then(|kf| kf.hurtbubbles.as_ref());
                let (bx, by) = match buffer {
                    Some(buffer) if offset + 1 < buffer.len() => {
                        (buffer[offset], buffer[offset + 1])
                    }
                    _ => {
                        self.hovered = None;
                        self.selected = None;
                        self.drag = Drag::Idle;
                        return true;
                    }
                };

                let world = self.camera.canvas_to_world(size, pos);
                self.drag = Drag::MoveBubble {
                    active: slot,
                    grab: vec2(bx - world.x, by - world.y),
                };
                true
            }
        }
    }

    pub fn mouse_move(
        &mut self,
        animation: &mut Animation,
        keyframe: usize,
        size: Vector2D<f32>,
        pos: Point2D<f32>,
    ) -> bool {
        match self.drag.clone() {
            Drag::MoveBubble { active, grab } => {
                let world = self.camera.canvas_to_world(size, pos);
                // Integer coordinates only: truncate toward zero.
                let x = (grab.x + world.x) as i32 as f32;
                let y = (grab.y + world.y) as i32 as f32;
                match animation.get_keyframe_mut(keyframe) {
                    Some(kf) => kf.set_bubble_position(active, x, y),
                    None => false,
                }
            }
            Drag::PanCamera { start, grab } => {
                let delta = vec2((pos.x - grab.x) / size.x, (pos.y - grab.y) / size.y);
                self.camera.offset = start + delta * self.camera.scale;
                true
            }
            Drag::Idle => self.hover_at(animation, keyframe, size, pos),
        }
    }

    pub fn mouse_up(
        &mut self,
        animation: &mut Animation,
        keyframe: usize,
        size: Vector2D<f32>,
        pos: Point2D<f32>,
    ) -> bool {
        if self.drag == Drag::Idle {
            return false;
        }
        let repaint = self.mouse_move(animation, keyframe, size, pos);
        self.drag = Drag::Idle;
        repaint
    }

    /// Immediate 1-unit nudge of the selected bubble on a fresh key-down;
    /// also arms the delayed repeat ticker.
    pub fn key_down(
        &mut self,
        animation: &mut Animation,
        keyframe: usize,
        direction: Direction,
        now: Instant,
    ) -> bool {
        if self.selected.is_none() {
            return false;
        }
        match self.nudge.press(direction, now) {
            Some(step) => self.nudge_selected(animation, keyframe, step),
            None => false,
        }
    }

    pub fn key_up(&mut self, direction: Direction) {
        self.nudge.release(direction);
    }

    /// Applies any repeat steps that have become due. Call this from the
    /// frame scheduler while keys are held.
    pub fn tick(&mut self, animation: &mut Animation, keyframe: usize, now: Instant) -> bool {
        if self.selected.is_none() {
            return false;
        }
        let step = self.nudge.poll(now);
        self.nudge_selected(animation, keyframe, step)
    }

    fn nudge_selected(
        &mut self,
        animation: &mut Animation,
        keyframe: usize,
        (dx, dy): (i32, i32),
    ) -> bool {
        if dx == 0 && dy == 0 {
            return false;
        }
        let slot = match self.selected {
            Some(slot) => slot,
            None => return false,
        };
        let offset = slot * BUBBLE_STRIDE;
        let kf = match animation.get_keyframe_mut(keyframe) {
            Some(kf) => kf,
            None => return false,
        };
        let (x, y) = match kf.hurtbubbles.as_ref() {
            Some(buffer) if offset + 1 < buffer.len() => {
                (buffer[offset] + dx as f32, buffer[offset + 1] + dy as f32)
            }
            _ => return false,
        };
        kf.set_bubble_position(slot, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::{Hitbubbles, Keyframe};
    use crate::state::{NUDGE_DELAY, NUDGE_TICK};

    fn canvas_size() -> Vector2D<f32> {
        vec2(400.0, 300.0)
    }

    fn animation() -> Animation {
        Animation {
            keyframes: vec![Keyframe {
                duration: 1,
                hurtbubbles: Some(vec![
                    10.0, 20.0, 8.0, 0.0, //
                    -30.0, 0.0, 5.0, 0.0,
                ]),
                hitbubbles: Hitbubbles::Absent,
                extra: Default::default(),
            }],
            iasa: None,
            extra: Default::default(),
        }
    }

    fn screen_at(workbench: &Workbench, world: Point2D<f32>) -> Point2D<f32> {
        workbench.camera.world_to_canvas(canvas_size(), world)
    }

    #[test]
    fn test_click_selects_and_grabs() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        // Click slightly off the center of bubble 0.
        let pos = screen_at(&workbench, point2(12.0, 21.0));
        let repaint = workbench.mouse_down(&mut anim, 0, canvas_size(), pos, MouseButton::Primary);
        assert!(repaint);
        assert_eq!(workbench.selected(), Some(0));
        match workbench.drag() {
            Drag::MoveBubble { active, grab } => {
                assert_eq!(*active, 0);
                assert!((grab.x - -2.0).abs() < 1e-3);
                assert!((grab.y - -1.0).abs() < 1e-3);
            }
            other => panic!("expected bubble drag, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_delta_drag_does_not_move_bubble() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let pos = screen_at(&workbench, point2(12.0, 21.0));
        workbench.mouse_down(&mut anim, 0, canvas_size(), pos, MouseButton::Primary);
        workbench.mouse_move(&mut anim, 0, canvas_size(), pos);
        workbench.mouse_up(&mut anim, 0, canvas_size(), pos);
        let buffer = anim.keyframes[0].hurtbubbles.as_ref().unwrap();
        assert_eq!(buffer[0], 10.0);
        assert_eq!(buffer[1], 20.0);
    }

    #[test]
    fn test_drag_moves_bubble_in_integer_world_units() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let down = screen_at(&workbench, point2(10.0, 20.0));
        workbench.mouse_down(&mut anim, 0, canvas_size(), down, MouseButton::Primary);
        let target = screen_at(&workbench, point2(15.5, 17.25));
        workbench.mouse_move(&mut anim, 0, canvas_size(), target);
        let buffer = anim.keyframes[0].hurtbubbles.as_ref().unwrap();
        assert_eq!(buffer[0], 15.0);
        assert_eq!(buffer[1], 17.0);
        // Radius and state fields are untouched.
        assert_eq!(buffer[2], 8.0);
        assert_eq!(buffer[3], 0.0);
    }

    #[test]
    fn test_click_empty_space_clears_selection() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let hit = screen_at(&workbench, point2(10.0, 20.0));
        workbench.mouse_down(&mut anim, 0, canvas_size(), hit, MouseButton::Primary);
        workbench.mouse_up(&mut anim, 0, canvas_size(), hit);
        assert_eq!(workbench.selected(), Some(0));

        let miss = screen_at(&workbench, point2(100.0, 100.0));
        workbench.mouse_down(&mut anim, 0, canvas_size(), miss, MouseButton::Primary);
        assert_eq!(workbench.selected(), None);
        assert_eq!(*workbench.drag(), Drag::Idle);
    }

    #[test]
    fn test_secondary_button_pans_camera() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let start_offset = workbench.camera.offset;
        let down = point2(100.0, 100.0);
        workbench.mouse_down(&mut anim, 0, canvas_size(), down, MouseButton::Secondary);
        workbench.mouse_move(&mut anim, 0, canvas_size(), point2(140.0, 130.0));
        let moved = workbench.camera.offset - start_offset;
        assert!((moved.x - 40.0 / canvas_size().x * 2.0).abs() < 1e-4);
        assert!((moved.y - 30.0 / canvas_size().y * 2.0).abs() < 1e-4);
        workbench.mouse_up(&mut anim, 0, canvas_size(), point2(140.0, 130.0));
        assert_eq!(*workbench.drag(), Drag::Idle);
    }

    #[test]
    fn test_hover_reports_change_only() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let over = screen_at(&workbench, point2(10.0, 20.0));
        assert!(workbench.mouse_move(&mut anim, 0, canvas_size(), over));
        assert_eq!(workbench.hovered(), Some(0));
        // Still over the same bubble: no repaint.
        assert!(!workbench.mouse_move(&mut anim, 0, canvas_size(), over));
        let away = screen_at(&workbench, point2(200.0, 200.0));
        assert!(workbench.mouse_move(&mut anim, 0, canvas_size(), away));
        assert_eq!(workbench.hovered(), None);
    }

    #[test]
    fn test_inconsistent_buffer_aborts_drag() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let pos = screen_at(&workbench, point2(10.0, 20.0));
        // Hover first, then shrink the buffer behind the workbench's back.
        workbench.mouse_move(&mut anim, 0, canvas_size(), pos);
        anim.keyframes[0].hurtbubbles = Some(vec![]);
        let repaint = workbench.mouse_down(&mut anim, 0, canvas_size(), pos, MouseButton::Primary);
        assert!(repaint);
        assert_eq!(workbench.selected(), None);
        assert_eq!(*workbench.drag(), Drag::Idle);
    }

    #[test]
    fn test_keyboard_nudge_immediate_and_repeat() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        let pos = screen_at(&workbench, point2(10.0, 20.0));
        workbench.mouse_down(&mut anim, 0, canvas_size(), pos, MouseButton::Primary);
        workbench.mouse_up(&mut anim, 0, canvas_size(), pos);

        let now = Instant::now();
        assert!(workbench.key_down(&mut anim, 0, Direction::Right, now));
        assert_eq!(anim.keyframes[0].hurtbubbles.as_ref().unwrap()[0], 11.0);

        // Held: three tick periods after the start delay.
        assert!(workbench.tick(&mut anim, 0, now + NUDGE_DELAY + NUDGE_TICK * 3));
        assert_eq!(anim.keyframes[0].hurtbubbles.as_ref().unwrap()[0], 14.0);

        workbench.key_up(Direction::Right);
        assert!(!workbench.tick(&mut anim, 0, now + NUDGE_DELAY + NUDGE_TICK * 9));
        assert_eq!(anim.keyframes[0].hurtbubbles.as_ref().unwrap()[0], 14.0);
    }

    #[test]
    fn test_nudge_without_selection_is_a_no_op() {
        let mut workbench = Workbench::new();
        let mut anim = animation();
        assert!(!workbench.key_down(&mut anim, 0, Direction::Up, Instant::now()));
        assert_eq!(anim.keyframes[0].hurtbubbles.as_ref().unwrap()[1], 20.0);
    }
}
