//! Batch operations over a whole animation document, exposed to power
//! users for scripted edits. Iterators run over the live document, not a
//! snapshot, so mutations made while iterating are visible.

use crate::doc::{Animation, Document, Keyframe, BUBBLE_STRIDE};

pub fn iterate_keyframes(document: &Document) -> impl Iterator<Item = &Keyframe> {
    document
        .animations
        .values()
        .flat_map(|animation| animation.keyframes.iter())
}

pub fn iterate_keyframes_mut(document: &mut Document) -> impl Iterator<Item = &mut Keyframe> {
    document
        .animations
        .values_mut()
        .flat_map(|animation| animation.keyframes.iter_mut())
}

/// Keyframes of the animation being edited only.
pub fn iterate_current_keyframes(animation: &Animation) -> impl Iterator<Item = &Keyframe> {
    animation.keyframes.iter()
}

pub fn iterate_animations(document: &Document) -> impl Iterator<Item = (&String, &Animation)> {
    document.animations.iter()
}

/// Inserts a new bubble slot at `slot` into every keyframe that has a
/// hurtbubble buffer. Before splicing, `customize` receives the keyframe and
/// the 4-slot default buffer (all zeroes) so callers can seed per-keyframe
/// values. Insertion position is clamped to each buffer's length.
pub fn insert_bubble<F>(document: &mut Document, slot: usize, mut customize: F)
where
    F: FnMut(&mut Keyframe, &mut [f32; BUBBLE_STRIDE]),
{
    let offset = slot * BUBBLE_STRIDE;
    for keyframe in iterate_keyframes_mut(document) {
        if keyframe.hurtbubbles.is_none() {
            continue;
        }
        let mut slice = [0.0; BUBBLE_STRIDE];
        customize(keyframe, &mut slice);
        if let Some(buffer) = keyframe.hurtbubbles.as_mut() {
            let at = offset.min(buffer.len());
            buffer.splice(at..at, slice.iter().cloned());
        }
    }
}

/// Removes the 4-element slot at `slot` from every keyframe buffer wide
/// enough to contain it.
pub fn delete_bubble(document: &mut Document, slot: usize) {
    let offset = slot * BUBBLE_STRIDE;
    for keyframe in iterate_keyframes_mut(document) {
        if let Some(buffer) = keyframe.hurtbubbles.as_mut() {
            if offset + BUBBLE_STRIDE <= buffer.len() {
                buffer.drain(offset..offset + BUBBLE_STRIDE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::Hitbubbles;

    fn document() -> Document {
        let mut document = Document::new();
        let mut jab = Animation::default();
        jab.keyframes.push(Keyframe {
            duration: 2,
            hurtbubbles: Some(vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]),
            hitbubbles: Hitbubbles::Absent,
            extra: Default::default(),
        });
        jab.keyframes.push(Keyframe {
            duration: 2,
            hurtbubbles: None,
            hitbubbles: Hitbubbles::Absent,
            extra: Default::default(),
        });
        let mut dash = Animation::default();
        dash.keyframes.push(Keyframe {
            duration: 1,
            hurtbubbles: Some(vec![7.0, 8.0, 9.0, 0.0]),
            hitbubbles: Hitbubbles::Absent,
            extra: Default::default(),
        });
        document.animations.insert("jab".to_owned(), jab);
        document.animations.insert("dash".to_owned(), dash);
        document
    }

    #[test]
    fn test_iterate_spans_all_animations() {
        let document = document();
        assert_eq!(iterate_keyframes(&document).count(), 3);
        assert_eq!(iterate_animations(&document).count(), 2);
        let jab = document.get_animation("jab").unwrap();
        assert_eq!(iterate_current_keyframes(jab).count(), 2);
    }

    #[test]
    fn test_insert_bubble_customizes_before_splice() {
        let mut document = document();
        insert_bubble(&mut document, 1, |keyframe, slice| {
            // Seed the new slot from the keyframe's first bubble.
            let first = keyframe.hurtbubbles.as_ref().map(|hb| hb[0]).unwrap_or(0.0);
            slice[0] = first;
            slice[2] = 5.0;
        });

        let jab = &document.get_animation("jab").unwrap().keyframes[0];
        assert_eq!(
            jab.hurtbubbles,
            Some(vec![1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 5.0, 0.0, 4.0, 5.0, 6.0, 0.0])
        );
        // Keyframes without a buffer are skipped.
        assert_eq!(document.get_animation("jab").unwrap().keyframes[1].hurtbubbles, None);
        // Insertion past the end of a short buffer lands at its end.
        let dash = &document.get_animation("dash").unwrap().keyframes[0];
        assert_eq!(
            dash.hurtbubbles,
            Some(vec![7.0, 8.0, 9.0, 0.0, 7.0, 0.0, 5.0, 0.0])
        );
    }

    #[test]
    fn test_delete_bubble_removes_slot_everywhere() {
        let mut document = document();
        delete_bubble(&mut document, 0);
        assert_eq!(
            document.get_animation("jab").unwrap().keyframes[0].hurtbubbles,
            Some(vec![4.0, 5.0, 6.0, 0.0])
        );
        assert_eq!(
            document.get_animation("dash").unwrap().keyframes[0].hurtbubbles,
            Some(vec![])
        );
        // A second delete finds the jab buffer still wide enough, dash not.
        delete_bubble(&mut document, 0);
        assert_eq!(
            document.get_animation("jab").unwrap().keyframes[0].hurtbubbles,
            Some(vec![])
        );
    }
}
