use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

pub use self::bubbles::{BoneMap, BubbleBuf, BUBBLE_STRIDE};

pub mod bubbles;

#[derive(Fail, Debug)]
pub enum DocError {
    #[fail(display = "Animation was not found")]
    AnimationNotFound,
    #[fail(display = "Keyframe index is out of bounds")]
    InvalidKeyframeIndex,
    #[fail(display = "Keyframe has no hurtbubble buffer")]
    NoHurtbubbles,
}

/// One named bone of a character skeleton. `i1`/`i2` are endpoint slot
/// indices into every keyframe's hurtbubble coordinate buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HurtbubbleData {
    pub name: String,
    pub i1: usize,
    pub i2: usize,
    pub z: f32,
    pub ik: bool,
}

/// Character definition, loaded from the companion `<name>.json` document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub name: String,
    pub hurtbubbles: Vec<HurtbubbleData>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Circular attack volume. When `follow` names a bone, `x`/`y` are offsets
/// from that bone endpoint's per-keyframe position, never absolute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hitbubble {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(default)]
    pub radius: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A keyframe's hitbubble field. Serialized as an array (`Inline`), the
/// literal `true` (`Inherited`, meaning "reuse the previous keyframe's
/// resolved set") or omitted entirely (`Absent`).
#[derive(Clone, Debug, PartialEq)]
pub enum Hitbubbles {
    Absent,
    Inherited,
    Inline(Vec<Hitbubble>),
}

impl Default for Hitbubbles {
    fn default() -> Hitbubbles {
        Hitbubbles::Absent
    }
}

impl Hitbubbles {
    pub fn is_absent(&self) -> bool {
        *self == Hitbubbles::Absent
    }
}

impl Serialize for Hitbubbles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Absent is skipped at the keyframe level; this arm only exists
            // for direct serialization of the enum.
            Hitbubbles::Absent => serializer.serialize_none(),
            Hitbubbles::Inherited => serializer.serialize_bool(true),
            Hitbubbles::Inline(bubbles) => bubbles.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Hitbubbles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Hitbubbles, D::Error> {
        struct HitbubblesVisitor;

        impl<'de> Visitor<'de> for HitbubblesVisitor {
            type Value = Hitbubbles;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "`true` or an array of hitbubbles")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<Hitbubbles, E> {
                if value {
                    Ok(Hitbubbles::Inherited)
                } else {
                    Ok(Hitbubbles::Absent)
                }
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Hitbubbles, A::Error> {
                let mut bubbles = Vec::new();
                while let Some(bubble) = seq.next_element()? {
                    bubbles.push(bubble);
                }
                Ok(Hitbubbles::Inline(bubbles))
            }
        }

        deserializer.deserialize_any(HitbubblesVisitor)
    }
}

/// One timed pose. `hurtbubbles` is a flat buffer of 4 numbers per bubble
/// endpoint: x, y, radius, state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hurtbubbles: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Hitbubbles::is_absent")]
    pub hitbubbles: Hitbubbles,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub keyframes: Vec<Keyframe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iasa: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A character's whole animation document: animation name to animation.
/// Held wholesale by the active editing session and persisted by full
/// re-serialization.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub animations: BTreeMap<String, Animation>,
}

impl Document {
    pub fn new() -> Document {
        Default::default()
    }

    pub fn has_animation<T: AsRef<str>>(&self, name: T) -> bool {
        self.animations.contains_key(name.as_ref())
    }

    pub fn get_animation<T: AsRef<str>>(&self, name: T) -> Option<&Animation> {
        self.animations.get(name.as_ref())
    }

    pub fn get_animation_mut<T: AsRef<str>>(&mut self, name: T) -> Option<&mut Animation> {
        self.animations.get_mut(name.as_ref())
    }

    pub fn animations_iter(&self) -> impl Iterator<Item = (&String, &Animation)> {
        self.animations.iter()
    }
}

impl Animation {
    pub fn get_keyframe(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    pub fn get_keyframe_mut(&mut self, index: usize) -> Option<&mut Keyframe> {
        self.keyframes.get_mut(index)
    }

    pub fn get_num_keyframes(&self) -> usize {
        self.keyframes.len()
    }

    /// Walks the backward `Inherited` chain to the authoritative hitbubble
    /// array for `index`. Out-of-bounds indices resolve to `None`, including
    /// an `Inherited` at keyframe 0 walking past the front of the sequence.
    /// The index strictly decreases each step, so this always terminates.
    pub fn resolve_hitbubbles(&self, mut index: isize) -> Option<&[Hitbubble]> {
        loop {
            if index < 0 || index as usize >= self.keyframes.len() {
                return None;
            }
            match &self.keyframes[index as usize].hitbubbles {
                Hitbubbles::Absent => return None,
                Hitbubbles::Inline(bubbles) => return Some(bubbles),
                Hitbubbles::Inherited => index -= 1,
            }
        }
    }

    pub fn swap_keyframes(&mut self, a: usize, b: usize) -> Result<(), DocError> {
        if a >= self.keyframes.len() || b >= self.keyframes.len() {
            return Err(DocError::InvalidKeyframeIndex);
        }
        self.keyframes.swap(a, b);
        Ok(())
    }

    /// Inserts a copy of keyframe `index` (duration and hurtbubble buffer
    /// only, hitbubbles are not duplicated) before it.
    pub fn insert_keyframe_before(&mut self, index: usize) -> Result<(), DocError> {
        let copy = self.duplicate_keyframe(index)?;
        self.keyframes.insert(index, copy);
        Ok(())
    }

    /// Same as `insert_keyframe_before`, inserting after `index` instead.
    pub fn insert_keyframe_after(&mut self, index: usize) -> Result<(), DocError> {
        let copy = self.duplicate_keyframe(index)?;
        self.keyframes.insert(index + 1, copy);
        Ok(())
    }

    fn duplicate_keyframe(&self, index: usize) -> Result<Keyframe, DocError> {
        let keyframe = self
            .keyframes
            .get(index)
            .ok_or(DocError::InvalidKeyframeIndex)?;
        Ok(Keyframe {
            duration: keyframe.duration,
            hurtbubbles: keyframe.hurtbubbles.clone(),
            hitbubbles: Hitbubbles::Absent,
            extra: Map::new(),
        })
    }

    pub fn remove_keyframe(&mut self, index: usize) -> Result<(), DocError> {
        if index >= self.keyframes.len() {
            return Err(DocError::InvalidKeyframeIndex);
        }
        self.keyframes.remove(index);
        Ok(())
    }

    /// Copies hurtbubble coordinates element-wise from keyframe `from` to
    /// keyframe `to`, clamped to the shorter of the two buffers.
    pub fn copy_bubbles(&mut self, from: usize, to: usize) -> Result<(), DocError> {
        if from >= self.keyframes.len() || to >= self.keyframes.len() {
            return Err(DocError::InvalidKeyframeIndex);
        }
        let source = self.keyframes[from]
            .hurtbubbles
            .clone()
            .ok_or(DocError::NoHurtbubbles)?;
        let target = self.keyframes[to]
            .hurtbubbles
            .as_mut()
            .ok_or(DocError::NoHurtbubbles)?;
        for (i, value) in source.iter().enumerate().take(target.len()) {
            target[i] = *value;
        }
        Ok(())
    }
}

impl Keyframe {
    pub fn bubbles(&self) -> Option<BubbleBuf> {
        self.hurtbubbles.as_deref().map(BubbleBuf::new)
    }

    pub fn bubble_count(&self) -> usize {
        self.hurtbubbles
            .as_ref()
            .map_or(0, |hb| hb.len() / BUBBLE_STRIDE)
    }

    /// Writes both position fields of one bubble slot. Returns false without
    /// touching the buffer when the slot does not exist, so a repaint never
    /// observes a half-written slot.
    pub fn set_bubble_position(&mut self, slot: usize, x: f32, y: f32) -> bool {
        let offset = slot * BUBBLE_STRIDE;
        match self.hurtbubbles.as_mut() {
            Some(hb) if offset + 1 < hb.len() => {
                hb[offset] = x;
                hb[offset + 1] = y;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
fn keyframe_with_hitbubbles(hitbubbles: Hitbubbles) -> Keyframe {
    Keyframe {
        duration: 1,
        hurtbubbles: None,
        hitbubbles,
        extra: Map::new(),
    }
}

#[test]
fn test_resolve_hitbubbles_chain() {
    let inline = Hitbubbles::Inline(vec![Hitbubble {
        x: None,
        y: None,
        radius: 10.0,
        follow: None,
        kind: None,
        extra: Map::new(),
    }]);
    let animation = Animation {
        keyframes: vec![
            keyframe_with_hitbubbles(inline.clone()),
            keyframe_with_hitbubbles(Hitbubbles::Inherited),
            keyframe_with_hitbubbles(Hitbubbles::Inherited),
            keyframe_with_hitbubbles(Hitbubbles::Absent),
        ],
        iasa: None,
        extra: Map::new(),
    };

    let origin = animation.resolve_hitbubbles(0).unwrap();
    assert_eq!(origin.len(), 1);
    assert_eq!(origin[0].radius, 10.0);

    // Inherited keyframes resolve to the exact same array, not a copy.
    assert!(std::ptr::eq(
        animation.resolve_hitbubbles(1).unwrap(),
        origin
    ));
    assert!(std::ptr::eq(
        animation.resolve_hitbubbles(2).unwrap(),
        origin
    ));

    assert_eq!(animation.resolve_hitbubbles(3), None);
    assert_eq!(animation.resolve_hitbubbles(-1), None);
    assert_eq!(animation.resolve_hitbubbles(4), None);
}

#[test]
fn test_resolve_hitbubbles_terminates_on_leading_inherited() {
    // A chain of Inherited all the way to keyframe 0 walks off the front
    // of the sequence and resolves to nothing.
    let animation = Animation {
        keyframes: vec![
            keyframe_with_hitbubbles(Hitbubbles::Inherited),
            keyframe_with_hitbubbles(Hitbubbles::Inherited),
        ],
        iasa: None,
        extra: Map::new(),
    };
    for index in -1isize..=2 {
        assert_eq!(animation.resolve_hitbubbles(index), None);
    }
}

#[test]
fn test_hitbubbles_serde_shapes() {
    let keyframe: Keyframe = serde_json::from_str(r#"{ "duration": 5 }"#).unwrap();
    assert_eq!(keyframe.hitbubbles, Hitbubbles::Absent);

    let keyframe: Keyframe =
        serde_json::from_str(r#"{ "duration": 5, "hitbubbles": true }"#).unwrap();
    assert_eq!(keyframe.hitbubbles, Hitbubbles::Inherited);

    let keyframe: Keyframe =
        serde_json::from_str(r#"{ "duration": 5, "hitbubbles": [{ "radius": 8 }] }"#).unwrap();
    match &keyframe.hitbubbles {
        Hitbubbles::Inline(bubbles) => assert_eq!(bubbles[0].radius, 8.0),
        other => panic!("expected inline hitbubbles, got {:?}", other),
    }

    let serialized = serde_json::to_string(&keyframe).unwrap();
    let reparsed: Keyframe = serde_json::from_str(&serialized).unwrap();
    assert_eq!(reparsed, keyframe);
}

#[test]
fn test_keyframe_open_fields_round_trip() {
    let source = r#"{ "duration": 3, "tween": "easeOutQuad", "audio": "whoosh" }"#;
    let keyframe: Keyframe = serde_json::from_str(source).unwrap();
    assert_eq!(keyframe.extra["tween"], Value::String("easeOutQuad".into()));
    let reparsed: Keyframe =
        serde_json::from_str(&serde_json::to_string(&keyframe).unwrap()).unwrap();
    assert_eq!(reparsed, keyframe);
}

#[test]
fn test_insert_and_remove_keyframes() {
    let mut animation = Animation {
        keyframes: vec![Keyframe {
            duration: 4,
            hurtbubbles: Some(vec![1.0, 2.0, 3.0, 0.0]),
            hitbubbles: Hitbubbles::Absent,
            extra: Map::new(),
        }],
        iasa: None,
        extra: Map::new(),
    };

    animation.insert_keyframe_after(0).unwrap();
    assert_eq!(animation.get_num_keyframes(), 2);
    assert_eq!(
        animation.keyframes[1].hurtbubbles,
        animation.keyframes[0].hurtbubbles
    );

    animation.keyframes[1].hurtbubbles = Some(vec![9.0, 9.0, 9.0, 0.0]);
    animation.copy_bubbles(1, 0).unwrap();
    assert_eq!(animation.keyframes[0].hurtbubbles, Some(vec![9.0, 9.0, 9.0, 0.0]));

    animation.swap_keyframes(0, 1).unwrap();
    animation.remove_keyframe(1).unwrap();
    assert_eq!(animation.get_num_keyframes(), 1);
    assert!(animation.remove_keyframe(5).is_err());
}
