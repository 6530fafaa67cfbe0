use std::collections::HashMap;

use crate::doc::HurtbubbleData;

/// Numbers per bubble endpoint in a keyframe's flat coordinate buffer:
/// x, y, radius, state.
pub const BUBBLE_STRIDE: usize = 4;

/// Read-only stride-4 view over a keyframe's hurtbubble buffer. This is the
/// hot-path accessor: no per-bubble objects are built per repaint.
#[derive(Clone, Copy, Debug)]
pub struct BubbleBuf<'a> {
    data: &'a [f32],
}

impl<'a> BubbleBuf<'a> {
    pub fn new(data: &[f32]) -> BubbleBuf {
        BubbleBuf { data }
    }

    pub fn len(&self) -> usize {
        self.data.len() / BUBBLE_STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_slot(&self, slot: usize) -> bool {
        (slot + 1) * BUBBLE_STRIDE <= self.data.len()
    }

    #[inline]
    pub fn x(&self, slot: usize) -> f32 {
        self.data[slot * BUBBLE_STRIDE]
    }

    #[inline]
    pub fn y(&self, slot: usize) -> f32 {
        self.data[slot * BUBBLE_STRIDE + 1]
    }

    #[inline]
    pub fn radius(&self, slot: usize) -> f32 {
        self.data[slot * BUBBLE_STRIDE + 2]
    }

    #[inline]
    pub fn state(&self, slot: usize) -> f32 {
        self.data[slot * BUBBLE_STRIDE + 3]
    }
}

/// Converts a flat buffer offset (multiple of 4) to a bubble slot index.
pub fn slot_of(offset: usize) -> usize {
    offset / BUBBLE_STRIDE
}

/// Converts a bubble slot index to its flat buffer offset.
pub fn offset_of(slot: usize) -> usize {
    slot * BUBBLE_STRIDE
}

/// Lookup from bone name to a signed 1-based endpoint code, used to resolve
/// hitbubble `follow` references. Bone at position `i` maps its name to
/// `i + 1` and `"<name>2"` to `-(i + 1)`: positive selects `i1`, negative
/// selects `i2`, and 0 is never a valid code so absence is unambiguous.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneMap {
    entries: HashMap<String, i32>,
}

impl BoneMap {
    pub fn new(bones: &[HurtbubbleData]) -> BoneMap {
        let mut entries = HashMap::with_capacity(bones.len() * 2);
        for (i, bone) in bones.iter().enumerate() {
            entries.insert(bone.name.clone(), i as i32 + 1);
            entries.insert(format!("{}2", bone.name), -(i as i32) - 1);
        }
        BoneMap { entries }
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.entries.get(name).cloned()
    }

    /// Resolves a `follow` name to the flat buffer offset of the endpoint it
    /// anchors to: `4 * i1` for the plain bone name, `4 * i2` for the
    /// `"2"`-suffixed form. Unknown names resolve to `None`.
    pub fn follow_offset(&self, name: &str, bones: &[HurtbubbleData]) -> Option<usize> {
        let code = self.get(name)?;
        let bone = bones.get(code.abs() as usize - 1)?;
        Some(BUBBLE_STRIDE * if code > 0 { bone.i1 } else { bone.i2 })
    }
}

#[cfg(test)]
fn bone(name: &str, i1: usize, i2: usize) -> HurtbubbleData {
    HurtbubbleData {
        name: name.to_owned(),
        i1,
        i2,
        z: 0.0,
        ik: false,
    }
}

#[test]
fn test_bone_map_encoding() {
    let bones = vec![bone("head", 0, 1)];
    let map = BoneMap::new(&bones);
    assert_eq!(map.get("head"), Some(1));
    assert_eq!(map.get("head2"), Some(-1));
    assert_eq!(map.get("tail"), None);
}

#[test]
fn test_follow_offset_selects_endpoint() {
    let bones = vec![bone("head", 0, 1), bone("arm", 2, 5)];
    let map = BoneMap::new(&bones);
    assert_eq!(map.follow_offset("head", &bones), Some(0));
    assert_eq!(map.follow_offset("head2", &bones), Some(4));
    assert_eq!(map.follow_offset("arm", &bones), Some(8));
    assert_eq!(map.follow_offset("arm2", &bones), Some(20));
    assert_eq!(map.follow_offset("leg", &bones), None);
}

#[test]
fn test_bubble_buf_accessors() {
    let data = vec![1.0, 2.0, 3.0, 0.0, -4.0, -5.0, 6.0, 7.0];
    let buf = BubbleBuf::new(&data);
    assert_eq!(buf.len(), 2);
    assert!(buf.contains_slot(1));
    assert!(!buf.contains_slot(2));
    assert_eq!(buf.x(1), -4.0);
    assert_eq!(buf.y(1), -5.0);
    assert_eq!(buf.radius(1), 6.0);
    assert_eq!(buf.state(1), 7.0);
    assert_eq!(slot_of(offset_of(1)), 1);
}
