use crate::doc::Animation;

/// Frame-data summary of an attack animation. All counts are in frames.
/// The final keyframe is a loop-back/terminal marker: its duration is not
/// spent, so it is excluded from every sum.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stats {
    pub duration: i64,
    pub windup: u32,
    pub hits: String,
    pub backswing: i64,
}

/// Walks the keyframe sequence accumulating frame counts: windup is the
/// stretch before the first hit-bearing keyframe, each hit-bearing keyframe
/// contributes a closed 1-based frame range to `hits`, and backswing covers
/// everything after the last one. An `iasa` offset is subtracted from
/// backswing and total duration, never from windup.
pub fn compute(animation: &Animation) -> Stats {
    let keyframes = &animation.keyframes;
    let last = keyframes.len().saturating_sub(1);

    let mut windup: u32 = 0;
    let mut frame: u32 = 0;
    let mut index = 0;
    while index < last {
        let keyframe = &keyframes[index];
        if !keyframe.hitbubbles.is_absent() {
            break;
        }
        frame += keyframe.duration;
        windup += keyframe.duration;
        index += 1;
    }

    let mut timings: Vec<String> = Vec::new();
    let mut last_hit = index;
    while index < last {
        let keyframe = &keyframes[index];
        frame += keyframe.duration;
        if !keyframe.hitbubbles.is_absent() {
            last_hit = index;
            timings.push(format!("{}-{}", frame - keyframe.duration + 1, frame));
        }
        index += 1;
    }

    let mut backswing: i64 = keyframes
        .iter()
        .take(last)
        .skip(last_hit + 1)
        .map(|kf| i64::from(kf.duration))
        .sum();

    let mut duration: i64 = keyframes
        .iter()
        .take(last)
        .map(|kf| i64::from(kf.duration))
        .sum();

    if let Some(iasa) = animation.iasa {
        backswing -= i64::from(iasa);
        duration -= i64::from(iasa);
    }

    Stats {
        duration,
        windup,
        hits: timings.join(", "),
        backswing,
    }
}
