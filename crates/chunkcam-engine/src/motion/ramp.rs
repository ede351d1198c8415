use chunkcam_core::{Point3, EPSILON};

use super::{cut_at, length_2d};

/// Zig-zag entry ramp.
///
/// Walks forth and back over the start of `path` while Z falls linearly
/// with planar travel from `zstart` to `zend`, then re-walks the whole path
/// at its own Z. When the path is shorter than half the ramp, the ramp
/// turns several times over the full path.
pub fn zig_zag_ramp(path: &[Point3], zstart: f64, zend: f64, angle: f64) -> Vec<Point3> {
    let drop = zstart - zend;
    let length = length_2d(path);
    let Some(first) = path.first().copied() else {
        return Vec::new();
    };
    if drop <= 0.0 || length <= EPSILON || angle <= 0.0 {
        return path.to_vec();
    }

    let mut ramp_length = drop / angle.tan();
    let half = ramp_length / 2.0;
    let mut turns = 1usize;
    let forth = if half > length {
        turns = (half / length).ceil() as usize;
        ramp_length = turns as f64 * length * 2.0;
        path.to_vec()
    } else {
        cut_at(path, half)
    };
    let mut zig: Vec<Point3> = forth.clone();
    zig.extend(forth.iter().rev().skip(1));

    let mut out = Vec::with_capacity(zig.len() * turns + path.len());
    out.push(first.with_z(first.z.max(zstart)));
    let mut traveled = 0.0;
    for _ in 0..turns {
        for p in &zig[1..] {
            if let Some(prev) = out.last() {
                traveled += prev.xy_distance_to(p);
            }
            let ratio = (traveled / ramp_length).min(1.0);
            out.push(p.with_z(p.z.max(zstart - drop * ratio)));
        }
    }
    out.extend_from_slice(&path[1..]);
    out
}

/// Contour entry ramp for closed loops.
///
/// Descends over whole revolutions of `ring` so the descent ends back at
/// the loop start, then cuts one flat revolution.
pub fn contour_ramp(ring: &[Point3], zstart: f64, zend: f64, angle: f64) -> Vec<Point3> {
    let drop = zstart - zend;
    let loop_length = length_2d(ring);
    let Some(first) = ring.first().copied() else {
        return Vec::new();
    };
    if drop <= 0.0 || loop_length <= EPSILON || angle <= 0.0 {
        return ring.to_vec();
    }
    let revolutions = (drop / angle.tan() / loop_length).ceil().max(1.0) as usize;
    let total = revolutions as f64 * loop_length;

    let mut out = Vec::with_capacity(ring.len() * (revolutions + 1));
    out.push(first.with_z(first.z.max(zstart)));
    let mut traveled = 0.0;
    for _ in 0..revolutions {
        for w in ring.windows(2) {
            traveled += w[0].xy_distance_to(&w[1]);
            let z = zstart - drop * (traveled / total).min(1.0);
            out.push(w[1].with_z(w[1].z.max(z)));
        }
    }
    out.extend_from_slice(&ring[1..]);
    out
}

/// Ascending revolutions of `ring` from `zfrom` up to `zto`, starting after
/// the loop start.
pub(super) fn contour_exit(ring: &[Point3], zfrom: f64, zto: f64, angle: f64) -> Vec<Point3> {
    let rise = zto - zfrom;
    let loop_length = length_2d(ring);
    if rise <= 0.0 || loop_length <= EPSILON || angle <= 0.0 {
        return Vec::new();
    }
    let revolutions = (rise / angle.tan() / loop_length).ceil().max(1.0) as usize;
    let total = revolutions as f64 * loop_length;
    let mut out = Vec::with_capacity(ring.len() * revolutions);
    let mut traveled = 0.0;
    for _ in 0..revolutions {
        for w in ring.windows(2) {
            traveled += w[0].xy_distance_to(&w[1]);
            let z = zfrom + rise * (traveled / total).min(1.0);
            out.push(w[1].with_z(w[1].z.max(z)));
        }
    }
    out
}

/// Walks back along the end of `path` climbing from `zfrom` towards `zto`.
/// A path shorter than the ramp is walked completely.
pub(super) fn tail_exit(path: &[Point3], zfrom: f64, zto: f64, angle: f64) -> Vec<Point3> {
    let rise = zto - zfrom;
    if rise <= 0.0 || angle <= 0.0 || path.len() < 2 {
        return Vec::new();
    }
    let ramp_length = rise / angle.tan();
    let backwards: Vec<Point3> = path.iter().rev().copied().collect();
    let tail = cut_at(&backwards, ramp_length);
    let mut out = Vec::with_capacity(tail.len());
    let mut traveled = 0.0;
    for w in tail.windows(2) {
        traveled += w[0].xy_distance_to(&w[1]);
        let z = zfrom + rise * (traveled / ramp_length).min(1.0);
        out.push(w[1].with_z(w[1].z.max(z)));
    }
    out
}
