use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::Moment;
use crate::praise::fnv1a64;

/// Deterministic star-map layout: moments cluster by ISO week, clusters sit
/// on a golden-angle spiral around the origin, and a Delaunay triangulation
/// over the stars supplies the constellation lines. No RNG anywhere — every
/// coordinate derives from the moment uuid and its position in the week, so
/// the same journal always renders the same sky.

#[derive(Debug, Clone, Serialize)]
pub struct Star {
    pub uuid: String,
    pub x: f64,
    pub y: f64,
    pub magnitude: f64,
    pub week: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalaxyLayout {
    pub stars: Vec<Star>,
    /// Constellation lines as index pairs into `stars`, i < j, sorted.
    pub edges: Vec<(usize, usize)>,
}

// 2π / φ², the golden angle in radians.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
const CLUSTER_SPACING: f64 = 10.0;
const STAR_SPACING: f64 = 1.6;

#[must_use]
pub fn layout(moments: &[Moment]) -> GalaxyLayout {
    let fallback = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();

    // Group by ISO week, ordered oldest week first.
    let mut weeks: BTreeMap<(i32, u32), Vec<&Moment>> = BTreeMap::new();
    for moment in moments {
        let date = moment.local_date().unwrap_or(fallback);
        let iso = date.iso_week();
        weeks.entry((iso.year(), iso.week())).or_default().push(moment);
    }

    let mut stars = Vec::with_capacity(moments.len());
    for (cluster_idx, ((year, week), mut members)) in weeks.into_iter().enumerate() {
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.uuid.cmp(&b.uuid))
        });

        let k = cluster_idx as f64;
        let cluster_r = CLUSTER_SPACING * (k + 1.0).sqrt();
        let cluster_theta = k * GOLDEN_ANGLE;
        let cx = cluster_r * cluster_theta.cos();
        let cy = cluster_r * cluster_theta.sin();

        for (star_idx, moment) in members.iter().enumerate() {
            let hash = fnv1a64(&moment.uuid);
            let radius_frac = (hash % 1000) as f64 / 1000.0;
            let angle_frac = ((hash >> 10) % 1000) as f64 / 1000.0;

            let j = star_idx as f64;
            let r = STAR_SPACING * (j + 1.0).sqrt() * (0.85 + 0.3 * radius_frac);
            let theta = j * GOLDEN_ANGLE + (angle_frac - 0.5);

            stars.push(Star {
                uuid: moment.uuid.clone(),
                x: cx + r * theta.cos(),
                y: cy + r * theta.sin(),
                magnitude: if moment.favorite { 1.8 } else { 1.0 },
                week: format!("{year}-W{week:02}"),
            });
        }
    }

    let points: Vec<(f64, f64)> = stars.iter().map(|s| (s.x, s.y)).collect();
    let edges = constellation_edges(&points);

    GalaxyLayout { stars, edges }
}

/// Unique undirected edges of the Delaunay triangulation, i < j, sorted.
/// Fewer than three points degrade to the obvious cases.
#[must_use]
pub fn constellation_edges(points: &[(f64, f64)]) -> Vec<(usize, usize)> {
    match points.len() {
        0 | 1 => Vec::new(),
        2 => vec![(0, 1)],
        _ => {
            let mut edges: Vec<(usize, usize)> = triangulate(points)
                .iter()
                .flat_map(|t| [edge(t[0], t[1]), edge(t[1], t[2]), edge(t[0], t[2])])
                .collect();
            edges.sort_unstable();
            edges.dedup();
            edges
        }
    }
}

fn edge(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Bowyer–Watson incremental Delaunay triangulation. Returns triangles as
/// index triples into `points`.
fn triangulate(points: &[(f64, f64)]) -> Vec<[usize; 3]> {
    // Super-triangle comfortably enclosing every point. Its vertices get
    // indices n, n+1, n+2 and are stripped at the end.
    let n = points.len();
    let (min_x, max_x) = min_max(points.iter().map(|p| p.0));
    let (min_y, max_y) = min_max(points.iter().map(|p| p.1));
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let mid_x = (min_x + max_x) / 2.0;
    let mid_y = (min_y + max_y) / 2.0;

    let mut verts: Vec<(f64, f64)> = points.to_vec();
    verts.push((mid_x - 20.0 * span, mid_y - span));
    verts.push((mid_x + 20.0 * span, mid_y - span));
    verts.push((mid_x, mid_y + 20.0 * span));

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

    for point_idx in 0..n {
        let p = verts[point_idx];

        // Triangles whose circumcircle contains the new point.
        let (bad, good): (Vec<[usize; 3]>, Vec<[usize; 3]>) = triangles
            .into_iter()
            .partition(|t| circumcircle_contains(verts[t[0]], verts[t[1]], verts[t[2]], p));
        triangles = good;

        // Boundary of the cavity: edges belonging to exactly one bad triangle.
        let mut edge_count: HashMap<(usize, usize), u32> = HashMap::new();
        for t in &bad {
            for e in [edge(t[0], t[1]), edge(t[1], t[2]), edge(t[0], t[2])] {
                *edge_count.entry(e).or_insert(0) += 1;
            }
        }
        for ((a, b), count) in edge_count {
            if count == 1 {
                triangles.push([a, b, point_idx]);
            }
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.iter().all(|&v| v < n))
        .collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn circumcircle_contains(a: (f64, f64), b: (f64, f64), c: (f64, f64), p: (f64, f64)) -> bool {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-12 {
        // Degenerate (collinear) triangle: no valid circumcircle.
        return false;
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let r2 = (a.0 - ux).powi(2) + (a.1 - uy).powi(2);
    (p.0 - ux).powi(2) + (p.1 - uy).powi(2) < r2 - 1e-12
}
