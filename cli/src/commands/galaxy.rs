use anyhow::Result;
use std::collections::HashSet;
use std::process;

use great_core::galaxy;
use great_core::service::MomentService;

pub(crate) fn cmd_galaxy(
    service: &MomentService,
    width: usize,
    height: usize,
    json: bool,
) -> Result<()> {
    let moments = service.list_moments(None, false)?;

    if moments.is_empty() {
        eprintln!("Your galaxy is empty. Log a moment to place the first star.");
        process::exit(2);
    }

    let layout = galaxy::layout(&moments);

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    let width = width.max(16);
    let height = height.max(8);
    println!("{}", render(&layout, width, height));

    let stars = layout.stars.len();
    let weeks: HashSet<&str> = layout.stars.iter().map(|s| s.week.as_str()).collect();
    let week_count = weeks.len();
    let lines = layout.edges.len();
    println!("{stars} stars across {week_count} weeks, {lines} constellation lines");
    Ok(())
}

/// Project the star field onto a character grid. Bright (favorited) stars
/// render as '*', the rest as '·'.
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn render(layout: &galaxy::GalaxyLayout, width: usize, height: usize) -> String {
    let xs = layout.stars.iter().map(|s| s.x);
    let ys = layout.stars.iter().map(|s| s.y);
    let (min_x, max_x) = bounds(xs);
    let (min_y, max_y) = bounds(ys);
    let span_x = (max_x - min_x).max(1e-9);
    let span_y = (max_y - min_y).max(1e-9);

    let mut grid = vec![vec![' '; width]; height];
    for star in &layout.stars {
        let col = ((star.x - min_x) / span_x * (width - 1) as f64).round() as usize;
        // Screen rows grow downward.
        let row = ((max_y - star.y) / span_y * (height - 1) as f64).round() as usize;
        let glyph = if star.magnitude >= 1.5 { '*' } else { '·' };
        let cell = &mut grid[row.min(height - 1)][col.min(width - 1)];
        // A bright star is never overdrawn by a dim one.
        if *cell != '*' {
            *cell = glyph;
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use great_core::galaxy::{GalaxyLayout, Star};

    fn star(x: f64, y: f64, magnitude: f64) -> Star {
        Star {
            uuid: format!("{x}-{y}"),
            x,
            y,
            magnitude,
            week: "2026-W35".to_string(),
        }
    }

    #[test]
    fn test_render_places_all_stars() {
        let layout = GalaxyLayout {
            stars: vec![star(0.0, 0.0, 1.0), star(10.0, 10.0, 1.8)],
            edges: vec![(0, 1)],
        };
        let out = render(&layout, 20, 10);
        assert_eq!(out.lines().count(), 10);
        assert!(out.contains('·'));
        assert!(out.contains('*'));
    }

    #[test]
    fn test_render_single_star_does_not_divide_by_zero() {
        let layout = GalaxyLayout {
            stars: vec![star(3.0, 4.0, 1.0)],
            edges: Vec::new(),
        };
        let out = render(&layout, 16, 8);
        assert_eq!(out.chars().filter(|&c| c == '·').count(), 1);
    }

    #[test]
    fn test_render_bright_star_wins_shared_cell() {
        let layout = GalaxyLayout {
            stars: vec![star(0.0, 0.0, 1.8), star(0.0, 0.0, 1.0)],
            edges: Vec::new(),
        };
        let out = render(&layout, 16, 8);
        assert!(out.contains('*'));
        assert!(!out.contains('·'));
    }
}
