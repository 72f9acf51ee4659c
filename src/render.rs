use crate::types::{CutDirection, CuttingResult};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// ASCII diagram of one sheet: the sheet border, every placed piece labelled
/// with its size, and (when `show_cuts` is set) the guillotine cut lines.
pub fn render_sheet(result: &CuttingResult, show_cuts: bool) -> String {
    let sheet = &result.actual_material;
    let scale = f64::min(MAX_WIDTH / sheet.width, MAX_HEIGHT / sheet.height);
    let grid_w = (sheet.width * scale).round() as usize;
    let grid_h = (sheet.height * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    let to_grid = |v: f64| (v * scale).round() as usize;

    if show_cuts {
        for step in &result.cutting_steps {
            let (x0, y0) = (to_grid(step.start_point.x), to_grid(step.start_point.y));
            let (x1, y1) = (to_grid(step.end_point.x), to_grid(step.end_point.y));
            match step.direction {
                CutDirection::Vertical => {
                    for row in grid.iter_mut().take(y1 + 1).skip(y0) {
                        if let Some(cell) = row.get_mut(x0) {
                            *cell = ':';
                        }
                    }
                }
                CutDirection::Horizontal => {
                    if let Some(row) = grid.get_mut(y0) {
                        for cell in row.iter_mut().take(x1 + 1).skip(x0) {
                            *cell = '.';
                        }
                    }
                }
            }
        }
    }

    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &result.cuts {
        let sx = to_grid(p.x);
        let sy = to_grid(p.y);
        let sw = to_grid(p.width);
        let sh = to_grid(p.height);

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label = format!("{}x{}", p.width, p.height);
        let label_chars: Vec<char> = label.chars().collect();

        if sw > 2 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let start_x = cx.saturating_sub(label_chars.len() / 2);

            for (i, &ch) in label_chars.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut out = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn edge(cell: char, along: char) -> char {
    match (cell, along) {
        ('+', _) => '+',
        ('|', '-') | ('-', '|') => '+',
        _ => along,
    }
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    for i in x..=(x + w).min(cols - 1) {
        for j in [y, y + h] {
            if j < rows {
                grid[j][i] = edge(grid[j][i], '-');
            }
        }
    }

    for row in grid.iter_mut().take((y + h).min(rows - 1) + 1).skip(y) {
        for i in [x, x + w] {
            if i < cols {
                row[i] = edge(row[i], '|');
            }
        }
    }

    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
