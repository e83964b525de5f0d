// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! A terminal view of the tombola. Terminal cells are about twice as tall as they
//! are wide, so frames are drawn on a surface with two rows per cell.

use std::{
    io::{self, Stdout, Write},
    time::Duration,
};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};

use crate::sim::{Frame, SimulationSnapshot};

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const WALL: char = '#';
const NOTE: char = 'o';

/// A grid of terminal cells.
pub struct Canvas {
    cols: usize,
    rows: usize,
    cells: Vec<char>,
}

impl Canvas {
    /// Draws a frame captured at `cols` by `rows * 2`.
    pub fn render(frame: &Frame, cols: usize, rows: usize) -> Canvas {
        let mut canvas = Canvas {
            cols,
            rows,
            cells: vec![' '; cols * rows],
        };
        for (a, b) in frame.rotated_walls() {
            canvas.line(a, b, WALL);
        }
        for note in frame.notes.iter() {
            canvas.plot(note.x, note.y, NOTE);
        }
        canvas
    }

    /// Returns the characters of a row.
    pub fn row(&self, row: usize) -> String {
        self.cells[row * self.cols..(row + 1) * self.cols]
            .iter()
            .collect()
    }

    fn plot(&mut self, x: f32, y: f32, ch: char) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (col, row) = (x as usize, (y / 2.0) as usize);
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = ch;
        }
    }

    fn line(&mut self, a: [f32; 2], b: [f32; 2], ch: char) {
        let steps = (b[0] - a[0]).abs().max((b[1] - a[1]).abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.plot(a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, ch);
        }
    }
}

/// Draws the simulation until the user quits or `keep_running` returns false.
pub fn run<F>(snapshot: &SimulationSnapshot, keep_running: F) -> io::Result<()>
where
    F: Fn() -> bool,
{
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;

    let result = draw_loop(&mut stdout, snapshot, keep_running);

    execute!(stdout, cursor::Show, EnableLineWrap, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn draw_loop<F>(
    stdout: &mut Stdout,
    snapshot: &SimulationSnapshot,
    keep_running: F,
) -> io::Result<()>
where
    F: Fn() -> bool,
{
    while keep_running() {
        if event::poll(FRAME_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                let quit = match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
                    KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
                    _ => false,
                };
                if key.kind == KeyEventKind::Press && quit {
                    return Ok(());
                }
            }
        }

        let (cols, rows) = terminal::size()?;
        // Keep the last row for the status line.
        let (cols, rows) = (cols as usize, (rows as usize).saturating_sub(1));
        let frame = snapshot.draw(cols as f32, rows as f32 * 2.0);
        let canvas = Canvas::render(&frame, cols, rows);

        queue!(stdout, BeginSynchronizedUpdate, Clear(ClearType::All))?;
        for row in 0..rows {
            queue!(stdout, cursor::MoveTo(0, row as u16), Print(canvas.row(row)))?;
        }
        let status = format!("notes: {}  q to quit", frame.notes.len());
        queue!(
            stdout,
            cursor::MoveTo(0, rows as u16),
            Print(status.chars().take(cols).collect::<String>()),
            EndSynchronizedUpdate
        )?;
        stdout.flush()?;
    }
    Ok(())
}
