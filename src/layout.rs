//! # Staff Layout
//!
//! Places notes left to right across a page and wraps them onto new staff rows.
//! Each row is a bar pair: a treble system and a bass system drawn together.
//!
//! ## Placement rules
//! - The first note sits at `(left_margin, top)`.
//! - Each note advances the pen by `note_width + note_spacing`.
//! - When the pen passes `page_width - note_width`, it returns to the left margin
//!   and drops by one bar pair height.
//! - A bar line is drawn after any note that takes the running total of length
//!   units across a multiple of `measure_units`.
//!
//! Layout is a single forward pass. Recording appends with [`Layout::push`]; a
//! resize recomputes everything with [`Layout::relayout`].

use serde::Serialize;

use crate::keyboard::{Point, Rect};
use crate::ledger::Ledger;
use crate::length::NoteLength;

/// Fixed staff dimensions in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    /// Distance between two staff lines.
    pub line_space: i32,
    /// Space above each system.
    pub top: i32,
    /// Extra space between bar pairs.
    pub bar_spacing: i32,
    pub note_width: i32,
    pub note_spacing: i32,
    /// X of the first note on every row (clefs and time signature sit left of it).
    pub left_margin: i32,
    /// Length units per measure.
    pub measure_units: u32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            line_space: 10,
            top: 20,
            bar_spacing: 20,
            note_width: 36,
            note_spacing: 10,
            left_margin: 65,
            measure_units: NoteLength::Breve.units() as u32,
        }
    }
}

impl LayoutMetrics {
    /// Vertical distance between consecutive rows.
    pub fn bar_pair_height(&self) -> i32 {
        self.bar_spacing + (self.top + self.line_space * 5) * 2
    }

    /// Height of a note's hit box.
    pub fn note_height(&self) -> i32 {
        self.line_space * 6
    }

    fn origin(&self) -> Point {
        Point::new(self.left_margin, self.top)
    }
}

/// Where a note is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub x: i32,
    /// Top of the row the note sits on.
    pub y: i32,
    pub row: usize,
}

/// A bar line following the note at `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BarLine {
    pub after: usize,
    pub x: i32,
    pub y: i32,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    metrics: LayoutMetrics,
    page_width: i32,
    placements: Vec<Placement>,
    bar_lines: Vec<BarLine>,
    #[serde(skip)]
    next: Point,
    #[serde(skip)]
    row: usize,
    #[serde(skip)]
    units: u64,
}

impl Layout {
    /// An empty layout for a page.
    pub fn new(page_width: i32, metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            page_width,
            placements: Vec::new(),
            bar_lines: Vec::new(),
            next: metrics.origin(),
            row: 0,
            units: 0,
        }
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn page_width(&self) -> i32 {
        self.page_width
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn bar_lines(&self) -> &[BarLine] {
        &self.bar_lines
    }

    pub fn placement(&self, index: usize) -> Option<&Placement> {
        self.placements.get(index)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Where the next note will go.
    pub fn next_position(&self) -> Point {
        self.next
    }

    /// Number of rows in use (at least one).
    pub fn rows(&self) -> usize {
        self.placements.last().map_or(1, |p| p.row + 1)
    }

    /// Forget every note and return the pen to the origin.
    pub fn reset(&mut self) {
        self.placements.clear();
        self.bar_lines.clear();
        self.next = self.metrics.origin();
        self.row = 0;
        self.units = 0;
    }

    /// Place one more note of the given length.
    pub fn push(&mut self, length: NoteLength) -> Placement {
        let m = self.metrics;
        let index = self.placements.len();
        let placement = Placement {
            x: self.next.x,
            y: self.next.y,
            row: self.row,
        };
        self.placements.push(placement);

        let measure = m.measure_units.max(1) as u64;
        let before = self.units / measure;
        self.units += length.units() as u64;
        if self.units / measure > before {
            self.bar_lines.push(BarLine {
                after: index,
                x: placement.x + m.note_width + m.note_spacing / 2,
                y: placement.y,
                row: placement.row,
            });
        }

        self.next.x += m.note_width + m.note_spacing;
        if self.next.x > self.page_width - m.note_width {
            self.next = Point::new(m.left_margin, self.next.y + m.bar_pair_height());
            self.row += 1;
        }

        placement
    }

    /// Recompute every placement, e.g. after the page width changed.
    pub fn relayout(&mut self, ledger: &Ledger, page_width: i32) {
        self.page_width = page_width;
        self.reset();
        for note in ledger {
            self.push(note.length);
        }
    }

    /// Scrollable height needed to show every row plus room for the next one.
    pub fn content_height(&self, view_height: i32) -> i32 {
        let m = &self.metrics;
        let last_y = self.placements.last().map_or(m.top, |p| p.y);
        let two_systems = (m.top * 2 + m.line_space * 10 + m.bar_spacing) * 2;
        view_height.max(last_y + two_systems)
    }

    /// Hit box of a placed note.
    pub fn note_rect(&self, index: usize) -> Option<Rect> {
        let m = &self.metrics;
        self.placements
            .get(index)
            .map(|p| Rect::new(p.x, p.y, m.note_width, m.note_height()))
    }

    /// Index of the note under a point, if any.
    pub fn note_at(&self, point: Point) -> Option<usize> {
        (0..self.placements.len()).find(|&i| {
            self.note_rect(i)
                .map_or(false, |rect| rect.contains(point))
        })
    }
}

/// Lay out a whole ledger in one pass.
pub fn compute_layout(ledger: &Ledger, page_width: i32, metrics: LayoutMetrics) -> Layout {
    let mut layout = Layout::new(page_width, metrics);
    for note in ledger {
        layout.push(note.length);
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::Pitch;

    fn crotchets(count: usize) -> Ledger {
        let mut ledger = Ledger::new();
        for _ in 0..count {
            ledger.append(Some(Pitch::MIDDLE_C), NoteLength::Crotchet);
        }
        ledger
    }

    #[test]
    fn test_first_note_at_origin() {
        let layout = compute_layout(&crotchets(2), 624, LayoutMetrics::default());
        assert_eq!(layout.placements()[0], Placement { x: 65, y: 20, row: 0 });
        assert_eq!(layout.placements()[1], Placement { x: 111, y: 20, row: 0 });
    }

    #[test]
    fn test_wraps_to_next_bar_pair() {
        // Width 300: notes at 65, 111, 157, 203, 249; 295 > 264 wraps
        let layout = compute_layout(&crotchets(7), 300, LayoutMetrics::default());
        let xs: Vec<i32> = layout.placements().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![65, 111, 157, 203, 249, 65, 111]);
        assert_eq!(layout.placements()[5].y, 20 + 160);
        assert_eq!(layout.placements()[5].row, 1);
        assert_eq!(layout.rows(), 2);
    }

    #[test]
    fn test_narrow_page_puts_one_note_per_row() {
        let layout = compute_layout(&crotchets(3), 10, LayoutMetrics::default());
        let rows: Vec<usize> = layout.placements().iter().map(|p| p.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_one_bar_line_per_full_measure() {
        let layout = compute_layout(&crotchets(8), 2000, LayoutMetrics::default());
        assert_eq!(layout.bar_lines().len(), 1);
        let bar = layout.bar_lines()[0];
        assert_eq!(bar.after, 7);
        assert_eq!(bar.x, layout.placements()[7].x + 36 + 5);

        let layout = compute_layout(&crotchets(7), 2000, LayoutMetrics::default());
        assert!(layout.bar_lines().is_empty());
    }

    #[test]
    fn test_overflowing_note_carries_into_next_measure() {
        let mut ledger = Ledger::new();
        ledger.append(None, NoteLength::DottedSemiBreve); // 192
        ledger.append(None, NoteLength::SemiBreve); // 320, crosses 256
        ledger.append(None, NoteLength::DottedSemiBreve); // 512, crosses 512
        let layout = compute_layout(&ledger, 2000, LayoutMetrics::default());
        let afters: Vec<usize> = layout.bar_lines().iter().map(|b| b.after).collect();
        assert_eq!(afters, vec![1, 2]);
    }

    #[test]
    fn test_layout_is_idempotent() {
        let ledger = crotchets(40);
        let a = compute_layout(&ledger, 500, LayoutMetrics::default());
        let b = compute_layout(&ledger, 500, LayoutMetrics::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_incremental_matches_full() {
        let ledger = crotchets(25);
        let mut incremental = Layout::new(450, LayoutMetrics::default());
        for note in &ledger {
            incremental.push(note.length);
        }
        assert_eq!(incremental, compute_layout(&ledger, 450, LayoutMetrics::default()));

        incremental.relayout(&ledger, 900);
        assert_eq!(incremental, compute_layout(&ledger, 900, LayoutMetrics::default()));
    }

    #[test]
    fn test_hit_testing_and_height() {
        let layout = compute_layout(&crotchets(3), 624, LayoutMetrics::default());
        assert_eq!(layout.note_at(Point::new(70, 25)), Some(0));
        assert_eq!(layout.note_at(Point::new(115, 79)), Some(1));
        assert_eq!(layout.note_at(Point::new(105, 25)), None);
        assert_eq!(layout.content_height(100), 20 + 320);
        assert_eq!(layout.content_height(1000), 1000);
    }
}
