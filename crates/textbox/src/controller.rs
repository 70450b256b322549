//! Multi-caret editing engine over a rune array.
//!
//! The controller owns the text as a `Vec<char>` plus derived line bounds,
//! and a sorted list of non-overlapping selections (never empty; a plain
//! caret is an empty selection). Motion primitives are pure index maps;
//! selection macros lift them over every caret; edit operations apply
//! right-to-left so earlier indices stay valid, then shift every selection
//! endpoint by the emitted deltas.

use events::Event;
use interval::Span;

/// One splice of the rune array: `delta` runes appeared (or, negative,
/// disappeared) at index `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub at: usize,
    pub delta: isize,
}

/// Half-open rune range with the caret at one end and the anchor at the
/// other. An empty selection is a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
    pub caret_at_start: bool,
}

impl Selection {
    pub fn new(start: usize, end: usize, caret_at_start: bool) -> Self {
        assert!(start <= end, "inverted selection {}..{}", start, end);
        Self {
            start,
            end,
            caret_at_start,
        }
    }

    pub fn caret_only(at: usize) -> Self {
        Self::new(at, at, false)
    }

    pub fn caret(&self) -> usize {
        if self.caret_at_start {
            self.start
        } else {
            self.end
        }
    }

    pub fn anchor(&self) -> usize {
        if self.caret_at_start {
            self.end
        } else {
            self.start
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// The editing engine. Line views read it; input bindings drive it.
pub struct TextBoxController {
    runes: Vec<char>,
    line_starts: Vec<usize>,
    line_ends: Vec<usize>,
    selections: Vec<Selection>,
    history: Vec<Vec<Selection>>,
    history_index: usize,
    store_next_edit: bool,
    /// Fired after every text mutation with the splice list that made it.
    pub on_text_changed: Event<Vec<TextEdit>>,
    /// Fired whenever the selection list changes for any reason.
    pub on_selection_changed: Event<()>,
}

impl Default for TextBoxController {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBoxController {
    pub fn new() -> Self {
        let mut this = Self {
            runes: Vec::new(),
            line_starts: Vec::new(),
            line_ends: Vec::new(),
            selections: vec![Selection::caret_only(0)],
            history: Vec::new(),
            history_index: 0,
            store_next_edit: false,
            on_text_changed: Event::new(),
            on_selection_changed: Event::new(),
        };
        this.recompute_lines();
        this
    }

    pub fn from_text(text: &str) -> Self {
        let mut this = Self::new();
        this.runes = text.chars().collect();
        this.recompute_lines();
        this
    }

    // ---- text access ----

    pub fn text(&self) -> String {
        self.runes.iter().collect()
    }

    pub fn runes(&self) -> &[char] {
        &self.runes
    }

    pub fn rune_count(&self) -> usize {
        self.runes.len()
    }

    /// Text covered by `selection`.
    pub fn selection_text(&self, selection: &Selection) -> String {
        self.runes[selection.start..selection.end].iter().collect()
    }

    // ---- line structure ----

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// First rune index of line `line`.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts[line]
    }

    /// One past the last rune of line `line`, excluding the newline.
    pub fn line_end(&self, line: usize) -> usize {
        self.line_ends[line]
    }

    /// Line containing rune index `index`; `index == len` maps to the
    /// last line.
    pub fn line_at(&self, index: usize) -> usize {
        match self.line_starts.binary_search(&index) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    pub fn line_text(&self, line: usize) -> String {
        self.runes[self.line_starts[line]..self.line_ends[line]]
            .iter()
            .collect()
    }

    fn recompute_lines(&mut self) {
        self.line_starts.clear();
        self.line_ends.clear();
        self.line_starts.push(0);
        for (i, &r) in self.runes.iter().enumerate() {
            if r == '\n' {
                self.line_ends.push(i);
                self.line_starts.push(i + 1);
            }
        }
        self.line_ends.push(self.runes.len());
    }

    // ---- selections ----

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn set_caret(&mut self, at: usize) {
        self.set_selections(vec![Selection::caret_only(at.min(self.runes.len()))]);
    }

    pub fn set_carets(&mut self, carets: &[usize]) {
        let len = self.runes.len();
        self.set_selections(
            carets
                .iter()
                .map(|&c| Selection::caret_only(c.min(len)))
                .collect(),
        );
    }

    /// Replaces the selection list. Panics on an empty list; sorts and
    /// merges overlaps.
    pub fn set_selections(&mut self, selections: Vec<Selection>) {
        assert!(!selections.is_empty(), "a text box always has a selection");
        self.selections = selections;
        self.normalize_selections();
        self.store_next_edit = true;
        self.on_selection_changed.emit(&());
    }

    pub fn select_all(&mut self) {
        let len = self.runes.len();
        self.set_selections(vec![Selection::new(0, len, false)]);
    }

    /// Sorts by start, merges overlapping ranges and coincident carets,
    /// and drops the caret side of anything empty.
    fn normalize_selections(&mut self) {
        let len = self.runes.len();
        for sel in &mut self.selections {
            sel.start = sel.start.min(len);
            sel.end = sel.end.min(len);
            if sel.is_empty() {
                sel.caret_at_start = false;
            }
        }
        self.selections.sort_by_key(|s| (s.start, s.end));
        let mut merged: Vec<Selection> = Vec::with_capacity(self.selections.len());
        // A caret on the edge of another selection is redundant; distinct
        // ranges may still touch at an endpoint.
        fn absorbs(prev: &Selection, next: &Selection) -> bool {
            next.start < prev.end
                || (next.is_empty() && next.start == prev.end)
                || (prev.is_empty() && prev.start == next.start)
        }
        for sel in self.selections.drain(..) {
            match merged.last_mut() {
                Some(prev) if absorbs(prev, &sel) => {
                    prev.end = prev.end.max(sel.end);
                    if prev.is_empty() {
                        prev.caret_at_start = false;
                    }
                }
                _ => merged.push(sel),
            }
        }
        self.selections = merged;
    }

    // ---- motion primitives ----

    pub fn index_left(&self, index: usize) -> usize {
        index.saturating_sub(1)
    }

    pub fn index_right(&self, index: usize) -> usize {
        (index + 1).min(self.runes.len())
    }

    /// Start of the word run left of `index`: skips separators, then the
    /// word itself.
    pub fn index_word_left(&self, index: usize) -> usize {
        let mut i = index;
        while i > 0 && !is_word_rune(self.runes[i - 1]) {
            i -= 1;
        }
        while i > 0 && is_word_rune(self.runes[i - 1]) {
            i -= 1;
        }
        i
    }

    /// End of the word run right of `index`, past trailing separators.
    pub fn index_word_right(&self, index: usize) -> usize {
        let len = self.runes.len();
        let mut i = index;
        while i < len && !is_word_rune(self.runes[i]) {
            i += 1;
        }
        while i < len && is_word_rune(self.runes[i]) {
            i += 1;
        }
        i
    }

    /// Same column one line up, clamped to that line's end.
    pub fn index_up(&self, index: usize) -> usize {
        let line = self.line_at(index);
        if line == 0 {
            return index;
        }
        let column = index - self.line_starts[line];
        (self.line_starts[line - 1] + column).min(self.line_ends[line - 1])
    }

    /// Same column one line down, clamped to that line's end.
    pub fn index_down(&self, index: usize) -> usize {
        let line = self.line_at(index);
        if line + 1 == self.line_count() {
            return index;
        }
        let column = index - self.line_starts[line];
        (self.line_starts[line + 1] + column).min(self.line_ends[line + 1])
    }

    pub fn index_home(&self, index: usize) -> usize {
        self.line_starts[self.line_at(index)]
    }

    pub fn index_end(&self, index: usize) -> usize {
        self.line_ends[self.line_at(index)]
    }

    pub fn index_first(&self, _index: usize) -> usize {
        0
    }

    pub fn index_last(&self, _index: usize) -> usize {
        self.runes.len()
    }

    // ---- selection macros ----

    /// Collapses every selection to `f(caret)`.
    pub fn move_selections(&mut self, f: impl Fn(&TextBoxController, usize) -> usize) {
        let moved: Vec<Selection> = self
            .selections
            .iter()
            .map(|s| Selection::caret_only(f(self, s.caret())))
            .collect();
        self.selections = moved;
        self.normalize_selections();
        self.store_next_edit = true;
        self.on_selection_changed.emit(&());
    }

    /// Moves every selection's caret end to `f(caret)`; the anchor stays.
    /// A caret crossing its anchor flips sides.
    pub fn grow_selections(&mut self, f: impl Fn(&TextBoxController, usize) -> usize) {
        let grown: Vec<Selection> = self
            .selections
            .iter()
            .map(|s| {
                let anchor = s.anchor();
                let caret = f(self, s.caret());
                if caret < anchor {
                    Selection::new(caret, anchor, true)
                } else {
                    Selection::new(anchor, caret, false)
                }
            })
            .collect();
        self.selections = grown;
        self.normalize_selections();
        self.store_next_edit = true;
        self.on_selection_changed.emit(&());
    }

    /// Adds a collapsed selection at `f(caret)` per existing caret. The
    /// originals stay; coincident carets merge away.
    pub fn add_carets(&mut self, f: impl Fn(&TextBoxController, usize) -> usize) {
        let added: Vec<Selection> = self
            .selections
            .iter()
            .map(|s| Selection::caret_only(f(self, s.caret())))
            .collect();
        self.selections.extend(added);
        self.normalize_selections();
        self.store_next_edit = true;
        self.on_selection_changed.emit(&());
    }

    // ---- edits ----

    /// Splices the rune array and returns the edit record. Indices are
    /// pre-edit coordinates.
    fn splice(&mut self, at: usize, removed: usize, inserted: &[char]) -> TextEdit {
        self.runes.splice(at..at + removed, inserted.iter().copied());
        TextEdit {
            at,
            delta: inserted.len() as isize - removed as isize,
        }
    }

    /// Removes selected ranges, or the rune right of each empty caret.
    pub fn delete(&mut self) {
        let mut edits = Vec::new();
        for sel in self.selections.clone().into_iter().rev() {
            if sel.is_empty() {
                if sel.end < self.runes.len() {
                    edits.push(self.splice(sel.end, 1, &[]));
                }
            } else {
                edits.push(self.splice(sel.start, sel.len(), &[]));
            }
        }
        self.finish_edits(edits);
    }

    /// Removes selected ranges, or the rune left of each empty caret.
    pub fn backspace(&mut self) {
        let mut edits = Vec::new();
        for sel in self.selections.clone().into_iter().rev() {
            if sel.is_empty() {
                if sel.start > 0 {
                    edits.push(self.splice(sel.start - 1, 1, &[]));
                }
            } else {
                edits.push(self.splice(sel.start, sel.len(), &[]));
            }
        }
        self.finish_edits(edits);
    }

    /// Replaces every selection with `f`'s output, right-to-left. `f`
    /// sees the pre-edit rune array and the selection it is replacing.
    pub fn replace(&mut self, f: impl Fn(&[char], Selection) -> Vec<char>) {
        let mut edits = Vec::new();
        for sel in self.selections.clone().into_iter().rev() {
            let inserted = f(&self.runes, sel);
            edits.push(self.splice(sel.start, sel.len(), &inserted));
        }
        self.finish_edits(edits);
    }

    pub fn replace_all(&mut self, text: &str) {
        let runes: Vec<char> = text.chars().collect();
        self.replace(move |_, _| runes.clone());
    }

    pub fn replace_all_runes(&mut self, runes: &[char]) {
        let runes = runes.to_vec();
        self.replace(move |_, _| runes.clone());
    }

    pub fn replace_with_newline(&mut self) {
        self.replace(|_, _| vec!['\n']);
    }

    /// Newline plus a copy of the current line's leading whitespace.
    pub fn replace_with_newline_keep_indent(&mut self) {
        self.replace(|runes, sel| {
            let line_start = runes[..sel.start]
                .iter()
                .rposition(|&r| r == '\n')
                .map_or(0, |i| i + 1);
            let mut out = vec!['\n'];
            out.extend(
                runes[line_start..sel.start]
                    .iter()
                    .take_while(|&&r| r == ' ' || r == '\t')
                    .copied(),
            );
            out
        });
    }

    /// Inserts `tab_width` spaces at the start of every line any
    /// selection touches. Lines shared between selections indent once.
    pub fn indent_selection(&mut self, tab_width: usize) {
        let lines = self.selected_lines();
        let spaces = vec![' '; tab_width];
        let mut edits = Vec::new();
        for line in lines.into_iter().rev() {
            edits.push(self.splice(self.line_starts[line], 0, &spaces));
        }
        self.finish_edits(edits);
    }

    /// Removes up to `tab_width` leading spaces from every selected line.
    pub fn unindent_selection(&mut self, tab_width: usize) {
        let lines = self.selected_lines();
        let mut edits = Vec::new();
        for line in lines.into_iter().rev() {
            let start = self.line_starts[line];
            let end = self.line_ends[line];
            let leading = self.runes[start..end]
                .iter()
                .take_while(|&&r| r == ' ')
                .count()
                .min(tab_width);
            if leading > 0 {
                edits.push(self.splice(start, leading, &[]));
            }
        }
        self.finish_edits(edits);
    }

    /// Ascending, deduplicated line indices touched by any selection.
    fn selected_lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self
            .selections
            .iter()
            .flat_map(|s| self.line_at(s.start)..=self.line_at(s.end))
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Replaces the whole text, clamping selections into the new bounds.
    pub fn set_text(&mut self, text: &str) {
        let old_len = self.runes.len() as isize;
        self.runes = text.chars().collect();
        let edit = TextEdit {
            at: 0,
            delta: self.runes.len() as isize - old_len,
        };
        self.recompute_lines();
        for sel in &mut self.selections {
            sel.start = sel.start.min(self.runes.len());
            sel.end = sel.end.min(self.runes.len());
        }
        self.normalize_selections();
        self.on_selection_changed.emit(&());
        self.on_text_changed.emit(&vec![edit]);
    }

    /// Books an edit batch: stores armed caret history, shifts the
    /// selections, and notifies listeners.
    fn finish_edits(&mut self, edits: Vec<TextEdit>) {
        if edits.is_empty() {
            return;
        }
        if self.store_next_edit {
            self.store_caret_locations();
            self.store_next_edit = false;
        }
        self.recompute_lines();
        self.update_selections_for_edits(&edits);
        tracing::trace!(edits = edits.len(), runes = self.runes.len(), "text edited");
        self.on_text_changed.emit(&edits);
    }

    /// Shifts every selection endpoint at or beyond each edit point by
    /// that edit's delta, floored at the edit point and clamped into the
    /// text. Edit `at`s are pre-batch coordinates, as `delete`/`replace`
    /// emit them.
    fn update_selections_for_edits(&mut self, edits: &[TextEdit]) {
        let len = self.runes.len();
        for sel in &mut self.selections {
            let mut start = sel.start as isize;
            let mut end = sel.end as isize;
            for edit in edits {
                let at = edit.at as isize;
                if start >= at {
                    start = (start + edit.delta).max(at);
                }
                if end >= at {
                    end = (end + edit.delta).max(at);
                }
            }
            sel.start = start.clamp(0, len as isize) as usize;
            sel.end = end.clamp(0, len as isize) as usize;
            if sel.end < sel.start {
                sel.end = sel.start;
            }
        }
        self.normalize_selections();
        self.on_selection_changed.emit(&());
    }

    // ---- caret history ----

    /// Pushes the current selections, truncating any redo tail.
    pub fn store_caret_locations(&mut self) {
        self.history.truncate(self.history_index);
        self.history.push(self.selections.clone());
        self.history_index = self.history.len();
    }

    pub fn restore_previous_selections(&mut self) {
        if self.history_index == 0 {
            return;
        }
        if self.history_index == self.history.len() {
            // First step back; keep the live carets reachable forward.
            self.history.push(self.selections.clone());
        }
        self.history_index -= 1;
        self.selections = self.history[self.history_index].clone();
        self.normalize_selections();
        self.on_selection_changed.emit(&());
    }

    pub fn restore_next_selections(&mut self) {
        if self.history_index + 1 >= self.history.len() {
            return;
        }
        self.history_index += 1;
        self.selections = self.history[self.history_index].clone();
        self.normalize_selections();
        self.on_selection_changed.emit(&());
    }
}

/// A rune is in a word iff it is a letter, number, or underscore.
pub fn is_word_rune(rune: char) -> bool {
    rune.is_alphanumeric() || rune == '_'
}
