//! Raw-mode terminal selection menu.
//!
//! The interactive implementation of the prompter capability: an inline
//! list with arrow-key movement, incremental filtering, and paging. Esc or
//! the Cancel row dismisses the menu, which is a distinct outcome from any
//! choice. Raw mode is always released, including on the error path.

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use modops_core::{PromptError, PromptOptions, Prompter, Selection};
use std::io::{Write, stdout};

const CANCEL_LABEL: &str = "Cancel";

/// Interactive prompter backed by the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn select(
        &self,
        title: &str,
        choices: &[String],
        options: &PromptOptions,
    ) -> Result<Selection, PromptError> {
        terminal::enable_raw_mode()?;
        let result = run_menu(title, choices, options);
        // Release the terminal no matter how the menu ended.
        terminal::disable_raw_mode()?;
        result
    }
}

struct MenuState<'a> {
    choices: &'a [String],
    options: &'a PromptOptions,
    query: String,
    cursor: usize,
    offset: usize,
    drawn_lines: u16,
}

impl<'a> MenuState<'a> {
    fn new(choices: &'a [String], options: &'a PromptOptions) -> Self {
        Self {
            choices,
            options,
            query: String::new(),
            cursor: 0,
            offset: 0,
            drawn_lines: 0,
        }
    }

    /// Entries currently visible to the cursor: the filtered choices plus
    /// the Cancel row when permitted.
    fn entries(&self) -> Vec<&'a str> {
        let mut entries: Vec<&'a str> = self
            .choices
            .iter()
            .filter(|choice| {
                self.query.is_empty()
                    || choice.to_lowercase().contains(&self.query.to_lowercase())
            })
            .map(String::as_str)
            .collect();
        if self.options.allow_cancel {
            entries.push(CANCEL_LABEL);
        }
        entries
    }

    fn move_cursor(&mut self, delta: isize, entry_count: usize) {
        if entry_count == 0 {
            self.cursor = 0;
            return;
        }
        let last = entry_count - 1;
        self.cursor = match delta {
            d if d < 0 => self.cursor.saturating_sub(d.unsigned_abs()),
            d => self.cursor.saturating_add(d.unsigned_abs()).min(last),
        };
        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        if self.cursor >= self.offset + self.options.page_size {
            self.offset = self.cursor + 1 - self.options.page_size;
        }
    }
}

fn run_menu(
    title: &str,
    choices: &[String],
    options: &PromptOptions,
) -> Result<Selection, PromptError> {
    let mut out = stdout();
    let mut state = MenuState::new(choices, options);

    loop {
        let entries = state.entries();
        if state.cursor >= entries.len() {
            state.cursor = entries.len().saturating_sub(1);
        }
        draw(&mut out, title, &mut state, &entries)?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Up => state.move_cursor(-1, entries.len()),
            KeyCode::Down => state.move_cursor(1, entries.len()),
            KeyCode::PageUp => state.move_cursor(-(options.page_size as isize), entries.len()),
            KeyCode::PageDown => state.move_cursor(options.page_size as isize, entries.len()),
            KeyCode::Enter => {
                let selection = match entries.get(state.cursor) {
                    Some(&entry) if options.allow_cancel && entry == CANCEL_LABEL => {
                        Selection::Cancelled
                    }
                    Some(&entry) => Selection::Choice(entry.to_string()),
                    None => continue,
                };
                erase(&mut out, &mut state)?;
                return Ok(selection);
            }
            KeyCode::Esc => {
                erase(&mut out, &mut state)?;
                return Ok(Selection::Cancelled);
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                erase(&mut out, &mut state)?;
                return Ok(Selection::Cancelled);
            }
            KeyCode::Backspace => {
                state.query.pop();
                state.cursor = 0;
                state.offset = 0;
            }
            KeyCode::Char(c) if options.filter => {
                state.query.push(c);
                state.cursor = 0;
                state.offset = 0;
            }
            _ => {}
        }
    }
}

fn draw(
    out: &mut impl Write,
    title: &str,
    state: &mut MenuState<'_>,
    entries: &[&str],
) -> Result<(), PromptError> {
    use crate::display::colors;

    if state.drawn_lines > 0 {
        queue!(out, MoveUp(state.drawn_lines), MoveToColumn(0))?;
        queue!(out, Clear(ClearType::FromCursorDown))?;
    }

    let header = if state.query.is_empty() {
        format!("{}{title}{}", colors::BOLD, colors::RESET)
    } else {
        format!(
            "{}{title}{} {}(filter: {}){}",
            colors::BOLD,
            colors::RESET,
            colors::DIM,
            state.query,
            colors::RESET
        )
    };
    write!(out, "{header}\r\n")?;

    let visible = entries
        .iter()
        .enumerate()
        .skip(state.offset)
        .take(state.options.page_size);
    let mut shown = 0u16;
    for (index, entry) in visible {
        if index == state.cursor {
            write!(out, "{}> {entry}{}\r\n", colors::CYAN, colors::RESET)?;
        } else {
            write!(out, "  {entry}\r\n")?;
        }
        shown += 1;
    }
    if entries.is_empty() {
        write!(out, "{}  (no matches){}\r\n", colors::DIM, colors::RESET)?;
        shown += 1;
    }

    out.flush()?;
    state.drawn_lines = shown + 1;
    Ok(())
}

fn erase(out: &mut impl Write, state: &mut MenuState<'_>) -> Result<(), PromptError> {
    if state.drawn_lines > 0 {
        queue!(out, MoveUp(state.drawn_lines), MoveToColumn(0))?;
        queue!(out, Clear(ClearType::FromCursorDown))?;
        out.flush()?;
        state.drawn_lines = 0;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn test_entries_include_cancel_row() {
        let all = choices(&["Alpha", "Beta"]);
        let options = PromptOptions::default();
        let state = MenuState::new(&all, &options);
        assert_eq!(state.entries(), ["Alpha", "Beta", "Cancel"]);
    }

    #[test]
    fn test_filter_narrows_entries() {
        let all = choices(&["Users", "Billing", "Orders"]);
        let options = PromptOptions::default();
        let mut state = MenuState::new(&all, &options);
        state.query = "ers".to_string();
        assert_eq!(state.entries(), ["Users", "Orders", "Cancel"]);
    }

    #[test]
    fn test_cursor_clamps_and_pages() {
        let all = choices(&["A", "B", "C", "D", "E"]);
        let options = PromptOptions {
            page_size: 2,
            ..PromptOptions::default()
        };
        let mut state = MenuState::new(&all, &options);
        let count = state.entries().len();

        state.move_cursor(-1, count);
        assert_eq!(state.cursor, 0);

        for _ in 0..10 {
            state.move_cursor(1, count);
        }
        assert_eq!(state.cursor, count - 1);
        // Window follows the cursor.
        assert_eq!(state.offset, count - options.page_size);
    }
}
