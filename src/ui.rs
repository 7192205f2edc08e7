// Terminal layer: the prompter (choices in) and presenter (structured
// results out) the flows talk to, implemented with `dialoguer`,
// `indicatif` and `crossterm`. The flows never print or read anything
// themselves, which keeps them scriptable in tests.

use std::time::Duration;

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::api::{BookingDetails, CatalogClient};
use crate::flows::{self, FlowContext};

/// What came out of a selection prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the offered labels.
    Choice(usize),
    /// The user picked the navigation entry.
    Back,
    /// The user bailed out of the prompt entirely (Esc / q).
    Cancelled,
}

/// Collects user decisions. One implementation drives the real terminal;
/// tests script the answers.
pub trait Prompter {
    fn select(&mut self, message: &str, labels: &[String], navigation: bool) -> Result<Selection>;
    /// Fixed-length digit input. Invalid input re-prompts; an empty
    /// submission is the cancel gesture and comes back as `None`.
    fn digits(&mut self, message: &str, len: usize, error: &str) -> Result<Option<String>>;
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// One day of a room's schedule, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySchedule {
    pub date_name: String,
    pub week_name: String,
    pub slots: Vec<String>,
}

/// Receives structured results. The terminal implementation renders
/// tables and colored verdicts; tests record the calls.
pub trait Presenter {
    /// A network call is in flight; show something.
    fn working(&mut self, message: &str);
    /// The call finished; clear the indicator.
    fn done(&mut self);
    fn schedule_table(&mut self, days: &[DaySchedule]);
    fn booking_summary(&mut self, booking: &BookingDetails);
    fn lotto_outcome(&mut self, won: bool);
    /// A server-supplied message, shown verbatim.
    fn notice(&mut self, message: &str);
}

pub(crate) fn digits_ok(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

const BACK_LABEL: &str = "« Go back";

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn select(&mut self, message: &str, labels: &[String], navigation: bool) -> Result<Selection> {
        let mut items: Vec<&str> = labels.iter().map(String::as_str).collect();
        if navigation {
            items.push(BACK_LABEL);
        }

        // `interact_opt` is keyboard-driven: arrows + Enter to pick,
        // Esc or q to bail out.
        let picked = Select::new()
            .with_prompt(message)
            .items(&items)
            .default(0)
            .interact_opt()?;

        Ok(match picked {
            None => Selection::Cancelled,
            Some(i) if navigation && i == labels.len() => Selection::Back,
            Some(i) => Selection::Choice(i),
        })
    }

    fn digits(&mut self, message: &str, len: usize, error: &str) -> Result<Option<String>> {
        let error = error.to_string();
        let value: String = Input::new()
            .with_prompt(message)
            .allow_empty(true)
            .validate_with(move |input: &String| -> Result<(), String> {
                if input.is_empty() || digits_ok(input, len) {
                    Ok(())
                } else {
                    Err(error.clone())
                }
            })
            .interact_text()?;

        Ok(if value.is_empty() { None } else { Some(value) })
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()?)
    }
}

pub struct TerminalPresenter {
    spinner: Option<ProgressBar>,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        TerminalPresenter { spinner: None }
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        TerminalPresenter::new()
    }
}

impl Presenter for TerminalPresenter {
    fn working(&mut self, message: &str) {
        self.done();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn done(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn schedule_table(&mut self, days: &[DaySchedule]) {
        let rows: Vec<Vec<String>> = days
            .iter()
            .map(|day| {
                vec![
                    day.date_name.clone(),
                    day.week_name.clone(),
                    day.slots.join(", "),
                ]
            })
            .collect();
        println!("\n{}\n", render_grid(&["Date", "Day", "Free slots"], &rows));
    }

    fn booking_summary(&mut self, booking: &BookingDetails) {
        let rows = [
            (
                "Person",
                format!("{} {}", booking.first_name, booking.last_name),
            ),
            ("Birth year", plain(&booking.birth_year)),
            ("Personal number", booking.personal_id.clone()),
            ("Phone", booking.phone.clone()),
            ("", String::new()),
            ("Service", booking.test_name.clone()),
            ("Facility", booking.branch_name.clone()),
            ("Room", booking.room_number.clone()),
            ("Date/time", booking.schedule_date_name.clone()),
        ];

        println!();
        for (label, value) in rows {
            if label.is_empty() {
                println!();
            } else {
                println!("{label:<16} - \t{value}");
            }
        }
        println!();
    }

    fn lotto_outcome(&mut self, won: bool) {
        if won {
            println!("{}", "Congratulations, you won!".green());
        } else {
            println!("{}", "Unfortunately, you did not win.".red());
        }
    }

    fn notice(&mut self, message: &str) {
        println!("{}", message.red());
    }
}

/// Render a JSON scalar without the quotes a raw `to_string` would add.
fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Bordered grid in the PrettyTable spirit: a rule around every row,
/// columns sized to their widest cell.
fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let rule = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let format_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (i, width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = width - cell.chars().count();
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(padding + 1));
            line.push('|');
        }
        line
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format_row(&header_cells));
    out.push('\n');
    out.push_str(&rule);
    for row in rows {
        out.push('\n');
        out.push_str(&format_row(row));
        out.push('\n');
        out.push_str(&rule);
    }
    out
}

pub fn print_banner() {
    println!("__     __             _             _   _             ");
    println!(r"\ \   / /_ _  ___ ___(_)_ __   __ _| |_(_) ___  _ __  ");
    println!(r" \ \ / / _` |/ __/ __| | '_ \ / _` | __| |/ _ \| '_ \ ");
    println!(r"  \ V / (_| | (_| (__| | | | | (_| | |_| | (_) | | | |");
    println!(r"   \_/ \__,_|\___\___|_|_| |_|\__,_|\__|_|\___/|_| |_|");
    println!("\n     v{}\n", env!("CARGO_PKG_VERSION"));
}

/// Main interactive menu. Loops until the user chooses Exit or cancels;
/// every path out is a normal exit.
pub fn main_menu(api: &mut CatalogClient) -> Result<()> {
    let mut prompt = TerminalPrompter;
    let mut present = TerminalPresenter::new();

    loop {
        let items = [
            "Vaccination appointments",
            "Check a booking",
            "Lottery result",
            "Exit",
        ];
        let picked = Select::new()
            .with_prompt("Choose a service")
            .items(&items)
            .default(0)
            .interact_opt()?;

        let mut ctx = FlowContext {
            api: &mut *api,
            prompt: &mut prompt,
            present: &mut present,
        };
        match picked {
            Some(0) => flows::vaccination::run(&mut ctx)?,
            Some(1) => flows::check::run(&mut ctx)?,
            Some(2) => flows::lotto::run(&mut ctx)?,
            _ => break,
        }
    }
    Ok(())
}
