//! Date recognition across token boundaries.
//!
//! Slash- or dash-separated dates collapse to a canonical `MM_DD_YYYY`
//! token in one step. Month names start a small state machine that
//! consumes a following day and year (`January 23rd 2013` becomes
//! `January`, `2013`, and `01_23_2013`).

use chrono::Datelike;
use regex::Regex;

use crate::analysis::filter::Filter;
use crate::analysis::token::Token;

const MONTHS: &[(&str, u32, &str)] = &[
    ("january", 1, "January"),
    ("jan", 1, "January"),
    ("february", 2, "February"),
    ("feb", 2, "February"),
    ("march", 3, "March"),
    ("mar", 3, "March"),
    ("april", 4, "April"),
    ("apr", 4, "April"),
    ("may", 5, "May"),
    ("june", 6, "June"),
    ("jun", 6, "June"),
    ("july", 7, "July"),
    ("jul", 7, "July"),
    ("august", 8, "August"),
    ("aug", 8, "August"),
    ("september", 9, "September"),
    ("sep", 9, "September"),
    ("october", 10, "October"),
    ("oct", 10, "October"),
    ("november", 11, "November"),
    ("nov", 11, "November"),
    ("december", 12, "December"),
    ("dec", 12, "December"),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Begin,
    Month,
    DayMonth,
}

pub struct DateFilter {
    date_pattern: Regex,
    state: State,
    month: Option<String>,
    day: Option<String>,
    year: Option<String>,
}

impl DateFilter {
    pub fn new() -> Self {
        DateFilter {
            date_pattern: Regex::new(
                r"^(1[0-2]|0[1-9]|[1-9])[-/]([0-3][0-9]|[0-9])[-/](\d{4}|\d{2})$",
            )
            .expect("date pattern"),
            state: State::Begin,
            month: None,
            day: None,
            year: None,
        }
    }

    fn reset(&mut self) {
        self.state = State::Begin;
        self.month = None;
        self.day = None;
        self.year = None;
    }

    fn date_repr(&self) -> String {
        format!(
            "{}_{}_{}",
            self.month.as_deref().unwrap_or("00"),
            self.day.as_deref().unwrap_or("00"),
            self.year.as_deref().unwrap_or("0000")
        )
    }

    /// Try `MM/DD/YYYY`-shaped tokens, all three parts in one token.
    fn try_match_date(&mut self, token: &Token) -> Option<Token> {
        let captures = self.date_pattern.captures(&token.text)?;

        let month: u32 = captures[1].parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        let day: u32 = captures[2].parse().ok()?;
        if !(1..=31).contains(&day) {
            return None;
        }
        let year: i32 = captures[3].parse().ok()?;

        self.month = Some(format!("{month:02}"));
        self.day = Some(format!("{day:02}"));

        let century = chrono::Utc::now().year() / 100;
        self.year = if year < 100 {
            if year <= century {
                Some(format!("{century:02}{year:02}"))
            } else {
                Some(format!("{:02}{year:02}", century - 1))
            }
        } else {
            Some(format!("{year:04}"))
        };

        Some(token.clone_with_text(self.date_repr()))
    }

    /// Month names and abbreviations. The returned token carries the full
    /// month name so it indexes separately from the collapsed date.
    fn try_match_month(&mut self, token: &Token) -> Option<Token> {
        let lowered = token.text.to_lowercase();
        let (_, number, full_name) = MONTHS.iter().find(|(name, _, _)| *name == lowered)?;
        self.month = Some(format!("{number:02}"));
        Some(token.clone_with_text(*full_name))
    }

    /// Day ordinals (`23`, `23rd`, `1st`). Consumed silently.
    fn try_match_day(&mut self, token: &Token) -> bool {
        let trimmed = token.text.trim_end_matches(['t', 'h', 's', 'r', 'd']);
        match trimmed.parse::<u32>() {
            Ok(n) if n > 0 && n < 31 => {
                self.day = Some(format!("{n:02}"));
                true
            }
            _ => false,
        }
    }

    fn try_match_year(&mut self, token: &Token) -> bool {
        match token.text.parse::<u32>() {
            Ok(n) => {
                self.year = Some(format!("{n:04}"));
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for DateFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for DateFilter {
    fn name(&self) -> &'static str {
        "dates"
    }

    fn apply(&mut self, token: Token) -> Vec<Token> {
        let mut out = Vec::with_capacity(2);

        loop {
            match self.state {
                State::Begin => {
                    if let Some(date) = self.try_match_date(&token) {
                        out.push(date);
                        self.reset();
                    } else if let Some(month) = self.try_match_month(&token) {
                        out.push(month);
                        self.state = State::Month;
                    } else {
                        out.push(token);
                    }
                    break;
                }

                State::Month => {
                    if self.try_match_day(&token) {
                        self.state = State::DayMonth;
                        break;
                    }
                    if self.try_match_year(&token) {
                        out.push(token.clone());
                        out.push(token.clone_with_text(self.date_repr()));
                        self.reset();
                        break;
                    }
                    // A bare month mention; pass the token along.
                    out.push(token);
                    self.reset();
                    break;
                }

                State::DayMonth => {
                    if self.try_match_year(&token) {
                        out.push(token.clone());
                        out.push(token.clone_with_text(self.date_repr()));
                        self.reset();
                        break;
                    }
                    // The date ended without a year; emit it and reprocess
                    // the current token from the top.
                    out.push(token.clone_with_text(self.date_repr()));
                    self.reset();
                }
            }
        }

        out
    }

    fn flush(&mut self) -> Vec<Token> {
        // A date cannot span documents.
        self.reset();
        Vec::new()
    }
}
