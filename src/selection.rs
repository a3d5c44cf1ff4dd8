// 🗓️ Year Selection - input of the chart callback

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Years offered by the multi-select control, and its initial value
pub const YEAR_OPTIONS: [i32; 4] = [2018, 2019, 2020, 2021];

/// YearSelection - ordered set of selected years
///
/// Ordered so that anything built from it iterates deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSelection {
    years: BTreeSet<i32>,
}

impl YearSelection {
    pub fn empty() -> Self {
        YearSelection::default()
    }

    pub fn from_years<I: IntoIterator<Item = i32>>(years: I) -> Self {
        YearSelection {
            years: years.into_iter().collect(),
        }
    }

    /// Every year the control offers
    pub fn all_options() -> Self {
        Self::from_years(YEAR_OPTIONS)
    }

    /// Parse a comma-separated list such as "2019,2020"
    ///
    /// Tokens that are not integers are dropped, so "2020,abc," is {2020}
    /// and "" is the empty selection.
    pub fn parse(raw: &str) -> Self {
        Self::from_years(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .filter_map(|token| token.parse::<i32>().ok()),
        )
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years.contains(&year)
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.iter().copied()
    }
}

impl FromIterator<i32> for YearSelection {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        Self::from_years(iter)
    }
}
