//! Dashboard counts over sets of forms.
use super::chain::FormStatus;
use super::error::ApprovalError;
use super::form::FormSubmission;
use chrono::{DateTime, Days, Months, NaiveTime, Utc};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormStats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    LastYear,
    All,
}

/// Filter for the admin report. `None` means "all" for that field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub window: TimeWindow,
    pub scope: Option<String>,
    pub form_name: Option<String>,
}

impl FormStats {
    pub fn tally<'a, I>(forms: I) -> Self
    where
        I: IntoIterator<Item = &'a FormSubmission>,
    {
        let mut stats = Self::default();
        for form in forms {
            stats.record(form.approvers.status());
        }
        stats
    }

    pub fn record(&mut self, status: FormStatus) {
        self.total += 1;
        match status {
            FormStatus::Approved => self.approved += 1,
            FormStatus::Rejected => self.rejected += 1,
            FormStatus::Pending => self.pending += 1,
        }
    }
}

impl TimeWindow {
    /// Inclusive bounds of the window relative to `now`; `None` for `All`.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start_of = |day: DateTime<Utc>| day.date_naive().and_time(NaiveTime::MIN).and_utc();
        let end_of = |day: DateTime<Utc>| {
            day.date_naive()
                .and_hms_milli_opt(23, 59, 59, 999)
                .map(|end| end.and_utc())
        };

        match self {
            TimeWindow::Today => Some((start_of(now), end_of(now)?)),
            TimeWindow::Yesterday => {
                let day = now.checked_sub_days(Days::new(1))?;
                Some((start_of(day), end_of(day)?))
            }
            TimeWindow::LastWeek => Some((now.checked_sub_days(Days::new(7))?, now)),
            TimeWindow::LastMonth => Some((now.checked_sub_months(Months::new(1))?, now)),
            TimeWindow::LastYear => Some((now.checked_sub_months(Months::new(12))?, now)),
            TimeWindow::All => None,
        }
    }
}

impl FromStr for TimeWindow {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(TimeWindow::Today),
            "yesterday" => Ok(TimeWindow::Yesterday),
            "lastWeek" => Ok(TimeWindow::LastWeek),
            "lastMonth" => Ok(TimeWindow::LastMonth),
            "lastYear" => Ok(TimeWindow::LastYear),
            "all" => Ok(TimeWindow::All),
            other => Err(ApprovalError::InvalidTimeWindow(other.to_string())),
        }
    }
}

impl StatsQuery {
    pub fn all() -> Self {
        Self {
            window: TimeWindow::All,
            scope: None,
            form_name: None,
        }
    }

    /// Parse the report's string filters, where `"all"` disables a filter.
    pub fn parse(window: &str, scope: &str, form_name: &str) -> Result<Self, ApprovalError> {
        let keep = |value: &str| (value != "all").then(|| value.to_string());
        Ok(Self {
            window: window.parse()?,
            scope: keep(scope),
            form_name: keep(form_name),
        })
    }

    pub fn matches(&self, form: &FormSubmission, now: DateTime<Utc>) -> bool {
        if let Some((start, end)) = self.window.bounds(now) {
            let date = form.date.to_datetime_utc();
            if date < start || date > end {
                return false;
            }
        }
        if self.scope.as_ref().is_some_and(|scope| scope != &form.scope) {
            return false;
        }
        if self.form_name.as_ref().is_some_and(|name| name != &form.form_name) {
            return false;
        }
        true
    }
}
