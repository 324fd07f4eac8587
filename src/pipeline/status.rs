use chrono::{Months, NaiveDate};

use crate::domain::RegistrationStatus;

/// Two-year validity of a registration, in months.
const VALIDITY_MONTHS: u32 = 24;

/// Grace period after expiration during which renewal is still allowed.
const RENEWAL_WINDOW_MONTHS: u32 = 6;

/// Derives lifecycle state from the expiration date and a fixed
/// reference date.
///
/// The reference date is injected once at construction; a batch is
/// classified against a single "today" no matter how long the run takes.
pub struct StatusClassifier {
    today: NaiveDate,
}

impl StatusClassifier {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Expirations more than six months past are inactive; past ones
    /// still inside the window are due for renewal; everything else is
    /// current. The inactive check runs first, ahead of the broader
    /// renewal check that would otherwise swallow it.
    ///
    /// Both comparisons are strict: a registration expiring today is
    /// still `Ok`, and one exactly at the end of the window can still
    /// be renewed.
    pub fn classify(&self, expiration_date: NaiveDate) -> RegistrationStatus {
        let renewal_deadline = expiration_date
            .checked_add_months(Months::new(RENEWAL_WINDOW_MONTHS))
            .unwrap_or(NaiveDate::MAX);

        if renewal_deadline < self.today {
            return RegistrationStatus::Inactive;
        }
        if expiration_date < self.today {
            return RegistrationStatus::Renew;
        }
        RegistrationStatus::Ok
    }

    /// Registrations are valid for exactly two years, so the date the
    /// registration was made is the expiration minus that term. Month
    /// arithmetic clamps to the end of shorter months.
    pub fn registration_date(expiration_date: NaiveDate) -> NaiveDate {
        expiration_date
            .checked_sub_months(Months::new(VALIDITY_MONTHS))
            .unwrap_or(NaiveDate::MIN)
    }
}
