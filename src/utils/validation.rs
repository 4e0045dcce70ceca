use crate::utils::datetime::{parse_slot_datetime, DATE_FORMAT, TIME_FORMAT};
use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveTime};

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(anyhow!("Email cannot be empty"));
    }

    if email.len() > 254 {
        return Err(anyhow!("Email is too long"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| anyhow!("Email must contain '@'"))?;

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(anyhow!("Email address looks incomplete"));
    }

    if email.contains(char::is_whitespace) {
        return Err(anyhow!("Email cannot contain spaces"));
    }

    Ok(())
}

pub fn validate_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| anyhow!("Invalid date, expected DD.MM.YYYY"))
}

pub fn validate_time(time: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| anyhow!("Invalid time, expected HH:MM"))
}

/// A parsed admin slot form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotForm {
    pub teacher: String,
    pub date: String,
    pub times: Vec<String>,
    /// Absent when the admin wants the teacher's default link.
    pub meeting_link: Option<String>,
}

/// Parse the multi-line slot form:
///
/// ```text
/// Teacher name
/// DD.MM.YYYY
/// HH:MM[, HH:MM, ...]
/// meeting link        (optional)
/// ```
pub fn parse_slot_form(text: &str) -> Result<SlotForm> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if lines.len() < 3 {
        return Err(anyhow!(
            "Need at least 3 lines: teacher, date and time(s)"
        ));
    }

    let teacher = lines[0].to_string();
    let date = lines[1].to_string();
    validate_date(&date)?;

    let times: Vec<String> = lines[2]
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if times.is_empty() {
        return Err(anyhow!("Must provide at least one time"));
    }

    for time in &times {
        validate_time(time)?;
        // Must parse the same way the reminder job will parse it later.
        parse_slot_datetime(&date, time)?;
    }

    let meeting_link = lines.get(3).map(|l| l.to_string());
    if let Some(link) = &meeting_link {
        if !link.starts_with("http") {
            return Err(anyhow!("Meeting link must be a URL"));
        }
    }

    Ok(SlotForm {
        teacher,
        date,
        times,
        meeting_link,
    })
}

/// Parse the two-line teacher form: name, then default meeting link.
pub fn parse_teacher_form(text: &str) -> Result<(String, String)> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    if lines.len() < 2 {
        return Err(anyhow!("Need 2 lines: name and default meeting link"));
    }

    if !lines[1].starts_with("http") {
        return Err(anyhow!("Meeting link must be a URL"));
    }

    Ok((lines[0].to_string(), lines[1].to_string()))
}
