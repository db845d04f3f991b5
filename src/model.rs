use crate::error::{SchoolError, SchoolResult};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local calendar date used for fee defaults and overdue checks.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Loosely-typed form input, as sent by the front end: an object whose values
/// may be strings, numbers, booleans or null.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a>(pub &'a Value);

impl<'a> Fields<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn require(&self, key: &str) -> SchoolResult<&'a Value> {
        self.get(key)
            .ok_or_else(|| SchoolError::validation(key, "missing value"))
    }

    pub fn text(&self, key: &str) -> SchoolResult<String> {
        parse_text(key, self.require(key)?)
    }

    pub fn int(&self, key: &str) -> SchoolResult<i64> {
        parse_int(key, self.require(key)?)
    }

    pub fn float(&self, key: &str) -> SchoolResult<f64> {
        parse_float(key, self.require(key)?)
    }

    pub fn date(&self, key: &str) -> SchoolResult<NaiveDate> {
        parse_date(key, self.require(key)?)
    }

    /// Blank text counts as absent.
    pub fn optional_date(&self, key: &str) -> SchoolResult<Option<NaiveDate>> {
        match self.get(key) {
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(v) => parse_date(key, v).map(Some),
            None => Ok(None),
        }
    }

    /// Absent means `false`.
    pub fn flag(&self, key: &str) -> SchoolResult<bool> {
        match self.get(key) {
            Some(v) => parse_bool(key, v),
            None => Ok(false),
        }
    }

    pub fn flag_or(&self, key: &str, default: bool) -> SchoolResult<bool> {
        match self.get(key) {
            Some(v) => parse_bool(key, v),
            None => Ok(default),
        }
    }
}

pub fn parse_text(field: &str, v: &Value) -> SchoolResult<String> {
    match v {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(SchoolError::validation(field, "must be text")),
    }
}

pub fn parse_int(field: &str, v: &Value) -> SchoolResult<i64> {
    let bad = || SchoolError::validation(field, format!("must be an integer, got {}", v));
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Ok(f as i64)
                }
                _ => Err(bad()),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| bad()),
        _ => Err(bad()),
    }
}

pub fn parse_float(field: &str, v: &Value) -> SchoolResult<f64> {
    let bad = || SchoolError::validation(field, format!("must be a number, got {}", v));
    let f = match v {
        Value::Number(n) => n.as_f64().ok_or_else(bad)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| bad())?,
        _ => return Err(bad()),
    };
    // "nan" and "inf" parse as f64 but are never valid form input.
    if !f.is_finite() {
        return Err(bad());
    }
    Ok(f)
}

pub fn parse_bool(field: &str, v: &Value) -> SchoolResult<bool> {
    let bad = || SchoolError::validation(field, format!("must be true or false, got {}", v));
    match v {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(bad()),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" | "" => Ok(false),
            _ => Err(bad()),
        },
        Value::Null => Ok(false),
        _ => Err(bad()),
    }
}

pub fn parse_date(field: &str, v: &Value) -> SchoolResult<NaiveDate> {
    let Some(s) = v.as_str() else {
        return Err(SchoolError::validation(field, "must be a YYYY-MM-DD date"));
    };
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
        SchoolError::validation(field, format!("must be a YYYY-MM-DD date, got {:?}", s))
    })
}

/// A persisted entity together with its store-generated id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: i64,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub name: String,
    pub age: u32,
    pub grade: String,
}

impl Student {
    pub fn from_fields(f: Fields<'_>) -> SchoolResult<Self> {
        let name = f.text("name")?;
        if name.is_empty() {
            return Err(SchoolError::validation("name", "must not be empty"));
        }
        let age = f.int("age")?;
        let age = u32::try_from(age)
            .map_err(|_| SchoolError::validation("age", "must be a non-negative integer"))?;
        Ok(Self {
            name,
            age,
            grade: f.text("grade")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub name: String,
    pub subject: String,
}

impl Teacher {
    pub fn from_fields(f: Fields<'_>) -> SchoolResult<Self> {
        let name = f.text("name")?;
        if name.is_empty() {
            return Err(SchoolError::validation("name", "must not be empty"));
        }
        Ok(Self {
            name,
            subject: f.text("subject")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: i64,
    pub date: NaiveDate,
    pub present: bool,
}

impl AttendanceRecord {
    pub fn from_fields(f: Fields<'_>) -> SchoolResult<Self> {
        Ok(Self {
            student_id: f.int("studentId")?,
            date: f.date("date")?,
            // Unticked is sent explicitly; a missing flag means present.
            present: f.flag_or("present", true)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    pub student_id: i64,
    pub amount: f64,
    pub paid: bool,
    pub due_date: NaiveDate,
}

impl FeeRecord {
    pub fn from_fields(f: Fields<'_>) -> SchoolResult<Self> {
        Self::from_fields_on(f, today())
    }

    /// `due_date` falls back to `default_due` when omitted.
    pub fn from_fields_on(f: Fields<'_>, default_due: NaiveDate) -> SchoolResult<Self> {
        let amount = f.float("amount")?;
        if amount < 0.0 {
            return Err(SchoolError::validation("amount", "must not be negative"));
        }
        Ok(Self {
            student_id: f.int("studentId")?,
            amount,
            paid: f.flag("paid")?,
            due_date: f.optional_date("dueDate")?.unwrap_or(default_due),
        })
    }

    /// Strictly past due: a fee due `today` is not overdue yet.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        !self.paid && self.due_date < today
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_on(today())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub student_id: i64,
    pub subject: String,
    pub marks: f64,
}

impl Performance {
    pub fn from_fields(f: Fields<'_>) -> SchoolResult<Self> {
        Ok(Self {
            student_id: f.int("studentId")?,
            subject: f.text("subject")?,
            marks: f.float("marks")?,
        })
    }

    pub fn calculate_grade(&self) -> Grade {
        Grade::from_marks(self.marks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    #[serde(rename = "F")]
    F,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

/// Inclusive lower bounds, highest first.
const GRADE_BANDS: [(f64, Grade); 5] = [
    (90.0, Grade::APlus),
    (80.0, Grade::A),
    (70.0, Grade::B),
    (60.0, Grade::C),
    (50.0, Grade::D),
];

impl Grade {
    /// Total over every f64; NaN falls through to `F`.
    pub fn from_marks(marks: f64) -> Grade {
        GRADE_BANDS
            .iter()
            .find(|(floor, _)| marks >= *floor)
            .map(|(_, g)| *g)
            .unwrap_or(Grade::F)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
