use chrono::{DateTime, Local};

/// One weight taken from the balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub grams: f64,
    pub timestamp: DateTime<Local>,
}

impl Reading {
    pub fn new(grams: f64, timestamp: DateTime<Local>) -> Self {
        Self { grams, timestamp }
    }

    pub fn now(grams: f64) -> Self {
        Self::new(grams, Local::now())
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} g", self.grams)
    }
}
