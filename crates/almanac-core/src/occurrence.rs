use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::Moment;

/// A scheduled event instance as seen by the period algebra.
///
/// Periods only read the start to decide membership; `finish` feeds the
/// calendar bounds reported by the views.
pub trait Occurrence {
    fn start(&self) -> Moment;

    fn finish(&self) -> Option<Moment> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scheduled {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    #[serde(default)]
    pub title: String,

    pub start: DateTime<Utc>,

    pub finish: DateTime<Utc>,
}

impl Scheduled {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, finish: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            start,
            finish,
        }
    }

    pub fn interval(&self) -> Duration {
        self.finish - self.start
    }
}

impl Occurrence for Scheduled {
    fn start(&self) -> Moment {
        Moment::Instant(self.start)
    }

    fn finish(&self) -> Option<Moment> {
        Some(Moment::Instant(self.finish))
    }
}

#[tracing::instrument]
pub fn load_occurrences(path: &Path) -> anyhow::Result<Vec<Scheduled>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read occurrences from {}", path.display()))?;
    let mut occurrences: Vec<Scheduled> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse occurrences in {}", path.display()))?;
    if let Some(bad) = occurrences
        .iter()
        .find(|occurrence| occurrence.interval() < Duration::zero())
    {
        bail!(
            "occurrence {:?} in {} finishes before it starts",
            bad.title,
            path.display()
        );
    }
    occurrences.sort_by_key(|occurrence| occurrence.start);
    tracing::debug!(count = occurrences.len(), "loaded occurrences");
    Ok(occurrences)
}
