use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::config::CalendarConfig;
use crate::context::CalendarContext;
use crate::datetime::{parse_date_expr, week_anchor};
use crate::occurrence::Scheduled;
use crate::views::{
    CalendarBounds, OccurrenceFilter, ViewKind, ViewRequest, build_view, prefilter,
};

/// Everything a command needs, resolved once per run.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: CalendarConfig,
    pub ctx: CalendarContext,
    pub occurrences: Vec<Scheduled>,
    pub now: DateTime<Utc>,
}

impl Session {
    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(self.ctx.timezone()).date_naive()
    }
}

/// A subcommand reduced to the view it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewQuery {
    kind: ViewKind,
    date: Option<String>,
    week: Option<(Option<i32>, u32)>,
    filter: Option<OccurrenceFilter>,
    agenda_page: Option<usize>,
}

impl From<&Command> for ViewQuery {
    fn from(command: &Command) -> Self {
        let simple = |kind, args: &crate::cli::ViewArgs| Self {
            kind,
            date: args.date.clone(),
            week: None,
            filter: args.filter.filter,
            agenda_page: None,
        };
        match command {
            Command::Year(args) => simple(ViewKind::Year, args),
            Command::TriMonth(args) => simple(ViewKind::TriMonth, args),
            Command::Month(args) => simple(ViewKind::Month, args),
            Command::Day(args) => simple(ViewKind::Day, args),
            Command::Week(args) => Self {
                kind: ViewKind::Week,
                date: args.date.clone(),
                week: args.number.map(|number| (args.year, number)),
                filter: args.filter.filter,
                agenda_page: None,
            },
            Command::Today(args) => Self {
                kind: ViewKind::Day,
                date: None,
                week: None,
                filter: args.filter,
                agenda_page: None,
            },
            Command::Agenda(args) => Self {
                kind: args.view,
                date: args.date.clone(),
                week: None,
                filter: args.filter.filter,
                agenda_page: Some(args.page),
            },
        }
    }
}

#[instrument(skip(session, command))]
pub fn dispatch(session: &Session, command: &Command) -> anyhow::Result<Value> {
    let query = ViewQuery::from(command);
    debug!(?query, "dispatching command");

    let date = resolve_date(session, &query)?;
    let request = ViewRequest {
        kind: query.kind,
        date,
        policy: session.config.policy(),
        agenda: query.agenda_page,
        page_size: session.config.agenda_page_size(),
    };

    let pool = prefilter(
        &session.occurrences,
        query.filter,
        request.policy,
        session.now,
        &session.ctx,
    );
    let bounds = CalendarBounds::of(&session.occurrences, &session.ctx);
    let output = build_view(request, &pool, bounds, &session.ctx)?;

    info!(
        view = query.kind.as_key(),
        period = %output.period.label,
        occurrences = output.period.occurrences.len(),
        "view rendered"
    );
    serde_json::to_value(&output).context("failed to serialize view")
}

fn resolve_date(session: &Session, query: &ViewQuery) -> anyhow::Result<NaiveDate> {
    if let Some((year, number)) = query.week {
        let year = year.unwrap_or_else(|| session.today().year());
        return week_anchor(year, number, session.ctx.first_weekday());
    }

    let Some(expr) = query.date.as_deref() else {
        return Ok(session.today());
    };

    let tz = session.ctx.timezone();
    let moment = parse_date_expr(expr, session.now, tz)
        .with_context(|| format!("invalid date for {} view", query.kind.as_key()))?;
    moment
        .civil(tz)
        .map(|civil| civil.date())
        .ok_or_else(|| anyhow!("'{expr}' has no calendar date"))
}
