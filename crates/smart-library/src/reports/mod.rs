//! CSV exports rendered to in-memory strings.

use std::collections::BTreeMap;
use std::string::FromUtf8Error;

use chrono::{DateTime, NaiveDate, Utc};

use crate::library::{
    AuditEvent, AuditEventKind, CatalogItem, CategoryBreakdown, OverdueNotice, Patron,
};

#[derive(Debug)]
pub enum ReportError {
    Csv(csv::Error),
    Io(std::io::Error),
    Utf8(FromUtf8Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Csv(err) => write!(f, "failed to write CSV row: {}", err),
            ReportError::Io(err) => write!(f, "failed to flush CSV output: {}", err),
            ReportError::Utf8(err) => write!(f, "CSV output is not valid UTF-8: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Csv(err) => Some(err),
            ReportError::Io(err) => Some(err),
            ReportError::Utf8(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<FromUtf8Error> for ReportError {
    fn from(err: FromUtf8Error) -> Self {
        Self::Utf8(err)
    }
}

/// Media type every report is served with.
pub const MEDIA_TYPE: mime::Mime = mime::TEXT_CSV_UTF_8;

type CsvWriter = csv::Writer<Vec<u8>>;

/// Sections differ in width, so the writer is flexible.
fn render<F>(title: &str, generated_at: DateTime<Utc>, body: F) -> Result<String, ReportError>
where
    F: FnOnce(&mut CsvWriter) -> Result<(), csv::Error>,
{
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    writer.write_record([title])?;
    writer.write_record([
        "Generated At".to_string(),
        generated_at.format("%Y-%m-%d %H:%M").to_string(),
    ])?;
    body(&mut writer)?;

    let bytes = writer
        .into_inner()
        .map_err(|err| ReportError::Io(std::io::Error::new(err.error().kind(), err.to_string())))?;
    Ok(String::from_utf8(bytes)?)
}

/// Overdue loans with a closing count and penalty total.
pub fn overdue_report(
    notices: &[OverdueNotice],
    generated_at: DateTime<Utc>,
) -> Result<String, ReportError> {
    render("Overdue Report", generated_at, |writer| {
        writer.write_record(["Patron", "Item", "Overdue Days", "Penalty"])?;
        for notice in notices {
            writer.write_record([
                notice.patron_name.clone(),
                notice.item_title.clone(),
                notice.overdue_days.to_string(),
                notice.penalty.to_string(),
            ])?;
        }
        let total: u64 = notices.iter().map(|notice| notice.penalty).sum();
        writer.write_record(["Total Overdue".to_string(), notices.len().to_string()])?;
        writer.write_record(["Total Penalty".to_string(), total.to_string()])
    })
}

/// Items in the order given, ranked from one.
pub fn popular_items(
    items: &[CatalogItem],
    generated_at: DateTime<Utc>,
) -> Result<String, ReportError> {
    render("Most Popular Items", generated_at, |writer| {
        writer.write_record([
            "Rank", "Key", "Title", "Creator", "Category", "Checkouts", "Type",
        ])?;
        for (index, item) in items.iter().enumerate() {
            writer.write_record([
                (index + 1).to_string(),
                item.key().to_string(),
                item.title().to_string(),
                item.creator().to_string(),
                item.category().unwrap_or_default().to_string(),
                item.checkout_count().to_string(),
                item.kind().label().to_string(),
            ])?;
        }
        Ok(())
    })
}

pub fn patron_activity(
    patrons: &[Patron],
    generated_at: DateTime<Utc>,
) -> Result<String, ReportError> {
    render("Patron Activity", generated_at, |writer| {
        writer.write_record([
            "Name",
            "Email",
            "Age",
            "Total Loans",
            "Active Loans",
            "Favorite Categories",
        ])?;
        for patron in patrons {
            let active = patron.active_loans().len();
            let favorites: Vec<&str> = patron
                .favorite_categories()
                .iter()
                .map(String::as_str)
                .collect();
            writer.write_record([
                patron.full_name(),
                patron.details().email.clone(),
                patron.age().to_string(),
                (patron.loan_history().len() + active).to_string(),
                active.to_string(),
                favorites.join("; "),
            ])?;
        }
        Ok(())
    })
}

pub fn category_analysis(
    rows: &[CategoryBreakdown],
    generated_at: DateTime<Utc>,
) -> Result<String, ReportError> {
    render("Category Analysis", generated_at, |writer| {
        writer.write_record([
            "Category",
            "Items",
            "Checkouts",
            "Average Checkouts",
            "On Loan",
        ])?;
        for row in rows {
            writer.write_record([
                row.category.clone().unwrap_or_else(|| "Uncategorized".to_string()),
                row.items.to_string(),
                row.checkouts.to_string(),
                format!("{:.2}", row.average_checkouts),
                row.on_loan.to_string(),
            ])?;
        }
        Ok(())
    })
}

/// Event counts for one day followed by that day's timeline.
pub fn daily_activity(
    date: NaiveDate,
    counts: &BTreeMap<AuditEventKind, usize>,
    events: &[AuditEvent],
    generated_at: DateTime<Utc>,
) -> Result<String, ReportError> {
    render("Daily Activity", generated_at, |writer| {
        writer.write_record(["Date".to_string(), date.format("%Y-%m-%d").to_string()])?;
        writer.write_record(["Event", "Count"])?;
        for (kind, count) in counts {
            writer.write_record([kind.label().to_string(), count.to_string()])?;
        }
        writer.write_record(["Time", "Event", "Description"])?;
        for event in events {
            writer.write_record([
                event.recorded_at.format("%H:%M:%S").to_string(),
                event.kind.label().to_string(),
                event.description.clone(),
            ])?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::library::PatronId;

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 17, 30, 0).unwrap()
    }

    fn notice(title: &str, days: u32, penalty: u64) -> OverdueNotice {
        OverdueNotice {
            patron_id: PatronId("patron-000001".to_string()),
            patron_name: "Ada Reyes".to_string(),
            item_key: "bk-1".to_string(),
            item_title: title.to_string(),
            overdue_days: days,
            penalty,
        }
    }

    #[test]
    fn overdue_report_quotes_fields_and_totals_penalties() {
        let csv = overdue_report(
            &[notice("Salt, Sea and Stone", 4, 8), notice("Tides", 3, 3)],
            generated(),
        )
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Overdue Report");
        assert_eq!(lines[1], "Generated At,2025-06-02 17:30");
        assert_eq!(lines[2], "Patron,Item,Overdue Days,Penalty");
        assert_eq!(lines[3], "Ada Reyes,\"Salt, Sea and Stone\",4,8");
        assert_eq!(lines[5], "Total Overdue,2");
        assert_eq!(lines[6], "Total Penalty,11");
    }

    #[test]
    fn category_analysis_names_uncategorised_rows() {
        let csv = category_analysis(
            &[CategoryBreakdown {
                category: None,
                items: 3,
                checkouts: 10,
                average_checkouts: 10.0 / 3.0,
                on_loan: 1,
            }],
            generated(),
        )
        .unwrap();
        assert!(csv.lines().any(|line| line == "Uncategorized,3,10,3.33,1"));
    }

    #[test]
    fn daily_activity_lists_counts_then_timeline() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 6, 2, 9, 15, 0).unwrap();
        let counts = BTreeMap::from([(AuditEventKind::CheckedOut, 2)]);
        let events = vec![AuditEvent {
            kind: AuditEventKind::CheckedOut,
            description: "patron-000001 borrowed Tides".to_string(),
            recorded_at: at,
        }];

        let csv = daily_activity(date, &counts, &events, generated()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[2], "Date,2025-06-02");
        assert_eq!(lines[4], "CHECKED_OUT,2");
        assert_eq!(lines[6], "09:15:00,CHECKED_OUT,patron-000001 borrowed Tides");
    }
}
