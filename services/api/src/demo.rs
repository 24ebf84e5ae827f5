use crate::infra::{build_library, seed_catalog, seed_patrons, Library};
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use smart_library::clock::ManualClock;
use smart_library::error::AppError;
use smart_library::library::PatronId;
use smart_library::reports;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Date the demo library opens (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Days to let pass after the lending cycle before reporting overdue loans.
    #[arg(long, default_value_t = 20)]
    pub(crate) days_elapsed: u32,
    /// Recommendations to print per patron.
    #[arg(long, default_value_t = 5)]
    pub(crate) count: usize,
    /// Print the overdue report as CSV instead of a table.
    #[arg(long)]
    pub(crate) csv: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        days_elapsed,
        count,
        csv,
    } = args;

    let opened = match today {
        Some(date) => date
            .and_hms_opt(9, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now),
        None => Utc::now(),
    };
    let clock = Arc::new(ManualClock::new(opened));
    let (library, _audit) = build_library(clock.clone());

    println!("Smart Library demo ({})", opened.format("%Y-%m-%d"));
    let seeded = seed_catalog(&library)?;
    let readers = seed_patrons(&library)?;
    println!("- {seeded} items catalogued, {} patrons registered", readers.len());

    run_lending_cycle(&library, &readers)?;
    println!("\nLending cycle");
    for patron in library.patrons()? {
        println!(
            "- {}: {} active, {} returned",
            patron.full_name(),
            patron.active_loans().len(),
            patron.loan_history().len()
        );
    }

    clock.advance(Duration::days(i64::from(days_elapsed)));
    let overdue = library.overdue_report()?;
    println!("\nOverdue after {days_elapsed} more day(s)");
    if csv {
        print!("{}", reports::overdue_report(&overdue, library.now())?);
    } else if overdue.is_empty() {
        println!("- nothing overdue");
    } else {
        for notice in &overdue {
            println!(
                "- {} | {} | {} day(s) | penalty {}",
                notice.patron_name, notice.item_title, notice.overdue_days, notice.penalty
            );
        }
    }

    let recommendations = library.recommendations();
    for patron_id in &readers {
        let patron = library.patron(patron_id)?;
        println!(
            "\nRecommendations for {} (age {})",
            patron.full_name(),
            patron.age()
        );
        for recommendation in recommendations.recommend(patron_id, count)? {
            println!(
                "{:>2}. {} [{:.1}]",
                recommendation.rank,
                recommendation.item.title(),
                recommendation.score
            );
            if !recommendation.reasons.is_empty() {
                println!("    {}", recommendation.reasons.join("; "));
            }
        }
    }

    println!("\nTrending");
    for item in recommendations.trending(3)? {
        println!("- {} ({} checkouts)", item.title(), item.checkout_count());
    }

    Ok(())
}

/// Lend a few items, return one of them, and leave the rest outstanding.
fn run_lending_cycle(library: &Library, readers: &[PatronId]) -> Result<(), AppError> {
    let [teen, adult] = readers else {
        return Ok(());
    };

    library.checkout(teen, "978-1-250-30170-7")?;
    library.checkout(teen, "ISSN-0028-0836-2025-02")?;
    library.checkout(adult, "978-0-14-118704-4")?;
    library.checkout(adult, "THESIS-2019-HI-003")?;

    library.return_item(teen, "978-1-250-30170-7")?;
    library.return_item(adult, "978-0-14-118704-4")?;
    Ok(())
}
