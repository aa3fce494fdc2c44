use clap::Subcommand;
use eyerest_core::StatisticsLedger;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Completed rests today
    Today,
    /// Completed rests since Monday
    Week,
    /// Today, week, total and daily average
    All,
    /// Per-day counts for recent days, oldest first
    Recent {
        /// Number of days including today
        #[arg(long, default_value = "7")]
        days: u32,
    },
    /// Today's completions by hour of day
    Hourly,
    /// Erase all statistics
    Reset,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut ledger = StatisticsLedger::open_default();

    match action {
        StatsAction::Today => {
            println!("{}", ledger.today_count());
        }
        StatsAction::Week => {
            println!("{}", ledger.week_count());
        }
        StatsAction::All => {
            let summary = ledger.summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Recent { days } => {
            let records = ledger.recent_daily_records(days);
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        StatsAction::Hourly => {
            let hours = ledger.hourly_records();
            println!("{}", serde_json::to_string_pretty(&hours)?);
        }
        StatsAction::Reset => {
            ledger.reset()?;
            println!("statistics reset");
        }
    }
    Ok(())
}
