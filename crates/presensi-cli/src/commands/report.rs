use chrono::NaiveDate;
use clap::Subcommand;
use presensi_core::Tracker;

#[derive(Subcommand)]
pub enum ReportAction {
    /// Attendance report for one employee over a date range
    Range {
        /// Employee id
        #[arg(long)]
        employee: i64,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Who is in today
    Today,
    /// Aggregate system counters
    Stats,
    /// Export a period as JSON
    Export {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
        /// Output file
        #[arg(long)]
        out: std::path::PathBuf,
    },
}

pub fn run(action: ReportAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = Tracker::open()?;
    match action {
        ReportAction::Range {
            employee,
            from,
            to,
            json,
        } => {
            let report = tracker.attendance_report(employee, from, to)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            for day in &report.days {
                let check_in = day
                    .check_in
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into());
                let check_out = day
                    .check_out
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{}  in {check_in}  out {check_out}  late {}  overtime {}  early {}",
                    day.date, day.late_minutes, day.overtime_minutes, day.early_leave_minutes
                );
            }
            let t = &report.totals;
            println!(
                "total: {} days, late {} min, overtime {} min, early {} min",
                t.days_present, t.late_minutes, t.overtime_minutes, t.early_leave_minutes
            );
        }
        ReportAction::Today => {
            let rows = tracker.today_overview()?;
            if rows.is_empty() {
                println!("No attendance yet today.");
            }
            for row in rows {
                let check_in = row
                    .check_in
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into());
                let check_out = row
                    .check_out
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{}  in {check_in}  out {check_out}", row.employee_name);
            }
        }
        ReportAction::Stats => {
            let stats = tracker.system_stats()?;
            println!(
                "employees: {} ({} active)",
                stats.total_employees, stats.active_employees
            );
            println!(
                "attendance: {} today, {} total",
                stats.today_attendance, stats.total_attendance
            );
            println!(
                "breaks: {} today, {} total",
                stats.today_breaks, stats.total_breaks
            );
        }
        ReportAction::Export { from, to, out } => {
            let rows = tracker.export_rows(from, to)?;
            let file = std::fs::File::create(&out)?;
            serde_json::to_writer_pretty(file, &rows)?;
            println!("Exported {} rows to {}.", rows.len(), out.display());
        }
    }
    Ok(())
}
