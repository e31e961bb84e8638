use clap::Subcommand;
use presensi_core::Tracker;

#[derive(Subcommand)]
pub enum BreakAction {
    /// Start a break of the given type
    Start {
        /// Employee id
        #[arg(long)]
        employee: i64,
        /// Break type (unknown types get the default duration)
        break_type: String,
    },
    /// End the active break
    End {
        /// Employee id
        #[arg(long)]
        employee: i64,
    },
    /// Today's break counts per type
    Breakdown {
        /// Employee id
        #[arg(long)]
        employee: i64,
    },
}

pub fn run(action: BreakAction) -> Result<(), Box<dyn std::error::Error>> {
    // Reminder timers live inside the hosting process; a one-shot CLI
    // invocation records the break but drops the timer on exit. The chat
    // front end holds one Tracker for its whole lifetime.
    let tracker = Tracker::open()?;
    match action {
        BreakAction::Start {
            employee,
            break_type,
        } => {
            let started = tracker.start_break(employee, &break_type)?;
            log::warn!(
                "reminder at {} will not outlive this one-shot invocation",
                started.remind_at.format("%H:%M:%S")
            );
            println!(
                "Break '{}' started at {} ({} min scheduled, reminder at {}).",
                started.session.break_type,
                started.session.started_at.format("%H:%M:%S"),
                started.session.scheduled_minutes,
                started.remind_at.format("%H:%M:%S")
            );
        }
        BreakAction::End { employee } => {
            let ended = tracker.end_break(employee)?;
            println!(
                "Break '{}' ended after {:.1} minutes.",
                ended.break_type, ended.actual_minutes
            );
        }
        BreakAction::Breakdown { employee } => {
            let breakdown = tracker.break_breakdown(employee, tracker.today())?;
            if breakdown.is_empty() {
                println!("No breaks today.");
            }
            for (break_type, count) in breakdown {
                println!("{count}x {break_type}");
            }
        }
    }
    Ok(())
}
