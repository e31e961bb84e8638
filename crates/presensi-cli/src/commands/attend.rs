use presensi_core::{DayState, Tracker};

pub fn check_in(employee: i64) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = Tracker::open()?;
    let outcome = tracker.check_in(employee)?;
    println!("Checked in at {}.", outcome.at.format("%H:%M:%S"));
    if outcome.late_minutes > 0 {
        println!("Late by {} minutes.", outcome.late_minutes);
    }
    Ok(())
}

pub fn check_out(employee: i64) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = Tracker::open()?;
    let outcome = tracker.check_out(employee)?;
    println!("Checked out at {}.", outcome.at.format("%H:%M:%S"));
    if outcome.overtime_minutes > 0 {
        println!("Overtime: {} minutes.", outcome.overtime_minutes);
    }
    if outcome.early_leave_minutes > 0 {
        println!("Left early by {} minutes.", outcome.early_leave_minutes);
    }
    Ok(())
}

pub fn status(employee: i64) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = Tracker::open()?;
    let today = tracker.today();

    match tracker.get_day_record(employee, today)? {
        None => println!("{today}: not checked in."),
        Some(day) => {
            let state = match day.state() {
                DayState::NoCheckIn => "not checked in",
                DayState::CheckedIn => "checked in",
                DayState::CheckedOut => "checked out",
            };
            println!("{today}: {state}.");
            if let Some(at) = day.check_in {
                println!("  in:  {}", at.format("%H:%M:%S"));
            }
            if let Some(at) = day.check_out {
                println!("  out: {}", at.format("%H:%M:%S"));
            }
            if day.late_minutes > 0 {
                println!("  late: {} min", day.late_minutes);
            }
            if day.overtime_minutes > 0 {
                println!("  overtime: {} min", day.overtime_minutes);
            }
            if day.early_leave_minutes > 0 {
                println!("  left early: {} min", day.early_leave_minutes);
            }
        }
    }

    if let Some(open) = tracker.get_active_break(employee)? {
        println!(
            "On a '{}' break since {} (scheduled {} min).",
            open.break_type,
            open.started_at.format("%H:%M:%S"),
            open.scheduled_minutes
        );
    }
    Ok(())
}
