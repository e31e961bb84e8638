use clap::Subcommand;
use presensi_core::Tracker;

#[derive(Subcommand)]
pub enum EmployeeAction {
    /// Register an employee, or refresh their name
    Register {
        /// Employee id
        id: i64,
        /// Full display name
        name: String,
        /// Chat username, if any
        #[arg(long)]
        username: Option<String>,
    },
    /// List all employees
    List,
    /// Update department, position or activation
    Update {
        /// Employee id
        id: i64,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Deactivate an employee (history is kept)
    Deactivate {
        /// Employee id
        id: i64,
    },
}

pub fn run(action: EmployeeAction) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = Tracker::open()?;
    match action {
        EmployeeAction::Register { id, name, username } => {
            tracker.register_employee(id, username.as_deref(), &name)?;
            println!("Registered employee {id}: {name}");
        }
        EmployeeAction::List => {
            for emp in tracker.list_employees()? {
                let flag = if emp.is_active { "" } else { " (inactive)" };
                let username = emp
                    .username
                    .map(|u| format!(" @{u}"))
                    .unwrap_or_default();
                println!(
                    "{:>6}  {}{username}{flag}  {} {}",
                    emp.id, emp.full_name, emp.department, emp.position
                );
            }
        }
        EmployeeAction::Update {
            id,
            department,
            position,
            active,
        } => {
            let found = tracker.update_employee(
                id,
                department.as_deref(),
                position.as_deref(),
                active,
            )?;
            if found {
                println!("Updated employee {id}.");
            } else {
                return Err(format!("no employee with id {id}").into());
            }
        }
        EmployeeAction::Deactivate { id } => {
            if tracker.deactivate_employee(id)? {
                println!("Deactivated employee {id}.");
            } else {
                return Err(format!("no employee with id {id}").into());
            }
        }
    }
    Ok(())
}
