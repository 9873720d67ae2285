use bloodbank_core::report;
use bloodbank_core::*;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bloodbank")]
#[command(about = "Blood donation coordination: inventory, requests and donors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Acting user id
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    acting_as: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store with every blood type at zero
    Init,

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Inspect or update blood stock
    #[command(subcommand)]
    Inventory(InventoryCommand),

    /// Submit and review blood requests
    #[command(subcommand)]
    Request(RequestCommand),

    /// Donor profiles and donation scheduling
    #[command(subcommand)]
    Donor(DonorCommand),

    /// Show the acting user's notifications
    Notifications {
        #[command(subcommand)]
        action: Option<NotificationCommand>,

        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Export dashboard data to CSV
    Export {
        /// Inventory CSV destination
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// Requests CSV destination
        #[arg(long)]
        requests: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// donor, recipient or admin
        #[arg(long)]
        role: String,
    },
    /// List registered users
    List,
}

#[derive(Subcommand)]
enum InventoryCommand {
    /// Show stock for every blood type
    Show,
    /// Add stock (admin)
    Add { blood_type: String, quantity_ml: i64 },
    /// Remove stock (admin)
    Remove { blood_type: String, quantity_ml: i64 },
}

#[derive(Subcommand)]
enum RequestCommand {
    /// Submit a blood request (recipient)
    Submit {
        #[arg(long)]
        blood_type: String,
        #[arg(long)]
        quantity: i64,
        #[arg(long)]
        hospital: String,
        #[arg(long)]
        contact: String,
        #[arg(long)]
        emergency: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve a pending request (admin)
    Approve { id: String },
    /// Reject a pending request (admin)
    Reject { id: String },
    /// List requests: all for admins, own for recipients
    List {
        /// Only the pending review queue
        #[arg(long)]
        pending: bool,
    },
}

#[derive(Subcommand)]
enum DonorCommand {
    /// Create the acting donor's profile
    Create {
        #[arg(long)]
        blood_type: String,
        /// Last donation date (YYYY-MM-DD)
        #[arg(long)]
        last_donation: Option<String>,
        #[arg(long)]
        medical_conditions: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
    /// Show the acting donor's profile
    Show,
    /// Schedule a donation on a date (YYYY-MM-DD)
    Schedule { date: String },
    /// Search donors
    Search {
        #[arg(long)]
        blood_type: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
}

#[derive(Subcommand)]
enum NotificationCommand {
    /// Mark one notification read
    Read { id: String },
    /// Mark all notifications read
    ReadAll,
}

fn main() -> ExitCode {
    // Initialize logging
    bloodbank_core::logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is_business_rule() {
                tracing::error!("{}", e);
            }
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }
    let bank = BloodBank::open(config);
    let acting_as = cli.acting_as;
    let actor = || -> Result<Actor> {
        let id = acting_as
            .as_deref()
            .ok_or_else(|| Error::Validation("This command requires --as <USER_ID>".into()))?;
        bank.actor(id.parse()?)
    };

    match cli.command {
        Commands::Init => cmd_init(&bank),
        Commands::User(cmd) => cmd_user(&bank, cmd),
        Commands::Inventory(cmd) => cmd_inventory(&bank, cmd, actor),
        Commands::Request(cmd) => cmd_request(&bank, cmd, &actor()?),
        Commands::Donor(cmd) => cmd_donor(&bank, cmd, actor),
        Commands::Notifications { action, unread } => {
            cmd_notifications(&bank, action, unread, &actor()?)
        }
        Commands::Export {
            inventory,
            requests,
        } => cmd_export(&bank, inventory, requests, &actor()?),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("Invalid date {:?} (expected YYYY-MM-DD): {}", s, e)))
}

fn cmd_init(bank: &BloodBank) -> Result<()> {
    if bank.init()? {
        println!("✓ Initialized store at {}", bank.store().path().display());
    } else {
        println!("Store already initialized at {}", bank.store().path().display());
    }
    Ok(())
}

fn cmd_user(bank: &BloodBank, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Add {
            username,
            email,
            role,
        } => {
            let user = bank.register_user(&username, &email, role.parse()?)?;
            println!("✓ Registered {} {}", user.role, user.username);
            println!("  id: {}", user.id);
        }
        UserCommand::List => {
            for user in bank.users()? {
                println!("{}  {:<9} {} <{}>", user.id, user.role, user.username, user.email);
            }
        }
    }
    Ok(())
}

fn cmd_inventory<F>(bank: &BloodBank, cmd: InventoryCommand, actor: F) -> Result<()>
where
    F: Fn() -> Result<Actor>,
{
    let (blood_type, quantity_ml, operation) = match cmd {
        InventoryCommand::Show => {
            display_inventory(&bank.inventory()?);
            return Ok(());
        }
        InventoryCommand::Add {
            blood_type,
            quantity_ml,
        } => (blood_type, quantity_ml, InventoryOperation::Add),
        InventoryCommand::Remove {
            blood_type,
            quantity_ml,
        } => (blood_type, quantity_ml, InventoryOperation::Remove),
    };

    let entry = bank.update_inventory(&actor()?, blood_type.parse()?, quantity_ml, operation)?;
    println!(
        "✓ Inventory updated: {} now {}ml",
        entry.blood_type, entry.quantity_ml
    );
    Ok(())
}

fn display_inventory(entries: &[InventoryEntry]) {
    println!("Blood type   Quantity");
    for entry in entries {
        println!("  {:<9} {:>7}ml", entry.blood_type, entry.quantity_ml);
    }
}

fn cmd_request(bank: &BloodBank, cmd: RequestCommand, actor: &Actor) -> Result<()> {
    match cmd {
        RequestCommand::Submit {
            blood_type,
            quantity,
            hospital,
            contact,
            emergency,
            notes,
        } => {
            let fields = NewBloodRequest {
                blood_type: blood_type.parse()?,
                quantity_ml: quantity,
                hospital_name: hospital,
                contact_number: contact,
                emergency,
                notes,
            };
            let id = bank.submit_request(actor, fields)?;
            println!("✓ Blood request submitted");
            println!("  id: {}", id);
        }
        RequestCommand::Approve { id } => {
            bank.approve_request(actor, id.parse()?)?;
            println!("✓ Request {} approved", id);
        }
        RequestCommand::Reject { id } => {
            bank.reject_request(actor, id.parse()?)?;
            println!("✓ Request {} rejected", id);
        }
        RequestCommand::List { pending } => {
            let requests = match actor.role {
                Role::Admin if pending => bank.review_queue()?,
                Role::Admin => bank.all_requests()?,
                _ => {
                    let mut own = bank.requests_for_recipient(actor.user_id)?;
                    if pending {
                        own.retain(|r| r.status == RequestStatus::Pending);
                    }
                    own
                }
            };
            for request in &requests {
                display_request(request);
            }
            if requests.is_empty() {
                println!("No requests.");
            }
        }
    }
    Ok(())
}

fn display_request(request: &BloodRequest) {
    println!(
        "{}  {:<8} {:>4} {:>6}ml  {}{}",
        request.id,
        request.status,
        request.blood_type,
        request.quantity_ml,
        request.hospital_name,
        if request.emergency { "  [EMERGENCY]" } else { "" }
    );
}

fn cmd_donor<F>(bank: &BloodBank, cmd: DonorCommand, actor: F) -> Result<()>
where
    F: Fn() -> Result<Actor>,
{
    match cmd {
        DonorCommand::Create {
            blood_type,
            last_donation,
            medical_conditions,
            address,
            city,
            state,
            zip,
        } => {
            let fields = NewDonorProfile {
                blood_type: blood_type.parse()?,
                last_donation: last_donation.as_deref().map(parse_date).transpose()?,
                medical_conditions,
                address,
                city,
                state,
                zip_code: zip,
            };
            let profile = bank.create_donor_profile(&actor()?, fields)?;
            println!("✓ Donor profile created ({})", profile.blood_type);
        }
        DonorCommand::Show => {
            let actor = actor()?;
            let profile = bank.donor_profile(actor.user_id)?;
            display_donor(&profile);
            let window = bank.config().eligibility.window();
            if let Some(next) = window.next_eligible(profile.last_donation)? {
                println!("  Next eligible: {}", next);
            }
        }
        DonorCommand::Schedule { date } => {
            let schedule = bank.schedule_donation(&actor()?, parse_date(&date)?)?;
            println!("✓ Donation scheduled for {}", schedule.scheduled_date);
        }
        DonorCommand::Search {
            blood_type,
            city,
            state,
            zip,
        } => {
            let filter = DonorSearch {
                blood_type: blood_type.as_deref().map(str::parse::<BloodType>).transpose()?,
                city,
                state,
                zip_code: zip,
            };
            let donors = bank.search_donors(&filter)?;
            if donors.is_empty() {
                println!("No donors found.");
            }
            for profile in &donors {
                display_donor(profile);
            }
        }
    }
    Ok(())
}

fn display_donor(profile: &DonorProfile) {
    let location: Vec<&str> = [&profile.city, &profile.state, &profile.zip_code]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .collect();
    println!(
        "{}  {:>4}  donations: {}  last: {}  {}",
        profile.user_id,
        profile.blood_type,
        profile.total_donations,
        profile
            .last_donation
            .map(|d| d.date().to_string())
            .unwrap_or_else(|| "never".into()),
        location.join(", ")
    );
}

fn cmd_notifications(
    bank: &BloodBank,
    action: Option<NotificationCommand>,
    unread: bool,
    actor: &Actor,
) -> Result<()> {
    match action {
        Some(NotificationCommand::Read { id }) => {
            bank.mark_read(actor, id.parse()?)?;
            println!("✓ Notification marked read");
        }
        Some(NotificationCommand::ReadAll) => {
            let count = bank.mark_all_read(actor)?;
            println!("✓ Marked {} notifications read", count);
        }
        None => {
            let list = if unread {
                bank.list_unread(actor.user_id)?
            } else {
                bank.notifications_for(actor.user_id)?
            };
            if list.is_empty() {
                println!("No notifications.");
            }
            for n in &list {
                let marker = if n.read { " " } else { "*" };
                println!(
                    "{} {}  {}  {}",
                    marker,
                    n.id,
                    n.created_at.format("%Y-%m-%d %H:%M"),
                    n.message
                );
            }
        }
    }
    Ok(())
}

fn cmd_export(
    bank: &BloodBank,
    inventory: Option<PathBuf>,
    requests: Option<PathBuf>,
    actor: &Actor,
) -> Result<()> {
    if !actor.role.can_review_requests() {
        return Err(Error::Forbidden {
            role: actor.role,
            action: "export reports",
        });
    }
    if inventory.is_none() && requests.is_none() {
        return Err(Error::Validation(
            "Nothing to export: pass --inventory and/or --requests".into(),
        ));
    }

    if let Some(path) = inventory {
        let count = report::export_inventory_csv(&bank.inventory()?, &path)?;
        println!("✓ Exported {} inventory rows to {}", count, path.display());
    }
    if let Some(path) = requests {
        let count = report::export_requests_csv(&bank.all_requests()?, &path)?;
        println!("✓ Exported {} requests to {}", count, path.display());
    }
    Ok(())
}
