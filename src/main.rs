use chrono::Local;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use pill_alarm::config::AppConfig;
use pill_alarm::{
    DynError, Medicine, MedicineDb, MedicineListState, MedicineRepository, Schedule, SyncDb,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Keep track of medicines and their alarm schedules")]
struct Args {
    /// Path to config file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a new medicine
    Add {
        /// Medicine name
        #[arg(long)]
        name: String,

        /// Dosing instructions
        #[arg(long, default_value = "")]
        instructions: String,

        /// Path or URI of a photo of the pill
        #[arg(long)]
        image: Option<String>,

        /// Alarm as TIME=DAYS, e.g. "08:00 AM=1,3,5" (0 = Sunday). Repeatable.
        #[arg(long = "schedule")]
        schedules: Vec<Schedule>,

        /// Free-form advice text
        #[arg(long)]
        advice: Option<String>,
    },
    /// Print every saved medicine
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a medicine by id
    Delete {
        /// Medicine id as shown by `list`
        id: i64,
    },
    /// Print the medicine list every time it changes, until Ctrl-C
    Watch,
    /// Print when each medicine is next due
    Next,
}

fn main() -> Result<(), DynError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(database) = args.database {
        config.database_path = database;
    }
    config.validate()?;

    match args.command {
        Command::Add {
            name,
            instructions,
            image,
            schedules,
            advice,
        } => {
            let medicine = Medicine {
                image_ref: image,
                schedules,
                advice,
                ..Medicine::new(name, instructions)
            };
            add(&config, &medicine)
        }
        Command::List { json } => list(&config, json),
        Command::Delete { id } => delete(&config, id),
        Command::Watch => watch(&config),
        Command::Next => next(&config),
    }
}

fn add(config: &AppConfig, medicine: &Medicine) -> Result<(), DynError> {
    let db = SyncDb::connect(&config.database_path)?;
    let id = db.insert(medicine)?;
    info!("Saved '{}' with id {}", medicine.name, id);
    println!("{}", id);
    Ok(())
}

fn list(config: &AppConfig, json: bool) -> Result<(), DynError> {
    let db = SyncDb::connect(&config.database_path)?;
    let medicines = db.snapshot()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&medicines)?);
    } else {
        print_medicines(&medicines);
    }
    Ok(())
}

fn delete(config: &AppConfig, id: i64) -> Result<(), DynError> {
    let db = SyncDb::connect(&config.database_path)?;
    if db.delete_by_id(id)? == 0 {
        info!("No medicine with id {}", id);
    } else {
        info!("Deleted medicine {}", id);
    }
    Ok(())
}

fn next(config: &AppConfig) -> Result<(), DynError> {
    let db = SyncDb::connect(&config.database_path)?;
    let medicines = db.snapshot()?;
    if medicines.is_empty() {
        println!("No medicines saved yet.");
        return Ok(());
    }
    let now = Local::now().naive_local();
    for medicine in &medicines {
        match medicine.next_dose(now) {
            Some(due) => println!(
                "#{} {}: {}",
                medicine.id,
                medicine.name,
                due.format("%a %Y-%m-%d %I:%M %p")
            ),
            None => println!("#{} {}: no alarms", medicine.id, medicine.name),
        }
    }
    Ok(())
}

fn watch(config: &AppConfig) -> Result<(), DynError> {
    let runtime = tokio::runtime::Runtime::new()?;
    let database_path = config.database_path.clone();
    let grace: Duration = config.subscription_grace();

    runtime.block_on(async move {
        let db = MedicineDb::open(&database_path).await?;
        let state = MedicineListState::with_grace(MedicineRepository::new(db), grace);
        let mut observer = state.observe();

        loop {
            tokio::select! {
                changed = observer.changed() => {
                    print_medicines(&changed?);
                    println!("---");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping watch");
                    break;
                }
            }
        }
        Ok::<(), DynError>(())
    })
}

fn print_medicines(medicines: &[Medicine]) {
    if medicines.is_empty() {
        println!("No medicines saved yet.");
        return;
    }
    for medicine in medicines {
        println!("#{} {}", medicine.id, medicine.name);
        if !medicine.instructions.is_empty() {
            println!("    {}", medicine.instructions);
        }
        for schedule in &medicine.schedules {
            println!("    alarm: {}", schedule.describe());
        }
        if let Some(image) = &medicine.image_ref {
            println!("    image: {}", image);
        }
        if let Some(advice) = &medicine.advice {
            println!("    advice: {}", advice);
        }
    }
}
