//! Ride-request binary entry point.
//!
//! Drives one complete ride request against the simulated collaborators:
//! sign in, search, select the requested tier, confirm, sign out.

use std::process::ExitCode;
use std::sync::Arc;

use ride_request::cli::{self, Args};
use ride_request::config::Config;
use ride_request::{
    logging, Identity, InMemoryIdentityProvider, RideServices, SessionController,
};
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run 'ride-request --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::try_init_with_filter(config.log_filter()).ok();
    info!("ride-request v{}", env!("CARGO_PKG_VERSION"));

    match run(&args, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, config: &Config) -> Result<(), BoxError> {
    let pickup = args.pickup.as_deref().ok_or("missing --pickup")?;
    let destination = args.destination.as_deref().ok_or("missing --destination")?;
    let sign_in = config.to_sign_in_config()?;

    let rider = Identity::new(args.user.clone()).with_email(args.user.clone());
    let identity = Arc::new(InMemoryIdentityProvider::new().auto_sign_in(rider));
    let rides = RideServices::from_shared(Arc::new(config.to_ride_service()));
    let controller = SessionController::init(identity, rides);

    if controller.restore_session().await?.is_none() {
        controller.present_sign_in(&sign_in).await?;
    }
    let ride = controller.ride().ok_or("sign-in did not complete")?;

    ride.set_pickup(pickup)?;
    ride.set_destination(destination)?;

    info!("Searching for rides from '{}' to '{}'", pickup, destination);
    ride.search().await?;

    let snapshot = ride.snapshot()?;
    println!("Available rides:");
    for option in snapshot.options() {
        println!("  [{}] {:<8} {}", option.id, option.tier, option.fare);
    }

    let choice = snapshot
        .options()
        .iter()
        .find(|option| option.tier == args.tier)
        .ok_or_else(|| format!("no {} ride available", args.tier))?;
    ride.select(choice.id)?;

    info!("Confirming {} ride for {}", choice.tier, choice.fare);
    ride.confirm().await?;

    if let Some(receipt) = ride.snapshot()?.receipt() {
        println!("Ride confirmed! Your driver is on the way.");
        println!("Booking reference: {}", receipt.reference);
    }

    ride.reset()?;
    controller.sign_out().await?;
    controller.teardown();
    Ok(())
}
