//! Communicator Service Client
//!
//! Connects to the server's world communicator and calls its methods.
//!
//! USAGE:
//!   communicator-client [OPTIONS] [OPERATION]
//!
//! EXAMPLES:
//!   communicator-client                  # Interactive mode
//!   communicator-client info             # Rank, size and name
//!   communicator-client "split 1"        # Derive a sub-communicator
//!   communicator-client --host 10.0.0.2  # Connect to remote server

mod common;

use std::io::{self, BufRead, Write};

use clap::Parser;
use common::*;
use remobj::{Interface, Orb, RmiError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "communicator-client")]
#[command(version)]
#[command(about = "Communicator client - calls methods on a remote communicator")]
#[command(
    long_about = "Connects to the world communicator of a communicator server.\n\n\
If no operation is provided, enters interactive mode.\n\n\
OPERATIONS:\n\
  info             Show rank, size and name\n\
  dup              Duplicate the communicator\n\
  split <color>    Derive a sub-communicator\n\
  create           Create a fresh communicator on the server\n\
  class            Show the communicator's class\n\n\
INTERACTIVE COMMANDS:\n\
  the operations above, plus\n\
  help             Show help\n\
  quit/exit        Disconnect and exit"
)]
struct Args {
    /// Host address to connect to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to connect to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Operation to perform (e.g., "split 1")
    #[arg(value_name = "OPERATION")]
    operation: Option<String>,

    /// Quiet mode - suppress informational output
    #[arg(short, long)]
    quiet: bool,
}

/// Parsed command line or interactive input
enum Operation {
    Info,
    Dup,
    Split(i32),
    Create,
    Class,
}

fn parse_operation(input: &str) -> Option<Operation> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    match parts.as_slice() {
        [op] if op.eq_ignore_ascii_case("info") => Some(Operation::Info),
        [op] if op.eq_ignore_ascii_case("dup") => Some(Operation::Dup),
        [op] if op.eq_ignore_ascii_case("create") => Some(Operation::Create),
        [op] if op.eq_ignore_ascii_case("class") => Some(Operation::Class),
        [op, color] if op.eq_ignore_ascii_case("split") => color.parse().ok().map(Operation::Split),
        _ => None,
    }
}

fn describe(comm: &Communicator) -> remobj::Result<String> {
    Ok(format!(
        "{} (rank {} of {})",
        comm.name()?,
        comm.rank()?,
        comm.size()?
    ))
}

fn execute_operation(
    orb: &Orb,
    endpoint: &str,
    world: &Communicator,
    op: Operation,
) -> remobj::Result<()> {
    match op {
        Operation::Info => println!("{}", describe(world)?),
        Operation::Dup => {
            let dup = world.dup()?;
            println!("dup -> {}", describe(&dup)?);
            println!("same object: {}", dup.object().is_same(world.object())?);
        }
        Operation::Split(color) => {
            let part = world.split(color)?;
            println!("split({}) -> {}", color, describe(&part)?);
        }
        Operation::Create => {
            let created = orb.create_as::<Communicator>(endpoint)?;
            println!("created -> {}", describe(&created)?);
            println!("url: {}", created.object().url()?);
        }
        Operation::Class => {
            let info = world.object().class_info()?;
            println!("class: {} version {}", info.name()?, info.version()?);
        }
    }
    Ok(())
}

fn report(err: &RmiError) {
    match err {
        RmiError::Exception(ex) => {
            eprintln!("Remote exception: {}", ex);
            for line in &ex.trace {
                eprintln!("  {}", line);
            }
        }
        other => eprintln!("Error ({:?}): {}", other.kind(), other),
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  info             Show rank, size and name");
    println!("  dup              Duplicate the communicator");
    println!("  split <color>    Derive a sub-communicator (negative color fails)");
    println!("  create           Create a fresh communicator on the server");
    println!("  class            Show the communicator's class");
    println!("  help             Show this help");
    println!("  quit/exit        Exit the client");
}

fn run_interactive(
    orb: &Orb,
    endpoint: &str,
    world: &Communicator,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !quiet {
        println!("========================================================");
        println!("         Communicator Client - Interactive Mode");
        println!("========================================================");
        println!("  Type 'help' for available commands");
        println!("  Type 'quit' or 'exit' to disconnect");
        println!("========================================================");
        println!();
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            if !quiet {
                println!("Goodbye!");
            }
            break;
        }
        if line.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_operation(line) {
            Some(op) => {
                if let Err(e) = execute_operation(orb, endpoint, world, op) {
                    report(&e);
                }
            }
            None => {
                eprintln!("Invalid command. Type 'help' for available commands.");
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !args.quiet {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::WARN)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    let endpoint = format!("tcp://{}:{}", args.host, args.port);
    let url = format!("{}/{}", endpoint, WORLD_ID);

    if !args.quiet {
        println!("Connecting to {}...", url);
    }

    let orb = Orb::new();
    let world = orb
        .connect_as::<Communicator>(&url)?
        .ok_or_else(|| format!("{} is not a {}", url, COMMUNICATOR))?;

    if !args.quiet {
        println!("Connected!");
        println!();
    }

    if let Some(operation) = args.operation {
        match parse_operation(&operation) {
            Some(op) => {
                if let Err(e) = execute_operation(&orb, &endpoint, &world, op) {
                    report(&e);
                    std::process::exit(1);
                }
            }
            None => {
                eprintln!("Invalid operation. Expected one of: info, dup, split <color>, create, class");
                std::process::exit(1);
            }
        }
    } else {
        run_interactive(&orb, &endpoint, &world, args.quiet)?;
    }

    Ok(())
}
