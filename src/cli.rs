use clap::{crate_description, crate_version, Arg, ArgAction, Command};
use pretty_env_logger::env_logger::Builder;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use crate::{export, targets, Config};

fn set_logger_level(b: &mut Builder) {
    let mut b = b;
    if env::var("RUST_LOG").is_err() {
        b = b.filter_level(log::LevelFilter::Info)
    }
    b.init();
}

fn setup_logger() {
    // Adapted from env_logger examples. <3 Systemd support
    match std::env::var("RUST_LOG_STYLE") {
        Ok(s) if s == "SYSTEMD" => {
            let builder = &mut pretty_env_logger::env_logger::builder();
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "<{}>{}: {}",
                    match record.level() {
                        log::Level::Error => 3,
                        log::Level::Warn => 4,
                        log::Level::Info => 6,
                        log::Level::Debug => 7,
                        log::Level::Trace => 7,
                    },
                    record.target(),
                    record.args()
                )
            });
            set_logger_level(builder);
        }
        _ => {
            let builder = &mut pretty_env_logger::formatted_builder();
            set_logger_level(builder);
        }
    };
}

pub(crate) fn main() {
    let cli = Command::new("VMInventory")
        .about(format!(
            "{}\n{} {}",
            crate_description!(),
            "Credentials can also be supplied as environment variables.",
            "See the docs for more information.",
        ))
        .arg(
            Arg::new("reference")
                .short('f')
                .long("reference")
                .required(true)
                .help("Reference workbook mapping CustomerName to PortGroupName"),
        )
        .arg(
            Arg::new("customers")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .long("customers")
                .help("Customers to collect; defaults to every customer in the workbook"),
        )
        .arg(
            Arg::new("vcenters")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .long("vcenters")
                .help("Endpoint addresses to scan"),
        )
        .arg(
            Arg::new("username")
                .long("username")
                .help("Username shared across all endpoints"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .help("Password shared across all endpoints; @/path reads a file"),
        )
        .arg(
            Arg::new("insecure")
                .action(ArgAction::SetTrue)
                .long("insecure")
                .help("Skip TLS certificate verification on every endpoint"),
        )
        .arg(
            Arg::new("duplicates")
                .long("duplicates")
                .help("Duplicate VM name policy: first-wins or flag"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .default_value(".")
                .help("Directory to write the inventory workbook into"),
        )
        .arg(
            Arg::new("check")
                .action(ArgAction::SetTrue)
                .short('t')
                .long("test")
                .help("Check the configuration and reference workbook"),
        )
        .version(crate_version!());

    let args = cli.get_matches();

    setup_logger();

    let mut config = match Config::populate_from_env() {
        Ok(c) => c,
        Err(err) => {
            println!("{err}");
            exit(2);
        }
    };

    {
        let vcenter = config.vcenter.get_or_insert_with(Default::default);
        if let Some(username) = args.get_one::<String>("username") {
            vcenter.username = username.clone();
        }
        if let Some(password) = args.get_one::<String>("password") {
            vcenter.password = password.clone();
        }
        if args.get_flag("insecure") {
            vcenter.danger_accept_invalid_certs = true;
        }
    }
    if let Some(policy) = args.get_one::<String>("duplicates") {
        match policy.parse() {
            Ok(policy) => {
                config
                    .inventory
                    .get_or_insert_with(Default::default)
                    .duplicate_names = policy
            }
            Err(err) => {
                println!("{err}");
                exit(2);
            }
        }
    }

    let reference = args
        .get_one::<String>("reference")
        .expect("reference is required");
    let spec = match targets::read_targets_file(&PathBuf::from(reference)) {
        Ok(spec) => spec,
        Err(err) => {
            println!("{err}");
            exit(2);
        }
    };

    if args.get_flag("check") {
        if let Err(err) = config.into_service() {
            println!("{err}");
            exit(2);
        }
        tracing::info!(customers = spec.len(), "Configuration is valid.");
        exit(0);
    }

    let customers: Vec<String> = match args.get_many::<String>("customers") {
        Some(values) => values.cloned().collect(),
        None => spec.keys().cloned().collect(),
    };
    let vcenters: Vec<String> = args
        .get_many::<String>("vcenters")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let service = match config.into_service() {
        Ok(service) => service,
        Err(err) => {
            println!("{err}");
            exit(2);
        }
    };

    let report = match service.run(&spec, &customers, &vcenters) {
        Ok(report) => report,
        Err(err) => {
            println!("{err}");
            exit(2);
        }
    };

    let bytes = match export::write_workbook(&report.sheets) {
        Ok(bytes) => bytes,
        Err(err) => {
            // The collected report dies with the process, but the operator
            // learns how much was lost.
            tracing::error!(
                records = report.records(),
                error = err.to_string(),
                "Export failed",
            );
            exit(1);
        }
    };

    let path = PathBuf::from(args.get_one::<String>("output").expect("output has a default"))
        .join(export::inventory_filename(chrono::Local::now().date_naive()));
    if let Err(err) = std::fs::write(&path, &bytes) {
        tracing::error!(
            path = path.display().to_string(),
            error = err.to_string(),
            "Failed to write workbook",
        );
        exit(1);
    }

    tracing::info!(
        path = path.display().to_string(),
        sheets = report.sheets.len(),
        records = report.records(),
        failures = report.failures.len(),
        duplicates = report.duplicates.len(),
        "Inventory written",
    );
}
