use clap::Parser;
use getfw::{
    Cli, Getfw, GetfwError, OutputFormatter, OutputMode, UserFriendlyError, CATALOG,
};
use std::process;

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    if cli.list {
        return handle_list(&cli);
    }

    let getfw = match Getfw::from_cli(&cli) {
        Ok(getfw) => getfw,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    if cli.dry_run {
        return handle_dry_run(&getfw);
    }

    match getfw.extract() {
        Ok(report) => {
            getfw.output_formatter().print_extraction_report(&report);

            if report.missing_packages.is_empty() {
                0
            } else {
                2 // Completed, but the tree has documented omissions
            }
        }
        Err(e) => {
            getfw.handle_error(&e);

            match e {
                GetfwError::Cancelled => 130, // Interrupted (SIGINT)
                GetfwError::InvalidSource { .. } => 3,
                GetfwError::MissingPackage { .. } => 4,
                GetfwError::Write { .. } => 5,
                GetfwError::Permission { .. } => 6,
                GetfwError::Config { .. } => 7,
                GetfwError::InvalidPath { .. } => 8,
                _ => 1, // General error
            }
        }
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "getfw.toml".to_string());

    match Getfw::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  getfw -w <windows-root> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_list(cli: &Cli) -> i32 {
    let skip = cli.skip.clone().unwrap_or_default();

    println!("Firmware catalog ({} packages):", CATALOG.len());
    println!();

    for package in CATALOG {
        let marker = if skip.iter().any(|s| s == package.name) {
            " (skipped)"
        } else {
            ""
        };

        println!("  {}{}", package.name, marker);
        println!("    driver package: {}*", package.prefix);
        println!("    target:         {}/", package.target_dir);
        println!(
            "    files:          {}{}",
            package.files.len(),
            if package.links.is_empty() {
                String::new()
            } else {
                format!(" (+{} aliases)", package.links.len())
            }
        );
    }

    0
}

fn handle_dry_run(getfw: &Getfw) -> i32 {
    let formatter = getfw.output_formatter();

    formatter.info("DRY RUN MODE - No files will be extracted");
    formatter.print_separator();

    let (store, plan) = match getfw.build_plan() {
        Ok(result) => result,
        Err(e) => {
            getfw.handle_error(&e);
            return match e {
                GetfwError::InvalidSource { .. } => 3,
                GetfwError::MissingPackage { .. } => 4,
                _ => 1,
            };
        }
    };

    formatter.info(&format!(
        "Driver store: {}",
        store.repository_path().display()
    ));
    formatter.info("Extraction plan:");
    formatter.print_extraction_plan(&plan);

    formatter.print_separator();
    formatter.info(&format!(
        "Output directory: {}",
        getfw.config().output.directory.display()
    ));
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to perform actual extraction");

    if plan.is_complete() {
        0
    } else {
        2
    }
}

fn print_startup_error(error: &GetfwError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
