//! casedash CLI - inspect case type schemas, filters, stratifications and epi curves.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Schema { schema, json } => commands::schema::run(schema, json, config),

        Commands::Filters {
            schema,
            reference,
            json,
        } => commands::filters::run(schema, reference, json, config),

        Commands::Stratify {
            schema,
            cases,
            column,
            selected,
            reference,
            filters,
            json,
        } => commands::stratify::run(
            commands::Inputs {
                schema,
                cases: Some(cases),
                reference,
                config,
            },
            column,
            selected,
            filters,
            json,
        ),

        Commands::Curve {
            schema,
            cases,
            dimension,
            stratify_by,
            reference,
            filters,
            format,
        } => commands::curve::run(
            commands::Inputs {
                schema,
                cases: Some(cases),
                reference,
                config,
            },
            dimension,
            stratify_by,
            filters,
            format,
            cli.verbose,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
