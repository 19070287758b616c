//! `exclusivity` command-line entry point.
//!
//! # Responsibility
//! - Open the configured database and run one exclusivity operation.
//! - Print results as pretty JSON on stdout.
//!
//! Exit status is 0 on success, 1 on errors and 2 when a batch finished with
//! row failures.

use clap::{Parser, Subcommand};
use exclusivity_core::api::{BulkRequest, CellResponse};
use exclusivity_core::db::migrations::schema_version;
use exclusivity_core::{
    init_logging, open_db, ChannelAuditRecorder, DimensionTuple, EngineConfig, ExclusivityService,
    ImportReport, ProductLine,
};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "exclusivity")]
#[command(about = "Maintain EPC and NBFI exclusivity matrices", long_about = None)]
#[command(version)]
struct Args {
    /// JSON engine config file.
    #[arg(long, conflicts_with = "db")]
    config: Option<PathBuf>,
    /// SQLite database path, used with default settings.
    #[arg(long, required_unless_present = "config")]
    db: Option<PathBuf>,
    /// Actor recorded on audit events.
    #[arg(long)]
    actor: Option<String>,
    #[command(subcommand)]
    command: Command,
}

fn parse_line(value: &str) -> Result<ProductLine, String> {
    ProductLine::parse(value)
        .ok_or_else(|| format!("unknown product line `{value}`; expected epc or nbfi"))
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and apply migrations.
    Init,
    /// Register every attribute derivable from the registries.
    Provision,
    /// Print the active brand override table.
    Overrides,
    /// List registered attribute names.
    Attributes {
        #[arg(long, value_parser = parse_line)]
        line: ProductLine,
        /// SQL LIKE pattern, e.g. `brand_%`.
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Mark one cell exclusive from registry codes.
    SetCell {
        #[arg(long, value_parser = parse_line)]
        line: ProductLine,
        #[arg(long)]
        entity_key: String,
        #[arg(long)]
        chain: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        classification: Option<String>,
    },
    /// Clear one cell without deleting it.
    ClearCell {
        #[arg(long, value_parser = parse_line)]
        line: ProductLine,
        #[arg(long)]
        entity_key: String,
        #[arg(long)]
        attribute: String,
    },
    /// Import a CSV export, or a JSON `{ "rows": [...] }` file.
    Import {
        #[arg(long, value_parser = parse_line)]
        line: ProductLine,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitOutput {
    database: String,
    schema_version: u32,
}

#[derive(Serialize)]
struct ClearOutput {
    outcome: exclusivity_core::ClearOutcome,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, Box<dyn Error>> {
    let config = match (&args.config, &args.db) {
        (Some(path), _) => EngineConfig::load(path)?,
        (None, Some(db)) => EngineConfig::new(db.clone()),
        (None, None) => return Err("either --config or --db is required".into()),
    };
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, &dir.to_string_lossy())?;
    }

    let conn = open_db(&config.database_path)?;
    if let Command::Init = args.command {
        info!(
            "event=cli_init module=cli status=ok db={}",
            config.database_path.display()
        );
        print_json(&InitOutput {
            database: config.database_path.display().to_string(),
            schema_version: schema_version(&conn)?,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    let recorder = ChannelAuditRecorder::spawn(&config.database_path, config.audit_queue_capacity)?;
    let mut service = ExclusivityService::new(&conn, config.key_encoder()?, &recorder)
        .with_csv_delimiter(config.csv_delimiter_byte());
    if let Some(actor) = &args.actor {
        service = service.with_actor(actor.as_str());
    }

    let code = dispatch(&service, args.command)?;
    drop(service);
    recorder.shutdown()?;
    Ok(code)
}

fn dispatch(
    service: &ExclusivityService<'_, &ChannelAuditRecorder>,
    command: Command,
) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Init => {}
        Command::Provision => print_json(&service.provision_attributes()?)?,
        Command::Overrides => {
            let active: BTreeMap<&str, &str> = service.encoder().overrides().collect();
            print_json(&active)?
        }
        Command::Attributes { line, pattern } => {
            print_json(&service.list_attributes(line, pattern.as_deref())?)?
        }
        Command::SetCell {
            line,
            entity_key,
            chain,
            category,
            brand,
            classification,
        } => {
            let tuple = DimensionTuple {
                chain,
                category,
                brand,
                classification,
            };
            let result = service.set_cell(line, &entity_key, &tuple)?;
            print_json(&CellResponse::from(result))?;
        }
        Command::ClearCell {
            line,
            entity_key,
            attribute,
        } => {
            let outcome = service.clear_cell(line, &entity_key, &attribute)?;
            print_json(&ClearOutput { outcome })?;
        }
        Command::Import { line, file } => {
            let is_json = file
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            let reader = BufReader::new(File::open(&file)?);
            let report = if is_json {
                let request: BulkRequest = serde_json::from_reader(reader)?;
                service.bulk_rows(line, &request.rows)?
            } else {
                service.import_tabular(line, reader)?
            };
            print_json(&report)?;
            return Ok(batch_exit_code(&report));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn batch_exit_code(report: &ImportReport) -> ExitCode {
    if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::Parser;
    use exclusivity_core::ProductLine;

    #[test]
    fn line_flag_accepts_any_case() {
        let args = Args::try_parse_from([
            "exclusivity",
            "--db",
            "matrix.db",
            "attributes",
            "--line",
            "NBFI",
        ])
        .unwrap();
        match args.command {
            Command::Attributes { line, pattern } => {
                assert_eq!(line, ProductLine::Nbfi);
                assert_eq!(pattern, None);
            }
            _ => panic!("expected attributes command"),
        }
    }

    #[test]
    fn unknown_line_is_rejected() {
        let err = Args::try_parse_from([
            "exclusivity",
            "--db",
            "matrix.db",
            "import",
            "--line",
            "toys",
            "--file",
            "rows.csv",
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("unknown product line `toys`"));
    }

    #[test]
    fn overrides_needs_no_arguments() {
        let args = Args::try_parse_from(["exclusivity", "--db", "matrix.db", "overrides"]).unwrap();
        assert!(matches!(args.command, Command::Overrides));
    }
}
