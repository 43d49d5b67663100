use clap::{Parser, Subcommand, ValueEnum};
use futures::executor::block_on;
use std::path::PathBuf;
use std::process;
use warehouse::schema::parse_definition;
use warehouse::{validate_model, Database, DatabaseOptions, FindOptions, Selector};

/// Warehouse CLI: inspect and edit a warehouse database file
#[derive(Parser)]
#[command(name = "warehouse", version, about)]
struct Cli {
    /// Path to the JSON database file
    #[arg(long, global = true, default_value = "db.json")]
    db: PathBuf,

    /// YAML model definitions to register before loading
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show the database version and document counts per model
    Status,

    /// Get a single document by ID
    Get {
        /// Model name
        model: String,
        /// Document ID
        id: String,
    },

    /// Find documents matching a query
    Find {
        /// Model name
        model: String,
        /// Query object, e.g. '{"views": {"$gt": 10}}'
        #[arg(long)]
        query: Option<String>,
        /// Sort keys, e.g. "-date title"
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Insert a new document
    Insert {
        /// Model name
        model: String,
        /// Field values (e.g. --field title="Hello")
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
        /// The whole document as JSON
        #[arg(long, conflicts_with = "fields")]
        json: Option<String>,
    },

    /// Apply an update object to a document
    Update {
        /// Model name
        model: String,
        /// Document ID
        id: String,
        /// Update object, e.g. '{"views": {"$inc": 1}}'
        #[arg(long)]
        update: String,
    },

    /// Remove a document
    Remove {
        /// Model name
        model: String,
        /// Document ID
        id: String,
        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Dump a model in its persisted form
    Export {
        /// Model name
        model: String,
    },

    /// Check every stored document against its schema
    Validate,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn open(cli: &Cli) -> Result<Database, Box<dyn std::error::Error>> {
    let options = DatabaseOptions::new(&cli.db);
    let db = match &cli.schema {
        Some(path) => {
            let definition = parse_definition(path)?;
            Database::from_definition(options.version(definition.version), &definition)?
        }
        None => Database::new(options),
    };
    block_on(db.load())?;
    Ok(db)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db = open(&cli)?;

    match &cli.command {
        Command::Status => {
            let models: serde_json::Map<String, serde_json::Value> = db
                .model_names()
                .into_iter()
                .filter_map(|name| {
                    let count = db.get(&name).ok()?.count();
                    Some((name, serde_json::json!(count)))
                })
                .collect();
            print_output(
                &serde_json::json!({
                    "db": cli.db.display().to_string(),
                    "version": db.options().version,
                    "models": models,
                }),
                &cli.format,
            )?;
        }

        Command::Get { model, id } => {
            let doc = db
                .get(model)?
                .find_by_id(id)
                .ok_or_else(|| format!("ID `{id}` does not exist"))?;
            print_output(&doc.to_json(), &cli.format)?;
        }

        Command::Find {
            model,
            query,
            sort,
            skip,
            limit,
        } => {
            let selector = match query {
                Some(q) => Selector::from(serde_json::from_str::<serde_json::Value>(q)?),
                None => Selector::all(),
            };
            let mut found = db.get(model)?.find(selector, FindOptions::default())?;
            if let Some(sort) = sort {
                found = found.sort(sort.as_str());
            }
            found = found.skip(*skip);
            if let Some(limit) = limit {
                found = found.limit(*limit);
            }
            let docs: Vec<serde_json::Value> = found.iter().map(|d| d.to_json()).collect();
            print_output(&serde_json::Value::Array(docs), &cli.format)?;
        }

        Command::Insert {
            model,
            fields,
            json,
        } => {
            let data = match json {
                Some(raw) => serde_json::from_str(raw)?,
                None => fields_to_value(fields),
            };
            let doc = block_on(db.get(model)?.insert_one(data))?;
            db.save()?;
            print_output(&serde_json::json!({ "id": doc.id() }), &cli.format)?;
        }

        Command::Update { model, id, update } => {
            let update: serde_json::Value = serde_json::from_str(update)?;
            let doc = block_on(db.get(model)?.update_by_id(id, update))?;
            db.save()?;
            print_output(&doc.to_json(), &cli.format)?;
        }

        Command::Remove { model, id, dry_run } => {
            let target = db.get(model)?;
            if *dry_run {
                let doc = target
                    .find_by_id(id)
                    .ok_or_else(|| format!("ID `{id}` does not exist"))?;
                print_output(
                    &serde_json::json!({
                        "dry_run": true,
                        "would_remove": { "model": model, "id": id },
                        "document": doc.to_json(),
                    }),
                    &cli.format,
                )?;
            } else {
                block_on(target.remove_by_id(id))?;
                db.save()?;
                print_output(&serde_json::json!({ "ok": true, "removed": id }), &cli.format)?;
            }
        }

        Command::Export { model } => {
            let docs = db.get(model)?.export();
            print_output(&serde_json::Value::Array(docs), &cli.format)?;
        }

        Command::Validate => {
            let mut ok = true;
            let mut reports = Vec::new();
            for name in db.model_names() {
                let report = validate_model(&db.get(&name)?);
                ok &= report.is_ok();
                reports.push(serde_json::json!({
                    "model": report.model,
                    "checked": report.checked,
                    "errors": report.error_count(),
                    "warnings": report.warning_count(),
                    "documents": report.documents.iter().map(|d| serde_json::json!({
                        "id": d.id,
                        "errors": d.errors,
                        "warnings": d.warnings,
                    })).collect::<Vec<_>>(),
                }));
            }
            print_output(&serde_json::json!({ "ok": ok, "models": reports }), &cli.format)?;
            if !ok {
                return Err("validation failed".into());
            }
        }
    }

    Ok(())
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn fields_to_value(fields: &[(String, String)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, val) in fields {
        // Numbers, booleans, arrays and objects parse as JSON; anything else is a string
        let json_val = serde_json::from_str(val).unwrap_or(serde_json::Value::String(val.clone()));
        map.insert(key.clone(), json_val);
    }
    serde_json::Value::Object(map)
}
