//! Cadastro CLI - Convert spreadsheets to cadastro XML documents
//!
//! # Main Commands
//!
//! ```bash
//! cadastro serve                                   # Start HTTP server (port 3001)
//! cadastro convert motoristas.csv -t driver \
//!     --cnpj 11.222.333/0001-44 --token SECRET     # CSV to XML documents
//! cadastro submit out/*.xml -t driver              # Send documents upstream
//! ```
//!
//! # Reference Commands
//!
//! ```bash
//! cadastro types                   # Record types, envelopes and routes
//! cadastro fields vehicle          # Expected spreadsheet columns
//! cadastro parse input.csv         # Just parse CSV to JSON
//! cadastro municipio "São Paulo"   # Resolve an IBGE code
//! ```

use cadastro::{
    convert_csv, convert_json, expected_fields, format_cnpj, init_municipalities,
    municipalities, parse_csv_file_auto, server, Auth, Config, ConversionResult, RecordType,
    SubmitClient,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cadastro")]
#[command(about = "Convert spreadsheets to cadastro XML documents", long_about = None)]
struct Cli {
    /// Municipality dataset (JSON array of {nome, codigo_ibge}); overrides CADASTRO_MUNICIPIOS_PATH
    #[arg(long, global = true)]
    municipios: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List record types
    Types,

    /// Show the expected columns for a record type
    Fields {
        /// Record type (driver, vehicle, carrier, individual, company)
        record_type: RecordType,
    },

    /// Parse a CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a CSV, Excel workbook or JSON array file to one XML document per row
    Convert {
        /// Input CSV, .xlsx/.xls or JSON file
        input: PathBuf,

        /// Record type
        #[arg(short = 't', long = "type")]
        record_type: RecordType,

        /// Company CNPJ (formatted or digits only)
        #[arg(long)]
        cnpj: String,

        /// Access token
        #[arg(long)]
        token: String,

        /// Output directory, one file per document (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send XML documents to the cadastro API
    Submit {
        /// XML files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Record type (selects the endpoint)
        #[arg(short = 't', long = "type")]
        record_type: RecordType,

        /// API base URL (overrides CADASTRO_UPSTREAM_URL)
        #[arg(long)]
        upstream: Option<String>,
    },

    /// Resolve a municipality name to its IBGE code
    Municipio {
        /// Municipality name
        name: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides CADASTRO_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(path) = cli.municipios {
        config.municipios_path = Some(path);
    }
    if config.municipios_path.is_some() {
        init_municipalities(config.municipality_table()?)?;
    }

    match cli.command {
        Commands::Types => cmd_types(),

        Commands::Fields { record_type } => cmd_fields(record_type),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Convert {
            input,
            record_type,
            cnpj,
            token,
            output,
        } => cmd_convert(&input, record_type, &cnpj, &token, output.as_deref()),

        Commands::Submit {
            files,
            record_type,
            upstream,
        } => {
            let upstream = upstream.unwrap_or(config.upstream_url);
            cmd_submit(&files, record_type, &upstream).await
        }

        Commands::Municipio { name } => cmd_municipio(&name),

        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            server::start_server(config).await
        }
    }
}

fn cmd_types() -> Result<(), Box<dyn std::error::Error>> {
    for rt in RecordType::ALL {
        println!(
            "{:<11} {:<16} {:<16} {}",
            rt.as_str(),
            rt.label(),
            rt.envelope_tag(),
            rt.route()
        );
    }
    Ok(())
}

fn cmd_fields(record_type: RecordType) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📋 {} ({} columns):", record_type.label(), expected_fields(record_type).len());
    for field in expected_fields(record_type) {
        println!("{}", field);
    }
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file_auto(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Delimiter: '{}' (auto-detected)", format_delimiter(result.delimiter));
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} rows", result.rows.len());

    let json = serde_json::to_string_pretty(&result.rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_convert(
    input: &Path,
    record_type: RecordType,
    cnpj: &str,
    token: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let auth = Auth::new(cnpj, token)?;
    eprintln!("📄 Processing: {}", input.display());
    eprintln!("   Type: {} ({})", record_type.label(), record_type.envelope_tag());
    eprintln!("   CNPJ: {}", format_cnpj(auth.cnpj()));

    let result = if is_json(input) {
        let content = fs::read_to_string(input)?;
        let value: Value = serde_json::from_str(&content)?;
        convert_json(&value, record_type, &auth)?
    } else {
        convert_csv(input, record_type, &auth)?
    };

    match output {
        Some(dir) => write_documents(&result, dir)?,
        None => println!("{}", result.documents.join("\n\n")),
    }

    eprintln!("\n✨ Done! {} documents", result.documents.len());
    Ok(())
}

async fn cmd_submit(
    files: &[PathBuf],
    record_type: RecordType,
    upstream: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let documents = files
        .iter()
        .map(fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;

    let client = SubmitClient::new(upstream);
    let report = client.submit_all(record_type, &documents).await?;

    eprintln!("\n📊 Results: {} sent, {} accepted", report.total, report.succeeded);
    for failure in &report.failures {
        eprintln!("   ❌ {}: HTTP {}", files[failure.index].display(), failure.status);
        if !failure.body.is_empty() {
            eprintln!("      {}", failure.body);
        }
    }

    if !report.failures.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_municipio(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    match municipalities().lookup(name) {
        Some(code) => {
            println!("{}", code);
            Ok(())
        }
        None => Err(format!("Municipality not found: {}", name).into()),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn write_documents(result: &ConversionResult, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let width = result.documents.len().to_string().len();
    for (i, doc) in result.documents.iter().enumerate() {
        let path = dir.join(format!(
            "{}_{:0width$}.xml",
            result.record_type,
            i + 1,
            width = width
        ));
        fs::write(&path, doc)?;
    }
    eprintln!("💾 {} files written to: {}", result.documents.len(), dir.display());
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
